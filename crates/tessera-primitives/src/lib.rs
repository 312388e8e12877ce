//! Closed set of physical coordinate types and their constant metadata.
//!
//! Every lookup here is a `const fn` over a macro-generated registry so adding
//! a datatype is an exhaustiveness failure at every match site.

#[macro_use]
mod macros;

use std::fmt;

///
/// Datatype
///
/// Physical type of one dimension value or range endpoint.
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Datatype {
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float32,
    Float64,
    StringAscii,
}

impl Datatype {
    /// Return the full metadata descriptor for one datatype.
    #[must_use]
    pub const fn metadata(self) -> DatatypeMetadata {
        datatype_registry!(metadata_from_registry, self)
    }

    /// Stable lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        self.metadata().name
    }

    #[must_use]
    pub const fn family(self) -> DatatypeFamily {
        self.metadata().family
    }

    /// Fixed encoded width in bytes, or `None` for variable-length types.
    #[must_use]
    pub const fn size(self) -> Option<usize> {
        self.metadata().size
    }

    #[must_use]
    pub const fn is_var_sized(self) -> bool {
        self.metadata().size.is_none()
    }

    #[must_use]
    pub const fn is_integer(self) -> bool {
        matches!(
            self.family(),
            DatatypeFamily::SignedInteger | DatatypeFamily::UnsignedInteger
        )
    }

    #[must_use]
    pub const fn is_signed(self) -> bool {
        matches!(
            self.family(),
            DatatypeFamily::SignedInteger | DatatypeFamily::Float
        )
    }

    #[must_use]
    pub const fn is_float(self) -> bool {
        matches!(self.family(), DatatypeFamily::Float)
    }

    #[must_use]
    pub const fn is_string(self) -> bool {
        matches!(self.family(), DatatypeFamily::String)
    }

    /// Return whether a dimension of this type may carry a tile extent.
    #[must_use]
    pub const fn supports_tile_extent(self) -> bool {
        self.metadata().supports_tile_extent
    }
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

///
/// DatatypeMetadata
///
/// Constant capability metadata for one datatype.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DatatypeMetadata {
    pub name: &'static str,
    pub family: DatatypeFamily,
    pub size: Option<usize>,
    pub supports_tile_extent: bool,
}

///
/// DatatypeFamily
///
/// Coarse arithmetic family used to route geometry operations.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum DatatypeFamily {
    SignedInteger,
    UnsignedInteger,
    Float,
    String,
}

/// Ordered list of all datatypes in registry order.
pub const ALL_DATATYPES: [Datatype; 11] = datatype_registry!(all_datatypes_from_registry);
