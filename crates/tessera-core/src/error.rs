use std::fmt;
use thiserror::Error as ThisError;

///
/// GeometryError
///
/// Structured geometry error with a stable classification.
/// Nothing raised here is transient; callers surface it to the query layer.
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct GeometryError {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl GeometryError {
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
        }
    }

    /// Construct a validation error for a specific origin.
    pub(crate) fn validation(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Validation, origin, message)
    }

    /// Construct an overflow error for a specific origin.
    pub(crate) fn overflow(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Overflow, origin, message)
    }

    /// Construct a configuration error for a specific origin.
    pub(crate) fn configuration(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Configuration, origin, message)
    }

    /// Construct a range-origin validation error.
    pub(crate) fn range_validation(message: impl Into<String>) -> Self {
        Self::validation(ErrorOrigin::Range, message)
    }

    /// Construct a dimension-origin validation error.
    pub(crate) fn dimension_validation(message: impl Into<String>) -> Self {
        Self::validation(ErrorOrigin::Dimension, message)
    }

    /// Construct a domain-origin configuration error.
    pub(crate) fn domain_configuration(message: impl Into<String>) -> Self {
        Self::configuration(ErrorOrigin::Domain, message)
    }

    /// Construct a result-tile validation error.
    pub(crate) fn result_tile_validation(message: impl Into<String>) -> Self {
        Self::validation(ErrorOrigin::ResultTile, message)
    }

    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self.class, ErrorClass::Validation)
    }

    #[must_use]
    pub const fn is_overflow(&self) -> bool {
        matches!(self.class, ErrorClass::Overflow)
    }

    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self.class, ErrorClass::Configuration)
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }
}

///
/// ErrorClass
/// Geometry error taxonomy.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    Validation,
    Overflow,
    Configuration,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Validation => "validation",
            Self::Overflow => "overflow",
            Self::Configuration => "configuration",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Component that raised the error.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Range,
    Dimension,
    Domain,
    Tile,
    ResultTile,
    CellSlab,
    Config,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Range => "range",
            Self::Dimension => "dimension",
            Self::Domain => "domain",
            Self::Tile => "tile",
            Self::ResultTile => "result_tile",
            Self::CellSlab => "cell_slab",
            Self::Config => "config",
        };
        write!(f, "{label}")
    }
}
