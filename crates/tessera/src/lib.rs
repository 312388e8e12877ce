//! ## Crate layout
//! - `core`: ranges, dimensions, domains, tile arithmetic, result-tile
//!   filtering, cell-slab iteration and result-size estimation.
//! - `primitives`: the closed datatype set and its metadata registry.
//!
//! The `prelude` module carries the geometry vocabulary plus the filtering
//! entry points a query executor reaches for.

pub use tessera_core as core;
pub use tessera_primitives as primitives;

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use tessera_core::error::{ErrorClass, ErrorOrigin, GeometryError};

///
/// Prelude
///

pub mod prelude {
    pub use crate::core::{
        CoordValue as _, Datatype, IntCoord as _,
        cell_slab::{CellSlab, CellSlabIter},
        config::FilterConfig,
        dimension::Dimension,
        domain::{Domain, Layout},
        estimate::{TileSummary, estimate_result_size},
        range::{NDRange, Range},
        result_tile::{CoordBuffers, DimColumn, FragmentDomain, ResultBitmap as _, ResultTile},
    };
    pub use crate::GeometryError;
}
