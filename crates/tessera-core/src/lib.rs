//! Geometry and per-tile filtering core for tiled multi-dimensional arrays:
//! ranges, dimensions, domains, tile-run arithmetic, result-tile bitmaps and
//! cell-slab iteration.
#![warn(unreachable_pub)]

#[macro_use]
pub(crate) mod coord;

pub mod cell_slab;
pub mod config;
pub mod dimension;
pub mod domain;
pub mod error;
pub mod estimate;
pub mod obs;
pub mod range;
pub mod result_tile;
pub mod tile;

pub use coord::{CoordValue, FloatCoord, IntCoord};
pub use tessera_primitives::Datatype;

///
/// CONSTANTS
///

/// Sentinel returned by advisory tile/cell counting when the product
/// does not fit in 64 bits.
pub const COUNT_OVERFLOW: u64 = u64::MAX;

///
/// Prelude
///
/// Geometry vocabulary only.
/// Filtering entry points and metrics plumbing stay behind their modules.
///

pub mod prelude {
    pub use crate::{
        Datatype,
        dimension::Dimension,
        domain::{Domain, Layout},
        range::{NDRange, Range},
    };
}
