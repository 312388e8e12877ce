//! Module: config
//! Responsibility: tunables for per-tile filtering and string splitting.
//! Does not own: any filtering logic; consumers read these values only.

use crate::error::{ErrorOrigin, GeometryError};
use serde::{Deserialize, Serialize};

/// Number of buckets the sorted-string shortcut partitions a tile into.
pub const DEFAULT_STRING_PARTITIONS: usize = 6;

/// Cells scanned per block when skipping already-excluded runs.
pub const DEFAULT_ZERO_SKIP_CHUNK: usize = 256;

/// Byte depth past the common prefix at which string splitting gives up.
pub const DEFAULT_MAX_STRING_SPLIT_DEPTH: usize = 8;

///
/// FilterConfig
///
/// Filtering and splitting tunables.
/// Every field has a default, so partial documents deserialize cleanly.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterConfig {
    pub string_partitions: usize,
    pub zero_skip_chunk: usize,
    pub max_string_split_depth: usize,
}

impl FilterConfig {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            string_partitions: DEFAULT_STRING_PARTITIONS,
            zero_skip_chunk: DEFAULT_ZERO_SKIP_CHUNK,
            max_string_split_depth: DEFAULT_MAX_STRING_SPLIT_DEPTH,
        }
    }

    /// Reject settings that would make the shortcuts degenerate.
    pub fn validate(&self) -> Result<(), GeometryError> {
        let zero_field = if self.string_partitions == 0 {
            Some("string_partitions")
        } else if self.zero_skip_chunk == 0 {
            Some("zero_skip_chunk")
        } else if self.max_string_split_depth == 0 {
            Some("max_string_split_depth")
        } else {
            None
        };

        match zero_field {
            Some(field) => Err(GeometryError::configuration(
                ErrorOrigin::Config,
                format!("filter config field '{field}' must be greater than zero"),
            )),
            None => Ok(()),
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self::new()
    }
}
