//! Byte-string coordinate arithmetic.
//!
//! Strings compare bytewise; the immediate successor of `v` is `v ++ [0]`.

use super::{bounds_covered as covered, bounds_overlap as overlap};
use crate::coord::nudge_partial_ratio;

pub(crate) fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

pub(crate) fn successor(value: &[u8]) -> Vec<u8> {
    let mut next = Vec::with_capacity(value.len() + 1);
    next.extend_from_slice(value);
    next.push(0);
    next
}

#[allow(clippy::cast_precision_loss)]
pub(crate) fn overlap_ratio(r1: (&[u8], &[u8]), r2: (&[u8], &[u8])) -> f64 {
    if !overlap(r1, r2) {
        return 0.0;
    }
    if covered(r2, r1) {
        return 1.0;
    }

    // r2 is not unary here; its bounds first differ at `prefix`.
    let prefix = common_prefix_len(r2.0, r2.1);
    let byte_at = |s: &[u8]| s.get(prefix).map_or(0_u64, |b| u64::from(*b));

    let r2_span = byte_at(r2.1).saturating_sub(byte_at(r2.0)) + 1;

    let o_start = r1.0.max(r2.0);
    let o_end = r1.1.min(r2.1);
    let o_span = if o_start == o_end {
        1
    } else {
        byte_at(o_end).saturating_sub(byte_at(o_start)) + 1
    };

    nudge_partial_ratio(o_span as f64 / r2_span as f64)
}

/// Synthesize a separator `v` with `lo <= v < hi`, walking at most
/// `max_depth` bytes past the common prefix.
pub(crate) fn splitting_value(lo: &[u8], hi: &[u8], max_depth: usize) -> Option<Vec<u8>> {
    if lo >= hi {
        return None;
    }

    let prefix = common_prefix_len(lo, hi);
    let mut split = lo[..prefix].to_vec();

    for depth in 0..max_depth {
        let lower = lo.get(prefix + depth).copied();
        if depth > 0 && lower.is_none() {
            return Some(split);
        }

        let upper = if depth == 0 {
            u16::from(*hi.get(prefix)?)
        } else {
            256
        };
        if upper == 0 {
            // hi is lo followed by a zero byte; nothing fits in between
            return Some(split);
        }

        let lower = u16::from(lower.unwrap_or(0));
        if upper > lower + 1 {
            #[allow(clippy::cast_possible_truncation)]
            split.push(((lower + upper) / 2) as u8);
            return Some(split);
        }

        #[allow(clippy::cast_possible_truncation)]
        split.push(lower as u8);
    }

    None
}

/// Split `[lo, hi]` into `[lo, v]` and `[v ++ 0, hi]`.
pub(crate) fn split_range(lo: &[u8], hi: &[u8], value: &[u8]) -> Option<(Vec<u8>, Vec<u8>)> {
    if value < lo || value >= hi {
        return None;
    }

    Some((value.to_vec(), successor(value)))
}

pub(crate) fn map_to_uint64(value: &[u8], bits: u32) -> u64 {
    let mut buf = [0_u8; 8];
    let len = value.len().min(8);
    buf[..len].copy_from_slice(&value[..len]);
    let raw = u64::from_be_bytes(buf);

    match bits {
        0 => 0,
        64.. => raw,
        _ => raw >> (64 - bits),
    }
}

pub(crate) fn map_from_uint64(value: u64, bits: u32) -> Vec<u8> {
    let raw = match bits {
        0 => 0,
        64.. => value,
        _ => value << (64 - bits),
    };

    let mut bytes = raw.to_be_bytes().to_vec();
    while bytes.last() == Some(&0) {
        bytes.pop();
    }
    bytes
}
