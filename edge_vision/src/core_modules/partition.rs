// THEORY:
// Static work partitioning over a flat pixel index space. Planning is a pure function
// so coverage can be tested without any threads.
//
// The first `worker_count - 1` partitions get `total / worker_count` indices each and
// the last one takes everything that is left, so the union is always exactly
// `[0, total)`.

use std::ops::Range;

use tracing::debug;

use crate::error::{EdgeError, Result};

/// A half-open range `[start, start + size)` of flat pixel indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partition {
    pub start: usize,
    pub size: usize,
}

impl Partition {
    pub fn end(&self) -> usize {
        self.start + self.size
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end()
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }
}

/// Splits `[0, total_pixels)` into `worker_count` contiguous partitions.
///
/// Returns an empty list for `total_pixels == 0`. When there are fewer pixels than
/// workers the leading partitions are empty; callers skip those.
pub fn plan(total_pixels: usize, worker_count: usize) -> Result<Vec<Partition>> {
    if worker_count == 0 {
        return Err(EdgeError::Config("worker count must be at least 1".into()));
    }
    if total_pixels == 0 {
        return Ok(Vec::new());
    }

    let base = total_pixels / worker_count;
    let mut partitions: Vec<Partition> = (0..worker_count - 1)
        .map(|i| Partition {
            start: base * i,
            size: base,
        })
        .collect();
    let last_start = base * (worker_count - 1);
    partitions.push(Partition {
        start: last_start,
        size: total_pixels - last_start,
    });
    debug!(
        total_pixels,
        worker_count,
        base,
        last = total_pixels - last_start,
        "planned partitions"
    );
    Ok(partitions)
}
