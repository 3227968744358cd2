// THEORY:
// The `ConvolutionEngine` runs the Laplacian over one image with a fixed number of
// partition workers.
//
// Key architectural principles:
// 1.  **Shared read, partitioned write**: Workers share the source as `&PixelBuffer`.
//     The destination's byte storage is cut with `split_at_mut` into one disjoint
//     `&mut [u8]` region per partition, and each region is moved into exactly one
//     worker. The borrow checker proves the writes cannot overlap, so no lock guards
//     the pixels.
// 2.  **Barrier join**: `ThreadPool::scope` returns only after every worker has
//     finished, and only then is the destination handed back to the caller.
// 3.  **Fatal worker failure**: A pool that cannot be built or a worker that panics
//     fails the whole call with `WorkerFailure`. No partially filled buffer escapes.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::core_modules::kernel;
use crate::core_modules::partition::{self, Partition};
use crate::core_modules::pixel::pixel::{CHANNELS, PixelBuffer};
use crate::error::{EdgeError, Result};

/// The filtered image and the wall-clock time its convolution took.
#[derive(Debug, Clone)]
pub struct Convolved {
    pub image: PixelBuffer,
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct ConvolutionEngine {
    worker_count: usize,
}

impl ConvolutionEngine {
    pub fn new(worker_count: usize) -> Result<Self> {
        if worker_count == 0 {
            return Err(EdgeError::Config("worker count must be at least 1".into()));
        }
        Ok(Self { worker_count })
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Convolves `source` and returns a new buffer of the same dimensions.
    pub fn run(&self, source: &PixelBuffer) -> Result<Convolved> {
        self.run_with(source, convolve_region)
    }

    /// `run` with the per-partition worker body supplied by the caller.
    fn run_with<F>(&self, source: &PixelBuffer, job: F) -> Result<Convolved>
    where
        F: Fn(&PixelBuffer, Partition, &mut [u8]) + Sync,
    {
        let start = Instant::now();
        let (width, height) = source.dimensions();
        let mut destination = PixelBuffer::new(width, height);

        let partitions = partition::plan(source.len(), self.worker_count)?;
        let regions = split_regions(destination.as_bytes_mut(), &partitions);
        debug!(
            width,
            height,
            workers = regions.len(),
            "convolving image"
        );

        if !regions.is_empty() {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(regions.len())
                .thread_name(|index| format!("laplacian-worker-{index}"))
                .build()
                .map_err(|e| EdgeError::WorkerFailure(format!("cannot start workers: {e}")))?;

            let job = &job;
            panic::catch_unwind(AssertUnwindSafe(|| {
                pool.scope(|scope| {
                    for (partition, region) in regions {
                        scope.spawn(move |_| job(source, partition, region));
                    }
                })
            }))
            .map_err(|payload| EdgeError::WorkerFailure(panic_message(payload.as_ref())))?;
        }

        Ok(Convolved {
            image: destination,
            elapsed: start.elapsed(),
        })
    }
}

/// Cuts `bytes` into one region per non-empty partition, in partition order.
fn split_regions<'a>(
    mut bytes: &'a mut [u8],
    partitions: &[Partition],
) -> Vec<(Partition, &'a mut [u8])> {
    let mut regions = Vec::with_capacity(partitions.len());
    for &partition in partitions {
        let (region, rest) = std::mem::take(&mut bytes).split_at_mut(partition.size * CHANNELS);
        bytes = rest;
        if !partition.is_empty() {
            regions.push((partition, region));
        }
    }
    regions
}

/// Worker body: fills `region` with the kernel output for every index in `partition`.
fn convolve_region(source: &PixelBuffer, partition: Partition, region: &mut [u8]) {
    for (index, out) in partition.range().zip(region.chunks_exact_mut(CHANNELS)) {
        out.copy_from_slice(&kernel::apply_at_index(source, index).channels());
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "worker panicked".to_string()
    }
}
