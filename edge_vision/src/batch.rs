// THEORY:
// The `batch` module is the top-level API: it takes a list of input files and drives
// each one through decode -> convolve -> encode/persist, all images concurrently.
//
// Key architectural principles:
// 1.  **One task per image**: Each image runs on its own blocking task. The pipeline
//     inside is synchronous and CPU-bound, so it belongs on real OS threads rather than
//     on the async workers.
// 2.  **Failure isolation**: A failing image (bad header, unreadable file, panicking
//     worker) becomes an `ImageOutcome` carrying the error. Sibling images are never
//     cancelled, and the report is only produced after every image was attempted.
// 3.  **One contended datum**: The `ElapsedTimeAccumulator` is the only shared mutable
//     state. It is locked for the duration of a single addition, never across I/O or
//     convolution.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::config::EdgeConfig;
use crate::core_modules::codec;
use crate::engine::ConvolutionEngine;
use crate::error::{EdgeError, Result};

/// One input file and the output it produces. Consumed by exactly one image task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageTask {
    pub input: PathBuf,
    pub output: PathBuf,
}

impl ImageTask {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
        }
    }

    /// Pairs each input with `config.output_path(n)`, `n` being its 1-based position.
    pub fn from_inputs<P: AsRef<Path>>(inputs: &[P], config: &EdgeConfig) -> Vec<ImageTask> {
        inputs
            .iter()
            .enumerate()
            .map(|(i, input)| ImageTask::new(input.as_ref(), config.output_path(i + 1)))
            .collect()
    }
}

/// Total convolution time across a batch.
#[derive(Debug, Default)]
pub struct ElapsedTimeAccumulator {
    total: Mutex<Duration>,
}

impl ElapsedTimeAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, elapsed: Duration) {
        // The guarded value is a plain sum, so a poisoned lock is still consistent.
        let mut total = self.total.lock().unwrap_or_else(PoisonError::into_inner);
        *total += elapsed;
    }

    pub fn total(&self) -> Duration {
        *self.total.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// What happened to one image. `Ok` holds its convolution time.
#[derive(Debug)]
pub struct ImageOutcome {
    pub task: ImageTask,
    pub result: Result<Duration>,
}

impl ImageOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Per-image outcomes in input order, plus the accumulated convolution time of the
/// images that succeeded.
#[derive(Debug)]
pub struct BatchReport {
    pub outcomes: Vec<ImageOutcome>,
    pub total_elapsed: Duration,
}

impl BatchReport {
    pub fn successes(&self) -> impl Iterator<Item = &ImageOutcome> {
        self.outcomes.iter().filter(|outcome| outcome.is_success())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&ImageTask, &EdgeError)> {
        self.outcomes
            .iter()
            .filter_map(|outcome| outcome.result.as_ref().err().map(|e| (&outcome.task, e)))
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }

    pub fn total_elapsed_seconds(&self) -> f64 {
        self.total_elapsed.as_secs_f64()
    }

    /// The total time in seconds if every image succeeded.
    pub fn into_result(self) -> std::result::Result<f64, BatchFailure> {
        let total_elapsed = self.total_elapsed_seconds();
        let failed: Vec<(PathBuf, EdgeError)> = self
            .outcomes
            .into_iter()
            .filter_map(|outcome| outcome.result.err().map(|e| (outcome.task.input, e)))
            .collect();
        if failed.is_empty() {
            Ok(total_elapsed)
        } else {
            Err(BatchFailure {
                failed,
                total_elapsed,
            })
        }
    }
}

/// At least one image of a batch failed.
#[derive(Debug)]
pub struct BatchFailure {
    pub failed: Vec<(PathBuf, EdgeError)>,
    /// Time accumulated by the images that did succeed.
    pub total_elapsed: f64,
}

impl fmt::Display for BatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} image(s) failed:", self.failed.len())?;
        for (input, error) in &self.failed {
            write!(f, "\n  {}: {error}", input.display())?;
        }
        Ok(())
    }
}

impl std::error::Error for BatchFailure {}

/// Runs the edge filter over a set of images concurrently.
#[derive(Debug, Clone)]
pub struct BatchRunner {
    engine: Arc<ConvolutionEngine>,
}

impl BatchRunner {
    pub fn new(config: &EdgeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            engine: Arc::new(ConvolutionEngine::new(config.worker_count)?),
        })
    }

    /// Processes every task and waits for all of them before reporting.
    pub async fn run(&self, tasks: Vec<ImageTask>) -> BatchReport {
        self.run_with(tasks, process_image).await
    }

    /// `run` with the per-image pipeline supplied by the caller.
    async fn run_with<F>(&self, tasks: Vec<ImageTask>, process: F) -> BatchReport
    where
        F: Fn(&ConvolutionEngine, &ImageTask) -> Result<Duration> + Send + Sync + 'static,
    {
        debug!(
            images = tasks.len(),
            workers = self.engine.worker_count(),
            "starting batch"
        );
        let accumulator = Arc::new(ElapsedTimeAccumulator::new());
        let process = Arc::new(process);

        let handles = tasks.into_iter().map(|task| {
            let engine = Arc::clone(&self.engine);
            let accumulator = Arc::clone(&accumulator);
            let process = Arc::clone(&process);
            let handle_task = task.clone();
            let handle = tokio::task::spawn_blocking(move || {
                let result = (*process)(engine.as_ref(), &task);
                if let Ok(elapsed) = result {
                    accumulator.add(elapsed);
                }
                result
            });
            async move { (handle_task, handle.await) }
        });

        let outcomes = join_all(handles)
            .await
            .into_iter()
            .map(|(task, joined)| {
                let result = joined.unwrap_or_else(|e| {
                    Err(EdgeError::WorkerFailure(format!("image task did not complete: {e}")))
                });
                match &result {
                    Ok(elapsed) => info!(
                        input = %task.input.display(),
                        output = %task.output.display(),
                        elapsed_secs = elapsed.as_secs_f64(),
                        "image filtered"
                    ),
                    Err(error) => warn!(input = %task.input.display(), %error, "image failed"),
                }
                ImageOutcome { task, result }
            })
            .collect();

        BatchReport {
            outcomes,
            total_elapsed: accumulator.total(),
        }
    }
}

/// Decode, convolve, persist. Any stage failure stops this image before its output
/// file is created.
fn process_image(engine: &ConvolutionEngine, task: &ImageTask) -> Result<Duration> {
    let source = codec::read_image(&task.input)?;
    let convolved = engine.run(&source)?;
    codec::write_image(&convolved.image, &task.output)?;
    Ok(convolved.elapsed)
}
