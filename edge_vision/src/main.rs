// Command-line driver: filters every file given on the command line and prints the
// total convolution time.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::warn;

use edge_vision::config::{DEFAULT_OUTPUT_PREFIX, DEFAULT_WORKER_COUNT};
use edge_vision::{BatchRunner, EdgeConfig, ImageTask};

#[derive(Parser, Debug)]
#[command(
    name = "edge_detector",
    about = "Apply a 3x3 Laplacian edge filter to binary PPM (P6) images"
)]
struct Args {
    /// Input images; the Nth file is written to `<prefix>N.ppm`.
    #[arg(required = true, value_name = "FILE")]
    inputs: Vec<PathBuf>,
    /// Partition workers per image.
    #[arg(short, long, default_value_t = DEFAULT_WORKER_COUNT)]
    workers: usize,
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,
    #[arg(long, default_value = DEFAULT_OUTPUT_PREFIX)]
    prefix: String,
}

fn total_line(seconds: f64) -> String {
    format!("Total elapsed time: {seconds:.4} s")
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = EdgeConfig::default()
        .with_worker_count(args.workers)
        .with_output_dir(&args.output_dir)
        .with_output_prefix(args.prefix.clone());
    let runner = BatchRunner::new(&config).context("invalid configuration")?;

    let cores = num_cpus::get();
    if config.worker_count > cores {
        warn!(
            workers = config.worker_count,
            cores, "more partition workers than logical CPUs"
        );
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(cores)
        .enable_all()
        .build()
        .context("building tokio runtime")?;

    let tasks = ImageTask::from_inputs(&args.inputs, &config);
    let report = runtime.block_on(runner.run(tasks));

    for (task, error) in report.failures() {
        eprintln!("{}: {error}", task.input.display());
    }
    println!("{}", total_line(report.total_elapsed_seconds()));

    Ok(if report.has_failures() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
