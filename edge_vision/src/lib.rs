// THEORY:
// This file is the main entry point for the `edge_vision` library crate. It exports
// the batch runner and its configuration as the high-level interface, and the
// leaf components (`core_modules`) and the `ConvolutionEngine` for callers that
// want to filter a single in-memory image.
//
// Data flow: file bytes -> codec::decode -> PixelBuffer -> ConvolutionEngine
// (partition::plan + kernel::apply) -> PixelBuffer -> codec::encode -> file bytes.

pub mod batch;
pub mod config;
pub mod core_modules;
pub mod engine;
pub mod error;

pub use batch::{BatchFailure, BatchReport, BatchRunner, ElapsedTimeAccumulator, ImageOutcome, ImageTask};
pub use config::EdgeConfig;
pub use core_modules::pixel::pixel::{Pixel, PixelBuffer};
pub use engine::{ConvolutionEngine, Convolved};
pub use error::{EdgeError, Result};
