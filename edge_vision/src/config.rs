// Run configuration shared by the batch runner and the binary.

use std::path::{Path, PathBuf};

use crate::error::{EdgeError, Result};

pub const DEFAULT_WORKER_COUNT: usize = 4;
pub const DEFAULT_OUTPUT_PREFIX: &str = "laplacian";
pub const OUTPUT_EXTENSION: &str = "ppm";

/// Configuration for a batch run, allowing for tunable behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeConfig {
    /// Partition workers per image convolution.
    pub worker_count: usize,
    /// Directory the filtered images are written to.
    pub output_dir: PathBuf,
    /// File stem prefix; the Nth input becomes `<prefix>N.ppm`.
    pub output_prefix: String,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            worker_count: DEFAULT_WORKER_COUNT,
            output_dir: PathBuf::from("."),
            output_prefix: DEFAULT_OUTPUT_PREFIX.to_string(),
        }
    }
}

impl EdgeConfig {
    pub fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    pub fn with_output_dir(mut self, output_dir: impl AsRef<Path>) -> Self {
        self.output_dir = output_dir.as_ref().to_path_buf();
        self
    }

    pub fn with_output_prefix(mut self, output_prefix: impl Into<String>) -> Self {
        self.output_prefix = output_prefix.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.worker_count == 0 {
            return Err(EdgeError::Config("worker count must be at least 1".into()));
        }
        if self.output_prefix.is_empty() {
            return Err(EdgeError::Config("output prefix must not be empty".into()));
        }
        if self.output_prefix.contains(std::path::is_separator) {
            return Err(EdgeError::Config(format!(
                "output prefix `{}` must not contain a path separator",
                self.output_prefix
            )));
        }
        Ok(())
    }

    /// Output path for the input at 1-based `position` on the command line.
    pub fn output_path(&self, position: usize) -> PathBuf {
        self.output_dir
            .join(format!("{}{position}.{OUTPUT_EXTENSION}", self.output_prefix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = EdgeConfig::default();
        assert_eq!(config.worker_count, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_zero_workers_and_bad_prefixes() {
        let zero = EdgeConfig::default().with_worker_count(0);
        assert!(matches!(zero.validate(), Err(EdgeError::Config(_))));

        let empty = EdgeConfig::default().with_output_prefix("");
        assert!(matches!(empty.validate(), Err(EdgeError::Config(_))));

        let nested = EdgeConfig::default().with_output_prefix("out/laplacian");
        assert!(matches!(nested.validate(), Err(EdgeError::Config(_))));
    }

    #[test]
    fn output_names_follow_argument_position() {
        let config = EdgeConfig::default().with_output_dir("/tmp/edges");
        assert_eq!(config.output_path(1), PathBuf::from("/tmp/edges/laplacian1.ppm"));
        assert_eq!(config.output_path(12), PathBuf::from("/tmp/edges/laplacian12.ppm"));
    }
}
