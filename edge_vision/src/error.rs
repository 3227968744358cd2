// THEORY:
// Every failure the engine can produce is one variant of `EdgeError`. The batch
// layer captures these per image, so a variant must carry enough context to be
// reported on its own (which header line, how many bytes, which file).

use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EdgeError>;

#[derive(Debug, Error)]
pub enum EdgeError {
    /// Wrong or missing format tag, or a malformed header line.
    #[error("invalid image format: {0}")]
    Format(String),

    /// The max-channel-value line is anything other than `255`.
    #[error("unsupported max channel value `{found}` (only 255 is accepted)")]
    Value { found: String },

    #[error("truncated pixel data: expected {expected} bytes, found {actual}")]
    TruncatedInput { expected: usize, actual: usize },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    /// A partition worker (or the image task hosting it) did not complete.
    #[error("convolution worker failed: {0}")]
    WorkerFailure(String),
}

impl EdgeError {
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        EdgeError::Io {
            context: context.into(),
            source,
        }
    }
}
