//! Error types for the training pipeline
//!
//! Every variant is fatal: stages propagate the first failure and the run
//! stops.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Connection, query or row decoding failure in the data source
    #[error("data source error: {0}")]
    Source(#[from] sqlx::Error),

    /// A row could not be turned into features
    #[error("feature derivation failed at row {row}: {reason}")]
    Feature { row: usize, reason: String },

    #[error("cannot split dataset: {0}")]
    Split(String),

    #[error("training failed: {0}")]
    Training(String),

    #[error("failed to access model file {path:?}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("model encoding failed: {0}")]
    Encoding(#[from] bincode::Error),

    #[error("unsupported model format version {found} in {path:?} (expected {expected})")]
    UnsupportedFormat {
        path: PathBuf,
        found: u32,
        expected: u32,
    },

    #[error("index request failed: {0}")]
    IndexTransport(#[from] reqwest::Error),

    #[error("index service rejected document ({status}): {body}")]
    IndexRejected { status: u16, body: String },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl PipelineError {
    /// Name of the pipeline stage the error belongs to
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::Source(_) => "load",
            PipelineError::Feature { .. } => "features",
            PipelineError::Split(_) => "split",
            PipelineError::Training(_) => "train",
            PipelineError::Persist { .. }
            | PipelineError::Encoding(_)
            | PipelineError::UnsupportedFormat { .. } => "persist",
            PipelineError::IndexTransport(_) | PipelineError::IndexRejected { .. } => "publish",
            PipelineError::Config(_) => "config",
        }
    }

    pub(crate) fn persist(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Persist {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names() {
        let err = PipelineError::Feature {
            row: 3,
            reason: "missing service".into(),
        };
        assert_eq!(err.stage(), "features");
        assert_eq!(
            err.to_string(),
            "feature derivation failed at row 3: missing service"
        );
        assert_eq!(PipelineError::Split("empty".into()).stage(), "split");
        assert_eq!(
            PipelineError::IndexRejected {
                status: 400,
                body: String::new()
            }
            .stage(),
            "publish"
        );
    }
}
