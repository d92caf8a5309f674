//! error types shared across resolution and submission
use crate::transform::TransformationError;
use crate::url_template::MalformedUrl;
use std::path::PathBuf;

/// Failure to turn a configuration into resolved descriptors
///
/// Any of these makes the whole configuration unavailable.
#[derive(thiserror::Error, Debug)]
pub enum ConfigurationError {
    #[error("configuration file does not exist: {}", .0.display())]
    Missing(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unsupported configuration file format: {}", .0.display())]
    UnsupportedFormat(PathBuf),
    #[error("unable to parse configuration file {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },
    #[error("unknown {kind}: `{value}`")]
    UnknownVariant { kind: &'static str, value: String },
    #[error("invalid validation pattern for user field `{field}`")]
    InvalidPattern {
        field: String,
        #[source]
        source: regex::Error,
    },
    #[error("upload to `{url}` uses PUT but has no body")]
    PutWithoutBody { url: String },
    #[error(transparent)]
    MalformedUrl(#[from] MalformedUrl),
}

/// Failure of a single submission
///
/// Never escapes [crate::submit::SubmissionClient::submit]; it is folded
/// into a failed [crate::descriptor::SubmissionOutcome].
#[derive(thiserror::Error, Debug)]
pub enum SubmissionError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    MalformedUrl(#[from] MalformedUrl),
    #[error("unable to serialize suggestion: {0}")]
    Serialization(String),
    #[error(transparent)]
    Transformation(#[from] TransformationError),
    #[error("unable to compress body")]
    Compression(#[source] std::io::Error),
    #[error("{0}")]
    Network(#[from] reqwest::Error),
    #[error("server rejected suggestion: {status}")]
    Rejected { status: reqwest::StatusCode },
}

impl SubmissionError {
    /// Human readable reason reported back to the caller
    ///
    /// For a rejected submission this is the registered reason phrase of the
    /// status code (`Not Found` for 404), not the phrase the server sent. Codes
    /// without a registered phrase are reported as the bare number.
    pub fn reason(&self) -> String {
        match self {
            SubmissionError::Rejected { status } => status
                .canonical_reason()
                .map(str::to_string)
                .unwrap_or_else(|| status.as_u16().to_string()),
            other => other.to_string(),
        }
    }
}
