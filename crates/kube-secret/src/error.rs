//! Error types for loading, munging and writing secret manifests

use std::path::PathBuf;
use thiserror::Error;

/// Everything that can go wrong between reading a manifest and writing it back
#[derive(Error, Debug)]
pub enum SecretError {
    #[error("failed to parse yaml: {0}")]
    Parse(String),

    #[error("yaml does not have a `kind`")]
    MissingKind,

    #[error("yaml `kind` is {0:?}, expected 'Secret'")]
    WrongKind(String),

    /// `field` is already human-formatted, e.g. "yaml `data`" or "secret \"user\""
    #[error("{field} is {value}, expected {expected}")]
    WrongType {
        field: String,
        value: String,
        expected: &'static str,
    },

    #[error("secret {key:?} is {value:?}, failed to decode base64: {source}")]
    Base64Decode {
        key: String,
        value: String,
        #[source]
        source: base64::DecodeError,
    },

    #[error("secret {key:?} does not decode to UTF-8 text")]
    InvalidUtf8 { key: String },

    #[error("invalid state: data not loaded")]
    NotLoaded,

    #[error("failed to render yaml: {0}")]
    Render(#[source] serde_yaml::Error),

    #[error("error invoking {editor:?}: {reason}")]
    Editor { editor: String, reason: String },

    #[error("IO error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Stream(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SecretError>;

impl SecretError {
    /// Attach a path to a raw IO error
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SecretError::Io {
            path: path.into(),
            source,
        }
    }

    /// True for the errors that mean "this file is not a Secret"
    pub fn is_shape_error(&self) -> bool {
        matches!(self, SecretError::MissingKind | SecretError::WrongKind(_))
    }
}
