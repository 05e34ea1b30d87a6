//! Error types shared across pipeline stages.
//!
//! Stage implementations use [`Error`] internally and convert it into a
//! [`crate::report::model::StageResult`] at the stage boundary. Nothing
//! propagates past the pipeline controller.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("project directory not found: {}", .0.display())]
    ProjectNotFound(PathBuf),

    #[error("permission denied reading project directory: {}", .0.display())]
    PermissionDenied(PathBuf),

    #[error("tool installation failed: {0}")]
    ToolInstall(String),

    #[error("dependency installation failed: {0}")]
    DependencyInstall(String),

    #[error("sbom generation failed: {0}")]
    SbomGeneration(String),

    #[error("sbom validation failed: {0}")]
    Validation(String),

    #[error("command `{command}` timed out after {secs}s")]
    Timeout { command: String, secs: u64 },

    #[error("invalid configuration: {field}: {reason}")]
    Config { field: String, reason: String },

    #[error("io error: {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// The serializable tag recorded on a failed stage.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ProjectNotFound(_) => ErrorKind::ProjectNotFound,
            Error::PermissionDenied(_) => ErrorKind::PermissionDenied,
            Error::ToolInstall(_) => ErrorKind::ToolInstall,
            Error::DependencyInstall(_) => ErrorKind::DependencyInstall,
            Error::SbomGeneration(_) | Error::Io { .. } => ErrorKind::SbomGeneration,
            Error::Validation(_) => ErrorKind::Validation,
            Error::Timeout { .. } => ErrorKind::Timeout,
            Error::Config { .. } => ErrorKind::Config,
        }
    }

    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

/// Error category attached to a failed `StageResult`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ProjectNotFound,
    PermissionDenied,
    ToolInstall,
    DependencyInstall,
    SbomGeneration,
    Validation,
    Timeout,
    Config,
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_serialize_as_snake_case() {
        let s = serde_json::to_string(&ErrorKind::DependencyInstall).unwrap();
        assert_eq!(s, "\"dependency_install\"");
    }

    #[test]
    fn timeout_maps_to_timeout_kind() {
        let err = Error::Timeout {
            command: "uv sync".into(),
            secs: 5,
        };
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(err.to_string(), "command `uv sync` timed out after 5s");
    }
}
