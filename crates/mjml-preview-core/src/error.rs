/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Error types for mjml-preview-core.
 */

//! Error types for mjml-preview-core.
//!
//! Render failures are not errors in this crate: they travel as
//! [`RenderFailure`](crate::render::RenderFailure) data. The types here cover
//! configuration loading and the host collaborator.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PreviewError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse preview config: {0}")]
    ConfigParse(String),

    #[error("Invalid context data: {0}")]
    ContextData(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PreviewError {
    /// Create a read error for `path`.
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, PreviewError>;

/// Error reported by the host when it cannot show or release a preview.
#[derive(Error, Debug)]
#[error("Host error: {message}")]
pub struct HostError {
    pub message: String,
}

impl HostError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for HostError {
    fn from(e: std::io::Error) -> Self {
        Self::new(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_error_names_path() {
        let err = PreviewError::read(
            "/tmp/missing.json",
            std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        );
        let msg = err.to_string();
        assert!(msg.contains("/tmp/missing.json"));
        assert!(msg.contains("not found"));
    }

    #[test]
    fn test_host_error_from_io() {
        let err: HostError =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into();
        assert!(err.to_string().contains("denied"));
    }
}
