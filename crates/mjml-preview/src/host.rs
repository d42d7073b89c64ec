/*
 * host.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Preview host that writes previews to a file.
 */

//! A [`PreviewHost`] for the terminal: the "preview surface" is an HTML file
//! on disk that a browser can keep open and reload.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};

use mjml_preview_core::{DisplayHints, HostError, PreviewHost, PreviewId};

#[derive(Debug, Clone)]
pub struct FileHost {
    output: PathBuf,
}

impl FileHost {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
        }
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    async fn write(&self, content: &str) -> Result<(), HostError> {
        if let Some(dir) = self.output.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::write(&self.output, content).await?;
        Ok(())
    }
}

#[async_trait]
impl PreviewHost for FileHost {
    async fn request_display(
        &self,
        preview: &PreviewId,
        content: &str,
        hints: &DisplayHints,
    ) -> Result<(), HostError> {
        self.write(content).await?;
        info!(
            preview = %preview,
            output = %self.output.display(),
            "{}",
            hints.title
        );
        Ok(())
    }

    async fn show_notice(&self, content: &str, hints: &DisplayHints) -> Result<(), HostError> {
        self.write(content).await?;
        info!(output = %self.output.display(), "{}", hints.title);
        Ok(())
    }

    async fn release(&self, preview: &PreviewId) -> Result<(), HostError> {
        debug!(preview = %preview, "Preview released");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mjml_preview_core::{IdentityRegistry, SourceId};
    use tempfile::TempDir;

    fn hints() -> DisplayHints {
        DisplayHints {
            preserve_focus: true,
            title: "MJML Preview - a.mjml".to_string(),
        }
    }

    #[tokio::test]
    async fn test_display_overwrites_output() {
        let temp = TempDir::new().unwrap();
        let host = FileHost::new(temp.path().join("preview/a.html"));
        let preview = IdentityRegistry::new().ensure(&SourceId::from_uri("file:///mail/a.mjml"));

        host.request_display(&preview, "first", &hints()).await.unwrap();
        host.request_display(&preview, "second", &hints()).await.unwrap();

        assert_eq!(std::fs::read_to_string(host.output()).unwrap(), "second");
    }

    #[tokio::test]
    async fn test_unwritable_output_is_a_host_error() {
        let temp = TempDir::new().unwrap();
        // The output path is an existing directory.
        let host = FileHost::new(temp.path());

        let err = host.show_notice("x", &hints()).await.unwrap_err();
        assert!(err.to_string().starts_with("Host error"));
    }
}
