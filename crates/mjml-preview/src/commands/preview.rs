/*
 * preview.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Preview command implementation
 */

//! Preview command implementation.
//!
//! Plays the editor's part for a [`PreviewSession`]: the file is opened in
//! a preview surface (an HTML file), and every debounced change on disk is
//! delivered as a save carrying the file's new text. Ctrl-C closes the
//! surface.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use mjml_preview_core::{Document, HostEvent, IdentityRegistry, PreviewSession, RenderPipeline};

use crate::host::FileHost;
use crate::options::{context_data, load_config};
use crate::watch::{FileWatcher, WatchConfig, WatchEvent};

/// Arguments for the preview command
#[derive(Debug)]
pub struct PreviewArgs {
    pub file: PathBuf,
    /// Preview file; `<FILE>.preview.html` when `None`
    pub output: Option<PathBuf>,
    pub data: Option<String>,
    pub config: Option<PathBuf>,
    pub debounce_ms: u64,
}

/// Execute the preview command
pub async fn execute(args: PreviewArgs) -> Result<ExitCode> {
    if !args.file.exists() {
        anyhow::bail!("Input file does not exist: {}", args.file.display());
    }

    let config = load_config(args.config.as_deref(), &args.file)?;
    let data = context_data(args.data.as_deref())?;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output(&args.file));
    let text = tokio::fs::read_to_string(&args.file)
        .await
        .with_context(|| format!("Failed to read input file {}", args.file.display()))?;

    let renderer = Arc::new(RenderPipeline::from_config(&config));
    let host = Arc::new(FileHost::new(&output));
    let session = PreviewSession::new(config, Arc::new(IdentityRegistry::new()), renderer, host);

    let document = Document::infer(&args.file, text).with_data(data);
    let source = document.source.clone();

    if session.preview(document).await.is_none() {
        warn!(file = %args.file.display(), "Not an MJML document, nothing to preview");
        session.handle(HostEvent::SurfaceClosed).await;
        return Ok(ExitCode::FAILURE);
    }

    let token = session
        .subscription(&source)
        .map(|subscription| subscription.token())
        .context("Preview was not bound")?;

    let mut watcher = FileWatcher::new(
        &args.file,
        WatchConfig {
            debounce_ms: args.debounce_ms,
        },
    )?;

    info!(
        input = %watcher.target().display(),
        output = %output.display(),
        "Previewing (Ctrl-C to stop)"
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Stopping preview");
                break;
            }
            _ = token.cancelled() => break,
            event = watcher.recv() => match event {
                Some(WatchEvent::Modified(path)) => match tokio::fs::read_to_string(&path).await {
                    Ok(text) => {
                        session
                            .handle(HostEvent::Saved {
                                source: source.clone(),
                                text,
                            })
                            .await;
                    }
                    // Deleted or mid-replacement; the next event brings the new text.
                    Err(e) => warn!(path = %path.display(), error = %e, "Could not read changed file"),
                },
                None => break,
            },
        }
    }

    session.handle(HostEvent::SurfaceClosed).await;
    Ok(ExitCode::SUCCESS)
}

/// `mail.mjml` -> `mail.mjml.preview.html`, next to the input.
fn default_output(file: &Path) -> PathBuf {
    let mut name = file
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".preview.html");
    file.with_file_name(name)
}
