/*
 * render.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Render command implementation
 */

//! Render command implementation.
//!
//! Runs the render pipeline once. On success the HTML is written to the
//! output; on failure the diagnostics page is written in its place and the
//! process exits with status 1, so scripts can tell the two apart.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing::{debug, error, info};

use mjml_preview_core::links::directory_url;
use mjml_preview_core::{RenderContext, RenderPipeline, RenderResult, Renderer, format_failure};

use crate::options::{context_data, load_config};

/// Arguments for the render command
#[derive(Debug)]
pub struct RenderArgs {
    pub file: PathBuf,
    /// Output file; stdout when `None` or `-`
    pub output: Option<PathBuf>,
    pub data: Option<String>,
    pub config: Option<PathBuf>,
    pub locale: Option<String>,
    pub minify: bool,
    pub beautify: bool,
}

/// Execute the render command
pub async fn execute(args: RenderArgs) -> Result<ExitCode> {
    if !args.file.exists() {
        anyhow::bail!("Input file does not exist: {}", args.file.display());
    }

    let mut config = load_config(args.config.as_deref(), &args.file)?;
    if let Some(locale) = args.locale {
        config.locale = locale;
    }
    config.minify |= args.minify;
    config.beautify |= args.beautify;

    let data = context_data(args.data.as_deref())?;
    let text = tokio::fs::read_to_string(&args.file)
        .await
        .with_context(|| format!("Failed to read input file {}", args.file.display()))?;

    debug!(file = %args.file.display(), locale = %config.locale, "Rendering");

    let pipeline = RenderPipeline::from_config(&config);
    let ctx = RenderContext::new(text.as_str(), args.file.as_path())
        .with_context_data(config.merged_context(&data))
        .with_minify(config.minify)
        .with_beautify(config.beautify);

    let (content, status) = match pipeline.render(&ctx).await {
        RenderResult::Success { markup } => (markup, ExitCode::SUCCESS),
        RenderResult::Failure(failure) => {
            error!(file = %args.file.display(), error = %failure, "Render failed");
            let page = format_failure(&failure, Some(&text), directory_url(&args.file).as_deref());
            (page, ExitCode::FAILURE)
        }
    };

    write_output(args.output.as_deref(), &content).await?;
    Ok(status)
}

async fn write_output(output: Option<&Path>, content: &str) -> Result<()> {
    match output {
        Some(path) if path != Path::new("-") => {
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(dir)
                    .await
                    .with_context(|| format!("Failed to create {}", dir.display()))?;
            }
            tokio::fs::write(path, content)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Output: {}", path.display());
        }
        _ => {
            use tokio::io::AsyncWriteExt;
            let mut stdout = tokio::io::stdout();
            stdout.write_all(content.as_bytes()).await?;
            stdout.flush().await?;
        }
    }
    Ok(())
}
