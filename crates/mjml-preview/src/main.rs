/*
 * main.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * mjml-preview CLI entry point.
 */

//! mjml-preview - render and live-preview MJML email templates.
//!
//! `render` runs the pipeline once. `preview` binds the file to a preview
//! session and re-renders it on every save, writing the result to an HTML
//! file that any browser can keep open.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod host;
mod options;
mod watch;

#[derive(Parser)]
#[command(name = "mjml-preview")]
#[command(version, about = "Render and preview MJML email templates", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a template once
    Render {
        /// Template file
        file: PathBuf,

        /// Write output to FILE (stdout when omitted or '-')
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Template variables as a JSON object
        #[arg(long)]
        data: Option<String>,

        /// Preview config file (default: .mjml-preview.json next to FILE)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Locale for the localization pass
        #[arg(long)]
        locale: Option<String>,

        /// Minify the compiled HTML
        #[arg(long)]
        minify: bool,

        /// Beautify the compiled HTML
        #[arg(long)]
        beautify: bool,
    },

    /// Render a template and re-render it whenever it is saved
    Preview {
        /// Template file
        file: PathBuf,

        /// Write the preview to FILE (default: <FILE>.preview.html)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Template variables as a JSON object
        #[arg(long)]
        data: Option<String>,

        /// Preview config file (default: .mjml-preview.json next to FILE)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Quiet period before a burst of file changes triggers a render
        #[arg(long, default_value_t = watch::DEFAULT_DEBOUNCE_MS)]
        debounce_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mjml_preview=info,mjml_preview_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            file,
            output,
            data,
            config,
            locale,
            minify,
            beautify,
        } => {
            commands::render::execute(commands::render::RenderArgs {
                file,
                output,
                data,
                config,
                locale,
                minify,
                beautify,
            })
            .await
        }
        Commands::Preview {
            file,
            output,
            data,
            config,
            debounce_ms,
        } => {
            commands::preview::execute(commands::preview::PreviewArgs {
                file,
                output,
                data,
                config,
                debounce_ms,
            })
            .await
        }
    }
}
