/*
 * options.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Config and template data shared by the commands.
 */

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::{Map, Value};

use mjml_preview_core::{PreviewConfig, parse_context_data};

/// Load the preview config: the explicit file if given, otherwise the one
/// discovered next to `input`.
pub fn load_config(explicit: Option<&Path>, input: &Path) -> Result<PreviewConfig> {
    match explicit {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Config file does not exist: {}", path.display());
            }
            PreviewConfig::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))
        }
        None => PreviewConfig::discover(&input_dir(input))
            .context("Failed to load preview config"),
    }
}

/// Parse `--data`, if any.
pub fn context_data(data: Option<&str>) -> Result<Map<String, Value>> {
    match data {
        Some(text) => parse_context_data(text).context("Invalid --data"),
        None => Ok(Map::new()),
    }
}

/// Directory containing `input`; `.` for a bare file name.
pub fn input_dir(input: &Path) -> PathBuf {
    match input.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
