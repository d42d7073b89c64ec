/*
 * compiler/diagnostics.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Parse mjml validation messages.
 */

//! Parse `mjml` validation output into structured diagnostics.
//!
//! The validator prints one message per line:
//!
//! ```text
//! Line 12 of /mail/welcome.mjml (mj-button) — Attribute colour is illegal
//! ```
//!
//! Lines that do not match (banners, stack traces) are ignored.

use std::sync::LazyLock;

use regex::Regex;

use super::CompilerDiagnostic;

static LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*Line (\d+) of (.*?) \(([^)]*)\) (?:—|-|–) (.+?)\s*$").expect("valid regex")
});

/// Parse every validation message in `stderr`, keeping their order.
pub fn parse_diagnostics(stderr: &str) -> Vec<CompilerDiagnostic> {
    stderr.lines().filter_map(parse_line).collect()
}

fn parse_line(line: &str) -> Option<CompilerDiagnostic> {
    let caps = LINE_RE.captures(line)?;
    let tag_name = caps.get(3).map(|m| m.as_str().to_string());
    Some(CompilerDiagnostic {
        line: caps.get(1).and_then(|m| m.as_str().parse().ok()),
        message: caps.get(4)?.as_str().to_string(),
        tag_name: tag_name.filter(|t| !t.is_empty()),
        formatted_message: line.trim().to_string(),
    })
}
