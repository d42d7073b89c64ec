/*
 * commands/mod.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Command implementations.
 */

//! Command implementations for the mjml-preview CLI
//!
//! Each command module handles the CLI interface and delegates to
//! mjml-preview-core for the actual work.

pub mod preview;
pub mod render;
