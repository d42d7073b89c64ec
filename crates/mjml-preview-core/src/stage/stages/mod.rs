/*
 * stage/stages/mod.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Concrete pipeline stage implementations.
 */

//! Concrete pipeline stage implementations.
//!
//! - [`ExpandTemplateStage`] - Expand template syntax against the context data
//! - [`LocalizeStage`] - Translate UI-description markup, keeping style blocks intact
//! - [`CompileMarkupStage`] - Compile MJML to HTML through a [`MarkupCompiler`](crate::compiler::MarkupCompiler)
//! - [`FixLinksStage`] - Resolve relative resource links against the source directory

mod compile_markup;
mod expand_template;
mod fix_links;
mod localize;

pub use compile_markup::CompileMarkupStage;
pub use expand_template::ExpandTemplateStage;
pub use fix_links::FixLinksStage;
pub use localize::LocalizeStage;
