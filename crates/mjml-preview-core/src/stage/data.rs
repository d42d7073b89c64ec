/*
 * stage/data.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Pipeline data types that flow between stages.
 */

//! Data types for the render pipeline.
//!
//! Every state a document passes through is a variant of [`PipelineData`].
//! All of them are text; the variant records which transformations the text
//! has already been through:
//!
//! 1. `Source` - the document as the editor holds it
//! 2. `Expanded` - after template expansion
//! 3. `Localized` - after translation and evaluation, ready for the compiler
//! 4. `Compiled` - HTML produced by the markup compiler
//! 5. `Linked` - HTML with relative resource links resolved

/// Type tag for pipeline data variants.
///
/// Used for runtime validation of stage composition without
/// matching on the full data enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineDataKind {
    Source,
    Expanded,
    Localized,
    Compiled,
    Linked,
}

impl std::fmt::Display for PipelineDataKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PipelineDataKind::Source => "Source",
            PipelineDataKind::Expanded => "Expanded",
            PipelineDataKind::Localized => "Localized",
            PipelineDataKind::Compiled => "Compiled",
            PipelineDataKind::Linked => "Linked",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineData {
    Source(String),
    Expanded(String),
    Localized(String),
    Compiled(String),
    Linked(String),
}

impl PipelineData {
    /// Get the kind of this data without matching on contents.
    pub fn kind(&self) -> PipelineDataKind {
        match self {
            Self::Source(_) => PipelineDataKind::Source,
            Self::Expanded(_) => PipelineDataKind::Expanded,
            Self::Localized(_) => PipelineDataKind::Localized,
            Self::Compiled(_) => PipelineDataKind::Compiled,
            Self::Linked(_) => PipelineDataKind::Linked,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Source(t)
            | Self::Expanded(t)
            | Self::Localized(t)
            | Self::Compiled(t)
            | Self::Linked(t) => t,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Self::Source(t)
            | Self::Expanded(t)
            | Self::Localized(t)
            | Self::Compiled(t)
            | Self::Linked(t) => t,
        }
    }
}
