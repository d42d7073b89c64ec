/*
 * registry.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Identity registry binding source documents to preview artifacts.
 */

//! Identity registry.
//!
//! A partial bijection between [`SourceId`] and [`PreviewId`]. Each entry also
//! owns the document's [`RenderSlot`], so dropping an entry drops its cached
//! result with it. Every operation takes the registry lock once, so callers
//! never observe one side of the mapping without the other.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::cache::RenderSlot;
use crate::identity::{PreviewId, SourceId};

/// One bound document.
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    pub source: SourceId,
    pub preview: PreviewId,
    pub render: Arc<RenderSlot>,
}

#[derive(Debug, Default)]
struct Maps {
    by_source: HashMap<SourceId, RegistryEntry>,
    by_preview: HashMap<PreviewId, SourceId>,
}

/// Owned registry service; construct one per preview subsystem.
#[derive(Debug, Default)]
pub struct IdentityRegistry {
    inner: Mutex<Maps>,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the preview bound to `source`, allocating one if needed.
    pub fn ensure(&self, source: &SourceId) -> PreviewId {
        self.ensure_entry(source).preview
    }

    /// Like [`ensure`](Self::ensure) but returns the full entry.
    pub fn ensure_entry(&self, source: &SourceId) -> RegistryEntry {
        let mut maps = self.inner.lock();
        if let Some(entry) = maps.by_source.get(source) {
            return entry.clone();
        }

        let mut preview = PreviewId::new_random();
        while maps.by_preview.contains_key(&preview) {
            preview = PreviewId::new_random();
        }
        let entry = RegistryEntry {
            source: source.clone(),
            preview,
            render: Arc::new(RenderSlot::new()),
        };
        maps.by_preview.insert(preview, source.clone());
        maps.by_source.insert(source.clone(), entry.clone());
        debug!(source = %source, preview = %preview, "Allocated preview");
        entry
    }

    pub fn lookup(&self, source: &SourceId) -> Option<PreviewId> {
        self.inner.lock().by_source.get(source).map(|e| e.preview)
    }

    pub fn entry(&self, source: &SourceId) -> Option<RegistryEntry> {
        self.inner.lock().by_source.get(source).cloned()
    }

    /// Reverse lookup.
    pub fn source_for(&self, preview: &PreviewId) -> Option<SourceId> {
        self.inner.lock().by_preview.get(preview).cloned()
    }

    /// Drop the entry for `source`, returning the freed preview.
    pub fn remove(&self, source: &SourceId) -> Option<PreviewId> {
        let mut maps = self.inner.lock();
        let entry = maps.by_source.remove(source)?;
        maps.by_preview.remove(&entry.preview);
        debug!(source = %source, preview = %entry.preview, "Released preview");
        Some(entry.preview)
    }

    /// Drop every entry, returning the freed pairs.
    pub fn clear(&self) -> Vec<(SourceId, PreviewId)> {
        let mut maps = self.inner.lock();
        maps.by_preview.clear();
        maps.by_source
            .drain()
            .map(|(source, entry)| (source, entry.preview))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().by_source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
