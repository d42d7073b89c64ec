/*
 * cache.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Per-document render cache and invalidation.
 */

//! Per-document render cache.
//!
//! Each bound document owns a [`RenderSlot`]. A slot keeps a generation
//! counter that [`invalidate`](RenderSlot::invalidate) bumps, plus the last
//! result tagged with the generation it was rendered for. The result is
//! fresh while the two generations agree.
//!
//! Renders for one slot are serialized by an async mutex held for the whole
//! render. Before waiting, every request records its context together with
//! the generation it was made at; the slot keeps only the newest one. A
//! caller that arrives while a render is in flight waits for it; if no
//! invalidation happened in the meantime it receives the in-flight result,
//! otherwise the first waiter performs exactly one follow-up render of the
//! newest recorded context and later waiters receive that.
//!
//! A result is always tagged with the generation its context was recorded
//! at, never a later one. A render that was superseded while in flight is
//! therefore stale as soon as it is stored.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use tracing::debug;

use crate::identity::SourceId;
use crate::registry::IdentityRegistry;
use crate::render::{RenderContext, RenderResult, Renderer};

#[derive(Debug, Default)]
pub struct RenderSlot {
    generation: AtomicU64,
    cached: parking_lot::Mutex<Option<(u64, RenderResult)>>,
    /// Newest requested context not yet rendered.
    pending: parking_lot::Mutex<Option<(u64, RenderContext)>>,
    renders: AtomicUsize,
    in_flight: tokio::sync::Mutex<()>,
}

impl RenderSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the cached result stale. The result itself is kept.
    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    pub fn is_fresh(&self) -> bool {
        let generation = self.generation.load(Ordering::SeqCst);
        matches!(&*self.cached.lock(), Some((g, _)) if *g == generation)
    }

    /// The last stored result, fresh or not.
    pub fn last_result(&self) -> Option<RenderResult> {
        self.cached.lock().as_ref().map(|(_, r)| r.clone())
    }

    /// How many times this slot has invoked its renderer.
    pub fn render_count(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }

    pub fn is_rendering(&self) -> bool {
        self.in_flight.try_lock().is_err()
    }

    pub async fn get_or_render(&self, ctx: &RenderContext, renderer: &dyn Renderer) -> RenderResult {
        let requested = self.generation.load(Ordering::SeqCst);
        {
            let mut pending = self.pending.lock();
            if pending.as_ref().is_none_or(|(g, _)| *g <= requested) {
                *pending = Some((requested, ctx.clone()));
            }
        }

        let _guard = self.in_flight.lock().await;

        let current = self.generation.load(Ordering::SeqCst);
        if let Some((cached_generation, result)) = &*self.cached.lock()
            && *cached_generation == current
        {
            let mut pending = self.pending.lock();
            if pending.as_ref().is_some_and(|(g, _)| *g <= current) {
                *pending = None;
            }
            debug!(generation = current, "Render cache hit");
            return result.clone();
        }

        let next = self.pending.lock().take();
        let (generation, target) = match next {
            Some(next) => next,
            None => {
                // Our context was taken by an earlier waiter; its result
                // covers our request even if it went stale since.
                if let Some((cached_generation, result)) = &*self.cached.lock()
                    && *cached_generation >= requested
                {
                    return result.clone();
                }
                (requested, ctx.clone())
            }
        };

        debug!(generation, current, "Render cache miss");
        self.renders.fetch_add(1, Ordering::SeqCst);
        let result = renderer.render(&target).await;
        *self.cached.lock() = Some((generation, result.clone()));
        result
    }
}

/// Cache layer keyed by [`SourceId`], backed by the registry's slots.
#[derive(Debug, Clone)]
pub struct RenderCache {
    registry: Arc<IdentityRegistry>,
}

impl RenderCache {
    pub fn new(registry: Arc<IdentityRegistry>) -> Self {
        Self { registry }
    }

    /// Return the fresh result for `source` or render a new one.
    ///
    /// A source with no registry entry is bound on first use.
    pub async fn get_or_render(
        &self,
        source: &SourceId,
        ctx: &RenderContext,
        renderer: &dyn Renderer,
    ) -> RenderResult {
        let entry = self.registry.ensure_entry(source);
        entry.render.get_or_render(ctx, renderer).await
    }

    /// Mark `source` stale. Returns `false` if it has no entry.
    pub fn invalidate(&self, source: &SourceId) -> bool {
        match self.registry.entry(source) {
            Some(entry) => {
                entry.render.invalidate();
                debug!(source = %source, "Invalidated render");
                true
            }
            None => false,
        }
    }

    pub fn is_fresh(&self, source: &SourceId) -> bool {
        self.registry
            .entry(source)
            .is_some_and(|entry| entry.render.is_fresh())
    }

    pub fn render_count(&self, source: &SourceId) -> usize {
        self.registry
            .entry(source)
            .map_or(0, |entry| entry.render.render_count())
    }
}
