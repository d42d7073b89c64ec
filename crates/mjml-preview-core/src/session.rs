/*
 * session.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Preview session manager.
 */

//! Preview session manager.
//!
//! A [`PreviewSession`] owns every document-to-preview binding of one
//! preview surface. The host feeds it [`HostEvent`]s; the session decides
//! what to invalidate and what to re-render, and pushes finished documents
//! back through [`PreviewHost::request_display`].
//!
//! Per document the lifecycle is `Unbound → Stale ⇄ Fresh → Unbound`:
//! binding happens on an explicit [`preview`](PreviewSession::preview) (or
//! automatically with `autoPreview`), any invalidation makes the binding
//! stale, a render makes it fresh again whether it succeeded or not, and
//! closing the document or the surface unbinds it.
//!
//! Only the active document is rendered eagerly. Other bound documents are
//! just marked stale and catch up when they become active again.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::RenderCache;
use crate::config::PreviewConfig;
use crate::diagnostics::{format_failure, format_message};
use crate::error::HostError;
use crate::identity::{PreviewId, SourceId};
use crate::links::directory_url;
use crate::registry::IdentityRegistry;
use crate::render::{RenderContext, RenderResult, Renderer};

/// Shown when the active document is not MJML.
pub const NOT_MJML_MESSAGE: &str = "Active editor doesn't show a MJML document.";

/// Language kind of documents the session renders.
pub const MJML_KIND: &str = "mjml";

/// A document as the host knows it.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub source: SourceId,
    pub path: PathBuf,
    /// Host language identifier, `mjml` for renderable documents.
    pub kind: String,
    pub text: String,
    /// Template variables specific to this document. They override the
    /// configured `contextData`.
    pub data: Map<String, Value>,
}

impl Document {
    pub fn new(path: impl Into<PathBuf>, kind: impl Into<String>, text: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            source: SourceId::from_path(&path),
            path,
            kind: kind.into(),
            text: text.into(),
            data: Map::new(),
        }
    }

    /// Like [`new`](Self::new), taking the kind from the file extension.
    pub fn infer(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        let path = path.into();
        let kind = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case(MJML_KIND) => MJML_KIND,
            _ => "plaintext",
        };
        Self::new(path, kind, text)
    }

    /// Use a host-provided identity instead of the one derived from the path.
    pub fn with_source(mut self, source: SourceId) -> Self {
        self.source = source;
        self
    }

    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        self.data = data;
        self
    }

    pub fn is_mjml(&self) -> bool {
        self.kind.eq_ignore_ascii_case(MJML_KIND)
    }
}

/// Notifications from the host.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    Opened(Document),
    /// Unsaved content change.
    Changed { source: SourceId, text: String },
    Saved { source: SourceId, text: String },
    Closed(SourceId),
    /// The focused editor changed; `None` when no editor has focus.
    ActiveViewChanged(Option<SourceId>),
    SurfaceOpened,
    SurfaceClosed,
}

/// Event kinds a binding listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Change,
    Save,
    Focus,
}

/// What a binding listens to, and the token that ends it.
///
/// Hosts that run their own watchers per document should stop them when
/// [`token`](Self::token) is cancelled.
#[derive(Debug, Clone)]
pub struct Subscription {
    kinds: Vec<EventKind>,
    token: CancellationToken,
}

impl Subscription {
    fn new(kinds: Vec<EventKind>) -> Self {
        Self {
            kinds,
            token: CancellationToken::new(),
        }
    }

    pub fn listens_to(&self, kind: EventKind) -> bool {
        self.kinds.contains(&kind)
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    fn cancel(&self) {
        self.token.cancel();
    }
}

/// Cache state of one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingState {
    Unbound,
    Stale,
    Fresh,
}

/// Presentation hints passed through to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayHints {
    pub preserve_focus: bool,
    pub title: String,
}

/// The host side of the preview surface.
#[async_trait]
pub trait PreviewHost: Send + Sync {
    /// Show `content` as the preview of a bound document.
    async fn request_display(
        &self,
        preview: &PreviewId,
        content: &str,
        hints: &DisplayHints,
    ) -> Result<(), HostError>;

    /// Show surface-level content not tied to a binding, such as the
    /// "not an MJML document" notice.
    async fn show_notice(&self, content: &str, hints: &DisplayHints) -> Result<(), HostError>;

    /// The binding for `preview` is gone.
    async fn release(&self, preview: &PreviewId) -> Result<(), HostError>;
}

#[derive(Debug, Default)]
struct SessionState {
    documents: HashMap<SourceId, Document>,
    subscriptions: HashMap<SourceId, Subscription>,
    active: Option<SourceId>,
    surface_open: bool,
}

/// Drives the registry, cache and renderer from host events.
pub struct PreviewSession {
    config: PreviewConfig,
    registry: Arc<IdentityRegistry>,
    cache: RenderCache,
    renderer: Arc<dyn Renderer>,
    host: Arc<dyn PreviewHost>,
    state: Mutex<SessionState>,
}

impl PreviewSession {
    pub fn new(
        config: PreviewConfig,
        registry: Arc<IdentityRegistry>,
        renderer: Arc<dyn Renderer>,
        host: Arc<dyn PreviewHost>,
    ) -> Self {
        Self {
            config,
            cache: RenderCache::new(registry.clone()),
            registry,
            renderer,
            host,
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn config(&self) -> &PreviewConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<IdentityRegistry> {
        &self.registry
    }

    pub fn is_surface_open(&self) -> bool {
        self.state.lock().surface_open
    }

    pub fn active(&self) -> Option<SourceId> {
        self.state.lock().active.clone()
    }

    pub fn preview_id(&self, source: &SourceId) -> Option<PreviewId> {
        self.registry.lookup(source)
    }

    pub fn state(&self, source: &SourceId) -> BindingState {
        if self.registry.lookup(source).is_none() {
            BindingState::Unbound
        } else if self.cache.is_fresh(source) {
            BindingState::Fresh
        } else {
            BindingState::Stale
        }
    }

    pub fn subscription(&self, source: &SourceId) -> Option<Subscription> {
        self.state.lock().subscriptions.get(source).cloned()
    }

    /// Explicit preview request: open the surface, make `document` active
    /// and show it. Returns the preview it is bound to, or `None` when the
    /// document is not MJML and only the notice was shown.
    pub async fn preview(&self, document: Document) -> Option<PreviewId> {
        let source = document.source.clone();
        let is_mjml = document.is_mjml();
        {
            let mut state = self.state.lock();
            state.surface_open = true;
            state.active = Some(source.clone());
            state.documents.insert(source.clone(), document);
        }

        if !is_mjml {
            self.show_not_mjml().await;
            return None;
        }

        let preview = self.bind(&source);
        self.refresh(&source).await;
        Some(preview)
    }

    /// Apply one host event.
    pub async fn handle(&self, event: HostEvent) {
        match event {
            HostEvent::Opened(document) => self.on_opened(document).await,
            HostEvent::Changed { source, text } => {
                self.on_content(&source, text, EventKind::Change).await
            }
            HostEvent::Saved { source, text } => {
                self.on_content(&source, text, EventKind::Save).await
            }
            HostEvent::Closed(source) => self.on_closed(&source).await,
            HostEvent::ActiveViewChanged(source) => self.on_active_changed(source).await,
            HostEvent::SurfaceOpened => self.on_surface_opened().await,
            HostEvent::SurfaceClosed => self.teardown().await,
        }
    }

    async fn on_opened(&self, document: Document) {
        let source = document.source.clone();
        let auto_bind = document.is_mjml() && self.config.auto_preview;
        let surface_open = {
            let mut state = self.state.lock();
            state.documents.insert(source.clone(), document);
            if auto_bind && state.surface_open {
                state.active = Some(source.clone());
            }
            state.surface_open
        };

        if auto_bind && surface_open {
            self.bind(&source);
            self.refresh(&source).await;
        }
    }

    async fn on_content(&self, source: &SourceId, text: String, kind: EventKind) {
        let (listening, is_active) = {
            let mut state = self.state.lock();
            if let Some(document) = state.documents.get_mut(source) {
                document.text = text;
            }
            let listening = state
                .subscriptions
                .get(source)
                .is_some_and(|s| s.listens_to(kind));
            (listening, state.active.as_ref() == Some(source))
        };

        if !listening {
            return;
        }
        self.cache.invalidate(source);
        if is_active {
            self.refresh(source).await;
        }
    }

    async fn on_closed(&self, source: &SourceId) {
        {
            let mut state = self.state.lock();
            state.documents.remove(source);
            if state.active.as_ref() == Some(source) {
                state.active = None;
            }
        }
        self.unbind(source).await;
    }

    async fn on_active_changed(&self, source: Option<SourceId>) {
        let (surface_open, document) = {
            let mut state = self.state.lock();
            state.active = source.clone();
            let document = source.as_ref().and_then(|s| state.documents.get(s).cloned());
            (state.surface_open, document)
        };

        if !surface_open {
            return;
        }
        let Some(document) = document else {
            return;
        };
        if !document.is_mjml() {
            self.show_not_mjml().await;
            return;
        }

        let bound = self.registry.lookup(&document.source).is_some();
        let listens = self
            .subscription(&document.source)
            .is_some_and(|s| s.listens_to(EventKind::Focus));
        if (bound && listens) || (!bound && self.config.auto_preview) {
            self.bind(&document.source);
            self.refresh(&document.source).await;
        }
    }

    async fn on_surface_opened(&self) {
        let active = {
            let mut state = self.state.lock();
            state.surface_open = true;
            state.active.as_ref().and_then(|s| state.documents.get(s).cloned())
        };

        match active {
            Some(document) if document.is_mjml() => {
                self.bind(&document.source);
                self.refresh(&document.source).await;
            }
            _ => self.show_not_mjml().await,
        }
    }

    /// Close the surface and unbind every document.
    pub async fn teardown(&self) {
        let subscriptions = {
            let mut state = self.state.lock();
            state.surface_open = false;
            std::mem::take(&mut state.subscriptions)
        };
        for subscription in subscriptions.values() {
            subscription.cancel();
        }

        let released = self.registry.clear();
        info!(count = released.len(), "Closed preview surface");
        for (_, preview) in released {
            if let Err(e) = self.host.release(&preview).await {
                warn!(preview = %preview, error = %e, "Failed to release preview");
            }
        }
    }

    /// Subscribed event kinds under the current configuration.
    fn subscribed_events(&self) -> Vec<EventKind> {
        let mut kinds = vec![EventKind::Save, EventKind::Focus];
        if self.config.update_when_typing {
            kinds.push(EventKind::Change);
        }
        kinds
    }

    fn bind(&self, source: &SourceId) -> PreviewId {
        let preview = self.registry.ensure(source);
        let mut state = self.state.lock();
        if !state.subscriptions.contains_key(source) {
            info!(source = %source, preview = %preview, "Bound preview");
            state
                .subscriptions
                .insert(source.clone(), Subscription::new(self.subscribed_events()));
        }
        preview
    }

    async fn unbind(&self, source: &SourceId) {
        if let Some(subscription) = self.state.lock().subscriptions.remove(source) {
            subscription.cancel();
        }
        let Some(preview) = self.registry.remove(source) else {
            return;
        };
        info!(source = %source, preview = %preview, "Unbound preview");
        if let Err(e) = self.host.release(&preview).await {
            warn!(preview = %preview, error = %e, "Failed to release preview");
        }
    }

    /// Render `source` if stale and display the result.
    ///
    /// Returns the result shown, or `None` if nothing was shown: the
    /// document is unknown or unbound, or its render was superseded while
    /// in flight (the render that superseded it displays instead).
    pub async fn refresh(&self, source: &SourceId) -> Option<RenderResult> {
        let document = self.state.lock().documents.get(source).cloned()?;
        let preview = self.registry.lookup(source)?;

        let ctx = RenderContext::new(document.text.clone(), document.path.clone())
            .with_context_data(self.config.merged_context(&document.data))
            .with_minify(self.config.minify)
            .with_beautify(self.config.beautify);

        let result = self
            .cache
            .get_or_render(source, &ctx, self.renderer.as_ref())
            .await;
        if !self.cache.is_fresh(source) {
            debug!(source = %source, "Render superseded, not displaying");
            return None;
        }

        // A waiter may receive the render of newer text than it asked for;
        // position failures against the text the result belongs to.
        let text = self
            .state
            .lock()
            .documents
            .get(source)
            .map_or_else(|| document.text.clone(), |doc| doc.text.clone());
        let content = match &result {
            RenderResult::Success { markup } => markup.clone(),
            RenderResult::Failure(failure) => {
                let base = directory_url(&document.path);
                format_failure(failure, Some(&text), base.as_deref())
            }
        };
        if let Err(e) = self
            .host
            .request_display(&preview, &content, &self.hints(&document.path))
            .await
        {
            warn!(preview = %preview, error = %e, "Failed to display preview");
        }
        Some(result)
    }

    async fn show_not_mjml(&self) {
        let page = format_message(NOT_MJML_MESSAGE, None);
        let hints = DisplayHints {
            preserve_focus: self.config.preserve_focus,
            title: "MJML Preview".to_string(),
        };
        if let Err(e) = self.host.show_notice(&page, &hints).await {
            warn!(error = %e, "Failed to display notice");
        }
    }

    fn hints(&self, path: &Path) -> DisplayHints {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        DisplayHints {
            preserve_focus: self.config.preserve_focus,
            title: format!("MJML Preview - {}", name),
        }
    }
}
