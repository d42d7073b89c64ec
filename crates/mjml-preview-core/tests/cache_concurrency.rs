/*
 * tests/cache_concurrency.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * At most one render in flight per document.
 */

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::GatedRenderer;
use mjml_preview_core::{IdentityRegistry, RenderCache, RenderContext, RenderResult, SourceId};

struct Harness {
    cache: RenderCache,
    renderer: Arc<GatedRenderer>,
    source: SourceId,
    ctx: RenderContext,
}

impl Harness {
    fn new() -> Self {
        Self {
            cache: RenderCache::new(Arc::new(IdentityRegistry::new())),
            renderer: Arc::new(GatedRenderer::default()),
            source: SourceId::from_uri("file:///mail/a.mjml"),
            ctx: RenderContext::new("body", "/mail/a.mjml"),
        }
    }

    fn request(&self) -> tokio::task::JoinHandle<RenderResult> {
        self.request_with(self.ctx.clone())
    }

    fn request_text(&self, text: &str) -> tokio::task::JoinHandle<RenderResult> {
        self.request_with(RenderContext::new(text, "/mail/a.mjml"))
    }

    fn request_with(&self, ctx: RenderContext) -> tokio::task::JoinHandle<RenderResult> {
        let cache = self.cache.clone();
        let renderer = self.renderer.clone();
        let source = self.source.clone();
        tokio::spawn(async move { cache.get_or_render(&source, &ctx, renderer.as_ref()).await })
    }

    async fn wait_for_renders(&self, n: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.renderer.renders() < n {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("render did not start");
    }
}

#[tokio::test]
async fn test_invalidate_during_flight_renders_once_more() {
    let h = Harness::new();

    let first = h.request();
    h.wait_for_renders(1).await;

    // Several invalidations and requests while the first render is blocked.
    assert!(h.cache.invalidate(&h.source));
    let second = h.request();
    assert!(h.cache.invalidate(&h.source));
    let third = h.request();
    tokio::task::yield_now().await;

    h.renderer.release(10);
    let first = first.await.unwrap();
    let second = second.await.unwrap();
    let third = third.await.unwrap();

    assert_eq!(h.renderer.renders(), 2);
    assert_eq!(h.renderer.max_active(), 1);
    assert_eq!(first, RenderResult::success("render 1 of body"));
    assert_eq!(second, RenderResult::success("render 2 of body"));
    assert_eq!(third, second);
    assert!(h.cache.is_fresh(&h.source));
}

#[tokio::test]
async fn test_last_requested_text_wins() {
    let h = Harness::new();

    let first = h.request_text("v2");
    h.wait_for_renders(1).await;

    assert!(h.cache.invalidate(&h.source));
    let second = h.request_text("v3");
    assert!(h.cache.invalidate(&h.source));
    let third = h.request_text("v4");
    tokio::task::yield_now().await;

    h.renderer.release(10);
    assert_eq!(first.await.unwrap(), RenderResult::success("render 1 of v2"));
    assert_eq!(second.await.unwrap(), RenderResult::success("render 2 of v4"));
    assert_eq!(third.await.unwrap(), RenderResult::success("render 2 of v4"));

    assert_eq!(h.renderer.renders(), 2);
    assert_eq!(h.renderer.max_active(), 1);
    assert!(h.cache.is_fresh(&h.source));
}

#[tokio::test]
async fn test_waiters_share_the_in_flight_result() {
    let h = Harness::new();

    let first = h.request();
    h.wait_for_renders(1).await;
    let second = h.request();
    let third = h.request();
    tokio::task::yield_now().await;

    h.renderer.release(10);
    let results = [
        first.await.unwrap(),
        second.await.unwrap(),
        third.await.unwrap(),
    ];

    assert_eq!(h.renderer.renders(), 1);
    assert!(results.iter().all(|r| r == &results[0]));
}

#[tokio::test]
async fn test_repeat_request_hits_cache() {
    let h = Harness::new();
    h.renderer.release(10);

    let a = h.request().await.unwrap();
    let b = h.request().await.unwrap();

    assert_eq!(a, b);
    assert_eq!(h.renderer.renders(), 1);
    assert_eq!(h.cache.render_count(&h.source), 1);
}

#[tokio::test]
async fn test_documents_render_independently() {
    let cache = RenderCache::new(Arc::new(IdentityRegistry::new()));
    let renderer = Arc::new(GatedRenderer::default());
    let ctx = RenderContext::new("body", "/mail/a.mjml");

    let spawn = |uri: &str| {
        let cache = cache.clone();
        let renderer = renderer.clone();
        let ctx = ctx.clone();
        let source = SourceId::from_uri(uri);
        tokio::spawn(async move { cache.get_or_render(&source, &ctx, renderer.as_ref()).await })
    };
    let a = spawn("file:///mail/a.mjml");
    let b = spawn("file:///mail/b.mjml");

    tokio::time::timeout(Duration::from_secs(5), async {
        while renderer.renders() < 2 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("both renders should start");
    assert_eq!(renderer.max_active(), 2);

    renderer.release(2);
    assert!(a.await.unwrap().is_success());
    assert!(b.await.unwrap().is_success());
}
