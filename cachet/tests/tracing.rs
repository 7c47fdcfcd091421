use std::sync::{Arc, Mutex};

use cachet::{Cache, CachePlan, CacheStatus, CacheStore, upstream_fn};
use cachet_core::{CachedResponse, RequestParts};
use chrono::Utc;
use http::{Method, Uri};
use tracing::span::{Attributes, Id};
use tracing::{Subscriber, field};
use tracing_subscriber::Layer;
use tracing_subscriber::Registry;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;

#[derive(Debug, Clone)]
struct CapturedSpan {
    name: String,
    fields: Vec<(String, String)>,
}

/// Records every span created while installed.
#[derive(Clone, Default)]
struct SpanCapture {
    spans: Arc<Mutex<Vec<CapturedSpan>>>,
}

struct FieldVisitor(Vec<(String, String)>);

impl field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &field::Field, value: &dyn std::fmt::Debug) {
        self.0.push((field.name().to_string(), format!("{value:?}")));
    }
}

impl<S> Layer<S> for SpanCapture
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, _id: &Id, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor(Vec::new());
        attrs.record(&mut visitor);
        self.spans.lock().unwrap().push(CapturedSpan {
            name: attrs.metadata().name().to_string(),
            fields: visitor.0,
        });
    }
}

impl SpanCapture {
    fn named(&self, name: &str) -> Vec<CapturedSpan> {
        self.spans
            .lock()
            .unwrap()
            .iter()
            .filter(|span| span.name == name)
            .cloned()
            .collect()
    }
}

#[tokio::test]
async fn refresh_runs_in_a_span_tagged_with_fingerprint() {
    let capture = SpanCapture::default();
    let subscriber = Registry::default().with(capture.clone());
    let _guard = tracing::subscriber::set_default(subscriber);

    let cache = Cache::default();
    let parts = RequestParts::new(Method::GET, &Uri::from_static("/api/hot?id=1"));
    let CachePlan::Lookup(fingerprint) = cache.plan(&parts) else {
        panic!("request should be cacheable");
    };
    cache.store().put_at(
        fingerprint.clone(),
        &CachedResponse::ok("old"),
        Utc::now() - chrono::Duration::minutes(10),
    );

    let handler = || upstream_fn(|()| async { Ok::<_, std::io::Error>(CachedResponse::ok("new")) });
    for _ in 0..3 {
        let (_, status) = cache.call(&parts, (), handler()).await;
        assert_eq!(status, CacheStatus::Stale);
    }
    cache.pool().wait_all().await;

    let spans = capture.named("refresh_task");
    assert_eq!(spans.len(), 1);
    assert!(
        spans[0]
            .fields
            .iter()
            .any(|(name, value)| name == "fingerprint" && value == fingerprint.as_str())
    );
}
