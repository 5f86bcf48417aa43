//! Runtime access to the site's generated documents: data files (`<base path>/data/<kind>.json`), blog posts and
//! publication write-ups.
//!
//! Responses are cached per document for [`DEFAULT_STALE_TIME`], and there is never more than one request per document
//! in flight: callers arriving while a request is pending wait for it and share its outcome, errors included.
use std::{
    future::Future,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use log::{debug, warn};
use rustc_hash::FxHashMap;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::build::{BLOG_SOURCE, PUBLICATIONS_SOURCE};
use crate::client::base_path::BasePath;
use crate::client::fetch::{Fetch, FetchResponse, UreqFetcher};
use crate::content::{ContentItem, PublicationContent};
use crate::errors::FetchError;

pub const DEFAULT_STALE_TIME: Duration = Duration::from_secs(5 * 60);

/// What a page rendering `kind` should show.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ContentState {
    /// Never requested.
    #[default]
    Idle,
    Loading,
    Ready(Arc<Value>),
    Error(String),
}

struct Cached {
    fetched_at: Instant,
    value: Arc<Value>,
}

#[derive(Default)]
struct Flight {
    cached: Option<Cached>,
    last: Option<Result<Arc<Value>, FetchError>>,
}

/// Per-document cache. Holding `flight` across the request is what makes requests single-flight.
#[derive(Default)]
struct Slot {
    flight: tokio::sync::Mutex<Flight>,
    /// Number of requests that ran to completion.
    completed: AtomicU64,
    state: Mutex<ContentState>,
}

impl Slot {
    fn set_state(&self, state: ContentState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    fn state(&self) -> ContentState {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

fn data_path(kind: &str) -> String {
    format!("data/{kind}.json")
}

pub struct ContentClient<F: Fetch = UreqFetcher> {
    fetcher: Arc<F>,
    origin: String,
    base: BasePath,
    stale_time: Duration,
    slots: Mutex<FxHashMap<String, Arc<Slot>>>,
}

impl ContentClient<UreqFetcher> {
    /// A client for the site at `origin` (e.g. `https://lab.example.org`).
    pub fn new(origin: &str, base: BasePath) -> Self {
        Self::with_fetcher(UreqFetcher, origin, base)
    }
}

impl<F: Fetch> ContentClient<F> {
    pub fn with_fetcher(fetcher: F, origin: &str, base: BasePath) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            origin: origin.trim_end_matches('/').to_string(),
            base,
            stale_time: DEFAULT_STALE_TIME,
            slots: Mutex::new(FxHashMap::default()),
        }
    }

    pub fn stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = stale_time;
        self
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn url_for(&self, kind: &str) -> String {
        self.url(&data_path(kind))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.origin, self.base.asset_path(path))
    }

    fn slot(&self, key: &str) -> Arc<Slot> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(key.to_string()).or_default())
    }

    pub fn state(&self, kind: &str) -> ContentState {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.get(&data_path(kind)).map(|slot| slot.state()).unwrap_or_default()
    }

    /// Drops the cached value for `kind`, so the next fetch goes to the network.
    pub async fn invalidate(&self, kind: &str) {
        let slot = self.slot(&data_path(kind));
        slot.flight.lock().await.cached = None;
        slot.set_state(ContentState::Idle);
    }

    /// The raw JSON document for `kind`. Only successes are cached.
    pub async fn fetch_value(&self, kind: &str) -> Result<Arc<Value>, FetchError> {
        let path = data_path(kind);
        self.load(&path, || self.request_json(kind, &path)).await
    }

    /// Fetches `kind` and deserializes it into `T`.
    pub async fn fetch<T: DeserializeOwned>(&self, kind: &str) -> Result<T, FetchError> {
        let value = self.fetch_value(kind).await?;
        decode(kind, self.url_for(kind), &value)
    }

    /// The blog post `slug`: its generated `blog/<slug>.json`, or the Markdown source when that is unavailable.
    pub async fn post(&self, slug: &str) -> Result<ContentItem, FetchError> {
        let path = format!("{BLOG_SOURCE}/{slug}.json");
        let value = self.load(&path, || self.request_post(slug)).await?;
        decode(BLOG_SOURCE, self.url(&path), &value)
    }

    /// The write-up for publication `id`, if it has one. Falls back to the Markdown source like [`Self::post`].
    pub async fn publication(&self, id: &str) -> Result<Option<PublicationContent>, FetchError> {
        let path = format!("{PUBLICATIONS_SOURCE}/{id}.json");
        let value = self.load(&path, || self.request_publication(id)).await?;
        if value.is_null() {
            return Ok(None);
        }
        decode(PUBLICATIONS_SOURCE, self.url(&path), &value).map(Some)
    }

    /// Runs `request` for the document at `key` unless a fresh value is cached, or a request that was already in
    /// flight when this call arrived has just finished.
    async fn load<Fut>(&self, key: &str, request: impl FnOnce() -> Fut) -> Result<Arc<Value>, FetchError>
    where
        Fut: Future<Output = Result<Value, FetchError>>,
    {
        let slot = self.slot(key);
        let seen = slot.completed.load(Ordering::Acquire);
        let mut flight = slot.flight.lock().await;

        if let Some(cached) = &flight.cached
            && cached.fetched_at.elapsed() < self.stale_time
        {
            debug!(target: "content", "Using cached {}", key);
            return Ok(Arc::clone(&cached.value));
        }
        if slot.completed.load(Ordering::Acquire) != seen
            && let Some(outcome) = &flight.last
        {
            debug!(target: "content", "Sharing the outcome of the request for {}", key);
            return outcome.clone();
        }

        slot.set_state(ContentState::Loading);
        let outcome = request().await.map(Arc::new);
        match &outcome {
            Ok(value) => {
                flight.cached = Some(Cached {
                    fetched_at: Instant::now(),
                    value: Arc::clone(value),
                });
                slot.set_state(ContentState::Ready(Arc::clone(value)));
            }
            Err(err) => {
                warn!(target: "content", "{}", err);
                slot.set_state(ContentState::Error(err.to_string()));
            }
        }
        flight.last = Some(outcome.clone());
        slot.completed.fetch_add(1, Ordering::Release);
        outcome
    }

    async fn get(&self, url: &str) -> Result<FetchResponse, FetchError> {
        debug!(target: "content", "Fetching {}", url);

        let fetcher = Arc::clone(&self.fetcher);
        let request_url = url.to_string();
        tokio::task::spawn_blocking(move || fetcher.get(&request_url))
            .await
            .map_err(|_| FetchError::Aborted { url: url.to_string() })?
    }

    /// The body of `path`, when the server answers with a success status.
    async fn request_text(&self, kind: &str, path: &str) -> Result<String, FetchError> {
        let url = self.url(path);
        let response = self.get(&url).await?;

        if !response.is_success() {
            return Err(FetchError::Status {
                kind: kind.to_string(),
                url,
                status: response.status,
            });
        }
        Ok(response.body)
    }

    async fn request_json(&self, kind: &str, path: &str) -> Result<Value, FetchError> {
        let body = self.request_text(kind, path).await?;
        serde_json::from_str(&body).map_err(|source| FetchError::Decode {
            kind: kind.to_string(),
            url: self.url(path),
            source: Arc::new(source),
        })
    }

    async fn request_post(&self, slug: &str) -> Result<Value, FetchError> {
        match self.request_json(BLOG_SOURCE, &format!("{BLOG_SOURCE}/{slug}.json")).await {
            Ok(value) => return Ok(value),
            Err(err) => debug!(target: "content", "{}, trying the Markdown source", err),
        }

        let path = format!("{BLOG_SOURCE}/{slug}.md");
        let document = self.request_text(BLOG_SOURCE, &path).await?;
        let post = ContentItem::from_document(slug, format!("/{BLOG_SOURCE}/{slug}"), &document);
        encode(BLOG_SOURCE, self.url(&path), &post)
    }

    /// `null` when the publication has neither a JSON nor a Markdown write-up.
    async fn request_publication(&self, id: &str) -> Result<Value, FetchError> {
        match self.request_json(PUBLICATIONS_SOURCE, &format!("{PUBLICATIONS_SOURCE}/{id}.json")).await {
            Ok(value) => return Ok(value),
            Err(err) => debug!(target: "content", "{}, trying the Markdown source", err),
        }

        let path = format!("{PUBLICATIONS_SOURCE}/{id}.md");
        let url = self.url(&path);
        let response = self.get(&url).await?;
        if !response.is_success() {
            debug!(target: "content", "No write-up for publication {} (HTTP {})", id, response.status);
            return Ok(Value::Null);
        }
        encode(PUBLICATIONS_SOURCE, url, &PublicationContent::from_document(&response.body))
    }
}

fn decode<T: DeserializeOwned>(kind: &str, url: String, value: &Value) -> Result<T, FetchError> {
    T::deserialize(value).map_err(|source| FetchError::Decode {
        kind: kind.to_string(),
        url,
        source: Arc::new(source),
    })
}

fn encode<T: serde::Serialize>(kind: &str, url: String, document: &T) -> Result<Value, FetchError> {
    serde_json::to_value(document).map_err(|source| FetchError::Decode {
        kind: kind.to_string(),
        url,
        source: Arc::new(source),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Scripted {
        status: u16,
        body: &'static str,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(status: u16, body: &'static str) -> Self {
            Self {
                status,
                body,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    /// Serves fixed documents by URL and 404s everything else.
    #[derive(Default)]
    struct Site {
        documents: FxHashMap<&'static str, &'static str>,
        requested: Mutex<Vec<String>>,
    }

    impl Site {
        fn with(mut self, url: &'static str, body: &'static str) -> Self {
            self.documents.insert(url, body);
            self
        }

        fn requested(&self) -> Vec<String> {
            self.requested.lock().unwrap().clone()
        }
    }

    impl Fetch for Site {
        fn get(&self, url: &str) -> Result<FetchResponse, FetchError> {
            self.requested.lock().unwrap().push(url.to_string());
            Ok(match self.documents.get(url) {
                Some(body) => FetchResponse {
                    status: 200,
                    body: body.to_string(),
                },
                None => FetchResponse {
                    status: 404,
                    body: String::new(),
                },
            })
        }
    }

    impl Fetch for Scripted {
        fn get(&self, _url: &str) -> Result<FetchResponse, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(FetchResponse {
                status: self.status,
                body: self.body.to_string(),
            })
        }
    }

    #[test]
    fn test_url_for() {
        let client = ContentClient::new("https://lab.example.org/", BasePath::explicit("lab"));
        assert_eq!(client.url_for("talks"), "https://lab.example.org/lab/data/talks.json");

        let client = ContentClient::new("", BasePath::root());
        assert_eq!(client.url_for("people"), "/data/people.json");
    }

    #[tokio::test]
    async fn test_fetch_caches_success() {
        let client = ContentClient::with_fetcher(Scripted::new(200, r#"[{"id": "t1"}]"#), "", BasePath::root());
        assert_eq!(client.state("talks"), ContentState::Idle);

        let first: Vec<Value> = client.fetch("talks").await.unwrap();
        let second: Vec<Value> = client.fetch("talks").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first[0]["id"], "t1");
        assert_eq!(client.fetcher().calls(), 1);
        assert!(matches!(client.state("talks"), ContentState::Ready(_)));
    }

    #[tokio::test]
    async fn test_stale_values_are_refetched() {
        let client = ContentClient::with_fetcher(Scripted::new(200, "[]"), "", BasePath::root())
            .stale_time(Duration::ZERO);

        client.fetch_value("talks").await.unwrap();
        client.fetch_value("talks").await.unwrap();

        assert_eq!(client.fetcher().calls(), 2);
    }

    #[tokio::test]
    async fn test_invalidate() {
        let client = ContentClient::with_fetcher(Scripted::new(200, "[]"), "", BasePath::root());

        client.fetch_value("people").await.unwrap();
        client.invalidate("people").await;
        assert_eq!(client.state("people"), ContentState::Idle);
        client.fetch_value("people").await.unwrap();

        assert_eq!(client.fetcher().calls(), 2);
    }

    #[tokio::test]
    async fn test_status_errors_are_not_cached() {
        let client = ContentClient::with_fetcher(Scripted::new(404, ""), "", BasePath::root());

        let err = client.fetch_value("talks").await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404, .. }));
        assert_eq!(
            err.to_string(),
            "Failed to fetch talks data from /data/talks.json (HTTP 404)"
        );
        assert!(matches!(client.state("talks"), ContentState::Error(_)));

        client.fetch_value("talks").await.unwrap_err();
        assert_eq!(client.fetcher().calls(), 2);
    }

    #[tokio::test]
    async fn test_invalid_json_is_decode_error() {
        let client = ContentClient::with_fetcher(Scripted::new(200, "{oops"), "", BasePath::root());
        let err = client.fetch_value("news").await.unwrap_err();
        assert!(matches!(err, FetchError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_wrong_shape_is_decode_error() {
        let client = ContentClient::with_fetcher(Scripted::new(200, r#"{"a": 1}"#), "", BasePath::root());
        let err = client.fetch::<Vec<String>>("news").await.unwrap_err();
        assert!(matches!(err, FetchError::Decode { .. }));
        // The document itself was fine, so it stays cached.
        assert!(matches!(client.state("news"), ContentState::Ready(_)));
    }

    #[tokio::test]
    async fn test_post_from_json() {
        let site = Site::default().with(
            "/lab/blog/hello.json",
            r#"{"slug": "hello", "title": "Hello", "date": "2024-01-01", "author": "Ada", "excerpt": "",
                "image": "", "content": "<p>Hi</p>\n", "link": "/blog/hello"}"#,
        );
        let client = ContentClient::with_fetcher(site, "", BasePath::explicit("lab"));

        let post = client.post("hello").await.unwrap();
        assert_eq!(post.title, "Hello");
        assert_eq!(post.content, "<p>Hi</p>\n");

        client.post("hello").await.unwrap();
        assert_eq!(client.fetcher().requested(), ["/lab/blog/hello.json"]);
    }

    #[tokio::test]
    async fn test_post_falls_back_to_markdown() {
        let site = Site::default()
            .with("/blog/broken.json", "<!doctype html>")
            .with("/blog/draft.md", "---\ntitle: Draft\nauthor: Ada\n---\nFirst\nSecond\n")
            .with("/blog/broken.md", "Just text.");
        let client = ContentClient::with_fetcher(site, "", BasePath::root());

        let post = client.post("draft").await.unwrap();
        assert_eq!(post.slug, "draft");
        assert_eq!(post.title, "Draft");
        assert_eq!(post.date, "No date");
        assert_eq!(post.content, "<p>First<br />\nSecond</p>\n");
        assert_eq!(post.link, "/blog/draft");

        // JSON that does not parse is treated like a missing file.
        let post = client.post("broken").await.unwrap();
        assert_eq!(post.title, "Untitled");

        client.post("draft").await.unwrap();
        assert_eq!(
            client.fetcher().requested(),
            ["/blog/draft.json", "/blog/draft.md", "/blog/broken.json", "/blog/broken.md"]
        );
    }

    #[tokio::test]
    async fn test_missing_post_is_an_error() {
        let client = ContentClient::with_fetcher(Site::default(), "", BasePath::root());

        let err = client.post("nope").await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404, .. }));
        assert_eq!(err.to_string(), "Failed to fetch blog data from /blog/nope.md (HTTP 404)");
    }

    #[tokio::test]
    async fn test_publication_from_json() {
        let site = Site::default().with(
            "/publications/p1.json",
            r#"{"content": "<p>Long</p>\n", "tldr": "Short", "keywords": ["a"]}"#,
        );
        let client = ContentClient::with_fetcher(site, "", BasePath::root());

        let write_up = client.publication("p1").await.unwrap().unwrap();
        assert_eq!(write_up.tldr.as_deref(), Some("Short"));
        assert_eq!(write_up.keywords, Some(vec!["a".to_string()]));
        assert_eq!(client.fetcher().requested(), ["/publications/p1.json"]);
    }

    #[tokio::test]
    async fn test_publication_falls_back_to_markdown() {
        let site = Site::default().with("/publications/p2.md", "---\ntldr: In short\n---\nDetails.\n");
        let client = ContentClient::with_fetcher(site, "", BasePath::root());

        let write_up = client.publication("p2").await.unwrap().unwrap();
        assert_eq!(write_up.tldr.as_deref(), Some("In short"));
        assert_eq!(write_up.keywords, None);
        assert_eq!(write_up.content, "<p>Details.</p>\n");
    }

    #[tokio::test]
    async fn test_publication_without_write_up() {
        let client = ContentClient::with_fetcher(Site::default(), "", BasePath::root());

        assert_eq!(client.publication("p3").await.unwrap(), None);
        assert_eq!(client.publication("p3").await.unwrap(), None);
        // "No write-up" is a successful answer, so it is cached.
        assert_eq!(client.fetcher().requested().len(), 2);
    }
}
