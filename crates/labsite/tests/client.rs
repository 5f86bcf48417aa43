use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use labsite::client::{
    BasePath, ContentClient, ContentState, Fetch, FetchResponse, ScriptHost, WidgetLoader, WidgetStatus,
};
use labsite::errors::{FetchError, WidgetError};

/// Answers every request after a delay, so concurrent callers overlap.
#[derive(Default)]
struct SlowServer {
    failing: bool,
    requests: AtomicUsize,
    urls: std::sync::Mutex<Vec<String>>,
}

impl SlowServer {
    fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }
}

impl Fetch for SlowServer {
    fn get(&self, url: &str) -> Result<FetchResponse, FetchError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().unwrap().push(url.to_string());
        std::thread::sleep(Duration::from_millis(50));
        if self.failing {
            return Ok(FetchResponse {
                status: 500,
                body: String::new(),
            });
        }
        Ok(FetchResponse {
            status: 200,
            body: r#"[{"id": "t1", "title": "A talk"}]"#.to_string(),
        })
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_fetches_share_one_request() {
    let client = Arc::new(ContentClient::with_fetcher(
        SlowServer::default(),
        "https://lab.example.org",
        BasePath::detect("/lab/talks"),
    ));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.fetch_value("talks").await })
        })
        .collect();

    for handle in handles {
        let value = handle.await.unwrap().unwrap();
        assert_eq!(value[0]["id"], "t1");
    }

    assert_eq!(client.fetcher().requests.load(Ordering::SeqCst), 1);
    assert_eq!(
        *client.fetcher().urls.lock().unwrap(),
        ["https://lab.example.org/lab/data/talks.json"]
    );
    assert!(matches!(client.state("talks"), ContentState::Ready(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_callers_share_a_failed_request() {
    let client = Arc::new(ContentClient::with_fetcher(SlowServer::failing(), "", BasePath::root()));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.fetch_value("talks").await })
        })
        .collect();

    for handle in handles {
        let err = handle.await.unwrap().unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 500, .. }));
    }
    assert_eq!(client.fetcher().requests.load(Ordering::SeqCst), 1);
    assert!(matches!(client.state("talks"), ContentState::Error(_)));

    // Errors are not cached: the next call goes to the server again.
    client.fetch_value("talks").await.unwrap_err();
    assert_eq!(client.fetcher().requests.load(Ordering::SeqCst), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn kinds_are_fetched_independently() {
    let client = Arc::new(ContentClient::with_fetcher(SlowServer::default(), "", BasePath::root()));

    let talks = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.fetch_value("talks").await })
    };
    let people = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.fetch_value("people").await })
    };

    talks.await.unwrap().unwrap();
    people.await.unwrap().unwrap();

    assert_eq!(client.fetcher().requests.load(Ordering::SeqCst), 2);
    assert_eq!(client.state("news"), ContentState::Idle);
}

#[derive(Default)]
struct SlowDocument {
    scripts: AtomicUsize,
}

impl ScriptHost for SlowDocument {
    fn is_loaded(&self) -> bool {
        false
    }

    async fn insert_script(&self, _src: &str) -> Result<(), WidgetError> {
        self.scripts.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok(())
    }

    fn process_embeds(&self, _root: Option<&str>) -> Result<(), WidgetError> {
        Ok(())
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn widget_script_is_inserted_once() {
    let loader = Arc::new(WidgetLoader::twitter(SlowDocument::default()));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let loader = Arc::clone(&loader);
            tokio::spawn(async move {
                if i % 2 == 0 {
                    loader.hydrate(None).await;
                } else {
                    loader.load().await.unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(loader.host().scripts.load(Ordering::SeqCst), 1);
    assert_eq!(loader.status(), WidgetStatus::Ready);
}
