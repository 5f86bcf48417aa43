//! Loader for third-party embed scripts (e.g. the Twitter/X widgets script used by embedded posts).
//!
//! The script must be inserted into the document at most once, no matter how many embeds ask for it or how
//! concurrently. A [`WidgetLoader`] is meant to be created once and shared (behind an `Arc` or a `static`) by every
//! component that renders embeds.
use std::{
    future::Future,
    sync::{Mutex, PoisonError},
};

use log::{debug, warn};
use tokio::sync::OnceCell;

use crate::errors::WidgetError;

pub const TWITTER_WIDGETS_SRC: &str = "https://platform.twitter.com/widgets.js";

/// The document the script is inserted into.
pub trait ScriptHost: Send + Sync {
    /// Whether the script's global is already present, e.g. inserted by someone else.
    fn is_loaded(&self) -> bool;

    /// Inserts a `<script async src=…>` element and resolves once it has loaded.
    fn insert_script(&self, src: &str) -> impl Future<Output = Result<(), WidgetError>> + Send;

    /// Turns embed placeholders under `root` (the whole document when `None`) into widgets.
    fn process_embeds(&self, root: Option<&str>) -> Result<(), WidgetError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum WidgetStatus {
    #[default]
    Uninitialized,
    Loading,
    Ready,
    Failed(WidgetError),
}

pub struct WidgetLoader<H: ScriptHost> {
    host: H,
    src: String,
    loaded: OnceCell<Result<(), WidgetError>>,
    status: Mutex<WidgetStatus>,
}

impl<H: ScriptHost> WidgetLoader<H> {
    pub fn new(host: H, src: &str) -> Self {
        Self {
            host,
            src: src.to_string(),
            loaded: OnceCell::new(),
            status: Mutex::new(WidgetStatus::Uninitialized),
        }
    }

    pub fn twitter(host: H) -> Self {
        Self::new(host, TWITTER_WIDGETS_SRC)
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn status(&self) -> WidgetStatus {
        self.status.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn set_status(&self, status: WidgetStatus) {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner) = status;
    }

    /// Loads the script once. Later and concurrent calls share the first outcome, including a failure.
    pub async fn load(&self) -> Result<(), WidgetError> {
        self.loaded
            .get_or_init(|| async {
                if self.host.is_loaded() {
                    debug!(target: "widgets", "{} already present", self.src);
                    self.set_status(WidgetStatus::Ready);
                    return Ok(());
                }

                self.set_status(WidgetStatus::Loading);
                let result = self.host.insert_script(&self.src).await;
                match &result {
                    Ok(()) => self.set_status(WidgetStatus::Ready),
                    Err(err) => {
                        warn!(target: "widgets", "{}", err);
                        self.set_status(WidgetStatus::Failed(err.clone()));
                    }
                }
                result
            })
            .await
            .clone()
    }

    /// Loads the script, then renders the embeds under `root`. Failures only mean the embeds stay as plain links, so
    /// they are logged and otherwise ignored.
    pub async fn hydrate(&self, root: Option<&str>) {
        if let Err(err) = self.load().await {
            debug!(target: "widgets", "Not hydrating embeds: {}", err);
            return;
        }

        if let Err(err) = self.host.process_embeds(root) {
            debug!(target: "widgets", "Hydrating embeds failed: {}", err);
        }
    }
}
