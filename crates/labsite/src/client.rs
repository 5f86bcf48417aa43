//! The runtime half of the site: what the browser app does with the files the build emits.
//!
//! These types carry the app's routing, data fetching and embed loading rules, so they can be shared with native
//! tooling and tested without a browser.
pub mod base_path;
pub mod content;
pub mod fetch;
pub mod router;
pub mod widgets;

pub use base_path::{BasePath, RESERVED_SEGMENTS};
pub use content::{ContentClient, ContentState, DEFAULT_STALE_TIME};
pub use fetch::{Fetch, FetchResponse, UreqFetcher};
pub use router::{Page, Router};
pub use widgets::{ScriptHost, TWITTER_WIDGETS_SRC, WidgetLoader, WidgetStatus};
