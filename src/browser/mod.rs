pub mod webdriver;

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

use crate::download::poll_until;
use crate::error::{RunError, RunResult};

pub use webdriver::WebDriverBrowser;

/// How often element visibility is re-checked while waiting.
pub const VISIBILITY_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Location expression for a single element on the page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    Id(String),
    XPath(String),
}

impl Selector {
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    pub fn xpath(xpath: impl Into<String>) -> Self {
        Self::XPath(xpath.into())
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "#{}", id),
            Self::XPath(xpath) => write!(f, "{}", xpath),
        }
    }
}

/// The handful of browser operations the portal workflow needs.
#[async_trait]
pub trait Browser: Send + Sync {
    async fn goto(&self, url: &str) -> RunResult<()>;

    /// `false` when no element matches or the first match is hidden.
    async fn is_visible(&self, selector: &Selector) -> RunResult<bool>;

    async fn click(&self, selector: &Selector) -> RunResult<()>;

    async fn send_keys(&self, selector: &Selector, text: &str) -> RunResult<()>;

    async fn text(&self, selector: &Selector) -> RunResult<String>;

    /// Number of elements currently matching `selector`.
    async fn count(&self, selector: &Selector) -> RunResult<usize>;

    async fn current_url(&self) -> RunResult<String>;

    async fn quit(&self) -> RunResult<()>;

    /// Blocks until `selector` is visible, failing with
    /// [`RunError::ElementTimeout`] once `timeout` has passed.
    async fn wait_for_visible(&self, selector: &Selector, timeout: Duration) -> RunResult<()> {
        let visible = poll_until(timeout, VISIBILITY_POLL_INTERVAL, move || async move {
            Ok::<_, RunError>(self.is_visible(selector).await?.then_some(()))
        })
        .await?;

        visible.ok_or_else(|| RunError::ElementTimeout {
            selector: selector.to_string(),
            timeout,
        })
    }
}
