//! Browser automation seam.
//!
//! The sources only talk to [`BrowserPage`] and [`PageProvider`]. The
//! production implementation drives Chromium through `chromiumoxide`
//! ([`SessionManager`] and [`ChromePage`]); tests plug in scripted pages.

pub mod chrome;
pub mod session;

pub use chrome::ChromePage;
pub use session::SessionManager;

use async_trait::async_trait;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;

/// The element whose scroll position drives a virtualized row list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrollContainer {
    /// A specific scrollable element, addressed by CSS selector.
    Element(String),
    /// The whole document body.
    Body,
}

/// A single browser tab bound to the session's isolated context.
#[async_trait]
pub trait BrowserPage: Clone + Send + Sync + 'static {
    /// Navigates to `url` and waits for the load event.
    async fn goto(&self, url: &str) -> Result<()>;

    /// URL of the currently loaded document, if any.
    async fn current_url(&self) -> Result<Option<String>>;

    /// Serialized HTML of the current document.
    async fn content(&self) -> Result<String>;

    /// Waits until at least one element matches `selector`.
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()>;

    /// Whether any element currently matches `selector`.
    async fn has_element(&self, selector: &str) -> Result<bool>;

    /// Visible text of every rendered row inside `container`, in DOM order.
    async fn row_texts(
        &self,
        container: &ScrollContainer,
        row_selector: &str,
    ) -> Result<Vec<String>>;

    /// Scrolls `container` vertically by `delta_y` pixels.
    async fn scroll_by(&self, container: &ScrollContainer, delta_y: i64) -> Result<()>;

    /// Right-clicks the `index`-th rendered row inside `container`.
    async fn context_click_row(
        &self,
        container: &ScrollContainer,
        row_selector: &str,
        index: usize,
    ) -> Result<()>;

    /// Clicks the menu action labelled `label`, waits for the download it
    /// starts and saves the file at `save_as`.
    async fn download_from_menu(
        &self,
        label: &str,
        timeout: Duration,
        save_as: &Path,
    ) -> Result<PathBuf>;

    /// Suspends the caller, letting the page settle.
    async fn pause(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    async fn close(&self) -> Result<()>;
}

/// Hands out pages and owns the download directory for one run.
#[async_trait]
pub trait PageProvider: Send + Sync {
    type Page: BrowserPage;

    /// Opens a new page. Fails with `NotInitialized` before the session exists.
    async fn create_page(&self) -> Result<Self::Page>;

    /// Scoped temporary directory where downloaded files are persisted.
    fn download_dir(&self) -> Result<PathBuf>;

    /// Opens a page wrapped in a guard that always closes it.
    async fn get_page(&self) -> Result<ScopedPage<Self::Page>> {
        Ok(ScopedPage::new(self.create_page().await?))
    }
}

/// Owns a page for the duration of one operation.
///
/// Call [`ScopedPage::close`] on the normal path. If the guard is dropped
/// without it (early return, error, cancelled future) the close is handed to
/// the current tokio runtime.
pub struct ScopedPage<P: BrowserPage> {
    page: P,
    closed: bool,
}

impl<P: BrowserPage> ScopedPage<P> {
    pub fn new(page: P) -> Self {
        Self { page, closed: false }
    }

    pub async fn close(mut self) -> Result<()> {
        self.closed = true;
        self.page.close().await
    }
}

impl<P: BrowserPage> Deref for ScopedPage<P> {
    type Target = P;

    fn deref(&self) -> &P {
        &self.page
    }
}

impl<P: BrowserPage> Drop for ScopedPage<P> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }

        let page = self.page.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = page.close().await {
                        tracing::warn!(error = %e, "failed to close page after early exit");
                    }
                });
            }
            Err(_) => {
                tracing::warn!("page dropped outside a runtime; it will close with the browser")
            }
        }
    }
}
