use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchMouseEventParams, DispatchMouseEventType, MouseButton,
};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::error::{Result, ScraperError};
use super::{BrowserPage, ScrollContainer};

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const DOWNLOAD_POLL_INTERVAL: Duration = Duration::from_millis(250);
const MENU_ACTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Suffix Chromium gives to files that are still being written.
const PARTIAL_DOWNLOAD_SUFFIX: &str = ".crdownload";

/// A Chromium tab created by [`super::SessionManager`].
#[derive(Clone)]
pub struct ChromePage {
    page: Page,
    navigation_timeout: Duration,
    selector_timeout: Duration,
    download_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
struct RowPoint {
    found: bool,
    x: f64,
    y: f64,
}

impl ChromePage {
    pub(crate) fn new(
        page: Page,
        navigation_timeout: Duration,
        selector_timeout: Duration,
        download_dir: PathBuf,
    ) -> Self {
        Self {
            page,
            navigation_timeout,
            selector_timeout,
            download_dir,
        }
    }

    async fn eval<T: serde::de::DeserializeOwned>(&self, script: String) -> Result<T> {
        let evaluation = tokio::time::timeout(self.selector_timeout, self.page.evaluate(script))
            .await
            .map_err(|_| ScraperError::Timeout("script evaluation".to_string()))??;
        Ok(evaluation.into_value()?)
    }

    async fn mouse(&self, kind: DispatchMouseEventType, x: f64, y: f64) -> Result<()> {
        let mut params = DispatchMouseEventParams::new(kind, x, y);
        params.button = Some(MouseButton::Right);
        params.click_count = Some(1);
        self.page.execute(params).await?;
        Ok(())
    }

    async fn click_menu_action(&self, label: &str) -> Result<()> {
        let script = format!(
            r#"(() => {{
                const label = {label};
                const clickable = "[role='menuitem'], button, [role='button']";
                const candidates = document.querySelectorAll(clickable + ", span");
                for (const el of candidates) {{
                    if ((el.innerText || '').trim() === label) {{
                        const target = el.closest(clickable) || el;
                        target.click();
                        return true;
                    }}
                }}
                return false;
            }})()"#,
            label = js_string(label)
        );

        let deadline = Instant::now() + MENU_ACTION_TIMEOUT;
        loop {
            if self.eval::<bool>(script.clone()).await? {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(ScraperError::ElementNotFound(format!("menu action '{}'", label)));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn wait_for_new_download(
        &self,
        before: &HashSet<String>,
        timeout: Duration,
    ) -> Result<PathBuf> {
        let deadline = Instant::now() + timeout;
        loop {
            for name in list_file_names(&self.download_dir).await? {
                if before.contains(&name) || name.ends_with(PARTIAL_DOWNLOAD_SUFFIX) {
                    continue;
                }
                return Ok(self.download_dir.join(name));
            }
            if Instant::now() >= deadline {
                return Err(ScraperError::Timeout("download to complete".to_string()));
            }
            tokio::time::sleep(DOWNLOAD_POLL_INTERVAL).await;
        }
    }
}

#[async_trait]
impl BrowserPage for ChromePage {
    async fn goto(&self, url: &str) -> Result<()> {
        debug!(url, "navigating");
        tokio::time::timeout(self.navigation_timeout, self.page.goto(url))
            .await
            .map_err(|_| ScraperError::Timeout(format!("navigation to {}", url)))?
            .map_err(|e| ScraperError::NavigationError(format!("{}: {}", url, e)))?;
        Ok(())
    }

    async fn current_url(&self) -> Result<Option<String>> {
        Ok(self.page.url().await?)
    }

    async fn content(&self) -> Result<String> {
        Ok(self.page.content().await?)
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.has_element(selector).await.unwrap_or(false) {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(ScraperError::Timeout(format!("selector {}", selector)));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn has_element(&self, selector: &str) -> Result<bool> {
        let script = format!("document.querySelector({}) !== null", js_string(selector));
        self.eval(script).await
    }

    async fn row_texts(
        &self,
        container: &ScrollContainer,
        row_selector: &str,
    ) -> Result<Vec<String>> {
        let script = format!(
            r#"(() => {{
                const root = {root};
                if (!root) return [];
                return Array.from(root.querySelectorAll({rows})).map(r => r.innerText || '');
            }})()"#,
            root = root_expression(container),
            rows = js_string(row_selector)
        );
        self.eval(script).await
    }

    async fn scroll_by(&self, container: &ScrollContainer, delta_y: i64) -> Result<()> {
        let script = format!(
            r#"(() => {{
                const root = {root};
                if (!root) return false;
                root.scrollBy(0, {delta});
                if (root === document.body) window.scrollBy(0, {delta});
                return true;
            }})()"#,
            root = root_expression(container),
            delta = delta_y
        );
        if self.eval::<bool>(script).await? {
            Ok(())
        } else {
            Err(ScraperError::ElementNotFound("scroll container".to_string()))
        }
    }

    async fn context_click_row(
        &self,
        container: &ScrollContainer,
        row_selector: &str,
        index: usize,
    ) -> Result<()> {
        let script = format!(
            r#"(() => {{
                const root = {root};
                const row = root ? root.querySelectorAll({rows})[{index}] : null;
                if (!row) return {{ found: false, x: 0, y: 0 }};
                row.scrollIntoView({{ block: 'nearest' }});
                const rect = row.getBoundingClientRect();
                const x = rect.left + rect.width / 2;
                const y = rect.top + rect.height / 2;
                return {{ found: true, x, y }};
            }})()"#,
            root = root_expression(container),
            rows = js_string(row_selector),
            index = index
        );

        let point: RowPoint = self.eval(script).await?;
        if !point.found {
            return Err(ScraperError::ElementNotFound(format!("row {} ({})", index, row_selector)));
        }

        self.mouse(DispatchMouseEventType::MousePressed, point.x, point.y).await?;
        self.mouse(DispatchMouseEventType::MouseReleased, point.x, point.y).await?;
        Ok(())
    }

    async fn download_from_menu(
        &self,
        label: &str,
        timeout: Duration,
        save_as: &Path,
    ) -> Result<PathBuf> {
        let before: HashSet<String> = list_file_names(&self.download_dir)
            .await?
            .into_iter()
            .collect();

        self.click_menu_action(label).await?;
        let downloaded = self.wait_for_new_download(&before, timeout).await?;

        tokio::fs::rename(&downloaded, save_as).await.map_err(|e| {
            ScraperError::DownloadError(format!(
                "could not move {} to {}: {}",
                downloaded.display(),
                save_as.display(),
                e
            ))
        })?;

        info!(path = %save_as.display(), "download saved");
        Ok(save_as.to_path_buf())
    }

    async fn close(&self) -> Result<()> {
        self.page.clone().close().await?;
        Ok(())
    }
}

fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

fn root_expression(container: &ScrollContainer) -> String {
    match container {
        ScrollContainer::Element(selector) => {
            format!("document.querySelector({})", js_string(selector))
        }
        ScrollContainer::Body => "document.body".to_string(),
    }
}

async fn list_file_names(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(names),
        Err(e) => return Err(e.into()),
    };
    while let Some(entry) = entries.next_entry().await? {
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    Ok(names)
}
