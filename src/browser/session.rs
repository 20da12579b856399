use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::{
    BrowserContextId, SetDownloadBehaviorBehavior, SetDownloadBehaviorParams,
};
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use futures::StreamExt;
use std::path::PathBuf;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::BrowserSettings;
use crate::error::{Result, ScraperError};
use super::{ChromePage, PageProvider};

const TEMP_DIR_PREFIX: &str = "uo_classes_";
const DOWNLOADS_SUBDIR: &str = "downloads";

/// Live resources of an initialized session.
struct Session {
    browser: Browser,
    handler_task: JoinHandle<()>,
    context_id: BrowserContextId,
    temp_dir: TempDir,
}

/// Owns one Chromium process, one isolated browsing context and the scoped
/// temporary directory downloads are written to.
pub struct SessionManager {
    settings: BrowserSettings,
    session: Option<Session>,
}

impl SessionManager {
    pub fn new(settings: BrowserSettings) -> Self {
        Self {
            settings,
            session: None,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.session.is_some()
    }

    /// Root of the scoped temporary directory, once initialized.
    pub fn temp_dir(&self) -> Option<PathBuf> {
        self.session.as_ref().map(|s| s.temp_dir.path().to_path_buf())
    }

    /// Launches the browser, creates the isolated context and the temp dir.
    ///
    /// Any failure here is fatal for the run. Calling it twice is a no-op.
    pub async fn initialize(&mut self) -> Result<()> {
        if self.session.is_some() {
            warn!("session already initialized");
            return Ok(());
        }

        let temp_dir = tempfile::Builder::new()
            .prefix(TEMP_DIR_PREFIX)
            .tempdir()
            .map_err(|e| ScraperError::InitializationError(format!("temp directory: {}", e)))?;
        let downloads = temp_dir.path().join(DOWNLOADS_SUBDIR);
        tokio::fs::create_dir_all(&downloads)
            .await
            .map_err(|e| ScraperError::InitializationError(format!("downloads directory: {}", e)))?;

        let config = self.browser_config()?;
        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ScraperError::InitializationError(format!("browser launch: {}", e)))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("chromiumoxide handler event error: {}", e);
                }
            }
        });

        let context_id = match Self::create_context(&browser, &downloads).await {
            Ok(id) => id,
            Err(e) => {
                browser.close().await.ok();
                handler_task.abort();
                return Err(e);
            }
        };

        info!(temp_dir = %temp_dir.path().display(), "browser session initialized");

        self.session = Some(Session {
            browser,
            handler_task,
            context_id,
            temp_dir,
        });
        Ok(())
    }

    fn browser_config(&self) -> Result<BrowserConfig> {
        let mut builder = BrowserConfig::builder()
            .request_timeout(self.settings.navigation_timeout)
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--no-first-run")
            .arg("--no-default-browser-check");
        if !self.settings.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &self.settings.chrome_executable {
            builder = builder.chrome_executable(path);
        }
        builder
            .build()
            .map_err(|e| ScraperError::InitializationError(format!("browser config: {}", e)))
    }

    async fn create_context(
        browser: &Browser,
        downloads: &std::path::Path,
    ) -> Result<BrowserContextId> {
        let context_id = browser
            .execute(CreateBrowserContextParams::default())
            .await
            .map_err(|e| ScraperError::InitializationError(format!("browser context: {}", e)))?
            .result
            .browser_context_id;

        let mut download_behavior =
            SetDownloadBehaviorParams::new(SetDownloadBehaviorBehavior::Allow);
        download_behavior.browser_context_id = Some(context_id.clone());
        download_behavior.download_path = Some(downloads.to_string_lossy().into_owned());
        browser
            .execute(download_behavior)
            .await
            .map_err(|e| ScraperError::InitializationError(format!("download behavior: {}", e)))?;

        Ok(context_id)
    }

    /// Closes the context and the browser, stops the CDP handler and removes
    /// the temp directory. Every step runs even if an earlier one fails.
    /// Safe to call without a prior `initialize`.
    pub async fn cleanup(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };

        if let Err(e) = session
            .browser
            .execute(DisposeBrowserContextParams::new(session.context_id.clone()))
            .await
        {
            warn!(error = %e, "failed to close browser context");
        }

        if let Err(e) = session.browser.close().await {
            warn!(error = %e, "failed to close browser");
        }
        if let Err(e) = session.browser.wait().await {
            warn!(error = %e, "failed to wait for browser exit");
        }

        session.handler_task.abort();

        let temp_path = session.temp_dir.path().to_path_buf();
        if let Err(e) = session.temp_dir.close() {
            warn!(path = %temp_path.display(), error = %e, "failed to remove temp directory");
        }

        info!("browser session cleaned up");
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        // Reached on interruption. `Browser` kills its process and `TempDir`
        // removes the directory on their own drops; the CDP event loop has to
        // be stopped explicitly.
        if let Some(session) = &self.session {
            session.handler_task.abort();
        }
    }
}

#[async_trait]
impl PageProvider for SessionManager {
    type Page = ChromePage;

    async fn create_page(&self) -> Result<ChromePage> {
        let session = self.session.as_ref().ok_or(ScraperError::NotInitialized)?;

        let mut params = CreateTargetParams::new("about:blank");
        params.browser_context_id = Some(session.context_id.clone());
        let page = session.browser.new_page(params).await?;

        Ok(ChromePage::new(
            page,
            self.settings.navigation_timeout,
            self.settings.selector_timeout,
            session.temp_dir.path().join(DOWNLOADS_SUBDIR),
        ))
    }

    fn download_dir(&self) -> Result<PathBuf> {
        self.session
            .as_ref()
            .map(|s| s.temp_dir.path().to_path_buf())
            .ok_or(ScraperError::NotInitialized)
    }
}
