//! The document-sharing site hosting one roster spreadsheet per student.
//!
//! The folder view is a virtualized list: only rows near the viewport exist
//! in the DOM, so finding a file means scanning, scrolling a little, waiting
//! for the list to render and scanning again.

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::browser::{BrowserPage, PageProvider, ScrollContainer};
use crate::config::BrowserSettings;
use crate::error::{Result, ScraperError};
use crate::models::{ClassToken, Lookup, SourceName, StudentId, TargetFile};
use crate::parsers::file_name::{
    candidate_file_name, is_roster_file, safe_file_name, target_file_name,
};
use crate::parsers::spreadsheet;
use crate::retry::{Backoff, MAX_RETRIES, RetryPolicy, retry};
use super::ClassSource;

pub const ROW_SELECTOR: &str = "[role='row']";
pub const LIST_CONTAINER_SELECTOR: &str = "div[class^='list_']";
pub const DOWNLOAD_ACTION_LABEL: &str = "Descargar";

const RETRY_STEP: Duration = Duration::from_secs(5);
const CONTEXT_MENU_DELAY: Duration = Duration::from_millis(500);
const PROGRESS_EVERY: u32 = 50;

/// How the virtualized list is walked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollSettings {
    /// Pixels scrolled per step.
    pub step_px: i64,
    /// Pause after each scroll so new rows can render.
    pub settle: Duration,
    /// Upper bound on scroll steps before giving up.
    pub max_iterations: u32,
}

impl Default for ScrollSettings {
    fn default() -> Self {
        Self {
            step_px: 150,
            settle: Duration::from_millis(300),
            max_iterations: 500,
        }
    }
}

pub struct SharePointSource {
    site_url: String,
    policy: RetryPolicy,
    scroll: ScrollSettings,
    selector_timeout: Duration,
    download_timeout: Duration,
}

impl SharePointSource {
    pub fn new(site_url: impl Into<String>, browser: &BrowserSettings) -> Self {
        Self {
            site_url: site_url.into(),
            policy: RetryPolicy::new(MAX_RETRIES, Backoff::Linear(RETRY_STEP)),
            scroll: ScrollSettings::default(),
            selector_timeout: browser.selector_timeout,
            download_timeout: browser.download_timeout,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_scroll(mut self, scroll: ScrollSettings) -> Self {
        self.scroll = scroll;
        self
    }

    /// Locates the student's roster file and downloads it into `download_dir`.
    ///
    /// Navigation and rendering failures are retried from scratch with a
    /// linearly growing pause. Reaching the scroll ceiling, or a failed
    /// download of the right file, is `NotFound` and is not retried.
    pub async fn find_and_download<B: BrowserPage>(
        &self,
        page: &B,
        student_id: &StudentId,
        download_dir: &Path,
    ) -> Result<Lookup<TargetFile>> {
        let target = target_file_name(student_id);
        info!(file = %target, "searching roster file");

        retry(&self.policy, "roster file search", |_| {
            self.search_once(page, &target, download_dir)
        })
        .await
    }

    async fn search_once<B: BrowserPage>(
        &self,
        page: &B,
        target: &str,
        download_dir: &Path,
    ) -> Result<Lookup<TargetFile>> {
        page.goto(&self.site_url).await?;
        page.wait_for_selector(ROW_SELECTOR, self.selector_timeout).await?;
        debug!("file list rendered");

        let container = locate_scroll_container(page).await?;
        self.scroll_and_find(page, &container, target, download_dir).await
    }

    /// Scans the rendered rows, scrolling until `target` shows up or the
    /// iteration ceiling is reached.
    pub async fn scroll_and_find<B: BrowserPage>(
        &self,
        page: &B,
        container: &ScrollContainer,
        target: &str,
        download_dir: &Path,
    ) -> Result<Lookup<TargetFile>> {
        for iteration in 1..=self.scroll.max_iterations {
            let rows = page.row_texts(container, ROW_SELECTOR).await?;

            for (row_index, text) in rows.iter().enumerate() {
                let Some(name) = candidate_file_name(text) else {
                    continue;
                };
                if !is_roster_file(&name) {
                    continue;
                }
                debug!(file = %name, "checking file");

                if name == target {
                    info!(file = %name, row_index, "found roster file");
                    let downloaded = self
                        .download_row(page, container, row_index, &name, download_dir)
                        .await;
                    return match downloaded {
                        Ok(file) => Ok(Lookup::Found(file)),
                        Err(e) => {
                            warn!(file = %name, error = %e, "download failed");
                            Ok(Lookup::NotFound)
                        }
                    };
                }
            }

            if let Err(e) = page.scroll_by(container, self.scroll.step_px).await {
                warn!(error = %e, "scrolling failed, stopping search");
                return Ok(Lookup::NotFound);
            }
            page.pause(self.scroll.settle).await;

            if iteration % PROGRESS_EVERY == 0 {
                info!(iteration, "still searching");
            }
        }

        warn!(
            max = self.scroll.max_iterations,
            file = %target,
            "scroll limit reached without finding file"
        );
        Ok(Lookup::NotFound)
    }

    async fn download_row<B: BrowserPage>(
        &self,
        page: &B,
        container: &ScrollContainer,
        row_index: usize,
        file_name: &str,
        download_dir: &Path,
    ) -> Result<TargetFile> {
        page.context_click_row(container, ROW_SELECTOR, row_index).await?;
        page.pause(CONTEXT_MENU_DELAY).await;

        let save_as = download_dir.join(safe_file_name(file_name));
        let path = page
            .download_from_menu(DOWNLOAD_ACTION_LABEL, self.download_timeout, &save_as)
            .await?;

        Ok(TargetFile {
            file_name: file_name.to_string(),
            row_index,
            path,
        })
    }
}

/// The list's own scroll element, or the document body when it is missing.
pub async fn locate_scroll_container<B: BrowserPage>(page: &B) -> Result<ScrollContainer> {
    if page.has_element(LIST_CONTAINER_SELECTOR).await? {
        Ok(ScrollContainer::Element(LIST_CONTAINER_SELECTOR.to_string()))
    } else {
        warn!("list container not found, scrolling the document body");
        Ok(ScrollContainer::Body)
    }
}

#[async_trait]
impl ClassSource for SharePointSource {
    fn name(&self) -> SourceName {
        SourceName::SharePoint
    }

    async fn collect<P: PageProvider>(
        &self,
        pages: &P,
        student_id: &StudentId,
    ) -> Result<Lookup<Vec<ClassToken>>> {
        let download_dir = pages.download_dir()?;
        let page = pages.get_page().await?;

        let found = self.find_and_download(&*page, student_id, &download_dir).await;
        if let Err(e) = page.close().await {
            warn!(error = %e, "failed to close page");
        }

        let file = match found? {
            Lookup::Found(file) => file,
            Lookup::NotFound => return Ok(Lookup::NotFound),
        };

        // Parsing is blocking and must not stall the other source.
        let path = file.path.clone();
        let sheet = tokio::task::spawn_blocking(move || spreadsheet::read_class_sheet(&path)).await;
        if let Err(e) = tokio::fs::remove_file(&file.path).await {
            warn!(path = %file.path.display(), error = %e, "failed to delete downloaded file");
        }

        let sheet = sheet.map_err(|e| {
            ScraperError::SpreadsheetError(format!("spreadsheet reader stopped: {}", e))
        })??;
        debug!(subjects = ?sheet.subjects, "classes grouped by subject");
        Ok(Lookup::Found(sheet.classes))
    }
}
