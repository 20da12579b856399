//! The faculty course-listing site.
//!
//! Listing pages link every student identifier to a detail page whose first
//! paragraph lists the enrolled classes. Several mirrors of the listing are
//! tried in order.

use async_trait::async_trait;
use std::time::Duration;
use tracing::{info, warn};

use crate::browser::{BrowserPage, PageProvider};
use crate::error::{Result, ScraperError};
use crate::models::{ClassToken, Lookup, SourceName, StudentId};
use crate::parsers::{listing, roster};
use crate::retry::{Backoff, MAX_RETRIES, RetryPolicy, retry};
use super::ClassSource;

const RETRY_DELAY: Duration = Duration::from_secs(2);

pub struct GobiernoSource {
    urls: Vec<String>,
    policy: RetryPolicy,
}

impl GobiernoSource {
    pub fn new(urls: Vec<String>) -> Self {
        Self {
            urls,
            policy: RetryPolicy::new(MAX_RETRIES, Backoff::Fixed(RETRY_DELAY)),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Finds the student's detail page and leaves `page` on it.
    ///
    /// Each candidate URL gets up to `MAX_RETRIES` attempts before moving on
    /// to the next one. Exhausting every URL is `NotFound`, not an error.
    pub async fn resolve_detail_page<B: BrowserPage>(
        &self,
        page: &B,
        student_id: &StudentId,
    ) -> Result<Lookup<String>> {
        for url in &self.urls {
            let found = retry(&self.policy, "listing lookup", |attempt| {
                info!(url = %url, attempt, "searching listing page");
                self.open_detail_page(page, url, student_id)
            })
            .await;

            match found {
                Ok(detail_url) => {
                    info!(detail_url = %detail_url, "detail page loaded");
                    return Ok(Lookup::Found(detail_url));
                }
                Err(e) => warn!(url = %url, error = %e, "giving up on listing URL"),
            }
        }

        warn!(uo = %student_id, "student not found in any listing URL");
        Ok(Lookup::NotFound)
    }

    async fn open_detail_page<B: BrowserPage>(
        &self,
        page: &B,
        url: &str,
        student_id: &StudentId,
    ) -> Result<String> {
        page.goto(url).await?;

        let html = page.content().await?;
        let href = listing::find_link_by_text(&html, student_id.as_str())?.ok_or_else(|| {
            ScraperError::ElementNotFound(format!("link for {} on {}", student_id, url))
        })?;

        let base = page.current_url().await?.unwrap_or_else(|| url.to_string());
        let detail_url = listing::resolve_href(&base, &href)?;

        page.goto(&detail_url).await?;
        Ok(detail_url)
    }

    /// Reads the class list from an already loaded detail page.
    pub async fn extract_classes<B: BrowserPage>(&self, page: &B) -> Result<Vec<ClassToken>> {
        let html = page.content().await?;
        roster::parse_classes_from_html(&html)
    }
}

#[async_trait]
impl ClassSource for GobiernoSource {
    fn name(&self) -> SourceName {
        SourceName::Gobierno
    }

    async fn collect<P: PageProvider>(
        &self,
        pages: &P,
        student_id: &StudentId,
    ) -> Result<Lookup<Vec<ClassToken>>> {
        let page = pages.get_page().await?;

        let outcome = match self.resolve_detail_page(&*page, student_id).await {
            Ok(Lookup::Found(_)) => self.extract_classes(&*page).await.map(Lookup::Found),
            Ok(Lookup::NotFound) => Ok(Lookup::NotFound),
            Err(e) => Err(e),
        };

        if let Err(e) = page.close().await {
            warn!(error = %e, "failed to close page");
        }
        outcome
    }
}
