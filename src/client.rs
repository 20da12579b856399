use crate::browser::{PageProvider, SessionManager};
use crate::config::Settings;
use crate::error::Result;
use crate::models::{ClassToken, ReconciledResult, SourceName, SourceResult, StudentId};
use crate::sources::{GobiernoSource, SharePointSource, fetch_source};
use std::collections::{BTreeMap, HashSet};
use tracing::info;

/// Retrieves a student's classes from both sources and merges them.
pub struct ClassListClient {
    settings: Settings,
    gobierno: GobiernoSource,
    sharepoint: SharePointSource,
}

impl ClassListClient {
    pub fn new(settings: Settings) -> Self {
        let gobierno = GobiernoSource::new(settings.gobierno_urls.clone());
        let sharepoint = SharePointSource::new(settings.sharepoint_url.clone(), &settings.browser);
        Self {
            settings,
            gobierno,
            sharepoint,
        }
    }

    /// Replaces the default sources, e.g. to tune retry or scroll limits.
    pub fn with_sources(mut self, gobierno: GobiernoSource, sharepoint: SharePointSource) -> Self {
        self.gobierno = gobierno;
        self.sharepoint = sharepoint;
        self
    }

    /// Full run: normalizes the identifier, launches a browser session,
    /// queries both sources and always tears the session down.
    ///
    /// Only session start-up failures are returned as errors; source
    /// failures show up as `success: false` in the result.
    pub async fn scrape_all(&self, student_id_raw: &str) -> Result<ReconciledResult> {
        let student_id = StudentId::parse(student_id_raw)?;
        info!(uo = %student_id, "retrieving classes");

        let mut session = SessionManager::new(self.settings.browser.clone());
        if let Err(e) = session.initialize().await {
            session.cleanup().await;
            return Err(e);
        }

        let result = self.scrape_with(&session, &student_id).await;
        session.cleanup().await;
        Ok(result)
    }

    /// Queries both sources concurrently, each on its own page from `pages`.
    pub async fn scrape_with<P: PageProvider>(
        &self,
        pages: &P,
        student_id: &StudentId,
    ) -> ReconciledResult {
        let (gobierno, sharepoint) = tokio::join!(
            fetch_source(&self.gobierno, pages, student_id),
            fetch_source(&self.sharepoint, pages, student_id),
        );
        reconcile(student_id, &gobierno, &sharepoint)
    }
}

/// Combines the two source results; the listing source always comes first.
pub fn reconcile(
    student_id: &StudentId,
    gobierno: &SourceResult,
    sharepoint: &SourceResult,
) -> ReconciledResult {
    let successful = [gobierno, sharepoint]
        .into_iter()
        .filter(|r| r.success)
        .map(|r| r.class_tokens.as_slice());

    let mut per_source_success = BTreeMap::new();
    per_source_success.insert(SourceName::Gobierno, gobierno.success);
    per_source_success.insert(SourceName::SharePoint, sharepoint.success);

    ReconciledResult {
        success: gobierno.success || sharepoint.success,
        student_id: student_id.clone(),
        class_tokens: merge_classes(successful),
        per_source_success,
    }
}

/// Concatenates the lists, keeping only the first occurrence of each class.
pub fn merge_classes<'a, I>(lists: I) -> Vec<ClassToken>
where
    I: IntoIterator<Item = &'a [ClassToken]>,
{
    let mut seen = HashSet::new();
    let mut merged = Vec::new();

    for class in lists.into_iter().flatten() {
        if seen.insert(class.as_str()) {
            merged.push(class.clone());
        }
    }

    merged
}
