pub mod gobierno;
pub mod sharepoint;

pub use gobierno::GobiernoSource;
pub use sharepoint::SharePointSource;

use async_trait::async_trait;
use tracing::{Instrument, info, info_span, warn};

use crate::browser::PageProvider;
use crate::error::Result;
use crate::models::{ClassToken, Lookup, SourceName, SourceResult, StudentId};

/// One independent origin of class data.
#[async_trait]
pub trait ClassSource: Send + Sync {
    fn name(&self) -> SourceName;

    /// Looks up the classes of `student_id`, using pages from `pages`.
    ///
    /// `Ok(Lookup::NotFound)` is a normal outcome (the student is not listed);
    /// errors are transient or structural failures.
    async fn collect<P: PageProvider>(
        &self,
        pages: &P,
        student_id: &StudentId,
    ) -> Result<Lookup<Vec<ClassToken>>>;
}

/// Runs a source and converts every outcome into a [`SourceResult`].
///
/// Nothing escapes this boundary: not-found and errors both become
/// `success: false` with no classes.
pub async fn fetch_source<S, P>(source: &S, pages: &P, student_id: &StudentId) -> SourceResult
where
    S: ClassSource,
    P: PageProvider,
{
    let span = info_span!("source", source = %source.name(), uo = %student_id);

    async {
        match source.collect(pages, student_id).await {
            Ok(Lookup::Found(classes)) => {
                info!(classes = classes.len(), "source succeeded");
                SourceResult::found(student_id.clone(), classes)
            }
            Ok(Lookup::NotFound) => {
                info!("student not found in source");
                SourceResult::failed(student_id.clone())
            }
            Err(e) => {
                warn!(error = %e, "source failed");
                SourceResult::failed(student_id.clone())
            }
        }
    }
    .instrument(span)
    .await
}
