// tests/support/mod.rs
//
// Scripted browser used by the source and client tests. Every page handed out
// by `FakeProvider` shares one `Site`, but keeps its own current URL and
// scroll offset.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tempfile::TempDir;
use uniovi_classes::{BrowserPage, PageProvider, Result, ScraperError, ScrollContainer};

pub const LISTING_URL: &str = "https://gobierno.test/grado/gd/?y=25-26&t=s1";
pub const MIRROR_URL: &str = "https://gobierno.test/grado/gd/?y=25-26&t=s2";
pub const SHAREPOINT_URL: &str = "https://sharepoint.test/personal/rosters";

#[derive(Default)]
pub struct Site {
    pub html: HashMap<String, String>,
    pub failing_urls: HashSet<String>,
    pub gotos: Vec<String>,

    pub rows: Vec<String>,
    /// Rows rendered at once by the virtualized list.
    pub window: usize,
    pub has_list_container: bool,
    /// Number of `wait_for_selector` calls that time out before one succeeds.
    pub row_wait_failures: u32,
    pub row_waits: u32,
    pub scrolls: u32,
    pub scroll_containers: Vec<ScrollContainer>,
    pub context_clicks: Vec<String>,
    /// Bytes written when the download action is clicked; `None` fails it.
    pub download: Option<Vec<u8>>,
    pub downloads: Vec<PathBuf>,

    pub closed_pages: usize,
}

#[derive(Default)]
struct Tab {
    url: Option<String>,
    offset: usize,
}

#[derive(Clone)]
pub struct FakePage {
    site: Arc<Mutex<Site>>,
    tab: Arc<Mutex<Tab>>,
}

impl FakePage {
    fn new(site: Arc<Mutex<Site>>) -> Self {
        Self {
            site,
            tab: Arc::new(Mutex::new(Tab::default())),
        }
    }

    fn site(&self) -> MutexGuard<'_, Site> {
        self.site.lock().unwrap()
    }

    fn tab(&self) -> MutexGuard<'_, Tab> {
        self.tab.lock().unwrap()
    }

    fn visible_rows(&self) -> Vec<String> {
        let site = self.site();
        let offset = self.tab().offset.min(site.rows.len());
        let end = (offset + site.window.max(1)).min(site.rows.len());
        site.rows[offset..end].to_vec()
    }
}

#[async_trait]
impl BrowserPage for FakePage {
    async fn goto(&self, url: &str) -> Result<()> {
        let mut site = self.site();
        site.gotos.push(url.to_string());
        if site.failing_urls.contains(url) {
            return Err(ScraperError::NavigationError(format!("{} is unreachable", url)));
        }
        drop(site);

        let mut tab = self.tab();
        tab.url = Some(url.to_string());
        tab.offset = 0;
        Ok(())
    }

    async fn current_url(&self) -> Result<Option<String>> {
        Ok(self.tab().url.clone())
    }

    async fn content(&self) -> Result<String> {
        let url = self.tab().url.clone().unwrap_or_default();
        let html = self.site().html.get(&url).cloned();
        Ok(html.unwrap_or_else(|| "<html><body></body></html>".to_string()))
    }

    async fn wait_for_selector(&self, selector: &str, _timeout: Duration) -> Result<()> {
        let mut site = self.site();
        site.row_waits += 1;
        if site.row_wait_failures > 0 {
            site.row_wait_failures -= 1;
            return Err(ScraperError::Timeout(selector.to_string()));
        }
        Ok(())
    }

    async fn has_element(&self, _selector: &str) -> Result<bool> {
        Ok(self.site().has_list_container)
    }

    async fn row_texts(
        &self,
        _container: &ScrollContainer,
        _row_selector: &str,
    ) -> Result<Vec<String>> {
        Ok(self.visible_rows())
    }

    async fn scroll_by(&self, container: &ScrollContainer, _delta_y: i64) -> Result<()> {
        let mut site = self.site();
        site.scrolls += 1;
        site.scroll_containers.push(container.clone());
        drop(site);

        self.tab().offset += 1;
        Ok(())
    }

    async fn context_click_row(
        &self,
        _container: &ScrollContainer,
        _row_selector: &str,
        index: usize,
    ) -> Result<()> {
        let rows = self.visible_rows();
        let row = rows
            .get(index)
            .cloned()
            .ok_or_else(|| ScraperError::ElementNotFound(format!("row {}", index)))?;
        self.site().context_clicks.push(row);
        Ok(())
    }

    async fn download_from_menu(
        &self,
        label: &str,
        _timeout: Duration,
        save_as: &Path,
    ) -> Result<PathBuf> {
        let bytes = self.site().download.clone();
        let Some(bytes) = bytes else {
            return Err(ScraperError::DownloadError(format!("{} produced no file", label)));
        };

        std::fs::write(save_as, bytes)?;
        self.site().downloads.push(save_as.to_path_buf());
        Ok(save_as.to_path_buf())
    }

    async fn pause(&self, _duration: Duration) {}

    async fn close(&self) -> Result<()> {
        self.site().closed_pages += 1;
        Ok(())
    }
}

pub struct FakeProvider {
    pub site: Arc<Mutex<Site>>,
    temp_dir: TempDir,
    pages_created: AtomicUsize,
}

impl FakeProvider {
    pub fn new(site: Site) -> Self {
        Self {
            site: Arc::new(Mutex::new(site)),
            temp_dir: tempfile::Builder::new().prefix("uo_classes_test_").tempdir().unwrap(),
            pages_created: AtomicUsize::new(0),
        }
    }

    pub fn page(&self) -> FakePage {
        FakePage::new(self.site.clone())
    }

    pub fn site(&self) -> MutexGuard<'_, Site> {
        self.site.lock().unwrap()
    }

    pub fn pages_created(&self) -> usize {
        self.pages_created.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageProvider for FakeProvider {
    type Page = FakePage;

    async fn create_page(&self) -> Result<FakePage> {
        self.pages_created.fetch_add(1, Ordering::SeqCst);
        Ok(self.page())
    }

    fn download_dir(&self) -> Result<PathBuf> {
        Ok(self.temp_dir.path().to_path_buf())
    }
}

pub fn listing_html(entries: &[(&str, &str)]) -> String {
    let items: String = entries
        .iter()
        .map(|(uo, href)| format!(r#"<li><a href="{}">{} - Alumno</a></li>"#, href, uo))
        .collect();
    format!("<html><body><h1>Grupos</h1><ul>{}</ul></body></html>", items)
}

pub fn detail_html(classes: &[&str]) -> String {
    format!(
        "<html><body><h1>UO301887</h1><p>Asignaturas: {}</p></body></html>",
        classes.join("; ")
    )
}

/// File rows as the document list renders them: name, modified, owner.
pub fn file_rows(names: &[&str]) -> Vec<String> {
    names
        .iter()
        .map(|name| format!("{}Hace 3 días\nPérez Fernández\n24 KB", name))
        .collect()
}

pub fn filler_rows(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("Lista_clases_UO{:06}@uniovi.es.xlsAyer\nPérez Fernández", 100000 + i))
        .collect()
}

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures").join(name)
}

pub fn roster_fixture() -> Vec<u8> {
    std::fs::read(fixture_path("roster_uo301887.xlsx")).unwrap()
}
