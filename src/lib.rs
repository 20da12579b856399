// Declare all our modules
pub mod browser;
mod client;
pub mod config;
mod error;
mod models;
pub mod parsers;
pub mod retry;
pub mod sources;

// Publicly export the parts of our library that users will need
pub use browser::{BrowserPage, PageProvider, ScopedPage, ScrollContainer, SessionManager};
pub use client::{ClassListClient, merge_classes, reconcile};
pub use config::{BrowserSettings, Settings};
pub use error::{Result, ScraperError};
pub use models::*;
pub use sources::{ClassSource, GobiernoSource, SharePointSource, fetch_source};
