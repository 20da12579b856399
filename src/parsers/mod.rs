pub mod file_name;
pub mod listing;
pub mod roster;
pub mod spreadsheet;

use crate::error::{Result, ScraperError};
use scraper::Selector;

pub(crate) fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css)
        .map_err(|e| ScraperError::ParsingError(format!("invalid selector {}: {}", css, e)))
}
