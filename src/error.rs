use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("Browser automation failed: {0}")]
    BrowserError(#[from] chromiumoxide::error::CdpError),

    #[error("Failed to initialize the browser session: {0}")]
    InitializationError(String),

    #[error("The browser session has not been initialized")]
    NotInitialized,

    #[error("Navigation failed: {0}")]
    NavigationError(String),

    #[error("Timed out waiting for {0}")]
    Timeout(String),

    #[error("Failed to parse page content: {0}")]
    ParsingError(String),

    #[error("Could not find required element on the page: {0}")]
    ElementNotFound(String),

    #[error("Invalid student identifier: {0:?}")]
    InvalidStudentId(String),

    #[error("Failed to read spreadsheet: {0}")]
    SpreadsheetError(String),

    #[error("Download failed: {0}")]
    DownloadError(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("{operation} failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        operation: String,
        attempts: u32,
        last: Box<ScraperError>,
    },

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ScraperError>;
