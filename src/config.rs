use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, ScraperError};

pub const DEFAULT_GOBIERNO_URLS: &[&str] = &[
    "https://gobierno.ingenieriainformatica.uniovi.es/grado/gd/?y=25-26&t=s1",
    "https://gobierno.ingenieriainformatica.uniovi.es/grado/gd/?y=25-26&t=s2",
];

pub const DEFAULT_SHAREPOINT_URL: &str =
    "https://unioviedo-my.sharepoint.com/:f:/g/personal/perezfernandez_uniovi_es/Eu9qlYNQEYhMi2gDAxmrmvABPSoVDkYi4cCTXf_ZVyql9w?e=a3ZGBs";

/// Options for the controlled browser session.
#[derive(Debug, Clone)]
pub struct BrowserSettings {
    /// Run Chromium without a visible window.
    pub headless: bool,
    /// Explicit browser binary; auto-detected when `None`.
    pub chrome_executable: Option<PathBuf>,
    /// Upper bound for a page navigation.
    pub navigation_timeout: Duration,
    /// Upper bound for element waits and other page actions.
    pub selector_timeout: Duration,
    /// Upper bound for a download to finish once triggered.
    pub download_timeout: Duration,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_executable: None,
            navigation_timeout: Duration::from_secs(120),
            selector_timeout: Duration::from_secs(60),
            download_timeout: Duration::from_secs(60),
        }
    }
}

/// Process-level settings, usually loaded from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Candidate course-listing pages, tried in order.
    pub gobierno_urls: Vec<String>,
    /// Root folder of the document-sharing site.
    pub sharepoint_url: String,
    pub browser: BrowserSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gobierno_urls: DEFAULT_GOBIERNO_URLS.iter().map(|u| u.to_string()).collect(),
            sharepoint_url: DEFAULT_SHAREPOINT_URL.to_string(),
            browser: BrowserSettings::default(),
        }
    }
}

impl Settings {
    /// Loads `.env` (if present) and reads `GOBIERNO_URLS`, `SHAREPOINT_URL`,
    /// `BROWSER_HEADLESS` and `CHROME_EXECUTABLE`.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup, falling back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Settings::default();

        if let Some(raw) = lookup("GOBIERNO_URLS") {
            let urls = parse_url_list(&raw);
            if urls.is_empty() {
                return Err(ScraperError::ConfigError(
                    "GOBIERNO_URLS does not contain any URL".to_string(),
                ));
            }
            settings.gobierno_urls = urls;
        }

        if let Some(raw) = lookup("SHAREPOINT_URL") {
            let url = raw.trim();
            if url.is_empty() {
                return Err(ScraperError::ConfigError("SHAREPOINT_URL is empty".to_string()));
            }
            settings.sharepoint_url = url.to_string();
        }

        if let Some(raw) = lookup("BROWSER_HEADLESS") {
            settings.browser.headless = parse_bool(&raw).ok_or_else(|| {
                ScraperError::ConfigError(format!(
                    "BROWSER_HEADLESS must be a boolean, got {:?}",
                    raw
                ))
            })?;
        }

        if let Some(raw) = lookup("CHROME_EXECUTABLE") {
            let path = raw.trim();
            if !path.is_empty() {
                settings.browser.chrome_executable = Some(PathBuf::from(path));
            }
        }

        Ok(settings)
    }
}

fn parse_url_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let settings = Settings::from_lookup(|_| None).unwrap();
        assert_eq!(settings.gobierno_urls.len(), 2);
        assert!(settings.gobierno_urls[0].contains("grado/gd"));
        assert!(settings.sharepoint_url.contains("sharepoint.com"));
        assert!(settings.browser.headless);
        assert_eq!(settings.browser.navigation_timeout, Duration::from_secs(120));
        assert_eq!(settings.browser.selector_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_comma_separated_urls() {
        let settings = Settings::from_lookup(lookup_from(&[(
            "GOBIERNO_URLS",
            " https://a.example/list , ,https://b.example/list",
        )]))
        .unwrap();
        assert_eq!(
            settings.gobierno_urls,
            vec!["https://a.example/list", "https://b.example/list"]
        );
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(Settings::from_lookup(lookup_from(&[("GOBIERNO_URLS", " , ")])).is_err());
        assert!(Settings::from_lookup(lookup_from(&[("BROWSER_HEADLESS", "maybe")])).is_err());
        assert!(Settings::from_lookup(lookup_from(&[("SHAREPOINT_URL", "  ")])).is_err());
    }

    #[test]
    fn test_headless_and_executable() {
        let settings = Settings::from_lookup(lookup_from(&[
            ("BROWSER_HEADLESS", "no"),
            ("CHROME_EXECUTABLE", "/usr/bin/chromium"),
        ]))
        .unwrap();
        assert!(!settings.browser.headless);
        assert_eq!(
            settings.browser.chrome_executable,
            Some(PathBuf::from("/usr/bin/chromium"))
        );
    }
}
