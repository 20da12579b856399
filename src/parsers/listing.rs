use crate::error::{Result, ScraperError};
use scraper::Html;
use url::Url;

use super::selector;

/// Returns the `href` of the first anchor whose visible text contains
/// `needle`, compared case-insensitively.
///
/// `Ok(None)` means no such anchor exists, or it has no link target.
pub fn find_link_by_text(html: &str, needle: &str) -> Result<Option<String>> {
    let document = Html::parse_document(html);
    let anchors = selector("a")?;
    let needle = needle.to_lowercase();

    let anchor = document
        .select(&anchors)
        .find(|a| a.text().collect::<String>().to_lowercase().contains(&needle));

    Ok(anchor
        .and_then(|a| a.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .map(str::to_string))
}

/// Resolves a possibly relative `href` against the page it was found on.
pub fn resolve_href(base: &str, href: &str) -> Result<String> {
    let base = Url::parse(base)
        .map_err(|e| ScraperError::ParsingError(format!("invalid page URL {}: {}", base, e)))?;
    let target = base
        .join(href)
        .map_err(|e| ScraperError::ParsingError(format!("invalid link {}: {}", href, e)))?;
    Ok(target.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
        <html><body>
            <ul>
                <li><a href="/grado/gd/alumno/uo100000">UO100000 - Ana</a></li>
                <li><a href="alumno/uo301887">UO301887 - uo301887 Pérez</a></li>
                <li><a>uo999999 sin enlace</a></li>
            </ul>
        </body></html>
    "#;

    #[test]
    fn test_first_matching_anchor_wins() {
        let href = find_link_by_text(LISTING, "uo301887").unwrap();
        assert_eq!(href.as_deref(), Some("alumno/uo301887"));

        let href = find_link_by_text(LISTING, "Uo100000").unwrap();
        assert_eq!(href.as_deref(), Some("/grado/gd/alumno/uo100000"));
    }

    #[test]
    fn test_anchor_without_href() {
        assert_eq!(find_link_by_text(LISTING, "uo999999").unwrap(), None);
        assert_eq!(find_link_by_text(LISTING, "uo000000").unwrap(), None);
    }

    #[test]
    fn test_resolve_relative_href() {
        let base = "https://gobierno.example/grado/gd/?y=25-26";
        let url = resolve_href(base, "alumno/uo301887").unwrap();
        assert_eq!(url, "https://gobierno.example/grado/gd/alumno/uo301887");

        let absolute =
            resolve_href("https://gobierno.example/grado/gd/", "https://other.example/x").unwrap();
        assert_eq!(absolute, "https://other.example/x");
    }
}
