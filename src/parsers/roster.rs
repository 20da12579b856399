use crate::error::{Result, ScraperError};
use crate::models::ClassToken;
use scraper::Html;

use super::selector;

/// The paragraph right after the page title holds the enrolled classes.
const ROSTER_SELECTOR: &str = "h1 + p";
const LABEL_DELIMITER: &str = ": ";
const CLASS_DELIMITER: &str = "; ";

/// Parses the detail page of a student and returns its class tokens.
pub fn parse_classes_from_html(html: &str) -> Result<Vec<ClassToken>> {
    let document = Html::parse_document(html);
    let roster = selector(ROSTER_SELECTOR)?;

    let paragraph = document
        .select(&roster)
        .next()
        .ok_or_else(|| {
            ScraperError::ElementNotFound(format!("roster paragraph ({})", ROSTER_SELECTOR))
        })?;

    let text = paragraph.text().collect::<String>();
    parse_roster_text(&text)
}

/// Splits `"Asignaturas: Alg.T.2; Alg.S.1"` into `["Alg.T.2", "Alg.S.1"]`.
pub fn parse_roster_text(text: &str) -> Result<Vec<ClassToken>> {
    let classes = text.split(LABEL_DELIMITER).nth(1).ok_or_else(|| {
        ScraperError::ParsingError(format!(
            "roster text has no {:?} delimiter: {:?}",
            LABEL_DELIMITER, text
        ))
    })?;

    Ok(classes
        .trim()
        .split(CLASS_DELIMITER)
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roster_text() {
        let classes = parse_roster_text("Asignaturas: Alg.T.2; Alg.S.1; Alg.L.3").unwrap();
        assert_eq!(classes, vec!["Alg.T.2", "Alg.S.1", "Alg.L.3"]);
    }

    #[test]
    fn test_missing_delimiter_is_a_parse_error() {
        let result = parse_roster_text("Asignaturas Alg.T.2; Alg.S.1");
        assert!(matches!(result, Err(ScraperError::ParsingError(_))));
    }
}
