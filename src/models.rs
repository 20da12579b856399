use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::error::{Result, ScraperError};

/// An opaque identifier for one enrolled class or group session (e.g. `"Alg.T.2"`).
pub type ClassToken = String;

/// The institutional student identifier ("UO") used as lookup key on both sites.
///
/// Always stored in canonical form: a lowercase `uo` prefix followed by the
/// rest of the identifier exactly as supplied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentId(String);

impl StudentId {
    /// Normalizes user input into a `StudentId`.
    ///
    /// - `"301887"` -> `"uo301887"`
    /// - `"Uo301887"` / `"UO301887"` -> `"uo301887"`
    ///
    /// Only digits may follow the optional prefix.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let suffix = match trimmed.get(..2) {
            Some(prefix) if prefix.eq_ignore_ascii_case("uo") => &trimmed[2..],
            _ => trimmed,
        };

        if suffix.is_empty() || !suffix.chars().all(|c| c.is_ascii_digit()) {
            return Err(ScraperError::InvalidStudentId(raw.to_string()));
        }

        Ok(Self(format!("uo{}", suffix)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Uppercased form used in the roster spreadsheet file names.
    pub fn to_uppercase(&self) -> String {
        self.0.to_uppercase()
    }
}

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The two independent origins of class data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceName {
    /// The faculty course-listing site (HTML roster pages).
    Gobierno,
    /// The document-sharing site hosting spreadsheet rosters.
    #[serde(rename = "sharepoint")]
    SharePoint,
}

impl SourceName {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceName::Gobierno => "gobierno",
            SourceName::SharePoint => "sharepoint",
        }
    }
}

impl fmt::Display for SourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a lookup that may legitimately find nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
}

/// The result reported by a single source. Never mutated after it is produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceResult {
    pub success: bool,
    #[serde(rename = "uo")]
    pub student_id: StudentId,
    #[serde(rename = "classes")]
    pub class_tokens: Vec<ClassToken>,
}

impl SourceResult {
    pub fn found(student_id: StudentId, class_tokens: Vec<ClassToken>) -> Self {
        Self {
            success: true,
            student_id,
            class_tokens,
        }
    }

    pub fn failed(student_id: StudentId) -> Self {
        Self {
            success: false,
            student_id,
            class_tokens: Vec::new(),
        }
    }
}

/// The merged answer produced from both sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciledResult {
    /// True when at least one source succeeded.
    pub success: bool,
    #[serde(rename = "uo")]
    pub student_id: StudentId,
    /// Deduplicated classes, first-seen order, listing source first.
    #[serde(rename = "classes")]
    pub class_tokens: Vec<ClassToken>,
    #[serde(rename = "sources")]
    pub per_source_success: BTreeMap<SourceName, bool>,
}

/// A roster file located in the document-sharing list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetFile {
    /// File name as shown in the list (trailing metadata stripped).
    pub file_name: String,
    /// Index of the row among the rows rendered when it was found.
    pub row_index: usize,
    /// Where the download was saved inside the session temp directory.
    pub path: PathBuf,
}

/// Classes recognized in a roster spreadsheet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassSheet {
    /// Recognized class tokens in row-major order, without repeats.
    pub classes: Vec<ClassToken>,
    /// Classes grouped by subject prefix, each group sorted.
    pub subjects: BTreeMap<String, Vec<ClassToken>>,
}

/// Soft-failing result of processing a spreadsheet file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetResult {
    pub success: bool,
    #[serde(rename = "uo", skip_serializing_if = "Option::is_none")]
    pub student_id: Option<StudentId>,
    pub classes: Vec<ClassToken>,
    pub subjects: BTreeMap<String, Vec<ClassToken>>,
}
