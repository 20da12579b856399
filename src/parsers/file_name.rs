//! Naming conventions of the roster files on the document-sharing site.

use crate::models::StudentId;

pub const ROSTER_FILE_PREFIX: &str = "Lista_clases_";
const ROSTER_FILE_DOMAIN: &str = "@uniovi.es";
const XLS_EXTENSION: &str = ".xls";

/// `Lista_clases_<UPPERCASE UO>@uniovi.es.xls`
pub fn target_file_name(student_id: &StudentId) -> String {
    format!(
        "{}{}{}{}",
        ROSTER_FILE_PREFIX,
        student_id.to_uppercase(),
        ROSTER_FILE_DOMAIN,
        XLS_EXTENSION
    )
}

/// Extracts the file name shown in a list row.
///
/// Takes the first line of the row text and cuts it four characters after
/// the first `.xls`, dropping whatever metadata the list appends after the
/// extension. Returns `None` for blank rows.
pub fn candidate_file_name(row_text: &str) -> Option<String> {
    let first_line = row_text.lines().next()?.trim();
    if first_line.is_empty() {
        return None;
    }

    let name = match first_line.find(XLS_EXTENSION) {
        Some(index) => &first_line[..index + XLS_EXTENSION.len()],
        None => first_line,
    };
    Some(name.to_string())
}

/// Whether a candidate name follows the roster naming convention at all.
pub fn is_roster_file(name: &str) -> bool {
    name.starts_with(ROSTER_FILE_PREFIX)
}

/// File-system safe variant: spaces and slashes become underscores.
pub fn safe_file_name(name: &str) -> String {
    name.replace([' ', '/'], "_")
}
