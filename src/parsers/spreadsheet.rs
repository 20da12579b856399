//! Class extraction from downloaded roster spreadsheets.
//!
//! A roster sheet mixes class groups (`MOR-PL1`) with room codes (`B04`),
//! clock ranges (`11:00-12:00`), weekday columns and header labels. Every
//! string cell is split into words and each word is run through
//! [`is_class_token`].

use calamine::{Data, Range, Reader, Xls, Xlsx, open_workbook, open_workbook_auto};
use std::collections::{BTreeMap, HashSet};
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

use crate::error::{Result, ScraperError};
use crate::models::{ClassSheet, ClassToken, SheetResult, StudentId};

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0];

const WEEKDAYS: &[&str] = &[
    "lunes", "martes", "miercoles", "miércoles", "jueves", "viernes", "sabado", "sábado",
    "domingo",
];

const HEADER_LABELS: &[&str] = &[
    "nombre", "apellidos", "asignatura", "grupo", "grupos", "aula", "hora", "horario", "dia",
    "día", "uo", "email", "correo", "dni",
];

const MAX_SUBJECT_LEN: usize = 12;
const MAX_GROUP_LEN: usize = 8;

/// Reads a roster spreadsheet, never failing: problems are logged and
/// reported as `success: false` with no classes.
pub fn extract_classes(path: &Path, student_id: Option<&StudentId>) -> SheetResult {
    match read_class_sheet(path) {
        Ok(sheet) => {
            info!(path = %path.display(), classes = sheet.classes.len(), "spreadsheet processed");
            SheetResult {
                success: true,
                student_id: student_id.cloned(),
                classes: sheet.classes,
                subjects: sheet.subjects,
            }
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not extract classes from spreadsheet");
            SheetResult {
                success: false,
                student_id: student_id.cloned(),
                classes: Vec::new(),
                subjects: BTreeMap::new(),
            }
        }
    }
}

/// Reads every worksheet of `path` and collects the class tokens found.
pub fn read_class_sheet(path: &Path) -> Result<ClassSheet> {
    if !path.is_file() {
        return Err(ScraperError::SpreadsheetError(format!(
            "{} does not exist",
            path.display()
        )));
    }

    let sheets = load_worksheets(path)?;
    let classes = classes_from_cells(sheets.iter().flat_map(|range| {
        range.rows().flat_map(|row| row.iter().filter_map(cell_text))
    }));
    let subjects = group_by_subject(&classes);

    Ok(ClassSheet { classes, subjects })
}

fn load_worksheets(path: &Path) -> Result<Vec<Range<Data>>> {
    let sheets = match sniff_format(path)? {
        Format::Xlsx => {
            let mut workbook: Xlsx<_> = open_workbook(path).map_err(spreadsheet_error)?;
            workbook.worksheets()
        }
        Format::Xls => {
            let mut workbook: Xls<_> = open_workbook(path).map_err(spreadsheet_error)?;
            workbook.worksheets()
        }
        Format::ByExtension => {
            let mut workbook = open_workbook_auto(path).map_err(spreadsheet_error)?;
            workbook.worksheets()
        }
    };

    if sheets.is_empty() {
        return Err(ScraperError::SpreadsheetError(format!(
            "{} has no worksheets",
            path.display()
        )));
    }

    Ok(sheets.into_iter().map(|(_, range)| range).collect())
}

enum Format {
    Xlsx,
    Xls,
    ByExtension,
}

/// Exported roster names end in `.xls` regardless of the real container.
fn sniff_format(path: &Path) -> Result<Format> {
    let mut header = [0u8; 4];
    let mut file = std::fs::File::open(path)?;
    let read = file.read(&mut header)?;
    let header = &header[..read];

    Ok(if header == ZIP_MAGIC {
        Format::Xlsx
    } else if header == OLE_MAGIC {
        Format::Xls
    } else {
        Format::ByExtension
    })
}

fn spreadsheet_error(e: impl std::fmt::Display) -> ScraperError {
    ScraperError::SpreadsheetError(e.to_string())
}

fn cell_text(cell: &Data) -> Option<&str> {
    match cell {
        Data::String(s) => Some(s.as_str()),
        _ => None,
    }
}

/// Collects recognized class tokens from cell texts, keeping first-seen order.
pub fn classes_from_cells<'a, I>(cells: I) -> Vec<ClassToken>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    let mut classes = Vec::new();

    for cell in cells {
        for word in cell.split(is_word_separator) {
            if is_class_token(word) && seen.insert(word.to_string()) {
                classes.push(word.to_string());
            }
        }
    }

    classes
}

fn is_word_separator(c: char) -> bool {
    c.is_whitespace() || matches!(c, ',' | ';' | '(' | ')' | '/')
}

/// Decides whether a single word is a class group like `MOR-PL1`.
///
/// A class token is `<SUBJECT>-<GROUP>`: the subject is letters only and the
/// group starts with a letter and contains at least one digit. Room codes,
/// clock ranges, weekday names and header labels never match.
pub fn is_class_token(word: &str) -> bool {
    let word = word.trim();
    if word.is_empty()
        || is_clock_range(word)
        || is_weekday(word)
        || is_header_label(word)
        || is_room_code(word)
    {
        return false;
    }

    let Some((subject, group)) = word.split_once('-') else {
        return false;
    };

    let subject_ok = !subject.is_empty()
        && subject.chars().count() <= MAX_SUBJECT_LEN
        && subject.chars().all(char::is_alphabetic);

    let group_ok = !group.is_empty()
        && group.chars().count() <= MAX_GROUP_LEN
        && group.chars().next().is_some_and(char::is_alphabetic)
        && group.chars().any(|c| c.is_ascii_digit())
        && group.chars().all(char::is_alphanumeric);

    subject_ok && group_ok
}

/// `HH:MM-HH:MM`, with optional spaces around the dash.
pub fn is_clock_range(word: &str) -> bool {
    let Some((start, end)) = word.split_once('-') else {
        return is_clock_time(word);
    };
    is_clock_time(start.trim()) && is_clock_time(end.trim())
}

fn is_clock_time(s: &str) -> bool {
    let Some((hours, minutes)) = s.split_once(':') else {
        return false;
    };
    (1..=2).contains(&hours.len())
        && minutes.len() == 2
        && hours.chars().all(|c| c.is_ascii_digit())
        && minutes.chars().all(|c| c.is_ascii_digit())
}

pub fn is_weekday(word: &str) -> bool {
    let lower = word.to_lowercase();
    WEEKDAYS.contains(&lower.as_str())
}

pub fn is_header_label(word: &str) -> bool {
    let lower = word.trim_end_matches(':').to_lowercase();
    HEADER_LABELS.contains(&lower.as_str())
}

/// Short letter+digit codes without a dash, such as `B04` or `AS12`.
pub fn is_room_code(word: &str) -> bool {
    word.len() <= 6
        && !word.contains('-')
        && word.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
        && word.chars().all(|c| c.is_ascii_alphanumeric())
        && word.chars().any(|c| c.is_ascii_digit())
}

/// Groups classes by the text before their first `-`; each group is sorted.
pub fn group_by_subject(classes: &[ClassToken]) -> BTreeMap<String, Vec<ClassToken>> {
    let mut groups: BTreeMap<String, Vec<ClassToken>> = BTreeMap::new();

    for class in classes {
        let subject = class.split('-').next().unwrap_or(class.as_str());
        groups.entry(subject.to_string()).or_default().push(class.clone());
    }

    for members in groups.values_mut() {
        members.sort();
        members.dedup();
    }

    groups
}
