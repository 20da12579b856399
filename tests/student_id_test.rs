// tests/student_id_test.rs

use uniovi_classes::parsers::file_name::target_file_name;
use uniovi_classes::{Result, ScraperError, StudentId};

#[test]
fn test_bare_number_gets_prefix() -> Result<()> {
    let uo = StudentId::parse("301887")?;
    assert_eq!(uo.as_str(), "uo301887");
    Ok(())
}

#[test]
fn test_prefix_case_is_normalized() -> Result<()> {
    for raw in ["uo301887", "Uo301887", "UO301887", "uO301887", "  UO301887\n"] {
        let uo = StudentId::parse(raw)?;
        println!("{:?} -> {}", raw, uo);
        assert_eq!(uo.as_str(), "uo301887");
    }
    Ok(())
}

#[test]
fn test_normalized_id_feeds_file_name() -> Result<()> {
    let uo = StudentId::parse("Uo301887")?;
    assert_eq!(uo.to_uppercase(), "UO301887");
    assert_eq!(target_file_name(&uo), "Lista_clases_UO301887@uniovi.es.xls");
    Ok(())
}

#[test]
fn test_empty_input_is_rejected() {
    for raw in ["", "   ", "uo", "UO", "uo 301887"] {
        let err = StudentId::parse(raw).unwrap_err();
        assert!(matches!(err, ScraperError::InvalidStudentId(_)), "{:?} gave {:?}", raw, err);
    }
}

#[test]
fn test_non_numeric_suffix_is_rejected() {
    for raw in ["abc", "uoabc", "UO30188x", "uo-301887", "301887.0"] {
        let err = StudentId::parse(raw).unwrap_err();
        assert!(matches!(err, ScraperError::InvalidStudentId(_)), "{:?} gave {:?}", raw, err);
    }
}

#[test]
fn test_serializes_as_plain_string() -> Result<()> {
    let uo = StudentId::parse("301887")?;
    assert_eq!(serde_json::to_string(&uo)?, r#""uo301887""#);
    Ok(())
}
