//! Reading caller inputs.
//!
//! - the answers file: a JSON object `{feature: answer}`; `-` reads stdin
//! - the reference dataset header used by `lyrae check`
//!
//! Unreadable or malformed inputs are usage errors (exit code 2).

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::domain::Answers;
use crate::error::AppError;

/// Load the answers object.
pub fn read_answers(path: &Path) -> Result<Answers, AppError> {
    let raw = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| AppError::usage(format!("Failed to read answers from stdin: {e}")))?;
        buf
    } else {
        std::fs::read_to_string(path).map_err(|e| {
            AppError::usage(format!("Failed to open answers file '{}': {e}", path.display()))
        })?
    };
    parse_answers(&raw)
}

/// Parse an answers document. Blank input is an empty answer set.
pub fn parse_answers(raw: &str) -> Result<Answers, AppError> {
    if raw.trim().is_empty() {
        return Ok(Answers::new());
    }
    serde_json::from_str(raw)
        .map_err(|e| AppError::usage(format!("Answers must be a JSON object of feature -> answer: {e}")))
}

/// Column names of a reference dataset (CSV header row).
pub fn read_reference_columns(path: &Path) -> Result<Vec<String>, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::usage(format!("Failed to open reference dataset '{}': {e}", path.display()))
    })?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(file);
    let headers = reader.headers().map_err(|e| {
        AppError::usage(format!("Failed to read reference dataset header '{}': {e}", path.display()))
    })?;
    Ok(headers.iter().map(|h| h.trim_start_matches('\u{feff}').to_string()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Answer;

    #[test]
    fn parses_mixed_answer_types() {
        let answers = parse_answers(
            r#"{"ELISA_pos": "Oui", "Age": 12, "Boiterie": null, "Tiques": true, "Extra": "x"}"#,
        )
        .unwrap();
        assert_eq!(answers.get("ELISA_pos"), Some(&Answer::text("Oui")));
        assert_eq!(answers.get("Age"), Some(&Answer::Number(12.0)));
        assert_eq!(answers.get("Boiterie"), Some(&Answer::Null));
        assert_eq!(answers.get("Tiques"), Some(&Answer::Flag(true)));
        assert_eq!(answers.len(), 5);
    }

    #[test]
    fn blank_document_is_empty_and_arrays_are_rejected() {
        assert!(parse_answers("  \n").unwrap().is_empty());
        let err = parse_answers("[1, 2]").unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn reads_reference_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ref.csv");
        std::fs::write(&path, "\u{feff}Age, Sexe ,target\n12,Jument,1\n").unwrap();
        assert_eq!(read_reference_columns(&path).unwrap(), vec!["Age", "Sexe", "target"]);
        assert_eq!(
            read_answers(&dir.path().join("missing.json")).unwrap_err().exit_code(),
            2
        );
    }
}
