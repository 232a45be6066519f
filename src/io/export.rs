//! Export an evaluated case to JSON and to a one-row CSV.
//!
//! The CSV is meant to be appended to spreadsheets: fixed summary columns
//! first, then every answered field.

use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::app::pipeline::Evaluation;
use crate::domain::{Answer, Answers, GeocodeResult};
use crate::error::AppError;
use crate::text::normalize_key;

/// Subject name used when the caller gives none.
pub const DEFAULT_SUBJECT: &str = "CHEVAL_1";

const SUMMARY_COLUMNS: &[&str] = &[
    "subject_name",
    "probability",
    "category",
    "risk_class",
    "geo_lat",
    "geo_lon",
    "geo_display_name",
];

/// Everything written for one case.
#[derive(Debug, Clone, Serialize)]
pub struct CaseExport<'a> {
    pub subject_name: String,
    pub exported_at: DateTime<Utc>,
    pub probability: f64,
    pub category: &'static str,
    pub category_label: &'static str,
    pub risk_label: Option<&'a str>,
    pub geocode: Option<&'a GeocodeResult>,
    pub present_feature_count: usize,
    pub feature_count: usize,
    pub missing_feature_names: &'a [String],
    pub answers: &'a Answers,
}

impl<'a> CaseExport<'a> {
    pub fn new(subject: Option<&str>, eval: &'a Evaluation, answers: &'a Answers) -> Self {
        Self {
            subject_name: subject_name(subject),
            exported_at: Utc::now(),
            probability: eval.probability,
            category: eval.category.as_str(),
            category_label: eval.category.display_fr(),
            risk_label: eval.risk_label.as_deref(),
            geocode: eval.location.as_ref(),
            present_feature_count: eval.present_feature_count,
            feature_count: eval.feature_count,
            missing_feature_names: &eval.missing_feature_names,
            answers,
        }
    }

    /// `lyrae_<normalized subject>_case`
    pub fn file_stem(&self) -> String {
        format!("lyrae_{}_case", normalize_key(&self.subject_name))
    }

    fn csv_row(&self) -> (Vec<String>, Vec<String>) {
        let point = self.geocode.and_then(GeocodeResult::point);
        let mut header: Vec<String> = SUMMARY_COLUMNS.iter().map(|s| s.to_string()).collect();
        let mut row = vec![
            self.subject_name.clone(),
            format!("{:.6}", self.probability),
            self.category.to_string(),
            self.risk_label.unwrap_or_default().to_string(),
            point.map(|p| p.lat.to_string()).unwrap_or_default(),
            point.map(|p| p.lon.to_string()).unwrap_or_default(),
            point.map(|p| p.display_name.clone()).unwrap_or_default(),
        ];
        for (key, answer) in self.answers {
            if SUMMARY_COLUMNS.contains(&key.as_str()) {
                continue;
            }
            header.push(key.clone());
            row.push(answer_text(answer));
        }
        (header, row)
    }
}

fn subject_name(subject: Option<&str>) -> String {
    match subject.map(str::trim) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => DEFAULT_SUBJECT.to_string(),
    }
}

fn answer_text(answer: &Answer) -> String {
    match answer {
        Answer::Null => String::new(),
        Answer::Flag(b) => b.to_string(),
        Answer::Number(n) => n.to_string(),
        Answer::Text(s) => s.clone(),
    }
}

/// Write the case as pretty JSON.
pub fn write_case_json(path: &Path, case: &CaseExport<'_>) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::runtime(format!("Failed to create export JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, case)
        .map_err(|e| AppError::runtime(format!("Failed to write export JSON '{}': {e}", path.display())))
}

/// Write the case as a header + one-row CSV.
pub fn write_case_csv(path: &Path, case: &CaseExport<'_>) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::runtime(format!("Failed to create export CSV '{}': {e}", path.display())))?;
    let (header, row) = case.csv_row();
    writer
        .write_record(&header)
        .and_then(|()| writer.write_record(&row))
        .map_err(|e| AppError::runtime(format!("Failed to write export CSV '{}': {e}", path.display())))?;
    writer
        .flush()
        .map_err(|e| AppError::runtime(format!("Failed to write export CSV '{}': {e}", path.display())))
}

/// Write both exports into `dir` under the default file names.
pub fn export_case(dir: &Path, case: &CaseExport<'_>) -> Result<(PathBuf, PathBuf), AppError> {
    std::fs::create_dir_all(dir)
        .map_err(|e| AppError::runtime(format!("Failed to create export directory '{}': {e}", dir.display())))?;
    let stem = case.file_stem();
    let json = dir.join(format!("{stem}.json"));
    let csv = dir.join(format!("{stem}.csv"));
    write_case_json(&json, case)?;
    write_case_csv(&csv, case)?;
    Ok((json, csv))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::domain::GeoPoint;
    use crate::report::RiskCategory;

    fn evaluation() -> Evaluation {
        Evaluation {
            probability: 0.8,
            category: RiskCategory::Certain,
            risk_label: Some("Fort".into()),
            risk_class: None,
            present_feature_count: 2,
            feature_count: 3,
            missing_feature_names: vec!["Boiterie".into()],
            missing_diagnostics: vec![],
            location: Some(GeocodeResult::Found(GeoPoint {
                lat: 48.5,
                lon: -0.25,
                display_name: "Vire, Normandie".into(),
                provider: "BAN".into(),
            })),
        }
    }

    fn answers() -> Answers {
        let mut a = BTreeMap::new();
        a.insert("ELISA_pos".to_string(), Answer::text("Oui"));
        a.insert("Age".to_string(), Answer::Number(12.0));
        a.insert("Boiterie".to_string(), Answer::Null);
        a
    }

    #[test]
    fn file_stem_normalizes_subject() {
        let eval = evaluation();
        let answers = answers();
        assert_eq!(
            CaseExport::new(Some(" Étoile du Pin "), &eval, &answers).file_stem(),
            "lyrae_Etoile_du_Pin_case"
        );
        assert_eq!(CaseExport::new(None, &eval, &answers).file_stem(), "lyrae_CHEVAL_1_case");
    }

    #[test]
    fn writes_json_and_one_row_csv() {
        let dir = tempfile::tempdir().unwrap();
        let eval = evaluation();
        let answers = answers();
        let case = CaseExport::new(Some("Vent"), &eval, &answers);
        let (json_path, csv_path) = export_case(dir.path(), &case).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(json["subject_name"], "Vent");
        assert_eq!(json["category"], "certain");
        assert_eq!(json["geocode"]["outcome"], "found");
        assert_eq!(json["answers"]["ELISA_pos"], "Oui");

        let mut reader = csv::Reader::from_path(&csv_path).unwrap();
        let header: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(
            header,
            vec![
                "subject_name", "probability", "category", "risk_class", "geo_lat", "geo_lon",
                "geo_display_name", "Age", "Boiterie", "ELISA_pos"
            ]
        );
        let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][0], "Vent");
        assert_eq!(&rows[0][3], "Fort");
        assert_eq!(&rows[0][4], "48.5");
        assert_eq!(&rows[0][6], "Vire, Normandie");
        assert_eq!(&rows[0][7], "12");
        assert_eq!(&rows[0][8], "");
    }

    #[test]
    fn failed_write_is_a_runtime_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("exports");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let eval = evaluation();
        let answers = answers();
        let case = CaseExport::new(Some("Vent"), &eval, &answers);

        let err = export_case(&blocker, &case).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_RUNTIME);
    }
}
