//! Terminal output for the evaluate and check commands.
//!
//! Formatting lives in one place so the pipeline stays free of presentation
//! and output changes stay localized.

use crate::app::pipeline::Evaluation;
use crate::schema::{ContractReport, ReferenceReport};

/// Format the clinician-facing summary of one evaluation.
pub fn format_evaluation(eval: &Evaluation, subject: &str) -> String {
    let mut out = String::new();

    out.push_str("=== LYRAE - Equine Lyme borreliosis evaluation ===\n");
    out.push_str(&format!("Subject: {subject}\n"));
    out.push_str(&format!(
        "Result: {} [{}]\n",
        eval.category.display_fr(),
        eval.category.as_str()
    ));
    out.push_str(&format!("Probability: {:.1}%\n", eval.probability * 100.0));
    out.push_str(&format!(
        "Regional risk: {}\n",
        eval.risk_label.as_deref().unwrap_or("unknown")
    ));
    out.push_str(&format!(
        "Features answered: {} of {}\n",
        eval.present_feature_count, eval.feature_count
    ));

    if let Some(location) = &eval.location {
        out.push_str(&format!("Location: {}\n", location.user_message()));
    }

    if !eval.missing_diagnostics.is_empty() {
        out.push_str(&format!(
            "\nDiagnostic fields still missing ({}):\n",
            eval.missing_diagnostics.len()
        ));
        for name in &eval.missing_diagnostics {
            out.push_str(&format!("  - {name}\n"));
        }
    }

    out
}

fn push_list(out: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    out.push_str(&format!("  {title} ({}):\n", items.len()));
    for item in items {
        out.push_str(&format!("    - {item}\n"));
    }
}

/// Format the maintenance-time consistency report.
pub fn format_check(
    contract: &ContractReport,
    reference: Option<&ReferenceReport>,
    analysis_version: &str,
    discrepancy: &[String],
) -> String {
    let mut out = String::new();

    out.push_str("=== LYRAE - schema consistency ===\n");
    out.push_str(&format!(
        "Model contract: {}\n",
        if contract.is_clean() { "OK" } else { "MISMATCH" }
    ));
    push_list(&mut out, "in schema, not in model", &contract.missing_in_model);
    push_list(&mut out, "in model, not in schema", &contract.extra_in_model);
    if contract.order_mismatch {
        out.push_str("  feature order differs from the model\n");
    }
    push_list(&mut out, "categorical flag differs", &contract.categorical_mismatch);

    match reference {
        Some(r) => {
            out.push_str(&format!(
                "Reference dataset: {}\n",
                if r.is_clean() { "OK" } else { "MISMATCH" }
            ));
            push_list(&mut out, "in dataset, not in schema", &r.missing_in_registry);
            push_list(&mut out, "in schema, not in dataset", &r.extra_in_registry);
        }
        None => out.push_str("Reference dataset: not checked\n"),
    }

    out.push_str(&format!("Analysis feature set: {analysis_version}\n"));
    if discrepancy.is_empty() {
        out.push_str("  built-in variants agree on every schema feature\n");
    } else {
        push_list(&mut out, "built-in variants disagree on", discrepancy);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::GeocodeResult;
    use crate::report::RiskCategory;

    fn evaluation() -> Evaluation {
        Evaluation {
            probability: 0.6321,
            category: RiskCategory::Probable,
            risk_label: Some("Fort".into()),
            risk_class: None,
            present_feature_count: 12,
            feature_count: 40,
            missing_feature_names: vec!["ELISA_pos".into(), "Boiterie".into()],
            missing_diagnostics: vec!["ELISA_pos".into()],
            location: Some(GeocodeResult::ProviderError {
                status: Some(503),
                detail: String::new(),
                provider: "BAN".into(),
            }),
        }
    }

    #[test]
    fn evaluation_report_shows_category_and_missing_diagnostics() {
        let text = format_evaluation(&evaluation(), "CHEVAL_1");
        assert!(text.contains("Subject: CHEVAL_1"));
        assert!(text.contains("Lyme probable [probable]"));
        assert!(text.contains("Probability: 63.2%"));
        assert!(text.contains("Regional risk: Fort"));
        assert!(text.contains("12 of 40"));
        assert!(text.contains("temporarily unavailable (HTTP 503)"));
        assert!(text.contains("  - ELISA_pos\n"));
        assert!(!text.contains("Boiterie"));
    }

    #[test]
    fn check_report_lists_drift() {
        let contract = ContractReport {
            missing_in_model: vec!["Boiterie".into()],
            order_mismatch: true,
            ..Default::default()
        };
        let text = format_check(&contract, None, "full-v1", &["NFS_normale".into()]);
        assert!(text.contains("Model contract: MISMATCH"));
        assert!(text.contains("    - Boiterie"));
        assert!(text.contains("feature order differs"));
        assert!(text.contains("not checked"));
        assert!(text.contains("    - NFS_normale"));
    }
}
