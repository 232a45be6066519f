//! Shared evaluation pipeline used by every front-end.
//!
//! answers -> record -> risk label -> missingness -> coercion -> classifier -> category
//!
//! Each stage consumes the previous stage's type, so missingness runs exactly
//! once, after the answers and the risk label are merged, and before coercion.

use serde::Serialize;
use tracing::{debug, warn};

use crate::app::EngineContext;
use crate::domain::{Answers, GeocodeResult};
use crate::error::AppError;
use crate::geo::{RiskClass, reconcile_label, reconcile_manual_label};
use crate::record::{build_record, coerce, encode_missingness, inject_risk_label};
use crate::report::RiskCategory;

/// One case to evaluate. Geocoding happens before this point; the caller
/// passes whatever outcome it got.
#[derive(Debug, Clone, Default)]
pub struct EvaluationRequest {
    pub subject_name: Option<String>,
    pub answers: Answers,
    pub location: Option<GeocodeResult>,
    /// Manual regional risk class; bypasses the raster.
    pub risk_override: Option<String>,
}

/// Result payload of one evaluation.
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub probability: f64,
    pub category: RiskCategory,
    /// Token written into the risk feature, if any.
    pub risk_label: Option<String>,
    /// Raster class behind `risk_label` when it came from the raster.
    pub risk_class: Option<RiskClass>,
    pub present_feature_count: usize,
    pub feature_count: usize,
    pub missing_feature_names: Vec<String>,
    /// Missing features that belong to the analysis set.
    pub missing_diagnostics: Vec<String>,
    pub location: Option<GeocodeResult>,
}

/// Run the full pipeline for one request.
pub fn evaluate(ctx: &EngineContext, request: &EvaluationRequest) -> Result<Evaluation, AppError> {
    let registry = ctx.registry();

    let mut record = build_record(registry, ctx.aliases(), &request.answers);

    let (risk_label, risk_class) = resolve_risk(ctx, request);
    inject_risk_label(&mut record, registry, risk_label.as_deref());

    let encoded = encode_missingness(record, registry, ctx.analysis());
    let coerced = coerce(encoded, registry);

    let probability = ctx.classifier().predict(&coerced)?;
    let category = RiskCategory::from_probability(probability)?;

    let report = coerced.report();
    debug!(
        probability,
        category = %category,
        present = report.present_count,
        total = report.feature_count,
        "case evaluated"
    );

    Ok(Evaluation {
        probability,
        category,
        risk_label,
        risk_class,
        present_feature_count: report.present_count,
        feature_count: report.feature_count,
        missing_feature_names: report.missing.clone(),
        missing_diagnostics: report.missing_diagnostics(ctx.analysis()),
        location: request.location.clone(),
    })
}

/// Manual override first, then the raster at the resolved location.
/// Raster failures leave the risk feature unknown.
fn resolve_risk(ctx: &EngineContext, request: &EvaluationRequest) -> (Option<String>, Option<RiskClass>) {
    let registry = ctx.registry();
    let Some(feature) = registry.risk_feature() else {
        return (None, None);
    };

    if let Some(manual) = request.risk_override.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        return (Some(reconcile_manual_label(manual, registry.levels(feature))), None);
    }

    let Some(point) = request.location.as_ref().and_then(GeocodeResult::point) else {
        return (None, None);
    };
    match ctx.raster() {
        Ok(raster) => {
            let class = raster.sample(point.lat, point.lon);
            let label = reconcile_label(class, registry.levels(feature));
            (Some(label), Some(class))
        }
        Err(err) => {
            warn!(error = %err, "risk raster unavailable, regional risk left unknown");
            (None, None)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::domain::{Answer, GeoPoint};
    use crate::geo::RiskRaster;
    use crate::math::{Affine, Crs};
    use crate::models::ObliviousForest;
    use crate::schema::{AnalysisSet, FULL_V1, SchemaRegistry};

    const SCHEMA: &str = r#"{
        "feature_cols": ["Age", "Sexe", "ELISA_pos", "ELISA_pos_missing_code",
                         "Boiterie", "Boiterie_missing_code", "Classe_de_risque"],
        "cat_cols": ["Sexe", "Classe_de_risque"],
        "factor_levels": {
            "Sexe": ["Jument", "Hongre", "Etalon"],
            "Classe_de_risque": ["Faible ou méconnu", "Intermédiaire", "Fort"]
        }
    }"#;

    const MODEL: &str = r#"{
        "feature_names": ["Age", "Sexe", "ELISA_pos", "ELISA_pos_missing_code",
                          "Boiterie", "Boiterie_missing_code", "Classe_de_risque"],
        "cat_feature_indices": [1, 6],
        "bias": -1.0,
        "trees": [
            {"splits": [{"feature": 2, "border": 0.5}], "leaf_values": [0.0, 2.0]},
            {"splits": [{"feature": 6, "category": "Fort"}], "leaf_values": [0.0, 1.0]},
            {"splits": [{"feature": 3, "border": 1.5}], "leaf_values": [0.0, -0.5]}
        ]
    }"#;

    fn context() -> EngineContext {
        let registry = SchemaRegistry::from_json_str(SCHEMA).unwrap();
        let model = ObliviousForest::from_json_str(MODEL).unwrap();
        let analysis = AnalysisSet::builtin(FULL_V1).unwrap();
        EngineContext::from_parts(registry, model, analysis).unwrap()
    }

    fn high_risk_raster() -> RiskRaster {
        // Whole of metropolitan France in one lon/lat box.
        RiskRaster::from_parts(
            2,
            1,
            vec![3.0, 1.0],
            Affine::north_up(-5.0, 52.0, 7.5, 11.0),
            Crs::Geographic,
            None,
        )
        .unwrap()
    }

    fn located(lat: f64, lon: f64) -> Option<GeocodeResult> {
        Some(GeocodeResult::Found(GeoPoint {
            lat,
            lon,
            display_name: "test".into(),
            provider: "manual".into(),
        }))
    }

    #[test]
    fn empty_answers_still_yield_a_category() {
        let ctx = context();
        let eval = evaluate(&ctx, &EvaluationRequest::default()).unwrap();

        assert_eq!(eval.present_feature_count, 0);
        assert_eq!(eval.feature_count, 5);
        assert!(eval.probability.is_finite() && (0.0..=1.0).contains(&eval.probability));
        // ELISA_pos is diagnostic -> indicator 2 -> third tree fires.
        assert!((eval.probability - crate::models::sigmoid(-1.5)).abs() < 1e-12);
        assert_eq!(eval.category, RiskCategory::from_probability(eval.probability).unwrap());
        assert_eq!(eval.risk_label, None);
        assert!(eval.missing_diagnostics.contains(&"ELISA_pos".to_string()));
        assert!(!eval.missing_diagnostics.contains(&"Boiterie".to_string()));
    }

    #[test]
    fn raster_label_is_reconciled_and_fed_to_the_model() {
        let ctx = context().with_raster(high_risk_raster());
        let mut answers = BTreeMap::new();
        answers.insert("ELISA_pos".to_string(), Answer::text("Oui"));
        answers.insert("Sexe".to_string(), Answer::text("Jument"));
        let request = EvaluationRequest {
            answers,
            location: located(48.69, -0.5),
            ..Default::default()
        };

        let eval = evaluate(&ctx, &request).unwrap();
        assert_eq!(eval.risk_class, Some(RiskClass::High));
        assert_eq!(eval.risk_label.as_deref(), Some("Fort"));
        assert_eq!(eval.present_feature_count, 3);
        assert!((eval.probability - crate::models::sigmoid(2.0)).abs() < 1e-12);
        assert_eq!(eval.category, RiskCategory::Certain);
    }

    #[test]
    fn manual_risk_class_bypasses_raster() {
        let ctx = context();
        let request = EvaluationRequest {
            location: located(48.69, -0.5),
            risk_override: Some(" Fort ".into()),
            ..Default::default()
        };
        let eval = evaluate(&ctx, &request).unwrap();
        assert_eq!(eval.risk_label.as_deref(), Some("Fort"));
        assert_eq!(eval.risk_class, None);
    }

    #[test]
    fn lowercase_manual_class_matches_registry_token() {
        let ctx = context();
        let request = EvaluationRequest {
            risk_override: Some("fort".into()),
            ..Default::default()
        };
        let eval = evaluate(&ctx, &request).unwrap();
        assert_eq!(eval.risk_label.as_deref(), Some("Fort"));
        // The categorical split on "Fort" fires: -1 + 1 - 0.5.
        assert!((eval.probability - crate::models::sigmoid(-0.5)).abs() < 1e-12);
    }

    #[test]
    fn unavailable_raster_leaves_risk_unknown() {
        let ctx = context();
        let request = EvaluationRequest {
            location: located(48.69, -0.5),
            ..Default::default()
        };
        let eval = evaluate(&ctx, &request).unwrap();
        assert_eq!(eval.risk_label, None);
        assert_eq!(eval.present_feature_count, 0);
    }

    #[test]
    fn not_found_location_skips_raster() {
        let ctx = context().with_raster(high_risk_raster());
        let request = EvaluationRequest {
            location: Some(GeocodeResult::NotFound),
            ..Default::default()
        };
        assert_eq!(evaluate(&ctx, &request).unwrap().risk_label, None);
    }
}
