//! Versioned analysis/diagnostic feature sets.
//!
//! Unanswered features in the analysis set are "missing not at random": a test
//! that was never ordered carries information of its own. Two different lists
//! have been used over the life of the tool, so the set is a named, versioned
//! input chosen at startup rather than a literal buried in the encoder.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::schema::{SchemaError, SchemaRegistry};

pub const FULL_V1: &str = "full-v1";
pub const RESULTS_V2: &str = "results-v2";

/// Exclusion tests, biology panels and Lyme-specific results.
const FULL_V1_FEATURES: &[&str] = &[
    "piroplasmose_neg",
    "ehrlichiose_neg",
    "ehrlichiose_negatif",
    "Bilan_sanguin_normal",
    "NFS_normale",
    "Parametres_musculaires_normaux",
    "Parametres_renaux_normaux",
    "Parametres_hepatiques_normaux",
    "SAA_normal",
    "Fibrinogène_normal",
    "ELISA_pos",
    "ELISA_OspA_pos",
    "ELISA_OspF_pos",
    "ELISA_p39",
    "WB_pos",
    "PCR_sang_pos",
    "SNAP_C6_pos",
    "IFAT_pos",
    "PCR_LCR_pos",
    "PCR_synoviale_pos",
    "PCR_peau_pos",
    "PCR_humeur_aqueuse_pos",
    "PCR_tissu_nerveux_pos",
    "PCR_liquide_articulaire_pos",
    "LCR_pleiocytose",
    "LCR_proteines_augmentees",
    "IHC_tissulaire_pos",
    "Coloration_argent_pos",
    "FISH_tissulaire_pos",
    "CVID",
    "Hypoglobulinemie",
];

/// Lyme-specific results only (serology, PCR, CSF, tissue, immune status).
const RESULTS_V2_FEATURES: &[&str] = &[
    "ELISA_pos",
    "ELISA_OspA_pos",
    "ELISA_OspF_pos",
    "ELISA_p39",
    "WB_pos",
    "SNAP_C6_pos",
    "IFAT_pos",
    "PCR_sang_pos",
    "PCR_LCR_pos",
    "PCR_synoviale_pos",
    "PCR_liquide_articulaire_pos",
    "PCR_peau_pos",
    "PCR_humeur_aqueuse_pos",
    "PCR_tissu_nerveux_pos",
    "LCR_pleiocytose",
    "LCR_proteines_augmentees",
    "IHC_tissulaire_pos",
    "Coloration_argent_pos",
    "FISH_tissulaire_pos",
    "CVID",
    "Hypoglobulinemie",
];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AnalysisSet {
    pub version: String,
    pub features: BTreeSet<String>,
}

impl AnalysisSet {
    pub fn builtin(version: &str) -> Option<Self> {
        let features = match version {
            FULL_V1 => FULL_V1_FEATURES,
            RESULTS_V2 => RESULTS_V2_FEATURES,
            _ => return None,
        };
        Some(Self {
            version: version.to_string(),
            features: features.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// Resolve a selector: a built-in version name, or a path to a JSON file
    /// `{ "version": "...", "features": [...] }`.
    pub fn resolve(selector: &str) -> Result<Self, SchemaError> {
        if let Some(set) = Self::builtin(selector) {
            return Ok(set);
        }
        let path = Path::new(selector);
        if !path.exists() {
            return Err(SchemaError::UnknownAnalysisSet(selector.to_string()));
        }
        let raw = fs::read_to_string(path).map_err(|e| SchemaError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn contains(&self, feature: &str) -> bool {
        self.features.contains(feature)
    }

    /// Schema features on which the built-in variants disagree.
    ///
    /// Reported at startup and by `lyrae check` so the choice of variant is
    /// never silent.
    pub fn builtin_discrepancy(registry: &SchemaRegistry) -> Vec<String> {
        let full: BTreeSet<&str> = FULL_V1_FEATURES.iter().copied().collect();
        let results: BTreeSet<&str> = RESULTS_V2_FEATURES.iter().copied().collect();
        full.symmetric_difference(&results)
            .filter(|f| registry.contains(f))
            .map(|f| f.to_string())
            .collect()
    }
}
