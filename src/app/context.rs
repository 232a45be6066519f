//! Initialise-once engine state shared by every evaluation.

use std::sync::OnceLock;

use tracing::{info, warn};

use crate::config::Settings;
use crate::error::AppError;
use crate::geo::{RasterError, RasterStore, RiskRaster};
use crate::models::{ClassifierAdapter, ModelError, ObliviousForest};
use crate::record::{AliasTable, DEFAULT_ALIAS_PAIRS};
use crate::schema::{AnalysisSet, SchemaRegistry};

/// Schema, classifier and analysis set are loaded up front; the risk raster
/// is loaded on first use and kept only once a load has succeeded.
pub struct EngineContext {
    registry: SchemaRegistry,
    classifier: ClassifierAdapter<ObliviousForest>,
    analysis: AnalysisSet,
    aliases: AliasTable,
    raster_store: Option<RasterStore>,
    raster: OnceLock<RiskRaster>,
}

impl EngineContext {
    /// Load every startup artifact. Any failure here is fatal.
    pub fn load(settings: &Settings) -> Result<Self, AppError> {
        let registry = SchemaRegistry::load(&settings.schema_path)?;
        let model = ObliviousForest::load(&settings.model_path)?;
        let analysis = AnalysisSet::resolve(&settings.analysis_set)?;

        let discrepancy = AnalysisSet::builtin_discrepancy(&registry);
        if !discrepancy.is_empty() {
            warn!(
                selected = %analysis.version,
                features = ?discrepancy,
                "built-in analysis feature sets disagree on these schema features"
            );
        }

        let ctx = Self::from_parts(registry, model, analysis)?.with_raster_store(settings.raster_store());
        info!(
            features = ctx.registry.feature_names().len(),
            categorical = ctx.registry.categorical_features().len(),
            analysis_set = %ctx.analysis.version,
            "engine ready"
        );
        Ok(ctx)
    }

    pub fn from_parts(
        registry: SchemaRegistry,
        model: ObliviousForest,
        analysis: AnalysisSet,
    ) -> Result<Self, ModelError> {
        let classifier = ClassifierAdapter::new(model, &registry)?;
        let aliases = AliasTable::for_registry(&registry, DEFAULT_ALIAS_PAIRS);
        Ok(Self {
            registry,
            classifier,
            analysis,
            aliases,
            raster_store: None,
            raster: OnceLock::new(),
        })
    }

    pub fn with_raster_store(mut self, store: RasterStore) -> Self {
        self.raster_store = Some(store);
        self
    }

    /// Install an already-loaded raster.
    pub fn with_raster(self, raster: RiskRaster) -> Self {
        let _ = self.raster.set(raster);
        self
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn classifier(&self) -> &ClassifierAdapter<ObliviousForest> {
        &self.classifier
    }

    pub fn analysis(&self) -> &AnalysisSet {
        &self.analysis
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    /// The risk raster, loading it on first call. A failed load is not
    /// memoized, so a later call retries.
    pub fn raster(&self) -> Result<&RiskRaster, RasterError> {
        if let Some(raster) = self.raster.get() {
            return Ok(raster);
        }
        let store = self.raster_store.as_ref().ok_or(RasterError::Unavailable)?;
        let raster = store.load()?;
        Ok(self.raster.get_or_init(|| raster))
    }
}
