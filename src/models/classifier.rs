//! Classifier adapter: packages a coerced record for the model and returns a
//! checked probability.

use crate::domain::Coerced;
use crate::models::{ModelError, ObliviousForest};
use crate::record::CoercedRecord;
use crate::schema::{ContractReport, SchemaRegistry, check};

/// A pretrained binary classifier over a fixed, positional feature list.
pub trait Classifier {
    /// Feature names in the order the model reads them.
    fn feature_names(&self) -> &[String];

    /// Positions of the categorical features.
    fn categorical_indices(&self) -> &[usize];

    /// Positive-class probability for one row.
    fn predict_proba(&self, row: &[Coerced]) -> f64;
}

impl Classifier for ObliviousForest {
    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn categorical_indices(&self) -> &[usize] {
        &self.cat_feature_indices
    }

    fn predict_proba(&self, row: &[Coerced]) -> f64 {
        self.probability(row)
    }
}

/// Binds a classifier to the registry it was checked against.
pub struct ClassifierAdapter<C> {
    model: C,
    cat_indices: Vec<usize>,
}

impl<C: Classifier> ClassifierAdapter<C> {
    /// Check the model's declared inputs against the registry. Any drift is a
    /// startup failure.
    pub fn new(model: C, registry: &SchemaRegistry) -> Result<Self, ModelError> {
        let report = Self::contract(&model, registry);
        if !report.is_clean() {
            return Err(ModelError::Contract(report.summary()));
        }
        Ok(Self {
            cat_indices: registry.categorical_indices(),
            model,
        })
    }

    pub fn contract(model: &C, registry: &SchemaRegistry) -> ContractReport {
        check(registry, model.feature_names(), model.categorical_indices())
    }

    pub fn model(&self) -> &C {
        &self.model
    }

    pub fn categorical_indices(&self) -> &[usize] {
        &self.cat_indices
    }

    /// Probability in `[0, 1]` for the positive class.
    pub fn predict(&self, record: &CoercedRecord) -> Result<f64, ModelError> {
        let row = record.values();
        let expected = self.model.feature_names().len();
        if row.len() != expected {
            return Err(ModelError::RowShape {
                expected,
                actual: row.len(),
            });
        }
        for &i in &self.cat_indices {
            if !matches!(row[i], Coerced::Token(_)) {
                return Err(ModelError::UntokenizedCategorical(self.model.feature_names()[i].clone()));
            }
        }

        let p = self.model.predict_proba(row);
        if !(p.is_finite() && (0.0..=1.0).contains(&p)) {
            return Err(ModelError::InvalidOutput(p));
        }
        Ok(p)
    }
}
