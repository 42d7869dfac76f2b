//! JSON-serialized linear regressor.
//!
//! The model file records the training-time column list alongside the
//! weights; `warm_up` validates it against `FEATURE_COLUMNS` so a stale
//! export fails loudly at startup instead of silently mis-scoring rows.
//!
//! ## File format
//!
//! ```json
//! {
//!   "schema_version": 1,
//!   "columns": ["min_f0_hz", "..."],
//!   "weights": [0.012, ...],
//!   "bias": 4.1
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, VivaError};
use crate::features::{FeatureRow, FEATURE_COLUMNS, FEATURE_SCHEMA_VERSION};
use crate::inference::ScoringModel;

/// On-disk representation of a fitted linear model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearModelFile {
    pub schema_version: u32,
    pub columns: Vec<String>,
    pub weights: Vec<f64>,
    pub bias: f64,
}

/// Linear regressor over the canonical feature row.
#[derive(Debug)]
pub struct LinearModel {
    path: Option<PathBuf>,
    weights: Vec<f64>,
    bias: f64,
    loaded: bool,
}

impl LinearModel {
    /// Lazy-loading model; weights are read from `path` in `warm_up`.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            weights: Vec::new(),
            bias: 0.0,
            loaded: false,
        }
    }

    /// Build directly from an in-memory file representation (tests, bundled
    /// defaults).
    pub fn from_file_contents(file: LinearModelFile) -> Result<Self> {
        validate_schema(&file)?;
        Ok(Self {
            path: None,
            weights: file.weights,
            bias: file.bias,
            loaded: true,
        })
    }

    fn load(&mut self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(VivaError::ModelNotFound {
                path: path.to_path_buf(),
            });
        }
        let raw = std::fs::read_to_string(path)?;
        let file: LinearModelFile = serde_json::from_str(&raw)
            .map_err(|e| VivaError::SchemaMismatch(format!("{}: {e}", path.display())))?;
        validate_schema(&file)?;
        self.weights = file.weights;
        self.bias = file.bias;
        self.loaded = true;
        info!(path = %path.display(), n_weights = self.weights.len(), "linear model loaded");
        Ok(())
    }
}

fn validate_schema(file: &LinearModelFile) -> Result<()> {
    if file.schema_version != FEATURE_SCHEMA_VERSION {
        return Err(VivaError::SchemaMismatch(format!(
            "model schema_version {} != expected {}",
            file.schema_version, FEATURE_SCHEMA_VERSION
        )));
    }
    if file.columns.len() != FEATURE_COLUMNS.len()
        || file
            .columns
            .iter()
            .zip(FEATURE_COLUMNS)
            .any(|(a, b)| a != b)
    {
        return Err(VivaError::SchemaMismatch(
            "model column list does not match FEATURE_COLUMNS (names and order must be identical)"
                .into(),
        ));
    }
    if file.weights.len() != file.columns.len() {
        return Err(VivaError::SchemaMismatch(format!(
            "{} weights for {} columns",
            file.weights.len(),
            file.columns.len()
        )));
    }
    Ok(())
}

impl ScoringModel for LinearModel {
    fn warm_up(&mut self) -> Result<()> {
        if self.loaded {
            return Ok(());
        }
        let path = self
            .path
            .clone()
            .ok_or_else(|| VivaError::SchemaMismatch("linear model has no path to load".into()))?;
        self.load(&path)
    }

    fn score(&mut self, row: &FeatureRow) -> Result<f32> {
        if !self.loaded {
            return Err(VivaError::Inference(
                "model not loaded — call warm_up()".into(),
            ));
        }
        if row.len() != self.weights.len() {
            return Err(VivaError::SchemaMismatch(format!(
                "row has {} values, model expects {}",
                row.len(),
                self.weights.len()
            )));
        }
        let dot: f64 = row
            .values()
            .iter()
            .zip(&self.weights)
            .map(|(v, w)| v * w)
            .sum();
        Ok((dot + self.bias) as f32)
    }
}

/// A uniform model file matching the current schema; handy for tests and
/// for exercising the pipeline before a real export is available.
pub fn uniform_model_file(weight: f64, bias: f64) -> LinearModelFile {
    LinearModelFile {
        schema_version: FEATURE_SCHEMA_VERSION,
        columns: FEATURE_COLUMNS.iter().map(|c| (*c).to_owned()).collect(),
        weights: vec![weight; FEATURE_COLUMNS.len()],
        bias,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::build_feature_row;
    use serde_json::json;

    #[test]
    fn scores_are_deterministic() {
        let mut model = LinearModel::from_file_contents(uniform_model_file(0.01, 4.0)).unwrap();
        let row = build_feature_row(&json!({"word_cnt": 20.0, "coherence_score": 0.9})).unwrap();
        let a = model.score(&row).unwrap();
        let b = model.score(&row).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn bias_only_model_scores_bias_on_zero_row() {
        let mut model = LinearModel::from_file_contents(uniform_model_file(0.0, 4.5)).unwrap();
        let row = build_feature_row(&json!({})).unwrap();
        assert!((model.score(&row).unwrap() - 4.5).abs() < 1e-6);
    }

    #[test]
    fn wrong_column_order_is_schema_mismatch() {
        let mut file = uniform_model_file(1.0, 0.0);
        file.columns.swap(0, 1);
        let err = LinearModel::from_file_contents(file).unwrap_err();
        assert!(matches!(err, VivaError::SchemaMismatch(_)));
    }

    #[test]
    fn wrong_weight_count_is_schema_mismatch() {
        let mut file = uniform_model_file(1.0, 0.0);
        file.weights.pop();
        let err = LinearModel::from_file_contents(file).unwrap_err();
        assert!(matches!(err, VivaError::SchemaMismatch(_)));
    }

    #[test]
    fn wrong_schema_version_is_schema_mismatch() {
        let mut file = uniform_model_file(1.0, 0.0);
        file.schema_version += 1;
        let err = LinearModel::from_file_contents(file).unwrap_err();
        assert!(matches!(err, VivaError::SchemaMismatch(_)));
    }

    #[test]
    fn missing_file_is_model_not_found() {
        let mut model = LinearModel::from_path("/nonexistent/model.json");
        let err = model.warm_up().unwrap_err();
        assert!(matches!(err, VivaError::ModelNotFound { .. }));
    }

    #[test]
    fn score_before_warm_up_fails() {
        let mut model = LinearModel::from_path("/nonexistent/model.json");
        let row = build_feature_row(&json!({})).unwrap();
        assert!(model.score(&row).is_err());
    }

    #[test]
    fn model_file_round_trips_through_json() {
        let file = uniform_model_file(0.5, 1.0);
        let text = serde_json::to_string(&file).unwrap();
        let back: LinearModelFile = serde_json::from_str(&text).unwrap();
        assert_eq!(back.columns, file.columns);
        assert_eq!(back.weights, file.weights);
    }
}
