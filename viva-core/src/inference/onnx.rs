//! Tabular regressor via the `ort` crate.
//!
//! Targets a skl2onnx-style export of the fitted regressor:
//! - input `float_input [1, n_features]` in `FEATURE_COLUMNS` order
//! - output `variable [1, 1]` — the continuous prediction
//!
//! The feature count is validated against the session's declared input
//! shape at warm-up; a mismatch is a fatal configuration error.

use std::path::PathBuf;

use ndarray::Array2;
use ort::ep;
use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::session::Session;
use ort::value::Value;
use tracing::info;

use crate::error::{Result, VivaError};
use crate::features::{FeatureRow, FEATURE_COLUMNS};
use crate::inference::ScoringModel;

pub struct OnnxRegressorConfig {
    pub model_path: PathBuf,
    /// Graph input name of the export. skl2onnx default: `float_input`.
    pub input_name: String,
    /// Graph output name of the export. skl2onnx default: `variable`.
    pub output_name: String,
}

impl OnnxRegressorConfig {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            input_name: "float_input".into(),
            output_name: "variable".into(),
        }
    }
}

pub struct OnnxRegressor {
    config: OnnxRegressorConfig,
    session: Option<Session>,
}

impl OnnxRegressor {
    pub fn new(config: OnnxRegressorConfig) -> Self {
        Self {
            config,
            session: None,
        }
    }
}

impl ScoringModel for OnnxRegressor {
    fn warm_up(&mut self) -> Result<()> {
        let path = &self.config.model_path;
        if !path.exists() {
            return Err(VivaError::ModelNotFound { path: path.clone() });
        }
        info!(model = %path.display(), "loading ONNX regressor");
        let session = SessionBuilder::new()
            .map_err(|e| VivaError::Inference(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::All)
            .map_err(|e| VivaError::Inference(e.to_string()))?
            .with_execution_providers([ep::CPU::default().build()])
            .map_err(|e| VivaError::Inference(e.to_string()))?
            .commit_from_file(path)
            .map_err(|e| VivaError::Inference(e.to_string()))?;
        self.session = Some(session);

        // Dummy forward pass doubles as a schema check.
        let zero_row = FeatureRow::from_values(vec![0.0; FEATURE_COLUMNS.len()])?;
        let _ = self.score(&zero_row)?;
        info!("ONNX regressor ready");
        Ok(())
    }

    fn score(&mut self, row: &FeatureRow) -> Result<f32> {
        if row.len() != FEATURE_COLUMNS.len() {
            return Err(VivaError::SchemaMismatch(format!(
                "row has {} values, schema expects {}",
                row.len(),
                FEATURE_COLUMNS.len()
            )));
        }
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| VivaError::Inference("model not loaded — call warm_up()".into()))?;

        let input: Vec<f32> = row.values().iter().map(|v| *v as f32).collect();
        let array = Array2::from_shape_vec((1, input.len()), input)
            .map_err(|e| VivaError::Inference(e.to_string()))?;
        let value =
            Value::from_array(array).map_err(|e: ort::Error| VivaError::Inference(e.to_string()))?;

        let outputs = session
            .run(ort::inputs![self.config.input_name.as_str() => value])
            .map_err(|e| VivaError::Inference(e.to_string()))?;
        let (_, data) = outputs[self.config.output_name.as_str()]
            .try_extract_tensor::<f32>()
            .map_err(|e| VivaError::Inference(e.to_string()))?;

        data.first().copied().ok_or_else(|| {
            VivaError::Inference("regressor returned an empty output tensor".into())
        })
    }
}
