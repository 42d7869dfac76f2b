//! Confidence inference abstraction.
//!
//! The `ScoringModel` trait decouples the pipeline from any specific
//! regressor backend (JSON linear model, ONNX gradient-boosted export).
//! The model is loaded once at startup and reused across submissions;
//! `&mut self` on `warm_up` covers the load, while `score` is logically
//! read-only and serialised through `ModelHandle`'s `parking_lot::Mutex`.

pub mod linear;

#[cfg(feature = "onnx")]
pub mod onnx;

#[cfg(feature = "onnx")]
pub use onnx::{OnnxRegressor, OnnxRegressorConfig};

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::features::FeatureRow;

/// Contract for pretrained tabular regressors.
pub trait ScoringModel: Send + 'static {
    /// One-time warm-up: load and validate the serialized model. A schema
    /// mismatch here is a fatal configuration error, never retried.
    fn warm_up(&mut self) -> Result<()>;

    /// Predict the continuous confidence/grade for one feature row.
    ///
    /// The row is guaranteed complete and ordered by `build_feature_row`;
    /// a column-count mismatch at this point is a configuration error.
    fn score(&mut self, row: &FeatureRow) -> Result<f32>;
}

/// Thread-safe reference-counted handle to any `ScoringModel` implementor.
#[derive(Clone)]
pub struct ModelHandle(pub Arc<Mutex<dyn ScoringModel>>);

impl ModelHandle {
    pub fn new<M: ScoringModel>(model: M) -> Self {
        Self(Arc::new(Mutex::new(model)))
    }
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHandle").finish_non_exhaustive()
    }
}

/// Letter grade derived from the bucket grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Letter {
    A,
    B,
    C,
    D,
}

/// Deterministic grading of one feature row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InferenceResult {
    /// Raw regression output; unbounded in practice, expected ≈ [1, 8].
    pub pred_cont: f32,
    /// `round(pred_cont)` clamped to [1, 8].
    pub pred_bucket: u8,
    /// 7–8 → A, 5–6 → B, 3–4 → C, 1–2 → D.
    pub pred_letter: Letter,
}

/// Score a feature row and derive its bucket/letter grades.
pub fn infer(model: &ModelHandle, row: &FeatureRow) -> Result<InferenceResult> {
    let pred_cont = model.0.lock().score(row)?;
    let result = grade(pred_cont);
    debug!(
        pred_cont = format_args!("{pred_cont:.3}"),
        pred_bucket = result.pred_bucket,
        pred_letter = ?result.pred_letter,
        "inference complete"
    );
    Ok(result)
}

/// Map a continuous prediction to its bucket and letter grades.
pub fn grade(pred_cont: f32) -> InferenceResult {
    let pred_bucket = pred_cont.round().clamp(1.0, 8.0) as u8;
    let pred_letter = match pred_bucket {
        7..=8 => Letter::A,
        5..=6 => Letter::B,
        3..=4 => Letter::C,
        _ => Letter::D,
    };
    InferenceResult {
        pred_cont,
        pred_bucket,
        pred_letter,
    }
}
