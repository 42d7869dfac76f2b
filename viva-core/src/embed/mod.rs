//! Sentence-embedding abstraction.
//!
//! The `SentenceEmbedder` trait decouples the semantic extractor from any
//! specific backend (hashing stub, ONNX transformer, remote service).
//!
//! `&mut self` on `embed` intentionally expresses that backends may be
//! stateful — tokenizer caches, session scratch buffers. All mutation is
//! therefore serialised through `EmbedderHandle`'s `parking_lot::Mutex`;
//! the loaded weights themselves are never mutated after `warm_up`.

pub mod stub;

#[cfg(feature = "onnx")]
pub mod onnx;

#[cfg(feature = "onnx")]
pub use onnx::{OnnxEmbedder, OnnxEmbedderConfig};

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Result;

/// Contract for sentence-embedding backends.
pub trait SentenceEmbedder: Send + 'static {
    /// One-time warm-up: load weights, run a dummy embedding. Called once
    /// at engine startup.
    fn warm_up(&mut self) -> Result<()>;

    /// Embed a batch of sentences into fixed-dimension vectors.
    ///
    /// # Returns
    /// One vector per input sentence, all of [`Self::dimension`] length.
    fn embed(&mut self, sentences: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Output vector dimensionality.
    fn dimension(&self) -> usize;
}

/// Thread-safe reference-counted handle to any `SentenceEmbedder`.
#[derive(Clone)]
pub struct EmbedderHandle(pub Arc<Mutex<dyn SentenceEmbedder>>);

impl EmbedderHandle {
    pub fn new<E: SentenceEmbedder>(embedder: E) -> Self {
        Self(Arc::new(Mutex::new(embedder)))
    }
}

impl std::fmt::Debug for EmbedderHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbedderHandle").finish_non_exhaustive()
    }
}

/// Cosine similarity of two equal-length vectors. 0.0 when either is zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    let mut dot = 0f64;
    let mut na = 0f64;
    let mut nb = 0f64;
    for (x, y) in a.iter().zip(b) {
        dot += *x as f64 * *y as f64;
        na += (*x as f64).powi(2);
        nb += (*y as f64).powi(2);
    }
    if na <= f64::EPSILON || nb <= f64::EPSILON {
        return 0.0;
    }
    dot / (na.sqrt() * nb.sqrt())
}
