//! Sentence-transformer embedder via the `ort` crate.
//!
//! Targets a MiniLM-style HuggingFace export:
//! - `model.onnx` — `input_ids [1,seq]` + `attention_mask [1,seq]`
//!   → `last_hidden_state [1,seq,d]`
//! - `tokenizer.json` — HuggingFace fast tokenizer
//!
//! Sentence vectors are attention-masked mean pools of the last hidden
//! state, L2-normalized. Sentences are embedded one at a time; answers are
//! short enough that batching is not worth the padding bookkeeping.

use std::path::PathBuf;

use ndarray::Array2;
use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::session::Session;
use ort::value::Value;
use ort::ep;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use crate::embed::SentenceEmbedder;
use crate::error::{Result, VivaError};

/// Token cap per sentence; longer sentences are truncated.
const MAX_TOKENS: usize = 256;

pub struct OnnxEmbedderConfig {
    pub model_path: PathBuf,
    pub tokenizer_path: PathBuf,
    /// Hidden size of the export (e.g. 384 for MiniLM-L6).
    pub dimension: usize,
}

pub struct OnnxEmbedder {
    config: OnnxEmbedderConfig,
    session: Option<Session>,
    tokenizer: Option<Tokenizer>,
}

impl OnnxEmbedder {
    pub fn new(config: OnnxEmbedderConfig) -> Self {
        Self {
            config,
            session: None,
            tokenizer: None,
        }
    }

    fn build_session(path: &std::path::Path) -> Result<Session> {
        if !path.exists() {
            return Err(VivaError::ModelNotFound {
                path: path.to_path_buf(),
            });
        }
        SessionBuilder::new()
            .map_err(|e| VivaError::Embedding(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::All)
            .map_err(|e| VivaError::Embedding(e.to_string()))?
            .with_execution_providers([ep::CPU::default().build()])
            .map_err(|e| VivaError::Embedding(e.to_string()))?
            .commit_from_file(path)
            .map_err(|e| VivaError::Embedding(e.to_string()))
    }

    fn embed_one(&mut self, sentence: &str) -> Result<Vec<f32>> {
        let tokenizer = self
            .tokenizer
            .as_ref()
            .ok_or_else(|| VivaError::Embedding("embedder not warmed up".into()))?;

        let encoding = tokenizer
            .encode(sentence, true)
            .map_err(|e| VivaError::Embedding(e.to_string()))?;
        let ids: Vec<i64> = encoding
            .get_ids()
            .iter()
            .take(MAX_TOKENS)
            .map(|id| *id as i64)
            .collect();
        let mask: Vec<i64> = encoding
            .get_attention_mask()
            .iter()
            .take(MAX_TOKENS)
            .map(|m| *m as i64)
            .collect();
        let seq = ids.len();
        if seq == 0 {
            return Ok(vec![0.0; self.config.dimension]);
        }

        let ids_val = Value::from_array(Array2::from_shape_vec((1, seq), ids).map_err(
            |e| VivaError::Embedding(e.to_string()),
        )?)
        .map_err(|e: ort::Error| VivaError::Embedding(e.to_string()))?;
        let mask_val = Value::from_array(
            Array2::from_shape_vec((1, seq), mask.clone())
                .map_err(|e| VivaError::Embedding(e.to_string()))?,
        )
        .map_err(|e: ort::Error| VivaError::Embedding(e.to_string()))?;

        let session = self
            .session
            .as_mut()
            .ok_or_else(|| VivaError::Embedding("embedder not warmed up".into()))?;
        let outputs = session
            .run(ort::inputs!["input_ids" => ids_val, "attention_mask" => mask_val])
            .map_err(|e| VivaError::Embedding(e.to_string()))?;

        let (shape, data) = outputs["last_hidden_state"]
            .try_extract_tensor::<f32>()
            .map_err(|e| VivaError::Embedding(e.to_string()))?;
        let d = if shape.len() >= 3 {
            shape[2] as usize
        } else {
            self.config.dimension
        };

        // Attention-masked mean pooling over the sequence axis.
        let mut pooled = vec![0f32; d];
        let mut count = 0f32;
        for (t, m) in mask.iter().enumerate() {
            if *m == 0 {
                continue;
            }
            let row = &data[t * d..(t + 1) * d];
            for (p, v) in pooled.iter_mut().zip(row) {
                *p += v;
            }
            count += 1.0;
        }
        if count > 0.0 {
            for p in &mut pooled {
                *p /= count;
            }
        }
        let norm = pooled.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for p in &mut pooled {
                *p /= norm;
            }
        }
        Ok(pooled)
    }
}

impl SentenceEmbedder for OnnxEmbedder {
    fn warm_up(&mut self) -> Result<()> {
        info!(model = ?self.config.model_path, "loading sentence embedder");
        self.session = Some(Self::build_session(&self.config.model_path)?);
        self.tokenizer = Some(
            Tokenizer::from_file(&self.config.tokenizer_path)
                .map_err(|e| VivaError::Embedding(e.to_string()))?,
        );
        // Dummy forward pass to populate caches.
        let _ = self.embed_one("warm up")?;
        info!("sentence embedder ready");
        Ok(())
    }

    fn embed(&mut self, sentences: &[String]) -> Result<Vec<Vec<f32>>> {
        debug!(batch = sentences.len(), "embedding sentence batch");
        sentences.iter().map(|s| self.embed_one(s)).collect()
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }
}
