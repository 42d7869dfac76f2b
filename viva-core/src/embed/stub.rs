//! `HashEmbedder` — deterministic character-trigram hashing embedder.
//!
//! Used in tests and as a dependency-free fallback before the ONNX
//! sentence-transformer is wired in. Similar strings hash to similar
//! vectors (shared trigrams land in shared buckets), which is enough to
//! exercise the full semantic pipeline end-to-end.

use std::hash::{DefaultHasher, Hash, Hasher};

use tracing::debug;

use crate::embed::SentenceEmbedder;
use crate::error::Result;

/// Bag-of-character-trigrams embedder with signed hashing.
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(8),
        }
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(128)
    }
}

impl SentenceEmbedder for HashEmbedder {
    fn warm_up(&mut self) -> Result<()> {
        debug!("HashEmbedder::warm_up — no-op");
        Ok(())
    }

    fn embed(&mut self, sentences: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(sentences
            .iter()
            .map(|s| self.embed_one(s))
            .collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

impl HashEmbedder {
    fn embed_one(&self, sentence: &str) -> Vec<f32> {
        let mut vec = vec![0f32; self.dimension];
        let normalized: Vec<char> = sentence
            .to_lowercase()
            .chars()
            .filter(|c| c.is_alphanumeric() || c.is_whitespace())
            .collect();

        for gram in normalized.windows(3) {
            let mut hasher = DefaultHasher::new();
            gram.hash(&mut hasher);
            let h = hasher.finish();
            let bucket = (h % self.dimension as u64) as usize;
            let sign = if (h >> 63) == 0 { 1.0 } else { -1.0 };
            vec[bucket] += sign;
        }

        // L2-normalize so cosine comparisons are well-behaved.
        let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for v in &mut vec {
                *v /= norm;
            }
        }
        vec
    }
}
