//! Semantic (text-coherence) feature extraction.
//!
//! Splits a transcript into sentences, embeds them, and derives coherence
//! scalars from two independent proxies: adjacent-sentence similarity (does
//! the answer flow?) and distance to the topic centroid (does it stay on
//! one subject?).
//!
//! An empty transcript is a data-validation error, deliberately distinct
//! from a coherence score of 0, which is a valid low-coherence result.

use tracing::debug;

use crate::embed::{cosine_similarity, SentenceEmbedder};
use crate::error::{Result, VivaError};
use crate::stats;

/// Tuning for the semantic extractor.
#[derive(Debug, Clone)]
pub struct SemanticConfig {
    /// Adjacent similarity above this counts toward `adj_sim_frac_high`.
    pub adj_sim_high: f64,
    /// Adjacent similarity below this counts toward `adj_sim_frac_low`.
    pub adj_sim_low: f64,
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            adj_sim_high: 0.8,
            adj_sim_low: 0.3,
        }
    }
}

/// Coherence scalars for one transcript.
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticFeatures {
    pub n_sentences: usize,
    pub adj_sim_mean: f64,
    pub adj_sim_std: f64,
    pub adj_sim_p10: f64,
    pub adj_sim_p50: f64,
    pub adj_sim_p90: f64,
    pub adj_sim_frac_high: f64,
    pub adj_sim_frac_low: f64,
    pub centroid_dist_mean: f64,
    pub centroid_dist_std: f64,
    /// Σ (1 − adj_sim): cumulative topical drift across the answer.
    pub topic_path_len: f64,
    pub coherence_score: f64,
    /// Intra-answer coherence: 1 − mean centroid distance.
    pub intra_coh: f64,
    /// Divergence from the reference/topic embedding; 0.0 without one.
    pub inter_div: f64,
}

/// Extract coherence features from a transcript.
///
/// `reference` is an optional topic embedding (e.g. the centroid of the
/// model answer); when present, `inter_div` measures how far the student's
/// answer drifted from it.
///
/// # Errors
/// `VivaError::InvalidInput` when the transcript is empty or whitespace.
pub fn extract_semantic(
    text: &str,
    embedder: &mut dyn SentenceEmbedder,
    cfg: &SemanticConfig,
    reference: Option<&[f32]>,
) -> Result<SemanticFeatures> {
    let sentences = split_sentences(text);
    if sentences.is_empty() {
        return Err(VivaError::InvalidInput(
            "transcript is empty or missing".into(),
        ));
    }

    let vectors = embedder.embed(&sentences)?;
    if vectors.len() != sentences.len() {
        return Err(VivaError::Embedding(format!(
            "embedder returned {} vectors for {} sentences",
            vectors.len(),
            sentences.len()
        )));
    }

    let centroid = mean_vector(&vectors);

    let adj_sims: Vec<f64> = vectors
        .windows(2)
        .map(|pair| cosine_similarity(&pair[0], &pair[1]))
        .collect();
    let centroid_dists: Vec<f64> = vectors
        .iter()
        .map(|v| 1.0 - cosine_similarity(v, &centroid))
        .collect();

    // A one-sentence answer has no adjacency pairs; it does not drift, so
    // the adjacency stats are neutral rather than zero.
    let (mean, std, p10, p50, p90, frac_high, frac_low, path_len) = if adj_sims.is_empty() {
        (1.0, 0.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0)
    } else {
        let n = adj_sims.len() as f64;
        (
            stats::mean(&adj_sims),
            stats::std_dev(&adj_sims),
            stats::percentile(&adj_sims, 10.0),
            stats::percentile(&adj_sims, 50.0),
            stats::percentile(&adj_sims, 90.0),
            adj_sims.iter().filter(|s| **s >= cfg.adj_sim_high).count() as f64 / n,
            adj_sims.iter().filter(|s| **s <= cfg.adj_sim_low).count() as f64 / n,
            adj_sims.iter().map(|s| 1.0 - s).sum(),
        )
    };

    let centroid_dist_mean = stats::mean(&centroid_dists);
    let centroid_dist_std = stats::std_dev(&centroid_dists);
    let intra_coh = 1.0 - centroid_dist_mean;
    let coherence_score = 0.5 * mean + 0.5 * intra_coh;
    let inter_div = reference
        .map(|r| 1.0 - cosine_similarity(&centroid, r))
        .unwrap_or(0.0);

    debug!(
        n_sentences = sentences.len(),
        adj_sim_mean = format_args!("{mean:.3}"),
        coherence_score = format_args!("{coherence_score:.3}"),
        "semantic features extracted"
    );

    Ok(SemanticFeatures {
        n_sentences: sentences.len(),
        adj_sim_mean: mean,
        adj_sim_std: std,
        adj_sim_p10: p10,
        adj_sim_p50: p50,
        adj_sim_p90: p90,
        adj_sim_frac_high: frac_high,
        adj_sim_frac_low: frac_low,
        centroid_dist_mean,
        centroid_dist_std,
        topic_path_len: path_len,
        coherence_score,
        intra_coh,
        inter_div,
    })
}

/// Embed `text` and return the centroid of its sentence vectors.
///
/// Used to build the reference/topic embedding from a model answer.
pub fn topic_embedding(text: &str, embedder: &mut dyn SentenceEmbedder) -> Result<Vec<f32>> {
    let sentences = split_sentences(text);
    if sentences.is_empty() {
        return Err(VivaError::InvalidInput("reference text is empty".into()));
    }
    let vectors = embedder.embed(&sentences)?;
    Ok(mean_vector(&vectors))
}

/// Split text into sentences on terminal punctuation. Text with no
/// terminator is a single sentence.
pub fn split_sentences(text: &str) -> Vec<String> {
    text.split(['.', '!', '?', '…', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

fn mean_vector(vectors: &[Vec<f32>]) -> Vec<f32> {
    let dim = vectors.first().map(Vec::len).unwrap_or(0);
    let mut out = vec![0f32; dim];
    if vectors.is_empty() {
        return out;
    }
    for v in vectors {
        for (o, x) in out.iter_mut().zip(v) {
            *o += x;
        }
    }
    let n = vectors.len() as f32;
    for o in &mut out {
        *o /= n;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::stub::HashEmbedder;
    use approx::assert_relative_eq;

    #[test]
    fn empty_transcript_is_invalid_input() {
        let mut e = HashEmbedder::default();
        let err = extract_semantic("   ", &mut e, &SemanticConfig::default(), None).unwrap_err();
        assert!(matches!(err, VivaError::InvalidInput(_)));
    }

    #[test]
    fn splits_on_terminal_punctuation() {
        let s = split_sentences("First one. Second! Third? no terminator");
        assert_eq!(s, vec!["First one", "Second", "Third", "no terminator"]);
    }

    #[test]
    fn unpunctuated_text_is_one_sentence() {
        let s = split_sentences("just a fragment without an end");
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn single_sentence_has_neutral_adjacency() {
        let mut e = HashEmbedder::default();
        let f = extract_semantic(
            "The mitochondria is the powerhouse of the cell.",
            &mut e,
            &SemanticConfig::default(),
            None,
        )
        .unwrap();
        assert_eq!(f.n_sentences, 1);
        assert_relative_eq!(f.adj_sim_mean, 1.0);
        assert_relative_eq!(f.topic_path_len, 0.0);
        assert_relative_eq!(f.centroid_dist_mean, 0.0, epsilon = 1e-6);
        assert_relative_eq!(f.inter_div, 0.0);
    }

    #[test]
    fn on_topic_answer_is_more_coherent_than_rambling() {
        let mut e = HashEmbedder::default();
        let cfg = SemanticConfig::default();
        let on_topic = extract_semantic(
            "The cell membrane controls transport. The cell membrane is selective. \
             Transport through the membrane uses channels.",
            &mut e,
            &cfg,
            None,
        )
        .unwrap();
        let rambling = extract_semantic(
            "The cell membrane controls transport. Napoleon invaded Russia. \
             My favorite food is pizza.",
            &mut e,
            &cfg,
            None,
        )
        .unwrap();
        assert!(
            on_topic.coherence_score > rambling.coherence_score,
            "on_topic={} rambling={}",
            on_topic.coherence_score,
            rambling.coherence_score
        );
        assert!(on_topic.topic_path_len < rambling.topic_path_len);
    }

    #[test]
    fn inter_div_is_low_when_answer_matches_reference() {
        let mut e = HashEmbedder::default();
        let cfg = SemanticConfig::default();
        let reference = topic_embedding(
            "Photosynthesis converts light energy into chemical energy.",
            &mut e,
        )
        .unwrap();
        let matching = extract_semantic(
            "Photosynthesis converts light into chemical energy.",
            &mut e,
            &cfg,
            Some(&reference),
        )
        .unwrap();
        let unrelated = extract_semantic(
            "The French revolution started in seventeen eighty nine.",
            &mut e,
            &cfg,
            Some(&reference),
        )
        .unwrap();
        assert!(
            matching.inter_div < unrelated.inter_div,
            "matching={} unrelated={}",
            matching.inter_div,
            unrelated.inter_div
        );
    }

    #[test]
    fn frac_high_plus_low_at_most_one() {
        let mut e = HashEmbedder::default();
        let f = extract_semantic(
            "One sentence here. Another sentence there. A third sentence everywhere.",
            &mut e,
            &SemanticConfig::default(),
            None,
        )
        .unwrap();
        assert!(f.adj_sim_frac_high + f.adj_sim_frac_low <= 1.0 + 1e-9);
        assert!(f.adj_sim_p10 <= f.adj_sim_p50 && f.adj_sim_p50 <= f.adj_sim_p90);
    }
}
