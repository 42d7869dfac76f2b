//! Feature fusion: the canonical column schema and the raw-JSON → row
//! builder.
//!
//! The inference model was fit against a fixed, ordered column list.
//! `build_feature_row` guarantees the row handed to inference has every
//! column present, in schema order, with no NaN: upstream "missing"
//! values (insufficient pitch signal, absent counts) become a documented
//! 0.0 default, and `*_ratio` columns are derived here from their raw
//! count and `word_cnt`.

use serde_json::{json, Map, Value};

use crate::error::{Result, VivaError};
use crate::prosody::AcousticFeatures;
use crate::semantic::SemanticFeatures;
use crate::transcript::SurfaceCounts;

/// Schema version; bump when `FEATURE_COLUMNS` changes shape or order.
pub const FEATURE_SCHEMA_VERSION: u32 = 1;

/// The canonical ordered column list the regressor was trained against.
pub const FEATURE_COLUMNS: &[&str] = &[
    // Acoustic / prosody
    "min_f0_hz",
    "max_f0_hz",
    "range_f0_hz",
    "abs_slope_f0_st_per_s",
    "end_slope_f0_st_per_s",
    "n_f0_used",
    "total_silence_sec",
    "percent_silence",
    "min_rms",
    // Semantic / coherence
    "adj_sim_mean",
    "adj_sim_std",
    "adj_sim_p10",
    "adj_sim_p50",
    "adj_sim_p90",
    "adj_sim_frac_high",
    "adj_sim_frac_low",
    "centroid_dist_mean",
    "centroid_dist_std",
    "topic_path_len",
    "coherence_score",
    "intra_coh",
    "inter_div",
    // Transcript surface counts
    "word_cnt",
    "repeat_cnt",
    "filler_cnt",
    "pause_cnt",
    "repeat_cnt_ratio",
    "filler_cnt_ratio",
    "pause_cnt_ratio",
];

/// Default for any value missing upstream.
const MISSING_DEFAULT: f64 = 0.0;

/// One complete inference-ready row in `FEATURE_COLUMNS` order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    values: Vec<f64>,
}

impl FeatureRow {
    /// Wrap pre-ordered values; rejects a wrong column count.
    pub fn from_values(values: Vec<f64>) -> Result<Self> {
        if values.len() != FEATURE_COLUMNS.len() {
            return Err(VivaError::SchemaMismatch(format!(
                "expected {} columns, got {}",
                FEATURE_COLUMNS.len(),
                values.len()
            )));
        }
        Ok(Self { values })
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, column: &str) -> Option<f64> {
        FEATURE_COLUMNS
            .iter()
            .position(|c| *c == column)
            .map(|i| self.values[i])
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Build a complete feature row from a raw feature JSON object.
///
/// Policy decisions (availability over statistical purity):
/// - `*_ratio` columns are raw count ÷ `word_cnt`; 0.0 when `word_cnt` is
///   0 or missing — never a division error, never NaN.
/// - any other missing, null, or non-finite value defaults to 0.0.
///
/// # Errors
/// `VivaError::InvalidInput` when `raw` is not a JSON object.
pub fn build_feature_row(raw: &Value) -> Result<FeatureRow> {
    let obj = raw
        .as_object()
        .ok_or_else(|| VivaError::InvalidInput("raw features must be a JSON object".into()))?;

    let word_cnt = finite_or_default(obj, "word_cnt");

    let values = FEATURE_COLUMNS
        .iter()
        .map(|col| match col.strip_suffix("_ratio") {
            Some(count_key) => {
                if word_cnt > 0.0 {
                    finite_or_default(obj, count_key) / word_cnt
                } else {
                    MISSING_DEFAULT
                }
            }
            None => finite_or_default(obj, col),
        })
        .collect();

    FeatureRow::from_values(values)
}

fn finite_or_default(obj: &Map<String, Value>, key: &str) -> f64 {
    obj.get(key)
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite())
        .unwrap_or(MISSING_DEFAULT)
}

/// Assemble the raw feature JSON from the three extractor outputs.
///
/// Missing acoustic fields are omitted (not zeroed) so the defaulting
/// policy lives in exactly one place: `build_feature_row`.
pub fn raw_features_json(
    acoustic: &AcousticFeatures,
    semantic: &SemanticFeatures,
    counts: &SurfaceCounts,
) -> Value {
    let mut obj = Map::new();

    let mut put_opt = |key: &str, v: Option<f64>| {
        if let Some(v) = v {
            obj.insert(key.to_owned(), json!(v));
        }
    };
    put_opt("min_f0_hz", acoustic.min_f0_hz);
    put_opt("max_f0_hz", acoustic.max_f0_hz);
    put_opt("range_f0_hz", acoustic.range_f0_hz);
    put_opt("abs_slope_f0_st_per_s", acoustic.abs_slope_f0_st_per_s);
    put_opt("end_slope_f0_st_per_s", acoustic.end_slope_f0_st_per_s);

    obj.insert("n_f0_used".into(), json!(acoustic.n_f0_used as f64));
    obj.insert("total_silence_sec".into(), json!(acoustic.total_silence_sec));
    obj.insert("percent_silence".into(), json!(acoustic.percent_silence));
    obj.insert("min_rms".into(), json!(acoustic.min_rms));

    obj.insert("adj_sim_mean".into(), json!(semantic.adj_sim_mean));
    obj.insert("adj_sim_std".into(), json!(semantic.adj_sim_std));
    obj.insert("adj_sim_p10".into(), json!(semantic.adj_sim_p10));
    obj.insert("adj_sim_p50".into(), json!(semantic.adj_sim_p50));
    obj.insert("adj_sim_p90".into(), json!(semantic.adj_sim_p90));
    obj.insert("adj_sim_frac_high".into(), json!(semantic.adj_sim_frac_high));
    obj.insert("adj_sim_frac_low".into(), json!(semantic.adj_sim_frac_low));
    obj.insert("centroid_dist_mean".into(), json!(semantic.centroid_dist_mean));
    obj.insert("centroid_dist_std".into(), json!(semantic.centroid_dist_std));
    obj.insert("topic_path_len".into(), json!(semantic.topic_path_len));
    obj.insert("coherence_score".into(), json!(semantic.coherence_score));
    obj.insert("intra_coh".into(), json!(semantic.intra_coh));
    obj.insert("inter_div".into(), json!(semantic.inter_div));

    obj.insert("word_cnt".into(), json!(counts.word_cnt as f64));
    obj.insert("repeat_cnt".into(), json!(counts.repeat_cnt as f64));
    obj.insert("filler_cnt".into(), json!(counts.filler_cnt as f64));
    obj.insert("pause_cnt".into(), json!(counts.pause_cnt as f64));

    Value::Object(obj)
}
