//! # viva-core
//!
//! Spoken-answer scoring engine for oral-exam practice.
//!
//! ## Architecture
//!
//! ```text
//! WAV / PCM → Waveform (mono, 16 kHz)
//!                 │
//!        ┌────────┴────────┐
//!   acoustic features  semantic features      (concurrent)
//!   (pitch, silence)   (embedding coherence)
//!        └────────┬────────┘
//!           FeatureRow (fixed column order)
//!                 │
//!        ScoringModel::score → grade (1–8, A–D)
//!                 │
//!        decision policy → PASS | ASK(+tail question)
//! ```
//!
//! Extraction runs on worker threads per submission; the embedder and
//! regressor are loaded once and shared behind mutex handles.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod audio;
pub mod embed;
pub mod engine;
pub mod error;
pub mod external;
pub mod features;
pub mod inference;
pub mod policy;
pub mod prosody;
pub mod report;
pub mod semantic;
pub mod transcript;

mod stats;

// Convenience re-exports for downstream crates
pub use audio::Waveform;
pub use embed::{EmbedderHandle, SentenceEmbedder};
pub use engine::{EngineConfig, ScoringEngine, Submission};
pub use error::VivaError;
pub use external::{QuestionContext, QuestionGenerator, TailQuestion, Transcriber};
pub use inference::{InferenceResult, Letter, ModelHandle, ScoringModel};
pub use policy::{AnswerSession, Plan, PolicyConfig};
pub use report::SubmissionReport;
pub use transcript::Transcript;

#[cfg(feature = "onnx")]
pub use embed::{OnnxEmbedder, OnnxEmbedderConfig};

#[cfg(feature = "onnx")]
pub use inference::{OnnxRegressor, OnnxRegressorConfig};
