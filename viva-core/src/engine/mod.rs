//! `ScoringEngine` — top-level pipeline orchestration.
//!
//! ## Pipeline stages (per submission)
//!
//! ```text
//! 1. Normalize waveform (downmix + canonical rate)
//! 2. Acoustic and semantic extraction run concurrently
//!    (independent inputs: waveform vs transcript)
//! 3. Fuse into one feature row (FEATURE_COLUMNS order, no gaps)
//! 4. ScoringModel::score → continuous grade + bucket + letter
//! 5. Decision policy → PASS | ASK (+ tail question)
//! ```
//!
//! Each submission is an independent, request-scoped computation. The
//! embedder and regressor are loaded once (`warm_up`) and shared read-only
//! behind their handles; the `AnswerSession` is owned exclusively by the
//! caller of the current turn, so no cross-request locking exists here.

use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, RecvTimeoutError};
use tracing::{debug, info};

use crate::audio::Waveform;
use crate::embed::EmbedderHandle;
use crate::error::{Result, VivaError};
use crate::external::{QuestionContext, QuestionGenerator};
use crate::features::{build_feature_row, raw_features_json};
use crate::inference::{infer, ModelHandle};
use crate::policy::{decide, AnswerSession, PolicyConfig};
use crate::prosody::{extract_acoustic, AcousticConfig, AcousticFeatures};
use crate::report::SubmissionReport;
use crate::semantic::{extract_semantic, topic_embedding, SemanticConfig, SemanticFeatures};
use crate::transcript::{surface_counts, Transcript};

/// The regression scale's upper bound, used to normalize confidence.
const PRED_SCALE_MAX: f32 = 8.0;

/// Configuration for `ScoringEngine`.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub acoustic: AcousticConfig,
    pub semantic: SemanticConfig,
    pub policy: PolicyConfig,
    /// Upper bound on the combined extraction stage. Expiry is a reported
    /// error, never a silent retry — retries would duplicate STT/LLM cost.
    pub extraction_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            acoustic: AcousticConfig::default(),
            semantic: SemanticConfig::default(),
            policy: PolicyConfig::default(),
            extraction_timeout: Duration::from_secs(30),
        }
    }
}

/// One question-attempt submission: the recorded answer plus the question
/// material the tail-question generator needs.
#[derive(Debug, Clone)]
pub struct Submission {
    pub waveform: Waveform,
    pub transcript: Transcript,
    pub question: String,
    pub model_answer: String,
}

/// The top-level engine handle. All fields use interior mutability via
/// the model handles; share behind `Arc` across worker threads.
pub struct ScoringEngine {
    config: EngineConfig,
    embedder: EmbedderHandle,
    model: ModelHandle,
}

impl ScoringEngine {
    /// Create a new engine. Call `warm_up()` once before scoring.
    pub fn new(config: EngineConfig, embedder: EmbedderHandle, model: ModelHandle) -> Self {
        Self {
            config,
            embedder,
            model,
        }
    }

    /// Load the embedder and regressor. Call once at process start.
    pub fn warm_up(&self) -> Result<()> {
        info!("warming up embedder and scoring model");
        self.embedder.0.lock().warm_up()?;
        self.model.0.lock().warm_up()?;
        info!("models ready");
        Ok(())
    }

    /// Score one spoken answer and run the decision policy for its turn.
    ///
    /// The caller must serialize turns for the same open session; the
    /// session is mutated in place.
    pub fn score_submission(
        &self,
        submission: &Submission,
        session: &mut AnswerSession,
        generator: &mut dyn QuestionGenerator,
    ) -> Result<SubmissionReport> {
        if submission.transcript.is_blank() {
            return Err(VivaError::InvalidInput(
                "transcript is empty or missing".into(),
            ));
        }
        if submission.waveform.is_empty() {
            return Err(VivaError::InvalidInput("waveform is empty".into()));
        }

        let wave = submission.waveform.to_canonical_rate()?;
        let (acoustic, semantic) = self.extract_parallel(wave, submission)?;
        let counts = surface_counts(&submission.transcript);

        let raw = raw_features_json(&acoustic, &semantic, &counts);
        let row = build_feature_row(&raw)?;

        let inference = infer(&self.model, &row)?;
        let confidence = (inference.pred_cont / PRED_SCALE_MAX).clamp(0.0, 1.0);

        let ctx = QuestionContext {
            question: submission.question.clone(),
            model_answer: submission.model_answer.clone(),
            student_answer: submission.transcript.text.clone(),
            recalled_time: session.recalled_time,
        };
        let outcome = decide(session, confidence, &self.config.policy, generator, &ctx)?;

        debug!(
            pred_cont = format_args!("{:.3}", inference.pred_cont),
            confidence = format_args!("{confidence:.3}"),
            plan = ?outcome.plan,
            recalled_time = session.recalled_time,
            "submission scored"
        );

        Ok(SubmissionReport::new(
            inference,
            session,
            outcome.plan,
            outcome.tail_question,
        ))
    }

    /// Run the two extractors concurrently; they share no inputs.
    ///
    /// The threads own their data, so a timeout abandons them rather than
    /// blocking the request on a wedged embedder.
    fn extract_parallel(
        &self,
        wave: Waveform,
        submission: &Submission,
    ) -> Result<(AcousticFeatures, SemanticFeatures)> {
        let (ac_tx, ac_rx) = bounded(1);
        let (se_tx, se_rx) = bounded(1);

        let acoustic_cfg = self.config.acoustic.clone();
        std::thread::spawn(move || {
            let _ = ac_tx.send(extract_acoustic(&wave, &acoustic_cfg));
        });

        let semantic_cfg = self.config.semantic.clone();
        let embedder = self.embedder.clone();
        let text = submission.transcript.text.clone();
        let model_answer = submission.model_answer.clone();
        std::thread::spawn(move || {
            let result = (|| {
                let mut embedder = embedder.0.lock();
                let reference = if model_answer.trim().is_empty() {
                    None
                } else {
                    Some(topic_embedding(&model_answer, &mut *embedder)?)
                };
                extract_semantic(&text, &mut *embedder, &semantic_cfg, reference.as_deref())
            })();
            let _ = se_tx.send(result);
        });

        let deadline = Instant::now() + self.config.extraction_timeout;
        let acoustic = recv_stage(&ac_rx, deadline, "acoustic extraction")??;
        let semantic = recv_stage(&se_rx, deadline, "semantic extraction")??;
        Ok((acoustic, semantic))
    }
}

fn recv_stage<T>(
    rx: &crossbeam_channel::Receiver<Result<T>>,
    deadline: Instant,
    stage: &str,
) -> Result<Result<T>> {
    let remaining = deadline.saturating_duration_since(Instant::now());
    rx.recv_timeout(remaining).map_err(|e| match e {
        RecvTimeoutError::Timeout => VivaError::Timeout {
            stage: stage.to_owned(),
            timeout_ms: remaining.as_millis() as u64,
        },
        RecvTimeoutError::Disconnected => {
            VivaError::Other(anyhow::anyhow!("{stage} worker panicked"))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::stub::HashEmbedder;
    use crate::embed::SentenceEmbedder;
    use crate::external::TailQuestion;
    use crate::features::FeatureRow;
    use crate::inference::ScoringModel;
    use crate::policy::Plan;

    struct FixedModel {
        value: f32,
    }

    impl ScoringModel for FixedModel {
        fn warm_up(&mut self) -> Result<()> {
            Ok(())
        }

        fn score(&mut self, _row: &FeatureRow) -> Result<f32> {
            Ok(self.value)
        }
    }

    struct OkGenerator;

    impl QuestionGenerator for OkGenerator {
        fn generate(&mut self, ctx: &QuestionContext) -> Result<TailQuestion> {
            Ok(TailQuestion {
                question: format!("follow-up #{}", ctx.recalled_time),
                model_answer: "reference".into(),
                explanation: "probe".into(),
                difficulty: "medium".into(),
            })
        }
    }

    struct SlowEmbedder {
        delay: Duration,
    }

    impl SentenceEmbedder for SlowEmbedder {
        fn warm_up(&mut self) -> Result<()> {
            Ok(())
        }

        fn embed(&mut self, sentences: &[String]) -> Result<Vec<Vec<f32>>> {
            std::thread::sleep(self.delay);
            Ok(vec![vec![0.1; 16]; sentences.len()])
        }

        fn dimension(&self) -> usize {
            16
        }
    }

    fn test_submission() -> Submission {
        let samples: Vec<f32> = (0..32_000)
            .map(|i| (2.0 * std::f64::consts::PI * 180.0 * i as f64 / 16_000.0).sin() as f32 * 0.5)
            .collect();
        Submission {
            waveform: Waveform::new(samples, 16_000),
            transcript: Transcript::from_text(
                "The cell membrane controls transport. It is selectively permeable.",
            ),
            question: "what does the cell membrane do?".into(),
            model_answer: "it controls transport into and out of the cell".into(),
        }
    }

    fn engine(pred: f32) -> ScoringEngine {
        ScoringEngine::new(
            EngineConfig::default(),
            EmbedderHandle::new(HashEmbedder::default()),
            ModelHandle::new(FixedModel { value: pred }),
        )
    }

    #[test]
    fn confident_answer_passes() {
        let engine = engine(7.2);
        engine.warm_up().unwrap();
        let mut session = AnswerSession::new();
        let report = engine
            .score_submission(&test_submission(), &mut session, &mut OkGenerator)
            .unwrap();
        assert_eq!(report.plan, Plan::Pass);
        assert_eq!(report.pred_rounded, 7);
        assert!(report.is_correct);
        assert!(report.tail_question.is_none());
        assert_eq!(report.recalled_time, 0);
    }

    #[test]
    fn uncertain_answer_asks_a_tail_question() {
        let engine = engine(2.1);
        engine.warm_up().unwrap();
        let mut session = AnswerSession::new();
        let report = engine
            .score_submission(&test_submission(), &mut session, &mut OkGenerator)
            .unwrap();
        assert_eq!(report.plan, Plan::Ask);
        assert!(!report.is_correct);
        assert_eq!(report.recalled_time, 1);
        assert_eq!(report.tail_question.unwrap().question, "follow-up #1");
    }

    #[test]
    fn scoring_is_deterministic_for_fixed_model() {
        let engine = engine(4.9);
        engine.warm_up().unwrap();
        let submission = test_submission();
        let a = engine
            .score_submission(&submission, &mut AnswerSession::new(), &mut OkGenerator)
            .unwrap();
        let b = engine
            .score_submission(&submission, &mut AnswerSession::new(), &mut OkGenerator)
            .unwrap();
        assert_eq!(a.pred_cont, b.pred_cont);
        assert_eq!(a.pred_rounded, 5);
    }

    #[test]
    fn blank_transcript_is_rejected_upfront() {
        let engine = engine(5.0);
        let mut submission = test_submission();
        submission.transcript = Transcript::from_text("  ");
        let err = engine
            .score_submission(&submission, &mut AnswerSession::new(), &mut OkGenerator)
            .unwrap_err();
        assert!(matches!(err, VivaError::InvalidInput(_)));
    }

    #[test]
    fn wedged_embedder_times_out() {
        let mut config = EngineConfig::default();
        config.extraction_timeout = Duration::from_millis(50);
        let engine = ScoringEngine::new(
            config,
            EmbedderHandle::new(SlowEmbedder {
                delay: Duration::from_secs(5),
            }),
            ModelHandle::new(FixedModel { value: 5.0 }),
        );
        let err = engine
            .score_submission(&test_submission(), &mut AnswerSession::new(), &mut OkGenerator)
            .unwrap_err();
        assert!(matches!(err, VivaError::Timeout { .. }), "got {err:?}");
    }

    #[test]
    fn silent_audio_still_scores_via_defaults() {
        // Insufficient pitch signal must not fail the submission.
        let engine = engine(3.0);
        engine.warm_up().unwrap();
        let mut submission = test_submission();
        submission.waveform = Waveform::new(vec![0.0; 16_000], 16_000);
        let report = engine
            .score_submission(&submission, &mut AnswerSession::new(), &mut OkGenerator)
            .unwrap();
        assert_eq!(report.pred_rounded, 3);
    }
}
