//! Narrow interfaces for the external collaborators.
//!
//! Speech-to-text and tail-question generation are opaque remote services
//! in production. They stay behind blocking traits so the pipeline's
//! concurrency model never depends on their internal threading, and so
//! tests can script them.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Result, VivaError};
use crate::transcript::Transcript;

/// Backoff before the single retry of a failed external call.
pub const RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Speech-to-text collaborator: audio bytes → transcript with word
/// timestamps.
pub trait Transcriber: Send + 'static {
    fn transcribe(&mut self, audio: &[u8]) -> Result<Transcript>;
}

/// Everything the question generator needs to write a follow-up probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionContext {
    /// The original question being probed.
    pub question: String,
    /// The reference answer for that question.
    pub model_answer: String,
    /// The student's transcribed answer this turn.
    pub student_answer: String,
    /// How many follow-ups have already been asked for this question.
    pub recalled_time: u32,
}

/// A generated follow-up probe.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TailQuestion {
    pub question: String,
    pub model_answer: String,
    pub explanation: String,
    pub difficulty: String,
}

/// Tail-question generation collaborator. May fail or time out; callers
/// must not assume success.
pub trait QuestionGenerator: Send + 'static {
    fn generate(&mut self, ctx: &QuestionContext) -> Result<TailQuestion>;
}

/// Call an external dependency, retrying exactly once with backoff.
///
/// External services are retried at most once — more would duplicate
/// STT/LLM costs. The second failure is surfaced as `VivaError::External`
/// for the caller to degrade on.
pub fn call_with_retry<T>(
    service: &str,
    mut call: impl FnMut() -> Result<T>,
) -> Result<T> {
    match call() {
        Ok(v) => Ok(v),
        Err(first) => {
            warn!(service, error = %first, "external call failed — retrying once");
            std::thread::sleep(RETRY_BACKOFF);
            call().map_err(|second| VivaError::External {
                service: service.to_owned(),
                detail: second.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_success_needs_no_retry() {
        let mut calls = 0;
        let out = call_with_retry("stt", || {
            calls += 1;
            Ok::<_, VivaError>(7)
        })
        .unwrap();
        assert_eq!(out, 7);
        assert_eq!(calls, 1);
    }

    #[test]
    fn retries_once_then_succeeds() {
        let mut calls = 0;
        let out = call_with_retry("generator", || {
            calls += 1;
            if calls == 1 {
                Err(VivaError::Inference("transient".into()))
            } else {
                Ok(42)
            }
        })
        .unwrap();
        assert_eq!(out, 42);
        assert_eq!(calls, 2);
    }

    #[test]
    fn second_failure_surfaces_as_external() {
        let mut calls = 0;
        let err = call_with_retry("generator", || {
            calls += 1;
            Err::<(), _>(VivaError::Inference("down".into()))
        })
        .unwrap_err();
        assert_eq!(calls, 2);
        assert!(matches!(err, VivaError::External { .. }));
    }
}
