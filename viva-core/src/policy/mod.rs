//! Tail-question decision policy.
//!
//! A small deterministic state machine per answer turn:
//!
//! ```text
//! EVALUATING ──confidence ≥ threshold──────────► PASS (closed, correct)
//!     │
//!     ├──recall cap reached────────────────────► PASS (closed)
//!     │
//!     └──otherwise─────► ASK ──next submission──► EVALUATING
//! ```
//!
//! The recall cap is a safety property: without it a struggling student
//! could be probed forever. Generation failures degrade to PASS with
//! `is_correct` left at its last known value (fail-open) — blocking a
//! student on a generator outage is worse than ending the loop early.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, VivaError};
use crate::external::{call_with_retry, QuestionContext, QuestionGenerator, TailQuestion};

/// Per-turn decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Plan {
    /// Accept the answer; the question loop ends.
    Pass,
    /// Probe with a generated follow-up question.
    Ask,
}

/// Policy tuning.
#[derive(Debug, Clone)]
pub struct PolicyConfig {
    /// Confidence (in [0, 1]) at or above which the answer is accepted.
    pub threshold: f32,
    /// Hard cap on follow-ups per question. Reaching it forces PASS.
    pub max_recalls: u32,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            threshold: 0.8,
            max_recalls: 3,
        }
    }
}

/// Mutable per-question-attempt state, owned by the request handling the
/// current turn. Persisting between turns is the caller's concern.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnswerSession {
    /// Number of follow-ups asked so far for this question.
    pub recalled_time: u32,
    /// Set once confidence crosses the accept threshold; never unset.
    pub is_correct: bool,
    /// Decision of the most recent turn.
    pub last_plan: Option<Plan>,
    /// A closed session accepts no further turns.
    pub closed: bool,
}

impl AnswerSession {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Outcome of one decision turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub plan: Plan,
    /// Present only when `plan == Ask`.
    pub tail_question: Option<TailQuestion>,
}

/// Run one turn of the decision policy.
///
/// `confidence` is in [0, 1] — either the normalized regression output or
/// an externally supplied classifier confidence.
///
/// # Errors
/// `VivaError::SessionClosed` when the session already ended.
pub fn decide(
    session: &mut AnswerSession,
    confidence: f32,
    cfg: &PolicyConfig,
    generator: &mut dyn QuestionGenerator,
    ctx: &QuestionContext,
) -> Result<TurnOutcome> {
    if session.closed {
        return Err(VivaError::SessionClosed);
    }

    if confidence >= cfg.threshold {
        session.is_correct = true;
        session.last_plan = Some(Plan::Pass);
        session.closed = true;
        debug!(confidence, threshold = cfg.threshold, "answer accepted");
        return Ok(TurnOutcome {
            plan: Plan::Pass,
            tail_question: None,
        });
    }

    // Cap check before asking: the Nth probe would push recalled_time past
    // the configured maximum, so the loop ends here instead.
    if session.recalled_time + 1 >= cfg.max_recalls {
        session.last_plan = Some(Plan::Pass);
        session.closed = true;
        debug!(
            recalled_time = session.recalled_time,
            max_recalls = cfg.max_recalls,
            "recall cap reached — forcing PASS"
        );
        return Ok(TurnOutcome {
            plan: Plan::Pass,
            tail_question: None,
        });
    }

    session.recalled_time += 1;
    let ctx = QuestionContext {
        recalled_time: session.recalled_time,
        ..ctx.clone()
    };

    match call_with_retry("question-generator", || generator.generate(&ctx)) {
        Ok(tail) => {
            session.last_plan = Some(Plan::Ask);
            debug!(recalled_time = session.recalled_time, "asking tail question");
            Ok(TurnOutcome {
                plan: Plan::Ask,
                tail_question: Some(tail),
            })
        }
        Err(e) => {
            // Fail-open: end the loop rather than block the student.
            warn!(error = %e, "tail-question generation failed — degrading to PASS");
            session.last_plan = Some(Plan::Pass);
            session.closed = true;
            Ok(TurnOutcome {
                plan: Plan::Pass,
                tail_question: None,
            })
        }
    }
}
