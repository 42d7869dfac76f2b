//! The JSON contract returned to the caller after scoring one submission.
//!
//! Field names are snake_case on the wire — this is the shape the web
//! backend consumes and stores, so it is covered by serialization tests.

use serde::{Deserialize, Serialize};

use crate::external::TailQuestion;
use crate::inference::{InferenceResult, Letter};
use crate::policy::{AnswerSession, Plan};

/// Everything the caller needs from one scored submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionReport {
    /// Raw regression output.
    pub pred_cont: f32,
    /// Bucket grade in 1..=8.
    pub pred_rounded: u8,
    /// Letter grade A–D.
    pub pred_letter: Letter,
    pub is_correct: bool,
    pub plan: Plan,
    pub recalled_time: u32,
    /// Present only when `plan == ASK`.
    pub tail_question: Option<TailQuestion>,
}

impl SubmissionReport {
    pub fn new(
        inference: InferenceResult,
        session: &AnswerSession,
        plan: Plan,
        tail_question: Option<TailQuestion>,
    ) -> Self {
        Self {
            pred_cont: inference.pred_cont,
            pred_rounded: inference.pred_bucket,
            pred_letter: inference.pred_letter,
            is_correct: session.is_correct,
            plan,
            recalled_time: session.recalled_time,
            tail_question,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::grade;

    #[test]
    fn pass_report_serializes_with_null_tail_question() {
        let session = AnswerSession {
            is_correct: true,
            closed: true,
            ..AnswerSession::new()
        };
        let report = SubmissionReport::new(grade(7.2), &session, Plan::Pass, None);

        let json = serde_json::to_value(&report).expect("serialize report");
        assert!((json["pred_cont"].as_f64().unwrap() - 7.2).abs() < 1e-5);
        assert_eq!(json["pred_rounded"], 7);
        assert_eq!(json["pred_letter"], "A");
        assert_eq!(json["is_correct"], true);
        assert_eq!(json["plan"], "PASS");
        assert_eq!(json["recalled_time"], 0);
        assert!(json["tail_question"].is_null());

        let round_trip: SubmissionReport =
            serde_json::from_value(json).expect("deserialize report");
        assert_eq!(round_trip.plan, Plan::Pass);
        assert!(round_trip.tail_question.is_none());
    }

    #[test]
    fn ask_report_carries_the_tail_question() {
        let session = AnswerSession {
            recalled_time: 1,
            ..AnswerSession::new()
        };
        let tail = TailQuestion {
            question: "which organelle produces ATP?".into(),
            model_answer: "the mitochondria".into(),
            explanation: "probes the energy pathway".into(),
            difficulty: "easy".into(),
        };
        let report = SubmissionReport::new(grade(2.4), &session, Plan::Ask, Some(tail));

        let json = serde_json::to_value(&report).expect("serialize report");
        assert_eq!(json["plan"], "ASK");
        assert_eq!(json["pred_rounded"], 2);
        assert_eq!(json["pred_letter"], "D");
        assert_eq!(json["recalled_time"], 1);
        assert_eq!(
            json["tail_question"]["question"],
            "which organelle produces ATP?"
        );
    }

    #[test]
    fn plan_rejects_lowercase_values() {
        let err = serde_json::from_str::<Plan>(r#""pass""#);
        assert!(err.is_err(), "expected lowercase plan to fail");
    }
}
