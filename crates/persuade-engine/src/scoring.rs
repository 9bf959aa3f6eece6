//! Scoring adapter.
//!
//! Normalizes arbitrary model output into a bounded 1-10 score plus
//! rationale. Malformed output is surfaced as an error, never clamped or
//! defaulted: a silently coerced score would corrupt fairness, so the
//! reply stays unscored and is retried on a later tick.

use std::sync::Arc;

use persuade_core::{GameError, Result, RetryPolicy};
use serde::Deserialize;

use crate::collaborators::{with_retry, ScoringClient};

/// A normalized persuasiveness evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Evaluation {
    /// Bounded score, 1 to 10 inclusive.
    pub score: u8,

    /// The model's rationale for the score.
    pub rationale: String,
}

/// Wraps the scoring collaborator's raw call.
pub struct ScoringAdapter {
    client: Arc<dyn ScoringClient>,
    retry: RetryPolicy,
}

impl ScoringAdapter {
    /// Create an adapter over a scoring collaborator.
    pub fn new(client: Arc<dyn ScoringClient>, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }

    /// Evaluate a reply's persuasiveness against the challenge topic.
    ///
    /// Transient upstream failures are retried under the bounded policy;
    /// a parse failure is [`GameError::ScoringMalformed`].
    pub async fn score(&self, topic: &str, reply_text: &str) -> Result<Evaluation> {
        let raw = with_retry(&self.retry, "scoring.evaluate", || {
            self.client.evaluate(topic, reply_text)
        })
        .await?;

        parse_evaluation(&raw)
    }
}

/// Extract a `{"score": .., "reasoning": ..}` object from raw model output.
///
/// Models wrap their JSON in prose more often than not, so everything from
/// the first `{` to the last `}` is treated as the candidate object.
pub fn parse_evaluation(raw: &str) -> Result<Evaluation> {
    let start = raw.find('{');
    let end = raw.rfind('}');
    let candidate = match (start, end) {
        (Some(s), Some(e)) if s < e => &raw[s..=e],
        _ => {
            return Err(GameError::ScoringMalformed {
                message: "no JSON object in model output".to_string(),
            })
        }
    };

    let value: serde_json::Value =
        serde_json::from_str(candidate).map_err(|e| GameError::ScoringMalformed {
            message: format!("invalid JSON in model output: {}", e),
        })?;

    let score = value
        .get("score")
        .and_then(integral_score)
        .ok_or_else(|| GameError::ScoringMalformed {
            message: "missing or non-integer 'score' field".to_string(),
        })?;

    if !(1..=10).contains(&score) {
        return Err(GameError::ScoringMalformed {
            message: format!("score {} outside 1..=10", score),
        });
    }

    let rationale = value
        .get("reasoning")
        .and_then(|v| v.as_str())
        .unwrap_or("No reasoning provided")
        .to_string();

    Ok(Evaluation {
        score: score as u8,
        rationale,
    })
}

/// Accept integer scores and whole-number floats (models emit "8.0").
fn integral_score(value: &serde_json::Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    if let Some(f) = value.as_f64() {
        if f.fract() == 0.0 {
            return Some(f as i64);
        }
    }
    None
}
