//! Challenge types for the persuasion game.
//!
//! A Challenge is one posted prompt and its lifecycle: it is created
//! Pending, becomes Open once the prompt is live on the feed, and closes
//! when a reward is in flight or an operator stops it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle phase of a challenge.
///
/// At most one challenge is Open at any time; the state machine enforces
/// this, not storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengePhase {
    /// Created but not yet published to the feed.
    Pending,
    /// Published and accepting/scoring replies.
    Open,
    /// Terminal for this challenge; a new cycle may begin afterwards.
    Closed,
}

impl ChallengePhase {
    /// Returns true if this is a terminal phase.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ChallengePhase::Closed)
    }

    /// Returns true if replies should be fetched and scored.
    pub fn accepts_replies(&self) -> bool {
        matches!(self, ChallengePhase::Open)
    }
}

/// One instance of a posted persuasion prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Challenge {
    /// Unique identifier for this challenge.
    pub id: Uuid,

    /// The topic the agent must be persuaded of.
    pub topic: String,

    /// Platform-native id of the published prompt, once posted.
    pub post_id: Option<String>,

    /// When the prompt was published.
    pub posted_at: Option<DateTime<Utc>>,

    /// Current lifecycle phase.
    pub phase: ChallengePhase,

    /// Minimum score (inclusive, 1-10) a reply must reach to win.
    pub threshold: u8,

    /// Reward paid to the single winner, in native token units.
    pub reward_amount: String,

    /// Pagination cursor for reply fetching, opaque to the orchestrator.
    pub reply_cursor: Option<String>,
}

impl Challenge {
    /// Create a new pending challenge for a topic.
    pub fn new(topic: impl Into<String>, threshold: u8, reward_amount: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            topic: topic.into(),
            post_id: None,
            posted_at: None,
            phase: ChallengePhase::Pending,
            threshold,
            reward_amount: reward_amount.into(),
            reply_cursor: None,
        }
    }

    /// Mark the challenge open after its prompt was published.
    pub fn opened(mut self, post_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        self.post_id = Some(post_id.into());
        self.posted_at = Some(now);
        self.phase = ChallengePhase::Open;
        self
    }

    /// The cast text published to the feed for this challenge.
    pub fn prompt_text(&self) -> String {
        format!(
            "🎯 PERSUADE ME CHALLENGE: Convince me that {}. \
             Reply with your most persuasive argument for a chance to win {} $S! #PersuadeMe",
            self.topic, self.reward_amount
        )
    }
}

/// Deterministic round-robin topic rotation.
///
/// Never repeats the immediately preceding topic, except when the topic set
/// has a single entry, which degrades to always-repeat.
pub fn next_topic<'a>(topics: &'a [String], previous: Option<&str>) -> Option<&'a str> {
    if topics.is_empty() {
        return None;
    }
    let next = match previous.and_then(|p| topics.iter().position(|t| t == p)) {
        Some(idx) => &topics[(idx + 1) % topics.len()],
        None => &topics[0],
    };
    Some(next.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_predicates() {
        assert!(ChallengePhase::Closed.is_terminal());
        assert!(!ChallengePhase::Open.is_terminal());
        assert!(ChallengePhase::Open.accepts_replies());
        assert!(!ChallengePhase::Pending.accepts_replies());
    }

    #[test]
    fn test_opened_transition() {
        let c = Challenge::new("cats are better than dogs", 7, "2");
        assert_eq!(c.phase, ChallengePhase::Pending);

        let now = Utc::now();
        let c = c.opened("0xabc", now);
        assert_eq!(c.phase, ChallengePhase::Open);
        assert_eq!(c.post_id.as_deref(), Some("0xabc"));
        assert_eq!(c.posted_at, Some(now));
    }

    #[test]
    fn test_prompt_text_contains_topic_and_reward() {
        let c = Challenge::new("AI benefits outweigh risks", 7, "1");
        let text = c.prompt_text();
        assert!(text.contains("AI benefits outweigh risks"));
        assert!(text.contains("1 $S"));
    }

    #[test]
    fn test_topic_rotation_avoids_immediate_repeat() {
        let topics = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        assert_eq!(next_topic(&topics, None), Some("a"));
        assert_eq!(next_topic(&topics, Some("a")), Some("b"));
        assert_eq!(next_topic(&topics, Some("c")), Some("a"));
    }

    #[test]
    fn test_single_topic_always_repeats() {
        let topics = vec!["only".to_string()];
        assert_eq!(next_topic(&topics, Some("only")), Some("only"));
    }

    #[test]
    fn test_empty_topic_set() {
        assert_eq!(next_topic(&[], None), None);
    }
}
