//! Reply types.
//!
//! Replies are append-only: once recorded they are never deleted, and they
//! are mutated exactly once, when scored. The store keeps them for the
//! lifetime of the owning challenge as an audit trail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A reply as fetched from the social collaborator, before it is recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundReply {
    /// Platform-native id, unique within a challenge.
    pub id: String,

    /// Platform-native author id (used as the reward address lookup key).
    pub author_id: String,

    /// Display name for feedback messages, when the platform provides one.
    pub author_name: Option<String>,

    /// The argument text.
    pub text: String,

    /// When the platform says the reply was created.
    pub received_at: DateTime<Utc>,
}

/// A recorded reply, with its evaluation once scored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reply {
    /// Platform-native id, unique within a challenge.
    pub id: String,

    /// Author id.
    pub author_id: String,

    /// Display name, when known.
    pub author_name: Option<String>,

    /// The argument text.
    pub text: String,

    /// When the reply was received.
    pub received_at: DateTime<Utc>,

    /// Stable arrival order within the challenge. The earliest-received
    /// tie-break for simultaneous qualifying replies uses this, never the
    /// score.
    pub seq: u64,

    /// Normalized persuasiveness score (1-10), unset until evaluated.
    pub score: Option<u8>,

    /// Model rationale for the score, unset until evaluated.
    pub rationale: Option<String>,
}

impl Reply {
    /// Record an inbound reply at the given arrival position.
    pub fn from_inbound(inbound: InboundReply, seq: u64) -> Self {
        Self {
            id: inbound.id,
            author_id: inbound.author_id,
            author_name: inbound.author_name,
            text: inbound.text,
            received_at: inbound.received_at,
            seq,
            score: None,
            rationale: None,
        }
    }

    /// Returns true once the reply has been evaluated.
    pub fn is_scored(&self) -> bool {
        self.score.is_some()
    }

    /// Returns true if the reply's score meets the threshold (inclusive).
    pub fn qualifies(&self, threshold: u8) -> bool {
        self.score.map_or(false, |s| s >= threshold)
    }

    /// Name to @-mention in feedback, preferring the display name.
    pub fn mention_name(&self) -> &str {
        self.author_name.as_deref().unwrap_or(&self.author_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inbound(id: &str) -> InboundReply {
        InboundReply {
            id: id.to_string(),
            author_id: "fid:42".to_string(),
            author_name: Some("alice".to_string()),
            text: "a compelling argument".to_string(),
            received_at: Utc::now(),
        }
    }

    #[test]
    fn test_from_inbound_starts_unscored() {
        let reply = Reply::from_inbound(inbound("0x1"), 0);
        assert!(!reply.is_scored());
        assert!(reply.rationale.is_none());
        assert_eq!(reply.seq, 0);
    }

    #[test]
    fn test_qualifies_is_inclusive() {
        let mut reply = Reply::from_inbound(inbound("0x1"), 0);
        assert!(!reply.qualifies(7));

        reply.score = Some(7);
        assert!(reply.qualifies(7));

        reply.score = Some(6);
        assert!(!reply.qualifies(7));
    }

    #[test]
    fn test_mention_name_falls_back_to_author_id() {
        let mut reply = Reply::from_inbound(inbound("0x1"), 0);
        assert_eq!(reply.mention_name(), "alice");

        reply.author_name = None;
        assert_eq!(reply.mention_name(), "fid:42");
    }
}
