//! Winner ledger types.
//!
//! The WinnerRecord is the authoritative exactly-once gate for payment.
//! Challenge phase can be rebuilt after a crash; the ledger cannot be
//! replayed away.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of the reward slot for a challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WinnerStatus {
    /// Claimed; transfer submitted, awaiting on-chain confirmation.
    Pending,
    /// Transfer confirmed on-chain.
    Confirmed,
    /// Transfer submission failed. Terminal for this reply: the orchestrator
    /// never promotes a runner-up; recovery is operator intervention.
    Failed,
}

impl WinnerStatus {
    /// Returns true if no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, WinnerStatus::Confirmed | WinnerStatus::Failed)
    }
}

/// Outcome of attempting to claim the single reward slot for a challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// This caller holds the slot; exactly one caller per challenge sees this.
    Claimed,
    /// The slot was already taken, possibly by a different reply.
    AlreadyClaimed,
}

/// Durable record of a challenge's reward slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WinnerRecord {
    /// The challenge this slot belongs to.
    pub challenge_id: Uuid,

    /// The winning reply.
    pub reply_id: String,

    /// The author being rewarded.
    pub author_id: String,

    /// Reward amount, in native token units.
    pub reward_amount: String,

    /// Transaction reference, unset until submission succeeds.
    pub tx_reference: Option<String>,

    /// Current status of the reward.
    pub status: WinnerStatus,

    /// When the slot was claimed.
    pub claimed_at: DateTime<Utc>,
}

impl WinnerRecord {
    /// Create a freshly claimed record.
    pub fn claimed(
        challenge_id: Uuid,
        reply_id: impl Into<String>,
        author_id: impl Into<String>,
        reward_amount: impl Into<String>,
    ) -> Self {
        Self {
            challenge_id,
            reply_id: reply_id.into(),
            author_id: author_id.into(),
            reward_amount: reward_amount.into(),
            tx_reference: None,
            status: WinnerStatus::Pending,
            claimed_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_terminality() {
        assert!(WinnerStatus::Confirmed.is_terminal());
        assert!(WinnerStatus::Failed.is_terminal());
        assert!(!WinnerStatus::Pending.is_terminal());
    }

    #[test]
    fn test_claimed_record_starts_pending() {
        let record = WinnerRecord::claimed(Uuid::new_v4(), "0xreply", "fid:7", "2");
        assert_eq!(record.status, WinnerStatus::Pending);
        assert!(record.tx_reference.is_none());
    }
}
