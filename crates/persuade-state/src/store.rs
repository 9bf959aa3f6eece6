//! Store traits.
//!
//! Every method that mutates state is durable before it returns: a crash
//! after a successful call never loses the recorded fact. No cross-call
//! transaction is assumed, so callers order their writes "record before
//! act".

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use persuade_core::{Challenge, ClaimOutcome, InboundReply, Reply, Result, WinnerRecord, WinnerStatus};
use uuid::Uuid;

/// Tracks the active challenge and posting history.
#[async_trait]
pub trait ChallengeStore: Send + Sync {
    /// The current challenge, if any.
    async fn challenge(&self) -> Option<Challenge>;

    /// Replace the current challenge record.
    async fn put_challenge(&self, challenge: Challenge) -> Result<()>;

    /// When the last challenge prompt was published.
    async fn last_posted_at(&self) -> Option<DateTime<Utc>>;

    /// Topic of the most recently posted challenge, for rotation.
    async fn last_topic(&self) -> Option<String>;
}

/// Tracks which replies have been evaluated for a challenge.
///
/// Append-only: replies are never deleted, and re-recording a seen reply id
/// is a no-op, not an error.
#[async_trait]
pub trait ReplyStore: Send + Sync {
    /// Whether a reply id has already been recorded for a challenge.
    async fn has_seen(&self, challenge_id: Uuid, reply_id: &str) -> bool;

    /// Record a fetched reply. Idempotent on reply id.
    async fn record(&self, challenge_id: Uuid, reply: InboundReply) -> Result<()>;

    /// Replies not yet evaluated, oldest arrival first. Restartable: after
    /// a crash this returns the same unscored set.
    async fn unscored(&self, challenge_id: Uuid) -> Vec<Reply>;

    /// Attach an evaluation to a recorded reply.
    async fn mark_scored(
        &self,
        challenge_id: Uuid,
        reply_id: &str,
        score: u8,
        rationale: String,
    ) -> Result<()>;

    /// All recorded replies for a challenge, oldest first (audit trail).
    async fn replies(&self, challenge_id: Uuid) -> Vec<Reply>;

    /// Look up a single recorded reply.
    async fn reply(&self, challenge_id: Uuid, reply_id: &str) -> Option<Reply>;
}

/// The exactly-once gate for reward payment.
#[async_trait]
pub trait WinnerLedger: Send + Sync {
    /// Atomically claim the single reward slot for a challenge.
    ///
    /// Behaves as a compare-and-set: exactly one caller across all
    /// concurrent or retried invocations receives [`ClaimOutcome::Claimed`]
    /// for a given challenge id; every other caller receives
    /// [`ClaimOutcome::AlreadyClaimed`], even with a different reply id.
    async fn try_claim(
        &self,
        challenge_id: Uuid,
        reply_id: &str,
        author_id: &str,
        reward_amount: &str,
    ) -> Result<ClaimOutcome>;

    /// Transition the claimed record's status.
    ///
    /// Allowed: Pending -> Pending (attaching a tx reference),
    /// Pending -> Confirmed, Pending -> Failed. Transitions out of a
    /// terminal status are rejected.
    async fn update_status(
        &self,
        challenge_id: Uuid,
        status: WinnerStatus,
        tx_reference: Option<String>,
    ) -> Result<()>;

    /// The winner record for a challenge, if one was ever claimed.
    async fn winner(&self, challenge_id: Uuid) -> Option<WinnerRecord>;
}

/// The full persisted state boundary the game loop runs against.
pub trait GameStore: ChallengeStore + ReplyStore + WinnerLedger {}

impl<T: ChallengeStore + ReplyStore + WinnerLedger> GameStore for T {}
