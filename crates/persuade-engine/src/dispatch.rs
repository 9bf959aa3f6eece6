//! Reward dispatcher.
//!
//! Issues the reward transaction exactly once per challenge. The ledger
//! claim is the exclusivity gate: claim before transferring, never after.
//! The transfer itself is never retried here; a retry policy for on-chain
//! submission belongs to the chain collaborator's own idempotency
//! machinery, not this component.

use std::sync::Arc;

use persuade_core::{ClaimOutcome, Result, WinnerStatus};
use persuade_state::WinnerLedger;
use tracing::{error, info};
use uuid::Uuid;

use crate::collaborators::ChainClient;

/// Outcome of one dispatch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// This call won the claim and the transfer was submitted.
    TxSubmitted { tx_reference: String },

    /// The reward slot was already taken; no transfer was attempted.
    AlreadyClaimed,

    /// This call won the claim but submission failed. The ledger is marked
    /// Failed, terminally: recovery is operator intervention, never an
    /// automatic re-target to another reply.
    DispatchFailed { message: String },
}

/// Pays the single reward per challenge.
pub struct RewardDispatcher {
    ledger: Arc<dyn WinnerLedger>,
    chain: Arc<dyn ChainClient>,
}

impl RewardDispatcher {
    /// Create a dispatcher over the ledger and chain collaborator.
    pub fn new(ledger: Arc<dyn WinnerLedger>, chain: Arc<dyn ChainClient>) -> Self {
        Self { ledger, chain }
    }

    /// Claim the reward slot and, if won, submit the transfer.
    pub async fn dispatch(
        &self,
        challenge_id: Uuid,
        reply_id: &str,
        author_id: &str,
        amount: &str,
    ) -> Result<DispatchOutcome> {
        match self
            .ledger
            .try_claim(challenge_id, reply_id, author_id, amount)
            .await?
        {
            ClaimOutcome::AlreadyClaimed => {
                info!(%challenge_id, reply_id, "reward slot already claimed, skipping transfer");
                return Ok(DispatchOutcome::AlreadyClaimed);
            }
            ClaimOutcome::Claimed => {}
        }

        info!(%challenge_id, reply_id, author_id, amount, "reward claimed, submitting transfer");

        match self.chain.transfer(author_id, amount).await {
            Ok(tx_reference) => {
                self.ledger
                    .update_status(
                        challenge_id,
                        WinnerStatus::Pending,
                        Some(tx_reference.clone()),
                    )
                    .await?;
                info!(%challenge_id, tx_reference, "reward transfer submitted");
                Ok(DispatchOutcome::TxSubmitted { tx_reference })
            }
            Err(e) => {
                self.ledger
                    .update_status(challenge_id, WinnerStatus::Failed, None)
                    .await?;
                error!(
                    %challenge_id, reply_id, author_id, error = %e,
                    "REWARD SUBMISSION FAILED - operator intervention required"
                );
                Ok(DispatchOutcome::DispatchFailed {
                    message: e.to_string(),
                })
            }
        }
    }
}
