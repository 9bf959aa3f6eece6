//! Collaborator interfaces.
//!
//! The orchestrator consumes three unreliable external systems through
//! these traits. Actual wire protocols (Farcaster/Neynar, LLM providers,
//! chain RPC) live in adapter crates outside the core; tests use mocks.

use std::future::Future;

use async_trait::async_trait;
use persuade_core::{InboundReply, Result, RetryPolicy};
use tracing::warn;

/// On-chain status of a submitted transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    /// Broadcast but not yet confirmed.
    Pending,
    /// Confirmed on-chain.
    Confirmed,
    /// Dropped or reverted.
    Failed,
}

/// The social feed: publishing prompts and reading reply threads.
#[async_trait]
pub trait SocialClient: Send + Sync {
    /// Publish a post, returning its platform-native id.
    async fn publish(&self, text: &str) -> Result<String>;

    /// Fetch replies to a post, oldest first, from an opaque cursor.
    async fn fetch_replies(
        &self,
        post_id: &str,
        cursor: Option<&str>,
        limit: usize,
    ) -> Result<(Vec<InboundReply>, Option<String>)>;

    /// Reply to an existing post (score feedback, payout announcements).
    async fn reply(&self, parent_id: &str, text: &str) -> Result<String>;
}

/// The language model: one raw persuasiveness evaluation call.
/// Prompt construction and parsing of the output belong elsewhere.
#[async_trait]
pub trait ScoringClient: Send + Sync {
    /// Evaluate a reply against a topic, returning the raw model output.
    async fn evaluate(&self, topic: &str, text: &str) -> Result<String>;
}

/// The blockchain: reward transfer and confirmation lookup.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Submit a transfer, returning a transaction reference.
    async fn transfer(&self, to_address: &str, amount: &str) -> Result<String>;

    /// Status of a previously submitted transfer.
    async fn tx_status(&self, tx_reference: &str) -> Result<TxStatus>;
}

/// Run a collaborator call under a bounded backoff policy.
///
/// Only retriable (transient) errors are retried; everything else
/// propagates immediately.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, operation: &str, mut call: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retriable() => match policy.delay_after(attempt) {
                Some(delay) => {
                    warn!(operation, attempt, error = %e, "transient failure, backing off");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                None => return Err(e),
            },
            Err(e) => return Err(e),
        }
    }
}
