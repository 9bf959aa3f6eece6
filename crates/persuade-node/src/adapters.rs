//! Collaborator wiring.
//!
//! The orchestrator core treats the social feed, the scoring model and the
//! chain as thin external collaborators behind the traits in
//! `persuade_engine::collaborators`. Deployments replace these
//! placeholders with real Farcaster/Neynar, LLM-provider and chain RPC
//! adapters; until wired, every call reports the collaborator as
//! unavailable and the loop simply defers its work.

use async_trait::async_trait;
use persuade_core::{GameError, InboundReply, Result};
use persuade_engine::{ChainClient, ScoringClient, SocialClient, TxStatus};

/// Social collaborator placeholder.
pub struct UnconfiguredSocial;

#[async_trait]
impl SocialClient for UnconfiguredSocial {
    async fn publish(&self, _text: &str) -> Result<String> {
        Err(GameError::SocialUnavailable {
            message: "no social adapter configured".to_string(),
        })
    }

    async fn fetch_replies(
        &self,
        _post_id: &str,
        _cursor: Option<&str>,
        _limit: usize,
    ) -> Result<(Vec<InboundReply>, Option<String>)> {
        Err(GameError::SocialUnavailable {
            message: "no social adapter configured".to_string(),
        })
    }

    async fn reply(&self, _parent_id: &str, _text: &str) -> Result<String> {
        Err(GameError::SocialUnavailable {
            message: "no social adapter configured".to_string(),
        })
    }
}

/// Scoring collaborator placeholder.
pub struct UnconfiguredScoring;

#[async_trait]
impl ScoringClient for UnconfiguredScoring {
    async fn evaluate(&self, _topic: &str, _text: &str) -> Result<String> {
        Err(GameError::ScoringUnavailable {
            message: "no scoring adapter configured".to_string(),
        })
    }
}

/// Chain collaborator placeholder.
pub struct UnconfiguredChain;

#[async_trait]
impl ChainClient for UnconfiguredChain {
    async fn transfer(&self, _to_address: &str, _amount: &str) -> Result<String> {
        Err(GameError::ChainUnavailable {
            message: "no chain adapter configured".to_string(),
        })
    }

    async fn tx_status(&self, _tx_reference: &str) -> Result<TxStatus> {
        Err(GameError::ChainUnavailable {
            message: "no chain adapter configured".to_string(),
        })
    }
}
