//! JSON-file-backed game store.
//!
//! The whole game document (current challenge, replies, winner records) is
//! serialized after every mutation, written to a temp file, then renamed
//! over the live file. Mutations hold the write lock across the durable
//! write, so `try_claim` is an atomic check-and-insert: the exactly-once
//! guarantee required of the winner ledger.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use persuade_core::{
    Challenge, ClaimOutcome, GameError, InboundReply, Reply, Result, WinnerRecord, WinnerStatus,
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::store::{ChallengeStore, ReplyStore, WinnerLedger};

/// The persisted game state document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct GameDocument {
    /// The current (or most recent) challenge.
    challenge: Option<Challenge>,

    /// When the last challenge prompt was published.
    last_posted_at: Option<DateTime<Utc>>,

    /// Topic of the last posted challenge, for rotation.
    last_topic: Option<String>,

    /// Recorded replies per challenge, in arrival order.
    #[serde(default)]
    replies: HashMap<Uuid, Vec<Reply>>,

    /// Winner records per challenge.
    #[serde(default)]
    winners: HashMap<Uuid, WinnerRecord>,
}

/// File-backed store implementing [`ChallengeStore`], [`ReplyStore`] and
/// [`WinnerLedger`]. With no path it degrades to a purely in-memory store
/// for tests.
pub struct JsonGameStore {
    inner: RwLock<GameDocument>,
    path: Option<PathBuf>,
}

impl JsonGameStore {
    /// Create a store with no backing file.
    pub fn in_memory() -> Self {
        Self {
            inner: RwLock::new(GameDocument::default()),
            path: None,
        }
    }

    /// Open (or create) the game document at `dir/game.json`.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| GameError::State {
                message: format!("failed to create data dir {}: {}", dir.display(), e),
            })?;

        let path = dir.join("game.json");
        let document = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| GameError::Serialization(format!("{}: {}", path.display(), e)))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => GameDocument::default(),
            Err(e) => {
                return Err(GameError::State {
                    message: format!("failed to read {}: {}", path.display(), e),
                })
            }
        };

        debug!(path = %path.display(), "opened game document");
        Ok(Self {
            inner: RwLock::new(document),
            path: Some(path),
        })
    }

    /// Write the document durably. Called while holding the write lock, so
    /// the persisted fact and the in-memory fact cannot diverge.
    async fn persist(&self, document: &GameDocument) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let bytes = serde_json::to_vec_pretty(document)?;
        let tmp = path.with_extension("json.tmp");

        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| GameError::State {
                message: format!("failed to write {}: {}", tmp.display(), e),
            })?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| GameError::State {
                message: format!("failed to rename {} over {}: {}", tmp.display(), path.display(), e),
            })?;
        Ok(())
    }
}

#[async_trait]
impl ChallengeStore for JsonGameStore {
    async fn challenge(&self) -> Option<Challenge> {
        self.inner.read().await.challenge.clone()
    }

    async fn put_challenge(&self, challenge: Challenge) -> Result<()> {
        let mut doc = self.inner.write().await;
        if let Some(posted_at) = challenge.posted_at {
            doc.last_posted_at = Some(posted_at);
            doc.last_topic = Some(challenge.topic.clone());
        }
        doc.challenge = Some(challenge);
        self.persist(&doc).await
    }

    async fn last_posted_at(&self) -> Option<DateTime<Utc>> {
        self.inner.read().await.last_posted_at
    }

    async fn last_topic(&self) -> Option<String> {
        self.inner.read().await.last_topic.clone()
    }
}

#[async_trait]
impl ReplyStore for JsonGameStore {
    async fn has_seen(&self, challenge_id: Uuid, reply_id: &str) -> bool {
        let doc = self.inner.read().await;
        doc.replies
            .get(&challenge_id)
            .map_or(false, |replies| replies.iter().any(|r| r.id == reply_id))
    }

    async fn record(&self, challenge_id: Uuid, reply: InboundReply) -> Result<()> {
        let mut doc = self.inner.write().await;
        let replies = doc.replies.entry(challenge_id).or_default();

        // Idempotent: a re-fetched reply is a no-op, not an error.
        if replies.iter().any(|r| r.id == reply.id) {
            return Ok(());
        }

        let seq = replies.len() as u64;
        replies.push(Reply::from_inbound(reply, seq));
        self.persist(&doc).await
    }

    async fn unscored(&self, challenge_id: Uuid) -> Vec<Reply> {
        let doc = self.inner.read().await;
        doc.replies
            .get(&challenge_id)
            .map(|replies| {
                replies
                    .iter()
                    .filter(|r| !r.is_scored())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    async fn mark_scored(
        &self,
        challenge_id: Uuid,
        reply_id: &str,
        score: u8,
        rationale: String,
    ) -> Result<()> {
        let mut doc = self.inner.write().await;
        let reply = doc
            .replies
            .get_mut(&challenge_id)
            .and_then(|replies| replies.iter_mut().find(|r| r.id == reply_id))
            .ok_or_else(|| GameError::State {
                message: format!("reply {} not recorded for challenge {}", reply_id, challenge_id),
            })?;

        if reply.is_scored() {
            warn!(reply_id, "reply already scored, keeping first evaluation");
            return Ok(());
        }

        reply.score = Some(score);
        reply.rationale = Some(rationale);
        self.persist(&doc).await
    }

    async fn replies(&self, challenge_id: Uuid) -> Vec<Reply> {
        let doc = self.inner.read().await;
        doc.replies.get(&challenge_id).cloned().unwrap_or_default()
    }

    async fn reply(&self, challenge_id: Uuid, reply_id: &str) -> Option<Reply> {
        let doc = self.inner.read().await;
        doc.replies
            .get(&challenge_id)
            .and_then(|replies| replies.iter().find(|r| r.id == reply_id).cloned())
    }
}

#[async_trait]
impl WinnerLedger for JsonGameStore {
    async fn try_claim(
        &self,
        challenge_id: Uuid,
        reply_id: &str,
        author_id: &str,
        reward_amount: &str,
    ) -> Result<ClaimOutcome> {
        let mut doc = self.inner.write().await;

        // Any existing record blocks a new claim, Failed included: a failed
        // reward never re-targets another reply.
        if doc.winners.contains_key(&challenge_id) {
            return Ok(ClaimOutcome::AlreadyClaimed);
        }

        let record = WinnerRecord::claimed(challenge_id, reply_id, author_id, reward_amount);
        doc.winners.insert(challenge_id, record);
        self.persist(&doc).await?;
        Ok(ClaimOutcome::Claimed)
    }

    async fn update_status(
        &self,
        challenge_id: Uuid,
        status: WinnerStatus,
        tx_reference: Option<String>,
    ) -> Result<()> {
        let mut doc = self.inner.write().await;
        let record = doc
            .winners
            .get_mut(&challenge_id)
            .ok_or_else(|| GameError::State {
                message: format!("no winner record for challenge {}", challenge_id),
            })?;

        if record.status.is_terminal() {
            return Err(GameError::State {
                message: format!(
                    "winner record for challenge {} is already {:?}",
                    challenge_id, record.status
                ),
            });
        }

        record.status = status;
        if tx_reference.is_some() {
            record.tx_reference = tx_reference;
        }
        self.persist(&doc).await
    }

    async fn winner(&self, challenge_id: Uuid) -> Option<WinnerRecord> {
        self.inner.read().await.winners.get(&challenge_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn inbound(id: &str, author: &str) -> InboundReply {
        InboundReply {
            id: id.to_string(),
            author_id: author.to_string(),
            author_name: None,
            text: "an argument".to_string(),
            received_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_record_is_idempotent() {
        let store = JsonGameStore::in_memory();
        let challenge_id = Uuid::new_v4();

        store.record(challenge_id, inbound("0x1", "a")).await.unwrap();
        store.record(challenge_id, inbound("0x1", "a")).await.unwrap();

        let replies = store.replies(challenge_id).await;
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].seq, 0);
        assert!(store.has_seen(challenge_id, "0x1").await);
        assert!(!store.has_seen(challenge_id, "0x2").await);
    }

    #[tokio::test]
    async fn test_unscored_is_oldest_first_and_excludes_scored() {
        let store = JsonGameStore::in_memory();
        let challenge_id = Uuid::new_v4();

        store.record(challenge_id, inbound("0x1", "a")).await.unwrap();
        store.record(challenge_id, inbound("0x2", "b")).await.unwrap();
        store.record(challenge_id, inbound("0x3", "c")).await.unwrap();
        store
            .mark_scored(challenge_id, "0x1", 5, "weak".to_string())
            .await
            .unwrap();

        let unscored = store.unscored(challenge_id).await;
        let ids: Vec<&str> = unscored.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["0x2", "0x3"]);
    }

    #[tokio::test]
    async fn test_mark_scored_keeps_first_evaluation() {
        let store = JsonGameStore::in_memory();
        let challenge_id = Uuid::new_v4();

        store.record(challenge_id, inbound("0x1", "a")).await.unwrap();
        store
            .mark_scored(challenge_id, "0x1", 8, "strong".to_string())
            .await
            .unwrap();
        store
            .mark_scored(challenge_id, "0x1", 3, "weak".to_string())
            .await
            .unwrap();

        let reply = store.reply(challenge_id, "0x1").await.unwrap();
        assert_eq!(reply.score, Some(8));
        assert_eq!(reply.rationale.as_deref(), Some("strong"));
    }

    #[tokio::test]
    async fn test_try_claim_is_exclusive() {
        let store = JsonGameStore::in_memory();
        let challenge_id = Uuid::new_v4();

        let first = store.try_claim(challenge_id, "0x1", "a", "2").await.unwrap();
        assert_eq!(first, ClaimOutcome::Claimed);

        // A different reply id still loses: one slot per challenge.
        let second = store.try_claim(challenge_id, "0x2", "b", "2").await.unwrap();
        assert_eq!(second, ClaimOutcome::AlreadyClaimed);

        let winner = store.winner(challenge_id).await.unwrap();
        assert_eq!(winner.reply_id, "0x1");
        assert_eq!(winner.status, WinnerStatus::Pending);
    }

    #[tokio::test]
    async fn test_try_claim_exclusive_under_concurrency() {
        let store = Arc::new(JsonGameStore::in_memory());
        let challenge_id = Uuid::new_v4();

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .try_claim(challenge_id, &format!("0x{}", i), "a", "2")
                    .await
                    .unwrap()
            }));
        }

        let mut claimed = 0;
        for handle in handles {
            if handle.await.unwrap() == ClaimOutcome::Claimed {
                claimed += 1;
            }
        }
        assert_eq!(claimed, 1);
    }

    #[tokio::test]
    async fn test_failed_claim_never_retargets() {
        let store = JsonGameStore::in_memory();
        let challenge_id = Uuid::new_v4();

        store.try_claim(challenge_id, "0x1", "a", "2").await.unwrap();
        store
            .update_status(challenge_id, WinnerStatus::Failed, None)
            .await
            .unwrap();

        // Even after failure the slot stays taken.
        let outcome = store.try_claim(challenge_id, "0x2", "b", "2").await.unwrap();
        assert_eq!(outcome, ClaimOutcome::AlreadyClaimed);
    }

    #[tokio::test]
    async fn test_update_status_rejects_terminal_transitions() {
        let store = JsonGameStore::in_memory();
        let challenge_id = Uuid::new_v4();

        store.try_claim(challenge_id, "0x1", "a", "2").await.unwrap();
        store
            .update_status(challenge_id, WinnerStatus::Pending, Some("0xtx".to_string()))
            .await
            .unwrap();
        store
            .update_status(challenge_id, WinnerStatus::Confirmed, None)
            .await
            .unwrap();

        let result = store
            .update_status(challenge_id, WinnerStatus::Failed, None)
            .await;
        assert!(result.is_err());

        let winner = store.winner(challenge_id).await.unwrap();
        assert_eq!(winner.status, WinnerStatus::Confirmed);
        assert_eq!(winner.tx_reference.as_deref(), Some("0xtx"));
    }

    #[tokio::test]
    async fn test_document_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let challenge_id = Uuid::new_v4();

        {
            let store = JsonGameStore::open(dir.path()).await.unwrap();
            let challenge = Challenge::new("topic", 7, "2").opened("0xcast", Utc::now());
            store.put_challenge(challenge).await.unwrap();
            store.record(challenge_id, inbound("0x1", "a")).await.unwrap();
            store.record(challenge_id, inbound("0x2", "b")).await.unwrap();
            store
                .mark_scored(challenge_id, "0x1", 5, "weak".to_string())
                .await
                .unwrap();
            store.try_claim(challenge_id, "0x1", "a", "2").await.unwrap();
        }

        let store = JsonGameStore::open(dir.path()).await.unwrap();
        assert!(store.challenge().await.is_some());
        assert!(store.last_posted_at().await.is_some());
        assert_eq!(store.last_topic().await.as_deref(), Some("topic"));

        // The unscored set is exactly what it was before the restart.
        let unscored = store.unscored(challenge_id).await;
        assert_eq!(unscored.len(), 1);
        assert_eq!(unscored[0].id, "0x2");

        // The claim cannot be replayed away.
        let outcome = store.try_claim(challenge_id, "0x2", "b", "2").await.unwrap();
        assert_eq!(outcome, ClaimOutcome::AlreadyClaimed);
    }
}
