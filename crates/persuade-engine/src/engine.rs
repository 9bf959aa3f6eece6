//! Tick executor.
//!
//! Runs the intents produced by [`plan_tick`] against the collaborators
//! and the durable store. Ticks are sequential: no two ticks for the same
//! challenge run concurrently, so the planner's determinism plus the
//! ledger's atomic claim give exactly-once payment without distributed
//! locks.
//!
//! Write ordering is "record before act": a reply is recorded (seen)
//! before it is scored, the claim is written before the transfer is
//! submitted, and the status update lands before any announcement goes
//! out. A tick interrupted mid-way resumes safely because nothing is
//! assumed to have happened unless it was durably recorded.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use persuade_core::{
    Challenge, ChallengePhase, GameError, GameSettings, Reply, Result, RetryPolicy, WinnerStatus,
};
use persuade_state::GameStore;
use tracing::{debug, error, info, warn};

use crate::collaborators::{with_retry, ChainClient, ScoringClient, SocialClient, TxStatus};
use crate::dispatch::{DispatchOutcome, RewardDispatcher};
use crate::machine::{plan_tick, GameView, TickIntent};
use crate::scoring::{Evaluation, ScoringAdapter};

/// The game loop executor.
pub struct Engine<S: GameStore> {
    store: Arc<S>,
    social: Arc<dyn SocialClient>,
    chain: Arc<dyn ChainClient>,
    scoring: ScoringAdapter,
    dispatcher: RewardDispatcher,
    settings: GameSettings,
    retry: RetryPolicy,
}

impl<S: GameStore + 'static> Engine<S> {
    /// Create an engine over the durable store and collaborators.
    pub fn new(
        store: Arc<S>,
        social: Arc<dyn SocialClient>,
        scoring_client: Arc<dyn ScoringClient>,
        chain: Arc<dyn ChainClient>,
        settings: GameSettings,
        retry: RetryPolicy,
    ) -> Self {
        let dispatcher = RewardDispatcher::new(store.clone(), chain.clone());
        let scoring = ScoringAdapter::new(scoring_client, retry);
        Self {
            store,
            social,
            chain,
            scoring,
            dispatcher,
            settings,
            retry,
        }
    }

    /// Snapshot the persisted state for planning.
    pub async fn view(&self) -> GameView {
        let challenge = self.store.challenge().await;
        let (replies, winner) = match &challenge {
            Some(c) => (
                self.store.replies(c.id).await,
                self.store.winner(c.id).await,
            ),
            None => (Vec::new(), None),
        };
        GameView {
            challenge,
            last_posted_at: self.store.last_posted_at().await,
            last_topic: self.store.last_topic().await,
            replies,
            winner,
        }
    }

    /// Run one tick: reconcile crash leftovers, plan, execute.
    ///
    /// Transient failures defer their work to the next tick; a fatal
    /// error (broken exactly-once invariant) propagates so the loop can
    /// halt.
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<Vec<TickIntent>> {
        self.reconcile().await?;

        let view = self.view().await;
        let intents = plan_tick(&view, &self.settings, now);
        debug!(count = intents.len(), "planned tick intents");

        for intent in &intents {
            if let Err(e) = self.execute(intent.clone()).await {
                if e.is_fatal() {
                    return Err(e);
                }
                warn!(error = %e, ?intent, "intent deferred to next tick");
            }
        }
        Ok(intents)
    }

    /// Execute a single intent. Also the operator-facing entry point for
    /// manual post / check / reward triggers.
    pub async fn execute(&self, intent: TickIntent) -> Result<()> {
        match intent {
            TickIntent::PostChallenge { topic } => self.post_challenge(topic).await,
            TickIntent::FetchReplies { post_id, cursor } => {
                self.fetch_and_process(&post_id, cursor).await
            }
            TickIntent::ScoreReply { reply_id } => self.score_one(&reply_id).await,
            TickIntent::IssueReward {
                reply_id,
                author_id,
            } => self.issue_reward(&reply_id, &author_id).await,
            TickIntent::ConfirmReward { tx_reference } => self.confirm_reward(&tx_reference).await,
        }
    }

    /// Repair state a crash may have left behind. The ledger is the
    /// authority; challenge phase is rebuilt around it.
    async fn reconcile(&self) -> Result<()> {
        let Some(challenge) = self.store.challenge().await else {
            return Ok(());
        };
        let Some(winner) = self.store.winner(challenge.id).await else {
            return Ok(());
        };

        // A claim with no transaction reference means the process died
        // between claiming and learning the submission outcome. The
        // transfer may or may not have gone out, so re-submitting risks a
        // double payment: mark the attempt failed and leave recovery to an
        // operator.
        if winner.status == WinnerStatus::Pending && winner.tx_reference.is_none() {
            error!(
                challenge_id = %challenge.id, reply_id = %winner.reply_id,
                "ORPHANED REWARD CLAIM (no tx reference) - marking failed, operator intervention required"
            );
            self.store
                .update_status(challenge.id, WinnerStatus::Failed, None)
                .await?;
        }

        // A winner record always closes the challenge.
        if challenge.phase == ChallengePhase::Open {
            self.close_challenge(challenge).await?;
        }
        Ok(())
    }

    async fn post_challenge(&self, topic: String) -> Result<()> {
        // Reuse the pending record when re-publishing after a crash.
        let challenge = match self.store.challenge().await {
            Some(c) if c.phase == ChallengePhase::Pending && c.topic == topic => c,
            Some(c) if c.phase == ChallengePhase::Open => {
                warn!(challenge_id = %c.id, "challenge already open, skipping post");
                return Ok(());
            }
            _ => {
                let c = Challenge::new(
                    topic,
                    self.settings.persuasion_threshold,
                    self.settings.reward_amount.clone(),
                );
                // Durable create before the post.
                self.store.put_challenge(c.clone()).await?;
                c
            }
        };

        let text = challenge.prompt_text();
        let post_id = with_retry(&self.retry, "social.publish", || self.social.publish(&text))
            .await
            .map_err(|e| {
                warn!(error = %e, "challenge post deferred");
                e
            })?;

        let challenge = challenge.opened(&post_id, Utc::now());
        info!(challenge_id = %challenge.id, post_id, topic = %challenge.topic, "challenge posted");
        self.store.put_challenge(challenge).await
    }

    async fn fetch_and_process(&self, post_id: &str, cursor: Option<String>) -> Result<()> {
        let Some(mut challenge) = self.store.challenge().await else {
            return Ok(());
        };
        if !challenge.phase.accepts_replies() || self.store.winner(challenge.id).await.is_some() {
            return Ok(());
        }

        let limit = self.settings.page_size;
        let (batch, next_cursor) =
            with_retry(&self.retry, "social.fetch_replies", || {
                self.social.fetch_replies(post_id, cursor.as_deref(), limit)
            })
            .await?;

        let mut new_replies = 0usize;
        for inbound in batch {
            if self.store.has_seen(challenge.id, &inbound.id).await {
                continue;
            }
            self.store.record(challenge.id, inbound).await?;
            new_replies += 1;
        }
        if new_replies > 0 {
            info!(challenge_id = %challenge.id, new_replies, "recorded new replies");
        }

        if next_cursor.is_some() && next_cursor != challenge.reply_cursor {
            challenge.reply_cursor = next_cursor;
            self.store.put_challenge(challenge.clone()).await?;
        }

        self.score_pending(&challenge).await
    }

    /// Score unscored replies oldest-first, dispatching the reward for the
    /// first that qualifies and stopping immediately after.
    async fn score_pending(&self, challenge: &Challenge) -> Result<()> {
        for reply in self.store.unscored(challenge.id).await {
            // Auto-stop: a claimed slot ends scoring for this challenge.
            if self.store.winner(challenge.id).await.is_some() {
                break;
            }

            match self.scoring.score(&challenge.topic, &reply.text).await {
                Ok(evaluation) => {
                    let qualified = evaluation.score >= challenge.threshold;
                    self.store
                        .mark_scored(
                            challenge.id,
                            &reply.id,
                            evaluation.score,
                            evaluation.rationale.clone(),
                        )
                        .await?;
                    info!(
                        challenge_id = %challenge.id, reply_id = %reply.id,
                        score = evaluation.score, qualified, "reply scored"
                    );

                    self.send_feedback(challenge, &reply, &evaluation, qualified)
                        .await;

                    if qualified {
                        self.issue_reward(&reply.id, &reply.author_id).await?;
                        break;
                    }
                }
                Err(GameError::ScoringMalformed { message }) => {
                    // Surfaced, never defaulted: the reply stays unscored
                    // and is retried on a later tick.
                    warn!(reply_id = %reply.id, message, "malformed scoring output, reply left unscored");
                }
                Err(e) if e.is_retriable() => {
                    warn!(error = %e, "scoring unavailable, deferring remaining replies");
                    break;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    async fn score_one(&self, reply_id: &str) -> Result<()> {
        let Some(challenge) = self.store.challenge().await else {
            return Ok(());
        };
        if self.store.winner(challenge.id).await.is_some() {
            return Ok(());
        }
        let Some(reply) = self.store.reply(challenge.id, reply_id).await else {
            warn!(reply_id, "score requested for unknown reply");
            return Ok(());
        };
        if reply.is_scored() {
            return Ok(());
        }

        match self.scoring.score(&challenge.topic, &reply.text).await {
            Ok(evaluation) => {
                let qualified = evaluation.score >= challenge.threshold;
                self.store
                    .mark_scored(
                        challenge.id,
                        &reply.id,
                        evaluation.score,
                        evaluation.rationale.clone(),
                    )
                    .await?;
                info!(reply_id, score = evaluation.score, qualified, "reply scored");
                self.send_feedback(&challenge, &reply, &evaluation, qualified)
                    .await;
                if qualified {
                    self.issue_reward(&reply.id, &reply.author_id).await?;
                }
                Ok(())
            }
            Err(GameError::ScoringMalformed { message }) => {
                warn!(reply_id, message, "malformed scoring output, reply left unscored");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn issue_reward(&self, reply_id: &str, author_id: &str) -> Result<()> {
        let Some(challenge) = self.store.challenge().await else {
            return Ok(());
        };

        let outcome = self
            .dispatcher
            .dispatch(challenge.id, reply_id, author_id, &challenge.reward_amount)
            .await?;

        match outcome {
            DispatchOutcome::TxSubmitted { tx_reference } => {
                self.announce_winner(&challenge, reply_id, &tx_reference)
                    .await;
            }
            DispatchOutcome::DispatchFailed { message } => {
                warn!(challenge_id = %challenge.id, message, "reward dispatch failed, challenge closing unpaid");
            }
            DispatchOutcome::AlreadyClaimed => {}
        }

        // Whatever the dispatch outcome, a winner record now exists and
        // the challenge is over.
        if challenge.phase == ChallengePhase::Open {
            self.close_challenge(challenge).await?;
        }
        Ok(())
    }

    async fn confirm_reward(&self, tx_reference: &str) -> Result<()> {
        let Some(challenge) = self.store.challenge().await else {
            return Ok(());
        };

        let status = with_retry(&self.retry, "chain.tx_status", || {
            self.chain.tx_status(tx_reference)
        })
        .await?;

        match status {
            TxStatus::Confirmed => {
                self.store
                    .update_status(challenge.id, WinnerStatus::Confirmed, None)
                    .await?;
                info!(challenge_id = %challenge.id, tx_reference, "reward confirmed on-chain");
            }
            TxStatus::Failed => {
                self.store
                    .update_status(challenge.id, WinnerStatus::Failed, None)
                    .await?;
                error!(
                    challenge_id = %challenge.id, tx_reference,
                    "REWARD TRANSACTION FAILED ON-CHAIN - operator intervention required"
                );
            }
            TxStatus::Pending => {
                debug!(tx_reference, "reward still awaiting confirmation");
            }
        }
        Ok(())
    }

    async fn close_challenge(&self, mut challenge: Challenge) -> Result<()> {
        challenge.phase = ChallengePhase::Closed;
        info!(challenge_id = %challenge.id, "challenge closed");
        self.store.put_challenge(challenge).await
    }

    /// Score feedback to the participant. Best-effort: a failed feedback
    /// post never fails or blocks the tick.
    async fn send_feedback(
        &self,
        challenge: &Challenge,
        reply: &Reply,
        evaluation: &Evaluation,
        qualified: bool,
    ) {
        let mention = reply.mention_name();
        let text = if qualified {
            format!(
                "🎉 Congratulations @{}! Your argument was very persuasive, score: {}/10.\n\n\
                 Evaluation: {}\n\nYou have successfully persuaded me and won the challenge! 🏆",
                mention, evaluation.score, evaluation.rationale
            )
        } else {
            format!(
                "Thank you @{} for participating in the challenge! Your argument scored: {}/10.\n\n\
                 Evaluation: {}\n\nKeep up the good work, looking forward to more of your brilliant perspectives! 💪",
                mention, evaluation.score, evaluation.rationale
            )
        };

        if let Err(e) = self.social.reply(&reply.id, &text).await {
            warn!(reply_id = %reply.id, error = %e, "feedback reply failed, falling back to challenge post");
            if let Some(post_id) = &challenge.post_id {
                let fallback = format!("@{} {}", mention, text);
                if let Err(e) = self.social.reply(post_id, &fallback).await {
                    warn!(error = %e, "feedback fallback failed");
                }
            }
        }
    }

    /// Payout announcement on the winning cast. Best-effort.
    async fn announce_winner(&self, challenge: &Challenge, reply_id: &str, tx_reference: &str) {
        let mention = self
            .store
            .reply(challenge.id, reply_id)
            .await
            .map(|r| r.mention_name().to_string())
            .unwrap_or_else(|| reply_id.to_string());

        let text = format!(
            "🎉 Congratulations @{}!\n\nYou have successfully persuaded me and won {} $S reward!\n\n\
             ⛓️ Transfer transaction sent: {}",
            mention, challenge.reward_amount, tx_reference
        );

        if let Err(e) = self.social.reply(reply_id, &text).await {
            warn!(reply_id, error = %e, "payout announcement failed, falling back to challenge post");
            if let Some(post_id) = &challenge.post_id {
                if let Err(e) = self.social.reply(post_id, &text).await {
                    warn!(error = %e, "payout announcement fallback failed");
                }
            }
        }
    }
}
