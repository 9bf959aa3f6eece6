//! Challenge API endpoints.
//!
//! The manual triggers map one-to-one onto intents the state machine
//! already produces; they are queued for the game loop, which executes
//! them under the same sequencing as planned ticks.

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use persuade_core::{challenge::next_topic, Challenge, ChallengePhase, Reply, WinnerRecord};
use persuade_engine::TickIntent;
use persuade_state::{ChallengeStore, ReplyStore, WinnerLedger};
use serde::Serialize;
use uuid::Uuid;

use crate::state::AppState;

/// Full view of the current challenge.
#[derive(Debug, Serialize)]
pub struct ChallengeResponse {
    pub id: Uuid,
    pub topic: String,
    pub phase: ChallengePhase,
    pub post_id: Option<String>,
    pub posted_at: Option<DateTime<Utc>>,
    pub threshold: u8,
    pub reward_amount: String,
    pub replies: Vec<ReplyResponse>,
    pub winner: Option<WinnerResponse>,
}

#[derive(Debug, Serialize)]
pub struct ReplyResponse {
    pub id: String,
    pub author_id: String,
    pub author_name: Option<String>,
    pub text: String,
    pub received_at: DateTime<Utc>,
    pub score: Option<u8>,
    pub rationale: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WinnerResponse {
    pub reply_id: String,
    pub author_id: String,
    pub reward_amount: String,
    pub status: String,
    pub tx_reference: Option<String>,
}

/// Response after queueing a manual intent.
#[derive(Debug, Serialize)]
pub struct TriggerResponse {
    pub status: String,
    pub intent: TickIntent,
}

impl ChallengeResponse {
    fn from_parts(challenge: Challenge, replies: Vec<Reply>, winner: Option<WinnerRecord>) -> Self {
        Self {
            id: challenge.id,
            topic: challenge.topic,
            phase: challenge.phase,
            post_id: challenge.post_id,
            posted_at: challenge.posted_at,
            threshold: challenge.threshold,
            reward_amount: challenge.reward_amount,
            replies: replies
                .into_iter()
                .map(|r| ReplyResponse {
                    id: r.id,
                    author_id: r.author_id,
                    author_name: r.author_name,
                    text: r.text,
                    received_at: r.received_at,
                    score: r.score,
                    rationale: r.rationale,
                })
                .collect(),
            winner: winner.map(|w| WinnerResponse {
                reply_id: w.reply_id,
                author_id: w.author_id,
                reward_amount: w.reward_amount,
                status: format!("{:?}", w.status).to_lowercase(),
                tx_reference: w.tx_reference,
            }),
        }
    }
}

/// Get the current challenge with its replies and winner.
pub async fn get_challenge(
    State(state): State<AppState>,
) -> Result<Json<ChallengeResponse>, (StatusCode, String)> {
    let challenge = state
        .store
        .challenge()
        .await
        .ok_or((StatusCode::NOT_FOUND, "no challenge yet".to_string()))?;

    let replies = state.store.replies(challenge.id).await;
    let winner = state.store.winner(challenge.id).await;

    Ok(Json(ChallengeResponse::from_parts(
        challenge, replies, winner,
    )))
}

/// Manually trigger posting a new challenge.
pub async fn trigger_post(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<TriggerResponse>), (StatusCode, String)> {
    if let Some(c) = state.store.challenge().await {
        if c.phase == ChallengePhase::Open {
            return Err((
                StatusCode::CONFLICT,
                format!("challenge {} is still open", c.id),
            ));
        }
    }

    let last_topic = state.store.last_topic().await;
    let topic = next_topic(&state.settings.topics, last_topic.as_deref())
        .ok_or((StatusCode::CONFLICT, "no topics configured".to_string()))?
        .to_string();

    enqueue(&state, TickIntent::PostChallenge { topic }).await
}

/// Manually trigger a reply check for the open challenge.
pub async fn trigger_check(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<TriggerResponse>), (StatusCode, String)> {
    let challenge = state
        .store
        .challenge()
        .await
        .ok_or((StatusCode::CONFLICT, "no active challenge".to_string()))?;

    if !challenge.phase.accepts_replies() {
        return Err((
            StatusCode::CONFLICT,
            format!("challenge {} is not open", challenge.id),
        ));
    }
    let post_id = challenge
        .post_id
        .ok_or((StatusCode::CONFLICT, "challenge has no post yet".to_string()))?;

    enqueue(
        &state,
        TickIntent::FetchReplies {
            post_id,
            cursor: challenge.reply_cursor,
        },
    )
    .await
}

/// Manually trigger the reward for the earliest qualifying reply.
pub async fn trigger_reward(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<TriggerResponse>), (StatusCode, String)> {
    let challenge = state
        .store
        .challenge()
        .await
        .ok_or((StatusCode::CONFLICT, "no active challenge".to_string()))?;

    if state.store.winner(challenge.id).await.is_some() {
        return Err((
            StatusCode::CONFLICT,
            format!("challenge {} already has a winner", challenge.id),
        ));
    }

    let replies = state.store.replies(challenge.id).await;
    let qualifying = replies
        .iter()
        .filter(|r| r.qualifies(challenge.threshold))
        .min_by_key(|r| r.seq)
        .ok_or((
            StatusCode::CONFLICT,
            "no reply meets the threshold".to_string(),
        ))?;

    enqueue(
        &state,
        TickIntent::IssueReward {
            reply_id: qualifying.id.clone(),
            author_id: qualifying.author_id.clone(),
        },
    )
    .await
}

async fn enqueue(
    state: &AppState,
    intent: TickIntent,
) -> Result<(StatusCode, Json<TriggerResponse>), (StatusCode, String)> {
    state
        .manual
        .send(intent.clone())
        .await
        .map_err(|_| {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "game loop is not running".to_string(),
            )
        })?;

    Ok((
        StatusCode::ACCEPTED,
        Json(TriggerResponse {
            status: "accepted".to_string(),
            intent,
        }),
    ))
}
