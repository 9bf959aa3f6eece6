//! The challenge lifecycle state machine.
//!
//! [`plan_tick`] is a pure function of a snapshot of persisted state and
//! the current time. Given identical snapshots and identical collaborator
//! responses it always yields the same intents, which is what makes the
//! orchestrator testable without live network calls. All side effects
//! happen in the executor.

use chrono::{DateTime, Duration, Utc};
use persuade_core::{
    challenge::next_topic, Challenge, ChallengePhase, GameSettings, Reply, WinnerRecord,
    WinnerStatus,
};
use serde::{Deserialize, Serialize};

/// Snapshot of the persisted state the planner reads.
#[derive(Debug, Clone, Default)]
pub struct GameView {
    /// The current (or most recent) challenge.
    pub challenge: Option<Challenge>,

    /// When the last challenge prompt was published.
    pub last_posted_at: Option<DateTime<Utc>>,

    /// Topic of the last posted challenge.
    pub last_topic: Option<String>,

    /// All recorded replies for the current challenge, arrival order.
    pub replies: Vec<Reply>,

    /// Winner record for the current challenge, if claimed.
    pub winner: Option<WinnerRecord>,
}

/// A side-effecting intent produced by one planning pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TickIntent {
    /// Publish a new challenge prompt for a topic.
    PostChallenge { topic: String },

    /// Fetch the next page of replies to the challenge post.
    FetchReplies {
        post_id: String,
        cursor: Option<String>,
    },

    /// Evaluate one recorded, unscored reply.
    ScoreReply { reply_id: String },

    /// Pay the reward for a qualifying reply, exactly once.
    IssueReward { reply_id: String, author_id: String },

    /// Poll on-chain confirmation of a submitted reward.
    ConfirmReward { tx_reference: String },
}

/// Plan one tick of the game loop.
pub fn plan_tick(view: &GameView, settings: &GameSettings, now: DateTime<Utc>) -> Vec<TickIntent> {
    let Some(challenge) = &view.challenge else {
        return posting_gate(view, settings, now);
    };

    match challenge.phase {
        // Created but never published: publish the same topic again. A
        // crash after publish but before the open transition was recorded
        // risks one duplicate post; it never risks a duplicate payment.
        ChallengePhase::Pending => vec![TickIntent::PostChallenge {
            topic: challenge.topic.clone(),
        }],

        ChallengePhase::Open => plan_open(view, challenge),

        ChallengePhase::Closed => {
            // A reward still in flight pins the loop to confirmation
            // polling; a new cycle starts only once the ledger is settled.
            if let Some(intent) = confirm_intent(view.winner.as_ref()) {
                return vec![intent];
            }
            posting_gate(view, settings, now)
        }
    }
}

fn plan_open(view: &GameView, challenge: &Challenge) -> Vec<TickIntent> {
    // Auto-stop: once the reward slot is claimed, no further fetching or
    // scoring for this challenge, even before the reward confirms.
    if view.winner.is_some() {
        return confirm_intent(view.winner.as_ref()).into_iter().collect();
    }

    // A qualifying reply without a claim (e.g. crash between scoring and
    // claiming) goes straight to reward. Earliest received wins the
    // tie-break, not highest score: the game rewards the first successful
    // persuasion.
    if let Some(winner) = view
        .replies
        .iter()
        .filter(|r| r.qualifies(challenge.threshold))
        .min_by_key(|r| r.seq)
    {
        return vec![TickIntent::IssueReward {
            reply_id: winner.id.clone(),
            author_id: winner.author_id.clone(),
        }];
    }

    let Some(post_id) = &challenge.post_id else {
        // Open without a post id cannot happen through normal transitions.
        return Vec::new();
    };

    let mut intents = vec![TickIntent::FetchReplies {
        post_id: post_id.clone(),
        cursor: challenge.reply_cursor.clone(),
    }];

    // Oldest unscored first, so repeated ticks converge on full coverage.
    let mut unscored: Vec<&Reply> = view.replies.iter().filter(|r| !r.is_scored()).collect();
    unscored.sort_by_key(|r| r.seq);
    intents.extend(unscored.into_iter().map(|r| TickIntent::ScoreReply {
        reply_id: r.id.clone(),
    }));

    intents
}

fn confirm_intent(winner: Option<&WinnerRecord>) -> Option<TickIntent> {
    match winner {
        Some(record) if record.status == WinnerStatus::Pending => record
            .tx_reference
            .clone()
            .map(|tx_reference| TickIntent::ConfirmReward { tx_reference }),
        _ => None,
    }
}

fn posting_gate(view: &GameView, settings: &GameSettings, now: DateTime<Utc>) -> Vec<TickIntent> {
    let interval_elapsed = match view.last_posted_at {
        Some(last) => now - last >= Duration::seconds(settings.cast_interval_secs as i64),
        None => true,
    };
    if !interval_elapsed {
        return Vec::new();
    }

    match next_topic(&settings.topics, view.last_topic.as_deref()) {
        Some(topic) => vec![TickIntent::PostChallenge {
            topic: topic.to_string(),
        }],
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use persuade_core::InboundReply;

    use super::*;

    fn settings() -> GameSettings {
        GameSettings {
            topics: vec![
                "AI benefits outweigh risks".to_string(),
                "remote work beats offices".to_string(),
            ],
            cast_interval_secs: 3600,
            ..GameSettings::default()
        }
    }

    fn reply(id: &str, seq: u64, score: Option<u8>) -> Reply {
        let mut r = Reply::from_inbound(
            InboundReply {
                id: id.to_string(),
                author_id: format!("author-{}", id),
                author_name: None,
                text: "argument".to_string(),
                received_at: Utc::now(),
            },
            seq,
        );
        r.score = score;
        r
    }

    fn open_challenge() -> Challenge {
        Challenge::new("AI benefits outweigh risks", 7, "1").opened("0xcast", Utc::now())
    }

    #[test]
    fn test_idle_interval_not_elapsed_stays_idle() {
        let view = GameView {
            last_posted_at: Some(Utc::now() - Duration::seconds(10)),
            ..GameView::default()
        };
        assert!(plan_tick(&view, &settings(), Utc::now()).is_empty());
    }

    #[test]
    fn test_idle_never_posted_posts_first_topic() {
        let view = GameView::default();
        let intents = plan_tick(&view, &settings(), Utc::now());
        assert_eq!(
            intents,
            vec![TickIntent::PostChallenge {
                topic: "AI benefits outweigh risks".to_string()
            }]
        );
    }

    #[test]
    fn test_idle_elapsed_rotates_topic() {
        let view = GameView {
            last_posted_at: Some(Utc::now() - Duration::seconds(7200)),
            last_topic: Some("AI benefits outweigh risks".to_string()),
            ..GameView::default()
        };
        let intents = plan_tick(&view, &settings(), Utc::now());
        assert_eq!(
            intents,
            vec![TickIntent::PostChallenge {
                topic: "remote work beats offices".to_string()
            }]
        );
    }

    #[test]
    fn test_pending_challenge_republishes_same_topic() {
        let view = GameView {
            challenge: Some(Challenge::new("AI benefits outweigh risks", 7, "1")),
            ..GameView::default()
        };
        let intents = plan_tick(&view, &settings(), Utc::now());
        assert_eq!(
            intents,
            vec![TickIntent::PostChallenge {
                topic: "AI benefits outweigh risks".to_string()
            }]
        );
    }

    #[test]
    fn test_open_with_no_replies_fetches() {
        let view = GameView {
            challenge: Some(open_challenge()),
            ..GameView::default()
        };
        let intents = plan_tick(&view, &settings(), Utc::now());
        assert_eq!(
            intents,
            vec![TickIntent::FetchReplies {
                post_id: "0xcast".to_string(),
                cursor: None,
            }]
        );
    }

    #[test]
    fn test_open_scores_unscored_oldest_first() {
        let view = GameView {
            challenge: Some(open_challenge()),
            replies: vec![
                reply("0x2", 1, None),
                reply("0x1", 0, Some(5)),
                reply("0x3", 2, None),
            ],
            ..GameView::default()
        };
        let intents = plan_tick(&view, &settings(), Utc::now());
        assert_eq!(intents.len(), 3);
        assert_eq!(
            intents[1],
            TickIntent::ScoreReply {
                reply_id: "0x2".to_string()
            }
        );
        assert_eq!(
            intents[2],
            TickIntent::ScoreReply {
                reply_id: "0x3".to_string()
            }
        );
    }

    #[test]
    fn test_qualifying_reply_goes_straight_to_reward() {
        let view = GameView {
            challenge: Some(open_challenge()),
            replies: vec![reply("0x1", 0, Some(8)), reply("0x2", 1, None)],
            ..GameView::default()
        };
        let intents = plan_tick(&view, &settings(), Utc::now());
        assert_eq!(
            intents,
            vec![TickIntent::IssueReward {
                reply_id: "0x1".to_string(),
                author_id: "author-0x1".to_string(),
            }]
        );
    }

    #[test]
    fn test_tie_break_is_earliest_received_not_highest_score() {
        let view = GameView {
            challenge: Some(open_challenge()),
            replies: vec![reply("0x1", 0, Some(8)), reply("0x2", 1, Some(10))],
            ..GameView::default()
        };
        let intents = plan_tick(&view, &settings(), Utc::now());
        assert_eq!(
            intents,
            vec![TickIntent::IssueReward {
                reply_id: "0x1".to_string(),
                author_id: "author-0x1".to_string(),
            }]
        );
    }

    #[test]
    fn test_claimed_winner_stops_scoring() {
        let challenge = open_challenge();
        let mut record = WinnerRecord::claimed(challenge.id, "0x1", "author-0x1", "1");
        record.tx_reference = Some("0xtx".to_string());

        let view = GameView {
            challenge: Some(challenge),
            replies: vec![reply("0x1", 0, Some(8)), reply("0x2", 1, None)],
            winner: Some(record),
            ..GameView::default()
        };
        let intents = plan_tick(&view, &settings(), Utc::now());
        // Only confirmation polling; the unscored reply is never evaluated.
        assert_eq!(
            intents,
            vec![TickIntent::ConfirmReward {
                tx_reference: "0xtx".to_string()
            }]
        );
    }

    #[test]
    fn test_closed_with_pending_reward_defers_next_post() {
        let challenge = {
            let mut c = open_challenge();
            c.phase = ChallengePhase::Closed;
            c
        };
        let mut record = WinnerRecord::claimed(challenge.id, "0x1", "author-0x1", "1");
        record.tx_reference = Some("0xtx".to_string());

        let view = GameView {
            challenge: Some(challenge),
            last_posted_at: Some(Utc::now() - Duration::seconds(7200)),
            winner: Some(record),
            ..GameView::default()
        };
        let intents = plan_tick(&view, &settings(), Utc::now());
        assert_eq!(
            intents,
            vec![TickIntent::ConfirmReward {
                tx_reference: "0xtx".to_string()
            }]
        );
    }

    #[test]
    fn test_closed_with_settled_reward_starts_new_cycle() {
        let challenge = {
            let mut c = open_challenge();
            c.phase = ChallengePhase::Closed;
            c
        };
        let mut record = WinnerRecord::claimed(challenge.id, "0x1", "author-0x1", "1");
        record.status = WinnerStatus::Confirmed;

        let view = GameView {
            challenge: Some(challenge),
            last_posted_at: Some(Utc::now() - Duration::seconds(7200)),
            last_topic: Some("AI benefits outweigh risks".to_string()),
            winner: Some(record),
            ..GameView::default()
        };
        let intents = plan_tick(&view, &settings(), Utc::now());
        assert_eq!(
            intents,
            vec![TickIntent::PostChallenge {
                topic: "remote work beats offices".to_string()
            }]
        );
    }

    #[test]
    fn test_single_topic_set_repeats() {
        let mut s = settings();
        s.topics = vec!["only topic".to_string()];
        let view = GameView {
            last_posted_at: Some(Utc::now() - Duration::seconds(7200)),
            last_topic: Some("only topic".to_string()),
            ..GameView::default()
        };
        let intents = plan_tick(&view, &s, Utc::now());
        assert_eq!(
            intents,
            vec![TickIntent::PostChallenge {
                topic: "only topic".to_string()
            }]
        );
    }

    #[test]
    fn test_planning_is_deterministic() {
        let view = GameView {
            challenge: Some(open_challenge()),
            replies: vec![reply("0x1", 0, None), reply("0x2", 1, None)],
            ..GameView::default()
        };
        let now = Utc::now();
        let s = settings();
        assert_eq!(plan_tick(&view, &s, now), plan_tick(&view, &s, now));
    }
}
