//! # Persuade Engine
//!
//! The challenge lifecycle orchestrator:
//! - [`plan_tick`] - pure, deterministic state machine producing side-effect
//!   intents from persisted state
//! - [`Engine`] - tick executor running intents against the collaborators
//! - [`RewardDispatcher`] - exactly-once reward issuance
//! - [`ScoringAdapter`] - normalizes raw model output into a bounded score

pub mod collaborators;
pub mod dispatch;
pub mod engine;
pub mod machine;
pub mod scoring;

pub use collaborators::{with_retry, ChainClient, ScoringClient, SocialClient, TxStatus};
pub use dispatch::{DispatchOutcome, RewardDispatcher};
pub use engine::Engine;
pub use machine::{plan_tick, GameView, TickIntent};
pub use scoring::{Evaluation, ScoringAdapter};
