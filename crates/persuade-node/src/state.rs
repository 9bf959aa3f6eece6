//! Application state.

use std::sync::Arc;

use persuade_core::GameSettings;
use persuade_engine::TickIntent;
use persuade_state::JsonGameStore;
use tokio::sync::mpsc;

/// Shared application state for the operator API.
#[derive(Clone)]
pub struct AppState {
    /// The durable game store (challenge, replies, winner ledger).
    pub store: Arc<JsonGameStore>,

    /// Game configuration.
    pub settings: GameSettings,

    /// Manual intents for the game loop to execute between ticks.
    pub manual: mpsc::Sender<TickIntent>,
}

impl AppState {
    /// Create application state around a store and a manual-intent queue.
    pub fn new(
        store: Arc<JsonGameStore>,
        settings: GameSettings,
        manual: mpsc::Sender<TickIntent>,
    ) -> Self {
        Self {
            store,
            settings,
            manual,
        }
    }
}
