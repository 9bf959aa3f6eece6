//! The background game loop.
//!
//! Ticks execute strictly sequentially: manual intents from the operator
//! API are drained before each planned tick, so no two ticks (and no
//! manual intent and tick) ever run concurrently for the same challenge.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use persuade_engine::{Engine, TickIntent};
use persuade_state::JsonGameStore;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Drives the engine at a fixed interval.
pub struct GameLoop {
    engine: Arc<Engine<JsonGameStore>>,
    manual: mpsc::Receiver<TickIntent>,
    tick_interval: Duration,
}

impl GameLoop {
    /// Create a loop over an engine and a manual-intent queue.
    pub fn new(
        engine: Arc<Engine<JsonGameStore>>,
        manual: mpsc::Receiver<TickIntent>,
        tick_interval: Duration,
    ) -> Self {
        Self {
            engine,
            manual,
            tick_interval,
        }
    }

    /// Run until a fatal error breaks the exactly-once guarantee.
    pub async fn run(mut self) {
        info!(interval = ?self.tick_interval, "game loop started");
        let mut ticker = tokio::time::interval(self.tick_interval);

        loop {
            ticker.tick().await;

            // Operator-triggered intents run first, under the same
            // sequencing as planned ticks.
            while let Ok(intent) = self.manual.try_recv() {
                info!(?intent, "executing manual intent");
                if let Err(e) = self.engine.execute(intent).await {
                    if e.is_fatal() {
                        error!(error = %e, "HALTING: exactly-once invariant broken");
                        return;
                    }
                    warn!(error = %e, "manual intent failed");
                }
            }

            match self.engine.tick(Utc::now()).await {
                Ok(intents) => debug!(count = intents.len(), "tick complete"),
                Err(e) => {
                    error!(error = %e, "HALTING: exactly-once invariant broken");
                    return;
                }
            }
        }
    }
}
