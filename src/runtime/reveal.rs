//! Reveal timer
//!
//! Drives the typing effect by sending one `RevealTick` per cadence period
//! into the runtime's event channel. Each reveal gets a fresh generation so
//! ticks from a superseded timer can be told apart and dropped.

use crate::state_machine::Event;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Default delay between revealed characters
pub const DEFAULT_CADENCE: Duration = Duration::from_millis(30);

struct ActiveReveal {
    generation: u64,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Owns at most one running reveal timer
pub struct RevealController {
    cadence: Duration,
    generation: u64,
    active: Option<ActiveReveal>,
}

impl RevealController {
    #[must_use]
    pub fn new(cadence: Duration) -> Self {
        Self {
            // A zero period would make the interval panic
            cadence: cadence.max(Duration::from_millis(1)),
            generation: 0,
            active: None,
        }
    }

    #[must_use]
    pub fn cadence(&self) -> Duration {
        self.cadence
    }

    /// Start a new timer, cancelling any previous one first.
    ///
    /// Returns the generation its ticks will carry. The first tick fires one
    /// period after the start.
    pub fn start(&mut self, events: mpsc::Sender<Event>) -> u64 {
        self.cancel();

        self.generation += 1;
        let generation = self.generation;
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let cadence = self.cadence;

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + cadence, cadence);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;

                    () = token.cancelled() => break,

                    _ = ticker.tick() => {
                        if events.send(Event::RevealTick { generation }).await.is_err() {
                            // Runtime is gone
                            break;
                        }
                    }
                }
            }
        });

        tracing::debug!(generation, cadence_ms = %cadence.as_millis(), "Reveal started");
        self.active = Some(ActiveReveal {
            generation,
            cancel,
            task,
        });
        generation
    }

    /// Stop the running timer, if any
    pub fn cancel(&mut self) {
        if let Some(active) = self.active.take() {
            active.cancel.cancel();
            tracing::debug!(generation = active.generation, "Reveal stopped");
        }
    }

    /// Whether a timer is running
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| !active.task.is_finished())
    }

    /// Whether a tick with this generation belongs to the running timer
    #[must_use]
    pub fn is_current(&self, generation: u64) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| active.generation == generation)
    }
}

impl Drop for RevealController {
    fn drop(&mut self) {
        self.cancel();
    }
}
