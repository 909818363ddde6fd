//! Session controller.
//!
//! Every orchestrator-side engine loop is driven by a [`SessionController`]:
//!
//! ```text
//! RUNNING --(budget spent | cancelled)--> DRAINING --> DONE
//! ```
//!
//! `tick()` is called once per loop iteration. It reports `Draining` exactly
//! once, which is the engine's cue to emit its terminal sentinel; every tick
//! after that reports `Done`.

use glint_core::{ChannelMask, LaunchParams};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Run one more tick
    Running,
    /// Emit the sentinel now
    Draining,
    /// Sentinel already emitted, return to the caller
    Done,
}

/// Read-only parameters of one engine session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionParams {
    /// Step length in milliseconds
    pub rate: i32,
    /// Channels followers drive
    pub mask: ChannelMask,
    /// Tick budget; negative runs until cancelled
    pub iterations: i64,
}

impl From<&LaunchParams> for SessionParams {
    fn from(params: &LaunchParams) -> Self {
        Self {
            rate: params.rate,
            mask: params.mask,
            iterations: params.iterations,
        }
    }
}

/// Countdown plus cancellation, with a one-shot drain latch.
#[derive(Debug)]
pub struct SessionController {
    /// `None` when the session is unbounded
    countdown: Option<u64>,
    cancel: CancellationToken,
    done: bool,
}

impl SessionController {
    pub fn new(iterations: i64, cancel: CancellationToken) -> Self {
        Self {
            countdown: u64::try_from(iterations).ok(),
            cancel,
            done: false,
        }
    }

    /// Advance by one tick.
    pub fn tick(&mut self) -> SessionState {
        if self.done {
            return SessionState::Done;
        }

        let exhausted = match self.countdown.as_mut() {
            Some(0) => true,
            Some(left) => {
                *left -= 1;
                false
            }
            None => false,
        };

        if exhausted || self.cancel.is_cancelled() {
            debug!(exhausted, "Session draining");
            self.done = true;
            return SessionState::Draining;
        }

        SessionState::Running
    }

    /// Ticks left before draining, `None` if unbounded.
    pub fn remaining(&self) -> Option<u64> {
        self.countdown
    }

    pub fn is_done(&self) -> bool {
        self.done
    }
}
