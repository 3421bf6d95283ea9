/*!
 * Loop controller.
 *
 * A polling state machine over one active-interval slot:
 *
 * ```text
 *   Idle ──arm──▶ Armed ──suspend──▶ Suspended
 *    ▲             │  ▲                 │
 *    └──disarm─────┘  └────resume───────┘
 * ```
 *
 * While armed, every tick compares the play head against the interval end
 * and seeks back to its start once the end is reached. Arming and resuming
 * always seek to the start straight away.
 */

use log::{debug, info};

use super::region::ActiveInterval;
use super::transport::{usable_position, Transport};
use crate::timecode::TimeValue;

/// Controller state
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoopState {
    #[default]
    Idle,
    Armed(ActiveInterval),
    Suspended(ActiveInterval),
}

impl LoopState {
    pub fn name(&self) -> &'static str {
        match self {
            LoopState::Idle => "idle",
            LoopState::Armed(_) => "armed",
            LoopState::Suspended(_) => "suspended",
        }
    }
}

/// What a tick did
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Nothing armed
    Idle,
    /// Interval held but not enforced
    Suspended,
    /// Player could not report a usable position; retried next tick
    TransportUnavailable,
    /// Play head inside the interval
    Within { position: f64 },
    /// Play head reached the end and was sent back
    Seeked { from: f64, to: f64 },
}

/// Enforces playback of one interval
#[derive(Debug, Clone, Default)]
pub struct LoopController {
    state: LoopState,
    ticks: u64,
    seeks: u64,
}

impl LoopController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &LoopState {
        &self.state
    }

    pub fn is_armed(&self) -> bool {
        matches!(self.state, LoopState::Armed(_))
    }

    /// Interval currently held, armed or suspended
    pub fn interval(&self) -> Option<&ActiveInterval> {
        match &self.state {
            LoopState::Idle => None,
            LoopState::Armed(interval) | LoopState::Suspended(interval) => Some(interval),
        }
    }

    /// Interval being enforced
    pub fn armed_interval(&self) -> Option<&ActiveInterval> {
        match &self.state {
            LoopState::Armed(interval) => Some(interval),
            _ => None,
        }
    }

    /// Number of ticks handled while armed
    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    /// Number of seeks issued, including the seeks on arm and resume
    pub fn seek_count(&self) -> u64 {
        self.seeks
    }

    /// Start enforcing an interval, replacing whatever was held
    pub fn arm(&mut self, interval: ActiveInterval, transport: &mut dyn Transport) {
        info!("Loop armed on {}", interval);
        self.seek_to(interval.start, transport);
        self.state = LoopState::Armed(interval);
    }

    /// Stop enforcing but keep the interval
    pub fn suspend(&mut self) -> bool {
        match std::mem::take(&mut self.state) {
            LoopState::Armed(interval) => {
                debug!("Loop suspended on {}", interval);
                self.state = LoopState::Suspended(interval);
                true
            }
            other => {
                self.state = other;
                false
            }
        }
    }

    /// Hold an interval without enforcing it
    pub fn hold(&mut self, interval: ActiveInterval) {
        debug!("Loop holding {}", interval);
        self.state = LoopState::Suspended(interval);
    }

    /// Re-arm the held interval, seeking to its start
    pub fn resume(&mut self, transport: &mut dyn Transport) -> bool {
        match std::mem::take(&mut self.state) {
            LoopState::Suspended(interval) => {
                self.arm(interval, transport);
                true
            }
            other => {
                self.state = other;
                false
            }
        }
    }

    /// Update the bounds of the held interval without seeking
    pub fn retarget(&mut self, start: TimeValue, end: TimeValue) {
        if let LoopState::Armed(interval) | LoopState::Suspended(interval) = &mut self.state {
            interval.start = start;
            interval.end = end;
            debug!("Loop retargeted to {}", interval);
        }
    }

    /// Drop the interval entirely
    pub fn disarm(&mut self) {
        if !matches!(self.state, LoopState::Idle) {
            info!("Loop cleared");
        }
        self.state = LoopState::Idle;
    }

    /// One polling step
    pub fn tick(&mut self, transport: &mut dyn Transport) -> TickOutcome {
        let (start, end) = match &self.state {
            LoopState::Idle => return TickOutcome::Idle,
            LoopState::Suspended(_) => return TickOutcome::Suspended,
            LoopState::Armed(interval) => (interval.start, interval.end),
        };
        self.ticks += 1;

        let Some(position) = usable_position(transport) else {
            debug!("Loop tick skipped: player not ready");
            return TickOutcome::TransportUnavailable;
        };

        if position >= end.as_f64() {
            self.seek_to(start, transport);
            debug!("Loop wrapped at {:.2}s back to {}", position, start);
            TickOutcome::Seeked {
                from: position,
                to: start.as_f64(),
            }
        } else {
            TickOutcome::Within { position }
        }
    }

    fn seek_to(&mut self, start: TimeValue, transport: &mut dyn Transport) {
        if transport.is_ready() {
            transport.seek(start.as_f64());
            self.seeks += 1;
        } else {
            // The first armed tick catches up once the player is ready
            debug!("Player not ready; seek to {} deferred to the next tick", start);
        }
    }
}
