/*!
 * Timer sources driving the loop controller and the caption display.
 */

use async_trait::async_trait;
use std::time::Duration;
use tokio::time::{self, Interval, MissedTickBehavior};

/// Source of periodic ticks
#[async_trait]
pub trait TickSource: Send {
    /// Wait for the next tick; `None` once the source is exhausted
    async fn next_tick(&mut self) -> Option<u64>;
}

/// Wall-clock ticks backed by `tokio::time::interval`
///
/// Late ticks are dropped rather than bunched up, so a stalled executor never
/// replays a burst of seeks.
pub struct IntervalTicks {
    interval: Interval,
    count: u64,
    limit: Option<u64>,
}

impl IntervalTicks {
    pub fn new(period: Duration) -> Self {
        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self {
            interval,
            count: 0,
            limit: None,
        }
    }

    pub fn from_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis.max(1)))
    }

    /// Stop after `limit` ticks
    pub fn take(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[async_trait]
impl TickSource for IntervalTicks {
    async fn next_tick(&mut self) -> Option<u64> {
        if self.limit.is_some_and(|limit| self.count >= limit) {
            return None;
        }
        self.interval.tick().await;
        self.count += 1;
        Some(self.count)
    }
}

/// Fixed number of ticks delivered without waiting
#[derive(Debug, Clone)]
pub struct ManualTicks {
    remaining: u64,
    count: u64,
}

impl ManualTicks {
    pub fn new(ticks: u64) -> Self {
        Self {
            remaining: ticks,
            count: 0,
        }
    }
}

#[async_trait]
impl TickSource for ManualTicks {
    async fn next_tick(&mut self) -> Option<u64> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        self.count += 1;
        Some(self.count)
    }
}
