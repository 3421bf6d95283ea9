/*!
 * Contract for the external media player.
 *
 * The engine only reads the play head and issues seeks; it never starts or
 * pauses playback.
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// Player state as reported by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    #[default]
    Unstarted,
    Playing,
    Paused,
    Buffering,
    Ended,
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackState::Unstarted => write!(f, "unstarted"),
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Paused => write!(f, "paused"),
            PlaybackState::Buffering => write!(f, "buffering"),
            PlaybackState::Ended => write!(f, "ended"),
        }
    }
}

/// Black-box media player
pub trait Transport: Send {
    /// Play head position in seconds
    fn current_time(&self) -> f64;

    /// Media length in seconds, once known
    fn duration(&self) -> Option<f64>;

    /// Move the play head without changing the playback state
    fn seek(&mut self, seconds: f64);

    /// Whether the player can answer queries and accept seeks
    fn is_ready(&self) -> bool;

    fn playback_state(&self) -> PlaybackState;
}

/// Play head position, or `None` when the player cannot give a usable one
pub fn usable_position(transport: &dyn Transport) -> Option<f64> {
    if !transport.is_ready() {
        return None;
    }
    let position = transport.current_time();
    if position.is_finite() && position >= 0.0 {
        Some(position)
    } else {
        None
    }
}
