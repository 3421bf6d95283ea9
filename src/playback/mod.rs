/*!
 * Playback synchronization.
 *
 * - `transport`: the media player contract
 * - `region`: loop regions and the active interval
 * - `loop_controller`: keeps the play head inside the active interval
 * - `display`: follows the caption under the play head
 * - `ticks`: timer sources for both
 */

pub mod display;
pub mod loop_controller;
pub mod region;
pub mod ticks;
pub mod transport;

pub use display::{DisplayTracker, DisplayUpdate};
pub use loop_controller::{LoopController, LoopState, TickOutcome};
pub use region::{ActiveInterval, IntervalSource, LoopRegion};
pub use ticks::{IntervalTicks, ManualTicks, TickSource};
pub use transport::{usable_position, PlaybackState, Transport};
