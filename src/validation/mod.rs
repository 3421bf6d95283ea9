/*!
 * Validation of caption timing.
 *
 * - `overlaps`: the conflict resolver (first overlap, gated save, auto-resolve)
 * - `timecodes`: full per-caption timing report
 */

pub mod overlaps;
pub mod timecodes;

// Re-export main types
pub use overlaps::{AutoResolveOutcome, ConflictResolver, OverlapConflict, SaveReport, ShiftRecord};
pub use timecodes::{TimingIssue, TimingReport, TimingValidator, TimingValidatorConfig};
