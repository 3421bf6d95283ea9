/*!
 * Overlap detection and resolution.
 *
 * Two policies exist:
 * - blocking: find the first overlapping pair and refuse to save until the
 *   user fixes it (the later caption is the one highlighted)
 * - auto-resolve: during drag edits, pull each later start forward to the
 *   preceding end, never deleting anything
 */

use log::{debug, info, warn};

use crate::captions::interval_set::IntervalSet;
use crate::captions::model::{Caption, CaptionId};
use crate::errors::{EngineError, EngineResult, OrderError};
use crate::store::{CaptionStore, CaptionUpdate};
use crate::timecode::TimeValue;

/// The first overlapping pair in start order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlapConflict {
    /// Index of the later caption in the sorted list
    pub index: usize,
    /// Index of the earlier caption
    pub previous_index: usize,
    /// Seconds the two intervals share
    pub overlap_secs: u64,
}

/// One start-time adjustment made by `auto_resolve`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShiftRecord {
    pub caption_id: CaptionId,
    pub old_start: TimeValue,
    pub new_start: TimeValue,
    /// End moved too, when the caption sat entirely inside its predecessor
    pub old_end: TimeValue,
    pub new_end: TimeValue,
    /// The earlier caption whose end forced the shift
    pub caused_by: CaptionId,
}

/// Sorted, non-overlapping captions plus the shifts that produced them
#[derive(Debug, Clone)]
pub struct AutoResolveOutcome {
    pub captions: Vec<Caption>,
    pub shifts: Vec<ShiftRecord>,
}

impl AutoResolveOutcome {
    pub fn changed(&self) -> bool {
        !self.shifts.is_empty()
    }
}

/// Result of a successful save
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveReport {
    pub created: usize,
    pub updated: usize,
}

/// Overlap checks and the conflict-gated save
#[derive(Debug, Clone, Default)]
pub struct ConflictResolver;

impl ConflictResolver {
    pub fn new() -> Self {
        Self
    }

    /// First adjacent pair with `prev.end > next.start`
    pub fn find_first_overlap(sorted: &[Caption]) -> Option<OverlapConflict> {
        sorted.windows(2).enumerate().find_map(|(i, pair)| {
            let (prev, next) = (&pair[0], &pair[1]);
            if prev.end_time > next.start_time {
                Some(OverlapConflict {
                    index: i + 1,
                    previous_index: i,
                    overlap_secs: prev.end_time.since(next.start_time),
                })
            } else {
                None
            }
        })
    }

    /// Every caption has start < end and ends within `duration`
    pub fn check_bounds(captions: &[Caption], duration: Option<TimeValue>) -> Result<(), OrderError> {
        captions.iter().try_for_each(|c| c.check_order(duration))
    }

    /// Sort the set and fail on the first overlap or out-of-range caption
    pub fn check(&self, set: &mut IntervalSet) -> EngineResult<()> {
        set.renumber();
        if let Some(conflict) = Self::find_first_overlap(set.captions()) {
            return Err(Self::overlap_error(set.captions(), &conflict));
        }
        Self::check_bounds(set.captions(), set.subject().duration)?;
        Ok(())
    }

    /// Persist the set when it has no overlaps
    ///
    /// Captions the store has not seen are created, the rest are updated with
    /// their current fields and serial numbers. A store failure stops the
    /// save; captions written before it stay marked as persisted.
    pub async fn save(&self, set: &mut IntervalSet, store: &dyn CaptionStore) -> EngineResult<SaveReport> {
        if let Err(err) = self.check(set) {
            warn!("Refusing to save captions for {}: {}", set.subject().id, err);
            return Err(err);
        }

        let subject_id = set.subject().id.clone();
        let mut report = SaveReport::default();

        for caption in set.captions().to_vec() {
            if set.is_persisted(&caption.id) {
                store
                    .update_caption(&caption.id, &CaptionUpdate::full(&caption))
                    .await?;
                report.updated += 1;
            } else {
                store.save_caption(&subject_id, &caption).await?;
                set.mark_persisted(&caption.id);
                report.created += 1;
            }
        }

        info!(
            "Saved {} captions for {} ({} new, {} updated)",
            set.len(),
            subject_id,
            report.created,
            report.updated
        );
        Ok(report)
    }

    /// Push each overlapping start forward to the preceding end
    ///
    /// A caption nested inside its predecessor keeps its length, so its end
    /// can land past the media; callers check the result with `check_bounds`.
    pub fn auto_resolve(captions: &[Caption]) -> AutoResolveOutcome {
        let mut sorted = captions.to_vec();
        sorted.sort_by_key(|c| c.start_time);

        let mut shifts = Vec::new();
        for i in 1..sorted.len() {
            let (prev_end, prev_id) = (sorted[i - 1].end_time, sorted[i - 1].id.clone());
            let next = &mut sorted[i];

            if next.start_time >= prev_end {
                continue;
            }

            let old_start = next.start_time;
            let old_end = next.end_time;
            next.start_time = prev_end;
            if next.end_time <= next.start_time {
                next.end_time = prev_end.saturating_add(old_end.since(old_start).max(1));
            }

            debug!(
                "Shifted caption {} start {} -> {} (after {})",
                next.id.short(),
                old_start,
                next.start_time,
                prev_id.short()
            );

            shifts.push(ShiftRecord {
                caption_id: next.id.clone(),
                old_start,
                new_start: next.start_time,
                old_end,
                new_end: next.end_time,
                caused_by: prev_id,
            });
        }

        for (i, caption) in sorted.iter_mut().enumerate() {
            caption.serial_number = i + 1;
        }

        AutoResolveOutcome {
            captions: sorted,
            shifts,
        }
    }

    fn overlap_error(sorted: &[Caption], conflict: &OverlapConflict) -> EngineError {
        let prev = &sorted[conflict.previous_index];
        let next = &sorted[conflict.index];
        EngineError::Overlap {
            index: conflict.index,
            serial_number: next.serial_number,
            message: format!(
                "Caption {} ({} - {}) overlaps caption {} ({} - {}) by {}s; move its start to {} or later",
                next.serial_number,
                next.start_time,
                next.end_time,
                prev.serial_number,
                prev.start_time,
                prev.end_time,
                conflict.overlap_secs,
                prev.end_time
            ),
        }
    }
}
