/*!
 * The ordered caption collection for one media item.
 *
 * Every mutation leaves the captions sorted by start time and numbered
 * 1..N. Insertions never create overlaps; `update` and `shift` may, and the
 * caller runs the conflict resolver before persisting.
 */

use log::{debug, warn};
use std::collections::HashSet;

use super::model::{check_bounds, Caption, CaptionId, CaptionPatch, MediaSubject, RowType};
use crate::errors::{EngineError, EngineResult, OrderError};
use crate::timecode::TimeValue;

/// Span of a freshly appended caption
pub const DEFAULT_SPAN_SECS: u64 = 10;

/// Gap left before the next caption on a playhead insert
pub const DEFAULT_PLAYHEAD_GAP_SECS: u64 = 1;

/// Sizes used when new captions are created
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertPolicy {
    pub default_span_secs: u64,
    pub playhead_gap_secs: u64,
}

impl Default for InsertPolicy {
    fn default() -> Self {
        Self {
            default_span_secs: DEFAULT_SPAN_SECS,
            playhead_gap_secs: DEFAULT_PLAYHEAD_GAP_SECS,
        }
    }
}

/// Captions of a single media item
#[derive(Debug, Clone)]
pub struct IntervalSet {
    subject: MediaSubject,
    captions: Vec<Caption>,
    /// Ids the store already knows about
    persisted: HashSet<CaptionId>,
    policy: InsertPolicy,
}

impl IntervalSet {
    /// Empty set for a subject
    pub fn new(subject: MediaSubject) -> Self {
        Self::with_policy(subject, InsertPolicy::default())
    }

    pub fn with_policy(subject: MediaSubject, policy: InsertPolicy) -> Self {
        Self {
            subject,
            captions: Vec::new(),
            persisted: HashSet::new(),
            policy,
        }
    }

    /// Set populated from the store; every caption is marked persisted
    pub fn from_loaded(subject: MediaSubject, captions: Vec<Caption>, policy: InsertPolicy) -> Self {
        let mut set = Self::with_policy(subject, policy);
        set.persisted = captions.iter().map(|c| c.id.clone()).collect();
        set.captions = captions;
        set.renumber();

        let overlaps = set
            .captions
            .windows(2)
            .filter(|pair| pair[0].end_time > pair[1].start_time)
            .count();
        if overlaps > 0 {
            warn!(
                "Loaded {} captions for {} with {} overlapping pairs",
                set.captions.len(),
                set.subject.id,
                overlaps
            );
        }

        set
    }

    pub fn subject(&self) -> &MediaSubject {
        &self.subject
    }

    pub fn policy(&self) -> InsertPolicy {
        self.policy
    }

    /// Record the media length once the player reports it
    pub fn set_duration(&mut self, duration: Option<TimeValue>) {
        self.subject.duration = duration;
    }

    pub fn captions(&self) -> &[Caption] {
        &self.captions
    }

    pub fn len(&self) -> usize {
        self.captions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.captions.is_empty()
    }

    pub fn get(&self, id: &CaptionId) -> Option<&Caption> {
        self.captions.iter().find(|c| &c.id == id)
    }

    pub fn get_by_serial(&self, serial_number: usize) -> Option<&Caption> {
        self.captions.iter().find(|c| c.serial_number == serial_number)
    }

    /// Temporally last caption (highest serial number)
    pub fn last(&self) -> Option<&Caption> {
        self.captions.iter().max_by_key(|c| c.serial_number)
    }

    pub fn is_last(&self, id: &CaptionId) -> bool {
        self.last().map(|c| &c.id == id).unwrap_or(false)
    }

    /// Caption covering a player position
    pub fn caption_at(&self, position: f64) -> Option<&Caption> {
        self.captions.iter().find(|c| c.covers(position))
    }

    pub fn is_persisted(&self, id: &CaptionId) -> bool {
        self.persisted.contains(id)
    }

    pub fn mark_persisted(&mut self, id: &CaptionId) {
        self.persisted.insert(id.clone());
    }

    fn index_of(&self, id: &CaptionId) -> EngineResult<usize> {
        self.captions
            .iter()
            .position(|c| &c.id == id)
            .ok_or_else(|| EngineError::CaptionNotFound(id.to_string()))
    }

    // =========================================================================
    // Insertion
    // =========================================================================

    /// Insert a new caption after the one numbered `serial_number`
    pub fn insert_after(&mut self, serial_number: usize, row_type: RowType) -> EngineResult<Caption> {
        let target = self
            .get_by_serial(serial_number)
            .ok_or(EngineError::SerialNotFound(serial_number))?
            .clone();

        let created = if self.is_last(&target.id) {
            self.append_after(&target, Caption::new(TimeValue::ZERO, TimeValue::ZERO, row_type))?
        } else {
            self.split(&target.id, Caption::new(TimeValue::ZERO, TimeValue::ZERO, row_type))?
        };

        debug!("Inserted {} after caption {}", created, serial_number);
        Ok(created)
    }

    /// Split a caption in two, the copy taking the second half
    pub fn duplicate(&mut self, id: &CaptionId) -> EngineResult<Caption> {
        let source = self.captions[self.index_of(id)?].clone();

        let mut copy = Caption::new(TimeValue::ZERO, TimeValue::ZERO, source.row_type);
        copy.lines = source.lines.clone();

        let created = self.split(id, copy)?;
        debug!("Duplicated caption {} into {}", source.serial_number, created);
        Ok(created)
    }

    /// Insert a caption starting at the play head
    pub fn insert_at_playhead(&mut self, current_time: f64, row_type: RowType) -> EngineResult<Caption> {
        let at = TimeValue::from_position(current_time);

        if let Some(duration) = self.subject.duration {
            if at >= duration {
                return Err(OrderError::NoRoom {
                    at,
                    detail: "the play head is at the end of the video".to_string(),
                }
                .into());
            }
        }

        let covering = self.captions.iter().find(|c| c.covers(at.as_f64())).cloned();
        let next_start = self
            .captions
            .iter()
            .filter(|c| c.start_time > at)
            .map(|c| c.start_time)
            .min();

        let end = match &covering {
            Some(covering) => {
                if covering.start_time == at {
                    return Err(OrderError::NoRoom {
                        at,
                        detail: format!(
                            "caption {} already starts here; insert after it instead",
                            covering.serial_number
                        ),
                    }
                    .into());
                }

                if self.is_last(&covering.id) {
                    at.saturating_add(self.policy.default_span_secs)
                } else {
                    // `next_start` exists because the covering caption is not last
                    let next_start = next_start.unwrap_or(covering.end_time);
                    let gapped = next_start.saturating_sub(self.policy.playhead_gap_secs);
                    if gapped > at { gapped } else { next_start }
                }
            }
            None => {
                let span_end = at.saturating_add(self.policy.default_span_secs);
                match next_start {
                    Some(next) => span_end.min(next),
                    None => span_end,
                }
            }
        };

        let end = self.clamp_to_duration(end);
        check_bounds(at, end, self.subject.duration)?;

        if let Some(covering) = covering {
            let idx = self.index_of(&covering.id)?;
            self.captions[idx].end_time = at;
        }

        let caption = Caption::new(at, end, row_type);
        let id = caption.id.clone();
        self.captions.push(caption);
        self.renumber();

        let created = self.captions[self.index_of(&id)?].clone();
        debug!("Inserted {} at play head {:.1}s", created, current_time);
        Ok(created)
    }

    /// New caption in `[target.end, target.end + span)`
    fn append_after(&mut self, target: &Caption, mut caption: Caption) -> EngineResult<Caption> {
        let start = target.end_time;
        let end = self.clamp_to_duration(start.saturating_add(self.policy.default_span_secs));

        if start >= end {
            return Err(OrderError::NoRoom {
                at: start,
                detail: "caption already reaches the end of the video".to_string(),
            }
            .into());
        }

        caption.start_time = start;
        caption.end_time = end;
        let id = caption.id.clone();
        self.captions.push(caption);
        self.renumber();

        Ok(self.captions[self.index_of(&id)?].clone())
    }

    /// Halve the target and give the second half to `caption`
    fn split(&mut self, id: &CaptionId, mut caption: Caption) -> EngineResult<Caption> {
        let idx = self.index_of(id)?;
        let target = &self.captions[idx];
        let duration = target.duration_secs();

        if duration < 2 {
            return Err(OrderError::TooShortToSplit {
                serial_number: target.serial_number,
                duration_secs: duration,
            }
            .into());
        }

        let original_end = target.end_time;
        let new_end = target.start_time.saturating_add(duration / 2);

        self.captions[idx].end_time = new_end;
        caption.start_time = new_end;
        caption.end_time = original_end;

        let new_id = caption.id.clone();
        self.captions.push(caption);
        self.renumber();

        Ok(self.captions[self.index_of(&new_id)?].clone())
    }

    fn clamp_to_duration(&self, end: TimeValue) -> TimeValue {
        match self.subject.duration {
            Some(duration) => end.min(duration),
            None => end,
        }
    }

    // =========================================================================
    // Removal
    // =========================================================================

    pub fn delete(&mut self, id: &CaptionId) -> EngineResult<Caption> {
        let idx = self.index_of(id)?;
        let removed = self.captions.remove(idx);
        self.persisted.remove(id);
        self.renumber();
        debug!("Deleted caption {}", removed);
        Ok(removed)
    }

    pub fn delete_all(&mut self) -> Vec<Caption> {
        self.persisted.clear();
        let removed = std::mem::take(&mut self.captions);
        self.renumber();
        debug!("Deleted all {} captions of {}", removed.len(), self.subject.id);
        removed
    }

    // =========================================================================
    // Edits
    // =========================================================================

    /// Apply field changes; overlaps are left for the conflict resolver
    pub fn update(&mut self, id: &CaptionId, patch: &CaptionPatch) -> EngineResult<Caption> {
        let idx = self.index_of(id)?;
        let next = self.captions[idx].patched(patch);
        next.check_order(self.subject.duration)?;

        self.captions[idx] = next;
        self.renumber();
        Ok(self.captions[self.index_of(id)?].clone())
    }

    /// Move a caption by `delta_secs`, keeping its duration
    pub fn shift(&mut self, id: &CaptionId, delta_secs: i64) -> EngineResult<Caption> {
        let idx = self.index_of(id)?;
        let current = &self.captions[idx];

        let (Some(start), Some(end)) = (
            current.start_time.checked_offset(delta_secs),
            current.end_time.checked_offset(delta_secs),
        ) else {
            return Err(OrderError::BeforeZero {
                serial_number: current.serial_number,
            }
            .into());
        };
        check_bounds(start, end, self.subject.duration)?;

        self.captions[idx].start_time = start;
        self.captions[idx].end_time = end;
        self.renumber();
        Ok(self.captions[self.index_of(id)?].clone())
    }

    /// Swap in a whole new caption list, e.g. an auto-resolved one
    pub fn replace_all(&mut self, captions: Vec<Caption>) {
        self.captions = captions;
        self.renumber();
    }

    /// Stable sort by start time, then number 1..N
    pub fn renumber(&mut self) {
        self.captions.sort_by_key(|c| c.start_time);
        for (i, caption) in self.captions.iter_mut().enumerate() {
            caption.serial_number = i + 1;
        }
    }
}
