/*!
 * Tracks which caption should be on screen.
 */

use log::debug;

use super::transport::{usable_position, Transport};
use crate::captions::interval_set::IntervalSet;
use crate::captions::model::{Caption, CaptionId};

/// Change reported by a refresh
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayUpdate {
    /// Same caption (or none) as last time
    Unchanged,
    /// A different caption is now current
    Show(Caption),
    /// No caption covers the play head any more
    Clear,
    /// Player position unusable; nothing changed
    Skipped,
}

/// Remembers the caption last shown
#[derive(Debug, Clone, Default)]
pub struct DisplayTracker {
    current: Option<CaptionId>,
}

impl DisplayTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&CaptionId> {
        self.current.as_ref()
    }

    /// Forget the shown caption, e.g. after switching videos
    pub fn reset(&mut self) {
        self.current = None;
    }

    pub fn refresh(&mut self, set: &IntervalSet, transport: &dyn Transport) -> DisplayUpdate {
        let Some(position) = usable_position(transport) else {
            return DisplayUpdate::Skipped;
        };

        match set.caption_at(position) {
            Some(caption) if self.current.as_ref() == Some(&caption.id) => DisplayUpdate::Unchanged,
            Some(caption) => {
                debug!("Showing caption {} at {:.2}s", caption, position);
                self.current = Some(caption.id.clone());
                DisplayUpdate::Show(caption.clone())
            }
            None if self.current.is_some() => {
                self.current = None;
                DisplayUpdate::Clear
            }
            None => DisplayUpdate::Unchanged,
        }
    }
}
