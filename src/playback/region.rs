/*!
 * Loop intervals.
 */

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::captions::model::{check_bounds, Caption, CaptionId};
use crate::errors::EngineResult;
use crate::timecode::{self, TimeValue};

/// Where the active interval came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntervalSource {
    /// The user-defined loop region
    Region,
    /// A caption being edited
    Caption(CaptionId),
}

/// Bounds held in the loop controller's single slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveInterval {
    pub source: IntervalSource,
    pub start: TimeValue,
    pub end: TimeValue,
}

impl ActiveInterval {
    pub fn for_caption(caption: &Caption) -> Self {
        Self {
            source: IntervalSource::Caption(caption.id.clone()),
            start: caption.start_time,
            end: caption.end_time,
        }
    }

    pub fn is_caption(&self, id: &CaptionId) -> bool {
        matches!(&self.source, IntervalSource::Caption(c) if c == id)
    }
}

impl fmt::Display for ActiveInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            IntervalSource::Region => write!(f, "loop [{} - {}]", self.start, self.end),
            IntervalSource::Caption(id) => {
                write!(f, "caption {} [{} - {}]", id.short(), self.start, self.end)
            }
        }
    }
}

/// User-defined loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopRegion {
    pub start_time: TimeValue,
    pub end_time: TimeValue,
    pub active: bool,
}

impl LoopRegion {
    /// Inactive region with validated bounds
    pub fn new(start_time: TimeValue, end_time: TimeValue, duration: Option<TimeValue>) -> EngineResult<Self> {
        check_bounds(start_time, end_time, duration)?;
        Ok(Self {
            start_time,
            end_time,
            active: false,
        })
    }

    /// Region from user-typed times
    pub fn parse(start: &str, end: &str, duration: Option<TimeValue>) -> EngineResult<Self> {
        let start_time = timecode::parse(start)?;
        let end_time = timecode::parse(end)?;
        Self::new(start_time, end_time, duration)
    }

    pub fn interval(&self) -> ActiveInterval {
        ActiveInterval {
            source: IntervalSource::Region,
            start: self.start_time,
            end: self.end_time,
        }
    }
}
