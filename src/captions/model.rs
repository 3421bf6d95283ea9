/*!
 * Caption entities.
 *
 * A caption is a `[start, end)` interval with two lines of text, a row type
 * and a 1-based serial number assigned by its owning interval set.
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::errors::OrderError;
use crate::timecode::TimeValue;

/// Stable caption identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaptionId(String);

impl CaptionId {
    /// Fresh random identifier
    pub fn generate() -> Self {
        CaptionId(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First eight characters, for log lines
    pub fn short(&self) -> &str {
        let end = self.0.char_indices().nth(8).map(|(i, _)| i).unwrap_or(self.0.len());
        &self.0[..end]
    }
}

impl fmt::Display for CaptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CaptionId {
    fn from(s: &str) -> Self {
        CaptionId(s.to_string())
    }
}

impl From<String> for CaptionId {
    fn from(s: String) -> Self {
        CaptionId(s)
    }
}

/// What a caption row carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowType {
    /// Lyrics or dialogue
    #[default]
    Text,
    /// Chord symbols
    Chords,
    /// Generated automatically from a transcript
    AutoGen,
}

impl fmt::Display for RowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowType::Text => write!(f, "text"),
            RowType::Chords => write!(f, "chords"),
            RowType::AutoGen => write!(f, "auto_gen"),
        }
    }
}

impl std::str::FromStr for RowType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(RowType::Text),
            "chords" => Ok(RowType::Chords),
            "auto_gen" | "autogen" => Ok(RowType::AutoGen),
            _ => Err(anyhow::anyhow!("Invalid row type: {}", s)),
        }
    }
}

/// The media item a caption set belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaSubject {
    /// Identifier of the video in the store
    pub id: String,
    /// Length of the video, once the player knows it
    #[serde(default)]
    pub duration: Option<TimeValue>,
}

impl MediaSubject {
    pub fn new(id: impl Into<String>, duration: Option<TimeValue>) -> Self {
        Self {
            id: id.into(),
            duration,
        }
    }
}

/// A timed caption row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caption {
    pub id: CaptionId,
    pub start_time: TimeValue,
    pub end_time: TimeValue,
    #[serde(default)]
    pub lines: [String; 2],
    #[serde(default)]
    pub row_type: RowType,
    /// 1-based rank by start time; 0 until the owning set numbers it
    #[serde(default)]
    pub serial_number: usize,
}

impl Caption {
    /// Unnumbered caption with empty lines
    pub fn new(start_time: TimeValue, end_time: TimeValue, row_type: RowType) -> Self {
        Self {
            id: CaptionId::generate(),
            start_time,
            end_time,
            lines: [String::new(), String::new()],
            row_type,
            serial_number: 0,
        }
    }

    pub fn with_lines(mut self, first: impl Into<String>, second: impl Into<String>) -> Self {
        self.lines = [first.into(), second.into()];
        self
    }

    pub fn duration_secs(&self) -> u64 {
        self.end_time.since(self.start_time)
    }

    /// Whether a player position falls inside `[start, end)`
    pub fn covers(&self, position: f64) -> bool {
        position >= self.start_time.as_f64() && position < self.end_time.as_f64()
    }

    pub fn overlaps(&self, other: &Caption) -> bool {
        self.start_time < other.end_time && other.start_time < self.end_time
    }

    pub fn has_text(&self) -> bool {
        self.lines.iter().any(|l| !l.trim().is_empty())
    }

    /// Check `start < end` and the media bound
    pub fn check_order(&self, duration: Option<TimeValue>) -> Result<(), OrderError> {
        check_bounds(self.start_time, self.end_time, duration)
    }

    /// Values restorable by an edit cancel
    pub fn snapshot(&self) -> CaptionPatch {
        CaptionPatch {
            start_time: Some(self.start_time),
            end_time: Some(self.end_time),
            lines: Some(self.lines.clone()),
            row_type: Some(self.row_type),
        }
    }

    /// Copy with the patch applied; validation is left to the caller
    pub fn patched(&self, patch: &CaptionPatch) -> Caption {
        let mut next = self.clone();
        if let Some(start) = patch.start_time {
            next.start_time = start;
        }
        if let Some(end) = patch.end_time {
            next.end_time = end;
        }
        if let Some(lines) = &patch.lines {
            next.lines = lines.clone();
        }
        if let Some(row_type) = patch.row_type {
            next.row_type = row_type;
        }
        next
    }
}

impl fmt::Display for Caption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} [{} - {}]",
            self.serial_number, self.start_time, self.end_time
        )
    }
}

/// Validate an interval against ordering and the media length
pub fn check_bounds(
    start: TimeValue,
    end: TimeValue,
    duration: Option<TimeValue>,
) -> Result<(), OrderError> {
    if start >= end {
        return Err(OrderError::StartNotBeforeEnd { start, end });
    }
    if let Some(duration) = duration {
        if end > duration {
            return Err(OrderError::BeyondDuration { end, duration });
        }
    }
    Ok(())
}

/// Partial update of a caption's editable fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptionPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<TimeValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<TimeValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lines: Option<[String; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_type: Option<RowType>,
}

impl CaptionPatch {
    pub fn start(start: TimeValue) -> Self {
        Self {
            start_time: Some(start),
            ..Default::default()
        }
    }

    pub fn end(end: TimeValue) -> Self {
        Self {
            end_time: Some(end),
            ..Default::default()
        }
    }

    pub fn lines(first: impl Into<String>, second: impl Into<String>) -> Self {
        Self {
            lines: Some([first.into(), second.into()]),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start_time.is_none()
            && self.end_time.is_none()
            && self.lines.is_none()
            && self.row_type.is_none()
    }

    /// Layer `other` on top of `self`; later fields win
    pub fn merge(&mut self, other: CaptionPatch) {
        if other.start_time.is_some() {
            self.start_time = other.start_time;
        }
        if other.end_time.is_some() {
            self.end_time = other.end_time;
        }
        if other.lines.is_some() {
            self.lines = other.lines;
        }
        if other.row_type.is_some() {
            self.row_type = other.row_type;
        }
    }
}
