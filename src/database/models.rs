/*!
 * Database entity models.
 *
 * These structures map directly to database rows and convert to and from
 * the engine's caption types.
 */

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::captions::model::{Caption, CaptionId, MediaSubject, RowType};
use crate::timecode::TimeValue;

/// Video record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectRecord {
    /// External video id
    pub id: String,
    /// Media length in whole seconds, when known
    pub duration_secs: Option<i64>,
    /// Creation timestamp (ISO 8601)
    pub created_at: String,
}

impl SubjectRecord {
    pub fn new(id: impl Into<String>, duration_secs: Option<i64>) -> Self {
        Self {
            id: id.into(),
            duration_secs,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn from_subject(subject: &MediaSubject) -> Self {
        Self::new(
            subject.id.clone(),
            subject.duration.map(|d| d.as_secs() as i64),
        )
    }

    pub fn to_subject(&self) -> MediaSubject {
        MediaSubject::new(
            self.id.clone(),
            self.duration_secs
                .filter(|d| *d > 0)
                .map(|d| TimeValue::from_secs(d as u64)),
        )
    }
}

/// Caption row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptionRecord {
    /// Caption id (UUID)
    pub id: String,
    /// Video the caption belongs to
    pub subject_id: String,
    /// Start in whole seconds
    pub start_secs: i64,
    /// End in whole seconds
    pub end_secs: i64,
    pub line1: String,
    pub line2: String,
    /// Row kind as stored text (`text`, `chords`, `auto_gen`)
    pub row_type: String,
    pub serial_number: i64,
    /// Creation timestamp (ISO 8601)
    pub created_at: String,
    /// Last update timestamp (ISO 8601)
    pub updated_at: String,
}

impl CaptionRecord {
    /// Row for a caption that is about to be inserted
    pub fn from_caption(subject_id: &str, caption: &Caption) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        let [line1, line2] = caption.lines.clone();
        Self {
            id: caption.id.to_string(),
            subject_id: subject_id.to_string(),
            start_secs: caption.start_time.as_secs() as i64,
            end_secs: caption.end_time.as_secs() as i64,
            line1,
            line2,
            row_type: caption.row_type.to_string(),
            serial_number: caption.serial_number as i64,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Convert back into an engine caption
    pub fn to_caption(&self) -> Result<Caption> {
        if self.start_secs < 0 || self.end_secs < 0 {
            return Err(anyhow!(
                "Caption {} has negative times ({} - {})",
                self.id,
                self.start_secs,
                self.end_secs
            ));
        }
        let row_type: RowType = self.row_type.parse()?;

        Ok(Caption {
            id: CaptionId::from(self.id.as_str()),
            start_time: TimeValue::from_secs(self.start_secs as u64),
            end_time: TimeValue::from_secs(self.end_secs as u64),
            lines: [self.line1.clone(), self.line2.clone()],
            row_type,
            serial_number: self.serial_number.max(0) as usize,
        })
    }
}
