/*!
 * Persistence contract for captions.
 *
 * The engine never assumes a particular backend. Anything that can load,
 * create, update and delete captions by id implements `CaptionStore`; the
 * crate ships an in-memory store and a SQLite repository
 * (`database::Repository`).
 */

use async_trait::async_trait;
use log::debug;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use crate::captions::model::{Caption, CaptionId, RowType};
use crate::errors::StoreError;
use crate::timecode::TimeValue;

/// Fields written by an update call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptionUpdate {
    pub start_time: Option<TimeValue>,
    pub end_time: Option<TimeValue>,
    pub lines: Option<[String; 2]>,
    pub row_type: Option<RowType>,
    pub serial_number: Option<usize>,
}

impl CaptionUpdate {
    /// Every field of the caption
    pub fn full(caption: &Caption) -> Self {
        Self {
            start_time: Some(caption.start_time),
            end_time: Some(caption.end_time),
            lines: Some(caption.lines.clone()),
            row_type: Some(caption.row_type),
            serial_number: Some(caption.serial_number),
        }
    }

    pub fn apply_to(&self, caption: &mut Caption) {
        if let Some(start) = self.start_time {
            caption.start_time = start;
        }
        if let Some(end) = self.end_time {
            caption.end_time = end;
        }
        if let Some(lines) = &self.lines {
            caption.lines = lines.clone();
        }
        if let Some(row_type) = self.row_type {
            caption.row_type = row_type;
        }
        if let Some(serial) = self.serial_number {
            caption.serial_number = serial;
        }
    }
}

/// Asynchronous caption persistence
///
/// Implementations must not partially apply a failed call.
#[async_trait]
pub trait CaptionStore: Send + Sync + Debug {
    /// All captions stored for a video, in any order
    async fn load_captions(&self, subject_id: &str) -> Result<Vec<Caption>, StoreError>;

    /// Create a caption under a video; returns what was stored
    async fn save_caption(&self, subject_id: &str, caption: &Caption) -> Result<Caption, StoreError>;

    /// Update fields of an existing caption; returns the stored result
    async fn update_caption(&self, id: &CaptionId, update: &CaptionUpdate) -> Result<Caption, StoreError>;

    /// Remove a caption; `false` when it did not exist
    async fn delete_caption(&self, id: &CaptionId) -> Result<bool, StoreError>;
}

/// Process-local store, used by tests and the CLI
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Arc<RwLock<HashMap<CaptionId, (String, Caption)>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of captions held for a video
    pub fn count_for(&self, subject_id: &str) -> usize {
        self.records
            .read()
            .values()
            .filter(|(subject, _)| subject == subject_id)
            .count()
    }

    pub fn get(&self, id: &CaptionId) -> Option<Caption> {
        self.records.read().get(id).map(|(_, c)| c.clone())
    }
}

#[async_trait]
impl CaptionStore for MemoryStore {
    async fn load_captions(&self, subject_id: &str) -> Result<Vec<Caption>, StoreError> {
        let records = self.records.read();
        let captions: Vec<Caption> = records
            .values()
            .filter(|(subject, _)| subject == subject_id)
            .map(|(_, c)| c.clone())
            .collect();
        debug!("Memory store returned {} captions for {}", captions.len(), subject_id);
        Ok(captions)
    }

    async fn save_caption(&self, subject_id: &str, caption: &Caption) -> Result<Caption, StoreError> {
        let mut records = self.records.write();
        if records.contains_key(&caption.id) {
            return Err(StoreError::Conflict(format!(
                "caption {} already exists",
                caption.id
            )));
        }
        records.insert(caption.id.clone(), (subject_id.to_string(), caption.clone()));
        Ok(caption.clone())
    }

    async fn update_caption(&self, id: &CaptionId, update: &CaptionUpdate) -> Result<Caption, StoreError> {
        let mut records = self.records.write();
        let (_, stored) = records
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        update.apply_to(stored);
        Ok(stored.clone())
    }

    async fn delete_caption(&self, id: &CaptionId) -> Result<bool, StoreError> {
        Ok(self.records.write().remove(id).is_some())
    }
}
