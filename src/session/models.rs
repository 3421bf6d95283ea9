/*!
 * Edit session state.
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::captions::model::{Caption, CaptionId, CaptionPatch};
use crate::playback::loop_controller::LoopState;

/// Why the session was opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditMode {
    /// The caption was just inserted; cancelling removes it
    Add,
    /// An existing caption; cancelling restores it
    Edit,
}

impl fmt::Display for EditMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditMode::Add => write!(f, "add"),
            EditMode::Edit => write!(f, "edit"),
        }
    }
}

impl FromStr for EditMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "add" => Ok(EditMode::Add),
            "edit" => Ok(EditMode::Edit),
            _ => Err(anyhow::anyhow!("Invalid edit mode: {}", s)),
        }
    }
}

/// Everything an open session needs to commit or roll back
#[derive(Debug, Clone, PartialEq)]
pub struct EditSnapshot {
    pub mode: EditMode,
    pub caption_id: CaptionId,
    /// The caption as it was when the session opened
    pub original: Caption,
    /// Accumulated field changes
    pub staged: CaptionPatch,
    /// Loop held before the session took over, armed or suspended
    pub prior_loop: LoopState,
}
