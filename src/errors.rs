/*!
 * Error types for the caploop engine.
 *
 * Every failure in the engine is local to one operation and recoverable:
 * the caller re-prompts, fixes the offending row, or retries the store call.
 * Errors are defined with the thiserror crate.
 */

use thiserror::Error;

use crate::timecode::TimeValue;

/// A time string that could not be parsed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid time '{input}': {reason}{}", suggestion_suffix(.suggestion))]
pub struct TimeFormatError {
    /// The rejected input
    pub input: String,
    /// Why it was rejected
    pub reason: String,
    /// Nearest valid value in canonical form, when one exists
    pub suggestion: Option<String>,
}

fn suggestion_suffix(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(s) => format!(". Did you mean {}?", s),
        None => ". Use M:SS or H:MM:SS".to_string(),
    }
}

/// Violations of interval ordering or media bounds
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    /// Start is not strictly before end
    #[error("Start time {start} must be before end time {end}")]
    StartNotBeforeEnd {
        start: TimeValue,
        end: TimeValue,
    },

    /// End lies past the end of the media
    #[error("End time {end} is past the end of the video ({duration})")]
    BeyondDuration {
        end: TimeValue,
        duration: TimeValue,
    },

    /// A move would place the start before zero
    #[error("Cannot move caption {serial_number} before 0:00")]
    BeforeZero {
        serial_number: usize,
    },

    /// A caption is too short to be split in half
    #[error("Caption {serial_number} is only {duration_secs}s long and cannot be split")]
    TooShortToSplit {
        serial_number: usize,
        duration_secs: u64,
    },

    /// There is no free time left at the requested point
    #[error("No room for a new caption at {at}: {detail}")]
    NoRoom {
        at: TimeValue,
        detail: String,
    },
}

/// Errors raised by a caption store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The record does not exist in the store
    #[error("Caption not found in store: {0}")]
    NotFound(String),

    /// The backend failed (I/O, database, network)
    #[error("Store backend failed: {0}")]
    Backend(String),

    /// The store refused the write
    #[error("Store rejected the write: {0}")]
    Conflict(String),
}

impl From<anyhow::Error> for StoreError {
    fn from(error: anyhow::Error) -> Self {
        Self::Backend(error.to_string())
    }
}

/// Errors returned by engine operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Unparseable or out-of-range time string
    #[error("{0}")]
    Format(#[from] TimeFormatError),

    /// Start/end ordering or bounds violation
    #[error("{0}")]
    Order(#[from] OrderError),

    /// Two captions overlap; `index` is the later caption's position in start order
    #[error("{message}")]
    Overlap {
        index: usize,
        serial_number: usize,
        message: String,
    },

    /// The media player cannot answer right now
    #[error("Player is not ready: {0}")]
    TransportUnavailable(String),

    /// A persistence call failed; nothing was applied
    #[error("Could not save changes: {0}")]
    Store(#[from] StoreError),

    /// The access gate refused the operation
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// No caption with this id in the current set
    #[error("No caption with id {0}")]
    CaptionNotFound(String),

    /// No caption with this serial number in the current set
    #[error("No caption number {0}")]
    SerialNotFound(usize),

    /// An edit session is already open
    #[error("Caption {0} is already being edited; save or cancel it first")]
    SessionAlreadyOpen(usize),

    /// An operation needed an open edit session
    #[error("No caption is being edited")]
    NoOpenSession,

    /// An operation needed an active media item
    #[error("No video is selected")]
    NoSubject,

    /// Loop activation without a region
    #[error("No loop region has been set")]
    NoLoopRegion,
}

/// Errors surfaced by the command line front end
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from the caption engine
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}

/// Shorthand used across the engine
pub type EngineResult<T> = std::result::Result<T, EngineError>;
