/*!
 * Common test utilities for the caploop test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use caploop::captions::{Caption, CaptionDocument, MediaSubject, RowType};
use caploop::timecode::TimeValue;

// Re-export the mock player and store
pub mod mock_transport;

/// Route engine logs through env_logger once per test binary
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

pub fn secs(s: u64) -> TimeValue {
    TimeValue::from_secs(s)
}

/// Caption with one line of text
pub fn caption(start: u64, end: u64, text: &str) -> Caption {
    Caption::new(secs(start), secs(end), RowType::Text).with_lines(text, "")
}

/// A three-verse document for a 2 minute video
pub fn sample_document() -> CaptionDocument {
    CaptionDocument {
        subject: MediaSubject::new("song-1", Some(secs(120))),
        captions: vec![
            caption(0, 10, "First verse"),
            caption(10, 20, "Second verse"),
            caption(30, 45, "Chorus"),
        ],
    }
}

/// Writes `sample_document` as JSON and returns its path
pub fn create_test_document(dir: &Path, filename: &str) -> Result<PathBuf> {
    let path = dir.join(filename);
    sample_document().save(&path)?;
    Ok(path)
}
