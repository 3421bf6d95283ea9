/*!
 * Caption documents on disk.
 *
 * A document is the JSON form of one subject and its captions. It can be
 * exported to SRT for use outside the watch view.
 */

use anyhow::{Context, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::{BufReader, Write};
use std::path::Path;

use super::interval_set::{InsertPolicy, IntervalSet};
use super::model::{Caption, MediaSubject};

/// Serializable subject plus captions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptionDocument {
    pub subject: MediaSubject,
    #[serde(default)]
    pub captions: Vec<Caption>,
}

impl CaptionDocument {
    pub fn from_set(set: &IntervalSet) -> Self {
        Self {
            subject: set.subject().clone(),
            captions: set.captions().to_vec(),
        }
    }

    /// Sorted and numbered interval set built from the document
    pub fn into_set(self, policy: InsertPolicy) -> IntervalSet {
        IntervalSet::from_loaded(self.subject, self.captions, policy)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open caption file: {}", path.display()))?;
        let document: CaptionDocument = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse caption file: {}", path.display()))?;

        debug!(
            "Loaded {} captions for {} from {}",
            document.captions.len(),
            document.subject.id,
            path.display()
        );
        Ok(document)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
            }
        }

        let json = serde_json::to_string_pretty(self).context("Failed to serialize captions")?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write caption file: {}", path.display()))?;
        Ok(())
    }

    /// SRT text for the captions, in start order
    pub fn to_srt(&self) -> String {
        let mut sorted: Vec<&Caption> = self.captions.iter().collect();
        sorted.sort_by_key(|c| c.start_time);

        let mut out = String::new();
        let mut written = 0usize;
        for caption in sorted {
            let text: Vec<&str> = caption
                .lines
                .iter()
                .map(|l| l.trim())
                .filter(|l| !l.is_empty())
                .collect();
            if text.is_empty() {
                continue;
            }

            written += 1;
            let _ = writeln!(out, "{}", written);
            let _ = writeln!(
                out,
                "{} --> {}",
                srt_timestamp(caption.start_time.as_secs()),
                srt_timestamp(caption.end_time.as_secs())
            );
            let _ = writeln!(out, "{}", text.join("\n"));
            let _ = writeln!(out);
        }

        let skipped = self.captions.len() - written;
        if skipped > 0 {
            warn!("Skipped {} captions without text in SRT export", skipped);
        }
        out
    }

    pub fn write_srt<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut file = File::create(path)
            .with_context(|| format!("Failed to create subtitle file: {}", path.display()))?;
        file.write_all(self.to_srt().as_bytes())?;
        Ok(())
    }
}

/// Format whole seconds as an SRT timestamp (HH:MM:SS,mmm)
pub fn srt_timestamp(secs: u64) -> String {
    let hours = secs / 3_600;
    let minutes = (secs % 3_600) / 60;
    let seconds = secs % 60;
    format!("{:02}:{:02}:{:02},000", hours, minutes, seconds)
}
