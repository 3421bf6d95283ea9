/*!
 * Per-caption timing report.
 *
 * Where the conflict resolver stops at the first blocking problem, this
 * validator walks the whole set and lists every issue:
 * - start not before end
 * - end past the media duration
 * - overlap with the preceding caption
 * - rows without any text (warning)
 * - long silent gaps (warning, optional)
 */

use log::debug;

use crate::captions::model::{Caption, MediaSubject};
use crate::timecode::TimeValue;

/// Result of validation for a single caption
#[derive(Debug, Clone)]
pub struct CaptionCheck {
    /// Serial number of the caption
    pub serial_number: usize,
    /// Whether the caption passed (warnings do not fail it)
    pub passed: bool,
    /// Issues found
    pub issues: Vec<TimingIssue>,
}

impl CaptionCheck {
    fn new(serial_number: usize) -> Self {
        Self {
            serial_number,
            passed: true,
            issues: vec![],
        }
    }

    fn push(&mut self, issue: TimingIssue) {
        if issue.is_blocking() {
            self.passed = false;
        }
        self.issues.push(issue);
    }
}

/// Types of timing issues
#[derive(Debug, Clone, PartialEq)]
pub enum TimingIssue {
    /// Start is not before end
    InvalidTimeRange {
        start: TimeValue,
        end: TimeValue,
    },
    /// End is past the end of the video
    BeyondDuration {
        end: TimeValue,
        duration: TimeValue,
    },
    /// Overlaps with the preceding caption
    OverlapsWithCaption {
        other_serial: usize,
        overlap_secs: u64,
    },
    /// Neither line has text
    EmptyText,
    /// Gap too large after the previous caption
    LargeGap {
        prev_serial: usize,
        gap_secs: u64,
    },
}

impl TimingIssue {
    /// Whether the issue prevents saving
    pub fn is_blocking(&self) -> bool {
        !matches!(self, TimingIssue::EmptyText | TimingIssue::LargeGap { .. })
    }
}

impl std::fmt::Display for TimingIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimingIssue::InvalidTimeRange { start, end } => {
                write!(f, "Start {} is not before end {}", start, end)
            }
            TimingIssue::BeyondDuration { end, duration } => {
                write!(f, "Ends at {}, past the end of the video ({})", end, duration)
            }
            TimingIssue::OverlapsWithCaption { other_serial, overlap_secs } => {
                write!(f, "Overlaps caption {} by {}s", other_serial, overlap_secs)
            }
            TimingIssue::EmptyText => write!(f, "Has no text"),
            TimingIssue::LargeGap { prev_serial, gap_secs } => {
                write!(f, "Starts {}s after caption {} ends", gap_secs, prev_serial)
            }
        }
    }
}

/// Result of validating a whole caption set
#[derive(Debug, Clone)]
pub struct TimingReport {
    /// Overall pass/fail status
    pub passed: bool,
    /// Results for each caption, in start order
    pub checks: Vec<CaptionCheck>,
    /// Total number of issues, warnings included
    pub total_issues: usize,
    /// Number of overlapping pairs
    pub overlap_count: usize,
}

impl TimingReport {
    pub fn failed_captions(&self) -> Vec<&CaptionCheck> {
        self.checks.iter().filter(|c| !c.passed).collect()
    }
}

/// Configuration for timing validation
#[derive(Debug, Clone)]
pub struct TimingValidatorConfig {
    /// Whether to check for overlaps
    pub check_overlaps: bool,
    /// Whether empty rows are reported
    pub warn_empty_text: bool,
    /// Maximum gap in seconds before warning (0 = disable)
    pub max_gap_warning_secs: u64,
}

impl Default for TimingValidatorConfig {
    fn default() -> Self {
        Self {
            check_overlaps: true,
            warn_empty_text: true,
            max_gap_warning_secs: 0,
        }
    }
}

/// Timing validator for caption sets
#[derive(Debug, Clone, Default)]
pub struct TimingValidator {
    config: TimingValidatorConfig,
}

impl TimingValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: TimingValidatorConfig) -> Self {
        Self { config }
    }

    /// Checks that need only the caption itself
    pub fn validate_caption(&self, caption: &Caption, subject: &MediaSubject) -> CaptionCheck {
        let mut check = CaptionCheck::new(caption.serial_number);

        if caption.start_time >= caption.end_time {
            check.push(TimingIssue::InvalidTimeRange {
                start: caption.start_time,
                end: caption.end_time,
            });
        }

        if let Some(duration) = subject.duration {
            if caption.end_time > duration {
                check.push(TimingIssue::BeyondDuration {
                    end: caption.end_time,
                    duration,
                });
            }
        }

        if self.config.warn_empty_text && !caption.has_text() {
            check.push(TimingIssue::EmptyText);
        }

        check
    }

    /// Validate every caption, sorted by start time
    pub fn validate(&self, subject: &MediaSubject, captions: &[Caption]) -> TimingReport {
        let mut sorted: Vec<&Caption> = captions.iter().collect();
        sorted.sort_by_key(|c| c.start_time);

        let mut checks: Vec<CaptionCheck> = sorted
            .iter()
            .map(|c| self.validate_caption(c, subject))
            .collect();

        let mut overlap_count = 0;
        for i in 1..sorted.len() {
            let (prev, next) = (sorted[i - 1], sorted[i]);

            if self.config.check_overlaps && prev.end_time > next.start_time {
                overlap_count += 1;
                checks[i].push(TimingIssue::OverlapsWithCaption {
                    other_serial: prev.serial_number,
                    overlap_secs: prev.end_time.since(next.start_time),
                });
            }

            if self.config.max_gap_warning_secs > 0 && next.start_time > prev.end_time {
                let gap_secs = next.start_time.since(prev.end_time);
                if gap_secs > self.config.max_gap_warning_secs {
                    checks[i].push(TimingIssue::LargeGap {
                        prev_serial: prev.serial_number,
                        gap_secs,
                    });
                }
            }
        }

        let total_issues: usize = checks.iter().map(|c| c.issues.len()).sum();
        let passed = checks.iter().all(|c| c.passed);

        debug!(
            "Timing validation: {} captions, {} issues, {} overlaps",
            captions.len(),
            total_issues,
            overlap_count
        );

        TimingReport {
            passed,
            checks,
            total_issues,
            overlap_count,
        }
    }
}
