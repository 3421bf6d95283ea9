/*!
 * Time parsing and formatting for caption boundaries.
 *
 * Times are whole seconds. The canonical text form depends on magnitude:
 * `M:SS` below one hour and `H:MM:SS` from one hour on. Parsing accepts
 * exactly two or three colon-separated numeric fields; anything else is
 * rejected with a suggestion pointing at the nearest valid value.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::errors::TimeFormatError;

static TIME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+):(\d+)(?::(\d+))?$").expect("time pattern is valid")
});

static BARE_NUMBER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d+$").expect("number pattern is valid")
});

const SECS_PER_MINUTE: u64 = 60;
const SECS_PER_HOUR: u64 = 3_600;
const MAX_HOURS: u64 = 99;

/// A point on the media timeline, in whole seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TimeValue(u64);

impl TimeValue {
    /// 0:00
    pub const ZERO: TimeValue = TimeValue(0);

    /// Largest value the parser accepts (99:59:59)
    pub const MAX: TimeValue = TimeValue(MAX_HOURS * SECS_PER_HOUR + 59 * SECS_PER_MINUTE + 59);

    pub const fn from_secs(secs: u64) -> Self {
        TimeValue(secs)
    }

    pub const fn as_secs(self) -> u64 {
        self.0
    }

    /// Whole seconds of a player position; negative and non-finite positions map to zero
    pub fn from_position(position: f64) -> Self {
        if position.is_finite() && position > 0.0 {
            TimeValue(position.floor() as u64)
        } else {
            TimeValue::ZERO
        }
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64
    }

    pub fn saturating_add(self, secs: u64) -> Self {
        TimeValue(self.0.saturating_add(secs))
    }

    pub fn saturating_sub(self, secs: u64) -> Self {
        TimeValue(self.0.saturating_sub(secs))
    }

    /// Seconds from `earlier` to `self`, zero when `earlier` is later
    pub fn since(self, earlier: TimeValue) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    /// Shift by a signed number of seconds; `None` when the result would be negative
    pub fn checked_offset(self, delta_secs: i64) -> Option<Self> {
        if delta_secs >= 0 {
            self.0.checked_add(delta_secs as u64).map(TimeValue)
        } else {
            self.0.checked_sub(delta_secs.unsigned_abs()).map(TimeValue)
        }
    }

    /// Canonical text form
    pub fn format(self) -> String {
        format(self.0)
    }
}

impl fmt::Display for TimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format(self.0))
    }
}

impl FromStr for TimeValue {
    type Err = TimeFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

impl From<u64> for TimeValue {
    fn from(secs: u64) -> Self {
        TimeValue(secs)
    }
}

impl Serialize for TimeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.format())
    }
}

impl<'de> Deserialize<'de> for TimeValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Secs(u64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Secs(secs) => Ok(TimeValue(secs)),
            Repr::Text(text) => parse(&text).map_err(serde::de::Error::custom),
        }
    }
}

/// Parse `M:SS` or `H:MM:SS` into a time value
pub fn parse(input: &str) -> Result<TimeValue, TimeFormatError> {
    let trimmed = input.trim();

    let Some(caps) = TIME_REGEX.captures(trimmed) else {
        return Err(shape_error(input, trimmed));
    };

    // Each field is bounded by the regex to digits only, but may still overflow u64
    let field = |idx: usize| -> Option<u64> {
        caps.get(idx).map(|m| m.as_str().parse::<u64>().unwrap_or(u64::MAX))
    };

    let first = field(1).unwrap_or(0);
    let second = field(2).unwrap_or(0);

    match field(3) {
        None => {
            let (minutes, seconds) = (first, second);
            if seconds > 59 {
                return Err(range_error(input, "seconds must be 0-59", 0, minutes, seconds));
            }
            if minutes > 59 {
                return Err(range_error(
                    input,
                    "minutes must be 0-59; use H:MM:SS for an hour or more",
                    0,
                    minutes,
                    seconds,
                ));
            }
            Ok(TimeValue(minutes * SECS_PER_MINUTE + seconds))
        }
        Some(seconds) => {
            let (hours, minutes) = (first, second);
            if seconds > 59 {
                return Err(range_error(input, "seconds must be 0-59", hours, minutes, seconds));
            }
            if minutes > 59 {
                return Err(range_error(input, "minutes must be 0-59", hours, minutes, seconds));
            }
            if hours > MAX_HOURS {
                return Err(range_error(input, "hours must be 0-99", hours, minutes, seconds));
            }
            Ok(TimeValue(hours * SECS_PER_HOUR + minutes * SECS_PER_MINUTE + seconds))
        }
    }
}

/// Canonical form of a number of seconds
pub fn format(total_secs: u64) -> String {
    let hours = total_secs / SECS_PER_HOUR;
    let minutes = (total_secs % SECS_PER_HOUR) / SECS_PER_MINUTE;
    let seconds = total_secs % SECS_PER_MINUTE;

    if hours == 0 {
        format!("{}:{:02}", minutes, seconds)
    } else {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    }
}

/// Whether a string is already in canonical form
pub fn is_canonical(input: &str) -> bool {
    parse(input).map(|t| t.format() == input).unwrap_or(false)
}

fn shape_error(input: &str, trimmed: &str) -> TimeFormatError {
    // A bare number is most likely meant as seconds
    let suggestion = if BARE_NUMBER_REGEX.is_match(trimmed) {
        trimmed.parse::<u64>().ok().map(|secs| nearest_valid(secs).format())
    } else {
        None
    };

    let reason = if trimmed.is_empty() {
        "time is empty".to_string()
    } else if suggestion.is_some() {
        "missing ':' separator".to_string()
    } else {
        "expected M:SS or H:MM:SS with digits only".to_string()
    };

    TimeFormatError {
        input: input.to_string(),
        reason,
        suggestion,
    }
}

fn range_error(input: &str, reason: &str, hours: u64, minutes: u64, seconds: u64) -> TimeFormatError {
    let total = hours
        .saturating_mul(SECS_PER_HOUR)
        .saturating_add(minutes.saturating_mul(SECS_PER_MINUTE))
        .saturating_add(seconds);

    TimeFormatError {
        input: input.to_string(),
        reason: reason.to_string(),
        suggestion: Some(nearest_valid(total).format()),
    }
}

fn nearest_valid(total_secs: u64) -> TimeValue {
    TimeValue(total_secs.min(TimeValue::MAX.0))
}
