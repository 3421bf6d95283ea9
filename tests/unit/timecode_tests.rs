/*!
 * Tests for time value parsing and formatting
 */

use caploop::errors::{EngineError, TimeFormatError};
use caploop::timecode::{self, TimeValue};

#[test]
fn test_parse_withValidInputs_shouldRoundTripThroughCanonicalForm() {
    let inputs = ["0:00", "0:05", "1:30", "59:59", "1:00:00", "1:02:03", "01:05", " 2:07 ", "99:59:59"];

    for input in inputs {
        let parsed = timecode::parse(input).unwrap();
        let formatted = parsed.format();

        assert!(timecode::is_canonical(&formatted), "{} -> {} is not canonical", input, formatted);
        assert_eq!(timecode::parse(&formatted).unwrap(), parsed, "round trip failed for {}", input);
    }
}

#[test]
fn test_parse_withMalformedInputs_shouldFailWithFormatError() {
    let inputs = ["222", "000", "--", "::", "abc", "1:60", "60:00", "1:30:60", "", "1:2:3:4", "-1:00"];

    for input in inputs {
        let result = timecode::parse(input);
        assert!(result.is_err(), "'{}' should not parse", input);

        let engine_error: EngineError = result.unwrap_err().into();
        assert!(matches!(engine_error, EngineError::Format(_)));
    }
}

#[test]
fn test_parse_withOverflowingSeconds_shouldSuggestCarriedValue() {
    let err: TimeFormatError = timecode::parse("1:75").unwrap_err();

    assert_eq!(err.suggestion.as_deref(), Some("2:15"));
    let message = err.to_string();
    assert!(message.contains("1:75"));
    assert!(message.contains("2:15"));
}

#[test]
fn test_parse_withBareNumber_shouldSuggestSeconds() {
    let err = timecode::parse("90").unwrap_err();
    assert_eq!(err.suggestion.as_deref(), Some("1:30"));
}

#[test]
fn test_format_shouldUseHoursOnlyWhenNeeded() {
    assert_eq!(timecode::format(0), "0:00");
    assert_eq!(timecode::format(65), "1:05");
    assert_eq!(timecode::format(3_600), "1:00:00");
    assert_eq!(timecode::format(3_725), "1:02:05");
}

#[test]
fn test_fromPosition_shouldFloorAndClampNegative() {
    assert_eq!(TimeValue::from_position(12.9).as_secs(), 12);
    assert_eq!(TimeValue::from_position(-3.0), TimeValue::ZERO);
    assert_eq!(TimeValue::from_position(f64::NAN), TimeValue::ZERO);
}

#[test]
fn test_serde_shouldAcceptStringsAndNumbers() {
    let from_text: TimeValue = serde_json::from_str("\"1:30\"").unwrap();
    let from_number: TimeValue = serde_json::from_str("90").unwrap();

    assert_eq!(from_text, from_number);
    assert_eq!(serde_json::to_string(&from_text).unwrap(), "\"1:30\"");
    assert!(serde_json::from_str::<TimeValue>("\"1:60\"").is_err());
}
