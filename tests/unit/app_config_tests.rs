/*!
 * Tests for configuration loading and validation
 */

use anyhow::Result;
use log::LevelFilter;

use caploop::app_config::{Config, LogLevel};

use crate::common::{create_temp_dir, create_test_file};

#[test]
fn test_default_shouldMatchEngineDefaults() {
    let config = Config::default();

    assert_eq!(config.engine.default_span_secs, 10);
    assert_eq!(config.engine.playhead_gap_secs, 1);
    assert_eq!(config.engine.loop_tick_ms, 1000);
    assert_eq!(config.engine.display_refresh_ms, 250);
    assert!(config.database.path.is_none());
    assert_eq!(LevelFilter::from(config.log_level), LevelFilter::Info);
    assert!(config.validate().is_ok());
}

#[test]
fn test_validate_withGapNotSmallerThanSpan_shouldFail() {
    let mut config = Config::default();
    config.engine.playhead_gap_secs = 10;

    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("playhead_gap_secs"));
}

#[test]
fn test_validate_withZeroValues_shouldFail() {
    let mut config = Config::default();
    config.engine.default_span_secs = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.engine.loop_tick_ms = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.database.path = Some("  ".to_string());
    assert!(config.validate().is_err());
}

#[test]
fn test_loadOrDefault_withMissingFile_shouldCreateIt() -> Result<()> {
    let dir = create_temp_dir()?;
    let path = dir.path().join("conf.json");

    let config = Config::load_or_default(&path)?;

    assert!(path.exists());
    assert_eq!(config, Config::default());
    assert_eq!(Config::load(&path)?, config);
    Ok(())
}

#[test]
fn test_load_withPartialFile_shouldFillDefaults() -> Result<()> {
    let dir = create_temp_dir()?;
    let path = create_test_file(
        dir.path(),
        "conf.json",
        r#"{ "engine": { "default_span_secs": 5 }, "log_level": "debug" }"#,
    )?;

    let config = Config::load(&path)?;

    assert_eq!(config.engine.default_span_secs, 5);
    assert_eq!(config.engine.playhead_gap_secs, 1);
    assert_eq!(config.log_level, LogLevel::Debug);
    assert_eq!(config.engine.insert_policy().default_span_secs, 5);
    Ok(())
}

#[test]
fn test_loadOrDefault_withInvalidValues_shouldFail() -> Result<()> {
    let dir = create_temp_dir()?;
    let path = create_test_file(
        dir.path(),
        "conf.json",
        r#"{ "engine": { "default_span_secs": 2, "playhead_gap_secs": 3 } }"#,
    )?;

    assert!(Config::load_or_default(&path).is_err());
    Ok(())
}
