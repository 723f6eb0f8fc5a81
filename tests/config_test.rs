//! Configuration defaults, validation and layered loading

use std::io::Write;

use txt_wrapped::config::{AppConfig, MAX_TOP_K, MAX_TOP_SENDERS};
use txt_wrapped::error::WrappedError;
use txt_wrapped::models::PeriodKind;
use txt_wrapped::timestamp::TimeBasis;
use txt_wrapped::AnalysisOptions;

#[test]
fn test_default_analysis_config() {
    let config = AppConfig::default();

    assert_eq!(config.analysis.year, None);
    assert_eq!(config.analysis.period, PeriodKind::Month);
    assert_eq!(config.analysis.time_basis, TimeBasis::Local);
    assert_eq!(config.analysis.top_k, 5);
    assert_eq!(config.analysis.top_senders, 10);
    assert_eq!(config.analysis.unbalanced_min_sent, 50);
    assert!(config.analysis.extra_stop_words.is_empty());
}

#[test]
fn test_default_logging_config() {
    let config = AppConfig::default();

    assert_eq!(config.logging.level, "info");
    assert_eq!(config.logging.format, "text");
    assert_eq!(config.logging.file_path, None);
    assert!(!config.json_logs());
    assert_eq!(config.log_file(), None);
}

#[test]
fn test_validation_rejects_out_of_range_values() {
    let mut config = AppConfig::default();
    config.analysis.top_k = MAX_TOP_K + 1;
    assert!(matches!(config.validate(), Err(WrappedError::InvalidConfig(_))));

    let mut config = AppConfig::default();
    config.analysis.top_senders = MAX_TOP_SENDERS + 1;
    assert!(config.validate().is_err());

    let mut config = AppConfig::default();
    config.analysis.year = Some(1999);
    assert!(config.validate().is_err());

    let mut config = AppConfig::default();
    config.logging.level = "loud".to_string();
    assert!(config.validate().is_err());

    let mut config = AppConfig::default();
    config.logging.format = "xml".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_explicit_file_overrides_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("wrapped.toml");
    let mut file = std::fs::File::create(&path).expect("create");
    writeln!(
        file,
        r#"
[analysis]
year = 2022
period = "weekday"
time_basis = "utc"
extra_stop_words = ["lol", "omg"]

[output]
pretty = false
"#
    )
    .expect("write");

    let config = AppConfig::load_from(Some(&path)).expect("loads");
    assert_eq!(config.analysis.year, Some(2022));
    assert_eq!(config.analysis.period, PeriodKind::Weekday);
    assert_eq!(config.analysis.time_basis, TimeBasis::Utc);
    assert_eq!(config.analysis.extra_stop_words, vec!["lol", "omg"]);
    assert_eq!(config.analysis.top_k, 5);
    assert!(!config.output.pretty);
}

#[test]
fn test_invalid_file_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("wrapped.toml");
    std::fs::write(&path, "[analysis]\ntop_k = 0\n").expect("write");

    assert!(matches!(
        AppConfig::load_from(Some(&path)),
        Err(WrappedError::InvalidConfig(_))
    ));
}

#[test]
fn test_options_follow_config() {
    let mut config = AppConfig::default();
    config.analysis.year = Some(2021);
    config.analysis.top_k = 3;
    config.analysis.extra_stop_words = vec!["haha".to_string()];

    let options = AnalysisOptions::from(&config);
    assert_eq!(options.year, Some(2021));
    assert_eq!(options.top_k, 3);
    assert_eq!(options.extra_stop_words, vec!["haha".to_string()]);
    assert_eq!(options.unbalanced_min_sent, 50);
}
