use std::io::Write;
use talentscore::config::{ConfigError, DEFAULT_ASSESSMENT_URL};
use talentscore::pipeline::tiers::ProxyStatistic;
use talentscore::{PipelineConfig, ProfileSource, TalentConfig};

#[test]
fn partial_file_overrides_presets() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    write!(
        file,
        r#"{{
            "github": {{ "proxy_statistic": "median", "tier_labels": ["Low", "High"] }}
        }}"#
    )
    .expect("write");

    let config = TalentConfig::load_from(file.path()).expect("load");
    assert_eq!(config.assessment_url, DEFAULT_ASSESSMENT_URL);

    let github = config.pipeline(ProfileSource::GitHub);
    assert_eq!(github.proxy_statistic, ProxyStatistic::Median);
    assert_eq!(github.tier_count(), 2);
    assert_eq!(github.proxy_column, "followers");
    github.validate().expect("still valid");

    assert_eq!(
        config.pipeline(ProfileSource::StackOverflow),
        &PipelineConfig::stackoverflow()
    );
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let err = TalentConfig::load_from(&dir.path().join("absent.json")).expect_err("missing");
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn malformed_file_is_a_parse_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{ not json").expect("write");
    let err = TalentConfig::load_from(&path).expect_err("malformed");
    assert!(matches!(err, ConfigError::Parse { .. }));
    assert!(err.to_string().contains("config.json"));
}
