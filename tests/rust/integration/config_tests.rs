//! Translator configuration from YAML files, the environment and CLI overrides

use std::env;
use std::io::Write;

use cypher_pgsql::config::{CliConfig, ConfigError, TranslatorConfig};
use cypher_pgsql::translate;
use serde_json::json;
use serial_test::serial;
use tempfile::NamedTempFile;

use super::common::*;

fn yaml_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_config_from_yaml_file() {
    let file = yaml_file(
        r#"
timestamp_precision: 3
kinds:
  User: 1
  MemberOf: 11
"#,
    );

    let config = TranslatorConfig::from_yaml_file(file.path()).unwrap();
    assert_eq!(config.timestamp_precision, 3);
    assert_eq!(config.kinds.get("User"), Some(&1));
    assert_eq!(config.kind_map().len(), 2);
}

#[test]
fn test_yaml_defaults_missing_fields() {
    let file = yaml_file("kinds:\n  User: 1\n");

    let config = TranslatorConfig::from_yaml_file(file.path()).unwrap();
    assert_eq!(config.timestamp_precision, translate::DEFAULT_TIMESTAMP_PRECISION);
}

#[test]
fn test_yaml_validation_errors() {
    let file = yaml_file("timestamp_precision: 9\n");
    assert!(matches!(
        TranslatorConfig::from_yaml_file(file.path()),
        Err(ConfigError::Validation(_))
    ));

    let file = yaml_file("kinds:\n  User: 1\n  Group: 1\n");
    assert!(matches!(
        TranslatorConfig::from_yaml_file(file.path()),
        Err(ConfigError::Validation(_))
    ));

    let file = yaml_file("kinds: [User]\n");
    assert!(matches!(
        TranslatorConfig::from_yaml_file(file.path()),
        Err(ConfigError::Yaml(_))
    ));
}

#[test]
#[serial]
fn test_config_from_env() {
    env::set_var("CYPHER_PGSQL_TIMESTAMP_PRECISION", "2");
    env::set_var("CYPHER_PGSQL_KINDS", "User=1, Group=2");

    let config = TranslatorConfig::from_env();

    env::remove_var("CYPHER_PGSQL_TIMESTAMP_PRECISION");
    env::remove_var("CYPHER_PGSQL_KINDS");

    let config = config.unwrap();
    assert_eq!(config.timestamp_precision, 2);
    assert_eq!(config.kinds.get("Group"), Some(&2));
}

#[test]
#[serial]
fn test_invalid_env_precision() {
    env::set_var("CYPHER_PGSQL_TIMESTAMP_PRECISION", "fast");
    let result = TranslatorConfig::from_env();
    env::remove_var("CYPHER_PGSQL_TIMESTAMP_PRECISION");

    assert!(matches!(result, Err(ConfigError::Parse { .. })));
}

#[test]
fn test_cli_precision_overrides_file() {
    let file = yaml_file("timestamp_precision: 3\n");

    let config = TranslatorConfig::from_cli(CliConfig {
        config_file: Some(file.path().to_path_buf()),
        timestamp_precision: Some(0),
    })
    .unwrap();
    assert_eq!(config.timestamp_precision, 0);

    assert!(TranslatorConfig::from_cli(CliConfig {
        config_file: Some(file.path().to_path_buf()),
        timestamp_precision: Some(7),
    })
    .is_err());
}

#[test]
fn test_configured_precision_reaches_clock_functions() {
    let config = TranslatorConfig {
        timestamp_precision: 3,
        kinds: kinds(),
    };

    let projection = json!({ "items": [{
        "expression": { "function_invocation": { "name": "localtime" } },
        "binding": "t"
    }]});
    let query = single_part(vec![pattern(vec![node("n", &[])])], None, vec![], Some(projection));

    let sql = translate::translate_with_config(&query, &config)
        .unwrap()
        .to_sql()
        .unwrap();
    println!("Generated SQL:\n{}", sql);

    assert!(sql.ends_with("select localtime(3) as t from n0"));
}
