use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::env;
use std::path::PathBuf;
use thiserror::Error;
use validator::{Validate, ValidationError};

use crate::translate::{KindMap, DEFAULT_TIMESTAMP_PRECISION};

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid YAML configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Parse error for {field}: {value} - {source}")]
    Parse {
        field: String,
        value: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Translator configuration with validation
#[derive(Clone, Debug, Validate, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TranslatorConfig {
    /// Fractional-second precision of `localtime()` and `localdatetime()` (0-6)
    #[validate(range(max = 6, message = "Timestamp precision must be between 0 and 6"))]
    pub timestamp_precision: u8,

    /// Kind name to kind id table
    #[validate(custom(function = "validate_kinds"))]
    pub kinds: KindMap,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            timestamp_precision: DEFAULT_TIMESTAMP_PRECISION,
            kinds: BTreeMap::new(),
        }
    }
}

impl TranslatorConfig {
    /// Create configuration from environment variables with validation
    pub fn from_env() -> Result<Self, ConfigError> {
        let kinds = match env::var("CYPHER_PGSQL_KINDS") {
            Ok(value) => parse_kinds(&value)?,
            Err(env::VarError::NotPresent) => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        let config = Self {
            timestamp_precision: parse_env_var(
                "CYPHER_PGSQL_TIMESTAMP_PRECISION",
                &DEFAULT_TIMESTAMP_PRECISION.to_string(),
            )?,
            kinds,
        };

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from YAML file
    pub fn from_yaml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from CLI arguments: the named file, or the environment when none
    /// is given, with any explicit precision taking precedence
    pub fn from_cli(cli: CliConfig) -> Result<Self, ConfigError> {
        let mut config = match &cli.config_file {
            Some(path) => Self::from_yaml_file(path)?,
            None => Self::from_env()?,
        };

        if let Some(precision) = cli.timestamp_precision {
            config.timestamp_precision = precision;
        }

        config.validate()?;
        Ok(config)
    }

    /// The kind table in the form the translator consumes
    pub fn kind_map(&self) -> KindMap {
        self.kinds.clone()
    }
}

/// CLI configuration (parsed from command line arguments)
#[derive(Clone, Debug, Default)]
pub struct CliConfig {
    pub config_file: Option<PathBuf>,
    pub timestamp_precision: Option<u8>,
}

/// Kind names must be non-empty and kind ids unique
fn validate_kinds(kinds: &KindMap) -> Result<(), ValidationError> {
    if kinds.keys().any(|name| name.trim().is_empty()) {
        return Err(ValidationError::new("empty_kind_name")
            .with_message("Kind names cannot be empty".into()));
    }

    let mut seen = HashSet::new();
    if kinds.values().any(|id| !seen.insert(*id)) {
        return Err(ValidationError::new("duplicate_kind_id")
            .with_message("Kind ids must be unique".into()));
    }

    Ok(())
}

/// Parse `Name=1,Other=2`
fn parse_kinds(value: &str) -> Result<KindMap, ConfigError> {
    let mut kinds = BTreeMap::new();

    for entry in value.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
        let (name, id) = entry.split_once('=').ok_or_else(|| ConfigError::Parse {
            field: "CYPHER_PGSQL_KINDS".to_string(),
            value: entry.to_string(),
            source: "expected Name=id".into(),
        })?;

        let id = id.trim().parse::<i16>().map_err(|e| ConfigError::Parse {
            field: "CYPHER_PGSQL_KINDS".to_string(),
            value: entry.to_string(),
            source: Box::new(e),
        })?;

        kinds.insert(name.trim().to_string(), id);
    }

    Ok(kinds)
}

/// Parse an environment variable with a default value
fn parse_env_var<T: std::str::FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = env::var(key).unwrap_or_else(|_| default.to_string());
    value.parse().map_err(|e| ConfigError::Parse {
        field: key.to_string(),
        value,
        source: Box::new(e),
    })
}
