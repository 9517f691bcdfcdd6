use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indexmap::IndexMap;
use regex::Regex;
use serde::Deserialize;

use crate::models::{AlarmParams, ComparisonOperator};
use crate::providers;

pub const DEFAULT_ALARM_NAME_PREFIX: &str = "alarm-craft-autogen-";
pub const DEFAULT_API_CALL_INTERVAL_MILLIS: u64 = 334;

/// Files looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILES: &[&str] = &[
    "alarm-config.yaml",
    "alarm-config.yml",
    "alarm-config.json",
];

/// Built-in alarm parameters, applied beneath the configured defaults.
pub fn default_alarm_params() -> AlarmParams {
    AlarmParams {
        statistic: Some("Sum".to_string()),
        period: Some(60),
        evaluation_periods: Some(1),
        threshold: Some(1.0),
        comparison_operator: Some(ComparisonOperator::GreaterThanOrEqualToThreshold),
        treat_missing_data: Some("notBreaching".to_string()),
    }
}

/// Problems with the configuration itself, reported before any AWS call.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no such resource type: {resource_type} (resources.{group})")]
    UnknownResourceType { group: String, resource_type: String },
    #[error("resources.{group}.alarm.metrics must not be empty")]
    EmptyMetrics { group: String },
    #[error("{scope}.target_resource_tags must not be empty")]
    EmptyTags { scope: String },
    #[error("invalid target_resource_name_pattern '{pattern}' in {scope}: {source}")]
    InvalidNamePattern {
        scope: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("config file not found: {}", .0.display())]
    ConfigFileNotFound(PathBuf),
    #[error("config file not found. locate `alarm-config.yaml` or specify `-c your-config.yaml`")]
    NoDefaultConfigFile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Self {
        let name = path.to_string_lossy();
        if name.ends_with("yaml") || name.ends_with("yml") {
            ConfigFormat::Yaml
        } else {
            ConfigFormat::Json
        }
    }
}

/// Resource filter shared by all resource groups.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceFilter {
    pub target_resource_name_pattern: Option<String>,
    pub target_resource_tags: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct GlobalAlarmFile {
    alarm_name_prefix: Option<String>,
    alarm_actions: Option<Vec<String>>,
    default_alarm_params: Option<AlarmParams>,
    alarm_tagging: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct GlobalsFile {
    #[serde(default)]
    alarm: GlobalAlarmFile,
    #[serde(default)]
    resource_filter: ResourceFilter,
    api_call_intervals_in_millis: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    globals: GlobalsFile,
    resources: IndexMap<String, ResourceConfig>,
}

/// Alarm settings applied to every alarm this tool creates.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalAlarmConfig {
    pub alarm_name_prefix: String,
    pub alarm_actions: Vec<String>,
    pub default_alarm_params: AlarmParams,
    pub alarm_tagging: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Globals {
    pub alarm: GlobalAlarmConfig,
    pub api_call_intervals_in_millis: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceAlarmConfig {
    pub namespace: Option<String>,
    pub metrics: Vec<String>,
    pub alarm_param_overrides: Option<HashMap<String, AlarmParams>>,
}

/// One entry under `resources`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceConfig {
    pub target_resource_type: String,
    pub target_resource_name_pattern: Option<String>,
    pub target_resource_tags: Option<BTreeMap<String, String>>,
    pub alarm: ResourceAlarmConfig,
}

/// Validated configuration with globals merged into every resource group.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub globals: Globals,
    /// Resource groups in file order.
    pub resources: IndexMap<String, ResourceConfig>,
}

impl AppConfig {
    /// Load the configuration from `path`, or from the first default file
    /// found in the current directory.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to resolve current directory")?;
        let path = resolve_config_path(path, &cwd)?;
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        Self::parse(&contents, ConfigFormat::from_path(&path))
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn parse(contents: &str, format: ConfigFormat) -> Result<Self> {
        let file: ConfigFile = match format {
            ConfigFormat::Json => serde_json::from_str(contents)?,
            ConfigFormat::Yaml => serde_yaml::from_str(contents)?,
        };
        let config = Self::merge(file)?;
        config.validate()?;
        Ok(config)
    }

    fn merge(file: ConfigFile) -> Result<Self, ConfigError> {
        let globals = file.globals;
        if matches!(&globals.resource_filter.target_resource_tags, Some(tags) if tags.is_empty()) {
            return Err(ConfigError::EmptyTags {
                scope: "globals.resource_filter".to_string(),
            });
        }

        let alarm = GlobalAlarmConfig {
            alarm_name_prefix: globals
                .alarm
                .alarm_name_prefix
                .unwrap_or_else(|| DEFAULT_ALARM_NAME_PREFIX.to_string()),
            alarm_actions: globals.alarm.alarm_actions.unwrap_or_default(),
            default_alarm_params: match &globals.alarm.default_alarm_params {
                Some(params) => default_alarm_params().merged_with(params),
                None => default_alarm_params(),
            },
            alarm_tagging: globals.alarm.alarm_tagging,
        };

        let mut resources = IndexMap::with_capacity(file.resources.len());
        for (group, resource) in file.resources {
            if matches!(&resource.target_resource_tags, Some(tags) if tags.is_empty()) {
                return Err(ConfigError::EmptyTags {
                    scope: format!("resources.{group}"),
                });
            }
            let resource = apply_resource_filter(&globals.resource_filter, resource);
            resources.insert(group, resource);
        }

        Ok(Self {
            globals: Globals {
                alarm,
                api_call_intervals_in_millis: globals
                    .api_call_intervals_in_millis
                    .unwrap_or(DEFAULT_API_CALL_INTERVAL_MILLIS),
            },
            resources,
        })
    }

    /// Check every resource group against the provider registry and the
    /// structural constraints of the schema.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (group, resource) in &self.resources {
            providers::lookup(group, &resource.target_resource_type)?;

            if resource.alarm.metrics.is_empty() {
                return Err(ConfigError::EmptyMetrics { group: group.clone() });
            }
            if let Some(pattern) = &resource.target_resource_name_pattern {
                compile_name_pattern(&format!("resources.{group}"), pattern)?;
            }
        }
        Ok(())
    }
}

/// Group-level values win; tag maps are merged key by key.
fn apply_resource_filter(filter: &ResourceFilter, mut resource: ResourceConfig) -> ResourceConfig {
    if resource.target_resource_name_pattern.is_none() {
        resource.target_resource_name_pattern = filter.target_resource_name_pattern.clone();
    }

    if let Some(global_tags) = &filter.target_resource_tags {
        let mut tags = global_tags.clone();
        tags.extend(resource.target_resource_tags.take().unwrap_or_default());
        resource.target_resource_tags = Some(tags);
    }

    resource
}

/// Compile a resource name pattern. Matching is anchored at the start of the
/// name but not at the end.
pub fn compile_name_pattern(scope: &str, pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(&format!("^(?:{pattern})")).map_err(|source| ConfigError::InvalidNamePattern {
        scope: scope.to_string(),
        pattern: pattern.to_string(),
        source,
    })
}

/// Resolve the config file path, falling back to the default file names in `dir`.
pub fn resolve_config_path(path: Option<&Path>, dir: &Path) -> Result<PathBuf, ConfigError> {
    match path {
        Some(path) if path.exists() => Ok(path.to_path_buf()),
        Some(path) => Err(ConfigError::ConfigFileNotFound(path.to_path_buf())),
        None => DEFAULT_CONFIG_FILES
            .iter()
            .map(|name| dir.join(name))
            .find(|candidate| candidate.exists())
            .ok_or(ConfigError::NoDefaultConfigFile),
    }
}
