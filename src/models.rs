use serde::{Deserialize, Serialize};

/// Comparison operators accepted by CloudWatch metric alarms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonOperator {
    GreaterThanOrEqualToThreshold,
    GreaterThanThreshold,
    GreaterThanUpperThreshold,
    LessThanLowerOrGreaterThanUpperThreshold,
    LessThanLowerThreshold,
    LessThanOrEqualToThreshold,
    LessThanThreshold,
}

impl ComparisonOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonOperator::GreaterThanOrEqualToThreshold => "GreaterThanOrEqualToThreshold",
            ComparisonOperator::GreaterThanThreshold => "GreaterThanThreshold",
            ComparisonOperator::GreaterThanUpperThreshold => "GreaterThanUpperThreshold",
            ComparisonOperator::LessThanLowerOrGreaterThanUpperThreshold => {
                "LessThanLowerOrGreaterThanUpperThreshold"
            }
            ComparisonOperator::LessThanLowerThreshold => "LessThanLowerThreshold",
            ComparisonOperator::LessThanOrEqualToThreshold => "LessThanOrEqualToThreshold",
            ComparisonOperator::LessThanThreshold => "LessThanThreshold",
        }
    }
}

impl std::fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Partial set of overridable alarm attributes.
///
/// Used for the global defaults and for per-metric overrides. A `None` field
/// means "not specified at this layer".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct AlarmParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation_periods: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison_operator: Option<ComparisonOperator>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub treat_missing_data: Option<String>,
}

impl AlarmParams {
    /// Returns a new record with every field set in `overrides` taking
    /// precedence over `self`. Neither input is modified.
    pub fn merged_with(&self, overrides: &AlarmParams) -> AlarmParams {
        AlarmParams {
            statistic: overrides.statistic.clone().or_else(|| self.statistic.clone()),
            period: overrides.period.or(self.period),
            evaluation_periods: overrides.evaluation_periods.or(self.evaluation_periods),
            threshold: overrides.threshold.or(self.threshold),
            comparison_operator: overrides.comparison_operator.or(self.comparison_operator),
            treat_missing_data: overrides
                .treat_missing_data
                .clone()
                .or_else(|| self.treat_missing_data.clone()),
        }
    }
}

/// A metric dimension identifying the monitored resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Dimension {
    pub name: String,
    pub value: String,
}

impl Dimension {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Per-alarm properties produced from one (resource, metric) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct AlarmProps {
    pub metric_name: String,
    pub namespace: String,
    pub dimensions: Vec<Dimension>,
    pub params: AlarmParams,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetResource {
    pub resource_name: String,
}

/// Desired alarm for a single metric of a single resource.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricAlarmParam {
    pub target_resource: TargetResource,
    pub alarm_props: AlarmProps,
}

impl MetricAlarmParam {
    /// Identity of the alarm: `<prefix><resource>-<metric>`.
    pub fn alarm_name(&self, prefix: &str) -> String {
        format!(
            "{}{}-{}",
            prefix, self.target_resource.resource_name, self.alarm_props.metric_name
        )
    }

    pub fn alarm_description(&self) -> String {
        format!(
            "Metric Alarm for `{}` of {}",
            self.alarm_props.metric_name, self.target_resource.resource_name
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

/// Fully merged parameters for one `PutMetricAlarm` call.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricAlarm {
    pub alarm_name: String,
    pub alarm_description: String,
    pub metric_name: String,
    pub namespace: String,
    pub dimensions: Vec<Dimension>,
    pub params: AlarmParams,
    pub alarm_actions: Vec<String>,
    pub ok_actions: Vec<String>,
    pub insufficient_data_actions: Vec<String>,
    pub tags: Vec<Tag>,
}
