use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_cloudwatch::types::{AlarmType, ComparisonOperator, Dimension, Statistic, Tag};
use aws_sdk_cloudwatch::Client as CloudWatchClient;
use tracing::debug;

use crate::models::MetricAlarm;

/// `DescribeAlarms` page size limit.
pub const MAX_DESCRIBE_RECORDS: i32 = 100;
/// `DeleteAlarms` per-call limit.
pub const MAX_DELETE_ALARMS: usize = 100;

/// One page of `DescribeAlarms` results.
#[derive(Debug, Clone, Default)]
pub struct AlarmPage {
    pub alarm_names: Vec<String>,
    pub next_token: Option<String>,
}

/// CloudWatch operations needed to reconcile metric alarms.
#[async_trait]
pub trait AlarmBackend: Send + Sync {
    /// Fetch one page of metric alarms whose names start with `prefix`.
    async fn describe_alarms_page(&self, prefix: &str, next_token: Option<&str>) -> Result<AlarmPage>;

    /// Create or replace a metric alarm.
    async fn put_metric_alarm(&self, alarm: &MetricAlarm) -> Result<()>;

    /// Delete up to [`MAX_DELETE_ALARMS`] alarms by name.
    async fn delete_alarms(&self, alarm_names: &[String]) -> Result<()>;
}

/// [`AlarmBackend`] backed by the CloudWatch API.
pub struct CloudWatchAlarms {
    cloudwatch: CloudWatchClient,
}

impl CloudWatchAlarms {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            cloudwatch: CloudWatchClient::new(config),
        }
    }
}

#[async_trait]
impl AlarmBackend for CloudWatchAlarms {
    async fn describe_alarms_page(&self, prefix: &str, next_token: Option<&str>) -> Result<AlarmPage> {
        let response = self
            .cloudwatch
            .describe_alarms()
            .alarm_name_prefix(prefix)
            .alarm_types(AlarmType::MetricAlarm)
            .max_records(MAX_DESCRIBE_RECORDS)
            .set_next_token(next_token.map(str::to_string))
            .send()
            .await
            .with_context(|| format!("Failed to describe alarms with prefix {prefix}"))?;

        Ok(AlarmPage {
            alarm_names: response
                .metric_alarms()
                .iter()
                .filter_map(|alarm| alarm.alarm_name().map(str::to_string))
                .collect(),
            next_token: response.next_token().map(str::to_string),
        })
    }

    async fn put_metric_alarm(&self, alarm: &MetricAlarm) -> Result<()> {
        let params = &alarm.params;
        let dimensions = alarm
            .dimensions
            .iter()
            .map(|d| Dimension::builder().name(&d.name).value(&d.value).build())
            .collect();
        let tags = alarm
            .tags
            .iter()
            .map(|t| Tag::builder().key(&t.key).value(&t.value).build())
            .collect::<Vec<_>>();

        let response = self
            .cloudwatch
            .put_metric_alarm()
            .alarm_name(&alarm.alarm_name)
            .alarm_description(&alarm.alarm_description)
            .metric_name(&alarm.metric_name)
            .namespace(&alarm.namespace)
            .set_dimensions(Some(dimensions))
            .set_statistic(params.statistic.as_deref().map(Statistic::from))
            .set_period(params.period)
            .set_evaluation_periods(params.evaluation_periods)
            .set_threshold(params.threshold)
            .set_comparison_operator(
                params
                    .comparison_operator
                    .map(|op| ComparisonOperator::from(op.as_str())),
            )
            .set_treat_missing_data(params.treat_missing_data.clone())
            .set_alarm_actions(Some(alarm.alarm_actions.clone()))
            .set_ok_actions(Some(alarm.ok_actions.clone()))
            .set_insufficient_data_actions(Some(alarm.insufficient_data_actions.clone()))
            .set_tags((!tags.is_empty()).then_some(tags))
            .send()
            .await
            .with_context(|| format!("Failed to put alarm {}", alarm.alarm_name))?;

        debug!(alarm = %alarm.alarm_name, response = ?response, "PutMetricAlarm succeeded");
        Ok(())
    }

    async fn delete_alarms(&self, alarm_names: &[String]) -> Result<()> {
        self.cloudwatch
            .delete_alarms()
            .set_alarm_names(Some(alarm_names.to_vec()))
            .send()
            .await
            .with_context(|| format!("Failed to delete {} alarms", alarm_names.len()))?;
        Ok(())
    }
}
