use std::time::Duration;

use anyhow::Result;
use tracing::{debug, info};

use crate::cloudwatch::{AlarmBackend, MAX_DELETE_ALARMS};
use crate::config::Globals;
use crate::models::{MetricAlarm, MetricAlarmParam, Tag};

/// Creates and deletes alarms, pausing between API calls.
pub struct AlarmApplier<'a> {
    backend: &'a dyn AlarmBackend,
    globals: &'a Globals,
    alarm_actions: Vec<String>,
    interval: Duration,
}

impl<'a> AlarmApplier<'a> {
    /// `additional_actions` are appended to the configured alarm actions.
    pub fn new(backend: &'a dyn AlarmBackend, globals: &'a Globals, additional_actions: &[String]) -> Self {
        let alarm_actions = globals
            .alarm
            .alarm_actions
            .iter()
            .chain(additional_actions)
            .cloned()
            .collect();

        Self {
            backend,
            globals,
            alarm_actions,
            interval: Duration::from_millis(globals.api_call_intervals_in_millis),
        }
    }

    /// Merge the global layers and the per-alarm properties into the
    /// parameters of one `PutMetricAlarm` call.
    ///
    /// Layers, most specific last: default alarm params, alarm actions,
    /// alarm tagging, the alarm's own properties.
    pub fn metric_alarm(&self, param: &MetricAlarmParam) -> MetricAlarm {
        let alarm = &self.globals.alarm;
        let props = &param.alarm_props;

        MetricAlarm {
            alarm_name: param.alarm_name(&alarm.alarm_name_prefix),
            alarm_description: param.alarm_description(),
            metric_name: props.metric_name.clone(),
            namespace: props.namespace.clone(),
            dimensions: props.dimensions.clone(),
            params: alarm.default_alarm_params.merged_with(&props.params),
            alarm_actions: self.alarm_actions.clone(),
            ok_actions: self.alarm_actions.clone(),
            insufficient_data_actions: self.alarm_actions.clone(),
            tags: alarm
                .alarm_tagging
                .iter()
                .flatten()
                .map(|(key, value)| Tag {
                    key: key.clone(),
                    value: value.clone(),
                })
                .collect(),
        }
    }

    /// Create `to_create`, then delete `to_delete`.
    ///
    /// Stops at the first failing call; earlier calls are not rolled back.
    pub async fn update_alarms(&self, to_create: &[MetricAlarmParam], to_delete: &[String]) -> Result<()> {
        self.create_alarms(to_create).await?;
        self.delete_alarms(to_delete).await
    }

    async fn create_alarms(&self, params: &[MetricAlarmParam]) -> Result<()> {
        for param in params {
            let alarm = self.metric_alarm(param);
            info!(alarm = %alarm.alarm_name, "Creating alarm");
            debug!(alarm = ?alarm, "PutMetricAlarm parameters");

            self.backend.put_metric_alarm(&alarm).await?;
            self.pause().await;
        }
        Ok(())
    }

    async fn delete_alarms(&self, names: &[String]) -> Result<()> {
        for chunk in names.chunks(MAX_DELETE_ALARMS) {
            info!(count = chunk.len(), first = %chunk[0], "Deleting alarms");

            self.backend.delete_alarms(chunk).await?;
            self.pause().await;
        }
        Ok(())
    }

    // Applied after every call, the last one included.
    async fn pause(&self) {
        if !self.interval.is_zero() {
            tokio::time::sleep(self.interval).await;
        }
    }
}
