use crate::config::ResourceAlarmConfig;
use crate::discovery::DiscoveredResource;
use crate::models::{AlarmParams, AlarmProps, MetricAlarmParam, TargetResource};
use crate::providers::Provider;

/// Expand resources into one alarm parameter per configured metric.
///
/// Output is resource-major, metric-minor: resources keep their discovery
/// order and metrics keep their configured order. Overrides are looked up by
/// metric name and only replace the keys they set.
pub fn build_alarm_params(
    provider: &Provider,
    alarm: &ResourceAlarmConfig,
    resources: &[DiscoveredResource],
) -> Vec<MetricAlarmParam> {
    let namespace = alarm
        .namespace
        .as_deref()
        .filter(|ns| !ns.is_empty())
        .unwrap_or(provider.default_namespace);

    let mut params = Vec::with_capacity(resources.len() * alarm.metrics.len());
    for resource in resources {
        for metric in &alarm.metrics {
            let overrides = alarm
                .alarm_param_overrides
                .as_ref()
                .and_then(|overrides| overrides.get(metric));

            params.push(MetricAlarmParam {
                target_resource: TargetResource {
                    resource_name: resource.name.clone(),
                },
                alarm_props: AlarmProps {
                    metric_name: metric.clone(),
                    namespace: namespace.to_string(),
                    dimensions: provider.dimensions(&resource.identifier, &resource.name),
                    params: overrides.cloned().unwrap_or_else(AlarmParams::default),
                },
            });
        }
    }
    params
}
