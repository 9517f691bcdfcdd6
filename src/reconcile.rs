use std::io::Write;

use anyhow::Result;
use tracing::info;

use crate::apply::AlarmApplier;
use crate::builder;
use crate::changeset::{self, Changeset};
use crate::cloudwatch::AlarmBackend;
use crate::config::AppConfig;
use crate::discovery::{self, Inventory};
use crate::models::MetricAlarmParam;
use crate::providers;

/// Command-line switches that affect a run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Ask before applying the changeset.
    pub confirm_changeset: bool,
    /// Extra notification targets appended to the configured alarm actions.
    pub notification_topic_arns: Vec<String>,
    /// Re-put every desired alarm, including ones that already exist.
    pub update_existing_alarms: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    Declined,
    UpToDate,
}

/// Discover resources for every group, in configuration order, and expand
/// them into alarm parameters.
///
/// All resource types are resolved before the first AWS call.
pub async fn get_target_metrics(config: &AppConfig, inventory: &Inventory<'_>) -> Result<Vec<MetricAlarmParam>> {
    let mut groups = Vec::with_capacity(config.resources.len());
    for (group, resource) in &config.resources {
        groups.push((group, resource, providers::lookup(group, &resource.target_resource_type)?));
    }

    let mut params = Vec::new();
    for (group, resource, provider) in groups {
        let resources = discovery::discover(group, provider, resource, inventory).await?;
        params.extend(builder::build_alarm_params(provider, &resource.alarm, &resources));
    }
    Ok(params)
}

/// Print one line per alarm: creates, then keeps, then deletes.
pub fn write_changeset(
    out: &mut dyn Write,
    prefix: &str,
    changeset: &Changeset,
    update_existing: bool,
) -> std::io::Result<()> {
    let keep_label = if update_existing { "U " } else { "  " };

    for param in &changeset.to_create {
        writeln!(out, "+ {}", param.alarm_name(prefix))?;
    }
    for name in &changeset.to_keep {
        writeln!(out, "{keep_label}{name}")?;
    }
    for name in &changeset.to_delete {
        writeln!(out, "- {name}")?;
    }
    Ok(())
}

/// Run one reconciliation: discover, diff, report and, if confirmed, apply.
///
/// `confirm` is only called when the changeset requires changes and
/// confirmation is enabled.
pub async fn run(
    config: &AppConfig,
    opts: &RunOptions,
    inventory: &Inventory<'_>,
    backend: &dyn AlarmBackend,
    out: &mut dyn Write,
    confirm: impl FnOnce(&mut dyn Write) -> Result<bool>,
) -> Result<Outcome> {
    let prefix = &config.globals.alarm.alarm_name_prefix;

    let desired = get_target_metrics(config, inventory).await?;
    let changeset = changeset::get_alarms_changeset(backend, prefix, &desired).await?;
    write_changeset(out, prefix, &changeset, opts.update_existing_alarms)?;

    let needs_update =
        changeset.has_mutations() || (!changeset.to_keep.is_empty() && opts.update_existing_alarms);
    if !needs_update {
        writeln!(out, "all required alarms already exist. no updates executed")?;
        return Ok(Outcome::UpToDate);
    }

    if opts.confirm_changeset && !confirm(&mut *out)? {
        writeln!(out, "no updates executed..")?;
        return Ok(Outcome::Declined);
    }

    writeln!(out, "!!! UPDATE ALARMS !!!")?;
    let applier = AlarmApplier::new(backend, &config.globals, &opts.notification_topic_arns);
    let to_apply = if opts.update_existing_alarms {
        &desired
    } else {
        &changeset.to_create
    };
    info!(put = to_apply.len(), delete = changeset.to_delete.len(), "Updating alarms");
    applier.update_alarms(to_apply, &changeset.to_delete).await?;

    Ok(Outcome::Applied)
}
