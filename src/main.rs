mod apigateway;
mod apply;
mod builder;
mod changeset;
mod cloudwatch;
mod config;
mod discovery;
mod filter_resources_by_tags;
mod models;
mod providers;
mod reconcile;

use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};

use apigateway::ApiGatewayInventory;
use cloudwatch::CloudWatchAlarms;
use config::AppConfig;
use discovery::Inventory;
use filter_resources_by_tags::TaggingInventory;
use reconcile::RunOptions;

/// AWS CloudWatch Alarm Craft
///
/// Creates a metric alarm for every configured metric of every matching
/// resource, and deletes alarms under the name prefix that are no longer needed.
#[derive(Debug, Parser)]
#[command(name = "alarm-craft", version)]
struct Args {
    /// Apply the changeset without asking for confirmation.
    #[arg(short = 'f', long = "no-confirm-changeset")]
    no_confirm_changeset: bool,

    /// Notification target ARNs added to the actions of created alarms.
    #[arg(short = 'n', long = "notification-topic-arn", num_args = 0..)]
    notification_topic_arn: Vec<String>,

    /// Config file path. Defaults to `alarm-config.yaml`, `alarm-config.yml`
    /// or `alarm-config.json` in the working directory.
    #[arg(short = 'c', long = "config-file")]
    config_file: Option<PathBuf>,

    /// Put every desired alarm again, including ones that already exist.
    #[arg(short = 'u', long = "update-existing-alarms")]
    update_existing_alarms: bool,
}

/// Application entry point.
///
/// Loads the alarm configuration, reconciles the desired alarms against
/// CloudWatch and prints the changeset to stdout. Logs go to stderr.
#[tokio::main]
async fn main() -> Result<()> {
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&log_level))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    debug!(args = ?args, "Command line options");

    let config = AppConfig::load(args.config_file.as_deref())?;
    let opts = RunOptions {
        confirm_changeset: !args.no_confirm_changeset,
        notification_topic_arns: args.notification_topic_arn,
        update_existing_alarms: args.update_existing_alarms,
    };

    info!(
        prefix = %config.globals.alarm.alarm_name_prefix,
        groups = config.resources.len(),
        interval_ms = config.globals.api_call_intervals_in_millis,
        confirm = opts.confirm_changeset,
        update_existing = opts.update_existing_alarms,
        "Alarm Craft initialized"
    );

    let aws = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .load()
        .await;
    let tagging = TaggingInventory::new(&aws);
    let rest_apis = ApiGatewayInventory::new(&aws);
    let cloudwatch = CloudWatchAlarms::new(&aws);
    let inventory = Inventory {
        tagging: &tagging,
        rest_apis: &rest_apis,
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let outcome = reconcile::run(&config, &opts, &inventory, &cloudwatch, &mut out, |out| {
        prompt_update(out, &mut std::io::stdin().lock())
    })
    .await?;

    info!(outcome = ?outcome, "Execution completed");
    Ok(())
}

/// Ask whether to apply; only `y` confirms.
fn prompt_update(out: &mut dyn Write, input: &mut impl BufRead) -> Result<bool> {
    write!(out, "execute updating above alarms ? [y/n]:")?;
    out.flush()?;

    let mut answer = String::new();
    input
        .read_line(&mut answer)
        .context("Failed to read answer from stdin")?;
    Ok(answer.trim_end_matches(['\r', '\n']) == "y")
}
