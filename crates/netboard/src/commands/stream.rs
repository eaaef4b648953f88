//! `stream switches | aps | switches-extra`.
//!
//! Each loop runs until Ctrl-C. `--dry-run` prints records as JSON lines
//! on stdout instead of publishing them (or, for extra diagnostics,
//! instead of saving them).

use std::sync::Arc;

use netboard_config::{PlatformFile, Settings, StreamJob, load_platform};
use netboard_core::stream::aps::ApStreamer;
use netboard_core::stream::extra::ExtraCollector;
use netboard_core::stream::switches::SwitchStreamer;
use netboard_core::stream::{JsonLinesSink, MqttPublisherFactory, MqttSink};
use netboard_core::{SnapshotStore, TelemetrySink};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::cli::{GlobalOpts, StreamArgs, StreamCommand};
use crate::commands::util;
use crate::error::CliError;

pub async fn handle(cmd: StreamCommand, global: &GlobalOpts) -> Result<(), CliError> {
    let settings = util::load_settings(global)?;
    match cmd {
        StreamCommand::Switches(args) => switches(&args, &settings).await,
        StreamCommand::Aps(args) => aps(&args, &settings).await,
        StreamCommand::SwitchesExtra(args) => extra(&args, &settings).await,
    }
}

/// MQTT sink for the broker in the platform file, or stdout when dry.
fn sink(
    args: &StreamArgs,
    settings: &Settings,
    job: &StreamJob,
    cancel: &CancellationToken,
) -> Result<Box<dyn TelemetrySink>, CliError> {
    if args.dry_run {
        return Ok(Box::new(JsonLinesSink::new(std::io::stdout())));
    }
    let path = util::pick(args.platform_file.as_ref(), &settings.paths.platform);
    let platform_file: PlatformFile = load_platform(&path)?;
    let broker = platform_file.broker_config()?.ok_or_else(|| CliError::Validation {
        field: "broker".into(),
        reason: format!("{} has no broker section", path.display()),
    })?;
    Ok(Box::new(
        MqttSink::new(Arc::new(MqttPublisherFactory::new(broker)), job.settle())
            .with_cancel(cancel.clone()),
    ))
}

async fn switches(args: &StreamArgs, settings: &Settings) -> Result<(), CliError> {
    let job = settings.stream.switches;
    let cancel = util::shutdown_token();
    let sink = sink(args, settings, &job, &cancel)?;
    let testbed_path = util::pick(args.testbed_file.as_ref(), &settings.paths.testbed);
    let collector = Arc::new(util::external_collector(settings, &testbed_path)?);
    let store = SnapshotStore::new(util::pick(args.snapshot_dir.as_ref(), &settings.output.snapshots));

    let streamer = SwitchStreamer::new(collector, store, job.workers);
    let rounds = streamer.run(sink.as_ref(), job.cadence(), &cancel).await;
    info!(rounds, "switch streaming stopped");
    Ok(())
}

async fn aps(args: &StreamArgs, settings: &Settings) -> Result<(), CliError> {
    let job = settings.stream.aps;
    let cancel = util::shutdown_token();
    let sink = sink(args, settings, &job, &cancel)?;
    let store = SnapshotStore::new(util::pick(args.snapshot_dir.as_ref(), &settings.output.snapshots));

    let streamer = ApStreamer::load(store, job.workers).await?;
    let rounds = streamer.run(sink.as_ref(), job.cadence(), &cancel).await;
    info!(rounds, "AP streaming stopped");
    Ok(())
}

async fn extra(args: &StreamArgs, settings: &Settings) -> Result<(), CliError> {
    let job = settings.stream.extra;
    let testbed_path = util::pick(args.testbed_file.as_ref(), &settings.paths.testbed);
    let collector = Arc::new(util::external_collector(settings, &testbed_path)?);
    let store = SnapshotStore::new(util::pick(
        args.snapshot_dir.as_ref(),
        &settings.output.extra_snapshots,
    ));

    let extra = ExtraCollector::new(collector, store, job.workers, args.dry_run);
    let cancel = util::shutdown_token();
    let rounds = extra.run(job.cadence(), &cancel, &mut std::io::stdout()).await;
    info!(rounds, "extra collection stopped");
    Ok(())
}
