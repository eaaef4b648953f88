//! `export`: hourly PoE history for every AP in the APs file.

use netboard_config::{load_devices, load_platform};
use netboard_core::export::{self, DEFAULT_END_MS, DEFAULT_START_MS};
use netboard_core::{EntityRef, ExportSummary, ExportWindow, TopologyRecord};
use tracing::info;

use crate::cli::{ExportArgs, GlobalOpts};
use crate::commands::util;
use crate::error::CliError;
use crate::output;

/// Window from the flags; the midpoint defaults to halfway.
pub fn window(start: Option<i64>, mid: Option<i64>, end: Option<i64>) -> Result<ExportWindow, CliError> {
    let window = match (start, mid, end) {
        (None, None, None) => ExportWindow::default(),
        (start, Some(mid_ms), end) => ExportWindow {
            start_ms: start.unwrap_or(DEFAULT_START_MS),
            mid_ms,
            end_ms: end.unwrap_or(DEFAULT_END_MS),
        },
        (start, None, end) => ExportWindow::between(
            start.unwrap_or(DEFAULT_START_MS),
            end.unwrap_or(DEFAULT_END_MS),
        ),
    };
    window.validate().map_err(|e| CliError::Validation {
        field: "export window".into(),
        reason: e.to_string(),
    })?;
    Ok(window)
}

fn summary_detail(summary: &ExportSummary) -> String {
    output::detail(&[
        ("exported", summary.exported.to_string()),
        ("skipped", summary.skipped.join(", ")),
        ("json", summary.json.display().to_string()),
        ("daily", summary.daily.display().to_string()),
        ("hourly", summary.hourly.display().to_string()),
    ])
}

pub async fn handle(args: ExportArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let window = window(args.start, args.mid, args.end)?;
    let settings = util::load_settings(global)?;
    let paths = &settings.paths;

    let platform_file = load_platform(&util::pick(args.platform_file.as_ref(), &paths.platform))?;
    let devices: Vec<EntityRef> = load_devices(&util::pick(args.aps_file.as_ref(), &paths.aps))?
        .iter()
        .map(TopologyRecord::name)
        .map(EntityRef::device)
        .collect();
    info!(devices = devices.len(), window = %window.tag(), "exporting");

    let platform = util::connect_platform(&platform_file).await?;
    let out_dir = util::pick(args.output_dir.as_ref(), &settings.output.export);
    let summary = export::run(&platform, &devices, &window, out_dir).await?;

    let out = output::render_single(global.output, &summary, summary_detail)?;
    output::print_output(&out, global.quiet)
}
