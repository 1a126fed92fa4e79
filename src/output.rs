use std::io::{self, Write};

use serde::Serialize;

use crate::app::{
    CleanupResult, DatasetResult, IntegrationResult, ProgressEvent, ProgressSink, ReplayResult,
};
use crate::dispatch::DispatchReport;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Human,
    Json,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_replay(result: &ReplayResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_integration(result: &IntegrationResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_dataset(result: &DatasetResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_cleanup(result: &CleanupResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

// stdout stays reserved for the JSON document
impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

pub struct LogSink;

impl ProgressSink for LogSink {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => tracing::info!(
                elapsed_secs = elapsed.as_secs_f64(),
                "{}",
                event.message
            ),
            None => tracing::info!("{}", event.message),
        }
    }
}

pub fn print_replay_summary(result: &ReplayResult) {
    println!("Replay {} ({})", result.build_name, result.package_type);
    println!("  target:    {}", result.target_indy);
    println!("  downloads: {}", report_line(&result.downloads));
    println!("  uploads:   {}", report_line(&result.uploads));
    println!(
        "  sealed:    {}",
        if result.sealed { "yes" } else { "no" }
    );
    println!("  elapsed:   {:.1}s", result.elapsed_ms as f64 / 1000.0);
}

pub fn print_integration_summary(result: &IntegrationResult) {
    println!("Build {} from {}", result.build_id, result.dataset_dir);
    for build in &result.builds {
        print_replay_summary(&build.replay);
        if let Some(metadata) = &build.metadata {
            println!("  metadata:  {}", report_line(metadata));
        }
        println!(
            "  promoted:  {}{}",
            if build.promoted { "yes" } else { "no" },
            if build.rolled_back { " (rolled back)" } else { "" }
        );
        println!(
            "  cleanup:   {}",
            if build.cleaned_up { "done" } else { "skipped" }
        );
    }
    println!("Summary written to {}", result.report_path);
}

pub fn print_dataset_summary(result: &DatasetResult) {
    println!(
        "Dataset {} ({}) in {}",
        result.build_id, result.build_type, result.dataset_dir
    );
    println!("  builds:  {}", result.builds.len());
    println!("  written: {}", result.written.len());
    for path in &result.written {
        println!("    {path}");
    }
    if !result.missing_tracking.is_empty() {
        println!(
            "  no tracking report: {}",
            result.missing_tracking.join(", ")
        );
    }
}

pub fn print_cleanup_summary(result: &CleanupResult) {
    if result.deleted {
        println!("Deleted scratch repos {}", result.build_name);
    } else {
        println!("Left {} untouched", result.build_name);
    }
}

fn report_line(report: &DispatchReport) -> String {
    if report.succeeded() {
        format!("{} ok", report.total)
    } else {
        format!(
            "{} of {} failed ({} attempted)",
            report.failed, report.total, report.attempted
        )
    }
}
