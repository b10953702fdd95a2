/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use tracing::{error, info, warn};

use exam_scheduler::config::ConfigManager;
use exam_scheduler::model::{EntryDraft, TimetableDraft};
use exam_scheduler::TimetableEngine;

// ── CLI argument definition ───────────────────────────────────────────────────

/// Load a timetable plan, run conflict detection and report.
///
/// Example:
///   exam-scheduler --config demos/engine.yaml --plan demos/plan.yaml \
///                  --submit --approve-as 1 --publish-as 1
#[derive(Debug, Parser)]
#[command(
    name = "exam-scheduler",
    about = "Exam timetable integrity engine",
    long_about = None,
)]
struct Cli {
    /// Path to the YAML engine configuration (settings + directory).
    #[arg(short = 'c', long = "config")]
    config: PathBuf,

    /// Path to the YAML plan: one timetable and its entries.
    #[arg(short = 'p', long = "plan")]
    plan: PathBuf,

    /// Submit the timetable for approval after loading.
    #[arg(long = "submit", default_value_t = false)]
    submit: bool,

    /// Approve as this user id (implies --submit).
    #[arg(long = "approve-as")]
    approve_as: Option<u32>,

    /// Publish as this user id (requires --approve-as).
    #[arg(long = "publish-as")]
    publish_as: Option<u32>,
}

// ── Plan file ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct Plan {
    timetable: TimetableDraft,
    #[serde(default)]
    entries: Vec<EntryDraft>,
}

fn load_plan(path: &Path) -> Result<Plan> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read plan file: {}", path.display()))?;
    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse plan file: {}", path.display()))
}

// ── Run ───────────────────────────────────────────────────────────────────────

fn run(cli: &Cli) -> Result<()> {
    let mut config = ConfigManager::new();
    info!("Loading engine configuration from: {}", cli.config.display());
    config.load_from_file(&cli.config)?;

    let engine = TimetableEngine::from_config(&config);
    let plan = load_plan(&cli.plan)?;

    let timetable = engine.create_timetable(plan.timetable)?;
    let mut rejected = 0usize;
    for (n, draft) in plan.entries.into_iter().enumerate() {
        if let Err(e) = engine.create_entry(timetable.id, draft) {
            warn!(index = n, "entry rejected: {e}");
            rejected += 1;
        }
    }

    let conflicts = engine.detect_conflicts(timetable.id)?;
    info!("{} unresolved conflict(s):", conflicts.len());
    for c in &conflicts {
        info!(
            "  [{severity}] {kind} #{id}: {desc}",
            severity = c.severity,
            kind = c.kind,
            id = c.id,
            desc = c.description,
        );
    }

    let stats = engine.get_timetable_statistics(timetable.id)?;
    info!(
        exams = stats.total_exams,
        rejected = rejected,
        dates = stats.unique_dates,
        venues = stats.unique_venues,
        utilization = stats.utilization_rate,
        publishable = stats.publishable,
        "Timetable statistics"
    );

    if cli.submit || cli.approve_as.is_some() {
        engine.submit_for_approval(timetable.id)?;
    }
    if let Some(approver) = cli.approve_as {
        engine.approve_timetable(timetable.id, approver)?;
    }
    if let Some(publisher) = cli.publish_as {
        engine.publish_timetable(timetable.id, publisher)?;
    }

    let final_state = engine.get_timetable(timetable.id)?;
    info!(
        timetable = final_state.id,
        status = %final_state.status,
        "Done"
    );
    Ok(())
}

fn main() {
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=debug).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    info!(
        config = %cli.config.display(),
        plan = %cli.plan.display(),
        submit = cli.submit,
        approve_as = ?cli.approve_as,
        publish_as = ?cli.publish_as,
        "Configuration"
    );

    if let Err(e) = run(&cli) {
        error!("{:#}", e);
        process::exit(1);
    }
}
