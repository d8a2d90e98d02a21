use super::{github_tracker, load_config, with_answers, ModeArgs};
use crate::output::{print_json, print_table, summary_writer};
use aipm_core::{
    close::close_epic,
    decompose::EpicDecompose,
    document::Document,
    progress::epic_status,
    sync::sync_epic,
    tracker::IssueTracker,
    workflow::{run_step, StepContext},
};
use anyhow::Context;
use clap::Subcommand;
use std::path::Path;

#[derive(Subcommand)]
pub enum EpicSubcommand {
    /// Break an epic into numbered task files
    Decompose {
        feature: String,
        #[command(flatten)]
        mode: ModeArgs,
    },
    /// Create GitHub issues for the epic and its tasks
    Sync { feature: String },
    /// Show task status and progress
    Status { feature: String },
    /// Mark an epic completed once every task is closed
    Close {
        feature: String,
        /// Completion notes posted on the epic issue
        #[arg(required = true)]
        notes: Vec<String>,
    },
}

pub fn run(root: &Path, subcmd: EpicSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        EpicSubcommand::Decompose { feature, mode } => decompose(root, &feature, mode, json),
        EpicSubcommand::Sync { feature } => sync(root, &feature, json),
        EpicSubcommand::Status { feature } => status(root, &feature, json),
        EpicSubcommand::Close { feature, notes } => close(root, &feature, &notes.join(" "), json),
    }
}

// ---------------------------------------------------------------------------
// decompose
// ---------------------------------------------------------------------------

fn decompose(root: &Path, feature: &str, mode: ModeArgs, json: bool) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let layout = config.layout(root);
    let mut out = summary_writer(json);

    let created = with_answers(&config, mode.mode(), |answers| {
        let ctx = StepContext::new(&layout, answers, &mut *out);
        run_step(&mut EpicDecompose::new(feature, ctx))
            .with_context(|| format!("failed to decompose epic '{feature}'"))
    })?;

    if json {
        print_json(&created)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// sync
// ---------------------------------------------------------------------------

fn sync(root: &Path, feature: &str, json: bool) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let layout = config.layout(root);
    let tracker = github_tracker(&config)?;

    let report = sync_epic(&layout, feature, &tracker)
        .with_context(|| format!("failed to sync epic '{feature}'"))?;

    if json {
        print_json(&report)?;
    } else {
        println!("Epic issue: #{} {}", report.epic_issue, report.epic_url);
        if report.tasks.succeeded.is_empty() {
            println!("No new tasks to sync.");
        } else {
            let rows = report
                .tasks
                .succeeded
                .iter()
                .map(|item| {
                    vec![
                        item.file.clone(),
                        format!("#{}", item.issue),
                        item.title.clone(),
                    ]
                })
                .collect();
            print_table(&["FILE", "ISSUE", "TITLE"], rows);
        }
        for failed in &report.tasks.failed {
            eprintln!("failed: {}: {}", failed.file, failed.error);
        }
        if let Some(mapping) = &report.mapping {
            println!("\nMapping: {}", layout.reference(mapping));
        }
    }

    if !report.tasks.is_success() {
        anyhow::bail!(
            "{} of {} task(s) failed to sync",
            report.tasks.failed.len(),
            report.tasks.failed.len() + report.tasks.succeeded.len()
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// status
// ---------------------------------------------------------------------------

fn status(root: &Path, feature: &str, json: bool) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let layout = config.layout(root);
    let report = epic_status(&layout, feature)
        .with_context(|| format!("failed to read epic '{feature}'"))?;

    if json {
        return print_json(&report);
    }

    println!("Epic:     {}", report.feature);
    println!("Status:   {}", report.status);
    println!(
        "Progress: {} ({}/{} closed)",
        report.progress,
        report.closed,
        report.tasks.len()
    );
    if let Some(url) = &report.github {
        println!("GitHub:   {url}");
    }
    println!();

    if report.tasks.is_empty() {
        println!("No tasks. Run `aipm epic decompose {feature}`.");
        return Ok(());
    }
    let rows = report
        .tasks
        .iter()
        .map(|t| {
            vec![
                t.file.clone(),
                t.status.clone(),
                t.issue.map(|n| format!("#{n}")).unwrap_or_else(|| "-".to_string()),
                t.title.clone(),
            ]
        })
        .collect();
    print_table(&["FILE", "STATUS", "ISSUE", "TITLE"], rows);
    Ok(())
}

// ---------------------------------------------------------------------------
// close
// ---------------------------------------------------------------------------

fn close(root: &Path, feature: &str, notes: &str, json: bool) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let layout = config.layout(root);

    let synced = Document::load(&layout.epic_path(feature))
        .map(|epic| epic.issue_number().is_some())
        .unwrap_or(false);
    let tracker = if synced {
        match github_tracker(&config) {
            Ok(t) => Some(t),
            Err(e) => {
                tracing::warn!("{e:#}");
                None
            }
        }
    } else {
        None
    };

    let closed = close_epic(
        &layout,
        feature,
        notes,
        tracker.as_ref().map(|t| t as &dyn IssueTracker),
    )
    .with_context(|| format!("failed to close epic '{feature}'"))?;

    if json {
        return print_json(&closed);
    }
    println!("Epic completed: {}", closed.feature);
    println!("Tasks:          {}", closed.task_count);
    match closed.duration_days {
        Some(days) => println!("Duration:       {days} day(s)"),
        None => println!("Duration:       unknown"),
    }
    if closed.remote_closed {
        println!("GitHub issue closed.");
    }
    Ok(())
}
