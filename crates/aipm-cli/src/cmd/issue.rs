use super::{github_tracker, load_config};
use crate::output::print_json;
use aipm_core::close::close_issue;
use anyhow::Context;
use clap::Subcommand;
use std::path::Path;

#[derive(Subcommand)]
pub enum IssueSubcommand {
    /// Close a task locally and on GitHub, then update epic progress
    Close {
        /// GitHub issue number
        number: u64,
        /// Optional completion notes
        notes: Vec<String>,
    },
}

pub fn run(root: &Path, subcmd: IssueSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        IssueSubcommand::Close { number, notes } => close(root, number, &notes.join(" "), json),
    }
}

fn close(root: &Path, number: u64, notes: &str, json: bool) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let layout = config.layout(root);
    let tracker = github_tracker(&config)?;

    let notes = Some(notes).filter(|n| !n.trim().is_empty());
    let closed = close_issue(&layout, number, notes, &tracker)
        .with_context(|| format!("failed to close issue #{number}"))?;

    if json {
        return print_json(&closed);
    }
    println!("Closed issue #{}", closed.issue);
    println!("Task:     {}", layout.reference(&closed.task));
    println!(
        "Epic:     {} at {} ({}/{} tasks closed)",
        closed.epic, closed.progress, closed.closed, closed.total
    );
    Ok(())
}
