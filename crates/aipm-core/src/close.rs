//! Closing work: a single task issue (`aipm issue close`) or a whole epic
//! (`aipm epic close`).

use crate::document::{now_timestamp, parse_timestamp, Document};
use crate::error::{AipmError, Result};
use crate::paths::{self, Layout};
use crate::progress::{collect_tasks, recompute_progress};
use crate::tracker::IssueTracker;
use crate::types::status;
use crate::validate::validate_identifier;
use serde::Serialize;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Locating tasks
// ---------------------------------------------------------------------------

fn epic_dirs(layout: &Layout) -> Result<Vec<PathBuf>> {
    let root = layout.epics_dir();
    if !root.is_dir() {
        return Ok(Vec::new());
    }
    let wrap = |source| AipmError::FileOperation {
        path: root.clone(),
        source,
    };
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(&root).map_err(wrap)? {
        let path = entry.map_err(wrap)?.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

fn references_issue(doc: &Document, number: u64) -> bool {
    if doc.issue_number() == Some(number) {
        return true;
    }
    doc.field("github")
        .map(|url| url.trim_end_matches('/').ends_with(&format!("issues/{number}")))
        .unwrap_or(false)
}

/// The task file backing issue `number`: `<epics>/*/<number>.md` first, then
/// any task whose frontmatter points at the issue.
pub fn find_task_for_issue(layout: &Layout, number: u64) -> Result<PathBuf> {
    let dirs = epic_dirs(layout)?;
    let file = format!("{number}.md");
    if let Some(path) = dirs.iter().map(|d| d.join(&file)).find(|p| p.is_file()) {
        return Ok(path);
    }

    for dir in &dirs {
        let files = paths::task_files(dir).map_err(|source| AipmError::FileOperation {
            path: dir.clone(),
            source,
        })?;
        for path in files {
            match Document::load(&path) {
                Ok(doc) if references_issue(&doc, number) => return Ok(path),
                Ok(_) => {}
                Err(e) => tracing::debug!(path = %path.display(), "skipping unreadable task: {e}"),
            }
        }
    }
    Err(AipmError::TaskNotFound(number))
}

// ---------------------------------------------------------------------------
// Issue close
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssueClosed {
    pub issue: u64,
    pub task: PathBuf,
    pub epic: String,
    pub progress: String,
    pub closed: usize,
    pub total: usize,
    pub progress_note: bool,
}

pub fn issue_close_comment(notes: Option<&str>, closed_at: &str) -> String {
    let mut comment = String::from("Task completed\n\n");
    if let Some(notes) = notes.map(str::trim).filter(|n| !n.is_empty()) {
        comment.push_str(&format!("Completion notes: {notes}\n\n"));
    }
    comment.push_str(&format!("---\nClosed at: {closed_at}"));
    comment
}

fn mark_progress_note(path: &Path, now: &str) -> Result<bool> {
    if !path.is_file() {
        return Ok(false);
    }
    let mut note = Document::load(path)?;
    note.set("completion", "100");
    note.set("last_sync", now);
    note.body = format!(
        "{}\n\n## Completed\n\nTask completed at {now}\n",
        note.body.trim_end()
    );
    note.save(path)?;
    tracing::info!(path = %path.display(), "progress note completed");
    Ok(true)
}

/// Close the task backing issue `number` locally, then on the tracker.
/// Local files are updated before the remote call so a retry is harmless.
pub fn close_issue(
    layout: &Layout,
    number: u64,
    notes: Option<&str>,
    tracker: &dyn IssueTracker,
) -> Result<IssueClosed> {
    let task_path = find_task_for_issue(layout, number)?;
    let epic_dir = task_path
        .parent()
        .map(Path::to_path_buf)
        .ok_or(AipmError::TaskNotFound(number))?;
    let now = now_timestamp();

    let mut task = Document::load(&task_path)?;
    task.set("status", status::CLOSED);
    task.set("updated", now.as_str());
    task.save(&task_path)?;
    tracing::info!(path = %task_path.display(), "task closed");

    let progress_note = mark_progress_note(&paths::progress_note_path(&epic_dir, number), &now)?;
    let update = recompute_progress(&epic_dir)?;

    tracker.create_comment(number, &issue_close_comment(notes, &now))?;
    tracker.close_issue(number)?;
    tracing::info!(number, "issue closed");

    Ok(IssueClosed {
        issue: number,
        task: task_path,
        epic: epic_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        progress: update.progress,
        closed: update.closed,
        total: update.total,
        progress_note,
    })
}

// ---------------------------------------------------------------------------
// Epic close
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpicClosed {
    pub feature: String,
    pub task_count: usize,
    pub completed: String,
    pub duration_days: Option<i64>,
    pub remote_closed: bool,
}

pub fn epic_close_comment(notes: &str) -> String {
    format!("Epic completed - all tasks are done\n\n{}", notes.trim())
}

/// Mark an epic completed once every task is closed. The tracker is optional;
/// remote failures only warn.
pub fn close_epic(
    layout: &Layout,
    feature: &str,
    notes: &str,
    tracker: Option<&dyn IssueTracker>,
) -> Result<EpicClosed> {
    validate_identifier(feature)?;
    let epic_path = layout.epic_path(feature);
    let mut epic = Document::load(&epic_path)?;

    let tasks = collect_tasks(&layout.epic_dir(feature))?;
    let open: Vec<String> = tasks
        .iter()
        .filter(|t| !t.is_closed())
        .map(|t| format!("{} ({})", t.file, t.status))
        .collect();
    if !open.is_empty() {
        return Err(AipmError::OpenTasks(open));
    }

    let now = now_timestamp();
    epic.set("status", status::COMPLETED);
    epic.set("progress", "100%");
    epic.set("updated", now.as_str());
    epic.set("completed", now.as_str());
    epic.save(&epic_path)?;
    tracing::info!(path = %epic_path.display(), "epic completed");

    let remote_closed = match (epic.issue_number(), tracker) {
        (Some(number), Some(tracker)) => {
            let result = tracker
                .create_comment(number, &epic_close_comment(notes))
                .and_then(|()| tracker.close_issue(number));
            match result {
                Ok(_) => {
                    tracing::info!(number, "epic issue closed");
                    true
                }
                Err(e) => {
                    tracing::warn!(number, "could not close epic issue: {e}");
                    false
                }
            }
        }
        (Some(number), None) => {
            tracing::warn!(number, "no tracker credentials; epic issue left open");
            false
        }
        (None, _) => {
            tracing::warn!("epic has no issue number; nothing to close remotely");
            false
        }
    };

    let duration_days = epic
        .field("created")
        .and_then(parse_timestamp)
        .zip(parse_timestamp(&now))
        .map(|(created, completed)| (completed - created).num_days());

    Ok(EpicClosed {
        feature: feature.to_string(),
        task_count: tasks.len(),
        completed: now,
        duration_days,
        remote_closed,
    })
}
