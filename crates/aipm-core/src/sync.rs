//! `aipm epic sync`: publish an epic and its tasks as tracker issues.

use crate::document::{now_timestamp, Document};
use crate::error::{AipmError, Result};
use crate::io;
use crate::paths::{self, Layout};
use crate::progress::{collect_tasks, TaskSummary};
use crate::tracker::{IssueEdit, IssueTracker, NewIssue};
use crate::types::status;
use crate::validate::validate_identifier;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const EPIC_LABEL: &str = "epic";
pub const TASK_LABEL: &str = "task";
pub const TASKS_HEADING: &str = "Tasks";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncedItem {
    /// File name before the rename to `<issue>.md`.
    pub file: String,
    pub title: String,
    pub issue: u64,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedItem {
    pub file: String,
    pub error: String,
}

/// Outcome of a best-effort loop: every item lands in exactly one list.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    pub succeeded: Vec<SyncedItem>,
    pub failed: Vec<FailedItem>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    fn record(mut self, file: String, outcome: Result<SyncedItem>) -> Self {
        match outcome {
            Ok(item) => self.succeeded.push(item),
            Err(e) => {
                tracing::warn!(%file, "sync failed: {e}");
                self.failed.push(FailedItem {
                    file,
                    error: e.to_string(),
                });
            }
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpicSyncReport {
    pub feature: String,
    pub epic_issue: u64,
    pub epic_url: String,
    pub tasks: BatchReport,
    pub mapping: Option<PathBuf>,
}

fn with_label(mut labels: Vec<String>, label: &str) -> Vec<String> {
    if !labels.iter().any(|l| l == label) {
        labels.push(label.to_string());
    }
    labels
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// A task counts as synced once it is named `<issue>.md` or carries an issue number.
fn already_synced(path: &Path, doc: &Document) -> bool {
    paths::issue_number_from_file(&file_name(path)).is_some() || doc.issue_number().is_some()
}

pub fn task_issue_body(epic_issue: u64, body: &str) -> String {
    format!("Parent Epic: #{epic_issue}\n\n---\n\n{}", body.trim_start())
}

// ---------------------------------------------------------------------------
// Epic issue
// ---------------------------------------------------------------------------

/// Create the epic issue, or reuse the one recorded by an earlier sync.
fn ensure_epic_issue(
    epic_path: &Path,
    epic: &mut Document,
    tracker: &dyn IssueTracker,
) -> Result<(u64, String)> {
    if let Some(number) = epic.issue_number() {
        let url = epic.field("github").unwrap_or_default().to_string();
        tracing::info!(number, "epic already synced; reusing issue");
        return Ok((number, url));
    }

    let issue = tracker.create_issue(&NewIssue {
        title: format!("[EPIC] {}", epic.title(&["name", "title"], 1)),
        body: epic.body.clone(),
        labels: with_label(epic.labels(), EPIC_LABEL),
    })?;
    epic.set("github_issue_number", issue.number.to_string());
    epic.set("github", issue.html_url.as_str());
    epic.set("updated", now_timestamp());
    epic.save(epic_path)?;
    tracing::info!(number = issue.number, "epic issue created");
    Ok((issue.number, issue.html_url))
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

fn sync_task(
    path: &Path,
    mut doc: Document,
    epic_issue: u64,
    tracker: &dyn IssueTracker,
) -> Result<SyncedItem> {
    let file = file_name(path);
    let title = doc.title(&["title", "name"], 2);
    let issue = tracker.create_issue(&NewIssue {
        title: title.clone(),
        body: task_issue_body(epic_issue, &doc.body),
        labels: with_label(doc.labels(), TASK_LABEL),
    })?;

    doc.set("github_issue_number", issue.number.to_string());
    doc.set("github", issue.html_url.as_str());
    doc.set(paths::ORIGINAL_FILE_FIELD, file.as_str());
    doc.set("updated", now_timestamp());
    doc.save(path)?;

    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let target = parent.join(format!("{}.md", issue.number));
    io::rename_no_clobber(path, &target)?;
    tracing::info!(%file, number = issue.number, "task synced");

    Ok(SyncedItem {
        file,
        title,
        issue: issue.number,
        url: issue.html_url,
    })
}

/// `- [ ] <title> (#N)` for every issue-backed task; closed tasks are ticked.
fn task_checklist(tasks: &[TaskSummary]) -> String {
    let lines: Vec<String> = tasks
        .iter()
        .filter_map(|t| {
            let number = t.issue?;
            let mark = if t.status == status::CLOSED { "x" } else { " " };
            Some(format!("- [{mark}] {} (#{number})", t.title))
        })
        .collect();
    lines.join("\n")
}

// ---------------------------------------------------------------------------
// Mapping file
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingRow {
    pub file: String,
    pub issue: u64,
}

/// Rows of an existing mapping table. Header, separator and prose are skipped.
pub fn parse_mapping(text: &str) -> Vec<MappingRow> {
    text.lines()
        .filter_map(|line| {
            let cells: Vec<&str> = line.trim().strip_prefix('|')?.split('|').map(str::trim).collect();
            let file = *cells.first()?;
            let issue = cells.get(1)?.strip_prefix('#')?.parse().ok()?;
            (!file.is_empty()).then(|| MappingRow {
                file: file.to_string(),
                issue,
            })
        })
        .collect()
}

/// Every known task-to-issue row, ordered by issue number.
///
/// Rows already in the mapping file are kept, tasks carrying their
/// pre-sync file name fill in anything missing, and this run's results win.
fn mapping_rows(path: &Path, tasks: &[TaskSummary], synced: &[SyncedItem]) -> Result<Vec<MappingRow>> {
    let mut rows = BTreeMap::new();
    if path.is_file() {
        for row in parse_mapping(&io::read_text(path)?) {
            rows.insert(row.issue, row.file);
        }
    }
    for task in tasks {
        if let (Some(issue), Some(original)) = (task.issue, &task.original_file) {
            rows.entry(issue).or_insert_with(|| original.clone());
        }
    }
    for item in synced {
        rows.insert(item.issue, item.file.clone());
    }
    Ok(rows
        .into_iter()
        .map(|(issue, file)| MappingRow { file, issue })
        .collect())
}

pub fn render_mapping(epic_title: &str, epic_issue: u64, rows: &[MappingRow]) -> String {
    let mut out = format!(
        "# Epic: {epic_title} (#{epic_issue})\n\n\
         ## Task to GitHub Issue Mapping\n\n\
         | Original File Name | GitHub Issue |\n\
         |--------------------|--------------|\n"
    );
    for row in rows {
        out.push_str(&format!("| {} | #{} |\n", row.file, row.issue));
    }
    out
}

// ---------------------------------------------------------------------------
// sync_epic
// ---------------------------------------------------------------------------

pub fn sync_epic(layout: &Layout, feature: &str, tracker: &dyn IssueTracker) -> Result<EpicSyncReport> {
    validate_identifier(feature)?;
    let epic_dir = layout.epic_dir(feature);
    let epic_path = layout.epic_path(feature);
    let mut epic = Document::load(&epic_path)?;

    let (epic_issue, epic_url) = ensure_epic_issue(&epic_path, &mut epic, tracker)?;

    let files = paths::task_files(&epic_dir).map_err(|source| AipmError::FileOperation {
        path: epic_dir.clone(),
        source,
    })?;

    let tasks = files.into_iter().fold(BatchReport::default(), |report, path| {
        let file = file_name(&path);
        match Document::load(&path) {
            Ok(doc) if already_synced(&path, &doc) => {
                tracing::debug!(%file, "already synced; skipping");
                report
            }
            Ok(doc) => {
                let outcome = sync_task(&path, doc, epic_issue, tracker);
                report.record(file, outcome)
            }
            Err(e) => report.record(file, Err(e)),
        }
    });

    let summaries = collect_tasks(&epic_dir)?;
    let checklist = task_checklist(&summaries);
    if !checklist.is_empty() {
        epic.upsert_section(TASKS_HEADING, &checklist);
        epic.set("updated", now_timestamp());
        epic.save(&epic_path)?;
        let edit = IssueEdit {
            body: Some(epic.body.clone()),
            ..Default::default()
        };
        if let Err(e) = tracker.edit_issue(epic_issue, &edit) {
            tracing::warn!(number = epic_issue, "could not update epic issue body: {e}");
        }
    }

    let mapping_path = layout.mapping_path(feature);
    let rows = mapping_rows(&mapping_path, &summaries, &tasks.succeeded)?;
    let mapping = if rows.is_empty() {
        None
    } else {
        let title = epic.title(&["name", "title"], 1);
        io::atomic_write(&mapping_path, render_mapping(&title, epic_issue, &rows).as_bytes())?;
        tracing::info!(path = %mapping_path.display(), rows = rows.len(), "mapping written");
        Some(mapping_path)
    };

    Ok(EpicSyncReport {
        feature: feature.to_string(),
        epic_issue,
        epic_url,
        tasks,
        mapping,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PathsConfig;
    use crate::tracker::fake::FakeTracker;
    use tempfile::TempDir;

    fn write(path: &Path, text: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, text).unwrap();
    }

    fn seed(dir: &TempDir) -> Layout {
        let layout = Layout::new(dir.path(), &PathsConfig::default());
        write(
            &layout.epic_path("shop"),
            "---\nname: shop\nstatus: planning\ncreated: 2024-01-01T00:00:00Z\nprogress: 0%\ngithub: TBD\n---\n\n# shop\n\n## Overview\nA shop.\n",
        );
        for (i, title) in ["Cart", "Checkout", "Search"].iter().enumerate() {
            write(
                &layout.task_path("shop", i + 1),
                &format!("---\nname: {title}\ntitle: {title}\nstatus: todo\ngithub: TBD\n---\n\n# Task: {title}\n"),
            );
        }
        layout
    }

    #[test]
    fn sync_creates_issues_and_renames_tasks() {
        let dir = TempDir::new().unwrap();
        let layout = seed(&dir);
        let tracker = FakeTracker::starting_at(10);

        let report = sync_epic(&layout, "shop", &tracker).unwrap();
        assert_eq!(report.epic_issue, 10);
        assert!(report.tasks.is_success());
        let numbers: Vec<u64> = report.tasks.succeeded.iter().map(|i| i.issue).collect();
        assert_eq!(numbers, vec![11, 12, 13]);

        let epic_issue = tracker.issue(10).unwrap();
        assert_eq!(epic_issue.title, "[EPIC] shop");
        assert!(epic_issue.labels.iter().any(|l| l.name == "epic"));

        let task_issue = tracker.issue(11).unwrap();
        assert!(task_issue.body.unwrap().starts_with("Parent Epic: #10\n\n---\n\n"));

        let epic_dir = layout.epic_dir("shop");
        assert!(!layout.task_path("shop", 1).exists());
        let task = Document::load(&epic_dir.join("11.md")).unwrap();
        assert_eq!(task.issue_number(), Some(11));
        assert_eq!(task.field("github"), Some("https://github.com/acme/app/issues/11"));

        let epic = Document::load(&layout.epic_path("shop")).unwrap();
        assert_eq!(epic.issue_number(), Some(10));
        assert!(epic.body.contains("## Tasks\n\n- [ ] Cart (#11)\n- [ ] Checkout (#12)"));
        assert!(tracker.issue(10).unwrap().body.unwrap().contains("- [ ] Search (#13)"));

        let mapping = std::fs::read_to_string(layout.mapping_path("shop")).unwrap();
        assert!(mapping.starts_with("# Epic: shop (#10)"));
        assert!(mapping.contains("| shop-task-02.md | #12 |"));
    }

    #[test]
    fn partial_failure_is_reported_not_raised() {
        let dir = TempDir::new().unwrap();
        let layout = seed(&dir);
        let tracker = FakeTracker {
            fail_titles: vec!["Checkout".to_string()],
            ..FakeTracker::starting_at(1)
        };

        let report = sync_epic(&layout, "shop", &tracker).unwrap();
        assert!(!report.tasks.is_success());
        assert_eq!(report.tasks.succeeded.len(), 2);
        assert_eq!(report.tasks.failed.len(), 1);
        assert_eq!(report.tasks.failed[0].file, "shop-task-02.md");
        assert!(layout.task_path("shop", 2).exists());
    }

    #[test]
    fn rerun_only_syncs_remaining_tasks() {
        let dir = TempDir::new().unwrap();
        let layout = seed(&dir);
        let failing = FakeTracker {
            fail_titles: vec!["Search".to_string()],
            ..FakeTracker::starting_at(1)
        };
        sync_epic(&layout, "shop", &failing).unwrap();

        let tracker = FakeTracker::starting_at(20);
        let report = sync_epic(&layout, "shop", &tracker).unwrap();
        assert_eq!(report.epic_issue, 1);
        assert_eq!(report.tasks.succeeded.len(), 1);
        assert_eq!(report.tasks.succeeded[0].file, "shop-task-03.md");
        assert!(tracker.issue(20).unwrap().body.unwrap().starts_with("Parent Epic: #1"));

        let mapping = std::fs::read_to_string(layout.mapping_path("shop")).unwrap();
        assert_eq!(
            parse_mapping(&mapping),
            vec![
                MappingRow { file: "shop-task-01.md".into(), issue: 2 },
                MappingRow { file: "shop-task-02.md".into(), issue: 3 },
                MappingRow { file: "shop-task-03.md".into(), issue: 20 },
            ]
        );
    }

    #[test]
    fn mapping_rebuilt_from_task_frontmatter_when_missing() {
        let dir = TempDir::new().unwrap();
        let layout = seed(&dir);
        sync_epic(&layout, "shop", &FakeTracker::starting_at(1)).unwrap();
        let task = Document::load(&layout.epic_dir("shop").join("3.md")).unwrap();
        assert_eq!(task.field("original_file"), Some("shop-task-02.md"));

        std::fs::remove_file(layout.mapping_path("shop")).unwrap();
        let report = sync_epic(&layout, "shop", &FakeTracker::starting_at(50)).unwrap();
        assert!(report.tasks.succeeded.is_empty());
        assert_eq!(report.mapping, Some(layout.mapping_path("shop")));

        let mapping = std::fs::read_to_string(layout.mapping_path("shop")).unwrap();
        assert!(mapping.starts_with("# Epic: shop (#1)"));
        assert!(mapping.contains("| shop-task-01.md | #2 |\n| shop-task-02.md | #3 |\n| shop-task-03.md | #4 |\n"));
    }

    #[test]
    fn parse_mapping_skips_header_rows() {
        let text = render_mapping(
            "shop",
            1,
            &[MappingRow { file: "shop-task-01.md".into(), issue: 2 }],
        );
        assert_eq!(
            parse_mapping(&text),
            vec![MappingRow { file: "shop-task-01.md".into(), issue: 2 }]
        );
        assert!(parse_mapping("| a | b |\n| x | #y |\n|  | #3 |\n").is_empty());
    }

    #[test]
    fn epic_issue_failure_aborts() {
        let dir = TempDir::new().unwrap();
        let layout = seed(&dir);
        let tracker = FakeTracker {
            fail_titles: vec!["[EPIC]".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            sync_epic(&layout, "shop", &tracker),
            Err(AipmError::ExternalService { .. })
        ));
        assert!(layout.task_path("shop", 1).exists());
        assert!(!layout.mapping_path("shop").exists());
    }

    #[test]
    fn missing_epic_fails() {
        let dir = TempDir::new().unwrap();
        let layout = Layout::new(dir.path(), &PathsConfig::default());
        let tracker = FakeTracker::default();
        assert!(matches!(
            sync_epic(&layout, "ghost", &tracker),
            Err(AipmError::DocumentNotFound(_))
        ));
    }
}
