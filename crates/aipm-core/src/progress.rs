use crate::document::{now_timestamp, Document};
use crate::error::{AipmError, Result};
use crate::paths::{self, Layout, EPIC_FILE};
use crate::types::status;
use crate::validate::validate_identifier;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// One task file as seen by progress and status reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskSummary {
    pub file: String,
    pub name: String,
    pub title: String,
    pub status: String,
    pub issue: Option<u64>,
    /// Name the file had before sync renamed it to `<issue>.md`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_file: Option<String>,
}

impl TaskSummary {
    pub fn is_closed(&self) -> bool {
        self.status == status::CLOSED
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpicStatus {
    pub feature: String,
    pub status: String,
    pub progress: String,
    pub github: Option<String>,
    pub closed: usize,
    pub tasks: Vec<TaskSummary>,
}

/// `floor(closed / total * 100)` as `N%`. No tasks → `0%`.
pub fn format_progress(closed: usize, total: usize) -> String {
    if total == 0 {
        return "0%".to_string();
    }
    format!("{}%", closed * 100 / total)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Summaries of every task file in `epic_dir`, sorted by file name.
/// Files that fail to parse are reported with status `unknown`.
pub fn collect_tasks(epic_dir: &Path) -> Result<Vec<TaskSummary>> {
    let files = paths::task_files(epic_dir).map_err(|source| AipmError::FileOperation {
        path: epic_dir.to_path_buf(),
        source,
    })?;

    let mut tasks = Vec::with_capacity(files.len());
    for path in files {
        let file = file_name(&path);
        let stem = file.trim_end_matches(".md").to_string();
        let summary = match Document::load(&path) {
            Ok(doc) => TaskSummary {
                name: doc.field("name").unwrap_or(&stem).to_string(),
                title: doc.title(&["title", "name"], 2),
                status: doc.status().unwrap_or(status::TODO).to_string(),
                issue: doc
                    .issue_number()
                    .or_else(|| paths::issue_number_from_file(&file)),
                original_file: doc.field(paths::ORIGINAL_FILE_FIELD).map(str::to_string),
                file,
            },
            Err(e) => {
                tracing::warn!(path = %path.display(), "unreadable task: {e}");
                TaskSummary {
                    name: stem.clone(),
                    title: stem,
                    status: "unknown".to_string(),
                    issue: paths::issue_number_from_file(&file),
                    original_file: None,
                    file,
                }
            }
        };
        tasks.push(summary);
    }
    Ok(tasks)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressUpdate {
    pub epic: PathBuf,
    pub closed: usize,
    pub total: usize,
    pub progress: String,
}

/// Recount closed tasks and write `progress` and `updated` into `epic.md`.
pub fn recompute_progress(epic_dir: &Path) -> Result<ProgressUpdate> {
    let epic_path = epic_dir.join(EPIC_FILE);
    let mut epic = Document::load(&epic_path)?;
    let tasks = collect_tasks(epic_dir)?;
    let closed = tasks.iter().filter(|t| t.is_closed()).count();
    let progress = format_progress(closed, tasks.len());

    epic.set("progress", progress.as_str());
    epic.set("updated", now_timestamp());
    epic.save(&epic_path)?;
    tracing::info!(epic = %epic_path.display(), closed, total = tasks.len(), %progress, "epic progress updated");

    Ok(ProgressUpdate {
        epic: epic_path,
        closed,
        total: tasks.len(),
        progress,
    })
}

/// Read-only view of an epic and its tasks.
pub fn epic_status(layout: &Layout, feature: &str) -> Result<EpicStatus> {
    validate_identifier(feature)?;
    let epic = Document::load(&layout.epic_path(feature))?;
    let tasks = collect_tasks(&layout.epic_dir(feature))?;
    let closed = tasks.iter().filter(|t| t.is_closed()).count();

    Ok(EpicStatus {
        feature: feature.to_string(),
        status: epic.status().unwrap_or("unknown").to_string(),
        progress: format_progress(closed, tasks.len()),
        github: epic
            .field("github")
            .filter(|g| *g != crate::types::UNSYNCED)
            .map(str::to_string),
        closed,
        tasks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PathsConfig;
    use tempfile::TempDir;

    fn write(path: &Path, text: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, text).unwrap();
    }

    fn seed(dir: &TempDir) -> Layout {
        let layout = Layout::new(dir.path(), &PathsConfig::default());
        let epic_dir = layout.epic_dir("shop");
        write(
            &epic_dir.join("epic.md"),
            "---\nname: shop\nstatus: planning\ncreated: 2024-01-01T00:00:00Z\nprogress: 0%\n---\n\n# shop\n",
        );
        write(&epic_dir.join("101.md"), "---\nname: Cart\nstatus: closed\ngithub_issue_number: 101\n---\n");
        write(&epic_dir.join("102.md"), "---\nname: Checkout\nstatus: open\n---\n");
        write(&epic_dir.join("shop-task-03.md"), "---\nname: Search\ntitle: Product search\nstatus: todo\n---\n");
        write(&epic_dir.join("github-mapping.md"), "# mapping\n");
        write(&epic_dir.join("README.md"), "# readme\n");
        layout
    }

    #[test]
    fn progress_is_floored() {
        assert_eq!(format_progress(0, 0), "0%");
        assert_eq!(format_progress(1, 3), "33%");
        assert_eq!(format_progress(2, 3), "66%");
        assert_eq!(format_progress(3, 3), "100%");
    }

    #[test]
    fn collect_skips_non_task_files() {
        let dir = TempDir::new().unwrap();
        let layout = seed(&dir);
        let tasks = collect_tasks(&layout.epic_dir("shop")).unwrap();
        let files: Vec<&str> = tasks.iter().map(|t| t.file.as_str()).collect();
        assert_eq!(files, vec!["101.md", "102.md", "shop-task-03.md"]);
        assert_eq!(tasks[1].issue, Some(102));
        assert_eq!(tasks[2].title, "Product search");
        assert_eq!(tasks[2].issue, None);
    }

    #[test]
    fn recompute_writes_progress_and_updated() {
        let dir = TempDir::new().unwrap();
        let layout = seed(&dir);
        let update = recompute_progress(&layout.epic_dir("shop")).unwrap();
        assert_eq!((update.closed, update.total), (1, 3));
        assert_eq!(update.progress, "33%");

        let epic = Document::load(&layout.epic_path("shop")).unwrap();
        assert_eq!(epic.field("progress"), Some("33%"));
        assert!(epic.field("updated").is_some());
    }

    #[test]
    fn status_report_is_read_only() {
        let dir = TempDir::new().unwrap();
        let layout = seed(&dir);
        let before = std::fs::read_to_string(layout.epic_path("shop")).unwrap();
        let report = epic_status(&layout, "shop").unwrap();
        assert_eq!(report.status, "planning");
        assert_eq!(report.progress, "33%");
        assert_eq!(report.closed, 1);
        assert_eq!(report.github, None);
        assert_eq!(std::fs::read_to_string(layout.epic_path("shop")).unwrap(), before);
    }

    #[test]
    fn status_of_missing_epic_fails() {
        let dir = TempDir::new().unwrap();
        let layout = Layout::new(dir.path(), &PathsConfig::default());
        assert!(matches!(
            epic_status(&layout, "ghost"),
            Err(AipmError::DocumentNotFound(_))
        ));
    }
}
