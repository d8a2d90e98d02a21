use crate::config::PathsConfig;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const AIPM_DIR: &str = ".aipm";
pub const CONFIG_FILE: &str = ".aipm/config.yaml";
pub const ENV_FILE: &str = ".env";

pub const DEFAULT_PRDS_DIR: &str = ".claude/prds";
pub const DEFAULT_EPICS_DIR: &str = ".claude/epics";

pub const EPIC_FILE: &str = "epic.md";
pub const MAPPING_FILE: &str = "github-mapping.md";
pub const README_FILE: &str = "README.md";
pub const UPDATES_DIR: &str = "updates";
pub const PROGRESS_FILE: &str = "progress.md";
/// Task frontmatter field holding the file name used before sync.
pub const ORIGINAL_FILE_FIELD: &str = "original_file";

/// Files inside an epic directory that are never tasks.
pub const NON_TASK_FILES: &[&str] = &[EPIC_FILE, MAPPING_FILE, README_FILE];

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn aipm_dir(root: &Path) -> PathBuf {
    root.join(AIPM_DIR)
}

pub fn env_path(root: &Path) -> PathBuf {
    root.join(ENV_FILE)
}

// ---------------------------------------------------------------------------
// Layout: where PRDs, epics and tasks live for one project root
// ---------------------------------------------------------------------------

/// Resolved document locations. Every command goes through this so the
/// PRD/epic/task convention is applied in exactly one place.
#[derive(Debug, Clone)]
pub struct Layout {
    root: PathBuf,
    prds_dir: PathBuf,
    epics_dir: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>, paths: &PathsConfig) -> Self {
        Self {
            root: root.into(),
            prds_dir: PathBuf::from(&paths.prds_dir),
            epics_dir: PathBuf::from(&paths.epics_dir),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn prds_dir(&self) -> PathBuf {
        self.root.join(&self.prds_dir)
    }

    pub fn epics_dir(&self) -> PathBuf {
        self.root.join(&self.epics_dir)
    }

    pub fn prd_path(&self, feature: &str) -> PathBuf {
        self.prds_dir().join(format!("{feature}.md"))
    }

    pub fn epic_dir(&self, feature: &str) -> PathBuf {
        self.epics_dir().join(feature)
    }

    pub fn epic_path(&self, feature: &str) -> PathBuf {
        self.epic_dir(feature).join(EPIC_FILE)
    }

    pub fn task_path(&self, feature: &str, index: usize) -> PathBuf {
        self.epic_dir(feature).join(task_file_name(feature, index))
    }

    pub fn issue_task_path(&self, feature: &str, issue: u64) -> PathBuf {
        self.epic_dir(feature).join(format!("{issue}.md"))
    }

    pub fn mapping_path(&self, feature: &str) -> PathBuf {
        self.epic_dir(feature).join(MAPPING_FILE)
    }

    /// Path written into cross-reference fields: relative to the root,
    /// forward slashes regardless of platform.
    pub fn reference(&self, path: &Path) -> String {
        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        rel.components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Progress notes kept next to a task: `<epic>/updates/<issue>/progress.md`.
pub fn progress_note_path(epic_dir: &Path, issue: u64) -> PathBuf {
    epic_dir
        .join(UPDATES_DIR)
        .join(issue.to_string())
        .join(PROGRESS_FILE)
}

// ---------------------------------------------------------------------------
// Task naming
// ---------------------------------------------------------------------------

/// `<feature>-task-NN`, 1-based, zero-padded to two digits.
pub fn task_name(feature: &str, index: usize) -> String {
    format!("{feature}-task-{index:02}")
}

pub fn task_file_name(feature: &str, index: usize) -> String {
    format!("{}.md", task_name(feature, index))
}

/// True for Markdown files in an epic directory that represent tasks.
pub fn is_task_file(file_name: &str) -> bool {
    file_name.ends_with(".md") && !NON_TASK_FILES.contains(&file_name)
}

/// Issue number encoded in a synced task file name (`123.md`).
pub fn issue_number_from_file(file_name: &str) -> Option<u64> {
    file_name.strip_suffix(".md")?.parse().ok()
}

/// Task files of an epic directory, sorted by file name. Missing directory → empty.
pub fn task_files(epic_dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    if !epic_dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in std::fs::read_dir(epic_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        if is_task_file(&name.to_string_lossy()) {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
