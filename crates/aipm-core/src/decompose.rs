use crate::document::{now_timestamp, Document};
use crate::epic::EPIC_REQUIRED_FIELDS;
use crate::error::Result;
use crate::frontmatter::{FieldValue, Frontmatter};
use crate::paths::{self, task_name};
use crate::source::TaskDraft;
use crate::types::{status, UNSYNCED};
use crate::validate::{validate_identifier, validate_required_fields};
use crate::workflow::{StepContext, WorkflowStep};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const GENERATED_TASKS_HEADING: &str = "Generated Tasks";

const DEFAULT_ACCEPTANCE: &[&str] = &[
    "Functionality fully implemented",
    "Code reviewed",
    "Related tests pass",
    "Documentation updated",
];

#[derive(Debug, Clone, Serialize)]
pub struct TasksCreated {
    pub feature: String,
    pub files: Vec<PathBuf>,
    pub task_count: usize,
    pub parallel_count: usize,
    pub created: String,
    /// Already-synced `<issue>.md` tasks left in place; progress still counts them.
    pub kept_synced: Vec<PathBuf>,
}

/// `none`, or the sibling task names for `deps`.
fn depends_on(feature: &str, deps: &[usize]) -> FieldValue {
    if deps.is_empty() {
        return FieldValue::from("none");
    }
    FieldValue::List(deps.iter().map(|&d| task_name(feature, d + 1)).collect())
}

/// Render task number `index` (1-based).
pub fn render_task(
    feature: &str,
    index: usize,
    draft: &TaskDraft,
    epic_ref: &str,
    created: &str,
) -> Document {
    let deps = depends_on(feature, &draft.dependencies);
    let parallel = if draft.parallel { "true" } else { "false" };

    let mut fm = Frontmatter::new();
    fm.set("name", task_name(feature, index));
    fm.set("title", draft.name.replace('\n', " "));
    fm.set("status", status::TODO);
    fm.set("created", created);
    fm.set("updated", created);
    fm.set("github", UNSYNCED);
    fm.set("depends_on", deps.clone());
    fm.set("parallel", parallel);
    fm.set("conflicts_with", "none");
    fm.set("epic", epic_ref);

    let criteria: Vec<String> = if draft.acceptance_criteria.is_empty() {
        DEFAULT_ACCEPTANCE.iter().map(|c| c.to_string()).collect()
    } else {
        draft.acceptance_criteria.clone()
    };
    let criteria = criteria
        .iter()
        .map(|c| format!("- [ ] {c}"))
        .collect::<Vec<_>>()
        .join("\n");
    let description = if draft.description.trim().is_empty() {
        "To be detailed"
    } else {
        draft.description.trim()
    };

    let body = format!(
        "# Task: {title}

## Description
{description}

## Category
{category}

## Acceptance Criteria
{criteria}

## Technical Details
To be completed by the development team.

## Dependencies
{deps}

## Estimated Effort
{estimate}

## Notes
- Parallel: {parallel}
- Created: {created}
",
        title = draft.name,
        category = draft.category,
        estimate = draft.estimate,
    );
    Document::new(fm, body)
}

/// Unsynced `<feature>-task-NN.md` files in an epic directory.
fn numbered_task_files(epic_dir: &Path, feature: &str) -> Result<Vec<PathBuf>> {
    let prefix = format!("{feature}-task-");
    let files = paths::task_files(epic_dir)?;
    Ok(files
        .into_iter()
        .filter(|p| {
            p.file_name()
                .map(|n| n.to_string_lossy().starts_with(&prefix))
                .unwrap_or(false)
        })
        .collect())
}

/// Synced `<issue>.md` task files in an epic directory.
fn synced_task_files(epic_dir: &Path) -> Result<Vec<PathBuf>> {
    let files = paths::task_files(epic_dir)?;
    Ok(files
        .into_iter()
        .filter(|p| {
            p.file_name()
                .and_then(|n| paths::issue_number_from_file(&n.to_string_lossy()))
                .is_some()
        })
        .collect())
}

// ---------------------------------------------------------------------------
// EpicDecompose step
// ---------------------------------------------------------------------------

/// `aipm epic decompose <feature>`: write one task file per draft and list
/// them in the epic.
pub struct EpicDecompose<'a> {
    feature: String,
    ctx: StepContext<'a>,
    replace: Vec<PathBuf>,
    kept_synced: Vec<PathBuf>,
}

impl<'a> EpicDecompose<'a> {
    pub fn new(feature: impl Into<String>, ctx: StepContext<'a>) -> Self {
        Self {
            feature: feature.into(),
            ctx,
            replace: Vec::new(),
            kept_synced: Vec::new(),
        }
    }
}

impl WorkflowStep for EpicDecompose<'_> {
    type Output = TasksCreated;

    fn name(&self) -> &str {
        "epic-decompose"
    }

    fn validate_preconditions(&mut self) -> Result<bool> {
        if let Err(e) = validate_identifier(&self.feature) {
            tracing::error!("{e}");
            return Ok(false);
        }
        let epic_path = self.ctx.layout.epic_path(&self.feature);
        if !epic_path.exists() {
            tracing::error!(
                path = %epic_path.display(),
                "epic not found; run `aipm prd parse {}` first",
                self.feature
            );
            return Ok(false);
        }
        let text = crate::io::read_text(&epic_path)?;
        if let Err(e) = validate_required_fields(&text, EPIC_REQUIRED_FIELDS) {
            tracing::error!(path = %epic_path.display(), "invalid epic: {e}");
            return Ok(false);
        }
        let epic = Document::parse(&text)?;
        if epic.status() == Some(status::COMPLETED) {
            tracing::error!(feature = %self.feature, "epic is already completed");
            return Ok(false);
        }

        let epic_dir = self.ctx.layout.epic_dir(&self.feature);
        let existing = paths::task_files(&epic_dir)?;
        if !existing.is_empty() {
            tracing::warn!(count = existing.len(), "task files already exist");
            let synced = synced_task_files(&epic_dir)?;
            if !synced.is_empty() {
                let names: Vec<String> = synced
                    .iter()
                    .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
                    .collect();
                tracing::warn!(
                    count = synced.len(),
                    files = %names.join(", "),
                    "synced task files will be kept and still count toward progress"
                );
            }
            if !self.ctx.answers.confirm_overwrite(&epic_dir)? {
                tracing::info!("task overwrite declined");
                return Ok(false);
            }
            self.replace = numbered_task_files(&epic_dir, &self.feature)?;
            self.kept_synced = synced;
        }
        Ok(true)
    }

    fn execute(&mut self) -> Result<TasksCreated> {
        let layout = self.ctx.layout;
        let epic_path = layout.epic_path(&self.feature);
        let mut epic = Document::load(&epic_path)?;
        let drafts = self.ctx.answers.task_drafts(&self.feature, &epic)?;

        for old in self.replace.drain(..) {
            std::fs::remove_file(&old).map_err(|source| crate::error::AipmError::FileOperation {
                path: old.clone(),
                source,
            })?;
            tracing::info!(path = %old.display(), "removed previous task file");
        }

        let created = now_timestamp();
        let epic_ref = layout.reference(&epic_path);
        let mut files = Vec::with_capacity(drafts.len());
        let mut checklist = Vec::with_capacity(drafts.len());
        for (i, draft) in drafts.iter().enumerate() {
            let index = i + 1;
            let doc = render_task(&self.feature, index, draft, &epic_ref, &created);
            let path = layout.task_path(&self.feature, index);
            doc.save(&path)?;
            tracing::info!(path = %path.display(), "task written");
            checklist.push(format!("- [ ] {} - {}", task_name(&self.feature, index), draft.name));
            files.push(path);
        }

        epic.upsert_section(GENERATED_TASKS_HEADING, &checklist.join("\n"));
        epic.save(&epic_path)?;

        Ok(TasksCreated {
            feature: self.feature.clone(),
            task_count: files.len(),
            parallel_count: drafts.iter().filter(|d| d.parallel).count(),
            files,
            created,
            kept_synced: std::mem::take(&mut self.kept_synced),
        })
    }

    fn post_process(&mut self, output: &TasksCreated) -> Result<bool> {
        let out = &mut self.ctx.out;
        writeln!(out, "Created {} tasks for {}", output.task_count, output.feature)?;
        writeln!(out, "Parallel tasks: {}", output.parallel_count)?;
        writeln!(out, "Created:        {}", output.created)?;
        writeln!(out)?;
        for path in &output.files {
            writeln!(out, "  {}", self.ctx.layout.reference(path))?;
        }
        if !output.kept_synced.is_empty() {
            writeln!(out)?;
            writeln!(
                out,
                "Kept {} synced task file(s); they still count toward progress:",
                output.kept_synced.len()
            )?;
            for path in &output.kept_synced {
                writeln!(out, "  {}", self.ctx.layout.reference(path))?;
            }
        }
        writeln!(out)?;
        writeln!(out, "Next: aipm epic sync {}", output.feature)?;
        Ok(true)
    }
}
