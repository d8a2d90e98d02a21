use crate::document::{now_timestamp, Document};
use crate::error::Result;
use crate::frontmatter::Frontmatter;
use crate::source::PrdAnswers;
use crate::types::status;
use crate::validate::validate_identifier;
use crate::workflow::{StepContext, WorkflowStep};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;

/// Fields a PRD must carry before it can be parsed into an epic.
pub const PRD_REQUIRED_FIELDS: &[&str] = &["name", "description", "status", "created"];

#[derive(Debug, Clone, Serialize)]
pub struct PrdCreated {
    pub feature: String,
    pub path: PathBuf,
    pub created: String,
}

pub(crate) fn bullets(items: &[String], placeholder: &str) -> String {
    if items.is_empty() {
        return format!("- {placeholder}");
    }
    items
        .iter()
        .map(|item| format!("- {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_prd(feature: &str, answers: &PrdAnswers, created: &str) -> Document {
    let mut fm = Frontmatter::new();
    fm.set("name", feature);
    fm.set("description", answers.description.replace('\n', " "));
    fm.set("status", status::BACKLOG);
    fm.set("created", created);

    let body = format!(
        "# {feature}

## Executive Summary
{summary}

## Problem Statement
{problem}

## Target Users
{users}

## User Stories
{stories}

## Requirements

### Functional Requirements
{functional}

### Non-Functional Requirements
{non_functional}

### Technical Constraints
{constraints}

## Success Metrics
{metrics}

## Timeline
{timeline}

## Out of Scope
{out_of_scope}

## Dependencies
{dependencies}
",
        summary = answers.executive_summary,
        problem = answers.problem,
        users = answers.target_users,
        stories = bullets(&answers.user_stories, "User stories to be added"),
        functional = bullets(&answers.functional_requirements, "To be added"),
        non_functional = bullets(&answers.non_functional_requirements, "To be added"),
        constraints = bullets(&answers.constraints, "To be added"),
        metrics = bullets(&answers.success_metrics, "To be defined"),
        timeline = answers.timeline,
        out_of_scope = bullets(&answers.out_of_scope, "Nothing excluded yet"),
        dependencies = bullets(&answers.dependencies, "None identified"),
    );
    Document::new(fm, body)
}

// ---------------------------------------------------------------------------
// PrdNew step
// ---------------------------------------------------------------------------

/// `aipm prd new <feature>`: collect answers and write `<prds>/<feature>.md`.
pub struct PrdNew<'a> {
    feature: String,
    ctx: StepContext<'a>,
}

impl<'a> PrdNew<'a> {
    pub fn new(feature: impl Into<String>, ctx: StepContext<'a>) -> Self {
        Self {
            feature: feature.into(),
            ctx,
        }
    }
}

impl WorkflowStep for PrdNew<'_> {
    type Output = PrdCreated;

    fn name(&self) -> &str {
        "prd-new"
    }

    fn validate_preconditions(&mut self) -> Result<bool> {
        if let Err(e) = validate_identifier(&self.feature) {
            tracing::error!("{e}");
            return Ok(false);
        }
        let path = self.ctx.layout.prd_path(&self.feature);
        if !self.ctx.may_overwrite(&path)? {
            return Ok(false);
        }
        crate::io::ensure_dir(&self.ctx.layout.prds_dir())?;
        Ok(true)
    }

    fn execute(&mut self) -> Result<PrdCreated> {
        let answers = self.ctx.answers.prd_answers(&self.feature)?;
        let created = now_timestamp();
        let doc = render_prd(&self.feature, &answers, &created);
        let path = self.ctx.layout.prd_path(&self.feature);
        doc.save(&path)?;
        tracing::info!(path = %path.display(), "PRD written");
        Ok(PrdCreated {
            feature: self.feature.clone(),
            path,
            created,
        })
    }

    fn post_process(&mut self, output: &PrdCreated) -> Result<bool> {
        let out = &mut self.ctx.out;
        writeln!(out, "PRD created: {}", self.ctx.layout.reference(&output.path))?;
        writeln!(out, "Created:     {}", output.created)?;
        writeln!(out)?;
        writeln!(out, "Next: aipm prd parse {}", output.feature)?;
        Ok(true)
    }
}
