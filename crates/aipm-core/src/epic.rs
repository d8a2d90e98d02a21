use crate::document::{now_timestamp, Document};
use crate::error::Result;
use crate::frontmatter::Frontmatter;
use crate::prd::{bullets, PRD_REQUIRED_FIELDS};
use crate::source::EpicAnalysis;
use crate::types::{status, UNSYNCED};
use crate::validate::{validate_identifier, validate_required_fields};
use crate::workflow::{StepContext, WorkflowStep};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;

/// Fields an epic must carry before it can be decomposed.
pub const EPIC_REQUIRED_FIELDS: &[&str] = &["name", "status", "created"];

#[derive(Debug, Clone, Serialize)]
pub struct EpicCreated {
    pub feature: String,
    pub path: PathBuf,
    pub prd: String,
    pub created: String,
}

pub fn render_epic(feature: &str, prd_ref: &str, analysis: &EpicAnalysis, created: &str) -> Document {
    let mut fm = Frontmatter::new();
    fm.set("name", feature);
    fm.set("status", status::PLANNING);
    fm.set("created", created);
    fm.set("progress", "0%");
    fm.set("prd", prd_ref);
    fm.set("github", UNSYNCED);

    let preview = if analysis.task_preview.is_empty() {
        "- Detailed tasks are generated by `aipm epic decompose`".to_string()
    } else {
        bullets(&analysis.task_preview, "")
    };

    let body = format!(
        "# {feature} - Technical Implementation Epic

## Overview
{overview}

## Architecture Decisions
{architecture}

## Technical Approach
{approach}

## Implementation Strategy
{strategy}

## Task Breakdown Preview
{preview}

## Dependencies
{dependencies}

## Risk Assessment
{risks}

## Success Criteria
{success}

## Estimated Effort
{effort}
",
        overview = analysis.overview,
        architecture = analysis.architecture_decisions,
        approach = analysis.technical_approach,
        strategy = analysis.implementation_strategy,
        dependencies = analysis.dependencies,
        risks = analysis.risk_assessment,
        success = analysis.success_criteria,
        effort = analysis.estimated_effort,
    );
    Document::new(fm, body)
}

// ---------------------------------------------------------------------------
// PrdParse step
// ---------------------------------------------------------------------------

/// `aipm prd parse <feature>`: turn a PRD into `<epics>/<feature>/epic.md`.
pub struct PrdParse<'a> {
    feature: String,
    ctx: StepContext<'a>,
}

impl<'a> PrdParse<'a> {
    pub fn new(feature: impl Into<String>, ctx: StepContext<'a>) -> Self {
        Self {
            feature: feature.into(),
            ctx,
        }
    }
}

impl WorkflowStep for PrdParse<'_> {
    type Output = EpicCreated;

    fn name(&self) -> &str {
        "prd-parse"
    }

    fn validate_preconditions(&mut self) -> Result<bool> {
        if let Err(e) = validate_identifier(&self.feature) {
            tracing::error!("{e}");
            return Ok(false);
        }
        let prd_path = self.ctx.layout.prd_path(&self.feature);
        if !prd_path.exists() {
            tracing::error!(
                path = %prd_path.display(),
                "PRD not found; run `aipm prd new {}` first",
                self.feature
            );
            return Ok(false);
        }
        let text = crate::io::read_text(&prd_path)?;
        if let Err(e) = validate_required_fields(&text, PRD_REQUIRED_FIELDS) {
            tracing::error!(path = %prd_path.display(), "invalid PRD: {e}");
            return Ok(false);
        }
        let epic_path = self.ctx.layout.epic_path(&self.feature);
        if !self.ctx.may_overwrite(&epic_path)? {
            return Ok(false);
        }
        crate::io::ensure_dir(&self.ctx.layout.epic_dir(&self.feature))?;
        Ok(true)
    }

    fn execute(&mut self) -> Result<EpicCreated> {
        let layout = self.ctx.layout;
        let prd_path = layout.prd_path(&self.feature);
        let prd = Document::load(&prd_path)?;
        let analysis = self.ctx.answers.epic_analysis(&self.feature, &prd)?;

        let created = now_timestamp();
        let prd_ref = layout.reference(&prd_path);
        let doc = render_epic(&self.feature, &prd_ref, &analysis, &created);
        let path = layout.epic_path(&self.feature);
        doc.save(&path)?;
        tracing::info!(path = %path.display(), "epic written");

        Ok(EpicCreated {
            feature: self.feature.clone(),
            path,
            prd: prd_ref,
            created,
        })
    }

    fn post_process(&mut self, output: &EpicCreated) -> Result<bool> {
        let out = &mut self.ctx.out;
        writeln!(out, "Epic created: {}", self.ctx.layout.reference(&output.path))?;
        writeln!(out, "From PRD:     {}", output.prd)?;
        writeln!(out, "Created:      {}", output.created)?;
        writeln!(out)?;
        writeln!(out, "Next: aipm epic decompose {}", output.feature)?;
        Ok(true)
    }
}
