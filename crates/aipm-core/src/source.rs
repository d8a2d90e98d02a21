use crate::document::Document;
use crate::error::Result;
use crate::section::{extract_section, list_items};
use serde::Serialize;
use std::path::Path;

// ---------------------------------------------------------------------------
// Answer types
// ---------------------------------------------------------------------------

/// Everything a PRD is rendered from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrdAnswers {
    pub description: String,
    pub executive_summary: String,
    pub problem: String,
    pub target_users: String,
    pub user_stories: Vec<String>,
    pub functional_requirements: Vec<String>,
    pub non_functional_requirements: Vec<String>,
    pub constraints: Vec<String>,
    pub success_metrics: Vec<String>,
    pub timeline: String,
    pub out_of_scope: Vec<String>,
    pub dependencies: Vec<String>,
}

/// Technical analysis an epic is rendered from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpicAnalysis {
    pub overview: String,
    pub architecture_decisions: String,
    pub technical_approach: String,
    pub implementation_strategy: String,
    pub task_preview: Vec<String>,
    pub dependencies: String,
    pub risk_assessment: String,
    pub success_criteria: String,
    pub estimated_effort: String,
}

/// One task before it is numbered and written.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskDraft {
    pub name: String,
    pub description: String,
    pub category: String,
    /// Zero-based indices of earlier tasks in the same batch.
    pub dependencies: Vec<usize>,
    pub parallel: bool,
    pub estimate: String,
    pub acceptance_criteria: Vec<String>,
}

// ---------------------------------------------------------------------------
// AnswerSource
// ---------------------------------------------------------------------------

/// Where a generation step gets its content and its overwrite decisions.
/// One implementation per [`crate::types::Mode`].
pub trait AnswerSource {
    fn prd_answers(&mut self, feature: &str) -> Result<PrdAnswers>;

    fn epic_analysis(&mut self, feature: &str, prd: &Document) -> Result<EpicAnalysis>;

    fn task_drafts(&mut self, feature: &str, epic: &Document) -> Result<Vec<TaskDraft>>;

    /// Asked before replacing an existing document (or task set) at `path`.
    fn confirm_overwrite(&mut self, path: &Path) -> Result<bool>;
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

pub fn default_prd_answers(feature: &str) -> PrdAnswers {
    let description = format!("{feature} feature implementation");
    PrdAnswers {
        executive_summary: description.clone(),
        description,
        problem: "To be analysed: user needs and pain points.".to_string(),
        target_users: "General users".to_string(),
        user_stories: vec!["User stories to be added".to_string()],
        functional_requirements: vec!["Functional requirements to be added".to_string()],
        non_functional_requirements: vec!["Non-functional requirements to be added".to_string()],
        constraints: vec!["Technical constraints to be assessed".to_string()],
        success_metrics: vec!["Success metrics to be defined".to_string()],
        timeline: "To be set by the project manager".to_string(),
        out_of_scope: Vec::new(),
        dependencies: Vec::new(),
    }
}

pub fn default_epic_analysis(feature: &str, description: &str, preview: &[String]) -> EpicAnalysis {
    let overview = if description.trim().is_empty() {
        format!("Technical implementation of {feature}.")
    } else {
        description.trim().to_string()
    };
    EpicAnalysis {
        overview,
        architecture_decisions: "Architecture and technology choices to be decided by the team."
            .to_string(),
        technical_approach: "Technology stack to be evaluated.".to_string(),
        implementation_strategy: "Detailed implementation plan to be drawn up.".to_string(),
        task_preview: preview.to_vec(),
        dependencies: "Technical dependencies and external integrations to be analysed."
            .to_string(),
        risk_assessment: "Technical risks and mitigations to be assessed.".to_string(),
        success_criteria: "Technical acceptance criteria to be defined.".to_string(),
        estimated_effort: "Development effort to be estimated.".to_string(),
    }
}

/// Analysis defaults seeded from a PRD: description as overview, functional
/// requirements as the task preview.
pub fn default_epic_analysis_for(feature: &str, prd: &Document) -> EpicAnalysis {
    let description = prd.field("description").unwrap_or_default();
    let preview = list_items(&extract_section(&prd.body, "Functional Requirements"));
    default_epic_analysis(feature, description, &preview)
}

fn draft(
    name: &str,
    description: &str,
    category: &str,
    dependencies: &[usize],
    parallel: bool,
    estimate: &str,
) -> TaskDraft {
    TaskDraft {
        name: name.to_string(),
        description: description.to_string(),
        category: category.to_string(),
        dependencies: dependencies.to_vec(),
        parallel,
        estimate: estimate.to_string(),
        acceptance_criteria: Vec::new(),
    }
}

/// Design, frontend, backend, tests, deployment.
pub fn default_task_drafts() -> Vec<TaskDraft> {
    vec![
        draft("UI/UX design", "Design the user interface and interaction flow", "design", &[], true, "2-3 days"),
        draft("Frontend development", "Implement the frontend features", "frontend", &[0], false, "5-7 days"),
        draft("Backend development", "Implement the backend API and business logic", "backend", &[], true, "5-7 days"),
        draft("Unit tests", "Write and run unit tests", "testing", &[1, 2], false, "2-3 days"),
        draft("Deployment", "Configure the production deployment", "deployment", &[3], false, "1-2 days"),
    ]
}

/// Deterministic answers for non-interactive runs. Overwrites are confirmed
/// without asking.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultAnswers;

impl AnswerSource for DefaultAnswers {
    fn prd_answers(&mut self, feature: &str) -> Result<PrdAnswers> {
        Ok(default_prd_answers(feature))
    }

    fn epic_analysis(&mut self, feature: &str, prd: &Document) -> Result<EpicAnalysis> {
        Ok(default_epic_analysis_for(feature, prd))
    }

    fn task_drafts(&mut self, _feature: &str, _epic: &Document) -> Result<Vec<TaskDraft>> {
        Ok(default_task_drafts())
    }

    fn confirm_overwrite(&mut self, path: &Path) -> Result<bool> {
        tracing::warn!(path = %path.display(), "overwriting existing file (non-interactive)");
        Ok(true)
    }
}
