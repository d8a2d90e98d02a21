use crate::ai::{self, RetryPolicy, TextGenerator};
use crate::document::Document;
use crate::error::Result;
use crate::prompt::Prompter;
use crate::source::{
    default_epic_analysis_for, default_prd_answers, default_task_drafts, AnswerSource,
    EpicAnalysis, PrdAnswers, TaskDraft,
};
use std::path::Path;

pub const TASK_CATEGORIES: &[&str] = &[
    "design",
    "frontend",
    "backend",
    "database",
    "testing",
    "deployment",
    "development",
];

fn ask_overwrite<P: Prompter>(prompter: &mut P, path: &Path) -> Result<bool> {
    prompter.confirm(&format!("{} already exists. Overwrite?", path.display()), false)
}

// ---------------------------------------------------------------------------
// InteractiveAnswers
// ---------------------------------------------------------------------------

/// Asks the user for everything through a [`Prompter`].
pub struct InteractiveAnswers<P> {
    prompter: P,
}

impl<P: Prompter> InteractiveAnswers<P> {
    pub fn new(prompter: P) -> Self {
        Self { prompter }
    }

    pub fn into_inner(self) -> P {
        self.prompter
    }

    /// Comma-separated 1-based task numbers, limited to tasks before `index`.
    fn parse_dependencies(raw: &str, index: usize) -> Vec<usize> {
        raw.split(|c: char| c == ',' || c.is_whitespace())
            .filter_map(|s| s.trim().parse::<usize>().ok())
            .filter_map(|n| n.checked_sub(1))
            .filter(|&d| d < index)
            .collect()
    }
}

impl<P: Prompter> AnswerSource for InteractiveAnswers<P> {
    fn prd_answers(&mut self, feature: &str) -> Result<PrdAnswers> {
        let p = &mut self.prompter;
        p.say(&format!("Creating PRD for '{feature}'"))?;
        let description = p.ask_required("Feature description")?;
        let problem = p.ask_required("Problem to solve")?;
        let target_users = p.ask("Target users", "General users")?;
        let user_stories = p.ask_list("User stories")?;
        let functional_requirements = p.ask_list("Functional requirements")?;
        let non_functional_requirements = p.ask_list("Non-functional requirements")?;
        let constraints = p.ask_list("Technical constraints")?;
        let success_metrics = p.ask_list("Success metrics")?;
        let timeline = p.ask("Timeline", "TBD")?;
        let out_of_scope = p.ask_list("Out of scope")?;
        let dependencies = p.ask_list("Dependencies")?;

        Ok(PrdAnswers {
            executive_summary: description.clone(),
            description,
            problem,
            target_users,
            user_stories,
            functional_requirements,
            non_functional_requirements,
            constraints,
            success_metrics,
            timeline,
            out_of_scope,
            dependencies,
        })
    }

    fn epic_analysis(&mut self, feature: &str, prd: &Document) -> Result<EpicAnalysis> {
        let defaults = default_epic_analysis_for(feature, prd);
        let p = &mut self.prompter;
        p.say(&format!("Technical analysis for '{feature}'"))?;
        Ok(EpicAnalysis {
            architecture_decisions: p.ask("Architecture decisions", &defaults.architecture_decisions)?,
            technical_approach: p.ask("Technical approach", &defaults.technical_approach)?,
            implementation_strategy: p
                .ask("Implementation strategy", &defaults.implementation_strategy)?,
            dependencies: p.ask("Technical dependencies", &defaults.dependencies)?,
            risk_assessment: p.ask("Risk assessment", &defaults.risk_assessment)?,
            success_criteria: p.ask("Success criteria", &defaults.success_criteria)?,
            estimated_effort: p.ask("Estimated effort", &defaults.estimated_effort)?,
            ..defaults
        })
    }

    fn task_drafts(&mut self, feature: &str, _epic: &Document) -> Result<Vec<TaskDraft>> {
        let p = &mut self.prompter;
        p.say(&format!("Task breakdown for '{feature}' (blank name or 'done' to finish)"))?;
        let mut tasks: Vec<TaskDraft> = Vec::new();
        loop {
            let n = tasks.len() + 1;
            let name = p.ask(&format!("Task {n} name"), "")?;
            if name.is_empty() || matches!(name.to_lowercase().as_str(), "done" | "quit" | "exit") {
                break;
            }
            let description = p.ask("Description", "To be detailed")?;
            let category = p.choose("Category", TASK_CATEGORIES, "development")?;
            let dependencies = if tasks.is_empty() {
                Vec::new()
            } else {
                let raw = p.ask("Depends on task numbers (e.g. 1,2)", "none")?;
                Self::parse_dependencies(&raw, tasks.len())
            };
            let parallel = p.confirm("Can run in parallel?", dependencies.is_empty())?;
            let estimate = p.ask("Estimated effort", "TBD")?;
            tasks.push(TaskDraft {
                name,
                description,
                category,
                dependencies,
                parallel,
                estimate,
                acceptance_criteria: Vec::new(),
            });
            if !p.confirm("Add another task?", true)? {
                break;
            }
        }

        if tasks.is_empty() {
            tracing::warn!(feature, "no tasks entered, using the default breakdown");
            return Ok(default_task_drafts());
        }
        Ok(tasks)
    }

    fn confirm_overwrite(&mut self, path: &Path) -> Result<bool> {
        ask_overwrite(&mut self.prompter, path)
    }
}

// ---------------------------------------------------------------------------
// AiAnswers
// ---------------------------------------------------------------------------

/// Drafts content with a [`TextGenerator`]. A few basic PRD questions go
/// through the prompter; anything the model cannot produce falls back to
/// the defaults.
pub struct AiAnswers<'g, P> {
    generator: &'g dyn TextGenerator,
    policy: RetryPolicy,
    prompter: P,
}

impl<'g, P: Prompter> AiAnswers<'g, P> {
    pub fn new(generator: &'g dyn TextGenerator, policy: RetryPolicy, prompter: P) -> Self {
        Self {
            generator,
            policy,
            prompter,
        }
    }

    fn generate(&self, prompt: &str) -> Option<String> {
        tracing::info!(attempts = self.policy.max_attempts, "requesting AI draft");
        ai::generate_with_retry(self.generator, prompt, &self.policy)
    }
}

impl<'g, P: Prompter> AnswerSource for AiAnswers<'g, P> {
    fn prd_answers(&mut self, feature: &str) -> Result<PrdAnswers> {
        let p = &mut self.prompter;
        let description = p.ask_required("Feature description")?;
        let target_users = p.ask("Target users", "General users")?;
        let business_value = p.ask_required("Business value")?;

        let mut base = default_prd_answers(feature);
        base.executive_summary = description.clone();
        base.description = description.clone();
        base.target_users = target_users.clone();

        let prompt = ai::prd_prompt(
            feature,
            &[
                ("description", description),
                ("target users", target_users),
                ("business value", business_value),
            ],
        );
        match self
            .generate(&prompt)
            .and_then(|text| ai::parse_prd_output(&text, base.clone()))
        {
            Some(answers) => Ok(answers),
            None => {
                tracing::warn!(feature, "AI unavailable, using default PRD content");
                Ok(base)
            }
        }
    }

    fn epic_analysis(&mut self, feature: &str, prd: &Document) -> Result<EpicAnalysis> {
        let base = default_epic_analysis_for(feature, prd);
        let prompt = ai::epic_prompt(feature, &prd.to_text());
        match self
            .generate(&prompt)
            .and_then(|text| ai::parse_epic_output(&text, base.clone()))
        {
            Some(analysis) => Ok(analysis),
            None => {
                tracing::warn!(feature, "AI unavailable, using default analysis");
                Ok(base)
            }
        }
    }

    fn task_drafts(&mut self, feature: &str, epic: &Document) -> Result<Vec<TaskDraft>> {
        let prompt = ai::tasks_prompt(feature, &epic.to_text());
        let tasks = self
            .generate(&prompt)
            .map(|text| ai::parse_task_output(&text))
            .unwrap_or_default();
        if tasks.is_empty() {
            tracing::warn!(feature, "AI unavailable, using the default breakdown");
            return Ok(default_task_drafts());
        }
        Ok(tasks)
    }

    fn confirm_overwrite(&mut self, path: &Path) -> Result<bool> {
        ask_overwrite(&mut self.prompter, path)
    }
}
