//! Generative-text collaborator: the [`TextGenerator`] seam, retry policy,
//! prompt builders, and parsers that turn model output back into answers.

use crate::config::AiConfig;
use crate::error::{AipmError, Result};
use crate::section::{extract_labeled_block, list_items};
use crate::source::{EpicAnalysis, PrdAnswers, TaskDraft};
use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;

pub trait TextGenerator {
    fn generate(&self, prompt: &str) -> Result<String>;
}

impl TextGenerator for genai_client::GeminiClient {
    fn generate(&self, prompt: &str) -> Result<String> {
        genai_client::GeminiClient::generate(self, prompt)
            .map_err(|e| AipmError::external("gemini", e))
    }
}

/// Build the Gemini client described by `cfg`. A missing API key is fatal.
pub fn gemini_from_config(cfg: &AiConfig) -> Result<genai_client::GeminiClient> {
    let key = cfg.api_key()?;
    let client = genai_client::GeminiClient::new(key, cfg.model.clone())
        .map_err(|e| AipmError::external("gemini", e))?;
    Ok(match &cfg.base_url {
        Some(url) => client.with_base_url(url.clone()),
        None => client,
    })
}

// ---------------------------------------------------------------------------
// Retry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&AiConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(cfg: &AiConfig) -> Self {
        Self {
            max_attempts: cfg.max_retries,
            backoff: Duration::from_millis(cfg.retry_backoff_ms),
        }
    }
}

/// Call `generator` up to `policy.max_attempts` times. Errors and blank
/// responses both count as failed attempts. `None` once attempts run out.
pub fn generate_with_retry(
    generator: &dyn TextGenerator,
    prompt: &str,
    policy: &RetryPolicy,
) -> Option<String> {
    for attempt in 1..=policy.max_attempts {
        match generator.generate(prompt) {
            Ok(text) if !text.trim().is_empty() => return Some(text.trim().to_string()),
            Ok(_) => tracing::warn!(attempt, max = policy.max_attempts, "empty AI response"),
            Err(e) => {
                tracing::warn!(attempt, max = policy.max_attempts, error = %e, "AI generation failed")
            }
        }
        if attempt < policy.max_attempts && !policy.backoff.is_zero() {
            std::thread::sleep(policy.backoff);
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Prompts
// ---------------------------------------------------------------------------

pub fn prd_prompt(feature: &str, basics: &[(&str, String)]) -> String {
    let info = basics
        .iter()
        .map(|(k, v)| format!("- {k}: {v}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "You are a senior product manager and technical architect. Using the information \
below, write the product requirements for the feature \"{feature}\".

Information from the user:
{info}

Answer with exactly these Markdown sections:

## Executive Summary
[goal, value and key metrics in a short paragraph]

## Problem Statement
[the problem and the user pain points]

## User Stories
[3-5 bullet items: As a ..., I want ..., so that ...]

## Functional Requirements
[bullet list]

## Non-Functional Requirements
[bullet list: performance, security, availability, ...]

## Technical Constraints
[bullet list]

## Success Metrics
[bullet list of measurable outcomes]
"
    )
}

pub fn epic_prompt(feature: &str, prd_text: &str) -> String {
    format!(
        "You are a senior technical architect and engineering lead. Based on the PRD below, \
write the technical implementation analysis for the feature \"{feature}\".

PRD:
{prd_text}

Answer with exactly these Markdown sections:

## Architecture Decisions
## Technical Approach
## Implementation Strategy
## Task Breakdown Preview
[bullet list of candidate tasks]
## Dependencies
## Risk Assessment
## Success Criteria
## Estimated Effort
"
    )
}

pub fn tasks_prompt(feature: &str, epic_text: &str) -> String {
    format!(
        "You are a senior project manager. Break the epic below for the feature \"{feature}\" \
into 5-8 concrete development tasks, each completable in 1-3 days.

Epic:
{epic_text}

Use this format for every task:

## Task 1: <task name>
**Description:** <what to build>
**Category:** <design/frontend/backend/database/testing/deployment>
**Acceptance Criteria:**
- <criterion>
**Dependencies:** <task numbers this depends on, e.g. Task 1, Task 2, or none>
**Parallel:** <yes/no>
**Estimated Effort:** <e.g. 2 days>
"
    )
}

// ---------------------------------------------------------------------------
// Output parsers
// ---------------------------------------------------------------------------

/// Fill `base` with the sections found in a PRD response. `None` when the
/// response contains none of them.
pub fn parse_prd_output(text: &str, mut base: PrdAnswers) -> Option<PrdAnswers> {
    let mut found = false;
    let mut take_text = |label: &str, slot: &mut String| {
        let block = extract_labeled_block(text, label);
        if !block.is_empty() {
            *slot = block;
            found = true;
        }
    };
    take_text("Executive Summary", &mut base.executive_summary);
    take_text("Problem Statement", &mut base.problem);

    let lists: [(&str, &mut Vec<String>); 5] = [
        ("User Stories", &mut base.user_stories),
        ("Functional Requirements", &mut base.functional_requirements),
        ("Non-Functional Requirements", &mut base.non_functional_requirements),
        ("Technical Constraints", &mut base.constraints),
        ("Success Metrics", &mut base.success_metrics),
    ];
    for (label, slot) in lists {
        let block = extract_labeled_block(text, label);
        if block.is_empty() {
            continue;
        }
        let items = list_items(&block);
        *slot = if items.is_empty() { vec![block] } else { items };
        found = true;
    }
    found.then_some(base)
}

/// Epic analysis sections; `None` when no section is present.
pub fn parse_epic_output(text: &str, mut base: EpicAnalysis) -> Option<EpicAnalysis> {
    let mut found = false;
    let slots: [(&str, &mut String); 7] = [
        ("Architecture Decisions", &mut base.architecture_decisions),
        ("Technical Approach", &mut base.technical_approach),
        ("Implementation Strategy", &mut base.implementation_strategy),
        ("Dependencies", &mut base.dependencies),
        ("Risk Assessment", &mut base.risk_assessment),
        ("Success Criteria", &mut base.success_criteria),
        ("Estimated Effort", &mut base.estimated_effort),
    ];
    for (label, slot) in slots {
        let block = extract_labeled_block(text, label);
        if !block.is_empty() {
            *slot = block;
            found = true;
        }
    }
    let preview = list_items(&extract_labeled_block(text, "Task Breakdown Preview"));
    if !preview.is_empty() {
        base.task_preview = preview;
        found = true;
    }
    found.then_some(base)
}

static TASK_HEADING_RE: OnceLock<Regex> = OnceLock::new();
static NUMBER_RE: OnceLock<Regex> = OnceLock::new();

fn task_heading_re() -> &'static Regex {
    TASK_HEADING_RE.get_or_init(|| {
        Regex::new(r"(?im)^#{2,4}\s*Task\s+(\d+)\s*[:.\-]\s*(.+?)\s*$").unwrap()
    })
}

fn number_re() -> &'static Regex {
    NUMBER_RE.get_or_init(|| Regex::new(r"\d+").unwrap())
}

/// Tasks from `## Task N: Name` blocks. Dependencies are 1-based task
/// numbers in the text and become 0-based indices; references to the task
/// itself or to later tasks are dropped.
pub fn parse_task_output(text: &str) -> Vec<TaskDraft> {
    let headings: Vec<_> = task_heading_re().captures_iter(text).collect();
    let mut tasks = Vec::with_capacity(headings.len());

    for (i, caps) in headings.iter().enumerate() {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(2)) else {
            continue;
        };
        let end = headings
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map(|m| m.start())
            .unwrap_or(text.len());
        let block = &text[whole.end()..end];
        let index = tasks.len();

        let field = |label: &str| extract_labeled_block(block, label);
        let dependencies = field("Dependencies");
        let dependencies: Vec<usize> = number_re()
            .find_iter(&dependencies)
            .filter_map(|m| m.as_str().parse::<usize>().ok())
            .filter_map(|n| n.checked_sub(1))
            .filter(|&d| d < index)
            .collect();
        let parallel = field("Parallel").to_lowercase();
        let category = field("Category");
        let estimate = field("Estimated Effort");

        tasks.push(TaskDraft {
            name: name.as_str().trim().to_string(),
            description: field("Description"),
            category: if category.is_empty() {
                "development".to_string()
            } else {
                category.to_lowercase()
            },
            parallel: if parallel.is_empty() {
                dependencies.is_empty()
            } else {
                parallel.starts_with('y') || parallel.starts_with("true")
            },
            dependencies,
            estimate: if estimate.is_empty() {
                "TBD".to_string()
            } else {
                estimate
            },
            acceptance_criteria: list_items(&field("Acceptance Criteria")),
        });
    }
    tasks
}
