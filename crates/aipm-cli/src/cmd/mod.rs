pub mod config;
pub mod doc;
pub mod epic;
pub mod init;
pub mod issue;
pub mod prd;

use anyhow::Context;
use aipm_core::{
    ai::{gemini_from_config, RetryPolicy},
    answers::{AiAnswers, InteractiveAnswers},
    config::Config,
    prompt::IoPrompter,
    source::{AnswerSource, DefaultAnswers},
    tracker::GitHubTracker,
    types::Mode,
};
use clap::Args;

/// How the generation commands collect their content.
#[derive(Args, Debug, Clone, Copy)]
pub struct ModeArgs {
    /// Generate content with the configured AI model
    #[arg(long, conflicts_with = "non_interactive")]
    pub ai: bool,

    /// Use built-in defaults without prompting
    #[arg(long)]
    pub non_interactive: bool,
}

impl ModeArgs {
    pub fn mode(self) -> Mode {
        Mode::from_flags(self.ai, self.non_interactive)
    }
}

/// Build the answer source for `mode` and hand it to `f`. Questions go to
/// stderr so stdout stays clean for summaries and JSON.
pub fn with_answers<T>(
    config: &Config,
    mode: Mode,
    f: impl FnOnce(&mut dyn AnswerSource) -> anyhow::Result<T>,
) -> anyhow::Result<T> {
    tracing::debug!(%mode, "collecting answers");
    match mode {
        Mode::NonInteractive => f(&mut DefaultAnswers),
        Mode::Interactive => {
            let prompter = IoPrompter::new(std::io::stdin().lock(), std::io::stderr());
            f(&mut InteractiveAnswers::new(prompter))
        }
        Mode::Ai => {
            let client = gemini_from_config(&config.ai)
                .context("--ai needs a generative-text API key")?;
            let prompter = IoPrompter::new(std::io::stdin().lock(), std::io::stderr());
            let mut answers =
                AiAnswers::new(&client, RetryPolicy::from_config(&config.ai), prompter);
            f(&mut answers)
        }
    }
}

pub fn github_tracker(config: &Config) -> anyhow::Result<GitHubTracker> {
    let creds = config
        .tracker
        .credentials()
        .context("issue tracker is not configured")?;
    Ok(GitHubTracker::new(creds)?)
}

pub fn load_config(root: &std::path::Path) -> anyhow::Result<Config> {
    Config::load(root).context("failed to load config")
}
