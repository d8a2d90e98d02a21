use super::{load_config, with_answers, ModeArgs};
use crate::output::{print_json, summary_writer};
use aipm_core::{
    epic::PrdParse,
    prd::PrdNew,
    workflow::{run_step, StepContext},
};
use anyhow::Context;
use clap::Subcommand;
use std::path::Path;

#[derive(Subcommand)]
pub enum PrdSubcommand {
    /// Write a new PRD for a feature
    New {
        /// Feature name (kebab-case, e.g. user-auth)
        feature: String,
        #[command(flatten)]
        mode: ModeArgs,
    },
    /// Turn a PRD into a technical epic
    Parse {
        feature: String,
        #[command(flatten)]
        mode: ModeArgs,
    },
}

pub fn run(root: &Path, subcmd: PrdSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        PrdSubcommand::New { feature, mode } => new(root, &feature, mode, json),
        PrdSubcommand::Parse { feature, mode } => parse(root, &feature, mode, json),
    }
}

fn new(root: &Path, feature: &str, mode: ModeArgs, json: bool) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let layout = config.layout(root);
    let mut out = summary_writer(json);

    let created = with_answers(&config, mode.mode(), |answers| {
        let ctx = StepContext::new(&layout, answers, &mut *out);
        run_step(&mut PrdNew::new(feature, ctx))
            .with_context(|| format!("failed to create PRD '{feature}'"))
    })?;

    if json {
        print_json(&created)?;
    }
    Ok(())
}

fn parse(root: &Path, feature: &str, mode: ModeArgs, json: bool) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let layout = config.layout(root);
    let mut out = summary_writer(json);

    let created = with_answers(&config, mode.mode(), |answers| {
        let ctx = StepContext::new(&layout, answers, &mut *out);
        run_step(&mut PrdParse::new(feature, ctx))
            .with_context(|| format!("failed to parse PRD '{feature}' into an epic"))
    })?;

    if json {
        print_json(&created)?;
    }
    Ok(())
}
