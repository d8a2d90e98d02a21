mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{
    config::ConfigSubcommand, doc::DocSubcommand, epic::EpicSubcommand, issue::IssueSubcommand,
    prd::PrdSubcommand,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "aipm",
    about = "PRD → epic → task workflow, synced to GitHub issues",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .aipm/, .claude/ or .git/)
    #[arg(long, global = true, env = "AIPM_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create .aipm/config.yaml and the document directories
    Init,

    /// Write and parse product requirement documents
    Prd {
        #[command(subcommand)]
        subcommand: PrdSubcommand,
    },

    /// Decompose, sync, inspect and close epics
    Epic {
        #[command(subcommand)]
        subcommand: EpicSubcommand,
    },

    /// Work with individual task issues
    Issue {
        #[command(subcommand)]
        subcommand: IssueSubcommand,
    },

    /// Inspect frontmatter documents
    Doc {
        #[command(subcommand)]
        subcommand: DocSubcommand,
    },

    /// Show the resolved configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Epic {
            subcommand: EpicSubcommand::Sync { .. } | EpicSubcommand::Close { .. },
        }
        | Commands::Issue { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = ctrlc::set_handler(|| {
        eprintln!("interrupted");
        std::process::exit(130);
    }) {
        tracing::debug!("could not install Ctrl-C handler: {e}");
    }

    let root = root::resolve_root(cli.root.as_deref());

    let env_file = aipm_core::paths::env_path(&root);
    match dotenvy::from_path(&env_file) {
        Ok(()) => tracing::debug!(path = %env_file.display(), "loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!(path = %env_file.display(), "could not load .env: {e}"),
    }

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root, cli.json),
        Commands::Prd { subcommand } => cmd::prd::run(&root, subcommand, cli.json),
        Commands::Epic { subcommand } => cmd::epic::run(&root, subcommand, cli.json),
        Commands::Issue { subcommand } => cmd::issue::run(&root, subcommand, cli.json),
        Commands::Doc { subcommand } => cmd::doc::run(subcommand, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
