use super::load_config;
use crate::output::{print_json, print_table};
use aipm_core::{config::WarnLevel, paths};
use clap::Subcommand;
use std::path::Path;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Print the resolved configuration and environment, secrets masked
    Show,
}

pub fn run(root: &Path, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Show => show(root, json),
    }
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn show(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let env = config.env_report();
    let warnings = config.validate();
    let source = if paths::config_path(root).exists() {
        paths::CONFIG_FILE
    } else {
        "defaults"
    };

    if json {
        return print_json(&serde_json::json!({
            "root": root,
            "source": source,
            "config": config,
            "environment": env,
            "warnings": warnings,
        }));
    }

    println!("# root: {}", root.display());
    println!("# source: {source}");
    print!("{}", serde_yaml::to_string(&config)?);
    println!();

    let rows = env
        .iter()
        .map(|v| {
            vec![
                v.name.clone(),
                v.value.clone().unwrap_or_else(|| "(not set)".to_string()),
                v.purpose.clone(),
            ]
        })
        .collect();
    print_table(&["VARIABLE", "VALUE", "PURPOSE"], rows);

    for w in &warnings {
        let prefix = match w.level {
            WarnLevel::Warning => "warning",
            WarnLevel::Error => "error",
        };
        println!("[{prefix}] {}", w.message);
    }
    Ok(())
}
