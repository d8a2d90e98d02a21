use crate::output::print_json;
use aipm_core::{
    config::{Config, WarnLevel},
    io, paths,
};
use anyhow::Context;
use std::path::Path;

const ENV_TEMPLATE: &str = "\
# aipm reads these from the environment; uncomment and fill in.
# GITHUB_TOKEN=ghp_...
# GITHUB_REPO=owner/name
# GEMINI_API_KEY=...
";

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let config_path = paths::config_path(root);
    let config = if config_path.exists() {
        Config::load(root).context("failed to load config")?
    } else {
        Config::default()
    };
    let layout = config.layout(root);

    if !json {
        println!("Initializing aipm in: {}", root.display());
    }

    let mut created = Vec::new();
    for dir in [paths::aipm_dir(root), layout.prds_dir(), layout.epics_dir()] {
        if !dir.is_dir() {
            io::ensure_dir(&dir).with_context(|| format!("failed to create {}", dir.display()))?;
            created.push(layout.reference(&dir));
        }
    }

    let config_created = !config_path.exists();
    if config_created {
        config.save(root).context("failed to write config.yaml")?;
        created.push(paths::CONFIG_FILE.to_string());
    }

    let env_example = root.join(".env.example");
    if io::write_if_missing(&env_example, ENV_TEMPLATE.as_bytes())? {
        created.push(".env.example".to_string());
    }

    if json {
        return print_json(&serde_json::json!({
            "root": root,
            "created": created,
        }));
    }

    for item in &created {
        println!("  created: {item}");
    }
    if !config_created {
        println!("  exists:  {}", paths::CONFIG_FILE);
    }
    for w in config.validate() {
        let prefix = match w.level {
            WarnLevel::Warning => "warning",
            WarnLevel::Error => "error",
        };
        println!("  [{prefix}] {}", w.message);
    }
    println!("\nNext: aipm prd new <feature>");
    Ok(())
}
