use crate::output::print_json;
use aipm_core::{
    io::read_text,
    section::{extract_frontmatter_field, extract_section},
    validate::validate_required_fields,
};
use clap::Subcommand;
use std::path::{Path, PathBuf};

#[derive(Subcommand)]
pub enum DocSubcommand {
    /// Check that a document has frontmatter with the required fields
    Validate {
        path: PathBuf,
        /// Comma-separated field names, e.g. name,status,created
        #[arg(long, value_delimiter = ',')]
        require: Vec<String>,
    },
    /// Print the content under a Markdown heading
    Section { path: PathBuf, heading: String },
    /// Print one frontmatter field
    Field { path: PathBuf, field: String },
}

pub fn run(subcmd: DocSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        DocSubcommand::Validate { path, require } => validate(&path, &require, json),
        DocSubcommand::Section { path, heading } => section(&path, &heading, json),
        DocSubcommand::Field { path, field: name } => field(&path, &name, json),
    }
}

fn validate(path: &Path, require: &[String], json: bool) -> anyhow::Result<()> {
    let text = read_text(path)?;
    let required: Vec<&str> = require
        .iter()
        .map(|f| f.trim())
        .filter(|f| !f.is_empty())
        .collect();
    validate_required_fields(&text, &required)?;

    if json {
        print_json(&serde_json::json!({
            "path": path,
            "valid": true,
            "required": required,
        }))?;
    } else {
        println!("{}: ok", path.display());
    }
    Ok(())
}

fn section(path: &Path, heading: &str, json: bool) -> anyhow::Result<()> {
    let text = read_text(path)?;
    let content = extract_section(&text, heading);
    if json {
        return print_json(&serde_json::json!({
            "heading": heading,
            "content": content,
        }));
    }
    if content.is_empty() {
        anyhow::bail!("no section '{heading}' in {}", path.display());
    }
    println!("{content}");
    Ok(())
}

fn field(path: &Path, name: &str, json: bool) -> anyhow::Result<()> {
    let text = read_text(path)?;
    let value = extract_frontmatter_field(&text, name);
    if json {
        return print_json(&serde_json::json!({
            "field": name,
            "value": value,
        }));
    }
    match value {
        Some(value) => {
            println!("{value}");
            Ok(())
        }
        None => anyhow::bail!("no field '{name}' in {}", path.display()),
    }
}
