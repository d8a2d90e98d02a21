use crate::frontmatter;
use regex::Regex;
use std::sync::OnceLock;

static HEADING_RE: OnceLock<Regex> = OnceLock::new();

fn heading_re() -> &'static Regex {
    HEADING_RE.get_or_init(|| Regex::new(r"^(#{1,6})\s+(.*?)\s*$").unwrap())
}

/// `(level, title)` for a Markdown ATX heading line.
pub(crate) fn heading(line: &str) -> Option<(usize, &str)> {
    let caps = heading_re().captures(line.trim_end_matches('\r'))?;
    let level = caps.get(1)?.as_str().len();
    let title = caps.get(2)?.as_str();
    Some((level, title))
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Content under the first level-2+ heading whose text equals `name`
/// (case-insensitive), up to the next heading of the same or a higher level.
/// Returns an empty string when the heading does not exist.
pub fn extract_section(text: &str, name: &str) -> String {
    let wanted = name.trim().to_lowercase();
    let mut lines = text.lines();

    let level = loop {
        let Some(line) = lines.next() else {
            return String::new();
        };
        if let Some((level, title)) = heading(line) {
            if level >= 2 && title.to_lowercase() == wanted {
                break level;
            }
        }
    };

    let content: Vec<&str> = lines
        .take_while(|line| !matches!(heading(line), Some((l, _)) if l <= level))
        .collect();
    content.join("\n").trim().to_string()
}

/// Find a block in generated text. Tries a heading section first, then a
/// `**Label:**` line followed by content up to the next bold label.
pub fn extract_labeled_block(text: &str, label: &str) -> String {
    let section = extract_section(text, label);
    if !section.is_empty() {
        return section;
    }

    let marker = format!("**{}:**", label.trim().to_lowercase());
    let mut lines = text.lines();
    let first = loop {
        let Some(line) = lines.next() else {
            return String::new();
        };
        let trimmed = line.trim();
        if trimmed.to_lowercase().starts_with(&marker) {
            break trimmed.get(marker.len()..).unwrap_or("").trim().to_string();
        }
    };

    let mut block = vec![first];
    block.extend(
        lines
            .take_while(|line| !line.trim_start().starts_with("**") && heading(line).is_none())
            .map(str::to_string),
    );
    block.join("\n").trim().to_string()
}

/// One header field rendered as text. `None` when the field is absent or the
/// header cannot be parsed.
pub fn extract_frontmatter_field(text: &str, field: &str) -> Option<String> {
    let (fm, _) = frontmatter::parse(text).ok()?;
    fm.get(field).map(ToString::to_string)
}

/// Bullet items (`-` or `*`) of a section, markers stripped.
pub fn list_items(section: &str) -> Vec<String> {
    section
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            line.strip_prefix("- ")
                .or_else(|| line.strip_prefix("* "))
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
        })
        .collect()
}

/// First `#`/`##` heading text in a body, used as a fallback title.
pub fn first_heading(body: &str, max_level: usize) -> Option<String> {
    body.lines()
        .filter_map(heading)
        .find(|(level, _)| *level <= max_level)
        .map(|(_, title)| title.to_string())
}
