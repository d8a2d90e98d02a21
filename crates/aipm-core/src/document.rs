use crate::error::{AipmError, Result};
use crate::frontmatter::{self, FieldValue, Frontmatter};
use crate::section;
use chrono::{DateTime, NaiveDateTime, Utc};
use std::path::Path;

/// `created`, `updated` and `completed` are always written in this format (UTC).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

pub fn timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

pub fn now_timestamp() -> String {
    timestamp(Utc::now())
}

/// Parse a header timestamp. Accepts the canonical format and full RFC 3339.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        })
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// A PRD, epic or task: a frontmatter header plus a Markdown body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub frontmatter: Frontmatter,
    pub body: String,
}

impl Document {
    pub fn new(frontmatter: Frontmatter, body: impl Into<String>) -> Self {
        Self {
            frontmatter,
            body: body.into(),
        }
    }

    pub fn parse(text: &str) -> Result<Self> {
        let (frontmatter, body) = frontmatter::parse(text)?;
        Ok(Self { frontmatter, body })
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(AipmError::DocumentNotFound(path.to_path_buf()));
        }
        let text = crate::io::read_text(path)?;
        Self::parse(&text)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        crate::io::atomic_write(path, self.to_text().as_bytes())?;
        tracing::debug!(path = %path.display(), "document written");
        Ok(())
    }

    pub fn to_text(&self) -> String {
        frontmatter::serialize(&self.frontmatter, &self.body)
    }

    pub fn field(&self, key: &str) -> Option<&str> {
        self.frontmatter.text(key)
    }

    pub fn set(&mut self, key: &str, value: impl Into<FieldValue>) {
        self.frontmatter.set(key, value);
    }

    pub fn status(&self) -> Option<&str> {
        self.field("status")
    }

    pub fn labels(&self) -> Vec<String> {
        match self.frontmatter.get("labels") {
            Some(FieldValue::List(items)) => items.clone(),
            Some(FieldValue::Text(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
            _ => Vec::new(),
        }
    }

    /// `github_issue_number` as a number, when set and numeric.
    pub fn issue_number(&self) -> Option<u64> {
        self.field("github_issue_number")?.trim().parse().ok()
    }

    /// First non-empty value among `keys`, then the first heading up to
    /// `max_level`, then `No Title`.
    pub fn title(&self, keys: &[&str], max_level: usize) -> String {
        keys.iter()
            .filter_map(|k| self.field(k))
            .map(str::trim)
            .find(|v| !v.is_empty())
            .map(str::to_string)
            .or_else(|| section::first_heading(&self.body, max_level))
            .unwrap_or_else(|| "No Title".to_string())
    }

    /// Replace the body of the level-2 section `heading`, or append it when
    /// absent. Later sections are kept as they were.
    pub fn upsert_section(&mut self, heading: &str, content: &str) {
        let block = format!("## {heading}\n\n{}\n", content.trim_end());
        let wanted = heading.to_lowercase();
        let lines: Vec<&str> = self.body.lines().collect();

        let start = lines.iter().position(|line| {
            matches!(section::heading(line), Some((2, title)) if title.to_lowercase() == wanted)
        });

        self.body = match start {
            Some(start) => {
                let end = lines[start + 1..]
                    .iter()
                    .position(|line| matches!(section::heading(line), Some((level, _)) if level <= 2))
                    .map(|i| start + 1 + i)
                    .unwrap_or(lines.len());
                let mut out = String::new();
                for line in &lines[..start] {
                    out.push_str(line);
                    out.push('\n');
                }
                out.push_str(&block);
                if end < lines.len() {
                    out.push('\n');
                    for line in &lines[end..] {
                        out.push_str(line);
                        out.push('\n');
                    }
                }
                out
            }
            None => {
                let existing = self.body.trim_end();
                if existing.is_empty() {
                    block
                } else {
                    format!("{existing}\n\n{block}")
                }
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn timestamp_format() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(timestamp(at), "2024-03-09T07:05:01Z");
        assert_eq!(parse_timestamp("2024-03-09T07:05:01Z"), Some(at));
        assert_eq!(parse_timestamp("2024-03-09T08:05:01+01:00"), Some(at));
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn load_missing_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = Document::load(&dir.path().join("missing.md")).unwrap_err();
        assert!(matches!(err, AipmError::DocumentNotFound(_)));
    }

    #[test]
    fn save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prds/demo.md");
        let mut doc = Document::default();
        doc.set("name", "demo");
        doc.set("status", "backlog");
        doc.body = "# demo\n".to_string();
        doc.save(&path).unwrap();

        let loaded = Document::load(&path).unwrap();
        assert_eq!(loaded, doc);
        assert_eq!(loaded.status(), Some("backlog"));
    }

    #[test]
    fn title_fallbacks() {
        let doc = Document::parse("---\nname: \ntitle: Login form\n---\n\n# Heading").unwrap();
        assert_eq!(doc.title(&["name", "title"], 1), "Login form");

        let doc = Document::parse("---\nstatus: todo\n---\n\n## Sub\n# Top").unwrap();
        assert_eq!(doc.title(&["name"], 1), "Top");
        assert_eq!(doc.title(&["name"], 2), "Sub");

        let doc = Document::parse("plain").unwrap();
        assert_eq!(doc.title(&["name"], 1), "No Title");
    }

    #[test]
    fn bracketed_title_survives_save() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("epics/demo/demo-task-01.md");
        let mut doc = Document::default();
        doc.set("name", "[WIP]");
        doc.set("title", "fallback");
        doc.save(&path).unwrap();

        let loaded = Document::load(&path).unwrap();
        assert_eq!(loaded.field("name"), Some("[WIP]"));
        assert_eq!(loaded.title(&["name", "title"], 1), "[WIP]");
    }

    #[test]
    fn issue_number_and_labels() {
        let doc = Document::parse(
            "---\ngithub_issue_number: 42\nlabels: [backend, p1]\n---\n",
        )
        .unwrap();
        assert_eq!(doc.issue_number(), Some(42));
        assert_eq!(doc.labels(), vec!["backend", "p1"]);

        let doc = Document::parse("---\ngithub: TBD\nlabels: solo\n---\n").unwrap();
        assert_eq!(doc.issue_number(), None);
        assert_eq!(doc.labels(), vec!["solo"]);
    }

    #[test]
    fn upsert_appends_when_absent() {
        let mut doc = Document::new(Frontmatter::new(), "# Epic\n\n## Overview\ntext\n\n");
        doc.upsert_section("Tasks", "- [ ] one (#2)");
        assert_eq!(doc.body, "# Epic\n\n## Overview\ntext\n\n## Tasks\n\n- [ ] one (#2)\n");
    }

    #[test]
    fn upsert_replaces_existing_and_keeps_following() {
        let mut doc = Document::new(
            Frontmatter::new(),
            "## Overview\ntext\n## Tasks\n- [ ] old\n## Notes\nkeep me\n",
        );
        doc.upsert_section("Tasks", "- [ ] new");
        assert_eq!(
            doc.body,
            "## Overview\ntext\n## Tasks\n\n- [ ] new\n\n## Notes\nkeep me\n"
        );

        doc.upsert_section("Tasks", "- [x] newer");
        assert!(doc.body.contains("- [x] newer"));
        assert!(!doc.body.contains("- [ ] new\n"));
        assert_eq!(doc.body.matches("## Tasks").count(), 1);
    }

    #[test]
    fn upsert_into_empty_body() {
        let mut doc = Document::default();
        doc.upsert_section("Generated Tasks", "- [ ] a");
        assert_eq!(doc.body, "## Generated Tasks\n\n- [ ] a\n");
    }
}
