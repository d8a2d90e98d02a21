use crate::error::{AipmError, Result};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::fmt;

pub const DELIMITER: &str = "---";

// ---------------------------------------------------------------------------
// FieldValue
// ---------------------------------------------------------------------------

/// A single frontmatter value. Lists are written on one line as `[a, b, c]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    /// Interpret a raw header value. `[...]` becomes a list, a double-quoted
    /// value is the text between the quotes, anything else is text.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if let Some(inner) = unquote(raw) {
            return FieldValue::Text(inner.to_string());
        }
        match raw.strip_prefix('[').and_then(|r| r.strip_suffix(']')) {
            Some(inner) => FieldValue::List(
                inner
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect(),
            ),
            None => FieldValue::Text(raw.to_string()),
        }
    }

    /// Header form of the value. Text that would read back as a list or as
    /// a quoted value is wrapped in double quotes.
    pub fn encode(&self) -> String {
        match self {
            FieldValue::Text(s) if needs_quotes(s) => format!("\"{s}\""),
            other => other.to_string(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            FieldValue::List(items) => Some(items),
            FieldValue::Text(_) => None,
        }
    }
}

fn unquote(raw: &str) -> Option<&str> {
    if raw.len() < 2 {
        return None;
    }
    raw.strip_prefix('"').and_then(|r| r.strip_suffix('"'))
}

fn needs_quotes(text: &str) -> bool {
    let text = text.trim();
    (text.starts_with('[') && text.ends_with(']')) || unquote(text).is_some()
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::List(items) => write!(f, "[{}]", items.join(", ")),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(items: Vec<String>) -> Self {
        FieldValue::List(items)
    }
}

// ---------------------------------------------------------------------------
// Frontmatter
// ---------------------------------------------------------------------------

/// Ordered key/value header. Insertion order is the serialization order;
/// setting an existing key replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frontmatter {
    entries: Vec<(String, FieldValue)>,
}

impl Frontmatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Text value of `key`; lists are not text.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(FieldValue::as_text)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<FieldValue> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for Frontmatter {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fm = Frontmatter::new();
        for (k, v) in iter {
            fm.set(k, v);
        }
        fm
    }
}

impl Serialize for Frontmatter {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

// ---------------------------------------------------------------------------
// Codec
// ---------------------------------------------------------------------------

/// Split the first line off `text`, returning `(line, rest)` with any
/// trailing `\r` removed from the line.
fn split_line(text: &str) -> (&str, &str) {
    let (line, rest) = match text.find('\n') {
        Some(i) => (&text[..i], &text[i + 1..]),
        None => (text, ""),
    };
    (line.strip_suffix('\r').unwrap_or(line), rest)
}

/// True when the document opens with a delimiter line.
pub fn has_frontmatter(text: &str) -> bool {
    split_line(text).0 == DELIMITER
}

/// Parse a document into its header and body.
///
/// Text that does not start with a `---` line has no frontmatter and is
/// returned whole as the body. An opening delimiter without a closing one is
/// [`AipmError::MalformedFrontmatter`].
pub fn parse(text: &str) -> Result<(Frontmatter, String)> {
    let (first, mut remaining) = split_line(text);
    if first != DELIMITER {
        return Ok((Frontmatter::new(), text.to_string()));
    }

    let mut fm = Frontmatter::new();
    loop {
        if remaining.is_empty() {
            return Err(AipmError::MalformedFrontmatter);
        }
        let (line, next) = split_line(remaining);
        if line == DELIMITER {
            return Ok((fm, strip_blank_line(next).to_string()));
        }
        if let Some((key, value)) = line.split_once(':') {
            let key = key.trim();
            if !key.is_empty() {
                fm.set(key, FieldValue::parse(value));
            }
        }
        remaining = next;
    }
}

fn strip_blank_line(body: &str) -> &str {
    body.strip_prefix("\r\n")
        .or_else(|| body.strip_prefix('\n'))
        .unwrap_or(body)
}

/// Render a header and body back into document text.
pub fn serialize(fm: &Frontmatter, body: &str) -> String {
    let mut out = String::with_capacity(body.len() + 32 * fm.len());
    out.push_str(DELIMITER);
    out.push('\n');
    for (key, value) in fm.iter() {
        out.push_str(key);
        out.push_str(": ");
        out.push_str(&value.encode());
        out.push('\n');
    }
    out.push_str(DELIMITER);
    out.push_str("\n\n");
    out.push_str(body);
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Frontmatter {
        [
            ("name", FieldValue::from("user-auth")),
            ("status", FieldValue::from("backlog")),
            (
                "depends_on",
                FieldValue::from(vec!["a-task-01".to_string(), "a-task-02".to_string()]),
            ),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn round_trip_preserves_order_and_body() {
        let fm = sample();
        let body = "# Title\n\nSome text\n";
        let text = serialize(&fm, body);
        let (parsed, parsed_body) = parse(&text).unwrap();
        assert_eq!(parsed, fm);
        assert_eq!(parsed_body, body);
        assert_eq!(parsed.keys().collect::<Vec<_>>(), vec!["name", "status", "depends_on"]);
    }

    #[test]
    fn round_trip_body_with_leading_blank_line() {
        let fm = sample();
        let body = "\nstarts blank";
        let (_, parsed_body) = parse(&serialize(&fm, body)).unwrap();
        assert_eq!(parsed_body, body);
    }

    #[test]
    fn round_trip_empty_header_and_body() {
        let fm = Frontmatter::new();
        let (parsed, body) = parse(&serialize(&fm, "")).unwrap();
        assert!(parsed.is_empty());
        assert_eq!(body, "");
    }

    #[test]
    fn serialize_layout() {
        let mut fm = Frontmatter::new();
        fm.set("name", "demo");
        fm.set("labels", vec!["a".to_string(), "b".to_string()]);
        assert_eq!(
            serialize(&fm, "body"),
            "---\nname: demo\nlabels: [a, b]\n---\n\nbody"
        );
    }

    #[test]
    fn no_delimiter_means_whole_text_is_body() {
        let text = "# Just a heading\nname: not-a-field\n";
        let (fm, body) = parse(text).unwrap();
        assert!(fm.is_empty());
        assert_eq!(body, text);
    }

    #[test]
    fn single_delimiter_is_malformed() {
        assert!(matches!(
            parse("---\nname: x\nbody without close"),
            Err(AipmError::MalformedFrontmatter)
        ));
        assert!(matches!(parse("---"), Err(AipmError::MalformedFrontmatter)));
    }

    #[test]
    fn value_keeps_text_after_first_colon() {
        let text = "---\ngithub: https://github.com/o/r/issues/7\ncreated: 2024-01-01T00:00:00Z\n---\n";
        let (fm, body) = parse(text).unwrap();
        assert_eq!(fm.text("github"), Some("https://github.com/o/r/issues/7"));
        assert_eq!(fm.text("created"), Some("2024-01-01T00:00:00Z"));
        assert_eq!(body, "");
    }

    #[test]
    fn ignores_blank_and_colonless_lines() {
        let text = "---\n\nname: x\njust words\n---\nbody";
        let (fm, body) = parse(text).unwrap();
        assert_eq!(fm.len(), 1);
        assert_eq!(body, "body");
    }

    #[test]
    fn crlf_delimiters_tolerated() {
        let text = "---\r\nname: x\r\n---\r\n\r\nbody\r\n";
        let (fm, body) = parse(text).unwrap();
        assert_eq!(fm.text("name"), Some("x"));
        assert_eq!(body, "body\r\n");
    }

    #[test]
    fn repeated_key_replaces_in_place() {
        let text = "---\nname: a\nstatus: open\nname: b\n---\n";
        let (fm, _) = parse(text).unwrap();
        assert_eq!(fm.text("name"), Some("b"));
        assert_eq!(fm.keys().collect::<Vec<_>>(), vec!["name", "status"]);
    }

    #[test]
    fn list_values() {
        assert_eq!(FieldValue::parse("[]"), FieldValue::List(vec![]));
        assert_eq!(
            FieldValue::parse("[ a ,b ]"),
            FieldValue::List(vec!["a".into(), "b".into()])
        );
        assert_eq!(FieldValue::parse("none"), FieldValue::Text("none".into()));
    }

    #[test]
    fn bracketed_text_round_trips_as_text() {
        let mut fm = Frontmatter::new();
        fm.set("description", "[WIP]");
        fm.set("name", "\"quoted\"");
        fm.set("labels", vec!["WIP".to_string()]);
        let text = serialize(&fm, "");
        assert!(text.contains("description: \"[WIP]\"\n"));
        assert!(text.contains("labels: [WIP]\n"));
        let (parsed, _) = parse(&text).unwrap();
        assert_eq!(parsed, fm);
        assert_eq!(parsed.text("description"), Some("[WIP]"));
    }

    #[test]
    fn quoted_value_is_text() {
        assert_eq!(FieldValue::parse("\"[a, b]\""), FieldValue::Text("[a, b]".into()));
        assert_eq!(FieldValue::parse("\""), FieldValue::Text("\"".into()));
    }

    #[test]
    fn set_and_remove() {
        let mut fm = sample();
        fm.set("status", "closed");
        assert_eq!(fm.text("status"), Some("closed"));
        assert_eq!(fm.keys().nth(1), Some("status"));
        assert!(fm.remove("status").is_some());
        assert!(!fm.contains("status"));
    }

    #[test]
    fn serializes_to_json_map() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["name"], "user-auth");
        assert_eq!(json["depends_on"][1], "a-task-02");
    }
}
