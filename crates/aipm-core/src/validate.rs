use crate::error::{AipmError, Result};
use crate::frontmatter;
use regex::Regex;
use std::sync::OnceLock;

static IDENT_RE: OnceLock<Regex> = OnceLock::new();

fn ident_re() -> &'static Regex {
    IDENT_RE.get_or_init(|| Regex::new(r"^[a-z][a-z0-9-]*$").unwrap())
}

/// Feature, epic and task names are kebab-case and start with a letter.
pub fn validate_identifier(name: &str) -> Result<()> {
    if !ident_re().is_match(name) {
        return Err(AipmError::InvalidIdentifier(name.to_string()));
    }
    Ok(())
}

/// Check that `text` carries a well-formed header containing every field in
/// `required`. All absent fields are reported together, in `required` order.
pub fn validate_required_fields(text: &str, required: &[&str]) -> Result<()> {
    if !frontmatter::has_frontmatter(text) {
        return Err(AipmError::MissingFrontmatter);
    }
    let (fm, _) = frontmatter::parse(text)?;
    let missing: Vec<String> = required
        .iter()
        .filter(|field| !fm.contains(field))
        .map(|field| field.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(AipmError::MissingFields(missing));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_cases() {
        assert!(validate_identifier("user-auth").is_ok());
        assert!(validate_identifier("payment-v2").is_ok());
        assert!(validate_identifier("a").is_ok());
        for bad in ["UserAuth", "123-feature", "", "-lead", "has space", "snake_case"] {
            assert!(
                matches!(validate_identifier(bad), Err(AipmError::InvalidIdentifier(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn all_required_present() {
        let text = "---\nname: x\nstatus: backlog\ncreated: 2024-01-01T00:00:00Z\n---\n\nbody";
        assert!(validate_required_fields(text, &["name", "status", "created"]).is_ok());
    }

    #[test]
    fn missing_created_reported_by_name() {
        let text = "---\nname: x\nstatus: backlog\n---\n";
        match validate_required_fields(text, &["name", "status", "created"]) {
            Err(AipmError::MissingFields(fields)) => assert_eq!(fields, vec!["created"]),
            other => panic!("expected MissingFields, got {other:?}"),
        }
    }

    #[test]
    fn every_missing_field_reported_at_once() {
        let text = "---\nname: x\n---\n";
        let err = validate_required_fields(text, &["name", "status", "created"]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "missing required frontmatter field(s): status, created"
        );
    }

    #[test]
    fn field_name_inside_a_value_does_not_count() {
        let text = "---\nname: x\ndescription: has a status and created date\n---\n";
        assert!(matches!(
            validate_required_fields(text, &["status"]),
            Err(AipmError::MissingFields(_))
        ));
    }

    #[test]
    fn no_header_and_malformed_header() {
        assert!(matches!(
            validate_required_fields("# plain", &["name"]),
            Err(AipmError::MissingFrontmatter)
        ));
        assert!(matches!(
            validate_required_fields("---\nname: x\n", &["name"]),
            Err(AipmError::MalformedFrontmatter)
        ));
    }
}
