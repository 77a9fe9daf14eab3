//! Rule validation and normalization.
//!
//! # Responsibility
//! - Map raw severity strings onto the closed `Severity` set.
//! - Normalize rule text before it reaches the store.
//! - Parse the combined `POLICY: text` rule rendering.
//!
//! # Invariants
//! - Accepted severities: MUST, MUST_NOT, SHOULD, SHOULD_NOT, MAY (case
//!   insensitive, space or underscore).
//! - Rule text is trimmed and never empty.
//! - No cross-rule checks: contradicting rules are allowed.

use crate::model::resource::{ResourceValidationError, Severity};
use once_cell::sync::Lazy;
use regex::Regex;

static RULE_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^\s*(MUST[ _]NOT|SHOULD[ _]NOT|MUST|SHOULD|MAY)\s*:\s*(.*)$")
        .expect("valid rule line regex")
});

/// Rule payload that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRule {
    pub severity: Severity,
    /// Trimmed rule text.
    pub text: String,
}

/// Validates a raw severity and rule text pair.
pub fn validate_rule(severity: &str, text: &str) -> Result<ValidatedRule, ResourceValidationError> {
    let severity = parse_severity(severity)?;
    let text = normalize_rule_text(text)?;
    Ok(ValidatedRule { severity, text })
}

pub fn parse_severity(value: &str) -> Result<Severity, ResourceValidationError> {
    Severity::parse(value)
        .ok_or_else(|| ResourceValidationError::InvalidSeverity(value.trim().to_string()))
}

/// Trims rule text, rejecting blank input.
pub fn normalize_rule_text(text: &str) -> Result<String, ResourceValidationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ResourceValidationError::EmptyRuleText);
    }
    Ok(trimmed.to_string())
}

/// Splits a `POLICY: text` line into a validated rule.
///
/// A line without a recognizable policy prefix is an invalid severity.
pub fn parse_rule_line(line: &str) -> Result<ValidatedRule, ResourceValidationError> {
    let caps = RULE_LINE_RE.captures(line).ok_or_else(|| {
        let prefix = line.split(':').next().unwrap_or_default();
        ResourceValidationError::InvalidSeverity(prefix.trim().to_string())
    })?;
    let severity = parse_severity(&caps[1])?;
    let text = normalize_rule_text(&caps[2])?;
    Ok(ValidatedRule { severity, text })
}

#[cfg(test)]
mod tests {
    use super::{parse_rule_line, validate_rule};
    use crate::model::resource::{ResourceValidationError, Severity};

    #[test]
    fn validate_rule_trims_text() {
        let rule = validate_rule("MUST", "  Always greet the user \n").unwrap();
        assert_eq!(rule.severity, Severity::Must);
        assert_eq!(rule.text, "Always greet the user");
    }

    #[test]
    fn validate_rule_rejects_unknown_severity() {
        let err = validate_rule("MUSTN'T", "x").unwrap_err();
        assert_eq!(err, ResourceValidationError::InvalidSeverity("MUSTN'T".to_string()));
    }

    #[test]
    fn validate_rule_rejects_blank_text() {
        let err = validate_rule("MAY", " \t ").unwrap_err();
        assert_eq!(err, ResourceValidationError::EmptyRuleText);
    }

    #[test]
    fn parse_rule_line_prefers_negated_policies() {
        let rule = parse_rule_line("MUST NOT: leak secrets").unwrap();
        assert_eq!(rule.severity, Severity::MustNot);
        assert_eq!(rule.text, "leak secrets");

        let rule = parse_rule_line("should_not:use tabs").unwrap();
        assert_eq!(rule.severity, Severity::ShouldNot);
        assert_eq!(rule.text, "use tabs");
    }

    #[test]
    fn parse_rule_line_rejects_missing_policy() {
        let err = parse_rule_line("OFTEN: do things").unwrap_err();
        assert_eq!(err, ResourceValidationError::InvalidSeverity("OFTEN".to_string()));
    }
}
