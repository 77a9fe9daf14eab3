//! Resource domain model.
//!
//! # Responsibility
//! - Define the persisted record for rules, snippets and summaries.
//! - Provide write-side validation shared by every kind.
//!
//! # Invariants
//! - `context` and `key` are never blank.
//! - `severity` is present for `ResourceKind::Rule` and absent otherwise.
//! - Rule text is non-blank and stored trimmed.
//! - `version` starts at 1 and only grows; `created_at` never changes.

use crate::error::ErrorKind;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Context that is always part of a merged load, even when empty.
pub const DEFAULT_CONTEXT: &str = "me";

/// Closed set of resource kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Behavioral rule with a severity.
    Rule,
    /// Reusable text or code fragment.
    Snippet,
    /// Conversation summary, markdown by default.
    Summary,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 3] = [Self::Rule, Self::Snippet, Self::Summary];

    /// Stable storage/wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rule => "rule",
            Self::Snippet => "snippet",
            Self::Summary => "summary",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "rule" => Some(Self::Rule),
            "snippet" => Some(Self::Snippet),
            "summary" => Some(Self::Summary),
            _ => None,
        }
    }

    /// Mime type applied when a write does not name one.
    pub fn default_mime_type(self) -> &'static str {
        match self {
            Self::Rule | Self::Snippet => "text/plain",
            Self::Summary => "text/markdown",
        }
    }
}

impl Display for ResourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rule severity, modelled after RFC 2119 keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Must,
    MustNot,
    Should,
    ShouldNot,
    May,
}

impl Severity {
    pub const ALL: [Severity; 5] = [
        Self::Must,
        Self::MustNot,
        Self::Should,
        Self::ShouldNot,
        Self::May,
    ];

    /// Stable storage/wire name (`MUST_NOT`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Must => "MUST",
            Self::MustNot => "MUST_NOT",
            Self::Should => "SHOULD",
            Self::ShouldNot => "SHOULD_NOT",
            Self::May => "MAY",
        }
    }

    /// Human rendering used in rule lines (`MUST NOT`).
    pub fn policy_label(self) -> &'static str {
        match self {
            Self::Must => "MUST",
            Self::MustNot => "MUST NOT",
            Self::Should => "SHOULD",
            Self::ShouldNot => "SHOULD NOT",
            Self::May => "MAY",
        }
    }

    /// Parses either spelling, case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_uppercase().replace(' ', "_");
        Self::ALL
            .into_iter()
            .find(|severity| severity.as_str() == normalized)
    }
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validation failures for resource writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceValidationError {
    EmptyContext,
    EmptyKey,
    /// Rule text is blank after trimming.
    EmptyRuleText,
    /// Severity string outside the five accepted values.
    InvalidSeverity(String),
    /// Rule written without a severity.
    MissingSeverity,
    /// Severity supplied for a non-rule kind.
    UnexpectedSeverity(ResourceKind),
}

impl ResourceValidationError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}

impl Display for ResourceValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyContext => write!(f, "context cannot be empty"),
            Self::EmptyKey => write!(f, "key cannot be empty"),
            Self::EmptyRuleText => write!(f, "rule text cannot be empty"),
            Self::InvalidSeverity(value) => write!(
                f,
                "invalid severity `{value}`; expected one of MUST|MUST_NOT|SHOULD|SHOULD_NOT|MAY"
            ),
            Self::MissingSeverity => write!(f, "rule requires a severity"),
            Self::UnexpectedSeverity(kind) => {
                write!(f, "severity is only allowed on rules, got {kind}")
            }
        }
    }
}

impl Error for ResourceValidationError {}

/// Persisted resource record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub context: String,
    pub kind: ResourceKind,
    pub key: String,
    /// Rule text for rules, opaque payload otherwise.
    pub content: String,
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    pub version: i64,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds.
    pub updated_at: i64,
}

impl Resource {
    /// Checks identity fields, kind/severity pairing and rule text.
    ///
    /// Also used on rows read back from storage or decoded from a backup.
    pub fn validate(&self) -> Result<(), ResourceValidationError> {
        validate_identity(&self.context, &self.key)?;
        validate_severity_pairing(self.kind, self.severity)?;
        validate_rule_content(self.kind, &self.content)
    }

    /// Renders a rule as `POLICY: text`; `None` for other kinds.
    pub fn rule_line(&self) -> Option<String> {
        match (self.kind, self.severity) {
            (ResourceKind::Rule, Some(severity)) => {
                Some(format!("{}: {}", severity.policy_label(), self.content))
            }
            _ => None,
        }
    }
}

/// Write request for one resource (upsert input).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDraft {
    pub context: String,
    pub kind: ResourceKind,
    pub key: String,
    pub content: String,
    pub mime_type: String,
    pub severity: Option<Severity>,
}

impl ResourceDraft {
    /// Creates a draft using the kind's default mime type.
    pub fn new(
        context: impl Into<String>,
        kind: ResourceKind,
        key: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            context: context.into(),
            kind,
            key: key.into(),
            content: content.into(),
            mime_type: kind.default_mime_type().to_string(),
            severity: None,
        }
    }

    /// Overrides the mime type; blank values keep the kind default.
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        let mime_type = mime_type.into();
        if !mime_type.trim().is_empty() {
            self.mime_type = mime_type.trim().to_string();
        }
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    pub fn validate(&self) -> Result<(), ResourceValidationError> {
        validate_identity(&self.context, &self.key)?;
        validate_severity_pairing(self.kind, self.severity)?;
        validate_rule_content(self.kind, &self.content)
    }

    /// Content as persisted: rule text is trimmed, other payloads are opaque.
    pub fn stored_content(&self) -> &str {
        match self.kind {
            ResourceKind::Rule => self.content.trim(),
            ResourceKind::Snippet | ResourceKind::Summary => &self.content,
        }
    }
}

/// Content-free listing row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceHeader {
    pub key: String,
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    pub version: i64,
    pub updated_at: i64,
}

fn validate_identity(context: &str, key: &str) -> Result<(), ResourceValidationError> {
    if context.trim().is_empty() {
        return Err(ResourceValidationError::EmptyContext);
    }
    if key.trim().is_empty() {
        return Err(ResourceValidationError::EmptyKey);
    }
    Ok(())
}

fn validate_severity_pairing(
    kind: ResourceKind,
    severity: Option<Severity>,
) -> Result<(), ResourceValidationError> {
    match (kind, severity) {
        (ResourceKind::Rule, None) => Err(ResourceValidationError::MissingSeverity),
        (ResourceKind::Rule, Some(_)) => Ok(()),
        (other, Some(_)) => Err(ResourceValidationError::UnexpectedSeverity(other)),
        (_, None) => Ok(()),
    }
}

fn validate_rule_content(kind: ResourceKind, content: &str) -> Result<(), ResourceValidationError> {
    if kind == ResourceKind::Rule && content.trim().is_empty() {
        return Err(ResourceValidationError::EmptyRuleText);
    }
    Ok(())
}
