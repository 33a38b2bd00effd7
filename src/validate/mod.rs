//! Syntax and schema validation with errors mapped back into the text.

mod locate;
mod schema;

use serde_json::Value;

use crate::editor::TextBuffer;
use crate::error::{EditorError, SchemaError};

pub use locate::{locate_pointer, pointer_to_path};
pub use schema::{CompiledSchema, SchemaEngine, SchemaViolation};

/// A resolved place in the document. `line` and `column` are 1-based,
/// `offset` is a byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueKind {
    Syntax,
    Schema,
}

/// One validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorLocation {
    pub kind: IssueKind,
    /// `None` for message-only schema errors that could not be located.
    pub position: Option<Position>,
    pub message: String,
    /// Text of the offending line, empty when unlocated.
    pub context: String,
    /// Dotted path of the failing value, schema errors only.
    pub pointer_path: Option<String>,
}

impl ErrorLocation {
    pub fn line(&self) -> Option<usize> {
        self.position.map(|p| p.line)
    }

    /// `line:column: message`, or just the message when unlocated.
    pub fn describe(&self) -> String {
        let path = self
            .pointer_path
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(|p| format!("{p}: "))
            .unwrap_or_default();
        match self.position {
            Some(p) => format!("{}:{}: {path}{}", p.line, p.column, self.message),
            None => format!("{path}{}", self.message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<ErrorLocation>,
    /// Set when validation passed only because the schema could not be used.
    pub warning: Option<String>,
}

impl ValidationReport {
    pub const fn valid() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warning: None,
        }
    }

    pub fn first_error(&self) -> Option<&ErrorLocation> {
        self.errors.first()
    }

    /// The report as an error, if it failed.
    pub fn to_error(&self) -> Option<EditorError> {
        let first = self.first_error()?;
        Some(match (first.kind, first.position) {
            (IssueKind::Syntax, Some(p)) => EditorError::Syntax {
                line: p.line,
                column: p.column,
                message: first.message.clone(),
            },
            _ => EditorError::SchemaViolation {
                count: self.errors.len(),
                first: first.describe(),
            },
        })
    }

    /// One-line text for the status banner.
    pub fn summary(&self) -> String {
        match (self.first_error(), &self.warning) {
            (None, None) => "JSON is valid".to_string(),
            (None, Some(warning)) => format!("JSON is valid ({warning})"),
            (Some(first), _) if self.errors.len() == 1 => first.describe(),
            (Some(first), _) => format!(
                "{} (+{} more)",
                first.describe(),
                self.errors.len() - 1
            ),
        }
    }
}

enum SchemaState {
    Absent,
    Ready(Box<dyn SchemaEngine>),
    Unavailable(String),
}

/// Checks a document for syntax and, when configured, schema conformance.
///
/// The schema is fixed for the validator's lifetime; build a new one to
/// change it.
pub struct Validator {
    schema: SchemaState,
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let schema = match &self.schema {
            SchemaState::Absent => "absent",
            SchemaState::Ready(_) => "ready",
            SchemaState::Unavailable(_) => "unavailable",
        };
        f.debug_struct("Validator").field("schema", &schema).finish()
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Validator {
    pub fn new(schema: Option<&Value>) -> Self {
        let schema = match schema {
            None => SchemaState::Absent,
            Some(doc) => match CompiledSchema::compile(doc) {
                Ok(compiled) => SchemaState::Ready(Box::new(compiled)),
                Err(err) => {
                    let err = EditorError::SchemaEngineUnavailable(err.to_string());
                    tracing::warn!(%err, "schema ignored");
                    SchemaState::Unavailable(err.to_string())
                }
            },
        };
        Self { schema }
    }

    /// Use an externally supplied schema engine.
    pub fn with_engine(engine: Box<dyn SchemaEngine>) -> Self {
        Self {
            schema: SchemaState::Ready(engine),
        }
    }

    pub fn compile_error(schema: &Value) -> Option<SchemaError> {
        CompiledSchema::compile(schema).err()
    }

    pub const fn has_schema(&self) -> bool {
        !matches!(self.schema, SchemaState::Absent)
    }

    pub fn validate(&self, buffer: &TextBuffer) -> ValidationReport {
        let _scope = crate::perf::scope("validate");
        let text = buffer.text();
        let value: Value = match serde_json::from_str(&text) {
            Ok(value) => value,
            Err(err) => {
                let message = err.to_string();
                let position = locate::parse_error_position(buffer, &message);
                tracing::debug!(line = position.line, column = position.column, "syntax error");
                return ValidationReport {
                    is_valid: false,
                    errors: vec![ErrorLocation {
                        kind: IssueKind::Syntax,
                        context: context_line(buffer, position.line),
                        position: Some(position),
                        message,
                        pointer_path: None,
                    }],
                    warning: None,
                };
            }
        };

        let engine = match &self.schema {
            SchemaState::Absent => return ValidationReport::valid(),
            SchemaState::Unavailable(reason) => {
                return ValidationReport {
                    warning: Some(reason.clone()),
                    ..ValidationReport::valid()
                };
            }
            SchemaState::Ready(engine) => engine,
        };

        let errors: Vec<ErrorLocation> = engine
            .validate(&value)
            .into_iter()
            .map(|violation| schema_error(buffer, &text, violation))
            .collect();
        tracing::debug!(violations = errors.len(), "schema check");
        ValidationReport {
            is_valid: errors.is_empty(),
            errors,
            warning: None,
        }
    }

    /// Validate a string without an editor around it.
    pub fn validate_text(&self, text: &str) -> ValidationReport {
        self.validate(&TextBuffer::from_text(text))
    }
}

fn context_line(buffer: &TextBuffer, line: usize) -> String {
    buffer
        .line_at(line.saturating_sub(1))
        .map(|l| l.trim_end_matches(['\n', '\r']).to_string())
        .unwrap_or_default()
}

fn schema_error(buffer: &TextBuffer, text: &str, violation: SchemaViolation) -> ErrorLocation {
    let path = pointer_to_path(&violation.pointer);
    let offset = if violation.pointer.is_empty() {
        None
    } else {
        locate_pointer(text, &violation.pointer).or_else(|| {
            locate::pointer_segments(&violation.pointer)
                .last()
                .and_then(|key| locate::first_key_occurrence(text, key))
        })
    };
    let position = offset.map(|o| locate::position_at(buffer, o));
    ErrorLocation {
        kind: IssueKind::Schema,
        context: position
            .map(|p| context_line(buffer, p.line))
            .unwrap_or_default(),
        position,
        message: violation.message,
        pointer_path: Some(path),
    }
}

/// The syntax error for a document that failed to parse with `message`.
pub(crate) fn syntax_error(buffer: &TextBuffer, message: &str) -> EditorError {
    let position = locate::parse_error_position(buffer, message);
    EditorError::Syntax {
        line: position.line,
        column: position.column,
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn device_schema() -> Value {
        json!({
            "type": "object",
            "required": ["id", "type"],
            "properties": {
                "id": {"type": "string"},
                "type": {"enum": ["Device", "Sensor"]}
            }
        })
    }

    #[test]
    fn test_trailing_comma_reports_line_one() {
        let report = Validator::default().validate_text(r#"{"id": "x",}"#);
        assert!(!report.is_valid);
        let err = report.first_error().unwrap();
        assert_eq!(err.kind, IssueKind::Syntax);
        assert_eq!(err.line(), Some(1));
        assert_eq!(err.context, r#"{"id": "x",}"#);
    }

    #[test]
    fn test_syntax_error_on_later_line() {
        let report = Validator::default().validate_text("{\n  \"a\": 1\n  \"b\": 2\n}");
        let err = report.first_error().unwrap();
        assert_eq!(err.line(), Some(3));
        assert_eq!(err.context, "  \"b\": 2");
    }

    #[test]
    fn test_schema_violation_path_and_location() {
        let text = "{\n  \"id\": \"urn:ngsi-ld:Device:1\",\n  \"type\": \"Widget\"\n}";
        let report = Validator::new(Some(&device_schema())).validate_text(text);
        assert!(!report.is_valid);
        assert_eq!(report.errors.len(), 1);
        let err = &report.errors[0];
        assert_eq!(err.kind, IssueKind::Schema);
        assert_eq!(err.pointer_path.as_deref(), Some("type"));
        let position = err.position.unwrap();
        assert_eq!(position.offset, text.find("\"Widget\"").unwrap());
        assert_eq!((position.line, position.column), (3, 11));
    }

    #[test]
    fn test_nested_duplicate_key_located_by_pointer() {
        let schema = json!({
            "properties": {
                "inner": {"properties": {"type": {"const": "Device"}}}
            }
        });
        let text = r#"{"type": "Device", "inner": {"type": "Other"}}"#;
        let report = Validator::new(Some(&schema)).validate_text(text);
        let position = report.errors[0].position.unwrap();
        assert_eq!(position.offset, text.find("\"Other\"").unwrap());
        assert_eq!(report.errors[0].pointer_path.as_deref(), Some("inner.type"));
    }

    #[test]
    fn test_duplicate_key_violation_points_at_kept_value() {
        let text = r#"{"id": "urn:x", "type": "Device", "type": "Widget"}"#;
        let report = Validator::new(Some(&device_schema())).validate_text(text);
        assert_eq!(report.errors.len(), 1);
        let position = report.errors[0].position.unwrap();
        assert_eq!(position.offset, text.find("\"Widget\"").unwrap());
    }

    #[test]
    fn test_root_violation_is_message_only() {
        let report =
            Validator::new(Some(&device_schema())).validate_text(r#"{"id": "urn:x"}"#);
        let err = report.first_error().unwrap();
        assert_eq!(err.position, None);
        assert_eq!(err.pointer_path.as_deref(), Some(""));
        assert!(err.describe().contains("required"));
    }

    #[test]
    fn test_unusable_schema_degrades_to_warning() {
        let schema = json!({"type": "Entity"});
        let validator = Validator::new(Some(&schema));
        assert!(validator.has_schema());
        let report = validator.validate_text(r#"{"id": 1}"#);
        assert!(report.is_valid);
        assert!(report.warning.as_deref().unwrap().starts_with("schema validation unavailable"));
        assert!(report.summary().starts_with("JSON is valid ("));
    }

    #[test]
    fn test_unusable_schema_still_reports_syntax() {
        let validator = Validator::new(Some(&json!({"minLength": -1})));
        assert!(!validator.validate_text("{").is_valid);
    }

    #[test]
    fn test_custom_engine() {
        struct RejectAll;
        impl SchemaEngine for RejectAll {
            fn validate(&self, _: &Value) -> Vec<SchemaViolation> {
                vec![SchemaViolation {
                    pointer: "/id".to_string(),
                    message: "nope".to_string(),
                }]
            }
        }
        let report = Validator::with_engine(Box::new(RejectAll)).validate_text(r#"{"id": 1}"#);
        assert_eq!(report.errors[0].position.unwrap().offset, 7);
    }

    #[test]
    fn test_to_error_variants() {
        let report = Validator::default().validate_text("[1,");
        assert!(matches!(report.to_error(), Some(EditorError::Syntax { line: 1, .. })));
        let report = Validator::new(Some(&device_schema())).validate_text(r#"{"type": 1}"#);
        assert!(matches!(
            report.to_error(),
            Some(EditorError::SchemaViolation { count: 2, .. })
        ));
        assert_eq!(ValidationReport::valid().to_error(), None);
    }

    #[test]
    fn test_summary_counts_extra_errors() {
        let report = Validator::new(Some(&device_schema())).validate_text(r#"{"type": 1}"#);
        assert!(report.summary().ends_with("(+1 more)"));
    }
}
