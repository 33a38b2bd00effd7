use serde::Deserialize;
use serde_json::Value;

use crate::view::ViewMode;

/// What the host opened the editor for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    #[default]
    Update,
    View,
}

/// Content handed to [`super::JsonEditor::set_value`].
#[derive(Debug, Clone, PartialEq)]
pub enum EditorInput {
    /// Stored verbatim.
    Text(String),
    /// Serialized with 2-space indentation.
    Json(Value),
}

impl From<&str> for EditorInput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for EditorInput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Value> for EditorInput {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

/// Construction options for one editor instance.
///
/// Defaults are applied once here; unknown keys in [`Self::from_json`] are
/// ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorOptions {
    pub container_id: Option<String>,
    #[serde(deserialize_with = "initial_value")]
    pub initial_value: Option<EditorInput>,
    /// Editor height in rows.
    pub height: u16,
    pub resizable: bool,
    pub show_toolbar: bool,
    pub show_line_numbers: bool,
    pub schema: Option<Value>,
    #[serde(alias = "mode")]
    pub operation: Operation,
    pub entity_id: Option<String>,
    pub allow_entity_id_edit: bool,
    pub table_capable: bool,
    pub initial_view: Option<ViewMode>,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            container_id: None,
            initial_value: None,
            height: 300,
            resizable: true,
            show_toolbar: true,
            show_line_numbers: false,
            schema: None,
            operation: Operation::default(),
            entity_id: None,
            allow_entity_id_edit: false,
            table_capable: false,
            initial_view: None,
        }
    }
}

impl EditorOptions {
    /// Read options from a loosely-typed object with camelCase keys.
    ///
    /// # Errors
    /// Fails when a recognized key holds a value of the wrong type.
    pub fn from_json(value: &Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(value)
    }

    pub fn with_initial_value(mut self, value: impl Into<EditorInput>) -> Self {
        self.initial_value = Some(value.into());
        self
    }

    pub fn with_schema(mut self, schema: Option<Value>) -> Self {
        self.schema = schema;
        self
    }

    pub const fn with_line_numbers(mut self, enabled: bool) -> Self {
        self.show_line_numbers = enabled;
        self
    }

    pub const fn with_toolbar(mut self, enabled: bool) -> Self {
        self.show_toolbar = enabled;
        self
    }

    pub const fn with_operation(mut self, operation: Operation) -> Self {
        self.operation = operation;
        self
    }

    /// The broker entity the document is loaded from and saved to.
    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    pub const fn with_table_capable(mut self, enabled: bool) -> Self {
        self.table_capable = enabled;
        self
    }

    /// The view to start in: explicit choice, else table for table-capable
    /// editors.
    pub fn starting_view(&self) -> ViewMode {
        self.initial_view.unwrap_or(if self.table_capable {
            ViewMode::Table
        } else {
            ViewMode::Raw
        })
    }

    /// Whether the form may change the entity `id`.
    pub fn id_editable(&self) -> bool {
        self.allow_entity_id_edit || self.operation == Operation::Create
    }
}

fn initial_value<'de, D>(deserializer: D) -> Result<Option<EditorInput>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(EditorInput::Text(text)),
        Some(other) => Some(EditorInput::Json(other)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let options = EditorOptions::default();
        assert_eq!(options.height, 300);
        assert!(options.resizable);
        assert!(options.show_toolbar);
        assert!(!options.show_line_numbers);
        assert!(!options.allow_entity_id_edit);
        assert_eq!(options.starting_view(), ViewMode::Raw);
    }

    #[test]
    fn test_from_json_ignores_unknown_and_fills_defaults() {
        let options = EditorOptions::from_json(&json!({
            "containerId": "entity-editor",
            "showLineNumbers": true,
            "onChange": "function () {}",
            "somethingElse": 42
        }))
        .unwrap();
        assert_eq!(options.container_id.as_deref(), Some("entity-editor"));
        assert!(options.show_line_numbers);
        assert_eq!(options.height, 300);
    }

    #[test]
    fn test_initial_value_string_vs_object() {
        let text = EditorOptions::from_json(&json!({"initialValue": "{}"})).unwrap();
        assert_eq!(text.initial_value, Some(EditorInput::Text("{}".to_string())));
        let object = EditorOptions::from_json(&json!({"initialValue": {"id": "x"}})).unwrap();
        assert_eq!(object.initial_value, Some(EditorInput::Json(json!({"id": "x"}))));
    }

    #[test]
    fn test_mode_alias_and_id_editability() {
        let create = EditorOptions::from_json(&json!({"mode": "create"})).unwrap();
        assert_eq!(create.operation, Operation::Create);
        assert!(create.id_editable());
        let update = EditorOptions::from_json(&json!({"operation": "update"})).unwrap();
        assert!(!update.id_editable());
        let allowed = EditorOptions::from_json(&json!({"allowEntityIdEdit": true})).unwrap();
        assert!(allowed.id_editable());
    }

    #[test]
    fn test_table_capable_starts_in_table() {
        let options = EditorOptions::default().with_table_capable(true);
        assert_eq!(options.starting_view(), ViewMode::Table);
        let explicit = EditorOptions::from_json(&json!({"tableCapable": true, "initialView": "raw"}))
            .unwrap();
        assert_eq!(explicit.starting_view(), ViewMode::Raw);
    }

    #[test]
    fn test_wrong_type_is_rejected() {
        assert!(EditorOptions::from_json(&json!({"height": "tall"})).is_err());
    }
}
