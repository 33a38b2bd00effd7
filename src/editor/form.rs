//! Field-by-field view of a single NGSI-LD entity.

use serde_json::{Map, Value};

use crate::error::EditorError;
use crate::view::cell_text;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Id,
    Type,
    Property,
    Relationship,
    GeoProperty,
    /// `@context` or any member that is not an NGSI-LD attribute object.
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub name: String,
    pub kind: FieldKind,
    pub display: String,
    pub editable: bool,
}

fn attribute_kind(value: &Value) -> FieldKind {
    match value.get("type").and_then(Value::as_str) {
        Some("Property") => FieldKind::Property,
        Some("Relationship") => FieldKind::Relationship,
        Some("GeoProperty") => FieldKind::GeoProperty,
        _ => FieldKind::Other,
    }
}

fn entity(value: &Value) -> Result<&Map<String, Value>, EditorError> {
    value
        .as_object()
        .ok_or_else(|| EditorError::NotAnEntity("document is not a JSON object".to_string()))
}

/// Fields in document order.
///
/// # Errors
/// Fails unless the document is a JSON object.
pub fn form_fields(value: &Value, id_editable: bool) -> Result<Vec<FormField>, EditorError> {
    Ok(entity(value)?
        .iter()
        .map(|(name, field)| {
            let kind = match name.as_str() {
                "id" => FieldKind::Id,
                "type" => FieldKind::Type,
                _ => attribute_kind(field),
            };
            let display = match kind {
                FieldKind::Relationship => field.get("object").map(cell_text).unwrap_or_default(),
                FieldKind::GeoProperty => field.get("value").map(cell_text).unwrap_or_default(),
                _ => cell_text(field),
            };
            FormField {
                name: name.clone(),
                kind,
                display,
                editable: kind != FieldKind::Id || id_editable,
            }
        })
        .collect())
}

/// Parse form input as JSON, falling back to a plain string.
fn parse_input(input: &str) -> Value {
    serde_json::from_str(input).unwrap_or_else(|_| Value::String(input.to_string()))
}

/// Write one form field back into the entity.
///
/// Attribute objects keep their shape: properties update `value`,
/// relationships update `object`. Unknown names are added as properties.
///
/// # Errors
/// Fails for non-object documents and for `id` when it is not editable.
pub fn apply_field(
    value: &mut Value,
    name: &str,
    input: &str,
    id_editable: bool,
) -> Result<(), EditorError> {
    let Some(map) = value.as_object_mut() else {
        return Err(EditorError::NotAnEntity(
            "document is not a JSON object".to_string(),
        ));
    };
    match name {
        "id" if !id_editable => return Err(EditorError::ReadOnlyField(name.to_string())),
        "id" | "type" => {
            map.insert(name.to_string(), Value::String(input.to_string()));
        }
        _ => match map.get_mut(name) {
            Some(field) => match attribute_kind(field) {
                FieldKind::Relationship => {
                    field["object"] = Value::String(input.to_string());
                }
                FieldKind::Property | FieldKind::GeoProperty => {
                    field["value"] = parse_input(input);
                }
                _ => *field = parse_input(input),
            },
            None => {
                let mut attr = Map::new();
                attr.insert("type".to_string(), Value::String("Property".to_string()));
                attr.insert("value".to_string(), parse_input(input));
                map.insert(name.to_string(), Value::Object(attr));
            }
        },
    }
    Ok(())
}
