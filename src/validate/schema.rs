//! JSON Schema checking behind the [`SchemaEngine`] seam.
//!
//! The default engine is the `jsonschema` crate. Drafts are detected from
//! `$schema` (2020-12 when absent), local `$ref`s are resolved at compile
//! time, and remote ones are not fetched: a schema that needs one fails to
//! compile and the validator reports the engine as unavailable.

use serde_json::Value;

use crate::error::SchemaError;

/// One failed constraint, addressed by an RFC 6901 pointer into the instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    pub pointer: String,
    pub message: String,
}

/// Something that can check a parsed document against a schema.
pub trait SchemaEngine {
    fn validate(&self, instance: &Value) -> Vec<SchemaViolation>;
}

/// A schema ready to validate instances.
pub struct CompiledSchema {
    validator: jsonschema::Validator,
}

impl std::fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledSchema").finish_non_exhaustive()
    }
}

impl CompiledSchema {
    /// Compile a schema document.
    ///
    /// # Errors
    /// Returns an error when the document is not a schema, does not satisfy
    /// its meta-schema, or references something that cannot be resolved.
    pub fn compile(schema: &Value) -> Result<Self, SchemaError> {
        if !(schema.is_object() || schema.is_boolean()) {
            return Err(SchemaError::NotASchema);
        }
        let validator = jsonschema::validator_for(schema)
            .map_err(|err| SchemaError::Invalid(err.to_string()))?;
        Ok(Self { validator })
    }
}

impl SchemaEngine for CompiledSchema {
    fn validate(&self, instance: &Value) -> Vec<SchemaViolation> {
        self.validator
            .iter_errors(instance)
            .map(|err| SchemaViolation {
                pointer: err.instance_path.to_string(),
                message: err.to_string(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn violations(schema: Value, instance: Value) -> Vec<SchemaViolation> {
        CompiledSchema::compile(&schema).unwrap().validate(&instance)
    }

    fn pointers(schema: Value, instance: Value) -> Vec<String> {
        violations(schema, instance)
            .into_iter()
            .map(|v| v.pointer)
            .collect()
    }

    #[test]
    fn test_enum_violation_points_at_property() {
        let out = violations(
            json!({"properties": {"type": {"enum": ["Device", "Sensor"]}}}),
            json!({"type": "Widget"}),
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].pointer, "/type");
        assert!(out[0].message.contains("\"Widget\""));
    }

    #[test]
    fn test_required_reported_on_object() {
        let out = violations(json!({"required": ["id", "type"]}), json!({"id": "x"}));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].pointer, "");
        assert!(out[0].message.contains("\"type\""));
    }

    #[test]
    fn test_type_union_and_integer() {
        let schema = json!({"type": ["integer", "null"]});
        assert!(violations(schema.clone(), json!(3)).is_empty());
        assert!(violations(schema.clone(), Value::Null).is_empty());
        assert_eq!(violations(schema, json!(3.5)).len(), 1);
    }

    #[test]
    fn test_items_pointer_includes_index() {
        let out = pointers(
            json!({"items": {"type": "object", "required": ["id"]}}),
            json!([{"id": 1}, {}]),
        );
        assert_eq!(out, vec!["/1"]);
    }

    #[test]
    fn test_prefix_items_only_constrain_leading_elements() {
        let schema = json!({"prefixItems": [{"type": "string"}], "items": {"type": "number"}});
        assert!(violations(schema.clone(), json!(["a", 1, 2])).is_empty());
        assert_eq!(pointers(schema, json!(["a", "b"])), vec!["/1"]);
    }

    #[test]
    fn test_array_and_object_cardinality_keywords() {
        assert_eq!(violations(json!({"uniqueItems": true}), json!([1, 1])).len(), 1);
        assert_eq!(violations(json!({"multipleOf": 5}), json!(7)).len(), 1);
        assert_eq!(violations(json!({"minProperties": 2}), json!({})).len(), 1);
        assert_eq!(
            violations(json!({"contains": {"type": "string"}}), json!([1])).len(),
            1
        );
        assert_eq!(
            violations(json!({"dependentRequired": {"a": ["b"]}}), json!({"a": 1})).len(),
            1
        );
    }

    #[test]
    fn test_local_ref_is_followed() {
        let schema = json!({
            "$defs": {"Name": {"type": "string"}},
            "properties": {"name": {"$ref": "#/$defs/Name"}},
            "allOf": [{"required": ["name"]}]
        });
        assert!(violations(schema.clone(), json!({"name": "hall"})).is_empty());
        assert_eq!(pointers(schema.clone(), json!({"name": 3})), vec!["/name"]);
        assert_eq!(pointers(schema, json!({})), vec![""]);
    }

    #[test]
    fn test_pointer_escaping() {
        let out = pointers(
            json!({"properties": {"a/b": {"type": "string"}}}),
            json!({"a/b": 1}),
        );
        assert_eq!(out, vec!["/a~1b"]);
    }

    #[test]
    fn test_invalid_keyword_value_fails_compile() {
        let err = CompiledSchema::compile(&json!({"type": "Device"})).unwrap_err();
        assert!(matches!(err, SchemaError::Invalid(_)));
    }

    #[test]
    fn test_non_schema_fails_compile() {
        assert_eq!(
            CompiledSchema::compile(&json!(3)).unwrap_err(),
            SchemaError::NotASchema
        );
    }
}
