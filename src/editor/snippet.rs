//! Literal JSON fragments that scaffold NGSI-LD attributes.

/// A template inserted by the convenience actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Snippet {
    Property,
    Relationship,
    GeoProperty,
}

impl Snippet {
    pub const ALL: [Self; 3] = [Self::Property, Self::Relationship, Self::GeoProperty];

    /// The fragment text. Every template carries `type` plus `value` or
    /// `object`, which is the shape the broker expects.
    pub const fn text(self) -> &'static str {
        match self {
            Self::Property => r#"{"type":"Property","value":""}"#,
            Self::Relationship => r#"{"type":"Relationship","object":"urn:ngsi-ld:Entity:..."}"#,
            Self::GeoProperty => {
                r#"{"type":"GeoProperty","value":{"type":"Point","coordinates":[0,0]}}"#
            }
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Property => "Property",
            Self::Relationship => "Relationship",
            Self::GeoProperty => "GeoProperty",
        }
    }

    /// The template as an object member, e.g. `"name": {...}`.
    pub fn member(self, name: &str) -> String {
        let key = serde_json::Value::String(name.to_string());
        format!("{key}: {}", self.text())
    }
}

/// Offset just before the document's final closing brace, plus whether a
/// separating comma is needed before a new member there.
///
/// Returns `None` when the document does not end with an object.
pub fn closing_brace_insertion(text: &str) -> Option<(usize, bool)> {
    let trimmed = text.trim_end();
    if !trimmed.ends_with('}') {
        return None;
    }
    let brace = trimmed.len() - 1;
    let before = text[..brace].trim_end();
    let needs_comma = !before.ends_with('{') && !before.ends_with(',');
    Some((before.len(), needs_comma))
}
