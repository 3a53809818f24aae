//! The property bag shared by nodes and links.
//!
//! A [`Data`] record holds a label and a map of named, typed properties.
//! Every mutator returns a [`DataChange`] carrying the previous value so the
//! owning entity can emit it as a change event (undo and audit consumers rely
//! on this).

use crate::diagnostics::{self, Diagnostic, Subject};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

// ─── Property types ──────────────────────────────────────────────────────

/// How a property's value is interpreted and rendered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PropertyType {
    /// Single-line text.
    #[default]
    Normal,
    /// Multi-line text.
    Text,
    /// Multi-line text stored under the `long-text` name.
    LongText,
    /// A structured JSON object or array.
    Json,
    Date,
    Url,
    /// An image reference (URL or uploaded file name).
    Image,
    /// A type this build does not know; kept verbatim.
    Other(String),
}

impl PropertyType {
    /// Text rendered with its line breaks kept.
    pub fn is_multiline(&self) -> bool {
        matches!(self, Self::Text | Self::LongText)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Normal => "normal",
            Self::Text => "text",
            Self::LongText => "long-text",
            Self::Json => "json",
            Self::Date => "date",
            Self::Url => "url",
            Self::Image => "image",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for PropertyType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "normal" | "" => Self::Normal,
            "text" => Self::Text,
            "long-text" => Self::LongText,
            "json" => Self::Json,
            "date" => Self::Date,
            "url" => Self::Url,
            "image" => Self::Image,
            _ => Self::Other(s),
        }
    }
}

impl From<&str> for PropertyType {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<PropertyType> for String {
    fn from(t: PropertyType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    #[serde(rename = "type", default)]
    pub kind: PropertyType,
    pub value: Value,
}

impl Property {
    pub fn new(value: Value, kind: PropertyType) -> Self {
        Self { kind, value }
    }

    /// The value as display text: strings verbatim, everything else as JSON.
    pub fn value_text(&self) -> String {
        match &self.value {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

// ─── Changes ─────────────────────────────────────────────────────────────

/// A completed mutation of a [`Data`] record, with the value it replaced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DataChange {
    Label {
        previous: String,
    },
    Property {
        name: String,
        previous: Option<Property>,
        /// Set when the value did not match its declared type. The value
        /// was stored anyway.
        diagnostic: Option<Diagnostic>,
    },
    PropertyRemoved {
        name: String,
        previous: Property,
    },
}

// ─── Data record ─────────────────────────────────────────────────────────

/// Label plus named properties, with the diagnostics recorded against the
/// owning entity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Data {
    #[serde(default)]
    label: String,
    #[serde(default)]
    properties: BTreeMap<String, Property>,
    #[serde(skip)]
    subject: Option<Subject>,
    #[serde(skip)]
    diagnostics: Vec<Diagnostic>,
}

impl PartialEq for Data {
    fn eq(&self, other: &Self) -> bool {
        self.label == other.label && self.properties == other.properties
    }
}

impl Data {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Default::default()
        }
    }

    /// Bind the record to the entity that owns it, so diagnostics name it.
    pub(crate) fn bind(&mut self, subject: Subject) {
        self.subject = Some(subject);
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Replace the label. An empty label is ignored so a stray blank edit
    /// cannot clear it.
    pub fn set_label(&mut self, label: &str) -> Option<DataChange> {
        if label.is_empty() {
            return None;
        }
        let previous = std::mem::replace(&mut self.label, label.to_string());
        Some(DataChange::Label { previous })
    }

    pub fn has_property_named(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    pub fn get_property_named(&self, name: &str) -> Option<&Value> {
        self.properties.get(name).map(|p| &p.value)
    }

    pub fn get_type_for_property_named(&self, name: &str) -> Option<&PropertyType> {
        self.properties.get(name).map(|p| &p.kind)
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.get(name)
    }

    /// Properties in name order.
    pub fn properties(&self) -> impl Iterator<Item = (&str, &Property)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn property_count(&self) -> usize {
        self.properties.len()
    }

    /// Store `value` under `name` with the declared `kind`.
    ///
    /// A JSON-typed property must hold an object or array; anything else is
    /// recorded as a diagnostic and stored as given.
    pub fn set_property_named(
        &mut self,
        name: &str,
        value: Value,
        kind: PropertyType,
    ) -> DataChange {
        let diagnostic = if kind == PropertyType::Json && !(value.is_object() || value.is_array())
        {
            let diag = Diagnostic::error(
                self.subject.unwrap_or(Subject::Project),
                diagnostics::JSON_NOT_OBJECT,
                format!("property `{name}` is declared json but holds {value}"),
            );
            self.diagnostics.push(diag.clone());
            Some(diag)
        } else {
            None
        };

        let previous = self
            .properties
            .insert(name.to_string(), Property::new(value, kind));
        DataChange::Property {
            name: name.to_string(),
            previous,
            diagnostic,
        }
    }

    pub fn set_normal_property(&mut self, name: &str, value: &str) -> DataChange {
        self.set_property_named(name, Value::String(value.into()), PropertyType::Normal)
    }

    pub fn set_text_property(&mut self, name: &str, value: &str) -> DataChange {
        self.set_property_named(name, Value::String(value.into()), PropertyType::Text)
    }

    pub fn set_json_property(&mut self, name: &str, value: Value) -> DataChange {
        self.set_property_named(name, value, PropertyType::Json)
    }

    pub fn remove_property_named(&mut self, name: &str) -> Option<DataChange> {
        self.properties
            .remove(name)
            .map(|previous| DataChange::PropertyRemoved {
                name: name.to_string(),
                previous,
            })
    }

    /// Diagnostics recorded against the owning entity, oldest first.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub(crate) fn record(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn empty_label_is_ignored() {
        let mut data = Data::new("hello");
        assert!(data.set_label("").is_none());
        assert_eq!(data.label(), "hello");

        let change = data.set_label("world").unwrap();
        assert_eq!(
            change,
            DataChange::Label {
                previous: "hello".into()
            }
        );
    }

    #[test]
    fn set_then_get_returns_value_and_type() {
        let mut data = Data::default();
        for (value, kind) in [
            (json!("plain"), PropertyType::Normal),
            (json!("line one\nline two"), PropertyType::Text),
            (json!({"a": 1}), PropertyType::Json),
            (json!("2024-01-31"), PropertyType::Date),
            (json!("x"), PropertyType::Other("rating".into())),
        ] {
            data.set_property_named("p", value.clone(), kind.clone());
            assert_eq!(data.get_property_named("p"), Some(&value));
            assert_eq!(data.get_type_for_property_named("p"), Some(&kind));
        }
        assert!(data.diagnostics().is_empty());
    }

    #[test]
    fn json_property_with_string_value_soft_fails() {
        let mut data = Data::default();
        data.bind(Subject::Node(crate::id::Uid(3)));
        let change = data.set_property_named("cfg", json!("not-json"), PropertyType::Json);

        assert_eq!(data.get_property_named("cfg"), Some(&json!("not-json")));
        let DataChange::Property { diagnostic, .. } = change else {
            panic!("expected property change");
        };
        let diagnostic = diagnostic.expect("mismatch is reported");
        assert_eq!(diagnostic.rule, diagnostics::JSON_NOT_OBJECT);
        assert_eq!(diagnostic.subject, Subject::Node(crate::id::Uid(3)));
        assert_eq!(data.diagnostics().len(), 1);
    }

    #[test]
    fn change_carries_previous_property() {
        let mut data = Data::default();
        data.set_normal_property("colour", "red");
        let change = data.set_normal_property("colour", "blue");
        match change {
            DataChange::Property { previous, .. } => {
                assert_eq!(previous.unwrap().value, json!("red"));
            }
            other => panic!("unexpected change {other:?}"),
        }

        let removed = data.remove_property_named("colour").unwrap();
        assert!(matches!(removed, DataChange::PropertyRemoved { .. }));
        assert!(data.remove_property_named("colour").is_none());
    }

    #[test]
    fn property_type_names_roundtrip_through_json() {
        let p: Property = serde_json::from_value(json!({"type": "long-text", "value": "x"})).unwrap();
        assert_eq!(p.kind, PropertyType::LongText);
        let back = serde_json::to_value(&p).unwrap();
        assert_eq!(back["type"], "long-text");

        let p: Property = serde_json::from_value(json!({"type": "rating", "value": 4})).unwrap();
        assert_eq!(p.kind, PropertyType::Other("rating".into()));
    }
}
