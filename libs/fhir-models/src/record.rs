//! Generic records
//!
//! A [`Record`] is a schema-checked instance of any data type in the registry.
//! Fields are keyed by their logical name; a choice field is stored once under
//! its base name (`value`, not `valueString`) as a [`ChoiceNode`].

use fhirtypes_schema::PrimitiveType;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    type_name: String,
    fields: Vec<(String, FieldValue)>,
    unrecognized: Map<String, Value>,
}

/// Value of one field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Field with max cardinality 1
    Single(Node),
    /// Repeating field
    List(Vec<Node>),
    /// Choice field, exactly one variant
    Choice(ChoiceNode),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Primitive(PrimitiveValue),
    Record(Record),
}

/// A primitive value with its optional `_field` metadata (id and extensions)
#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveValue {
    pub type_code: PrimitiveType,
    /// Absent when only metadata is present
    pub value: Option<Value>,
    pub meta: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChoiceNode {
    Variant {
        type_code: String,
        node: Node,
    },
    /// Undeclared variant kept in lenient mode
    Unrecognized {
        key: String,
        value: Option<Value>,
        meta: Option<Value>,
    },
}

impl Record {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Vec::new(),
            unrecognized: Map::new(),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut FieldValue> {
        self.fields
            .iter_mut()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// The populated variant of a choice field
    pub fn choice(&self, name: &str) -> Option<&ChoiceNode> {
        match self.get(name)? {
            FieldValue::Choice(choice) => Some(choice),
            _ => None,
        }
    }

    /// Primitive value of a singular field
    pub fn primitive(&self, name: &str) -> Option<&PrimitiveValue> {
        match self.get(name)? {
            FieldValue::Single(Node::Primitive(p)) => Some(p),
            _ => None,
        }
    }

    /// Nested record of a singular field
    pub fn record(&self, name: &str) -> Option<&Record> {
        match self.get(name)? {
            FieldValue::Single(Node::Record(r)) => Some(r),
            _ => None,
        }
    }

    /// Set a field, keeping its position when it is already present
    pub fn set(&mut self, name: impl Into<String>, value: FieldValue) -> Option<FieldValue> {
        let name = name.into();
        match self.get_mut(&name) {
            Some(existing) => Some(std::mem::replace(existing, value)),
            None => {
                self.fields.push((name, value));
                None
            }
        }
    }

    /// Set a choice field, replacing whichever variant was populated
    pub fn set_choice(&mut self, name: impl Into<String>, type_code: impl Into<String>, node: Node) -> Option<FieldValue> {
        self.set(
            name,
            FieldValue::Choice(ChoiceNode::Variant {
                type_code: type_code.into(),
                node,
            }),
        )
    }

    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        let index = self.fields.iter().position(|(field, _)| field == name)?;
        Some(self.fields.remove(index).1)
    }

    /// Fields in insertion order (schema order after decoding)
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.unrecognized.is_empty()
    }

    /// Extension records of this record
    pub fn extensions(&self) -> impl Iterator<Item = &Record> {
        let nodes: &[Node] = match self.get("extension") {
            Some(FieldValue::List(nodes)) => nodes,
            _ => &[],
        };
        nodes.iter().filter_map(Node::as_record)
    }

    /// Elements kept verbatim in lenient mode
    pub fn unrecognized(&self) -> &Map<String, Value> {
        &self.unrecognized
    }

    pub(crate) fn unrecognized_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.unrecognized
    }
}

impl FieldValue {
    /// All nodes of the field: one for singular and choice fields
    pub fn nodes(&self) -> Vec<&Node> {
        match self {
            FieldValue::Single(node) => vec![node],
            FieldValue::List(nodes) => nodes.iter().collect(),
            FieldValue::Choice(ChoiceNode::Variant { node, .. }) => vec![node],
            FieldValue::Choice(ChoiceNode::Unrecognized { .. }) => Vec::new(),
        }
    }

    pub fn as_list(&self) -> Option<&[Node]> {
        match self {
            FieldValue::List(nodes) => Some(nodes),
            _ => None,
        }
    }
}

impl Node {
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Node::Record(record) => Some(record),
            Node::Primitive(_) => None,
        }
    }

    pub fn as_primitive(&self) -> Option<&PrimitiveValue> {
        match self {
            Node::Primitive(p) => Some(p),
            Node::Record(_) => None,
        }
    }

    pub fn primitive(type_code: PrimitiveType, value: Value) -> Self {
        Node::Primitive(PrimitiveValue {
            type_code,
            value: Some(value),
            meta: None,
        })
    }
}

impl PrimitiveValue {
    pub fn as_str(&self) -> Option<&str> {
        self.value.as_ref()?.as_str()
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.value.as_ref()?.as_bool()
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.value.as_ref()?.as_i64()
    }
}

impl ChoiceNode {
    /// Type code of the variant; the raw wire key for unrecognized variants
    pub fn type_code(&self) -> &str {
        match self {
            ChoiceNode::Variant { type_code, .. } => type_code,
            ChoiceNode::Unrecognized { key, .. } => key,
        }
    }

    pub fn node(&self) -> Option<&Node> {
        match self {
            ChoiceNode::Variant { node, .. } => Some(node),
            ChoiceNode::Unrecognized { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_keeps_position() {
        let mut record = Record::new("Coding");
        record.set("system", FieldValue::Single(Node::primitive(PrimitiveType::Uri, json!("http://loinc.org"))));
        record.set("code", FieldValue::Single(Node::primitive(PrimitiveType::Code, json!("1234-5"))));
        let previous = record.set("system", FieldValue::Single(Node::primitive(PrimitiveType::Uri, json!("http://snomed.info/sct"))));

        assert!(previous.is_some());
        let names: Vec<_> = record.fields().map(|(n, _)| n).collect();
        assert_eq!(names, ["system", "code"]);
        assert_eq!(record.primitive("system").unwrap().as_str(), Some("http://snomed.info/sct"));
    }

    #[test]
    fn test_set_choice_replaces_variant() {
        let mut record = Record::new("Extension");
        record.set_choice("value", "string", Node::primitive(PrimitiveType::String, json!("a")));
        record.set_choice("value", "boolean", Node::primitive(PrimitiveType::Boolean, json!(true)));

        assert_eq!(record.len(), 1);
        assert_eq!(record.choice("value").unwrap().type_code(), "boolean");
    }

    #[test]
    fn test_remove() {
        let mut record = Record::new("Period");
        record.set("start", FieldValue::Single(Node::primitive(PrimitiveType::DateTime, json!("2024"))));
        assert!(record.remove("start").is_some());
        assert!(record.remove("start").is_none());
        assert!(record.is_empty());
    }
}
