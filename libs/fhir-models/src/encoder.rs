//! Record encoder

use crate::choice::choice_key;
use crate::record::{ChoiceNode, FieldValue, Node, Record};
use fhirtypes_schema::SchemaRegistry;
use serde_json::{Map, Value};

/// Encodes [`Record`]s back into generic JSON trees.
///
/// Without a registry fields are written in record order, which is schema order
/// for decoded records. With a registry, fields added later through
/// [`Record::set`] are placed at their schema position too.
#[derive(Debug, Clone, Copy, Default)]
pub struct Encoder<'r> {
    registry: Option<&'r SchemaRegistry>,
}

impl<'r> Encoder<'r> {
    pub fn new() -> Self {
        Self { registry: None }
    }

    pub fn with_registry(registry: &'r SchemaRegistry) -> Self {
        Self {
            registry: Some(registry),
        }
    }

    pub fn encode(&self, record: &Record) -> Value {
        let mut map = Map::new();
        for (name, field) in self.ordered_fields(record) {
            match field {
                FieldValue::Single(node) => self.write_single(&mut map, name, node),
                FieldValue::List(nodes) => self.write_list(&mut map, name, nodes),
                FieldValue::Choice(ChoiceNode::Variant { type_code, node }) => {
                    self.write_single(&mut map, &choice_key(name, type_code), node)
                }
                FieldValue::Choice(ChoiceNode::Unrecognized { key, value, meta }) => {
                    if let Some(value) = value {
                        map.insert(key.clone(), value.clone());
                    }
                    if let Some(meta) = meta {
                        map.insert(format!("_{key}"), meta.clone());
                    }
                }
            }
        }
        for (key, value) in record.unrecognized() {
            map.insert(key.clone(), value.clone());
        }
        Value::Object(map)
    }

    fn ordered_fields<'a>(&self, record: &'a Record) -> Vec<(&'a str, &'a FieldValue)> {
        let mut fields: Vec<_> = record.fields().collect();
        if let Some(schema) = self.registry.and_then(|r| r.get(record.type_name())) {
            let position = |name: &str| {
                schema
                    .fields
                    .iter()
                    .position(|f| f.name == name)
                    .unwrap_or(usize::MAX)
            };
            fields.sort_by_key(|(name, _)| position(name));
        }
        fields
    }

    fn write_single(&self, map: &mut Map<String, Value>, key: &str, node: &Node) {
        match node {
            Node::Primitive(p) => {
                if let Some(value) = &p.value {
                    map.insert(key.to_string(), value.clone());
                }
                if let Some(meta) = &p.meta {
                    map.insert(format!("_{key}"), meta.clone());
                }
            }
            Node::Record(record) => {
                map.insert(key.to_string(), self.encode(record));
            }
        }
    }

    fn write_list(&self, map: &mut Map<String, Value>, key: &str, nodes: &[Node]) {
        if nodes.is_empty() {
            return;
        }
        let mut values = Vec::with_capacity(nodes.len());
        let mut metas = Vec::with_capacity(nodes.len());
        for node in nodes {
            match node {
                Node::Primitive(p) => {
                    values.push(p.value.clone().unwrap_or(Value::Null));
                    metas.push(p.meta.clone().unwrap_or(Value::Null));
                }
                Node::Record(record) => {
                    values.push(self.encode(record));
                    metas.push(Value::Null);
                }
            }
        }
        if values.iter().any(|v| !v.is_null()) {
            map.insert(key.to_string(), Value::Array(values));
        }
        if metas.iter().any(|m| !m.is_null()) {
            map.insert(format!("_{key}"), Value::Array(metas));
        }
    }
}
