//! XML → JSON
//!
//! Without a schema, XML cannot tell a one-element list from a single value or
//! a number from a numeric string. [`xml_to_json`] and [`xml_to_value`] guess:
//! repeated elements become arrays and `true`/`false`/integers become JSON
//! scalars. [`SchemaReader`] looks every element up in a registry instead.

use crate::error::{FormatError, Result};
use crate::XHTML_NS;
use fhirtypes_schema::{PrimitiveType, SchemaRegistry};
use roxmltree::{Document, Node};
use serde_json::{Map, Value};
use tracing::debug;

/// Convert a FHIR XML resource into pretty-printed JSON.
pub fn xml_to_json(input: &str) -> Result<String> {
    let doc = Document::parse(input)?;
    let root = doc.root_element();

    let mut map = Map::new();
    map.insert(
        "resourceType".to_string(),
        Value::String(root.tag_name().name().to_string()),
    );
    read_children(input, &root, &mut map)?;

    Ok(serde_json::to_string_pretty(&Value::Object(map))?)
}

/// Read a data type element (e.g. `<dosage>`) into a JSON object.
pub fn xml_to_value(input: &str) -> Result<Value> {
    let doc = Document::parse(input)?;
    let (value, _) = read_element(input, &doc.root_element())?;
    Ok(value.unwrap_or_else(|| Value::Object(Map::new())))
}

/// Values and metadata of repeated child elements, grouped by name in first
/// occurrence order
#[derive(Default)]
struct Members {
    entries: Vec<(String, Vec<(Option<Value>, Option<Value>)>)>,
}

impl Members {
    fn push(&mut self, name: &str, value: Option<Value>, meta: Option<Value>) {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some((_, items)) => items.push((value, meta)),
            None => self.entries.push((name.to_string(), vec![(value, meta)])),
        }
    }

    fn write_into(self, target: &mut Map<String, Value>, is_array: impl Fn(&str) -> bool) {
        for (name, items) in self.entries {
            let has_meta = items.iter().any(|(_, m)| m.is_some());
            let meta_key = format!("_{name}");

            if items.len() == 1 && !is_array(&name) {
                let (value, meta) = items.into_iter().next().unwrap_or_default();
                if let Some(value) = value {
                    target.insert(name, value);
                }
                if let Some(meta) = meta {
                    target.insert(meta_key, meta);
                }
                continue;
            }

            let (values, metas): (Vec<_>, Vec<_>) = items
                .into_iter()
                .map(|(v, m)| (v.unwrap_or(Value::Null), m.unwrap_or(Value::Null)))
                .unzip();
            if values.iter().any(|v| !v.is_null()) {
                target.insert(name, Value::Array(values));
            }
            if has_meta {
                target.insert(meta_key, Value::Array(metas));
            }
        }
    }
}

fn read_children(source: &str, node: &Node, target: &mut Map<String, Value>) -> Result<()> {
    let mut members = Members::default();
    for child in node.children().filter(Node::is_element) {
        let (value, meta) = read_element(source, &child)?;
        members.push(child.tag_name().name(), value, meta);
    }
    members.write_into(target, |_| false);
    Ok(())
}

/// Returns the JSON value and the `_field` metadata of one element
fn read_element(source: &str, node: &Node) -> Result<(Option<Value>, Option<Value>)> {
    if is_xhtml(node) {
        return Ok((Some(Value::String(source[node.range()].to_string())), None));
    }

    if let Some(value) = node.attribute("value") {
        let meta = primitive_meta(node, |child| {
            read_element(source, child).map(|(v, _)| v.unwrap_or(Value::Null))
        })?;
        return Ok((Some(parse_primitive(value)), meta));
    }

    if let Some(resource) = contained_resource(node) {
        let mut obj = Map::new();
        obj.insert(
            "resourceType".to_string(),
            Value::String(resource.tag_name().name().to_string()),
        );
        read_children(source, &resource, &mut obj)?;
        return Ok((Some(Value::Object(obj)), None));
    }

    let mut obj = Map::new();
    for key in ["id", "url"] {
        if let Some(attr) = node.attribute(key) {
            obj.insert(key.to_string(), Value::String(attr.to_string()));
        }
    }
    read_children(source, node, &mut obj)?;
    Ok((Some(Value::Object(obj)), None))
}

/// `id` attribute and `extension` children of a primitive element
fn primitive_meta(
    node: &Node,
    mut read_extension: impl FnMut(&Node) -> Result<Value>,
) -> Result<Option<Value>> {
    let mut meta = Map::new();
    if let Some(id) = node.attribute("id") {
        meta.insert("id".to_string(), Value::String(id.to_string()));
    }
    let extensions = node
        .children()
        .filter(|c| c.is_element() && c.tag_name().name() == "extension")
        .map(|c| read_extension(&c))
        .collect::<Result<Vec<_>>>()?;
    if !extensions.is_empty() {
        meta.insert("extension".to_string(), Value::Array(extensions));
    }
    Ok((!meta.is_empty()).then_some(Value::Object(meta)))
}

/// A wrapper element (`contained`, `resource`) holding exactly one resource
fn contained_resource<'a, 'input>(node: &Node<'a, 'input>) -> Option<Node<'a, 'input>> {
    if node.attributes().next().is_some() {
        return None;
    }
    let mut children = node.children().filter(Node::is_element);
    let first = children.next()?;
    let is_resource = first
        .tag_name()
        .name()
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_uppercase());
    (is_resource && children.next().is_none()).then_some(first)
}

fn is_xhtml(node: &Node) -> bool {
    node.tag_name().namespace() == Some(XHTML_NS)
}

fn parse_primitive(input: &str) -> Value {
    match input {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => match input.parse::<i64>() {
            Ok(int) => Value::Number(int.into()),
            Err(_) => Value::String(input.to_string()),
        },
    }
}

/// Schema-aware XML reader.
///
/// Elements are resolved against the registry: repeated fields always become
/// arrays, primitives are parsed by their declared type (so `valueInteger`
/// becomes a JSON number and `valueString value="12"` stays a string) and
/// malformed primitive lexical forms are reported with their path. Elements
/// the schema does not know are read as in [`xml_to_value`], leaving the
/// decision to the record decoder.
#[derive(Debug, Clone, Copy)]
pub struct SchemaReader<'r> {
    registry: &'r SchemaRegistry,
}

impl<'r> SchemaReader<'r> {
    pub fn new(registry: &'r SchemaRegistry) -> Self {
        Self { registry }
    }

    /// Read an element holding a value of `type_name`
    pub fn read(&self, input: &str, type_name: &str) -> Result<Value> {
        if !self.registry.contains(type_name) {
            return Err(FormatError::UnknownType(type_name.to_string()));
        }
        let doc = Document::parse(input)?;
        let obj = self.read_complex(input, &doc.root_element(), type_name, type_name)?;
        Ok(Value::Object(obj))
    }

    fn read_complex(&self, source: &str, node: &Node, type_name: &str, path: &str) -> Result<Map<String, Value>> {
        let mut obj = Map::new();
        for key in ["id", "url"] {
            if let Some(attr) = node.attribute(key) {
                if self.registry.field(type_name, key).is_some() {
                    obj.insert(key.to_string(), Value::String(attr.to_string()));
                }
            }
        }

        let mut members = Members::default();
        for child in node.children().filter(Node::is_element) {
            let name = child.tag_name().name();
            let child_path = format!("{path}.{name}");
            let (value, meta) = self.read_member(source, &child, type_name, &child_path)?;
            members.push(name, value, meta);
        }

        members.write_into(&mut obj, |name| {
            self.registry
                .resolve_key(type_name, name)
                .is_some_and(|m| m.field.is_repeated())
        });
        Ok(obj)
    }

    fn read_member(
        &self,
        source: &str,
        node: &Node,
        type_name: &str,
        path: &str,
    ) -> Result<(Option<Value>, Option<Value>)> {
        if is_xhtml(node) {
            return Ok((Some(Value::String(source[node.range()].to_string())), None));
        }

        let name = node.tag_name().name();
        let type_code = self
            .registry
            .resolve_key(type_name, name)
            .and_then(|m| m.type_code.or_else(|| m.field.single_type()));
        let Some(type_code) = type_code else {
            debug!(path, "Element not in schema, reading without types");
            return read_element(source, node);
        };

        match PrimitiveType::from_code(type_code) {
            Some(primitive) => self.read_primitive(source, node, primitive, path),
            None => Ok((Some(self.read_typed(source, node, type_code, path)?), None)),
        }
    }

    fn read_primitive(
        &self,
        source: &str,
        node: &Node,
        primitive: PrimitiveType,
        path: &str,
    ) -> Result<(Option<Value>, Option<Value>)> {
        let value = match node.attribute("value") {
            Some(raw) => Some(primitive.parse_lexical(raw).map_err(|reason| {
                FormatError::InvalidPrimitive {
                    path: path.to_string(),
                    type_code: primitive.code().to_string(),
                    value: raw.to_string(),
                    reason,
                }
            })?),
            None => None,
        };
        let meta = primitive_meta(node, |child| {
            self.read_typed(source, child, "Extension", &format!("{path}.extension"))
        })?;
        Ok((value, meta))
    }

    fn read_typed(&self, source: &str, node: &Node, type_name: &str, path: &str) -> Result<Value> {
        if !self.registry.contains(type_name) {
            debug!(path, type_name, "Type not in registry, reading without types");
            return read_element(source, node).map(|(v, _)| v.unwrap_or(Value::Null));
        }
        Ok(Value::Object(self.read_complex(source, node, type_name, path)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn xml_to_json_reads_resource() {
        let xml = r#"
        <Patient xmlns="http://hl7.org/fhir">
            <id value="p1"/>
            <active value="true"/>
            <name>
                <family value="Everyman"/>
                <given value="Adam"/>
            </name>
        </Patient>
        "#;

        let json = xml_to_json(xml).expect("xml->json failed");
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["resourceType"], "Patient");
        assert_eq!(value["id"], "p1");
        assert_eq!(value["active"], true);
        assert_eq!(value["name"]["family"], "Everyman");
    }

    #[test]
    fn metadata_is_aligned_with_repeated_values() {
        let xml = r#"
        <name xmlns="http://hl7.org/fhir">
            <given value="Peter"/>
            <given value="Paul" id="g2"/>
            <given value="James"/>
        </name>
        "#;
        let value = xml_to_value(xml).unwrap();
        assert_eq!(value["given"], json!(["Peter", "Paul", "James"]));
        assert_eq!(value["_given"], json!([null, {"id": "g2"}, null]));
    }

    #[test]
    fn schema_reader_restores_arrays_and_numbers() {
        let xml = r#"
        <name xmlns="http://hl7.org/fhir">
            <family value="Chalmers"/>
            <given value="Peter"/>
        </name>
        "#;
        let value = SchemaReader::new(SchemaRegistry::r4()).read(xml, "HumanName").unwrap();
        assert_eq!(value, json!({"family": "Chalmers", "given": ["Peter"]}));

        let xml = r#"
        <extension xmlns="http://hl7.org/fhir" url="http://example.org/count">
            <valueInteger value="12"/>
        </extension>
        "#;
        let value = SchemaReader::new(SchemaRegistry::r4()).read(xml, "Extension").unwrap();
        assert_eq!(value, json!({"url": "http://example.org/count", "valueInteger": 12}));

        let xml = r#"
        <extension xmlns="http://hl7.org/fhir" url="http://example.org/label">
            <valueString value="12"/>
        </extension>
        "#;
        let value = SchemaReader::new(SchemaRegistry::r4()).read(xml, "Extension").unwrap();
        assert_eq!(value["valueString"], json!("12"));
    }

    #[test]
    fn schema_reader_reports_bad_primitives() {
        let xml = r#"
        <timing xmlns="http://hl7.org/fhir">
            <repeat><frequency value="twice"/></repeat>
        </timing>
        "#;
        let err = SchemaReader::new(SchemaRegistry::r4()).read(xml, "Timing").unwrap_err();
        match err {
            FormatError::InvalidPrimitive { path, type_code, .. } => {
                assert_eq!(path, "Timing.repeat.frequency");
                assert_eq!(type_code, "positiveInt");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn schema_reader_unknown_type() {
        let err = SchemaReader::new(SchemaRegistry::r4()).read("<x/>", "NoSuchType").unwrap_err();
        assert!(matches!(err, FormatError::UnknownType(_)));
    }
}
