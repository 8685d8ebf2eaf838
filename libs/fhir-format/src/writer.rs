//! JSON → XML
//!
//! Follows the FHIR JSON/XML mapping:
//! - the root element of a resource is named by `resourceType`;
//! - primitive values go into the `value` attribute;
//! - `_field` metadata becomes the `id` attribute and `extension` children of
//!   the primitive element;
//! - arrays become repeated elements, with metadata aligned by position;
//! - `id` of a data type and `url` of an extension are attributes.

use crate::error::{FormatError, Result};
use crate::{FHIR_NS, XHTML_NS};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde_json::{Map, Value};
use std::io::Cursor;

/// Convert a FHIR JSON resource into its XML representation.
pub fn json_to_xml(input: &str) -> Result<String> {
    let value: Value = serde_json::from_str(input)?;
    let obj = value.as_object().ok_or(FormatError::ExpectedObject)?;
    let resource_type = obj
        .get("resourceType")
        .and_then(Value::as_str)
        .ok_or(FormatError::MissingResourceType)?;

    let mut writer = XmlWriter::new();
    writer.write_resource(resource_type, obj, true)?;
    writer.finish()
}

/// Write a data type value (e.g. a Dosage) as an XML element named `name`.
pub fn element_to_xml(name: &str, value: &Value) -> Result<String> {
    let obj = value.as_object().ok_or(FormatError::ExpectedObject)?;
    let mut writer = XmlWriter::new();
    writer.write_complex(name, obj, true)?;
    writer.finish()
}

struct XmlWriter {
    writer: Writer<Cursor<Vec<u8>>>,
}

impl XmlWriter {
    fn new() -> Self {
        Self {
            writer: Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2),
        }
    }

    fn finish(self) -> Result<String> {
        let bytes = self.writer.into_inner().into_inner();
        Ok(String::from_utf8(bytes)?)
    }

    fn write_resource(&mut self, resource_type: &str, obj: &Map<String, Value>, namespace: bool) -> Result<()> {
        let mut root = BytesStart::new(resource_type);
        if namespace {
            root.push_attribute(("xmlns", FHIR_NS));
        }
        self.writer.write_event(Event::Start(root))?;
        // a resource id is an element, not an attribute
        self.write_members(obj, &[])?;
        self.writer.write_event(Event::End(BytesEnd::new(resource_type)))?;
        Ok(())
    }

    fn write_complex(&mut self, name: &str, obj: &Map<String, Value>, namespace: bool) -> Result<()> {
        if let Some(resource_type) = obj.get("resourceType").and_then(Value::as_str) {
            // contained resources are wrapped in their element
            self.writer.write_event(Event::Start(BytesStart::new(name)))?;
            self.write_resource(resource_type, obj, false)?;
            self.writer.write_event(Event::End(BytesEnd::new(name)))?;
            return Ok(());
        }

        let mut start = BytesStart::new(name);
        if namespace {
            start.push_attribute(("xmlns", FHIR_NS));
        }
        let attributes = attribute_keys(name);
        for key in attributes {
            if let Some(Value::String(value)) = obj.get(*key) {
                start.push_attribute((*key, value.as_str()));
            }
        }

        let has_children = obj
            .iter()
            .any(|(k, v)| !v.is_null() && !(attributes.contains(&k.as_str()) && v.is_string()));
        if !has_children {
            self.writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        self.writer.write_event(Event::Start(start))?;
        self.write_members(obj, attributes)?;
        self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    fn write_members(&mut self, obj: &Map<String, Value>, attributes: &[&str]) -> Result<()> {
        for (key, value) in obj {
            if key == "resourceType" || (attributes.contains(&key.as_str()) && value.is_string()) {
                continue;
            }
            if let Some(name) = key.strip_prefix('_') {
                // metadata without a value is written where the metadata sits
                if obj.get(name).map_or(true, Value::is_null) {
                    self.write_value(name, &Value::Null, Some(value))?;
                }
                continue;
            }
            if key == "div" {
                if let Some(xhtml) = value.as_str().filter(|s| s.trim_start().starts_with("<div")) {
                    self.write_xhtml(xhtml)?;
                    continue;
                }
            }
            let meta = obj.get(&format!("_{key}")).filter(|m| !m.is_null());
            self.write_value(key, value, meta)?;
        }
        Ok(())
    }

    fn write_value(&mut self, name: &str, value: &Value, meta: Option<&Value>) -> Result<()> {
        match value {
            Value::Array(items) => {
                let metas = meta.and_then(Value::as_array);
                for (idx, item) in items.iter().enumerate() {
                    let item_meta = metas.and_then(|m| m.get(idx)).filter(|m| !m.is_null());
                    self.write_value(name, item, item_meta)?;
                }
            }
            Value::Object(obj) => self.write_complex(name, obj, false)?,
            Value::Null => match meta {
                Some(Value::Array(metas)) => {
                    for item_meta in metas.iter().filter(|m| !m.is_null()) {
                        self.write_primitive(name, None, Some(item_meta))?;
                    }
                }
                Some(meta) => self.write_primitive(name, None, Some(meta))?,
                None => {}
            },
            primitive => self.write_primitive(name, Some(primitive), meta)?,
        }
        Ok(())
    }

    fn write_primitive(&mut self, name: &str, value: Option<&Value>, meta: Option<&Value>) -> Result<()> {
        let mut elem = BytesStart::new(name);
        if let Some(value) = value {
            elem.push_attribute(("value", primitive_to_string(value).as_str()));
        }

        let meta = meta.and_then(Value::as_object);
        if let Some(Value::String(id)) = meta.and_then(|m| m.get("id")) {
            elem.push_attribute(("id", id.as_str()));
        }
        let extensions = meta.and_then(|m| m.get("extension")).filter(|e| !e.is_null());

        if value.is_none() && extensions.is_none() && meta.and_then(|m| m.get("id")).is_none() {
            return Ok(());
        }

        match extensions {
            Some(extensions) => {
                self.writer.write_event(Event::Start(elem))?;
                self.write_value("extension", extensions, None)?;
                self.writer.write_event(Event::End(BytesEnd::new(name)))?;
            }
            None => {
                self.writer.write_event(Event::Empty(elem))?;
            }
        }
        Ok(())
    }

    fn write_xhtml(&mut self, xhtml: &str) -> Result<()> {
        let xhtml = if xhtml.contains(XHTML_NS) {
            xhtml.to_string()
        } else {
            xhtml.replacen("<div", &format!("<div xmlns=\"{XHTML_NS}\""), 1)
        };
        self.writer
            .write_event(Event::Text(BytesText::from_escaped(xhtml)))?;
        Ok(())
    }
}

/// JSON properties written as XML attributes of a data type element
fn attribute_keys(name: &str) -> &'static [&'static str] {
    match name {
        "extension" | "modifierExtension" => &["id", "url"],
        _ => &["id"],
    }
}

fn primitive_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_to_xml_basic_patient() {
        let json = r#"
        {
            "resourceType": "Patient",
            "id": "pat-1",
            "active": true,
            "name": [
                { "family": "Everyman", "given": ["Adam"] }
            ]
        }
        "#;

        let xml = json_to_xml(json).expect("conversion failed");
        assert!(xml.contains(r#"<Patient xmlns="http://hl7.org/fhir">"#));
        assert!(xml.contains(r#"<id value="pat-1"/>"#));
        assert!(xml.contains(r#"<active value="true"/>"#));
        assert!(xml.contains(r#"<family value="Everyman"/>"#));
    }

    #[test]
    fn missing_resource_type() {
        let err = json_to_xml(r#"{"id": "x"}"#).unwrap_err();
        assert!(matches!(err, FormatError::MissingResourceType));
    }

    #[test]
    fn extension_url_is_an_attribute() {
        let value = json!({
            "url": "http://example.org/flag",
            "extension": [{"url": "nested", "valueBoolean": true}]
        });
        let xml = element_to_xml("extension", &value).unwrap();
        assert!(xml.contains(r#"<extension xmlns="http://hl7.org/fhir" url="http://example.org/flag">"#));
        assert!(xml.contains(r#"<extension url="nested">"#));
        assert!(xml.contains(r#"<valueBoolean value="true"/>"#));
        assert!(!xml.contains("<url"));
    }

    #[test]
    fn metadata_only_primitive() {
        let value = json!({
            "given": ["Peter", null],
            "_given": [null, {"id": "g2", "extension": [{"url": "http://example.org/x", "valueCode": "masked"}]}]
        });
        let xml = element_to_xml("name", &value).unwrap();
        assert!(xml.contains(r#"<given value="Peter"/>"#));
        assert!(xml.contains(r#"<given id="g2">"#));
        assert!(xml.contains(r#"<valueCode value="masked"/>"#));
    }

    #[test]
    fn data_type_id_is_an_attribute() {
        let value = json!({"id": "p1", "start": "2024-01-01"});
        let xml = element_to_xml("period", &value).unwrap();
        assert!(xml.contains(r#"<period xmlns="http://hl7.org/fhir" id="p1">"#));
        assert!(!xml.contains("<id "));
    }

    #[test]
    fn narrative_div_is_written_verbatim() {
        let json = r#"{
            "resourceType": "Basic",
            "text": {"status": "generated", "div": "<div xmlns=\"http://www.w3.org/1999/xhtml\"><p>Hi &amp; bye</p></div>"}
        }"#;
        let xml = json_to_xml(json).unwrap();
        assert!(xml.contains("<p>Hi &amp; bye</p>"));
        assert!(roxmltree::Document::parse(&xml).is_ok());
    }
}
