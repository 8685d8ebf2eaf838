//! Subcommands and the context they share

pub mod check;
pub mod convert;
pub mod decode;
pub mod export_table;
pub mod schema;

use crate::settings::Settings;
use anyhow::{bail, Context as _, Result};
use clap::ValueEnum;
use fhirtypes_format::{element_to_xml, json_to_xml, xml_to_json, xml_to_value, SchemaReader};
use fhirtypes_models::{DecodeOptions, Decoder, Encoder};
use fhirtypes_schema::{SchemaRegistry, TypeKind};
use serde_json::{Map, Value};
use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Json,
    Xml,
}

impl Format {
    /// By file extension, then by the first non-blank character
    pub fn detect(path: &Path, content: &str) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("xml") => Format::Xml,
            Some("json") | Some("ndjson") => Format::Json,
            _ if content.trim_start().starts_with('<') => Format::Xml,
            _ => Format::Json,
        }
    }

    pub fn other(self) -> Self {
        match self {
            Format::Json => Format::Xml,
            Format::Xml => Format::Json,
        }
    }
}

/// Registry, decode options and the `--type` selection
pub struct Context {
    registry: SchemaRegistry,
    options: DecodeOptions,
    type_name: Option<String>,
}

impl Context {
    pub fn new(settings: &Settings, type_name: Option<String>) -> Result<Self> {
        let mut registry =
            SchemaRegistry::with_r4_datatypes().context("Failed to load the embedded R4 schema")?;
        for path in &settings.definitions {
            let loaded = registry
                .load_path(path)
                .with_context(|| format!("Failed to load definitions from {}", path.display()))?;
            debug!(path = %path.display(), loaded, "Registered extra definitions");
        }

        if let Some(name) = &type_name {
            if !registry.contains(name) {
                bail!("unknown type '{name}'");
            }
        }

        Ok(Self {
            registry,
            options: settings.decode,
            type_name,
        })
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    pub fn decoder(&self) -> Decoder<'_> {
        Decoder::new(&self.registry).with_options(self.options)
    }

    pub fn encoder(&self) -> Encoder<'_> {
        Encoder::with_registry(&self.registry)
    }

    /// `--type` if given, else the `resourceType` of the document
    pub fn resolve_type(&self, document: &Value) -> Result<String> {
        if let Some(name) = &self.type_name {
            return Ok(name.clone());
        }
        match document.get("resourceType").and_then(Value::as_str) {
            Some(name) if self.registry.contains(name) => Ok(name.to_string()),
            Some(name) => bail!("unknown type '{name}'; load its definition with --definitions"),
            None => bail!("cannot tell the type of the document; pass --type <TYPE>"),
        }
    }

    /// Read one JSON or XML document
    pub fn read_document(&self, path: &Path) -> Result<Value> {
        let content = read_input(path)?;
        self.parse_document(path, &content)
    }

    pub fn parse_document(&self, path: &Path, content: &str) -> Result<Value> {
        match Format::detect(path, content) {
            Format::Json => serde_json::from_str(content)
                .with_context(|| format!("{} is not valid JSON", path.display())),
            Format::Xml => self
                .parse_xml(content)
                .with_context(|| format!("Failed to read XML from {}", path.display())),
        }
    }

    fn parse_xml(&self, content: &str) -> Result<Value> {
        let value = match &self.type_name {
            Some(name) => SchemaReader::new(&self.registry).read(content, name)?,
            None if root_is_resource(content) => serde_json::from_str(&xml_to_json(content)?)?,
            None => xml_to_value(content)?,
        };
        Ok(value)
    }

    /// Render a JSON tree of `type_name` in `format`
    pub fn render(&self, value: &Value, type_name: Option<&str>, format: Format, element: Option<&str>) -> Result<String> {
        let value = match type_name {
            Some(name) if self.is_resource(name) => with_resource_type(value, name),
            _ => value.clone(),
        };

        match format {
            Format::Json => Ok(serde_json::to_string_pretty(&value)?),
            Format::Xml if value.get("resourceType").is_some() => {
                Ok(json_to_xml(&serde_json::to_string(&value)?)?)
            }
            Format::Xml => {
                let name = match (element, type_name) {
                    (Some(element), _) => element.to_string(),
                    (None, Some(type_name)) => element_name(type_name),
                    (None, None) => bail!("XML output of a data type needs --type or --element"),
                };
                Ok(element_to_xml(&name, &value)?)
            }
        }
    }

    fn is_resource(&self, type_name: &str) -> bool {
        self.registry
            .get(type_name)
            .is_some_and(|schema| schema.kind == TypeKind::Resource)
    }
}

/// File contents, or stdin for `-`
pub fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut content = String::new();
        io::stdin()
            .read_to_string(&mut content)
            .context("Failed to read stdin")?;
        return Ok(content);
    }
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Write to `path`, or stdout when none is given
pub fn write_output(path: Option<&Path>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
        }
        None => {
            let mut out = io::stdout().lock();
            writeln!(out, "{content}")?;
            Ok(())
        }
    }
}

/// `Dosage` -> `dosage`, `Timing.Repeat` -> `repeat`
pub fn element_name(type_name: &str) -> String {
    let last = type_name.rsplit('.').next().unwrap_or(type_name);
    let mut chars = last.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn with_resource_type(value: &Value, type_name: &str) -> Value {
    let Some(obj) = value.as_object() else {
        return value.clone();
    };
    let mut out = Map::new();
    out.insert("resourceType".to_string(), Value::String(type_name.to_string()));
    for (key, member) in obj {
        if key != "resourceType" {
            out.insert(key.clone(), member.clone());
        }
    }
    Value::Object(out)
}

/// Whether the root element of an XML document names a resource (`<Patient>`)
fn root_is_resource(xml: &str) -> bool {
    xml.split('<')
        .skip(1)
        .find(|tag| !tag.starts_with('?') && !tag.starts_with('!'))
        .and_then(|tag| tag.chars().next())
        .is_some_and(|c| c.is_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;

    #[test]
    fn detects_format() {
        assert_eq!(Format::detect(Path::new("a.xml"), "{}"), Format::Xml);
        assert_eq!(Format::detect(Path::new("-"), "  <dosage/>"), Format::Xml);
        assert_eq!(Format::detect(&PathBuf::from("a.txt"), "{}"), Format::Json);
    }

    #[test]
    fn element_names() {
        assert_eq!(element_name("Dosage"), "dosage");
        assert_eq!(element_name("Timing.Repeat"), "repeat");
    }

    #[test]
    fn resource_roots() {
        assert!(root_is_resource("<?xml version=\"1.0\"?>\n<Patient xmlns=\"http://hl7.org/fhir\"/>"));
        assert!(!root_is_resource("<!-- note --><dosage/>"));
    }

    #[test]
    fn resource_type_goes_first() {
        let value = with_resource_type(&json!({"id": "a", "active": true}), "Patient");
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["resourceType", "id", "active"]);
    }

    #[test]
    fn resolves_type_from_resource_type() {
        let ctx = Context::new(&Settings::default(), None).unwrap();
        assert!(ctx.resolve_type(&json!({"system": "x"})).is_err());
        assert!(ctx.resolve_type(&json!({"resourceType": "Patient"})).is_err());

        let ctx = Context::new(&Settings::default(), Some("Coding".to_string())).unwrap();
        assert_eq!(ctx.resolve_type(&json!({"system": "x"})).unwrap(), "Coding");
    }
}
