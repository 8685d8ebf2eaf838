//! Parser for FHIR StructureDefinitions
//!
//! Extracts the field tables of a complex type, and of every inner backbone
//! element it declares, from a StructureDefinition. The snapshot is preferred;
//! a differential-only definition is accepted for locally authored types.

use crate::error::{Error, Result};
use crate::ir::{capitalize_first, Binding, BindingStrength, Cardinality, FieldSchema, TypeKind, TypeSchema};
use serde_json::Value;
use std::collections::HashMap;

const FHIR_TYPE_EXTENSION: &str =
    "http://hl7.org/fhir/StructureDefinition/structuredefinition-fhir-type";

/// Parse a single StructureDefinition into its type and inner backbone types.
///
/// The main type comes first, inner types follow in element order.
pub fn parse_structure_definition(sd: &Value) -> Result<Vec<TypeSchema>> {
    if sd.get("resourceType").and_then(Value::as_str) != Some("StructureDefinition") {
        return Err(Error::InvalidStructureDefinition(
            "resourceType is not StructureDefinition".into(),
        ));
    }

    let name = sd
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::InvalidStructureDefinition("missing 'name'".into()))?
        .to_string();

    let kind = match sd.get("kind").and_then(Value::as_str) {
        Some("resource") => TypeKind::Resource,
        Some("primitive-type") => TypeKind::PrimitiveType,
        Some("complex-type") => TypeKind::ComplexType,
        other => {
            return Err(Error::InvalidStructureDefinition(format!(
                "{}: unsupported kind {:?}",
                name, other
            )))
        }
    };

    // Profiles (Age, SimpleQuantity, ...) keep the constrained type's paths
    let root = sd
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or(&name)
        .to_string();

    let base = sd
        .get("baseDefinition")
        .and_then(Value::as_str)
        .map(extract_type_name_from_url);

    let elements = sd
        .get("snapshot")
        .or_else(|| sd.get("differential"))
        .and_then(|s| s.get("element"))
        .and_then(Value::as_array)
        .ok_or_else(|| {
            Error::InvalidStructureDefinition(format!("{name}: no snapshot or differential elements"))
        })?;

    // Slices constrain an element, they do not declare new fields
    let elements: Vec<&Value> = elements
        .iter()
        .filter(|e| e.get("sliceName").is_none())
        .filter(|e| {
            e.get("id")
                .and_then(Value::as_str)
                .map_or(true, |id| !id.contains(':'))
        })
        .collect();

    let description = sd
        .get("description")
        .and_then(Value::as_str)
        .map(String::from);

    let mut parser = ElementParser {
        elements: &elements,
        root: &root,
        inner_names: HashMap::new(),
        types: Vec::new(),
    };
    let fields = parser.parse_fields(&name, &root)?;

    let mut main = TypeSchema {
        name,
        path: root.clone(),
        url: sd.get("url").and_then(Value::as_str).map(String::from),
        kind,
        base,
        description,
        fields,
    };
    let mut types = std::mem::take(&mut parser.types);
    if kind != TypeKind::PrimitiveType {
        ensure_inherited_fields(&mut main);
        for inner in &mut types {
            ensure_inherited_fields(inner);
        }
    }
    types.insert(0, main);
    Ok(types)
}

struct ElementParser<'a> {
    elements: &'a [&'a Value],
    root: &'a str,
    /// Element path -> inner type name, for contentReference resolution
    inner_names: HashMap<String, String>,
    types: Vec<TypeSchema>,
}

impl<'a> ElementParser<'a> {
    /// Parse the direct children of `prefix` as fields of `type_name`
    fn parse_fields(&mut self, type_name: &str, prefix: &str) -> Result<Vec<FieldSchema>> {
        let expected_prefix = format!("{}.", prefix);
        let mut fields = Vec::new();

        for element in self.elements {
            let path = element_path(element);
            let Some(remainder) = path.strip_prefix(&expected_prefix) else {
                continue;
            };
            if remainder.is_empty() || remainder.contains('.') {
                continue;
            }

            let mut field = parse_element(element, type_name, remainder)?;

            let has_children = self
                .elements
                .iter()
                .any(|e| element_path(e).starts_with(&format!("{}.", path)));
            if has_children {
                let inner_name = format!("{}.{}", type_name, capitalize_first(&field.name));
                self.inner_names.insert(path.to_string(), inner_name.clone());
                let base = match field.types.first().map(String::as_str) {
                    Some("BackboneElement") => "BackboneElement",
                    _ => "Element",
                };
                let inner_fields = self.parse_fields(&inner_name, path)?;
                self.types.push(TypeSchema {
                    name: inner_name.clone(),
                    path: path.to_string(),
                    url: None,
                    kind: TypeKind::Backbone,
                    base: Some(base.to_string()),
                    description: field.description.clone(),
                    fields: inner_fields,
                });
                field.types = vec![inner_name];
            } else if let Some(reference) = element.get("contentReference").and_then(Value::as_str) {
                let target = reference.trim_start_matches('#');
                let target = target.rsplit_once('#').map_or(target, |(_, p)| p);
                let resolved = self
                    .inner_names
                    .get(target)
                    .cloned()
                    .unwrap_or_else(|| inner_type_name(self.root, target));
                field.types = vec![resolved];
            }

            fields.push(field);
        }

        Ok(fields)
    }
}

fn element_path(element: &Value) -> &str {
    element.get("path").and_then(Value::as_str).unwrap_or("")
}

/// `Questionnaire.item.answerOption` -> `Questionnaire.Item.AnswerOption`
fn inner_type_name(root: &str, path: &str) -> String {
    let mut name = root.to_string();
    if let Some(rest) = path.strip_prefix(&format!("{root}.")) {
        for segment in rest.split('.') {
            name.push('.');
            name.push_str(&capitalize_first(segment));
        }
    }
    name
}

/// Parse a single element into a field
fn parse_element(element: &Value, type_name: &str, segment: &str) -> Result<FieldSchema> {
    let (name, is_choice) = match segment.strip_suffix("[x]") {
        Some(base) => (base.to_string(), true),
        None => (segment.to_string(), false),
    };

    let description = element
        .get("short")
        .and_then(Value::as_str)
        .or_else(|| element.get("definition").and_then(Value::as_str))
        .map(String::from);

    // Parse cardinality
    let min = element.get("min").and_then(Value::as_u64).unwrap_or(0) as u32;
    let max = match element.get("max").and_then(Value::as_str) {
        Some("*") => None,
        Some(n) => Some(n.parse().map_err(|_| {
            Error::InvalidCardinality(format!("{type_name}.{segment}: max '{n}'"))
        })?),
        None => Some(1),
    };

    let types = element
        .get("type")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(parse_element_type).collect())
        .unwrap_or_default();

    let is_modifier = element
        .get("isModifier")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    Ok(FieldSchema {
        name,
        path: format!("{}.{}", type_path(type_name), segment),
        types,
        cardinality: Cardinality::new(min, max),
        is_choice,
        binding: element.get("binding").and_then(parse_binding),
        is_modifier,
        description,
    })
}

/// Display path of a type: inner types keep the element path style
fn type_path(type_name: &str) -> String {
    let mut parts = type_name.split('.');
    let mut path = parts.next().unwrap_or_default().to_string();
    for part in parts {
        path.push('.');
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            path.extend(first.to_lowercase());
            path.push_str(chars.as_str());
        }
    }
    path
}

/// Parse a type code, mapping FHIRPath system types to FHIR primitives
fn parse_element_type(type_spec: &Value) -> Option<String> {
    let fhir_type = type_spec
        .get("extension")
        .and_then(Value::as_array)
        .and_then(|exts| {
            exts.iter().find(|e| {
                e.get("url").and_then(Value::as_str) == Some(FHIR_TYPE_EXTENSION)
            })
        })
        .and_then(|e| e.get("valueUrl").or_else(|| e.get("valueUri")))
        .and_then(Value::as_str);
    if let Some(code) = fhir_type {
        return Some(code.to_string());
    }

    let code = type_spec.get("code").and_then(Value::as_str)?;
    let code = match code.strip_prefix("http://hl7.org/fhirpath/System.") {
        Some("String") => "string",
        Some("Boolean") => "boolean",
        Some("Integer") => "integer",
        Some("Decimal") => "decimal",
        Some("Date") => "date",
        Some("DateTime") => "dateTime",
        Some("Time") => "time",
        Some(_) => "string",
        None => code,
    };
    Some(code.to_string())
}

fn parse_binding(binding: &Value) -> Option<Binding> {
    let strength = match binding.get("strength").and_then(Value::as_str)? {
        "required" => BindingStrength::Required,
        "extensible" => BindingStrength::Extensible,
        "preferred" => BindingStrength::Preferred,
        "example" => BindingStrength::Example,
        _ => return None,
    };
    Some(Binding {
        strength,
        value_set: binding
            .get("valueSet")
            .and_then(Value::as_str)
            .map(String::from),
        codes: Vec::new(),
    })
}

/// Add `id`, `extension` and `modifierExtension` when a definition omits them
pub(crate) fn ensure_inherited_fields(schema: &mut TypeSchema) {
    let backbone = schema.base.as_deref() == Some("BackboneElement");
    let direct = matches!(
        schema.base.as_deref(),
        None | Some("Element") | Some("BackboneElement")
    );
    if !direct {
        return;
    }

    let path = type_path(&schema.name);
    let mut inherited = Vec::new();
    if schema.field("id").is_none() {
        inherited.push(inherited_field(&path, "id", "string", Cardinality::OPTIONAL));
    }
    if schema.field("extension").is_none() {
        inherited.push(inherited_field(&path, "extension", "Extension", Cardinality::MANY));
    }
    if backbone && schema.field("modifierExtension").is_none() {
        let mut field = inherited_field(&path, "modifierExtension", "Extension", Cardinality::MANY);
        field.is_modifier = true;
        inherited.push(field);
    }
    schema.fields.splice(0..0, inherited);
}

fn inherited_field(type_path: &str, name: &str, type_code: &str, cardinality: Cardinality) -> FieldSchema {
    FieldSchema {
        name: name.to_string(),
        path: format!("{type_path}.{name}"),
        types: vec![type_code.to_string()],
        cardinality,
        is_choice: false,
        binding: None,
        is_modifier: false,
        description: None,
    }
}

/// Extract the type name from a canonical URL
/// E.g., "http://hl7.org/fhir/StructureDefinition/Quantity" -> "Quantity"
pub fn extract_type_name_from_url(url: &str) -> String {
    url.rsplit('/').next().unwrap_or(url).to_string()
}
