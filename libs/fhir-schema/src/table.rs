//! Compact schema table
//!
//! The table is the serialized form of a registry: one entry per type, one
//! line per declared element, inherited fields left implicit. The R4 data type
//! table embedded in this crate was exported from the canonical R4
//! StructureDefinitions and is regenerated with `fhirtypes export-table`.

use crate::error::{Error, Result};
use crate::ir::{Binding, Cardinality, FieldSchema, TypeKind, TypeSchema};
use crate::parser::ensure_inherited_fields;
use crate::registry::SchemaRegistry;
use serde::{Deserialize, Serialize};

const R4_TABLE: &str = include_str!("../data/r4-datatypes.json");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaTable {
    pub fhir_version: String,
    pub types: Vec<TableType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableType {
    pub name: String,
    /// Element path for inner types (`Timing.repeat`); defaults to the name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub kind: TypeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub elements: Vec<TableElement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableElement {
    /// Element name, `[x]`-suffixed for choice fields
    pub name: String,
    pub card: Cardinality,
    pub types: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub modifier: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binding: Option<Binding>,
}

impl SchemaTable {
    /// The embedded R4 data type table
    pub fn r4() -> Result<Self> {
        Self::from_json(R4_TABLE)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Build the type schemas of this table into `registry`.
    ///
    /// Types are applied in table order; a type whose base is another complex
    /// type (a profile such as `Age`) must come after that base.
    pub fn apply(&self, registry: &mut SchemaRegistry) -> Result<usize> {
        for entry in &self.types {
            let schema = entry.to_schema(registry)?;
            registry.insert(schema);
        }
        Ok(self.types.len())
    }

    pub fn into_registry(self) -> Result<SchemaRegistry> {
        let mut registry = SchemaRegistry::new();
        self.apply(&mut registry)?;
        Ok(registry)
    }

    /// Export every type of a registry, in registration order
    pub fn from_registry(registry: &SchemaRegistry, fhir_version: &str) -> Self {
        let types = registry
            .types()
            .map(|schema| TableType::from_schema(schema, registry))
            .collect();
        Self {
            fhir_version: fhir_version.to_string(),
            types,
        }
    }
}

impl TableType {
    fn type_path(&self) -> &str {
        self.path.as_deref().unwrap_or(&self.name)
    }

    fn to_schema(&self, registry: &SchemaRegistry) -> Result<TypeSchema> {
        if self.name.is_empty() {
            return Err(Error::InvalidTable("type without a name".into()));
        }
        let path = self.type_path().to_string();

        let mut fields = match self.base.as_deref() {
            None | Some("Element") | Some("BackboneElement") => Vec::new(),
            Some(base) => registry
                .get(base)
                .ok_or_else(|| Error::UnresolvedBase {
                    type_name: self.name.clone(),
                    base: base.to_string(),
                })?
                .fields
                .iter()
                .map(|f| FieldSchema {
                    path: format!("{}.{}", path, f.element_name()),
                    ..f.clone()
                })
                .collect(),
        };

        for element in &self.elements {
            let field = element.to_field(&path);
            match fields.iter_mut().find(|f| f.name == field.name) {
                Some(existing) => *existing = field,
                None => fields.push(field),
            }
        }

        let mut schema = TypeSchema {
            name: self.name.clone(),
            path,
            url: self.url.clone(),
            kind: self.kind,
            base: self.base.clone(),
            description: self.description.clone(),
            fields,
        };
        ensure_inherited_fields(&mut schema);
        Ok(schema)
    }

    fn from_schema(schema: &TypeSchema, registry: &SchemaRegistry) -> Self {
        let base_fields = schema.base.as_deref().and_then(|b| registry.get(b));
        let elements = schema
            .fields
            .iter()
            .filter(|f| match base_fields {
                Some(base) => base.field(&f.name).map_or(true, |b| !same_field(b, f)),
                None => !matches!(f.name.as_str(), "id" | "extension" | "modifierExtension"),
            })
            .map(TableElement::from_field)
            .collect();

        Self {
            name: schema.name.clone(),
            path: (schema.path != schema.name).then(|| schema.path.clone()),
            url: schema.url.clone(),
            kind: schema.kind,
            base: schema.base.clone(),
            description: schema.description.clone(),
            elements,
        }
    }
}

fn same_field(a: &FieldSchema, b: &FieldSchema) -> bool {
    a.types == b.types && a.cardinality == b.cardinality && a.is_choice == b.is_choice
}

impl TableElement {
    fn to_field(&self, type_path: &str) -> FieldSchema {
        let (name, is_choice) = match self.name.strip_suffix("[x]") {
            Some(base) => (base.to_string(), true),
            None => (self.name.clone(), false),
        };
        FieldSchema {
            name,
            path: format!("{}.{}", type_path, self.name),
            types: self.types.clone(),
            cardinality: self.card,
            is_choice,
            binding: self.binding.clone(),
            is_modifier: self.modifier,
            description: self.short.clone(),
        }
    }

    fn from_field(field: &FieldSchema) -> Self {
        Self {
            name: field.element_name(),
            card: field.cardinality,
            types: field.types.clone(),
            short: field.description.clone(),
            modifier: field.is_modifier,
            binding: field.binding.clone(),
        }
    }
}
