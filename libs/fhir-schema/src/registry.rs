//! Registry of data type schemas

use crate::error::{Error, Result};
use crate::ir::{FieldSchema, TypeKind, TypeSchema};
use crate::parser::parse_structure_definition;
use crate::table::SchemaTable;
use once_cell::sync::Lazy;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

static R4: Lazy<SchemaRegistry> = Lazy::new(|| {
    SchemaRegistry::with_r4_datatypes().expect("embedded R4 schema table is valid")
});

/// Type schemas indexed by name, in registration order
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    types: Vec<TypeSchema>,
    index: HashMap<String, usize>,
}

/// Field addressed by a wire key
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyMatch<'a> {
    pub field: &'a FieldSchema,
    /// Concrete type for choice keys (`valueQuantity` -> `Quantity`)
    pub type_code: Option<&'a str>,
    /// Key was the `_`-prefixed primitive metadata key
    pub is_metadata: bool,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared registry of the R4 data types, built on first use
    pub fn r4() -> &'static SchemaRegistry {
        &R4
    }

    /// Fresh registry loaded from the embedded R4 table
    pub fn with_r4_datatypes() -> Result<Self> {
        let registry = SchemaTable::r4()?.into_registry()?;
        debug!(types = registry.len(), "Loaded embedded R4 data type schemas");
        Ok(registry)
    }

    /// Add or replace a type
    pub fn insert(&mut self, schema: TypeSchema) {
        match self.index.get(&schema.name) {
            Some(&i) => self.types[i] = schema,
            None => {
                self.index.insert(schema.name.clone(), self.types.len());
                self.types.push(schema);
            }
        }
    }

    pub fn get(&self, type_name: &str) -> Option<&TypeSchema> {
        self.index.get(type_name).map(|&i| &self.types[i])
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.index.contains_key(type_name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn types(&self) -> impl Iterator<Item = &TypeSchema> {
        self.types.iter()
    }

    pub fn type_names(&self) -> Vec<&str> {
        self.types.iter().map(|t| t.name.as_str()).collect()
    }

    /// Ordered field metadata of a type
    pub fn lookup_field_metadata(&self, type_name: &str) -> Result<&[FieldSchema]> {
        self.get(type_name)
            .map(|t| t.fields.as_slice())
            .ok_or_else(|| Error::UnknownType(type_name.to_string()))
    }

    pub fn field(&self, type_name: &str, name: &str) -> Option<&FieldSchema> {
        self.get(type_name)?.field(name)
    }

    /// Resolve a wire key (`text`, `_given`, `valueQuantity`) of a type.
    ///
    /// Plain field names win over choice prefixes, so `valueSet` on a type with
    /// both `valueSet` and `value[x]` resolves to `valueSet`. Choice keys with a
    /// suffix outside the declared types do not resolve.
    pub fn resolve_key<'a>(&'a self, type_name: &str, key: &str) -> Option<KeyMatch<'a>> {
        let schema = self.get(type_name)?;
        let (name, is_metadata) = match key.strip_prefix('_') {
            Some(rest) => (rest, true),
            None => (key, false),
        };

        if let Some(field) = schema.fields.iter().find(|f| !f.is_choice && f.name == name) {
            return Some(KeyMatch {
                field,
                type_code: None,
                is_metadata,
            });
        }

        schema.choice_fields().find_map(|field| {
            let suffix = name.strip_prefix(field.name.as_str())?;
            let type_code = field.type_for_suffix(suffix)?;
            Some(KeyMatch {
                field,
                type_code: Some(type_code),
                is_metadata,
            })
        })
    }

    /// Load the types declared by one StructureDefinition, returning their names.
    ///
    /// Primitive type definitions are skipped; primitives are built in.
    pub fn load_structure_definition(&mut self, sd: &Value) -> Result<Vec<String>> {
        if sd.get("kind").and_then(Value::as_str) == Some("primitive-type") {
            return Ok(Vec::new());
        }
        let types = parse_structure_definition(sd)?;
        let names: Vec<String> = types.iter().map(|t| t.name.clone()).collect();
        for schema in types {
            debug!(type_name = %schema.name, fields = schema.fields.len(), "Registered type schema");
            self.insert(schema);
        }
        Ok(names)
    }

    /// Load StructureDefinitions from a JSON file or a directory of JSON files.
    ///
    /// Bundles are searched for StructureDefinition entries. Files that are not
    /// StructureDefinitions are skipped. Returns the number of loaded types.
    pub fn load_path(&mut self, path: &Path) -> Result<usize> {
        let mut files = Vec::new();
        if path.is_dir() {
            for entry in fs::read_dir(path)? {
                let entry_path = entry?.path();
                if entry_path.extension().and_then(|e| e.to_str()) == Some("json") {
                    files.push(entry_path);
                }
            }
            files.sort();
        } else {
            files.push(path.to_path_buf());
        }

        let mut definitions = Vec::new();
        for file in &files {
            let content = fs::read_to_string(file)?;
            let value: Value = serde_json::from_str(&content)?;
            collect_structure_definitions(value, &mut definitions);
        }

        // Profiles need their base; retry until no progress is made
        let mut loaded = 0;
        let mut pending = definitions;
        while !pending.is_empty() {
            let before = pending.len();
            let mut deferred = Vec::new();
            for sd in pending {
                if !self.base_is_available(&sd) {
                    deferred.push(sd);
                    continue;
                }
                match self.load_structure_definition(&sd) {
                    Ok(names) => loaded += names.len(),
                    Err(e) => warn!(error = %e, "Skipping StructureDefinition"),
                }
            }
            if deferred.len() == before {
                for sd in &deferred {
                    match self.load_structure_definition(sd) {
                        Ok(names) => loaded += names.len(),
                        Err(e) => warn!(error = %e, "Skipping StructureDefinition"),
                    }
                }
                break;
            }
            pending = deferred;
        }

        info!(path = %path.display(), types = loaded, "Loaded StructureDefinitions");
        Ok(loaded)
    }

    fn base_is_available(&self, sd: &Value) -> bool {
        let own = sd.get("name").and_then(Value::as_str);
        match sd.get("type").and_then(Value::as_str) {
            Some(base) if Some(base) != own => {
                self.contains(base) || crate::PrimitiveType::is_primitive(base)
            }
            _ => true,
        }
    }

    /// Types of a given kind
    pub fn types_of_kind(&self, kind: TypeKind) -> impl Iterator<Item = &TypeSchema> {
        self.types.iter().filter(move |t| t.kind == kind)
    }
}

fn collect_structure_definitions(value: Value, out: &mut Vec<Value>) {
    match value.get("resourceType").and_then(Value::as_str) {
        Some("StructureDefinition") => out.push(value),
        Some("Bundle") => {
            if let Some(Value::Array(entries)) = value.get("entry") {
                for entry in entries {
                    if let Some(resource) = entry.get("resource") {
                        collect_structure_definitions(resource.clone(), out);
                    }
                }
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Cardinality;

    #[test]
    fn test_r4_registry_is_shared() {
        let a = SchemaRegistry::r4() as *const _;
        let b = SchemaRegistry::r4() as *const _;
        assert_eq!(a, b);
    }

    #[test]
    fn test_lookup_field_metadata() {
        let registry = SchemaRegistry::r4();
        let fields = registry.lookup_field_metadata("Extension").unwrap();
        let names: Vec<_> = fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["id", "extension", "url", "value"]);

        let value = &fields[3];
        assert!(value.is_choice);
        assert_eq!(value.types.len(), 50);
        assert_eq!(value.cardinality, Cardinality::OPTIONAL);
    }

    #[test]
    fn test_unknown_type() {
        let err = SchemaRegistry::r4()
            .lookup_field_metadata("Patient")
            .unwrap_err();
        assert!(matches!(err, Error::UnknownType(name) if name == "Patient"));
    }

    #[test]
    fn test_resolve_key() {
        let registry = SchemaRegistry::r4();

        let m = registry.resolve_key("Extension", "valueQuantity").unwrap();
        assert_eq!(m.field.name, "value");
        assert_eq!(m.type_code, Some("Quantity"));
        assert!(!m.is_metadata);

        let m = registry.resolve_key("Extension", "_valueDateTime").unwrap();
        assert_eq!(m.type_code, Some("dateTime"));
        assert!(m.is_metadata);

        let m = registry.resolve_key("HumanName", "_given").unwrap();
        assert_eq!(m.field.name, "given");
        assert_eq!(m.type_code, None);

        assert!(registry.resolve_key("Extension", "valueFooBar").is_none());
        assert!(registry.resolve_key("Extension", "colour").is_none());
    }

    #[test]
    fn test_plain_field_beats_choice_prefix() {
        let registry = SchemaRegistry::r4();
        let m = registry
            .resolve_key("DataRequirement.CodeFilter", "valueSet")
            .unwrap();
        assert_eq!(m.field.name, "valueSet");
        assert_eq!(m.type_code, None);
    }

    #[test]
    fn test_inner_types_and_inheritance() {
        let registry = SchemaRegistry::r4();
        let repeat = registry.get("Timing.Repeat").unwrap();
        assert_eq!(repeat.kind, TypeKind::Backbone);
        assert_eq!(repeat.field("bounds").unwrap().path, "Timing.repeat.bounds[x]");

        let dosage = registry.get("Dosage").unwrap();
        assert!(dosage.field("modifierExtension").is_some());
        let coding = registry.get("Coding").unwrap();
        assert!(coding.field("modifierExtension").is_none());
        assert_eq!(coding.fields[0].name, "id");
    }

    #[test]
    fn test_bindings_are_recorded() {
        let field = SchemaRegistry::r4().field("Address", "use").unwrap();
        let binding = field.binding.as_ref().unwrap();
        assert!(binding.codes.iter().any(|c| c == "billing"));
    }
}
