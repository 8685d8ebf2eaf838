//! Schema representation of FHIR data types
//!
//! Every complex data type (and every inner backbone type such as
//! `Timing.Repeat`) is described by a [`TypeSchema`] holding the ordered list of
//! its fields. Choice fields (`value[x]`) are a single [`FieldSchema`] with
//! `is_choice` set and the permitted concrete types in declaration order.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of a schema type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TypeKind {
    /// Primitive type (e.g., string, integer, boolean)
    PrimitiveType,
    /// Complex datatype (e.g., HumanName, Quantity, Extension)
    ComplexType,
    /// Inner element type scoped to its parent (e.g., Timing.Repeat)
    Backbone,
    /// FHIR Resource
    Resource,
}

/// A complex type and its fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeSchema {
    /// Type name (e.g., "Dosage", "Dosage.DoseAndRate")
    pub name: String,
    /// Element path of the type root (e.g., "Dosage.doseAndRate")
    pub path: String,
    /// Canonical URL if available
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub kind: TypeKind,
    /// Base type this derives from (Element, BackboneElement, Quantity, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Fields in declaration order, inherited fields first
    pub fields: Vec<FieldSchema>,
}

impl TypeSchema {
    /// Field by its logical name (`value` for `value[x]`)
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn choice_fields(&self) -> impl Iterator<Item = &FieldSchema> {
        self.fields.iter().filter(|f| f.is_choice)
    }

    /// Whether `name` is the exact wire name of a non-choice field
    pub fn has_plain_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| !f.is_choice && f.name == name)
    }
}

/// A field of a complex type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSchema {
    /// Logical name without the `[x]` marker
    pub name: String,
    /// Element path (e.g., "Extension.value[x]")
    pub path: String,
    /// Permitted type codes, in declaration order
    pub types: Vec<String>,
    pub cardinality: Cardinality,
    /// Whether this is a `[x]` field
    #[serde(default)]
    pub is_choice: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binding: Option<Binding>,
    #[serde(default)]
    pub is_modifier: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FieldSchema {
    pub fn allowed_types(&self) -> &[String] {
        &self.types
    }

    pub fn min(&self) -> u32 {
        self.cardinality.min
    }

    pub fn max(&self) -> Option<u32> {
        self.cardinality.max
    }

    pub fn is_repeated(&self) -> bool {
        self.cardinality.is_array()
    }

    pub fn is_required(&self) -> bool {
        self.cardinality.is_required()
    }

    /// Type code of a non-choice field
    pub fn single_type(&self) -> Option<&str> {
        if self.is_choice {
            None
        } else {
            self.types.first().map(String::as_str)
        }
    }

    /// Name as written in a StructureDefinition (`value[x]`)
    pub fn element_name(&self) -> String {
        if self.is_choice {
            format!("{}[x]", self.name)
        } else {
            self.name.clone()
        }
    }

    /// Wire key carrying this choice field as `type_code`
    pub fn choice_key(&self, type_code: &str) -> String {
        choice_key(&self.name, type_code)
    }

    /// Declared type matching a wire suffix (`Quantity` in `valueQuantity`)
    pub fn type_for_suffix(&self, suffix: &str) -> Option<&str> {
        type_for_suffix(&self.types, suffix)
    }
}

/// Cardinality of a field (min..max)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cardinality {
    /// Minimum occurrences
    pub min: u32,
    /// Maximum occurrences (None means unbounded/*)
    pub max: Option<u32>,
}

impl Cardinality {
    pub const OPTIONAL: Cardinality = Cardinality::new(0, Some(1));
    pub const REQUIRED: Cardinality = Cardinality::new(1, Some(1));
    pub const MANY: Cardinality = Cardinality::new(0, None);

    pub const fn new(min: u32, max: Option<u32>) -> Self {
        Self { min, max }
    }

    /// Check if this field is a list
    pub fn is_array(&self) -> bool {
        self.max.map(|m| m > 1).unwrap_or(true)
    }

    pub fn is_optional(&self) -> bool {
        self.min == 0
    }

    pub fn is_required(&self) -> bool {
        self.min > 0
    }

    /// Whether `count` occurrences satisfy this cardinality
    pub fn allows(&self, count: usize) -> bool {
        count >= self.min as usize && self.max.map_or(true, |m| count <= m as usize)
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) => write!(f, "{}..{}", self.min, max),
            None => write!(f, "{}..*", self.min),
        }
    }
}

impl FromStr for Cardinality {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidCardinality(s.to_string());
        let (min, max) = s.trim().split_once("..").ok_or_else(invalid)?;
        let min: u32 = min.parse().map_err(|_| invalid())?;
        let max = match max {
            "*" => None,
            n => Some(n.parse::<u32>().map_err(|_| invalid())?),
        };
        if max.is_some_and(|m| m < min) {
            return Err(invalid());
        }
        Ok(Self { min, max })
    }
}

impl TryFrom<String> for Cardinality {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Cardinality> for String {
    fn from(value: Cardinality) -> Self {
        value.to_string()
    }
}

/// Binding strength of a coded field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingStrength {
    Required,
    Extensible,
    Preferred,
    Example,
}

/// Terminology binding of a coded field. Advisory only, never enforced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Binding {
    pub strength: BindingStrength,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_set: Option<String>,
    /// Permissible codes, when the value set is small and known
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub codes: Vec<String>,
}

/// Wire key of a choice field variant: `value` + `dateTime` -> `valueDateTime`
pub fn choice_key(base: &str, type_code: &str) -> String {
    format!("{}{}", base, capitalize_first(type_code))
}

/// Find the declared type whose capitalized code equals `suffix`
pub fn type_for_suffix<'a, S: AsRef<str>>(allowed: &'a [S], suffix: &str) -> Option<&'a str> {
    allowed
        .iter()
        .map(AsRef::as_ref)
        .find(|code| capitalize_first(code) == suffix)
}

/// Capitalize the first letter of a string
pub fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().chain(chars).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cardinality_parse_and_display() {
        let card: Cardinality = "1..*".parse().unwrap();
        assert_eq!(card, Cardinality::new(1, None));
        assert!(card.is_array());
        assert!(card.is_required());
        assert_eq!(card.to_string(), "1..*");

        let card: Cardinality = "0..1".parse().unwrap();
        assert_eq!(card, Cardinality::OPTIONAL);
        assert!(!card.is_array());
    }

    #[test]
    fn test_cardinality_rejects_garbage() {
        assert!("1".parse::<Cardinality>().is_err());
        assert!("a..1".parse::<Cardinality>().is_err());
        assert!("2..1".parse::<Cardinality>().is_err());
    }

    #[test]
    fn test_cardinality_allows() {
        let card = Cardinality::new(1, Some(3));
        assert!(!card.allows(0));
        assert!(card.allows(1));
        assert!(card.allows(3));
        assert!(!card.allows(4));
        assert!(Cardinality::MANY.allows(100));
    }

    #[test]
    fn test_choice_key() {
        assert_eq!(choice_key("value", "string"), "valueString");
        assert_eq!(choice_key("value", "dateTime"), "valueDateTime");
        assert_eq!(choice_key("value", "base64Binary"), "valueBase64Binary");
        assert_eq!(choice_key("age", "Range"), "ageRange");
    }

    #[test]
    fn test_type_for_suffix() {
        let allowed = ["Duration", "Range", "Period"];
        assert_eq!(type_for_suffix(&allowed, "Range"), Some("Range"));
        assert_eq!(type_for_suffix(&allowed, "Quantity"), None);

        let allowed = vec!["date".to_string(), "dateTime".to_string()];
        assert_eq!(type_for_suffix(&allowed, "DateTime"), Some("dateTime"));
        assert_eq!(type_for_suffix(&allowed, "dateTime"), None);
    }

    #[test]
    fn test_cardinality_serde_as_string() {
        let json = serde_json::to_string(&Cardinality::new(0, None)).unwrap();
        assert_eq!(json, "\"0..*\"");
        let card: Cardinality = serde_json::from_str("\"1..1\"").unwrap();
        assert_eq!(card, Cardinality::REQUIRED);
    }
}
