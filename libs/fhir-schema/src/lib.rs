//! FHIR R4 data type schemas
//!
//! Field metadata for the FHIR data types: ordered fields, cardinality,
//! permitted types of every choice (`[x]`) field and terminology bindings.
//!
//! The R4 data types ship as an embedded table and are available through
//! [`SchemaRegistry::r4`]. Additional types are loaded at runtime from
//! StructureDefinitions:
//!
//! ```
//! use fhirtypes_schema::SchemaRegistry;
//!
//! let registry = SchemaRegistry::r4();
//! let value = registry.field("Extension", "value").unwrap();
//! assert!(value.is_choice);
//! assert_eq!(value.choice_key("dateTime"), "valueDateTime");
//! ```

pub mod error;
pub mod ir;
pub mod parser;
pub mod primitive;
pub mod registry;
pub mod table;

pub use error::{Error, Result};
pub use ir::{
    capitalize_first, choice_key, type_for_suffix, Binding, BindingStrength, Cardinality,
    FieldSchema, TypeKind, TypeSchema,
};
pub use parser::parse_structure_definition;
pub use primitive::{JsonKind, PrimitiveType};
pub use registry::{KeyMatch, SchemaRegistry};
pub use table::{SchemaTable, TableElement, TableType};
