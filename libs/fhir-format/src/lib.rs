//! FHIR JSON ↔ XML conversion.
//!
//! Resources convert with [`json_to_xml`] / [`xml_to_json`]; data type values
//! (a `Dosage`, an `Extension`) with [`element_to_xml`] and [`xml_to_value`].
//! These are schema-agnostic. For exact JSON from XML (arrays for every
//! repeated field, numbers and booleans by declared type) use [`SchemaReader`]
//! over a [`SchemaRegistry`](fhirtypes_schema::SchemaRegistry).
//!
//! ```
//! use fhirtypes_format::{element_to_xml, SchemaReader};
//! use fhirtypes_schema::SchemaRegistry;
//! use serde_json::json;
//!
//! let value = json!({"url": "http://example.org/count", "valueInteger": 3});
//! let xml = element_to_xml("extension", &value).unwrap();
//! let back = SchemaReader::new(SchemaRegistry::r4()).read(&xml, "Extension").unwrap();
//! assert_eq!(back, value);
//! ```

pub mod error;
pub mod reader;
pub mod writer;

pub use error::{FormatError, Result};
pub use reader::{xml_to_json, xml_to_value, SchemaReader};
pub use writer::{element_to_xml, json_to_xml};

pub(crate) const FHIR_NS: &str = "http://hl7.org/fhir";
pub(crate) const XHTML_NS: &str = "http://www.w3.org/1999/xhtml";
