//! FHIR R4 data type models
//!
//! Two views over the same JSON documents:
//!
//! - Generic [`Record`]s, decoded against any type in a
//!   [`SchemaRegistry`](fhirtypes_schema::SchemaRegistry) by the [`Decoder`] and
//!   written back by the [`Encoder`]. Unknown elements and undeclared choice
//!   variants are rejected in strict mode and kept in lenient mode.
//! - Typed structs in [`datatypes`] (`Dosage`, `Timing`, `Extension`, ...)
//!   implementing [`FhirType`]. Choice fields are tagged enums declared with
//!   [`choice_type!`] and carried by [`ChoiceField`] / [`RequiredChoice`].
//!
//! # Example
//!
//! ```rust
//! use fhirtypes_models::{Decoder, Encoder, Extension, ExtensionValue, FhirType};
//! use serde_json::json;
//!
//! let input = json!({"url": "http://example.org/flag", "valueBoolean": true});
//!
//! let record = Decoder::r4().decode("Extension", &input).unwrap();
//! assert_eq!(record.choice("value").unwrap().type_code(), "boolean");
//! assert_eq!(Encoder::new().encode(&record), input);
//!
//! let ext = Extension::from_json(&input).unwrap();
//! assert_eq!(ext.value.get(), Some(&ExtensionValue::Boolean(true)));
//! ```

pub mod choice;
pub mod datatypes;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod record;
pub mod typed;

pub use choice::{ChoiceField, ChoiceType, DecodeMode, RequiredChoice};
pub use datatypes::*;
pub use decoder::{DecodeOptions, Decoder, DEFAULT_MAX_DEPTH};
pub use encoder::Encoder;
pub use error::{Error, Result};
pub use record::{ChoiceNode, FieldValue, Node, PrimitiveValue, Record};
pub use typed::FhirType;

#[doc(hidden)]
pub mod __private {
    pub use serde;
    pub use serde_json;
}
