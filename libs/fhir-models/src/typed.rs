//! Typed data type records

use crate::choice::ChoiceType;
use crate::datatypes::ExtensionValue;
use crate::decoder::Decoder;
use crate::error::{Error, Result};
use crate::record::{ChoiceNode, FieldValue, Node, Record};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// A data type with a Rust struct representation.
///
/// Construction from JSON first checks the document against the type's schema
/// with the record decoder, so typed records get the same errors (and paths)
/// as generic ones. Serde alone does not reject unknown elements.
pub trait FhirType: Serialize + DeserializeOwned {
    /// Schema type name (`Dosage`, `Timing.Repeat`)
    const TYPE_NAME: &'static str;

    /// Strict decode against the R4 registry
    fn from_json(value: &Value) -> Result<Self> {
        Self::from_json_with(&Decoder::r4(), value)
    }

    /// Decode with an explicit decoder, e.g. one over an extended registry.
    ///
    /// With a lenient decoder, content the struct has no place for (unknown
    /// elements, undeclared variants other than `Extension.value[x]`) fails
    /// with [`Error::NotRepresentable`]; use a [`Record`] to keep it.
    fn from_json_with(decoder: &Decoder<'_>, value: &Value) -> Result<Self> {
        let record = decoder.decode(Self::TYPE_NAME, value)?;
        check_representable(&record, Self::TYPE_NAME)?;
        serde_json::from_value(value.clone()).map_err(|e| Error::Malformed {
            type_name: Self::TYPE_NAME.to_string(),
            message: e.to_string(),
        })
    }

    fn from_json_str(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_json(&value)
    }

    fn to_json(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Check a constructed value against the schema (required fields, primitive forms)
    fn validate(&self) -> Result<()> {
        let value = self.to_json()?;
        Decoder::r4().decode(Self::TYPE_NAME, &value).map(|_| ())
    }
}

/// Reject lenient leftovers that serde would drop or refuse
fn check_representable(record: &Record, path: &str) -> Result<()> {
    if let Some(key) = record.unrecognized().keys().next() {
        return Err(Error::NotRepresentable {
            path: path.to_string(),
            key: key.clone(),
        });
    }

    for (name, value) in record.fields() {
        match value {
            FieldValue::Single(node) => check_node(node, &format!("{path}.{name}"))?,
            FieldValue::List(nodes) => {
                for (idx, node) in nodes.iter().enumerate() {
                    check_node(node, &format!("{path}.{name}[{idx}]"))?;
                }
            }
            FieldValue::Choice(ChoiceNode::Variant { node, .. }) => {
                check_node(node, &format!("{path}.{name}[x]"))?
            }
            FieldValue::Choice(ChoiceNode::Unrecognized { key, .. }) => {
                let element = format!("{}.{}[x]", record.type_name(), name);
                if element != ExtensionValue::PATH {
                    return Err(Error::NotRepresentable {
                        path: format!("{path}.{name}[x]"),
                        key: key.clone(),
                    });
                }
            }
        }
    }
    Ok(())
}

fn check_node(node: &Node, path: &str) -> Result<()> {
    match node {
        Node::Record(record) => check_representable(record, path),
        Node::Primitive(_) => Ok(()),
    }
}

macro_rules! impl_fhir_type {
    ($($ty:ty => $name:literal),+ $(,)?) => {
        $(
            impl $crate::typed::FhirType for $ty {
                const TYPE_NAME: &'static str = $name;
            }
        )+
    };
}

pub(crate) use impl_fhir_type;
