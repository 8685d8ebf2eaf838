//! Schema-driven record decoder

use crate::choice::{self, ChoiceSpec, DecodeMode, Decoded};
use crate::error::{json_kind, Error, Result};
use crate::record::{ChoiceNode, FieldValue, Node, PrimitiveValue, Record};
use fhirtypes_schema::{FieldSchema, PrimitiveType, SchemaRegistry};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::{debug, warn};

pub const DEFAULT_MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeOptions {
    pub mode: DecodeMode,
    /// Maximum nesting of complex values below the root
    pub max_depth: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            mode: DecodeMode::Strict,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Decodes generic JSON trees into [`Record`]s, checking them against a registry
#[derive(Debug, Clone, Copy)]
pub struct Decoder<'r> {
    registry: &'r SchemaRegistry,
    options: DecodeOptions,
}

impl Decoder<'static> {
    /// Decoder over the embedded R4 registry
    pub fn r4() -> Self {
        Decoder::new(SchemaRegistry::r4())
    }
}

impl<'r> Decoder<'r> {
    pub fn new(registry: &'r SchemaRegistry) -> Self {
        Self {
            registry,
            options: DecodeOptions::default(),
        }
    }

    pub fn with_options(mut self, options: DecodeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn lenient(mut self) -> Self {
        self.options.mode = DecodeMode::Lenient;
        self
    }

    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    pub fn registry(&self) -> &'r SchemaRegistry {
        self.registry
    }

    /// Decode one document of `type_name`
    pub fn decode(&self, type_name: &str, value: &Value) -> Result<Record> {
        debug!(type_name, mode = ?self.options.mode, "Decoding record");
        self.decode_record(type_name, value, type_name, 0)
    }

    /// Decode documents independently and in parallel
    pub fn decode_batch(&self, type_name: &str, documents: &[Value]) -> Vec<Result<Record>> {
        documents
            .par_iter()
            .map(|document| self.decode(type_name, document))
            .collect()
    }

    fn decode_record(&self, type_name: &str, value: &Value, path: &str, depth: usize) -> Result<Record> {
        if depth > self.options.max_depth {
            return Err(Error::TooDeep {
                path: path.to_string(),
                max_depth: self.options.max_depth,
            });
        }
        let schema = self
            .registry
            .get(type_name)
            .ok_or_else(|| Error::UnknownType(type_name.to_string()))?;
        let object = value.as_object().ok_or_else(|| Error::UnexpectedShape {
            path: path.to_string(),
            expected: "object",
            found: json_kind(value),
        })?;

        let mut record = Record::new(type_name);
        let mut consumed: HashSet<&str> = HashSet::new();
        consumed.insert("resourceType");

        let reserved: Vec<&str> = schema
            .fields
            .iter()
            .filter(|f| !f.is_choice)
            .map(|f| f.name.as_str())
            .collect();

        for field in &schema.fields {
            let field_path = format!("{}.{}", path, field.element_name());
            if field.is_choice {
                if let Some((key, choice)) =
                    self.decode_choice(field, object, &reserved, &field_path, depth)?
                {
                    let meta_key = format!("_{key}");
                    for k in [key.as_str(), meta_key.as_str()] {
                        if let Some((k, _)) = object.get_key_value(k) {
                            consumed.insert(k.as_str());
                        }
                    }
                    record.set(field.name.clone(), FieldValue::Choice(choice));
                }
                continue;
            }

            let meta_key = format!("_{}", field.name);
            for key in [field.name.as_str(), meta_key.as_str()] {
                if let Some((k, _)) = object.get_key_value(key) {
                    consumed.insert(k.as_str());
                }
            }
            let value = object.get(&field.name).filter(|v| !v.is_null());
            let meta = object.get(&meta_key).filter(|v| !v.is_null());
            if let Some(field_value) = self.decode_field(field, value, meta, &field_path, depth)? {
                record.set(field.name.clone(), field_value);
            }
        }

        for (key, value) in object {
            if consumed.contains(key.as_str()) || value.is_null() {
                continue;
            }
            match self.options.mode {
                DecodeMode::Strict => {
                    return Err(Error::UnknownElement {
                        path: path.to_string(),
                        key: key.clone(),
                    })
                }
                DecodeMode::Lenient => {
                    warn!(path, key = %key, "Keeping unrecognized element");
                    record.unrecognized_mut().insert(key.clone(), value.clone());
                }
            }
        }

        Ok(record)
    }

    /// Returns the wire key and the decoded variant
    fn decode_choice(
        &self,
        field: &FieldSchema,
        object: &Map<String, Value>,
        reserved: &[&str],
        path: &str,
        depth: usize,
    ) -> Result<Option<(String, ChoiceNode)>> {
        let allowed: Vec<&str> = field.types.iter().map(String::as_str).collect();
        let spec = ChoiceSpec {
            path,
            base: &field.name,
            allowed: &allowed,
            required: field.is_required(),
            reserved,
        };

        match choice::decode(&spec, object, self.options.mode)? {
            None => Ok(None),
            Some(Decoded::Variant {
                type_code,
                key,
                value,
                meta,
            }) => {
                let node = self.decode_node(&type_code, value, meta, path, depth)?;
                Ok(Some((key, ChoiceNode::Variant { type_code, node })))
            }
            Some(Decoded::Unrecognized { key, value, meta }) => Ok(Some((
                key.clone(),
                ChoiceNode::Unrecognized {
                    key,
                    value: value.cloned(),
                    meta: meta.cloned(),
                },
            ))),
        }
    }

    fn decode_field(
        &self,
        field: &FieldSchema,
        value: Option<&Value>,
        meta: Option<&Value>,
        path: &str,
        depth: usize,
    ) -> Result<Option<FieldValue>> {
        let type_code = field
            .single_type()
            .ok_or_else(|| Error::UnknownType(format!("{path} declares no type")))?;

        let entries = entries(value, meta, path)?;
        let count = entries.len();
        if count == 0 {
            if field.is_required() {
                return Err(Error::RequiredFieldMissing {
                    path: path.to_string(),
                });
            }
            return Ok(None);
        }
        if let Some(max) = field.max() {
            if count > max as usize {
                return Err(Error::TooMany {
                    path: path.to_string(),
                    max,
                    found: count,
                });
            }
        }
        if count < field.min() as usize {
            return Err(Error::TooFew {
                path: path.to_string(),
                min: field.min(),
                found: count,
            });
        }

        if !field.is_repeated() {
            let (value, meta) = entries[0];
            let node = self.decode_node(type_code, value, meta, path, depth)?;
            return Ok(Some(FieldValue::Single(node)));
        }

        let nodes = entries
            .into_iter()
            .enumerate()
            .map(|(i, (value, meta))| {
                self.decode_node(type_code, value, meta, &format!("{path}[{i}]"), depth)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Some(FieldValue::List(nodes)))
    }

    fn decode_node(
        &self,
        type_code: &str,
        value: Option<&Value>,
        meta: Option<&Value>,
        path: &str,
        depth: usize,
    ) -> Result<Node> {
        if let Some(primitive) = PrimitiveType::from_code(type_code) {
            if let Some(value) = value {
                primitive
                    .check(value)
                    .map_err(|reason| Error::InvalidPrimitive {
                        path: path.to_string(),
                        type_code: type_code.to_string(),
                        reason,
                    })?;
            }
            if let Some(meta) = meta {
                if !meta.is_object() {
                    return Err(Error::UnexpectedShape {
                        path: path.to_string(),
                        expected: "object for primitive metadata",
                        found: json_kind(meta),
                    });
                }
            }
            return Ok(Node::Primitive(PrimitiveValue {
                type_code: primitive,
                value: value.cloned(),
                meta: meta.cloned(),
            }));
        }

        match value {
            Some(value) => Ok(Node::Record(self.decode_record(type_code, value, path, depth + 1)?)),
            None => Err(Error::UnexpectedShape {
                path: path.to_string(),
                expected: "a value for a complex type",
                found: "metadata only",
            }),
        }
    }
}

type Entry<'v> = (Option<&'v Value>, Option<&'v Value>);

/// Pair values with their `_field` metadata. A bare value counts as one entry;
/// array positions where both sides are null are dropped.
fn entries<'v>(value: Option<&'v Value>, meta: Option<&'v Value>, path: &str) -> Result<Vec<Entry<'v>>> {
    fn spread(value: Option<&Value>) -> Vec<Option<&Value>> {
        match value {
            None => Vec::new(),
            Some(Value::Array(items)) => items.iter().map(|v| (!v.is_null()).then_some(v)).collect(),
            Some(v) => vec![Some(v)],
        }
    }

    let values = spread(value);
    let metas = spread(meta);
    if !values.is_empty() && !metas.is_empty() && values.len() != metas.len() {
        return Err(Error::UnexpectedShape {
            path: path.to_string(),
            expected: "metadata aligned with the values",
            found: "arrays of different length",
        });
    }

    let len = values.len().max(metas.len());
    Ok((0..len)
        .map(|i| {
            (
                values.get(i).copied().flatten(),
                metas.get(i).copied().flatten(),
            )
        })
        .filter(|(v, m)| v.is_some() || m.is_some())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entries_alignment() {
        let values = json!(["a", null, "c"]);
        let metas = json!([null, {"id": "b"}, null]);
        let e = entries(Some(&values), Some(&metas), "HumanName.given").unwrap();
        assert_eq!(e.len(), 3);
        assert_eq!(e[1], (None, Some(&json!({"id": "b"}))));

        let short = json!([{"id": "x"}]);
        assert!(entries(Some(&values), Some(&short), "HumanName.given").is_err());
    }

    #[test]
    fn test_entries_bare_value() {
        let value = json!("Peter");
        let e = entries(Some(&value), None, "HumanName.given").unwrap();
        assert_eq!(e, vec![(Some(&value), None)]);
        assert!(entries(Some(&json!([])), None, "x").unwrap().is_empty());
    }

    #[test]
    fn test_max_depth() {
        let decoder = Decoder::r4().with_options(DecodeOptions {
            max_depth: 1,
            ..DecodeOptions::default()
        });
        let nested = json!({
            "url": "http://a",
            "extension": [{
                "url": "http://b",
                "extension": [{ "url": "http://c", "valueString": "deep" }]
            }]
        });
        let err = decoder.decode("Extension", &nested).unwrap_err();
        assert!(matches!(err, Error::TooDeep { ref path, max_depth: 1 } if path == "Extension.extension[0].extension[0]"));
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let options: DecodeOptions = serde_json::from_value(json!({"mode": "lenient"})).unwrap();
        assert_eq!(options.mode, DecodeMode::Lenient);
        assert_eq!(options.max_depth, DEFAULT_MAX_DEPTH);
    }
}
