//! Choice-field (`[x]`) codec
//!
//! A choice field such as `Extension.value[x]` is one logical field carried on
//! the wire by exactly one of several sibling keys: the base name followed by
//! the capitalized type code (`valueString`, `valueQuantity`,
//! `valueDateTime`). Primitive metadata for the variant travels under the same
//! key with a leading underscore (`_valueString`).
//!
//! [`decode`] finds the populated variant in a JSON object and checks it
//! against the declared types; [`encode`] and [`encode_into`] do the reverse.
//! Typed records use the [`ChoiceType`] trait, declared with
//! [`choice_type!`](crate::choice_type), together with the [`ChoiceField`] and
//! [`RequiredChoice`] wrappers, which route serde through the same codec.

use crate::error::{Error, Result};
use fhirtypes_schema::{capitalize_first, type_for_suffix};
use serde::de::{self, IgnoredAny, MapAccess, Visitor};
use serde::ser::{self, SerializeMap};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use tracing::warn;

/// How unknown variants and elements are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecodeMode {
    /// Reject anything not declared by the schema
    #[default]
    Strict,
    /// Keep undeclared variants and elements verbatim
    Lenient,
}

/// Declaration of one choice field
#[derive(Debug, Clone, Copy)]
pub struct ChoiceSpec<'a> {
    /// Path used in errors (e.g. `Dosage.asNeeded[x]`)
    pub path: &'a str,
    /// Base name without `[x]` (e.g. `asNeeded`)
    pub base: &'a str,
    /// Permitted type codes in declaration order
    pub allowed: &'a [&'a str],
    /// Minimum cardinality is at least one
    pub required: bool,
    /// Plain sibling fields sharing the prefix (`valueSet` next to `value[x]`)
    pub reserved: &'a [&'a str],
}

/// The populated variant of a choice field
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded<'v> {
    Variant {
        /// Declared type code (`dateTime`)
        type_code: String,
        /// Wire key (`valueDateTime`)
        key: String,
        value: Option<&'v Value>,
        /// Primitive metadata from `_key`
        meta: Option<&'v Value>,
    },
    /// A variant outside the declared types, kept in lenient mode
    Unrecognized {
        key: String,
        value: Option<&'v Value>,
        meta: Option<&'v Value>,
    },
}

impl<'v> Decoded<'v> {
    pub fn key(&self) -> &str {
        match self {
            Decoded::Variant { key, .. } | Decoded::Unrecognized { key, .. } => key,
        }
    }
}

/// Whether `key` (with or without the `_` metadata prefix) names a variant of `base`
pub fn is_variant_key(base: &str, key: &str) -> bool {
    let name = key.strip_prefix('_').unwrap_or(key);
    name.strip_prefix(base)
        .and_then(|suffix| suffix.chars().next())
        .is_some_and(|c| c.is_ascii_uppercase())
}

/// Locate the single populated variant of a choice field in `source`.
///
/// Null values do not populate a variant; `_key` metadata does. More than one
/// populated variant is a [`Error::ChoiceConflict`] in every mode.
pub fn decode<'v>(
    spec: &ChoiceSpec<'_>,
    source: &'v Map<String, Value>,
    mode: DecodeMode,
) -> Result<Option<Decoded<'v>>> {
    let mut populated: Vec<&str> = Vec::new();
    for (key, value) in source {
        if value.is_null() || !is_variant_key(spec.base, key) {
            continue;
        }
        let name = key.strip_prefix('_').unwrap_or(key);
        if spec.reserved.contains(&name) {
            continue;
        }
        if !populated.contains(&name) {
            populated.push(name);
        }
    }

    let key = match populated.as_slice() {
        [] if spec.required => {
            return Err(Error::RequiredFieldMissing {
                path: spec.path.to_string(),
            })
        }
        [] => return Ok(None),
        [key] => *key,
        keys => {
            return Err(Error::ChoiceConflict {
                path: spec.path.to_string(),
                keys: keys.iter().map(|k| k.to_string()).collect(),
            })
        }
    };

    let value = source.get(key).filter(|v| !v.is_null());
    let meta = source.get(&format!("_{key}")).filter(|v| !v.is_null());
    let suffix = &key[spec.base.len()..];

    match type_for_suffix(spec.allowed, suffix) {
        Some(type_code) => Ok(Some(Decoded::Variant {
            type_code: type_code.to_string(),
            key: key.to_string(),
            value,
            meta,
        })),
        None if mode == DecodeMode::Lenient => {
            warn!(path = spec.path, key, "Keeping unrecognized choice variant");
            Ok(Some(Decoded::Unrecognized {
                key: key.to_string(),
                value,
                meta,
            }))
        }
        None => Err(Error::UnknownVariant {
            path: spec.path.to_string(),
            key: key.to_string(),
        }),
    }
}

/// Wire entry for a choice value: `("value" , "dateTime", v)` -> `("valueDateTime", v)`
pub fn encode(base: &str, type_code: &str, value: Value) -> (String, Value) {
    (choice_key(base, type_code), value)
}

/// Write a choice value and its primitive metadata into `target`
pub fn encode_into(
    target: &mut Map<String, Value>,
    base: &str,
    type_code: &str,
    value: Option<Value>,
    meta: Option<Value>,
) {
    let key = choice_key(base, type_code);
    if let Some(meta) = meta {
        target.insert(format!("_{key}"), meta);
    }
    if let Some(value) = value {
        target.insert(key, value);
    }
}

/// Wire key of a variant
pub fn choice_key(base: &str, type_code: &str) -> String {
    format!("{}{}", base, capitalize_first(type_code))
}

/// Declared type for a wire suffix
pub fn suffix_type<'a>(allowed: &'a [&'a str], suffix: &str) -> Option<&'a str> {
    type_for_suffix(allowed, suffix)
}

/// A tagged union over the permitted types of one choice field
pub trait ChoiceType: Sized {
    /// Element path of the field (`Extension.value[x]`)
    const PATH: &'static str;
    /// Base name (`value`)
    const BASE: &'static str;
    /// Permitted type codes in declaration order
    const TYPES: &'static [&'static str];
    /// Whether undeclared variants are kept instead of rejected
    const ACCEPTS_UNRECOGNIZED: bool = false;

    /// Type code of the active variant
    fn type_code(&self) -> &str;

    /// Build the variant for `type_code` from its JSON value
    fn from_variant(type_code: &str, value: Value) -> serde_json::Result<Self>;

    /// Keep an undeclared variant; `None` when the type has no fallback
    fn from_unrecognized(_key: &str, _value: Value) -> Option<Self> {
        None
    }

    fn to_value(&self) -> serde_json::Result<Value>;

    fn wire_key(&self) -> String {
        choice_key(Self::BASE, self.type_code())
    }
}

/// Decode a typed choice from the entries of one JSON object.
///
/// Primitive metadata (`_valueString`) is not represented on typed records; a
/// variant carried only by metadata reads as absent.
pub fn decode_typed<T: ChoiceType>(source: &Map<String, Value>, required: bool) -> Result<Option<T>> {
    let spec = ChoiceSpec {
        path: T::PATH,
        base: T::BASE,
        allowed: T::TYPES,
        required,
        reserved: &[],
    };
    let mode = if T::ACCEPTS_UNRECOGNIZED {
        DecodeMode::Lenient
    } else {
        DecodeMode::Strict
    };

    let decoded = match decode(&spec, source, mode)? {
        Some(decoded) => decoded,
        None => return Ok(None),
    };
    let choice = match decoded {
        Decoded::Variant {
            type_code,
            value: Some(value),
            ..
        } => Some(T::from_variant(&type_code, value.clone()).map_err(|e| Error::Malformed {
            type_name: T::PATH.to_string(),
            message: e.to_string(),
        })?),
        Decoded::Unrecognized {
            key,
            value: Some(value),
            ..
        } => T::from_unrecognized(&key, value.clone()),
        _ => None,
    };

    match choice {
        None if required => Err(Error::RequiredFieldMissing {
            path: T::PATH.to_string(),
        }),
        choice => Ok(choice),
    }
}

/// Declare a choice enum and its [`ChoiceType`] implementation.
///
/// ```
/// use fhirtypes_models::choice::ChoiceType;
/// use fhirtypes_models::{choice_type, Period};
///
/// choice_type! {
///     /// When something happened
///     pub enum Occurrence("Event.occurrence[x]", "occurrence") {
///         DateTime(String) = "dateTime",
///         Period(Period) = "Period",
///     }
/// }
///
/// let v = Occurrence::DateTime("2024-01-01".into());
/// assert_eq!(v.wire_key(), "occurrenceDateTime");
/// ```
///
/// Adding `with Unrecognized` before the variant list adds an
/// `Unrecognized { key, value }` variant that keeps undeclared types.
#[macro_export]
macro_rules! choice_type {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident ($path:literal, $base:literal) {
            $( $(#[$vmeta:meta])* $variant:ident($payload:ty) = $code:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        $vis enum $name {
            $( $(#[$vmeta])* $variant($payload), )+
        }

        impl $crate::choice::ChoiceType for $name {
            const PATH: &'static str = $path;
            const BASE: &'static str = $base;
            const TYPES: &'static [&'static str] = &[$($code),+];

            fn type_code(&self) -> &str {
                match self {
                    $( Self::$variant(_) => $code, )+
                }
            }

            fn from_variant(
                type_code: &str,
                value: $crate::__private::serde_json::Value,
            ) -> $crate::__private::serde_json::Result<Self> {
                match type_code {
                    $( $code => $crate::__private::serde_json::from_value(value).map(Self::$variant), )+
                    other => Err(<$crate::__private::serde_json::Error as $crate::__private::serde::de::Error>::custom(
                        format!("type '{}' is not allowed for {}", other, $path),
                    )),
                }
            }

            fn to_value(&self) -> $crate::__private::serde_json::Result<$crate::__private::serde_json::Value> {
                match self {
                    $( Self::$variant(v) => $crate::__private::serde_json::to_value(v), )+
                }
            }
        }
    };
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident ($path:literal, $base:literal) with Unrecognized {
            $( $(#[$vmeta:meta])* $variant:ident($payload:ty) = $code:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        $vis enum $name {
            $( $(#[$vmeta])* $variant($payload), )+
            /// Variant outside the declared types, kept verbatim
            Unrecognized {
                /// Wire key (e.g. `valueFooBar`)
                key: String,
                value: $crate::__private::serde_json::Value,
            },
        }

        impl $crate::choice::ChoiceType for $name {
            const PATH: &'static str = $path;
            const BASE: &'static str = $base;
            const TYPES: &'static [&'static str] = &[$($code),+];
            const ACCEPTS_UNRECOGNIZED: bool = true;

            fn type_code(&self) -> &str {
                match self {
                    $( Self::$variant(_) => $code, )+
                    Self::Unrecognized { key, .. } => key.strip_prefix($base).unwrap_or(key),
                }
            }

            fn from_variant(
                type_code: &str,
                value: $crate::__private::serde_json::Value,
            ) -> $crate::__private::serde_json::Result<Self> {
                match type_code {
                    $( $code => $crate::__private::serde_json::from_value(value).map(Self::$variant), )+
                    other => Err(<$crate::__private::serde_json::Error as $crate::__private::serde::de::Error>::custom(
                        format!("type '{}' is not allowed for {}", other, $path),
                    )),
                }
            }

            fn from_unrecognized(key: &str, value: $crate::__private::serde_json::Value) -> Option<Self> {
                Some(Self::Unrecognized {
                    key: key.to_string(),
                    value,
                })
            }

            fn to_value(&self) -> $crate::__private::serde_json::Result<$crate::__private::serde_json::Value> {
                match self {
                    $( Self::$variant(v) => $crate::__private::serde_json::to_value(v), )+
                    Self::Unrecognized { value, .. } => Ok(value.clone()),
                }
            }

            fn wire_key(&self) -> String {
                match self {
                    Self::Unrecognized { key, .. } => key.clone(),
                    other => $crate::choice::choice_key($base, other.type_code()),
                }
            }
        }
    };
}

/// Optional choice field of a typed record, used with `#[serde(flatten)]`
#[derive(Debug, Clone, PartialEq)]
pub struct ChoiceField<T>(pub Option<T>);

impl<T> ChoiceField<T> {
    pub fn new(value: T) -> Self {
        Self(Some(value))
    }

    pub fn none() -> Self {
        Self(None)
    }

    pub fn get(&self) -> Option<&T> {
        self.0.as_ref()
    }

    pub fn is_none(&self) -> bool {
        self.0.is_none()
    }

    pub fn is_some(&self) -> bool {
        self.0.is_some()
    }

    /// Replace the populated variant, returning the previous one
    pub fn set(&mut self, value: T) -> Option<T> {
        self.0.replace(value)
    }

    pub fn take(&mut self) -> Option<T> {
        self.0.take()
    }

    pub fn into_inner(self) -> Option<T> {
        self.0
    }
}

impl<T> Default for ChoiceField<T> {
    fn default() -> Self {
        Self(None)
    }
}

impl<T> From<T> for ChoiceField<T> {
    fn from(value: T) -> Self {
        Self(Some(value))
    }
}

impl<T: ChoiceType> Serialize for ChoiceField<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serialize_choice(self.0.as_ref(), serializer)
    }
}

impl<'de, T: ChoiceType> Deserialize<'de> for ChoiceField<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer
            .deserialize_map(ChoiceVisitor::<T>::new(false))
            .map(ChoiceField)
    }
}

/// Choice field with minimum cardinality 1, used with `#[serde(flatten)]`
#[derive(Debug, Clone, PartialEq)]
pub struct RequiredChoice<T>(pub T);

impl<T> RequiredChoice<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for RequiredChoice<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> DerefMut for RequiredChoice<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

impl<T> From<T> for RequiredChoice<T> {
    fn from(value: T) -> Self {
        Self(value)
    }
}

impl<T: ChoiceType> Serialize for RequiredChoice<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serialize_choice(Some(&self.0), serializer)
    }
}

impl<'de, T: ChoiceType> Deserialize<'de> for RequiredChoice<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match deserializer.deserialize_map(ChoiceVisitor::<T>::new(true))? {
            Some(value) => Ok(RequiredChoice(value)),
            None => Err(de::Error::custom(Error::RequiredFieldMissing {
                path: T::PATH.to_string(),
            })),
        }
    }
}

fn serialize_choice<T: ChoiceType, S: Serializer>(
    choice: Option<&T>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(None)?;
    if let Some(choice) = choice {
        let value = choice.to_value().map_err(ser::Error::custom)?;
        map.serialize_entry(&choice.wire_key(), &value)?;
    }
    map.end()
}

struct ChoiceVisitor<T> {
    required: bool,
    marker: PhantomData<T>,
}

impl<T> ChoiceVisitor<T> {
    fn new(required: bool) -> Self {
        Self {
            required,
            marker: PhantomData,
        }
    }
}

impl<'de, T: ChoiceType> Visitor<'de> for ChoiceVisitor<T> {
    type Value = Option<T>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "a map holding {}", T::PATH)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Self::Value, A::Error> {
        let mut entries = Map::new();
        while let Some(key) = access.next_key::<String>()? {
            if is_variant_key(T::BASE, &key) {
                let value: Value = access.next_value()?;
                entries.insert(key, value);
            } else {
                access.next_value::<IgnoredAny>()?;
            }
        }
        decode_typed::<T>(&entries, self.required).map_err(de::Error::custom)
    }
}
