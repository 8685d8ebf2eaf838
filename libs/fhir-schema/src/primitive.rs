//! FHIR R4 primitive types
//!
//! Each primitive has a JSON representation (boolean, number or string) and a
//! lexical form. The regular expressions are the ones published with the R4
//! primitive type definitions; calendar validity of dates is checked with
//! chrono on top of the regex.

use chrono::{DateTime, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde_json::{Number, Value};
use std::fmt;
use std::str::FromStr;

/// JSON representation of a primitive value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonKind {
    Boolean,
    Integer,
    Decimal,
    String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Base64Binary,
    Boolean,
    Canonical,
    Code,
    Date,
    DateTime,
    Decimal,
    Id,
    Instant,
    Integer,
    Markdown,
    Oid,
    PositiveInt,
    String,
    Time,
    UnsignedInt,
    Uri,
    Url,
    Uuid,
    Xhtml,
}

macro_rules! regex {
    ($name:ident, $pattern:expr) => {
        static $name: Lazy<Regex> =
            Lazy::new(|| Regex::new($pattern).expect("primitive pattern is valid"));
    };
}

const YEAR: &str = r"([0-9]([0-9]([0-9][1-9]|[1-9]0)|[1-9]00)|[1-9]000)";
const TIME: &str = r"([01][0-9]|2[0-3]):[0-5][0-9]:([0-5][0-9]|60)(\.[0-9]+)?";
const ZONE: &str = r"(Z|(\+|-)((0[0-9]|1[0-3]):[0-5][0-9]|14:00))";

static DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^{YEAR}(-(0[1-9]|1[0-2])(-(0[1-9]|[1-2][0-9]|3[0-1]))?)?$"
    ))
    .expect("primitive pattern is valid")
});
static DATE_TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^{YEAR}(-(0[1-9]|1[0-2])(-(0[1-9]|[1-2][0-9]|3[0-1])(T{TIME}{ZONE})?)?)?$"
    ))
    .expect("primitive pattern is valid")
});
static INSTANT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^{YEAR}-(0[1-9]|1[0-2])-(0[1-9]|[1-2][0-9]|3[0-1])T{TIME}{ZONE}$"
    ))
    .expect("primitive pattern is valid")
});
static TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!("^{TIME}$")).expect("primitive pattern is valid"));

regex!(CODE_RE, r"^[^\s]+( [^\s]+)*$");
regex!(ID_RE, r"^[A-Za-z0-9\-\.]{1,64}$");
regex!(OID_RE, r"^urn:oid:[0-2](\.(0|[1-9][0-9]*))+$");
regex!(URI_RE, r"^\S*$");
regex!(BASE64_RE, r"^(\s*([0-9a-zA-Z\+/=]){4}\s*)+$");
regex!(DECIMAL_RE, r"^-?(0|[1-9][0-9]*)(\.[0-9]+)?([eE][+-]?[0-9]+)?$");
regex!(INTEGER_RE, r"^-?([0]|([1-9][0-9]*))$");

impl PrimitiveType {
    pub const ALL: [PrimitiveType; 20] = [
        PrimitiveType::Base64Binary,
        PrimitiveType::Boolean,
        PrimitiveType::Canonical,
        PrimitiveType::Code,
        PrimitiveType::Date,
        PrimitiveType::DateTime,
        PrimitiveType::Decimal,
        PrimitiveType::Id,
        PrimitiveType::Instant,
        PrimitiveType::Integer,
        PrimitiveType::Markdown,
        PrimitiveType::Oid,
        PrimitiveType::PositiveInt,
        PrimitiveType::String,
        PrimitiveType::Time,
        PrimitiveType::UnsignedInt,
        PrimitiveType::Uri,
        PrimitiveType::Url,
        PrimitiveType::Uuid,
        PrimitiveType::Xhtml,
    ];

    /// Look up a primitive by its FHIR type code.
    ///
    /// FHIRPath system types (`http://hl7.org/fhirpath/System.String`) used in
    /// R4 snapshots for `id`/`url`-like elements are accepted as well.
    pub fn from_code(code: &str) -> Option<Self> {
        let code = code
            .strip_prefix("http://hl7.org/fhirpath/")
            .unwrap_or(code);
        let primitive = match code {
            "base64Binary" => Self::Base64Binary,
            "boolean" | "System.Boolean" => Self::Boolean,
            "canonical" => Self::Canonical,
            "code" => Self::Code,
            "date" | "System.Date" => Self::Date,
            "dateTime" | "System.DateTime" => Self::DateTime,
            "decimal" | "System.Decimal" => Self::Decimal,
            "id" => Self::Id,
            "instant" => Self::Instant,
            "integer" | "System.Integer" => Self::Integer,
            "markdown" => Self::Markdown,
            "oid" => Self::Oid,
            "positiveInt" => Self::PositiveInt,
            "string" | "System.String" => Self::String,
            "time" | "System.Time" => Self::Time,
            "unsignedInt" => Self::UnsignedInt,
            "uri" => Self::Uri,
            "url" => Self::Url,
            "uuid" => Self::Uuid,
            "xhtml" => Self::Xhtml,
            _ => return None,
        };
        Some(primitive)
    }

    pub fn is_primitive(code: &str) -> bool {
        Self::from_code(code).is_some()
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Base64Binary => "base64Binary",
            Self::Boolean => "boolean",
            Self::Canonical => "canonical",
            Self::Code => "code",
            Self::Date => "date",
            Self::DateTime => "dateTime",
            Self::Decimal => "decimal",
            Self::Id => "id",
            Self::Instant => "instant",
            Self::Integer => "integer",
            Self::Markdown => "markdown",
            Self::Oid => "oid",
            Self::PositiveInt => "positiveInt",
            Self::String => "string",
            Self::Time => "time",
            Self::UnsignedInt => "unsignedInt",
            Self::Uri => "uri",
            Self::Url => "url",
            Self::Uuid => "uuid",
            Self::Xhtml => "xhtml",
        }
    }

    pub fn json_kind(&self) -> JsonKind {
        match self {
            Self::Boolean => JsonKind::Boolean,
            Self::Integer | Self::PositiveInt | Self::UnsignedInt => JsonKind::Integer,
            Self::Decimal => JsonKind::Decimal,
            _ => JsonKind::String,
        }
    }

    /// Check a JSON value against this primitive's representation and lexical form.
    ///
    /// The error is a short human readable reason.
    pub fn check(&self, value: &Value) -> Result<(), String> {
        match self.json_kind() {
            JsonKind::Boolean => match value {
                Value::Bool(_) => Ok(()),
                other => Err(format!("expected a boolean, found {}", describe(other))),
            },
            JsonKind::Integer => {
                let n = value
                    .as_i64()
                    .ok_or_else(|| format!("expected an integer, found {}", describe(value)))?;
                self.check_integer_range(n)
            }
            JsonKind::Decimal => match value {
                Value::Number(n) => check_decimal(&n.to_string()),
                other => Err(format!("expected a decimal number, found {}", describe(other))),
            },
            JsonKind::String => {
                let s = value
                    .as_str()
                    .ok_or_else(|| format!("expected a string, found {}", describe(value)))?;
                self.check_lexical(s)
            }
        }
    }

    /// Check the lexical (string) form of a value, as found in XML `value` attributes.
    pub fn check_lexical(&self, s: &str) -> Result<(), String> {
        let ok = match self {
            Self::Boolean => s == "true" || s == "false",
            Self::Integer | Self::PositiveInt | Self::UnsignedInt => {
                if !INTEGER_RE.is_match(s) {
                    false
                } else {
                    let n: i64 = s.parse().map_err(|_| format!("integer out of range: {s}"))?;
                    return self.check_integer_range(n);
                }
            }
            Self::Decimal => return check_decimal(s),
            Self::String | Self::Markdown | Self::Xhtml => !s.trim().is_empty(),
            Self::Code => CODE_RE.is_match(s),
            Self::Id => ID_RE.is_match(s),
            Self::Oid => OID_RE.is_match(s),
            Self::Uri | Self::Url | Self::Canonical => !s.is_empty() && URI_RE.is_match(s),
            Self::Uuid => s
                .strip_prefix("urn:uuid:")
                .is_some_and(|rest| uuid::Uuid::parse_str(rest).is_ok()),
            Self::Base64Binary => BASE64_RE.is_match(s),
            Self::Date => DATE_RE.is_match(s) && calendar_date_is_valid(s),
            Self::DateTime => DATE_TIME_RE.is_match(s) && calendar_date_is_valid(s),
            Self::Instant => INSTANT_RE.is_match(s) && instant_is_valid(s),
            Self::Time => TIME_RE.is_match(s),
        };
        if ok {
            Ok(())
        } else {
            Err(format!("'{}' is not a valid {}", s, self.code()))
        }
    }

    /// Convert a lexical form into the JSON value this primitive uses.
    pub fn parse_lexical(&self, s: &str) -> Result<Value, String> {
        self.check_lexical(s)?;
        match self.json_kind() {
            JsonKind::Boolean => Ok(Value::Bool(s == "true")),
            JsonKind::Integer => s
                .parse::<i64>()
                .map(Value::from)
                .map_err(|e| e.to_string()),
            JsonKind::Decimal => serde_json::from_str::<Number>(s)
                .map(Value::Number)
                .map_err(|e| e.to_string()),
            JsonKind::String => Ok(Value::String(s.to_string())),
        }
    }

    fn check_integer_range(&self, n: i64) -> Result<(), String> {
        let min = match self {
            Self::PositiveInt => 1,
            Self::UnsignedInt => 0,
            _ => i32::MIN as i64,
        };
        if n < min || n > i32::MAX as i64 {
            Err(format!("{} is out of range for {}", n, self.code()))
        } else {
            Ok(())
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn check_decimal(s: &str) -> Result<(), String> {
    if !DECIMAL_RE.is_match(s) {
        return Err(format!("'{s}' is not a valid decimal"));
    }
    let parsed = if s.contains(['e', 'E']) {
        Decimal::from_scientific(s)
    } else {
        Decimal::from_str(s)
    };
    parsed
        .map(|_| ())
        .map_err(|_| format!("'{s}' is out of range for decimal"))
}

/// Reject dates the regex accepts but the calendar does not (2023-02-30)
fn calendar_date_is_valid(s: &str) -> bool {
    match s.get(..10) {
        Some(day) if s.len() >= 10 => NaiveDate::parse_from_str(day, "%Y-%m-%d").is_ok(),
        _ => true,
    }
}

fn instant_is_valid(s: &str) -> bool {
    // chrono has no leap second representation in RFC 3339 parsing
    if s.get(17..19) == Some("60") {
        return calendar_date_is_valid(s);
    }
    DateTime::parse_from_rfc3339(s).is_ok()
}
