//! Typed value conversion
//!
//! Converts `(raw value, declared type)` pairs from the wire into runtime
//! values. The engine recognizes a closed set of type tags; anything else is
//! rejected with `Unsupported value type '<tag>'`. Values without a declared
//! type pass through unconverted, keeping whatever representation the JSON
//! decoder produced (integral numbers stay integral). That looser behavior is
//! part of the wire contract.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ParamError;

/// Engine wire date format: `2013-01-23T14:42:45.000+0200`.
pub const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%z";

/// Closed set of declarable value types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTag {
    String,
    Integer,
    Short,
    Long,
    Double,
    Boolean,
    Date,
    Bytes,
    Object,
}

impl TypeTag {
    pub fn parse(tag: &str) -> Result<Self, ParamError> {
        match tag {
            "String" => Ok(Self::String),
            "Integer" => Ok(Self::Integer),
            "Short" => Ok(Self::Short),
            "Long" => Ok(Self::Long),
            "Double" => Ok(Self::Double),
            "Boolean" => Ok(Self::Boolean),
            "Date" => Ok(Self::Date),
            "Bytes" => Ok(Self::Bytes),
            "Object" => Ok(Self::Object),
            other => Err(ParamError::new(format!(
                "Unsupported value type '{other}'"
            ))),
        }
    }

    /// Wire name as declared in a `type` field.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "String",
            Self::Integer => "Integer",
            Self::Short => "Short",
            Self::Long => "Long",
            Self::Double => "Double",
            Self::Boolean => "Boolean",
            Self::Date => "Date",
            Self::Bytes => "Bytes",
            Self::Object => "Object",
        }
    }

    /// Lowercased name used in conversion error messages.
    pub fn error_name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Short => "short",
            Self::Long => "long",
            Self::Double => "double",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Bytes => "bytes",
            Self::Object => "object",
        }
    }
}

/// Serialized-object metadata carried in `valueInfo`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_type_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serialization_data_format: Option<String>,
}

/// An object value in one of its two sub-forms. The serialized payload is
/// carried through untouched; this layer never inspects its structure.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectValue {
    pub object_type_name: Option<String>,
    pub serialization_format: Option<String>,
    pub repr: ObjectRepr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectRepr {
    /// Opaque pre-serialized representation plus format metadata.
    Serialized(String),
    /// Deserialized object graph as received on the wire.
    Deserialized(Value),
}

/// A converted runtime value together with its type tag.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Null,
    String(String),
    Integer(i32),
    Short(i16),
    Long(i64),
    Double(f64),
    Boolean(bool),
    Date(DateTime<FixedOffset>),
    Bytes(Vec<u8>),
    Object(ObjectValue),
    /// No type declared: the wire value passes through unconverted.
    Untyped(Value),
}

impl TypedValue {
    /// Convert a raw wire value under an optional declared type tag.
    ///
    /// A `null` raw value with a declared type stays a typed null. Conversion
    /// failures use the fixed template `"<raw>" is not a valid <type> value`
    /// which callers surface verbatim, optionally behind an operation context.
    pub fn convert(
        raw: &Value,
        tag: Option<&str>,
        value_info: Option<&ValueInfo>,
    ) -> Result<Self, ParamError> {
        let Some(tag) = tag else {
            return Ok(match raw {
                Value::Null => Self::Null,
                other => Self::Untyped(other.clone()),
            });
        };
        let tag = TypeTag::parse(tag)?;
        if raw.is_null() {
            return Ok(Self::Null);
        }
        match tag {
            TypeTag::String => match raw {
                Value::String(s) => Ok(Self::String(s.clone())),
                other => Ok(Self::String(raw_text(other))),
            },
            TypeTag::Integer => match raw {
                Value::String(s) => s
                    .parse::<i32>()
                    .map(Self::Integer)
                    .map_err(|_| conversion_error(raw, tag)),
                Value::Number(n) => n
                    .as_i64()
                    .and_then(|v| i32::try_from(v).ok())
                    .map(Self::Integer)
                    .ok_or_else(|| conversion_error(raw, tag)),
                _ => Err(conversion_error(raw, tag)),
            },
            TypeTag::Short => match raw {
                Value::String(s) => s
                    .parse::<i16>()
                    .map(Self::Short)
                    .map_err(|_| conversion_error(raw, tag)),
                Value::Number(n) => n
                    .as_i64()
                    .and_then(|v| i16::try_from(v).ok())
                    .map(Self::Short)
                    .ok_or_else(|| conversion_error(raw, tag)),
                _ => Err(conversion_error(raw, tag)),
            },
            TypeTag::Long => match raw {
                Value::String(s) => s
                    .parse::<i64>()
                    .map(Self::Long)
                    .map_err(|_| conversion_error(raw, tag)),
                Value::Number(n) => n
                    .as_i64()
                    .map(Self::Long)
                    .ok_or_else(|| conversion_error(raw, tag)),
                _ => Err(conversion_error(raw, tag)),
            },
            TypeTag::Double => match raw {
                Value::String(s) => s
                    .parse::<f64>()
                    .map(Self::Double)
                    .map_err(|_| conversion_error(raw, tag)),
                Value::Number(n) => n
                    .as_f64()
                    .map(Self::Double)
                    .ok_or_else(|| conversion_error(raw, tag)),
                _ => Err(conversion_error(raw, tag)),
            },
            TypeTag::Boolean => match raw {
                Value::Bool(b) => Ok(Self::Boolean(*b)),
                Value::String(s) if s == "true" => Ok(Self::Boolean(true)),
                Value::String(s) if s == "false" => Ok(Self::Boolean(false)),
                _ => Err(conversion_error(raw, tag)),
            },
            TypeTag::Date => match raw {
                Value::String(s) => DateTime::parse_from_str(s, DATE_FORMAT)
                    .map(Self::Date)
                    .map_err(|_| conversion_error(raw, tag)),
                _ => Err(conversion_error(raw, tag)),
            },
            TypeTag::Bytes => match raw {
                Value::String(s) => BASE64
                    .decode(s)
                    .map(Self::Bytes)
                    .map_err(|_| conversion_error(raw, tag)),
                _ => Err(conversion_error(raw, tag)),
            },
            TypeTag::Object => Ok(Self::Object(object_value(raw, value_info))),
        }
    }

    /// Declared type tag of a converted value. Untyped passthrough values
    /// and nulls carry none.
    pub fn type_tag(&self) -> Option<TypeTag> {
        match self {
            Self::String(_) => Some(TypeTag::String),
            Self::Integer(_) => Some(TypeTag::Integer),
            Self::Short(_) => Some(TypeTag::Short),
            Self::Long(_) => Some(TypeTag::Long),
            Self::Double(_) => Some(TypeTag::Double),
            Self::Boolean(_) => Some(TypeTag::Boolean),
            Self::Date(_) => Some(TypeTag::Date),
            Self::Bytes(_) => Some(TypeTag::Bytes),
            Self::Object(_) => Some(TypeTag::Object),
            Self::Null | Self::Untyped(_) => None,
        }
    }

    /// Raw textual form, used by `like` predicates and error templates.
    pub fn as_text(&self) -> String {
        match self {
            Self::Null => "null".to_string(),
            Self::String(s) => s.clone(),
            Self::Integer(v) => v.to_string(),
            Self::Short(v) => v.to_string(),
            Self::Long(v) => v.to_string(),
            Self::Double(v) => v.to_string(),
            Self::Boolean(v) => v.to_string(),
            Self::Date(v) => v.format(DATE_FORMAT).to_string(),
            Self::Bytes(b) => BASE64.encode(b),
            Self::Object(o) => match &o.repr {
                ObjectRepr::Serialized(s) => s.clone(),
                ObjectRepr::Deserialized(v) => v.to_string(),
            },
            Self::Untyped(Value::String(s)) => s.clone(),
            Self::Untyped(v) => v.to_string(),
        }
    }

    /// Wire representation of the value, used when re-encoding criteria.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::String(s) => Value::String(s.clone()),
            Self::Integer(v) => Value::from(*v),
            Self::Short(v) => Value::from(*v),
            Self::Long(v) => Value::from(*v),
            Self::Double(v) => Value::from(*v),
            Self::Boolean(v) => Value::from(*v),
            Self::Date(v) => Value::String(v.format(DATE_FORMAT).to_string()),
            Self::Bytes(b) => Value::String(BASE64.encode(b)),
            Self::Object(o) => match &o.repr {
                ObjectRepr::Serialized(s) => Value::String(s.clone()),
                ObjectRepr::Deserialized(v) => v.clone(),
            },
            Self::Untyped(v) => v.clone(),
        }
    }
}

fn object_value(raw: &Value, value_info: Option<&ValueInfo>) -> ObjectValue {
    let info = value_info.cloned().unwrap_or_default();
    // A string payload accompanied by a serialization format is the
    // pre-serialized sub-form; everything else is a deserialized graph.
    let repr = match raw {
        Value::String(s) if info.serialization_data_format.is_some() => {
            ObjectRepr::Serialized(s.clone())
        }
        other => ObjectRepr::Deserialized(other.clone()),
    };
    ObjectValue {
        object_type_name: info.object_type_name,
        serialization_format: info.serialization_data_format,
        repr,
    }
}

fn conversion_error(raw: &Value, tag: TypeTag) -> ParamError {
    ParamError::new(format!(
        "\"{}\" is not a valid {} value",
        raw_text(raw),
        tag.error_name()
    ))
}

fn raw_text(raw: &Value) -> String {
    match raw {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Wire schema for typed variable payloads and correlation keys:
/// `{ value, type?, valueInfo? }`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableValueDto {
    #[serde(default)]
    pub value: Value,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_info: Option<ValueInfo>,
}

impl VariableValueDto {
    pub fn into_typed_value(self) -> Result<TypedValue, ParamError> {
        TypedValue::convert(&self.value, self.value_type.as_deref(), self.value_info.as_ref())
    }
}

/// Convert a `{name: {value, type, valueInfo}}` wire map, preserving wire
/// order. The whole map converts or the whole request fails.
pub fn convert_value_map(
    map: serde_json::Map<String, Value>,
) -> Result<Vec<(String, TypedValue)>, ParamError> {
    map.into_iter()
        .map(|(name, raw)| {
            let dto: VariableValueDto = serde_json::from_value(raw)
                .map_err(|e| ParamError::new(e.to_string()))?;
            Ok((name, dto.into_typed_value()?))
        })
        .collect()
}
