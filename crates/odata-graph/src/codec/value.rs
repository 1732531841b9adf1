//! Primitive value encoding/decoding against declared property types.
//!
//! Doubles that JSON cannot represent are written as the strings `"NaN"`,
//! `"INF"` and `"-INF"`. Guids are strings in hyphenated form. `Edm.Int64`
//! also accepts a decimal string on input.

use uuid::Uuid;

use crate::codec::json::JsonWriter;
use crate::model::{PrimitiveKind, PropertyType, StructuralProperty, Value};

// =============================================================================
// ENCODING
// =============================================================================

/// Writes a value as a JSON token (or array of tokens).
pub fn encode_value(out: &mut JsonWriter, value: &Value) -> Result<(), serde_json::Error> {
    match value {
        Value::Null => out.write_null(),
        Value::Bool(b) => out.write_bool(*b),
        Value::Int32(v) => out.write_i64(i64::from(*v))?,
        Value::Int64(v) => out.write_i64(*v)?,
        Value::Double(v) => encode_double(out, *v)?,
        Value::String(s) => out.write_string(s)?,
        Value::Guid(g) => out.write_string(&g.hyphenated().to_string())?,
        Value::Collection(items) => {
            out.begin_array();
            for item in items {
                encode_value(out, item)?;
            }
            out.end_array();
        }
    }
    Ok(())
}

fn encode_double(out: &mut JsonWriter, v: f64) -> Result<(), serde_json::Error> {
    if v.is_nan() {
        out.write_string("NaN")
    } else if v.is_infinite() {
        out.write_string(if v > 0.0 { "INF" } else { "-INF" })
    } else {
        out.write_f64(v)
    }
}

/// Returns true if `value` may be stored in the primitive `property`.
pub fn value_fits(property: &StructuralProperty, value: &Value) -> bool {
    let Some(kind) = property.primitive_kind() else {
        return false;
    };
    match value {
        Value::Null => property.nullable,
        Value::Collection(items) => property.is_collection && items.iter().all(|i| i.fits(kind)),
        scalar => !property.is_collection && scalar.fits(kind),
    }
}

/// Declared type of a property as written in error messages.
pub fn declared_type_name(property: &StructuralProperty) -> String {
    let name = match &property.ty {
        PropertyType::Primitive(kind) => kind.name(),
        PropertyType::Complex(name) => name.as_str(),
    };
    if property.is_collection {
        format!("Collection({name})")
    } else {
        name.to_string()
    }
}

// =============================================================================
// DECODING
// =============================================================================

/// Converts a JSON value to the declared type of a primitive property.
///
/// Returns `None` when the value does not fit.
pub fn decode_property(json: &serde_json::Value, property: &StructuralProperty) -> Option<Value> {
    let kind = property.primitive_kind()?;
    match json {
        serde_json::Value::Null => property.nullable.then_some(Value::Null),
        serde_json::Value::Array(items) if property.is_collection => items
            .iter()
            .map(|item| decode_scalar(item, kind))
            .collect::<Option<Vec<_>>>()
            .map(Value::Collection),
        _ if property.is_collection => None,
        scalar => decode_scalar(scalar, kind),
    }
}

/// Converts a scalar JSON value to `kind`.
pub fn decode_scalar(json: &serde_json::Value, kind: PrimitiveKind) -> Option<Value> {
    match kind {
        PrimitiveKind::String => json.as_str().map(Value::from),
        PrimitiveKind::Boolean => json.as_bool().map(Value::Bool),
        PrimitiveKind::Int32 => json
            .as_i64()
            .and_then(|v| i32::try_from(v).ok())
            .map(Value::Int32),
        PrimitiveKind::Int64 => json
            .as_i64()
            .or_else(|| json.as_str()?.parse().ok())
            .map(Value::Int64),
        PrimitiveKind::Double => match json {
            serde_json::Value::Number(n) => n.as_f64().map(Value::Double),
            serde_json::Value::String(s) => match s.as_str() {
                "NaN" => Some(Value::Double(f64::NAN)),
                "INF" => Some(Value::Double(f64::INFINITY)),
                "-INF" => Some(Value::Double(f64::NEG_INFINITY)),
                _ => None,
            },
            _ => None,
        },
        PrimitiveKind::Guid => json
            .as_str()
            .and_then(|s| Uuid::parse_str(s).ok())
            .map(Value::Guid),
    }
}

/// Short name of a JSON value's type, for error messages.
pub fn json_kind(json: &serde_json::Value) -> &'static str {
    match json {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
