use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde_json::{Number, Value};
use uuid::Uuid;

/// A single column value as handed over by a driver.
#[derive(Debug, Clone, PartialEq)]
pub enum CqlValue {
    Null,
    Boolean(bool),
    BigInt(i64),
    Double(f64),
    Text(String),
    Blob(Vec<u8>),
    Uuid(Uuid),
    /// Milliseconds since the Unix epoch, UTC.
    Timestamp(i64),
}

impl CqlValue {
    /// Name of the runtime type, used in conversion error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            CqlValue::Null => "null",
            CqlValue::Boolean(_) => "boolean",
            CqlValue::BigInt(_) => "bigint",
            CqlValue::Double(_) => "double",
            CqlValue::Text(_) => "text",
            CqlValue::Blob(_) => "blob",
            CqlValue::Uuid(_) => "uuid",
            CqlValue::Timestamp(_) => "timestamp",
        }
    }

    /// Convert to the JSON form used in row objects.
    pub fn to_json(&self) -> Value {
        match self {
            CqlValue::Null => Value::Null,
            CqlValue::Boolean(b) => Value::Bool(*b),
            CqlValue::BigInt(i) => Value::Number((*i).into()),
            // NaN and infinities have no JSON representation
            CqlValue::Double(f) => Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
            CqlValue::Text(s) => Value::String(s.clone()),
            CqlValue::Blob(b) => Value::String(format!("0x{}", hex::encode(b))),
            CqlValue::Uuid(u) => Value::String(u.hyphenated().to_string()),
            CqlValue::Timestamp(ms) => match DateTime::<Utc>::from_timestamp_millis(*ms) {
                Some(ts) => Value::String(ts.to_rfc3339_opts(SecondsFormat::Millis, true)),
                None => Value::Number((*ms).into()),
            },
        }
    }

    /// Coerce into the representation a declared column type calls for.
    pub fn coerce(&self, ty: ColumnType) -> Result<CqlValue, String> {
        let mismatch = || format!("cannot read {} value as {}", self.type_name(), ty.as_str());

        match (ty, self) {
            (_, CqlValue::Null) | (ColumnType::Unknown, _) => Ok(self.clone()),

            (ColumnType::BigInt, CqlValue::BigInt(_)) => Ok(self.clone()),
            (ColumnType::BigInt, CqlValue::Boolean(b)) => Ok(CqlValue::BigInt(i64::from(*b))),
            // 2^63 itself is out of range; `as` would saturate it to i64::MAX
            (ColumnType::BigInt, CqlValue::Double(f))
                if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64 =>
            {
                Ok(CqlValue::BigInt(*f as i64))
            }
            (ColumnType::BigInt, CqlValue::Text(s)) => s
                .trim()
                .parse::<i64>()
                .map(CqlValue::BigInt)
                .map_err(|_| format!("invalid integer literal '{s}'")),

            (ColumnType::Double, CqlValue::Double(_)) => Ok(self.clone()),
            (ColumnType::Double, CqlValue::BigInt(i)) => Ok(CqlValue::Double(*i as f64)),
            (ColumnType::Double, CqlValue::Text(s)) => s
                .trim()
                .parse::<f64>()
                .map(CqlValue::Double)
                .map_err(|_| format!("invalid numeric literal '{s}'")),

            (ColumnType::Text, CqlValue::Text(_)) => Ok(self.clone()),
            (ColumnType::Text, CqlValue::Blob(b)) => String::from_utf8(b.clone())
                .map(CqlValue::Text)
                .map_err(|_| "blob is not valid UTF-8 text".to_string()),
            (ColumnType::Text, other) => match other.to_json() {
                Value::String(s) => Ok(CqlValue::Text(s)),
                v => Ok(CqlValue::Text(v.to_string())),
            },

            (ColumnType::Boolean, CqlValue::Boolean(_)) => Ok(self.clone()),
            (ColumnType::Boolean, CqlValue::BigInt(0)) => Ok(CqlValue::Boolean(false)),
            (ColumnType::Boolean, CqlValue::BigInt(1)) => Ok(CqlValue::Boolean(true)),
            (ColumnType::Boolean, CqlValue::Text(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "t" | "1" => Ok(CqlValue::Boolean(true)),
                "false" | "f" | "0" => Ok(CqlValue::Boolean(false)),
                _ => Err(format!("invalid boolean literal '{s}'")),
            },

            (ColumnType::Uuid, CqlValue::Uuid(_)) => Ok(self.clone()),
            (ColumnType::Uuid, CqlValue::Text(s)) => Uuid::parse_str(s.trim())
                .map(CqlValue::Uuid)
                .map_err(|e| format!("invalid uuid '{s}': {e}")),
            (ColumnType::Uuid, CqlValue::Blob(b)) => Uuid::from_slice(b)
                .map(CqlValue::Uuid)
                .map_err(|e| format!("invalid uuid bytes: {e}")),

            (ColumnType::Timestamp, CqlValue::Timestamp(_)) => Ok(self.clone()),
            (ColumnType::Timestamp, CqlValue::BigInt(ms)) => Ok(CqlValue::Timestamp(*ms)),
            (ColumnType::Timestamp, CqlValue::Text(s)) => parse_timestamp(s)
                .map(CqlValue::Timestamp)
                .ok_or_else(|| format!("invalid timestamp literal '{s}'")),

            (ColumnType::Blob, CqlValue::Blob(_)) => Ok(self.clone()),
            (ColumnType::Blob, CqlValue::Text(s)) => Ok(CqlValue::Blob(s.as_bytes().to_vec())),

            _ => Err(mismatch()),
        }
    }
}

/// Accepts RFC 3339 and the `YYYY-MM-DD HH:MM:SS[.fff]` form SQLite writes.
fn parse_timestamp(s: &str) -> Option<i64> {
    let s = s.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.timestamp_millis());
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc().timestamp_millis())
}

/// Declared column type, as far as row decoding cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Boolean,
    BigInt,
    Double,
    Text,
    Blob,
    Uuid,
    Timestamp,
    Unknown,
}

impl ColumnType {
    /// Map a declared type name (`varchar(20)`, `TIMEUUID`, ...) to a column type.
    pub fn from_declared(decl: &str) -> Self {
        let base = decl
            .split('(')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match base.as_str() {
            "int" | "integer" | "bigint" | "smallint" | "tinyint" | "varint" | "counter" => {
                ColumnType::BigInt
            }
            "float" | "double" | "decimal" | "real" => ColumnType::Double,
            "text" | "varchar" | "ascii" => ColumnType::Text,
            "blob" => ColumnType::Blob,
            "boolean" | "bool" => ColumnType::Boolean,
            "uuid" | "timeuuid" => ColumnType::Uuid,
            "timestamp" | "date" => ColumnType::Timestamp,
            _ => ColumnType::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Boolean => "boolean",
            ColumnType::BigInt => "bigint",
            ColumnType::Double => "double",
            ColumnType::Text => "text",
            ColumnType::Blob => "blob",
            ColumnType::Uuid => "uuid",
            ColumnType::Timestamp => "timestamp",
            ColumnType::Unknown => "unknown",
        }
    }
}

/// Name and declared type of one result column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub declared_type: Option<ColumnType>,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, declared_type: Option<ColumnType>) -> Self {
        Self {
            name: name.into(),
            declared_type,
        }
    }

    /// Column spec from a driver-reported declared type name.
    pub fn declared(name: impl Into<String>, decl: Option<&str>) -> Self {
        Self::new(name, decl.map(ColumnType::from_declared))
    }
}
