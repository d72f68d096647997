use serde_json::Value;

use super::row::{RowObject, RowReader};
use super::value::CqlValue;
use crate::{CqlBridgeError, Result};

/// Turns one driver row into a row object.
pub trait RowDecoder: Send + Sync {
    fn decode(&self, row: &dyn RowReader) -> Result<RowObject>;
}

/// Introspects each value's runtime type. Used when the result shape is not
/// known ahead of time.
#[derive(Debug, Default, Clone, Copy)]
pub struct DynamicRowDecoder;

/// Coerces each value to the column's declared type. Columns without a
/// declared type are read dynamically.
#[derive(Debug, Default, Clone, Copy)]
pub struct SchemaRowDecoder;

/// Pick the decoder for a result whose column types may or may not be known.
pub fn decoder_for(unknown_shape: bool) -> &'static dyn RowDecoder {
    if unknown_shape {
        &DynamicRowDecoder
    } else {
        &SchemaRowDecoder
    }
}

fn column_name(row: &dyn RowReader, idx: usize) -> Result<&str> {
    row.column_name(idx)
        .ok_or_else(|| CqlBridgeError::Decode(format!("column {idx} has no name")))
}

impl RowDecoder for DynamicRowDecoder {
    fn decode(&self, row: &dyn RowReader) -> Result<RowObject> {
        let mut object = RowObject::new();
        for idx in 0..row.column_count() {
            let name = column_name(row, idx)?;
            let value = row.value(idx).map(CqlValue::to_json).unwrap_or(Value::Null);
            object.insert(name.to_string(), value);
        }
        Ok(object)
    }
}

impl RowDecoder for SchemaRowDecoder {
    fn decode(&self, row: &dyn RowReader) -> Result<RowObject> {
        let mut object = RowObject::new();
        for idx in 0..row.column_count() {
            let name = column_name(row, idx)?;
            let value = match (row.value(idx), row.declared_type(idx)) {
                (None, _) => Value::Null,
                (Some(value), None) => value.to_json(),
                (Some(value), Some(ty)) => value
                    .coerce(ty)
                    .map_err(|e| CqlBridgeError::Decode(format!("column '{name}': {e}")))?
                    .to_json(),
            };
            object.insert(name.to_string(), value);
        }
        Ok(object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ColumnSpec, ColumnType, RawRow};
    use serde_json::json;
    use std::sync::Arc;

    fn sample_row() -> RawRow {
        let columns: Arc<[ColumnSpec]> = vec![
            ColumnSpec::new("id", Some(ColumnType::BigInt)),
            ColumnSpec::new("active", Some(ColumnType::Boolean)),
            ColumnSpec::new("owner", Some(ColumnType::Uuid)),
            ColumnSpec::new("note", None),
        ]
        .into();
        RawRow::new(
            columns,
            vec![
                CqlValue::BigInt(7),
                CqlValue::BigInt(1),
                CqlValue::Text("67e55044-10b1-426f-9247-bb680e5fe0c8".into()),
                CqlValue::Text("hi".into()),
            ],
        )
    }

    #[test]
    fn test_dynamic_decoder_keeps_storage_values() {
        let object = decoder_for(true).decode(&sample_row()).unwrap();
        assert_eq!(
            Value::Object(object),
            json!({
                "id": 7,
                "active": 1,
                "owner": "67e55044-10b1-426f-9247-bb680e5fe0c8",
                "note": "hi"
            })
        );
    }

    #[test]
    fn test_schema_decoder_applies_declared_types() {
        let object = decoder_for(false).decode(&sample_row()).unwrap();
        assert_eq!(object["active"], json!(true));
        assert_eq!(object["id"], json!(7));
    }

    #[test]
    fn test_column_order_is_preserved() {
        let object = DynamicRowDecoder.decode(&sample_row()).unwrap();
        let keys: Vec<&str> = object.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["id", "active", "owner", "note"]);
    }

    #[test]
    fn test_schema_decoder_names_failing_column() {
        let columns: Arc<[ColumnSpec]> = vec![ColumnSpec::new("flag", Some(ColumnType::Boolean))].into();
        let row = RawRow::new(columns, vec![CqlValue::BigInt(9)]);
        let err = SchemaRowDecoder.decode(&row).unwrap_err();
        assert!(matches!(err, CqlBridgeError::Decode(msg) if msg.contains("'flag'")));
    }
}
