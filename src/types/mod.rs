// Module for row values, row access and row decoding
pub mod value;
pub mod row;
pub mod decoder;

pub use value::{CqlValue, ColumnType, ColumnSpec};
pub use row::{RowObject, RowReader, RawRow};
pub use decoder::{RowDecoder, DynamicRowDecoder, SchemaRowDecoder, decoder_for};
