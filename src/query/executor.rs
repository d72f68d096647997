use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::driver::{Connector, Session};
use crate::request::RequestConfig;
use crate::session::SessionRegistry;
use crate::types::{ColumnType, CqlValue, RawRow, RowObject, RowReader, decoder_for};
use crate::{CqlBridgeError, Result};

/// Affected-row count of a write.
pub const KEY_COUNT: &str = "count";
/// Record identifier echoed back on writes.
pub const KEY_ID: &str = "id";
/// Rows after the first when a multi-row result is read as a single row.
pub const KEY_RAW_LIST: &str = "@RAW@LIST";

/// Runs statements for ORM requests and normalizes what comes back.
///
/// Sessions come from the shared [`SessionRegistry`] unless the caller
/// passes one in. Nothing is retried here: connect, execution and decoding
/// failures all go straight back to the caller.
pub struct QueryExecutor<C: Connector> {
    registry: Arc<SessionRegistry<C>>,
}

impl<C: Connector> QueryExecutor<C> {
    pub fn new(registry: Arc<SessionRegistry<C>>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry<C>> {
        &self.registry
    }

    /// Route to the query path for read methods and the update path otherwise.
    pub fn execute<R: RequestConfig + ?Sized>(
        &self,
        config: &R,
        query: &str,
        unknown_shape: bool,
    ) -> Result<Option<RowObject>> {
        if config.is_query() {
            return self.exec_query(config, query, unknown_shape).map(Some);
        }
        self.execute_update(None, config, query)
    }

    /// Run a write and report `{count, id?}` from its summary row.
    ///
    /// `Ok(None)` when the driver returned no row at all.
    pub fn execute_update<R: RequestConfig + ?Sized>(
        &self,
        session: Option<&C::Session>,
        config: &R,
        query: &str,
    ) -> Result<Option<RowObject>> {
        let resolved;
        let session = match session {
            Some(session) => session,
            None => {
                resolved = self.registry.session(config)?;
                &*resolved
            }
        };

        debug!("Executing update: {}", query);
        let cursor = session.execute(query).map_err(CqlBridgeError::Execute)?;

        let Some(row) = cursor.one() else {
            debug!("Update returned no summary row");
            return Ok(None);
        };

        let mut result = RowObject::new();
        result.insert(KEY_COUNT.to_string(), read_count(&row)?.map_or(Value::Null, Value::from));
        if let Some(id) = config.id() {
            result.insert(KEY_ID.to_string(), id.clone());
        }
        Ok(Some(result))
    }

    /// Affected-row count of a write, `0` when the driver gave no feedback.
    pub fn exec_update<R: RequestConfig + ?Sized>(&self, config: &R, query: &str) -> Result<i64> {
        let result = self.execute_update(None, config, query)?;
        Ok(result
            .and_then(|object| object.get(KEY_COUNT).and_then(Value::as_i64))
            .unwrap_or(0))
    }

    /// Run a read and decode every row.
    ///
    /// `Ok(None)` when the driver reported no result set, `Ok(Some(vec![]))`
    /// for a result set without rows.
    pub fn execute_query<R: RequestConfig + ?Sized>(
        &self,
        session: Option<&C::Session>,
        config: &R,
        query: &str,
        unknown_shape: bool,
    ) -> Result<Option<Vec<RowObject>>> {
        let resolved;
        let session = match session {
            Some(session) => session,
            None => {
                resolved = self.registry.session(config)?;
                &*resolved
            }
        };

        debug!("Executing query: {}", query);
        let cursor = session.execute(query).map_err(CqlBridgeError::Execute)?;

        let Some(rows) = cursor.all() else {
            return Ok(None);
        };

        let decoder = decoder_for(unknown_shape);
        let objects = rows
            .iter()
            .map(|row| decoder.decode(row))
            .collect::<Result<Vec<_>>>()?;

        debug!("Query returned {} rows", objects.len());
        Ok(Some(objects))
    }

    /// Read a single row. Extra rows go under [`KEY_RAW_LIST`]; no rows give
    /// an empty object.
    pub fn exec_query<R: RequestConfig + ?Sized>(
        &self,
        config: &R,
        query: &str,
        unknown_shape: bool,
    ) -> Result<RowObject> {
        let rows = self.execute_query(None, config, query, unknown_shape)?;

        let mut rows = rows.unwrap_or_default().into_iter();
        let mut result = rows.next().unwrap_or_default();

        let overflow: Vec<Value> = rows.map(Value::Object).collect();
        if !overflow.is_empty() {
            result.insert(KEY_RAW_LIST.to_string(), Value::Array(overflow));
        }
        Ok(result)
    }
}

fn read_count(row: &RawRow) -> Result<Option<i64>> {
    let value = row
        .value_by_name(KEY_COUNT)
        .ok_or_else(|| CqlBridgeError::Decode(format!("summary row has no '{KEY_COUNT}' column")))?;

    match value.coerce(ColumnType::BigInt) {
        Ok(CqlValue::BigInt(count)) => Ok(Some(count)),
        Ok(CqlValue::Null) => Ok(None),
        Ok(other) => Err(CqlBridgeError::Decode(format!(
            "'{KEY_COUNT}' is {}, expected bigint",
            other.type_name()
        ))),
        Err(e) => Err(CqlBridgeError::Decode(format!("'{KEY_COUNT}': {e}"))),
    }
}
