//! Contract with the underlying wide-column client.
//!
//! The registry and executor only ever see these traits. A concrete client
//! (the embedded SQLite connector in [`crate::sqlite`], or a test double)
//! decides how a [`SessionTarget`] turns into a live handle and how a
//! statement produces a [`ResultCursor`].

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use url::Url;

use crate::types::{ColumnSpec, CqlValue, RawRow};

/// Errors raised by a driver while connecting, executing or releasing.
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("Unsupported target scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Invalid keyspace name: {0}")]
    InvalidKeyspace(String),

    #[error("Invalid connection bundle reference: {0}")]
    Bundle(String),

    #[error("Invalid target: {0}")]
    Target(String),

    #[error("Session is closed")]
    Closed,

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("{0}")]
    Other(String),
}

/// Everything a connector needs to open one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTarget {
    pub uri: Url,
    pub keyspace: Option<String>,
    pub bundle: Option<PathBuf>,
}

impl SessionTarget {
    pub fn new(uri: Url) -> Self {
        Self {
            uri,
            keyspace: None,
            bundle: None,
        }
    }

    pub fn with_keyspace(mut self, keyspace: impl Into<String>) -> Self {
        self.keyspace = Some(keyspace.into());
        self
    }

    pub fn with_bundle(mut self, bundle: impl Into<PathBuf>) -> Self {
        self.bundle = Some(bundle.into());
        self
    }
}

/// Builds sessions. Held by the registry for its whole lifetime.
pub trait Connector: Send + Sync {
    type Session: Session;

    fn connect(&self, target: &SessionTarget) -> Result<Self::Session, DriverError>;
}

/// A live handle to the store, bound to one keyspace.
///
/// Implementations must tolerate concurrent `execute` calls from several
/// threads; the executor never serializes access to a handle.
pub trait Session: Send + Sync {
    /// Execute one fully formed statement.
    fn execute(&self, query: &str) -> Result<ResultCursor, DriverError>;

    /// Release the handle. Called at most once by the registry.
    fn close(&self) -> Result<(), DriverError>;

    fn keyspace(&self) -> Option<&str>;
}

/// What a statement produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultCursor {
    /// The driver reported no result set at all.
    NoResult,
    /// A result set, possibly with zero rows.
    Rows {
        columns: Arc<[ColumnSpec]>,
        rows: Vec<Vec<CqlValue>>,
    },
}

impl ResultCursor {
    pub fn rows(columns: Vec<ColumnSpec>, rows: Vec<Vec<CqlValue>>) -> Self {
        ResultCursor::Rows {
            columns: columns.into(),
            rows,
        }
    }

    /// A result set with the given columns and no rows.
    pub fn empty(columns: Vec<ColumnSpec>) -> Self {
        Self::rows(columns, Vec::new())
    }

    /// The single summary row a write statement reports.
    pub fn summary(count: i64) -> Self {
        Self::rows(
            vec![ColumnSpec::new("count", Some(crate::types::ColumnType::BigInt))],
            vec![vec![CqlValue::BigInt(count)]],
        )
    }

    /// First row, if any. The rest are dropped.
    pub fn one(self) -> Option<RawRow> {
        match self {
            ResultCursor::NoResult => None,
            ResultCursor::Rows { columns, rows } => rows
                .into_iter()
                .next()
                .map(|values| RawRow::new(columns, values)),
        }
    }

    /// All rows. `None` when there was no result set.
    pub fn all(self) -> Option<Vec<RawRow>> {
        match self {
            ResultCursor::NoResult => None,
            ResultCursor::Rows { columns, rows } => Some(
                rows.into_iter()
                    .map(|values| RawRow::new(columns.clone(), values))
                    .collect(),
            ),
        }
    }
}
