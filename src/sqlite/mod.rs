//! Embedded SQLite implementation of the driver contract.
//!
//! Lets the registry and executor run without a cluster: the CLI, local
//! development and the integration tests all go through it. Targets look
//! like `sqlite::memory:`, `sqlite:///abs/path.db` or `file:///abs/path.db`.

use std::path::PathBuf;
use std::time::Duration;

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use tracing::debug;
use url::Url;

use crate::driver::{Connector, DriverError, ResultCursor, Session, SessionTarget};
use crate::types::{ColumnSpec, CqlValue};

static KEYSPACE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid keyspace regex"));

/// Settings applied to every connection the connector opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteOptions {
    pub journal_mode: String,
    pub synchronous: String,
    pub busy_timeout: Duration,
}

impl Default for SqliteOptions {
    fn default() -> Self {
        Self {
            journal_mode: "WAL".to_string(),
            synchronous: "NORMAL".to_string(),
            busy_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Location {
    Memory,
    File { path: PathBuf, create: bool },
}

impl Location {
    fn resolve(target: &SessionTarget) -> Result<Self, DriverError> {
        // A bundle names an existing database file and wins over the URI path
        if let Some(bundle) = &target.bundle {
            if !bundle.is_file() {
                return Err(DriverError::Bundle(format!("{} is not a file", bundle.display())));
            }
            return Ok(Location::File {
                path: bundle.clone(),
                create: false,
            });
        }

        let uri = &target.uri;
        let path = match uri.scheme() {
            "sqlite" => {
                if uri.path().is_empty() || uri.path() == ":memory:" {
                    return Ok(Location::Memory);
                }
                Url::parse(&format!("file://{}", uri.path()))
                    .ok()
                    .and_then(|file| file.to_file_path().ok())
            }
            "file" => uri.to_file_path().ok(),
            other => return Err(DriverError::UnsupportedScheme(other.to_string())),
        };

        path.map(|path| Location::File { path, create: true })
            .ok_or_else(|| DriverError::Target(format!("cannot map {uri} to a database path")))
    }

    fn describe(&self) -> String {
        match self {
            Location::Memory => ":memory:".to_string(),
            Location::File { path, .. } => path.display().to_string(),
        }
    }
}

/// Opens one SQLite connection per session.
#[derive(Debug, Clone, Default)]
pub struct SqliteConnector {
    options: SqliteOptions,
}

impl SqliteConnector {
    pub fn new(options: SqliteOptions) -> Self {
        Self { options }
    }
}

impl Connector for SqliteConnector {
    type Session = SqliteSession;

    fn connect(&self, target: &SessionTarget) -> Result<SqliteSession, DriverError> {
        if let Some(keyspace) = &target.keyspace {
            if !KEYSPACE_NAME.is_match(keyspace) {
                return Err(DriverError::InvalidKeyspace(keyspace.clone()));
            }
        }

        let location = Location::resolve(target)?;
        debug!("Opening SQLite session at {}", location.describe());

        let conn = match &location {
            Location::Memory => Connection::open_in_memory()?,
            Location::File { path, create } => {
                let mut flags = OpenFlags::SQLITE_OPEN_READ_WRITE
                    | OpenFlags::SQLITE_OPEN_FULL_MUTEX
                    | OpenFlags::SQLITE_OPEN_URI;
                if *create {
                    flags |= OpenFlags::SQLITE_OPEN_CREATE;
                }
                Connection::open_with_flags(path, flags)?
            }
        };

        let pragma_sql = format!(
            "PRAGMA journal_mode = {};
             PRAGMA synchronous = {};",
            self.options.journal_mode, self.options.synchronous
        );
        conn.execute_batch(&pragma_sql)?;
        conn.busy_timeout(self.options.busy_timeout)?;

        Ok(SqliteSession {
            conn: Mutex::new(Some(conn)),
            keyspace: target.keyspace.clone(),
            location: location.describe(),
        })
    }
}

/// A single SQLite connection. Statements on one session run one at a time.
pub struct SqliteSession {
    conn: Mutex<Option<Connection>>,
    keyspace: Option<String>,
    location: String,
}

impl SqliteSession {
    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn is_closed(&self) -> bool {
        self.conn.lock().is_none()
    }
}

impl Session for SqliteSession {
    fn execute(&self, query: &str) -> Result<ResultCursor, DriverError> {
        let guard = self.conn.lock();
        let conn = guard.as_ref().ok_or(DriverError::Closed)?;

        // SQLite prepares these into a null statement that cannot be stepped
        if is_blank_statement(query) {
            debug!("Skipping statement with no SQL in it");
            return Ok(ResultCursor::NoResult);
        }

        let mut stmt = conn.prepare(query)?;

        // No result columns: report the change count as a summary row
        if stmt.column_count() == 0 {
            let changes = stmt.execute([])?;
            return Ok(ResultCursor::summary(changes as i64));
        }

        let columns: Vec<ColumnSpec> = stmt
            .columns()
            .iter()
            .map(|column| ColumnSpec::declared(column.name(), column.decl_type()))
            .collect();
        let column_count = columns.len();

        let mut rows = Vec::new();
        let mut result_rows = stmt.query([])?;
        while let Some(row) = result_rows.next()? {
            let mut values = Vec::with_capacity(column_count);
            for i in 0..column_count {
                values.push(from_value_ref(row.get_ref(i)?));
            }
            rows.push(values);
        }

        Ok(ResultCursor::rows(columns, rows))
    }

    fn close(&self) -> Result<(), DriverError> {
        let conn = self.conn.lock().take().ok_or(DriverError::Closed)?;
        conn.close().map_err(|(_, e)| DriverError::Sqlite(e))
    }

    fn keyspace(&self) -> Option<&str> {
        self.keyspace.as_deref()
    }
}

/// True when the text holds nothing but whitespace, `;` and comments.
fn is_blank_statement(query: &str) -> bool {
    let mut chars = query.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            c if c.is_whitespace() || c == ';' => {}
            '-' if chars.peek() == Some(&'-') => {
                // Single-line comment, skip to end of line
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev_char = '\0';
                for c in chars.by_ref() {
                    if prev_char == '*' && c == '/' {
                        break;
                    }
                    prev_char = c;
                }
            }
            _ => return false,
        }
    }

    true
}

fn from_value_ref(value: ValueRef<'_>) -> CqlValue {
    match value {
        ValueRef::Null => CqlValue::Null,
        ValueRef::Integer(i) => CqlValue::BigInt(i),
        ValueRef::Real(f) => CqlValue::Double(f),
        ValueRef::Text(s) => CqlValue::Text(String::from_utf8_lossy(s).into_owned()),
        ValueRef::Blob(b) => CqlValue::Blob(b.to_vec()),
    }
}
