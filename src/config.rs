use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::request::{RequestDescriptor, RequestMethod};
use crate::sqlite::SqliteOptions;

#[derive(Parser, Debug, Clone)]
#[command(name = "cqlbridge")]
#[command(about = "Run one ORM request against a wide-column session through the session registry", long_about = None)]
pub struct Config {
    // Target
    #[arg(short, long, default_value = "sqlite::memory:", env = "CQLBRIDGE_URI", help = "Target URI of the store")]
    pub uri: String,

    #[arg(short, long, env = "CQLBRIDGE_ACCOUNT", help = "Account the session is opened for")]
    pub account: Option<String>,

    #[arg(short, long, env = "CQLBRIDGE_KEYSPACE", help = "Keyspace the session is bound to")]
    pub keyspace: Option<String>,

    #[arg(long, env = "CQLBRIDGE_BUNDLE", help = "Connection bundle location")]
    pub bundle: Option<PathBuf>,

    // Request
    #[arg(short, long, default_value = "GET", env = "CQLBRIDGE_METHOD", help = "Request method (GET, HEAD, GETS, HEADS, POST, PUT, DELETE, CRUD)")]
    pub method: RequestMethod,

    #[arg(long, env = "CQLBRIDGE_ID", help = "Record identifier echoed back on writes")]
    pub id: Option<String>,

    #[arg(long, env = "CQLBRIDGE_UNKNOWN_SHAPE", help = "Introspect column types per row instead of using declared types")]
    pub unknown_shape: bool,

    #[arg(long, env = "CQLBRIDGE_ALL_ROWS", help = "Print every row instead of the single-row form")]
    pub all_rows: bool,

    #[arg(help = "Statements to run in order; read from stdin when omitted")]
    pub statements: Vec<String>,

    // Logging
    #[arg(long, default_value = "info", env = "CQLBRIDGE_LOG_LEVEL")]
    pub log_level: String,

    // SQLite PRAGMA settings
    #[arg(long, default_value = "WAL", env = "CQLBRIDGE_JOURNAL_MODE", help = "SQLite journal mode (WAL, DELETE, TRUNCATE, etc.)")]
    pub pragma_journal_mode: String,

    #[arg(long, default_value = "NORMAL", env = "CQLBRIDGE_SYNCHRONOUS", help = "SQLite synchronous mode (NORMAL, FULL, OFF)")]
    pub pragma_synchronous: String,

    #[arg(long, default_value = "5000", env = "CQLBRIDGE_BUSY_TIMEOUT_MS", help = "SQLite busy timeout in milliseconds")]
    pub busy_timeout_ms: u64,
}

impl Config {
    /// Get a configuration instance with all values resolved from CLI args and environment variables
    pub fn load() -> Self {
        Config::parse()
    }

    pub fn busy_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    pub fn sqlite_options(&self) -> SqliteOptions {
        SqliteOptions {
            journal_mode: self.pragma_journal_mode.clone(),
            synchronous: self.pragma_synchronous.clone(),
            busy_timeout: self.busy_timeout_duration(),
        }
    }

    /// Request descriptor for the configured target. Numeric ids stay numbers.
    pub fn request(&self) -> RequestDescriptor {
        let mut request = RequestDescriptor::new(self.uri.clone()).with_method(self.method);
        if let Some(account) = &self.account {
            request = request.with_account(account.clone());
        }
        if let Some(keyspace) = &self.keyspace {
            request = request.with_schema(keyspace.clone());
        }
        if let Some(bundle) = &self.bundle {
            request = request.with_bundle(bundle.clone());
        }
        if let Some(id) = &self.id {
            request = match id.parse::<i64>() {
                Ok(n) => request.with_id(n),
                Err(_) => request.with_id(id.clone()),
            };
        }
        request
    }
}
