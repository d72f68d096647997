pub mod config;
pub mod driver;
pub mod query;
pub mod request;
pub mod session;
pub mod sqlite;
pub mod types;

use thiserror::Error;

pub use driver::{Connector, DriverError, ResultCursor, Session, SessionTarget};
pub use query::{QueryExecutor, KEY_COUNT, KEY_ID, KEY_RAW_LIST};
pub use request::{RequestConfig, RequestDescriptor, RequestMethod};
pub use session::{ConnectionKey, ReleaseError, SessionRegistry};
pub use types::RowObject;

#[derive(Error, Debug)]
pub enum CqlBridgeError {
    #[error("Malformed target URI '{uri}': {source}")]
    MalformedTarget {
        uri: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Failed to open session {key}: {source}")]
    Connect {
        key: String,
        #[source]
        source: DriverError,
    },

    #[error("Statement execution failed: {0}")]
    Execute(#[source] DriverError),

    #[error("Row decoding error: {0}")]
    Decode(String),
}

pub type Result<T> = std::result::Result<T, CqlBridgeError>;

impl CqlBridgeError {
    /// Stable code for the ORM response envelope
    pub fn error_code(&self) -> &str {
        match self {
            CqlBridgeError::MalformedTarget { .. } => "MALFORMED_TARGET",
            CqlBridgeError::Connect { .. } => "CONNECTION_FAILED",
            CqlBridgeError::Execute(_) => "EXECUTION_FAILED",
            CqlBridgeError::Decode(_) => "DECODE_FAILED",
        }
    }
}
