use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use cqlbridge::driver::{Connector, DriverError, ResultCursor, Session, SessionTarget};
use cqlbridge::types::{ColumnSpec, ColumnType, CqlValue};
use parking_lot::Mutex;

/// Keyspace whose sessions fail to release.
#[allow(dead_code)]
pub const FLAKY_KEYSPACE: &str = "flaky";

/// Host that refuses connections.
#[allow(dead_code)]
pub const UNREACHABLE_HOST: &str = "unreachable";

/// Canned statement results shared by every session of a connector.
#[derive(Debug, Default)]
pub struct Script {
    responses: Mutex<HashMap<String, Result<ResultCursor, String>>>,
}

impl Script {
    pub fn respond(&self, query: &str, cursor: ResultCursor) {
        self.responses.lock().insert(query.to_string(), Ok(cursor));
    }

    #[allow(dead_code)]
    pub fn fail(&self, query: &str, message: &str) {
        self.responses.lock().insert(query.to_string(), Err(message.to_string()));
    }
}

/// Connector double that counts connects and releases.
pub struct ScriptedConnector {
    pub script: Arc<Script>,
    pub connect_delay: Duration,
    connects: AtomicUsize,
    closes: Arc<AtomicUsize>,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self {
            script: Arc::new(Script::default()),
            connect_delay: Duration::ZERO,
            connects: AtomicUsize::new(0),
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    #[allow(dead_code)]
    pub fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = delay;
        self
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Release attempts, failed ones included.
    #[allow(dead_code)]
    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl Connector for ScriptedConnector {
    type Session = ScriptedSession;

    fn connect(&self, target: &SessionTarget) -> Result<ScriptedSession, DriverError> {
        if !self.connect_delay.is_zero() {
            thread::sleep(self.connect_delay);
        }
        if target.uri.host_str() == Some(UNREACHABLE_HOST) {
            return Err(DriverError::Other("connection refused".to_string()));
        }
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(ScriptedSession {
            script: self.script.clone(),
            keyspace: target.keyspace.clone(),
            closes: self.closes.clone(),
            executed: Mutex::new(Vec::new()),
        })
    }
}

#[derive(Debug)]
pub struct ScriptedSession {
    script: Arc<Script>,
    keyspace: Option<String>,
    closes: Arc<AtomicUsize>,
    executed: Mutex<Vec<String>>,
}

impl ScriptedSession {
    #[allow(dead_code)]
    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().clone()
    }
}

impl Session for ScriptedSession {
    fn execute(&self, query: &str) -> Result<ResultCursor, DriverError> {
        self.executed.lock().push(query.to_string());
        match self.script.responses.lock().get(query) {
            Some(Ok(cursor)) => Ok(cursor.clone()),
            Some(Err(message)) => Err(DriverError::Other(message.clone())),
            None => Err(DriverError::Other(format!("no scripted response for: {query}"))),
        }
    }

    fn close(&self) -> Result<(), DriverError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        if self.keyspace.as_deref() == Some(FLAKY_KEYSPACE) {
            return Err(DriverError::Other("release timed out".to_string()));
        }
        Ok(())
    }

    fn keyspace(&self) -> Option<&str> {
        self.keyspace.as_deref()
    }
}

/// A `users` result set with the given `(id, name)` rows.
#[allow(dead_code)]
pub fn user_rows(rows: &[(i64, &str)]) -> ResultCursor {
    ResultCursor::rows(
        vec![
            ColumnSpec::new("id", Some(ColumnType::BigInt)),
            ColumnSpec::new("name", Some(ColumnType::Text)),
        ],
        rows.iter()
            .map(|(id, name)| vec![CqlValue::BigInt(*id), CqlValue::Text(name.to_string())])
            .collect(),
    )
}
