use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::driver::{Connector, DriverError, Session, SessionTarget};
use crate::request::RequestConfig;
use crate::session::key::{ConnectionKey, parse_target, resolve_key};
use crate::{CqlBridgeError, Result};

/// A session that could not be released cleanly. Never fatal: the registry
/// entry is gone either way.
#[derive(Error, Debug)]
#[error("Failed to release session {key}: {source}")]
pub struct ReleaseError {
    pub key: ConnectionKey,
    #[source]
    pub source: DriverError,
}

/// One registry entry. The cell is filled outside the map lock so a slow
/// connect only blocks callers of the same key.
struct SessionSlot<S> {
    cell: OnceCell<Arc<S>>,
    released: AtomicBool,
}

impl<S: Session> SessionSlot<S> {
    fn new() -> Self {
        Self {
            cell: OnceCell::new(),
            released: AtomicBool::new(false),
        }
    }

    /// Close the session held by this slot, at most once.
    /// Returns `None` when there was nothing (left) to close.
    fn release(&self) -> Option<std::result::Result<(), DriverError>> {
        let session = self.cell.get()?;
        if self.released.swap(true, Ordering::AcqRel) {
            return None;
        }
        Some(session.close())
    }
}

/// Keyed cache of open sessions, at most one per [`ConnectionKey`].
pub struct SessionRegistry<C: Connector> {
    connector: C,
    sessions: Mutex<HashMap<ConnectionKey, Arc<SessionSlot<C::Session>>>>,
}

impl<C: Connector> SessionRegistry<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn resolve_key<R: RequestConfig + ?Sized>(&self, config: &R) -> Result<ConnectionKey> {
        resolve_key(config)
    }

    /// Look up the session for `config`, creating it on a miss when
    /// `auto_create` is set. Without `auto_create` a miss is `Ok(None)`.
    pub fn get_session<R: RequestConfig + ?Sized>(
        &self,
        config: &R,
        auto_create: bool,
    ) -> Result<Option<Arc<C::Session>>> {
        let key = resolve_key(config)?;
        if !auto_create {
            let sessions = self.sessions.lock();
            return Ok(sessions.get(&key).and_then(|slot| slot.cell.get().cloned()));
        }
        self.get_or_create(key, config).map(Some)
    }

    /// Session for `config`, created on demand.
    pub fn session<R: RequestConfig + ?Sized>(&self, config: &R) -> Result<Arc<C::Session>> {
        let key = resolve_key(config)?;
        self.get_or_create(key, config)
    }

    fn get_or_create<R: RequestConfig + ?Sized>(
        &self,
        key: ConnectionKey,
        config: &R,
    ) -> Result<Arc<C::Session>> {
        loop {
            let slot = {
                let mut sessions = self.sessions.lock();
                sessions
                    .entry(key.clone())
                    .or_insert_with(|| Arc::new(SessionSlot::new()))
                    .clone()
            };

            let session = match slot.cell.get_or_try_init(|| self.open(&key, config).map(Arc::new)) {
                Ok(session) => session.clone(),
                Err(e) => {
                    self.forget_failed(&key, &slot);
                    return Err(e);
                }
            };

            if self.is_registered(&key, &slot) {
                return Ok(session);
            }

            // Closed while we were connecting: the handle must not escape.
            debug!("Session {} was closed during lookup, retrying", key);
            if let Some(Err(source)) = slot.release() {
                warn!("Failed to release orphaned session {}: {}", key, source);
            }
        }
    }

    fn open<R: RequestConfig + ?Sized>(&self, key: &ConnectionKey, config: &R) -> Result<C::Session> {
        let mut target = SessionTarget::new(parse_target(config.db_uri())?);
        target.keyspace = config.schema().map(str::to_string);
        target.bundle = config.bundle_location().map(|p| p.to_path_buf());

        debug!("Opening session {} (keyspace: {:?})", key, target.keyspace);
        let session = self
            .connector
            .connect(&target)
            .map_err(|source| CqlBridgeError::Connect {
                key: key.to_string(),
                source,
            })?;

        info!("Created new session {}", key);
        Ok(session)
    }

    fn is_registered(&self, key: &ConnectionKey, slot: &Arc<SessionSlot<C::Session>>) -> bool {
        self.sessions
            .lock()
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, slot))
    }

    /// Drop an entry whose connect failed, unless someone else has since
    /// filled or replaced it.
    fn forget_failed(&self, key: &ConnectionKey, slot: &Arc<SessionSlot<C::Session>>) {
        let mut sessions = self.sessions.lock();
        let stale = sessions
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, slot) && current.cell.get().is_none());
        if stale {
            sessions.remove(key);
        }
    }

    /// Remove and release the session for `config`, if there is one.
    ///
    /// The entry is removed before the handle is released; a failed release
    /// is logged and handed back, not raised.
    pub fn close_session<R: RequestConfig + ?Sized>(&self, config: &R) -> Result<Option<ReleaseError>> {
        let key = resolve_key(config)?;

        let slot = {
            let mut sessions = self.sessions.lock();
            let Some(slot) = sessions.remove(&key) else {
                return Ok(None);
            };
            info!("Removed session {} (remaining sessions: {})", key, sessions.len());
            slot
        };

        match slot.release() {
            Some(Err(source)) => {
                warn!("Failed to release session {}: {}", key, source);
                Ok(Some(ReleaseError { key, source }))
            }
            _ => Ok(None),
        }
    }

    /// Release every session and empty the registry.
    ///
    /// Each release is attempted regardless of earlier failures; the failures
    /// are logged and returned.
    pub fn close_all(&self) -> Vec<ReleaseError> {
        let drained: Vec<_> = self.sessions.lock().drain().collect();
        let total = drained.len();

        let mut errors = Vec::new();
        for (key, slot) in drained {
            if let Some(Err(source)) = slot.release() {
                warn!("Failed to release session {}: {}", key, source);
                errors.push(ReleaseError { key, source });
            }
        }

        info!("Closed {} sessions ({} release failures)", total, errors.len());
        errors
    }

    /// Number of registered entries.
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }

    /// Whether an open session is registered for `config`.
    pub fn contains<R: RequestConfig + ?Sized>(&self, config: &R) -> Result<bool> {
        Ok(self.get_session(config, false)?.is_some())
    }
}

impl<C: Connector> Drop for SessionRegistry<C> {
    fn drop(&mut self) {
        let open = self.sessions.get_mut().len();
        if open > 0 {
            debug!("Dropping session registry with {} open sessions", open);
        }
    }
}
