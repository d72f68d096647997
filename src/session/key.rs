use std::fmt;

use url::Url;

use crate::request::RequestConfig;
use crate::{CqlBridgeError, Result};

/// Identifies a reusable session by target URI and account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionKey(String);

impl ConnectionKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ConnectionKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Parse the configured target URI.
pub fn parse_target(uri: &str) -> Result<Url> {
    Url::parse(uri.trim()).map_err(|source| CqlBridgeError::MalformedTarget {
        uri: uri.to_string(),
        source,
    })
}

/// Derive the connection key for a request.
///
/// The account is always appended as the last query pair, so the same target
/// reached with two accounts gets two sessions. Without an account the pair is
/// a bare `username` key, distinct from an empty account.
pub fn resolve_key<R: RequestConfig + ?Sized>(config: &R) -> Result<ConnectionKey> {
    let mut url = parse_target(config.db_uri())?;
    {
        let mut pairs = url.query_pairs_mut();
        match config.db_account() {
            Some(account) => pairs.append_pair("username", account),
            None => pairs.append_key_only("username"),
        };
    }
    Ok(ConnectionKey(url.into()))
}
