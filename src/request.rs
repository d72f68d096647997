use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request method as classified by the ORM layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestMethod {
    Get,
    Head,
    Gets,
    Heads,
    Post,
    Put,
    Delete,
    Crud,
}

impl RequestMethod {
    /// Read methods go down the query path, everything else is a write.
    pub fn is_query_method(&self) -> bool {
        matches!(
            self,
            RequestMethod::Get | RequestMethod::Head | RequestMethod::Gets | RequestMethod::Heads
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestMethod::Get => "GET",
            RequestMethod::Head => "HEAD",
            RequestMethod::Gets => "GETS",
            RequestMethod::Heads => "HEADS",
            RequestMethod::Post => "POST",
            RequestMethod::Put => "PUT",
            RequestMethod::Delete => "DELETE",
            RequestMethod::Crud => "CRUD",
        }
    }
}

impl fmt::Display for RequestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(RequestMethod::Get),
            "HEAD" => Ok(RequestMethod::Head),
            "GETS" => Ok(RequestMethod::Gets),
            "HEADS" => Ok(RequestMethod::Heads),
            "POST" => Ok(RequestMethod::Post),
            "PUT" => Ok(RequestMethod::Put),
            "DELETE" => Ok(RequestMethod::Delete),
            "CRUD" => Ok(RequestMethod::Crud),
            other => Err(format!("unknown request method '{other}'")),
        }
    }
}

/// Per-request descriptor supplied by the ORM layer.
pub trait RequestConfig {
    fn db_uri(&self) -> &str;

    fn db_account(&self) -> Option<&str>;

    /// Keyspace the session is bound to.
    fn schema(&self) -> Option<&str>;

    fn method(&self) -> RequestMethod;

    /// Record identifier echoed back on writes.
    fn id(&self) -> Option<&Value>;

    /// Location of the connection bundle, when the target needs one.
    fn bundle_location(&self) -> Option<&Path> {
        None
    }

    fn is_query(&self) -> bool {
        self.method().is_query_method()
    }
}

/// Immutable [`RequestConfig`] value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestDescriptor {
    pub uri: String,
    #[serde(default)]
    pub account: Option<String>,
    #[serde(default)]
    pub schema: Option<String>,
    pub method: RequestMethod,
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub bundle: Option<PathBuf>,
}

impl RequestDescriptor {
    /// A `GET` request against `uri`.
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            account: None,
            schema: None,
            method: RequestMethod::Get,
            id: None,
            bundle: None,
        }
    }

    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn with_method(mut self, method: RequestMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_id(mut self, id: impl Into<Value>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_bundle(mut self, bundle: impl Into<PathBuf>) -> Self {
        self.bundle = Some(bundle.into());
        self
    }
}

impl RequestConfig for RequestDescriptor {
    fn db_uri(&self) -> &str {
        &self.uri
    }

    fn db_account(&self) -> Option<&str> {
        self.account.as_deref()
    }

    fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    fn method(&self) -> RequestMethod {
        self.method
    }

    fn id(&self) -> Option<&Value> {
        self.id.as_ref()
    }

    fn bundle_location(&self) -> Option<&Path> {
        self.bundle.as_deref()
    }
}
