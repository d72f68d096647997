// Module for session management
pub mod key;
pub mod registry;

pub use key::{ConnectionKey, resolve_key};
pub use registry::{SessionRegistry, ReleaseError};
