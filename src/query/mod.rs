// Module for query execution
pub mod executor;

pub use executor::{QueryExecutor, KEY_COUNT, KEY_ID, KEY_RAW_LIST};
