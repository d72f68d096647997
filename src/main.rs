use std::io::Read;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{error, info};

use cqlbridge::config::Config;
use cqlbridge::sqlite::SqliteConnector;
use cqlbridge::{QueryExecutor, RequestConfig, RequestDescriptor, SessionRegistry};

fn main() -> Result<()> {
    let config = Config::load();

    // Initialize logging; stdout is reserved for results
    tracing_subscriber::fmt()
        .with_env_filter(config.log_level.clone())
        .with_writer(std::io::stderr)
        .init();

    info!("cqlbridge v{}", env!("CARGO_PKG_VERSION"));

    let statements = if config.statements.is_empty() {
        read_statements(std::io::stdin())?
    } else {
        config.statements.clone()
    };

    let registry = Arc::new(SessionRegistry::new(SqliteConnector::new(config.sqlite_options())));
    let executor = QueryExecutor::new(registry.clone());
    let request = config.request();

    let outcome = run(&executor, &request, &config, &statements);

    let release_errors = registry.close_all();
    for err in &release_errors {
        error!("{}", err);
    }

    outcome
}

fn run(
    executor: &QueryExecutor<SqliteConnector>,
    request: &RequestDescriptor,
    config: &Config,
    statements: &[String],
) -> Result<()> {
    info!(
        "Running {} statements as {} against {}",
        statements.len(),
        request.method(),
        request.db_uri()
    );

    for statement in statements {
        let result = if config.all_rows && request.is_query() {
            executor
                .execute_query(None, request, statement, config.unknown_shape)?
                .map(|rows| Value::Array(rows.into_iter().map(Value::Object).collect()))
                .unwrap_or(Value::Null)
        } else {
            executor
                .execute(request, statement, config.unknown_shape)
                .with_context(|| format!("Statement failed: {statement}"))?
                .map(Value::Object)
                .unwrap_or(Value::Null)
        };
        println!("{}", serde_json::to_string_pretty(&result)?);
    }
    Ok(())
}

/// Split stdin on `;` into individual statements.
fn read_statements(mut input: impl Read) -> Result<Vec<String>> {
    let mut text = String::new();
    input.read_to_string(&mut text).context("Failed to read statements from stdin")?;
    Ok(text
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect())
}
