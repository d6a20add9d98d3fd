use std::time::Duration;

use anyhow::Result;
use tokio::net::TcpStream;
use tokio::runtime::Runtime;
use tokio::time::timeout;
use tokio_util::compat::TokioAsyncWriteCompatExt;

use crate::config::ConnectionSettings;
use crate::db::connection::{build_config, describe_target};
use crate::db::executor::{self, TdsClient};
use crate::db::types::ResultSet;
use crate::dialect::Dialect;
use crate::error::{AppError, ErrorKind};

/// "Run this SQL, return rows" over a single session.
///
/// Batches may hold several statements; a later statement must see temp
/// objects created by an earlier one. The last result set is returned.
pub trait Connection {
    fn execute(&mut self, sql: &str) -> Result<ResultSet>;
}

impl<C: Connection + ?Sized> Connection for Box<C> {
    fn execute(&mut self, sql: &str) -> Result<ResultSet> {
        (**self).execute(sql)
    }
}

/// Open the adapter registered for `dialect`.
pub fn open(dialect: Dialect, settings: &ConnectionSettings) -> Result<Box<dyn Connection>> {
    match dialect {
        Dialect::SqlServer => Ok(Box::new(SqlServerConnection::connect(settings)?)),
        other => Err(AppError::new(
            ErrorKind::UnsupportedDialect,
            format!("No connection adapter is available for dialect '{}'", other),
        )
        .into()),
    }
}

/// Synchronous wrapper over a Tiberius client and its own Tokio runtime.
pub struct SqlServerConnection {
    runtime: Runtime,
    client: Option<TdsClient>,
}

impl SqlServerConnection {
    /// Connect using resolved settings.
    ///
    /// # Errors
    ///
    /// Returns a `Connection` error if DNS resolution, TCP connect, or login
    /// fails, or if the configured timeout elapses during connect or login.
    pub fn connect(settings: &ConnectionSettings) -> Result<Self> {
        let runtime = Runtime::new()?;
        let client = runtime.block_on(connect_client(settings))?;
        tracing::info!(target = %describe_target(settings), "connected");
        Ok(Self {
            runtime,
            client: Some(client),
        })
    }
}

impl Connection for SqlServerConnection {
    fn execute(&mut self, sql: &str) -> Result<ResultSet> {
        let client = self
            .client
            .as_mut()
            .ok_or_else(|| AppError::new(ErrorKind::Connection, "Connection is closed"))?;
        let query = tiberius::Query::new(sql.to_string());
        let sets = self.runtime.block_on(executor::run_query(query, client))?;
        Ok(sets.into_iter().last().unwrap_or_default())
    }
}

impl Drop for SqlServerConnection {
    fn drop(&mut self) {
        if let Some(client) = self.client.take() {
            if let Err(err) = self.runtime.block_on(client.close()) {
                tracing::debug!("Error while closing connection: {}", err);
            }
        }
    }
}

async fn connect_client(settings: &ConnectionSettings) -> Result<TdsClient> {
    let config =
        build_config(settings).map_err(|err| AppError::new(ErrorKind::Config, err.to_string()))?;
    let timeout_duration = if settings.timeout_ms == 0 {
        None
    } else {
        Some(Duration::from_millis(settings.timeout_ms))
    };

    let tcp = with_timeout(timeout_duration, "Connection", TcpStream::connect(config.get_addr()))
        .await?
        .map_err(|err| AppError::new(ErrorKind::Connection, err.to_string()))?;
    tcp.set_nodelay(true)?;

    let client = with_timeout(
        timeout_duration,
        "Login",
        tiberius::Client::connect(config, tcp.compat_write()),
    )
    .await?
    .map_err(|err| AppError::new(ErrorKind::Connection, err.to_string()))?;
    Ok(client)
}

// Outer error is the elapsed timeout, inner is the operation's own result.
async fn with_timeout<F: std::future::Future>(
    duration: Option<Duration>,
    what: &str,
    future: F,
) -> Result<F::Output> {
    match duration {
        Some(duration) => timeout(duration, future).await.map_err(|_| {
            AppError::new(
                ErrorKind::Connection,
                format!("{} timed out after {} ms", what, duration.as_millis()),
            )
            .into()
        }),
        None => Ok(future.await),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dialect_without_adapter_is_unsupported() {
        let err = open(Dialect::BigQuery, &ConnectionSettings::default())
            .err()
            .expect("unsupported");
        assert_eq!(
            crate::error::classify_error(&err),
            ErrorKind::UnsupportedDialect
        );
    }

    #[test]
    fn timeout_wrapper_passes_through_results() {
        let runtime = Runtime::new().expect("runtime");
        let value = runtime
            .block_on(with_timeout(Some(Duration::from_secs(1)), "Test", async { 7 }))
            .expect("no timeout");
        assert_eq!(value, 7);
    }

    #[test]
    fn timeout_wrapper_reports_elapsed() {
        let runtime = Runtime::new().expect("runtime");
        let err = runtime
            .block_on(with_timeout(
                Some(Duration::from_millis(10)),
                "Login",
                async { tokio::time::sleep(Duration::from_secs(5)).await },
            ))
            .expect_err("timeout");
        assert!(err.to_string().contains("Login timed out after 10 ms"));
        assert_eq!(crate::error::classify_error(&err), ErrorKind::Connection);
    }
}
