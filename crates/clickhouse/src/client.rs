//! ClickHouse client wrapper.

use crate::config::ClickHouseConfig;
use clickhouse::Client;
use engine_core::{Error, Result, StoreErrorCode};
use std::future::Future;
use std::time::Instant;
use telemetry::metrics;
use tracing::{info, warn};

/// ClickHouse client wrapper with connection pooling.
#[derive(Clone)]
pub struct ClickHouseClient {
    inner: Client,
    config: ClickHouseConfig,
}

impl ClickHouseClient {
    /// Creates a new ClickHouse client.
    pub fn new(config: ClickHouseConfig) -> Result<Self> {
        if config.url.trim().is_empty() {
            return Err(Error::config("clickhouse.url must not be empty"));
        }

        let mut client = Client::default()
            .with_url(&config.url)
            .with_database(&config.database);

        if let Some(ref user) = config.username {
            client = client.with_user(user);
        }

        if let Some(ref pass) = config.password {
            client = client.with_password(pass);
        }

        info!(
            url = %config.url,
            database = %config.database,
            "Created ClickHouse client"
        );

        Ok(Self {
            inner: client,
            config,
        })
    }

    /// Returns the inner clickhouse client.
    pub fn inner(&self) -> &Client {
        &self.inner
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ClickHouseConfig {
        &self.config
    }

    /// Fully qualified table name.
    pub fn table(&self, name: &str) -> String {
        format!("{}.{}", self.config.database, name)
    }

    /// Runs one store call, recording its latency and mapping failures to a
    /// coded store error.
    pub(crate) async fn timed<T, F>(&self, code: StoreErrorCode, op: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, clickhouse::error::Error>>,
    {
        let start = Instant::now();
        let result = fut.await;
        metrics()
            .store_latency_ms
            .observe(start.elapsed().as_millis() as u64);

        result.map_err(|e| {
            metrics().store_errors.inc();
            warn!(op, code = code.code(), error = %e, "ClickHouse operation failed");
            Error::store(code, format!("{op}: {e}"))
        })
    }
}
