use std::sync::Arc;

use async_trait::async_trait;
use hotconf_config::schedule::{CronSchedule, poll_for_changes};
use hotconf_config::{
    ChangeNotifier, ConfigError, ConfigResult, ConfigResultExt, Connector, Format, Options,
};
use parking_lot::Mutex;
use sqlx::any::{AnyPoolOptions, install_default_drivers};
use sqlx::{Any, AnyPool, Connection};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{DRIVER_NAME, SqlDriverOptions};

const MAX_CONNECTIONS: u32 = 4;

/// Connector reading and writing the document through an sqlx pool
pub struct SqlConnector {
    pool: AnyPool,
    load_query: String,
    store_query: String,
    format: Format,
    last_seen: Arc<Mutex<Option<String>>>,
    poller: Option<Poller>,
}

struct Poller {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

fn sql_error(err: sqlx::Error) -> ConfigError {
    ConfigError::connector(DRIVER_NAME, err.to_string())
}

async fn fetch_document(pool: &AnyPool, query: &str) -> ConfigResult<String> {
    sqlx::query_scalar::<Any, String>(query)
        .fetch_one(pool)
        .await
        .map_err(sql_error)
}

impl SqlConnector {
    /// Connect to `dsn`, check the connection and, when `notifier` is
    /// given and a schedule is configured, start polling for changes.
    pub async fn open(
        options: SqlDriverOptions,
        notifier: Option<ChangeNotifier>,
    ) -> ConfigResult<Self> {
        if options.dsn.is_empty() {
            return Err(ConfigError::connector(DRIVER_NAME, "dsn is required"));
        }
        if options.load_query.is_empty() {
            return Err(ConfigError::connector(DRIVER_NAME, "loadQuery is required"));
        }
        let format = match options.format {
            Format::Auto => Format::Json,
            concrete => concrete,
        };
        let schedule = if options.cron_spec.trim().is_empty() {
            None
        } else {
            Some(CronSchedule::parse(&options.cron_spec)?)
        };

        install_default_drivers();
        let pool = AnyPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect(&options.dsn)
            .await
            .map_err(sql_error)?;
        let mut conn = pool.acquire().await.map_err(sql_error)?;
        conn.ping().await.map_err(sql_error)?;
        drop(conn);

        let last_seen = Arc::new(Mutex::new(None));
        let poller = match (notifier, schedule) {
            (Some(notifier), Some(schedule)) => {
                let cancel = CancellationToken::new();
                let fetch_pool = pool.clone();
                let query = options.load_query.clone();
                let task = poll_for_changes(
                    DRIVER_NAME,
                    schedule,
                    cancel.clone(),
                    notifier,
                    Arc::clone(&last_seen),
                    move || {
                        let pool = fetch_pool.clone();
                        let query = query.clone();
                        async move { fetch_document(&pool, &query).await }
                    },
                );
                Some(Poller { cancel, task })
            }
            _ => None,
        };

        debug!(
            driver = DRIVER_NAME,
            %format,
            polling = poller.is_some(),
            "sql connector opened"
        );
        Ok(Self {
            pool,
            load_query: options.load_query,
            store_query: options.store_query,
            format,
            last_seen,
            poller,
        })
    }

    /// Whether changes are being polled
    pub fn is_polling(&self) -> bool {
        self.poller.is_some()
    }
}

#[async_trait]
impl Connector for SqlConnector {
    async fn load(&self) -> ConfigResult<Options> {
        let text = fetch_document(&self.pool, &self.load_query).await?;
        let options = Options::from_text(&text, self.format)?;
        *self.last_seen.lock() = Some(text);
        Ok(options)
    }

    async fn store(&self, options: &Options) -> ConfigResult<()> {
        if self.store_query.is_empty() {
            return Err(ConfigError::connector(DRIVER_NAME, "storeQuery is not configured"));
        }
        let text = options.to_text(Format::Json)?;
        sqlx::query::<Any>(&self.store_query)
            .bind(text)
            .execute(&self.pool)
            .await
            .map_err(sql_error)
            .with_driver_context(DRIVER_NAME, || "store query".into())?;
        Ok(())
    }

    async fn close(&mut self) -> ConfigResult<()> {
        if let Some(poller) = self.poller.take() {
            poller.cancel.cancel();
            poller.task.await.map_err(|e| {
                ConfigError::connector(DRIVER_NAME, format!("poll task failed: {e}"))
            })?;
        }
        if !self.pool.is_closed() {
            self.pool.close().await;
            debug!(driver = DRIVER_NAME, "sql connector closed");
        }
        Ok(())
    }
}

impl Drop for SqlConnector {
    fn drop(&mut self) {
        if let Some(poller) = &self.poller {
            poller.cancel.cancel();
        }
    }
}
