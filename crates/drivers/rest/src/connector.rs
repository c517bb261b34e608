use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use hotconf_config::schedule::{CronSchedule, poll_for_changes};
use hotconf_config::{
    ChangeNotifier, ConfigError, ConfigResult, ConfigResultExt, Connector, Format, Options,
};
use parking_lot::Mutex;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use crate::{DRIVER_NAME, RestDriverOptions};

/// Connector fetching the document over HTTP
pub struct RestConnector {
    endpoint: Arc<Endpoint>,
    format: Format,
    last_seen: Arc<Mutex<Option<String>>>,
    poller: Option<Poller>,
}

struct Poller {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

struct Endpoint {
    client: Client,
    url: Url,
    credentials: Option<(String, String)>,
}

fn http_error(err: reqwest::Error) -> ConfigError {
    ConfigError::connector(DRIVER_NAME, err.to_string())
}

impl Endpoint {
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Some((user, password)) => request.basic_auth(user, Some(password)),
            None => request,
        }
    }

    async fn fetch(&self) -> ConfigResult<String> {
        self.authorize(self.client.get(self.url.clone()))
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(http_error)?
            .text()
            .await
            .map_err(http_error)
    }

    async fn post(&self, body: String) -> ConfigResult<()> {
        self.authorize(self.client.post(self.url.clone()))
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(http_error)?;
        Ok(())
    }
}

impl RestConnector {
    /// Check the document can be fetched and, when `notifier` is given and
    /// a schedule is configured, start polling for changes.
    pub async fn open(
        options: RestDriverOptions,
        notifier: Option<ChangeNotifier>,
    ) -> ConfigResult<Self> {
        if options.uri.is_empty() {
            return Err(ConfigError::connector(DRIVER_NAME, "uri is required"));
        }
        let url = Url::parse(&options.uri).map_err(|e| {
            ConfigError::connector(DRIVER_NAME, format!("invalid uri '{}': {e}", options.uri))
        })?;
        let format = match options.format {
            Format::Auto => Format::from_path(Path::new(url.path())).unwrap_or(Format::Json),
            concrete => concrete,
        };
        let schedule = if options.cron_spec.trim().is_empty() {
            None
        } else {
            Some(CronSchedule::parse(&options.cron_spec)?)
        };

        let mut builder = Client::builder();
        if !options.timeout.get().is_zero() {
            builder = builder.timeout(options.timeout.get());
        }
        let client = builder.build().map_err(http_error)?;
        let credentials = options
            .credentials()
            .map(|(user, password)| (user.to_string(), password.to_string()));
        let endpoint = Arc::new(Endpoint {
            client,
            url,
            credentials,
        });

        endpoint
            .fetch()
            .await
            .with_driver_context(DRIVER_NAME, || "initial fetch".into())?;

        let last_seen = Arc::new(Mutex::new(None));
        let poller = match (notifier, schedule) {
            (Some(notifier), Some(schedule)) => {
                let cancel = CancellationToken::new();
                let target = Arc::clone(&endpoint);
                let task = poll_for_changes(
                    DRIVER_NAME,
                    schedule,
                    cancel.clone(),
                    notifier,
                    Arc::clone(&last_seen),
                    move || {
                        let endpoint = Arc::clone(&target);
                        async move { endpoint.fetch().await }
                    },
                );
                Some(Poller { cancel, task })
            }
            _ => None,
        };

        debug!(
            driver = DRIVER_NAME,
            uri = %endpoint.url,
            %format,
            polling = poller.is_some(),
            "rest connector opened"
        );
        Ok(Self {
            endpoint,
            format,
            last_seen,
            poller,
        })
    }

    /// Address of the document
    pub fn url(&self) -> &Url {
        &self.endpoint.url
    }

    /// Whether changes are being polled
    pub fn is_polling(&self) -> bool {
        self.poller.is_some()
    }
}

#[async_trait]
impl Connector for RestConnector {
    async fn load(&self) -> ConfigResult<Options> {
        let text = self.endpoint.fetch().await?;
        let options = Options::from_text(&text, self.format)?;
        *self.last_seen.lock() = Some(text);
        Ok(options)
    }

    async fn store(&self, options: &Options) -> ConfigResult<()> {
        self.endpoint.post(options.to_text(Format::Json)?).await
    }

    async fn close(&mut self) -> ConfigResult<()> {
        let Some(poller) = self.poller.take() else {
            return Ok(());
        };
        poller.cancel.cancel();
        poller.task.await.map_err(|e| {
            ConfigError::connector(DRIVER_NAME, format!("poll task failed: {e}"))
        })?;
        debug!(driver = DRIVER_NAME, uri = %self.endpoint.url, "rest connector closed");
        Ok(())
    }
}

impl Drop for RestConnector {
    fn drop(&mut self) {
        if let Some(poller) = &self.poller {
            poller.cancel.cancel();
        }
    }
}
