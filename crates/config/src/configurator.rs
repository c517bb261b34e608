//! Hot-reloading configuration owner.
//!
//! A [`Configurator`] holds one connector and the last loaded tree. Parts
//! of the program implement [`Configurable`] and register for a section;
//! they receive the section once on registration and again whenever the
//! backing store reports a change that actually alters the tree.

use crate::core::{ConfigError, ConfigResult};
use crate::driver::{ChangeNotifier, ChangeReceiver, Connector, DriverRegistry, SourceEvent};
use crate::options::Options;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Receiver of configuration sections.
///
/// `configure` runs while the configurator is locked, so it must not call
/// back into the configurator.
pub trait Configurable: Send + Sync {
    /// Apply `section`. `first` is true only for the delivery made on
    /// registration.
    fn configure(&self, section: &Options, first: bool);
}

/// Tunables for [`Configurator::open_with`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfiguratorOptions {
    /// Change reports that may queue before connectors wait
    pub channel_capacity: usize,
}

impl Default for ConfiguratorOptions {
    fn default() -> Self {
        Self {
            channel_capacity: 16,
        }
    }
}

struct Registration {
    section: String,
    target: Arc<dyn Configurable>,
}

impl Registration {
    fn is(&self, target: &Arc<dyn Configurable>) -> bool {
        // Data pointers only; vtable pointers may differ between codegen units.
        std::ptr::eq(
            Arc::as_ptr(&self.target).cast::<()>(),
            Arc::as_ptr(target).cast::<()>(),
        )
    }
}

#[derive(Default)]
struct State {
    connector: Option<Box<dyn Connector>>,
    snapshot: Option<Options>,
    registrations: Vec<Registration>,
}

impl State {
    fn broadcast(&self) -> usize {
        let Some(snapshot) = &self.snapshot else {
            return 0;
        };
        for registration in &self.registrations {
            registration
                .target
                .configure(&snapshot.get(&registration.section), false);
        }
        self.registrations.len()
    }
}

struct Shared {
    driver: String,
    state: RwLock<State>,
}

impl Shared {
    async fn source_changed(&self, event: SourceEvent) -> ConfigResult<()> {
        let mut state = self.state.write().await;
        let Some(connector) = state.connector.as_ref() else {
            return Err(ConfigError::Closed);
        };
        let fresh = connector.load().await?;

        if state.snapshot.as_ref() == Some(&fresh) {
            debug!(driver = %self.driver, %event, "configuration unchanged");
            return Ok(());
        }

        state.snapshot = Some(fresh);
        let notified = state.broadcast();
        info!(
            driver = %self.driver,
            %event,
            notified,
            "configuration changed"
        );
        Ok(())
    }
}

/// Owner of a connector and the current configuration tree.
///
/// Dropping a configurator stops change handling but cannot close the
/// connector; call [`Configurator::close`] for an orderly shutdown.
pub struct Configurator {
    shared: Arc<Shared>,
    cancel: CancellationToken,
    listener: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl Configurator {
    /// Open `driver` from the global registry with default options
    pub async fn open(driver: &str, props: &Options) -> ConfigResult<Self> {
        Self::open_with(
            DriverRegistry::global(),
            driver,
            props,
            ConfiguratorOptions::default(),
        )
        .await
    }

    /// Connect through `driver`, load the initial tree and start handling
    /// change reports.
    ///
    /// If the initial load fails the connector is closed again and the
    /// load error is returned.
    pub async fn open_with(
        registry: &DriverRegistry,
        driver: &str,
        props: &Options,
        options: ConfiguratorOptions,
    ) -> ConfigResult<Self> {
        let factory = registry.driver_for(driver)?;
        let (notifier, receiver) = ChangeNotifier::channel(options.channel_capacity);
        let mut connector = factory.connect(props, Some(notifier)).await?;

        let snapshot = match connector.load().await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                drop(receiver);
                if let Err(close_err) = connector.close().await {
                    warn!(driver, error = %close_err, "failed to close connector after load error");
                }
                return Err(err);
            }
        };

        let shared = Arc::new(Shared {
            driver: driver.to_string(),
            state: RwLock::new(State {
                connector: Some(connector),
                snapshot: Some(snapshot),
                registrations: Vec::new(),
            }),
        });
        let cancel = CancellationToken::new();
        let listener = tokio::spawn(listen(Arc::clone(&shared), receiver, cancel.clone()));

        info!(driver, "configuration opened");
        Ok(Self {
            shared,
            cancel,
            listener: parking_lot::Mutex::new(Some(listener)),
        })
    }

    /// Name of the driver this configurator was opened with
    pub fn driver(&self) -> &str {
        &self.shared.driver
    }

    /// Whether a connector and a loaded tree are present
    pub async fn is_valid(&self) -> bool {
        let state = self.shared.state.read().await;
        state.connector.is_some() && state.snapshot.is_some()
    }

    /// The sub-tree for `section`, empty when nothing is loaded
    pub async fn get(&self, section: &str) -> Options {
        let state = self.shared.state.read().await;
        state
            .snapshot
            .as_ref()
            .map(|snapshot| snapshot.get(section))
            .unwrap_or_default()
    }

    /// Handle to the whole current tree
    pub async fn snapshot(&self) -> Option<Options> {
        self.shared.state.read().await.snapshot.clone()
    }

    /// Register `target` for `section` and deliver the section right away
    /// with `first` set. Registering the same target again does nothing.
    pub async fn register(&self, section: &str, target: Arc<dyn Configurable>) {
        let mut state = self.shared.state.write().await;
        if state.registrations.iter().any(|r| r.is(&target)) {
            return;
        }
        if let Some(snapshot) = &state.snapshot {
            target.configure(&snapshot.get(section), true);
        }
        state.registrations.push(Registration {
            section: section.to_string(),
            target,
        });
    }

    /// Number of registered targets
    pub async fn registered(&self) -> usize {
        self.shared.state.read().await.registrations.len()
    }

    /// Deliver the current sections to every registered target, in
    /// registration order
    pub async fn configure(&self) {
        let state = self.shared.state.write().await;
        state.broadcast();
    }

    /// Reload from the connector, optionally redelivering to every target
    /// even if nothing changed. Does nothing once closed.
    pub async fn load(&self, reconfigure: bool) -> ConfigResult<()> {
        let mut state = self.shared.state.write().await;
        let Some(connector) = state.connector.as_ref() else {
            return Ok(());
        };
        let fresh = connector.load().await?;
        state.snapshot = Some(fresh);
        if reconfigure {
            state.broadcast();
        }
        Ok(())
    }

    /// Persist the current tree through the connector. Does nothing once
    /// closed.
    pub async fn store(&self) -> ConfigResult<()> {
        let state = self.shared.state.read().await;
        match (&state.connector, &state.snapshot) {
            (Some(connector), Some(snapshot)) => connector.store(snapshot).await,
            _ => Ok(()),
        }
    }

    /// Close the connector, drop the tree and stop change handling.
    ///
    /// Returns once the connector's background work has finished. Later
    /// calls are no-ops.
    pub async fn close(&self) -> ConfigResult<()> {
        let connector = {
            let mut state = self.shared.state.write().await;
            state.snapshot = None;
            state.connector.take()
        };

        let result = match connector {
            Some(mut connector) => {
                let result = connector.close().await;
                info!(driver = %self.shared.driver, "configuration closed");
                result
            }
            None => Ok(()),
        };

        self.cancel.cancel();
        let listener = self.listener.lock().take();
        if let Some(listener) = listener {
            if let Err(err) = listener.await {
                warn!(driver = %self.shared.driver, error = %err, "change listener panicked");
            }
        }
        result
    }
}

async fn listen(shared: Arc<Shared>, mut receiver: ChangeReceiver, cancel: CancellationToken) {
    loop {
        let request = tokio::select! {
            () = cancel.cancelled() => break,
            request = receiver.recv() => match request {
                Some(request) => request,
                None => break,
            },
        };

        let event = request.event();
        let result = shared.source_changed(event).await;
        if let Err(err) = &result {
            warn!(driver = %shared.driver, %event, error = %err, "configuration reload failed");
        }
        request.respond(result);
    }
    debug!(driver = %shared.driver, "change listener stopped");
}

impl fmt::Debug for Configurator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configurator")
            .field("driver", &self.shared.driver)
            .finish_non_exhaustive()
    }
}

impl Drop for Configurator {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Ok(state) = self.shared.state.try_read() {
            if state.connector.is_some() {
                debug!(
                    driver = %self.shared.driver,
                    "configurator dropped without close; connector left open"
                );
            }
        }
    }
}
