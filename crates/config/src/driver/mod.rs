//! Backend contracts.
//!
//! A [`Driver`] is a named factory registered in a [`DriverRegistry`]. It
//! turns driver-specific properties into a live [`Connector`] that loads
//! and stores whole option trees. Connectors that can observe their
//! backing store report changes through a [`ChangeNotifier`] and receive
//! the outcome of the resulting reload.

mod registry;

pub use registry::DriverRegistry;

use crate::core::{ConfigError, ConfigResult};
use crate::options::Options;
use async_trait::async_trait;
use std::fmt;
use tokio::sync::{mpsc, oneshot};

/// Kind of change observed in a backing store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceEvent {
    /// The store disappeared
    Removed,
    /// The store content changed
    Modified,
}

impl fmt::Display for SourceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceEvent::Removed => f.write_str("removed"),
            SourceEvent::Modified => f.write_str("modified"),
        }
    }
}

/// Factory for connectors of one backend kind
#[async_trait]
pub trait Driver: Send + Sync {
    /// Build a connector from `props`.
    ///
    /// When `notifier` is present the connector should watch its store and
    /// call [`ChangeNotifier::notify`] on changes. Connecting must fail if
    /// the store is unreachable.
    async fn connect(
        &self,
        props: &Options,
        notifier: Option<ChangeNotifier>,
    ) -> ConfigResult<Box<dyn Connector>>;
}

/// Live link to a backing store
#[async_trait]
pub trait Connector: Send + Sync {
    /// Fetch and decode the whole configuration
    async fn load(&self) -> ConfigResult<Options>;

    /// Persist the whole configuration
    async fn store(&self, options: &Options) -> ConfigResult<()>;

    /// Stop watching and release resources. Returns once background work
    /// has finished; later calls are no-ops.
    async fn close(&mut self) -> ConfigResult<()>;
}

/// A change report waiting for its reload outcome
#[derive(Debug)]
pub struct ChangeRequest {
    event: SourceEvent,
    reply: oneshot::Sender<ConfigResult<()>>,
}

impl ChangeRequest {
    /// Event being reported
    pub fn event(&self) -> SourceEvent {
        self.event
    }

    /// Send the reload outcome back to the connector
    pub fn respond(self, result: ConfigResult<()>) {
        // The connector may have stopped waiting.
        let _ = self.reply.send(result);
    }
}

/// Sending half handed to connectors
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    tx: mpsc::Sender<ChangeRequest>,
}

/// Receiving half owned by whoever applies reloads
#[derive(Debug)]
pub struct ChangeReceiver {
    rx: mpsc::Receiver<ChangeRequest>,
}

impl ChangeNotifier {
    /// Create a notifier and its receiver with room for `capacity` pending reports
    pub fn channel(capacity: usize) -> (ChangeNotifier, ChangeReceiver) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (ChangeNotifier { tx }, ChangeReceiver { rx })
    }

    /// Report a change and wait for the reload outcome.
    ///
    /// Fails with [`ConfigError::Closed`] once the receiver is gone.
    pub async fn notify(&self, event: SourceEvent) -> ConfigResult<()> {
        let (reply, outcome) = oneshot::channel();
        self.tx
            .send(ChangeRequest { event, reply })
            .await
            .map_err(|_| ConfigError::Closed)?;
        outcome.await.map_err(|_| ConfigError::Closed)?
    }

    /// Whether the receiving side has been dropped
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl ChangeReceiver {
    /// Next pending report, or `None` once every notifier is dropped
    pub async fn recv(&mut self) -> Option<ChangeRequest> {
        self.rx.recv().await
    }
}
