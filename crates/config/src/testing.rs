//! In-memory driver for tests.
//!
//! ```rust,ignore
//! let source = MemorySource::new(json!({"db": {"host": "a"}}));
//! let registry = DriverRegistry::new();
//! registry.register("memory", Arc::new(source.driver()))?;
//! let configurator = Configurator::open_with(&registry, "memory", &Options::new(), Default::default()).await?;
//! source.set(json!({"db": {"host": "b"}}));
//! source.touch(SourceEvent::Modified).await?;
//! ```

use crate::core::{ConfigError, ConfigResult};
use crate::driver::{ChangeNotifier, Connector, Driver, SourceEvent};
use crate::options::Options;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Default)]
struct Inner {
    content: Mutex<Value>,
    notifier: Mutex<Option<ChangeNotifier>>,
    stored: Mutex<Vec<Value>>,
    loads: AtomicUsize,
    closes: AtomicUsize,
    fail_loads: AtomicBool,
    fail_connect: AtomicBool,
}

/// Shared backing store for [`MemoryDriver`] connectors
#[derive(Clone, Default)]
pub struct MemorySource {
    inner: Arc<Inner>,
}

impl MemorySource {
    /// Create a store holding `content`
    pub fn new(content: Value) -> Self {
        let source = Self::default();
        source.set(content);
        source
    }

    /// A driver whose connectors read and write this store
    pub fn driver(&self) -> MemoryDriver {
        MemoryDriver {
            source: self.clone(),
        }
    }

    /// Replace the content without reporting a change
    pub fn set(&self, content: Value) {
        *self.inner.content.lock() = content;
    }

    /// Current content
    pub fn content(&self) -> Value {
        self.inner.content.lock().clone()
    }

    /// Report `event` through the most recent connector's notifier and
    /// wait for the reload outcome
    pub async fn touch(&self, event: SourceEvent) -> ConfigResult<()> {
        let notifier = self.inner.notifier.lock().clone();
        match notifier {
            Some(notifier) => notifier.notify(event).await,
            None => Err(ConfigError::Closed),
        }
    }

    /// Make subsequent loads fail
    pub fn fail_loads(&self, fail: bool) {
        self.inner.fail_loads.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent connects fail
    pub fn fail_connect(&self, fail: bool) {
        self.inner.fail_connect.store(fail, Ordering::SeqCst);
    }

    /// Number of loads served
    pub fn load_count(&self) -> usize {
        self.inner.loads.load(Ordering::SeqCst)
    }

    /// Number of connector closes
    pub fn close_count(&self) -> usize {
        self.inner.closes.load(Ordering::SeqCst)
    }

    /// Every tree stored so far, oldest first
    pub fn stored(&self) -> Vec<Value> {
        self.inner.stored.lock().clone()
    }
}

/// Driver backed by a [`MemorySource`]
#[derive(Clone)]
pub struct MemoryDriver {
    source: MemorySource,
}

#[async_trait]
impl Driver for MemoryDriver {
    async fn connect(
        &self,
        _props: &Options,
        notifier: Option<ChangeNotifier>,
    ) -> ConfigResult<Box<dyn Connector>> {
        if self.source.inner.fail_connect.load(Ordering::SeqCst) {
            return Err(ConfigError::connector("memory", "store unreachable"));
        }
        *self.source.inner.notifier.lock() = notifier;
        Ok(Box::new(MemoryConnector {
            source: self.source.clone(),
            closed: false,
        }))
    }
}

struct MemoryConnector {
    source: MemorySource,
    closed: bool,
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn load(&self) -> ConfigResult<Options> {
        let inner = &self.source.inner;
        if inner.fail_loads.load(Ordering::SeqCst) {
            return Err(ConfigError::connector("memory", "load failed"));
        }
        inner.loads.fetch_add(1, Ordering::SeqCst);
        let content = inner.content.lock().clone();
        Options::from_json(content)
    }

    async fn store(&self, options: &Options) -> ConfigResult<()> {
        let value = options.to_json_value();
        self.source.inner.stored.lock().push(value.clone());
        self.source.set(value);
        Ok(())
    }

    async fn close(&mut self) -> ConfigResult<()> {
        if !self.closed {
            self.closed = true;
            self.source.inner.notifier.lock().take();
            self.source.inner.closes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}
