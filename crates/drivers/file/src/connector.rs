use std::collections::VecDeque;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hotconf_config::{
    ChangeNotifier, ConfigError, ConfigResult, Connector, Format, Options, SourceEvent,
};
use notify::event::{AccessKind, AccessMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{DRIVER_NAME, FileDriverOptions};

const MIN_EVENT_DELAY: Duration = Duration::from_millis(10);

/// Connector reading and writing one document on disk
pub struct FileConnector {
    path: PathBuf,
    format: Format,
    watch: Option<Watch>,
}

struct Watch {
    _watcher: Mutex<RecommendedWatcher>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl FileConnector {
    /// Check the document exists and, when `notifier` is given, start
    /// watching it.
    pub fn open(options: FileDriverOptions, notifier: Option<ChangeNotifier>) -> ConfigResult<Self> {
        if options.file_name.as_os_str().is_empty() {
            return Err(ConfigError::connector(DRIVER_NAME, "fileName is required"));
        }
        let format = options.format.resolve(&options.file_name)?;
        std::fs::File::open(&options.file_name)
            .map_err(|e| ConfigError::io(&options.file_name, &e))?;

        let watch = match notifier {
            Some(notifier) => Some(Watch::start(&options, notifier)?),
            None => None,
        };

        debug!(
            path = %options.file_name.display(),
            %format,
            watching = watch.is_some(),
            "file connector opened"
        );
        Ok(Self {
            path: options.file_name,
            format,
            watch,
        })
    }

    /// Path of the document
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether changes are being watched
    pub fn is_watching(&self) -> bool {
        self.watch.is_some()
    }
}

impl Watch {
    fn start(options: &FileDriverOptions, notifier: ChangeNotifier) -> ConfigResult<Self> {
        let path = &options.file_name;
        let target: OsString = path
            .file_name()
            .map(OsString::from)
            .ok_or_else(|| ConfigError::connector(DRIVER_NAME, "fileName has no file component"))?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let capacity = options.event_queue_size.max(1);
        let pending = Arc::new(Mutex::new(VecDeque::with_capacity(capacity)));
        let queue = Arc::clone(&pending);

        // Watch the directory: editors often replace the file instead of
        // writing it in place.
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            match res {
                Ok(event) => {
                    if !event
                        .paths
                        .iter()
                        .any(|p| p.file_name() == Some(target.as_os_str()))
                    {
                        return;
                    }
                    let kind = match event.kind {
                        EventKind::Remove(_) => SourceEvent::Removed,
                        EventKind::Create(_)
                        | EventKind::Modify(_)
                        | EventKind::Access(AccessKind::Close(AccessMode::Write)) => {
                            SourceEvent::Modified
                        }
                        _ => return,
                    };
                    let mut queue = queue.lock();
                    if queue.len() >= capacity {
                        queue.pop_front();
                    }
                    queue.push_back(kind);
                }
                Err(err) => warn!(driver = DRIVER_NAME, error = %err, "file watch error"),
            }
        })
        .map_err(|e| ConfigError::watch_error(e.to_string()))?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|e| {
                ConfigError::watch_error(format!("failed to watch {}: {e}", dir.display()))
            })?;

        let cancel = CancellationToken::new();
        let task = tokio::spawn(drain_events(
            pending,
            notifier,
            options.event_delay.get().max(MIN_EVENT_DELAY),
            cancel.clone(),
            path.clone(),
        ));

        Ok(Self {
            _watcher: Mutex::new(watcher),
            cancel,
            task,
        })
    }
}

async fn drain_events(
    pending: Arc<Mutex<VecDeque<SourceEvent>>>,
    notifier: ChangeNotifier,
    delay: Duration,
    cancel: CancellationToken,
    path: PathBuf,
) {
    let mut ticker = tokio::time::interval(delay);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let latest = pending.lock().drain(..).last();
        let Some(event) = latest else {
            continue;
        };

        debug!(path = %path.display(), %event, "configuration file changed");
        tokio::select! {
            () = cancel.cancelled() => break,
            result = notifier.notify(event) => {
                if let Err(err) = result {
                    warn!(
                        driver = DRIVER_NAME,
                        path = %path.display(),
                        error = %err,
                        "configuration change handler failed"
                    );
                }
            }
        }
    }
    debug!(path = %path.display(), "file watch stopped");
}

#[async_trait]
impl Connector for FileConnector {
    async fn load(&self) -> ConfigResult<Options> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| ConfigError::io(&self.path, &e))?;
        Ok(Options::from_text(&text, self.format)?.with_file_path(&self.path))
    }

    async fn store(&self, options: &Options) -> ConfigResult<()> {
        let text = options.to_text(self.format)?;
        tokio::fs::write(&self.path, text)
            .await
            .map_err(|e| ConfigError::io(&self.path, &e))
    }

    async fn close(&mut self) -> ConfigResult<()> {
        let Some(watch) = self.watch.take() else {
            return Ok(());
        };
        drop(watch._watcher);
        watch.cancel.cancel();
        watch.task.await.map_err(|e| {
            ConfigError::connector(DRIVER_NAME, format!("watch task failed: {e}"))
        })?;
        debug!(path = %self.path.display(), "file connector closed");
        Ok(())
    }
}

impl Drop for FileConnector {
    fn drop(&mut self) {
        if let Some(watch) = &self.watch {
            watch.cancel.cancel();
        }
    }
}
