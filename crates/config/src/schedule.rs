//! Cron-driven polling for connectors that cannot be notified by their store.

use crate::core::{ConfigError, ConfigResult};
use crate::driver::{ChangeNotifier, SourceEvent};
use crate::duration::parse_duration;
use chrono::Utc;
use parking_lot::Mutex;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// When to poll.
///
/// Accepts standard five-field cron expressions (`"*/5 * * * *"`), six or
/// seven fields with seconds first (`"*/10 * * * * *"`), the `@hourly`
/// style shortcuts and `@every <duration>` (`"@every 30s"`).
#[derive(Debug, Clone)]
pub struct CronSchedule {
    expr: String,
    kind: Kind,
}

#[derive(Debug, Clone)]
enum Kind {
    Cron(Box<cron::Schedule>),
    Every(Duration),
}

impl CronSchedule {
    /// Parse a schedule expression
    pub fn parse(expr: &str) -> ConfigResult<Self> {
        let trimmed = expr.trim();
        let invalid = |message: String| {
            ConfigError::type_error(
                format!("invalid cron spec '{trimmed}': {message}"),
                "cron schedule",
            )
        };

        if let Some(every) = trimmed.strip_prefix("@every") {
            let interval = parse_duration(every.trim())
                .filter(|d| !d.is_zero())
                .ok_or_else(|| invalid("expected a positive duration".into()))?;
            return Ok(Self {
                expr: trimmed.to_string(),
                kind: Kind::Every(interval),
            });
        }

        let normalized = if trimmed.split_whitespace().count() == 5 {
            format!("0 {trimmed}")
        } else {
            trimmed.to_string()
        };
        let schedule = cron::Schedule::from_str(&normalized).map_err(|e| invalid(e.to_string()))?;
        Ok(Self {
            expr: trimmed.to_string(),
            kind: Kind::Cron(Box::new(schedule)),
        })
    }

    /// The expression as written
    pub fn expr(&self) -> &str {
        &self.expr
    }

    /// Time until the next firing, or `None` if the schedule never fires again
    pub fn next_delay(&self) -> Option<Duration> {
        match &self.kind {
            Kind::Every(interval) => Some(*interval),
            Kind::Cron(schedule) => {
                let now = Utc::now();
                let next = schedule.after(&now).next()?;
                Some((next - now).to_std().unwrap_or(Duration::ZERO))
            }
        }
    }
}

/// Run `tick` on every firing of `schedule` until `cancel` fires.
///
/// A tick in progress is not interrupted; cancellation is observed between
/// ticks and while waiting.
pub fn spawn_poller<F, Fut>(
    schedule: CronSchedule,
    cancel: CancellationToken,
    mut tick: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            let Some(delay) = schedule.next_delay() else {
                debug!(schedule = %schedule.expr(), "schedule exhausted");
                break;
            };
            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(delay) => tick().await,
            }
        }
        debug!(schedule = %schedule.expr(), "poller stopped");
    })
}

/// Poll `fetch` on `schedule` and report [`SourceEvent::Modified`] when the
/// fetched text differs from `last_seen`.
///
/// `last_seen` is shared with the connector's `load`, which records what it
/// decoded. Nothing is reported until a first load has been recorded.
pub fn poll_for_changes<F, Fut>(
    driver: &'static str,
    schedule: CronSchedule,
    cancel: CancellationToken,
    notifier: ChangeNotifier,
    last_seen: Arc<Mutex<Option<String>>>,
    mut fetch: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ConfigResult<String>> + Send + 'static,
{
    let stop = cancel.clone();
    spawn_poller(schedule, cancel, move || {
        let fetched = fetch();
        let notifier = notifier.clone();
        let last_seen = Arc::clone(&last_seen);
        let stop = stop.clone();
        async move {
            let text = match fetched.await {
                Ok(text) => text,
                Err(err) => {
                    warn!(driver, error = %err, "failed to poll configuration");
                    return;
                }
            };
            let changed = last_seen
                .lock()
                .as_ref()
                .is_some_and(|previous| *previous != text);
            if !changed {
                return;
            }
            tokio::select! {
                () = stop.cancelled() => {}
                result = notifier.notify(SourceEvent::Modified) => {
                    if let Err(err) = result {
                        warn!(driver, error = %err, "configuration change handler failed");
                    }
                }
            }
        }
    })
}
