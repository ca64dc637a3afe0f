use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use nanoid::nanoid;
use tokio::time::sleep;

use super::{CheckArgs, Watch};

/// Opaque registration handle returned when a listener is queued, usable
/// with [`Watch::remove_listener`] / [`Watch::remove_check_listener`] to
/// cancel it before it fires.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListenerId(String);

impl ListenerId {
    pub(crate) fn generate() -> Self {
        Self(nanoid!())
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub(crate) type WatchCallback = Box<dyn FnOnce(Arc<Watch>) + Send + 'static>;
pub(crate) type CheckCallback = Box<dyn FnOnce(CheckArgs) + Send + 'static>;

pub(crate) struct WatchListener {
    pub(crate) id: ListenerId,
    pub(crate) delay: Option<Duration>,
    pub(crate) callback: WatchCallback,
}

impl WatchListener {
    pub(crate) fn new(callback: WatchCallback, delay: Option<Duration>) -> Self {
        Self {
            id: ListenerId::generate(),
            delay,
            callback,
        }
    }
}

pub(crate) struct CheckListener {
    pub(crate) id: ListenerId,
    pub(crate) delay: Option<Duration>,
    pub(crate) callback: CheckCallback,
}

impl CheckListener {
    pub(crate) fn new(callback: CheckCallback, delay: Option<Duration>) -> Self {
        Self {
            id: ListenerId::generate(),
            delay,
            callback,
        }
    }
}

/// Fires a drained whole-watch batch in registration order. Zero/absent
/// delays run synchronously within the current pass; non-zero delays are
/// handed to the timer as fire-and-forget tasks, so ordering across
/// different delays is not preserved.
pub(crate) fn dispatch_watch_listeners(records: Vec<WatchListener>, watch: &Arc<Watch>) {
    for record in records {
        match record.delay {
            Some(delay) if !delay.is_zero() => {
                let watch = Arc::clone(watch);
                tokio::spawn(async move {
                    sleep(delay).await;
                    (record.callback)(watch);
                });
            }
            _ => (record.callback)(Arc::clone(watch)),
        }
    }
}

/// Fires a drained check-scoped batch in registration order, each callback
/// receiving the check's recorded arguments. Delay handling matches
/// [`dispatch_watch_listeners`].
pub(crate) fn dispatch_check_listeners(records: Vec<CheckListener>, args: &CheckArgs) {
    for record in records {
        let args = Arc::clone(args);
        match record.delay {
            Some(delay) if !delay.is_zero() => {
                tokio::spawn(async move {
                    sleep(delay).await;
                    (record.callback)(args);
                });
            }
            _ => (record.callback)(args),
        }
    }
}
