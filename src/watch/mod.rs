mod listener;
mod shortcut;

pub use listener::ListenerId;
pub use shortcut::CheckShortcut;

use listener::{
    dispatch_check_listeners, dispatch_watch_listeners, CheckListener, WatchListener,
};

#[cfg(test)]
mod listener_test;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;

use crate::{Error, Result};

/// Arguments recorded when a check completes, shared with every listener
/// that observes the completion.
pub type CheckArgs = Arc<[Value]>;

pub(crate) fn empty_args() -> CheckArgs {
    Arc::from(Vec::<Value>::new())
}

/// One named sub-condition of a watch. `done` is monotonic; `args` stays
/// `None` until the check completes.
struct Check {
    done: bool,
    args: Option<CheckArgs>,
}

impl Check {
    fn new() -> Self {
        Self {
            done: false,
            args: None,
        }
    }
}

#[derive(Default)]
struct WatchInner {
    checks: HashMap<String, Check>,
    check_listeners: HashMap<String, Vec<CheckListener>>,
    watch_listeners: Vec<WatchListener>,
    done: bool,
}

/// Listener batches drained under the lock when a watch transitions to Done,
/// fired after the lock is released. Leftover check-scoped listeners go
/// first, each paired with its check's recorded arguments.
struct DoneBatch {
    check_batches: Vec<(Vec<CheckListener>, CheckArgs)>,
    watch_listeners: Vec<WatchListener>,
}

impl WatchInner {
    fn all_checks_done(&self) -> bool {
        self.checks.values().all(|check| check.done)
    }

    fn recorded_args(&self, check_id: &str) -> CheckArgs {
        self.checks
            .get(check_id)
            .and_then(|check| check.args.clone())
            .unwrap_or_else(empty_args)
    }

    fn drain_on_done(&mut self) -> DoneBatch {
        let drained: Vec<(String, Vec<CheckListener>)> =
            self.check_listeners.drain().collect();
        let check_batches = drained
            .into_iter()
            .map(|(check_id, records)| {
                let args = self.recorded_args(&check_id);
                (records, args)
            })
            .collect();
        DoneBatch {
            check_batches,
            watch_listeners: std::mem::take(&mut self.watch_listeners),
        }
    }
}

enum CheckOutcome {
    Unknown,
    AlreadyDone,
    Completed,
}

/// A named unit of completion tracking.
///
/// Holds zero or more named checks, listener queues, and a monotonic `done`
/// flag. Obtained through [`crate::Registry`]; state lives behind a mutex so
/// a watch can be signalled from any task, and listeners are always invoked
/// with the lock released so they may re-enter the watch.
pub struct Watch {
    name: String,
    inner: Mutex<WatchInner>,
}

impl Watch {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            inner: Mutex::new(WatchInner::default()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registers a check to wait for before the watch can complete.
    /// Idempotent; chainable.
    pub fn add_check(&self, check_id: &str) -> Result<&Self> {
        if check_id.trim().is_empty() {
            return Err(Error::EmptyCheckId);
        }
        let mut inner = self.inner.lock();
        inner
            .checks
            .entry(check_id.to_owned())
            .or_insert_with(Check::new);
        Ok(self)
    }

    /// Marks a check complete with no arguments. See [`Watch::check_with`].
    pub fn check(self: &Arc<Self>, check_id: &str) -> &Arc<Self> {
        self.check_with(check_id, Vec::new())
    }

    /// Marks a check complete, recording `args` as its result.
    ///
    /// Fires that check's listeners in registration order, each receiving the
    /// recorded arguments. If this was the last outstanding check, the watch
    /// transitions to Done and the completion pass runs: any remaining
    /// check-scoped listeners fire first, then every whole-watch listener
    /// receives the watch itself. All fired listener records are discarded.
    ///
    /// Tolerated no-ops: an already-done check, and an unknown check id on a
    /// watch that still has pending checks. An unknown id on a watch with no
    /// checks at all completes the watch vacuously.
    pub fn check_with(self: &Arc<Self>, check_id: &str, args: Vec<Value>) -> &Arc<Self> {
        let args: CheckArgs = Arc::from(args);
        let mut inner = self.inner.lock();

        let outcome = match inner.checks.get_mut(check_id) {
            None => CheckOutcome::Unknown,
            Some(check) if check.done => CheckOutcome::AlreadyDone,
            Some(check) => {
                check.done = true;
                check.args = Some(Arc::clone(&args));
                CheckOutcome::Completed
            }
        };

        match outcome {
            CheckOutcome::Unknown => {
                if inner.checks.is_empty() && !inner.done {
                    inner.done = true;
                    let batch = inner.drain_on_done();
                    drop(inner);
                    debug!(watch = %self.name, "watch complete, no checks declared");
                    self.fire_completion(batch);
                } else {
                    drop(inner);
                    debug!(
                        watch = %self.name,
                        check = check_id,
                        "ignoring completion of unknown check"
                    );
                }
            }
            CheckOutcome::AlreadyDone => {
                drop(inner);
                debug!(watch = %self.name, check = check_id, "check already complete");
            }
            CheckOutcome::Completed => {
                let check_batch = inner.check_listeners.remove(check_id).unwrap_or_default();
                let done_batch = if !inner.done && inner.all_checks_done() {
                    inner.done = true;
                    Some(inner.drain_on_done())
                } else {
                    None
                };
                drop(inner);

                debug!(watch = %self.name, check = check_id, "check complete");
                dispatch_check_listeners(check_batch, &args);
                if let Some(batch) = done_batch {
                    debug!(watch = %self.name, "watch complete");
                    self.fire_completion(batch);
                }
            }
        }
        self
    }

    fn fire_completion(self: &Arc<Self>, batch: DoneBatch) {
        for (records, args) in batch.check_batches {
            dispatch_check_listeners(records, &args);
        }
        dispatch_watch_listeners(batch.watch_listeners, self);
    }

    /// Queues a listener to fire once every check is done; the callback
    /// receives the watch itself.
    ///
    /// If the watch is already done the listener fires now (after `delay`,
    /// when one is given) and `None` is returned instead of a removable
    /// registration id.
    pub fn add_listener<F>(self: &Arc<Self>, callback: F, delay: Option<Duration>) -> Option<ListenerId>
    where
        F: FnOnce(Arc<Watch>) + Send + 'static,
    {
        let mut inner = self.inner.lock();
        if inner.done {
            drop(inner);
            dispatch_watch_listeners(
                vec![WatchListener::new(Box::new(callback), delay)],
                self,
            );
            return None;
        }
        let record = WatchListener::new(Box::new(callback), delay);
        let id = record.id.clone();
        inner.watch_listeners.push(record);
        Some(id)
    }

    /// Queues a listener on one specific check; the callback receives the
    /// arguments recorded when that check completes.
    ///
    /// Registers the check implicitly when it is unknown. If the watch or
    /// the check is already done the listener fires now with the recorded
    /// arguments (empty if none) and `Ok(None)` is returned.
    pub fn add_check_listener<F>(
        &self,
        check_id: &str,
        callback: F,
        delay: Option<Duration>,
    ) -> Result<Option<ListenerId>>
    where
        F: FnOnce(CheckArgs) + Send + 'static,
    {
        if check_id.trim().is_empty() {
            return Err(Error::EmptyCheckId);
        }
        let mut inner = self.inner.lock();

        let already_done = inner.done
            || inner
                .checks
                .get(check_id)
                .map(|check| check.done)
                .unwrap_or(false);
        if already_done {
            let args = inner.recorded_args(check_id);
            drop(inner);
            dispatch_check_listeners(
                vec![CheckListener::new(Box::new(callback), delay)],
                &args,
            );
            return Ok(None);
        }

        inner
            .checks
            .entry(check_id.to_owned())
            .or_insert_with(Check::new);
        let record = CheckListener::new(Box::new(callback), delay);
        let id = record.id.clone();
        inner
            .check_listeners
            .entry(check_id.to_owned())
            .or_default()
            .push(record);
        Ok(Some(id))
    }

    /// Removes a not-yet-fired whole-watch listener. Unknown or already
    /// consumed ids are ignored.
    pub fn remove_listener(&self, id: &ListenerId) -> &Self {
        let mut inner = self.inner.lock();
        inner.watch_listeners.retain(|record| record.id != *id);
        self
    }

    /// Removes a not-yet-fired check-scoped listener, searching every
    /// check's queue (the id alone does not encode the check). Unknown or
    /// already consumed ids are ignored.
    pub fn remove_check_listener(&self, id: &ListenerId) -> &Self {
        let mut inner = self.inner.lock();
        for records in inner.check_listeners.values_mut() {
            records.retain(|record| record.id != *id);
        }
        self
    }

    pub fn is_done(&self) -> bool {
        self.inner.lock().done
    }

    /// Whether a specific check has completed. Unknown ids report `false`.
    pub fn is_done_check(&self, check_id: &str) -> bool {
        self.inner
            .lock()
            .checks
            .get(check_id)
            .map(|check| check.done)
            .unwrap_or(false)
    }

    /// Arguments recorded when `check_id` completed; `None` until then.
    pub fn args(&self, check_id: &str) -> Option<CheckArgs> {
        self.inner
            .lock()
            .checks
            .get(check_id)
            .and_then(|check| check.args.clone())
    }

    /// Ids of every declared check, in no particular order.
    pub fn check_ids(&self) -> Vec<String> {
        self.inner.lock().checks.keys().cloned().collect()
    }

    /// Returns a cloneable completion handle bound to one check, registering
    /// the check when it is unknown. Invoking the handle is equivalent to
    /// calling [`Watch::check_with`] on this watch.
    pub fn shortcut(self: &Arc<Self>, check_id: &str) -> Result<CheckShortcut> {
        self.add_check(check_id)?;
        Ok(CheckShortcut::new(Arc::downgrade(self), check_id.to_owned()))
    }

    /// Clears all checks and every listener queue. The `done` flag is left
    /// untouched; later `check()` calls on this instance fire nothing.
    pub fn dispose(&self) {
        let mut inner = self.inner.lock();
        inner.checks.clear();
        inner.check_listeners.clear();
        inner.watch_listeners.clear();
        debug!(watch = %self.name, "watch disposed");
    }
}

impl fmt::Debug for Watch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Watch")
            .field("name", &self.name)
            .field("done", &inner.done)
            .field("checks", &inner.checks.len())
            .field("watch_listeners", &inner.watch_listeners.len())
            .finish()
    }
}
