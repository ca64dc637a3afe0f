use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tracing::debug;

use crate::{Error, ListenerId, Result, Watch};

/// Name of the watch returned by [`Registry::main`].
pub const MAIN_WATCH: &str = "main";

/// Maps watch names to [`Watch`] instances, creating them lazily on first
/// lookup.
///
/// Deliberately an ordinary constructible value rather than a process
/// global: hold one at the composition root (or one per test) and hand it
/// to whoever needs to signal or observe readiness.
#[derive(Default)]
pub struct Registry {
    watches: DashMap<String, Arc<Watch>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the watch registered under `name`, creating it when absent.
    pub fn get(&self, name: &str) -> Result<Arc<Watch>> {
        if name.trim().is_empty() {
            return Err(Error::EmptyWatchName);
        }
        Ok(self.get_or_create(name))
    }

    /// Unconditionally builds a fresh watch under `name`, replacing any
    /// existing entry. Holders of the previous instance keep a valid but
    /// stale watch that is no longer reachable through the registry.
    pub fn recreate(&self, name: &str) -> Result<Arc<Watch>> {
        if name.trim().is_empty() {
            return Err(Error::EmptyWatchName);
        }
        debug!(watch = name, "force-recreating watch");
        let watch = Watch::new(name);
        self.watches.insert(name.to_owned(), Arc::clone(&watch));
        Ok(watch)
    }

    /// The conventional top-level watch, `"main"`.
    pub fn main(&self) -> Arc<Watch> {
        self.get_or_create(MAIN_WATCH)
    }

    /// Sugar for `main().add_listener(callback, delay)`.
    pub fn attach_to_main<F>(&self, callback: F, delay: Option<Duration>) -> Option<ListenerId>
    where
        F: FnOnce(Arc<Watch>) + Send + 'static,
    {
        self.main().add_listener(callback, delay)
    }

    /// Disposes every watch, then empties the registry. Meant for test
    /// isolation rather than steady-state use.
    pub fn reset(&self) {
        for entry in self.watches.iter() {
            entry.value().dispose();
        }
        self.watches.clear();
        debug!("registry reset");
    }

    pub fn len(&self) -> usize {
        self.watches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.watches.is_empty()
    }

    fn get_or_create(&self, name: &str) -> Arc<Watch> {
        let watch = self
            .watches
            .entry(name.to_owned())
            .or_insert_with(|| {
                debug!(watch = name, "creating watch");
                Watch::new(name)
            });
        Arc::clone(&watch)
    }
}
