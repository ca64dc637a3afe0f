use std::sync::Weak;

use serde_json::Value;
use tracing::warn;

use super::Watch;

/// A cloneable completion handle bound to one check of one watch, the
/// explicit replacement for a per-check completion property.
///
/// Holds only a weak reference, so an outstanding shortcut does not keep a
/// discarded watch alive; invoking it after the watch is gone is a no-op.
#[derive(Clone)]
pub struct CheckShortcut {
    watch: Weak<Watch>,
    check_id: String,
}

impl CheckShortcut {
    pub(crate) fn new(watch: Weak<Watch>, check_id: String) -> Self {
        Self { watch, check_id }
    }

    pub fn check_id(&self) -> &str {
        &self.check_id
    }

    /// Marks the bound check complete with no arguments.
    pub fn complete(&self) {
        self.complete_with(Vec::new());
    }

    /// Marks the bound check complete, recording `args` as its result.
    /// Equivalent to `watch.check_with(check_id, args)`.
    pub fn complete_with(&self, args: Vec<Value>) {
        match self.watch.upgrade() {
            Some(watch) => {
                watch.check_with(&self.check_id, args);
            }
            None => {
                warn!(check = %self.check_id, "shortcut invoked after its watch was dropped");
            }
        }
    }
}
