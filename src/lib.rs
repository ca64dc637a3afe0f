//! Watches over multiple asynchronous operations and triggers listeners
//! when some or all of them are complete.
//!
//! A [`Registry`] maps names to [`Watch`] instances. Each watch tracks a set
//! of named checks; callers mark checks complete (optionally carrying result
//! arguments) and the watch fires check-scoped listeners immediately and
//! whole-watch listeners once every check is done.
//!
//! ```
//! use ready_watch::Registry;
//!
//! let registry = Registry::new();
//! let boot = registry.get("boot")?;
//!
//! boot.add_check("db")?.add_check("cache")?;
//! boot.add_listener(|w| println!("{} is ready", w.name()), None);
//!
//! boot.check("db");
//! boot.check("cache");
//! assert!(boot.is_done());
//! # Ok::<(), ready_watch::Error>(())
//! ```

mod errors;
mod registry;
mod watch;


pub use errors::*;
pub use registry::*;
pub use watch::*;
