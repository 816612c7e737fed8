//! Rigger Actors
//!
//! The execution engine and the built-in actor library:
//! - [`registry`] - name-to-factory resolution and tree building
//! - [`group`] - `group.Sync` and `group.Async`
//! - [`misc`] - sleep, macro, generic HTTP
//! - [`scaler`] - server-array actors
//! - [`uptime`] - check-monitoring actors
//! - [`runner`] - top-level script execution

pub mod group;
pub mod misc;
pub mod registry;
pub mod runner;
pub mod scaler;
pub mod uptime;

pub use registry::{BuildError, Factory, Registry};
pub use runner::{run_script, RunError};
