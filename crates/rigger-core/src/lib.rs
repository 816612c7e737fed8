//! Rigger Core
//!
//! The actor contract shared by every crate in the workspace:
//! - [`Actor`] - the uniform asynchronous execute contract
//! - [`BoundActor`] - an actor plus its script envelope (condition,
//!   timeout, warn-on-failure)
//! - [`ActorContext`] - per-run state (dry-run flag, run id)
//! - [`ActorOptions`] - typed access to an actor's option block
//! - [`RetryPolicy`] - bounded exponential backoff for flaky calls

pub mod actor;
pub mod context;
pub mod error;
pub mod options;
pub mod retry;
pub mod strcase;

pub use actor::{Actor, ActorHeader, BoundActor, Condition, DEFAULT_TIMEOUT};
pub use context::{ActorContext, RunId};
pub use error::{ActorError, ChildFailure};
pub use options::ActorOptions;
pub use retry::RetryPolicy;
