//! Rigger Script
//!
//! Everything between a file on disk and a validated actor tree:
//! - [`loader`] - read JSON or YAML, substitute tokens, validate,
//!   deserialize
//! - [`schema`] - the embedded script schema
//! - [`tokens`] - `%TOKEN%` substitution
//! - [`manifest`] - dependency-manifest parsing

pub mod error;
pub mod loader;
pub mod manifest;
pub mod schema;
pub mod script;
pub mod tokens;

pub use error::ScriptError;
pub use loader::load;
pub use manifest::{ConstraintOp, DependencySpec, Manifest, ManifestError, VersionConstraint};
pub use script::{ActorDef, Script};
pub use tokens::TokenMap;
