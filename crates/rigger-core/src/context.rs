//! Per-run execution context
//!
//! The context travels down the actor tree. It carries the dry-run
//! flag and the run identifier; macro actors derive child contexts
//! with an incremented nesting depth.

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unique run identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RunId(pub Ulid);

impl RunId {
    /// Generate new run ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Execution context handed to every actor
#[derive(Debug, Clone)]
pub struct ActorContext {
    run_id: RunId,
    dry: bool,
    depth: usize,
}

impl ActorContext {
    /// Create a fresh context for a new run
    #[inline]
    #[must_use]
    pub fn new(dry: bool) -> Self {
        Self {
            run_id: RunId::new(),
            dry,
            depth: 0,
        }
    }

    /// Whether this run is a dry run
    ///
    /// Actors must branch on this before any mutating remote call.
    #[inline]
    #[must_use]
    pub fn dry(&self) -> bool {
        self.dry
    }

    /// The run identifier
    #[inline]
    #[must_use]
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Nesting depth (incremented by macro actors)
    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Derive a context one nesting level deeper
    #[inline]
    #[must_use]
    pub fn nested(&self) -> Self {
        Self {
            run_id: self.run_id,
            dry: self.dry,
            depth: self.depth + 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_ids_are_unique() {
        assert_ne!(RunId::new(), RunId::new());
    }

    #[test]
    fn nested_keeps_run_id_and_dry() {
        let ctx = ActorContext::new(true);
        let child = ctx.nested();
        assert_eq!(child.run_id(), ctx.run_id());
        assert!(child.dry());
        assert_eq!(child.depth(), 1);
    }
}
