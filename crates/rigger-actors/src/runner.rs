//! Top-level script execution
//!
//! Builds the actor tree from a loaded script and runs it under a
//! fresh context. This is the seam the CLI (and the integration
//! tests) drive.

use crate::registry::{BuildError, Registry};
use rigger_core::{ActorContext, ActorError};
use rigger_script::Script;

/// Failure of a whole run
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// The actor tree could not be built
    #[error(transparent)]
    Build(#[from] BuildError),

    /// The run itself failed
    #[error(transparent)]
    Actor(#[from] ActorError),
}

/// Build and run a script
///
/// # Errors
/// `RunError` when the build or any actor fails.
pub async fn run_script(
    registry: &Registry,
    script: &Script,
    dry: bool,
) -> Result<(), RunError> {
    let root = registry.build(&script.root)?;
    let ctx = ActorContext::new(dry);

    tracing::info!(
        run_id = %ctx.run_id(),
        script = %script.path.display(),
        dry,
        "starting run"
    );

    match root.run(&ctx).await {
        Ok(()) => {
            tracing::info!(run_id = %ctx.run_id(), "run finished");
            Ok(())
        }
        Err(e) => {
            for line in e.detail_lines() {
                tracing::error!(run_id = %ctx.run_id(), "{line}");
            }
            Err(e.into())
        }
    }
}
