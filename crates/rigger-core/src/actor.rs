//! The actor contract
//!
//! Every unit of orchestration work implements [`Actor`]. The script
//! envelope around an actor (description, condition, timeout,
//! warn-on-failure) lives in [`ActorHeader`]; [`BoundActor`] pairs the
//! two and owns the lifecycle: condition gate, timeout wrap, failure
//! downgrade.

use crate::context::ActorContext;
use crate::error::ActorError;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// Default per-actor execution timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3600);

/// A unit of orchestration work
#[async_trait]
pub trait Actor: Send + Sync {
    /// Registry name, e.g. `scaler.Clone`
    fn kind(&self) -> &str;

    /// Perform the work
    ///
    /// Implementations must consult [`ActorContext::dry`] before any
    /// mutating remote call.
    async fn execute(&self, ctx: &ActorContext) -> Result<(), ActorError>;
}

/// Condition gating an actor's execution
///
/// Conditions come from the script as a JSON boolean or one of the
/// strings `"true"`, `"false"`, `"1"`, `"0"`, `""` (case insensitive).
#[derive(Debug, Clone, Default)]
pub struct Condition(Option<Value>);

impl Condition {
    /// Always-true condition
    #[inline]
    #[must_use]
    pub fn always() -> Self {
        Self(None)
    }

    /// Condition from a script value
    #[inline]
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        Self(Some(value))
    }

    /// Evaluate the condition
    ///
    /// # Errors
    /// Returns `InvalidOptions` for values outside the accepted set.
    pub fn evaluate(&self) -> Result<bool, ActorError> {
        match &self.0 {
            None => Ok(true),
            Some(Value::Bool(b)) => Ok(*b),
            Some(Value::String(s)) => match s.to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(true),
                "false" | "0" | "" => Ok(false),
                other => Err(ActorError::InvalidOptions(format!(
                    "condition \"{other}\" is not a recognized boolean"
                ))),
            },
            Some(other) => Err(ActorError::InvalidOptions(format!(
                "condition must be a boolean or string, got {other}"
            ))),
        }
    }
}

/// Script envelope common to every actor
#[derive(Debug, Clone)]
pub struct ActorHeader {
    /// Human description from the script
    pub desc: String,
    /// Execution gate
    pub condition: Condition,
    /// Downgrade failure to a warning
    pub warn_on_failure: bool,
    /// Execution timeout; zero disables the wrap
    pub timeout: Duration,
}

impl ActorHeader {
    /// Header with defaults and the given description
    #[inline]
    #[must_use]
    pub fn new(desc: impl Into<String>) -> Self {
        Self {
            desc: desc.into(),
            condition: Condition::always(),
            warn_on_failure: false,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// With a condition
    #[inline]
    #[must_use]
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = condition;
        self
    }

    /// With warn-on-failure
    #[inline]
    #[must_use]
    pub fn with_warn_on_failure(mut self, warn: bool) -> Self {
        self.warn_on_failure = warn;
        self
    }

    /// With a timeout
    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// An actor bound to its script envelope
pub struct BoundActor {
    header: ActorHeader,
    inner: Box<dyn Actor>,
}

impl BoundActor {
    /// Bind an actor to its envelope
    #[inline]
    #[must_use]
    pub fn new(header: ActorHeader, inner: Box<dyn Actor>) -> Self {
        Self { header, inner }
    }

    /// Registry name of the wrapped actor
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &str {
        self.inner.kind()
    }

    /// Script description
    #[inline]
    #[must_use]
    pub fn desc(&self) -> &str {
        &self.header.desc
    }

    /// The envelope
    #[inline]
    #[must_use]
    pub fn header(&self) -> &ActorHeader {
        &self.header
    }

    /// Run the actor through its full lifecycle
    ///
    /// Order: condition gate, timeout-wrapped execute, warn-on-failure
    /// downgrade.
    pub async fn run(&self, ctx: &ActorContext) -> Result<(), ActorError> {
        if !self.header.condition.evaluate()? {
            tracing::info!(
                kind = self.kind(),
                desc = %self.header.desc,
                "condition is false, skipping"
            );
            return Ok(());
        }

        tracing::info!(
            kind = self.kind(),
            desc = %self.header.desc,
            dry = ctx.dry(),
            "executing"
        );

        let result = if self.header.timeout.is_zero() {
            self.inner.execute(ctx).await
        } else {
            match tokio::time::timeout(self.header.timeout, self.inner.execute(ctx)).await {
                Ok(inner) => inner,
                Err(_) => Err(ActorError::Timeout {
                    timeout_secs: self.header.timeout.as_secs(),
                }),
            }
        };

        match result {
            Ok(()) => {
                tracing::debug!(kind = self.kind(), desc = %self.header.desc, "finished");
                Ok(())
            }
            Err(e) if self.header.warn_on_failure => {
                tracing::warn!(
                    kind = self.kind(),
                    desc = %self.header.desc,
                    error = %e,
                    "failed, continuing (warn_on_failure)"
                );
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

impl std::fmt::Debug for BoundActor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundActor")
            .field("kind", &self.inner.kind())
            .field("header", &self.header)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Flaky {
        calls: Arc<AtomicUsize>,
        fail: bool,
        delay: Duration,
    }

    #[async_trait]
    impl Actor for Flaky {
        fn kind(&self) -> &str {
            "test.Flaky"
        }

        async fn execute(&self, _ctx: &ActorContext) -> Result<(), ActorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail {
                Err(ActorError::Unrecoverable("boom".into()))
            } else {
                Ok(())
            }
        }
    }

    fn flaky(fail: bool, delay: Duration) -> (Arc<AtomicUsize>, Box<dyn Actor>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let actor = Flaky {
            calls: calls.clone(),
            fail,
            delay,
        };
        (calls, Box::new(actor))
    }

    #[test]
    fn condition_values() {
        assert!(Condition::always().evaluate().unwrap());
        assert!(Condition::from_value(json!(true)).evaluate().unwrap());
        assert!(!Condition::from_value(json!("False")).evaluate().unwrap());
        assert!(!Condition::from_value(json!("")).evaluate().unwrap());
        assert!(Condition::from_value(json!("1")).evaluate().unwrap());
        assert!(Condition::from_value(json!("maybe")).evaluate().is_err());
        assert!(Condition::from_value(json!(3)).evaluate().is_err());
    }

    #[tokio::test]
    async fn false_condition_skips_execute() {
        let (calls, actor) = flaky(true, Duration::ZERO);
        let bound = BoundActor::new(
            ActorHeader::new("skipped").with_condition(Condition::from_value(json!(false))),
            actor,
        );
        bound.run(&ActorContext::new(false)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn warn_on_failure_downgrades() {
        let (calls, actor) = flaky(true, Duration::ZERO);
        let bound = BoundActor::new(
            ActorHeader::new("warned").with_warn_on_failure(true),
            actor,
        );
        bound.run(&ActorContext::new(false)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failure_propagates_without_warn() {
        let (_, actor) = flaky(true, Duration::ZERO);
        let bound = BoundActor::new(ActorHeader::new("strict"), actor);
        let err = bound.run(&ActorContext::new(false)).await.unwrap_err();
        assert!(matches!(err, ActorError::Unrecoverable(_)));
    }

    #[tokio::test]
    async fn timeout_fires() {
        let (_, actor) = flaky(false, Duration::from_secs(5));
        let bound = BoundActor::new(
            ActorHeader::new("slow").with_timeout(Duration::from_millis(20)),
            actor,
        );
        let err = bound.run(&ActorContext::new(false)).await.unwrap_err();
        assert!(matches!(err, ActorError::Timeout { .. }));
    }

    #[tokio::test]
    async fn zero_timeout_disables_wrap() {
        let (_, actor) = flaky(false, Duration::from_millis(10));
        let bound = BoundActor::new(
            ActorHeader::new("untimed").with_timeout(Duration::ZERO),
            actor,
        );
        bound.run(&ActorContext::new(false)).await.unwrap();
    }
}
