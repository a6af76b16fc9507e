//! Callback isolation and render dispatch

use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::error::HandlerResult;
use crate::subscription::{RenderFn, SubscriptionId};

/// Which user callback is being invoked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Callback {
    /// Resource (snapshot) handler
    Resource,
    /// Topic (event) handler
    Topic,
    /// Render callback
    Render,
}

impl fmt::Display for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callback::Resource => write!(f, "resource"),
            Callback::Topic => write!(f, "topic"),
            Callback::Render => write!(f, "render"),
        }
    }
}

/// Result of a render attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    /// Gate closed or no render callback configured
    Skipped,
    /// Callback ran and succeeded
    Rendered,
    /// Callback returned an error or panicked
    Failed,
}

/// Run a user callback, containing errors and panics
///
/// Returns true if the callback completed successfully.
pub fn isolate<F>(callback: Callback, subscription: SubscriptionId, f: F) -> bool
where
    F: FnOnce() -> HandlerResult,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            tracing::warn!(
                subscription = %subscription,
                callback = %callback,
                error = %e,
                "Callback failed"
            );
            false
        }
        Err(panic) => {
            tracing::warn!(
                subscription = %subscription,
                callback = %callback,
                panic = panic_message(&*panic),
                "Callback panicked"
            );
            false
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Invoke a render callback if the visibility gate is open
pub fn dispatch(render: Option<&mut RenderFn>, gate_open: bool, subscription: SubscriptionId) -> RenderOutcome {
    let Some(render) = render else {
        return RenderOutcome::Skipped;
    };

    if !gate_open {
        tracing::trace!(subscription = %subscription, "Render suppressed");
        return RenderOutcome::Skipped;
    }

    if isolate(Callback::Render, subscription, || render()) {
        RenderOutcome::Rendered
    } else {
        RenderOutcome::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const SUB: SubscriptionId = SubscriptionId(1);

    #[test]
    fn test_isolate_success() {
        assert!(isolate(Callback::Topic, SUB, || Ok(())));
    }

    #[test]
    fn test_isolate_error() {
        assert!(!isolate(Callback::Resource, SUB, || Err("bad snapshot".into())));
    }

    #[test]
    fn test_isolate_panic() {
        assert!(!isolate(Callback::Topic, SUB, || panic!("handler blew up")));
    }

    #[test]
    fn test_dispatch_gate() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut render: RenderFn = Box::new(move || -> HandlerResult {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        assert_eq!(dispatch(Some(&mut render), false, SUB), RenderOutcome::Skipped);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        assert_eq!(dispatch(Some(&mut render), true, SUB), RenderOutcome::Rendered);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert_eq!(dispatch(None, true, SUB), RenderOutcome::Skipped);
    }

    #[test]
    fn test_dispatch_failure_contained() {
        let mut failing: RenderFn = Box::new(|| -> HandlerResult { Err("layout exploded".into()) });
        assert_eq!(dispatch(Some(&mut failing), true, SUB), RenderOutcome::Failed);

        let mut panicking: RenderFn = Box::new(|| -> HandlerResult { panic!("render panic") });
        assert_eq!(dispatch(Some(&mut panicking), true, SUB), RenderOutcome::Failed);
    }
}
