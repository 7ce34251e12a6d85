//! Handler invocation and exit-code mapping.
//!
//! The dispatcher runs the matched handler exactly once, synchronously, on
//! the calling thread, and converts its outcome to a process exit code. A
//! panic inside a handler is caught at this boundary, logged, and mapped to
//! [`EXIT_FAULT`] — never silently swallowed and never an uncontrolled
//! crash. Nothing is retried.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use thiserror::Error;
use tracing::{debug, error};

use crate::parse::Invocation;
use crate::types::Handler;

/// Exit code for success and for explicit help/version output.
pub const EXIT_SUCCESS: i32 = 0;
/// Default exit code for a handler-reported failure.
pub const EXIT_FAILURE: i32 = 1;
/// Exit code for an unexpected fault (handler panic).
pub const EXIT_FAULT: i32 = 2;
/// Exit code for parse/usage errors (`EX_USAGE` convention).
pub const EXIT_USAGE: i32 = 64;

/// A failure reported by a handler.
///
/// Carries the message written to stderr and the exit code the handler
/// chose. The engine passes both through verbatim.
///
/// # Examples
///
/// ```
/// use forge_dispatch::HandlerError;
///
/// let err = HandlerError::new("connection refused");
/// assert_eq!(err.code, 1);
///
/// let err = HandlerError::with_code(3, "partial sync");
/// assert_eq!(err.code, 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HandlerError {
    /// Exit code to surface; non-zero.
    pub code: i32,
    /// Message written to the diagnostic stream.
    pub message: String,
}

impl HandlerError {
    /// A failure with the default exit code [`EXIT_FAILURE`].
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: EXIT_FAILURE,
            message: message.into(),
        }
    }

    /// A failure with a handler-chosen exit code.
    pub fn with_code(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Shared cancellation flag handed to handlers through [`Context`].
///
/// Cloning is cheap; all clones observe the same flag. The engine only
/// carries the token across the handler boundary — propagating it further
/// is the handler's responsibility.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates an uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the cancellation flag. Typically wired to an interrupt signal
    /// by the embedding process.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Execution context passed to every handler.
///
/// Carries a cancellation token and an optional deadline. The engine itself
/// never blocks on either; handlers poll them as appropriate.
///
/// # Examples
///
/// ```
/// use forge_dispatch::Context;
///
/// let ctx = Context::new();
/// assert!(!ctx.is_cancelled());
///
/// ctx.cancel_token().cancel();
/// assert!(ctx.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Context {
    cancel: CancelToken,
    deadline: Option<Instant>,
}

impl Context {
    /// A context with no deadline and an uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a deadline.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// The shared cancellation token.
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// The configured deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Whether the configured deadline has passed.
    pub fn deadline_exceeded(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

/// Runs one handler and maps its outcome to an exit code.
///
/// - `Ok(())` → [`EXIT_SUCCESS`]
/// - `Err(HandlerError)` → the handler-chosen code, message on stderr
/// - panic → [`EXIT_FAULT`], diagnostics via `tracing::error!`
pub fn dispatch(handler: &dyn Handler, inv: &Invocation, ctx: &Context) -> i32 {
    debug!(command = %inv.path_string(), "dispatching");
    let result = panic::catch_unwind(AssertUnwindSafe(|| handler.run(ctx, inv)));
    match result {
        Ok(Ok(())) => EXIT_SUCCESS,
        Ok(Err(err)) => {
            eprintln!("error: {err}");
            if err.code == EXIT_SUCCESS {
                // A handler reporting failure with code 0 would lie to the
                // caller; coerce to the default failure code.
                return EXIT_FAILURE;
            }
            err.code
        }
        Err(payload) => {
            let reason = panic_message(payload.as_ref());
            error!(command = %inv.path_string(), reason = %reason, "handler fault");
            eprintln!("fatal: command '{}' failed unexpectedly: {reason}", inv.path_string());
            EXIT_FAULT
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
