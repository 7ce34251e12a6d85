//! Command tree registration, argument parsing, and dispatch.
//!
//! This crate is the engine behind the `forge` binary: independently-defined
//! subcommand modules register their own subtrees into one [`App`], the
//! parser resolves the process argument vector against the assembled tree,
//! and the dispatcher invokes the matched handler and maps its outcome to a
//! process exit code.
//!
//! - [`FlagSpec`] / [`FlagKind`] / [`FlagValue`] — one named argument:
//!   aliases, typed values, defaults, required and terminal markers.
//! - [`CommandNode`] — a named unit owning flags, children, and an optional
//!   [`Handler`].
//! - [`App`] — the root tree: registration, validation, introspection
//!   ([`AppSummary`]), parsing, and the top-level driver.
//! - [`Outcome`] / [`Invocation`] / [`ShortCircuit`] — parse results: a
//!   resolved invocation, or a help/version short-circuit the driver
//!   pattern-matches.
//! - [`Context`] / [`CancelToken`] — the cancellable execution context
//!   handed to handlers.
//!
//! Registration happens sequentially at startup, strictly before the single
//! parse call; the tree is immutable configuration afterwards, so the whole
//! dispatch path is single-threaded and lock-free.
//!
//! # Example
//!
//! ```
//! use forge_dispatch::*;
//!
//! // Each subcommand module registers its own subtree.
//! fn register_server(app: &mut App) -> Result<(), RegisterError> {
//!     let start = CommandNode::leaf("start", "Start the server", |ctx, inv| {
//!         let port = inv.flags.get_int("port").unwrap_or(3000);
//!         if ctx.is_cancelled() {
//!             return Err(HandlerError::new("interrupted"));
//!         }
//!         println!("listening on :{port}");
//!         Ok(())
//!     })
//!     .with_flag(FlagSpec::value("port", FlagKind::Int).with_default(FlagValue::Int(3000)));
//!
//!     app.register(&[], CommandNode::branch("server", "Server operations").with_child(start))
//! }
//!
//! let mut app = App::new("forge", "A code forge CLI").with_version("1.0.0");
//! register_server(&mut app).unwrap();
//! assert!(app.validate().is_empty());
//!
//! let args = vec!["server".to_string(), "start".to_string(), "--port=8080".to_string()];
//! match app.parse(&args).unwrap() {
//!     Outcome::Invocation(inv) => {
//!         assert_eq!(inv.path, vec!["server", "start"]);
//!         assert_eq!(inv.flags.get_int("port"), Some(8080));
//!     }
//!     Outcome::ShortCircuit(_) => unreachable!(),
//! }
//! ```

pub mod dispatch;
mod duration;
mod parse;
mod tree;
mod types;
pub mod usage;

pub use dispatch::{
    CancelToken, Context, EXIT_FAILURE, EXIT_FAULT, EXIT_SUCCESS, EXIT_USAGE, HandlerError,
};
pub use duration::{DurationError, parse_duration};
pub use parse::{BoundFlags, Invocation, Outcome, ParseError, ShortCircuit};
pub use tree::{App, AppSummary, CommandSummary, FlagSummary, RegisterError, ValidationError};
pub use types::{CommandNode, FlagKind, FlagSpec, FlagValue, Handler, TerminalAction};
