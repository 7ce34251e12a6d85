//! Subcommand modules. Each exposes a `register` function that inserts its
//! own subtree into the shared [`App`](forge_dispatch::App); none of them
//! knows about any other.

pub mod account;
pub mod execution;
pub mod pipeline;
pub mod schema;
pub mod server;
pub mod token;
pub mod user;
pub mod users;

use forge_dispatch::{HandlerError, Invocation};

/// Pulls the positional at `index`, failing with a handler error naming
/// what was expected. Shared by the modules that take slug/number
/// positionals.
pub(crate) fn positional<'a>(
    inv: &'a Invocation,
    index: usize,
    what: &str,
) -> Result<&'a str, HandlerError> {
    inv.positionals
        .get(index)
        .map(String::as_str)
        .ok_or_else(|| HandlerError::new(format!("missing {what} argument")))
}
