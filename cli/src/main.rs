//! The `forge` binary: assembles the command tree from independent
//! subcommand modules and hands the argument vector to the dispatch engine.
//!
//! Each module under [`commands`] registers exactly one subtree; the tree is
//! the union of their registrations. A registration failure is a programming
//! error in a module and aborts startup.

use std::env;
use std::process;

use forge_dispatch::{App, EXIT_FAULT, RegisterError};

mod commands;

const APP_NAME: &str = "forge";
const APP_DESCRIPTION: &str = "Self-hosted code forge: repositories, pipelines, and users";
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Builds the full command tree. Factored out of `main` so the `schema`
/// command and tests can assemble the same grammar.
pub(crate) fn build_app() -> Result<App, RegisterError> {
    let mut app = App::new(APP_NAME, APP_DESCRIPTION).with_version(VERSION);
    commands::server::register(&mut app)?;
    commands::pipeline::register(&mut app)?;
    commands::execution::register(&mut app)?;
    commands::user::register(&mut app)?;
    commands::users::register(&mut app)?;
    commands::token::register(&mut app)?;
    commands::account::register(&mut app)?;
    commands::schema::register(&mut app)?;
    Ok(app)
}

fn main() {
    let app = match build_app() {
        Ok(app) => app,
        Err(err) => {
            eprintln!("{APP_NAME}: startup error: {err}");
            process::exit(EXIT_FAULT);
        }
    };
    process::exit(app.run(env::args().skip(1)));
}
