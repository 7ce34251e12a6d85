//! Top-level session commands: `login`, `logout`, and `register`.
//!
//! These are leaves at the root of the tree rather than a subtree of their
//! own, matching the usual CLI surface for session management.

use forge_dispatch::{
    App, CommandNode, Context, FlagKind, FlagSpec, HandlerError, Invocation, RegisterError,
};

use super::positional;

pub fn register(app: &mut App) -> Result<(), RegisterError> {
    app.register(
        &[],
        CommandNode::leaf("login", "Authenticate against a forge server", login_handler)
            .with_flag(
                FlagSpec::value("username", FlagKind::String)
                    .with_alias("u")
                    .required()
                    .with_description("Account username"),
            )
            .with_flag(
                FlagSpec::value("password", FlagKind::String)
                    .with_alias("w")
                    .with_description("Account password (prompted when omitted)"),
            ),
    )?;

    app.register(
        &[],
        CommandNode::leaf("logout", "Discard the stored session", logout_handler),
    )?;

    app.register(
        &[],
        CommandNode::leaf("register", "Create a new account", register_handler)
            .with_flag(FlagSpec::value("username", FlagKind::String).required())
            .with_flag(FlagSpec::value("email", FlagKind::String).required())
            .with_flag(FlagSpec::value("password", FlagKind::String).required()),
    )
}

fn login_handler(_ctx: &Context, inv: &Invocation) -> Result<(), HandlerError> {
    let server = positional(inv, 0, "server address")?;
    let username = inv
        .flags
        .get_str("username")
        .ok_or_else(|| HandlerError::new("missing username"))?;
    println!("login: {username} @ {server}");
    Ok(())
}

fn logout_handler(_ctx: &Context, _inv: &Invocation) -> Result<(), HandlerError> {
    println!("logout: session discarded");
    Ok(())
}

fn register_handler(_ctx: &Context, inv: &Invocation) -> Result<(), HandlerError> {
    let username = inv.flags.get_str("username").unwrap_or_default();
    let email = inv.flags.get_str("email").unwrap_or_default();
    if !email.contains('@') {
        return Err(HandlerError::new(format!("invalid email '{email}'")));
    }
    println!("register: {username} <{email}>");
    Ok(())
}
