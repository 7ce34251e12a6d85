//! The `user` subtree: the authenticated user's own account.

use forge_dispatch::{
    App, CommandNode, Context, FlagKind, FlagSpec, HandlerError, Invocation, RegisterError,
};

pub fn register(app: &mut App) -> Result<(), RegisterError> {
    let view = CommandNode::leaf("self", "Show the authenticated user", self_handler);
    let update = CommandNode::leaf("update", "Update the authenticated user", update_handler)
        .with_flag(FlagSpec::value("email", FlagKind::String).with_description("New email address"))
        .with_flag(FlagSpec::value("password", FlagKind::String).with_description("New password"));

    app.register(
        &[],
        CommandNode::branch("user", "Manage your own account")
            .with_child(view)
            .with_child(update),
    )
}

fn self_handler(_ctx: &Context, _inv: &Invocation) -> Result<(), HandlerError> {
    println!("user self: not logged in");
    Ok(())
}

fn update_handler(_ctx: &Context, inv: &Invocation) -> Result<(), HandlerError> {
    let email = inv.flags.get_str("email");
    let password = inv.flags.get_str("password");
    if email.is_none() && password.is_none() {
        return Err(HandlerError::new("nothing to update: pass --email or --password"));
    }
    if let Some(email) = email {
        if !email.contains('@') {
            return Err(HandlerError::new(format!("invalid email '{email}'")));
        }
        println!("user update: email -> {email}");
    }
    if password.is_some() {
        println!("user update: password changed");
    }
    Ok(())
}
