//! The `users` subtree: administering other accounts.

use forge_dispatch::{
    App, CommandNode, Context, FlagKind, FlagSpec, FlagValue, HandlerError, Invocation,
    RegisterError,
};

use super::positional;

pub fn register(app: &mut App) -> Result<(), RegisterError> {
    let list = CommandNode::leaf("list", "List accounts", list_handler).with_flag(
        FlagSpec::value("page", FlagKind::Int)
            .with_default(FlagValue::Int(1))
            .with_description("Page number"),
    );
    let create = CommandNode::leaf("create", "Create an account", create_handler)
        .with_flag(FlagSpec::boolean("admin").with_description("Grant administrator rights"));
    let delete = CommandNode::leaf("delete", "Delete an account", delete_handler);

    app.register(
        &[],
        CommandNode::branch("users", "Administer accounts")
            .with_child(list)
            .with_child(create)
            .with_child(delete),
    )
}

fn list_handler(_ctx: &Context, inv: &Invocation) -> Result<(), HandlerError> {
    println!("users list: page {}", inv.flags.get_int("page").unwrap_or(1));
    Ok(())
}

fn create_handler(_ctx: &Context, inv: &Invocation) -> Result<(), HandlerError> {
    let email = positional(inv, 0, "email")?;
    let role = if inv.flags.get_bool("admin") { "admin" } else { "user" };
    println!("users create: {email} ({role})");
    Ok(())
}

fn delete_handler(_ctx: &Context, inv: &Invocation) -> Result<(), HandlerError> {
    let email = positional(inv, 0, "email")?;
    println!("users delete: {email}");
    Ok(())
}
