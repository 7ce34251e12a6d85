//! The `execution` subtree: inspecting pipeline runs.

use forge_dispatch::{
    App, CommandNode, Context, FlagKind, FlagSpec, FlagValue, HandlerError, Invocation,
    RegisterError,
};

use super::positional;

pub fn register(app: &mut App) -> Result<(), RegisterError> {
    let list = CommandNode::leaf("list", "List executions of a pipeline", list_handler).with_flag(
        FlagSpec::value("limit", FlagKind::Int)
            .with_default(FlagValue::Int(20))
            .with_description("Maximum executions to show"),
    );
    let view = CommandNode::leaf("view", "Show one execution", view_handler);

    app.register(
        &[],
        CommandNode::branch("execution", "Inspect pipeline executions")
            .with_child(list)
            .with_child(view),
    )
}

fn list_handler(_ctx: &Context, inv: &Invocation) -> Result<(), HandlerError> {
    let pipeline = positional(inv, 0, "pipeline slug")?;
    let limit = inv.flags.get_int("limit").unwrap_or(20);
    println!("execution list: pipeline {pipeline} (latest {limit})");
    Ok(())
}

fn view_handler(_ctx: &Context, inv: &Invocation) -> Result<(), HandlerError> {
    let pipeline = positional(inv, 0, "pipeline slug")?;
    let number = positional(inv, 1, "execution number")?;
    let number: u64 = number
        .parse()
        .map_err(|_| HandlerError::new(format!("invalid execution number '{number}'")))?;
    println!("execution view: pipeline {pipeline}, execution #{number}");
    Ok(())
}
