//! The `server` subtree: running the forge server in-process.

use std::time::Duration;

use forge_dispatch::{
    App, CommandNode, Context, FlagKind, FlagSpec, FlagValue, HandlerError, Invocation,
    RegisterError,
};

pub fn register(app: &mut App) -> Result<(), RegisterError> {
    let start = CommandNode::leaf("start", "Start the forge server", start_handler)
        .with_flag(
            FlagSpec::value("bind", FlagKind::String)
                .with_default(FlagValue::String("0.0.0.0".to_string()))
                .with_description("Address to bind"),
        )
        .with_flag(
            FlagSpec::value("port", FlagKind::Int)
                .with_alias("p")
                .with_default(FlagValue::Int(3000))
                .with_description("Port to listen on"),
        )
        .with_flag(
            FlagSpec::value("grace", FlagKind::Duration)
                .with_default(FlagValue::Duration(Duration::from_secs(30)))
                .with_description("Shutdown grace period"),
        );

    app.register(
        &[],
        CommandNode::branch("server", "Operate the forge server").with_child(start),
    )
}

fn start_handler(ctx: &Context, inv: &Invocation) -> Result<(), HandlerError> {
    let bind = inv.flags.get_str("bind").unwrap_or("0.0.0.0");
    let port = inv.flags.get_int("port").unwrap_or(3000);
    let grace = inv.flags.get_duration("grace").unwrap_or(Duration::from_secs(30));

    if !(1..=65_535).contains(&port) {
        return Err(HandlerError::new(format!("port {port} out of range")));
    }
    if ctx.is_cancelled() {
        return Err(HandlerError::new("interrupted before startup"));
    }

    println!("server: listening on {bind}:{port} (shutdown grace {}s)", grace.as_secs());
    Ok(())
}
