//! The `token` subtree: personal access tokens.

use std::time::Duration;

use forge_dispatch::{
    App, CommandNode, Context, FlagKind, FlagSpec, FlagValue, HandlerError, Invocation,
    RegisterError,
};

const MAX_TTL: Duration = Duration::from_secs(365 * 86_400);

pub fn register(app: &mut App) -> Result<(), RegisterError> {
    let create = CommandNode::leaf("create", "Issue a personal access token", create_handler)
        .with_flag(
            FlagSpec::value("ttl", FlagKind::Duration)
                .with_default(FlagValue::Duration(Duration::from_secs(30 * 86_400)))
                .with_description("Token lifetime"),
        );

    app.register(
        &[],
        CommandNode::branch("token", "Manage access tokens").with_child(create),
    )
}

fn create_handler(_ctx: &Context, inv: &Invocation) -> Result<(), HandlerError> {
    let ttl = inv
        .flags
        .get_duration("ttl")
        .unwrap_or(Duration::from_secs(30 * 86_400));
    if ttl.is_zero() || ttl > MAX_TTL {
        return Err(HandlerError::new("ttl must be between 1s and 365d"));
    }
    println!("token create: expires in {}s", ttl.as_secs());
    Ok(())
}
