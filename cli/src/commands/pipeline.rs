//! The `pipeline` subtree: listing and managing build pipelines.

use forge_dispatch::{
    App, CommandNode, Context, FlagKind, FlagSpec, FlagValue, HandlerError, Invocation,
    RegisterError,
};

use super::positional;

pub fn register(app: &mut App) -> Result<(), RegisterError> {
    let list = CommandNode::leaf("list", "List pipelines", list_handler)
        .with_flag(paging_flag("page", 1, "Page number"))
        .with_flag(paging_flag("per-page", 25, "Results per page"));

    let create = CommandNode::leaf("create", "Create a pipeline", create_handler)
        .with_flag(
            FlagSpec::value("branch", FlagKind::String)
                .with_default(FlagValue::String("main".to_string()))
                .with_description("Branch the pipeline builds"),
        )
        .with_flag(FlagSpec::boolean("inactive").with_description("Create in inactive state"));

    let delete = CommandNode::leaf("delete", "Delete a pipeline", delete_handler);

    app.register(
        &[],
        CommandNode::branch("pipeline", "Manage build pipelines")
            .with_child(list)
            .with_child(create)
            .with_child(delete),
    )
}

fn paging_flag(name: &str, default: i64, desc: &str) -> FlagSpec {
    FlagSpec::value(name, FlagKind::Int)
        .with_default(FlagValue::Int(default))
        .with_description(desc)
}

fn list_handler(_ctx: &Context, inv: &Invocation) -> Result<(), HandlerError> {
    let page = inv.flags.get_int("page").unwrap_or(1);
    let per_page = inv.flags.get_int("per-page").unwrap_or(25);
    if page < 1 || per_page < 1 {
        return Err(HandlerError::new("page and per-page must be positive"));
    }
    println!("pipeline list: page {page}, {per_page} per page");
    Ok(())
}

fn create_handler(_ctx: &Context, inv: &Invocation) -> Result<(), HandlerError> {
    let slug = positional(inv, 0, "pipeline slug")?;
    let branch = inv.flags.get_str("branch").unwrap_or("main");
    let state = if inv.flags.get_bool("inactive") { "inactive" } else { "active" };
    println!("pipeline create: {slug} (branch {branch}, {state})");
    Ok(())
}

fn delete_handler(_ctx: &Context, inv: &Invocation) -> Result<(), HandlerError> {
    let slug = positional(inv, 0, "pipeline slug")?;
    println!("pipeline delete: {slug}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_dispatch::{EXIT_FAILURE, EXIT_SUCCESS, Outcome};

    fn invoke(args: &[&str]) -> (App, Invocation) {
        let mut app = App::new("forge", "");
        register(&mut app).unwrap();
        let tokens: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        match app.parse(&tokens).unwrap() {
            Outcome::Invocation(inv) => (app, inv),
            other => panic!("expected invocation, got {other:?}"),
        }
    }

    #[test]
    fn test_create_requires_slug_positional() {
        let (app, inv) = invoke(&["pipeline", "create"]);
        assert_eq!(app.dispatch(&inv, &Context::new()), EXIT_FAILURE);

        let (app, inv) = invoke(&["pipeline", "create", "web-build"]);
        assert_eq!(inv.positionals, vec!["web-build"]);
        assert_eq!(app.dispatch(&inv, &Context::new()), EXIT_SUCCESS);
    }

    #[test]
    fn test_list_paging_defaults_and_bounds() {
        let (app, inv) = invoke(&["pipeline", "list"]);
        assert_eq!(inv.flags.get_int("page"), Some(1));
        assert_eq!(inv.flags.get_int("per-page"), Some(25));
        assert_eq!(app.dispatch(&inv, &Context::new()), EXIT_SUCCESS);

        let (app, inv) = invoke(&["pipeline", "list", "--page", "0"]);
        assert_eq!(app.dispatch(&inv, &Context::new()), EXIT_FAILURE);
    }
}
