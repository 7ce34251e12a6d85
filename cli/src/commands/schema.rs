//! The `schema` command: dumps the CLI's own command grammar as JSON.
//!
//! Useful for docs tooling and completion generators. The handler assembles
//! a fresh tree through [`crate::build_app`] so the dump always matches the
//! grammar the binary actually serves.

use forge_dispatch::{App, CommandNode, Context, FlagSpec, HandlerError, Invocation, RegisterError};

pub fn register(app: &mut App) -> Result<(), RegisterError> {
    app.register(
        &[],
        CommandNode::leaf("schema", "Print the command grammar as JSON", schema_handler)
            .with_flag(FlagSpec::boolean("pretty").with_description("Pretty-print the output")),
    )
}

fn schema_handler(_ctx: &Context, inv: &Invocation) -> Result<(), HandlerError> {
    let app = crate::build_app()
        .map_err(|err| HandlerError::new(format!("grammar assembly failed: {err}")))?;
    let summary = app.describe();
    let json = if inv.flags.get_bool("pretty") {
        serde_json::to_string_pretty(&summary)
    } else {
        serde_json::to_string(&summary)
    }
    .map_err(|err| HandlerError::new(format!("serialization failed: {err}")))?;
    println!("{json}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_dispatch::{EXIT_SUCCESS, Outcome};

    #[test]
    fn test_schema_command_runs_against_real_grammar() {
        let app = crate::build_app().unwrap();
        let tokens = vec!["schema".to_string()];
        let Outcome::Invocation(inv) = app.parse(&tokens).unwrap() else {
            panic!("expected invocation");
        };
        assert_eq!(app.dispatch(&inv, &Context::new()), EXIT_SUCCESS);
    }

    #[test]
    fn test_summary_includes_every_top_level_command() {
        let app = crate::build_app().unwrap();
        let summary = app.describe();
        let names: Vec<&str> = summary.commands.iter().map(|c| c.name.as_str()).collect();
        assert!(names.contains(&"server"));
        assert!(names.contains(&"schema"));
        assert!(names.contains(&"login"));
    }
}
