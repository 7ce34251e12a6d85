//! End-to-end engine tests: registration, parsing, and dispatch against a
//! realistic command tree, including the exit-code contract.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use forge_dispatch::{
    App, CommandNode, Context, EXIT_FAULT, EXIT_SUCCESS, FlagKind, FlagSpec, FlagValue,
    HandlerError, Invocation, Outcome, ParseError, RegisterError, ShortCircuit,
};

fn tokens(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

/// Counts handler invocations, so tests can assert a handler ran exactly
/// once or never at all.
#[derive(Clone, Default)]
struct Probe(Arc<AtomicUsize>);

impl Probe {
    fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn handler(
        &self,
        result: Result<(), HandlerError>,
    ) -> impl Fn(&Context, &Invocation) -> Result<(), HandlerError> + 'static {
        let calls = self.0.clone();
        move |_ctx, _inv| {
            calls.fetch_add(1, Ordering::SeqCst);
            result.clone()
        }
    }
}

fn server_app(start_probe: &Probe, stop_probe: &Probe) -> App {
    let mut app = App::new("forge", "test forge").with_version("1.2.3");
    let server = CommandNode::branch("server", "Server operations")
        .with_child(
            CommandNode::leaf("start", "Start the server", start_probe.handler(Ok(())))
                .with_flag(FlagSpec::value("port", FlagKind::Int).with_alias("p")),
        )
        .with_child(CommandNode::leaf(
            "stop",
            "Stop the server",
            stop_probe.handler(Ok(())),
        ));
    app.register(&[], server).unwrap();
    app
}

#[test]
fn server_start_binds_port_and_dispatches_once() {
    let start = Probe::default();
    let stop = Probe::default();
    let app = server_app(&start, &stop);

    let Outcome::Invocation(inv) = app.parse(&tokens(&["server", "start", "--port", "8080"])).unwrap()
    else {
        panic!("expected invocation");
    };
    assert_eq!(inv.path, vec!["server", "start"]);
    assert_eq!(inv.flags.get_int("port"), Some(8080));
    assert!(inv.positionals.is_empty());

    let code = app.dispatch(&inv, &Context::new());
    assert_eq!(code, EXIT_SUCCESS);
    assert_eq!(start.count(), 1);
    assert_eq!(stop.count(), 0);
}

#[test]
fn bare_branch_fails_with_no_handler_listing_children() {
    let app = server_app(&Probe::default(), &Probe::default());
    let err = app.parse(&tokens(&["server"])).unwrap_err();
    assert_eq!(
        err,
        ParseError::NoHandler {
            path: vec!["server".to_string()],
            children: vec!["start".to_string(), "stop".to_string()],
        }
    );
}

#[test]
fn unknown_child_fails_at_the_branch_listing_children() {
    let app = server_app(&Probe::default(), &Probe::default());
    let err = app.parse(&tokens(&["server", "bogus"])).unwrap_err();
    assert_eq!(
        err,
        ParseError::UnknownCommand {
            given: "bogus".to_string(),
            path: vec!["server".to_string()],
            available: vec!["start".to_string(), "stop".to_string()],
        }
    );
}

#[test]
fn bad_int_value_names_the_flag() {
    let app = server_app(&Probe::default(), &Probe::default());
    let err = app
        .parse(&tokens(&["server", "start", "--port", "notanumber"]))
        .unwrap_err();
    match err {
        ParseError::InvalidFlagValue { flag, value, .. } => {
            assert_eq!(flag, "port");
            assert_eq!(value, "notanumber");
        }
        other => panic!("expected InvalidFlagValue, got {other}"),
    }
}

#[test]
fn version_short_circuit_reaches_no_handler() {
    let start = Probe::default();
    let stop = Probe::default();
    let app = server_app(&start, &stop);

    let code = app.run(tokens(&["--version"]));
    assert_eq!(code, EXIT_SUCCESS);
    assert_eq!(start.count(), 0);
    assert_eq!(stop.count(), 0);
}

#[test]
fn help_short_circuit_carries_the_matched_path() {
    let app = server_app(&Probe::default(), &Probe::default());
    match app.parse(&tokens(&["server", "-h"])).unwrap() {
        Outcome::ShortCircuit(ShortCircuit::Help { path }) => {
            assert_eq!(path, vec!["server"]);
        }
        other => panic!("expected help short-circuit, got {other:?}"),
    }
}

#[test]
fn handler_failure_surfaces_chosen_code_without_retry() {
    let probe = Probe::default();
    let mut app = App::new("forge", "");
    app.register(
        &[],
        CommandNode::leaf(
            "sync",
            "",
            probe.handler(Err(HandlerError::with_code(5, "remote unreachable"))),
        ),
    )
    .unwrap();

    let code = app.run(tokens(&["sync"]));
    assert_eq!(code, 5);
    assert_eq!(probe.count(), 1);
}

#[test]
fn panicking_handler_exits_with_fault_code() {
    let mut app = App::new("forge", "");
    app.register(
        &[],
        CommandNode::leaf("explode", "", |_ctx: &Context, _inv: &Invocation| {
            panic!("handler bug")
        }),
    )
    .unwrap();

    let code = app.run(tokens(&["explode"]));
    assert_eq!(code, EXIT_FAULT);
}

#[test]
fn duplicate_registration_is_rejected() {
    let probe = Probe::default();
    let mut app = App::new("forge", "");
    app.register(&["token"], CommandNode::leaf("create", "", probe.handler(Ok(()))))
        .unwrap();
    let err = app
        .register(&["token"], CommandNode::leaf("create", "", probe.handler(Ok(()))))
        .unwrap_err();
    assert_eq!(
        err,
        RegisterError::DuplicateCommand("token create".to_string())
    );
}

#[test]
fn registration_order_does_not_change_the_tree_shape() {
    let probe = Probe::default();

    let build = |reversed: bool| {
        let mut app = App::new("forge", "");
        let mut calls: Vec<Box<dyn Fn(&mut App) -> Result<(), RegisterError>>> = vec![
            {
                let p = probe.clone();
                Box::new(move |app: &mut App| {
                    app.register(&["user"], CommandNode::leaf("self", "", p.handler(Ok(()))))
                })
            },
            {
                let p = probe.clone();
                Box::new(move |app: &mut App| {
                    app.register(&["user"], CommandNode::leaf("update", "", p.handler(Ok(()))))
                })
            },
        ];
        if reversed {
            calls.reverse();
        }
        for call in calls {
            call(&mut app).unwrap();
        }
        app.describe()
    };

    let forward = serde_json::to_string(&build(false)).unwrap();
    let reversed = serde_json::to_string(&build(true)).unwrap();
    assert_eq!(forward, reversed);
}

#[test]
fn trailing_order_of_flags_and_positionals_is_irrelevant() {
    let probe = Probe::default();
    let mut app = App::new("forge", "");
    app.register(
        &["pipeline"],
        CommandNode::leaf("create", "", probe.handler(Ok(())))
            .with_flag(FlagSpec::boolean("active"))
            .with_flag(FlagSpec::value("branch", FlagKind::String)),
    )
    .unwrap();

    let inv_a = match app
        .parse(&tokens(&["pipeline", "create", "--active", "myslug", "--branch", "main"]))
        .unwrap()
    {
        Outcome::Invocation(inv) => inv,
        other => panic!("expected invocation, got {other:?}"),
    };
    let inv_b = match app
        .parse(&tokens(&["pipeline", "create", "myslug", "--branch", "main", "--active"]))
        .unwrap()
    {
        Outcome::Invocation(inv) => inv,
        other => panic!("expected invocation, got {other:?}"),
    };
    assert_eq!(inv_a, inv_b);
    assert_eq!(inv_a.positionals, vec!["myslug"]);
    assert!(inv_a.flags.get_bool("active"));
    assert_eq!(inv_a.flags.get_str("branch"), Some("main"));
}

#[test]
fn duration_flag_binds_parsed_value() {
    let probe = Probe::default();
    let mut app = App::new("forge", "");
    app.register(
        &["server"],
        CommandNode::leaf("start", "", probe.handler(Ok(()))).with_flag(
            FlagSpec::value("grace", FlagKind::Duration)
                .with_default(FlagValue::Duration(std::time::Duration::from_secs(30))),
        ),
    )
    .unwrap();

    let Outcome::Invocation(inv) = app
        .parse(&tokens(&["server", "start", "--grace", "2m30s"]))
        .unwrap()
    else {
        panic!("expected invocation");
    };
    assert_eq!(
        inv.flags.get_duration("grace"),
        Some(std::time::Duration::from_secs(150))
    );

    let Outcome::Invocation(inv) = app.parse(&tokens(&["server", "start"])).unwrap() else {
        panic!("expected invocation");
    };
    assert_eq!(
        inv.flags.get_duration("grace"),
        Some(std::time::Duration::from_secs(30))
    );
}

#[test]
fn parse_errors_map_to_usage_exit_code() {
    let app = server_app(&Probe::default(), &Probe::default());
    assert_eq!(app.run(tokens(&["server", "bogus"])), forge_dispatch::EXIT_USAGE);
    assert_eq!(app.run(tokens(&["server"])), forge_dispatch::EXIT_USAGE);
    assert_eq!(app.run(Vec::new()), forge_dispatch::EXIT_USAGE);
}
