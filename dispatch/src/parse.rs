//! Argument parsing against an assembled command tree.
//!
//! Parsing is a single synchronous pass in two phases. The walk phase
//! consumes leading tokens while each exactly matches a child command name
//! (case-sensitive, no abbreviation or fuzzy matching). The binding phase
//! matches the remaining tokens against the flags declared along the matched
//! path and collects everything else as positionals.
//!
//! Flags and positionals interleave freely; position-locked flags are not
//! supported. A bare `--` terminates flag parsing, and every later token is
//! a positional verbatim. A lone `-` is always a positional.
//!
//! Terminal flags (built-in `--help`/`-h` and root `--version`, plus any
//! user-declared terminal flag) produce a [`ShortCircuit`] outcome that the
//! driver pattern-matches, rather than a non-local exit.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::debug;

use crate::tree::App;
use crate::types::{CommandNode, FlagKind, FlagSpec, FlagValue, TerminalAction};

/// Flag values bound for one invocation, keyed by canonical flag name.
///
/// Defaults are materialized here, so a flag with a default is always
/// present whether or not it was supplied.
///
/// # Examples
///
/// ```
/// use forge_dispatch::{BoundFlags, FlagValue};
///
/// let mut flags = BoundFlags::default();
/// flags.insert("port", FlagValue::Int(8080));
/// assert_eq!(flags.get_int("port"), Some(8080));
/// assert_eq!(flags.get_int("bind"), None);
/// assert!(!flags.get_bool("force"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoundFlags(BTreeMap<String, FlagValue>);

impl BoundFlags {
    /// Inserts a value under a canonical flag name.
    pub fn insert(&mut self, name: &str, value: FlagValue) {
        self.0.insert(name.to_string(), value);
    }

    /// Returns the raw bound value, if any.
    pub fn get(&self, name: &str) -> Option<&FlagValue> {
        self.0.get(name)
    }

    /// Returns `true` when the flag is bound (explicitly or by default).
    pub fn is_set(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Boolean accessor; absent or non-boolean values read as `false`.
    pub fn get_bool(&self, name: &str) -> bool {
        self.get(name).and_then(FlagValue::as_bool).unwrap_or(false)
    }

    /// String accessor.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FlagValue::as_str)
    }

    /// Integer accessor.
    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(FlagValue::as_int)
    }

    /// Duration accessor.
    pub fn get_duration(&self, name: &str) -> Option<std::time::Duration> {
        self.get(name).and_then(FlagValue::as_duration)
    }

    /// Iterates bound `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FlagValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// The result of resolving one argument vector: a matched command path,
/// bound flags, and positionals. Produced fresh per process invocation and
/// never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Command names from root to leaf.
    pub path: Vec<String>,
    /// Bound flag values, defaults included.
    pub flags: BoundFlags,
    /// Positional tokens in encounter order.
    pub positionals: Vec<String>,
}

impl Invocation {
    /// The matched path as a space-joined string, for diagnostics.
    pub fn path_string(&self) -> String {
        self.path.join(" ")
    }
}

/// A short-circuit requested by a terminal flag. No handler is reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShortCircuit {
    /// Print usage for the deepest matched path and exit cleanly.
    Help {
        /// Command names from root to the node whose usage is wanted.
        path: Vec<String>,
    },
    /// Print the application version string and exit cleanly.
    Version,
}

/// Outcome of a parse: either a resolved invocation or a short-circuit.
#[derive(Debug)]
pub enum Outcome {
    /// A command matched and its flags bound; ready for dispatch.
    Invocation(Invocation),
    /// A terminal flag fired before resolution completed.
    ShortCircuit(ShortCircuit),
}

/// Parse-time errors.
///
/// All variants are recovered at the top level into a usage message and a
/// non-zero exit; none of them is a process fault.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// No command matched: either no tokens at all, or a non-flag token that
    /// names no child of the deepest handler-less node reached.
    #[error("unknown command '{given}' (available: {})", available.join(", "))]
    UnknownCommand {
        /// The offending token; empty when no tokens were supplied.
        given: String,
        /// Path of the node whose children were searched; empty at root.
        path: Vec<String>,
        /// Child names available at that node.
        available: Vec<String>,
    },
    /// The matched node is a pure branch with no handler bound.
    #[error("'{}' is not a command itself (available: {})", path.join(" "), children.join(", "))]
    NoHandler {
        /// The matched path.
        path: Vec<String>,
        /// Its children, offered as a usage hint.
        children: Vec<String>,
    },
    /// A flag token matched no declaration anywhere on the path.
    #[error("unknown flag '{token}'")]
    UnknownFlag {
        /// The offending token, `=value` suffix stripped.
        token: String,
        /// The matched command path.
        path: Vec<String>,
    },
    /// A value-taking flag appeared last with nothing to consume.
    #[error("flag '--{flag}' requires a value")]
    MissingFlagValue {
        /// Canonical flag name.
        flag: String,
    },
    /// A required flag with no default was never supplied.
    #[error("missing required flag '--{flag}'")]
    MissingRequiredFlag {
        /// Canonical flag name.
        flag: String,
    },
    /// A supplied value failed kind-specific conversion.
    #[error("invalid value '{value}' for flag '--{flag}': {reason}")]
    InvalidFlagValue {
        /// Canonical flag name.
        flag: String,
        /// The raw supplied value.
        value: String,
        /// Kind-specific failure description.
        reason: String,
    },
}

/// Splits `--name=value` into head and attached value.
fn split_attached(token: &str) -> (&str, Option<&str>) {
    match token.split_once('=') {
        Some((head, value)) => (head, Some(value)),
        None => (token, None),
    }
}

fn is_flag_token(token: &str) -> bool {
    token.len() > 1 && token.starts_with('-') && token != "--"
}

pub(crate) fn parse(app: &App, tokens: &[String]) -> Result<Outcome, ParseError> {
    // Phase 1: walk the tree on exact child-name matches.
    let mut path: Vec<&CommandNode> = Vec::new();
    let mut idx = 0;
    while idx < tokens.len() {
        let token = &tokens[idx];
        if token.starts_with('-') {
            break;
        }
        let children = match path.last() {
            Some(node) => &node.children,
            None => app.commands(),
        };
        match children.get(token.as_str()) {
            Some(child) => {
                debug!(command = %token, depth = path.len(), "matched child command");
                path.push(child);
                idx += 1;
            }
            None => break,
        }
    }

    let path_names = || path.iter().map(|n| n.name.clone()).collect::<Vec<_>>();

    // A non-flag token that stops the walk at a handler-less node is an
    // unknown command at that branch; at an invocable node it is the first
    // positional.
    if idx < tokens.len() && !tokens[idx].starts_with('-') {
        let invocable = path.last().is_some_and(|n| n.handler.is_some());
        if !invocable {
            let (ctx_path, available) = match path.last() {
                Some(node) => (path_names(), child_names(&node.children)),
                None => (Vec::new(), child_names(app.commands())),
            };
            return Err(ParseError::UnknownCommand {
                given: tokens[idx].clone(),
                path: ctx_path,
                available,
            });
        }
    }

    // Phase 2: bind remaining tokens against the flags on the path.
    let mut flags = BoundFlags::default();
    let mut positionals: Vec<String> = Vec::new();
    let mut verbatim = false;

    while idx < tokens.len() {
        let token = &tokens[idx];
        idx += 1;

        if verbatim {
            positionals.push(token.clone());
            continue;
        }
        if token.as_str() == "--" {
            verbatim = true;
            continue;
        }
        if !is_flag_token(token) {
            positionals.push(token.clone());
            continue;
        }

        let (head, attached) = split_attached(token);

        // Deeper declarations shadow shallower ones.
        let spec = path.iter().rev().find_map(|n| n.find_flag(head));
        let Some(spec) = spec else {
            if head == "--help" || head == "-h" {
                return Ok(Outcome::ShortCircuit(ShortCircuit::Help {
                    path: path_names(),
                }));
            }
            if head == "--version" && path.is_empty() && app.version().is_some() {
                return Ok(Outcome::ShortCircuit(ShortCircuit::Version));
            }
            if app.unknown_flags_as_positionals() {
                debug!(token = %token, "passing unknown flag through as positional");
                positionals.push(token.clone());
                continue;
            }
            return Err(ParseError::UnknownFlag {
                token: head.to_string(),
                path: path_names(),
            });
        };

        if let Some(action) = spec.terminal {
            return Ok(Outcome::ShortCircuit(match action {
                TerminalAction::Help => ShortCircuit::Help { path: path_names() },
                TerminalAction::Version => ShortCircuit::Version,
            }));
        }

        let value = bind_value(spec, attached, tokens, &mut idx)?;
        debug!(flag = %spec.name, value = %value, "bound flag");
        flags.insert(&spec.name, value);
    }

    let Some(leaf) = path.last() else {
        return Err(ParseError::UnknownCommand {
            given: String::new(),
            path: Vec::new(),
            available: child_names(app.commands()),
        });
    };

    if leaf.handler.is_none() {
        return Err(ParseError::NoHandler {
            path: path_names(),
            children: child_names(&leaf.children),
        });
    }

    apply_defaults_and_required(&path, &mut flags)?;

    Ok(Outcome::Invocation(Invocation {
        path: path_names(),
        flags,
        positionals,
    }))
}

/// Consumes the value for a matched flag, from the attached `=value` or the
/// next token. Boolean flags never consume a detached token.
fn bind_value(
    spec: &FlagSpec,
    attached: Option<&str>,
    tokens: &[String],
    idx: &mut usize,
) -> Result<FlagValue, ParseError> {
    let raw = match (spec.kind, attached) {
        (FlagKind::Bool, None) => return Ok(FlagValue::Bool(true)),
        (_, Some(value)) => value.to_string(),
        (_, None) => {
            if *idx >= tokens.len() {
                return Err(ParseError::MissingFlagValue {
                    flag: spec.name.clone(),
                });
            }
            let value = tokens[*idx].clone();
            *idx += 1;
            value
        }
    };
    spec.convert(&raw).map_err(|reason| ParseError::InvalidFlagValue {
        flag: spec.name.clone(),
        value: raw,
        reason,
    })
}

/// Materializes defaults and checks required flags over the effective flag
/// set of the path (deeper declarations shadow shallower ones).
fn apply_defaults_and_required(
    path: &[&CommandNode],
    flags: &mut BoundFlags,
) -> Result<(), ParseError> {
    let mut effective: BTreeMap<&str, &FlagSpec> = BTreeMap::new();
    for node in path {
        for spec in &node.flags {
            effective.insert(spec.name.as_str(), spec);
        }
    }
    for (name, spec) in effective {
        if flags.is_set(name) || spec.terminal.is_some() {
            continue;
        }
        if let Some(default) = &spec.default {
            flags.insert(name, default.clone());
        } else if spec.required {
            return Err(ParseError::MissingRequiredFlag {
                flag: name.to_string(),
            });
        }
    }
    Ok(())
}

fn child_names(children: &BTreeMap<String, CommandNode>) -> Vec<String> {
    children.keys().cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::App;
    use crate::types::{CommandNode, FlagKind, FlagSpec, FlagValue};

    fn tokens(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    fn server_app() -> App {
        let mut app = App::new("testapp", "test application").with_version("0.0.0");
        let server = CommandNode::branch("server", "Server operations")
            .with_child(
                CommandNode::leaf("start", "Start the server", |_ctx, _inv| Ok(()))
                    .with_flag(FlagSpec::value("port", FlagKind::Int).with_alias("p")),
            )
            .with_child(CommandNode::leaf("stop", "Stop the server", |_ctx, _inv| Ok(())));
        app.register(&[], server).unwrap();
        app
    }

    fn parse_invocation(app: &App, parts: &[&str]) -> Invocation {
        match app.parse(&tokens(parts)).expect("parse failed") {
            Outcome::Invocation(inv) => inv,
            other => panic!("expected invocation, got {other:?}"),
        }
    }

    #[test]
    fn test_walk_resolves_deepest_path() {
        let app = server_app();
        let inv = parse_invocation(&app, &["server", "start", "--port", "8080"]);
        assert_eq!(inv.path, vec!["server", "start"]);
        assert_eq!(inv.flags.get_int("port"), Some(8080));
        assert!(inv.positionals.is_empty());
    }

    #[test]
    fn test_flag_equals_form_and_alias() {
        let app = server_app();
        let inv = parse_invocation(&app, &["server", "start", "--port=9090"]);
        assert_eq!(inv.flags.get_int("port"), Some(9090));

        let inv = parse_invocation(&app, &["server", "start", "-p", "7070"]);
        assert_eq!(inv.flags.get_int("port"), Some(7070));
    }

    #[test]
    fn test_pure_branch_is_no_handler() {
        let app = server_app();
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
    fn test_unknown_child_at_branch_is_unknown_command() {
        let app = server_app();
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
    fn test_empty_input_is_unknown_command() {
        let app = server_app();
        let err = app.parse(&[]).unwrap_err();
        assert!(matches!(
            err,
            ParseError::UnknownCommand { ref given, .. } if given.is_empty()
        ));
    }

    #[test]
    fn test_conversion_failure_names_flag() {
        let app = server_app();
        let err = app
            .parse(&tokens(&["server", "start", "--port", "notanumber"]))
            .unwrap_err();
        assert!(matches!(
            err,
            ParseError::InvalidFlagValue { ref flag, ref value, .. }
                if flag == "port" && value == "notanumber"
        ));
    }

    #[test]
    fn test_undeclared_flag_is_rejected() {
        let app = server_app();
        let err = app
            .parse(&tokens(&["server", "start", "--bogus"]))
            .unwrap_err();
        assert!(matches!(err, ParseError::UnknownFlag { ref token, .. } if token == "--bogus"));
    }

    #[test]
    fn test_permissive_mode_passes_unknown_flags_through() {
        let mut app = App::new("testapp", "").allow_unknown_flags();
        app.register(
            &[],
            CommandNode::leaf("run", "", |_ctx, _inv| Ok(())),
        )
        .unwrap();
        let inv = parse_invocation(&app, &["run", "--whatever", "x"]);
        assert_eq!(inv.positionals, vec!["--whatever", "x"]);
    }

    #[test]
    fn test_flag_value_missing_at_end_of_input() {
        let app = server_app();
        let err = app.parse(&tokens(&["server", "start", "--port"])).unwrap_err();
        assert_eq!(
            err,
            ParseError::MissingFlagValue {
                flag: "port".to_string()
            }
        );
    }

    #[test]
    fn test_required_flag_without_default() {
        let mut app = App::new("testapp", "");
        app.register(
            &[],
            CommandNode::leaf("deploy", "", |_ctx, _inv| Ok(()))
                .with_flag(FlagSpec::value("env", FlagKind::String).required()),
        )
        .unwrap();
        let err = app.parse(&tokens(&["deploy"])).unwrap_err();
        assert_eq!(
            err,
            ParseError::MissingRequiredFlag {
                flag: "env".to_string()
            }
        );
    }

    #[test]
    fn test_default_materialized_when_not_supplied() {
        let mut app = App::new("testapp", "");
        app.register(
            &[],
            CommandNode::leaf("serve", "", |_ctx, _inv| Ok(()))
                .with_flag(
                    FlagSpec::value("port", FlagKind::Int).with_default(FlagValue::Int(3000)),
                ),
        )
        .unwrap();
        let inv = parse_invocation(&app, &["serve"]);
        assert_eq!(inv.flags.get_int("port"), Some(3000));
    }

    #[test]
    fn test_deeper_declaration_shadows_shallower() {
        let mut app = App::new("testapp", "");
        let child = CommandNode::leaf("child", "", |_ctx, _inv| Ok(()))
            .with_flag(FlagSpec::value("limit", FlagKind::Int).with_default(FlagValue::Int(10)));
        let parent = CommandNode::branch("parent", "")
            .with_flag(
                FlagSpec::value("limit", FlagKind::String)
                    .with_default(FlagValue::String("all".to_string())),
            )
            .with_child(child);
        app.register(&[], parent).unwrap();

        let inv = parse_invocation(&app, &["parent", "child"]);
        assert_eq!(inv.flags.get_int("limit"), Some(10));

        let inv = parse_invocation(&app, &["parent", "child", "--limit", "5"]);
        assert_eq!(inv.flags.get_int("limit"), Some(5));
    }

    #[test]
    fn test_parent_flag_visible_at_leaf() {
        let mut app = App::new("testapp", "");
        let parent = CommandNode::branch("parent", "")
            .with_flag(FlagSpec::boolean("verbose"))
            .with_child(CommandNode::leaf("child", "", |_ctx, _inv| Ok(())));
        app.register(&[], parent).unwrap();
        let inv = parse_invocation(&app, &["parent", "child", "--verbose"]);
        assert!(inv.flags.get_bool("verbose"));
    }

    #[test]
    fn test_flags_interleave_with_positionals() {
        let mut app = App::new("testapp", "");
        app.register(
            &[],
            CommandNode::leaf("cp", "", |_ctx, _inv| Ok(()))
                .with_flag(FlagSpec::boolean("force").with_alias("f")),
        )
        .unwrap();
        let inv = parse_invocation(&app, &["cp", "a.txt", "--force", "b.txt"]);
        assert_eq!(inv.positionals, vec!["a.txt", "b.txt"]);
        assert!(inv.flags.get_bool("force"));
    }

    #[test]
    fn test_double_dash_ends_flag_parsing() {
        let mut app = App::new("testapp", "");
        app.register(
            &[],
            CommandNode::leaf("echo", "", |_ctx, _inv| Ok(()))
                .with_flag(FlagSpec::boolean("upper")),
        )
        .unwrap();
        let inv = parse_invocation(&app, &["echo", "--upper", "--", "--not-a-flag", "-x"]);
        assert!(inv.flags.get_bool("upper"));
        assert_eq!(inv.positionals, vec!["--not-a-flag", "-x"]);
    }

    #[test]
    fn test_lone_dash_is_positional() {
        let mut app = App::new("testapp", "");
        app.register(&[], CommandNode::leaf("cat", "", |_ctx, _inv| Ok(())))
            .unwrap();
        let inv = parse_invocation(&app, &["cat", "-"]);
        assert_eq!(inv.positionals, vec!["-"]);
    }

    #[test]
    fn test_bool_flag_accepts_attached_value_only() {
        let mut app = App::new("testapp", "");
        app.register(
            &[],
            CommandNode::leaf("run", "", |_ctx, _inv| Ok(()))
                .with_flag(FlagSpec::boolean("force")),
        )
        .unwrap();
        let inv = parse_invocation(&app, &["run", "--force=false", "next"]);
        assert_eq!(inv.flags.get_bool("force"), false);
        // A detached token after a bool flag is a positional, not its value.
        assert_eq!(inv.positionals, vec!["next"]);
    }

    #[test]
    fn test_version_short_circuits_at_root() {
        let app = server_app();
        match app.parse(&tokens(&["--version"])).unwrap() {
            Outcome::ShortCircuit(ShortCircuit::Version) => {}
            other => panic!("expected version short-circuit, got {other:?}"),
        }
    }

    #[test]
    fn test_help_short_circuits_with_matched_path() {
        let app = server_app();
        match app.parse(&tokens(&["server", "start", "--help"])).unwrap() {
            Outcome::ShortCircuit(ShortCircuit::Help { path }) => {
                assert_eq!(path, vec!["server", "start"]);
            }
            other => panic!("expected help short-circuit, got {other:?}"),
        }
    }

    #[test]
    fn test_declared_terminal_flag_short_circuits() {
        use crate::types::TerminalAction;

        let mut app = App::new("testapp", "");
        app.register(
            &[],
            CommandNode::leaf("run", "", |_ctx, _inv| Ok(())).with_flag(
                FlagSpec::boolean("usage").terminal(TerminalAction::Help),
            ),
        )
        .unwrap();
        match app.parse(&tokens(&["run", "--usage"])).unwrap() {
            Outcome::ShortCircuit(ShortCircuit::Help { path }) => {
                assert_eq!(path, vec!["run"]);
            }
            other => panic!("expected help short-circuit, got {other:?}"),
        }
    }

    #[test]
    fn test_positional_allowed_at_invocable_branch() {
        let mut app = App::new("testapp", "");
        let node = CommandNode::branch("pipeline", "")
            .with_handler(|_ctx: &crate::Context, _inv: &Invocation| Ok(()))
            .with_child(CommandNode::leaf("create", "", |_ctx, _inv| Ok(())));
        app.register(&[], node).unwrap();
        // "myslug" is not a child, but pipeline itself is invocable.
        let inv = parse_invocation(&app, &["pipeline", "myslug"]);
        assert_eq!(inv.path, vec!["pipeline"]);
        assert_eq!(inv.positionals, vec!["myslug"]);
    }
}
