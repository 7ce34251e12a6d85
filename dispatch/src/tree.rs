//! The assembled command tree and its registration surface.
//!
//! An [`App`] starts empty and is populated by one [`register`](App::register)
//! call per subcommand module, each inserting its own subtree. The tree is
//! the union of all registrations — there is no central switch over command
//! names. Registration happens sequentially at startup, strictly before the
//! single parse call; the tree is immutable configuration afterwards, so the
//! engine carries no locking.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};

use crate::dispatch::{self, Context, EXIT_FAULT, EXIT_SUCCESS, EXIT_USAGE};
use crate::parse::{self, Invocation, Outcome, ParseError, ShortCircuit};
use crate::types::{CommandNode, FlagSpec};
use crate::usage;

/// Registration-time errors.
///
/// A duplicate registration is a programming error in a subcommand module,
/// not a runtime condition: the embedding binary should abort startup on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegisterError {
    /// A handler is already bound at this path.
    #[error("duplicate command registration at '{0}'")]
    DuplicateCommand(String),
}

/// Structural defects found by [`App::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A command node has an empty name.
    #[error("empty command name under '{0}'")]
    EmptyCommandName(String),
    /// Two flags in one node scope share a name or alias.
    #[error("duplicate flag name '{name}' in command '{path}'")]
    DuplicateFlag {
        /// The clashing name or alias.
        name: String,
        /// Space-joined path of the owning node.
        path: String,
    },
    /// A node has neither children nor a handler; it can never resolve.
    #[error("command '{0}' has no handler and no subcommands")]
    UnreachableNode(String),
}

/// Serializable summary of one flag, for introspection output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlagSummary {
    /// Canonical name.
    pub name: String,
    /// Aliases, if any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    /// Value kind.
    pub kind: crate::FlagKind,
    /// Description, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Default value, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<crate::FlagValue>,
    /// Whether the flag is required.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
}

/// Serializable summary of one command node, for introspection output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandSummary {
    /// Command name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Flags declared at this node, in help order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<FlagSummary>,
    /// Whether this node is directly invocable.
    pub invocable: bool,
    /// Child summaries, in name order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<CommandSummary>,
}

/// Serializable summary of a whole [`App`] grammar.
///
/// # Examples
///
/// ```
/// use forge_dispatch::{App, CommandNode};
///
/// let mut app = App::new("demo", "demo app").with_version("1.2.3");
/// app.register(&[], CommandNode::leaf("ping", "Check connectivity", |_c, _i| Ok(())))
///     .unwrap();
///
/// let summary = app.describe();
/// assert_eq!(summary.name, "demo");
/// assert_eq!(summary.commands[0].name, "ping");
/// assert!(summary.commands[0].invocable);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSummary {
    /// Application name.
    pub name: String,
    /// Application description.
    pub description: String,
    /// Version string, if configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Top-level command summaries, in name order.
    pub commands: Vec<CommandSummary>,
}

/// The root of the command grammar: top-level nodes plus app metadata.
///
/// # Examples
///
/// ```
/// use forge_dispatch::{App, CommandNode, Outcome};
///
/// let mut app = App::new("demo", "demo app");
/// app.register(&[], CommandNode::leaf("ping", "Check connectivity", |_c, _i| Ok(())))
///     .unwrap();
///
/// let outcome = app.parse(&["ping".to_string()]).unwrap();
/// assert!(matches!(outcome, Outcome::Invocation(_)));
/// ```
pub struct App {
    name: String,
    description: String,
    version: Option<String>,
    commands: BTreeMap<String, CommandNode>,
    unknown_flags_as_positionals: bool,
}

impl App {
    /// Creates an empty app with a name and description.
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            version: None,
            commands: BTreeMap::new(),
            unknown_flags_as_positionals: false,
        }
    }

    /// Sets the externally supplied version string, enabling the reserved
    /// root `--version` short-circuit.
    pub fn with_version(mut self, version: &str) -> Self {
        self.version = Some(version.to_string());
        self
    }

    /// Switches unknown flag tokens from parse errors to pass-through
    /// positionals. Not the default.
    pub fn allow_unknown_flags(mut self) -> Self {
        self.unknown_flags_as_positionals = true;
        self
    }

    /// Application name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Application description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Configured version string, if any.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub(crate) fn unknown_flags_as_positionals(&self) -> bool {
        self.unknown_flags_as_positionals
    }

    /// Top-level commands, keyed by name.
    pub fn commands(&self) -> &BTreeMap<String, CommandNode> {
        &self.commands
    }

    /// Inserts a subtree under the given parent path, creating intermediate
    /// branch nodes as needed. The node's own name is the terminal path
    /// segment.
    ///
    /// Fails with [`RegisterError::DuplicateCommand`] when a handler is
    /// already bound at the terminal path, or when merging child trees would
    /// bind two handlers to one path.
    ///
    /// # Examples
    ///
    /// ```
    /// use forge_dispatch::{App, CommandNode};
    ///
    /// let mut app = App::new("demo", "");
    /// app.register(&["remote"], CommandNode::leaf("add", "Add a remote", |_c, _i| Ok(())))
    ///     .unwrap();
    /// assert!(app.commands()["remote"].children.contains_key("add"));
    ///
    /// // Same path again: duplicate.
    /// let err = app
    ///     .register(&["remote"], CommandNode::leaf("add", "", |_c, _i| Ok(())))
    ///     .unwrap_err();
    /// assert!(matches!(err, forge_dispatch::RegisterError::DuplicateCommand(_)));
    /// ```
    pub fn register(&mut self, parent: &[&str], node: CommandNode) -> Result<(), RegisterError> {
        let mut full_path: Vec<String> = parent.iter().map(|s| s.to_string()).collect();
        full_path.push(node.name.clone());

        let mut children = &mut self.commands;
        for segment in parent {
            children = &mut children
                .entry(segment.to_string())
                .or_insert_with(|| CommandNode::branch(segment, ""))
                .children;
        }

        debug!(path = %full_path.join(" "), "registering command");
        merge_node(children, node, &mut full_path)
    }

    /// Checks the assembled tree for structural defects. Intended for
    /// startup assertions and tests; an empty result means the grammar is
    /// well-formed.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        for node in self.commands.values() {
            validate_node(node, &mut vec![self.name.clone()], &mut errors);
        }
        errors
    }

    /// Produces a serializable summary of the whole grammar.
    pub fn describe(&self) -> AppSummary {
        AppSummary {
            name: self.name.clone(),
            description: self.description.clone(),
            version: self.version.clone(),
            commands: self.commands.values().map(summarize_node).collect(),
        }
    }

    /// Finds a node by its path of names.
    pub fn find(&self, path: &[String]) -> Option<&CommandNode> {
        let mut children = &self.commands;
        let mut node = None;
        for name in path {
            node = children.get(name);
            children = &node?.children;
        }
        node
    }

    /// Resolves a token sequence against the tree.
    ///
    /// See [`Outcome`] for the two success shapes and [`ParseError`] for the
    /// failure taxonomy.
    pub fn parse(&self, tokens: &[String]) -> Result<Outcome, ParseError> {
        parse::parse(self, tokens)
    }

    /// Parses and dispatches with the given context, returning the process
    /// exit code. This is the top-level driver: it pattern-matches the parse
    /// outcome, renders usage or version output for short-circuits, and maps
    /// parse errors to [`EXIT_USAGE`].
    pub fn run_with_context<I>(&self, args: I, ctx: &Context) -> i32
    where
        I: IntoIterator<Item = String>,
    {
        let tokens: Vec<String> = args.into_iter().collect();
        match self.parse(&tokens) {
            Ok(Outcome::Invocation(inv)) => self.dispatch(&inv, ctx),
            Ok(Outcome::ShortCircuit(ShortCircuit::Version)) => {
                println!("{}", self.version.as_deref().unwrap_or("unknown"));
                EXIT_SUCCESS
            }
            Ok(Outcome::ShortCircuit(ShortCircuit::Help { path })) => {
                print!("{}", usage::render(self, &path));
                EXIT_SUCCESS
            }
            Err(err) => {
                eprintln!("{}: error: {err}", self.name);
                eprint!("{}", usage::render_error_hint(self, &err));
                EXIT_USAGE
            }
        }
    }

    /// [`run_with_context`](App::run_with_context) with a fresh default
    /// [`Context`].
    pub fn run<I>(&self, args: I) -> i32
    where
        I: IntoIterator<Item = String>,
    {
        self.run_with_context(args, &Context::new())
    }

    /// Invokes the handler of a resolved invocation exactly once and maps
    /// its outcome to an exit code. See [`dispatch`](crate::dispatch).
    pub fn dispatch(&self, inv: &Invocation, ctx: &Context) -> i32 {
        let Some(node) = self.find(&inv.path) else {
            // Unreachable for invocations produced by parse.
            error!(path = %inv.path_string(), "invocation path missing from tree");
            return EXIT_FAULT;
        };
        let Some(handler) = node.handler.as_ref() else {
            error!(path = %inv.path_string(), "invocation resolved to a node without handler");
            return EXIT_FAULT;
        };
        dispatch::dispatch(handler.as_ref(), inv, ctx)
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("commands", &self.commands.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Merges a registered node into a sibling map. An existing handler at the
/// same path, on either side, is a duplicate registration.
fn merge_node(
    siblings: &mut BTreeMap<String, CommandNode>,
    node: CommandNode,
    path: &mut Vec<String>,
) -> Result<(), RegisterError> {
    let existing = match siblings.entry(node.name.clone()) {
        std::collections::btree_map::Entry::Vacant(slot) => {
            slot.insert(node);
            return Ok(());
        }
        std::collections::btree_map::Entry::Occupied(slot) => slot.into_mut(),
    };

    if existing.handler.is_some() && node.handler.is_some() {
        return Err(RegisterError::DuplicateCommand(path.join(" ")));
    }
    if node.handler.is_some() {
        existing.handler = node.handler;
    }
    if existing.description.is_empty() {
        existing.description = node.description;
    }
    existing.flags.extend(node.flags);
    for (name, child) in node.children {
        path.push(name);
        merge_node(&mut existing.children, child, path)?;
        path.pop();
    }
    Ok(())
}

fn validate_node(node: &CommandNode, path: &mut Vec<String>, errors: &mut Vec<ValidationError>) {
    if node.name.trim().is_empty() {
        errors.push(ValidationError::EmptyCommandName(path.join(" ")));
        return;
    }
    path.push(node.name.clone());
    let path_str = path.join(" ");

    let mut seen: std::collections::HashSet<&str> = std::collections::HashSet::new();
    for flag in &node.flags {
        for name in std::iter::once(flag.name.as_str()).chain(flag.aliases.iter().map(String::as_str))
        {
            if !seen.insert(name) {
                errors.push(ValidationError::DuplicateFlag {
                    name: name.to_string(),
                    path: path_str.clone(),
                });
            }
        }
    }

    if node.handler.is_none() && node.children.is_empty() {
        errors.push(ValidationError::UnreachableNode(path_str));
    }

    for child in node.children.values() {
        validate_node(child, path, errors);
    }
    path.pop();
}

fn summarize_node(node: &CommandNode) -> CommandSummary {
    CommandSummary {
        name: node.name.clone(),
        description: node.description.clone(),
        flags: node.flags.iter().map(summarize_flag).collect(),
        invocable: node.handler.is_some(),
        children: node.children.values().map(summarize_node).collect(),
    }
}

fn summarize_flag(flag: &FlagSpec) -> FlagSummary {
    FlagSummary {
        name: flag.name.clone(),
        aliases: flag.aliases.clone(),
        kind: flag.kind,
        description: flag.description.clone(),
        default: flag.default.clone(),
        required: flag.required,
    }
}
