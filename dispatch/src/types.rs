//! Grammar type definitions for command tree modeling.
//!
//! This module defines the core data model used to represent a CLI command
//! grammar: flag specifications, typed flag values, command nodes, and the
//! handler capability invoked when a command matches. Nodes are assembled
//! into an [`App`](crate::App) tree once at startup and never mutated during
//! parsing or dispatch.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::dispatch::{Context, HandlerError};
use crate::duration::parse_duration;
use crate::parse::Invocation;

/// Value type for a flag.
///
/// Determines which textual encodings a flag accepts and how a supplied
/// token converts to a [`FlagValue`].
///
/// # Examples
///
/// ```
/// use forge_dispatch::FlagKind;
///
/// let kind = FlagKind::default();
/// assert_eq!(kind, FlagKind::Bool);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FlagKind {
    /// Boolean flag: presence toggles `true`, no value token consumed.
    #[default]
    Bool,
    /// Arbitrary string value.
    String,
    /// Signed 64-bit integer value.
    Int,
    /// Duration with a numeric+unit suffix grammar (e.g. `90s`, `2h45m`).
    Duration,
}

impl FlagKind {
    /// Placeholder shown in usage output for flags of this kind.
    pub fn value_hint(self) -> Option<&'static str> {
        match self {
            FlagKind::Bool => None,
            FlagKind::String => Some("<string>"),
            FlagKind::Int => Some("<int>"),
            FlagKind::Duration => Some("<duration>"),
        }
    }
}

/// A typed flag value, either bound from input or taken from a default.
///
/// # Examples
///
/// ```
/// use forge_dispatch::FlagValue;
///
/// let v = FlagValue::Int(8080);
/// assert_eq!(v.as_int(), Some(8080));
/// assert_eq!(v.as_str(), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
    /// Boolean value.
    Bool(bool),
    /// String value.
    String(String),
    /// Integer value.
    Int(i64),
    /// Duration value.
    Duration(Duration),
}

impl FlagValue {
    /// Returns the boolean value, if this is a [`FlagValue::Bool`].
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FlagValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the string value, if this is a [`FlagValue::String`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FlagValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer value, if this is a [`FlagValue::Int`].
    pub fn as_int(&self) -> Option<i64> {
        match self {
            FlagValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the duration value, if this is a [`FlagValue::Duration`].
    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            FlagValue::Duration(d) => Some(*d),
            _ => None,
        }
    }

    /// The [`FlagKind`] this value corresponds to.
    pub fn kind(&self) -> FlagKind {
        match self {
            FlagValue::Bool(_) => FlagKind::Bool,
            FlagValue::String(_) => FlagKind::String,
            FlagValue::Int(_) => FlagKind::Int,
            FlagValue::Duration(_) => FlagKind::Duration,
        }
    }
}

impl fmt::Display for FlagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlagValue::Bool(b) => write!(f, "{b}"),
            FlagValue::String(s) => write!(f, "{s}"),
            FlagValue::Int(n) => write!(f, "{n}"),
            FlagValue::Duration(d) => write!(f, "{}ms", d.as_millis()),
        }
    }
}

/// Action carried by a terminal flag.
///
/// Terminal flags short-circuit parsing: their presence produces a
/// [`ShortCircuit`](crate::ShortCircuit) outcome instead of a resolved
/// invocation, and no handler is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminalAction {
    /// Print usage for the deepest matched command and exit cleanly.
    Help,
    /// Print the application version string and exit cleanly.
    Version,
}

/// Specification of a single named argument.
///
/// A flag has a canonical long name (matched as `--name`), optional aliases
/// (e.g. a one-letter short form matched as `-n`), a value kind, an optional
/// default, and required/terminal markers.
///
/// Use the constructors [`boolean`](FlagSpec::boolean) and
/// [`value`](FlagSpec::value), then chain builder methods.
///
/// # Examples
///
/// ```
/// use forge_dispatch::{FlagKind, FlagSpec, FlagValue};
///
/// let port = FlagSpec::value("port", FlagKind::Int)
///     .with_alias("p")
///     .with_default(FlagValue::Int(3000))
///     .with_description("Port to listen on");
/// assert!(port.matches_token("--port"));
/// assert!(port.matches_token("-p"));
/// assert!(!port.matches_token("--bind"));
///
/// let verbose = FlagSpec::boolean("verbose").with_alias("v");
/// assert_eq!(verbose.kind, FlagKind::Bool);
/// ```
#[derive(Debug, Clone)]
pub struct FlagSpec {
    /// Canonical name, without dashes (matched as `--name`).
    pub name: String,
    /// Alternate names; single-character aliases also match as `-x`.
    pub aliases: Vec<String>,
    /// Value kind.
    pub kind: FlagKind,
    /// Description shown in usage output.
    pub description: Option<String>,
    /// Default value bound when the flag is not supplied.
    pub default: Option<FlagValue>,
    /// Whether omitting the flag (with no default) is a parse error.
    pub required: bool,
    /// Terminal behavior, if any.
    pub terminal: Option<TerminalAction>,
}

impl FlagSpec {
    /// Creates a boolean flag (consumes no value token).
    ///
    /// # Examples
    ///
    /// ```
    /// use forge_dispatch::FlagSpec;
    ///
    /// let flag = FlagSpec::boolean("force");
    /// assert!(flag.matches_token("--force"));
    /// assert!(!flag.required);
    /// ```
    pub fn boolean(name: &str) -> Self {
        Self {
            name: name.to_string(),
            aliases: Vec::new(),
            kind: FlagKind::Bool,
            description: None,
            default: None,
            required: false,
            terminal: None,
        }
    }

    /// Creates a flag that takes a value of the given kind.
    ///
    /// # Examples
    ///
    /// ```
    /// use forge_dispatch::{FlagKind, FlagSpec};
    ///
    /// let flag = FlagSpec::value("bind", FlagKind::String);
    /// assert_eq!(flag.kind, FlagKind::String);
    /// ```
    pub fn value(name: &str, kind: FlagKind) -> Self {
        Self {
            name: name.to_string(),
            aliases: Vec::new(),
            kind,
            description: None,
            default: None,
            required: false,
            terminal: None,
        }
    }

    /// Adds an alias. Single-character aliases also match the short form
    /// (`-x`).
    pub fn with_alias(mut self, alias: &str) -> Self {
        self.aliases.push(alias.to_string());
        self
    }

    /// Adds a description.
    pub fn with_description(mut self, desc: &str) -> Self {
        self.description = Some(desc.to_string());
        self
    }

    /// Sets the default value bound when the flag is not supplied.
    pub fn with_default(mut self, value: FlagValue) -> Self {
        self.default = Some(value);
        self
    }

    /// Marks the flag as required: omitting it with no default is a parse
    /// error naming the flag.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Marks the flag as terminal with the given action.
    pub fn terminal(mut self, action: TerminalAction) -> Self {
        self.terminal = Some(action);
        self
    }

    /// Checks whether a raw token (dashes included, `=value` suffix already
    /// stripped) addresses this flag by name or alias.
    ///
    /// # Examples
    ///
    /// ```
    /// use forge_dispatch::FlagSpec;
    ///
    /// let flag = FlagSpec::boolean("verbose").with_alias("v");
    /// assert!(flag.matches_token("--verbose"));
    /// assert!(flag.matches_token("--v"));
    /// assert!(flag.matches_token("-v"));
    /// assert!(!flag.matches_token("verbose"));
    /// ```
    pub fn matches_token(&self, token: &str) -> bool {
        if let Some(rest) = token.strip_prefix("--") {
            return rest == self.name || self.aliases.iter().any(|a| a == rest);
        }
        if let Some(rest) = token.strip_prefix('-') {
            return self
                .aliases
                .iter()
                .any(|a| a.len() == 1 && a == rest);
        }
        false
    }

    /// Converts a raw textual value according to this flag's kind.
    ///
    /// Returns a human-readable reason on failure; the parser wraps it into
    /// [`ParseError::InvalidFlagValue`](crate::ParseError::InvalidFlagValue).
    ///
    /// # Examples
    ///
    /// ```
    /// use forge_dispatch::{FlagKind, FlagSpec, FlagValue};
    ///
    /// let port = FlagSpec::value("port", FlagKind::Int);
    /// assert_eq!(port.convert("8080"), Ok(FlagValue::Int(8080)));
    /// assert!(port.convert("notanumber").is_err());
    /// ```
    pub fn convert(&self, raw: &str) -> Result<FlagValue, String> {
        match self.kind {
            FlagKind::Bool => match raw {
                "true" => Ok(FlagValue::Bool(true)),
                "false" => Ok(FlagValue::Bool(false)),
                other => Err(format!("expected true or false, got '{other}'")),
            },
            FlagKind::String => Ok(FlagValue::String(raw.to_string())),
            FlagKind::Int => raw
                .parse::<i64>()
                .map(FlagValue::Int)
                .map_err(|e| format!("invalid integer: {e}")),
            FlagKind::Duration => parse_duration(raw)
                .map(FlagValue::Duration)
                .map_err(|e| e.to_string()),
        }
    }
}

/// The capability invoked when a resolved invocation matches a command.
///
/// Supplied by each subcommand's owning module; the engine never inspects a
/// handler's internals. Handlers run exactly once per process invocation,
/// synchronously, on the calling thread.
///
/// Closures of the right shape implement `Handler` via a blanket impl:
///
/// ```
/// use forge_dispatch::{CommandNode, Context, Invocation};
///
/// let node = CommandNode::leaf("ping", "Check connectivity", |_ctx: &Context, inv: &Invocation| {
///     println!("pinging {:?}", inv.positionals);
///     Ok(())
/// });
/// assert!(node.handler.is_some());
/// ```
pub trait Handler {
    /// Runs the command with its bound flags and execution context.
    ///
    /// Returning `Err` reports a failure with a handler-chosen exit code;
    /// the dispatcher writes the message to stderr and performs no retry.
    fn run(&self, ctx: &Context, inv: &Invocation) -> Result<(), HandlerError>;
}

impl<F> Handler for F
where
    F: Fn(&Context, &Invocation) -> Result<(), HandlerError>,
{
    fn run(&self, ctx: &Context, inv: &Invocation) -> Result<(), HandlerError> {
        self(ctx, inv)
    }
}

/// A named unit in the command tree.
///
/// A node owns its flags (insertion order is help order), its children
/// (keyed by name, listed in sorted order), and optionally a [`Handler`].
/// A branch node may itself be invocable: children and handler may coexist.
///
/// # Examples
///
/// ```
/// use forge_dispatch::{CommandNode, FlagKind, FlagSpec};
///
/// let start = CommandNode::leaf("start", "Start the server", |_ctx, _inv| Ok(()))
///     .with_flag(FlagSpec::value("port", FlagKind::Int));
/// let server = CommandNode::branch("server", "Server operations")
///     .with_child(start);
///
/// assert!(server.handler.is_none());
/// assert!(server.children.contains_key("start"));
/// ```
pub struct CommandNode {
    /// Command name, matched exactly and case-sensitively.
    pub name: String,
    /// Short description shown in usage output.
    pub description: String,
    /// Flags declared at this node, in help order.
    pub flags: Vec<FlagSpec>,
    /// Child commands by name.
    pub children: BTreeMap<String, CommandNode>,
    /// Handler invoked when this node is the resolved leaf.
    pub handler: Option<Box<dyn Handler>>,
}

impl CommandNode {
    /// Creates a branch node with no handler.
    ///
    /// # Examples
    ///
    /// ```
    /// use forge_dispatch::CommandNode;
    ///
    /// let node = CommandNode::branch("pipeline", "Manage pipelines");
    /// assert!(node.handler.is_none());
    /// assert!(node.children.is_empty());
    /// ```
    pub fn branch(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            flags: Vec::new(),
            children: BTreeMap::new(),
            handler: None,
        }
    }

    /// Creates a leaf node with a handler.
    ///
    /// # Examples
    ///
    /// ```
    /// use forge_dispatch::CommandNode;
    ///
    /// let node = CommandNode::leaf("stop", "Stop the server", |_ctx, _inv| Ok(()));
    /// assert!(node.handler.is_some());
    /// ```
    pub fn leaf<F>(name: &str, description: &str, handler: F) -> Self
    where
        F: Fn(&Context, &Invocation) -> Result<(), HandlerError> + 'static,
    {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            flags: Vec::new(),
            children: BTreeMap::new(),
            handler: Some(Box::new(handler)),
        }
    }

    /// Adds a flag to this node.
    pub fn with_flag(mut self, flag: FlagSpec) -> Self {
        self.flags.push(flag);
        self
    }

    /// Adds a child command, keyed by its name.
    pub fn with_child(mut self, child: CommandNode) -> Self {
        self.children.insert(child.name.clone(), child);
        self
    }

    /// Binds a handler to this node, making a branch directly invocable.
    pub fn with_handler<H>(mut self, handler: H) -> Self
    where
        H: Handler + 'static,
    {
        self.handler = Some(Box::new(handler));
        self
    }

    /// Looks up a flag declared at this node by raw token.
    pub fn find_flag(&self, token: &str) -> Option<&FlagSpec> {
        self.flags.iter().find(|f| f.matches_token(token))
    }
}

impl fmt::Debug for CommandNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandNode")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("flags", &self.flags)
            .field("children", &self.children)
            .field("handler", &self.handler.as_ref().map(|_| "<handler>"))
            .finish()
    }
}
