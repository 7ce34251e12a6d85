//! Usage and help text rendering.
//!
//! Renders command listings (names plus descriptions) and flag listings
//! (forms, value hints, descriptions) as aligned plain text, both for the
//! explicit help short-circuit and for parse-error hints.

use std::fmt::Write;

use crate::parse::ParseError;
use crate::tree::App;
use crate::types::{CommandNode, FlagSpec};

/// Renders usage for the node at `path`, or for the whole app when the path
/// is empty.
pub fn render(app: &App, path: &[String]) -> String {
    let mut out = String::new();

    match app.find(path) {
        Some(node) => {
            let full = format!("{} {}", app.name(), path.join(" "));
            if !node.description.is_empty() {
                let _ = writeln!(out, "{}", node.description);
                out.push('\n');
            }
            let _ = writeln!(out, "Usage: {}{}", full, usage_suffix(node));
            render_flags(&mut out, visible_flags(app, path));
            render_children(&mut out, node.children.values());
        }
        None => {
            if !app.description().is_empty() {
                let _ = writeln!(out, "{}", app.description());
                out.push('\n');
            }
            let _ = writeln!(out, "Usage: {} <command> [flags] [args]", app.name());
            render_children(&mut out, app.commands().values());
        }
    }

    out
}

/// Renders the usage hint attached to a parse error: the children of the
/// closest matched node, so the caller sees what was actually available.
pub fn render_error_hint(app: &App, err: &ParseError) -> String {
    let path = match err {
        ParseError::UnknownCommand { path, .. } => path.as_slice(),
        ParseError::NoHandler { path, .. } => path.as_slice(),
        ParseError::UnknownFlag { path, .. } => path.as_slice(),
        _ => return String::new(),
    };
    render(app, path)
}

fn usage_suffix(node: &CommandNode) -> &'static str {
    match (node.children.is_empty(), node.handler.is_some()) {
        (false, false) => " <command>",
        (false, true) => " [<command>] [flags] [args]",
        (true, _) => " [flags] [args]",
    }
}

fn render_children<'a>(out: &mut String, children: impl Iterator<Item = &'a CommandNode>) {
    let rows: Vec<(String, &str)> = children
        .map(|c| (c.name.clone(), c.description.as_str()))
        .collect();
    if rows.is_empty() {
        return;
    }
    out.push('\n');
    let _ = writeln!(out, "Commands:");
    write_rows(out, &rows);
}

fn render_flags(out: &mut String, flags: Vec<&FlagSpec>) {
    if flags.is_empty() {
        return;
    }
    let rows: Vec<(String, &str)> = flags
        .iter()
        .map(|f| (flag_forms(f), f.description.as_deref().unwrap_or("")))
        .collect();
    out.push('\n');
    let _ = writeln!(out, "Flags:");
    write_rows(out, &rows);
}

fn write_rows(out: &mut String, rows: &[(String, &str)]) {
    let width = rows.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
    for (label, desc) in rows {
        if desc.is_empty() {
            let _ = writeln!(out, "  {label}");
        } else {
            let _ = writeln!(out, "  {label:<width$}  {desc}");
        }
    }
}

/// All flag forms for one spec, e.g. `-p, --port <int>`.
fn flag_forms(flag: &FlagSpec) -> String {
    let mut forms: Vec<String> = flag
        .aliases
        .iter()
        .filter(|a| a.len() == 1)
        .map(|a| format!("-{a}"))
        .collect();
    forms.push(format!("--{}", flag.name));
    forms.extend(
        flag.aliases
            .iter()
            .filter(|a| a.len() > 1)
            .map(|a| format!("--{a}")),
    );
    let mut label = forms.join(", ");
    if let Some(hint) = flag.kind.value_hint() {
        label.push(' ');
        label.push_str(hint);
    }
    label
}

/// Flags visible at a path: every declaration along it, deeper ones
/// shadowing shallower ones of the same name, in help order.
fn visible_flags<'a>(app: &'a App, path: &[String]) -> Vec<&'a FlagSpec> {
    let mut flags: Vec<&FlagSpec> = Vec::new();
    let mut children = app.commands();
    for name in path {
        let Some(node) = children.get(name) else {
            break;
        };
        for flag in &node.flags {
            flags.retain(|f| f.name != flag.name);
            flags.push(flag);
        }
        children = &node.children;
    }
    flags
}
