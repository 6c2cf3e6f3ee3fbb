//! Shared helpers for DOT diagram emission.
//!
//! Every diagram the kernel emits (local stemmata, textual flow, global
//! stemma) goes through these helpers so quoting and numbering stay
//! consistent and deterministic.

use std::io::{self, Write};

/// Escape a label for inclusion in a double-quoted DOT string.
pub fn escape(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Write the opening of a digraph with plaintext nodes and a boxed
/// caption node.
pub fn open_digraph(out: &mut impl Write, name: &str, caption: &str) -> io::Result<()> {
    writeln!(out, "digraph {} {{", name)?;
    writeln!(out, "\tnode [shape=plaintext];")?;
    writeln!(out, "\tlabel [shape=box, label=\"{}\"];", escape(caption))
}

/// Write the closing brace of a digraph.
pub fn close_digraph(out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "}}")
}

/// Render a connectivity bound for a diagram caption: unbounded
/// connectivity displays as "abs" (absolute) rather than a sentinel.
pub fn connectivity_label(connectivity: usize) -> String {
    if connectivity == usize::MAX {
        "abs".to_string()
    } else {
        connectivity.to_string()
    }
}
