//! High-level intermediate representation (HIR) for Java.
//!
//! [`body`] is the attributed tree the flow analyses walk: one arena per node
//! kind, typed handles between nodes, and resolved types on every expression.

pub mod body;
