//! Call-graph traversal.

pub mod calltree;

pub use calltree::{process_call_tree_from_roots, process_entry_point_call_tree};
