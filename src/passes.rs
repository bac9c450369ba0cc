//! Passes.

use crate::ir::Module;
use anyhow::Result;

pub mod block_labels;
pub mod block_trace;
pub mod trace_buffer;

/// Outcome of a pass that ran to completion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Unchanged,
    ChangedSuccessfully,
}

impl Status {
    pub fn from_changed(changed: bool) -> Status {
        if changed {
            Status::ChangedSuccessfully
        } else {
            Status::Unchanged
        }
    }
}

/// Analyses a pass leaves valid on the module it rewrote, for a host
/// pipeline that caches analyses between passes. Every pass here adds
/// declarations, so none survive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PreservedAnalyses {
    None,
}

/// A transformation over a whole module.
///
/// An `Err` from `process` is an internal-invariant violation: the
/// host must abort the pipeline, since the module may have been left
/// half-rewritten.
pub trait Pass {
    fn name(&self) -> &'static str;
    fn process(&mut self, module: &mut Module) -> Result<Status>;
    fn preserved_analyses(&self) -> PreservedAnalyses {
        PreservedAnalyses::None
    }
}
