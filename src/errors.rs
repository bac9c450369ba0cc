//! Error types.

use rspirv::spirv::Word;

/// An internal-invariant violation detected while running a pass.
///
/// These indicate that the input module broke its own structural
/// contract (or that an analysis is out of sync with the module). None
/// of them are recoverable: the pass stops and the module may be left
/// partially rewritten.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PassError {
    /// The module has no header, so it has no ID bound or version.
    MissingHeader,
    /// No more IDs can be allocated below the maximum ID bound.
    IdOverflow,
    /// A basic block has no `OpLabel`, or its label has no result ID.
    MissingLabel,
    /// A reachable block was never assigned a trace index.
    UnlabeledBlock(Word),
    /// Some other internal error occurred.
    Internal(String),
}

impl std::fmt::Display for PassError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

impl std::error::Error for PassError {}
