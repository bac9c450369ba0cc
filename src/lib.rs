//! Basic-block execution trace instrumentation for SPIR-V.
//!
//! `BlockTracePass` rewrites a module (in `rspirv`'s data
//! representation) so that every basic block reachable from an entry
//! point increments its own counter in a storage buffer bound at
//! descriptor set 5, binding 1.

// Re-export rspirv for easier use of the right version by our embedders.
pub use rspirv;

pub mod analysis;
pub mod cfg;
pub mod context;
pub mod entity;
mod errors;
pub mod ir;
pub mod passes;

pub use context::IrContext;
pub use errors::*;
pub use passes::block_labels::{label_blocks, BlockTraceMap, TraceIndex};
pub use passes::block_trace::{BlockTracePass, CounterUpdate, TraceOptions, TraceStats};
pub use passes::trace_buffer::{
    TraceBufferProvisioner, TRACE_BUFFER_BINDING, TRACE_BUFFER_DESCRIPTOR_SET,
};
pub use passes::{Pass, PreservedAnalyses, Status};
