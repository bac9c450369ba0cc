//! Basic-block trace instrumentation.
//!
//! Every basic block reachable from an entry point gets a counter slot
//! in a storage buffer (see `trace_buffer`) and a short sequence at its
//! top that bumps that counter. After the instrumented shader runs,
//! slot `i` of the buffer holds how many times the block with trace
//! index `i` was entered.
//!
//! The pass runs in two walks over the same call tree. The first
//! assigns trace indices without touching the module; the
//! registered callbacks then see the final numbering. The second walk
//! inserts, after any leading `OpVariable`s (entry block) or `OpPhi`s:
//!
//! ```plain
//! %ptr = OpAccessChain %_ptr_StorageBuffer_uint %basic_block_trace_buffer %uint_0 %uint_<index>
//! %old = OpAtomicIAdd %uint %ptr %uint_1 %uint_0 %uint_1
//! ```
//!
//! or, with `CounterUpdate::LoadAddStore`,
//!
//! ```plain
//! %ptr = OpAccessChain %_ptr_StorageBuffer_uint %basic_block_trace_buffer %uint_0 %uint_<index>
//! %val = OpLoad %uint %ptr
//! %inc = OpIAdd %uint %val %uint_1
//!        OpStore %ptr %inc
//! ```
//!
//! The second form is not atomic: concurrent invocations entering the
//! same block race on the counter and may lose increments.

use super::block_labels::{label_blocks, BlockTraceMap, TraceIndex};
use super::trace_buffer::TraceBufferProvisioner;
use super::{Pass, PreservedAnalyses, Status};
use crate::cfg::process_entry_point_call_tree;
use crate::context::IrContext;
use crate::errors::PassError;
use crate::ir::{
    self,
    spirv::{Op, Scope},
    Function, Instruction, Module, Operand, Word,
};
use anyhow::Result;
use smallvec::{smallvec, SmallVec};

/// How a counter is incremented.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CounterUpdate {
    /// `OpAtomicIAdd` at device scope with relaxed semantics.
    Atomic,
    /// `OpLoad`, `OpIAdd`, `OpStore`. Racy under parallel invocations.
    LoadAddStore,
}

/// Options fixed for the lifetime of one pass instance.
#[derive(Clone, Copy, Debug)]
pub struct TraceOptions {
    /// Use 64-bit counters instead of 32-bit ones.
    pub wide_counters: bool,
    pub update: CounterUpdate,
}

impl Default for TraceOptions {
    fn default() -> Self {
        TraceOptions {
            wide_counters: false,
            update: CounterUpdate::Atomic,
        }
    }
}

/// Summary of the most recent run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TraceStats {
    pub blocks_labeled: usize,
    pub blocks_instrumented: usize,
    /// Blocks with nothing after their leading `OpVariable`s.
    pub blocks_skipped: usize,
    pub trace_buffer: Option<Word>,
    pub anomalies: usize,
}

pub type BlockCountCallback = Box<dyn FnMut(usize)>;
pub type BlockCorrespondenceCallback = Box<dyn FnMut(&BlockTraceMap)>;

pub struct BlockTracePass {
    options: TraceOptions,
    block_count_callback: Option<BlockCountCallback>,
    correspondence_callback: Option<BlockCorrespondenceCallback>,
    last_run: TraceStats,
}

impl BlockTracePass {
    pub fn new(options: TraceOptions) -> BlockTracePass {
        BlockTracePass {
            options,
            block_count_callback: None,
            correspondence_callback: None,
            last_run: TraceStats::default(),
        }
    }

    pub fn options(&self) -> &TraceOptions {
        &self.options
    }

    /// Called once per run with the number of traced blocks, before
    /// any instrumentation is inserted.
    pub fn register_block_count_callback<F: FnMut(usize) + 'static>(&mut self, f: F) {
        self.block_count_callback = Some(Box::new(f));
    }

    /// Called once per run with the label to trace index map, before
    /// any instrumentation is inserted.
    pub fn register_block_correspondence_callback<F: FnMut(&BlockTraceMap) + 'static>(
        &mut self,
        f: F,
    ) {
        self.correspondence_callback = Some(Box::new(f));
    }

    pub fn last_run(&self) -> &TraceStats {
        &self.last_run
    }
}

impl Default for BlockTracePass {
    fn default() -> Self {
        BlockTracePass::new(TraceOptions::default())
    }
}

impl Pass for BlockTracePass {
    fn name(&self) -> &'static str {
        "inst-basic-block-trace"
    }

    fn process(&mut self, module: &mut Module) -> Result<Status> {
        let mut ctx = IrContext::new(module)?;
        let labels = label_blocks(&mut ctx)?;

        if let Some(callback) = self.block_count_callback.as_mut() {
            callback(labels.len());
        }
        if let Some(callback) = self.correspondence_callback.as_mut() {
            callback(&labels);
        }

        let mut run = BlockTraceRun {
            update: self.options.update,
            labels: &labels,
            buffer: TraceBufferProvisioner::new(self.options.wide_counters),
            stats: TraceStats {
                blocks_labeled: labels.len(),
                ..TraceStats::default()
            },
        };
        let changed = process_entry_point_call_tree(&mut ctx, |ctx, func| {
            run.instrument_function(ctx, func)
        })?;

        run.stats.trace_buffer = run.buffer.buffer_id();
        run.stats.anomalies = run.buffer.anomalies();
        log::debug!(
            "{}: instrumented {} of {} blocks ({} ids allocated)",
            self.name(),
            run.stats.blocks_instrumented,
            run.stats.blocks_labeled,
            ctx.ids().issued()
        );
        self.last_run = run.stats;
        Ok(Status::from_changed(changed))
    }

    fn preserved_analyses(&self) -> PreservedAnalyses {
        PreservedAnalyses::None
    }
}

/// State for the instrumenting walk of one run.
struct BlockTraceRun<'a> {
    update: CounterUpdate,
    labels: &'a BlockTraceMap,
    buffer: TraceBufferProvisioner,
    stats: TraceStats,
}

impl<'a> BlockTraceRun<'a> {
    fn instrument_function(&mut self, ctx: &mut IrContext, func: &mut Function) -> Result<bool> {
        let mut changed = false;
        for block in func.blocks.iter_mut() {
            // `OpVariable`s must stay at the very top of the entry block,
            // and `OpPhi`s at the top of any block.
            let start = block
                .instructions
                .iter()
                .take_while(|inst| matches!(inst.class.opcode, Op::Variable | Op::Phi))
                .count();
            if start == block.instructions.len() {
                log::trace!(
                    "instrument_function: skipping empty block {:?}",
                    ir::block_label(block)
                );
                self.stats.blocks_skipped += 1;
                continue;
            }

            let label = ir::block_label(block).ok_or(PassError::MissingLabel)?;
            let index = self
                .labels
                .index_of(label)
                .ok_or(PassError::UnlabeledBlock(label))?;
            let increment = self.counter_increment(ctx, index)?;
            log::trace!(
                "instrument_function: block {} ({}) gets {} insts at {}",
                label,
                index,
                increment.len(),
                start
            );
            block.instructions.splice(start..start, increment);
            self.stats.blocks_instrumented += 1;
            changed = true;
        }
        Ok(changed)
    }

    /// Build the sequence that bumps counter `index`.
    fn counter_increment(
        &mut self,
        ctx: &mut IrContext,
        index: TraceIndex,
    ) -> Result<SmallVec<[Instruction; 4]>> {
        let buffer = self.buffer.get_trace_buffer_id(ctx)?;
        let pointer_type = self.buffer.element_pointer_type_id(ctx)?;
        let element_type = self.buffer.element_type_id(ctx)?;
        let width = self.buffer.counter_width();

        let zero = ctx.get_uint_const_id(32, 0)?;
        let one = ctx.get_uint_const_id(32, 1)?;
        let slot = ctx.get_uint_const_id(32, u64::from(u32::from(index)))?;
        let one_counter = ctx.get_uint_const_id(width, 1)?;

        let pointer = ctx.take_next_id()?;
        let mut insts: SmallVec<[Instruction; 4]> = smallvec![Instruction::new(
            Op::AccessChain,
            Some(pointer_type),
            Some(pointer),
            vec![
                Operand::IdRef(buffer),
                Operand::IdRef(zero),
                Operand::IdRef(slot),
            ],
        )];

        match self.update {
            CounterUpdate::Atomic => {
                let scope = ctx.get_uint_const_id(32, Scope::Device as u64)?;
                debug_assert_eq!(scope, one);
                let old = ctx.take_next_id()?;
                insts.push(Instruction::new(
                    Op::AtomicIAdd,
                    Some(element_type),
                    Some(old),
                    vec![
                        Operand::IdRef(pointer),
                        Operand::IdScope(scope),
                        // Relaxed.
                        Operand::IdMemorySemantics(zero),
                        Operand::IdRef(one_counter),
                    ],
                ));
            }
            CounterUpdate::LoadAddStore => {
                let value = ctx.take_next_id()?;
                let sum = ctx.take_next_id()?;
                insts.push(Instruction::new(
                    Op::Load,
                    Some(element_type),
                    Some(value),
                    vec![Operand::IdRef(pointer)],
                ));
                insts.push(Instruction::new(
                    Op::IAdd,
                    Some(element_type),
                    Some(sum),
                    vec![Operand::IdRef(value), Operand::IdRef(one_counter)],
                ));
                insts.push(Instruction::new(
                    Op::Store,
                    None,
                    None,
                    vec![Operand::IdRef(pointer), Operand::IdRef(sum)],
                ));
            }
        }

        for inst in &insts {
            ctx.analyze_inst(inst);
        }
        Ok(insts)
    }
}
