//! Dense trace indices for reachable basic blocks.

use crate::cfg::process_entry_point_call_tree;
use crate::context::IrContext;
use crate::entity::{EntityRef, EntityVec};
use crate::errors::PassError;
use crate::ir::{self, Word};
use anyhow::Result;
use std::collections::BTreeMap;

crate::entity!(TraceIndex, "bb");

/// Bijection between the labels of reachable blocks and their trace
/// indices, which are dense and start at zero.
#[derive(Clone, Debug, Default)]
pub struct BlockTraceMap {
    by_label: BTreeMap<Word, TraceIndex>,
    labels: EntityVec<TraceIndex, Word>,
}

impl BlockTraceMap {
    /// Assign the next index to `label`.
    fn push(&mut self, label: Word) -> Result<TraceIndex> {
        if self.by_label.contains_key(&label) {
            return Err(PassError::Internal(format!("block {} labeled twice", label)).into());
        }
        let index = self.labels.push(label);
        self.by_label.insert(label, index);
        Ok(index)
    }

    pub fn index_of(&self, label: Word) -> Option<TraceIndex> {
        self.by_label.get(&label).copied()
    }

    pub fn label_of(&self, index: TraceIndex) -> Option<Word> {
        self.labels.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// `(label, index)` pairs in label order.
    pub fn iter(&self) -> impl Iterator<Item = (Word, TraceIndex)> + '_ {
        self.by_label.iter().map(|(&label, &index)| (label, index))
    }

    /// `(index, label)` pairs in index order.
    pub fn by_index(&self) -> impl Iterator<Item = (TraceIndex, Word)> + '_ {
        self.labels.entries().map(|(index, &label)| (index, label))
    }
}

/// Number every block reachable from an entry point, in call-tree
/// order. Does not modify the module.
pub fn label_blocks(ctx: &mut IrContext) -> Result<BlockTraceMap> {
    let mut map = BlockTraceMap::default();
    process_entry_point_call_tree(ctx, |_, func| {
        for block in &func.blocks {
            let label = ir::block_label(block).ok_or(PassError::MissingLabel)?;
            let index = map.push(label)?;
            log::trace!("label_blocks: {} -> {}", label, index);
        }
        Ok(false)
    })?;
    log::debug!("label_blocks: {} reachable blocks", map.len());
    debug_assert!(map.by_index().all(|(index, label)| map.index_of(label) == Some(index)));
    debug_assert!(map
        .by_index()
        .enumerate()
        .all(|(i, (index, _))| index.index() == i));
    Ok(map)
}
