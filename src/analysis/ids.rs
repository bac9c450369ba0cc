//! ID allocation, backed by the module header's ID bound.

use crate::errors::PassError;
use crate::ir::{ModuleHeader, Word};
use anyhow::Result;

/// Largest ID bound tooling is expected to accept.
pub const MAX_ID_BOUND: Word = 0x3F_FFFF;

/// Hands out fresh IDs by bumping the header's bound. Every ID issued
/// is strictly greater than every ID issued before it, and than every
/// ID already present in a well-formed module.
#[derive(Clone, Debug, Default)]
pub struct IdAllocator {
    issued: usize,
}

impl IdAllocator {
    pub fn take_next_id(&mut self, header: &mut ModuleHeader) -> Result<Word> {
        // ID 0 is never valid.
        let id = header.bound.max(1);
        if id >= MAX_ID_BOUND {
            return Err(PassError::IdOverflow.into());
        }
        header.bound = id + 1;
        self.issued += 1;
        log::trace!("take_next_id: {}", id);
        Ok(id)
    }

    /// How many IDs this allocator has handed out.
    pub fn issued(&self) -> usize {
        self.issued
    }
}
