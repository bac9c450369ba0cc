//! Integer constant index.

use super::types::TypeManager;
use crate::ir::{Instruction, Module, Op, Operand, Word};
use fxhash::FxHashMap;

/// Index of scalar integer `OpConstant`s, keyed by `(type, value)`.
#[derive(Clone, Debug, Default)]
pub struct ConstantManager {
    by_value: FxHashMap<(Word, u64), Word>,
}

impl ConstantManager {
    pub fn analyze(module: &Module, types: &TypeManager) -> ConstantManager {
        let mut constants = ConstantManager::default();
        for inst in &module.types_global_values {
            constants.record(inst, types);
        }
        constants
    }

    /// Index an `OpConstant` of integer type. Spec constants are never
    /// reused since their value may be overridden.
    pub fn record(&mut self, inst: &Instruction, types: &TypeManager) {
        if inst.class.opcode != Op::Constant {
            return;
        }
        let (ty, id) = match (inst.result_type, inst.result_id) {
            (Some(ty), Some(id)) => (ty, id),
            _ => return,
        };
        if types.int_width(ty).is_none() {
            return;
        }
        let value = match inst.operands.first() {
            Some(&Operand::LiteralBit32(value)) => value as u64,
            Some(&Operand::LiteralBit64(value)) => value,
            _ => return,
        };
        self.by_value.entry((ty, value)).or_insert(id);
    }

    pub fn find(&self, ty: Word, value: u64) -> Option<Word> {
        self.by_value.get(&(ty, value)).copied()
    }
}

/// The `OpConstant` literal operand for `value` at the given width.
pub fn int_literal(width: u32, value: u64) -> Operand {
    if width > 32 {
        Operand::LiteralBit64(value)
    } else {
        Operand::LiteralBit32(value as u32)
    }
}
