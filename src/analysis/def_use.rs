//! Definition-use index.

use crate::ir::{self, Instruction, Module, Op, Word};
use fxhash::FxHashMap;

/// Which IDs are defined (and by what opcode), and how many times each
/// ID is used across the module.
#[derive(Clone, Debug, Default)]
pub struct DefUseManager {
    defs: FxHashMap<Word, Op>,
    uses: FxHashMap<Word, usize>,
}

impl DefUseManager {
    pub fn analyze(module: &Module) -> DefUseManager {
        let mut def_use = DefUseManager::default();
        for inst in ir::module_insts(module) {
            def_use.analyze_inst(inst);
        }
        log::debug!(
            "def_use: {} defs, {} used ids",
            def_use.defs.len(),
            def_use.uses.len()
        );
        def_use
    }

    /// Record the definition and uses of a newly added instruction.
    pub fn analyze_inst(&mut self, inst: &Instruction) {
        if let Some(id) = inst.result_id {
            self.defs.insert(id, inst.class.opcode);
        }
        ir::visit_inst_uses(inst, |id| *self.uses.entry(id).or_insert(0) += 1);
    }

    /// Replace the uses recorded for `old` with those of `new`, for an
    /// instruction that was edited in place.
    pub fn reanalyze_uses(&mut self, old: &Instruction, new: &Instruction) {
        ir::visit_inst_uses(old, |id| {
            if let Some(count) = self.uses.get_mut(&id) {
                *count = count.saturating_sub(1);
            }
        });
        ir::visit_inst_uses(new, |id| *self.uses.entry(id).or_insert(0) += 1);
    }

    pub fn num_uses(&self, id: Word) -> usize {
        self.uses.get(&id).copied().unwrap_or(0)
    }

    pub fn def_opcode(&self, id: Word) -> Option<Op> {
        self.defs.get(&id).copied()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ir::Operand;

    #[test]
    fn counts_result_types_and_id_operands() {
        let mut def_use = DefUseManager::default();
        def_use.analyze_inst(&Instruction::new(
            Op::TypeInt,
            None,
            Some(1),
            vec![Operand::LiteralBit32(32), Operand::LiteralBit32(0)],
        ));
        def_use.analyze_inst(&Instruction::new(
            Op::Constant,
            Some(1),
            Some(2),
            vec![Operand::LiteralBit32(7)],
        ));
        let old = Instruction::new(Op::IAdd, Some(1), Some(3), vec![Operand::IdRef(2)]);
        def_use.analyze_inst(&old);
        assert_eq!(def_use.num_uses(1), 2);
        assert_eq!(def_use.num_uses(2), 1);
        assert_eq!(def_use.def_opcode(2), Some(Op::Constant));

        let mut new = old.clone();
        new.operands.push(Operand::IdRef(2));
        def_use.reanalyze_uses(&old, &new);
        assert_eq!(def_use.num_uses(1), 2);
        assert_eq!(def_use.num_uses(2), 2);
        assert_eq!(def_use.num_uses(99), 0);
    }
}
