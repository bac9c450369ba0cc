//! Helpers over `rspirv`'s data representation of a SPIR-V module.
//!
//! The module itself (`Module`, `Function`, `Block`, `Instruction`) is
//! `rspirv::dr`; this file only adds the small queries that the
//! analyses and passes in this crate share.

pub use rspirv::dr::{Block, Function, Instruction, Module, ModuleHeader, Operand};
pub use rspirv::spirv::{self, Op, Word};

/// Encode a SPIR-V version as it appears in the module header.
pub const fn version_word(major: u8, minor: u8) -> Word {
    ((major as Word) << 16) | ((minor as Word) << 8)
}

/// The module's version word, if it has a header.
pub fn module_version(module: &Module) -> Option<Word> {
    module.header.as_ref().map(|header| header.version)
}

/// The ID carried by an operand, if it refers to one.
pub fn id_operand(operand: &Operand) -> Option<Word> {
    match *operand {
        Operand::IdRef(id) | Operand::IdScope(id) | Operand::IdMemorySemantics(id) => Some(id),
        _ => None,
    }
}

/// A 32-bit literal operand.
pub fn literal_u32(operand: &Operand) -> Option<u32> {
    match *operand {
        Operand::LiteralBit32(value) => Some(value),
        _ => None,
    }
}

/// Visit every ID an instruction uses: its result type and every ID
/// operand, in operand order.
pub fn visit_inst_uses<F: FnMut(Word)>(inst: &Instruction, mut f: F) {
    if let Some(ty) = inst.result_type {
        f(ty);
    }
    for operand in &inst.operands {
        if let Some(id) = id_operand(operand) {
            f(id);
        }
    }
}

/// The result ID of a function's `OpFunction`.
pub fn function_id(func: &Function) -> Option<Word> {
    func.def.as_ref().and_then(|def| def.result_id)
}

/// The result ID of a block's `OpLabel`.
pub fn block_label(block: &Block) -> Option<Word> {
    block.label.as_ref().and_then(|label| label.result_id)
}

/// The function an `OpEntryPoint` names.
pub fn entry_point_function(entry: &Instruction) -> Option<Word> {
    entry.operands.get(1).and_then(id_operand)
}

/// Callees of every `OpFunctionCall` in `func`, in call-site order.
pub fn callees(func: &Function) -> impl Iterator<Item = Word> + '_ {
    func.blocks
        .iter()
        .flat_map(|block| block.instructions.iter())
        .filter(|inst| inst.class.opcode == Op::FunctionCall)
        .filter_map(|inst| inst.operands.first().and_then(id_operand))
}

/// Every instruction in the module, in logical layout order.
pub fn module_insts(module: &Module) -> impl Iterator<Item = &Instruction> {
    module
        .capabilities
        .iter()
        .chain(module.extensions.iter())
        .chain(module.ext_inst_imports.iter())
        .chain(module.memory_model.iter())
        .chain(module.entry_points.iter())
        .chain(module.execution_modes.iter())
        .chain(module.debug_string_source.iter())
        .chain(module.debug_names.iter())
        .chain(module.debug_module_processed.iter())
        .chain(module.annotations.iter())
        .chain(module.types_global_values.iter())
        .chain(module.functions.iter().flat_map(function_insts))
}

/// Every instruction in a function, including its `OpFunction`,
/// parameters, labels and `OpFunctionEnd`.
pub fn function_insts(func: &Function) -> impl Iterator<Item = &Instruction> {
    func.def
        .iter()
        .chain(func.parameters.iter())
        .chain(func.blocks.iter().flat_map(|block| {
            block.label.iter().chain(block.instructions.iter())
        }))
        .chain(func.end.iter())
}
