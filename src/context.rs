//! Per-invocation IR context: a module plus the analyses that keep track
//! of it while a pass adds declarations and instructions.

use crate::analysis::constants::int_literal;
use crate::analysis::{
    ConstantManager, DecorationDesc, DecorationManager, DefUseManager, FeatureManager,
    IdAllocator, MemberDecorationDesc, TypeDesc, TypeManager,
};
use crate::errors::PassError;
use crate::ir::{
    self,
    spirv::{Capability, StorageClass},
    Instruction, Module, Op, Operand, Word,
};
use anyhow::Result;

/// Owns exclusive access to a module for the duration of one pass
/// invocation, along with the ID allocator and the interner caches.
///
/// Every mutation made through the context is reflected in its
/// analyses. Function bodies are edited outside the context (see
/// `cfg::calltree`), and instructions added there must be reported
/// with `analyze_inst`.
pub struct IrContext<'m> {
    pub(crate) module: &'m mut Module,
    ids: IdAllocator,
    types: TypeManager,
    constants: ConstantManager,
    decorations: DecorationManager,
    features: FeatureManager,
    def_use: DefUseManager,
}

impl<'m> IrContext<'m> {
    pub fn new(module: &'m mut Module) -> Result<IrContext<'m>> {
        if module.header.is_none() {
            return Err(PassError::MissingHeader.into());
        }
        let decorations = DecorationManager::analyze(module);
        let types = TypeManager::analyze(module, &decorations);
        let constants = ConstantManager::analyze(module, &types);
        let features = FeatureManager::analyze(module);
        let def_use = DefUseManager::analyze(module);
        Ok(IrContext {
            module,
            ids: IdAllocator::default(),
            types,
            constants,
            decorations,
            features,
            def_use,
        })
    }

    pub fn module(&self) -> &Module {
        &*self.module
    }

    /// The module's version word (see `ir::version_word`).
    pub fn version(&self) -> Word {
        ir::module_version(&*self.module).unwrap_or(0)
    }

    pub fn take_next_id(&mut self) -> Result<Word> {
        let header = self
            .module
            .header
            .as_mut()
            .ok_or(PassError::MissingHeader)?;
        self.ids.take_next_id(header)
    }

    pub fn ids(&self) -> &IdAllocator {
        &self.ids
    }

    pub fn types(&self) -> &TypeManager {
        &self.types
    }

    pub fn def_use(&self) -> &DefUseManager {
        &self.def_use
    }

    /// Record an instruction added to a function body.
    pub fn analyze_inst(&mut self, inst: &Instruction) {
        self.def_use.analyze_inst(inst);
    }

    /// Find or create the declaration for `desc`, including its
    /// decorations.
    pub fn get_type_id(&mut self, desc: &TypeDesc) -> Result<Word> {
        if let Some(id) = self.types.find(desc) {
            return Ok(id);
        }
        self.add_type(desc)
    }

    /// Declare `desc` under a fresh ID, even if an identical
    /// declaration exists.
    pub fn add_type(&mut self, desc: &TypeDesc) -> Result<Word> {
        let id = self.take_next_id()?;
        self.add_global_value(desc.to_inst(id));
        self.decorate_type(id, desc);
        self.types.register(desc.clone(), id);
        log::debug!("add_type: created {} for {:?}", id, desc);
        Ok(id)
    }

    /// Give the existing declaration `id` the decorations of `desc`, and
    /// index it under `desc` from now on. `desc` must describe the same
    /// declaration, decorations aside.
    pub fn adopt_type(&mut self, id: Word, desc: &TypeDesc) {
        self.decorate_type(id, desc);
        self.types.register(desc.clone(), id);
        log::debug!("adopt_type: {} is now {:?}", id, desc);
    }

    fn decorate_type(&mut self, id: Word, desc: &TypeDesc) {
        for decoration in desc.decorations() {
            self.add_decoration(id, decoration.clone());
        }
        for member in desc.member_decorations() {
            self.add_member_decoration(id, member.member, member.decoration.clone());
        }
    }

    pub fn get_uint_type_id(&mut self, width: u32) -> Result<Word> {
        match width {
            8 | 16 | 32 | 64 => self.get_type_id(&TypeDesc::uint(width)),
            _ => Err(PassError::Internal(format!("unsupported integer width {}", width)).into()),
        }
    }

    pub fn get_runtime_array_type_id(&mut self, element: Word, stride: u32) -> Result<Word> {
        self.get_type_id(&TypeDesc::runtime_array(element, stride))
    }

    pub fn get_struct_type_id(
        &mut self,
        members: &[Word],
        decorations: &[DecorationDesc],
        member_decorations: &[MemberDecorationDesc],
    ) -> Result<Word> {
        self.get_type_id(&TypeDesc::structure(
            members,
            decorations,
            member_decorations,
        ))
    }

    pub fn get_pointer_type_id(
        &mut self,
        pointee: Word,
        storage_class: StorageClass,
    ) -> Result<Word> {
        self.get_type_id(&TypeDesc::pointer(pointee, storage_class))
    }

    /// Find or create an unsigned integer constant.
    pub fn get_uint_const_id(&mut self, width: u32, value: u64) -> Result<Word> {
        let ty = self.get_uint_type_id(width)?;
        if let Some(id) = self.constants.find(ty, value) {
            return Ok(id);
        }
        let id = self.take_next_id()?;
        let inst = Instruction::new(
            Op::Constant,
            Some(ty),
            Some(id),
            vec![int_literal(width, value)],
        );
        self.constants.record(&inst, &self.types);
        self.add_global_value(inst);
        log::trace!("get_uint_const_id: created {} = u{} {}", id, width, value);
        Ok(id)
    }

    /// Append a type, constant or global variable declaration.
    pub fn add_global_value(&mut self, inst: Instruction) {
        self.def_use.analyze_inst(&inst);
        self.module.types_global_values.push(inst);
    }

    /// Add `OpDecorate` unless an identical one is present.
    pub fn add_decoration(&mut self, target: Word, desc: DecorationDesc) -> bool {
        if self.decorations.has_decoration(target, &desc) {
            return false;
        }
        let mut operands = vec![Operand::IdRef(target)];
        operands.extend(desc.to_operands());
        self.add_annotation(Instruction::new(Op::Decorate, None, None, operands));
        true
    }

    /// Add `OpMemberDecorate` unless an identical one is present.
    pub fn add_member_decoration(&mut self, target: Word, member: u32, desc: DecorationDesc) -> bool {
        if self.decorations.has_member_decoration(target, member, &desc) {
            return false;
        }
        let mut operands = vec![Operand::IdRef(target), Operand::LiteralBit32(member)];
        operands.extend(desc.to_operands());
        self.add_annotation(Instruction::new(Op::MemberDecorate, None, None, operands));
        true
    }

    fn add_annotation(&mut self, inst: Instruction) {
        self.decorations.record(&inst);
        self.def_use.analyze_inst(&inst);
        self.module.annotations.push(inst);
    }

    /// Whether `target` (or one of its members, if `member` is given)
    /// already carries a debug name.
    pub fn has_debug_name(&self, target: Word, member: Option<u32>) -> bool {
        self.module.debug_names.iter().any(|inst| {
            let names_target = inst.operands.first().and_then(ir::id_operand) == Some(target);
            match (inst.class.opcode, member) {
                (Op::Name, None) => names_target,
                (Op::MemberName, Some(member)) => {
                    names_target && inst.operands.get(1).and_then(ir::literal_u32) == Some(member)
                }
                _ => false,
            }
        })
    }

    /// Add `OpName`, unless the target is already named.
    pub fn add_debug_name(&mut self, target: Word, name: &str) -> bool {
        if self.has_debug_name(target, None) {
            return false;
        }
        self.add_debug_inst(Instruction::new(
            Op::Name,
            None,
            None,
            vec![Operand::IdRef(target), Operand::LiteralString(name.into())],
        ));
        true
    }

    /// Add `OpMemberName`, unless the member is already named.
    pub fn add_member_name(&mut self, target: Word, member: u32, name: &str) -> bool {
        if self.has_debug_name(target, Some(member)) {
            return false;
        }
        self.add_debug_inst(Instruction::new(
            Op::MemberName,
            None,
            None,
            vec![
                Operand::IdRef(target),
                Operand::LiteralBit32(member),
                Operand::LiteralString(name.into()),
            ],
        ));
        true
    }

    fn add_debug_inst(&mut self, inst: Instruction) {
        self.def_use.analyze_inst(&inst);
        self.module.debug_names.push(inst);
    }

    pub fn add_extension(&mut self, name: &str) -> bool {
        if self.features.has_extension(name) {
            return false;
        }
        let inst = Instruction::new(
            Op::Extension,
            None,
            None,
            vec![Operand::LiteralString(name.into())],
        );
        self.features.record(&inst);
        self.module.extensions.push(inst);
        log::debug!("add_extension: {}", name);
        true
    }

    pub fn add_capability(&mut self, capability: Capability) -> bool {
        if self.features.has_capability(capability) {
            return false;
        }
        let inst = Instruction::new(
            Op::Capability,
            None,
            None,
            vec![Operand::Capability(capability)],
        );
        self.features.record(&inst);
        self.module.capabilities.push(inst);
        log::debug!("add_capability: {:?}", capability);
        true
    }

    /// Append `var` to the interface list of every entry point and
    /// refresh each entry point's uses. Returns how many entry points
    /// were updated.
    pub fn add_to_entry_point_interfaces(&mut self, var: Word) -> usize {
        let mut updated = 0;
        for entry in self.module.entry_points.iter_mut() {
            let old = entry.clone();
            entry.operands.push(Operand::IdRef(var));
            self.def_use.reanalyze_uses(&old, entry);
            updated += 1;
        }
        updated
    }
}
