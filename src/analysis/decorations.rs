//! Decoration index: `OpDecorate` and `OpMemberDecorate` by target.

use crate::ir::{self, spirv::Decoration, Instruction, Module, Op, Operand, Word};
use fxhash::FxHashMap;
use smallvec::{smallvec, SmallVec};

/// One decoration with its extra operands flattened to words.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DecorationDesc {
    pub decoration: Decoration,
    pub params: SmallVec<[u32; 2]>,
}

/// A decoration on one member of a struct type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MemberDecorationDesc {
    pub member: u32,
    pub decoration: DecorationDesc,
}

impl DecorationDesc {
    pub fn new(decoration: Decoration) -> DecorationDesc {
        DecorationDesc {
            decoration,
            params: smallvec![],
        }
    }

    pub fn with_literal(decoration: Decoration, value: u32) -> DecorationDesc {
        DecorationDesc {
            decoration,
            params: smallvec![value],
        }
    }

    /// Build from the operands following the decoration kind.
    fn from_operands(decoration: Decoration, operands: &[Operand]) -> DecorationDesc {
        let mut params = SmallVec::new();
        for operand in operands {
            push_operand_words(operand, &mut params);
        }
        DecorationDesc { decoration, params }
    }

    /// Operands for the decoration kind and its parameters. Parameters
    /// are emitted as 32-bit literals, which covers every decoration
    /// this crate creates.
    pub fn to_operands(&self) -> Vec<Operand> {
        std::iter::once(Operand::Decoration(self.decoration))
            .chain(self.params.iter().map(|&word| Operand::LiteralBit32(word)))
            .collect()
    }

    fn sort_key(&self) -> (u32, &[u32]) {
        (self.decoration as u32, &self.params[..])
    }
}

fn push_operand_words(operand: &Operand, params: &mut SmallVec<[u32; 2]>) {
    match *operand {
        Operand::LiteralBit32(value) => params.push(value),
        Operand::LiteralBit64(value) => {
            params.push(value as u32);
            params.push((value >> 32) as u32);
        }
        Operand::IdRef(id) => params.push(id),
        Operand::BuiltIn(builtin) => params.push(builtin as u32),
        Operand::LinkageType(linkage) => params.push(linkage as u32),
        Operand::LiteralString(ref s) => {
            for chunk in s.as_bytes().chunks(4) {
                let mut word = [0u8; 4];
                word[..chunk.len()].copy_from_slice(chunk);
                params.push(u32::from_le_bytes(word));
            }
            params.push(0);
        }
        ref other => {
            log::trace!("decorations: opaque decoration operand {:?}", other);
            params.push(u32::MAX);
        }
    }
}

/// Sort a decoration list into the canonical order used for structural
/// type comparison.
pub fn canonicalize(decorations: &mut [DecorationDesc]) {
    decorations.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
}

pub fn canonicalize_members(decorations: &mut [MemberDecorationDesc]) {
    decorations.sort_by(|a, b| {
        (a.member, a.decoration.sort_key()).cmp(&(b.member, b.decoration.sort_key()))
    });
}

#[derive(Clone, Debug, Default)]
pub struct DecorationManager {
    decorations: FxHashMap<Word, SmallVec<[DecorationDesc; 2]>>,
    member_decorations: FxHashMap<Word, SmallVec<[MemberDecorationDesc; 2]>>,
}

impl DecorationManager {
    pub fn analyze(module: &Module) -> DecorationManager {
        let mut decorations = DecorationManager::default();
        for inst in &module.annotations {
            decorations.record(inst);
        }
        decorations
    }

    /// Index a decoration instruction. Other annotations (decoration
    /// groups, `OpDecorateId`, ...) are ignored.
    pub fn record(&mut self, inst: &Instruction) {
        match inst.class.opcode {
            Op::Decorate => {
                let target = inst.operands.first().and_then(ir::id_operand);
                if let (Some(target), Some(&Operand::Decoration(decoration))) =
                    (target, inst.operands.get(1))
                {
                    let desc = DecorationDesc::from_operands(decoration, &inst.operands[2..]);
                    self.decorations.entry(target).or_default().push(desc);
                }
            }
            Op::MemberDecorate => {
                let target = inst.operands.first().and_then(ir::id_operand);
                let member = inst.operands.get(1).and_then(ir::literal_u32);
                if let (Some(target), Some(member), Some(&Operand::Decoration(decoration))) =
                    (target, member, inst.operands.get(2))
                {
                    let decoration =
                        DecorationDesc::from_operands(decoration, &inst.operands[3..]);
                    self.member_decorations
                        .entry(target)
                        .or_default()
                        .push(MemberDecorationDesc { member, decoration });
                }
            }
            _ => {}
        }
    }

    pub fn decorations_of(&self, target: Word) -> &[DecorationDesc] {
        self.decorations
            .get(&target)
            .map(|list| &list[..])
            .unwrap_or(&[])
    }

    pub fn member_decorations_of(&self, target: Word) -> &[MemberDecorationDesc] {
        self.member_decorations
            .get(&target)
            .map(|list| &list[..])
            .unwrap_or(&[])
    }

    pub fn has_decoration(&self, target: Word, desc: &DecorationDesc) -> bool {
        self.decorations_of(target).contains(desc)
    }

    pub fn has_member_decoration(&self, target: Word, member: u32, desc: &DecorationDesc) -> bool {
        self.member_decorations_of(target)
            .iter()
            .any(|m| m.member == member && &m.decoration == desc)
    }
}
