//! Structural type descriptors and the type interner's index.
//!
//! A `TypeDesc` captures everything that makes two SPIR-V type
//! declarations interchangeable: the opcode's operands plus the
//! decorations attached to the type. Two descriptors compare equal
//! exactly when one declaration can stand in for the other, so a
//! `TypeDesc -> Word` map is enough to deduplicate.

use super::decorations::{
    canonicalize, canonicalize_members, DecorationDesc, DecorationManager, MemberDecorationDesc,
};
use crate::ir::{self, spirv::StorageClass, Instruction, Module, Op, Operand, Word};
use fxhash::FxHashMap;
use smallvec::SmallVec;

pub type Decorations = SmallVec<[DecorationDesc; 2]>;
pub type MemberDecorations = SmallVec<[MemberDecorationDesc; 2]>;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeDesc {
    Int {
        width: u32,
        signed: bool,
    },
    RuntimeArray {
        element: Word,
        decorations: Decorations,
    },
    Struct {
        members: SmallVec<[Word; 4]>,
        decorations: Decorations,
        member_decorations: MemberDecorations,
    },
    /// Pointers are keyed on pointee and storage class only; decorated
    /// pointer declarations are never indexed.
    Pointer {
        pointee: Word,
        storage_class: StorageClass,
    },
}

impl TypeDesc {
    pub fn uint(width: u32) -> TypeDesc {
        TypeDesc::Int {
            width,
            signed: false,
        }
    }

    pub fn runtime_array(element: Word, stride: u32) -> TypeDesc {
        TypeDesc::RuntimeArray {
            element,
            decorations: std::iter::once(DecorationDesc::with_literal(
                crate::ir::spirv::Decoration::ArrayStride,
                stride,
            ))
            .collect(),
        }
    }

    pub fn structure(
        members: &[Word],
        decorations: &[DecorationDesc],
        member_decorations: &[MemberDecorationDesc],
    ) -> TypeDesc {
        let mut decorations: Decorations = decorations.iter().cloned().collect();
        let mut member_decorations: MemberDecorations =
            member_decorations.iter().cloned().collect();
        canonicalize(&mut decorations);
        canonicalize_members(&mut member_decorations);
        TypeDesc::Struct {
            members: members.iter().copied().collect(),
            decorations,
            member_decorations,
        }
    }

    pub fn pointer(pointee: Word, storage_class: StorageClass) -> TypeDesc {
        TypeDesc::Pointer {
            pointee,
            storage_class,
        }
    }

    /// Describe an existing type declaration, if it is one of the kinds
    /// this interner handles.
    pub fn from_inst(inst: &Instruction, decorations: &DecorationManager) -> Option<TypeDesc> {
        let id = inst.result_id?;
        let mut decos: Decorations = decorations.decorations_of(id).iter().cloned().collect();
        canonicalize(&mut decos);
        match inst.class.opcode {
            Op::TypeInt => {
                let width = inst.operands.get(0).and_then(ir::literal_u32)?;
                let signed = inst.operands.get(1).and_then(ir::literal_u32)?;
                Some(TypeDesc::Int {
                    width,
                    signed: signed != 0,
                })
            }
            Op::TypeRuntimeArray => {
                let element = inst.operands.get(0).and_then(ir::id_operand)?;
                Some(TypeDesc::RuntimeArray {
                    element,
                    decorations: decos,
                })
            }
            Op::TypeStruct => {
                let members = inst
                    .operands
                    .iter()
                    .map(ir::id_operand)
                    .collect::<Option<SmallVec<[Word; 4]>>>()?;
                let mut member_decorations: MemberDecorations = decorations
                    .member_decorations_of(id)
                    .iter()
                    .cloned()
                    .collect();
                canonicalize_members(&mut member_decorations);
                Some(TypeDesc::Struct {
                    members,
                    decorations: decos,
                    member_decorations,
                })
            }
            Op::TypePointer => {
                if !decos.is_empty() {
                    return None;
                }
                let storage_class = match inst.operands.get(0) {
                    Some(&Operand::StorageClass(storage_class)) => storage_class,
                    _ => return None,
                };
                let pointee = inst.operands.get(1).and_then(ir::id_operand)?;
                Some(TypeDesc::Pointer {
                    pointee,
                    storage_class,
                })
            }
            _ => None,
        }
    }

    /// The declaring instruction, without decorations.
    pub fn to_inst(&self, result_id: Word) -> Instruction {
        let (opcode, operands) = match self {
            TypeDesc::Int { width, signed } => (
                Op::TypeInt,
                vec![
                    Operand::LiteralBit32(*width),
                    Operand::LiteralBit32(*signed as u32),
                ],
            ),
            TypeDesc::RuntimeArray { element, .. } => {
                (Op::TypeRuntimeArray, vec![Operand::IdRef(*element)])
            }
            TypeDesc::Struct { members, .. } => (
                Op::TypeStruct,
                members.iter().map(|&member| Operand::IdRef(member)).collect(),
            ),
            TypeDesc::Pointer {
                pointee,
                storage_class,
            } => (
                Op::TypePointer,
                vec![
                    Operand::StorageClass(*storage_class),
                    Operand::IdRef(*pointee),
                ],
            ),
        };
        Instruction::new(opcode, None, Some(result_id), operands)
    }

    pub fn decorations(&self) -> &[DecorationDesc] {
        match self {
            TypeDesc::RuntimeArray { decorations, .. } | TypeDesc::Struct { decorations, .. } => {
                &decorations[..]
            }
            _ => &[],
        }
    }

    pub fn member_decorations(&self) -> &[MemberDecorationDesc] {
        match self {
            TypeDesc::Struct {
                member_decorations, ..
            } => &member_decorations[..],
            _ => &[],
        }
    }
}

/// Index from structural description to declaring ID.
#[derive(Clone, Debug, Default)]
pub struct TypeManager {
    by_desc: FxHashMap<TypeDesc, Word>,
    by_id: FxHashMap<Word, TypeDesc>,
    /// Structs by member list alone, whatever their decorations.
    structs_by_members: FxHashMap<SmallVec<[Word; 4]>, Word>,
}

impl TypeManager {
    pub fn analyze(module: &Module, decorations: &DecorationManager) -> TypeManager {
        let mut types = TypeManager::default();
        for inst in &module.types_global_values {
            if let Some(desc) = TypeDesc::from_inst(inst, decorations) {
                // Keep the first of any structurally identical duplicates.
                types.register(desc, inst.result_id.unwrap_or_default());
            }
        }
        log::debug!("types: indexed {} type declarations", types.by_id.len());
        types
    }

    pub fn find(&self, desc: &TypeDesc) -> Option<Word> {
        self.by_desc.get(desc).copied()
    }

    pub fn lookup(&self, id: Word) -> Option<&TypeDesc> {
        self.by_id.get(&id)
    }

    /// The first struct declared with exactly these members.
    pub fn find_struct(&self, members: &[Word]) -> Option<Word> {
        self.structs_by_members.get(members).copied()
    }

    /// Index `id` under `desc`, replacing whatever `id` was indexed
    /// under before. An existing declaration of `desc` keeps priority.
    pub fn register(&mut self, desc: TypeDesc, id: Word) {
        if let Some(old) = self.by_id.insert(id, desc.clone()) {
            if self.by_desc.get(&old) == Some(&id) {
                self.by_desc.remove(&old);
            }
        }
        if let TypeDesc::Struct { members, .. } = &desc {
            self.structs_by_members.entry(members.clone()).or_insert(id);
        }
        self.by_desc.entry(desc).or_insert(id);
    }

    /// Bit width of an integer type.
    pub fn int_width(&self, id: Word) -> Option<u32> {
        match self.lookup(id) {
            Some(&TypeDesc::Int { width, .. }) => Some(width),
            _ => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ir::spirv::Decoration;

    fn type_int(id: Word, width: u32, signed: u32) -> Instruction {
        Instruction::new(
            Op::TypeInt,
            None,
            Some(id),
            vec![Operand::LiteralBit32(width), Operand::LiteralBit32(signed)],
        )
    }

    #[test]
    fn array_stride_is_part_of_identity() {
        let mut module = Module::new();
        module.types_global_values.push(type_int(1, 32, 0));
        module.types_global_values.push(Instruction::new(
            Op::TypeRuntimeArray,
            None,
            Some(2),
            vec![Operand::IdRef(1)],
        ));
        module.annotations.push(Instruction::new(
            Op::Decorate,
            None,
            None,
            vec![
                Operand::IdRef(2),
                Operand::Decoration(Decoration::ArrayStride),
                Operand::LiteralBit32(4),
            ],
        ));
        let decorations = DecorationManager::analyze(&module);
        let types = TypeManager::analyze(&module, &decorations);

        assert_eq!(types.find(&TypeDesc::uint(32)), Some(1));
        assert_eq!(types.find(&TypeDesc::uint(64)), None);
        assert_eq!(types.find(&TypeDesc::runtime_array(1, 4)), Some(2));
        assert_eq!(types.find(&TypeDesc::runtime_array(1, 8)), None);
        assert_eq!(types.int_width(1), Some(32));
    }

    #[test]
    fn signedness_distinguishes_ints() {
        let mut module = Module::new();
        module.types_global_values.push(type_int(1, 32, 1));
        let types = TypeManager::analyze(&module, &DecorationManager::default());
        assert_eq!(types.find(&TypeDesc::uint(32)), None);
        assert_eq!(
            types.find(&TypeDesc::Int {
                width: 32,
                signed: true
            }),
            Some(1)
        );
    }

    #[test]
    fn first_duplicate_wins() {
        let mut module = Module::new();
        module.types_global_values.push(type_int(3, 32, 0));
        module.types_global_values.push(type_int(1, 32, 0));
        let types = TypeManager::analyze(&module, &DecorationManager::default());
        assert_eq!(types.find(&TypeDesc::uint(32)), Some(3));
    }

    #[test]
    fn struct_member_decorations_are_canonical() {
        let block = DecorationDesc::new(Decoration::Block);
        let offset = MemberDecorationDesc {
            member: 0,
            decoration: DecorationDesc::with_literal(Decoration::Offset, 0),
        };
        let a = TypeDesc::structure(&[2], &[block.clone()], &[offset.clone()]);
        let b = TypeDesc::structure(&[2], &[block], &[offset]);
        let c = TypeDesc::structure(&[2], &[], &[]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.to_inst(9).operands, vec![Operand::IdRef(2)]);
    }

    #[test]
    fn structs_are_found_by_members_alone() {
        let block = DecorationDesc::new(Decoration::Block);
        let plain = TypeDesc::structure(&[2], &[], &[]);
        let decorated = TypeDesc::structure(&[2], &[block], &[]);
        let mut types = TypeManager::default();
        types.register(decorated.clone(), 7);
        types.register(plain.clone(), 8);
        assert_eq!(types.find_struct(&[2]), Some(7));
        assert_eq!(types.find_struct(&[3]), None);

        // Re-describing a declaration drops its old key.
        types.register(decorated.clone(), 8);
        assert_eq!(types.find(&plain), None);
        assert_eq!(types.find(&decorated), Some(7));
        assert_eq!(types.lookup(8), Some(&decorated));
    }
}
