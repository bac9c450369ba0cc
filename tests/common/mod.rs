//! Hand-built SPIR-V modules for the integration tests.

#![allow(dead_code)]

use spv_bbtrace::ir::{
    spirv::{self, Capability, Decoration, StorageClass},
    version_word, Block, Function, Instruction, Module, ModuleHeader, Op, Operand, Word,
};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Builds a shader module one declaration at a time, handing out IDs
/// in increasing order.
pub struct Fixture {
    module: Module,
    next_id: Word,
    pub void: Word,
    pub void_fn: Word,
}

impl Fixture {
    pub fn new(major: u8, minor: u8) -> Fixture {
        let mut module = Module::new();
        let mut header = ModuleHeader::new(1);
        header.version = version_word(major, minor);
        module.header = Some(header);
        module.capabilities.push(Instruction::new(
            Op::Capability,
            None,
            None,
            vec![Operand::Capability(Capability::Shader)],
        ));
        module.memory_model = Some(Instruction::new(
            Op::MemoryModel,
            None,
            None,
            vec![
                Operand::AddressingModel(spirv::AddressingModel::Logical),
                Operand::MemoryModel(spirv::MemoryModel::GLSL450),
            ],
        ));
        let mut fixture = Fixture {
            module,
            next_id: 1,
            void: 0,
            void_fn: 0,
        };
        fixture.void = fixture.global(Op::TypeVoid, None, vec![]);
        fixture.void_fn = fixture.global(Op::TypeFunction, None, vec![Operand::IdRef(fixture.void)]);
        fixture
    }

    pub fn id(&mut self) -> Word {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn ids(&mut self, n: usize) -> Vec<Word> {
        (0..n).map(|_| self.id()).collect()
    }

    /// Declare a type, constant or global variable.
    pub fn global(&mut self, opcode: Op, result_type: Option<Word>, operands: Vec<Operand>) -> Word {
        let id = self.id();
        self.module
            .types_global_values
            .push(Instruction::new(opcode, result_type, Some(id), operands));
        id
    }

    pub fn uint(&mut self, width: u32) -> Word {
        self.global(
            Op::TypeInt,
            None,
            vec![Operand::LiteralBit32(width), Operand::LiteralBit32(0)],
        )
    }

    pub fn uint_const(&mut self, ty: Word, value: u32) -> Word {
        self.global(Op::Constant, Some(ty), vec![Operand::LiteralBit32(value)])
    }

    pub fn pointer(&mut self, storage_class: StorageClass, pointee: Word) -> Word {
        self.global(
            Op::TypePointer,
            None,
            vec![Operand::StorageClass(storage_class), Operand::IdRef(pointee)],
        )
    }

    pub fn decorate(&mut self, target: Word, decoration: Decoration, extra: Vec<Operand>) {
        let mut operands = vec![Operand::IdRef(target), Operand::Decoration(decoration)];
        operands.extend(extra);
        self.module
            .annotations
            .push(Instruction::new(Op::Decorate, None, None, operands));
    }

    pub fn member_decorate(
        &mut self,
        target: Word,
        member: u32,
        decoration: Decoration,
        extra: Vec<Operand>,
    ) {
        let mut operands = vec![
            Operand::IdRef(target),
            Operand::LiteralBit32(member),
            Operand::Decoration(decoration),
        ];
        operands.extend(extra);
        self.module
            .annotations
            .push(Instruction::new(Op::MemberDecorate, None, None, operands));
    }

    pub fn extension(&mut self, name: &str) {
        self.module.extensions.push(Instruction::new(
            Op::Extension,
            None,
            None,
            vec![Operand::LiteralString(name.into())],
        ));
    }

    /// Add a `void()` function made of `blocks`, each given as its
    /// label and body (which must end in a terminator).
    pub fn function(&mut self, id: Word, blocks: Vec<(Word, Vec<Instruction>)>) {
        let mut func = Function::new();
        func.def = Some(Instruction::new(
            Op::Function,
            Some(self.void),
            Some(id),
            vec![
                Operand::FunctionControl(spirv::FunctionControl::NONE),
                Operand::IdRef(self.void_fn),
            ],
        ));
        for (label, instructions) in blocks {
            let mut block = Block::new();
            block.label = Some(Instruction::new(Op::Label, None, Some(label), vec![]));
            block.instructions = instructions;
            func.blocks.push(block);
        }
        func.end = Some(Instruction::new(Op::FunctionEnd, None, None, vec![]));
        self.module.functions.push(func);
    }

    pub fn entry_point(&mut self, func: Word, name: &str, interface: &[Word]) {
        let mut operands = vec![
            Operand::ExecutionModel(spirv::ExecutionModel::GLCompute),
            Operand::IdRef(func),
            Operand::LiteralString(name.into()),
        ];
        operands.extend(interface.iter().map(|&id| Operand::IdRef(id)));
        self.module
            .entry_points
            .push(Instruction::new(Op::EntryPoint, None, None, operands));
        self.module.execution_modes.push(Instruction::new(
            Op::ExecutionMode,
            None,
            None,
            vec![
                Operand::IdRef(func),
                Operand::ExecutionMode(spirv::ExecutionMode::LocalSize),
                Operand::LiteralBit32(1),
                Operand::LiteralBit32(1),
                Operand::LiteralBit32(1),
            ],
        ));
    }

    pub fn call(&mut self, callee: Word) -> Instruction {
        let result = self.id();
        Instruction::new(
            Op::FunctionCall,
            Some(self.void),
            Some(result),
            vec![Operand::IdRef(callee)],
        )
    }

    pub fn finish(mut self) -> Module {
        if let Some(header) = self.module.header.as_mut() {
            header.bound = self.next_id;
        }
        self.module
    }
}

pub fn branch(target: Word) -> Instruction {
    Instruction::new(Op::Branch, None, None, vec![Operand::IdRef(target)])
}

pub fn ret() -> Instruction {
    Instruction::new(Op::Return, None, None, vec![])
}

pub fn variable(pointer_type: Word, id: Word) -> Instruction {
    Instruction::new(
        Op::Variable,
        Some(pointer_type),
        Some(id),
        vec![Operand::StorageClass(StorageClass::Function)],
    )
}

/// The example shader: entry point `main` has three blocks; the first
/// declares two variables.
pub struct Example {
    pub module: Module,
    pub main: Word,
    pub labels: [Word; 3],
}

pub fn example(major: u8, minor: u8) -> Example {
    let mut f = Fixture::new(major, minor);
    let uint = f.uint(32);
    let ptr_fn_uint = f.pointer(StorageClass::Function, uint);
    let main = f.id();
    let labels = f.ids(3);
    let (a, b) = (f.id(), f.id());
    f.function(
        main,
        vec![
            (
                labels[0],
                vec![
                    variable(ptr_fn_uint, a),
                    variable(ptr_fn_uint, b),
                    branch(labels[1]),
                ],
            ),
            (labels[1], vec![branch(labels[2])]),
            (labels[2], vec![ret()]),
        ],
    );
    f.entry_point(main, "main", &[]);
    Example {
        module: f.finish(),
        main,
        labels: [labels[0], labels[1], labels[2]],
    }
}

/// Two entry points sharing a callee, plus a function nobody calls:
///
/// ```plain
/// first  -> helper -> leaf
/// second -> leaf
/// unused -> helper
/// ```
pub struct CallGraph {
    pub module: Module,
    pub first: Word,
    pub second: Word,
    pub helper: Word,
    pub leaf: Word,
    pub unused: Word,
    /// Block labels, per function.
    pub first_labels: Vec<Word>,
    pub second_labels: Vec<Word>,
    pub helper_labels: Vec<Word>,
    pub leaf_labels: Vec<Word>,
    pub unused_labels: Vec<Word>,
}

pub fn call_graph(major: u8, minor: u8) -> CallGraph {
    let mut f = Fixture::new(major, minor);
    let first = f.id();
    let second = f.id();
    let helper = f.id();
    let leaf = f.id();
    let unused = f.id();

    let first_labels = f.ids(2);
    let call = f.call(helper);
    f.function(
        first,
        vec![
            (first_labels[0], vec![call, branch(first_labels[1])]),
            (first_labels[1], vec![ret()]),
        ],
    );

    let second_labels = f.ids(1);
    let call = f.call(leaf);
    f.function(second, vec![(second_labels[0], vec![call, ret()])]);

    let helper_labels = f.ids(3);
    let call = f.call(leaf);
    f.function(
        helper,
        vec![
            (helper_labels[0], vec![branch(helper_labels[1])]),
            (helper_labels[1], vec![call, branch(helper_labels[2])]),
            (helper_labels[2], vec![ret()]),
        ],
    );

    let leaf_labels = f.ids(1);
    f.function(leaf, vec![(leaf_labels[0], vec![ret()])]);

    let unused_labels = f.ids(1);
    let call = f.call(helper);
    f.function(unused, vec![(unused_labels[0], vec![call, ret()])]);

    f.entry_point(first, "first", &[]);
    f.entry_point(second, "second", &[]);
    CallGraph {
        module: f.finish(),
        first,
        second,
        helper,
        leaf,
        unused,
        first_labels,
        second_labels,
        helper_labels,
        leaf_labels,
        unused_labels,
    }
}

pub fn function_by_id(module: &Module, id: Word) -> &Function {
    module
        .functions
        .iter()
        .find(|func| func.def.as_ref().and_then(|def| def.result_id) == Some(id))
        .unwrap()
}

pub fn block_by_label(module: &Module, label: Word) -> &Block {
    module
        .functions
        .iter()
        .flat_map(|func| func.blocks.iter())
        .find(|block| block.label.as_ref().and_then(|l| l.result_id) == Some(label))
        .unwrap()
}

pub fn opcodes(block: &Block) -> Vec<Op> {
    block
        .instructions
        .iter()
        .map(|inst| inst.class.opcode)
        .collect()
}

pub fn globals_with_opcode(module: &Module, opcode: Op) -> Vec<&Instruction> {
    module
        .types_global_values
        .iter()
        .filter(|inst| inst.class.opcode == opcode)
        .collect()
}
