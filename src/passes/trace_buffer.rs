//! The storage buffer that holds one counter per traced basic block.
//!
//! The generated declarations are, for 32-bit counters:
//!
//! ```plain
//! OpName %BasicBlockTraceBuffer "BasicBlockTraceBuffer"
//! OpMemberName %BasicBlockTraceBuffer 0 "counters"
//! OpName %basic_block_trace_buffer "basic_block_trace_buffer"
//! OpDecorate %_runtimearr_uint ArrayStride 4
//! OpDecorate %BasicBlockTraceBuffer Block
//! OpMemberDecorate %BasicBlockTraceBuffer 0 Offset 0
//! OpDecorate %basic_block_trace_buffer DescriptorSet 5
//! OpDecorate %basic_block_trace_buffer Binding 1
//! %uint = OpTypeInt 32 0
//! %_runtimearr_uint = OpTypeRuntimeArray %uint
//! %BasicBlockTraceBuffer = OpTypeStruct %_runtimearr_uint
//! %_ptr_StorageBuffer_BasicBlockTraceBuffer = OpTypePointer StorageBuffer %BasicBlockTraceBuffer
//! %basic_block_trace_buffer = OpVariable %_ptr_StorageBuffer_BasicBlockTraceBuffer StorageBuffer
//! ```
//!
//! which a host reads as
//!
//! ```plain
//! layout(std430, set = 5, binding = 1) buffer BasicBlockTraceBuffer {
//!     uint counters[];
//! } basic_block_trace_buffer;
//! ```
//!
//! With 64-bit counters the element is `OpTypeInt 64 0`, the stride is
//! 8, and the module also declares `Int64` and `Int64Atomics`.

use crate::analysis::{DecorationDesc, MemberDecorationDesc, TypeDesc};
use crate::context::IrContext;
use crate::errors::PassError;
use crate::ir::{
    self,
    spirv::{Capability, Decoration, StorageClass},
    Instruction, Op, Operand, Word,
};
use anyhow::Result;

pub const TRACE_BUFFER_DESCRIPTOR_SET: u32 = 5;
pub const TRACE_BUFFER_BINDING: u32 = 1;

pub const TRACE_BUFFER_TYPE_NAME: &str = "BasicBlockTraceBuffer";
pub const TRACE_BUFFER_MEMBER_NAME: &str = "counters";
pub const TRACE_BUFFER_NAME: &str = "basic_block_trace_buffer";

pub const STORAGE_BUFFER_EXTENSION: &str = "SPV_KHR_storage_buffer_storage_class";

/// From this version on, the `StorageBuffer` storage class is core.
pub const STORAGE_BUFFER_CORE_VERSION: Word = ir::version_word(1, 3);
/// From this version on, entry points list every global they use, not
/// just `Input`/`Output` variables.
pub const FULL_INTERFACE_VERSION: Word = ir::version_word(1, 4);

/// Lazily declares the trace buffer, at most once per pass run.
#[derive(Clone, Debug, Default)]
pub struct TraceBufferProvisioner {
    wide_counters: bool,
    buffer_id: Option<Word>,
    element_pointer_type_id: Option<Word>,
    anomalies: usize,
}

impl TraceBufferProvisioner {
    pub fn new(wide_counters: bool) -> TraceBufferProvisioner {
        TraceBufferProvisioner {
            wide_counters,
            ..TraceBufferProvisioner::default()
        }
    }

    /// Bit width of one counter.
    pub fn counter_width(&self) -> u32 {
        if self.wide_counters {
            64
        } else {
            32
        }
    }

    /// Byte stride between counters.
    pub fn counter_stride(&self) -> u32 {
        self.counter_width() / 8
    }

    /// The trace buffer variable, if it has been declared.
    pub fn buffer_id(&self) -> Option<Word> {
        self.buffer_id
    }

    /// How many times provisioning found a struct of the buffer's shape
    /// that the module already uses, and declared a separate one.
    pub fn anomalies(&self) -> usize {
        self.anomalies
    }

    pub fn element_type_id(&self, ctx: &mut IrContext) -> Result<Word> {
        ctx.get_uint_type_id(self.counter_width())
    }

    /// Pointer to one counter, in the `StorageBuffer` storage class.
    pub fn element_pointer_type_id(&mut self, ctx: &mut IrContext) -> Result<Word> {
        if let Some(id) = self.element_pointer_type_id {
            return Ok(id);
        }
        let element = self.element_type_id(ctx)?;
        let id = ctx.get_pointer_type_id(element, StorageClass::StorageBuffer)?;
        self.element_pointer_type_id = Some(id);
        Ok(id)
    }

    /// Declare the trace buffer, or return the one already declared.
    pub fn get_trace_buffer_id(&mut self, ctx: &mut IrContext) -> Result<Word> {
        if let Some(id) = self.buffer_id {
            return Ok(id);
        }

        let element = self.element_type_id(ctx)?;
        let array = ctx.get_runtime_array_type_id(element, self.counter_stride())?;
        let block = DecorationDesc::new(Decoration::Block);
        let offset = MemberDecorationDesc {
            member: 0,
            decoration: DecorationDesc::with_literal(Decoration::Offset, 0),
        };
        let buffer_desc = TypeDesc::structure(&[array], &[block], &[offset]);
        let buffer_type = match ctx.types().find_struct(&[array]) {
            // Nothing refers to it, not even a decoration or a name.
            Some(existing) if ctx.def_use().num_uses(existing) == 0 => {
                ctx.adopt_type(existing, &buffer_desc);
                existing
            }
            Some(existing) => {
                log::warn!(
                    "get_trace_buffer_id: struct {} has the trace buffer's layout but is already used; declaring another",
                    existing
                );
                self.anomalies += 1;
                ctx.add_type(&buffer_desc)?
            }
            None => ctx.add_type(&buffer_desc)?,
        };
        if ctx.def_use().def_opcode(buffer_type) != Some(Op::TypeStruct) {
            return Err(PassError::Internal(format!(
                "trace buffer type {} is not a struct",
                buffer_type
            ))
            .into());
        }

        let pointer_type = ctx.get_pointer_type_id(buffer_type, StorageClass::StorageBuffer)?;
        let buffer = ctx.take_next_id()?;
        ctx.add_global_value(Instruction::new(
            Op::Variable,
            Some(pointer_type),
            Some(buffer),
            vec![Operand::StorageClass(StorageClass::StorageBuffer)],
        ));

        ctx.add_debug_name(buffer_type, TRACE_BUFFER_TYPE_NAME);
        ctx.add_member_name(buffer_type, 0, TRACE_BUFFER_MEMBER_NAME);
        ctx.add_debug_name(buffer, TRACE_BUFFER_NAME);

        ctx.add_decoration(
            buffer,
            DecorationDesc::with_literal(Decoration::DescriptorSet, TRACE_BUFFER_DESCRIPTOR_SET),
        );
        ctx.add_decoration(
            buffer,
            DecorationDesc::with_literal(Decoration::Binding, TRACE_BUFFER_BINDING),
        );

        if ctx.version() < STORAGE_BUFFER_CORE_VERSION {
            ctx.add_extension(STORAGE_BUFFER_EXTENSION);
        }
        if self.wide_counters {
            ctx.add_capability(Capability::Int64);
            ctx.add_capability(Capability::Int64Atomics);
        }

        if ctx.version() >= FULL_INTERFACE_VERSION {
            let updated = ctx.add_to_entry_point_interfaces(buffer);
            log::debug!(
                "get_trace_buffer_id: added {} to {} entry point interfaces",
                buffer,
                updated
            );
        }

        log::debug!(
            "get_trace_buffer_id: declared {} (u{} counters, set {} binding {})",
            buffer,
            self.counter_width(),
            TRACE_BUFFER_DESCRIPTOR_SET,
            TRACE_BUFFER_BINDING
        );
        self.buffer_id = Some(buffer);
        Ok(buffer)
    }
}
