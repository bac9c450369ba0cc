//! Declared extensions and capabilities.

use crate::ir::{spirv::Capability, Instruction, Module, Op, Operand};
use fxhash::FxHashSet;

#[derive(Clone, Debug, Default)]
pub struct FeatureManager {
    extensions: FxHashSet<String>,
    capabilities: FxHashSet<Capability>,
}

impl FeatureManager {
    pub fn analyze(module: &Module) -> FeatureManager {
        let mut features = FeatureManager::default();
        for inst in module.extensions.iter().chain(module.capabilities.iter()) {
            features.record(inst);
        }
        features
    }

    /// Index an `OpExtension` or `OpCapability`.
    pub fn record(&mut self, inst: &Instruction) {
        match (inst.class.opcode, inst.operands.first()) {
            (Op::Extension, Some(Operand::LiteralString(name))) => {
                self.extensions.insert(name.clone());
            }
            (Op::Capability, Some(&Operand::Capability(capability))) => {
                self.capabilities.insert(capability);
            }
            _ => {}
        }
    }

    pub fn has_extension(&self, name: &str) -> bool {
        self.extensions.contains(name)
    }

    pub fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn finds_declared_features() {
        let mut module = Module::new();
        module.capabilities.push(Instruction::new(
            Op::Capability,
            None,
            None,
            vec![Operand::Capability(Capability::Shader)],
        ));
        module.extensions.push(Instruction::new(
            Op::Extension,
            None,
            None,
            vec![Operand::LiteralString("SPV_KHR_storage_buffer_storage_class".into())],
        ));
        let features = FeatureManager::analyze(&module);
        assert!(features.has_capability(Capability::Shader));
        assert!(!features.has_capability(Capability::Int64));
        assert!(features.has_extension("SPV_KHR_storage_buffer_storage_class"));
        assert!(!features.has_extension("SPV_KHR_variable_pointers"));
    }
}
