//! Module-wide analyses: ID allocation, def-use, decorations,
//! extensions/capabilities, and the type and constant interners.
//!
//! Each analysis is computed once from a module and then kept current
//! by `IrContext` as new instructions are added; none of them rescan
//! the module afterward.

pub mod constants;
pub mod decorations;
pub mod def_use;
pub mod features;
pub mod ids;
pub mod types;

pub use constants::ConstantManager;
pub use decorations::{DecorationDesc, DecorationManager, MemberDecorationDesc};
pub use def_use::DefUseManager;
pub use features::FeatureManager;
pub use ids::IdAllocator;
pub use types::{TypeDesc, TypeManager};
