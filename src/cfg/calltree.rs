//! Visit every function reachable from a set of roots through
//! `OpFunctionCall`.
//!
//! The order is breadth-first: roots in the order given, then callees
//! in the order their call sites appear (blocks in layout order,
//! instructions in block order). Each function is visited exactly once,
//! however many callers it has, and the order depends only on the
//! module's contents, so two walks over an unchanged call graph visit
//! the same functions in the same order.

use crate::context::IrContext;
use crate::errors::PassError;
use crate::ir::{self, Function, Word};
use anyhow::Result;
use fxhash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use std::collections::VecDeque;

/// Walk the call trees of all entry points, in declaration order.
/// Returns whether any visit reported a change.
pub fn process_entry_point_call_tree<F>(ctx: &mut IrContext, f: F) -> Result<bool>
where
    F: FnMut(&mut IrContext, &mut Function) -> Result<bool>,
{
    let roots = ctx
        .module()
        .entry_points
        .iter()
        .filter_map(ir::entry_point_function)
        .collect::<SmallVec<[Word; 4]>>();
    log::trace!("calltree: entry point roots {:?}", roots);
    process_call_tree_from_roots(ctx, roots, f)
}

/// Walk the call trees rooted at `roots`.
///
/// While `f` runs, the visited function is detached from the module
/// (its slot holds an empty function), so `f` may freely add global
/// declarations through the context. `f` must not add or remove
/// functions.
pub fn process_call_tree_from_roots<F, I>(ctx: &mut IrContext, roots: I, mut f: F) -> Result<bool>
where
    F: FnMut(&mut IrContext, &mut Function) -> Result<bool>,
    I: IntoIterator<Item = Word>,
{
    let func_slots = ctx
        .module()
        .functions
        .iter()
        .enumerate()
        .filter_map(|(slot, func)| ir::function_id(func).map(|id| (id, slot)))
        .collect::<FxHashMap<Word, usize>>();

    let mut queue = roots.into_iter().collect::<VecDeque<Word>>();
    let mut done = FxHashSet::default();
    let mut modified = false;

    while let Some(func_id) = queue.pop_front() {
        if !done.insert(func_id) {
            continue;
        }
        let slot = match func_slots.get(&func_id) {
            Some(&slot) => slot,
            None => {
                return Err(PassError::Internal(format!(
                    "call tree references undefined function {}",
                    func_id
                ))
                .into())
            }
        };
        log::trace!("calltree: visiting function {}", func_id);

        let mut func = std::mem::replace(&mut ctx.module.functions[slot], Function::new());
        let result = f(ctx, &mut func);
        queue.extend(ir::callees(&func));
        ctx.module.functions[slot] = func;
        modified |= result?;
    }

    Ok(modified)
}
