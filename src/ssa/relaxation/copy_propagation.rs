//! Single-Use Copy Propagation
//!
//! A definition with exactly one use is inlined into that use,
//! e.g. `x.1 = a.0 + 0x1; y.1 = x.1 * 0x2` becomes `y.1 = (a.0 + 0x1) * 0x2`.
//!
//! Stores to memory are forwarded the same way, `*(rsp.0 - 0x8).1 = rdi.0`
//! followed by a single read of `*(rsp.0 - 0x8).1` leaves only `rdi.0`.
//!
//! Phi definitions and phi arguments are left alone, so are right-hand sides
//! containing calls or memory reads which are not in SSA form yet.

use crate::error::Result;
use crate::ir::{ExprId, Function};
use crate::ssa::relaxation::{contains_call, relaxable_definition, substitute, Relaxation};

pub struct CopyPropagation {}

impl CopyPropagation {
    pub fn new() -> Self {
        Self {}
    }
}

/// Returns `true` if moving `rhs` to another program point may change its value or effects.
fn is_pinned(function: &Function, rhs: ExprId) -> bool {
    contains_call(function, rhs)
        || function.subtree(rhs).into_iter().any(|id| {
            let expression = function.expression(id);
            expression.is_deref() && expression.version().is_none()
        })
}

impl Relaxation for CopyPropagation {
    fn name(&self) -> &'static str {
        "CopyPropagation"
    }

    fn relax_definition(&self, function: &mut Function, def: ExprId) -> Result<bool> {
        let (assignment, _, rhs) = match relaxable_definition(function, def) {
            Some(candidate) => candidate,
            None => return Ok(false),
        };

        if function.expression(rhs).is_phi() {
            return Ok(false);
        }

        let uses = function.uses(def);
        if uses.len() != 1 {
            return Ok(false);
        }
        let user = uses[0];

        if function.is_phi_argument(user)
            || function.parent_statement(user).is_none()
            || function.parent_statement(user) == function.uninitialized()
        {
            return Ok(false);
        }
        if is_pinned(function, rhs) {
            return Ok(false);
        }

        substitute(function, user, rhs, true)?;
        function.remove_expression(assignment)?;

        Ok(true)
    }
}
