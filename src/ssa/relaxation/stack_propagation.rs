//! Stack Location Propagation
//!
//! Propagates arithmetic definitions of the stack pointer into all of their
//! uses, e.g. `rsp.1 = rsp.0 - 0x8; *(rsp.1 + 0x8)` becomes `*(rsp.0)`.
//! Only registers, constants and operators are propagated, a stack pointer
//! loaded from memory or returned by a call stays where it is.
//! Afterwards all stack slots are addressed relative to the initial stack
//! pointer, which makes them comparable for the dereference pass.

use crate::error::Result;
use crate::ir::{ExprId, Function};
use crate::ssa::relaxation::{relaxable_definition, substitute, Relaxation};

pub struct StackLocationPropagation {
    stack_pointers: Vec<String>,
}

impl StackLocationPropagation {
    pub fn new(stack_pointers: Vec<String>) -> Self {
        Self { stack_pointers }
    }

    fn is_stack_pointer(&self, function: &Function, id: ExprId) -> bool {
        function
            .expression(id)
            .register_name()
            .map_or(false, |name| self.stack_pointers.iter().any(|sp| sp == name))
    }
}

impl Relaxation for StackLocationPropagation {
    fn name(&self) -> &'static str {
        "StackLocationPropagation"
    }

    fn relax_definition(&self, function: &mut Function, def: ExprId) -> Result<bool> {
        let (assignment, lhs, rhs) = match relaxable_definition(function, def) {
            Some(candidate) => candidate,
            None => return Ok(false),
        };

        if !self.is_stack_pointer(function, lhs) {
            return Ok(false);
        }
        if !function
            .subtree(rhs)
            .into_iter()
            .all(|id| function.expression(id).is_arithmetic())
        {
            return Ok(false);
        }

        for user in function.uses(def) {
            substitute(function, user, rhs, true)?;
        }
        function.remove_expression(assignment)?;

        Ok(true)
    }
}
