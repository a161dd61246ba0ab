//! Dead Definition Elimination
//!
//! Removes definitions without uses. Side effects are preserved:
//!   - `x = call f()` is reduced to `call f()`
//!   - `x = call f() + 0x1` and other nested calls are kept as a whole
//!   - stores to memory are kept, except for unused memory phis
//!
//! Implicit definitions (version 0) are never removed.

use crate::error::Result;
use crate::ir::{ExprId, Function};
use crate::ssa::relaxation::{contains_call, relaxable_definition, Relaxation};

pub struct DeadCodeElimination {}

impl DeadCodeElimination {
    pub fn new() -> Self {
        Self {}
    }
}

impl Relaxation for DeadCodeElimination {
    fn name(&self) -> &'static str {
        "DeadCodeElimination"
    }

    fn relax_definition(&self, function: &mut Function, def: ExprId) -> Result<bool> {
        let (assignment, lhs, rhs) = match relaxable_definition(function, def) {
            Some(candidate) => candidate,
            None => return Ok(false),
        };

        if !function.uses(def).is_empty() {
            return Ok(false);
        }

        if function.expression(rhs).is_call() {
            trace!("dropping unused result {}", function.render(lhs));
            function.detach(lhs);
            function.replace(assignment, rhs)?;
            return Ok(true);
        }
        if contains_call(function, rhs) {
            return Ok(false);
        }

        if !function.expression(lhs).is_deref() || function.expression(rhs).is_phi() {
            trace!("removing {}", function.render(assignment));
            function.remove_expression(assignment)?;
            return Ok(true);
        }

        Ok(false)
    }
}
