//! Phi Relaxation
//!
//! A phi with a single argument is a plain copy, e.g. `x.2 = Phi(x.1)`.
//! Every use of `x.2` is replaced by `x.1` and the phi is removed.

use crate::error::Result;
use crate::ir::{ExprId, ExpressionKind, Function};
use crate::ssa::relaxation::{relaxable_definition, substitute, Relaxation};

pub struct PhiRelaxation {}

impl PhiRelaxation {
    pub fn new() -> Self {
        Self {}
    }
}

impl Relaxation for PhiRelaxation {
    fn name(&self) -> &'static str {
        "PhiRelaxation"
    }

    fn relax_definition(&self, function: &mut Function, def: ExprId) -> Result<bool> {
        let (assignment, _, rhs) = match relaxable_definition(function, def) {
            Some(candidate) => candidate,
            None => return Ok(false),
        };

        let argument = match function.expression(rhs).kind() {
            ExpressionKind::Phi { arguments } if arguments.len() == 1 => arguments[0],
            _ => return Ok(false),
        };

        for user in function.uses(def) {
            substitute(function, user, argument, false)?;
        }
        function.remove_expression(assignment)?;

        Ok(true)
    }
}
