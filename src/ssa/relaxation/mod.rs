//! SSA Relaxation
//!
//! Removes redundant SSA artifacts after renaming. Every pass is a predicate
//! over the current definitions of the `DefUse` registry, definitions for
//! which the predicate holds are eliminated.

use crate::environment::Environment;
use crate::error::Result;
use crate::ir::{simplify, ExprId, Function};
use crate::ssa::DefUse;

mod copy_propagation;
mod dead_code_elimination;
mod phi_relaxation;
mod stack_propagation;

pub use copy_propagation::CopyPropagation;
pub use dead_code_elimination::DeadCodeElimination;
pub use phi_relaxation::PhiRelaxation;
pub use stack_propagation::StackLocationPropagation;

#[derive(Debug, Eq, PartialEq)]
pub enum RelaxationResult {
    Changed,
    Unchanged,
}

pub trait Relaxation {
    fn name(&self) -> &'static str;

    /// Rewrites the IR around the definition `def`.
    ///
    /// Returns `true` if `def` has been eliminated from the IR.
    fn relax_definition(&self, function: &mut Function, def: ExprId) -> Result<bool>;

    /// Runs this relaxation until it reaches a fixed point.
    fn relax(&self, function: &mut Function, def_use: &mut DefUse) -> Result<RelaxationResult> {
        let mut result = RelaxationResult::Unchanged;
        while def_use.iterate(function, |function, def| self.relax_definition(function, def))? {
            result = RelaxationResult::Changed;
        }
        Ok(result)
    }
}

/// Returns `(assignment, lhs, rhs)` if `def` is a candidate for relaxation.
///
/// Implicit definitions (version 0) and definitions no longer attached to the
/// function are never relaxed.
fn relaxable_definition(function: &Function, def: ExprId) -> Option<(ExprId, ExprId, ExprId)> {
    if function.expression(def).version() == Some(0) || !function.is_attached(def) {
        return None;
    }
    let assignment = function.defining_assignment(def)?;
    let (lhs, rhs) = function.assignment(assignment)?;
    Some((assignment, lhs, rhs))
}

/// Returns `true` if a call occurs anywhere in the tree rooted at `id`.
fn contains_call(function: &Function, id: ExprId) -> bool {
    function
        .subtree(id)
        .into_iter()
        .any(|operand| function.expression(operand).is_call())
}

/// Replaces the use `user` by a copy of `value`.
///
/// With `simplify` the statement containing `user` is simplified afterwards.
fn substitute(function: &mut Function, user: ExprId, value: ExprId, simplify: bool) -> Result<()> {
    let replacement = function.clone_expr(value);
    function.detach(user);
    function.replace(user, replacement)?;

    if let Some(statement) = function.parent_statement(replacement) {
        trace!("rewrote {}", function.render_statement(statement));
        if simplify {
            simplify::reduce_statement(function, statement)?;
        }
    }

    Ok(())
}

/// Runs the enabled relaxations in a fixed order until a round changes nothing.
#[derive(Builder, Clone, Debug)]
#[builder(default)]
pub struct Relaxer {
    phi: bool,
    stack_locations: bool,
    dead_code: bool,
    copy_propagation: bool,
    /// Names of the stack pointer registers.
    stack_pointers: Vec<String>,
    /// Upper bound for the number of rounds.
    max_rounds: usize,
}

impl Default for Relaxer {
    fn default() -> Self {
        let env = Environment::default();
        Self::new_from_env(&env)
    }
}

impl Relaxer {
    pub fn new_from_env(env: &Environment) -> Self {
        Self {
            phi: env.relaxation.phi,
            stack_locations: env.relaxation.stack_locations,
            dead_code: env.relaxation.dead_code,
            copy_propagation: env.relaxation.copy_propagation,
            stack_pointers: env.architecture.stack_pointers.clone(),
            max_rounds: env.relaxation.max_rounds,
        }
    }

    /// A `Relaxer` doing nothing.
    pub fn none() -> Self {
        Self {
            phi: false,
            stack_locations: false,
            dead_code: false,
            copy_propagation: false,
            stack_pointers: Vec::new(),
            max_rounds: 0,
        }
    }

    fn relaxations(&self) -> Vec<Box<dyn Relaxation>> {
        let mut relaxations: Vec<Box<dyn Relaxation>> = Vec::new();
        if self.phi {
            relaxations.push(Box::new(PhiRelaxation::new()));
        }
        if self.stack_locations {
            relaxations.push(Box::new(StackLocationPropagation::new(
                self.stack_pointers.clone(),
            )));
        }
        if self.dead_code {
            relaxations.push(Box::new(DeadCodeElimination::new()));
        }
        if self.copy_propagation {
            relaxations.push(Box::new(CopyPropagation::new()));
        }
        relaxations
    }

    pub fn relax(&self, function: &mut Function, def_use: &mut DefUse) -> Result<RelaxationResult> {
        let relaxations = self.relaxations();
        let mut result = RelaxationResult::Unchanged;
        let mut converged = relaxations.is_empty();

        for round in 1..=self.max_rounds {
            let mut unchanged = true;

            for relaxation in &relaxations {
                if relaxation.relax(function, def_use)? == RelaxationResult::Changed {
                    debug!("round {}: {} changed the function", round, relaxation.name());
                    unchanged = false;
                }
            }

            if unchanged {
                converged = true;
                break;
            }
            result = RelaxationResult::Changed;
        }

        if !converged {
            warn!(
                "relaxation of {} stopped after {} rounds without reaching a fixed point",
                function.name(),
                self.max_rounds
            );
        }

        Ok(result)
    }
}
