//! Static Single Assignment (SSA) Construction
//!
//! Registers are brought into SSA form first, memory dereferences second.
//! Relaxing the register form beforehand normalizes the addresses of stack
//! accesses, so equal stack slots end up as the same memory variable.

use crate::environment::Environment;
use crate::error::Result;
use crate::ir::{Function, VariableClass};
use crate::util::Transform;

mod def_use;
pub mod phi_insertion;
pub mod relaxation;
pub mod renaming;

pub use self::def_use::{DefUse, DefUseTable, Diagnostic};
pub use self::relaxation::{Relaxer, RelaxerBuilder};

use self::phi_insertion::insert_phi_nodes;
use self::renaming::rename_variables;

#[derive(Builder, Clone, Debug)]
#[builder(default)]
pub struct SSATransformation {
    relaxer: Relaxer,
    /// Run the relaxations after renaming.
    relax: bool,
}

impl Default for SSATransformation {
    fn default() -> Self {
        Self {
            relaxer: Relaxer::default(),
            relax: true,
        }
    }
}

impl SSATransformation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env(env: &Environment) -> Self {
        Self {
            relaxer: Relaxer::new_from_env(env),
            relax: true,
        }
    }

    /// Transforms `function` into SSA form and returns its def-use chains.
    ///
    /// The returned registry owns the statement holding implicit definitions,
    /// which is also attached to `function` as `uninitialized`.
    pub fn construct(&self, function: &mut Function) -> Result<DefUse> {
        let mut def_use = DefUse::new(function);
        function.set_uninitialized(Some(def_use.uninitialized()));

        for &class in &[VariableClass::Register, VariableClass::Deref] {
            let phi_count = insert_phi_nodes(function, class)?;
            rename_variables(function, &mut def_use, class)?;
            debug!(
                "{} SSA: {} phi nodes, {} definitions",
                class,
                phi_count,
                def_use.len()
            );

            if self.relax {
                self.relaxer.relax(function, &mut def_use)?;
            }
        }

        for diagnostic in def_use.diagnostics() {
            debug!("diagnostic: {}", diagnostic);
        }

        Ok(def_use)
    }

    /// Removes versions and def-use links from all occurrences.
    ///
    /// Inserted phi nodes and relaxed statements stay as they are.
    pub fn clear_ssa_data(function: &mut Function) {
        let mut statements = function.statements();
        statements.extend(function.uninitialized());

        for statement in statements {
            function.clear_statement_ssa_data(statement);
        }
    }
}

impl Transform<Function> for SSATransformation {
    fn name(&self) -> &'static str {
        "SSATransformation"
    }

    fn description(&self) -> &'static str {
        "Transform into static single assignment form"
    }

    fn transform(&self, function: &mut Function) -> Result<()> {
        self.construct(function)?;
        Ok(())
    }
}
