//! Variable Renaming
//!
//! Assigns SSA versions in a pre-order traversal of the dominator tree and
//! links every use to its reaching definition.

use crate::error::*;
use crate::ir::{
    ControlFlowGraph, DominatorTree, ExprId, ExprKey, ExpressionKind, Function, StmtId,
    VariableClass,
};
use crate::ssa::DefUse;
use std::collections::HashMap;

struct VariableVersioning {
    counter: HashMap<ExprKey, usize>,
    stack: HashMap<ExprKey, Vec<usize>>,
}

impl VariableVersioning {
    pub fn new() -> Self {
        Self {
            counter: HashMap::new(),
            stack: HashMap::new(),
        }
    }

    /// The version reaching the current position, `0` if there is no visible definition.
    fn get_version(&self, variable: &ExprKey) -> usize {
        self.stack
            .get(variable)
            .and_then(|versions| versions.last())
            .copied()
            .unwrap_or(0)
    }

    fn new_version(&mut self, variable: &ExprKey) -> usize {
        let count = self.counter.entry(variable.clone()).or_insert(0);
        *count += 1;
        let version = *count;

        self.stack
            .entry(variable.clone())
            .or_insert_with(|| vec![0])
            .push(version);

        version
    }

    fn pop_version(&mut self, variable: &ExprKey) {
        if let Some(versions) = self.stack.get_mut(variable) {
            if versions.len() > 1 {
                versions.pop();
            }
        }
    }
}

/// Renames all variables of the given class.
///
/// Phi nodes for the class must have been inserted before.
pub fn rename_variables(
    function: &mut Function,
    def_use: &mut DefUse,
    class: VariableClass,
) -> Result<()> {
    let entry = function.control_flow_graph().entry()?;
    let dominator_tree = function.control_flow_graph().dominator_tree()?;
    let mut versioning = VariableVersioning::new();

    dominator_tree_dfs_pre_order_traverse(
        function,
        def_use,
        &dominator_tree,
        class,
        entry,
        &mut versioning,
    )
}

/// Occurrences of `class` in `statement`, either all uses outside of phi
/// assignments or all definitions.
fn occurrences_in_statement(
    function: &Function,
    statement: StmtId,
    class: VariableClass,
    definitions: bool,
) -> Vec<ExprId> {
    let mut occurrences = Vec::new();

    for &expression in function.statement(statement).expressions() {
        if !definitions && function.is_phi_assignment(expression) {
            continue;
        }
        for operand in function.subtree(expression) {
            let occurrence = function.expression(operand);
            if class.matches(occurrence) && occurrence.is_def() == definitions {
                occurrences.push(operand);
            }
        }
    }

    occurrences
}

fn dominator_tree_dfs_pre_order_traverse(
    function: &mut Function,
    def_use: &mut DefUse,
    dominator_tree: &DominatorTree,
    class: VariableClass,
    node: usize,
    versioning: &mut VariableVersioning,
) -> Result<()> {
    let mut definitions = Vec::new();

    for statement in function.block_statements(node)? {
        // rename all read variables
        for user in occurrences_in_statement(function, statement, class, false) {
            let variable = function.variable_key(user);
            function.set_version(user, Some(versioning.get_version(&variable)));
            def_use.add_use(function, user);
        }

        // introduce new SSA names for written variables
        for def in occurrences_in_statement(function, statement, class, true) {
            let variable = function.variable_key(def);
            function.set_version(def, Some(versioning.new_version(&variable)));
            def_use.define(function, def);
            definitions.push(def);
        }
    }

    // rename all phi arguments of successors which originate from this block
    for successor in function.control_flow_graph().successor_indices(node)? {
        rename_phi_arguments(function, def_use, class, node, successor, versioning)?;
    }

    for child in ControlFlowGraph::dominated_by(dominator_tree, node)? {
        dominator_tree_dfs_pre_order_traverse(
            function,
            def_use,
            dominator_tree,
            class,
            child,
            versioning,
        )?;
    }

    for def in definitions {
        versioning.pop_version(&function.variable_key(def));
    }

    Ok(())
}

fn rename_phi_arguments(
    function: &mut Function,
    def_use: &mut DefUse,
    class: VariableClass,
    predecessor: usize,
    successor: usize,
    versioning: &VariableVersioning,
) -> Result<()> {
    let predecessors = function
        .control_flow_graph()
        .predecessor_indices(successor)?;
    let position = predecessors
        .iter()
        .position(|index| *index == predecessor)
        .ok_or_else(|| {
            ErrorKind::MalformedFunction(format!(
                "block {} is no predecessor of block {}",
                predecessor, successor
            ))
        })?;

    for statement in function.block_statements(successor)? {
        for expression in function.statement(statement).expressions().to_vec() {
            let (lhs, rhs) = match function.assignment(expression) {
                Some(assignment) => assignment,
                None => continue,
            };
            if !class.matches(function.expression(lhs)) {
                continue;
            }
            let arguments = match function.expression(rhs).kind() {
                ExpressionKind::Phi { arguments } => arguments.clone(),
                _ => continue,
            };
            if arguments.len() != predecessors.len() {
                bail!(ErrorKind::MalformedFunction(format!(
                    "{} has {} arguments but block 0x{:X} has {} predecessors",
                    function.render(expression),
                    arguments.len(),
                    function.statement(statement).address(),
                    predecessors.len()
                )));
            }

            let argument = arguments[position];
            let variable = function.variable_key(argument);
            function.set_version(argument, Some(versioning.get_version(&variable)));
            def_use.add_use(function, argument);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::parse_function;
    use crate::ssa::phi_insertion::insert_phi_nodes;

    fn rename(source: &str) -> (Function, DefUse) {
        let mut function = parse_function(source).unwrap();
        let mut def_use = DefUse::new(&mut function);
        function.set_uninitialized(Some(def_use.uninitialized()));
        insert_phi_nodes(&mut function, VariableClass::Register).unwrap();
        rename_variables(&mut function, &mut def_use, VariableClass::Register).unwrap();
        (function, def_use)
    }

    fn rendered_block(function: &Function, address: u64) -> Vec<String> {
        let index = function.block_index(address).unwrap();
        function
            .block_statements(index)
            .unwrap()
            .into_iter()
            .map(|s| function.render_statement(s))
            .collect()
    }

    const DIAMOND: &str = "
        block 0x0 -> 0x10, 0x20
            0x0: x = 0x1
        block 0x10 -> 0x30
            0x10: x = x + 0x1
        block 0x20 -> 0x30
            0x20: x = 0x5
        block 0x30
            0x30: return x
    ";

    #[test]
    fn test_diamond_versions_follow_dominator_tree_order() {
        // Given/When:
        let (function, _) = rename(DIAMOND);

        // Then:
        assert_eq!(rendered_block(&function, 0x0), vec!["0x0: x.1 = 0x1"]);
        assert_eq!(rendered_block(&function, 0x10), vec!["0x10: x.2 = x.1 + 0x1"]);
        assert_eq!(rendered_block(&function, 0x20), vec!["0x20: x.3 = 0x5"]);
        assert_eq!(
            rendered_block(&function, 0x30),
            vec!["0x30: x.4 = Phi(x.2, x.3)", "0x30: return x.4"]
        );
    }

    #[test]
    fn test_every_use_is_linked_to_a_definition_with_back_reference() {
        let (function, def_use) = rename(DIAMOND);

        for statement in function.statements() {
            for &expression in function.statement(statement).expressions() {
                for operand in function.subtree(expression) {
                    let occurrence = match function.occurrence(operand) {
                        Some(occurrence) => occurrence,
                        None => continue,
                    };
                    if occurrence.is_def() {
                        assert_eq!(def_use.definition(&function.key(operand)), Some(operand));
                        for user in occurrence.uses() {
                            assert_eq!(function.occurrence(*user).unwrap().def(), Some(operand));
                        }
                    } else {
                        let def = occurrence.def().expect("use without definition");
                        assert!(function.uses(def).contains(&operand));
                        assert_eq!(function.key(def), function.key(operand));
                    }
                }
            }
        }
    }

    #[test]
    fn test_read_before_write_uses_version_zero() {
        // Given: rdi is never written
        let (function, def_use) = rename(
            "
            block 0x0
                0x0: rax = rdi + 0x1
                0x4: return rax
            ",
        );

        // Then:
        assert_eq!(
            rendered_block(&function, 0x0),
            vec!["0x0: rax.1 = rdi.0 + 0x1", "0x4: return rax.1"]
        );
        let def = def_use
            .definition(&ExprKey::register("rdi", Some(0)))
            .unwrap();
        assert_eq!(function.parent_statement(def), Some(def_use.uninitialized()));
    }

    #[test]
    fn test_loop_phi_arguments_follow_predecessor_order() {
        // Given: header 0x10 has predecessors 0x0 (index 0) and 0x20 (index 2)
        let (function, _) = rename(
            "
            block 0x0 -> 0x10
                0x0: i = 0x0
            block 0x10 -> 0x20, 0x30
                0x10: branch 0x30 if i
            block 0x20 -> 0x10
                0x20: i = i + 0x1
            block 0x30
                0x30: return i
            ",
        );

        // Then: first argument from entry, second from the loop body
        assert_eq!(
            rendered_block(&function, 0x10),
            vec!["0x10: i.2 = Phi(i.1, i.3)", "0x10: branch 0x30 if i.2"]
        );
        assert_eq!(rendered_block(&function, 0x20), vec!["0x20: i.3 = i.2 + 0x1"]);
        assert_eq!(rendered_block(&function, 0x30), vec!["0x30: return i.2"]);
    }

    #[test]
    fn test_versions_are_unique_per_variable() {
        let (function, def_use) = rename(DIAMOND);

        let mut versions: Vec<usize> = def_use
            .definitions()
            .filter(|(name, _)| name.clone().without_version() == ExprKey::register("x", None))
            .map(|(_, def)| function.expression(def).version().unwrap())
            .collect();
        versions.sort();

        assert_eq!(versions, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_phi_with_wrong_arity_is_rejected() {
        // Given: a phi with one argument in a block with two predecessors
        let mut function = parse_function(
            "
            block 0x0 -> 0x10, 0x20
            block 0x10 -> 0x30
                0x10: x = 0x1
            block 0x20 -> 0x30
            block 0x30
                0x30: x = phi(x)
            ",
        )
        .unwrap();
        let mut def_use = DefUse::new(&mut function);

        // When:
        let result = rename_variables(&mut function, &mut def_use, VariableClass::Register);

        // Then:
        match result {
            Err(Error(ErrorKind::MalformedFunction(_), _)) => {}
            other => panic!("expected malformed function, got {:?}", other.map(|_| ())),
        }
    }
}
