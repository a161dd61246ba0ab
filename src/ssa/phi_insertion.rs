//! Phi Insertion
//!
//! Places phi nodes at the iterated dominance frontier of the definition sites
//! of every variable, see Algorithm 3.1 in "SSA-based Compiler Design".

use crate::error::Result;
use crate::ir::{ExprId, ExprKey, Function, VariableClass};
use std::collections::{BTreeMap, BTreeSet};

struct Defsite {
    /// One definition of the variable, used as template for phi operands.
    representative: ExprId,
    /// Indices of the blocks defining the variable.
    blocks: BTreeSet<usize>,
}

/// Inserts phi nodes for all variables of the given class.
///
/// Returns the number of inserted phi nodes.
pub fn insert_phi_nodes(function: &mut Function, class: VariableClass) -> Result<usize> {
    let dominance_frontiers = function.control_flow_graph().dominance_frontiers()?;
    let mut inserted = 0;

    for (variable, defsite) in variables_defined_in_blocks(function, class)? {
        let mut has_phi = blocks_with_phi(function, &variable)?;
        let mut worklist: Vec<usize> = defsite.blocks.iter().rev().copied().collect();

        while let Some(block_index) = worklist.pop() {
            let frontier = match dominance_frontiers.get(&block_index) {
                Some(frontier) => frontier,
                None => continue, // unreachable block
            };

            for &df_index in frontier {
                if !has_phi.insert(df_index) {
                    continue;
                }

                insert_phi(function, defsite.representative, df_index)?;
                inserted += 1;

                if !defsite.blocks.contains(&df_index) {
                    worklist.push(df_index);
                }
            }
        }
    }

    debug!("inserted {} {} phi nodes", inserted, class);

    Ok(inserted)
}

/// Get the variables defined in the given block, together with their last definition.
fn variables_defined_in_block(
    function: &Function,
    block_index: usize,
    class: VariableClass,
) -> Result<Vec<(ExprKey, ExprId)>> {
    let mut definitions: Vec<(ExprKey, ExprId)> = Vec::new();

    for statement in function.block_statements(block_index)? {
        for &expression in function.statement(statement).expressions() {
            for operand in function.iter_operands(expression, false) {
                let occurrence = function.expression(operand);
                if !occurrence.is_def() || !class.matches(occurrence) {
                    continue;
                }
                let variable = function.variable_key(operand);
                definitions.retain(|(key, _)| *key != variable);
                definitions.push((variable, operand));
            }
        }
    }

    Ok(definitions)
}

/// Get a mapping from variables to the blocks (indices) in which they are defined.
fn variables_defined_in_blocks(
    function: &Function,
    class: VariableClass,
) -> Result<BTreeMap<ExprKey, Defsite>> {
    let mut defsites: BTreeMap<ExprKey, Defsite> = BTreeMap::new();

    for block in function.control_flow_graph().blocks() {
        for (variable, def) in variables_defined_in_block(function, block.index(), class)? {
            defsites
                .entry(variable)
                .or_insert_with(|| Defsite {
                    representative: def,
                    blocks: BTreeSet::new(),
                })
                .blocks
                .insert(block.index());
        }
    }

    Ok(defsites)
}

/// Get the indices of blocks already holding a phi node for `variable`.
fn blocks_with_phi(function: &Function, variable: &ExprKey) -> Result<BTreeSet<usize>> {
    let mut blocks = BTreeSet::new();

    for block in function.control_flow_graph().blocks() {
        for statement in function.block_statements(block.index())? {
            for &expression in function.statement(statement).expressions() {
                if let Some((lhs, _)) = function.assignment(expression) {
                    if function.is_phi_assignment(expression)
                        && function.variable_key(lhs) == *variable
                    {
                        blocks.insert(block.index());
                    }
                }
            }
        }
    }

    Ok(blocks)
}

/// A copy of `variable` without version and without def-use link.
fn fresh_occurrence(function: &mut Function, variable: ExprId) -> ExprId {
    let occurrence = function.clone_expr(variable);
    function.unlink(occurrence);
    function.set_version(occurrence, None);
    occurrence
}

/// Inserts `v = Phi(v, ..., v)` at the front of the block, one argument per predecessor.
fn insert_phi(function: &mut Function, variable: ExprId, block_index: usize) -> Result<()> {
    let predecessor_count = function
        .control_flow_graph()
        .predecessor_indices(block_index)?
        .len();

    let mut arguments = Vec::with_capacity(predecessor_count);
    for _ in 0..predecessor_count {
        arguments.push(fresh_occurrence(function, variable));
    }
    let lhs = fresh_occurrence(function, variable);
    let phi = function.phi(arguments);
    let assign = function.assign(lhs, phi);

    let address = function.control_flow_graph().block(block_index)?.address();
    function.unshift_statement(block_index, address, vec![assign])?;

    trace!(
        "phi {} inserted into block 0x{:X}",
        function.render(assign),
        address
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{ExpressionKind, Function};

    /// Builds a function with blocks `0..block_count` at address `0x10 * index`,
    /// the given edges and a definition `x = 0x1` in every block of `defs`.
    fn function(block_count: usize, edges: &[(usize, usize)], defs: &[usize]) -> Function {
        let mut function = Function::new(0, None);
        for index in 0..block_count {
            function.add_block(0x10 * index as u64).unwrap();
        }
        for &(head, tail) in edges {
            function
                .add_edge(0x10 * head as u64, 0x10 * tail as u64)
                .unwrap();
        }
        for &index in defs {
            let x = function.register("x");
            let one = function.constant(1);
            let assign = function.assign(x, one);
            function
                .push_statement(index, 0x10 * index as u64 + 4, vec![assign])
                .unwrap();
        }
        function
    }

    fn blocks_with_x_phi(function: &Function) -> BTreeSet<usize> {
        blocks_with_phi(function, &ExprKey::register("x", None)).unwrap()
    }

    fn predecessors(edges: &[(usize, usize)], block: usize) -> Vec<usize> {
        edges
            .iter()
            .filter(|(_, tail)| *tail == block)
            .map(|(head, _)| *head)
            .collect()
    }

    /// Iterated dominance frontier computed from the definitions of dominance.
    fn brute_force_idf(
        block_count: usize,
        edges: &[(usize, usize)],
        defs: &[usize],
    ) -> BTreeSet<usize> {
        let all: BTreeSet<usize> = (0..block_count).collect();
        let mut dominators: Vec<BTreeSet<usize>> = (0..block_count)
            .map(|b| if b == 0 { vec![0].into_iter().collect() } else { all.clone() })
            .collect();
        let mut changed = true;
        while changed {
            changed = false;
            for block in 1..block_count {
                let mut dom = all.clone();
                for pred in predecessors(edges, block) {
                    dom = dom.intersection(&dominators[pred]).copied().collect();
                }
                dom.insert(block);
                if dom != dominators[block] {
                    dominators[block] = dom;
                    changed = true;
                }
            }
        }

        let dominates = |a: usize, b: usize| dominators[b].contains(&a);
        let frontier = |n: usize| -> BTreeSet<usize> {
            (0..block_count)
                .filter(|&y| {
                    predecessors(edges, y).iter().any(|&p| dominates(n, p))
                        && !(dominates(n, y) && n != y)
                })
                .collect()
        };

        let mut idf = BTreeSet::new();
        let mut sites: BTreeSet<usize> = defs.iter().copied().collect();
        loop {
            let next: BTreeSet<usize> = sites.iter().flat_map(|&n| frontier(n)).collect();
            if next.is_subset(&idf) {
                return idf;
            }
            idf.extend(next.iter().copied());
            sites.extend(next);
        }
    }

    #[test]
    fn test_diamond_gets_single_phi_at_join() {
        // Given: 0 -> {1, 2} -> 3, x defined in 1 and 2
        let edges = [(0, 1), (0, 2), (1, 3), (2, 3)];
        let mut function = function(4, &edges, &[1, 2]);

        // When:
        let inserted = insert_phi_nodes(&mut function, VariableClass::Register).unwrap();

        // Then: one phi with two arguments at the front of block 3
        assert_eq!(inserted, 1);
        let statements = function.block_statements(3).unwrap();
        assert_eq!(statements.len(), 1);
        assert_eq!(function.render_statement(statements[0]), "0x30: x = Phi(x, x)");
    }

    #[test]
    fn test_phi_is_inserted_before_existing_statements() {
        let edges = [(0, 1), (0, 2), (1, 3), (2, 3)];
        let mut function = function(4, &edges, &[1, 2, 3]);

        insert_phi_nodes(&mut function, VariableClass::Register).unwrap();

        let statements = function.block_statements(3).unwrap();
        assert_eq!(statements.len(), 2);
        let first = function.statement(statements[0]).expressions()[0];
        assert!(function.is_phi_assignment(first));
    }

    #[test]
    fn test_loop_header_gets_phi() {
        // Given: 0 -> 1 -> 2 -> 1, 1 -> 3, x defined in 0 and 2
        let edges = [(0, 1), (1, 2), (2, 1), (1, 3)];
        let mut function = function(4, &edges, &[0, 2]);

        insert_phi_nodes(&mut function, VariableClass::Register).unwrap();

        assert_eq!(blocks_with_x_phi(&function), vec![1].into_iter().collect());
    }

    #[test]
    fn test_phi_arguments_match_predecessor_count() {
        // Given: three predecessors of block 4
        let edges = [(0, 1), (0, 2), (0, 3), (1, 4), (2, 4), (3, 4)];
        let mut function = function(5, &edges, &[1, 2]);

        insert_phi_nodes(&mut function, VariableClass::Register).unwrap();

        let statement = function.block_statements(4).unwrap()[0];
        let assign = function.statement(statement).expressions()[0];
        let (_, phi) = function.assignment(assign).unwrap();
        match function.expression(phi).kind() {
            ExpressionKind::Phi { arguments } => assert_eq!(arguments.len(), 3),
            _ => panic!("expected phi"),
        }
    }

    #[test]
    fn test_variables_of_other_class_are_ignored() {
        let edges = [(0, 1), (0, 2), (1, 3), (2, 3)];
        let mut function = function(4, &edges, &[1, 2]);

        let inserted = insert_phi_nodes(&mut function, VariableClass::Deref).unwrap();

        assert_eq!(inserted, 0);
    }

    #[test]
    fn test_second_insertion_adds_no_duplicate_phis() {
        let edges = [(0, 1), (0, 2), (1, 3), (2, 3)];
        let mut function = function(4, &edges, &[1, 2]);

        insert_phi_nodes(&mut function, VariableClass::Register).unwrap();
        let inserted = insert_phi_nodes(&mut function, VariableClass::Register).unwrap();

        assert_eq!(inserted, 0);
        assert_eq!(function.block_statements(3).unwrap().len(), 1);
    }

    #[test]
    fn test_phi_placement_equals_iterated_dominance_frontier() {
        let graphs: Vec<(usize, Vec<(usize, usize)>, Vec<usize>)> = vec![
            // nested loops
            (
                6,
                vec![(0, 1), (1, 2), (2, 3), (3, 2), (3, 4), (4, 1), (4, 5)],
                vec![3],
            ),
            // if-else inside a loop
            (
                6,
                vec![(0, 1), (1, 2), (1, 3), (2, 4), (3, 4), (4, 1), (4, 5)],
                vec![0, 2],
            ),
            // irreducible region
            (
                5,
                vec![(0, 1), (0, 2), (1, 2), (2, 1), (1, 3), (2, 3), (3, 4)],
                vec![1],
            ),
            // chain of joins
            (
                7,
                vec![(0, 1), (0, 2), (1, 3), (2, 3), (3, 4), (3, 5), (4, 6), (5, 6)],
                vec![1, 4],
            ),
        ];

        for (block_count, edges, defs) in graphs {
            let mut function = function(block_count, &edges, &defs);

            insert_phi_nodes(&mut function, VariableClass::Register).unwrap();

            assert_eq!(
                blocks_with_x_phi(&function),
                brute_force_idf(block_count, &edges, &defs),
                "phi placement for edges {:?} and definitions in {:?}",
                edges,
                defs
            );
        }
    }
}
