//! Statement Simplification
//!
//! Folds constant operations, removes neutral operands and merges additive
//! constants, e.g. `(rsp - 0x8) + 0x10` will become `rsp + 0x8`.
//!
//! Rewrites are performed bottom-up in place. Variable occurrences are moved,
//! never copied, so def-use links stay intact.

use crate::error::Result;
use crate::ir::{BinaryOperator, ExprId, ExpressionKind, Function, Parent, StmtId};
use crate::util::Transform;

/// Simplifies every statement of a `Function`.
#[derive(Default, Debug)]
pub struct StatementSimplification {}

impl Transform<Function> for StatementSimplification {
    fn name(&self) -> &'static str {
        "StatementSimplification"
    }

    fn description(&self) -> &'static str {
        "Simplify statements"
    }

    fn transform(&self, function: &mut Function) -> Result<()> {
        for statement in function.statements() {
            reduce_statement(function, statement)?;
        }
        Ok(())
    }
}

/// Simplifies all expressions of `statement`, returns `true` if anything changed.
pub fn reduce_statement(function: &mut Function, statement: StmtId) -> Result<bool> {
    let mut changed = false;
    for expression in function.statement(statement).expressions().to_vec() {
        for id in function.subtree(expression) {
            changed = reduce_expression(function, id)? || changed;
        }
    }
    Ok(changed)
}

fn constant(function: &Function, id: ExprId) -> Option<u64> {
    function.expression(id).constant_value()
}

/// Signed contribution of `operator value` to a sum.
fn summand(operator: BinaryOperator, value: u64) -> u64 {
    match operator {
        BinaryOperator::Sub => value.wrapping_neg(),
        _ => value,
    }
}

fn reduce_expression(function: &mut Function, id: ExprId) -> Result<bool> {
    match function.expression(id).kind().clone() {
        ExpressionKind::Unary { operator, operand } => match constant(function, operand) {
            Some(value) => {
                *function.expression_mut(id).kind_mut() =
                    ExpressionKind::Constant(operator.evaluate(value));
                Ok(true)
            }
            None => Ok(false),
        },
        ExpressionKind::Binary { operator, lhs, rhs } => {
            reduce_binary(function, id, operator, lhs, rhs)
        }
        _ => Ok(false),
    }
}

fn reduce_binary(
    function: &mut Function,
    id: ExprId,
    operator: BinaryOperator,
    lhs: ExprId,
    rhs: ExprId,
) -> Result<bool> {
    use BinaryOperator::*;

    match (constant(function, lhs), constant(function, rhs)) {
        (Some(lhs), Some(rhs)) => {
            *function.expression_mut(id).kind_mut() =
                ExpressionKind::Constant(operator.evaluate(lhs, rhs));
            Ok(true)
        }
        (None, Some(0)) if [Add, Sub, Or, Xor, Shl, Shr].contains(&operator) => {
            lift(function, id, lhs)
        }
        (Some(0), None) if [Add, Or, Xor].contains(&operator) => lift(function, id, rhs),
        (None, Some(1)) if operator == Mul => lift(function, id, lhs),
        (Some(1), None) if operator == Mul => lift(function, id, rhs),
        (None, Some(outer)) if operator.is_additive() => {
            let (inner_operator, inner_lhs, inner_rhs) = match function.expression(lhs).kind() {
                ExpressionKind::Binary {
                    operator,
                    lhs,
                    rhs,
                } if operator.is_additive() => (*operator, *lhs, *rhs),
                _ => return Ok(false),
            };
            let inner = match constant(function, inner_rhs) {
                Some(inner) => inner,
                None => return Ok(false),
            };

            let total = summand(inner_operator, inner).wrapping_add(summand(operator, outer));
            if total == 0 {
                return lift(function, id, inner_lhs);
            }

            let (operator, value) = if (total as i64) < 0 {
                (Sub, total.wrapping_neg())
            } else {
                (Add, total)
            };
            let value = function.constant(value);
            function.expression_mut(lhs).set_parent(None);
            *function.expression_mut(id).kind_mut() = ExpressionKind::Binary {
                operator,
                lhs: inner_lhs,
                rhs: value,
            };
            function
                .expression_mut(inner_lhs)
                .set_parent(Some(Parent::Expression(id)));
            function
                .expression_mut(value)
                .set_parent(Some(Parent::Expression(id)));
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// Replaces `id` by its operand `operand`.
fn lift(function: &mut Function, id: ExprId, operand: ExprId) -> Result<bool> {
    if function.expression(id).parent().is_none() {
        return Ok(false);
    }
    function.replace(id, operand)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn statement_with_rhs<F>(build: F) -> (Function, StmtId)
    where
        F: FnOnce(&mut Function) -> ExprId,
    {
        let mut function = Function::new(0, None);
        let block = function.add_block(0).unwrap();
        let lhs = function.register("rax");
        let rhs = build(&mut function);
        let assign = function.assign(lhs, rhs);
        let statement = function.push_statement(block, 0, vec![assign]).unwrap();
        (function, statement)
    }

    #[test]
    fn test_fold_constant_operations() {
        // Given: rax = (0x2 + 0x3) * 0x4
        let (mut function, statement) = statement_with_rhs(|f| {
            let two = f.constant(2);
            let three = f.constant(3);
            let sum = f.binary(BinaryOperator::Add, two, three);
            let four = f.constant(4);
            f.binary(BinaryOperator::Mul, sum, four)
        });

        // When:
        let changed = reduce_statement(&mut function, statement).unwrap();

        // Then:
        assert!(changed);
        assert_eq!(function.render_statement(statement), "0x0: rax = 0x14");
    }

    #[test]
    fn test_merge_additive_constants() {
        // Given: rax = (rsp - 0x8) + 0x10
        let (mut function, statement) = statement_with_rhs(|f| {
            let rsp = f.register("rsp");
            let eight = f.constant(8);
            let inner = f.binary(BinaryOperator::Sub, rsp, eight);
            let sixteen = f.constant(0x10);
            f.binary(BinaryOperator::Add, inner, sixteen)
        });

        reduce_statement(&mut function, statement).unwrap();

        assert_eq!(function.render_statement(statement), "0x0: rax = rsp + 0x8");
    }

    #[test]
    fn test_merge_additive_constants_to_negative_offset() {
        // Given: rax = (rsp - 0x8) - 0x8
        let (mut function, statement) = statement_with_rhs(|f| {
            let rsp = f.register("rsp");
            let eight = f.constant(8);
            let inner = f.binary(BinaryOperator::Sub, rsp, eight);
            let eight = f.constant(8);
            f.binary(BinaryOperator::Sub, inner, eight)
        });

        reduce_statement(&mut function, statement).unwrap();

        assert_eq!(function.render_statement(statement), "0x0: rax = rsp - 0x10");
    }

    #[test]
    fn test_cancelling_constants_leave_bare_operand() {
        // Given: rax = *((rsp - 0x8) + 0x8)
        let (mut function, statement) = statement_with_rhs(|f| {
            let rsp = f.register("rsp");
            let eight = f.constant(8);
            let inner = f.binary(BinaryOperator::Sub, rsp, eight);
            let eight = f.constant(8);
            let address = f.binary(BinaryOperator::Add, inner, eight);
            f.deref(address)
        });

        reduce_statement(&mut function, statement).unwrap();

        assert_eq!(function.render_statement(statement), "0x0: rax = *(rsp)");
    }

    #[test]
    fn test_neutral_operands_are_removed() {
        // Given: rax = (rbx * 0x1) | 0x0
        let (mut function, statement) = statement_with_rhs(|f| {
            let rbx = f.register("rbx");
            let one = f.constant(1);
            let product = f.binary(BinaryOperator::Mul, rbx, one);
            let zero = f.constant(0);
            f.binary(BinaryOperator::Or, product, zero)
        });

        reduce_statement(&mut function, statement).unwrap();

        assert_eq!(function.render_statement(statement), "0x0: rax = rbx");
    }

    #[test]
    fn test_simplified_statement_is_unchanged_on_second_run() {
        let (mut function, statement) = statement_with_rhs(|f| {
            let rsp = f.register("rsp");
            let eight = f.constant(8);
            f.binary(BinaryOperator::Sub, rsp, eight)
        });

        assert!(!reduce_statement(&mut function, statement).unwrap());
        assert_eq!(function.render_statement(statement), "0x0: rax = rsp - 0x8");
    }

    #[test]
    fn test_transform_simplifies_all_blocks() {
        let (mut function, statement) = statement_with_rhs(|f| {
            let one = f.constant(1);
            f.unary(crate::ir::UnaryOperator::Neg, one)
        });

        StatementSimplification::default()
            .transform(&mut function)
            .unwrap();

        assert_eq!(
            function.render_statement(statement),
            "0x0: rax = 0xFFFFFFFFFFFFFFFF"
        );
    }
}
