//! Textual IR Loader
//!
//! Reads a function from a line oriented listing:
//!
//! ```text
//! function 0x1000 main            # optional
//! block 0x1000 -> 0x1010, 0x1020
//!     0x1000: rsp = rsp - 0x8
//!     0x1004: *(rsp + 0x10) = rdi; branch 0x1020 if rdi
//! block 0x1010
//!     0x1010: return rax
//! ```
//!
//! The first block is the entry block.

use crate::error::*;
use crate::ir::{ExprId, Function};
use std::fs;
use std::path::Path;

mod parser;

use self::parser::{parse_line, Line, Node, StatementNode};

pub fn load_function(file_path: &Path) -> Result<Function> {
    let source = fs::read_to_string(file_path)
        .chain_err(|| format!("Function file '{}' could not be loaded", file_path.display()))?;
    parse_function(&source)
}

pub fn parse_function(source: &str) -> Result<Function> {
    let mut lines = Vec::new();
    for (index, text) in source.lines().enumerate() {
        let line_number = index + 1;
        let text = match text.find('#') {
            Some(comment) => &text[..comment],
            None => text,
        };
        match parse_line(text) {
            Ok(Line::Empty) => {}
            Ok(line) => lines.push((line_number, line)),
            Err(message) => bail!(ErrorKind::Parse(line_number, message)),
        }
    }

    let mut function = new_function(&lines)?;
    let mut edges: Vec<(usize, u64, u64)> = Vec::new();
    let mut current_block: Option<usize> = None;

    for (position, (line_number, line)) in lines.iter().enumerate() {
        let line_number = *line_number;
        match line {
            Line::Empty => {}
            Line::Function { .. } => {
                if position != 0 {
                    bail!(ErrorKind::Parse(
                        line_number,
                        "function header must be the first line".to_string()
                    ));
                }
            }
            Line::Block {
                address,
                successors,
            } => {
                let index = function
                    .add_block(*address)
                    .map_err(|e| ErrorKind::Parse(line_number, e.to_string()))?;
                current_block = Some(index);
                edges.extend(
                    successors
                        .iter()
                        .map(|successor| (line_number, *address, *successor)),
                );
            }
            Line::Statement {
                address,
                expressions,
            } => {
                let block = current_block.ok_or_else(|| {
                    ErrorKind::Parse(line_number, "statement outside of a block".to_string())
                })?;
                let mut lowered = Vec::with_capacity(expressions.len());
                for expression in expressions {
                    lowered.push(lower_statement(&mut function, line_number, expression)?);
                }
                function.push_statement(block, *address, lowered)?;
            }
        }
    }

    for (line_number, head, tail) in edges {
        function
            .add_edge(head, tail)
            .map_err(|e| ErrorKind::Parse(line_number, e.to_string()))?;
    }

    debug!(
        "loaded function {} with {} blocks",
        function.name(),
        function.control_flow_graph().blocks().len()
    );

    Ok(function)
}

fn new_function(lines: &[(usize, Line)]) -> Result<Function> {
    let first_block = lines.iter().find_map(|(_, line)| match line {
        Line::Block { address, .. } => Some(*address),
        _ => None,
    });
    let first_block = match first_block {
        Some(address) => address,
        None => bail!(ErrorKind::MalformedFunction(
            "function without blocks".to_string()
        )),
    };

    match lines.first() {
        Some((_, Line::Function { address, name })) => Ok(Function::new(*address, name.clone())),
        _ => Ok(Function::new(first_block, None)),
    }
}

fn lower_statement(
    function: &mut Function,
    line_number: usize,
    statement: &StatementNode,
) -> Result<ExprId> {
    Ok(match statement {
        StatementNode::Assign(lhs, rhs) => {
            match lhs {
                Node::Register(_) | Node::Deref(_) => {}
                _ => bail!(ErrorKind::Parse(
                    line_number,
                    "only registers and dereferences can be assigned".to_string()
                )),
            }
            let lhs = lower(function, lhs);
            let rhs = lower(function, rhs);
            function.assign(lhs, rhs)
        }
        StatementNode::Branch { target, condition } => {
            let condition = condition.as_ref().map(|c| lower(function, c));
            let target = lower(function, target);
            function.branch(condition, target)
        }
        StatementNode::Return(value) => {
            let value = value.as_ref().map(|v| lower(function, v));
            function.ret(value)
        }
        StatementNode::Expression(node) => lower(function, node),
    })
}

fn lower(function: &mut Function, node: &Node) -> ExprId {
    match node {
        Node::Register(name) => function.register(name),
        Node::Deref(address) => {
            let address = lower(function, address);
            function.deref(address)
        }
        Node::Constant(value) => function.constant(*value),
        Node::Unary(operator, operand) => {
            let operand = lower(function, operand);
            function.unary(*operator, operand)
        }
        Node::Binary(operator, lhs, rhs) => {
            let lhs = lower(function, lhs);
            let rhs = lower(function, rhs);
            function.binary(*operator, lhs, rhs)
        }
        Node::Phi(arguments) => {
            let arguments = arguments.iter().map(|a| lower(function, a)).collect();
            function.phi(arguments)
        }
        Node::Call(target, arguments) => {
            let target = lower(function, target);
            let arguments = arguments.iter().map(|a| lower(function, a)).collect();
            function.call(target, arguments)
        }
    }
}
