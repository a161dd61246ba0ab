//! Decompiler IR
//!
//! A `Function` owns its control flow graph together with the arenas of all
//! statements and expressions. Blocks, statements and expressions refer to
//! each other by stable indices (`usize`, `StmtId`, `ExprId`).

mod block;
mod container;
mod control_flow_graph;
mod edge;
mod expression;
mod function;
pub mod simplify;
mod statement;
mod variable;

pub use self::block::Block;
pub use self::container::Container;
pub use self::control_flow_graph::{ControlFlowGraph, DominatorTree};
pub use self::edge::Edge;
pub use self::expression::{
    BinaryOperator, ExprId, Expression, ExpressionKind, Occurrence, Parent, UnaryOperator,
};
pub use self::function::Function;
pub use self::statement::{Statement, StmtId};
pub use self::variable::{ExprKey, VariableClass};
