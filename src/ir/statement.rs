use crate::ir::ExprId;
use std::fmt;

/// Index of a `Statement` in the arena of its `Function`.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct StmtId(usize);

impl StmtId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for StmtId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// A statement is an ordered sequence of top-level expressions originating from one address.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct Statement {
    /// The address of the originating instruction.
    address: u64,
    expressions: Vec<ExprId>,
    /// The index of the block containing this statement, `None` if plucked.
    block: Option<usize>,
}

impl Statement {
    pub(crate) fn new(address: u64, expressions: Vec<ExprId>, block: Option<usize>) -> Self {
        Self {
            address,
            expressions,
            block,
        }
    }

    pub fn address(&self) -> u64 {
        self.address
    }

    pub fn expressions(&self) -> &[ExprId] {
        &self.expressions
    }

    /// Returns the index of the containing block.
    pub fn block(&self) -> Option<usize> {
        self.block
    }

    pub fn is_empty(&self) -> bool {
        self.expressions.is_empty()
    }

    pub(crate) fn set_block(&mut self, block: Option<usize>) {
        self.block = block;
    }

    pub(crate) fn push_expression(&mut self, expression: ExprId) {
        self.expressions.push(expression);
    }

    pub(crate) fn replace_expression(&mut self, old: ExprId, new: ExprId) -> bool {
        match self.expressions.iter_mut().find(|e| **e == old) {
            Some(slot) => {
                *slot = new;
                true
            }
            None => false,
        }
    }

    pub(crate) fn remove_expression(&mut self, expression: ExprId) -> bool {
        let len = self.expressions.len();
        self.expressions.retain(|e| *e != expression);
        self.expressions.len() != len
    }
}
