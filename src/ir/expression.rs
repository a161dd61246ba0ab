//! An `Expression` is a node of the expression arena of a `Function`.

use crate::ir::StmtId;
use std::collections::BTreeSet;
use std::convert::TryFrom;
use std::fmt;

/// Index of an `Expression` in the arena of its `Function`.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct ExprId(usize);

impl ExprId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub enum UnaryOperator {
    Neg,
    Not,
}

impl UnaryOperator {
    pub fn evaluate(self, operand: u64) -> u64 {
        match self {
            Self::Neg => operand.wrapping_neg(),
            Self::Not => !operand,
        }
    }
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Neg => write!(f, "-"),
            Self::Not => write!(f, "~"),
        }
    }
}

#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    And,
    Or,
    Xor,
    Shl,
    Shr,
}

impl BinaryOperator {
    /// Evaluates the operator on two constants, using wrapping 64-bit arithmetic.
    pub fn evaluate(self, lhs: u64, rhs: u64) -> u64 {
        match self {
            Self::Add => lhs.wrapping_add(rhs),
            Self::Sub => lhs.wrapping_sub(rhs),
            Self::Mul => lhs.wrapping_mul(rhs),
            Self::And => lhs & rhs,
            Self::Or => lhs | rhs,
            Self::Xor => lhs ^ rhs,
            Self::Shl => u32::try_from(rhs)
                .ok()
                .and_then(|shift| lhs.checked_shl(shift))
                .unwrap_or(0),
            Self::Shr => u32::try_from(rhs)
                .ok()
                .and_then(|shift| lhs.checked_shr(shift))
                .unwrap_or(0),
        }
    }

    /// Returns `true` for `+` and `-`.
    pub fn is_additive(self) -> bool {
        match self {
            Self::Add | Self::Sub => true,
            _ => false,
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => write!(f, "+"),
            Self::Sub => write!(f, "-"),
            Self::Mul => write!(f, "*"),
            Self::And => write!(f, "&"),
            Self::Or => write!(f, "|"),
            Self::Xor => write!(f, "^"),
            Self::Shl => write!(f, "<<"),
            Self::Shr => write!(f, ">>"),
        }
    }
}

/// SSA data of a variable occurrence (a register or a memory dereference).
///
/// A use refers to its definition through `def`, a definition lists all of its
/// users in `uses`. Both sides are maintained together by `Function::link` and
/// `Function::unlink`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Occurrence {
    is_def: bool,
    version: Option<usize>,
    def: Option<ExprId>,
    uses: BTreeSet<ExprId>,
}

impl Occurrence {
    /// Returns `true` if this occurrence is written.
    pub fn is_def(&self) -> bool {
        self.is_def
    }

    pub fn set_is_def(&mut self, is_def: bool) {
        self.is_def = is_def;
    }

    /// Gets the SSA version or `None` if no version is assigned.
    pub fn version(&self) -> Option<usize> {
        self.version
    }

    pub fn set_version(&mut self, version: Option<usize>) {
        self.version = version;
    }

    /// The definition this use resolves to.
    pub fn def(&self) -> Option<ExprId> {
        self.def
    }

    /// All uses resolving to this definition.
    pub fn uses(&self) -> &BTreeSet<ExprId> {
        &self.uses
    }

    pub(crate) fn set_def(&mut self, def: Option<ExprId>) {
        self.def = def;
    }

    pub(crate) fn take_def(&mut self) -> Option<ExprId> {
        self.def.take()
    }

    pub(crate) fn uses_mut(&mut self) -> &mut BTreeSet<ExprId> {
        &mut self.uses
    }

    /// A fresh (unlinked) use carrying the same version.
    pub(crate) fn cloned_use(&self) -> Self {
        Self {
            is_def: false,
            version: self.version,
            def: None,
            uses: BTreeSet::new(),
        }
    }

    pub(crate) fn clear(&mut self) {
        self.version = None;
        self.def = None;
        self.uses.clear();
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ExpressionKind {
    /// A register occurrence.
    Register { name: String, ssa: Occurrence },
    /// A memory dereference occurrence `*(address)`.
    Deref { address: ExprId, ssa: Occurrence },
    Constant(u64),
    Unary {
        operator: UnaryOperator,
        operand: ExprId,
    },
    Binary {
        operator: BinaryOperator,
        lhs: ExprId,
        rhs: ExprId,
    },
    /// Assign the value of `rhs` to the variable `lhs`.
    Assign { lhs: ExprId, rhs: ExprId },
    /// One argument per CFG predecessor, in predecessor order.
    Phi { arguments: Vec<ExprId> },
    Call { target: ExprId, arguments: Vec<ExprId> },
    /// Branch to target if the optional condition holds.
    Branch {
        condition: Option<ExprId>,
        target: ExprId,
    },
    Return { value: Option<ExprId> },
}

impl ExpressionKind {
    /// The direct operands, in evaluation order.
    pub fn operands(&self) -> Vec<ExprId> {
        match self {
            Self::Register { .. } | Self::Constant(_) => Vec::new(),
            Self::Deref { address, .. } => vec![*address],
            Self::Unary { operand, .. } => vec![*operand],
            Self::Binary { lhs, rhs, .. } | Self::Assign { lhs, rhs } => vec![*lhs, *rhs],
            Self::Phi { arguments } => arguments.clone(),
            Self::Call { target, arguments } => {
                let mut operands = vec![*target];
                operands.extend_from_slice(arguments);
                operands
            }
            Self::Branch { condition, target } => {
                let mut operands: Vec<ExprId> = condition.iter().copied().collect();
                operands.push(*target);
                operands
            }
            Self::Return { value } => value.iter().copied().collect(),
        }
    }

    /// Substitutes the operand `old` with `new`, returns `false` if `old` is no operand.
    pub(crate) fn replace_operand(&mut self, old: ExprId, new: ExprId) -> bool {
        let substitute = |slot: &mut ExprId| {
            if *slot == old {
                *slot = new;
                true
            } else {
                false
            }
        };

        match self {
            Self::Register { .. } | Self::Constant(_) => false,
            Self::Deref { address, .. } => substitute(address),
            Self::Unary { operand, .. } => substitute(operand),
            Self::Binary { lhs, rhs, .. } | Self::Assign { lhs, rhs } => {
                substitute(lhs) || substitute(rhs)
            }
            Self::Phi { arguments } => arguments.iter_mut().any(substitute),
            Self::Call { target, arguments } => {
                substitute(target) || arguments.iter_mut().any(substitute)
            }
            Self::Branch { condition, target } => {
                condition.as_mut().map_or(false, substitute) || substitute(target)
            }
            Self::Return { value } => value.as_mut().map_or(false, substitute),
        }
    }
}

/// Where an `Expression` is attached to.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum Parent {
    Expression(ExprId),
    Statement(StmtId),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Expression {
    kind: ExpressionKind,
    parent: Option<Parent>,
}

impl Expression {
    pub(crate) fn new(kind: ExpressionKind) -> Self {
        Self { kind, parent: None }
    }

    pub fn kind(&self) -> &ExpressionKind {
        &self.kind
    }

    pub(crate) fn kind_mut(&mut self) -> &mut ExpressionKind {
        &mut self.kind
    }

    /// The expression or statement owning this expression, `None` if detached.
    pub fn parent(&self) -> Option<Parent> {
        self.parent
    }

    pub(crate) fn set_parent(&mut self, parent: Option<Parent>) {
        self.parent = parent;
    }

    pub fn operands(&self) -> Vec<ExprId> {
        self.kind.operands()
    }

    pub fn is_register(&self) -> bool {
        match self.kind {
            ExpressionKind::Register { .. } => true,
            _ => false,
        }
    }

    pub fn is_deref(&self) -> bool {
        match self.kind {
            ExpressionKind::Deref { .. } => true,
            _ => false,
        }
    }

    /// Returns `true` for registers, constants and unary or binary operations.
    pub fn is_arithmetic(&self) -> bool {
        match self.kind {
            ExpressionKind::Register { .. }
            | ExpressionKind::Constant(_)
            | ExpressionKind::Unary { .. }
            | ExpressionKind::Binary { .. } => true,
            _ => false,
        }
    }

    pub fn is_phi(&self) -> bool {
        match self.kind {
            ExpressionKind::Phi { .. } => true,
            _ => false,
        }
    }

    pub fn is_call(&self) -> bool {
        match self.kind {
            ExpressionKind::Call { .. } => true,
            _ => false,
        }
    }

    /// Returns the register name, if this is a register occurrence.
    pub fn register_name(&self) -> Option<&str> {
        match &self.kind {
            ExpressionKind::Register { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Returns the constant value, if this is a constant.
    pub fn constant_value(&self) -> Option<u64> {
        match self.kind {
            ExpressionKind::Constant(value) => Some(value),
            _ => None,
        }
    }

    /// SSA data, if this is a variable occurrence.
    pub fn occurrence(&self) -> Option<&Occurrence> {
        match &self.kind {
            ExpressionKind::Register { ssa, .. } | ExpressionKind::Deref { ssa, .. } => Some(ssa),
            _ => None,
        }
    }

    pub(crate) fn occurrence_mut(&mut self) -> Option<&mut Occurrence> {
        match &mut self.kind {
            ExpressionKind::Register { ssa, .. } | ExpressionKind::Deref { ssa, .. } => Some(ssa),
            _ => None,
        }
    }

    /// Returns `true` if this is a variable occurrence which is written.
    pub fn is_def(&self) -> bool {
        self.occurrence().map_or(false, Occurrence::is_def)
    }

    pub fn version(&self) -> Option<usize> {
        self.occurrence().and_then(Occurrence::version)
    }
}
