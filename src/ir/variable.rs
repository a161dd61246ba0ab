use crate::ir::{BinaryOperator, Expression, ExpressionKind, UnaryOperator};
use std::fmt;

/// The kind of variable occurrences processed together in one SSA pass.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub enum VariableClass {
    Register,
    Deref,
}

impl VariableClass {
    /// Returns `true` if `expression` is an occurrence of this class.
    pub fn matches(self, expression: &Expression) -> bool {
        match (self, expression.kind()) {
            (Self::Register, ExpressionKind::Register { .. }) => true,
            (Self::Deref, ExpressionKind::Deref { .. }) => true,
            _ => false,
        }
    }
}

impl fmt::Display for VariableClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Register => write!(f, "register"),
            Self::Deref => write!(f, "deref"),
        }
    }
}

/// Structural key of an expression tree.
///
/// Two expressions have equal keys iff they are structurally equal, including the
/// SSA versions of all nested occurrences. The key of a variable is the key of
/// an occurrence with its own version stripped (see `without_version`).
#[derive(Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub enum ExprKey {
    Register {
        name: String,
        version: Option<usize>,
    },
    Deref {
        address: Box<ExprKey>,
        version: Option<usize>,
    },
    Constant(u64),
    Unary(UnaryOperator, Box<ExprKey>),
    Binary(BinaryOperator, Box<ExprKey>, Box<ExprKey>),
    Assign(Box<ExprKey>, Box<ExprKey>),
    Phi(Vec<ExprKey>),
    Call(Box<ExprKey>, Vec<ExprKey>),
    Branch(Option<Box<ExprKey>>, Box<ExprKey>),
    Return(Option<Box<ExprKey>>),
}

impl ExprKey {
    pub fn register(name: &str, version: Option<usize>) -> Self {
        Self::Register {
            name: name.to_owned(),
            version,
        }
    }

    pub fn deref(address: ExprKey, version: Option<usize>) -> Self {
        Self::Deref {
            address: Box::new(address),
            version,
        }
    }

    /// The version of the outermost occurrence.
    pub fn version(&self) -> Option<usize> {
        match self {
            Self::Register { version, .. } | Self::Deref { version, .. } => *version,
            _ => None,
        }
    }

    /// Strips the version of the outermost occurrence, nested versions are kept.
    pub fn without_version(self) -> Self {
        self.with_version(None)
    }

    pub fn with_version(self, version: Option<usize>) -> Self {
        match self {
            Self::Register { name, .. } => Self::Register { name, version },
            Self::Deref { address, .. } => Self::Deref { address, version },
            other => other,
        }
    }
}

fn fmt_version(f: &mut fmt::Formatter<'_>, version: Option<usize>) -> fmt::Result {
    match version {
        Some(version) => write!(f, ".{}", version),
        None => Ok(()),
    }
}

fn fmt_operand(f: &mut fmt::Formatter<'_>, operand: &ExprKey) -> fmt::Result {
    match operand {
        ExprKey::Binary(..) => write!(f, "({})", operand),
        _ => write!(f, "{}", operand),
    }
}

fn fmt_list(f: &mut fmt::Formatter<'_>, keys: &[ExprKey]) -> fmt::Result {
    let mut is_first = true;
    for key in keys {
        if !is_first {
            write!(f, ", ")?;
        }
        write!(f, "{}", key)?;
        is_first = false;
    }
    Ok(())
}

impl fmt::Display for ExprKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Register { name, version } => {
                write!(f, "{}", name)?;
                fmt_version(f, *version)
            }
            Self::Deref { address, version } => {
                write!(f, "*({})", address)?;
                fmt_version(f, *version)
            }
            Self::Constant(value) => write!(f, "0x{:X}", value),
            Self::Unary(operator, operand) => {
                write!(f, "{}", operator)?;
                fmt_operand(f, operand)
            }
            Self::Binary(operator, lhs, rhs) => {
                fmt_operand(f, lhs)?;
                write!(f, " {} ", operator)?;
                fmt_operand(f, rhs)
            }
            Self::Assign(lhs, rhs) => write!(f, "{} = {}", lhs, rhs),
            Self::Phi(arguments) => {
                write!(f, "Phi(")?;
                fmt_list(f, arguments)?;
                write!(f, ")")
            }
            Self::Call(target, arguments) => {
                write!(f, "call {}(", target)?;
                fmt_list(f, arguments)?;
                write!(f, ")")
            }
            Self::Branch(condition, target) => {
                write!(f, "branch {}", target)?;
                if let Some(condition) = condition {
                    write!(f, " if {}", condition)?;
                }
                Ok(())
            }
            Self::Return(value) => match value {
                Some(value) => write!(f, "return {}", value),
                None => write!(f, "return"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_key_keeps_nested_versions() {
        // Given: *(rsp.1 + 0x8).3
        let key = ExprKey::deref(
            ExprKey::Binary(
                BinaryOperator::Add,
                Box::new(ExprKey::register("rsp", Some(1))),
                Box::new(ExprKey::Constant(8)),
            ),
            Some(3),
        );

        // When:
        let variable = key.clone().without_version();

        // Then: only the outer version is stripped
        assert_eq!(variable.version(), None);
        assert_eq!(variable.to_string(), "*(rsp.1 + 0x8)");
        assert_eq!(key.to_string(), "*(rsp.1 + 0x8).3");
    }

    #[test]
    fn test_display_parenthesizes_nested_binary_operands() {
        let key = ExprKey::Binary(
            BinaryOperator::Mul,
            Box::new(ExprKey::Binary(
                BinaryOperator::Add,
                Box::new(ExprKey::register("rax", None)),
                Box::new(ExprKey::Constant(1)),
            )),
            Box::new(ExprKey::Constant(0x10)),
        );

        assert_eq!(key.to_string(), "(rax + 0x1) * 0x10");
    }

    #[test]
    fn test_keys_of_different_versions_differ() {
        assert_ne!(
            ExprKey::register("rax", Some(1)),
            ExprKey::register("rax", Some(2))
        );
        assert_eq!(
            ExprKey::register("rax", Some(1)).without_version(),
            ExprKey::register("rax", Some(2)).without_version()
        );
    }
}
