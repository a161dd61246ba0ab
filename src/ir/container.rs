use crate::ir::StmtId;

/// An ordered sequence of statements.
#[derive(Clone, Debug, Default, Hash, Eq, PartialEq)]
pub struct Container {
    statements: Vec<StmtId>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn statements(&self) -> &[StmtId] {
        &self.statements
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Returns the position of `statement` within this `Container`.
    pub fn position(&self, statement: StmtId) -> Option<usize> {
        self.statements.iter().position(|s| *s == statement)
    }

    /// Appends a statement.
    pub fn push(&mut self, statement: StmtId) {
        self.statements.push(statement);
    }

    /// Inserts a statement at the front.
    pub fn unshift(&mut self, statement: StmtId) {
        self.statements.insert(0, statement);
    }

    /// Removes a statement, returns `false` if it is not contained.
    pub fn remove(&mut self, statement: StmtId) -> bool {
        match self.position(statement) {
            Some(position) => {
                self.statements.remove(position);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unshift_inserts_before_existing_statements() {
        let mut container = Container::new();
        container.push(StmtId::new(1));
        container.push(StmtId::new(2));

        container.unshift(StmtId::new(3));

        assert_eq!(
            container.statements(),
            &[StmtId::new(3), StmtId::new(1), StmtId::new(2)]
        );
    }

    #[test]
    fn test_remove_unknown_statement_returns_false() {
        let mut container = Container::new();
        container.push(StmtId::new(1));

        assert!(!container.remove(StmtId::new(2)));
        assert!(container.remove(StmtId::new(1)));
        assert!(container.is_empty());
    }
}
