//! Def-Use Registry
//!
//! Maps SSA names (variable key plus version) to their current definition and
//! owns the `uninitialized` pseudo-statement holding implicit definitions.

use crate::error::Result;
use crate::ir::{ExprId, ExprKey, Function, Occurrence, StmtId};
use std::collections::BTreeMap;
use std::fmt;

/// Non-fatal anomaly detected while building def-use chains.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Diagnostic {
    /// A second definition was registered for an SSA name.
    DuplicateDefinition {
        name: ExprKey,
        previous: ExprId,
        current: ExprId,
    },
    /// A use was already linked to a different definition.
    InconsistentDef {
        occurrence: ExprId,
        previous: ExprId,
        current: ExprId,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateDefinition {
                name,
                previous,
                current,
            } => write!(
                f,
                "duplicate definition of {} ({} superseded by {})",
                name, previous, current
            ),
            Self::InconsistentDef {
                occurrence,
                previous,
                current,
            } => write!(
                f,
                "use {} already linked to {}, relinked to {}",
                occurrence, previous, current
            ),
        }
    }
}

#[derive(Debug)]
pub struct DefUse {
    definitions: BTreeMap<ExprKey, ExprId>,
    uninitialized: StmtId,
    diagnostics: Vec<Diagnostic>,
}

impl DefUse {
    /// Creates an empty registry together with a fresh `uninitialized` statement.
    pub fn new(function: &mut Function) -> Self {
        let uninitialized = function.detached_statement(0, Vec::new());
        Self {
            definitions: BTreeMap::new(),
            uninitialized,
            diagnostics: Vec::new(),
        }
    }

    /// The statement holding all implicit definitions.
    pub fn uninitialized(&self) -> StmtId {
        self.uninitialized
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Returns the current definition of the SSA name `name`.
    pub fn definition(&self, name: &ExprKey) -> Option<ExprId> {
        self.definitions.get(name).copied()
    }

    /// All current definitions, ordered by SSA name.
    pub fn definitions(&self) -> impl Iterator<Item = (&ExprKey, ExprId)> {
        self.definitions.iter().map(|(name, def)| (name, *def))
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    fn record(&mut self, diagnostic: Diagnostic) {
        warn!("{}", diagnostic);
        self.diagnostics.push(diagnostic);
    }

    /// Registers `def` as the definition of its SSA name.
    pub fn define(&mut self, function: &mut Function, def: ExprId) {
        for user in function.uses(def) {
            function.unlink(user);
        }

        let name = function.key(def);
        if let Some(previous) = self.definitions.get(&name).copied() {
            if previous != def {
                self.record(Diagnostic::DuplicateDefinition {
                    name: name.clone(),
                    previous,
                    current: def,
                });
            }
        }
        self.definitions.insert(name, def);
    }

    /// Links the use `occurrence` to the definition of its SSA name.
    ///
    /// Names without definition are implicitly defined in the `uninitialized` statement.
    pub fn add_use(&mut self, function: &mut Function, occurrence: ExprId) {
        let name = function.key(occurrence);
        let def = match self.definitions.get(&name) {
            Some(def) => *def,
            None => {
                let def = function.clone_expr(occurrence);
                function.unlink(def);
                function.set_is_def(def, true);
                function.append_to_statement(self.uninitialized, def);
                self.define(function, def);
                trace!("implicit definition {}", name);
                def
            }
        };

        if let Some(previous) = function.occurrence(occurrence).and_then(Occurrence::def) {
            if previous != def {
                self.record(Diagnostic::InconsistentDef {
                    occurrence,
                    previous,
                    current: def,
                });
            }
        }
        function.link(occurrence, def);
    }

    /// Applies `predicate` to every current definition and removes those for
    /// which it returns `true`.
    ///
    /// All definitions are evaluated before any entry is removed. Returns
    /// whether anything was removed.
    pub fn iterate<F>(&mut self, function: &mut Function, mut predicate: F) -> Result<bool>
    where
        F: FnMut(&mut Function, ExprId) -> Result<bool>,
    {
        let mut eliminated = Vec::new();
        for (name, def) in &self.definitions {
            if predicate(function, *def)? {
                eliminated.push(name.clone());
            }
        }

        for name in &eliminated {
            self.definitions.remove(name);
        }

        Ok(!eliminated.is_empty())
    }

    /// Returns a displayable def-use table.
    pub fn table<'a>(&'a self, function: &'a Function) -> DefUseTable<'a> {
        DefUseTable {
            def_use: self,
            function,
        }
    }
}

pub struct DefUseTable<'a> {
    def_use: &'a DefUse,
    function: &'a Function,
}

impl<'a> DefUseTable<'a> {
    fn address_of(&self, id: ExprId) -> String {
        match self.function.parent_statement(id) {
            Some(statement) if statement == self.def_use.uninitialized => "-".to_string(),
            Some(statement) => format!("0x{:X}", self.function.statement(statement).address()),
            None => "?".to_string(),
        }
    }
}

impl<'a> fmt::Display for DefUseTable<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "┏ def-use chains:")?;
        // relaxation may rewrite nested addresses, render the current key
        for (_, def) in self.def_use.definitions() {
            let uses: Vec<String> = self
                .function
                .uses(def)
                .into_iter()
                .map(|user| self.address_of(user))
                .collect();
            writeln!(
                f,
                "┃ {:<24} {:>10} [{}]",
                self.function.key(def).to_string(),
                self.address_of(def),
                uses.join(", ")
            )?;
        }
        write!(f, "┗")
    }
}
