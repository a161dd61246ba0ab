use crate::error::*;
use crate::ir::*;
use std::fmt;

/// A function owns its control flow graph and the arenas of all statements
/// and expressions.
///
/// Expressions never move within the arena. Removing an expression from the
/// IR only detaches it (see `remove_expression` and `replace`).
#[derive(Clone, Debug)]
pub struct Function {
    /// The address of the function.
    address: u64,
    /// An optional name for the function.
    name: Option<String>,
    control_flow_graph: ControlFlowGraph,
    expressions: Vec<Expression>,
    statements: Vec<Statement>,
    /// Holds the implicit definitions of variables read before written.
    uninitialized: Option<StmtId>,
}

impl Function {
    pub fn new(address: u64, name: Option<String>) -> Self {
        Self {
            address,
            name,
            control_flow_graph: ControlFlowGraph::new(),
            expressions: Vec::new(),
            statements: Vec::new(),
            uninitialized: None,
        }
    }

    pub fn address(&self) -> u64 {
        self.address
    }

    /// Returns the name of the function or a default name derived from its address.
    pub fn name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("sub_{:x}", self.address),
        }
    }

    pub fn control_flow_graph(&self) -> &ControlFlowGraph {
        &self.control_flow_graph
    }

    pub fn control_flow_graph_mut(&mut self) -> &mut ControlFlowGraph {
        &mut self.control_flow_graph
    }

    /// The synthetic statement holding implicit definitions, set by SSA construction.
    pub fn uninitialized(&self) -> Option<StmtId> {
        self.uninitialized
    }

    pub fn set_uninitialized(&mut self, uninitialized: Option<StmtId>) {
        self.uninitialized = uninitialized;
    }

    /// Adds a new block starting at `address` and returns its index.
    ///
    /// The first block added becomes the entry block.
    pub fn add_block(&mut self, address: u64) -> Result<usize> {
        if self.control_flow_graph.block_by_address(address).is_some() {
            bail!("Duplicate block at address 0x{:X}", address);
        }
        let index = self.control_flow_graph.new_block(address)?.index();
        if self.control_flow_graph.entry().is_err() {
            self.control_flow_graph.set_entry(index)?;
        }
        Ok(index)
    }

    /// Adds a control flow edge between the blocks at `head` and `tail` address.
    pub fn add_edge(&mut self, head: u64, tail: u64) -> Result<()> {
        let head_index = self.block_index(head)?;
        let tail_index = self.block_index(tail)?;
        self.control_flow_graph
            .unconditional_edge(head_index, tail_index)?;
        Ok(())
    }

    /// Returns the index of the block starting at `address`.
    pub fn block_index(&self, address: u64) -> Result<usize> {
        self.control_flow_graph
            .block_by_address(address)
            .map(Block::index)
            .ok_or_else(|| format!("No block at address 0x{:X}", address).into())
    }

    /// Returns the statements of the block with the given index.
    pub fn block_statements(&self, block_index: usize) -> Result<Vec<StmtId>> {
        Ok(self
            .control_flow_graph
            .block(block_index)?
            .container()
            .statements()
            .to_vec())
    }

    /// Returns all statements attached to blocks, in block order.
    pub fn statements(&self) -> Vec<StmtId> {
        self.control_flow_graph
            .blocks()
            .into_iter()
            .flat_map(|block| block.container().statements().to_vec())
            .collect()
    }

    /// Get an `Expression` by id.
    ///
    /// Ids are only minted by this `Function`, hence they are always valid.
    pub fn expression(&self, id: ExprId) -> &Expression {
        &self.expressions[id.index()]
    }

    pub(crate) fn expression_mut(&mut self, id: ExprId) -> &mut Expression {
        &mut self.expressions[id.index()]
    }

    /// Get a `Statement` by id.
    pub fn statement(&self, id: StmtId) -> &Statement {
        &self.statements[id.index()]
    }

    fn statement_mut(&mut self, id: StmtId) -> &mut Statement {
        &mut self.statements[id.index()]
    }

    /// SSA data of `id`, if it is a variable occurrence.
    pub fn occurrence(&self, id: ExprId) -> Option<&Occurrence> {
        self.expression(id).occurrence()
    }

    pub(crate) fn occurrence_mut(&mut self, id: ExprId) -> Option<&mut Occurrence> {
        self.expression_mut(id).occurrence_mut()
    }

    pub fn set_version(&mut self, id: ExprId, version: Option<usize>) {
        if let Some(occurrence) = self.occurrence_mut(id) {
            occurrence.set_version(version);
        }
    }

    pub fn set_is_def(&mut self, id: ExprId, is_def: bool) {
        if let Some(occurrence) = self.occurrence_mut(id) {
            occurrence.set_is_def(is_def);
        }
    }

    /// Returns the uses of the definition `def`.
    pub fn uses(&self, def: ExprId) -> Vec<ExprId> {
        self.occurrence(def)
            .map(|occurrence| occurrence.uses().iter().copied().collect())
            .unwrap_or_default()
    }

    fn alloc(&mut self, kind: ExpressionKind) -> ExprId {
        let id = ExprId::new(self.expressions.len());
        let operands = kind.operands();
        self.expressions.push(Expression::new(kind));
        for operand in operands {
            self.expression_mut(operand)
                .set_parent(Some(Parent::Expression(id)));
        }
        id
    }

    pub fn register(&mut self, name: &str) -> ExprId {
        self.alloc(ExpressionKind::Register {
            name: name.to_owned(),
            ssa: Occurrence::default(),
        })
    }

    pub fn deref(&mut self, address: ExprId) -> ExprId {
        self.alloc(ExpressionKind::Deref {
            address,
            ssa: Occurrence::default(),
        })
    }

    pub fn constant(&mut self, value: u64) -> ExprId {
        self.alloc(ExpressionKind::Constant(value))
    }

    pub fn unary(&mut self, operator: UnaryOperator, operand: ExprId) -> ExprId {
        self.alloc(ExpressionKind::Unary { operator, operand })
    }

    pub fn binary(&mut self, operator: BinaryOperator, lhs: ExprId, rhs: ExprId) -> ExprId {
        self.alloc(ExpressionKind::Binary { operator, lhs, rhs })
    }

    /// Creates the assignment `lhs = rhs` and marks `lhs` as definition.
    pub fn assign(&mut self, lhs: ExprId, rhs: ExprId) -> ExprId {
        self.set_is_def(lhs, true);
        self.alloc(ExpressionKind::Assign { lhs, rhs })
    }

    pub fn phi(&mut self, arguments: Vec<ExprId>) -> ExprId {
        self.alloc(ExpressionKind::Phi { arguments })
    }

    pub fn call(&mut self, target: ExprId, arguments: Vec<ExprId>) -> ExprId {
        self.alloc(ExpressionKind::Call { target, arguments })
    }

    pub fn branch(&mut self, condition: Option<ExprId>, target: ExprId) -> ExprId {
        self.alloc(ExpressionKind::Branch { condition, target })
    }

    pub fn ret(&mut self, value: Option<ExprId>) -> ExprId {
        self.alloc(ExpressionKind::Return { value })
    }

    fn new_statement(
        &mut self,
        address: u64,
        expressions: Vec<ExprId>,
        block: Option<usize>,
    ) -> StmtId {
        let id = StmtId::new(self.statements.len());
        for &expression in &expressions {
            self.expression_mut(expression)
                .set_parent(Some(Parent::Statement(id)));
        }
        self.statements
            .push(Statement::new(address, expressions, block));
        id
    }

    /// Appends a new statement to the block with the given index.
    pub fn push_statement(
        &mut self,
        block_index: usize,
        address: u64,
        expressions: Vec<ExprId>,
    ) -> Result<StmtId> {
        self.control_flow_graph.block(block_index)?;
        let id = self.new_statement(address, expressions, Some(block_index));
        self.control_flow_graph
            .block_mut(block_index)?
            .container_mut()
            .push(id);
        Ok(id)
    }

    /// Inserts a new statement at the front of the block with the given index.
    pub fn unshift_statement(
        &mut self,
        block_index: usize,
        address: u64,
        expressions: Vec<ExprId>,
    ) -> Result<StmtId> {
        self.control_flow_graph.block(block_index)?;
        let id = self.new_statement(address, expressions, Some(block_index));
        self.control_flow_graph
            .block_mut(block_index)?
            .container_mut()
            .unshift(id);
        Ok(id)
    }

    /// Creates a statement which is not part of any block.
    pub fn detached_statement(&mut self, address: u64, expressions: Vec<ExprId>) -> StmtId {
        self.new_statement(address, expressions, None)
    }

    /// Appends a top-level expression to an existing statement.
    pub fn append_to_statement(&mut self, statement: StmtId, expression: ExprId) {
        self.expression_mut(expression)
            .set_parent(Some(Parent::Statement(statement)));
        self.statement_mut(statement).push_expression(expression);
    }

    /// Removes `statement` from its block container.
    ///
    /// The expressions of the statement are left untouched.
    pub fn pluck(&mut self, statement: StmtId) -> Result<()> {
        if let Some(block_index) = self.statement(statement).block() {
            self.control_flow_graph
                .block_mut(block_index)?
                .container_mut()
                .remove(statement);
            self.statement_mut(statement).set_block(None);
        }
        Ok(())
    }

    /// Returns the structural key of `id`, including all versions.
    pub fn key(&self, id: ExprId) -> ExprKey {
        let boxed = |key: ExprKey| Box::new(key);
        match self.expression(id).kind() {
            ExpressionKind::Register { name, ssa } => ExprKey::register(name, ssa.version()),
            ExpressionKind::Deref { address, ssa } => {
                ExprKey::deref(self.key(*address), ssa.version())
            }
            ExpressionKind::Constant(value) => ExprKey::Constant(*value),
            ExpressionKind::Unary { operator, operand } => {
                ExprKey::Unary(*operator, boxed(self.key(*operand)))
            }
            ExpressionKind::Binary { operator, lhs, rhs } => {
                ExprKey::Binary(*operator, boxed(self.key(*lhs)), boxed(self.key(*rhs)))
            }
            ExpressionKind::Assign { lhs, rhs } => {
                ExprKey::Assign(boxed(self.key(*lhs)), boxed(self.key(*rhs)))
            }
            ExpressionKind::Phi { arguments } => {
                ExprKey::Phi(arguments.iter().map(|a| self.key(*a)).collect())
            }
            ExpressionKind::Call { target, arguments } => ExprKey::Call(
                boxed(self.key(*target)),
                arguments.iter().map(|a| self.key(*a)).collect(),
            ),
            ExpressionKind::Branch { condition, target } => ExprKey::Branch(
                condition.map(|c| boxed(self.key(c))),
                boxed(self.key(*target)),
            ),
            ExpressionKind::Return { value } => {
                ExprKey::Return(value.map(|v| boxed(self.key(v))))
            }
        }
    }

    /// Returns the key of the variable `id` is an occurrence of.
    ///
    /// Equal for all versions of the same variable.
    pub fn variable_key(&self, id: ExprId) -> ExprKey {
        self.key(id).without_version()
    }

    /// Renders an expression, versions are printed as `.N` suffix.
    pub fn render(&self, id: ExprId) -> String {
        self.key(id).to_string()
    }

    pub fn render_statement(&self, statement: StmtId) -> String {
        let statement = self.statement(statement);
        let expressions: Vec<String> = statement
            .expressions()
            .iter()
            .map(|e| self.render(*e))
            .collect();
        format!("0x{:X}: {}", statement.address(), expressions.join("; "))
    }

    fn collect_post_order(&self, id: ExprId, operands: &mut Vec<ExprId>) {
        for operand in self.expression(id).operands() {
            self.collect_post_order(operand, operands);
        }
        operands.push(id);
    }

    /// The whole expression tree rooted at `id` in post-order, `id` itself last.
    pub fn subtree(&self, id: ExprId) -> Vec<ExprId> {
        let mut operands = Vec::new();
        self.collect_post_order(id, &mut operands);
        operands
    }

    /// Iterates the operands of `id`.
    ///
    /// Without `flatten` only the direct operands are returned. With `flatten`
    /// all nested operands are returned in post-order, so inner operands always
    /// precede the operands containing them.
    pub fn iter_operands(&self, id: ExprId, flatten: bool) -> Vec<ExprId> {
        if flatten {
            let mut operands = self.subtree(id);
            operands.pop();
            operands
        } else {
            self.expression(id).operands()
        }
    }

    /// The statement `id` is (transitively) contained in.
    pub fn parent_statement(&self, id: ExprId) -> Option<StmtId> {
        let mut current = id;
        loop {
            match self.expression(current).parent() {
                Some(Parent::Statement(statement)) => return Some(statement),
                Some(Parent::Expression(parent)) => current = parent,
                None => return None,
            }
        }
    }

    /// Returns `true` if `id` is part of a statement in a block or of the
    /// uninitialized statement.
    pub fn is_attached(&self, id: ExprId) -> bool {
        self.parent_statement(id).map_or(false, |statement| {
            self.statement(statement).block().is_some() || Some(statement) == self.uninitialized
        })
    }

    /// Returns `(lhs, rhs)` if `id` is an assignment.
    pub fn assignment(&self, id: ExprId) -> Option<(ExprId, ExprId)> {
        match self.expression(id).kind() {
            ExpressionKind::Assign { lhs, rhs } => Some((*lhs, *rhs)),
            _ => None,
        }
    }

    /// Returns the assignment defining `def`, if `def` is the lhs of an assignment.
    pub fn defining_assignment(&self, def: ExprId) -> Option<ExprId> {
        match self.expression(def).parent() {
            Some(Parent::Expression(parent)) => match self.assignment(parent) {
                Some((lhs, _)) if lhs == def => Some(parent),
                _ => None,
            },
            _ => None,
        }
    }

    /// Returns `true` if `id` is an assignment of a phi.
    pub fn is_phi_assignment(&self, id: ExprId) -> bool {
        self.assignment(id)
            .map_or(false, |(_, rhs)| self.expression(rhs).is_phi())
    }

    /// Returns `true` if `id` is a direct argument of a phi.
    pub fn is_phi_argument(&self, id: ExprId) -> bool {
        match self.expression(id).parent() {
            Some(Parent::Expression(parent)) => self.expression(parent).is_phi(),
            _ => false,
        }
    }

    /// Links the use `user` to the definition `def`, maintaining both sides.
    ///
    /// A previous link of `user` is removed first.
    pub fn link(&mut self, user: ExprId, def: ExprId) {
        if self.occurrence(user).and_then(Occurrence::def) == Some(def) {
            return;
        }
        self.unlink(user);
        if let Some(occurrence) = self.occurrence_mut(user) {
            occurrence.set_def(Some(def));
        }
        if let Some(occurrence) = self.occurrence_mut(def) {
            occurrence.uses_mut().insert(user);
        }
    }

    /// Removes the link of the use `user` to its definition, returns the former definition.
    pub fn unlink(&mut self, user: ExprId) -> Option<ExprId> {
        let def = self.occurrence_mut(user)?.take_def()?;
        if let Some(occurrence) = self.occurrence_mut(def) {
            occurrence.uses_mut().remove(&user);
        }
        Some(def)
    }

    /// Removes every def-use link touching the expression tree rooted at `id`.
    pub fn detach(&mut self, id: ExprId) {
        for operand in self.subtree(id) {
            self.unlink(operand);
            for user in self.uses(operand) {
                self.unlink(user);
            }
        }
    }

    /// Deep-copies the expression tree rooted at `id`.
    ///
    /// The copy keeps all versions and nested uses resolve to the same
    /// definitions as in the source tree. The root of the copy is never a definition.
    pub fn clone_expr(&mut self, id: ExprId) -> ExprId {
        let kind = match self.expression(id).kind().clone() {
            ExpressionKind::Register { name, ssa } => ExpressionKind::Register {
                name,
                ssa: ssa.cloned_use(),
            },
            ExpressionKind::Deref { address, ssa } => ExpressionKind::Deref {
                address: self.clone_expr(address),
                ssa: ssa.cloned_use(),
            },
            ExpressionKind::Constant(value) => ExpressionKind::Constant(value),
            ExpressionKind::Unary { operator, operand } => ExpressionKind::Unary {
                operator,
                operand: self.clone_expr(operand),
            },
            ExpressionKind::Binary { operator, lhs, rhs } => ExpressionKind::Binary {
                operator,
                lhs: self.clone_expr(lhs),
                rhs: self.clone_expr(rhs),
            },
            ExpressionKind::Assign { lhs, rhs } => {
                let lhs = self.clone_expr(lhs);
                let rhs = self.clone_expr(rhs);
                return self.assign(lhs, rhs);
            }
            ExpressionKind::Phi { arguments } => ExpressionKind::Phi {
                arguments: arguments
                    .into_iter()
                    .map(|argument| self.clone_expr(argument))
                    .collect(),
            },
            ExpressionKind::Call { target, arguments } => ExpressionKind::Call {
                target: self.clone_expr(target),
                arguments: arguments
                    .into_iter()
                    .map(|argument| self.clone_expr(argument))
                    .collect(),
            },
            ExpressionKind::Branch { condition, target } => ExpressionKind::Branch {
                condition: condition.map(|condition| self.clone_expr(condition)),
                target: self.clone_expr(target),
            },
            ExpressionKind::Return { value } => ExpressionKind::Return {
                value: value.map(|value| self.clone_expr(value)),
            },
        };

        let clone = self.alloc(kind);
        if let Some(def) = self.occurrence(id).and_then(Occurrence::def) {
            self.link(clone, def);
        }
        clone
    }

    /// Substitutes `old` with `new` in the parent of `old`, `old` becomes detached.
    pub fn replace(&mut self, old: ExprId, new: ExprId) -> Result<()> {
        let parent = match self.expression(old).parent() {
            Some(parent) => parent,
            None => bail!(ErrorKind::MalformedFunction(format!(
                "cannot replace {} without parent",
                self.render(old)
            ))),
        };

        let replaced = match parent {
            Parent::Expression(parent) => self
                .expression_mut(parent)
                .kind_mut()
                .replace_operand(old, new),
            Parent::Statement(statement) => {
                self.statement_mut(statement).replace_expression(old, new)
            }
        };
        if !replaced {
            bail!(ErrorKind::MalformedFunction(format!(
                "{} is not an operand of its parent",
                self.render(old)
            )));
        }

        self.expression_mut(new).set_parent(Some(parent));
        self.expression_mut(old).set_parent(None);
        Ok(())
    }

    /// Removes the top-level expression `id` from its statement, detaching all
    /// of its def-use links. A statement left empty is plucked.
    pub fn remove_expression(&mut self, id: ExprId) -> Result<()> {
        let statement = match self.expression(id).parent() {
            Some(Parent::Statement(statement)) => statement,
            _ => bail!(ErrorKind::MalformedFunction(format!(
                "{} is not a top-level expression",
                self.render(id)
            ))),
        };

        self.detach(id);
        self.statement_mut(statement).remove_expression(id);
        self.expression_mut(id).set_parent(None);

        if self.statement(statement).is_empty() {
            self.pluck(statement)?;
        }
        Ok(())
    }

    /// Resets the SSA data (version, def and uses) of every occurrence in `statement`.
    pub(crate) fn clear_statement_ssa_data(&mut self, statement: StmtId) {
        let expressions = self.statement(statement).expressions().to_vec();
        for expression in expressions {
            for operand in self.subtree(expression) {
                if let Some(occurrence) = self.occurrence_mut(operand) {
                    occurrence.clear();
                }
            }
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "function 0x{:X} {}", self.address, self.name())?;
        for block in self.control_flow_graph.blocks() {
            write!(f, "block 0x{:X}", block.address())?;
            let successors = self
                .control_flow_graph
                .successor_indices(block.index())
                .map_err(|_| fmt::Error)?;
            let mut is_first = true;
            for successor in successors {
                let successor = self
                    .control_flow_graph
                    .block(successor)
                    .map_err(|_| fmt::Error)?;
                write!(f, "{} 0x{:X}", if is_first { " ->" } else { "," }, successor.address())?;
                is_first = false;
            }
            writeln!(f)?;
            for statement in block.container().statements() {
                writeln!(f, "    {}", self.render_statement(*statement))?;
            }
        }
        if let Some(uninitialized) = self.uninitialized {
            let expressions: Vec<String> = self
                .statement(uninitialized)
                .expressions()
                .iter()
                .map(|e| self.render(*e))
                .collect();
            if !expressions.is_empty() {
                writeln!(f, "# uninitialized: {}", expressions.join(", "))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn function_with_block() -> (Function, usize) {
        let mut function = Function::new(0x1000, None);
        let block = function.add_block(0x1000).unwrap();
        (function, block)
    }

    #[test]
    fn test_first_block_becomes_entry() {
        let mut function = Function::new(0x1000, None);
        let first = function.add_block(0x1000).unwrap();
        function.add_block(0x1010).unwrap();

        assert_eq!(function.control_flow_graph().entry().unwrap(), first);
    }

    #[test]
    fn test_duplicate_block_address_is_rejected() {
        let mut function = Function::new(0x1000, None);
        function.add_block(0x1000).unwrap();

        assert!(function.add_block(0x1000).is_err());
    }

    #[test]
    fn test_assign_marks_lhs_as_definition() {
        let (mut function, block) = function_with_block();
        let rax = function.register("rax");
        let one = function.constant(1);
        let assign = function.assign(rax, one);
        function.push_statement(block, 0x1000, vec![assign]).unwrap();

        assert!(function.expression(rax).is_def());
        assert_eq!(function.defining_assignment(rax), Some(assign));
        assert_eq!(function.render(assign), "rax = 0x1");
    }

    #[test]
    fn test_iter_operands_flattened_is_post_order() {
        // Given: *(rsp + 0x8) = rax
        let (mut function, block) = function_with_block();
        let rsp = function.register("rsp");
        let eight = function.constant(8);
        let address = function.binary(BinaryOperator::Add, rsp, eight);
        let deref = function.deref(address);
        let rax = function.register("rax");
        let assign = function.assign(deref, rax);
        function.push_statement(block, 0x1000, vec![assign]).unwrap();

        // When:
        let flat = function.iter_operands(assign, true);
        let direct = function.iter_operands(assign, false);

        // Then:
        assert_eq!(flat, vec![rsp, eight, address, deref, rax]);
        assert_eq!(direct, vec![deref, rax]);
    }

    #[test]
    fn test_parent_statement_of_nested_operand() {
        let (mut function, block) = function_with_block();
        let rsp = function.register("rsp");
        let deref = function.deref(rsp);
        let rax = function.register("rax");
        let assign = function.assign(rax, deref);
        let statement = function.push_statement(block, 0x1004, vec![assign]).unwrap();

        assert_eq!(function.parent_statement(rsp), Some(statement));
        assert_eq!(function.statement(statement).address(), 0x1004);
    }

    #[test]
    fn test_link_moves_use_between_definitions() {
        let (mut function, _) = function_with_block();
        let def1 = function.register("rax");
        let def2 = function.register("rax");
        let user = function.register("rax");

        function.link(user, def1);
        function.link(user, def2);

        assert!(function.uses(def1).is_empty());
        assert_eq!(function.uses(def2), vec![user]);
        assert_eq!(function.occurrence(user).unwrap().def(), Some(def2));
    }

    #[test]
    fn test_clone_expr_links_nested_uses_to_same_definitions() {
        // Given: *(rsp.1) where rsp.1 is linked to a definition
        let (mut function, _) = function_with_block();
        let def = function.register("rsp");
        let rsp = function.register("rsp");
        function.set_version(rsp, Some(1));
        function.link(rsp, def);
        let deref = function.deref(rsp);
        function.set_version(deref, Some(2));

        // When:
        let clone = function.clone_expr(deref);

        // Then: same key, nested use linked, clone is no definition
        assert_eq!(function.key(clone), function.key(deref));
        assert_eq!(function.uses(def).len(), 2);
        assert!(!function.expression(clone).is_def());
        assert_eq!(function.expression(clone).parent(), None);
    }

    #[test]
    fn test_replace_substitutes_operand_and_detaches_old() {
        let (mut function, block) = function_with_block();
        let rax = function.register("rax");
        let rbx = function.register("rbx");
        let assign = function.assign(rax, rbx);
        function.push_statement(block, 0x1000, vec![assign]).unwrap();
        let one = function.constant(1);

        function.replace(rbx, one).unwrap();

        assert_eq!(function.render(assign), "rax = 0x1");
        assert_eq!(function.expression(rbx).parent(), None);
        assert_eq!(
            function.expression(one).parent(),
            Some(Parent::Expression(assign))
        );
    }

    #[test]
    fn test_replace_without_parent_fails() {
        let (mut function, _) = function_with_block();
        let rax = function.register("rax");
        let one = function.constant(1);

        assert!(function.replace(rax, one).is_err());
    }

    #[test]
    fn test_remove_last_expression_plucks_statement() {
        let (mut function, block) = function_with_block();
        let rax = function.register("rax");
        let one = function.constant(1);
        let assign = function.assign(rax, one);
        let statement = function.push_statement(block, 0x1000, vec![assign]).unwrap();

        function.remove_expression(assign).unwrap();

        assert!(function.block_statements(block).unwrap().is_empty());
        assert_eq!(function.statement(statement).block(), None);
        assert!(!function.is_attached(rax));
    }

    #[test]
    fn test_unshift_statement_inserts_at_front() {
        let (mut function, block) = function_with_block();
        let ret = function.ret(None);
        let second = function.push_statement(block, 0x1004, vec![ret]).unwrap();
        let rax = function.register("rax");
        let zero = function.constant(0);
        let assign = function.assign(rax, zero);
        let first = function.unshift_statement(block, 0x1000, vec![assign]).unwrap();

        assert_eq!(function.block_statements(block).unwrap(), vec![first, second]);
    }

    #[test]
    fn test_display_lists_blocks_edges_and_statements() {
        let mut function = Function::new(0x1000, Some("main".to_string()));
        let entry = function.add_block(0x1000).unwrap();
        function.add_block(0x1010).unwrap();
        function.add_edge(0x1000, 0x1010).unwrap();
        let rax = function.register("rax");
        let one = function.constant(1);
        let assign = function.assign(rax, one);
        function.push_statement(entry, 0x1000, vec![assign]).unwrap();

        assert_eq!(
            function.to_string(),
            "function 0x1000 main\nblock 0x1000 -> 0x1010\n    0x1000: rax = 0x1\nblock 0x1010\n"
        );
    }
}
