//! The Brook type checker.
//!
//! A single traversal over the attributed tree that computes a [`Type`] for
//! every node, records it in a side table keyed by [`NodeId`], and collects
//! formatted diagnostics. Errors are values, not control flow: a failed
//! operation yields [`Type::Error`], the error is reported once, and checking
//! of the enclosing nodes continues with the error type as the operand.

use std::collections::BTreeMap;

use crate::{
    ast::{
        Assignment, CallExpression, Declaration, DeclarationList, Expression, ForLoop,
        FunctionDefinition, IfElseBranch, NodeId, Operator, Position, Statement, StatementList,
    },
    middle::ty::Type,
};

/// The side table produced by checking: a type for every visited node plus the
/// ordered diagnostics.
#[derive(Debug, Default)]
pub struct TypeCheckResults {
    node_types: BTreeMap<NodeId, Type>,
    errors: Vec<String>,
}

impl TypeCheckResults {
    pub fn get_type(&self, id: NodeId) -> Option<&Type> {
        self.node_types.get(&id)
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Checks a whole program. Always runs to completion; every independent error
/// is reported in one pass.
pub fn check(program: &DeclarationList) -> TypeCheckResults {
    let mut checker = TypeChecker {
        results: TypeCheckResults::default(),
        last_statement_returns: false,
        loop_depth: 0,
    };

    log::debug!(
        "type checking program with {} declaration(s)",
        program.declarations.len()
    );

    for declaration in &program.declarations {
        checker.check_declaration(declaration);
    }

    log::debug!(
        "type checking finished with {} error(s)",
        checker.results.errors.len()
    );

    checker.results
}

struct TypeChecker {
    results: TypeCheckResults,
    /// Whether the most recently checked statement returns unconditionally.
    /// Drives both the unreachable-statement check and the
    /// return-on-every-path check.
    last_statement_returns: bool,
    /// Depth of enclosing loops; `break` is only legal at depth > 0
    loop_depth: usize,
}

impl TypeChecker {
    /// Records the type computed for a node. An error type is also reported as
    /// a diagnostic at the node's position.
    fn record(&mut self, id: NodeId, position: Position, ty: Type) -> Type {
        if let Type::Error(message) = &ty {
            self.add_error(position, message.clone());
        }
        self.results.node_types.insert(id, ty.clone());
        ty
    }

    /// Records a type without reporting it: used where the type was not
    /// produced by an algebra operation (the referenced symbol already
    /// carries it).
    fn record_quiet(&mut self, id: NodeId, ty: Type) -> Type {
        self.results.node_types.insert(id, ty.clone());
        ty
    }

    fn add_error(&mut self, position: Position, message: String) {
        self.results
            .errors
            .push(format!("TypeError{position}[{message}]"));
    }

    fn check_declaration(&mut self, declaration: &Declaration) {
        match declaration {
            Declaration::Variable(decl) => {
                self.check_scalar_declaration(decl.position, &decl.symbol.ty(), decl.symbol.name());
            }
            Declaration::Array(decl) => {
                let ty = decl.symbol.ty();
                match ty.array_base() {
                    Some(Type::Int) | Some(Type::Bool) => {}
                    _ if ty.is_error() => {} // already diagnosed by the symbol table
                    _ => self.add_error(
                        decl.position,
                        format!("array {} declared with invalid type {ty}", decl.symbol.name()),
                    ),
                }
            }
            Declaration::Function(function) => self.check_function(function),
        }
    }

    fn check_scalar_declaration(&mut self, position: Position, ty: &Type, name: &str) {
        match ty {
            Type::Int | Type::Bool => {}
            _ if ty.is_error() => {} // already diagnosed by the symbol table
            _ => self.add_error(position, format!("variable {name} declared with invalid type {ty}")),
        }
    }

    fn check_function(&mut self, function: &FunctionDefinition) {
        let name = function.symbol.name();
        let ty = function.symbol.ty();

        let Type::Func { params, ret } = &ty else {
            // Redeclared function symbol; the symbol table reported it
            return;
        };

        self.last_statement_returns = false;
        self.check_statement_list(&function.body);

        if name == "main" {
            if !ret.is_void() {
                self.add_error(function.position, "main must return void".to_owned());
            }
            if !params.is_empty() {
                self.add_error(function.position, "main must not take arguments".to_owned());
            }
        }

        if !ret.is_void() && !self.last_statement_returns {
            self.add_error(
                function.position,
                format!("function {name} does not return on every path"),
            );
        }
    }

    fn check_statement_list(&mut self, list: &StatementList) {
        for statement in &list.statements {
            if self.last_statement_returns {
                // Everything past an unconditional return is dead; flag the
                // first offender once and skip the rest of the sequence
                self.add_error(statement.position(), "unreachable statement".to_owned());
                break;
            }
            self.check_statement(statement);
        }
    }

    fn check_statement(&mut self, statement: &Statement) {
        match statement {
            Statement::VariableDeclaration(decl) => {
                self.check_scalar_declaration(decl.position, &decl.symbol.ty(), decl.symbol.name());
                self.last_statement_returns = false;
            }
            Statement::Assignment(assignment) => self.check_assignment(assignment),
            Statement::Call(call) => {
                self.check_call(call);
                self.last_statement_returns = false;
            }
            Statement::If(branch) => {
                self.check_if(branch);
                self.record_quiet(branch.id, Type::Void);
            }
            Statement::For(for_loop) => {
                self.check_for(for_loop);
                self.record_quiet(for_loop.id, Type::Void);
            }
            Statement::Break(brk) => {
                if self.loop_depth == 0 {
                    self.add_error(brk.position, "break outside of a loop".to_owned());
                }
                self.record_quiet(brk.id, Type::Void);
                self.last_statement_returns = false;
            }
            Statement::Return(ret) => {
                let ty = match &ret.value {
                    Some(value) => self.check_expression(value),
                    None => Type::Void,
                };
                self.record_quiet(ret.id, ty);
                self.last_statement_returns = true;
            }
        }
    }

    fn check_assignment(&mut self, assignment: &Assignment) {
        let location = self.check_expression(&assignment.location);
        let value = self.check_expression(&assignment.value);
        self.record(assignment.id, assignment.position, location.assign(&value));
        self.last_statement_returns = false;
    }

    fn check_if(&mut self, branch: &IfElseBranch) {
        let condition = self.check_expression(&branch.condition);
        if !condition.is_bool() {
            self.add_error(branch.position, "condition is not bool".to_owned());
        }

        self.last_statement_returns = false;
        self.check_statement_list(&branch.then_block);
        let then_returns = self.last_statement_returns;

        self.last_statement_returns = false;
        self.check_statement_list(&branch.else_block);
        let else_returns = self.last_statement_returns;

        // The branch as a whole returns only when both arms do
        self.last_statement_returns = then_returns && else_returns;
    }

    fn check_for(&mut self, for_loop: &ForLoop) {
        self.check_assignment(&for_loop.init);

        let condition = self.check_expression(&for_loop.condition);
        if !condition.is_bool() {
            self.add_error(for_loop.position, "condition is not bool".to_owned());
        }

        self.check_assignment(&for_loop.increment);

        self.loop_depth += 1;
        self.last_statement_returns = false;
        self.check_statement_list(&for_loop.body);
        self.loop_depth -= 1;

        // The body may run zero times, so the loop never guarantees a return
        self.last_statement_returns = false;
    }

    fn check_call(&mut self, call: &CallExpression) -> Type {
        let argument_types: Vec<Type> = call
            .arguments
            .iter()
            .map(|argument| self.check_expression(argument))
            .collect();

        let result = call.callee.ty().call(&argument_types);
        self.record(call.id, call.position, result)
    }

    fn check_expression(&mut self, expression: &Expression) -> Type {
        match expression {
            Expression::LiteralInt(lit) => self.record_quiet(lit.id, Type::Int),
            Expression::LiteralBool(lit) => self.record_quiet(lit.id, Type::Bool),
            Expression::VarAccess(access) => self.record_quiet(access.id, access.symbol.ty()),
            Expression::ArrayAccess(access) => {
                let index = self.check_expression(&access.index);
                let result = access.base.ty().index(&index);
                self.record(access.id, access.position, result)
            }
            Expression::Op(op) => {
                let lhs = self.check_expression(&op.lhs);
                let rhs = op.rhs.as_deref().map(|rhs| self.check_expression(rhs));

                let result = match (op.op, &rhs) {
                    (Operator::Add, Some(rhs)) => lhs.add(rhs),
                    (Operator::Sub, Some(rhs)) => lhs.sub(rhs),
                    (Operator::Mul, Some(rhs)) => lhs.mul(rhs),
                    (Operator::Div, Some(rhs)) => lhs.div(rhs),
                    (
                        Operator::GreaterEqual
                        | Operator::Greater
                        | Operator::LessEqual
                        | Operator::Less
                        | Operator::Equal
                        | Operator::NotEqual,
                        Some(rhs),
                    ) => lhs.compare(rhs),
                    (Operator::LogicalAnd, Some(rhs)) => lhs.and(rhs),
                    (Operator::LogicalOr, Some(rhs)) => lhs.or(rhs),
                    (Operator::LogicalNot, None) => lhs.not(),
                    // A unary application of a binary operator (or vice versa)
                    // is a malformed tree from the previous stage
                    _ => Type::Error(format!("malformed operation {:?}", op.op)),
                };

                self.record(op.id, op.position, result)
            }
            Expression::Call(call) => self.check_call(call),
        }
    }
}
