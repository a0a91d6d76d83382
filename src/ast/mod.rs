//! The attributed syntax tree consumed by the type checker and the IR
//! lowering pass.
//!
//! This tree is the hand-off point from the (external) parsing stage: symbol
//! resolution has already happened, so every name reference and call site
//! carries the [`Symbol`] it resolved to, and every declaration carries the
//! symbol it bound. Nodes are identified by a [`NodeId`] so that later passes
//! can record per-node facts in side tables instead of mutating the tree.

use crate::{
    ast::symbol_table::Symbol,
    index::{Index, simple_index},
};

pub mod symbol_table;

simple_index! {
    /// Identifies a syntax tree node
    pub struct NodeId;
}

/// A source position (line number), displayed as `(line)` inside diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    line: u32,
}

impl Position {
    pub fn new(line: u32) -> Self {
        Position { line }
    }
}

impl core::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({})", self.line)
    }
}

/// The root of a program: the ordered list of global declarations.
#[derive(Debug)]
pub struct DeclarationList {
    pub declarations: Vec<Declaration>,
}

#[derive(Debug)]
pub enum Declaration {
    Variable(VariableDeclaration),
    Array(ArrayDeclaration),
    Function(FunctionDefinition),
}

#[derive(Debug)]
pub struct VariableDeclaration {
    pub id: NodeId,
    pub position: Position,
    pub symbol: Symbol,
}

#[derive(Debug)]
pub struct ArrayDeclaration {
    pub id: NodeId,
    pub position: Position,
    pub symbol: Symbol,
}

#[derive(Debug)]
pub struct FunctionDefinition {
    pub id: NodeId,
    pub position: Position,
    pub symbol: Symbol,
    /// Parameter symbols, in declaration (and calling) order
    pub parameters: Vec<Symbol>,
    pub body: StatementList,
}

#[derive(Debug)]
pub struct StatementList {
    pub statements: Vec<Statement>,
}

#[derive(Debug)]
pub enum Statement {
    VariableDeclaration(VariableDeclaration),
    Assignment(Assignment),
    Call(CallExpression),
    If(IfElseBranch),
    For(ForLoop),
    Break(Break),
    Return(Return),
}

impl Statement {
    pub fn position(&self) -> Position {
        match self {
            Statement::VariableDeclaration(decl) => decl.position,
            Statement::Assignment(assignment) => assignment.position,
            Statement::Call(call) => call.position,
            Statement::If(branch) => branch.position,
            Statement::For(for_loop) => for_loop.position,
            Statement::Break(brk) => brk.position,
            Statement::Return(ret) => ret.position,
        }
    }
}

#[derive(Debug)]
pub struct Assignment {
    pub id: NodeId,
    pub position: Position,
    /// A variable or array access designating the storage written to
    pub location: Expression,
    pub value: Expression,
}

#[derive(Debug)]
pub struct IfElseBranch {
    pub id: NodeId,
    pub position: Position,
    pub condition: Expression,
    pub then_block: StatementList,
    /// Empty when the source had no `else` clause
    pub else_block: StatementList,
}

#[derive(Debug)]
pub struct ForLoop {
    pub id: NodeId,
    pub position: Position,
    pub init: Box<Assignment>,
    pub condition: Expression,
    pub increment: Box<Assignment>,
    pub body: StatementList,
}

#[derive(Debug)]
pub struct Break {
    pub id: NodeId,
    pub position: Position,
}

#[derive(Debug)]
pub struct Return {
    pub id: NodeId,
    pub position: Position,
    pub value: Option<Expression>,
}

#[derive(Debug)]
pub enum Expression {
    LiteralInt(LiteralInt),
    LiteralBool(LiteralBool),
    VarAccess(VarAccess),
    ArrayAccess(ArrayAccess),
    Op(OpExpr),
    Call(CallExpression),
}

impl Expression {
    pub fn id(&self) -> NodeId {
        match self {
            Expression::LiteralInt(lit) => lit.id,
            Expression::LiteralBool(lit) => lit.id,
            Expression::VarAccess(access) => access.id,
            Expression::ArrayAccess(access) => access.id,
            Expression::Op(op) => op.id,
            Expression::Call(call) => call.id,
        }
    }

    pub fn position(&self) -> Position {
        match self {
            Expression::LiteralInt(lit) => lit.position,
            Expression::LiteralBool(lit) => lit.position,
            Expression::VarAccess(access) => access.position,
            Expression::ArrayAccess(access) => access.position,
            Expression::Op(op) => op.position,
            Expression::Call(call) => call.position,
        }
    }
}

#[derive(Debug)]
pub struct LiteralInt {
    pub id: NodeId,
    pub position: Position,
    pub value: i64,
}

#[derive(Debug)]
pub struct LiteralBool {
    pub id: NodeId,
    pub position: Position,
    pub value: bool,
}

#[derive(Debug)]
pub struct VarAccess {
    pub id: NodeId,
    pub position: Position,
    pub symbol: Symbol,
}

#[derive(Debug)]
pub struct ArrayAccess {
    pub id: NodeId,
    pub position: Position,
    pub base: Symbol,
    pub index: Box<Expression>,
}

/// A unary or binary operator application. `rhs` is `None` exactly for the
/// unary logical not.
#[derive(Debug)]
pub struct OpExpr {
    pub id: NodeId,
    pub position: Position,
    pub op: Operator,
    pub lhs: Box<Expression>,
    pub rhs: Option<Box<Expression>>,
}

#[derive(Debug)]
pub struct CallExpression {
    pub id: NodeId,
    pub position: Position,
    pub callee: Symbol,
    /// Argument expressions in calling (and evaluation) order
    pub arguments: Vec<Expression>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
    GreaterEqual,
    Greater,
    LessEqual,
    Less,
    Equal,
    NotEqual,
    LogicalAnd,
    LogicalOr,
    LogicalNot,
}

/// Allocates [`NodeId`]s and assembles attributed tree nodes. This is the
/// factory the tree-building stage (and the test suites, standing in for it)
/// construct nodes through, so that ids stay unique per tree.
#[derive(Debug, Default)]
pub struct AstBuilder {
    next_node_id: u32,
}

impl AstBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> NodeId {
        let id = NodeId::new(self.next_node_id as usize);
        self.next_node_id += 1;
        id
    }

    pub fn literal_int(&mut self, line: u32, value: i64) -> Expression {
        Expression::LiteralInt(LiteralInt {
            id: self.next_id(),
            position: Position::new(line),
            value,
        })
    }

    pub fn literal_bool(&mut self, line: u32, value: bool) -> Expression {
        Expression::LiteralBool(LiteralBool {
            id: self.next_id(),
            position: Position::new(line),
            value,
        })
    }

    pub fn var_access(&mut self, line: u32, symbol: Symbol) -> Expression {
        Expression::VarAccess(VarAccess {
            id: self.next_id(),
            position: Position::new(line),
            symbol,
        })
    }

    pub fn array_access(&mut self, line: u32, base: Symbol, index: Expression) -> Expression {
        Expression::ArrayAccess(ArrayAccess {
            id: self.next_id(),
            position: Position::new(line),
            base,
            index: Box::new(index),
        })
    }

    pub fn binary(&mut self, line: u32, op: Operator, lhs: Expression, rhs: Expression) -> Expression {
        Expression::Op(OpExpr {
            id: self.next_id(),
            position: Position::new(line),
            op,
            lhs: Box::new(lhs),
            rhs: Some(Box::new(rhs)),
        })
    }

    pub fn logical_not(&mut self, line: u32, operand: Expression) -> Expression {
        Expression::Op(OpExpr {
            id: self.next_id(),
            position: Position::new(line),
            op: Operator::LogicalNot,
            lhs: Box::new(operand),
            rhs: None,
        })
    }

    pub fn call(&mut self, line: u32, callee: Symbol, arguments: Vec<Expression>) -> CallExpression {
        CallExpression {
            id: self.next_id(),
            position: Position::new(line),
            callee,
            arguments,
        }
    }

    pub fn assignment(&mut self, line: u32, location: Expression, value: Expression) -> Assignment {
        Assignment {
            id: self.next_id(),
            position: Position::new(line),
            location,
            value,
        }
    }

    pub fn variable_declaration(&mut self, line: u32, symbol: Symbol) -> VariableDeclaration {
        VariableDeclaration {
            id: self.next_id(),
            position: Position::new(line),
            symbol,
        }
    }

    pub fn array_declaration(&mut self, line: u32, symbol: Symbol) -> ArrayDeclaration {
        ArrayDeclaration {
            id: self.next_id(),
            position: Position::new(line),
            symbol,
        }
    }

    pub fn function(
        &mut self,
        line: u32,
        symbol: Symbol,
        parameters: Vec<Symbol>,
        body: StatementList,
    ) -> FunctionDefinition {
        FunctionDefinition {
            id: self.next_id(),
            position: Position::new(line),
            symbol,
            parameters,
            body,
        }
    }

    pub fn if_else(
        &mut self,
        line: u32,
        condition: Expression,
        then_block: StatementList,
        else_block: StatementList,
    ) -> IfElseBranch {
        IfElseBranch {
            id: self.next_id(),
            position: Position::new(line),
            condition,
            then_block,
            else_block,
        }
    }

    pub fn for_loop(
        &mut self,
        line: u32,
        init: Assignment,
        condition: Expression,
        increment: Assignment,
        body: StatementList,
    ) -> ForLoop {
        ForLoop {
            id: self.next_id(),
            position: Position::new(line),
            init: Box::new(init),
            condition,
            increment: Box::new(increment),
            body,
        }
    }

    pub fn break_statement(&mut self, line: u32) -> Break {
        Break {
            id: self.next_id(),
            position: Position::new(line),
        }
    }

    pub fn return_statement(&mut self, line: u32, value: Option<Expression>) -> Return {
        Return {
            id: self.next_id(),
            position: Position::new(line),
            value,
        }
    }
}

impl StatementList {
    pub fn new(statements: Vec<Statement>) -> Self {
        StatementList { statements }
    }

    pub fn empty() -> Self {
        StatementList { statements: Vec::new() }
    }
}
