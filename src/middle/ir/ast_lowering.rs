//! Lowering from the attributed tree to the IR graph.
//!
//! Each tree node lowers to a small chain of instructions described by an
//! [`InstPair`]: the first and last instruction of the chain. Compound nodes
//! lower their children recursively and splice the resulting pairs together,
//! so the whole function body is built in one post-order walk with no
//! separate patching pass.
//!
//! Control flow falls out of the splicing rules. Short-circuit booleans and
//! `if`/`else` route both arms into a shared merge [`InstKind::Nop`]; loops
//! wire the body back to the condition entry and keep the current loop's exit
//! on a stack for `break` to target. A `break` hands back a fresh,
//! unconnected end instruction, which quietly strands whatever the enclosing
//! sequence splices after it.

use hashbrown::HashMap;

use crate::{
    ast::{
        Assignment, Break, CallExpression, Declaration, DeclarationList, Expression, ForLoop,
        FunctionDefinition, IfElseBranch, Operator, Return, Statement, StatementList,
        symbol_table::Symbol,
    },
    middle::{
        ir::{
            BinaryOpKind, Function, Global, InstId, InstKind, Operand, Predicate, Program, VarId,
        },
        ty::Type,
    },
};

/// Lowers a checked program. Top-level scalar and array declarations become
/// [`Global`]s; function definitions become instruction graphs.
pub fn lower(program: &DeclarationList) -> Program {
    let mut lowered = Program::default();

    for declaration in &program.declarations {
        match declaration {
            Declaration::Variable(decl) => lowered.globals.push(Global {
                symbol: decl.symbol.clone(),
                element_count: 1,
            }),
            Declaration::Array(decl) => {
                let element_count = match decl.symbol.ty() {
                    Type::Array { extent, .. } => extent,
                    _ => 1,
                };
                lowered.globals.push(Global {
                    symbol: decl.symbol.clone(),
                    element_count,
                });
            }
            Declaration::Function(function) => {
                lowered.functions.push(FunctionLowerer::run(function));
            }
        }
    }

    lowered
}

/// The first and last instruction of a lowered subtree. Splicing `a` before
/// `b` means wiring `a.end`'s fall-through edge to `b.start`.
#[derive(Debug, Clone, Copy)]
struct InstPair {
    start: InstId,
    end: InstId,
}

impl InstPair {
    fn single(inst: InstId) -> Self {
        Self {
            start: inst,
            end: inst,
        }
    }
}

struct FunctionLowerer {
    function: Function,
    /// Source locals and parameters to their backing temporaries. Symbols
    /// absent from this map are globals and go through memory.
    locals: HashMap<Symbol, VarId>,
    /// Exit instructions of the enclosing loops, innermost last.
    loop_exits: Vec<InstId>,
}

impl FunctionLowerer {
    fn run(definition: &FunctionDefinition) -> Function {
        let name = definition.symbol.name().to_owned();
        log::debug!("lowering function {name}");

        let mut lowerer = FunctionLowerer {
            function: Function::new(name, definition.symbol.ty()),
            locals: HashMap::new(),
            loop_exits: Vec::new(),
        };

        for parameter in &definition.parameters {
            let var = lowerer
                .function
                .new_var(parameter.ty(), Some(parameter.name().to_owned()));
            lowerer.function.params.push(var);
            lowerer.locals.insert(parameter.clone(), var);
        }

        let entry = InstPair::single(lowerer.function.entry);
        let body = lowerer.lower_statement_list(&definition.body);
        lowerer.splice(entry, body);

        debug_assert!(lowerer.loop_exits.is_empty());
        lowerer.function
    }

    /// Wires `a`'s fall-through edge into `b` and returns the combined pair.
    fn splice(&mut self, a: InstPair, b: InstPair) -> InstPair {
        self.function.set_next(a.end, 0, b.start);
        InstPair {
            start: a.start,
            end: b.end,
        }
    }

    fn nop(&mut self) -> InstId {
        self.function.new_inst(InstKind::Nop)
    }

    fn lower_statement_list(&mut self, list: &StatementList) -> InstPair {
        let mut chain = InstPair::single(self.nop());

        for statement in &list.statements {
            let lowered = self.lower_statement(statement);
            chain = self.splice(chain, lowered);
        }

        chain
    }

    fn lower_statement(&mut self, statement: &Statement) -> InstPair {
        match statement {
            Statement::VariableDeclaration(decl) => {
                // Allocates the backing temporary; no instructions result
                let var = self
                    .function
                    .new_var(decl.symbol.ty(), Some(decl.symbol.name().to_owned()));
                self.locals.insert(decl.symbol.clone(), var);
                InstPair::single(self.nop())
            }
            Statement::Assignment(assignment) => self.lower_assignment(assignment),
            Statement::Call(call) => self.lower_call(call).0,
            Statement::If(branch) => self.lower_if(branch),
            Statement::For(for_loop) => self.lower_for(for_loop),
            Statement::Break(brk) => self.lower_break(brk),
            Statement::Return(ret) => self.lower_return(ret),
        }
    }

    fn lower_assignment(&mut self, assignment: &Assignment) -> InstPair {
        match &assignment.location {
            Expression::VarAccess(access) => {
                if let Some(&dst) = self.locals.get(&access.symbol) {
                    let (value, src) = self.lower_expression(&assignment.value);
                    let copy = InstPair::single(self.function.new_inst(InstKind::Copy {
                        dst,
                        src: Operand::Var(src),
                    }));
                    self.splice(value, copy)
                } else {
                    let addr = self
                        .function
                        .new_temp_addr(access.symbol.ty());
                    let address_of = InstPair::single(self.function.new_inst(InstKind::AddressOf {
                        dst: addr,
                        base: access.symbol.clone(),
                        offset: None,
                    }));
                    let (value, src) = self.lower_expression(&assignment.value);
                    let store = InstPair::single(
                        self.function.new_inst(InstKind::Store { addr, src }),
                    );
                    let chain = self.splice(address_of, value);
                    self.splice(chain, store)
                }
            }
            Expression::ArrayAccess(access) => {
                let element_ty = access
                    .base
                    .ty()
                    .array_base()
                    .cloned()
                    .unwrap_or(Type::Int);
                let (index, offset) = self.lower_expression(&access.index);
                let addr = self.function.new_temp_addr(element_ty);
                let address_of = InstPair::single(self.function.new_inst(InstKind::AddressOf {
                    dst: addr,
                    base: access.base.clone(),
                    offset: Some(offset),
                }));
                let (value, src) = self.lower_expression(&assignment.value);
                let store =
                    InstPair::single(self.function.new_inst(InstKind::Store { addr, src }));
                let chain = self.splice(index, address_of);
                let chain = self.splice(chain, value);
                self.splice(chain, store)
            }
            // Non-place locations are rejected before lowering runs
            _ => unreachable!("assignment to a non-place expression"),
        }
    }

    fn lower_if(&mut self, branch: &IfElseBranch) -> InstPair {
        let (condition, predicate) = self.lower_expression(&branch.condition);
        let branch_inst = self.function.new_inst(InstKind::Branch { predicate });
        self.function.set_next(condition.end, 0, branch_inst);

        let then_block = self.lower_statement_list(&branch.then_block);
        let else_block = self.lower_statement_list(&branch.else_block);
        let merge = self.nop();

        self.function.set_next(branch_inst, 1, then_block.start);
        self.function.set_next(branch_inst, 0, else_block.start);
        self.function.set_next(then_block.end, 0, merge);
        self.function.set_next(else_block.end, 0, merge);

        InstPair {
            start: condition.start,
            end: merge,
        }
    }

    fn lower_for(&mut self, for_loop: &ForLoop) -> InstPair {
        let exit = self.nop();
        self.loop_exits.push(exit);

        let init = self.lower_assignment(&for_loop.init);
        let (condition, predicate) = self.lower_expression(&for_loop.condition);
        let branch_inst = self.function.new_inst(InstKind::Branch { predicate });
        self.function.set_next(condition.end, 0, branch_inst);

        let body = self.lower_statement_list(&for_loop.body);
        let increment = self.lower_assignment(&for_loop.increment);

        self.function.set_next(init.end, 0, condition.start);
        self.function.set_next(branch_inst, 1, body.start);
        self.function.set_next(branch_inst, 0, exit);
        self.function.set_next(body.end, 0, increment.start);
        self.function.set_next(increment.end, 0, condition.start);

        self.loop_exits.pop();

        InstPair {
            start: init.start,
            end: exit,
        }
    }

    fn lower_break(&mut self, _brk: &Break) -> InstPair {
        let exit = *self
            .loop_exits
            .last()
            .expect("break outside of a loop survived checking");

        let jump = self.nop();
        self.function.set_next(jump, 0, exit);

        // The end is a fresh island: anything spliced after the break becomes
        // unreachable instead of rejoining the loop
        InstPair {
            start: jump,
            end: self.nop(),
        }
    }

    fn lower_return(&mut self, ret: &Return) -> InstPair {
        match &ret.value {
            Some(expression) => {
                let (value, var) = self.lower_expression(expression);
                let return_inst = InstPair::single(
                    self.function
                        .new_inst(InstKind::Return { value: Some(var) }),
                );
                self.splice(value, return_inst)
            }
            None => InstPair::single(self.function.new_inst(InstKind::Return { value: None })),
        }
    }

    /// Lowers an expression, yielding its chain and the temporary holding its
    /// value.
    fn lower_expression(&mut self, expression: &Expression) -> (InstPair, VarId) {
        match expression {
            Expression::LiteralInt(lit) => {
                let dst = self.function.new_temp(Type::Int);
                let copy = self.function.new_inst(InstKind::Copy {
                    dst,
                    src: Operand::IntConstant(lit.value),
                });
                (InstPair::single(copy), dst)
            }
            Expression::LiteralBool(lit) => {
                let dst = self.function.new_temp(Type::Bool);
                let copy = self.function.new_inst(InstKind::Copy {
                    dst,
                    src: Operand::BoolConstant(lit.value),
                });
                (InstPair::single(copy), dst)
            }
            Expression::VarAccess(access) => {
                if let Some(&var) = self.locals.get(&access.symbol) {
                    (InstPair::single(self.nop()), var)
                } else {
                    let ty = access.symbol.ty();
                    let addr = self.function.new_temp_addr(ty.clone());
                    let address_of = InstPair::single(self.function.new_inst(
                        InstKind::AddressOf {
                            dst: addr,
                            base: access.symbol.clone(),
                            offset: None,
                        },
                    ));
                    let dst = self.function.new_temp(ty);
                    let load =
                        InstPair::single(self.function.new_inst(InstKind::Load { dst, addr }));
                    (self.splice(address_of, load), dst)
                }
            }
            Expression::ArrayAccess(access) => {
                let element_ty = access
                    .base
                    .ty()
                    .array_base()
                    .cloned()
                    .unwrap_or(Type::Int);
                let (index, offset) = self.lower_expression(&access.index);
                let addr = self.function.new_temp_addr(element_ty.clone());
                let address_of = InstPair::single(self.function.new_inst(InstKind::AddressOf {
                    dst: addr,
                    base: access.base.clone(),
                    offset: Some(offset),
                }));
                let dst = self.function.new_temp(element_ty);
                let load = InstPair::single(self.function.new_inst(InstKind::Load { dst, addr }));
                let chain = self.splice(index, address_of);
                (self.splice(chain, load), dst)
            }
            Expression::Op(op) => self.lower_op(op),
            Expression::Call(call) => {
                let (pair, value) = self.lower_call(call);
                (pair, value.expect("value use of a void call survived checking"))
            }
        }
    }

    fn lower_op(&mut self, op: &crate::ast::OpExpr) -> (InstPair, VarId) {
        match op.op {
            Operator::Add | Operator::Sub | Operator::Mul | Operator::Div => {
                let kind = match op.op {
                    Operator::Add => BinaryOpKind::Add,
                    Operator::Sub => BinaryOpKind::Sub,
                    Operator::Mul => BinaryOpKind::Mul,
                    Operator::Div => BinaryOpKind::Div,
                    _ => unreachable!(),
                };
                let (lhs, lhs_var) = self.lower_expression(&op.lhs);
                let (rhs, rhs_var) = self.lower_expression(op.rhs.as_deref().unwrap());
                let dst = self.function.new_temp(Type::Int);
                let inst = InstPair::single(self.function.new_inst(InstKind::BinaryOp {
                    op: kind,
                    dst,
                    lhs: lhs_var,
                    rhs: rhs_var,
                }));
                let chain = self.splice(lhs, rhs);
                (self.splice(chain, inst), dst)
            }
            Operator::GreaterEqual
            | Operator::Greater
            | Operator::LessEqual
            | Operator::Less
            | Operator::Equal
            | Operator::NotEqual => {
                let predicate = match op.op {
                    Operator::GreaterEqual => Predicate::Ge,
                    Operator::Greater => Predicate::Gt,
                    Operator::LessEqual => Predicate::Le,
                    Operator::Less => Predicate::Lt,
                    Operator::Equal => Predicate::Eq,
                    Operator::NotEqual => Predicate::Ne,
                    _ => unreachable!(),
                };
                let (lhs, lhs_var) = self.lower_expression(&op.lhs);
                let (rhs, rhs_var) = self.lower_expression(op.rhs.as_deref().unwrap());
                let dst = self.function.new_temp(Type::Bool);
                let inst = InstPair::single(self.function.new_inst(InstKind::Compare {
                    predicate,
                    dst,
                    lhs: lhs_var,
                    rhs: rhs_var,
                }));
                let chain = self.splice(lhs, rhs);
                (self.splice(chain, inst), dst)
            }
            Operator::LogicalAnd | Operator::LogicalOr => self.lower_short_circuit(op),
            Operator::LogicalNot => {
                let (operand, src) = self.lower_expression(&op.lhs);
                let dst = self.function.new_temp(Type::Bool);
                let inst =
                    InstPair::single(self.function.new_inst(InstKind::UnaryNot { dst, src }));
                (self.splice(operand, inst), dst)
            }
        }
    }

    /// `&&` and `||` evaluate the right operand only when the left one does
    /// not already decide the result. Both routes copy into a shared result
    /// temporary and meet at a merge nop.
    fn lower_short_circuit(&mut self, op: &crate::ast::OpExpr) -> (InstPair, VarId) {
        let dst = self.function.new_temp(Type::Bool);

        let (lhs, lhs_var) = self.lower_expression(&op.lhs);
        let branch_inst = self.function.new_inst(InstKind::Branch {
            predicate: lhs_var,
        });
        self.function.set_next(lhs.end, 0, branch_inst);

        let (rhs, rhs_var) = self.lower_expression(op.rhs.as_deref().unwrap());
        let copy_rhs = self.function.new_inst(InstKind::Copy {
            dst,
            src: Operand::Var(rhs_var),
        });
        let copy_lhs = self.function.new_inst(InstKind::Copy {
            dst,
            src: Operand::Var(lhs_var),
        });
        let merge = self.nop();

        // For `&&` a true left operand continues to the right; for `||` a
        // false one does
        let (continue_slot, decided_slot) = match op.op {
            Operator::LogicalAnd => (1, 0),
            Operator::LogicalOr => (0, 1),
            _ => unreachable!(),
        };
        self.function.set_next(branch_inst, continue_slot, rhs.start);
        self.function.set_next(branch_inst, decided_slot, copy_lhs);
        self.function.set_next(rhs.end, 0, copy_rhs);
        self.function.set_next(copy_rhs, 0, merge);
        self.function.set_next(copy_lhs, 0, merge);

        (
            InstPair {
                start: lhs.start,
                end: merge,
            },
            dst,
        )
    }

    /// Lowers a call in either statement or expression position. Arguments
    /// are evaluated left to right; the chain starts at the first argument,
    /// or at the call itself when there are none.
    fn lower_call(&mut self, call: &CallExpression) -> (InstPair, Option<VarId>) {
        let mut chain: Option<InstPair> = None;
        let mut args = Vec::with_capacity(call.arguments.len());

        for argument in &call.arguments {
            let (lowered, var) = self.lower_expression(argument);
            args.push(var);
            chain = Some(match chain {
                Some(chain) => self.splice(chain, lowered),
                None => lowered,
            });
        }

        let dst = match call.callee.ty().func_ret() {
            Some(ret) if !ret.is_void() => Some(self.function.new_temp(ret.clone())),
            _ => None,
        };

        let call_inst = InstPair::single(self.function.new_inst(InstKind::Call {
            dst,
            callee: call.callee.clone(),
            args,
        }));

        let pair = match chain {
            Some(chain) => self.splice(chain, call_inst),
            None => call_inst,
        };
        (pair, dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ast::{AstBuilder, Position, symbol_table::SymbolTable},
        middle::ir::Instruction,
    };

    /// Follows fall-through edges from the entry, collecting instruction
    /// kinds.
    fn straight_line(function: &Function) -> Vec<&InstKind> {
        let mut kinds = Vec::new();
        let mut cursor = Some(function.entry);
        while let Some(id) = cursor {
            let inst = &function.instructions[id];
            kinds.push(&inst.kind);
            cursor = inst.next[0];
        }
        kinds
    }

    fn reachable(function: &Function) -> Vec<InstId> {
        let mut seen = vec![function.entry];
        let mut queue = vec![function.entry];
        while let Some(id) = queue.pop() {
            for next in function.instructions[id].successors() {
                if !seen.contains(&next) {
                    seen.push(next);
                    queue.push(next);
                }
            }
        }
        seen
    }

    #[test]
    fn arithmetic_feeds_a_builtin_call() {
        // void main() { printInt(2 + 3 * 4); }
        let mut table = SymbolTable::new();
        let mut b = AstBuilder::new();

        let main = table.add(Position::new(1), "main", Type::func(vec![], Type::Void));
        let print_int = table.lookup(Position::new(2), "printInt");

        let three = b.literal_int(2, 3);
        let four = b.literal_int(2, 4);
        let product = b.binary(2, Operator::Mul, three, four);
        let two = b.literal_int(2, 2);
        let sum = b.binary(2, Operator::Add, two, product);
        let call = b.call(2, print_int, vec![sum]);
        let function = b.function(
            1,
            main,
            vec![],
            StatementList::new(vec![Statement::Call(call)]),
        );

        let program = lower(&DeclarationList {
            declarations: vec![Declaration::Function(function)],
        });
        let [function] = &program.functions[..] else {
            panic!("expected exactly one function");
        };

        let line = straight_line(function);
        let kinds: Vec<String> = line.iter().map(|kind| kind.to_string()).collect();
        assert_eq!(
            kinds,
            [
                "nop",                     // function entry
                "nop",                     // statement list entry
                "%t0 = copy $2",
                "%t1 = copy $3",
                "%t2 = copy $4",
                "%t3 = mul %t1, %t2",      // operands first, operator after
                "%t4 = add %t0, %t3",
                "call printInt(%t4)",
            ]
        );
    }

    #[test]
    fn break_jumps_to_the_shared_loop_exit_and_strands_the_rest() {
        // void main() { for (i = 0; i < 10; i = i + 1) { break; printInt(i); } }
        let mut table = SymbolTable::new();
        let mut b = AstBuilder::new();

        let main = table.add(Position::new(1), "main", Type::func(vec![], Type::Void));
        let print_int = table.lookup(Position::new(4), "printInt");
        table.enter();
        let i = table.add(Position::new(2), "i", Type::Int);

        let i_init = b.var_access(2, i.clone());
        let zero = b.literal_int(2, 0);
        let init = b.assignment(2, i_init, zero);

        let i_cond = b.var_access(2, i.clone());
        let ten = b.literal_int(2, 10);
        let condition = b.binary(2, Operator::Less, i_cond, ten);

        let i_inc_loc = b.var_access(2, i.clone());
        let i_inc = b.var_access(2, i.clone());
        let one = b.literal_int(2, 1);
        let next = b.binary(2, Operator::Add, i_inc, one);
        let increment = b.assignment(2, i_inc_loc, next);

        let brk = b.break_statement(3);
        let i_arg = b.var_access(4, i.clone());
        let dead_call = b.call(4, print_int, vec![i_arg]);
        let body = StatementList::new(vec![
            Statement::Break(brk),
            Statement::Call(dead_call),
        ]);

        let i_decl = b.variable_declaration(2, i);
        let loop_stmt = b.for_loop(2, init, condition, increment, body);
        let function = b.function(
            1,
            main,
            vec![],
            StatementList::new(vec![
                Statement::VariableDeclaration(i_decl),
                Statement::For(loop_stmt),
            ]),
        );
        table.exit();

        let program = lower(&DeclarationList {
            declarations: vec![Declaration::Function(function)],
        });
        let function = &program.functions[0];

        // Exactly one branch; its false edge and the break's jump both land
        // on the same loop exit
        let branches: Vec<&Instruction> = function
            .instructions
            .iter()
            .filter(|inst| matches!(inst.kind, InstKind::Branch { .. }))
            .collect();
        let [branch] = branches[..] else {
            panic!("expected exactly one branch");
        };
        let exit = branch.next[0].unwrap();

        let jumps_to_exit = function
            .instructions
            .enumerate()
            .filter(|(id, inst)| {
                matches!(inst.kind, InstKind::Nop)
                    && inst.next[0] == Some(exit)
                    && *id != exit
            })
            .count();
        assert_eq!(jumps_to_exit, 1, "break should share the loop exit");

        // The call after the break is stranded
        let reachable = reachable(function);
        let dead = function
            .instructions
            .enumerate()
            .find(|(_, inst)| matches!(inst.kind, InstKind::Call { .. }))
            .unwrap()
            .0;
        assert!(!reachable.contains(&dead));
    }

    #[test]
    fn logical_and_evaluates_the_right_operand_only_when_taken() {
        // Lower `a && b` for bool locals a, b
        let mut table = SymbolTable::new();
        let mut b = AstBuilder::new();

        let main = table.add(Position::new(1), "main", Type::func(vec![], Type::Void));
        table.enter();
        let a_sym = table.add(Position::new(2), "a", Type::Bool);
        let b_sym = table.add(Position::new(2), "b", Type::Bool);

        let a_decl = b.variable_declaration(2, a_sym.clone());
        let b_decl = b.variable_declaration(2, b_sym.clone());
        let lhs = b.var_access(3, a_sym.clone());
        let rhs = b.var_access(3, b_sym);
        let both = b.binary(3, Operator::LogicalAnd, lhs, rhs);
        let location = b.var_access(3, a_sym);
        let assignment = b.assignment(3, location, both);
        let function = b.function(
            1,
            main,
            vec![],
            StatementList::new(vec![
                Statement::VariableDeclaration(a_decl),
                Statement::VariableDeclaration(b_decl),
                Statement::Assignment(assignment),
            ]),
        );
        table.exit();

        let program = lower(&DeclarationList {
            declarations: vec![Declaration::Function(function)],
        });
        let function = &program.functions[0];

        let branch = function
            .instructions
            .iter()
            .find(|inst| matches!(inst.kind, InstKind::Branch { .. }))
            .unwrap();
        let taken = branch.next[1].unwrap();
        let fallthrough = branch.next[0].unwrap();

        // The not-taken edge copies the left operand straight into the result
        assert!(matches!(
            function.instructions[fallthrough].kind,
            InstKind::Copy {
                src: Operand::Var(_),
                ..
            }
        ));

        // Both routes meet at the same merge nop
        let mut cursor = taken;
        while !matches!(function.instructions[cursor].kind, InstKind::Copy { .. }) {
            cursor = function.instructions[cursor].next[0].unwrap();
        }
        assert_eq!(
            function.instructions[cursor].next[0],
            function.instructions[fallthrough].next[0]
        );
    }

    #[test]
    fn logical_or_evaluates_the_right_operand_only_when_false() {
        // Lower `a || b` for bool locals a, b: the mirror image of `&&`,
        // with the right operand hanging off the not-taken edge
        let mut table = SymbolTable::new();
        let mut b = AstBuilder::new();

        let main = table.add(Position::new(1), "main", Type::func(vec![], Type::Void));
        table.enter();
        let a_sym = table.add(Position::new(2), "a", Type::Bool);
        let b_sym = table.add(Position::new(2), "b", Type::Bool);

        let a_decl = b.variable_declaration(2, a_sym.clone());
        let b_decl = b.variable_declaration(2, b_sym.clone());
        let lhs = b.var_access(3, a_sym.clone());
        let rhs = b.var_access(3, b_sym);
        let either = b.binary(3, Operator::LogicalOr, lhs, rhs);
        let location = b.var_access(3, a_sym);
        let assignment = b.assignment(3, location, either);
        let function = b.function(
            1,
            main,
            vec![],
            StatementList::new(vec![
                Statement::VariableDeclaration(a_decl),
                Statement::VariableDeclaration(b_decl),
                Statement::Assignment(assignment),
            ]),
        );
        table.exit();

        let program = lower(&DeclarationList {
            declarations: vec![Declaration::Function(function)],
        });
        let function = &program.functions[0];

        let branch = function
            .instructions
            .iter()
            .find(|inst| matches!(inst.kind, InstKind::Branch { .. }))
            .unwrap();
        let taken = branch.next[1].unwrap();
        let fallthrough = branch.next[0].unwrap();

        // A true left operand short-circuits: the taken edge copies it
        // straight into the result
        assert!(matches!(
            function.instructions[taken].kind,
            InstKind::Copy {
                src: Operand::Var(_),
                ..
            }
        ));

        // The not-taken edge evaluates the right operand, then meets the
        // short-circuit copy at the same merge nop
        let mut cursor = fallthrough;
        while !matches!(function.instructions[cursor].kind, InstKind::Copy { .. }) {
            cursor = function.instructions[cursor].next[0].unwrap();
        }
        assert_ne!(cursor, taken);
        assert_eq!(
            function.instructions[cursor].next[0],
            function.instructions[taken].next[0]
        );
    }

    #[test]
    fn lowered_graphs_are_fully_wired() {
        // void f(int n) { if (n < 0) { return; } printInt(n); }
        let mut table = SymbolTable::new();
        let mut b = AstBuilder::new();

        let f = table.add(
            Position::new(1),
            "f",
            Type::func(vec![Type::Int], Type::Void),
        );
        let print_int = table.lookup(Position::new(3), "printInt");
        table.enter();
        let n = table.add(Position::new(1), "n", Type::Int);

        let n_access = b.var_access(2, n.clone());
        let zero = b.literal_int(2, 0);
        let negative = b.binary(2, Operator::Less, n_access, zero);
        let ret = b.return_statement(2, None);
        let branch = b.if_else(
            2,
            negative,
            StatementList::new(vec![Statement::Return(ret)]),
            StatementList::empty(),
        );
        let n_arg = b.var_access(3, n.clone());
        let call = b.call(3, print_int, vec![n_arg]);
        let function = b.function(
            1,
            f,
            vec![n],
            StatementList::new(vec![Statement::If(branch), Statement::Call(call)]),
        );
        table.exit();

        let program = lower(&DeclarationList {
            declarations: vec![Declaration::Function(function)],
        });
        let function = &program.functions[0];

        for id in reachable(function) {
            let inst = &function.instructions[id];
            match &inst.kind {
                InstKind::Branch { .. } => {
                    assert!(inst.next[0].is_some() && inst.next[1].is_some());
                }
                InstKind::Return { .. } => {
                    assert!(inst.next[0].is_none() && inst.next[1].is_none());
                }
                _ => assert!(inst.next[1].is_none()),
            }
        }

        // One parameter temporary, named after the source parameter
        assert_eq!(function.params.len(), 1);
        let param = &function.locals[function.params[0]];
        assert_eq!(param.name.as_deref(), Some("n"));
    }
}
