//! End-to-end runs of the full pipeline: checked tree in, assembly text or
//! diagnostics out.

use brookc::{
    CompileError, compile,
    ast::{
        AstBuilder, Declaration, DeclarationList, Operator, Position, Statement, StatementList,
        symbol_table::SymbolTable,
    },
    middle::ty::Type,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// void main() { printInt(2 + 3 * 4); }
fn arithmetic_program() -> (DeclarationList, SymbolTable) {
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

    (
        DeclarationList {
            declarations: vec![Declaration::Function(function)],
        },
        table,
    )
}

#[test]
fn well_typed_programs_compile_to_assembly() {
    init_logging();
    let (program, table) = arithmetic_program();

    let asm = compile(&program, &table).unwrap();

    assert!(asm.contains(".globl main"));
    assert!(asm.contains("imulq"));
    assert!(asm.contains("call printInt"));
    assert!(asm.ends_with("    ret\n"));
}

#[test]
fn compilation_is_deterministic() {
    init_logging();
    let (program, table) = arithmetic_program();

    let first = compile(&program, &table).unwrap();
    let second = compile(&program, &table).unwrap();
    assert_eq!(first, second);
}

#[test]
fn ill_typed_main_is_rejected_with_the_exact_diagnostic() {
    init_logging();
    // bool main() { return true; }
    let mut table = SymbolTable::new();
    let mut b = AstBuilder::new();

    let main = table.add(Position::new(1), "main", Type::func(vec![], Type::Bool));
    let value = b.literal_bool(1, true);
    let ret = b.return_statement(1, Some(value));
    let function = b.function(
        1,
        main,
        vec![],
        StatementList::new(vec![Statement::Return(ret)]),
    );

    let program = DeclarationList {
        declarations: vec![Declaration::Function(function)],
    };

    let CompileError::Rejected(diagnostics) = compile(&program, &table).unwrap_err();
    assert_eq!(diagnostics, ["TypeError(1)[main must return void]"]);
}

#[test]
fn unresolved_names_reject_the_program_but_checking_still_finishes() {
    init_logging();
    // void main() { foo(); x = 1 + true; }  -- foo was never declared
    let mut table = SymbolTable::new();
    let mut b = AstBuilder::new();

    let main = table.add(Position::new(1), "main", Type::func(vec![], Type::Void));
    let foo = table.lookup(Position::new(2), "foo");
    let x = table.add(Position::new(1), "x", Type::Int);

    let call = b.call(2, foo, vec![]);
    let location = b.var_access(3, x);
    let one = b.literal_int(3, 1);
    let yes = b.literal_bool(3, true);
    let sum = b.binary(3, Operator::Add, one, yes);
    let assignment = b.assignment(3, location, sum);
    let function = b.function(
        1,
        main,
        vec![],
        StatementList::new(vec![
            Statement::Call(call),
            Statement::Assignment(assignment),
        ]),
    );

    let program = DeclarationList {
        declarations: vec![Declaration::Function(function)],
    };

    let CompileError::Rejected(diagnostics) = compile(&program, &table).unwrap_err();

    // Resolution diagnostics come first, then every type error found after
    // the unresolved call
    assert_eq!(diagnostics[0], "ResolveSymbolError(2)[Could not find foo.]");
    assert!(
        diagnostics
            .iter()
            .any(|d| d == "TypeError(3)[cannot add int with bool]")
    );
}

#[test]
fn loops_with_breaks_produce_labeled_branches() {
    init_logging();
    // void main() { let i; for (i = 0; i < 10; i = i + 1) { if (i == 5) { break; } printInt(i); } }
    let mut table = SymbolTable::new();
    let mut b = AstBuilder::new();

    let main = table.add(Position::new(1), "main", Type::func(vec![], Type::Void));
    let print_int = table.lookup(Position::new(5), "printInt");
    table.enter();
    let i = table.add(Position::new(2), "i", Type::Int);

    let init_loc = b.var_access(3, i.clone());
    let zero = b.literal_int(3, 0);
    let init = b.assignment(3, init_loc, zero);

    let cond_i = b.var_access(3, i.clone());
    let ten = b.literal_int(3, 10);
    let condition = b.binary(3, Operator::Less, cond_i, ten);

    let inc_loc = b.var_access(3, i.clone());
    let inc_i = b.var_access(3, i.clone());
    let one = b.literal_int(3, 1);
    let next = b.binary(3, Operator::Add, inc_i, one);
    let increment = b.assignment(3, inc_loc, next);

    let if_i = b.var_access(4, i.clone());
    let five = b.literal_int(4, 5);
    let at_five = b.binary(4, Operator::Equal, if_i, five);
    let brk = b.break_statement(4);
    let maybe_break = b.if_else(
        4,
        at_five,
        StatementList::new(vec![Statement::Break(brk)]),
        StatementList::empty(),
    );

    let arg_i = b.var_access(5, i.clone());
    let print = b.call(5, print_int, vec![arg_i]);

    let i_decl = b.variable_declaration(2, i);
    let body = StatementList::new(vec![Statement::If(maybe_break), Statement::Call(print)]);
    let for_loop = b.for_loop(3, init, condition, increment, body);
    let function = b.function(
        1,
        main,
        vec![],
        StatementList::new(vec![
            Statement::VariableDeclaration(i_decl),
            Statement::For(for_loop),
        ]),
    );
    table.exit();

    let program = DeclarationList {
        declarations: vec![Declaration::Function(function)],
    };

    let asm = compile(&program, &table).unwrap();

    // Two conditional branches and a back edge
    assert_eq!(asm.matches("je L").count(), 2);
    assert!(asm.matches("jmp L").count() >= 1);
    // Exactly one epilogue: the loop exit is shared
    assert_eq!(asm.matches("leave").count(), 1);
}
