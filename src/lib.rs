//! The Brook compiler middle and back end.
//!
//! The front end (a separate collaborator) produces an attributed syntax
//! tree whose names are already bound to [`ast::symbol_table::Symbol`]s.
//! From there, [`compile`] runs the remaining stages:
//!
//! 1. type checking ([`middle::type_check`]) over the structural type
//!    algebra ([`middle::ty`]), collecting diagnostics instead of stopping
//!    at the first problem;
//! 2. lowering ([`middle::ir::ast_lowering`]) to a per-function
//!    control-flow graph of instructions ([`middle::ir`]);
//! 3. code generation ([`backend::x86_64`]) to x86-64 AT&T assembly.
//!
//! A program with any resolution or type diagnostic is rejected before
//! lowering; the back end only ever sees well-typed input.

pub mod ast;
pub mod backend;
pub mod index;
pub mod middle;

use thiserror::Error;

use crate::ast::{DeclarationList, symbol_table::SymbolTable};

#[derive(Debug, Error)]
pub enum CompileError {
    /// The program failed name resolution or type checking. Diagnostics are
    /// in source order: resolution first, then type errors.
    #[error("program rejected:\n{}", .0.join("\n"))]
    Rejected(Vec<String>),
}

/// Compiles a bound program to assembly text, or reports every diagnostic
/// the program produced.
pub fn compile(
    program: &DeclarationList,
    symbols: &SymbolTable,
) -> Result<String, CompileError> {
    let results = middle::type_check::check(program);

    let mut diagnostics = symbols.diagnostics().to_vec();
    diagnostics.extend_from_slice(results.errors());

    if !diagnostics.is_empty() {
        log::debug!("rejecting program with {} diagnostic(s)", diagnostics.len());
        return Err(CompileError::Rejected(diagnostics));
    }

    let lowered = middle::ir::ast_lowering::lower(program);
    Ok(backend::x86_64::emit_assembly(&lowered))
}
