//! Human-readable rendering of the IR, for logs, tests, and the comment
//! lines the back end threads through its assembly output.

use core::fmt;

use itertools::Itertools;

use crate::{
    index::Index,
    middle::ir::{AddrId, Function, InstKind, Operand, VarId},
};

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%t{}", self.index())
    }
}

impl fmt::Display for AddrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%a{}", self.index())
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Var(var) => write!(f, "{var}"),
            Operand::IntConstant(value) => write!(f, "${value}"),
            Operand::BoolConstant(value) => write!(f, "${value}"),
        }
    }
}

impl fmt::Display for InstKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstKind::Nop => write!(f, "nop"),
            InstKind::Copy { dst, src } => write!(f, "{dst} = copy {src}"),
            InstKind::BinaryOp { op, dst, lhs, rhs } => write!(f, "{dst} = {op} {lhs}, {rhs}"),
            InstKind::Compare {
                predicate,
                dst,
                lhs,
                rhs,
            } => write!(f, "{dst} = cmp {predicate} {lhs}, {rhs}"),
            InstKind::UnaryNot { dst, src } => write!(f, "{dst} = not {src}"),
            InstKind::AddressOf { dst, base, offset } => {
                write!(f, "{dst} = addr {}", base.name())?;
                if let Some(offset) = offset {
                    write!(f, " + {offset}")?;
                }
                Ok(())
            }
            InstKind::Load { dst, addr } => write!(f, "{dst} = load {addr}"),
            InstKind::Store { addr, src } => write!(f, "store {addr}, {src}"),
            InstKind::Call { dst, callee, args } => {
                if let Some(dst) = dst {
                    write!(f, "{dst} = ")?;
                }
                write!(
                    f,
                    "call {}({})",
                    callee.name(),
                    args.iter().map(|arg| arg.to_string()).join(", ")
                )
            }
            InstKind::Branch { predicate } => write!(f, "branch {predicate}"),
            InstKind::Return { value } => {
                write!(f, "return")?;
                if let Some(value) = value {
                    write!(f, " {value}")?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "func {}({}) {{",
            self.name,
            self.params.iter().map(|param| param.to_string()).join(", ")
        )?;
        for (id, inst) in self.instructions.enumerate() {
            let next = inst.successors().map(|n| n.index().to_string()).join(", ");
            writeln!(f, "    {}: {} -> [{next}]", id.index(), inst.kind)?;
        }
        write!(f, "}}")
    }
}
