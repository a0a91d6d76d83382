//! The Brook intermediate representation: one control-flow graph of
//! instructions per function, with explicit edges instead of basic blocks.
//!
//! Every instruction owns up to two successor slots. Slot 0 is the
//! fall-through edge; only [`InstKind::Branch`] uses slot 1, for the taken
//! edge. [`InstKind::Return`] is terminal and keeps both slots empty forever.
//! Instructions, value temporaries, and address temporaries live in per-
//! function arenas and are referred to by index everywhere.

pub mod ast_lowering;
pub mod pretty_print;

use crate::{
    ast::symbol_table::Symbol,
    index::{IndexVec, simple_index},
    middle::ty::Type,
};

simple_index! {
    /// Identifies an [`Instruction`] within its function.
    pub struct InstId;
}

simple_index! {
    /// Identifies a value temporary (an abstract register) within its
    /// function.
    pub struct VarId;
}

simple_index! {
    /// Identifies an address temporary within its function. Kept separate
    /// from [`VarId`] so a value can never be used where an address is
    /// required, or vice versa.
    pub struct AddrId;
}

/// The right-hand side of a [`InstKind::Copy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Var(VarId),
    IntConstant(i64),
    BoolConstant(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum BinaryOpKind {
    Add,
    Sub,
    Mul,
    Div,
}

/// Comparison predicates over integers. The display form doubles as the
/// condition-code suffix used by the back end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum Predicate {
    #[strum(serialize = "ge")]
    Ge,
    #[strum(serialize = "g")]
    Gt,
    #[strum(serialize = "le")]
    Le,
    #[strum(serialize = "l")]
    Lt,
    #[strum(serialize = "e")]
    Eq,
    #[strum(serialize = "ne")]
    Ne,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstKind {
    /// Structural placeholder. Carries no semantics; exists so edges always
    /// have somewhere to land.
    Nop,
    Copy {
        dst: VarId,
        src: Operand,
    },
    BinaryOp {
        op: BinaryOpKind,
        dst: VarId,
        lhs: VarId,
        rhs: VarId,
    },
    Compare {
        predicate: Predicate,
        dst: VarId,
        lhs: VarId,
        rhs: VarId,
    },
    UnaryNot {
        dst: VarId,
        src: VarId,
    },
    /// Computes the address of a global, optionally displaced by an index
    /// held in `offset` (scaled by the element size by the back end).
    AddressOf {
        dst: AddrId,
        base: Symbol,
        offset: Option<VarId>,
    },
    Load {
        dst: VarId,
        addr: AddrId,
    },
    Store {
        addr: AddrId,
        src: VarId,
    },
    Call {
        dst: Option<VarId>,
        callee: Symbol,
        args: Vec<VarId>,
    },
    /// Two-way branch on a boolean temporary: slot 1 when true, slot 0 when
    /// false.
    Branch {
        predicate: VarId,
    },
    /// Terminal. Never gains successors; see [`Function::set_next`].
    Return {
        value: Option<VarId>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub kind: InstKind,
    pub next: [Option<InstId>; 2],
}

impl Instruction {
    pub fn successors(&self) -> impl Iterator<Item = InstId> + '_ {
        self.next.iter().flatten().copied()
    }
}

/// A value temporary. Named when it mirrors a source-level local or
/// parameter, anonymous when it holds an intermediate value.
#[derive(Debug, Clone)]
pub struct LocalVar {
    pub ty: Type,
    pub name: Option<String>,
}

/// An address temporary and the type of the value it points at.
#[derive(Debug, Clone)]
pub struct AddressVar {
    pub ty: Type,
}

#[derive(Debug)]
pub struct Function {
    pub name: String,
    pub ty: Type,
    /// Temporaries holding the incoming arguments, in declaration order.
    pub params: Vec<VarId>,
    pub locals: IndexVec<VarId, LocalVar>,
    pub addresses: IndexVec<AddrId, AddressVar>,
    pub instructions: IndexVec<InstId, Instruction>,
    /// The function body starts here; always a [`InstKind::Nop`].
    pub entry: InstId,
}

impl Function {
    pub fn new(name: String, ty: Type) -> Self {
        let mut instructions = IndexVec::default();
        let entry = instructions.push(Instruction {
            kind: InstKind::Nop,
            next: [None, None],
        });

        Self {
            name,
            ty,
            params: Vec::new(),
            locals: IndexVec::default(),
            addresses: IndexVec::default(),
            instructions,
            entry,
        }
    }

    pub fn new_var(&mut self, ty: Type, name: Option<String>) -> VarId {
        self.locals.push(LocalVar { ty, name })
    }

    pub fn new_temp(&mut self, ty: Type) -> VarId {
        self.new_var(ty, None)
    }

    pub fn new_temp_addr(&mut self, ty: Type) -> AddrId {
        self.addresses.push(AddressVar { ty })
    }

    /// Allocates a new, unconnected instruction.
    pub fn new_inst(&mut self, kind: InstKind) -> InstId {
        self.instructions.push(Instruction {
            kind,
            next: [None, None],
        })
    }

    /// Connects `from`'s successor slot to `to`. Connecting out of a
    /// [`InstKind::Return`] is silently ignored: returns are terminal, and
    /// callers building straight-line sequences need not care whether the
    /// previous statement returned.
    pub fn set_next(&mut self, from: InstId, slot: usize, to: InstId) {
        let inst = &mut self.instructions[from];

        if matches!(inst.kind, InstKind::Return { .. }) {
            return;
        }

        debug_assert!(
            inst.next[slot].is_none(),
            "successor slot {slot} of {from:?} wired twice"
        );
        inst.next[slot] = Some(to);
    }
}

/// A global scalar or array and its element count (1 for scalars).
#[derive(Debug)]
pub struct Global {
    pub symbol: Symbol,
    pub element_count: u64,
}

/// A whole lowered program, ready for code generation.
#[derive(Debug, Default)]
pub struct Program {
    pub globals: Vec<Global>,
    pub functions: Vec<Function>,
}
