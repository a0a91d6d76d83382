//! x86-64 System V code generation, in AT&T syntax.
//!
//! Every temporary lives in a dedicated 8-byte stack slot; instructions move
//! values through the scratch registers `%r10` and `%r11` and never keep
//! anything live across an instruction boundary. The graph is linearized by
//! depth-first walk: the fall-through successor is emitted directly after its
//! predecessor whenever it has not been emitted yet, so explicit `jmp`s only
//! appear on edges that close a diamond or a loop.

use core::fmt::Write;

use hashbrown::{HashMap, HashSet};

use crate::{
    index::Index,
    middle::ir::{AddrId, BinaryOpKind, Function, InstId, InstKind, Operand, Program, VarId},
};

const ARG_REGS: &[&str] = &["rdi", "rsi", "rdx", "rcx", "r8", "r9"];

/// Emits the whole program: one `.comm` block per global, then one text
/// fragment per function. Label numbering is shared across functions.
pub fn emit_assembly(program: &Program) -> String {
    let mut output = String::new();
    let mut label_counter = 0u32;

    for global in &program.globals {
        // 8 bytes per element, 8-byte aligned
        writeln!(
            &mut output,
            ".comm {}, {}, 8",
            global.symbol.name(),
            8 * global.element_count
        )
        .unwrap();
    }

    for function in &program.functions {
        if !output.is_empty() {
            output.push('\n');
        }
        output.push_str(&codegen_function(function, &mut label_counter));
    }

    output
}

fn codegen_function(function: &Function, label_counter: &mut u32) -> String {
    let mut output = String::new();

    macro_rules! emit {
        ($($arg:tt)*) => {
            writeln!(&mut output, $($arg)*).unwrap();
        };
    }

    log::debug!("generating code for function {}", function.name);

    // Value temporaries occupy the low slots, address temporaries follow
    let num_locals = function.locals.len();
    let var_offset = |var: VarId| -8 * (var.index() as i64 + 1);
    let addr_offset = |addr: AddrId| -8 * ((num_locals + addr.index()) as i64 + 1);

    // Frame slots, padded so %rsp stays 16-byte aligned after `enter`
    let mut frame_slots = num_locals + function.addresses.len();
    if frame_slots % 2 != 0 {
        frame_slots += 1;
    }

    let labels = assign_labels(function, label_counter);

    emit!(".globl {}", function.name);
    emit!("{}:", function.name);
    emit!("    enter $(8 * {frame_slots}), $0");

    for (i, &param) in function.params.iter().enumerate() {
        if i < ARG_REGS.len() {
            emit!("    movq %{}, {}(%rbp)", ARG_REGS[i], var_offset(param));
        } else {
            // Spilled arguments sit above the saved %rbp and return address
            let incoming = 16 + 8 * (i - ARG_REGS.len()) as i64;
            emit!("    movq {incoming}(%rbp), %r10");
            emit!("    movq %r10, {}(%rbp)", var_offset(param));
        }
    }

    let mut visited: HashSet<InstId> = HashSet::new();
    let mut stack = vec![function.entry];

    while let Some(id) = stack.pop() {
        if !visited.insert(id) {
            continue;
        }

        let inst = &function.instructions[id];

        if let Some(label) = labels.get(&id) {
            emit!("{label}:");
        }
        emit!("    /* {} */", inst.kind);

        match &inst.kind {
            InstKind::Nop => {}
            InstKind::Copy { dst, src } => match src {
                Operand::Var(src) => {
                    emit!("    movq {}(%rbp), %r10", var_offset(*src));
                    emit!("    movq %r10, {}(%rbp)", var_offset(*dst));
                }
                Operand::IntConstant(value) => {
                    emit!("    movq ${value}, %r10");
                    emit!("    movq %r10, {}(%rbp)", var_offset(*dst));
                }
                Operand::BoolConstant(value) => {
                    emit!("    movq ${}, {}(%rbp)", *value as i64, var_offset(*dst));
                }
            },
            InstKind::BinaryOp { op, dst, lhs, rhs } => match op {
                BinaryOpKind::Add | BinaryOpKind::Sub | BinaryOpKind::Mul => {
                    let mnemonic = match op {
                        BinaryOpKind::Add => "addq",
                        BinaryOpKind::Sub => "subq",
                        BinaryOpKind::Mul => "imulq",
                        BinaryOpKind::Div => unreachable!(),
                    };
                    emit!("    movq {}(%rbp), %r10", var_offset(*lhs));
                    emit!("    {mnemonic} {}(%rbp), %r10", var_offset(*rhs));
                    emit!("    movq %r10, {}(%rbp)", var_offset(*dst));
                }
                BinaryOpKind::Div => {
                    // Sign-extend the dividend into %rdx:%rax
                    emit!("    movq {}(%rbp), %rax", var_offset(*lhs));
                    emit!("    cqto");
                    emit!("    idivq {}(%rbp)", var_offset(*rhs));
                    emit!("    movq %rax, {}(%rbp)", var_offset(*dst));
                }
            },
            InstKind::Compare {
                predicate,
                dst,
                lhs,
                rhs,
            } => {
                emit!("    movq $0, %rax");
                emit!("    movq $1, %r10");
                emit!("    movq {}(%rbp), %r11", var_offset(*lhs));
                emit!("    cmpq {}(%rbp), %r11", var_offset(*rhs));
                emit!("    cmov{predicate} %r10, %rax");
                emit!("    movq %rax, {}(%rbp)", var_offset(*dst));
            }
            InstKind::UnaryNot { dst, src } => {
                emit!("    movq {}(%rbp), %r10", var_offset(*src));
                emit!("    xorq $1, %r10");
                emit!("    movq %r10, {}(%rbp)", var_offset(*dst));
            }
            InstKind::AddressOf { dst, base, offset } => {
                emit!("    movq {}@GOTPCREL(%rip), %r11", base.name());
                if let Some(offset) = offset {
                    emit!("    movq {}(%rbp), %r10", var_offset(*offset));
                    emit!("    imulq $8, %r10");
                    emit!("    addq %r10, %r11");
                }
                emit!("    movq %r11, {}(%rbp)", addr_offset(*dst));
            }
            InstKind::Load { dst, addr } => {
                emit!("    movq {}(%rbp), %r10", addr_offset(*addr));
                emit!("    movq 0(%r10), %r11");
                emit!("    movq %r11, {}(%rbp)", var_offset(*dst));
            }
            InstKind::Store { addr, src } => {
                emit!("    movq {}(%rbp), %r10", addr_offset(*addr));
                emit!("    movq {}(%rbp), %r11", var_offset(*src));
                emit!("    movq %r11, 0(%r10)");
            }
            InstKind::Call { dst, callee, args } => {
                for (i, &arg) in args.iter().take(ARG_REGS.len()).enumerate() {
                    emit!("    movq {}(%rbp), %{}", var_offset(arg), ARG_REGS[i]);
                }

                // Overflow arguments go in a reserved region below %rsp,
                // padded to keep the call 16-byte aligned
                let overflow = args.len().saturating_sub(ARG_REGS.len());
                let mut reserved_slots = overflow;
                if reserved_slots % 2 != 0 {
                    reserved_slots += 1;
                }
                if overflow > 0 {
                    emit!("    subq ${}, %rsp", 8 * reserved_slots);
                    for (i, &arg) in args.iter().enumerate().skip(ARG_REGS.len()) {
                        emit!("    movq {}(%rbp), %r10", var_offset(arg));
                        emit!("    movq %r10, {}(%rsp)", 8 * (i - ARG_REGS.len()));
                    }
                }

                emit!("    call {}", callee.name());

                if overflow > 0 {
                    emit!("    addq ${}, %rsp", 8 * reserved_slots);
                }
                if let Some(dst) = dst {
                    emit!("    movq %rax, {}(%rbp)", var_offset(*dst));
                }
            }
            InstKind::Branch { predicate } => {
                emit!("    movq {}(%rbp), %r10", var_offset(*predicate));
                emit!("    cmpq $1, %r10");
                emit!("    je {}", labels[&inst.next[1].unwrap()]);
            }
            InstKind::Return { value } => {
                if let Some(value) = value {
                    emit!("    movq {}(%rbp), %rax", var_offset(*value));
                }
            }
        }

        if let InstKind::Branch { .. } = inst.kind {
            stack.push(inst.next[1].unwrap());
        }

        match inst.next[0] {
            Some(next) if visited.contains(&next) => {
                emit!("    jmp {}", labels[&next]);
            }
            // Pushed last, so it is popped next and falls through
            Some(next) => stack.push(next),
            None => {
                emit!("    leave");
                emit!("    ret");
            }
        }
    }

    output
}

/// A label is needed wherever control arrives other than by falling through:
/// the taken target of every branch, and any instruction with more than one
/// predecessor. Numbered in instruction order so output is deterministic.
fn assign_labels(function: &Function, label_counter: &mut u32) -> HashMap<InstId, String> {
    let mut predecessors = vec![0u32; function.instructions.len()];
    let mut branch_targets: HashSet<InstId> = HashSet::new();

    for inst in function.instructions.iter() {
        for next in inst.successors() {
            predecessors[next.index()] += 1;
        }
        if let InstKind::Branch { .. } = inst.kind {
            branch_targets.insert(inst.next[1].unwrap());
        }
    }

    let mut labels = HashMap::new();
    for id in function.instructions.indices() {
        if branch_targets.contains(&id) || predecessors[id.index()] > 1 {
            *label_counter += 1;
            labels.insert(id, format!("L{label_counter}"));
        }
    }
    labels
}
