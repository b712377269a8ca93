//! IL Text Emitter
//!
//! Applies a finished register assignment to a function, replacing every
//! variable operand with its physical register, and prints the resulting
//! program. The output is pure-register IL: the interface a downstream
//! x86-64 emitter consumes.

use crate::backend::regalloc::Assignment;
use crate::il::{Function, Instruction, Program, Value};

fn rewrite_value(value: &mut Value, assignment: &Assignment) {
    match value {
        Value::Variable(var) => *value = Value::Register(assignment[var]),
        Value::Memory { base, .. } => rewrite_value(base, assignment),
        _ => {}
    }
}

fn rewrite_instruction(inst: &mut Instruction, assignment: &Assignment) {
    match inst {
        Instruction::Return | Instruction::Label(_) | Instruction::Goto(_) => {}
        Instruction::Assign { dest, source, .. } => {
            rewrite_value(dest, assignment);
            rewrite_value(source, assignment);
        }
        Instruction::CompareAssign { dest, lhs, rhs, .. } => {
            rewrite_value(dest, assignment);
            rewrite_value(lhs, assignment);
            rewrite_value(rhs, assignment);
        }
        Instruction::CompareJump { lhs, rhs, .. } => {
            rewrite_value(lhs, assignment);
            rewrite_value(rhs, assignment);
        }
        Instruction::Call { callee, .. } => rewrite_value(callee, assignment),
        Instruction::Lea {
            dest, base, offset, ..
        } => {
            rewrite_value(dest, assignment);
            rewrite_value(base, assignment);
            rewrite_value(offset, assignment);
        }
    }
}

/// Replace every variable in the function with its assigned register
pub fn apply_assignment(fun: &mut Function, assignment: &Assignment) {
    for inst in &mut fun.instructions {
        rewrite_instruction(inst, assignment);
    }
}

/// Print the whole program in concrete syntax
pub fn emit_program(program: &Program) -> String {
    program.render()
}
