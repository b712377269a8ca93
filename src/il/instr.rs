//! IL Instructions
//!
//! The instruction set of the three-address IL, as one tagged sum. Each pass
//! over instructions (liveness contribution, spill rewriting, rendering) is a
//! single `match` on the tag.

use super::function::{LabelId, VarId};
use super::value::Value;

/// Operators of the assignment instruction. `Move` is a plain copy; the rest
/// are read-modify-write updates of the destination.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssignOp {
    Move,
    Add,
    Sub,
    Mul,
    And,
    Shl,
    Shr,
}

impl AssignOp {
    /// Concrete-syntax token for this operator
    pub fn token(self) -> &'static str {
        match self {
            AssignOp::Move => "<-",
            AssignOp::Add => "+=",
            AssignOp::Sub => "-=",
            AssignOp::Mul => "*=",
            AssignOp::And => "&=",
            AssignOp::Shl => "<<=",
            AssignOp::Shr => ">>=",
        }
    }

    /// Whether the destination is read as well as written
    pub fn reads_destination(self) -> bool {
        !matches!(self, AssignOp::Move)
    }

    /// Whether this is a shift, whose runtime count must live in `rcx`
    pub fn is_shift(self) -> bool {
        matches!(self, AssignOp::Shl | AssignOp::Shr)
    }
}

/// Comparison operators
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Lt,
    Le,
    Eq,
}

impl CompareOp {
    pub fn token(self) -> &'static str {
        match self {
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Eq => "=",
        }
    }
}

/// One IL instruction
#[derive(Clone, Debug, PartialEq)]
pub enum Instruction {
    /// Return to the caller
    Return,
    /// `dest op source`: copy or read-modify-write update
    Assign {
        op: AssignOp,
        dest: Value,
        source: Value,
    },
    /// `dest <- lhs cmp rhs`: store the comparison result as 0 or 1
    CompareAssign {
        dest: Value,
        lhs: Value,
        op: CompareOp,
        rhs: Value,
    },
    /// `cjump lhs cmp rhs :target`: branch when the comparison holds
    CompareJump {
        lhs: Value,
        op: CompareOp,
        rhs: Value,
        target: LabelId,
    },
    /// `:name`: a jump target
    Label(LabelId),
    /// `goto :target`
    Goto(LabelId),
    /// `call callee arity`
    Call { callee: Value, arity: i64 },
    /// `dest @ base offset scale`: address arithmetic
    /// `dest <- base + offset * scale`
    Lea {
        dest: Value,
        base: Value,
        offset: Value,
        scale: i64,
    },
}

impl Instruction {
    /// Rewrite every occurrence of the variable `from` in this instruction's
    /// operands to `to`
    pub fn replace_var(&mut self, from: VarId, to: VarId) {
        match self {
            Instruction::Return | Instruction::Label(_) | Instruction::Goto(_) => {}
            Instruction::Assign { dest, source, .. } => {
                dest.replace_var(from, to);
                source.replace_var(from, to);
            }
            Instruction::CompareAssign { dest, lhs, rhs, .. } => {
                dest.replace_var(from, to);
                lhs.replace_var(from, to);
                rhs.replace_var(from, to);
            }
            Instruction::CompareJump { lhs, rhs, .. } => {
                lhs.replace_var(from, to);
                rhs.replace_var(from, to);
            }
            Instruction::Call { callee, .. } => callee.replace_var(from, to),
            Instruction::Lea {
                dest, base, offset, ..
            } => {
                dest.replace_var(from, to);
                base.replace_var(from, to);
                offset.replace_var(from, to);
            }
        }
    }
}
