//! Instruction Parser
//!
//! One parser per instruction form, combined into an ordered choice. Forms
//! sharing a prefix are ordered longest-match first (`w <- t cmp t` before
//! `w <- s`), and the memory-operand variants of the arithmetic updates come
//! before the plain ones.

use super::value::{mem_value, s_value, stack_arg_value, sx_value, t_value, u_value, w_value};
use crate::common::ast::{Instruction, Token, Value};
use crate::common::span::{Span, Spanned};
use crate::il::instr::{AssignOp, CompareOp};
use chumsky::{input::ValueInput, prelude::*};

/// Names callable without a `@` sigil
pub const STD_FUNCTIONS: &[&str] = &["print", "input", "allocate", "tuple-error", "tensor-error"];

// Instruction parser
pub fn instruction_parser<'tokens, 'src: 'tokens, I>()
-> impl Parser<'tokens, I, Spanned<Instruction<'src>>, extra::Err<Rich<'tokens, Token<'src>, Span>>>
+ Clone
where
    I: ValueInput<'tokens, Token = Token<'src>, Span = Span>,
{
    let num = select! { Token::Num(n) => n };
    let arrow = just(Token::Op("<-"));

    let arith_op = select! {
        Token::Op("+=") => AssignOp::Add,
        Token::Op("-=") => AssignOp::Sub,
        Token::Op("*=") => AssignOp::Mul,
        Token::Op("&=") => AssignOp::And,
    };
    let mem_arith_op = select! {
        Token::Op("+=") => AssignOp::Add,
        Token::Op("-=") => AssignOp::Sub,
    };
    let shift_op = select! {
        Token::Op("<<=") => AssignOp::Shl,
        Token::Op(">>=") => AssignOp::Shr,
    };
    let compare_op = select! {
        Token::Op("<") => CompareOp::Lt,
        Token::Op("<=") => CompareOp::Le,
        Token::Op("=") => CompareOp::Eq,
    };

    let label_name = select! { Token::LabelName(name) => name };
    let spanned_label = label_name.map_with(|name, e| (name, e.span()));

    // dest @ base offset scale
    let lea = w_value()
        .then_ignore(just(Token::Op("@")))
        .then(w_value())
        .then(w_value())
        .then(num.try_map(|n, span| {
            if matches!(n, 1 | 2 | 4 | 8) {
                Ok(n)
            } else {
                Err(Rich::custom(span, format!("invalid scale `{}`", n)))
            }
        }))
        .map_with(|(((dest, base), offset), scale), e| {
            (
                Instruction::Lea {
                    dest,
                    base,
                    offset,
                    scale,
                },
                e.span(),
            )
        })
        .labelled("address computation")
        .boxed();

    // dest <- lhs cmp rhs
    let compare_assign = w_value()
        .then_ignore(arrow)
        .then(t_value())
        .then(compare_op)
        .then(t_value())
        .map_with(|(((dest, lhs), op), rhs), e| {
            (Instruction::CompareAssign { dest, lhs, op, rhs }, e.span())
        })
        .labelled("comparison assignment")
        .boxed();

    let simple_assign = |dest, source| Instruction::Assign {
        op: AssignOp::Move,
        dest,
        source,
    };

    // dest <- mem x N
    let mem_read = w_value()
        .then_ignore(arrow)
        .then(mem_value())
        .map_with(move |(dest, source), e| (simple_assign(dest, source), e.span()))
        .boxed();

    // dest <- stack-arg N
    let stack_read = w_value()
        .then_ignore(arrow)
        .then(stack_arg_value())
        .map_with(move |(dest, source), e| (simple_assign(dest, source), e.span()))
        .boxed();

    // dest <- s
    let assign = w_value()
        .then_ignore(arrow)
        .then(s_value())
        .map_with(move |(dest, source), e| (simple_assign(dest, source), e.span()))
        .labelled("assignment")
        .boxed();

    // dest <<= sx | N
    let shift = w_value()
        .then(shift_op)
        .then(sx_value().or(
            select! { Token::Num(n) => Value::Number(n) }.map_with(|value, e| (value, e.span())),
        ))
        .map_with(|((dest, op), source), e| (Instruction::Assign { op, dest, source }, e.span()))
        .labelled("shift")
        .boxed();

    // dest += mem x N (and -=)
    let arith_mem = w_value()
        .then(mem_arith_op)
        .then(mem_value())
        .map_with(|((dest, op), source), e| (Instruction::Assign { op, dest, source }, e.span()))
        .boxed();

    // dest aop t
    let arith = w_value()
        .then(arith_op)
        .then(t_value())
        .map_with(|((dest, op), source), e| (Instruction::Assign { op, dest, source }, e.span()))
        .labelled("arithmetic update")
        .boxed();

    // dest ++ / dest -- desugar to `dest += 1` / `dest -= 1`
    let increment = w_value()
        .then(select! {
            Token::Op("++") => AssignOp::Add,
            Token::Op("--") => AssignOp::Sub,
        })
        .map_with(|(dest, op), e| {
            (
                Instruction::Assign {
                    op,
                    dest,
                    source: (Value::Number(1), e.span()),
                },
                e.span(),
            )
        })
        .boxed();

    // mem x N <- s
    let mem_write = mem_value()
        .then_ignore(arrow)
        .then(s_value())
        .map_with(move |(dest, source), e| (simple_assign(dest, source), e.span()))
        .boxed();

    // mem x N += t (and -=)
    let mem_arith = mem_value()
        .then(mem_arith_op)
        .then(t_value())
        .map_with(|((dest, op), source), e| (Instruction::Assign { op, dest, source }, e.span()))
        .boxed();

    let ret = just(Token::Return)
        .map_with(|_, e| (Instruction::Return, e.span()))
        .boxed();

    // cjump t cmp t :label
    let cjump = just(Token::Cjump)
        .ignore_then(t_value())
        .then(compare_op)
        .then(t_value())
        .then(spanned_label)
        .map_with(|(((lhs, op), rhs), target), e| {
            (
                Instruction::CompareJump {
                    lhs,
                    op,
                    rhs,
                    target,
                },
                e.span(),
            )
        })
        .labelled("conditional jump")
        .boxed();

    let label_def = label_name
        .map_with(|name, e| (Instruction::Label(name), e.span()))
        .boxed();

    let goto = just(Token::Goto)
        .ignore_then(spanned_label)
        .map_with(|target, e| (Instruction::Goto(target), e.span()))
        .boxed();

    // call u N | call STD N
    let external = select! { Token::Ident(name) => name }
        .try_map(|name, span| {
            if STD_FUNCTIONS.contains(&name) {
                Ok(Value::External(name))
            } else {
                Err(Rich::custom(
                    span,
                    format!("unknown external function `{}`", name),
                ))
            }
        })
        .map_with(|value, e| (value, e.span()));
    let call = just(Token::Call)
        .ignore_then(u_value().or(external))
        .then(num)
        .map_with(|(callee, arity), e| (Instruction::Call { callee, arity }, e.span()))
        .labelled("call")
        .boxed();

    choice((
        lea,
        compare_assign,
        mem_read,
        stack_read,
        assign,
        shift,
        arith_mem,
        arith,
        increment,
        mem_write,
        mem_arith,
        ret,
        cjump,
        label_def,
        goto,
        call,
    ))
    .labelled("instruction")
    .boxed()
}
