//! Operand Parsers
//!
//! The IL grammar restricts which operand kinds may appear in each
//! instruction position. The sorts form a ladder:
//!
//! ```text
//! sx := rcx | %var                  (shift counts)
//! a  := sx | rdi rsi rdx r8 r9     (argument registers)
//! w  := a | rax                     (writable)
//! x  := w | rsp                     (addressable)
//! t  := x | N                       (comparable)
//! s  := t | :label | @fn            (assignable)
//! u  := x | @fn                     (callable)
//! ```

use crate::common::ast::{Token, Value};
use crate::common::span::{Span, Spanned};
use crate::il::regs::Reg;
use chumsky::{input::ValueInput, prelude::*};

/// A register drawn from a fixed allowed set
fn reg_in<'tokens, 'src: 'tokens, I>(
    allowed: &'static [Reg],
) -> impl Parser<'tokens, I, Spanned<Value<'src>>, extra::Err<Rich<'tokens, Token<'src>, Span>>> + Clone
where
    I: ValueInput<'tokens, Token = Token<'src>, Span = Span>,
{
    select! { Token::Reg(reg) => reg }
        .try_map(move |reg, span| {
            if allowed.contains(&reg) {
                Ok(Value::Register(reg))
            } else {
                Err(Rich::custom(
                    span,
                    format!("register `{}` is not allowed in this position", reg),
                ))
            }
        })
        .map_with(|value, e| (value, e.span()))
}

fn variable<'tokens, 'src: 'tokens, I>()
-> impl Parser<'tokens, I, Spanned<Value<'src>>, extra::Err<Rich<'tokens, Token<'src>, Span>>> + Clone
where
    I: ValueInput<'tokens, Token = Token<'src>, Span = Span>,
{
    select! { Token::Var(name) => Value::Variable(name) }.map_with(|value, e| (value, e.span()))
}

/// `sx`: a shift count, either `rcx` or a variable
pub fn sx_value<'tokens, 'src: 'tokens, I>()
-> impl Parser<'tokens, I, Spanned<Value<'src>>, extra::Err<Rich<'tokens, Token<'src>, Span>>> + Clone
where
    I: ValueInput<'tokens, Token = Token<'src>, Span = Span>,
{
    reg_in(&[Reg::Rcx]).or(variable())
}

/// `a`: `sx` plus the remaining argument registers
pub fn a_value<'tokens, 'src: 'tokens, I>()
-> impl Parser<'tokens, I, Spanned<Value<'src>>, extra::Err<Rich<'tokens, Token<'src>, Span>>> + Clone
where
    I: ValueInput<'tokens, Token = Token<'src>, Span = Span>,
{
    sx_value().or(reg_in(&[Reg::Rdi, Reg::Rsi, Reg::Rdx, Reg::R8, Reg::R9]))
}

/// `w`: `a` plus `rax` (the writable registers)
pub fn w_value<'tokens, 'src: 'tokens, I>()
-> impl Parser<'tokens, I, Spanned<Value<'src>>, extra::Err<Rich<'tokens, Token<'src>, Span>>> + Clone
where
    I: ValueInput<'tokens, Token = Token<'src>, Span = Span>,
{
    a_value().or(reg_in(&[Reg::Rax]))
}

/// `x`: `w` plus the stack pointer (addressable)
pub fn x_value<'tokens, 'src: 'tokens, I>()
-> impl Parser<'tokens, I, Spanned<Value<'src>>, extra::Err<Rich<'tokens, Token<'src>, Span>>> + Clone
where
    I: ValueInput<'tokens, Token = Token<'src>, Span = Span>,
{
    w_value().or(reg_in(&[Reg::Rsp]))
}

/// `t`: `x` or an integer literal
pub fn t_value<'tokens, 'src: 'tokens, I>()
-> impl Parser<'tokens, I, Spanned<Value<'src>>, extra::Err<Rich<'tokens, Token<'src>, Span>>> + Clone
where
    I: ValueInput<'tokens, Token = Token<'src>, Span = Span>,
{
    x_value().or(select! { Token::Num(n) => Value::Number(n) }.map_with(|value, e| (value, e.span())))
}

/// `s`: `t`, a label, or a function name
pub fn s_value<'tokens, 'src: 'tokens, I>()
-> impl Parser<'tokens, I, Spanned<Value<'src>>, extra::Err<Rich<'tokens, Token<'src>, Span>>> + Clone
where
    I: ValueInput<'tokens, Token = Token<'src>, Span = Span>,
{
    t_value().or(select! {
        Token::LabelName(name) => Value::Label(name),
        Token::FunName(name) => Value::Function(name),
    }
    .map_with(|value, e| (value, e.span())))
}

/// `u`: a callable, either `x` or a function name
pub fn u_value<'tokens, 'src: 'tokens, I>()
-> impl Parser<'tokens, I, Spanned<Value<'src>>, extra::Err<Rich<'tokens, Token<'src>, Span>>> + Clone
where
    I: ValueInput<'tokens, Token = Token<'src>, Span = Span>,
{
    x_value()
        .or(select! { Token::FunName(name) => Value::Function(name) }
            .map_with(|value, e| (value, e.span())))
}

/// `mem x N`: a memory location
pub fn mem_value<'tokens, 'src: 'tokens, I>()
-> impl Parser<'tokens, I, Spanned<Value<'src>>, extra::Err<Rich<'tokens, Token<'src>, Span>>> + Clone
where
    I: ValueInput<'tokens, Token = Token<'src>, Span = Span>,
{
    just(Token::Mem)
        .ignore_then(x_value())
        .then(select! { Token::Num(n) => n })
        .map_with(|(base, offset), e| {
            (
                Value::Memory {
                    base: Box::new(base),
                    offset,
                },
                e.span(),
            )
        })
}

/// `stack-arg N`: an incoming stack-argument slot
pub fn stack_arg_value<'tokens, 'src: 'tokens, I>()
-> impl Parser<'tokens, I, Spanned<Value<'src>>, extra::Err<Rich<'tokens, Token<'src>, Span>>> + Clone
where
    I: ValueInput<'tokens, Token = Token<'src>, Span = Span>,
{
    just(Token::StackArg)
        .ignore_then(select! { Token::Num(n) => n })
        .map_with(|slot, e| (Value::StackArg(slot), e.span()))
}
