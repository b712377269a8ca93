//! Function, Program, and Spill-File Parsers
//!
//! A program is `( @entry FUNCTION+ )`; a function is
//! `( @name N INSTRUCTION+ )` with one instruction per line. The spill-only
//! driver mode reads a function followed by the variable to spill and the
//! replacement-name prefix.

use super::instr::instruction_parser;
use crate::common::ast::{Function, Program, SpillRequest, Token};
use crate::common::span::{Span, Spanned};
use chumsky::{input::ValueInput, prelude::*};

// Function parser
pub fn function_parser<'tokens, 'src: 'tokens, I>()
-> impl Parser<'tokens, I, Spanned<Function<'src>>, extra::Err<Rich<'tokens, Token<'src>, Span>>>
+ Clone
where
    I: ValueInput<'tokens, Token = Token<'src>, Span = Span>,
{
    let newlines = just(Token::Newline).repeated();
    let line_break = just(Token::Newline).repeated().at_least(1);

    just(Token::Ctrl('('))
        .ignore_then(newlines.clone())
        .ignore_then(select! { Token::FunName(name) => name })
        .then(select! { Token::Num(n) => n })
        .then_ignore(line_break.clone())
        .then(
            instruction_parser()
                .separated_by(line_break)
                .at_least(1)
                .allow_trailing()
                .collect::<Vec<_>>(),
        )
        .then_ignore(just(Token::Ctrl(')')))
        .map_with(|((name, num_arguments), instructions), e| {
            (
                Function {
                    name,
                    num_arguments,
                    instructions,
                },
                e.span(),
            )
        })
        .labelled("function")
        .boxed()
}

// Program parser
pub fn program_parser<'tokens, 'src: 'tokens, I>()
-> impl Parser<'tokens, I, Program<'src>, extra::Err<Rich<'tokens, Token<'src>, Span>>>
where
    I: ValueInput<'tokens, Token = Token<'src>, Span = Span>,
{
    let newlines = just(Token::Newline).repeated();

    newlines
        .clone()
        .ignore_then(just(Token::Ctrl('(')))
        .ignore_then(newlines.clone())
        .ignore_then(select! { Token::FunName(name) => name }.map_with(|name, e| (name, e.span())))
        .then_ignore(newlines.clone())
        .then(
            function_parser()
                .then_ignore(newlines.clone())
                .repeated()
                .at_least(1)
                .collect::<Vec<_>>(),
        )
        .then_ignore(just(Token::Ctrl(')')))
        .then_ignore(newlines)
        .then_ignore(end())
        .map(|(entry, functions)| Program { entry, functions })
        .labelled("program")
        .boxed()
}

/// A single-function input, as consumed by the liveness and interference
/// driver modes
pub fn function_file_parser<'tokens, 'src: 'tokens, I>()
-> impl Parser<'tokens, I, Spanned<Function<'src>>, extra::Err<Rich<'tokens, Token<'src>, Span>>>
where
    I: ValueInput<'tokens, Token = Token<'src>, Span = Span>,
{
    let newlines = just(Token::Newline).repeated();

    newlines
        .clone()
        .ignore_then(function_parser())
        .then_ignore(newlines)
        .then_ignore(end())
        .boxed()
}

/// A spill-file input: a function, the `%var` to spill, and the `%prefix`
/// for the replacement temporaries
pub fn spill_file_parser<'tokens, 'src: 'tokens, I>()
-> impl Parser<'tokens, I, SpillRequest<'src>, extra::Err<Rich<'tokens, Token<'src>, Span>>>
where
    I: ValueInput<'tokens, Token = Token<'src>, Span = Span>,
{
    let newlines = just(Token::Newline).repeated();

    newlines
        .clone()
        .ignore_then(function_parser())
        .then_ignore(newlines.clone())
        .then(select! { Token::Var(name) => name }.map_with(|name, e| (name, e.span())))
        .then_ignore(newlines.clone())
        .then(select! { Token::Var(name) => name })
        .then_ignore(newlines)
        .then_ignore(end())
        .map(|((function, var), prefix)| SpillRequest {
            function,
            var,
            prefix,
        })
        .labelled("spill file")
        .boxed()
}
