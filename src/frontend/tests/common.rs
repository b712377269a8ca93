use crate::common::ast::{Instruction, Program, Token, Value};
use crate::common::span::{Span, Spanned};
use crate::frontend::lexer::lexer;
use crate::frontend::parser::{instruction_parser, program_parser};
use chumsky::prelude::*;

pub fn parse_tokens(src: &'_ str) -> Vec<Spanned<Token<'_>>> {
    lexer().parse(src).into_result().unwrap()
}

pub fn try_parse_instruction(src: &'_ str) -> Result<Instruction<'_>, ()> {
    let tokens = parse_tokens(src);
    let eoi: Span = (src.len()..src.len()).into();
    instruction_parser()
        .parse(tokens.as_slice().map(eoi, |(t, s)| (t, s)))
        .into_result()
        .map(|(inst, _)| inst)
        .map_err(|_| ())
}

pub fn parse_instruction(src: &'_ str) -> Instruction<'_> {
    try_parse_instruction(src).unwrap_or_else(|_| panic!("failed to parse `{}`", src))
}

pub fn try_parse_program(src: &'_ str) -> Result<Program<'_>, ()> {
    let tokens = parse_tokens(src);
    let eoi: Span = (src.len()..src.len()).into();
    program_parser()
        .parse(tokens.as_slice().map(eoi, |(t, s)| (t, s)))
        .into_result()
        .map_err(|_| ())
}

pub fn parse_program(src: &'_ str) -> Program<'_> {
    try_parse_program(src).unwrap_or_else(|_| panic!("failed to parse program:\n{}", src))
}

/// Strip spans so instruction shapes can be compared structurally
pub fn value_of<'a>(spanned: &'a Spanned<Value<'a>>) -> &'a Value<'a> {
    &spanned.0
}
