use crate::common::ast::Token;
use crate::common::span::{Span, Spanned};
use crate::il::regs::Reg;
use chumsky::prelude::*;

// Lexer
//
// Line breaks separate instructions, so newlines are emitted as tokens
// rather than skipped; everything else between tokens (spaces, tabs,
// carriage returns, // comments) is padding.
pub fn lexer<'src>()
-> impl Parser<'src, &'src str, Vec<Spanned<Token<'src>>>, extra::Err<Rich<'src, char, Span>>> {
    // A parser for identifier words (C-identifier rules)
    let word = any()
        .filter(|c: &char| c.is_ascii_alphabetic() || *c == '_')
        .then(
            any()
                .filter(|c: &char| c.is_ascii_alphanumeric() || *c == '_')
                .repeated(),
        );

    // A parser for numbers, with an optional sign
    let num = one_of("+-")
        .or_not()
        .then(text::int(10))
        .to_slice()
        .from_str()
        .unwrapped()
        .map(Token::Num);

    // Sigil-prefixed names
    let var = just('%')
        .ignore_then(word.clone().to_slice())
        .map(Token::Var);
    let label = just(':')
        .ignore_then(word.clone().to_slice())
        .map(Token::LabelName);
    let fun = just('@')
        .ignore_then(word.clone().to_slice())
        .map(Token::FunName);

    // A parser for operators; longest first so `<<=` wins over `<-`/`<=`/`<`
    let op = choice((
        just("<<="),
        just(">>="),
        just("<-"),
        just("<="),
        just("+="),
        just("-="),
        just("*="),
        just("&="),
        just("++"),
        just("--"),
        just("<"),
        just("="),
        just("@"),
    ))
    .map(Token::Op);

    // A parser for control characters
    let ctrl = one_of("()").map(Token::Ctrl);

    // Bare words: keywords, register names, or external function names.
    // Hyphenated continuations make `stack-arg`, `tuple-error`, and
    // `tensor-error` single words.
    let ident = word
        .clone()
        .then(just('-').then(word).repeated())
        .to_slice()
        .map(|ident: &str| match ident {
            "return" => Token::Return,
            "mem" => Token::Mem,
            "stack-arg" => Token::StackArg,
            "goto" => Token::Goto,
            "cjump" => Token::Cjump,
            "call" => Token::Call,
            _ => match Reg::from_name(ident) {
                Some(reg) => Token::Reg(reg),
                None => Token::Ident(ident),
            },
        });

    let newline = just('\n').to(Token::Newline);

    let token = choice((var, label, fun, num, op, ctrl, ident, newline));

    let comment = just("//").then(any().and_is(just('\n').not()).repeated());
    let padding = one_of(" \t\r").ignored().or(comment.ignored()).repeated();

    token
        .map_with(|tok, e| (tok, e.span()))
        .padded_by(padding)
        // If we encounter an error, skip and attempt to lex the next character as a token instead
        .recover_with(skip_then_retry_until(any().ignored(), end()))
        .repeated()
        .collect()
}
