//! Source spans shared between the lexer, parsers, and diagnostics.

use chumsky::span::SimpleSpan;

/// A byte range into the source text
pub type Span = SimpleSpan<usize>;

/// A value paired with the span it was parsed from
pub type Spanned<T> = (T, Span);
