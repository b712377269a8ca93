//! Compiler Pipeline
//!
//! End-to-end compilation from IL source text to register-allocated IL.
//!
//! # Pipeline Stages
//!
//! ```text
//! Source Code (&str)
//!     │
//!     ▼ lexer
//! Tokens (Vec<Spanned<Token>>)
//!     │
//!     ▼ parser
//! AST (ast::Program)
//!     │
//!     ▼ binder
//! Bound IL (il::Program)
//!     │
//!     ▼ register allocation (per function)
//! Pure-register IL (il::Program)
//!     │
//!     ▼ emit
//! Output (String)
//! ```

use crate::backend::{AllocError, allocate_with_backup, apply_assignment, emit_program};
use crate::common::ast;
use crate::frontend::binder::{BindError, bind_program, report_bind_error};
use crate::frontend::lexer::lexer;
use crate::frontend::parser::program_parser;
use crate::il::Program;
use chumsky::prelude::*;
use std::fmt;

/// Compilation error types
#[derive(Debug)]
pub enum CompileError {
    /// Lexer errors (tokenization failed)
    LexError(String),
    /// Parser errors (syntax errors)
    ParseError(String),
    /// Binder errors (unresolved or duplicate names)
    BindError(BindError),
    /// Register allocation failed
    AllocError(AllocError),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::LexError(msg) => write!(f, "Lexer error: {}", msg),
            CompileError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            CompileError::BindError(e) => write!(f, "Binding error: {}", e),
            CompileError::AllocError(e) => write!(f, "Allocation error: {}", e),
        }
    }
}

/// Result of a successful compilation
#[derive(Debug, Clone)]
pub struct CompileOutput {
    /// The register-allocated program as IL text
    pub il: String,
}

/// Lex and parse a program
pub fn parse_program(source: &str) -> Result<ast::Program<'_>, CompileError> {
    let tokens = lexer().parse(source).into_result().map_err(|errors| {
        CompileError::LexError(
            errors
                .iter()
                .map(|e| format!("{:?}", e))
                .collect::<Vec<_>>()
                .join("\n"),
        )
    })?;

    let eoi = (source.len()..source.len()).into();
    let token_stream = tokens.as_slice().map(eoi, |(t, s)| (t, s));
    program_parser()
        .parse(token_stream)
        .into_result()
        .map_err(|errors| {
            CompileError::ParseError(
                errors
                    .iter()
                    .map(|e| format!("{:?}", e))
                    .collect::<Vec<_>>()
                    .join("\n"),
            )
        })
}

/// Allocate registers for every function of a bound program and rewrite the
/// instructions to use them
pub fn allocate_program(program: &mut Program) -> Result<(), CompileError> {
    let ids: Vec<_> = program.fun_ids().collect();
    for id in ids {
        let assignment =
            allocate_with_backup(program, id).map_err(CompileError::AllocError)?;
        apply_assignment(program.function_mut(id), &assignment);
    }
    Ok(())
}

/// Compile IL source to register-allocated IL text
///
/// This is the main entry point for the compiler pipeline.
///
/// # Arguments
///
/// * `source` - The IL source code to compile
///
/// # Returns
///
/// * `Ok(CompileOutput)` - Successful compilation with pure-register IL
/// * `Err(CompileError)` - Compilation failed at some stage
pub fn compile(source: &str) -> Result<CompileOutput, CompileError> {
    // Stage 1+2: Lexical analysis and parsing
    let ast = parse_program(source)?;

    // Stage 3: Binding
    let mut program = bind_program(&ast).map_err(CompileError::BindError)?;

    // Stage 4: Register allocation
    allocate_program(&mut program)?;

    // Stage 5: Emit text
    Ok(CompileOutput {
        il: emit_program(&program),
    })
}

/// Compile source code and report errors with source context
///
/// Convenience wrapper that prints pretty error messages when compilation
/// fails.
#[allow(clippy::result_unit_err)]
pub fn compile_and_report(filename: &str, source: &str) -> Result<String, ()> {
    match compile(source) {
        Ok(output) => Ok(output.il),
        Err(CompileError::LexError(msg)) => {
            eprintln!("Lexer errors in {}:\n{}", filename, msg);
            Err(())
        }
        Err(CompileError::ParseError(msg)) => {
            eprintln!("Parse errors in {}:\n{}", filename, msg);
            Err(())
        }
        Err(CompileError::BindError(e)) => {
            report_bind_error(filename, source, &e);
            Err(())
        }
        Err(error @ CompileError::AllocError(_)) => {
            eprintln!("{} in {}", error, filename);
            Err(())
        }
    }
}
