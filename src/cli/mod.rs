//! Command-Line Driver
//!
//! Flag parsing and mode dispatch. Besides the full compile, the driver
//! exposes the allocator's intermediate products for inspection: `-l` prints
//! liveness sets for a function file, `-i` its interference graph, and `-s`
//! performs a single spill described by a spill file.

use crate::backend::regalloc::{
    analyze_instructions, build_interference_graph, render_liveness, spill,
};
use crate::backend::{allocate_with_backup, apply_assignment, emit_program};
use crate::common::ast;
use crate::common::span::{Span, Spanned};
use crate::frontend::binder::{bind_function_file, bind_program, report_bind_error};
use crate::frontend::lexer::lexer;
use crate::frontend::parser::{function_file_parser, spill_file_parser};
use crate::pipeline::{CompileError, parse_program};
use chumsky::prelude::*;
use std::fs;
use std::process::ExitCode;

pub const USAGE: &str = "Usage: tern [-v] [-g 0|1] [-O 0|1|2] [-s] [-l] [-i] [-p PATH] SOURCE";

/// Configuration for the CLI application
pub struct Config {
    pub file_path: String,
    pub verbose: bool,
    pub opt_level: u32,
    pub codegen: bool,
    pub liveness_only: bool,
    pub interference_only: bool,
    pub spill_only: bool,
    pub parse_tree_output: Option<String>,
}

impl Config {
    /// Parse command line arguments
    pub fn from_args(args: &[String]) -> Result<Self, String> {
        let mut config = Config {
            file_path: String::new(),
            verbose: false,
            opt_level: 3,
            codegen: true,
            liveness_only: false,
            interference_only: false,
            spill_only: false,
            parse_tree_output: None,
        };

        let mut file_path = None;
        let mut iter = args.iter().skip(1);
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "-v" => config.verbose = true,
                "-l" => config.liveness_only = true,
                "-i" => config.interference_only = true,
                "-s" => config.spill_only = true,
                "-O" => {
                    let level = iter.next().ok_or(USAGE)?;
                    config.opt_level = level.parse().map_err(|_| USAGE.to_string())?;
                }
                "-g" => {
                    let flag = iter.next().ok_or(USAGE)?;
                    config.codegen = flag.parse::<u32>().map_err(|_| USAGE.to_string())? != 0;
                }
                "-p" => {
                    let path = iter.next().ok_or(USAGE)?;
                    config.parse_tree_output = Some(path.clone());
                }
                _ if arg.starts_with('-') => return Err(USAGE.to_string()),
                _ => {
                    if file_path.replace(arg.clone()).is_some() {
                        return Err(USAGE.to_string());
                    }
                }
            }
        }

        config.file_path = file_path.ok_or(USAGE)?;
        Ok(config)
    }
}

/// Read the source file from the given path
pub fn read_source_file(file_path: &str) -> Result<String, String> {
    fs::read_to_string(file_path)
        .map_err(|e| format!("Error reading file '{}': {}\n\n{}", file_path, e, USAGE))
}

/// Run the mode selected by the configuration. Returns the process exit
/// code: 0 on success, non-zero on any failure.
pub fn run(config: &Config) -> ExitCode {
    let source = match read_source_file(&config.file_path) {
        Ok(source) => source,
        Err(message) => {
            eprintln!("{}", message);
            return ExitCode::FAILURE;
        }
    };

    if config.spill_only {
        run_spill_only(config, &source)
    } else if config.liveness_only {
        run_liveness_only(config, &source)
    } else if config.interference_only {
        run_interference_only(config, &source)
    } else {
        run_compile(config, &source)
    }
}

fn lex(source: &str) -> Result<Vec<Spanned<ast::Token<'_>>>, String> {
    lexer().parse(source).into_result().map_err(|errors| {
        errors
            .iter()
            .map(|e| format!("{:?}", e))
            .collect::<Vec<_>>()
            .join("\n")
    })
}

fn parse_function_file(source: &str) -> Result<Spanned<ast::Function<'_>>, String> {
    let tokens = lex(source)?;
    let eoi: Span = (source.len()..source.len()).into();
    function_file_parser()
        .parse(tokens.as_slice().map(eoi, |(t, s)| (t, s)))
        .into_result()
        .map_err(|errors| {
            errors
                .iter()
                .map(|e| format!("{:?}", e))
                .collect::<Vec<_>>()
                .join("\n")
        })
}

fn run_liveness_only(config: &Config, source: &str) -> ExitCode {
    let function = match parse_function_file(source) {
        Ok(function) => function,
        Err(message) => {
            eprintln!("Parse errors in {}:\n{}", config.file_path, message);
            return ExitCode::FAILURE;
        }
    };
    let program = match bind_function_file(&function) {
        Ok(program) => program,
        Err(error) => {
            report_bind_error(&config.file_path, source, &error);
            return ExitCode::FAILURE;
        }
    };

    let fun = program.function(program.entry());
    let results = analyze_instructions(&program, fun);
    print!("{}", render_liveness(fun, &results));
    ExitCode::SUCCESS
}

fn run_interference_only(config: &Config, source: &str) -> ExitCode {
    let function = match parse_function_file(source) {
        Ok(function) => function,
        Err(message) => {
            eprintln!("Parse errors in {}:\n{}", config.file_path, message);
            return ExitCode::FAILURE;
        }
    };
    let program = match bind_function_file(&function) {
        Ok(program) => program,
        Err(error) => {
            report_bind_error(&config.file_path, source, &error);
            return ExitCode::FAILURE;
        }
    };

    let fun = program.function(program.entry());
    let results = analyze_instructions(&program, fun);
    let graph = build_interference_graph(fun, &results);
    print!("{}", graph.render());
    ExitCode::SUCCESS
}

fn run_spill_only(config: &Config, source: &str) -> ExitCode {
    let tokens = match lex(source) {
        Ok(tokens) => tokens,
        Err(message) => {
            eprintln!("Lexer errors in {}:\n{}", config.file_path, message);
            return ExitCode::FAILURE;
        }
    };
    let eoi: Span = (source.len()..source.len()).into();
    let request = match spill_file_parser()
        .parse(tokens.as_slice().map(eoi, |(t, s)| (t, s)))
        .into_result()
    {
        Ok(request) => request,
        Err(errors) => {
            let message = errors
                .iter()
                .map(|e| format!("{:?}", e))
                .collect::<Vec<_>>()
                .join("\n");
            eprintln!("Parse errors in {}:\n{}", config.file_path, message);
            return ExitCode::FAILURE;
        }
    };

    let mut program = match bind_function_file(&request.function) {
        Ok(program) => program,
        Err(error) => {
            report_bind_error(&config.file_path, source, &error);
            return ExitCode::FAILURE;
        }
    };

    let id = program.entry();
    let mut fun = program.take_function(id);
    let var = fun.get_or_create_var(request.var.0);
    spill(&mut fun, var, request.prefix);
    program.put_function(id, fun);

    println!("{}", program.render_function(program.function(id)));
    ExitCode::SUCCESS
}

fn run_compile(config: &Config, source: &str) -> ExitCode {
    if config.verbose {
        eprintln!("[1] Parsing {}...", config.file_path);
    }
    let ast = match parse_program(source) {
        Ok(ast) => ast,
        Err(error) => {
            eprintln!("{}", error);
            return ExitCode::FAILURE;
        }
    };

    if let Some(path) = &config.parse_tree_output
        && let Err(e) = fs::write(path, format!("{:#?}\n", ast))
    {
        eprintln!("Error writing parse tree to '{}': {}", path, e);
        return ExitCode::FAILURE;
    }

    if config.verbose {
        eprintln!("[2] Binding...");
    }
    let mut program = match bind_program(&ast) {
        Ok(program) => program,
        Err(error) => {
            report_bind_error(&config.file_path, source, &error);
            return ExitCode::FAILURE;
        }
    };

    if !config.codegen {
        if config.verbose {
            eprintln!("Code generation disabled, stopping after binding");
        }
        return ExitCode::SUCCESS;
    }

    if config.verbose {
        eprintln!("[3] Allocating registers (O{})...", config.opt_level);
    }
    let ids: Vec<_> = program.fun_ids().collect();
    for id in ids {
        let assignment = match allocate_with_backup(&mut program, id) {
            Ok(assignment) => assignment,
            Err(error) => {
                eprintln!("{}", CompileError::AllocError(error));
                return ExitCode::FAILURE;
            }
        };
        apply_assignment(program.function_mut(id), &assignment);
        if config.verbose {
            eprintln!(
                "    @{}: {} spill slot(s)",
                program.function(id).name(),
                program.function(id).spill_slots()
            );
        }
    }

    print!("{}", emit_program(&program));
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("tern")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::from_args(&args(&["prog.il"])).unwrap();
        assert_eq!(config.file_path, "prog.il");
        assert!(config.codegen);
        assert!(!config.verbose);
        assert!(!config.liveness_only);
        assert!(config.parse_tree_output.is_none());
    }

    #[test]
    fn test_config_flags() {
        let config =
            Config::from_args(&args(&["-v", "-g", "0", "-O", "2", "-l", "prog.il"])).unwrap();
        assert!(config.verbose);
        assert!(!config.codegen);
        assert_eq!(config.opt_level, 2);
        assert!(config.liveness_only);
    }

    #[test]
    fn test_config_parse_tree_path() {
        let config = Config::from_args(&args(&["-p", "tree.txt", "prog.il"])).unwrap();
        assert_eq!(config.parse_tree_output.as_deref(), Some("tree.txt"));
    }

    #[test]
    fn test_config_rejects_missing_source() {
        assert!(Config::from_args(&args(&["-v"])).is_err());
    }

    #[test]
    fn test_config_rejects_unknown_flag() {
        assert!(Config::from_args(&args(&["-z", "prog.il"])).is_err());
    }

    #[test]
    fn test_config_rejects_two_sources() {
        assert!(Config::from_args(&args(&["a.il", "b.il"])).is_err());
    }

    #[test]
    fn test_config_rejects_bad_g_value() {
        assert!(Config::from_args(&args(&["-g", "maybe", "prog.il"])).is_err());
    }
}
