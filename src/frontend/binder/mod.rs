//! Binder
//!
//! Turns the parser's concrete-syntax tree into the bound IL model. All name
//! resolution happens here, at construction time: variables materialize on
//! first use, labels and functions may be referenced before their
//! definition, and anything still unresolved when construction finishes is a
//! [`BindError`].

mod error;
mod report;

pub use error::BindError;
pub use report::report_bind_error;

use crate::common::ast;
use crate::common::span::Spanned;
use crate::il::{Function, Instruction, Program, Value};

/// Bind a whole program: register the entry reference, bind every function,
/// then check that no function reference is left dangling
pub fn bind_program(ast: &ast::Program) -> Result<Program, BindError> {
    let mut program = Program::new();

    let (entry_name, entry_span) = ast.entry;
    let entry = program.reference_function(entry_name, entry_span);
    program.set_entry(entry);

    for function in &ast.functions {
        bind_function(&mut program, function)?;
    }

    check_function_refs(&program)?;
    Ok(program)
}

/// Bind a single function as its own program (the entry), for the driver
/// modes that operate on function files. Calls to functions defined
/// elsewhere are left as unresolved references rather than rejected.
pub fn bind_function_file(ast: &Spanned<ast::Function>) -> Result<Program, BindError> {
    let mut program = Program::new();
    let entry = program.reference_function(ast.0.name, ast.1);
    program.set_entry(entry);
    bind_function(&mut program, ast)?;
    Ok(program)
}

fn check_function_refs(program: &Program) -> Result<(), BindError> {
    if let Some((name, span)) = program
        .undefined_functions()
        .next()
        .map(|(name, span)| (name.to_string(), span))
    {
        return Err(BindError::UndefinedFunction { name, span });
    }
    Ok(())
}

fn bind_function(
    program: &mut Program,
    (ast, span): &Spanned<ast::Function>,
) -> Result<(), BindError> {
    let id = program
        .define_function(ast.name)
        .map_err(|_| BindError::DuplicateFunction {
            name: ast.name.to_string(),
            span: *span,
        })?;

    // The function is built outside the arena so instruction binding can
    // resolve `@` references through the program at the same time
    let mut fun = program.take_function(id);
    fun.num_arguments = ast.num_arguments;

    let mut failed = None;
    for instruction in &ast.instructions {
        match bind_instruction(program, &mut fun, instruction) {
            Ok(inst) => fun.instructions.push(inst),
            Err(error) => {
                failed = Some(error);
                break;
            }
        }
    }

    if failed.is_none() {
        if let Some((name, label_span)) = fun
            .undefined_labels()
            .next()
            .map(|(name, span)| (name.to_string(), span))
        {
            failed = Some(BindError::UndefinedLabel {
                function: fun.name().to_string(),
                name,
                span: label_span,
            });
        }
    }

    // Put the function back even on failure so the program stays coherent
    program.put_function(id, fun);
    match failed {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

fn bind_instruction(
    program: &mut Program,
    fun: &mut Function,
    (ast, span): &Spanned<ast::Instruction>,
) -> Result<Instruction, BindError> {
    let inst = match ast {
        ast::Instruction::Return => Instruction::Return,
        ast::Instruction::Assign { op, dest, source } => Instruction::Assign {
            op: *op,
            dest: bind_value(program, fun, dest)?,
            source: bind_value(program, fun, source)?,
        },
        ast::Instruction::CompareAssign { dest, lhs, op, rhs } => Instruction::CompareAssign {
            dest: bind_value(program, fun, dest)?,
            lhs: bind_value(program, fun, lhs)?,
            op: *op,
            rhs: bind_value(program, fun, rhs)?,
        },
        ast::Instruction::CompareJump {
            lhs,
            op,
            rhs,
            target,
        } => Instruction::CompareJump {
            lhs: bind_value(program, fun, lhs)?,
            op: *op,
            rhs: bind_value(program, fun, rhs)?,
            target: fun.reference_label(target.0, target.1),
        },
        ast::Instruction::Label(name) => {
            let label = fun
                .define_label(name)
                .map_err(|_| BindError::DuplicateLabel {
                    function: fun.name().to_string(),
                    name: name.to_string(),
                    span: *span,
                })?;
            Instruction::Label(label)
        }
        ast::Instruction::Goto(target) => {
            Instruction::Goto(fun.reference_label(target.0, target.1))
        }
        ast::Instruction::Call { callee, arity } => Instruction::Call {
            callee: bind_value(program, fun, callee)?,
            arity: *arity,
        },
        ast::Instruction::Lea {
            dest,
            base,
            offset,
            scale,
        } => Instruction::Lea {
            dest: bind_value(program, fun, dest)?,
            base: bind_value(program, fun, base)?,
            offset: bind_value(program, fun, offset)?,
            scale: *scale,
        },
    };
    Ok(inst)
}

fn bind_value(
    program: &mut Program,
    fun: &mut Function,
    (ast, span): &Spanned<ast::Value>,
) -> Result<Value, BindError> {
    let value = match ast {
        ast::Value::Register(reg) => Value::Register(*reg),
        ast::Value::Variable(name) => Value::Variable(fun.get_or_create_var(name)),
        ast::Value::Number(n) => Value::Number(*n),
        ast::Value::Label(name) => Value::Label(fun.reference_label(name, *span)),
        ast::Value::Function(name) => {
            Value::IlFunction(program.reference_function(name, *span))
        }
        ast::Value::External(name) => {
            let id = program
                .lookup_external(name)
                .ok_or_else(|| BindError::UnknownExternal {
                    name: name.to_string(),
                    span: *span,
                })?;
            Value::External(id)
        }
        ast::Value::StackArg(slot) => Value::StackArg(*slot),
        ast::Value::Memory { base, offset } => Value::Memory {
            base: Box::new(bind_value(program, fun, base)?),
            offset: *offset,
        },
    };
    Ok(value)
}
