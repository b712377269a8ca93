//! Liveness Analysis
//!
//! Computes, for every instruction of a function, its control-flow
//! successors and the `GEN`/`KILL`/`IN`/`OUT` sets over variable-like nodes
//! (variables and registers, `rsp` excluded).
//!
//! # Algorithm
//!
//! Backward dataflow to the least fixed point:
//!
//! ```text
//! OUT(i) = ∪ { IN(s) : s ∈ successors(i) }
//! IN(i)  = GEN(i) ∪ (OUT(i) \ KILL(i))
//! ```
//!
//! starting from `IN(i) = GEN(i)`, `OUT(i) = ∅`, iterating instructions in
//! reverse until no set changes. The reverse order is only a convergence
//! optimization; the fixed point is order-independent.

use crate::il::{Function, Instruction, Node, NodeSet, Program, Reg, Value};

/// Per-instruction liveness facts
#[derive(Clone, Debug, Default)]
pub struct InstructionLiveness {
    /// Indices of the instructions control may flow to next
    pub successors: Vec<usize>,
    /// Nodes read by the instruction
    pub gen_set: NodeSet,
    /// Nodes overwritten by the instruction
    pub kill_set: NodeSet,
    /// Nodes live immediately before the instruction
    pub in_set: NodeSet,
    /// Nodes live immediately after the instruction
    pub out_set: NodeSet,
}

fn reg_set(regs: &[Reg]) -> NodeSet {
    regs.iter().map(|reg| Node::Reg(*reg)).collect()
}

/// Nodes read by an instruction. Reads through a write destination
/// (memory-base addressing, read-modify-write updates) count as reads.
pub fn gen_set(inst: &Instruction) -> NodeSet {
    match inst {
        // a return hands back rax and the callee-saved registers
        Instruction::Return => reg_set(Reg::CALLEE_SAVED).update(Node::Reg(Reg::RETURN_REG)),
        Instruction::Assign { op, dest, source } => {
            let mut reads = source.vars_on_read().union(dest.vars_on_write(true));
            if op.reads_destination() {
                reads = reads.union(dest.vars_on_read());
            }
            reads
        }
        Instruction::CompareAssign { lhs, rhs, .. } => {
            lhs.vars_on_read().union(rhs.vars_on_read())
        }
        Instruction::CompareJump { lhs, rhs, .. } => lhs.vars_on_read().union(rhs.vars_on_read()),
        Instruction::Label(_) | Instruction::Goto(_) => NodeSet::new(),
        Instruction::Call { callee, arity } => {
            let args = (*arity).clamp(0, Reg::ARGUMENT.len() as i64) as usize;
            callee.vars_on_read().union(reg_set(&Reg::ARGUMENT[..args]))
        }
        Instruction::Lea {
            dest, base, offset, ..
        } => base
            .vars_on_read()
            .union(offset.vars_on_read())
            .union(dest.vars_on_write(true)),
    }
}

/// Nodes overwritten by an instruction. Strictly-written only: addressing
/// reads belong to [`gen_set`].
pub fn kill_set(inst: &Instruction) -> NodeSet {
    match inst {
        Instruction::Assign { dest, .. }
        | Instruction::CompareAssign { dest, .. }
        | Instruction::Lea { dest, .. } => dest.vars_on_write(false),
        // a call clobbers every caller-saved register
        Instruction::Call { .. } => reg_set(Reg::CALLER_SAVED),
        Instruction::Return
        | Instruction::CompareJump { .. }
        | Instruction::Label(_)
        | Instruction::Goto(_) => NodeSet::new(),
    }
}

/// Analyze a function: successors, GEN/KILL, and the IN/OUT fixed point
pub fn analyze_instructions(program: &Program, fun: &Function) -> Vec<InstructionLiveness> {
    let n = fun.instructions.len();

    // Label targets are located by scanning the current sequence; the
    // spiller renumbers instructions, so indices are never cached
    let label_index: std::collections::HashMap<_, _> = fun
        .instructions
        .iter()
        .enumerate()
        .filter_map(|(i, inst)| match inst {
            Instruction::Label(label) => Some((*label, i)),
            _ => None,
        })
        .collect();

    let mut results: Vec<InstructionLiveness> = fun
        .instructions
        .iter()
        .enumerate()
        .map(|(i, inst)| {
            let next = if i + 1 < n { Some(i + 1) } else { None };
            let successors = match inst {
                Instruction::Return => vec![],
                Instruction::Goto(label) => vec![label_index[label]],
                Instruction::CompareJump { target, .. } => {
                    let mut successors: Vec<usize> = next.into_iter().collect();
                    successors.push(label_index[target]);
                    successors
                }
                Instruction::Call { callee, .. } => {
                    let never_returns = match callee {
                        Value::External(id) => program.external(*id).never_returns,
                        _ => false,
                    };
                    if never_returns {
                        vec![]
                    } else {
                        next.into_iter().collect()
                    }
                }
                _ => next.into_iter().collect(),
            };
            let gen_set = gen_set(inst);
            InstructionLiveness {
                successors,
                in_set: gen_set.clone(),
                gen_set,
                kill_set: kill_set(inst),
                out_set: NodeSet::new(),
            }
        })
        .collect();

    // Iterate to quiescence, in reverse for fewer passes
    let mut changed = true;
    while changed {
        changed = false;
        for i in (0..n).rev() {
            let mut new_out = NodeSet::new();
            for s in results[i].successors.clone() {
                new_out = new_out.union(results[s].in_set.clone());
            }
            if new_out != results[i].out_set {
                changed = true;
                results[i].out_set = new_out;
            }

            let entry = &results[i];
            let new_in = entry.gen_set.clone().union(
                entry
                    .out_set
                    .clone()
                    .relative_complement(entry.kill_set.clone()),
            );
            if new_in != results[i].in_set {
                changed = true;
                results[i].in_set = new_in;
            }
        }
    }

    results
}

/// The `-l` dump: one parenthesized token line per instruction for the IN
/// sets, then the OUT sets, tokens in lexicographic order
pub fn render_liveness(fun: &Function, results: &[InstructionLiveness]) -> String {
    let render_set = |set: &NodeSet| {
        let mut tokens: Vec<String> = set.iter().map(|node| fun.render_node(*node)).collect();
        tokens.sort();
        format!("({})\n", tokens.join(" "))
    };

    let mut output = String::from("(\n(in\n");
    for entry in results {
        output.push_str(&render_set(&entry.in_set));
    }
    output.push_str(")\n\n(out\n");
    for entry in results {
        output.push_str(&render_set(&entry.out_set));
    }
    output.push_str(")\n\n)\n");
    output
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::common::span::Span;
    use crate::frontend::binder::bind_function_file;
    use crate::frontend::lexer::lexer;
    use crate::frontend::parser::function_file_parser;
    use chumsky::prelude::*;

    /// Parse and bind a single-function input
    pub fn bind(src: &str) -> Program {
        let tokens = lexer().parse(src).into_result().unwrap();
        let eoi: Span = (src.len()..src.len()).into();
        let fun = function_file_parser()
            .parse(tokens.as_slice().map(eoi, |(t, s)| (t, s)))
            .into_result()
            .unwrap();
        bind_function_file(&fun).unwrap()
    }

    pub fn node(fun: &Function, name: &str) -> Node {
        match name.strip_prefix('%') {
            Some(var) => Node::Var(fun.lookup_var(var).unwrap()),
            None => Node::Reg(Reg::from_name(name).unwrap()),
        }
    }

    fn set(fun: &Function, names: &[&str]) -> NodeSet {
        names.iter().map(|name| node(fun, name)).collect()
    }

    #[test]
    fn test_return_has_no_successors_and_reads_callee_saved() {
        let program = bind("(@f 0\nreturn\n)");
        let fun = program.function(program.entry());
        let results = analyze_instructions(&program, fun);

        assert!(results[0].successors.is_empty());
        let expected = set(fun, &["rax", "rbx", "rbp", "r12", "r13", "r14", "r15"]);
        assert_eq!(results[0].gen_set, expected);
        assert_eq!(results[0].in_set, expected);
        assert!(results[0].out_set.is_empty());
    }

    #[test]
    fn test_identity_function_liveness() {
        let program = bind("(@id 1\n%x <- rdi\nrax <- %x\nreturn\n)");
        let fun = program.function(program.entry());
        let results = analyze_instructions(&program, fun);

        assert!(results[0].in_set.contains(&node(fun, "rdi")));
        assert!(!results[0].in_set.contains(&node(fun, "%x")));
        assert!(results[1].in_set.contains(&node(fun, "%x")));
        assert_eq!(
            results[2].in_set,
            set(fun, &["rax", "rbx", "rbp", "r12", "r13", "r14", "r15"])
        );
    }

    #[test]
    fn test_read_modify_write_reads_destination() {
        let program = bind("(@f 0\n%x += 1\nrax <- %x\nreturn\n)");
        let fun = program.function(program.entry());
        let results = analyze_instructions(&program, fun);

        // `%x += 1` both reads and writes %x
        assert!(results[0].gen_set.contains(&node(fun, "%x")));
        assert!(results[0].kill_set.contains(&node(fun, "%x")));
    }

    #[test]
    fn test_memory_write_reads_base_kills_nothing() {
        let program = bind("(@f 0\nmem %x 0 <- %y\nreturn\n)");
        let fun = program.function(program.entry());
        let results = analyze_instructions(&program, fun);

        assert_eq!(results[0].gen_set, set(fun, &["%x", "%y"]));
        assert!(results[0].kill_set.is_empty());
    }

    #[test]
    fn test_call_reads_arguments_kills_caller_saved() {
        let program = bind("(@f 0\ncall @f 2\nreturn\n)");
        let fun = program.function(program.entry());
        let results = analyze_instructions(&program, fun);

        assert_eq!(results[0].gen_set, set(fun, &["rdi", "rsi"]));
        assert_eq!(
            results[0].kill_set,
            set(
                fun,
                &["rax", "rdi", "rsi", "rdx", "rcx", "r8", "r9", "r10", "r11"]
            )
        );
        assert_eq!(results[0].successors, vec![1]);
    }

    #[test]
    fn test_call_argument_count_is_capped_at_six() {
        let program = bind("(@f 0\ncall @f 8\nreturn\n)");
        let fun = program.function(program.entry());
        let results = analyze_instructions(&program, fun);
        assert_eq!(
            results[0].gen_set,
            set(fun, &["rdi", "rsi", "rdx", "rcx", "r8", "r9"])
        );
    }

    #[test]
    fn test_never_returning_call_has_no_successors() {
        let program = bind("(@f 0\ncall tensor-error 3\nreturn\n)");
        let fun = program.function(program.entry());
        let results = analyze_instructions(&program, fun);

        assert!(results[0].successors.is_empty());
        // no backflow into the call from the following return
        assert_eq!(results[0].in_set, results[0].gen_set);

        let program = bind("(@f 0\ncall tuple-error 0\nreturn\n)");
        let fun = program.function(program.entry());
        let results = analyze_instructions(&program, fun);
        assert!(results[0].successors.is_empty());
    }

    #[test]
    fn test_compare_assign_kills_only_destination() {
        let program = bind("(@f 0\n%b <- %x < %y\nrax <- %b\nreturn\n)");
        let fun = program.function(program.entry());
        let results = analyze_instructions(&program, fun);

        assert_eq!(results[0].gen_set, set(fun, &["%x", "%y"]));
        assert_eq!(results[0].kill_set, set(fun, &["%b"]));
    }

    #[test]
    fn test_lea_reads_base_and_offset() {
        let program = bind("(@f 0\nrax @ %b %o 4\nreturn\n)");
        let fun = program.function(program.entry());
        let results = analyze_instructions(&program, fun);

        assert_eq!(results[0].gen_set, set(fun, &["%b", "%o"]));
        assert_eq!(results[0].kill_set, set(fun, &["rax"]));
    }

    #[test]
    fn test_call_through_variable_reads_it() {
        let program = bind("(@f 0\n%target <- @f\ncall %target 1\nreturn\n)");
        let fun = program.function(program.entry());
        let results = analyze_instructions(&program, fun);

        assert_eq!(results[1].gen_set, set(fun, &["%target", "rdi"]));
    }

    #[test]
    fn test_goto_jumps_to_label() {
        let program = bind("(@f 0\ngoto :end\n:end\nreturn\n)");
        let fun = program.function(program.entry());
        let results = analyze_instructions(&program, fun);
        assert_eq!(results[0].successors, vec![1]);
        assert_eq!(results[1].successors, vec![2]);
    }

    #[test]
    fn test_loop_liveness_converges() {
        let program = bind("(@f 0\n:top\n%i += 1\ncjump %i < 10 :top\nreturn\n)");
        let fun = program.function(program.entry());
        let results = analyze_instructions(&program, fun);

        // the cjump both falls through and targets the label
        assert_eq!(results[2].successors, vec![3, 0]);

        // %i is live around the whole loop
        let i = node(fun, "%i");
        assert!(results[0].in_set.contains(&i));
        assert!(results[1].in_set.contains(&i));
        assert!(results[2].in_set.contains(&i));
        assert!(results[2].out_set.contains(&i));
    }

    #[test]
    fn test_fixed_point_is_stable() {
        let program = bind("(@f 0\n:top\n%i += 1\ncjump %i < 10 :top\nreturn\n)");
        let fun = program.function(program.entry());
        let results = analyze_instructions(&program, fun);

        // one more application of the equations changes nothing
        for (i, entry) in results.iter().enumerate() {
            let mut out = NodeSet::new();
            for &s in &entry.successors {
                out = out.union(results[s].in_set.clone());
            }
            assert_eq!(out, entry.out_set, "OUT({}) not stable", i);

            let in_set = entry
                .gen_set
                .clone()
                .union(out.relative_complement(entry.kill_set.clone()));
            assert_eq!(in_set, entry.in_set, "IN({}) not stable", i);
        }
    }

    #[test]
    fn test_analysis_is_deterministic() {
        let src = "(@f 0\n:top\n%i += 1\n%j <- %i\ncjump %j < 10 :top\nreturn\n)";
        let program = bind(src);
        let fun = program.function(program.entry());
        let first = analyze_instructions(&program, fun);
        let second = analyze_instructions(&program, fun);
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.in_set, b.in_set);
            assert_eq!(a.out_set, b.out_set);
        }
    }

    #[test]
    fn test_render_liveness_format() {
        let program = bind("(@f 0\nrax <- 1\nreturn\n)");
        let fun = program.function(program.entry());
        let results = analyze_instructions(&program, fun);
        let dump = render_liveness(fun, &results);

        // rax is killed by the assignment, so it drops out of IN(0)
        assert_eq!(
            dump,
            "(\n(in\n(r12 r13 r14 r15 rbp rbx)\n(r12 r13 r14 r15 rax rbp rbx)\n)\n\n\
             (out\n(r12 r13 r14 r15 rax rbp rbx)\n()\n)\n\n)\n"
        );
    }
}
