//! Spilling
//!
//! Demotes a variable to a dedicated stack slot. Every instruction that
//! touches the victim gets a fresh single-use temporary in its place, a load
//! from the slot before it if the victim was read, and a store back after it
//! if the victim was written. The temporaries are marked non-spillable so
//! the allocator can never pick them again.

use super::liveness::{gen_set, kill_set};
use crate::il::{AssignOp, Function, Instruction, Node, Reg, Value, VarId};

/// The shortest `stem<i>` that is not a prefix of any variable name in the
/// function, so the `stem<i><n>` temporaries cannot collide either
pub fn fresh_prefix(fun: &Function, stem: &str) -> String {
    let mut i = 0usize;
    loop {
        let candidate = format!("{stem}{i}");
        if !fun.var_names().any(|name| name.starts_with(&candidate)) {
            return candidate;
        }
        i += 1;
    }
}

fn slot_location(slot: usize) -> Value {
    Value::Memory {
        base: Box::new(Value::Register(Reg::STACK_PTR)),
        offset: 8 * slot as i64,
    }
}

/// Rewrite `fun` so that `var` lives in a stack slot instead of a register.
/// Spilling a non-spillable variable (a previous spill's temporary) is a
/// no-op.
pub fn spill(fun: &mut Function, var: VarId, prefix: &str) {
    if !fun.is_spillable(var) {
        return;
    }
    let victim = Node::Var(var);
    let slot = fun.alloc_spill_slot();

    let mut count = 0usize;
    let mut index = 0usize;
    while index < fun.instructions.len() {
        let (reads, writes) = {
            let inst = &fun.instructions[index];
            (
                gen_set(inst).contains(&victim),
                kill_set(inst).contains(&victim),
            )
        };
        if !reads && !writes {
            index += 1;
            continue;
        }

        let temp = fun.get_or_create_var(&format!("{prefix}{count}"));
        fun.set_spillable(temp, false);
        count += 1;

        fun.instructions[index].replace_var(var, temp);

        if reads {
            fun.instructions.insert(
                index,
                Instruction::Assign {
                    op: AssignOp::Move,
                    dest: Value::Variable(temp),
                    source: slot_location(slot),
                },
            );
            index += 1;
        }
        if writes {
            fun.instructions.insert(
                index + 1,
                Instruction::Assign {
                    op: AssignOp::Move,
                    dest: slot_location(slot),
                    source: Value::Variable(temp),
                },
            );
            index += 1;
        }
        index += 1;
    }
}

/// Spill every currently-spillable variable, each into its own slot. The
/// fallback path of the allocator: afterwards only non-spillable
/// single-use temporaries remain.
pub fn spill_all(fun: &mut Function, stem: &str) {
    let victims: Vec<VarId> = fun.var_ids().filter(|var| fun.is_spillable(*var)).collect();
    for var in victims {
        let prefix = fresh_prefix(fun, stem);
        spill(fun, var, &prefix);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::regalloc::liveness::tests::bind;
    use crate::il::Program;

    fn spill_named(program: &mut Program, name: &str, stem: &str) {
        let id = program.entry();
        let mut fun = program.take_function(id);
        let var = fun.lookup_var(name).unwrap();
        let prefix = fresh_prefix(&fun, stem);
        spill(&mut fun, var, &prefix);
        program.put_function(id, fun);
    }

    fn rendered(program: &Program) -> String {
        program.render_function(program.function(program.entry()))
    }

    #[test]
    fn test_spill_read_and_write() {
        let mut program = bind("(@f 0\n%x <- 1\nrax <- %x\nreturn\n)");
        spill_named(&mut program, "x", "s");

        assert_eq!(
            rendered(&program),
            "(@f 0\n\
             %s00 <- 1\n\
             mem rsp 0 <- %s00\n\
             %s01 <- mem rsp 0\n\
             rax <- %s01\n\
             return\n)"
        );
    }

    #[test]
    fn test_spill_read_modify_write_loads_and_stores() {
        let mut program = bind("(@f 0\n%x <- 1\n%x += 1\nrax <- %x\nreturn\n)");
        spill_named(&mut program, "x", "s");

        assert_eq!(
            rendered(&program),
            "(@f 0\n\
             %s00 <- 1\n\
             mem rsp 0 <- %s00\n\
             %s01 <- mem rsp 0\n\
             %s01 += 1\n\
             mem rsp 0 <- %s01\n\
             %s02 <- mem rsp 0\n\
             rax <- %s02\n\
             return\n)"
        );
    }

    #[test]
    fn test_spill_temporaries_are_not_spillable() {
        let mut program = bind("(@f 0\n%x <- 1\nrax <- %x\nreturn\n)");
        spill_named(&mut program, "x", "s");

        let fun = program.function(program.entry());
        let temp = fun.lookup_var("s00").unwrap();
        assert!(!fun.is_spillable(temp));
    }

    #[test]
    fn test_spilling_a_temporary_is_a_no_op() {
        let mut program = bind("(@f 0\n%x <- 1\nrax <- %x\nreturn\n)");
        spill_named(&mut program, "x", "s");
        let before = rendered(&program);

        spill_named(&mut program, "s00", "t");
        assert_eq!(rendered(&program), before);
    }

    #[test]
    fn test_untouched_variable_leaves_function_unchanged() {
        let mut program = bind("(@f 0\n%x <- 1\n%y <- 2\nrax <- %x\nrax += %y\nreturn\n)");
        let before = rendered(&program);
        // %z is never mentioned by any instruction
        {
            let id = program.entry();
            let mut fun = program.take_function(id);
            let z = fun.get_or_create_var("z");
            spill(&mut fun, z, "s0");
            program.put_function(id, fun);
        }
        assert_eq!(rendered(&program), before);
    }

    #[test]
    fn test_successive_spills_get_distinct_slots() {
        let mut program = bind("(@f 0\n%x <- 1\n%y <- 2\nrax <- %x\nrax += %y\nreturn\n)");
        spill_named(&mut program, "x", "s");
        spill_named(&mut program, "y", "s");

        let text = rendered(&program);
        assert!(text.contains("mem rsp 0"), "first spill uses slot 0:\n{text}");
        assert!(text.contains("mem rsp 8"), "second spill uses slot 8:\n{text}");
        assert_eq!(program.function(program.entry()).spill_slots(), 2);
    }

    #[test]
    fn test_spill_memory_base_read() {
        let mut program = bind("(@f 0\n%p <- rdi\nrax <- mem %p 16\nreturn\n)");
        spill_named(&mut program, "p", "s");

        assert_eq!(
            rendered(&program),
            "(@f 0\n\
             %s00 <- rdi\n\
             mem rsp 0 <- %s00\n\
             %s01 <- mem rsp 0\n\
             rax <- mem %s01 16\n\
             return\n)"
        );
    }

    #[test]
    fn test_spill_jump_operand_loads_without_storing() {
        let mut program = bind("(@f 0\n%x <- 1\ncjump %x < 10 :done\n:done\nreturn\n)");
        spill_named(&mut program, "x", "s");

        assert_eq!(
            rendered(&program),
            "(@f 0\n\
             %s00 <- 1\n\
             mem rsp 0 <- %s00\n\
             %s01 <- mem rsp 0\n\
             cjump %s01 < 10 :done\n\
             :done\n\
             return\n)"
        );
    }

    #[test]
    fn test_spill_callee_variable() {
        let mut program = bind("(@f 0\n%t <- @f\ncall %t 0\nreturn\n)");
        spill_named(&mut program, "t", "s");

        assert_eq!(
            rendered(&program),
            "(@f 0\n\
             %s00 <- @f\n\
             mem rsp 0 <- %s00\n\
             %s01 <- mem rsp 0\n\
             call %s01 0\n\
             return\n)"
        );
    }

    #[test]
    fn test_fresh_prefix_avoids_collisions() {
        let mut fun = Function::new("f", 0);
        fun.get_or_create_var("s0");
        fun.get_or_create_var("s12");
        assert_eq!(fresh_prefix(&fun, "s"), "s2");

        let empty = Function::new("g", 0);
        assert_eq!(fresh_prefix(&empty, "s"), "s0");
    }

    #[test]
    fn test_spill_all_spills_every_spillable() {
        let mut program = bind("(@f 0\n%x <- 1\n%y <- 2\nrax <- %x\nrax += %y\nreturn\n)");
        let id = program.entry();
        let mut fun = program.take_function(id);
        spill_all(&mut fun, "s");
        program.put_function(id, fun);

        let text = rendered(&program);
        assert!(!text.contains("%x"), "%x should be gone:\n{text}");
        assert!(!text.contains("%y"), "%y should be gone:\n{text}");
        assert_eq!(program.function(program.entry()).spill_slots(), 2);

        // a second spill_all finds nothing left to spill
        let before = rendered(&program);
        let mut fun = program.take_function(id);
        spill_all(&mut fun, "s");
        program.put_function(id, fun);
        assert_eq!(rendered(&program), before);
    }
}
