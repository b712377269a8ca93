//! Graph Coloring and the Allocate-or-Spill Loop
//!
//! The colorer is Chaitin/Briggs simplification-and-select over the
//! interference graph, adapted for a fixed pre-colored palette. The driver
//! loops liveness → graph → color, spilling the most constrained variable
//! after each failed attempt, and falls back to spilling everything when
//! ordinary spilling cannot converge.

use super::graph::{COLOR_PALETTE, ColoringGraph, build_interference_graph};
use super::liveness::analyze_instructions;
use super::spill::{fresh_prefix, spill, spill_all};
use crate::il::{FunId, Node, Program, Reg, VarId};
use std::collections::BTreeMap;
use std::fmt;

const K: usize = COLOR_PALETTE.len();

/// The final variable → register map of a successful allocation
pub type Assignment = BTreeMap<VarId, Reg>;

/// Allocation failed even after the spill-everything fallback
#[derive(Clone, Debug)]
pub enum AllocError {
    Unallocatable { function: String },
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocError::Unallocatable { function } => write!(
                f,
                "cannot allocate registers for `@{}` even after spilling every variable",
                function
            ),
        }
    }
}

/// Attempt a k-coloring of the graph in place.
///
/// Simplification repeatedly disables an uncolored node of enabled-degree
/// below k (in node-table order), or failing that marks the highest-degree
/// uncolored node (ties broken by name) as a potential spill; selection pops
/// the stack and gives each node the lowest palette index no enabled
/// neighbor holds. Returns the actual spills, most constrained last.
pub fn color_graph(graph: &mut ColoringGraph) -> Vec<Node> {
    let mut stack: Vec<usize> = Vec::new();

    loop {
        let simplifiable = (0..graph.len()).find(|&u| {
            let info = graph.info(u);
            info.enabled && info.color.is_none() && graph.enabled_degree(u) < K
        });
        if let Some(u) = simplifiable {
            stack.push(u);
            graph.info_mut(u).enabled = false;
            continue;
        }

        // Everything left has degree >= k: pick a potential spill. Ties on
        // degree break toward the lexicographically smallest name.
        let potential_spill = (0..graph.len())
            .filter(|&u| graph.info(u).enabled && graph.info(u).color.is_none())
            .max_by(|&a, &b| {
                graph
                    .enabled_degree(a)
                    .cmp(&graph.enabled_degree(b))
                    .then_with(|| graph.info(b).name.cmp(&graph.info(a).name))
            });
        match potential_spill {
            Some(u) => {
                stack.push(u);
                graph.info_mut(u).enabled = false;
            }
            None => break,
        }
    }

    let mut spills = Vec::new();
    while let Some(u) = stack.pop() {
        graph.info_mut(u).enabled = true;
        let mut used = [false; K];
        for i in 0..graph.neighbors(u).len() {
            let v = graph.neighbors(u)[i];
            if v != u
                && graph.info(v).enabled
                && let Some(color) = graph.info(v).color
            {
                used[color] = true;
            }
        }
        match (0..K).find(|&color| !used[color]) {
            Some(color) => graph.info_mut(u).color = Some(color),
            None => spills.push(graph.info(u).node),
        }
    }

    // earliest-discovered last, so callers spill the most constrained first
    spills.reverse();
    spills
}

/// Read the variable colors out of a fully colored graph
pub fn assignment_from_graph(graph: &ColoringGraph) -> Assignment {
    graph
        .infos()
        .filter_map(|info| match (info.node, info.color) {
            (Node::Var(var), Some(color)) => Some((var, COLOR_PALETTE[color])),
            _ => None,
        })
        .collect()
}

/// The allocate-or-spill loop. Returns `None` when coloring fails and no
/// spillable candidate remains.
pub fn allocate_and_spill(program: &mut Program, id: FunId) -> Option<Assignment> {
    loop {
        let fun = program.function(id);
        let analysis = analyze_instructions(program, fun);
        let mut graph = build_interference_graph(fun, &analysis);

        let spills = color_graph(&mut graph);
        if spills.is_empty() {
            return Some(assignment_from_graph(&graph));
        }

        let victim = spills.iter().rev().find_map(|node| match node {
            Node::Var(var) if fun.is_spillable(*var) => Some(*var),
            _ => None,
        })?;
        let prefix = fresh_prefix(fun, "s");
        spill(program.function_mut(id), victim, &prefix);
    }
}

/// Allocation with the spill-everything fallback: if the ordinary loop gives
/// up, make every variable spillable again, demote them all to stack slots,
/// and retry once
pub fn allocate_with_backup(program: &mut Program, id: FunId) -> Result<Assignment, AllocError> {
    if let Some(assignment) = allocate_and_spill(program, id) {
        return Ok(assignment);
    }

    let fun = program.function_mut(id);
    fun.mark_all_spillable();
    spill_all(fun, "s");

    allocate_and_spill(program, id).ok_or_else(|| AllocError::Unallocatable {
        function: program.function(id).name().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::regalloc::liveness::tests::bind;

    fn allocate(src: &str) -> (Program, Assignment) {
        let mut program = bind(src);
        let id = program.entry();
        let assignment = allocate_with_backup(&mut program, id).unwrap();
        (program, assignment)
    }

    fn reg_of(program: &Program, assignment: &Assignment, name: &str) -> Reg {
        let fun = program.function(program.entry());
        let var = fun.lookup_var(name).unwrap();
        assignment[&var]
    }

    #[test]
    fn test_identity_function_allocates_without_spills() {
        let (program, assignment) = allocate("(@id 1\n%x <- rdi\nrax <- %x\nreturn\n)");
        let fun = program.function(program.entry());

        assert_eq!(fun.spill_slots(), 0);
        let x = reg_of(&program, &assignment, "x");
        assert_ne!(x, Reg::Rsp);
        // %x must avoid the callee-saved registers live across it
        assert!(!x.is_callee_saved());
    }

    #[test]
    fn test_every_variable_gets_exactly_one_register() {
        let (program, assignment) =
            allocate("(@f 0\n%a <- 1\n%b <- 2\nrax <- %a\nrax += %b\nreturn\n)");
        let fun = program.function(program.entry());
        for var in fun.var_ids() {
            assert!(assignment.contains_key(&var), "unassigned variable");
            assert_ne!(assignment[&var], Reg::Rsp);
        }
    }

    #[test]
    fn test_interfering_variables_get_distinct_registers() {
        let (program, assignment) =
            allocate("(@f 0\n%a <- 1\n%b <- 2\nrax <- %a\nrax += %b\nreturn\n)");
        assert_ne!(
            reg_of(&program, &assignment, "a"),
            reg_of(&program, &assignment, "b")
        );
    }

    #[test]
    fn test_colored_graph_has_no_conflicts() {
        let program = bind("(@f 0\n%a <- 1\n%b <- 2\nrax <- %a\nrax += %b\nreturn\n)");
        let fun = program.function(program.entry());
        let analysis = analyze_instructions(&program, fun);
        let mut graph = build_interference_graph(fun, &analysis);
        let spills = color_graph(&mut graph);

        assert!(spills.is_empty());
        for info in graph.infos() {
            assert!(!graph.is_in_conflict(info.node));
        }
    }

    #[test]
    fn test_sixteen_live_values_force_a_spill() {
        // sixteen variables live across the first store; the graph needs 16
        // colors and only 15 exist. The terminating call keeps the
        // callee-saved registers out of the picture.
        let mut src = String::from("(@f 0\n");
        for i in 0..16 {
            src.push_str(&format!("%v{i} <- {i}\n"));
        }
        for i in (0..16).step_by(2) {
            src.push_str(&format!("mem %v{i} 0 <- %v{}\n", i + 1));
        }
        src.push_str("call tuple-error 0\n)");

        let mut program = bind(&src);
        let id = program.entry();
        let assignment = allocate_with_backup(&mut program, id).unwrap();

        let fun = program.function(id);
        assert!(fun.spill_slots() >= 1, "at least one variable spilled");
        for var in fun.var_ids() {
            assert_ne!(assignment[&var], Reg::Rsp);
        }
    }

    #[test]
    fn test_shift_count_lands_in_rcx() {
        let (program, assignment) =
            allocate("(@f 0\n%c <- 5\n%n <- 3\n%c <<= %n\nrax <- %c\nreturn\n)");
        assert_eq!(reg_of(&program, &assignment, "n"), Reg::Rcx);
        assert_ne!(reg_of(&program, &assignment, "c"), Reg::Rcx);
    }

    #[test]
    fn test_variable_shift_with_rcx_occupied_is_unallocatable() {
        // rcx is live across the shift, and only rcx may hold a runtime
        // shift count; no amount of spilling can fix that
        let mut program = bind(
            "(@f 0\n%n <- 3\n%c <- 5\n%c <<= %n\nrax <- rcx\nrax += %c\nreturn\n)",
        );
        let id = program.entry();
        assert!(matches!(
            allocate_with_backup(&mut program, id),
            Err(AllocError::Unallocatable { function }) if function == "f"
        ));
    }

    #[test]
    fn test_allocation_succeeds_after_spilling_everything() {
        let mut program = bind(
            "(@f 0\n:top\n%i += 1\n%j <- %i\ncjump %j < 10 :top\nrax <- %i\nreturn\n)",
        );
        let id = program.entry();
        {
            let fun = program.function_mut(id);
            spill_all(fun, "s");
        }
        let assignment = allocate_and_spill(&mut program, id)
            .expect("allocation after spill-all must succeed");
        let fun = program.function(id);
        for var in fun.var_ids() {
            assert!(assignment.contains_key(&var));
        }
    }

    #[test]
    fn test_allocator_is_deterministic() {
        let src = "(@f 0\n%a <- 1\n%b <- 2\n%c <- 3\nrax <- %a\nrax += %b\nrax += %c\nreturn\n)";
        let (program_a, first) = allocate(src);
        let (program_b, second) = allocate(src);
        for name in ["a", "b", "c"] {
            assert_eq!(
                reg_of(&program_a, &first, name),
                reg_of(&program_b, &second, name)
            );
        }
    }

    #[test]
    fn test_store_operands_interfere_without_a_kill() {
        // the store kills nothing, but %a and %b are simultaneously live
        let src = "(@f 0\n%a <- 1\n%b <- 2\nmem %a 0 <- %b\ncall tuple-error 0\n)";
        let (program, assignment) = allocate(src);
        assert_ne!(
            reg_of(&program, &assignment, "a"),
            reg_of(&program, &assignment, "b")
        );
    }
}
