//! Interference Graph
//!
//! An undirected graph over variable-like nodes with coloring state. Colors
//! are indices into [`COLOR_PALETTE`]; the register nodes are pre-colored
//! with their own palette index, so architectural constraints are plain
//! edges and the colorer needs no special cases.

use super::liveness::InstructionLiveness;
use crate::il::{Function, Instruction, Node, NodeSet, Reg};
use std::collections::HashMap;

/// A color: an index into [`COLOR_PALETTE`]
pub type Color = usize;

/// The fixed register palette. The order is part of the allocator's
/// determinism: color k always means the k-th register here.
pub const COLOR_PALETTE: [Reg; 15] = [
    Reg::Rax,
    Reg::Rdi,
    Reg::Rsi,
    Reg::Rdx,
    Reg::Rcx,
    Reg::R8,
    Reg::R9,
    Reg::R10,
    Reg::R11,
    Reg::R12,
    Reg::R13,
    Reg::R14,
    Reg::R15,
    Reg::Rbx,
    Reg::Rbp,
];

/// Per-node state
#[derive(Clone, Debug)]
pub struct NodeInfo {
    pub node: Node,
    /// Concrete-syntax token, used for dumps and deterministic tie-breaks
    pub name: String,
    /// Sorted adjacency, as indices into the node table
    adj: Vec<usize>,
    pub color: Option<Color>,
    pub enabled: bool,
}

/// Undirected graph over nodes with optional colors and enable flags
#[derive(Clone, Debug, Default)]
pub struct ColoringGraph {
    infos: Vec<NodeInfo>,
    index: HashMap<Node, usize>,
}

impl ColoringGraph {
    pub fn new(nodes: Vec<(Node, String)>) -> Self {
        let mut graph = ColoringGraph {
            infos: Vec::with_capacity(nodes.len()),
            index: HashMap::new(),
        };
        for (node, name) in nodes {
            graph.index.insert(node, graph.infos.len());
            graph.infos.push(NodeInfo {
                node,
                name,
                adj: Vec::new(),
                color: None,
                enabled: true,
            });
        }
        graph
    }

    pub fn len(&self) -> usize {
        self.infos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    pub fn node_index(&self, node: Node) -> usize {
        self.index[&node]
    }

    pub fn info(&self, index: usize) -> &NodeInfo {
        &self.infos[index]
    }

    pub fn info_mut(&mut self, index: usize) -> &mut NodeInfo {
        &mut self.infos[index]
    }

    pub fn infos(&self) -> impl Iterator<Item = &NodeInfo> {
        self.infos.iter()
    }

    pub fn color_of(&self, node: Node) -> Option<Color> {
        self.infos[self.node_index(node)].color
    }

    pub fn neighbors(&self, index: usize) -> &[usize] {
        &self.infos[index].adj
    }

    fn conflicting(&self, u: usize, v: usize) -> bool {
        let (a, b) = (&self.infos[u], &self.infos[v]);
        u != v && a.enabled && b.enabled && a.color.is_some() && a.color == b.color
    }

    /// Add an undirected edge. Idempotent; a self-edge is stored once as a
    /// marker. Two same-colored enabled endpoints are an internal invariant
    /// violation.
    pub fn add_edge(&mut self, a: Node, b: Node) {
        let u = self.node_index(a);
        let v = self.node_index(b);
        self.add_edge_indices(u, v);
    }

    fn add_edge_indices(&mut self, u: usize, v: usize) {
        assert!(
            !self.conflicting(u, v),
            "cannot add an edge between two nodes of the same color: {} and {}",
            self.infos[u].name,
            self.infos[v].name
        );
        if let Err(pos) = self.infos[u].adj.binary_search(&v) {
            self.infos[u].adj.insert(pos, v);
            if u != v {
                let pos = self.infos[v]
                    .adj
                    .binary_search(&u)
                    .expect_err("adjacency must be symmetric");
                self.infos[v].adj.insert(pos, u);
            }
        }
    }

    /// Add every edge among a set of nodes
    pub fn add_clique(&mut self, nodes: &NodeSet) {
        let indices: Vec<usize> = nodes.iter().map(|node| self.node_index(*node)).collect();
        for (i, &u) in indices.iter().enumerate() {
            for &v in &indices[i + 1..] {
                self.add_edge_indices(u, v);
            }
        }
    }

    /// Add every `a != b` edge with `a` in one group and `b` in the other
    pub fn add_total_bipartite(&mut self, group_a: &NodeSet, group_b: &NodeSet) {
        for a in group_a {
            for b in group_b {
                if a != b {
                    self.add_edge(*a, *b);
                }
            }
        }
    }

    /// Number of enabled neighbors (a self-marker does not count)
    pub fn enabled_degree(&self, index: usize) -> usize {
        self.infos[index]
            .adj
            .iter()
            .filter(|&&v| v != index && self.infos[v].enabled)
            .count()
    }

    /// Whether any enabled neighbor of `node` shares its color
    pub fn is_in_conflict(&self, node: Node) -> bool {
        let u = self.node_index(node);
        if !self.infos[u].enabled {
            return false;
        }
        self.infos[u].adj.iter().any(|&v| self.conflicting(u, v))
    }

    /// The `-i` dump: one line per node, the node's token followed by its
    /// neighbors' tokens
    pub fn render(&self) -> String {
        let mut output = String::new();
        for info in &self.infos {
            output.push_str(&info.name);
            for &v in &info.adj {
                output.push(' ');
                output.push_str(&self.infos[v].name);
            }
            output.push('\n');
        }
        output
    }
}

/// Build the interference graph for a function from its liveness results:
///
/// 1. the allocatable registers interfere pairwise and are pre-colored;
/// 2. a clique over every `IN` set;
/// 3. a clique over `OUT` at multi-successor instructions, which the
///    successors' `IN` sets alone would miss;
/// 4. `KILL × (OUT \ KILL)` edges: a value killed here cannot share a
///    register with anything live afterwards;
/// 5. a shift whose count is a variable-like operand pins that operand away
///    from every register but `rcx`.
pub fn build_interference_graph(
    fun: &Function,
    analysis: &[InstructionLiveness],
) -> ColoringGraph {
    let mut nodes: Vec<(Node, String)> = fun
        .var_ids()
        .map(|var| (Node::Var(var), format!("%{}", fun.var_name(var))))
        .collect();
    for reg in COLOR_PALETTE {
        nodes.push((Node::Reg(reg), reg.name().to_string()));
    }

    let mut graph = ColoringGraph::new(nodes);

    for (color, reg) in COLOR_PALETTE.iter().enumerate() {
        let index = graph.node_index(Node::Reg(*reg));
        graph.info_mut(index).color = Some(color);
    }
    for (i, a) in COLOR_PALETTE.iter().enumerate() {
        for b in &COLOR_PALETTE[i + 1..] {
            graph.add_edge(Node::Reg(*a), Node::Reg(*b));
        }
    }

    for (inst, entry) in fun.instructions.iter().zip(analysis) {
        graph.add_clique(&entry.in_set);

        if entry.successors.len() > 1 {
            graph.add_clique(&entry.out_set);
        }

        let live_after = entry
            .out_set
            .clone()
            .relative_complement(entry.kill_set.clone());
        graph.add_total_bipartite(&entry.kill_set, &live_after);

        // only rcx can hold a runtime shift amount
        if let Instruction::Assign { op, source, .. } = inst
            && op.is_shift()
        {
            for node in source.vars_on_read() {
                for reg in COLOR_PALETTE {
                    if reg != Reg::Rcx {
                        graph.add_edge(node, Node::Reg(reg));
                    }
                }
            }
        }
    }

    graph
}
