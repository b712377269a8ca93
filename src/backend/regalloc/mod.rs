//! Register Allocation
//!
//! The graph-coloring pipeline that maps every IL variable to a physical
//! register, spilling to stack slots when the graph is uncolorable.
//!
//! # Pipeline
//!
//! ```text
//! IL function → Liveness → Interference graph → Coloring
//!                   ▲                               │ spills
//!                   └────────── Spiller ◀───────────┘
//! ```

pub mod allocator;
pub mod graph;
pub mod liveness;
pub mod spill;

pub use allocator::{AllocError, Assignment, allocate_and_spill, allocate_with_backup, color_graph};
pub use graph::{COLOR_PALETTE, ColoringGraph, build_interference_graph};
pub use liveness::{InstructionLiveness, analyze_instructions, render_liveness};
pub use spill::{fresh_prefix, spill, spill_all};
