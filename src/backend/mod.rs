//! Backend
//!
//! Everything after binding: the register-allocation pipeline and the text
//! emitter that prints the allocated program.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐     ┌──────────────────┐     ┌──────────────┐
//! │  Bound IL    │────▶│ Register alloc   │────▶│  IL Emitter  │
//! │  (Program)   │     │ (liveness/color) │     │              │
//! └──────────────┘     └──────────────────┘     └──────────────┘
//! ```

pub mod emit;
pub mod regalloc;

pub use emit::{apply_assignment, emit_program};
pub use regalloc::{AllocError, Assignment, allocate_with_backup};
