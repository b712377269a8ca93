//! tern, a register-allocating backend for an x86-64 three-address
//! intermediate language.
//!
//! An IL program names an unlimited supply of symbolic variables alongside
//! the physical general-purpose registers; this crate rewrites each function
//! so every variable lives in one of the 15 allocatable registers, spilling
//! to stack slots when the interference graph cannot be colored. The output
//! is pure-register IL, ready for a straightforward x86-64 emitter.
//!
//! See [`pipeline::compile`] for the end-to-end entry point.

pub mod backend;
pub mod cli;
pub mod common;
pub mod frontend;
pub mod il;
pub mod pipeline;
