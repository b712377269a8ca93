//! x86-64 Register Definitions
//!
//! This module defines the x86-64 general purpose register set as seen by the
//! IL: sixteen registers following the System V AMD64 ABI, of which fifteen
//! are allocatable (`rsp` is reserved as the stack pointer).

use std::fmt;

/// x86-64 General Purpose Registers (64-bit)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Reg {
    // Caller-saved registers (volatile)
    Rax, // Return value, accumulator
    Rcx, // 4th argument, shift count
    Rdx, // 3rd argument
    Rsi, // 2nd argument
    Rdi, // 1st argument
    R8,  // 5th argument
    R9,  // 6th argument
    R10, // Caller-saved
    R11, // Caller-saved

    // Callee-saved registers (non-volatile)
    Rbx,
    Rbp,
    R12,
    R13,
    R14,
    R15,

    // Special registers
    Rsp, // Stack pointer, never allocated
}

impl Reg {
    /// Registers available for allocation (excludes RSP)
    pub const ALLOCATABLE: &'static [Reg] = &[
        Reg::Rax,
        Reg::Rcx,
        Reg::Rdx,
        Reg::Rsi,
        Reg::Rdi,
        Reg::R8,
        Reg::R9,
        Reg::R10,
        Reg::R11,
        Reg::Rbx,
        Reg::Rbp,
        Reg::R12,
        Reg::R13,
        Reg::R14,
        Reg::R15,
    ];

    /// Caller-saved registers (clobbered by a call)
    pub const CALLER_SAVED: &'static [Reg] = &[
        Reg::Rax,
        Reg::Rdi,
        Reg::Rsi,
        Reg::Rdx,
        Reg::Rcx,
        Reg::R8,
        Reg::R9,
        Reg::R10,
        Reg::R11,
    ];

    /// Callee-saved registers (must be preserved across a call)
    pub const CALLEE_SAVED: &'static [Reg] = &[
        Reg::Rbx,
        Reg::Rbp,
        Reg::R12,
        Reg::R13,
        Reg::R14,
        Reg::R15,
    ];

    /// Argument registers (System V AMD64 ABI order)
    pub const ARGUMENT: &'static [Reg] = &[
        Reg::Rdi, // 1st argument
        Reg::Rsi, // 2nd argument
        Reg::Rdx, // 3rd argument
        Reg::Rcx, // 4th argument
        Reg::R8,  // 5th argument
        Reg::R9,  // 6th argument
    ];

    /// Return value register
    pub const RETURN_REG: Reg = Reg::Rax;

    /// Stack pointer
    pub const STACK_PTR: Reg = Reg::Rsp;

    /// Look up a register by its canonical name
    pub fn from_name(name: &str) -> Option<Reg> {
        let reg = match name {
            "rax" => Reg::Rax,
            "rbx" => Reg::Rbx,
            "rcx" => Reg::Rcx,
            "rdx" => Reg::Rdx,
            "rsi" => Reg::Rsi,
            "rdi" => Reg::Rdi,
            "rsp" => Reg::Rsp,
            "rbp" => Reg::Rbp,
            "r8" => Reg::R8,
            "r9" => Reg::R9,
            "r10" => Reg::R10,
            "r11" => Reg::R11,
            "r12" => Reg::R12,
            "r13" => Reg::R13,
            "r14" => Reg::R14,
            "r15" => Reg::R15,
            _ => return None,
        };
        Some(reg)
    }

    /// The register's canonical name
    pub fn name(self) -> &'static str {
        match self {
            Reg::Rax => "rax",
            Reg::Rbx => "rbx",
            Reg::Rcx => "rcx",
            Reg::Rdx => "rdx",
            Reg::Rsi => "rsi",
            Reg::Rdi => "rdi",
            Reg::Rsp => "rsp",
            Reg::Rbp => "rbp",
            Reg::R8 => "r8",
            Reg::R9 => "r9",
            Reg::R10 => "r10",
            Reg::R11 => "r11",
            Reg::R12 => "r12",
            Reg::R13 => "r13",
            Reg::R14 => "r14",
            Reg::R15 => "r15",
        }
    }

    /// Check if this is a caller-saved register
    pub fn is_caller_saved(self) -> bool {
        Self::CALLER_SAVED.contains(&self)
    }

    /// Check if this is a callee-saved register
    pub fn is_callee_saved(self) -> bool {
        Self::CALLEE_SAVED.contains(&self)
    }

    /// Position in the argument-passing order, for the six argument registers
    pub fn argument_order(self) -> Option<usize> {
        Self::ARGUMENT.iter().position(|r| *r == self)
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_round_trip() {
        for &reg in Reg::ALLOCATABLE {
            assert_eq!(Reg::from_name(reg.name()), Some(reg));
        }
        assert_eq!(Reg::from_name("rsp"), Some(Reg::Rsp));
        assert_eq!(Reg::from_name("r16"), None);
    }

    #[test]
    fn test_allocatable_excludes_rsp() {
        assert_eq!(Reg::ALLOCATABLE.len(), 15);
        assert!(!Reg::ALLOCATABLE.contains(&Reg::Rsp));
    }

    #[test]
    fn test_argument_order() {
        assert_eq!(Reg::ARGUMENT.len(), 6);
        assert_eq!(Reg::Rdi.argument_order(), Some(0));
        assert_eq!(Reg::R9.argument_order(), Some(5));
        assert_eq!(Reg::Rax.argument_order(), None);
    }

    #[test]
    fn test_saved_sets_partition() {
        for &reg in Reg::ALLOCATABLE {
            assert!(
                reg.is_caller_saved() ^ reg.is_callee_saved(),
                "{} must be exactly one of caller/callee saved",
                reg
            );
        }
    }
}
