//! Errors the code generator can report (spec.md §4.6/§7, component C6).
//!
//! These are codegen-specific failures, not ordinary "this program has a
//! type error" diagnostics — they still flow through [`gopiler_util::Diagnostics`]
//! as error-level messages (so §7's "no exceptions cross pass boundaries"
//! holds), but the generator needs a typed value internally to decide
//! when to abort image production for the current program.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GenError {
    /// Placeholder backpatching would write a variable's address past the
    /// heap's current top, per spec.md §3 invariant (c) and §4.6's
    /// backpatching rule.
    #[error("Memory size exceeded (256 Bytes)")]
    MemoryExceeded,

    /// A `while` loop's body is long enough that the backward branch
    /// cannot be expressed in BNE's signed 8-bit displacement (spec.md §9
    /// Open Question: "a rewrite should ... report overflow as a codegen
    /// error" instead of silently wrapping modulo 256).
    #[error("loop body too large to backpatch in one byte (displacement {0} exceeds 0x80)")]
    LoopBodyTooLarge(u16),

    /// An internal invariant was violated (a node kind reached a code path
    /// that semantic analysis should have ruled out already).
    #[error("internal code generator error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, GenError>;
