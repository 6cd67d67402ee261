//! Placeholders (spec.md §3 "Placeholder", §4.6 "Backpatching").
//!
//! A placeholder is a build-time record for an address that isn't known
//! until the whole instruction stream has been emitted: every `VarDecl`
//! gets one (keyed by scope+name so later references can find it again),
//! and the generator allocates anonymous ones for intermediate values
//! (comparison left operands, materialized `Addition`/comparison results
//! under `print`).

use gopiler_util::Idx;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaceholderId(u32);

impl Idx for PlaceholderId {
    fn from_usize(idx: usize) -> Self {
        PlaceholderId(idx as u32)
    }
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Default)]
pub struct Placeholder {
    /// Byte offsets in the image where this placeholder's low byte must
    /// be written (the high byte follows immediately and is always 0x00).
    pub byte_offsets: Vec<usize>,
    /// Character offsets in the assembly buffer where a `_TEMP` token
    /// must become `$HHHH`.
    pub asm_offsets: Vec<usize>,
    /// Filled in by backpatching once every placeholder has been seen.
    pub resolved_addr: Option<u8>,
}
