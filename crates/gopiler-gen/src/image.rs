//! The 256-byte machine image (spec.md §3 "Memory image", §4.6).
//!
//! Filled low-to-high for code during emission; string literals are
//! pushed onto a heap that grows downward from `top_heap_ptr` (initial
//! value 255 — address `0x00FF` itself is never handed out, it is the
//! reserved comparison-result scratch cell). After code emission the
//! placeholder-backed variable region is allocated starting at
//! `cur_byte_ptr` and growing upward, one byte per placeholder, checked
//! against `top_heap_ptr` so the three regions (code, variables, heap)
//! never overlap (spec.md §3 invariant (c)).

use rustc_hash::FxHashMap;

use crate::error::{GenError, Result};

/// The comparison-result scratch cell (spec.md §3).
pub const SCRATCH_ADDR: u8 = 0x00FF;

pub struct Image {
    pub bytes: [u8; 256],
    pub cur_byte_ptr: usize,
    pub top_heap_ptr: usize,
    /// Dedupe key: literal string text -> its heap address (spec.md §4.6
    /// "Strings on the heap").
    heap_strings: FxHashMap<String, u8>,
}

impl Image {
    pub fn new() -> Self {
        Self {
            bytes: [0u8; 256],
            cur_byte_ptr: 0,
            // SCRATCH_ADDR (0x00FF = 255) is reserved; the heap's first
            // free byte is 254.
            top_heap_ptr: SCRATCH_ADDR as usize,
            heap_strings: FxHashMap::default(),
        }
    }

    /// Writes one code byte at the current cursor, advancing it. Errors
    /// if doing so would collide with the heap region.
    pub fn emit_byte(&mut self, byte: u8) -> Result<usize> {
        if self.cur_byte_ptr >= self.top_heap_ptr {
            return Err(GenError::MemoryExceeded);
        }
        let offset = self.cur_byte_ptr;
        self.bytes[offset] = byte;
        self.cur_byte_ptr += 1;
        Ok(offset)
    }

    /// Reserves two zero bytes for a future backpatched address, returning
    /// the offset of the low byte.
    pub fn emit_placeholder_bytes(&mut self) -> Result<usize> {
        let offset = self.emit_byte(0)?;
        self.emit_byte(0)?;
        Ok(offset)
    }

    /// Inserts a string literal onto the heap, deduping by literal text
    /// (spec.md §4.6: "two occurrences of the same literal share one heap
    /// address"). Returns the starting (lowest) heap address.
    pub fn push_string(&mut self, text: &str) -> Result<u8> {
        if let Some(&addr) = self.heap_strings.get(text) {
            return Ok(addr);
        }

        let bytes: Vec<u8> = text.bytes().collect();
        // zero terminator first, then the literal bytes, both growing
        // downward from top_heap_ptr (spec.md §4.6).
        if self.top_heap_ptr == 0 || self.top_heap_ptr - 1 <= self.cur_byte_ptr {
            return Err(GenError::MemoryExceeded);
        }
        self.top_heap_ptr -= 1;
        self.bytes[self.top_heap_ptr] = 0;

        for &b in bytes.iter().rev() {
            if self.top_heap_ptr == 0 || self.top_heap_ptr - 1 <= self.cur_byte_ptr {
                return Err(GenError::MemoryExceeded);
            }
            self.top_heap_ptr -= 1;
            self.bytes[self.top_heap_ptr] = b;
        }

        let addr = self.top_heap_ptr as u8;
        self.heap_strings.insert(text.to_string(), addr);
        Ok(addr)
    }

    /// Renders the image as space-separated uppercase hex bytes (the
    /// `/getMachineCode/:n` shape, spec.md §6).
    pub fn to_hex_spaced(&self) -> String {
        self.bytes
            .iter()
            .map(|b| format!("{b:02X}"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Renders the image with a newline every 8 bytes (the CLI terminal
    /// display mode, spec.md §6).
    pub fn to_hex_display(&self) -> String {
        let mut out = String::new();
        for (i, b) in self.bytes.iter().enumerate() {
            if i > 0 && i % 8 == 0 {
                out.push('\n');
            } else if i > 0 {
                out.push(' ');
            }
            out.push_str(&format!("{b:02X}"));
        }
        out
    }
}

impl Default for Image {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heap_grows_downward_with_terminator() {
        let mut img = Image::new();
        let addr = img.push_string("hi").unwrap();
        assert_eq!(img.bytes[addr as usize], b'h');
        assert_eq!(img.bytes[addr as usize + 1], b'i');
        assert_eq!(img.bytes[addr as usize + 2], 0);
    }

    #[test]
    fn duplicate_strings_share_one_address() {
        let mut img = Image::new();
        let a = img.push_string("hi").unwrap();
        let b = img.push_string("hi").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn code_and_heap_regions_cannot_collide() {
        let mut img = Image::new();
        img.top_heap_ptr = 3;
        img.emit_byte(1).unwrap();
        img.emit_byte(2).unwrap();
        assert!(img.emit_byte(3).is_err());
    }
}
