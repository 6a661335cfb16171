//! Output buffers handed to native code
//!
//! Native string-returning APIs write into caller-owned storage. These
//! wrappers own that storage for the duration of a call and decode it
//! afterwards.

use crate::ffi::types::TextEncoding;
use crate::value::Value;
use std::cell::Cell;

enum Storage {
    Ansi(Vec<u8>),
    Wide(Vec<u16>),
}

/// Zero-filled character buffer of fixed capacity
///
/// One extra unit is allocated past `capacity` so that a callee writing a
/// terminator at `capacity` stays in bounds.
pub struct TextBuffer {
    capacity: usize,
    storage: Storage,
}

impl TextBuffer {
    /// Allocate room for `capacity` characters in `encoding`
    pub fn new(capacity: usize, encoding: TextEncoding) -> Self {
        let storage = match encoding {
            TextEncoding::Ansi => Storage::Ansi(vec![0; capacity + 1]),
            TextEncoding::Wide => Storage::Wide(vec![0; capacity + 1]),
        };
        Self { capacity, storage }
    }

    /// Capacity in characters (excluding the spare terminator slot)
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn encoding(&self) -> TextEncoding {
        match self.storage {
            Storage::Ansi(_) => TextEncoding::Ansi,
            Storage::Wide(_) => TextEncoding::Wide,
        }
    }

    /// Buffer address as a pointer argument
    pub fn as_value(&mut self) -> Value {
        let addr = match &mut self.storage {
            Storage::Ansi(bytes) => bytes.as_mut_ptr() as usize,
            Storage::Wide(units) => units.as_mut_ptr() as usize,
        };
        Value::Pointer(addr)
    }

    /// Decode the first `count` characters
    ///
    /// `count` is clamped to the capacity. Trailing whitespace and NULs are
    /// trimmed.
    pub fn read(&self, count: usize) -> String {
        let count = count.min(self.capacity);
        let text = match &self.storage {
            Storage::Ansi(bytes) => String::from_utf8_lossy(&bytes[..count]).into_owned(),
            Storage::Wide(units) => String::from_utf16_lossy(&units[..count]),
        };
        text.trim_end_matches(|c: char| c == '\0' || c.is_whitespace())
            .to_string()
    }

    /// Copy text into the buffer (used by tests and by callers preparing
    /// in/out buffers)
    pub fn write(&mut self, text: &str) {
        match &mut self.storage {
            Storage::Ansi(bytes) => {
                for (slot, b) in bytes.iter_mut().take(self.capacity).zip(text.bytes()) {
                    *slot = b;
                }
            }
            Storage::Wide(units) => {
                for (slot, u) in units
                    .iter_mut()
                    .take(self.capacity)
                    .zip(text.encode_utf16())
                {
                    *slot = u;
                }
            }
        }
    }
}

/// A 32-bit in/out integer slot
///
/// Native code receives its address, reads the initial value, and may write
/// a new one.
pub struct CountSlot {
    cell: Box<Cell<u32>>,
}

impl CountSlot {
    pub fn new(initial: u32) -> Self {
        Self {
            cell: Box::new(Cell::new(initial)),
        }
    }

    /// Slot address as a pointer argument
    pub fn as_value(&self) -> Value {
        Value::Pointer(self.cell.as_ptr() as usize)
    }

    pub fn get(&self) -> u32 {
        self.cell.get()
    }
}
