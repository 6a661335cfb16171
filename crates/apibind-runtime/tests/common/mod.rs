//! Shared test utilities
//!
//! An in-process "platform library" of `extern "system"` functions shaped
//! like the Win32 calls the engine is normally pointed at, plus a symbol
//! source that records every probe.

#![allow(dead_code)]

use apibind_runtime::ffi::{ExportTable, SymbolSource};
use apibind_runtime::{Registry, Value};
use std::sync::{Arc, Mutex};

// Re-export testing utilities
pub use pretty_assertions::{assert_eq, assert_ne};

/// Library name the fake platform functions are registered under
pub const HOST: &str = "host";

pub type Visitor = extern "system" fn(usize, isize) -> i32;

extern "system" fn is_window(hwnd: usize) -> i32 {
    (hwnd == 0x10 || hwnd == 0x20) as i32
}

extern "system" fn get_parent(hwnd: usize) -> usize {
    if hwnd == 0x20 {
        0x10
    } else {
        0
    }
}

extern "system" fn get_sys_color(index: i32) -> i32 {
    match index {
        0 => 0,
        1 => -1,
        n => n * 100,
    }
}

extern "system" fn get_window_text_a(hwnd: usize, buf: *mut u8, capacity: i32) -> i32 {
    if hwnd == 0 {
        return 0;
    }
    let text = b"hello\0\0   ";
    let n = text.len().min(capacity.max(0) as usize);
    for (i, b) in text.iter().take(n).enumerate() {
        unsafe { *buf.add(i) = *b };
    }
    5
}

extern "system" fn get_window_text_w(_hwnd: usize, _buf: *mut u16, _capacity: i32) -> i32 {
    // Never chosen: the ANSI export is probed first.
    -1
}

extern "system" fn enum_windows(visit: Visitor, context: isize) -> i32 {
    for hwnd in [10, 20, 30] {
        if visit(hwnd, context) == 0 {
            break;
        }
    }
    1
}

extern "system" fn enum_desktops(_visit: Visitor, _context: isize) -> i32 {
    0
}

extern "system" fn message_beep(kind: u32) -> i32 {
    (kind != 0xFFFF_FFFF) as i32
}

/// Host library with the fake platform functions
pub fn host_library() -> ExportTable {
    ExportTable::new(HOST)
        .with("IsWindow", is_window as *const ())
        .with("GetParent", get_parent as *const ())
        .with("GetSysColor", get_sys_color as *const ())
        .with("GetWindowTextA", get_window_text_a as *const ())
        .with("GetWindowTextW", get_window_text_w as *const ())
        .with("EnumWindows", enum_windows as *const ())
        .with("EnumDesktopsW", enum_desktops as *const ())
        .with("MessageBeep", message_beep as *const ())
}

/// Registry searching only the host library
pub fn host_registry() -> Registry {
    let mut registry = Registry::new();
    registry.set_default_libraries([HOST]);
    registry.register_library(host_library());
    registry
}

/// A symbol source that records every lookup
#[derive(Clone)]
pub struct ProbeRecorder {
    name: String,
    table: ExportTable,
    probes: Arc<Mutex<Vec<String>>>,
}

impl ProbeRecorder {
    pub fn new(table: ExportTable, name: &str) -> Self {
        Self {
            name: name.to_string(),
            table,
            probes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Names looked up so far, in order
    pub fn probes(&self) -> Vec<String> {
        self.probes.lock().unwrap().clone()
    }
}

impl SymbolSource for ProbeRecorder {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookup(&self, symbol: &str) -> Option<usize> {
        self.probes.lock().unwrap().push(symbol.to_string());
        self.table.lookup(symbol)
    }
}

/// Array of pointer values
pub fn pointers(items: &[usize]) -> Value {
    Value::array(items.iter().map(|p| Value::Pointer(*p)).collect())
}
