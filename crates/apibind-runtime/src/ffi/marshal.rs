//! Type marshaling - Value ↔ C conversions
//!
//! Provides bidirectional marshaling between call-site values and C values:
//! - `MarshalContext::to_c()`: convert a value for a declared parameter type
//! - `MarshalContext::from_c()`: convert a native result back to a value
//!
//! # Memory Safety
//!
//! - Every string handed to native code is owned by the `MarshalContext`
//!   and stays alive until the context is dropped (after the call returns)
//! - Integer conversions are range checked against the declared width
//! - Null string results become `Value::Null`

use crate::ffi::types::{CanonicalType, TextEncoding};
use crate::value::Value;
use libffi::middle::{arg, Arg};
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use thiserror::Error;

/// Marshal error types
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MarshalError {
    /// Value cannot be passed as the declared type
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },
    /// Integer does not fit the declared width
    #[error("Number {value} out of range for {target}")]
    NumberOutOfRange { value: i64, target: String },
    /// Text cannot be represented as a C string
    #[error("Invalid string: {0}")]
    InvalidString(String),
}

/// A C value ready to be passed to (or just returned from) a native call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CValue {
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    ISize(isize),
    USize(usize),
    /// Any address (pointer, handle, string, callback)
    Ptr(usize),
    /// No value (void results only)
    Void,
}

impl CValue {
    /// libffi argument referencing this value's storage
    pub(crate) fn as_arg(&self) -> Arg {
        match self {
            CValue::I8(v) => arg(v),
            CValue::U8(v) => arg(v),
            CValue::I16(v) => arg(v),
            CValue::U16(v) => arg(v),
            CValue::I32(v) => arg(v),
            CValue::U32(v) => arg(v),
            CValue::I64(v) => arg(v),
            CValue::U64(v) => arg(v),
            CValue::ISize(v) => arg(v),
            CValue::USize(v) => arg(v),
            CValue::Ptr(v) => arg(v),
            CValue::Void => arg(&()),
        }
    }

    /// Zero-extended bit pattern of integer and address values
    pub fn bits(&self) -> u64 {
        match *self {
            CValue::I8(v) => v as u8 as u64,
            CValue::U8(v) => v as u64,
            CValue::I16(v) => v as u16 as u64,
            CValue::U16(v) => v as u64,
            CValue::I32(v) => v as u32 as u64,
            CValue::U32(v) => v as u64,
            CValue::I64(v) => v as u64,
            CValue::U64(v) => v,
            CValue::ISize(v) => v as usize as u64,
            CValue::USize(v) | CValue::Ptr(v) => v as u64,
            CValue::Void => 0,
        }
    }
}

/// Check that `n` is representable in `bits` bits, signed or unsigned
///
/// Native APIs routinely take `-1` for unsigned parameters and `0x8000_0000`
/// for signed ones, so both interpretations are accepted and truncated.
fn fits(n: i64, bits: u32) -> bool {
    if bits >= 64 {
        return true;
    }
    let min = -(1i64 << (bits - 1));
    let max = (1i64 << bits) - 1;
    n >= min && n <= max
}

/// Marshal context for Value ↔ C conversions
///
/// Tracks allocated strings for proper cleanup.
///
/// # Example
///
/// ```
/// # use apibind_runtime::ffi::{MarshalContext, CanonicalType, CValue, TextEncoding};
/// # use apibind_runtime::Value;
/// let mut ctx = MarshalContext::new(TextEncoding::Ansi);
///
/// let c_value = ctx.to_c(&Value::Int(42), CanonicalType::Int32).unwrap();
/// assert_eq!(c_value, CValue::I32(42));
///
/// let value = unsafe { ctx.from_c(&c_value, CanonicalType::Int32) };
/// assert_eq!(value, Value::Int(42));
/// ```
pub struct MarshalContext {
    encoding: TextEncoding,
    allocated_strings: Vec<CString>,
    allocated_wide: Vec<Vec<u16>>,
}

impl MarshalContext {
    /// Create a new marshal context using `encoding` for text
    pub fn new(encoding: TextEncoding) -> Self {
        Self {
            encoding,
            allocated_strings: Vec::new(),
            allocated_wide: Vec::new(),
        }
    }

    /// Text encoding used for strings
    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    /// Marshal a value to the declared C type
    pub fn to_c(&mut self, value: &Value, target: CanonicalType) -> Result<CValue, MarshalError> {
        use CanonicalType::*;

        match target {
            Void => Err(MarshalError::TypeMismatch {
                expected: "no value (void parameter)".to_string(),
                got: value.type_name().to_string(),
            }),

            Pointer | Handle | Callback | String => match value {
                Value::String(s) if target != Handle && target != Callback => {
                    Ok(CValue::Ptr(self.alloc_text(s)?))
                }
                other => other
                    .as_pointer()
                    .map(CValue::Ptr)
                    .ok_or_else(|| mismatch(target, other)),
            },

            _ => {
                let n = match value {
                    Value::Null => 0,
                    other => other.as_int().ok_or_else(|| mismatch(target, other))?,
                };
                if !fits(n, target.bits()) {
                    return Err(MarshalError::NumberOutOfRange {
                        value: n,
                        target: target.name().to_string(),
                    });
                }
                Ok(match target {
                    Int8 => CValue::I8(n as i8),
                    UInt8 => CValue::U8(n as u8),
                    Int16 => CValue::I16(n as i16),
                    UInt16 => CValue::U16(n as u16),
                    Int32 => CValue::I32(n as i32),
                    UInt32 => CValue::U32(n as u32),
                    Int64 => CValue::I64(n),
                    UInt64 => CValue::U64(n as u64),
                    IntPtr => CValue::ISize(n as isize),
                    _ => CValue::USize(n as usize),
                })
            }
        }
    }

    /// Marshal a native result back to a value
    ///
    /// Integers widen to `Value::Int`; addresses become `Value::Pointer`;
    /// string results are copied out (a null pointer becomes `Value::Null`).
    ///
    /// # Safety
    ///
    /// For `CanonicalType::String` results the address must be null or point
    /// to a null-terminated string in this context's encoding.
    pub unsafe fn from_c(&self, c_value: &CValue, ty: CanonicalType) -> Value {
        match (ty, c_value) {
            (CanonicalType::Void, _) | (_, CValue::Void) => Value::Null,
            (CanonicalType::String, CValue::Ptr(0)) => Value::Null,
            (CanonicalType::String, CValue::Ptr(addr)) => match self.encoding {
                TextEncoding::Ansi => {
                    let c_str = CStr::from_ptr(*addr as *const c_char);
                    Value::string(c_str.to_string_lossy())
                }
                TextEncoding::Wide => Value::string(read_wide_cstr(*addr as *const u16)),
            },
            (CanonicalType::Pointer | CanonicalType::Handle | CanonicalType::Callback, v) => {
                Value::Pointer(v.bits() as usize)
            }
            (_, CValue::I8(v)) => Value::Int(*v as i64),
            (_, CValue::U8(v)) => Value::Int(*v as i64),
            (_, CValue::I16(v)) => Value::Int(*v as i64),
            (_, CValue::U16(v)) => Value::Int(*v as i64),
            (_, CValue::I32(v)) => Value::Int(*v as i64),
            (_, CValue::U32(v)) => Value::Int(*v as i64),
            (_, CValue::I64(v)) => Value::Int(*v),
            (_, CValue::U64(v)) => Value::Int(*v as i64),
            (_, CValue::ISize(v)) => Value::Int(*v as i64),
            (_, CValue::USize(v)) => Value::Int(*v as i64),
            (_, CValue::Ptr(v)) => Value::Pointer(*v),
        }
    }

    /// Allocate a null-terminated copy of `text` and return its address
    fn alloc_text(&mut self, text: &str) -> Result<usize, MarshalError> {
        match self.encoding {
            TextEncoding::Ansi => {
                let c_string = CString::new(text).map_err(|e| {
                    MarshalError::InvalidString(format!("String contains null byte: {}", e))
                })?;
                let ptr = c_string.as_ptr() as usize;
                self.allocated_strings.push(c_string);
                Ok(ptr)
            }
            TextEncoding::Wide => {
                if text.contains('\0') {
                    return Err(MarshalError::InvalidString(
                        "String contains null character".to_string(),
                    ));
                }
                let wide: Vec<u16> = text.encode_utf16().chain(std::iter::once(0)).collect();
                let ptr = wide.as_ptr() as usize;
                self.allocated_wide.push(wide);
                Ok(ptr)
            }
        }
    }

    /// Number of strings kept alive by this context
    pub fn allocated_count(&self) -> usize {
        self.allocated_strings.len() + self.allocated_wide.len()
    }
}

fn mismatch(target: CanonicalType, value: &Value) -> MarshalError {
    MarshalError::TypeMismatch {
        expected: target.name().to_string(),
        got: value.type_name().to_string(),
    }
}

/// Read a null-terminated UTF-16 string
///
/// # Safety
///
/// `ptr` must be non-null and point to a null-terminated UTF-16 sequence.
unsafe fn read_wide_cstr(ptr: *const u16) -> String {
    let mut len = 0;
    while *ptr.add(len) != 0 {
        len += 1;
    }
    String::from_utf16_lossy(std::slice::from_raw_parts(ptr, len))
}
