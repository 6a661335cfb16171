//! FFI type system - canonical ABI types and the type alias table
//!
//! Defines:
//! - `CanonicalType`: the ABI-level types a binding can carry
//! - `TypeToken`: what declarations write (short codes, Win32 aliases, or canonical types)
//! - `resolve`: the alias table lookup (pure data, never fails)
//!
//! Short codes follow the classic Win32 binding conventions:
//! - `I`, `L` → Int32
//! - `N` → UInt32
//! - `P` → Pointer
//! - `S` → String
//! - `V` → Void
//! - `K` → Callback

use std::fmt;
use std::str::FromStr;

/// ABI types a bound function signature is built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalType {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    /// Pointer-width signed integer (LPARAM, LRESULT)
    IntPtr,
    /// Pointer-width unsigned integer (WPARAM, SIZE_T)
    UIntPtr,
    /// Untyped address (buffers, structures)
    Pointer,
    /// Opaque OS handle
    Handle,
    /// Null-terminated text pointer
    String,
    /// No value
    Void,
    /// Code pointer to a callback
    Callback,
}

impl CanonicalType {
    /// Every canonical type, in declaration order
    pub const ALL: [CanonicalType; 15] = [
        CanonicalType::Int8,
        CanonicalType::UInt8,
        CanonicalType::Int16,
        CanonicalType::UInt16,
        CanonicalType::Int32,
        CanonicalType::UInt32,
        CanonicalType::Int64,
        CanonicalType::UInt64,
        CanonicalType::IntPtr,
        CanonicalType::UIntPtr,
        CanonicalType::Pointer,
        CanonicalType::Handle,
        CanonicalType::String,
        CanonicalType::Void,
        CanonicalType::Callback,
    ];

    /// Canonical spelling, accepted back by `FromStr`
    pub fn name(&self) -> &'static str {
        match self {
            CanonicalType::Int8 => "int8",
            CanonicalType::UInt8 => "uint8",
            CanonicalType::Int16 => "int16",
            CanonicalType::UInt16 => "uint16",
            CanonicalType::Int32 => "int32",
            CanonicalType::UInt32 => "uint32",
            CanonicalType::Int64 => "int64",
            CanonicalType::UInt64 => "uint64",
            CanonicalType::IntPtr => "intptr",
            CanonicalType::UIntPtr => "uintptr",
            CanonicalType::Pointer => "pointer",
            CanonicalType::Handle => "handle",
            CanonicalType::String => "string",
            CanonicalType::Void => "void",
            CanonicalType::Callback => "callback",
        }
    }

    /// Width in bits of integer types (pointer width for pointer-like types)
    pub fn bits(&self) -> u32 {
        match self {
            CanonicalType::Int8 | CanonicalType::UInt8 => 8,
            CanonicalType::Int16 | CanonicalType::UInt16 => 16,
            CanonicalType::Int32 | CanonicalType::UInt32 => 32,
            CanonicalType::Int64 | CanonicalType::UInt64 => 64,
            CanonicalType::Void => 0,
            _ => usize::BITS,
        }
    }
}

impl fmt::Display for CanonicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CanonicalType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CanonicalType::ALL
            .iter()
            .copied()
            .find(|ty| ty.name() == s)
            .ok_or_else(|| format!("unknown canonical type '{}'", s))
    }
}

/// Symbolic type identifier supplied by a declaration
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeToken {
    /// Already canonical
    Canonical(CanonicalType),
    /// Short code or named alias, resolved through the alias table
    Symbol(String),
}

impl TypeToken {
    /// The canonical type, if this token is (or resolves to) one
    pub fn canonical(&self) -> Option<CanonicalType> {
        match resolve(self) {
            TypeToken::Canonical(ty) => Some(ty),
            TypeToken::Symbol(_) => None,
        }
    }
}

impl fmt::Display for TypeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeToken::Canonical(ty) => write!(f, "{}", ty),
            TypeToken::Symbol(s) => f.write_str(s),
        }
    }
}

impl From<CanonicalType> for TypeToken {
    fn from(ty: CanonicalType) -> Self {
        TypeToken::Canonical(ty)
    }
}

impl From<&str> for TypeToken {
    fn from(s: &str) -> Self {
        TypeToken::Symbol(s.to_string())
    }
}

impl From<String> for TypeToken {
    fn from(s: String) -> Self {
        TypeToken::Symbol(s)
    }
}

impl From<char> for TypeToken {
    fn from(c: char) -> Self {
        TypeToken::Symbol(c.to_string())
    }
}

/// Resolve a token through the alias table
///
/// Aliases and canonical spellings become `TypeToken::Canonical`; canonical
/// tokens and unknown symbols are returned unchanged.
///
/// # Examples
///
/// ```
/// # use apibind_runtime::ffi::{resolve, CanonicalType, TypeToken};
/// assert_eq!(resolve(&"HWND".into()), TypeToken::Canonical(CanonicalType::Handle));
/// assert_eq!(resolve(&"uint32".into()), TypeToken::Canonical(CanonicalType::UInt32));
/// assert_eq!(resolve(&"MYSTERY".into()), TypeToken::Symbol("MYSTERY".to_string()));
/// ```
pub fn resolve(token: &TypeToken) -> TypeToken {
    match token {
        TypeToken::Canonical(_) => token.clone(),
        TypeToken::Symbol(symbol) => alias(symbol)
            .or_else(|| symbol.parse::<CanonicalType>().ok())
            .map(TypeToken::Canonical)
            .unwrap_or_else(|| token.clone()),
    }
}

/// The alias table
fn alias(symbol: &str) -> Option<CanonicalType> {
    use CanonicalType::*;

    let ty = match symbol {
        // Short codes
        "I" | "L" | "i" | "l" => Int32,
        "N" | "n" => UInt32,
        "P" | "p" => Pointer,
        "S" | "s" => String,
        "V" | "v" => Void,
        "K" | "k" => Callback,
        "B" | "b" => UInt8,
        "Q" | "q" => Int64,

        // Integers
        "BOOL" | "INT" | "LONG" | "HRESULT" => Int32,
        "UINT" | "ULONG" | "DWORD" | "COLORREF" | "LCID" => UInt32,
        "WORD" | "USHORT" | "ATOM" | "WCHAR" | "LANGID" => UInt16,
        "SHORT" => Int16,
        "BYTE" | "UCHAR" | "BOOLEAN" => UInt8,
        "CHAR" => Int8,
        "LONGLONG" | "INT64" => Int64,
        "ULONGLONG" | "UINT64" | "DWORD64" => UInt64,
        "LPARAM" | "LRESULT" | "INT_PTR" | "LONG_PTR" => IntPtr,
        "WPARAM" | "UINT_PTR" | "ULONG_PTR" | "DWORD_PTR" | "SIZE_T" => UIntPtr,

        // Handles
        "HANDLE" | "HWND" | "HMENU" | "HDC" | "HINSTANCE" | "HMODULE" | "HICON"
        | "HCURSOR" | "HBRUSH" | "HBITMAP" | "HFONT" | "HGDIOBJ" | "HKEY" | "HGLOBAL"
        | "HCONV" | "HCONVLIST" | "HSZ" | "HDDEDATA" | "HHOOK" | "HMONITOR" => Handle,

        // Text
        "LPSTR" | "LPCSTR" | "LPWSTR" | "LPCWSTR" | "LPTSTR" | "LPCTSTR" => String,

        // Memory
        "LPVOID" | "LPCVOID" | "PVOID" | "LPDWORD" | "LPLONG" | "LPRECT" | "LPPOINT"
        | "LPMSG" | "LPBYTE" => Pointer,

        // Code
        "WNDENUMPROC" | "WNDPROC" | "HOOKPROC" | "TIMERPROC" | "PFNCALLBACK" | "CALLBACK" => {
            Callback
        }

        "VOID" => Void,

        _ => return None,
    };

    Some(ty)
}

/// Calling convention of a bound function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CallingConvention {
    /// The platform's system-call convention (stdcall on 32-bit Windows)
    #[default]
    System,
    /// The C convention
    C,
}

impl FromStr for CallingConvention {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" | "stdcall" => Ok(CallingConvention::System),
            "c" | "cdecl" => Ok(CallingConvention::C),
            _ => Err(format!("unknown calling convention '{}'", s)),
        }
    }
}

/// Text representation used for string arguments and buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextEncoding {
    /// Single-byte text (the `A` export family)
    #[default]
    Ansi,
    /// UTF-16 text (the `W` export family)
    Wide,
}

impl TextEncoding {
    /// Encoding implied by an exported symbol name
    pub fn for_symbol(symbol: &str) -> Self {
        if symbol.ends_with(crate::ffi::resolver::WIDE_SUFFIX) {
            TextEncoding::Wide
        } else {
            TextEncoding::Ansi
        }
    }

    /// Bytes per character unit
    pub fn unit_size(&self) -> usize {
        match self {
            TextEncoding::Ansi => 1,
            TextEncoding::Wide => 2,
        }
    }
}
