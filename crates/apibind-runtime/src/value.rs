//! Call-site value representation
//!
//! Values flowing through raw and adapted entry points:
//! - Int, Bool, Null: immediate values
//! - Pointer: raw address (handles, buffers, callback code pointers)
//! - String: reference-counted, immutable text
//! - Array: results collected by enumeration adapters
//!
//! `Null` doubles as the "absent" result produced by nullable coercion and
//! by adapters whose native call reported failure.

use std::fmt;
use std::sync::Arc;

/// Runtime value passed to and returned from bound functions
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    /// Absent value
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value (every native integer width widens to i64)
    Int(i64),
    /// Raw address
    Pointer(usize),
    /// Text value
    String(Arc<str>),
    /// Ordered list of values
    Array(Vec<Value>),
}

impl Value {
    /// Create a new string value
    pub fn string(s: impl AsRef<str>) -> Self {
        Value::String(Arc::from(s.as_ref()))
    }

    /// Create a new array value
    pub fn array(values: Vec<Value>) -> Self {
        Value::Array(values)
    }

    /// Get the type name of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Pointer(_) => "pointer",
            Value::String(_) => "string",
            Value::Array(_) => "array",
        }
    }

    /// Check if this value is truthy
    ///
    /// Native conventions: null, `false`, zero and the null pointer are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Pointer(p) => *p != 0,
            Value::String(_) | Value::Array(_) => true,
        }
    }

    /// True for a numeric zero (integer zero or null pointer)
    pub fn is_zero(&self) -> bool {
        matches!(self, Value::Int(0) | Value::Pointer(0))
    }

    /// True for the absent value
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Integer view of numeric values
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Pointer(p) => Some(*p as i64),
            Value::Bool(b) => Some(*b as i64),
            _ => None,
        }
    }

    /// Address view of pointer-like values
    pub fn as_pointer(&self) -> Option<usize> {
        match self {
            Value::Pointer(p) => Some(*p),
            Value::Int(n) => Some(*n as usize),
            Value::Null => Some(0),
            _ => None,
        }
    }

    /// Text view of string values
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Element view of array values
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Pointer(p) => write!(f, "{:#x}", p),
            Value::String(s) => write!(f, "{}", s),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n as i64)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Int(n as i64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Arc::from(s))
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::Null)
    }
}
