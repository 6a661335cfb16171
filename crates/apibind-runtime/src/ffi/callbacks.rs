//! Native callbacks - let native code call back into Rust closures
//!
//! A `CallbackDescriptor` describes the native signature. Instantiating it
//! with a closure yields a `CallbackHandle` whose code pointer can be passed
//! wherever a `callback` parameter is declared. The trampoline behind the
//! pointer unmarshals the native arguments, runs the closure, and marshals
//! its result back. A panic in the closure never unwinds through native
//! frames: the trampoline answers zero and the handle keeps the payload for
//! the caller to resume once the native call has returned.

use crate::ffi::caller::build_cif;
use crate::ffi::types::{resolve, CallingConvention, CanonicalType, TypeToken};
use crate::value::Value;
use libffi::low::ffi_cif;
use libffi::middle::Closure;
use std::any::Any;
use std::cell::Cell;
use std::ffi::c_void;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use thiserror::Error;
use tracing::error;

/// Errors that can occur during callback creation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CallbackError {
    /// A type token is not in the alias table
    #[error("Unknown callback type '{0}'")]
    UnresolvedType(String),
    /// The signature cannot be expressed by the trampoline
    #[error("Unsupported callback signature: {0}")]
    UnsupportedSignature(String),
}

/// Native signature of a callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackDescriptor {
    params: Vec<CanonicalType>,
    returns: CanonicalType,
    convention: CallingConvention,
}

impl CallbackDescriptor {
    /// Describe a callback from type tokens
    ///
    /// ```
    /// # use apibind_runtime::ffi::{CallbackDescriptor, CanonicalType};
    /// // BOOL CALLBACK EnumWindowsProc(HWND, LPARAM)
    /// let visitor = CallbackDescriptor::new(["HWND", "LPARAM"], "BOOL").unwrap();
    /// assert_eq!(visitor.params(), &[CanonicalType::Handle, CanonicalType::IntPtr]);
    /// ```
    pub fn new<I, T>(params: I, returns: impl Into<TypeToken>) -> Result<Self, CallbackError>
    where
        I: IntoIterator<Item = T>,
        T: Into<TypeToken>,
    {
        let params = params
            .into_iter()
            .map(|t| canonical(t.into()))
            .collect::<Result<Vec<_>, _>>()?;
        let returns = canonical(returns.into())?;

        if let Some(ty) = params.iter().find(|ty| **ty == CanonicalType::Void) {
            return Err(CallbackError::UnsupportedSignature(format!(
                "parameter of type {}",
                ty
            )));
        }
        if returns == CanonicalType::String || returns.bits() > usize::BITS {
            return Err(CallbackError::UnsupportedSignature(format!(
                "return type {}",
                returns
            )));
        }

        Ok(Self {
            params,
            returns,
            convention: CallingConvention::System,
        })
    }

    /// Use a different calling convention
    pub fn with_convention(mut self, convention: CallingConvention) -> Self {
        self.convention = convention;
        self
    }

    pub fn params(&self) -> &[CanonicalType] {
        &self.params
    }

    pub fn returns(&self) -> CanonicalType {
        self.returns
    }

    pub fn convention(&self) -> CallingConvention {
        self.convention
    }

    /// Build a native trampoline running `body` for each invocation
    ///
    /// The handle borrows whatever `body` borrows, so it cannot outlive the
    /// call it was built for.
    pub fn instantiate<'a, F>(&self, body: F) -> CallbackHandle<'a>
    where
        F: Fn(&[Value]) -> Value + 'a,
    {
        CallbackHandle::new(self.clone(), Box::new(body))
    }
}

fn canonical(token: TypeToken) -> Result<CanonicalType, CallbackError> {
    let resolved = resolve(&token);
    resolved
        .canonical()
        .ok_or_else(|| CallbackError::UnresolvedType(resolved.to_string()))
}

type Body<'a> = Box<dyn Fn(&[Value]) -> Value + 'a>;

type PanicPayload = Box<dyn Any + Send>;

struct Userdata<'a> {
    descriptor: CallbackDescriptor,
    body: Body<'a>,
    /// First panic raised by `body`
    panic: Cell<Option<PanicPayload>>,
}

/// A live native callback
///
/// The code pointer stays valid for as long as the handle is alive.
pub struct CallbackHandle<'a> {
    // Declared before `userdata` so the closure is dropped first.
    closure: Closure<'a>,
    userdata: Box<Userdata<'a>>,
}

impl<'a> CallbackHandle<'a> {
    fn new(descriptor: CallbackDescriptor, body: Body<'a>) -> Self {
        let cif = build_cif(
            descriptor.params(),
            descriptor.returns(),
            descriptor.convention(),
        );
        let userdata = Box::new(Userdata {
            descriptor,
            body,
            panic: Cell::new(None),
        });
        // The box is owned by the handle and outlives the closure.
        let data: &'a Userdata<'a> = unsafe { &*(userdata.as_ref() as *const Userdata<'a>) };
        let closure = Closure::new(cif, trampoline, data);
        Self { closure, userdata }
    }

    /// Address native code can call
    pub fn code_ptr(&self) -> usize {
        *self.closure.code_ptr() as usize
    }

    /// Code pointer as a value for a `callback` parameter
    pub fn as_value(&self) -> Value {
        Value::Pointer(self.code_ptr())
    }

    pub fn descriptor(&self) -> &CallbackDescriptor {
        &self.userdata.descriptor
    }

    /// Take the payload of a panic raised by the body, if any
    ///
    /// Pass it to `std::panic::resume_unwind` after the native call returns.
    pub fn take_panic(&self) -> Option<Box<dyn Any + Send>> {
        self.userdata.panic.take()
    }
}

impl fmt::Debug for CallbackHandle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackHandle")
            .field("code_ptr", &format_args!("{:#x}", self.code_ptr()))
            .field("descriptor", &self.userdata.descriptor)
            .finish()
    }
}

/// Read one native argument
///
/// # Safety
///
/// `slot` must point to a value of type `ty`.
unsafe fn read_arg(slot: *const c_void, ty: CanonicalType) -> Value {
    match ty {
        CanonicalType::Int8 => Value::Int(*(slot as *const i8) as i64),
        CanonicalType::UInt8 => Value::Int(*(slot as *const u8) as i64),
        CanonicalType::Int16 => Value::Int(*(slot as *const i16) as i64),
        CanonicalType::UInt16 => Value::Int(*(slot as *const u16) as i64),
        CanonicalType::Int32 => Value::Int(*(slot as *const i32) as i64),
        CanonicalType::UInt32 => Value::Int(*(slot as *const u32) as i64),
        CanonicalType::Int64 => Value::Int(*(slot as *const i64)),
        CanonicalType::UInt64 => Value::Int(*(slot as *const u64) as i64),
        CanonicalType::IntPtr => Value::Int(*(slot as *const isize) as i64),
        CanonicalType::UIntPtr => Value::Int(*(slot as *const usize) as i64),
        CanonicalType::Pointer
        | CanonicalType::Handle
        | CanonicalType::String
        | CanonicalType::Callback => Value::Pointer(*(slot as *const usize)),
        CanonicalType::Void => Value::Null,
    }
}

/// Word written back to libffi for a callback result
///
/// Signed results are sign-extended to the full word.
fn encode_return(value: &Value, ty: CanonicalType) -> usize {
    if ty == CanonicalType::Void {
        return 0;
    }
    let n = match value {
        Value::Null => 0,
        Value::Bool(b) => *b as i64,
        other => other.as_int().unwrap_or(other.is_truthy() as i64),
    };
    match ty {
        CanonicalType::Int8 => n as i8 as isize as usize,
        CanonicalType::UInt8 => n as u8 as usize,
        CanonicalType::Int16 => n as i16 as isize as usize,
        CanonicalType::UInt16 => n as u16 as usize,
        CanonicalType::Int32 => n as i32 as isize as usize,
        CanonicalType::UInt32 => n as u32 as usize,
        _ => n as usize,
    }
}

unsafe extern "C" fn trampoline(
    _cif: &ffi_cif,
    result: &mut usize,
    args: *const *const c_void,
    userdata: &Userdata<'_>,
) {
    let values: Vec<Value> = userdata
        .descriptor
        .params()
        .iter()
        .enumerate()
        .map(|(i, ty)| read_arg(*args.add(i), *ty))
        .collect();

    // Unwinding into native frames is undefined; a panicking body answers zero.
    let value = match catch_unwind(AssertUnwindSafe(|| (userdata.body)(&values))) {
        Ok(value) => value,
        Err(payload) => {
            error!("callback body panicked; returning zero to native caller");
            let first = userdata.panic.take().unwrap_or(payload);
            userdata.panic.set(Some(first));
            Value::Int(0)
        }
    };
    *result = encode_return(&value, userdata.descriptor.returns());
}
