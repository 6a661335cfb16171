//! Native calls through libffi
//!
//! A `RawFunction` is the raw entry of a declaration: it takes exactly the
//! declared number of arguments, marshals them per the descriptor, calls the
//! export with the declared convention, and returns the native result
//! unmodified (beyond widening into a `Value`).

use crate::binding::arity::ArityGuard;
use crate::binding::BindingDescriptor;
use crate::error::{BindError, BindResult};
use crate::ffi::marshal::{CValue, MarshalContext};
use crate::ffi::types::{CallingConvention, CanonicalType};
use crate::value::Value;
use libffi::middle::{Arg, Cif, CodePtr, Type};
use std::ffi::c_void;
use std::sync::Arc;
use tracing::trace;

/// libffi type of a canonical type
pub(crate) fn ffi_type(ty: CanonicalType) -> Type {
    match ty {
        CanonicalType::Int8 => Type::i8(),
        CanonicalType::UInt8 => Type::u8(),
        CanonicalType::Int16 => Type::i16(),
        CanonicalType::UInt16 => Type::u16(),
        CanonicalType::Int32 => Type::i32(),
        CanonicalType::UInt32 => Type::u32(),
        CanonicalType::Int64 => Type::i64(),
        CanonicalType::UInt64 => Type::u64(),
        CanonicalType::IntPtr => Type::isize(),
        CanonicalType::UIntPtr => Type::usize(),
        CanonicalType::Pointer
        | CanonicalType::Handle
        | CanonicalType::String
        | CanonicalType::Callback => Type::pointer(),
        CanonicalType::Void => Type::void(),
    }
}

/// Call interface for a signature
///
/// Only 32-bit Windows distinguishes the system convention from C.
pub(crate) fn build_cif(
    params: &[CanonicalType],
    returns: CanonicalType,
    convention: CallingConvention,
) -> Cif {
    #[allow(unused_mut)]
    let mut cif = Cif::new(params.iter().map(|ty| ffi_type(*ty)), ffi_type(returns));

    #[cfg(all(windows, target_arch = "x86"))]
    if convention == CallingConvention::System {
        cif.set_abi(libffi::raw::ffi_abi_FFI_STDCALL);
    }
    #[cfg(not(all(windows, target_arch = "x86")))]
    let _ = convention;

    cif
}

/// Perform the native call
///
/// Results narrower than a machine word are read through a word-sized slot,
/// which is how libffi reports them.
///
/// # Safety
///
/// `address` must be a function with exactly this signature and convention.
unsafe fn invoke(
    address: usize,
    params: &[CanonicalType],
    returns: CanonicalType,
    convention: CallingConvention,
    args: &[CValue],
) -> CValue {
    let cif = build_cif(params, returns, convention);
    let code = CodePtr::from_ptr(address as *const c_void);
    let ffi_args: Vec<Arg> = args.iter().map(CValue::as_arg).collect();

    match returns {
        CanonicalType::Void => {
            cif.call::<()>(code, &ffi_args);
            CValue::Void
        }
        CanonicalType::Int64 => CValue::I64(cif.call::<i64>(code, &ffi_args)),
        CanonicalType::UInt64 => CValue::U64(cif.call::<u64>(code, &ffi_args)),
        narrow => {
            let word = cif.call::<usize>(code, &ffi_args);
            match narrow {
                CanonicalType::Int8 => CValue::I8(word as i8),
                CanonicalType::UInt8 => CValue::U8(word as u8),
                CanonicalType::Int16 => CValue::I16(word as i16),
                CanonicalType::UInt16 => CValue::U16(word as u16),
                CanonicalType::Int32 => CValue::I32(word as i32),
                CanonicalType::UInt32 => CValue::U32(word as u32),
                CanonicalType::IntPtr => CValue::ISize(word as isize),
                CanonicalType::UIntPtr => CValue::USize(word),
                _ => CValue::Ptr(word),
            }
        }
    }
}

/// Raw entry of a declared function
#[derive(Debug, Clone)]
pub struct RawFunction {
    descriptor: Arc<BindingDescriptor>,
}

impl RawFunction {
    /// Wrap a descriptor as a callable
    ///
    /// # Safety
    ///
    /// The descriptor's address must point to a function whose real
    /// signature and convention match the descriptor. The descriptor's
    /// symbol source keeps the owning library loaded.
    pub unsafe fn new(descriptor: Arc<BindingDescriptor>) -> Self {
        Self { descriptor }
    }

    pub fn descriptor(&self) -> &Arc<BindingDescriptor> {
        &self.descriptor
    }

    /// Canonical name of the function
    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    /// Call with exactly the declared number of arguments
    pub fn call(&self, args: &[Value]) -> BindResult<Value> {
        let d = &self.descriptor;
        ArityGuard::check(d.name(), d.params().len(), 0, args.len())?;

        let mut ctx = MarshalContext::new(d.encoding());
        let c_args = args
            .iter()
            .zip(d.params())
            .map(|(value, ty)| ctx.to_c(value, *ty))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| BindError::Marshal {
                function: d.name().to_string(),
                source,
            })?;

        trace!(function = d.name(), symbol = d.effective_name(), ?c_args, "native call");
        // The signature contract was accepted in `RawFunction::new`.
        let result = unsafe {
            invoke(
                d.address(),
                d.params(),
                d.returns(),
                d.convention(),
                &c_args,
            )
        };
        trace!(function = d.name(), ?result, "native return");

        // String results were produced by the callee in the descriptor's encoding.
        Ok(unsafe { ctx.from_c(&result, d.returns()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ffi::loader::ExportTable;
    use crate::ffi::resolver::ResolvedSymbol;

    extern "system" fn add(a: i32, b: i32) -> i32 {
        a + b
    }

    extern "system" fn negate_byte(a: i8) -> i8 {
        -a
    }

    extern "system" fn wide(a: i64) -> i64 {
        a * 3
    }

    extern "system" fn unit(_handle: *const c_void) {}

    fn raw(
        name: &str,
        address: *const (),
        params: Vec<CanonicalType>,
        returns: CanonicalType,
    ) -> RawFunction {
        let descriptor = BindingDescriptor::new(
            name.to_string(),
            params,
            returns,
            CallingConvention::System,
            vec!["test".to_string()],
            ResolvedSymbol {
                effective_name: name.to_string(),
                address: address as usize,
                source: Arc::new(ExportTable::new("test").with(name, address)),
            },
            64,
        );
        unsafe { RawFunction::new(Arc::new(descriptor)) }
    }

    #[test]
    fn test_call_int32() {
        let f = raw(
            "Add",
            add as *const (),
            vec![CanonicalType::Int32, CanonicalType::Int32],
            CanonicalType::Int32,
        );
        assert_eq!(f.call(&[Value::Int(2), Value::Int(40)]), Ok(Value::Int(42)));
        assert_eq!(f.call(&[Value::Int(-2), Value::Int(1)]), Ok(Value::Int(-1)));
    }

    #[test]
    fn test_call_narrow_signed_result() {
        let f = raw(
            "NegateByte",
            negate_byte as *const (),
            vec![CanonicalType::Int8],
            CanonicalType::Int8,
        );
        assert_eq!(f.call(&[Value::Int(5)]), Ok(Value::Int(-5)));
    }

    #[test]
    fn test_call_int64() {
        let f = raw(
            "Wide",
            wide as *const (),
            vec![CanonicalType::Int64],
            CanonicalType::Int64,
        );
        assert_eq!(
            f.call(&[Value::Int(1 << 40)]),
            Ok(Value::Int(3 << 40))
        );
    }

    #[test]
    fn test_call_void() {
        let f = raw(
            "Unit",
            unit as *const (),
            vec![CanonicalType::Handle],
            CanonicalType::Void,
        );
        assert_eq!(f.call(&[Value::Pointer(0)]), Ok(Value::Null));
    }

    #[test]
    fn test_raw_call_requires_exact_arity() {
        let f = raw(
            "Add",
            add as *const (),
            vec![CanonicalType::Int32, CanonicalType::Int32],
            CanonicalType::Int32,
        );
        let err = f.call(&[Value::Int(1)]).unwrap_err();
        assert_eq!(
            err,
            BindError::ArgumentCount {
                function: "Add".to_string(),
                expected: 2,
                actual: 1,
            }
        );
    }

    #[test]
    fn test_marshal_failure_names_function() {
        let f = raw(
            "Add",
            add as *const (),
            vec![CanonicalType::Int32, CanonicalType::Int32],
            CanonicalType::Int32,
        );
        let err = f.call(&[Value::string("x"), Value::Int(1)]).unwrap_err();
        assert!(matches!(err, BindError::Marshal { ref function, .. } if function == "Add"));
    }
}
