//! Callback-collecting enumeration
//!
//! `EnumWindows`-style functions take a visitor callback and usually a
//! trailing context value. The adapter supplies a fresh visitor per call
//! that records each visited item (the callback's first argument) and lets
//! an optional block stop the enumeration early. A panic in the block stops
//! the enumeration and is resumed once the native call has returned.

use crate::binding::{ArityGuard, Block, Procedure};
use crate::error::{BindError, BindResult};
use crate::ffi::callbacks::{CallbackDescriptor, CallbackError};
use crate::ffi::caller::RawFunction;
use crate::value::Value;
use std::cell::RefCell;
use std::panic::resume_unwind;
use std::sync::Arc;
use tracing::trace;

/// Enumeration through a synthesized `callback`
///
/// The callback is inserted at the function's first `callback` parameter.
/// If that parameter is followed by a context value, the caller may omit it
/// and zero is passed. With a block, the block sees every item and a falsy
/// answer stops the enumeration. A zero native result yields `Value::Null`;
/// otherwise the collected items are returned as an array.
pub fn enumeration(callback: CallbackDescriptor) -> Procedure {
    Arc::new(
        move |raw: &RawFunction, args: &[Value], block: Option<&Block<'_>>| -> BindResult<Value> {
            let d = raw.descriptor();
            let declared = d.params().len();
            let position = d.callback_position().ok_or_else(|| BindError::Callback {
                function: d.name().to_string(),
                source: CallbackError::UnsupportedSignature(
                    "no callback parameter to enumerate with".to_string(),
                ),
            })?;

            let has_context = position + 1 < declared;
            if has_context {
                ArityGuard::check_range(d.name(), declared - 2, declared - 1, args.len())?;
            } else {
                ArityGuard::check(d.name(), declared, 1, args.len())?;
            }

            let items = RefCell::new(Vec::new());
            let visitor = callback.instantiate(|cb_args: &[Value]| {
                let item = cb_args.first().cloned().unwrap_or(Value::Null);
                trace!(function = d.name(), item = %item, "enumerated");
                items.borrow_mut().push(item.clone());
                match block {
                    Some(block) => Value::Bool(block(&item).is_truthy()),
                    None => Value::Bool(true),
                }
            });

            let mut call_args = Vec::with_capacity(declared);
            call_args.extend_from_slice(&args[..position]);
            call_args.push(visitor.as_value());
            call_args.extend_from_slice(&args[position..]);
            if call_args.len() < declared {
                call_args.push(Value::Int(0));
            }

            let status = raw.call(&call_args);
            if let Some(payload) = visitor.take_panic() {
                resume_unwind(payload);
            }
            let status = status?;
            drop(visitor);

            if status.is_truthy() {
                Ok(Value::array(items.into_inner()))
            } else {
                Ok(Value::Null)
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{Declaration, Registry};
    use crate::ffi::loader::ExportTable;
    use pretty_assertions::assert_eq;

    type Visitor = extern "system" fn(usize, isize) -> i32;

    extern "system" fn enum_items(visit: Visitor, context: isize) -> i32 {
        for item in [10, 20, 30] {
            if visit(item, context) == 0 {
                break;
            }
        }
        1
    }

    extern "system" fn enum_children(parent: usize, visit: Visitor, context: isize) -> i32 {
        visit(parent + 1, context);
        visit(parent + 2, context);
        1
    }

    extern "system" fn enum_context(visit: Visitor, context: isize) -> i32 {
        visit(context as usize, context);
        1
    }

    extern "system" fn enum_failing(_visit: Visitor, _context: isize) -> i32 {
        0
    }

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry.set_default_libraries(["host"]);
        registry.register_library(
            ExportTable::new("host")
                .with("EnumItems", enum_items as *const ())
                .with("EnumChildren", enum_children as *const ())
                .with("EnumContext", enum_context as *const ())
                .with("EnumFailing", enum_failing as *const ()),
        );
        registry
    }

    fn visitor() -> CallbackDescriptor {
        CallbackDescriptor::new(["HWND", "LPARAM"], "BOOL").unwrap()
    }

    fn declare(registry: &mut Registry, name: &str, params: &[&str]) {
        registry
            .declare(
                Declaration::new(name, params.iter().copied(), "BOOL")
                    .adapt_with(enumeration(visitor())),
            )
            .unwrap();
    }

    fn pointers(items: &[usize]) -> Value {
        Value::array(items.iter().map(|p| Value::Pointer(*p)).collect())
    }

    #[test]
    fn test_collects_items_in_order() {
        let mut registry = registry();
        declare(&mut registry, "EnumItems", &["K", "LPARAM"]);
        assert_eq!(registry.call("enum_items", &[]), Ok(pointers(&[10, 20, 30])));
    }

    #[test]
    fn test_block_stops_enumeration() {
        let mut registry = registry();
        declare(&mut registry, "EnumItems", &["K", "LPARAM"]);
        let below_20 = |item: &Value| Value::Bool(item.as_pointer().unwrap_or(0) < 20);
        assert_eq!(
            registry.call_with("enum_items", &[], &below_20),
            Ok(pointers(&[10, 20]))
        );
    }

    #[test]
    fn test_callback_inserted_at_declared_position() {
        let mut registry = registry();
        declare(&mut registry, "EnumChildren", &["HWND", "K", "LPARAM"]);
        assert_eq!(
            registry.call("enum_children", &[Value::Pointer(100)]),
            Ok(pointers(&[101, 102]))
        );
    }

    #[test]
    fn test_context_value_passed_through() {
        let mut registry = registry();
        declare(&mut registry, "EnumContext", &["K", "LPARAM"]);
        assert_eq!(
            registry.call("enum_context", &[Value::Int(77)]),
            Ok(pointers(&[77]))
        );
        assert_eq!(registry.call("enum_context", &[]), Ok(pointers(&[0])));
    }

    #[test]
    fn test_failure_is_null() {
        let mut registry = registry();
        declare(&mut registry, "EnumFailing", &["K", "LPARAM"]);
        assert_eq!(registry.call("enum_failing", &[]), Ok(Value::Null));
    }

    #[test]
    fn test_too_many_arguments() {
        let mut registry = registry();
        declare(&mut registry, "EnumItems", &["K", "LPARAM"]);
        let err = registry
            .call("enum_items", &[Value::Int(1), Value::Int(2)])
            .unwrap_err();
        assert!(matches!(err, BindError::ArgumentCount { expected: 1, actual: 2, .. }));
    }

    #[test]
    fn test_missing_callback_parameter() {
        let mut registry = registry();
        declare(&mut registry, "EnumItems", &["P", "LPARAM"]);
        assert!(matches!(
            registry.call("enum_items", &[]),
            Err(BindError::Callback { .. })
        ));
    }

    #[test]
    fn test_block_panic_reaches_caller() {
        let mut registry = registry();
        declare(&mut registry, "EnumItems", &["K", "LPARAM"]);

        let failing = |_: &Value| -> Value { panic!("block failed") };
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            registry.call_with("enum_items", &[], &failing)
        }));
        let payload = outcome.unwrap_err();
        assert_eq!(payload.downcast_ref::<&str>(), Some(&"block failed"));

        // The registry is still usable afterwards.
        assert_eq!(registry.call("enum_items", &[]), Ok(pointers(&[10, 20, 30])));
    }
}
