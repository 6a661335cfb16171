//! Binding against a real shared library
//!
//! Uses the system C library, which every Linux/glibc test host has.

#![cfg(all(target_os = "linux", target_env = "gnu"))]

use apibind_runtime::ffi::CallingConvention;
use apibind_runtime::{BindError, Declaration, Registry, Value};
use pretty_assertions::assert_eq;
use std::sync::Arc;

const LIBC: &str = "libc.so.6";

fn libc_registry() -> Registry {
    let mut registry = Registry::new();
    registry.set_default_libraries([LIBC]);
    registry
}

fn cdecl(name: &str, params: &[&str], returns: &str) -> Declaration {
    Declaration::new(name, params.iter().copied(), returns).convention(CallingConvention::C)
}

#[test]
fn test_call_abs() {
    let mut registry = libc_registry();
    let descriptor = registry.declare(cdecl("abs", &["I"], "I")).unwrap().unwrap();

    assert_eq!(descriptor.library(), LIBC);
    assert_eq!(descriptor.effective_name(), "abs");
    assert_eq!(registry.call("abs", &[Value::Int(-42)]), Ok(Value::Int(42)));
}

#[test]
fn test_adapted_entry_outlives_registry() {
    let mut registry = libc_registry();
    registry
        .declare(cdecl("abs", &["I"], "I").rename("absolute"))
        .unwrap();
    let method = Arc::clone(registry.adapted("absolute").unwrap());
    let raw = registry.raw("abs").cloned().unwrap();

    drop(registry);
    assert_eq!(method.call(&[Value::Int(-7)], None), Ok(Value::Int(7)));
    assert_eq!(raw.call(&[Value::Int(-8)]), Ok(Value::Int(8)));
}

#[test]
fn test_string_argument() {
    let mut registry = libc_registry();
    registry.declare(cdecl("strlen", &["S"], "SIZE_T")).unwrap();
    assert_eq!(
        registry.call("strlen", &[Value::string("hello")]),
        Ok(Value::Int(5))
    );
}

#[test]
fn test_string_result_and_null() {
    let mut registry = libc_registry();
    registry.declare(cdecl("getenv", &["S"], "S")).unwrap();

    assert_eq!(
        registry.call("getenv", &[Value::string("APIBIND_SURELY_UNSET_VARIABLE")]),
        Ok(Value::Null)
    );
    let path = registry.call("getenv", &[Value::string("PATH")]).unwrap();
    assert_eq!(path.as_str().map(str::to_string), std::env::var("PATH").ok());
}

#[test]
fn test_missing_export() {
    let mut registry = libc_registry();
    let err = registry
        .declare(cdecl("NoSuchFunction", &["I"], "I"))
        .unwrap_err();
    assert_eq!(
        err,
        BindError::SymbolNotFound {
            function: "NoSuchFunction".to_string(),
            libraries: vec![LIBC.to_string()],
        }
    );
}
