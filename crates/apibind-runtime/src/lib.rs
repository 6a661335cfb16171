//! apibind runtime - binding engine for platform functions
//!
//! This library turns symbolic declarations of exported OS functions into
//! callable entries:
//! - Type tokens (`"L"`, `"HWND"`, `"LPSTR"`) resolved to canonical types
//! - Export-name resolution across `A`/`W` variants
//! - Raw entries under the exported name, adapted entries under snake_case
//!   names and aliases
//! - Reusable result adapters (coercions, string buffers, enumeration)

use std::sync::Once;

/// apibind runtime version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod adapters;
pub mod binding;
pub mod error;
pub mod ffi;
pub mod platform;
pub mod value;

pub use binding::{
    Adaptation, AdaptedMethod, ArityGuard, BindingDescriptor, Coercion, Declaration, Registry,
};
pub use error::{BindError, BindResult};
pub use ffi::{CallbackDescriptor, CanonicalType, ExportTable, RawFunction, TypeToken};
pub use value::Value;

static TRACING_INIT: Once = Once::new();

/// Install a tracing subscriber honoring `RUST_LOG`
///
/// Call this once at startup. Safe to call multiple times; does nothing when
/// `RUST_LOG` is unset. Enable with `RUST_LOG=apibind_runtime=debug` (or
/// `=trace` to see every export probe and native call).
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            // Another subscriber may already be installed by the host.
            let _ = tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .try_init();
        }
    });
}
