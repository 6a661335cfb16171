//! Native call infrastructure
//!
//! - `types`: canonical types and the alias table
//! - `loader` / `resolver`: libraries and export-name resolution
//! - `marshal` / `caller`: value conversion and libffi calls
//! - `callbacks`: native-callable trampolines around closures
//! - `buffer`: caller-owned output storage
//!
//! # Safety
//!
//! Everything here eventually executes foreign code. Unsafe code is kept in
//! this module; the signature contract is accepted once, when a
//! `RawFunction` is created.

pub mod buffer;
pub mod callbacks;
pub mod caller;
pub mod loader;
pub mod marshal;
pub mod resolver;
pub mod types;

pub use buffer::{CountSlot, TextBuffer};
pub use callbacks::{CallbackDescriptor, CallbackError, CallbackHandle};
pub use caller::RawFunction;
pub use loader::{ExportTable, LibraryLoader, LoadError, LoadedLibrary, SymbolSource};
pub use marshal::{CValue, MarshalContext, MarshalError};
pub use resolver::{
    candidate_names, resolve as resolve_symbol, resolve_in, ResolvedSymbol, ANSI_SUFFIX,
    WIDE_SUFFIX,
};
pub use types::{resolve, CallingConvention, CanonicalType, TextEncoding, TypeToken};
