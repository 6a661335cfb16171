//! Reusable adaptation procedures
//!
//! Boolean and nullable-on-zero coercion are policies (`Coercion`); the
//! adapters here are procedures that synthesize trailing arguments and
//! interpret the native result. Each returns a `Procedure` for
//! `Declaration::adapt_with`.
//!
//! ```
//! use apibind_runtime::adapters;
//! use apibind_runtime::binding::Declaration;
//!
//! // int GetWindowText(HWND, LPSTR, int)
//! let decl = Declaration::new("GetWindowText", ["HWND", "LPSTR", "I"], "I")
//!     .adapt_with(adapters::string_return(Some(256), None));
//! # let _ = decl;
//! ```

mod enumeration;
mod string;

pub use enumeration::enumeration;
pub use string::{sized_string_return, string_return};
