//! Binding and adaptation
//!
//! `Registry::declare` turns a `Declaration` into a frozen
//! `BindingDescriptor` and installs two kinds of entries:
//!
//! - the raw entry under the canonical name, and
//! - an `AdaptedMethod` under the derived snake_case name and every alias.

pub mod adaptation;
pub mod arity;
pub mod declaration;
pub mod descriptor;
pub mod naming;
pub mod registry;

pub use adaptation::{Adaptation, AdaptedMethod, Block, Coercion, Procedure};
pub use arity::ArityGuard;
pub use declaration::Declaration;
pub use descriptor::BindingDescriptor;
pub use naming::{derive, snake_case, DerivedNames};
pub use registry::{Entry, Registry};
