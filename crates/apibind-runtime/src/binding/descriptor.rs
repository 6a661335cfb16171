//! Binding descriptors

use crate::ffi::loader::SymbolSource;
use crate::ffi::resolver::ResolvedSymbol;
use crate::ffi::types::{CallingConvention, CanonicalType, TextEncoding};
use std::fmt;
use std::sync::Arc;

/// Everything known about one declared function
///
/// Created once per declaration and never mutated; raw and adapted entries
/// share it through an `Arc`. The descriptor holds the symbol source the
/// export was found in, so the library stays loaded for as long as any entry
/// can still call into it.
#[derive(Clone)]
pub struct BindingDescriptor {
    name: String,
    params: Vec<CanonicalType>,
    returns: CanonicalType,
    convention: CallingConvention,
    libraries: Vec<String>,
    effective_name: String,
    address: usize,
    source: Arc<dyn SymbolSource>,
    buffer_capacity: usize,
}

impl BindingDescriptor {
    pub(crate) fn new(
        name: String,
        params: Vec<CanonicalType>,
        returns: CanonicalType,
        convention: CallingConvention,
        libraries: Vec<String>,
        symbol: ResolvedSymbol,
        buffer_capacity: usize,
    ) -> Self {
        Self {
            name,
            params,
            returns,
            convention,
            libraries,
            effective_name: symbol.effective_name,
            address: symbol.address,
            source: symbol.source,
            buffer_capacity,
        }
    }

    /// Canonical (declared) name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameter types in declaration order
    pub fn params(&self) -> &[CanonicalType] {
        &self.params
    }

    pub fn returns(&self) -> CanonicalType {
        self.returns
    }

    pub fn convention(&self) -> CallingConvention {
        self.convention
    }

    /// Libraries searched when the symbol was resolved
    pub fn libraries(&self) -> &[String] {
        &self.libraries
    }

    /// Export name that actually bound
    pub fn effective_name(&self) -> &str {
        &self.effective_name
    }

    /// Library the export was found in
    pub fn library(&self) -> &str {
        self.source.name()
    }

    /// Symbol source the export was found in
    pub fn source(&self) -> &Arc<dyn SymbolSource> {
        &self.source
    }

    /// Code address of the export
    pub fn address(&self) -> usize {
        self.address
    }

    /// Buffer capacity adapters use when none is given
    pub fn buffer_capacity(&self) -> usize {
        self.buffer_capacity
    }

    /// Text encoding implied by the effective name
    pub fn encoding(&self) -> TextEncoding {
        TextEncoding::for_symbol(&self.effective_name)
    }

    /// Position of the first callback parameter
    pub fn callback_position(&self) -> Option<usize> {
        self.params
            .iter()
            .position(|ty| *ty == CanonicalType::Callback)
    }
}

impl fmt::Debug for BindingDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingDescriptor")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("returns", &self.returns)
            .field("convention", &self.convention)
            .field("libraries", &self.libraries)
            .field("effective_name", &self.effective_name)
            .field("library", &self.library())
            .field("address", &format_args!("{:#x}", self.address))
            .finish()
    }
}

impl fmt::Display for BindingDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params = self
            .params
            .iter()
            .map(|p| p.name())
            .collect::<Vec<_>>()
            .join(", ");
        write!(
            f,
            "{}({}) -> {} [{}!{}]",
            self.name,
            params,
            self.returns,
            self.library(),
            self.effective_name
        )
    }
}
