//! Symbol resolution across export-name variants
//!
//! Many platform functions are exported once under a generic name, others
//! twice under `A` (ANSI) and `W` (wide) suffixed names. Trying the bare name
//! first, then the suffixed names, binds both kinds without the declaration
//! knowing which applies.

use crate::error::{BindError, BindResult};
use crate::ffi::loader::{LibraryLoader, SymbolSource};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Export-name suffix of the ANSI variant
pub const ANSI_SUFFIX: char = 'A';

/// Export-name suffix of the wide-character variant
pub const WIDE_SUFFIX: char = 'W';

/// A symbol that bound successfully
///
/// Holding the source keeps the library that owns `address` loaded.
#[derive(Clone)]
pub struct ResolvedSymbol {
    /// Exact exported name that bound
    pub effective_name: String,
    /// Code address
    pub address: usize,
    /// Library the export was found in
    pub source: Arc<dyn SymbolSource>,
}

impl ResolvedSymbol {
    /// Name of the library the export was found in
    pub fn library(&self) -> &str {
        self.source.name()
    }
}

impl fmt::Debug for ResolvedSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedSymbol")
            .field("effective_name", &self.effective_name)
            .field("address", &format_args!("{:#x}", self.address))
            .field("library", &self.library())
            .finish()
    }
}

/// Export names tried for `name`, in order
///
/// ```
/// # use apibind_runtime::ffi::candidate_names;
/// assert_eq!(candidate_names("GetWindowText"), ["GetWindowText", "GetWindowTextA", "GetWindowTextW"]);
/// assert_eq!(candidate_names("DdeInitializeW"), ["DdeInitializeW"]);
/// ```
pub fn candidate_names(name: &str) -> Vec<String> {
    if name.ends_with(ANSI_SUFFIX) || name.ends_with(WIDE_SUFFIX) {
        vec![name.to_string()]
    } else {
        vec![
            name.to_string(),
            format!("{}{}", name, ANSI_SUFFIX),
            format!("{}{}", name, WIDE_SUFFIX),
        ]
    }
}

/// Resolve `name` in an already loaded library set
///
/// Candidates are tried in order; for each candidate every library is
/// searched. The first bind wins.
pub fn resolve_in(sources: &[Arc<dyn SymbolSource>], name: &str) -> Option<ResolvedSymbol> {
    for candidate in candidate_names(name) {
        for source in sources {
            trace!(symbol = %candidate, library = source.name(), "probing export");
            if let Some(address) = source.lookup(&candidate) {
                debug!(
                    function = %name,
                    symbol = %candidate,
                    library = source.name(),
                    "resolved export"
                );
                return Some(ResolvedSymbol {
                    effective_name: candidate,
                    address,
                    source: Arc::clone(source),
                });
            }
        }
    }
    None
}

/// Load `libraries` through `loader` and resolve `name` in them
///
/// Libraries that fail to load are skipped; they still appear in the
/// `SymbolNotFound` error so the message lists everything searched.
pub fn resolve(
    loader: &mut LibraryLoader,
    libraries: &[String],
    name: &str,
) -> BindResult<ResolvedSymbol> {
    let mut sources = Vec::with_capacity(libraries.len());
    for library in libraries {
        match loader.load(library) {
            Ok(source) => sources.push(source),
            Err(e) => warn!(library = %library, error = %e, "skipping library"),
        }
    }

    resolve_in(&sources, name).ok_or_else(|| BindError::SymbolNotFound {
        function: name.to_string(),
        libraries: libraries.to_vec(),
    })
}
