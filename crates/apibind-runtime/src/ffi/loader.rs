//! Dynamic library loading for FFI
//!
//! Provides cross-platform dynamic library loading using `libloading`, plus
//! in-process export tables. Both are exposed through `SymbolSource`, which is
//! all the symbol resolver needs.

use libloading::Library;
use std::collections::HashMap;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, trace};

/// Library loading errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LoadError {
    /// Library file not found in search paths
    #[error("Library not found: {0}")]
    LibraryNotFound(String),
    /// The OS loader rejected the library
    #[error("Failed to load library '{library}': {reason}")]
    LoadFailed { library: String, reason: String },
}

/// Anything symbols can be looked up in
pub trait SymbolSource: Send + Sync {
    /// Library name as used in declarations
    fn name(&self) -> &str;

    /// Address of an exported symbol, if present
    fn lookup(&self, symbol: &str) -> Option<usize>;
}

/// A dynamic library opened through the OS loader
pub struct LoadedLibrary {
    name: String,
    path: PathBuf,
    library: Library,
}

impl LoadedLibrary {
    /// Open a library file
    ///
    /// # Safety
    ///
    /// Loading a dynamic library runs its initialization code. The caller must
    /// ensure the library is trusted.
    pub unsafe fn open(name: &str, path: impl Into<PathBuf>) -> Result<Self, LoadError> {
        let path = path.into();
        let library = Library::new(&path).map_err(|e| LoadError::LoadFailed {
            library: name.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            name: name.to_string(),
            path,
            library,
        })
    }

    /// Path the library was opened from
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SymbolSource for LoadedLibrary {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookup(&self, symbol: &str) -> Option<usize> {
        // Only the address is read; the symbol's real type is described by
        // the binding descriptor.
        let address = unsafe { self.library.get::<*const ()>(symbol.as_bytes()) }
            .ok()
            .map(|sym| *sym as usize)?;
        (address != 0).then_some(address)
    }
}

impl fmt::Debug for LoadedLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedLibrary")
            .field("name", &self.name)
            .field("path", &self.path)
            .finish()
    }
}

/// In-process export table
///
/// Exposes Rust `extern "system"` functions under export names, so that
/// embedders and tests can bind against code that is not in a shared library.
///
/// ```
/// # use apibind_runtime::ffi::{ExportTable, SymbolSource};
/// extern "system" fn answer() -> i32 { 42 }
///
/// let table = ExportTable::new("host").with("Answer", answer as *const ());
/// assert!(table.lookup("Answer").is_some());
/// assert!(table.lookup("AnswerA").is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ExportTable {
    name: String,
    exports: HashMap<String, usize>,
}

impl ExportTable {
    /// Create an empty table with the given library name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            exports: HashMap::new(),
        }
    }

    /// Add an export (builder form)
    pub fn with(mut self, symbol: impl Into<String>, address: *const ()) -> Self {
        self.insert(symbol, address);
        self
    }

    /// Add an export
    pub fn insert(&mut self, symbol: impl Into<String>, address: *const ()) {
        self.exports.insert(symbol.into(), address as usize);
    }

    /// Number of exports
    pub fn len(&self) -> usize {
        self.exports.len()
    }

    /// Check if the table has no exports
    pub fn is_empty(&self) -> bool {
        self.exports.is_empty()
    }
}

impl SymbolSource for ExportTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookup(&self, symbol: &str) -> Option<usize> {
        self.exports.get(symbol).copied()
    }
}

/// Dynamic library loader with caching and platform-specific path resolution
///
/// # Safety
///
/// Loading dynamic libraries is inherently unsafe. The loaded code runs in the
/// same process and can perform arbitrary operations.
pub struct LibraryLoader {
    /// Loaded or registered sources by library name
    loaded: HashMap<String, Arc<dyn SymbolSource>>,
    /// Platform-specific library search paths
    search_paths: Vec<PathBuf>,
}

impl LibraryLoader {
    /// Create a new library loader with default search paths
    pub fn new() -> Self {
        Self {
            loaded: HashMap::new(),
            search_paths: Self::default_search_paths(),
        }
    }

    /// Get platform-specific default library search paths
    ///
    /// Returns standard system library paths for the current platform:
    /// - Windows: %SystemRoot%\System32
    /// - Linux: /usr/lib, /usr/local/lib, /lib (and lib64 variants)
    /// - macOS: /usr/lib, /usr/local/lib, /opt/homebrew/lib
    /// - All platforms: current working directory first
    fn default_search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        #[cfg(target_os = "windows")]
        {
            if let Ok(system_root) = std::env::var("SystemRoot") {
                paths.push(PathBuf::from(format!("{}\\System32", system_root)));
            }
            paths.push(PathBuf::from("C:\\Windows\\System32"));
        }

        #[cfg(target_os = "linux")]
        {
            paths.push(PathBuf::from("/usr/lib"));
            paths.push(PathBuf::from("/usr/local/lib"));
            paths.push(PathBuf::from("/lib"));

            if cfg!(target_pointer_width = "64") {
                paths.push(PathBuf::from("/usr/lib64"));
                paths.push(PathBuf::from("/lib64"));
            }
        }

        #[cfg(target_os = "macos")]
        {
            paths.push(PathBuf::from("/usr/lib"));
            paths.push(PathBuf::from("/usr/local/lib"));
            paths.push(PathBuf::from("/opt/homebrew/lib"));
        }

        if let Ok(cwd) = std::env::current_dir() {
            paths.insert(0, cwd);
        }

        paths
    }

    /// Resolve library name to full path with platform-specific naming
    ///
    /// - Windows: {name}.dll
    /// - macOS: lib{name}.dylib or lib{name}.so
    /// - Linux: lib{name}.so
    fn resolve_library_path(&self, name: &str) -> Option<PathBuf> {
        let path = Path::new(name);
        if path.is_absolute() && path.exists() {
            return Some(path.to_path_buf());
        }

        let extensions: &[&str] = if cfg!(target_os = "windows") {
            &["dll"]
        } else if cfg!(target_os = "macos") {
            &["dylib", "so"]
        } else {
            &["so"]
        };

        let prefixes: &[&str] = if cfg!(target_os = "windows") {
            &["", "lib"]
        } else {
            &["lib", ""]
        };

        for search_path in &self.search_paths {
            for prefix in prefixes {
                for ext in extensions {
                    let full_path = search_path.join(format!("{}{}.{}", prefix, name, ext));
                    if full_path.exists() {
                        return Some(full_path);
                    }
                }
            }
        }

        None
    }

    /// Register a symbol source under its own name
    ///
    /// Registered sources shadow OS libraries of the same name.
    pub fn register(&mut self, source: impl SymbolSource + 'static) {
        let name = source.name().to_string();
        debug!(library = %name, "registered symbol source");
        self.loaded.insert(name, Arc::new(source));
    }

    /// Load a library by name or path
    ///
    /// Returns the cached or registered source when present. Otherwise the
    /// search paths are tried, then the OS loader's own search with the
    /// platform file name.
    pub fn load(&mut self, name: &str) -> Result<Arc<dyn SymbolSource>, LoadError> {
        if let Some(source) = self.loaded.get(name) {
            return Ok(Arc::clone(source));
        }

        let resolved = self.resolve_library_path(name);
        let found_on_disk = resolved.is_some();
        let candidate: OsString = match resolved {
            Some(path) => path.into_os_string(),
            None if Path::new(name).extension().is_some() => OsString::from(name),
            None => libloading::library_filename(name),
        };

        trace!(library = %name, path = ?candidate, "loading library");
        let library = unsafe { LoadedLibrary::open(name, candidate) }.map_err(|e| {
            if found_on_disk {
                e
            } else {
                LoadError::LibraryNotFound(name.to_string())
            }
        })?;
        debug!(library = %name, path = %library.path().display(), "loaded library");

        let source: Arc<dyn SymbolSource> = Arc::new(library);
        self.loaded.insert(name.to_string(), Arc::clone(&source));
        Ok(source)
    }

    /// Add a custom search path (prepended to search list)
    pub fn add_search_path(&mut self, path: PathBuf) {
        self.search_paths.insert(0, path);
    }

    /// Get the number of loaded or registered libraries
    pub fn loaded_count(&self) -> usize {
        self.loaded.len()
    }

    /// Check whether a library is loaded or registered
    pub fn is_loaded(&self, name: &str) -> bool {
        self.loaded.contains_key(name)
    }
}

impl Default for LibraryLoader {
    fn default() -> Self {
        Self::new()
    }
}
