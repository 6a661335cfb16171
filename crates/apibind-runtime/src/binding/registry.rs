//! The binding registry: declarations in, callable entries out

use crate::binding::adaptation::{Adaptation, AdaptedMethod, Block, Coercion};
use crate::binding::declaration::Declaration;
use crate::binding::naming;
use crate::binding::BindingDescriptor;
use crate::error::{BindError, BindResult};
use crate::ffi::caller::RawFunction;
use crate::ffi::loader::{LibraryLoader, SymbolSource};
use crate::ffi::resolver;
use crate::ffi::types::{resolve, CallingConvention, CanonicalType, TypeToken};
use crate::value::Value;
use apibind_config::{Config, DEFAULT_BUFFER_CAPACITY, DEFAULT_LIBRARIES};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// An installed callable
#[derive(Debug, Clone)]
pub enum Entry {
    /// Canonical name: exact arity, unmodified result
    Raw(RawFunction),
    /// Adapted name or alias
    Adapted(Arc<AdaptedMethod>),
}

impl Entry {
    /// Canonical name of the declaration that installed this entry
    pub fn canonical_name(&self) -> &str {
        match self {
            Entry::Raw(raw) => raw.name(),
            Entry::Adapted(method) => method.raw().name(),
        }
    }
}

/// Installed-callable table
///
/// Declarations take `&mut self`, so they are serialized by construction.
/// Calls only need `&self`.
///
/// # Examples
///
/// ```
/// use apibind_runtime::binding::{Declaration, Registry};
/// use apibind_runtime::ffi::ExportTable;
/// use apibind_runtime::Value;
///
/// extern "system" fn is_odd(n: i32) -> i32 { n & 1 }
///
/// let mut registry = Registry::new();
/// registry.register_library(ExportTable::new("host").with("IsOdd", is_odd as *const ()));
/// registry
///     .declare(Declaration::new("IsOdd", ["L"], "L").libraries(["host"]))
///     .unwrap();
///
/// assert_eq!(registry.call("IsOdd", &[Value::Int(3)]).unwrap(), Value::Int(1));
/// assert_eq!(registry.call("is_odd", &[Value::Int(3)]).unwrap(), Value::Bool(true));
/// assert_eq!(registry.call("odd?", &[Value::Int(4)]).unwrap(), Value::Bool(false));
/// ```
pub struct Registry {
    loader: LibraryLoader,
    default_libraries: Vec<String>,
    convention: CallingConvention,
    buffer_capacity: usize,
    descriptors: HashMap<String, Arc<BindingDescriptor>>,
    /// Names installed per canonical name, for re-declaration
    installed: HashMap<String, Vec<String>>,
    entries: HashMap<String, Entry>,
}

impl Registry {
    /// Create a registry with built-in defaults
    pub fn new() -> Self {
        Self {
            loader: LibraryLoader::new(),
            default_libraries: DEFAULT_LIBRARIES.iter().map(|s| s.to_string()).collect(),
            convention: CallingConvention::System,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            descriptors: HashMap::new(),
            installed: HashMap::new(),
            entries: HashMap::new(),
        }
    }

    /// Create a registry from layered configuration
    pub fn from_config(config: &Config) -> Self {
        let mut registry = Self::new();
        registry.default_libraries = config.libraries();
        registry.buffer_capacity = config.buffer_capacity();
        // Validated when the configuration was loaded.
        registry.convention = config.convention().parse().unwrap_or_default();
        for path in config.search_paths().into_iter().rev() {
            registry.loader.add_search_path(path);
        }
        registry
    }

    /// Libraries searched when a declaration names none
    pub fn default_libraries(&self) -> &[String] {
        &self.default_libraries
    }

    pub fn set_default_libraries<I, S>(&mut self, libraries: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_libraries = libraries.into_iter().map(Into::into).collect();
    }

    /// Default capacity for buffer-returning adapters
    pub fn buffer_capacity(&self) -> usize {
        self.buffer_capacity
    }

    /// Capacity recorded in descriptors declared from now on
    pub fn set_buffer_capacity(&mut self, capacity: usize) {
        self.buffer_capacity = capacity;
    }

    /// Make an in-process symbol source available under its name
    pub fn register_library(&mut self, source: impl SymbolSource + 'static) {
        self.loader.register(source);
    }

    /// Load a library ahead of the first declaration that searches it
    ///
    /// Declarations skip libraries that fail to load; this surfaces the
    /// reason instead.
    pub fn preload(&mut self, library: &str) -> BindResult<()> {
        self.loader.load(library)?;
        Ok(())
    }

    /// Declare a function and install its raw and adapted entries
    ///
    /// Returns `Ok(None)` when a best-effort declaration could not be
    /// resolved.
    pub fn declare(&mut self, decl: Declaration) -> BindResult<Option<Arc<BindingDescriptor>>> {
        let params = decl
            .params
            .iter()
            .map(|token| canonical(&decl.name, token))
            .collect::<BindResult<Vec<_>>>()?;
        let returns = canonical(&decl.name, &decl.returns)?;

        let libraries = decl
            .libraries
            .clone()
            .unwrap_or_else(|| self.default_libraries.clone());

        let symbol = match resolver::resolve(&mut self.loader, &libraries, &decl.name) {
            Ok(symbol) => symbol,
            Err(e) if decl.best_effort => {
                debug!(function = %decl.name, error = %e, "skipping best-effort declaration");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        if let Some(previous) = self.descriptors.get(&decl.name) {
            if previous.effective_name() != symbol.effective_name
                && previous.address() != symbol.address
            {
                return Err(BindError::IncompatibleRedeclaration {
                    function: decl.name.clone(),
                    previous: previous.effective_name().to_string(),
                    resolved: symbol.effective_name,
                });
            }
            self.uninstall(&decl.name);
        }

        let descriptor = Arc::new(BindingDescriptor::new(
            decl.name.clone(),
            params,
            returns,
            decl.convention.unwrap_or(self.convention),
            libraries,
            symbol,
            self.buffer_capacity,
        ));
        // Declaring a signature is the caller's promise that it matches the export.
        let raw = unsafe { RawFunction::new(Arc::clone(&descriptor)) };

        let derived = naming::derive(&decl.name, decl.rename.as_deref());
        let coercion = decl.coercion.unwrap_or(if derived.predicate {
            Coercion::Boolean
        } else {
            Coercion::Identity
        });
        let adaptation = match decl.procedure {
            Some(procedure) => Adaptation::Custom(procedure, coercion),
            None => Adaptation::Default(coercion),
        };
        let method = Arc::new(AdaptedMethod::new(
            derived.adapted_name.clone(),
            raw.clone(),
            adaptation,
        ));

        let mut names = vec![decl.name.clone()];
        self.install(decl.name.clone(), Entry::Raw(raw));

        let adapted_names = std::iter::once(derived.adapted_name)
            .chain(decl.aliases)
            .chain(derived.aliases);
        for name in adapted_names {
            if names.contains(&name) {
                continue;
            }
            self.install(name.clone(), Entry::Adapted(Arc::clone(&method)));
            names.push(name);
        }

        debug!(
            function = %decl.name,
            symbol = descriptor.effective_name(),
            library = descriptor.library(),
            names = ?names,
            "declared"
        );
        self.installed.insert(decl.name.clone(), names);
        self.descriptors.insert(decl.name, Arc::clone(&descriptor));
        Ok(Some(descriptor))
    }

    /// Install `entry` under `name`
    ///
    /// A name owned by another declaration moves to this one and is dropped
    /// from the other declaration's installed names.
    fn install(&mut self, name: String, entry: Entry) {
        let owner = entry.canonical_name().to_string();
        let Some(previous) = self.entries.insert(name.clone(), entry) else {
            return;
        };
        let previous_owner = previous.canonical_name();
        if previous_owner == owner {
            debug!(name = %name, "replaced installed entry");
            return;
        }
        warn!(
            name = %name,
            previous = previous_owner,
            function = %owner,
            "name taken over from another declaration"
        );
        if let Some(names) = self.installed.get_mut(previous_owner) {
            names.retain(|n| *n != name);
        }
    }

    /// Remove the names a declaration installed that it still owns
    fn uninstall(&mut self, canonical_name: &str) {
        for name in self.installed.remove(canonical_name).unwrap_or_default() {
            let owned = self
                .entries
                .get(&name)
                .is_some_and(|entry| entry.canonical_name() == canonical_name);
            if owned {
                self.entries.remove(&name);
            }
        }
    }

    /// Call an installed entry by name
    pub fn call(&self, name: &str, args: &[Value]) -> BindResult<Value> {
        self.dispatch(name, args, None)
    }

    /// Call an installed entry with a block
    ///
    /// Raw entries ignore the block. The block may borrow caller state.
    pub fn call_with(&self, name: &str, args: &[Value], block: &Block<'_>) -> BindResult<Value> {
        self.dispatch(name, args, Some(block))
    }

    fn dispatch(
        &self,
        name: &str,
        args: &[Value],
        block: Option<&Block<'_>>,
    ) -> BindResult<Value> {
        match self.entry(name)? {
            Entry::Raw(raw) => raw.call(args),
            Entry::Adapted(method) => method.call(args, block),
        }
    }

    /// Installed entry under `name`
    pub fn entry(&self, name: &str) -> BindResult<&Entry> {
        self.entries.get(name).ok_or_else(|| BindError::Unbound {
            name: name.to_string(),
        })
    }

    /// Raw entry of a canonical name
    pub fn raw(&self, canonical_name: &str) -> Option<&RawFunction> {
        match self.entries.get(canonical_name)? {
            Entry::Raw(raw) => Some(raw),
            Entry::Adapted(_) => None,
        }
    }

    /// Adapted entry under an adapted name or alias
    pub fn adapted(&self, name: &str) -> Option<&Arc<AdaptedMethod>> {
        match self.entries.get(name)? {
            Entry::Adapted(method) => Some(method),
            Entry::Raw(_) => None,
        }
    }

    /// Descriptor of a declared canonical name
    pub fn descriptor(&self, canonical_name: &str) -> Option<&Arc<BindingDescriptor>> {
        self.descriptors.get(canonical_name)
    }

    /// Whether anything is installed under `name`
    pub fn is_bound(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Names installed for a canonical name (raw name first)
    pub fn names_for(&self, canonical_name: &str) -> &[String] {
        self.installed
            .get(canonical_name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of declared functions
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

fn canonical(function: &str, token: &TypeToken) -> BindResult<CanonicalType> {
    let resolved = resolve(token);
    resolved.canonical().ok_or_else(|| BindError::UnresolvedType {
        function: function.to_string(),
        token: resolved.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ffi::loader::ExportTable;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicBool, Ordering};

    extern "system" fn is_even(n: i32) -> i32 {
        (n % 2 == 0) as i32
    }

    extern "system" fn is_even_other(n: i32) -> i32 {
        if n % 2 == 0 {
            2
        } else {
            -2
        }
    }

    extern "system" fn is_odd(n: i32) -> i32 {
        (n % 2 != 0) as i32
    }

    /// Source that records when it is dropped
    struct Tracked {
        table: ExportTable,
        dropped: Arc<AtomicBool>,
    }

    impl SymbolSource for Tracked {
        fn name(&self) -> &str {
            self.table.name()
        }

        fn lookup(&self, symbol: &str) -> Option<usize> {
            self.table.lookup(symbol)
        }
    }

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.dropped.store(true, Ordering::SeqCst);
        }
    }

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry.set_default_libraries(["host"]);
        registry.register_library(
            ExportTable::new("host")
                .with("IsEven", is_even as *const ())
                .with("IsOdd", is_odd as *const ())
                .with("IsEvenW", is_even_other as *const ())
                .with("IsEvenA", is_even_other as *const ()),
        );
        registry
    }

    #[test]
    fn test_declare_installs_all_names() {
        let mut registry = registry();
        registry
            .declare(Declaration::new("IsEven", ["L"], "L").alias("even"))
            .unwrap();

        assert_eq!(
            registry.names_for("IsEven"),
            &["IsEven", "is_even", "even", "even?"]
        );
        assert!(matches!(registry.entry("IsEven"), Ok(Entry::Raw(_))));
        assert!(registry.adapted("even?").is_some());
        assert!(registry.raw("is_even").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unknown_type_token() {
        let mut registry = registry();
        let err = registry
            .declare(Declaration::new("IsEven", ["HFROB"], "L"))
            .unwrap_err();
        assert_eq!(
            err,
            BindError::UnresolvedType {
                function: "IsEven".to_string(),
                token: "HFROB".to_string(),
            }
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unbound_name() {
        let registry = registry();
        assert_eq!(
            registry.call("nothing", &[]),
            Err(BindError::Unbound {
                name: "nothing".to_string()
            })
        );
    }

    #[test]
    fn test_redeclaration_same_export() {
        let mut registry = registry();
        registry
            .declare(Declaration::new("IsEven", ["L"], "L").alias("even"))
            .unwrap();
        registry
            .declare(Declaration::new("IsEven", ["L"], "L").nullable())
            .unwrap();

        assert!(!registry.is_bound("even"));
        assert_eq!(registry.call("is_even", &[Value::Int(3)]), Ok(Value::Null));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_redeclaration_different_export() {
        let mut registry = registry();
        registry
            .declare(Declaration::new("IsEven", ["L"], "L"))
            .unwrap();

        registry.register_library(
            ExportTable::new("other").with("IsEvenA", is_even_other as *const ()),
        );
        let err = registry
            .declare(Declaration::new("IsEven", ["L"], "L").libraries(["other"]))
            .unwrap_err();
        assert!(matches!(err, BindError::IncompatibleRedeclaration { .. }));
        assert!(registry.is_bound("is_even"));
    }

    #[test]
    fn test_rename_replaces_derived_name() {
        let mut registry = registry();
        registry
            .declare(Declaration::new("IsEven", ["L"], "L").rename("divisible_by_two"))
            .unwrap();
        assert!(!registry.is_bound("is_even"));
        assert_eq!(
            registry.call("divisible_by_two", &[Value::Int(2)]),
            Ok(Value::Int(1))
        );
    }

    #[test]
    fn test_preload_reports_load_error() {
        let mut registry = registry();
        assert!(registry.preload("host").is_ok());
        assert!(matches!(
            registry.preload("missing_lib_xyz"),
            Err(BindError::Load(_))
        ));
    }

    #[test]
    fn test_explicit_convention() {
        let mut registry = registry();
        let descriptor = registry
            .declare(Declaration::new("IsEven", ["L"], "L").convention(CallingConvention::C))
            .unwrap()
            .unwrap();
        assert_eq!(descriptor.convention(), CallingConvention::C);
    }

    #[test]
    fn test_entries_keep_their_library_loaded() {
        let dropped = Arc::new(AtomicBool::new(false));
        let mut registry = Registry::new();
        registry.set_default_libraries(["tracked"]);
        registry.register_library(Tracked {
            table: ExportTable::new("tracked").with("IsEven", is_even as *const ()),
            dropped: Arc::clone(&dropped),
        });
        registry
            .declare(Declaration::new("IsEven", ["L"], "L"))
            .unwrap();
        let method = Arc::clone(registry.adapted("is_even").unwrap());

        // Replacing the cached source must not unload the bound one.
        registry.register_library(ExportTable::new("tracked"));
        assert!(!dropped.load(Ordering::SeqCst));

        drop(registry);
        assert!(!dropped.load(Ordering::SeqCst));
        assert_eq!(method.call(&[Value::Int(4)], None), Ok(Value::Bool(true)));

        drop(method);
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[test]
    fn test_taken_over_alias_survives_redeclaration() {
        let mut registry = registry();
        registry
            .declare(Declaration::new("IsEven", ["L"], "L").alias("parity"))
            .unwrap();
        registry
            .declare(Declaration::new("IsOdd", ["L"], "L").alias("parity"))
            .unwrap();
        assert_eq!(registry.names_for("IsEven"), &["IsEven", "is_even", "even?"]);

        registry
            .declare(Declaration::new("IsEven", ["L"], "L"))
            .unwrap();
        let parity = registry.adapted("parity").unwrap();
        assert_eq!(parity.descriptor().name(), "IsOdd");
        assert_eq!(registry.call("parity", &[Value::Int(3)]), Ok(Value::Bool(true)));
    }

    #[test]
    fn test_buffer_capacity_recorded_in_descriptor() {
        let mut registry = registry();
        registry.set_buffer_capacity(32);
        let descriptor = registry
            .declare(Declaration::new("IsEven", ["L"], "L"))
            .unwrap()
            .unwrap();
        assert_eq!(descriptor.buffer_capacity(), 32);
    }
}
