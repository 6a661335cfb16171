//! Declaration builder

use crate::binding::adaptation::{Block, Coercion, Procedure};
use crate::error::BindResult;
use crate::ffi::caller::RawFunction;
use crate::ffi::types::{CallingConvention, TypeToken};
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// A name/signature/options triple handed to `Registry::declare`
///
/// # Examples
///
/// ```
/// use apibind_runtime::binding::Declaration;
///
/// let decl = Declaration::new("IsWindow", ["HWND"], "BOOL")
///     .libraries(["user32"])
///     .alias("window_exists?");
/// assert_eq!(decl.name(), "IsWindow");
/// ```
#[derive(Clone)]
pub struct Declaration {
    pub(crate) name: String,
    pub(crate) params: Vec<TypeToken>,
    pub(crate) returns: TypeToken,
    pub(crate) libraries: Option<Vec<String>>,
    pub(crate) rename: Option<String>,
    pub(crate) aliases: Vec<String>,
    pub(crate) coercion: Option<Coercion>,
    pub(crate) best_effort: bool,
    pub(crate) procedure: Option<Procedure>,
    pub(crate) convention: Option<CallingConvention>,
}

impl Declaration {
    /// Declare `name` taking `params` and returning `returns`
    pub fn new<I, T>(name: impl Into<String>, params: I, returns: impl Into<TypeToken>) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<TypeToken>,
    {
        Self {
            name: name.into(),
            params: params.into_iter().map(Into::into).collect(),
            returns: returns.into(),
            libraries: None,
            rename: None,
            aliases: Vec::new(),
            coercion: None,
            best_effort: false,
            procedure: None,
            convention: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[TypeToken] {
        &self.params
    }

    pub fn returns(&self) -> &TypeToken {
        &self.returns
    }

    /// Search these libraries instead of the registry defaults
    pub fn libraries<I, S>(mut self, libraries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.libraries = Some(libraries.into_iter().map(Into::into).collect());
        self
    }

    /// Use `name` instead of the derived snake_case name
    pub fn rename(mut self, name: impl Into<String>) -> Self {
        self.rename = Some(name.into());
        self
    }

    /// Add one explicit alias
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Add several explicit aliases
    pub fn aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    /// Force boolean coercion
    pub fn boolean(self) -> Self {
        self.coercion(Coercion::Boolean)
    }

    /// Force nullable-on-zero coercion
    pub fn nullable(self) -> Self {
        self.coercion(Coercion::NullableOnZero)
    }

    /// Set the coercion explicitly (overrides the predicate heuristic)
    pub fn coercion(mut self, coercion: Coercion) -> Self {
        self.coercion = Some(coercion);
        self
    }

    /// Skip the declaration instead of failing when the symbol is missing
    pub fn best_effort(mut self) -> Self {
        self.best_effort = true;
        self
    }

    pub fn convention(mut self, convention: CallingConvention) -> Self {
        self.convention = Some(convention);
        self
    }

    /// Replace the default adaptation with a custom procedure
    pub fn adapt<F>(mut self, procedure: F) -> Self
    where
        F: for<'b> Fn(&RawFunction, &[Value], Option<&'b Block<'b>>) -> BindResult<Value>
            + Send
            + Sync
            + 'static,
    {
        self.procedure = Some(Arc::new(procedure));
        self
    }

    /// Use an already shared procedure (as returned by the adapter library)
    pub fn adapt_with(mut self, procedure: Procedure) -> Self {
        self.procedure = Some(procedure);
        self
    }
}

impl fmt::Debug for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Declaration")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("returns", &self.returns)
            .field("libraries", &self.libraries)
            .field("rename", &self.rename)
            .field("aliases", &self.aliases)
            .field("coercion", &self.coercion)
            .field("best_effort", &self.best_effort)
            .field("custom", &self.procedure.is_some())
            .field("convention", &self.convention)
            .finish()
    }
}
