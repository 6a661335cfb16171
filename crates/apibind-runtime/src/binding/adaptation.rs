//! Adapted entries: coercion policies and custom procedures

use crate::binding::arity::ArityGuard;
use crate::binding::BindingDescriptor;
use crate::error::BindResult;
use crate::ffi::caller::RawFunction;
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// Caller-supplied block passed at call time
///
/// The block lives only for the call, so it may borrow caller state.
pub type Block<'a> = dyn Fn(&Value) -> Value + 'a;

/// Custom adaptation procedure
///
/// Receives the raw entry, the caller's arguments and the optional block,
/// and is responsible for its own argument-count contract.
pub type Procedure = Arc<
    dyn for<'b> Fn(&RawFunction, &[Value], Option<&'b Block<'b>>) -> BindResult<Value>
        + Send
        + Sync,
>;

/// Post-processing of an adapted result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Coercion {
    /// Result unchanged
    #[default]
    Identity,
    /// Nonzero or true-ish becomes `true`, anything else `false`
    Boolean,
    /// Zero becomes `Value::Null`; every other value (negatives included)
    /// is unchanged
    NullableOnZero,
}

impl Coercion {
    /// Apply the policy
    ///
    /// ```
    /// # use apibind_runtime::binding::Coercion;
    /// # use apibind_runtime::Value;
    /// assert_eq!(Coercion::Boolean.apply(Value::Int(7)), Value::Bool(true));
    /// assert_eq!(Coercion::NullableOnZero.apply(Value::Int(0)), Value::Null);
    /// assert_eq!(Coercion::NullableOnZero.apply(Value::Int(-1)), Value::Int(-1));
    /// ```
    pub fn apply(&self, value: Value) -> Value {
        match self {
            Coercion::Identity => value,
            Coercion::Boolean => Value::Bool(value.is_truthy()),
            Coercion::NullableOnZero if value.is_zero() => Value::Null,
            Coercion::NullableOnZero => value,
        }
    }
}

/// How an adapted entry produces its result
#[derive(Clone)]
pub enum Adaptation {
    /// Arity guard, raw call, optional block, coercion
    Default(Coercion),
    /// The procedure produces the result; coercion is applied to it
    Custom(Procedure, Coercion),
}

impl Adaptation {
    pub fn coercion(&self) -> Coercion {
        match self {
            Adaptation::Default(c) | Adaptation::Custom(_, c) => *c,
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, Adaptation::Custom(..))
    }
}

impl fmt::Debug for Adaptation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Adaptation::Default(c) => f.debug_tuple("Default").field(c).finish(),
            Adaptation::Custom(_, c) => f
                .debug_tuple("Custom")
                .field(&format_args!("<procedure>"))
                .field(c)
                .finish(),
        }
    }
}

/// The callable installed under an adapted name and its aliases
#[derive(Debug, Clone)]
pub struct AdaptedMethod {
    name: String,
    raw: RawFunction,
    adaptation: Adaptation,
}

impl AdaptedMethod {
    pub(crate) fn new(name: String, raw: RawFunction, adaptation: Adaptation) -> Self {
        Self {
            name,
            raw,
            adaptation,
        }
    }

    /// Adapted name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptor(&self) -> &Arc<BindingDescriptor> {
        self.raw.descriptor()
    }

    pub fn raw(&self) -> &RawFunction {
        &self.raw
    }

    pub fn adaptation(&self) -> &Adaptation {
        &self.adaptation
    }

    /// Invoke the adapted contract
    ///
    /// In the default adaptation the block receives the raw result and its
    /// output replaces it before coercion.
    pub fn call(&self, args: &[Value], block: Option<&Block<'_>>) -> BindResult<Value> {
        match &self.adaptation {
            Adaptation::Default(coercion) => {
                ArityGuard::check(&self.name, self.descriptor().params().len(), 0, args.len())?;
                let mut result = self.raw.call(args)?;
                if let Some(block) = block {
                    result = block(&result);
                }
                Ok(coercion.apply(result))
            }
            Adaptation::Custom(procedure, coercion) => {
                let result = procedure(&self.raw, args, block)?;
                Ok(coercion.apply(result))
            }
        }
    }
}
