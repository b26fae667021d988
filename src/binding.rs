//! Handler parameter binding.
//!
//! Handlers declare their parameters as [`Param`] values. Each parameter is
//! bound according to the configured [`BindingStrategy`]: by type from a
//! [`ResolveType`] registry, from its declared default, or left absent.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::registry::{Instance, ResolveType, TypeKey};

/// A declared handler parameter.
///
/// # Examples
///
/// ```
/// use pipeline_bus::Param;
///
/// struct Clock;
///
/// let params = vec![
///     Param::new("clock").typed::<Clock>(),
///     Param::new("retries").default_value(3u32),
///     Param::new("note"),
/// ];
/// assert_eq!(params[0].name(), "clock");
/// ```
#[derive(Clone)]
pub struct Param {
    name: &'static str,
    ty: Option<TypeKey>,
    default: Option<Instance>,
}

impl Param {
    /// Declares an untyped parameter with no default.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            ty: None,
            default: None,
        }
    }

    /// Declares the parameter's type, enabling registry lookup.
    pub fn typed<T: Any>(mut self) -> Self {
        self.ty = Some(TypeKey::of::<T>());
        self
    }

    /// Declares a default value used when the type cannot be resolved.
    pub fn default_value<T: Any + Send + Sync>(mut self, value: T) -> Self {
        self.default = Some(Arc::new(value));
        self
    }

    /// The parameter name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The declared type, if any.
    pub fn ty(&self) -> Option<&TypeKey> {
        self.ty.as_ref()
    }

    /// Returns true if a default value is declared.
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }
}

impl fmt::Debug for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Param")
            .field("name", &self.name)
            .field("ty", &self.ty.map(|t| t.name()))
            .field("has_default", &self.default.is_some())
            .finish()
    }
}

/// How one parameter was bound.
#[derive(Clone)]
pub enum Binding {
    /// Resolved from the type registry
    Resolved(Instance),
    /// Taken from the declared default
    Default(Instance),
    /// Nothing available
    Absent,
}

impl Binding {
    /// The bound value, if any.
    pub fn value(&self) -> Option<&Instance> {
        match self {
            Binding::Resolved(v) | Binding::Default(v) => Some(v),
            Binding::Absent => None,
        }
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Binding::Resolved(_) => f.write_str("Resolved"),
            Binding::Default(_) => f.write_str("Default"),
            Binding::Absent => f.write_str("Absent"),
        }
    }
}

/// Where parameter values may come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BindingStrategy {
    /// Registry lookup by type, then the declared default, then absent.
    #[default]
    TypeDirected,
    /// Declared default, then absent. The registry is never consulted.
    DefaultsOnly,
    /// Like `TypeDirected`, but a typed parameter with neither a registry
    /// entry nor a default is an error.
    Strict,
}

/// Parameters bound for one handler call, in declared order.
///
/// # Examples
///
/// ```
/// use pipeline_bus::{bind_parameters, BindingStrategy, Container, Param};
///
/// let container = Container::new().instance(String::from("smtp://localhost"));
/// let params = [
///     Param::new("dsn").typed::<String>(),
///     Param::new("retries").typed::<u32>().default_value(3u32),
///     Param::new("note").typed::<u64>(),
/// ];
///
/// let args = bind_parameters(&params, &container, BindingStrategy::TypeDirected).unwrap();
/// assert_eq!(*args.get::<String>("dsn").unwrap(), "smtp://localhost");
/// assert_eq!(*args.get::<u32>("retries").unwrap(), 3);
/// assert!(args.is_absent("note"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    bound: Vec<(&'static str, Binding)>,
}

impl Arguments {
    /// Creates an empty argument list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the bound value of `name` as a `T`.
    ///
    /// Returns `None` if the parameter is absent, unknown or of another type.
    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        self.binding(name)
            .and_then(Binding::value)
            .and_then(|v| Arc::clone(v).downcast::<T>().ok())
    }

    /// Returns how `name` was bound.
    pub fn binding(&self, name: &str) -> Option<&Binding> {
        self.bound
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, b)| b)
    }

    /// Returns true if `name` was declared but bound to nothing.
    pub fn is_absent(&self, name: &str) -> bool {
        matches!(self.binding(name), Some(Binding::Absent))
    }

    /// Number of declared parameters.
    pub fn len(&self) -> usize {
        self.bound.len()
    }

    /// Returns true if the handler declared no parameters.
    pub fn is_empty(&self) -> bool {
        self.bound.is_empty()
    }

    /// Iterates `(name, binding)` pairs in declared order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Binding)> {
        self.bound.iter().map(|(n, b)| (*n, b))
    }
}

/// Binds each declared parameter according to `strategy`.
///
/// # Errors
///
/// With `BindingStrategy::Strict`, returns `Error::Resolution` for the first
/// typed parameter that has neither a registry entry nor a default.
pub fn bind_parameters(
    params: &[Param],
    registry: &dyn ResolveType,
    strategy: BindingStrategy,
) -> Result<Arguments> {
    let mut bound = Vec::with_capacity(params.len());

    for param in params {
        let resolved = match (strategy, param.ty) {
            (BindingStrategy::DefaultsOnly, _) | (_, None) => None,
            (_, Some(key)) => registry.resolve_type(&key),
        };

        let binding = match (resolved, &param.default) {
            (Some(instance), _) => Binding::Resolved(instance),
            (None, Some(default)) => Binding::Default(Arc::clone(default)),
            (None, None) => {
                if let (BindingStrategy::Strict, Some(key)) = (strategy, param.ty) {
                    return Err(Error::unresolved_type(key.name()));
                }
                Binding::Absent
            }
        };

        tracing::trace!(param = param.name, binding = ?binding, "bound handler parameter");
        bound.push((param.name, binding));
    }

    Ok(Arguments { bound })
}
