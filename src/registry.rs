//! Stage and type registries.
//!
//! Both registries are plain values passed to the pipeline or dispatcher
//! that uses them. There is no global container.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::stage::Pipe;

/// A shared, type-erased instance produced by a [`ResolveType`] registry.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Resolves stage names to stage objects.
pub trait ResolveStage<P, R>: Send + Sync {
    /// Returns the stage registered under `name`, if any.
    fn resolve(&self, name: &str) -> Option<Arc<dyn Pipe<P, R>>>;
}

/// Resolves type identifiers to instances.
pub trait ResolveType: Send + Sync {
    /// Returns an instance of the type identified by `key`, if registered.
    fn resolve_type(&self, key: &TypeKey) -> Option<Instance>;
}

type StageFactory<P, R> = Arc<dyn Fn() -> Arc<dyn Pipe<P, R>> + Send + Sync>;

/// Name-to-factory registry for named stages.
///
/// Factories run lazily, each time a pipeline run reaches the stage.
///
/// # Examples
///
/// ```
/// use pipeline_bus::{Next, Pipe, ResolveStage, Result, StageRegistry};
///
/// struct Passthrough;
///
/// impl Pipe<u32, u32> for Passthrough {
///     fn handle(&self, n: u32, next: Next<'_, u32, u32>, _args: &[String]) -> Result<u32> {
///         next.run(n)
///     }
/// }
///
/// let registry: StageRegistry<u32, u32> = StageRegistry::new().register("pass", || Passthrough);
/// assert!(registry.resolve("pass").is_some());
/// assert!(registry.resolve("missing").is_none());
/// ```
pub struct StageRegistry<P, R> {
    factories: HashMap<String, StageFactory<P, R>>,
}

impl<P: 'static, R: 'static> StageRegistry<P, R> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registers a factory that builds a fresh stage on every resolution.
    ///
    /// A later registration under the same name replaces the earlier one.
    pub fn register<T, F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        T: Pipe<P, R> + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.factories.insert(
            name.into(),
            Arc::new(move || Arc::new(factory()) as Arc<dyn Pipe<P, R>>),
        );
        self
    }

    /// Registers one shared stage instance under `name`.
    pub fn singleton<T>(mut self, name: impl Into<String>, pipe: T) -> Self
    where
        T: Pipe<P, R> + 'static,
    {
        let shared: Arc<dyn Pipe<P, R>> = Arc::new(pipe);
        self.factories
            .insert(name.into(), Arc::new(move || Arc::clone(&shared)));
        self
    }

    /// Returns true if a stage is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Number of registered stages.
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Returns true if no stage is registered.
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl<P: 'static, R: 'static> Default for StageRegistry<P, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P, R> fmt::Debug for StageRegistry<P, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("StageRegistry")
            .field("stages", &names)
            .finish()
    }
}

impl<P, R> ResolveStage<P, R> for StageRegistry<P, R> {
    fn resolve(&self, name: &str) -> Option<Arc<dyn Pipe<P, R>>> {
        self.factories.get(name).map(|factory| factory())
    }
}

/// Identifies a type for registry lookups.
///
/// Equality and hashing use only the `TypeId`; the name is kept for
/// messages.
#[derive(Debug, Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// Returns the key for `T`.
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The Rust type name, for diagnostics.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl std::hash::Hash for TypeKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

enum Provider {
    Shared(Instance),
    Factory(Arc<dyn Fn() -> Instance + Send + Sync>),
}

impl Provider {
    fn provide(&self) -> Instance {
        match self {
            Provider::Shared(instance) => Arc::clone(instance),
            Provider::Factory(factory) => factory(),
        }
    }
}

/// Type-keyed dependency registry used for handler parameter binding.
///
/// # Examples
///
/// ```
/// use pipeline_bus::Container;
///
/// struct Mailer { from: &'static str }
///
/// let container = Container::new().instance(Mailer { from: "ops@example.com" });
/// let mailer = container.make::<Mailer>().unwrap();
/// assert_eq!(mailer.from, "ops@example.com");
/// assert!(container.make::<String>().is_err());
/// ```
#[derive(Default)]
pub struct Container {
    providers: HashMap<TypeKey, Provider>,
}

impl Container {
    /// Creates an empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `T` to a factory; every lookup builds a fresh instance.
    pub fn bind<T, F>(mut self, factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.providers.insert(
            TypeKey::of::<T>(),
            Provider::Factory(Arc::new(move || Arc::new(factory()) as Instance)),
        );
        self
    }

    /// Binds `T` to one shared instance.
    pub fn instance<T>(mut self, value: T) -> Self
    where
        T: Any + Send + Sync,
    {
        self.providers
            .insert(TypeKey::of::<T>(), Provider::Shared(Arc::new(value)));
        self
    }

    /// Returns true if `T` is bound.
    pub fn has<T: Any>(&self) -> bool {
        self.providers.contains_key(&TypeKey::of::<T>())
    }

    /// Resolves `T`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Resolution` if `T` is not bound.
    pub fn make<T>(&self) -> Result<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        let key = TypeKey::of::<T>();
        self.resolve_type(&key)
            .and_then(|instance| instance.downcast::<T>().ok())
            .ok_or_else(|| Error::unresolved_type(key.name()))
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.providers.keys().map(TypeKey::name).collect();
        names.sort_unstable();
        f.debug_struct("Container").field("types", &names).finish()
    }
}

impl ResolveType for Container {
    fn resolve_type(&self, key: &TypeKey) -> Option<Instance> {
        self.providers.get(key).map(Provider::provide)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::next::Next;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Tag(&'static str);

    impl Pipe<String, String> for Tag {
        fn handle(&self, p: String, next: Next<'_, String, String>, _: &[String]) -> Result<String> {
            next.run(format!("{}{}", self.0, p))
        }
    }

    #[test]
    fn stage_registry_resolves_registered_names() {
        let registry: StageRegistry<String, String> = StageRegistry::new()
            .register("a", || Tag("a"))
            .singleton("b", Tag("b"));

        assert!(registry.contains("a"));
        assert!(registry.contains("b"));
        assert_eq!(registry.len(), 2);
        assert!(registry.resolve("a").is_some());
        assert!(registry.resolve("c").is_none());
    }

    #[test]
    fn stage_factory_runs_per_resolution() {
        static BUILT: AtomicUsize = AtomicUsize::new(0);
        let registry: StageRegistry<String, String> = StageRegistry::new().register("t", || {
            BUILT.fetch_add(1, Ordering::SeqCst);
            Tag("t")
        });

        assert_eq!(BUILT.load(Ordering::SeqCst), 0);
        let _ = registry.resolve("t");
        let _ = registry.resolve("t");
        assert_eq!(BUILT.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn singleton_is_shared() {
        let registry: StageRegistry<String, String> = StageRegistry::new().singleton("s", Tag("s"));
        let first = registry.resolve("s").unwrap();
        let second = registry.resolve("s").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn type_key_equality_ignores_name() {
        assert_eq!(TypeKey::of::<String>(), TypeKey::of::<String>());
        assert_ne!(TypeKey::of::<String>(), TypeKey::of::<u32>());
        assert!(TypeKey::of::<u32>().to_string().contains("u32"));
    }

    #[test]
    fn container_instance_is_shared() {
        let container = Container::new().instance(7u32);
        let a = container.make::<u32>().unwrap();
        let b = container.make::<u32>().unwrap();
        assert_eq!(*a, 7);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn container_bind_builds_fresh_instances() {
        let container = Container::new().bind(|| String::from("fresh"));
        let a = container.make::<String>().unwrap();
        let b = container.make::<String>().unwrap();
        assert_eq!(*a, "fresh");
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn container_make_missing_type_fails() {
        let container = Container::new();
        assert!(!container.has::<u64>());

        let err = container.make::<u64>().unwrap_err();
        let resolution = err.as_resolution().expect("resolution error");
        assert_eq!(resolution.target, crate::error::ResolutionTarget::Type);
        assert_eq!(resolution.name, "u64");
    }
}
