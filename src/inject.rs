use std::any::type_name;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::clone::DeepClone;
use crate::config::Config;
use crate::reflect::{Record, Reflect, TypeInfo};
use crate::registry::{Provider, Registry};
use crate::resolve::{Resolver, WiringError};

/// Instantiation mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Scope {
    /// The registered singleton itself
    #[default]
    Shared,
    /// A deep copy of the registered singleton
    Isolated,
}

/// Dependency injection registry.
///
/// All operations lock the registry for their whole duration. Resolution runs under a
/// single lock acquisition, nested providers included.
pub struct Injector {
    registry: Mutex<Registry>,
    config: Config,
}

impl Injector {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            registry: Mutex::new(Registry::new()),
            config,
        }
    }

    /// Register a record, keyed by its concrete type.
    ///
    /// Fails if `T` is not a record. Registering a second value of the same type does nothing.
    pub fn provide<T: Reflect>(&self, value: Arc<T>) -> Result<(), WiringError> {
        self.provide_named("", value)
    }

    /// Register a value under a name.
    ///
    /// An empty name registers the value by type, as [Injector::provide].
    /// Registering a second value under the same name does nothing.
    pub fn provide_named<T: Reflect>(
        &self,
        name: impl Into<String>,
        value: Arc<T>,
    ) -> Result<(), WiringError> {
        let name = name.into();
        let info = T::type_info();
        let provider = if name.is_empty() {
            Provider::unnamed(value, info)
        } else {
            Provider::named(name, value, info)
        };

        if self.registry.lock().provide(provider.clone())? {
            debug!(name = provider.name(), type_name = info.name(), "registered provider");
        } else {
            warn!(
                name = provider.name(),
                type_name = info.name(),
                "provider already registered, ignoring"
            );
        }
        Ok(())
    }

    /// Obtain an instance of the target record, building and registering it if needed
    pub fn resolve<T: Reflect>(&self, scope: Scope) -> Result<Arc<T>, WiringError> {
        let provider = {
            let mut registry = self.registry.lock();
            Resolver::new(&mut registry, &self.config)
                .transaction(|resolver| resolver.resolve_type(T::type_info()))?
        };
        materialize(&provider, scope)
    }

    /// Obtain an instance of the target record, starting from a partially populated value.
    ///
    /// Fields of the seed which already hold a value are kept as they are. If a provider
    /// for `T` already exists, it is used and the seed is dropped.
    pub fn resolve_from<T: Reflect + Record>(
        &self,
        seed: T,
        scope: Scope,
    ) -> Result<Arc<T>, WiringError> {
        let provider = {
            let mut registry = self.registry.lock();
            Resolver::new(&mut registry, &self.config)
                .transaction(|resolver| resolver.resolve_seed(Box::new(seed)))?
        };
        materialize(&provider, scope)
    }

    /// Obtain the shared instance of the target record
    pub fn instance<T: Reflect>(&self) -> Result<Arc<T>, WiringError> {
        self.resolve(Scope::Shared)
    }

    /// All providers registered by the caller, in random order
    pub fn providers(&self) -> Vec<Provider> {
        self.registry.lock().enumerate()
    }

    pub fn lookup_named(&self, name: &str) -> Option<Provider> {
        self.registry.lock().lookup_by_name(name).cloned()
    }

    pub fn lookup<T: Reflect>(&self) -> Option<Provider> {
        self.registry
            .lock()
            .lookup_by_type(TypeInfo::of::<T>().id())
            .cloned()
    }
}

impl Default for Injector {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Injector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Injector")
            .field("providers", &self.registry.lock().len())
            .field("config", &self.config)
            .finish()
    }
}

fn materialize<T: Reflect>(provider: &Provider, scope: Scope) -> Result<Arc<T>, WiringError> {
    let shared = provider
        .downcast::<T>()
        .ok_or(WiringError::InvalidTargetShape {
            type_name: type_name::<T>(),
        })?;
    Ok(match scope {
        Scope::Shared => shared,
        Scope::Isolated => shared.deep_clone(),
    })
}

static GLOBAL: Lazy<Injector> = Lazy::new(Injector::new);

/// Process-wide injector, created on first use and never torn down
pub fn global() -> &'static Injector {
    &GLOBAL
}
