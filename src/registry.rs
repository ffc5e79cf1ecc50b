//! Provider storage
//!
//! The [Registry] indexes providers either by name or by concrete type, never both.
//! Insertion is idempotent: the first provider registered under a key wins and later
//! registrations under the same key are ignored.

use std::any::{Any, TypeId};
use std::collections::hash_map::{Entry, HashMap};
use std::fmt;
use std::sync::Arc;

use rand::seq::SliceRandom;

use crate::reflect::{SharedAny, TypeInfo};
use crate::resolve::WiringError;

/// Registration key of a provider
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Name(String),
    Type(TypeId),
}

/// A registered value available for injection
#[derive(Clone)]
pub struct Provider {
    key: Key,
    value: SharedAny,
    info: TypeInfo,
    synthesized: bool,
    embedded: bool,
}

impl Provider {
    pub(crate) fn named(name: String, value: SharedAny, info: TypeInfo) -> Self {
        Self {
            key: Key::Name(name),
            value,
            info,
            synthesized: false,
            embedded: false,
        }
    }

    pub(crate) fn unnamed(value: SharedAny, info: TypeInfo) -> Self {
        Self {
            key: Key::Type(info.id()),
            value,
            info,
            synthesized: false,
            embedded: false,
        }
    }

    /// Provider created by the resolver to fill a nested dependency
    pub(crate) fn synthesized(value: SharedAny, info: TypeInfo, embedded: bool) -> Self {
        Self {
            synthesized: true,
            embedded,
            ..Self::unnamed(value, info)
        }
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn name(&self) -> Option<&str> {
        match &self.key {
            Key::Name(name) => Some(name),
            Key::Type(_) => None,
        }
    }

    pub fn type_info(&self) -> TypeInfo {
        self.info
    }

    pub fn is_synthesized(&self) -> bool {
        self.synthesized
    }

    /// Synthesized to fill an anonymous (positional) field
    pub fn is_embedded(&self) -> bool {
        self.embedded
    }

    /// Shared reference to the provided value
    pub fn shared(&self) -> SharedAny {
        Arc::clone(&self.value)
    }

    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.shared().downcast::<T>().ok()
    }

}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("name", &self.name())
            .field("type", &self.info.name())
            .field("synthesized", &self.synthesized)
            .field("embedded", &self.embedded)
            .finish()
    }
}

/// Name-keyed and type-keyed provider indices
#[derive(Default)]
pub struct Registry {
    by_name: HashMap<String, Provider>,
    by_type: HashMap<TypeId, Provider>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider.
    ///
    /// Returns `Ok(false)` without changing anything if the key is already taken.
    /// Fails if a type-keyed provider does not hold a record.
    pub fn provide(&mut self, provider: Provider) -> Result<bool, WiringError> {
        match provider.key.clone() {
            Key::Type(id) => {
                if !provider.info.is_record() {
                    return Err(WiringError::InvalidProviderShape {
                        type_name: provider.info.name(),
                    });
                }
                Ok(Self::fill_vacant(self.by_type.entry(id), provider))
            }
            Key::Name(name) => Ok(Self::fill_vacant(self.by_name.entry(name), provider)),
        }
    }

    fn fill_vacant<K>(entry: Entry<'_, K, Provider>, provider: Provider) -> bool {
        match entry {
            Entry::Occupied(_) => false,
            Entry::Vacant(v) => {
                v.insert(provider);
                true
            }
        }
    }

    pub fn lookup_by_name(&self, name: &str) -> Option<&Provider> {
        self.by_name.get(name)
    }

    pub fn lookup_by_type(&self, id: TypeId) -> Option<&Provider> {
        self.by_type.get(&id)
    }

    /// All type-keyed providers, synthesized ones included
    pub fn typed(&self) -> impl Iterator<Item = &Provider> {
        self.by_type.values()
    }

    /// All providers registered by the caller, in random order.
    ///
    /// The order changes from one call to the next: callers must not rely on it.
    pub fn enumerate(&self) -> Vec<Provider> {
        let mut providers: Vec<Provider> = self
            .by_type
            .values()
            .chain(self.by_name.values())
            .filter(|p| !p.synthesized)
            .cloned()
            .collect();
        providers.shuffle(&mut rand::rng());
        providers
    }

    /// Forget providers inserted by a failed resolution
    pub(crate) fn rollback(&mut self, keys: &[Key]) {
        for key in keys {
            match key {
                Key::Name(name) => self.by_name.remove(name),
                Key::Type(id) => self.by_type.remove(id),
            };
        }
    }

    pub fn len(&self) -> usize {
        self.by_name.len() + self.by_type.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
