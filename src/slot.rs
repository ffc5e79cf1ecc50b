//! Injectable field storage
//!
//! A [Slot] is the storage behind an injectable field. Two shapes are supported:
//!
//! * `Option<Arc<T>>` receives a provider of the exact type `T`.
//! * `Option<Interface<dyn Trait>>` receives any record declaring a cast into `dyn Trait`.
//!
//! In both cases `None` is the zero value: only vacant slots are filled.

use std::any::{Any, TypeId};
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use crate::clone::DeepClone;
use crate::reflect::{Reflect, SharedAny, Target, TypeInfo};
use crate::registry::Provider;

/// Storage of an injectable field
pub trait Slot {
    /// What this slot can receive
    fn target(&self) -> Target;

    /// Does the slot still hold its zero value?
    fn is_vacant(&self) -> bool;

    /// Store a reference to the provider's value.
    ///
    /// Returns false (leaving the slot untouched) if the provider does not fit.
    fn assign(&mut self, provider: &Provider) -> bool;
}

impl<T: Reflect> Slot for Option<Arc<T>> {
    fn target(&self) -> Target {
        Target::Concrete(T::type_info())
    }

    fn is_vacant(&self) -> bool {
        self.is_none()
    }

    fn assign(&mut self, provider: &Provider) -> bool {
        match provider.downcast::<T>() {
            Some(value) => {
                *self = Some(value);
                true
            }
            None => false,
        }
    }
}

impl<I: ?Sized + Send + Sync + 'static> Slot for Option<Interface<I>> {
    fn target(&self) -> Target {
        Target::interface::<I>()
    }

    fn is_vacant(&self) -> bool {
        self.is_none()
    }

    fn assign(&mut self, provider: &Provider) -> bool {
        match Interface::from_provider(provider) {
            Some(value) => {
                *self = Some(value);
                true
            }
            None => false,
        }
    }
}

/// Shared handle on a provider, seen through the trait object `I`.
///
/// The handle keeps track of the concrete value behind the interface: this is what
/// lets [DeepClone] copy the concrete record and wrap the copy back into `I`.
pub struct Interface<I: ?Sized> {
    value: Arc<I>,
    origin: SharedAny,
    concrete: TypeInfo,
}

impl<I: ?Sized + Send + Sync + 'static> Interface<I> {
    /// Cast the value of a provider into the interface, if its type declares the cast
    pub fn from_provider(provider: &Provider) -> Option<Self> {
        Self::wrap(provider.shared(), provider.type_info())
    }

    fn wrap(origin: SharedAny, concrete: TypeInfo) -> Option<Self> {
        let cast = concrete.cast(TypeId::of::<I>())?;
        let value = cast.apply::<I>(origin.clone())?;
        Some(Self {
            value,
            origin,
            concrete,
        })
    }

    /// Descriptor of the concrete type behind the interface
    pub fn concrete(&self) -> TypeInfo {
        self.concrete
    }

    /// Retrieve the concrete value behind the interface
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.origin.clone().downcast::<T>().ok()
    }

    /// Do both handles point to the same concrete allocation?
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&this.origin), Arc::as_ptr(&other.origin))
    }
}

impl<I: ?Sized> Deref for Interface<I> {
    type Target = I;

    fn deref(&self) -> &I {
        &self.value
    }
}

impl<I: ?Sized> Clone for Interface<I> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            origin: Arc::clone(&self.origin),
            concrete: self.concrete,
        }
    }
}

impl<I: ?Sized> fmt::Debug for Interface<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Interface").field(&self.concrete.name()).finish()
    }
}

impl<I: ?Sized + Send + Sync + 'static> DeepClone for Interface<I> {
    fn deep_clone(&self) -> Self {
        let copy = self
            .concrete
            .record_info()
            .and_then(|record| record.duplicate(&*self.origin))
            .and_then(|origin| Self::wrap(origin, self.concrete));
        match copy {
            Some(copy) => copy,
            None => {
                // Only reachable for hand-written descriptors that disagree with their values
                tracing::warn!(
                    concrete = self.concrete.name(),
                    "interface value could not be duplicated, sharing it instead"
                );
                self.clone()
            }
        }
    }
}
