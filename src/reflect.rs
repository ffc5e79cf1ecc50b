//! Runtime type descriptors
//!
//! Rust has no runtime reflection, so the injector works on descriptors produced
//! by the `Component` derive (or written by hand):
//!
//! * [TypeInfo] carries the identity of a type and tells records apart from plain values.
//!   Records also know how to build a zero value, how to deep-copy an erased instance
//!   and which interfaces (trait objects) they can be viewed as.
//! * The [Record] trait exposes the fields of a live instance as a list of [Field]
//!   descriptors, in declaration order.
//! * [Target] is what a field can receive; [TypeInfo::assignable_to] is the
//!   assignability test used by the resolver.

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::sync::Arc;

use crate::clone::DeepClone;
use crate::marker::RawMarker;
use crate::slot::Slot;

/// Type-erased shared value, as stored by providers
pub type SharedAny = Arc<dyn Any + Send + Sync>;

/// A type which can be described at runtime.
///
/// Plain values (numbers, strings, collections, ...) are described as such and can only
/// be registered by name. Records implement this trait through `#[derive(Component)]`.
pub trait Reflect: DeepClone + Any + Send + Sync {
    fn type_info() -> TypeInfo;
}

/// Field-level access to a record instance.
///
/// This trait is object safe: the resolver populates records through `&mut dyn Record`
/// without knowing their concrete type.
pub trait Record: Any + Send + Sync {
    /// Descriptor of the concrete type behind this record
    fn describe(&self) -> TypeInfo;

    /// Descriptors for all fields, in declaration order
    fn fields(&mut self) -> Vec<Field<'_>>;

    /// Move a boxed record into a shared, type-erased allocation
    fn into_shared(self: Box<Self>) -> SharedAny;
}

/// Runtime identity of a type
#[derive(Clone, Copy)]
pub struct TypeInfo {
    id: TypeId,
    name: &'static str,
    kind: Kind,
}

#[derive(Clone, Copy, Debug)]
enum Kind {
    Record(RecordInfo),
    Value,
}

impl TypeInfo {
    pub fn of<T: Reflect>() -> Self {
        T::type_info()
    }

    /// Describe a plain value type
    pub fn value<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
            kind: Kind::Value,
        }
    }

    /// Describe a record type and the interfaces it can be cast to
    pub fn record<T: Record + Reflect + Default>(interfaces: fn() -> Vec<Cast>) -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
            kind: Kind::Record(RecordInfo::new::<T>(interfaces)),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_record(&self) -> bool {
        matches!(self.kind, Kind::Record(_))
    }

    pub fn record_info(&self) -> Option<&RecordInfo> {
        match &self.kind {
            Kind::Record(info) => Some(info),
            Kind::Value => None,
        }
    }

    /// Find the cast of this type into the selected interface, if it was declared
    pub fn cast(&self, interface: TypeId) -> Option<Cast> {
        self.record_info()?
            .interfaces()
            .into_iter()
            .find(|cast| cast.interface() == interface)
    }

    pub fn implements(&self, interface: TypeId) -> bool {
        self.cast(interface).is_some()
    }

    /// Can a provider of this type be placed into the target?
    pub fn assignable_to(&self, target: &Target) -> bool {
        match target {
            Target::Concrete(info) => info.id == self.id,
            Target::Interface { id, .. } => self.implements(*id),
        }
    }
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeInfo {}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeInfo")
            .field("name", &self.name)
            .field("record", &self.is_record())
            .finish()
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Capabilities of a record type
#[derive(Clone, Copy)]
pub struct RecordInfo {
    zero: fn() -> Box<dyn Record>,
    duplicate: fn(&(dyn Any + Send + Sync)) -> Option<SharedAny>,
    interfaces: fn() -> Vec<Cast>,
}

fn zero<T: Record + Default>() -> Box<dyn Record> {
    Box::new(T::default())
}

fn duplicate<T: Reflect>(value: &(dyn Any + Send + Sync)) -> Option<SharedAny> {
    let original = value.downcast_ref::<T>()?;
    let copy: SharedAny = Arc::new(original.deep_clone());
    Some(copy)
}

impl RecordInfo {
    pub fn new<T: Record + Reflect + Default>(interfaces: fn() -> Vec<Cast>) -> Self {
        Self {
            zero: zero::<T>,
            duplicate: duplicate::<T>,
            interfaces,
        }
    }

    /// Allocate a zero-valued instance
    pub fn zero(&self) -> Box<dyn Record> {
        (self.zero)()
    }

    /// Deep copy an erased instance of this record type.
    ///
    /// Returns `None` if the value is not an instance of this type.
    pub fn duplicate(&self, value: &(dyn Any + Send + Sync)) -> Option<SharedAny> {
        (self.duplicate)(value)
    }

    pub fn interfaces(&self) -> Vec<Cast> {
        (self.interfaces)()
    }
}

impl fmt::Debug for RecordInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordInfo").finish_non_exhaustive()
    }
}

type Upcast = Arc<dyn Fn(SharedAny) -> Option<Box<dyn Any + Send + Sync>> + Send + Sync>;

/// View a record as a trait object.
///
/// A cast is declared once per (record, interface) pair, usually with
/// `#[component(implements(dyn Trait))]`.
#[derive(Clone)]
pub struct Cast {
    interface: TypeId,
    name: &'static str,
    upcast: Upcast,
}

impl Cast {
    pub fn new<T, I>(upcast: fn(Arc<T>) -> Arc<I>) -> Self
    where
        T: Any + Send + Sync,
        I: ?Sized + Send + Sync + 'static,
    {
        Self {
            interface: TypeId::of::<I>(),
            name: type_name::<I>(),
            upcast: Arc::new(move |value: SharedAny| {
                let concrete = value.downcast::<T>().ok()?;
                let boxed: Box<dyn Any + Send + Sync> = Box::new(upcast(concrete));
                Some(boxed)
            }),
        }
    }

    pub fn interface(&self) -> TypeId {
        self.interface
    }

    /// Apply the cast to an erased instance of the record type
    pub fn apply<I: ?Sized + Send + Sync + 'static>(&self, value: SharedAny) -> Option<Arc<I>> {
        if self.interface != TypeId::of::<I>() {
            return None;
        }
        (self.upcast)(value)?.downcast::<Arc<I>>().ok().map(|b| *b)
    }
}

impl fmt::Debug for Cast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Cast").field(&self.name).finish()
    }
}

/// What an injectable field can receive
#[derive(Clone, Copy, Debug)]
pub enum Target {
    /// An exact type
    Concrete(TypeInfo),
    /// Any record declaring a cast into this interface
    Interface { id: TypeId, name: &'static str },
}

impl Target {
    pub fn interface<I: ?Sized + 'static>() -> Self {
        Target::Interface {
            id: TypeId::of::<I>(),
            name: type_name::<I>(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Target::Concrete(info) => info.name(),
            Target::Interface { name, .. } => name,
        }
    }
}

/// Descriptor of a single record field
pub struct Field<'a> {
    name: &'static str,
    embedded: bool,
    injection: Option<Injection<'a>>,
}

/// Injection marker attached to a field, with access to its storage
pub struct Injection<'a> {
    marker: RawMarker,
    settable: bool,
    slot: &'a mut dyn Slot,
}

impl<'a> Field<'a> {
    /// A field without injection marker
    pub fn plain(name: &'static str, embedded: bool) -> Self {
        Self {
            name,
            embedded,
            injection: None,
        }
    }

    /// A field carrying an injection marker.
    ///
    /// `marker` is checked by [crate::marker::parse] when the field is visited.
    pub fn injected(
        name: &'static str,
        embedded: bool,
        marker: RawMarker,
        settable: bool,
        slot: &'a mut dyn Slot,
    ) -> Self {
        Self {
            name,
            embedded,
            injection: Some(Injection {
                marker,
                settable,
                slot,
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Anonymous (positional) field
    pub fn is_embedded(&self) -> bool {
        self.embedded
    }

    pub fn into_injection(self) -> Option<Injection<'a>> {
        self.injection
    }
}

impl<'a> Injection<'a> {
    pub fn marker(&self) -> RawMarker {
        self.marker
    }

    pub fn is_settable(&self) -> bool {
        self.settable
    }

    pub fn slot(&mut self) -> &mut dyn Slot {
        &mut *self.slot
    }
}

macro_rules! reflect_values {
    ($($ty:ty),* $(,)?) => {
        $(
        impl Reflect for $ty {
            fn type_info() -> TypeInfo {
                TypeInfo::value::<Self>()
            }
        }
        )*
    };
}

reflect_values!(
    bool,
    char,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    f32,
    f64,
    String,
    &'static str,
    std::time::Duration,
    std::time::SystemTime,
    std::time::Instant,
    chrono::NaiveDate,
    chrono::NaiveTime,
    chrono::NaiveDateTime,
    chrono::DateTime<chrono::Utc>,
    chrono::DateTime<chrono::FixedOffset>,
    chrono::DateTime<chrono::Local>,
);

impl<T: Reflect> Reflect for Option<T> {
    fn type_info() -> TypeInfo {
        TypeInfo::value::<Self>()
    }
}

impl<T: Reflect> Reflect for Vec<T> {
    fn type_info() -> TypeInfo {
        TypeInfo::value::<Self>()
    }
}

impl<K, V> Reflect for std::collections::HashMap<K, V>
where
    K: Reflect + Eq + std::hash::Hash,
    V: Reflect,
{
    fn type_info() -> TypeInfo {
        TypeInfo::value::<Self>()
    }
}

impl<K: Reflect + Ord, V: Reflect> Reflect for std::collections::BTreeMap<K, V> {
    fn type_info() -> TypeInfo {
        TypeInfo::value::<Self>()
    }
}
