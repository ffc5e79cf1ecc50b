//! Structural deep copy
//!
//! [DeepClone] produces a copy which shares no allocation with the original:
//! pointers are re-allocated, containers are rebuilt entry by entry and records are
//! copied field by field (see `#[derive(DeepClone)]`).
//!
//! A type with copy semantics that cannot be expressed structurally (for instance a
//! handle on an identity-sensitive resource) implements [DeepClone] by hand instead of
//! deriving it: its implementation is then used verbatim wherever the type is reached.

use std::cell::Cell;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::hash::{BuildHasher, Hash};
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::atomic::{
    AtomicBool, AtomicI32, AtomicI64, AtomicU32, AtomicU64, AtomicUsize, Ordering,
};
use std::sync::{Arc, PoisonError};

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};

/// Create an independent copy of a value graph
pub trait DeepClone: Sized {
    fn deep_clone(&self) -> Self;
}

macro_rules! by_value {
    ($($ty:ty),* $(,)?) => {
        $(
        impl DeepClone for $ty {
            #[inline]
            fn deep_clone(&self) -> Self {
                self.clone()
            }
        }
        )*
    };
}

by_value!(
    (),
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
);

// Instants hold no reference structure: copied as is
by_value!(
    std::time::Duration,
    std::time::Instant,
    std::time::SystemTime,
    NaiveDate,
    NaiveTime,
    NaiveDateTime,
);

impl<Tz: TimeZone> DeepClone for DateTime<Tz> {
    #[inline]
    fn deep_clone(&self) -> Self {
        self.clone()
    }
}

impl<T: ?Sized> DeepClone for PhantomData<T> {
    fn deep_clone(&self) -> Self {
        PhantomData
    }
}

impl<T: Copy> DeepClone for Cell<T> {
    fn deep_clone(&self) -> Self {
        Cell::new(self.get())
    }
}

impl<T: DeepClone> DeepClone for Option<T> {
    fn deep_clone(&self) -> Self {
        self.as_ref().map(DeepClone::deep_clone)
    }
}

impl<T: DeepClone, E: DeepClone> DeepClone for Result<T, E> {
    fn deep_clone(&self) -> Self {
        match self {
            Ok(v) => Ok(v.deep_clone()),
            Err(e) => Err(e.deep_clone()),
        }
    }
}

impl<T: DeepClone> DeepClone for Box<T> {
    fn deep_clone(&self) -> Self {
        Box::new((**self).deep_clone())
    }
}

impl<T: DeepClone> DeepClone for Arc<T> {
    fn deep_clone(&self) -> Self {
        Arc::new((**self).deep_clone())
    }
}

impl<T: DeepClone> DeepClone for Rc<T> {
    fn deep_clone(&self) -> Self {
        Rc::new((**self).deep_clone())
    }
}

impl<T: DeepClone> DeepClone for Vec<T> {
    fn deep_clone(&self) -> Self {
        self.iter().map(DeepClone::deep_clone).collect()
    }
}

impl<T: DeepClone> DeepClone for VecDeque<T> {
    fn deep_clone(&self) -> Self {
        self.iter().map(DeepClone::deep_clone).collect()
    }
}

impl<T: DeepClone, const N: usize> DeepClone for [T; N] {
    fn deep_clone(&self) -> Self {
        std::array::from_fn(|i| self[i].deep_clone())
    }
}

impl<K, V, S> DeepClone for HashMap<K, V, S>
where
    K: DeepClone + Eq + Hash,
    V: DeepClone,
    S: BuildHasher + Clone,
{
    fn deep_clone(&self) -> Self {
        let mut copy = HashMap::with_capacity_and_hasher(self.len(), self.hasher().clone());
        for (key, value) in self {
            copy.insert(key.deep_clone(), value.deep_clone());
        }
        copy
    }
}

impl<K: DeepClone + Ord, V: DeepClone> DeepClone for BTreeMap<K, V> {
    fn deep_clone(&self) -> Self {
        self.iter()
            .map(|(key, value)| (key.deep_clone(), value.deep_clone()))
            .collect()
    }
}

impl<T, S> DeepClone for HashSet<T, S>
where
    T: DeepClone + Eq + Hash,
    S: BuildHasher + Clone,
{
    fn deep_clone(&self) -> Self {
        let mut copy = HashSet::with_capacity_and_hasher(self.len(), self.hasher().clone());
        copy.extend(self.iter().map(DeepClone::deep_clone));
        copy
    }
}

impl<T: DeepClone + Ord> DeepClone for BTreeSet<T> {
    fn deep_clone(&self) -> Self {
        self.iter().map(DeepClone::deep_clone).collect()
    }
}

impl<T: DeepClone> DeepClone for parking_lot::Mutex<T> {
    fn deep_clone(&self) -> Self {
        parking_lot::Mutex::new(self.lock().deep_clone())
    }
}

impl<T: DeepClone> DeepClone for parking_lot::RwLock<T> {
    fn deep_clone(&self) -> Self {
        parking_lot::RwLock::new(self.read().deep_clone())
    }
}

impl<T: DeepClone> DeepClone for std::sync::Mutex<T> {
    fn deep_clone(&self) -> Self {
        let guard = self.lock().unwrap_or_else(PoisonError::into_inner);
        std::sync::Mutex::new(guard.deep_clone())
    }
}

impl<T: DeepClone> DeepClone for std::sync::RwLock<T> {
    fn deep_clone(&self) -> Self {
        let guard = self.read().unwrap_or_else(PoisonError::into_inner);
        std::sync::RwLock::new(guard.deep_clone())
    }
}

macro_rules! atomics {
    ($($ty:ty),* $(,)?) => {
        $(
        impl DeepClone for $ty {
            fn deep_clone(&self) -> Self {
                <$ty>::new(self.load(Ordering::SeqCst))
            }
        }
        )*
    };
}

atomics!(AtomicBool, AtomicI32, AtomicI64, AtomicU32, AtomicU64, AtomicUsize);

macro_rules! tuples {
    ($($name:ident)+) => {
        impl<$($name: DeepClone,)+> DeepClone for ($($name,)+) {
            #[allow(non_snake_case)]
            fn deep_clone(&self) -> Self {
                let ($($name,)+) = self;
                ($($name.deep_clone(),)+)
            }
        }
    };
}

tuples! { A }
tuples! { A B }
tuples! { A B C }
tuples! { A B C D }
tuples! { A B C D E }
tuples! { A B C D E F }

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[derive(Debug, PartialEq)]
    struct Counter {
        hits: u32,
    }

    // Custom copy: a copied counter starts over
    impl DeepClone for Counter {
        fn deep_clone(&self) -> Self {
            Counter { hits: 0 }
        }
    }

    #[test]
    fn pointers_are_reallocated() {
        let original = Arc::new(vec![Box::new(1u8), Box::new(2)]);
        let copy = original.deep_clone();

        assert_eq!(original, copy);
        assert!(!Arc::ptr_eq(&original, &copy));
        assert!(!std::ptr::eq(&*original[0], &*copy[0]));
    }

    #[test]
    fn absent_containers_stay_absent() {
        let sequence: Option<Vec<String>> = None;
        let map: Option<HashMap<String, u32>> = None;
        assert_eq!(sequence.deep_clone(), None);
        assert_eq!(map.deep_clone(), None);

        let empty: Option<Vec<String>> = Some(Vec::new());
        assert_eq!(empty.deep_clone(), Some(Vec::new()));
    }

    #[test]
    fn map_keys_and_values_are_copied() {
        let mut original = HashMap::new();
        original.insert(Arc::new("key".to_string()), Arc::new(parking_lot::Mutex::new(1)));
        let copy = original.deep_clone();

        let (key, value) = copy.iter().next().unwrap();
        let (original_key, original_value) = original.iter().next().unwrap();
        assert_eq!(key, original_key);
        assert!(!Arc::ptr_eq(key, original_key));

        *value.lock() = 7;
        assert_eq!(*original_value.lock(), 1);
    }

    #[test]
    fn custom_copy_is_used_verbatim() {
        let original = vec![Counter { hits: 3 }];
        assert_eq!(original.deep_clone(), vec![Counter { hits: 0 }]);
    }

    #[test]
    fn instants_are_copied_by_value() {
        let now = Utc::now();
        let stamps = BTreeMap::from([(1u8, now)]);
        assert_eq!(stamps.deep_clone()[&1], now);
    }

    #[test]
    fn locks_and_atomics_get_their_own_state() {
        let original = (AtomicU32::new(5), std::sync::Mutex::new(vec![1u8]));
        let copy = original.deep_clone();

        copy.0.store(9, Ordering::SeqCst);
        copy.1.lock().unwrap().push(2);
        assert_eq!(original.0.load(Ordering::SeqCst), 5);
        assert_eq!(*original.1.lock().unwrap(), vec![1]);
    }
}
