//! Size measurement strategies.
//!
//! A [`crate::CacheManager`] measures each value exactly once, at insertion,
//! through a [`SizeEstimator`]. Different namespaces cache structurally
//! different payloads, so the strategy is a type parameter of the manager:
//!
//! - [`JsonSize`] - length of the value serialized as JSON (the default)
//! - [`HeapSize`] - in-memory footprint reported by [`MemoryEstimator`]
//! - [`SizeFn`] - any closure, handy for fixed-size test payloads
//!
//! A strategy that cannot measure a value must return
//! [`CacheError::SerializationFailure`]; a failure is never treated as size 0.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::{CacheError, CacheResult};

/// Measures a value for byte-budget accounting.
pub trait SizeEstimator<V: ?Sized> {
    /// Returns the size of `value` in bytes.
    fn size_of(&self, value: &V) -> CacheResult<u64>;
}

/// Measures values by the length of their JSON encoding.
///
/// ```
/// use cachet_core::{JsonSize, SizeEstimator};
///
/// assert_eq!(JsonSize.size_of(&"hello").unwrap(), 7); // "hello" with quotes
/// assert_eq!(JsonSize.size_of(&vec![1, 2, 3]).unwrap(), 7); // [1,2,3]
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSize;

impl<V: Serialize + ?Sized> SizeEstimator<V> for JsonSize {
    fn size_of(&self, value: &V) -> CacheResult<u64> {
        serde_json::to_vec(value)
            .map(|bytes| bytes.len() as u64)
            .map_err(CacheError::serialization)
    }
}

/// Measures values by their estimated in-memory footprint.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeapSize;

impl<V: MemoryEstimator + ?Sized> SizeEstimator<V> for HeapSize {
    fn size_of(&self, value: &V) -> CacheResult<u64> {
        Ok(value.estimate_memory() as u64)
    }
}

/// Adapts a closure into a [`SizeEstimator`].
///
/// ```
/// use cachet_core::{CacheResult, SizeEstimator, SizeFn};
///
/// let fixed = SizeFn(|_: &String| -> CacheResult<u64> { Ok(100) });
/// assert_eq!(fixed.size_of(&"anything".to_string()).unwrap(), 100);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct SizeFn<F>(pub F);

impl<V: ?Sized, F> SizeEstimator<V> for SizeFn<F>
where
    F: Fn(&V) -> CacheResult<u64>,
{
    fn size_of(&self, value: &V) -> CacheResult<u64> {
        (self.0)(value)
    }
}

/// Estimates the total memory held by a value, heap allocations included.
///
/// The default implementation only counts the inline size
/// (`std::mem::size_of_val`), which is exact for plain-old-data types.
///
/// ```
/// use cachet_core::MemoryEstimator;
///
/// struct Completion {
///     model: String,
///     tokens: Vec<u32>,
/// }
///
/// impl MemoryEstimator for Completion {
///     fn estimate_memory(&self) -> usize {
///         std::mem::size_of::<Self>() + self.model.capacity() + self.tokens.capacity() * 4
///     }
/// }
/// ```
pub trait MemoryEstimator {
    fn estimate_memory(&self) -> usize {
        std::mem::size_of_val(self)
    }
}

macro_rules! inline_only {
    ($($ty:ty),* $(,)?) => {
        $(impl MemoryEstimator for $ty {})*
    };
}

inline_only!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, bool, char, ()
);

impl MemoryEstimator for str {
    fn estimate_memory(&self) -> usize {
        self.len()
    }
}

impl MemoryEstimator for String {
    fn estimate_memory(&self) -> usize {
        std::mem::size_of::<Self>() + self.capacity()
    }
}

impl<T: MemoryEstimator> MemoryEstimator for Vec<T> {
    fn estimate_memory(&self) -> usize {
        let spare = (self.capacity() - self.len()) * std::mem::size_of::<T>();
        std::mem::size_of::<Self>() + spare + self.iter().map(T::estimate_memory).sum::<usize>()
    }
}

impl<T: MemoryEstimator> MemoryEstimator for Option<T> {
    fn estimate_memory(&self) -> usize {
        let inline = std::mem::size_of::<Self>();
        match self {
            Some(value) => (inline + value.estimate_memory()).saturating_sub(std::mem::size_of::<T>()),
            None => inline,
        }
    }
}

impl<T: MemoryEstimator + ?Sized> MemoryEstimator for Box<T> {
    fn estimate_memory(&self) -> usize {
        std::mem::size_of::<Self>() + (**self).estimate_memory()
    }
}

impl<K: MemoryEstimator, V: MemoryEstimator> MemoryEstimator for BTreeMap<K, V> {
    fn estimate_memory(&self) -> usize {
        std::mem::size_of::<Self>()
            + self
                .iter()
                .map(|(k, v)| k.estimate_memory() + v.estimate_memory())
                .sum::<usize>()
    }
}

impl<K: MemoryEstimator, V: MemoryEstimator, S> MemoryEstimator for HashMap<K, V, S> {
    fn estimate_memory(&self) -> usize {
        std::mem::size_of::<Self>()
            + self
                .iter()
                .map(|(k, v)| k.estimate_memory() + v.estimate_memory())
                .sum::<usize>()
    }
}

impl MemoryEstimator for serde_json::Value {
    fn estimate_memory(&self) -> usize {
        use serde_json::Value;

        let inline = std::mem::size_of::<Value>();
        inline
            + match self {
                Value::Null | Value::Bool(_) | Value::Number(_) => 0,
                Value::String(s) => s.capacity(),
                Value::Array(items) => items.iter().map(Value::estimate_memory).sum(),
                Value::Object(map) => map
                    .iter()
                    .map(|(k, v)| k.capacity() + v.estimate_memory())
                    .sum(),
            }
    }
}
