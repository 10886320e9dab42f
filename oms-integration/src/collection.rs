//! Specialised collection aliases used throughout the OMS for variable-cardinality
//! and small-key data.

/// Fast `IndexMap` using the FNV hasher — appropriate for the small, short keys
/// (instrument ids, exchange ids, client order ids) this system hashes constantly
/// on the hot path.
pub type FnvIndexMap<K, V> = indexmap::IndexMap<K, V, fnv::FnvBuildHasher>;

/// Fast `IndexSet` using the FNV hasher.
pub type FnvIndexSet<T> = indexmap::IndexSet<T, fnv::FnvBuildHasher>;

/// Fast `HashMap` using the FNV hasher, for lookups that don't need insertion order.
pub type FnvHashMap<K, V> = fnv::FnvHashMap<K, V>;
