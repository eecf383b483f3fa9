//! Thread-safe skip list.
//!
//! One reader/writer lock guards the whole structure. Lookups share the
//! lock, mutations take it exclusively, and no operation holds it while
//! calling another, so the list cannot deadlock on itself.
//!
//! The length is mirrored in an atomic that is updated while the write lock
//! is still held, so [`SkipList::len`] never waits on the lock. A length
//! read without the lock may lag a mutation that is in flight.

use std::borrow::Borrow;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;
use rand::Rng;
use rand::rngs::StdRng;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::raw::RawSkipList;

/// An ordered map shared between threads.
///
/// ```
/// use stratum::{Error, SkipList};
///
/// let list = SkipList::new(4, 16);
/// list.put(2, "two");
/// list.put(1, "one");
///
/// assert_eq!(list.find(&1), Ok("one"));
/// assert_eq!(list.find_max(), Ok("two"));
/// assert_eq!(list.pop_min(), Ok("one"));
/// assert_eq!(list.find(&1), Err(Error::NotFound));
/// assert_eq!(list.len(), 1);
/// ```
pub struct SkipList<K, V, R = StdRng> {
    inner: RwLock<RawSkipList<K, V, R>>,
    /// Lock-free copy of the inner length.
    len: AtomicUsize,
    config: Config,
}

impl<K: Ord, V> SkipList<K, V, StdRng> {
    /// Create an empty list. A `step_size` below 2 or a `max_level` above
    /// 64 is replaced by its default.
    pub fn new(step_size: usize, max_level: usize) -> Self {
        Self::with_config(Config::new(step_size, max_level))
    }

    pub fn with_config(config: Config) -> Self {
        Self::from_raw(RawSkipList::with_config(config))
    }
}

impl<K: Ord, V, R: Rng> SkipList<K, V, R> {
    /// Create an empty list that draws node heights from `rng`.
    pub fn with_rng(config: Config, rng: R) -> Self {
        Self::from_raw(RawSkipList::with_rng(config, rng))
    }

    /// Share an existing single-threaded list.
    pub fn from_raw(raw: RawSkipList<K, V, R>) -> Self {
        SkipList {
            len: AtomicUsize::new(raw.len()),
            config: raw.config(),
            inner: RwLock::new(raw),
        }
    }

    /// Take the single-threaded list back out.
    pub fn into_raw(self) -> RawSkipList<K, V, R> {
        self.inner.into_inner()
    }

    /// Number of entries. Never blocks.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn step_size(&self) -> usize {
        self.config.step_size()
    }

    /// The maximum level.
    pub fn level(&self) -> usize {
        self.config.max_level()
    }

    pub fn config(&self) -> Config {
        self.config
    }

    // --- Reads (shared lock) ---

    /// Clone of the value bound to `key`.
    pub fn find<Q>(&self, key: &Q) -> Result<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
        V: Clone,
    {
        self.find_with(key, V::clone)
    }

    /// Apply `f` to the value bound to `key` while the read lock is held.
    pub fn find_with<Q, F, T>(&self, key: &Q, f: F) -> Result<T>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
        F: FnOnce(&V) -> T,
    {
        let inner = self.inner.read();
        inner.find(key).map(f).ok_or(Error::NotFound)
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.inner.read().contains(key)
    }

    /// Clone of the value bound to the smallest key.
    pub fn find_min(&self) -> Result<V>
    where
        V: Clone,
    {
        let inner = self.inner.read();
        inner.find_min().cloned().ok_or(Error::NotFound)
    }

    /// Clone of the value bound to the largest key.
    pub fn find_max(&self) -> Result<V>
    where
        V: Clone,
    {
        let inner = self.inner.read();
        inner.find_max().cloned().ok_or(Error::NotFound)
    }

    // --- Writes (exclusive lock) ---

    /// Bind `key` to `value`, returning the value it replaced.
    pub fn put(&self, key: K, value: V) -> Option<V> {
        let mut inner = self.inner.write();
        let replaced = inner.put(key, value);
        if replaced.is_none() {
            self.len.fetch_add(1, Ordering::Release);
        }
        replaced
    }

    /// Remove `key`, returning its value.
    pub fn pop<Q>(&self, key: &Q) -> Result<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut inner = self.inner.write();
        let popped = inner.pop(key);
        self.removed(popped)
    }

    /// Remove the smallest key, returning its value.
    pub fn pop_min(&self) -> Result<V> {
        let mut inner = self.inner.write();
        let popped = inner.pop_min();
        self.removed(popped)
    }

    /// Remove the largest key, returning its value.
    pub fn pop_max(&self) -> Result<V> {
        let mut inner = self.inner.write();
        let popped = inner.pop_max();
        self.removed(popped)
    }

    /// Must run while the write lock is held.
    fn removed(&self, popped: Option<V>) -> Result<V> {
        let value = popped.ok_or(Error::NotFound)?;
        self.len.fetch_sub(1, Ordering::Release);
        Ok(value)
    }

    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.clear();
        self.len.store(0, Ordering::Release);
    }

    // --- Diagnostics ---

    /// Keys linked on `level`, in link order. Takes the read lock.
    ///
    /// # Panics
    ///
    /// Panics if `level` is above [`level()`](Self::level).
    #[doc(hidden)]
    pub fn level_keys(&self, level: usize) -> Vec<K>
    where
        K: Clone,
    {
        self.inner.read().level_keys(level)
    }

    /// Panic if the structure or the length mirror is inconsistent.
    pub fn check_invariants(&self) {
        let inner = self.inner.read();
        inner.check_invariants();
        let mirrored = self.len.load(Ordering::Acquire);
        assert_eq!(
            mirrored,
            inner.len(),
            "INVARIANT VIOLATED: len()={} != linked nodes {}",
            mirrored,
            inner.len()
        );
    }
}

impl<K: Ord, V> Default for SkipList<K, V, StdRng> {
    fn default() -> Self {
        Self::with_config(Config::default())
    }
}

impl<K, V, R> fmt::Debug for SkipList<K, V, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SkipList")
            .field("len", &self.len.load(Ordering::Relaxed))
            .field("step_size", &self.config.step_size())
            .field("max_level", &self.config.max_level())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn list_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SkipList<String, Vec<u8>>>();
    }

    #[test]
    fn len_follows_mutations() {
        let list = SkipList::with_rng(Config::default(), StdRng::seed_from_u64(1));
        assert_eq!(list.put(1, 'a'), None);
        assert_eq!(list.put(2, 'b'), None);
        assert_eq!(list.put(1, 'c'), Some('a'));
        assert_eq!(list.len(), 2);

        assert_eq!(list.pop(&3), Err(Error::NotFound));
        assert_eq!(list.len(), 2);

        assert_eq!(list.pop_max(), Ok('b'));
        assert_eq!(list.pop_min(), Ok('c'));
        assert_eq!(list.pop_min(), Err(Error::NotFound));
        assert!(list.is_empty());
        list.check_invariants();
    }

    #[test]
    fn find_with_borrows() {
        let list = SkipList::new(4, 16);
        list.put("k", vec![1u8, 2, 3]);
        assert_eq!(list.find_with("k", Vec::len), Ok(3));
        assert_eq!(list.find_with("z", Vec::len), Err(Error::NotFound));
    }

    #[test]
    fn raw_round_trip_keeps_len() {
        let mut raw = RawSkipList::new(4, 16);
        raw.put(1u32, ());
        raw.put(2u32, ());
        let list = SkipList::from_raw(raw);
        assert_eq!(list.len(), 2);
        list.put(3, ());
        list.check_invariants();

        let raw = list.into_raw();
        assert_eq!(raw.len(), 3);
    }

    #[test]
    fn clear_resets_len() {
        let list: SkipList<i32, i32> = SkipList::default();
        for k in 0..10 {
            list.put(k, k);
        }
        list.clear();
        assert_eq!(list.len(), 0);
        assert_eq!(list.find_max(), Err(Error::NotFound));
        list.check_invariants();
    }
}
