//! Single-threaded skip list.
//!
//! Nodes live in an arena and link to each other by index. Each node owns
//! a tower of forward links, one per level it occupies; level 0 links every
//! node in key order and each higher level links a subset of the level
//! below it.
//!
//! ```text
//! Level 2: HEAD ----------------> 17 -------------------------> NULL
//! Level 1: HEAD ------> 8 ------> 17 -------------> 40 -------> NULL
//! Level 0: HEAD -> 3 -> 8 -> 12 -> 17 -> 21 -> 33 -> 40 -> 52 -> NULL
//! ```
//!
//! The head is not an arena slot. It has exactly `max_level + 1` links and
//! no key or value, so there is nothing in it to read or overwrite.
//!
//! Every traversal starts at the head on the top level and moves right
//! while the next key is smaller than the target, dropping one level each
//! time it cannot move further. The position reached on each level is the
//! target's predecessor on that level, which is all insertion and removal
//! need to splice links.

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use smallvec::{SmallVec, smallvec};

use crate::config::Config;
use crate::level::LevelGenerator;

/// Node index type. u32 keeps towers half the size of usize links.
type Idx = u32;

/// Empty link marker.
const NULL: Idx = Idx::MAX;

/// Position of the head. Never handed out as an arena slot.
const HEAD: Idx = Idx::MAX - 1;

/// Forward links of one node. At the default step size almost every tower
/// fits inline.
type Tower = SmallVec<[Idx; 4]>;

/// Predecessor position per level, indexed by level.
type Path = SmallVec<[Idx; 17]>;

struct Node<K, V> {
    key: K,
    value: V,
    /// `next[level]` is the following node on `level`. The node occupies
    /// levels `0..next.len()`.
    next: Tower,
}

impl<K, V> Node<K, V> {
    fn height(&self) -> usize {
        self.next.len() - 1
    }
}

enum Slot<K, V> {
    Occupied(Node<K, V>),
    Vacant,
}

/// An ordered map backed by a skip list, for use from a single thread.
///
/// [`SkipList`](crate::SkipList) wraps this type in a reader/writer lock.
pub struct RawSkipList<K, V, R = StdRng> {
    /// Arena of nodes.
    nodes: Vec<Slot<K, V>>,
    /// Head links, one per level.
    head: Vec<Idx>,
    /// Vacant arena slots, reused before the arena grows.
    free_list: Vec<Idx>,
    /// Number of linked nodes.
    len: usize,
    config: Config,
    levels: LevelGenerator<R>,
}

impl<K: Ord, V> RawSkipList<K, V, StdRng> {
    /// Create an empty list. Invalid settings fall back to the defaults,
    /// see [`Config::new`].
    pub fn new(step_size: usize, max_level: usize) -> Self {
        Self::with_config(Config::new(step_size, max_level))
    }

    /// Create an empty list whose heights come from an entropy-seeded [`StdRng`].
    pub fn with_config(config: Config) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }
}

impl<K: Ord, V, R: Rng> RawSkipList<K, V, R> {
    /// Create an empty list that draws node heights from `rng`.
    pub fn with_rng(config: Config, rng: R) -> Self {
        RawSkipList {
            nodes: Vec::new(),
            head: vec![NULL; config.max_level() + 1],
            free_list: Vec::new(),
            len: 0,
            config,
            levels: LevelGenerator::new(config, rng),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn step_size(&self) -> usize {
        self.config.step_size()
    }

    /// The maximum level. Towers have at most `level() + 1` links.
    pub fn level(&self) -> usize {
        self.config.max_level()
    }

    pub fn config(&self) -> Config {
        self.config
    }

    // --- Node access helpers ---

    fn node(&self, idx: Idx) -> &Node<K, V> {
        match &self.nodes[idx as usize] {
            Slot::Occupied(node) => node,
            Slot::Vacant => panic!("INVARIANT VIOLATED: link to vacant slot {}", idx),
        }
    }

    fn node_mut(&mut self, idx: Idx) -> &mut Node<K, V> {
        match &mut self.nodes[idx as usize] {
            Slot::Occupied(node) => node,
            Slot::Vacant => panic!("INVARIANT VIOLATED: link to vacant slot {}", idx),
        }
    }

    /// Link leaving `at` on `level`. `at` may be the head.
    fn next(&self, at: Idx, level: usize) -> Idx {
        if at == HEAD {
            self.head[level]
        } else {
            self.node(at).next[level]
        }
    }

    fn set_next(&mut self, at: Idx, level: usize, to: Idx) {
        if at == HEAD {
            self.head[level] = to;
        } else {
            self.node_mut(at).next[level] = to;
        }
    }

    fn key_cmp<Q>(&self, idx: Idx, key: &Q) -> Ordering
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let stored: &Q = self.node(idx).key.borrow();
        stored.cmp(key)
    }

    fn alloc(&mut self, node: Node<K, V>) -> Idx {
        if let Some(idx) = self.free_list.pop() {
            self.nodes[idx as usize] = Slot::Occupied(node);
            return idx;
        }
        let idx = self.nodes.len();
        assert!(idx < HEAD as usize, "skip list arena exhausted at {} nodes", idx);
        self.nodes.push(Slot::Occupied(node));
        idx as Idx
    }

    /// Vacate a slot and hand back its node.
    fn release(&mut self, idx: Idx) -> Node<K, V> {
        match std::mem::replace(&mut self.nodes[idx as usize], Slot::Vacant) {
            Slot::Occupied(node) => {
                self.free_list.push(idx);
                node
            }
            Slot::Vacant => panic!("INVARIANT VIOLATED: released vacant slot {}", idx),
        }
    }

    // --- Traversal ---

    /// Descend from the top level and record, per level, the last position
    /// whose key is strictly below `key`.
    fn predecessors<Q>(&self, key: &Q) -> Path
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let top = self.config.max_level();
        let mut path: Path = smallvec![HEAD; top + 1];
        let mut at = HEAD;

        for level in (0..=top).rev() {
            loop {
                let next = self.next(at, level);
                if next == NULL || self.key_cmp(next, key) != Ordering::Less {
                    break;
                }
                at = next;
            }
            path[level] = at;
        }

        path
    }

    /// Top-down search that stops on the first level where `key` shows up.
    fn find_node<Q>(&self, key: &Q) -> Option<Idx>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut at = HEAD;

        for level in (0..=self.config.max_level()).rev() {
            loop {
                let next = self.next(at, level);
                if next == NULL {
                    break;
                }
                match self.key_cmp(next, key) {
                    Ordering::Less => at = next,
                    Ordering::Equal => return Some(next),
                    Ordering::Greater => break,
                }
            }
        }

        None
    }

    /// Run to the end of each level before dropping down. Ends on the last
    /// node without backtracking.
    fn last_node(&self) -> Option<Idx> {
        let mut at = HEAD;

        for level in (0..=self.config.max_level()).rev() {
            loop {
                let next = self.next(at, level);
                if next == NULL {
                    break;
                }
                at = next;
            }
        }

        if at == HEAD { None } else { Some(at) }
    }

    // --- Lookups ---

    pub fn find<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let idx = self.find_node(key)?;
        Some(&self.node(idx).value)
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find_node(key).is_some()
    }

    /// Value of the smallest key. O(1): it is always the head's first link.
    pub fn find_min(&self) -> Option<&V> {
        let first = self.head[0];
        if first == NULL {
            return None;
        }
        Some(&self.node(first).value)
    }

    /// Value of the largest key.
    pub fn find_max(&self) -> Option<&V> {
        let last = self.last_node()?;
        Some(&self.node(last).value)
    }

    // --- Mutation ---

    /// Bind `key` to `value`.
    ///
    /// An existing key keeps its node and tower; only the value is swapped
    /// and the previous value returned. Otherwise a node with a freshly
    /// drawn height is linked in and `None` returned.
    pub fn put(&mut self, key: K, value: V) -> Option<V> {
        let path = self.predecessors(&key);

        let candidate = self.next(path[0], 0);
        if candidate != NULL && self.key_cmp(candidate, &key) == Ordering::Equal {
            let node = self.node_mut(candidate);
            return Some(std::mem::replace(&mut node.value, value));
        }

        let height = self.levels.next_level();
        let next: Tower = (0..=height).map(|level| self.next(path[level], level)).collect();
        let idx = self.alloc(Node { key, value, next });

        for level in 0..=height {
            self.set_next(path[level], level, idx);
        }

        self.len += 1;
        tracing::trace!(slot = idx, height, len = self.len, "linked node");
        None
    }

    /// Remove `key`, returning its value.
    pub fn pop<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let path = self.predecessors(key);

        let target = self.next(path[0], 0);
        if target == NULL || self.key_cmp(target, key) != Ordering::Equal {
            return None;
        }

        Some(self.unlink(target, &path).value)
    }

    /// Remove the smallest key, returning its value.
    pub fn pop_min(&mut self) -> Option<V> {
        let first = self.head[0];
        if first == NULL {
            return None;
        }

        // The minimum is the first node on every level it occupies.
        let path: Path = smallvec![HEAD; self.config.max_level() + 1];
        Some(self.unlink(first, &path).value)
    }

    /// Remove the largest key, returning its value.
    pub fn pop_max(&mut self) -> Option<V> {
        let last = self.last_node()?;

        // Predecessors are located per level against the key itself, not
        // carried over from the walk that found the node.
        let path = self.predecessors(&self.node(last).key);
        Some(self.unlink(last, &path).value)
    }

    /// Splice `target` out of every level it occupies. `path[level]` must
    /// be its predecessor on each of those levels.
    fn unlink(&mut self, target: Idx, path: &[Idx]) -> Node<K, V> {
        let height = self.node(target).height();

        for level in 0..=height {
            let pred = path[level];
            debug_assert_eq!(
                self.next(pred, level),
                target,
                "stale predecessor on level {}",
                level
            );
            let after = self.node(target).next[level];
            self.set_next(pred, level, after);
        }

        let node = self.release(target);
        self.len -= 1;
        tracing::trace!(slot = target, height, len = self.len, "unlinked node");
        node
    }

    /// Drop every entry. Configuration and the random source are kept.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.free_list.clear();
        self.head.fill(NULL);
        self.len = 0;
    }

    // --- Diagnostics ---

    /// Nodes linked on `level`, in link order. Panics on a cycle.
    fn chain(&self, level: usize) -> Vec<Idx> {
        let mut chain = Vec::new();
        let mut at = self.head[level];
        while at != NULL {
            assert!(
                chain.len() < self.nodes.len(),
                "INVARIANT VIOLATED: cycle on level {}",
                level
            );
            chain.push(at);
            at = self.node(at).next[level];
        }
        chain
    }

    /// Keys linked on `level`, in link order.
    ///
    /// A diagnostic snapshot for inspecting the structure, not a scan API.
    ///
    /// # Panics
    ///
    /// Panics if `level` is above [`level()`](Self::level).
    #[doc(hidden)]
    pub fn level_keys(&self, level: usize) -> Vec<K>
    where
        K: Clone,
    {
        assert!(level <= self.config.max_level(), "level {} out of range", level);
        self.chain(level)
            .into_iter()
            .map(|idx| self.node(idx).key.clone())
            .collect()
    }

    /// Walk every level and panic if the structure is inconsistent.
    pub fn check_invariants(&self) {
        let top = self.config.max_level();
        assert_eq!(
            self.head.len(),
            top + 1,
            "INVARIANT VIOLATED: head has {} links, max level {}",
            self.head.len(),
            top
        );

        // Slot bookkeeping
        let occupied = self
            .nodes
            .iter()
            .filter(|slot| matches!(slot, Slot::Occupied(_)))
            .count();
        assert_eq!(
            occupied, self.len,
            "INVARIANT VIOLATED: {} occupied slots != len()={}",
            occupied, self.len
        );
        assert_eq!(
            occupied + self.free_list.len(),
            self.nodes.len(),
            "INVARIANT VIOLATED: free list out of sync with arena"
        );
        for &idx in &self.free_list {
            assert!(
                matches!(self.nodes[idx as usize], Slot::Vacant),
                "INVARIANT VIOLATED: free slot {} is occupied",
                idx
            );
        }

        let mut below: Vec<Idx> = Vec::new();
        for level in 0..=top {
            let chain = self.chain(level);

            for pair in chain.windows(2) {
                assert!(
                    self.node(pair[0]).key < self.node(pair[1]).key,
                    "INVARIANT VIOLATED: level {} out of order at slots {} -> {}",
                    level,
                    pair[0],
                    pair[1]
                );
            }

            for &idx in &chain {
                assert!(
                    self.node(idx).height() >= level,
                    "INVARIANT VIOLATED: slot {} linked above its height on level {}",
                    idx,
                    level
                );
            }

            // Every node tall enough for this level must be linked on it.
            let tall = self
                .nodes
                .iter()
                .filter(|slot| matches!(slot, Slot::Occupied(node) if node.height() >= level))
                .count();
            assert_eq!(
                chain.len(),
                tall,
                "INVARIANT VIOLATED: level {} links {} nodes but {} reach it",
                level,
                chain.len(),
                tall
            );

            if level == 0 {
                assert_eq!(
                    chain.len(),
                    self.len,
                    "INVARIANT VIOLATED: level 0 links {} nodes != len()={}",
                    chain.len(),
                    self.len
                );
            } else {
                // Both chains share an order, so one pass over the lower
                // level finds every upper node.
                let mut lower = below.iter();
                for &idx in &chain {
                    assert!(
                        lower.any(|&b| b == idx),
                        "INVARIANT VIOLATED: slot {} on level {} missing from level {}",
                        idx,
                        level,
                        level - 1
                    );
                }
            }

            below = chain;
        }
    }
}

impl<K: Ord, V> Default for RawSkipList<K, V, StdRng> {
    fn default() -> Self {
        Self::with_config(Config::default())
    }
}

impl<K, V, R> fmt::Debug for RawSkipList<K, V, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawSkipList")
            .field("len", &self.len)
            .field("step_size", &self.config.step_size())
            .field("max_level", &self.config.max_level())
            .finish_non_exhaustive()
    }
}
