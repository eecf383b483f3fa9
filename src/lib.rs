//! Stratum - an ordered map built on a probabilistic skip list.
//!
//! Lookups, inserts, and removals by key, plus minimum and maximum
//! extraction, all run in expected O(log n). Node heights are drawn from a
//! geometric distribution, so the structure stays balanced without any
//! rebalancing step.
//!
//! # Quick Start
//!
//! ```
//! use stratum::{Error, SkipList};
//!
//! // Step size 4, towers up to level 32
//! let list = SkipList::new(4, 32);
//!
//! list.put(0, "hello");
//! list.put(1, "world");
//! list.put(2, "stratum");
//! assert_eq!(list.len(), 3);
//!
//! assert_eq!(list.find(&0), Ok("hello"));
//! assert_eq!(list.find(&100), Err(Error::NotFound));
//! assert_eq!(list.find_min(), Ok("hello"));
//! assert_eq!(list.find_max(), Ok("stratum"));
//!
//! assert_eq!(list.pop(&1), Ok("world"));
//! assert_eq!(list.pop_min(), Ok("hello"));
//! assert_eq!(list.pop_max(), Ok("stratum"));
//! assert!(list.is_empty());
//! ```
//!
//! # Structures
//!
//! - [`SkipList`]: shareable between threads. Lookups take a shared lock,
//!   mutations an exclusive one, and [`SkipList::len`] is lock-free.
//! - [`RawSkipList`]: the same structure for single-threaded use, with
//!   borrowing lookups.
//!
//! Heights come from a [`rand::Rng`]; pass a seeded one through
//! [`SkipList::with_rng`] for reproducible layouts.

pub mod config;
pub mod error;
pub mod level;
pub mod raw;
pub mod sync;

pub use config::{Config, DEFAULT_MAX_LEVEL, DEFAULT_STEP_SIZE, MAX_LEVEL_CAP};
pub use error::{Error, Result};
pub use raw::RawSkipList;
pub use sync::SkipList;
