//! Multi-threaded tests for the shared skip list.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use stratum::{Error, SkipList};

fn create_test_list() -> Arc<SkipList<u64, u64>> {
    Arc::new(SkipList::new(4, 16))
}

#[test]
fn disjoint_writers_leave_consistent_chain() {
    let list = create_test_list();
    let num_threads = 8;
    let keys_per_thread = 2_000u64;
    let barrier = Arc::new(Barrier::new(num_threads));

    let handles: Vec<_> = (0..num_threads as u64)
        .map(|t| {
            let list = Arc::clone(&list);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let base = t * keys_per_thread;

                for i in 0..keys_per_thread {
                    assert_eq!(list.put(base + i, i), None);
                }
                for i in 0..keys_per_thread {
                    assert_eq!(list.find(&(base + i)), Ok(i));
                }
                // Drop the odd keys of this range again.
                for i in (1..keys_per_thread).step_by(2) {
                    assert_eq!(list.pop(&(base + i)), Ok(i));
                    assert_eq!(list.find(&(base + i)), Err(Error::NotFound));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let expected = num_threads * keys_per_thread as usize / 2;
    assert_eq!(list.len(), expected);
    list.check_invariants();

    let keys = list.level_keys(0);
    assert_eq!(keys.len(), expected);
    assert!(keys.iter().all(|k| k % 2 == 0));
}

#[test]
fn readers_run_alongside_writers() {
    let list = create_test_list();
    for k in 0..1_000 {
        list.put(k, k);
    }

    let done = Arc::new(AtomicBool::new(false));
    let num_writers = 4;
    let num_readers = 4;
    let barrier = Arc::new(Barrier::new(num_writers + num_readers));

    let readers: Vec<_> = (0..num_readers)
        .map(|_| {
            let list = Arc::clone(&list);
            let done = Arc::clone(&done);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let mut reads = 0u64;
                while !done.load(Ordering::Acquire) {
                    // The seeded range is never touched by writers.
                    for k in (0..1_000).step_by(37) {
                        assert_eq!(list.find(&k), Ok(k));
                    }
                    assert_eq!(list.find_min(), Ok(0));
                    // Values equal their keys, so the largest value is either
                    // the seeded maximum or a writer key.
                    let max = list.find_max().unwrap();
                    assert!(max == 999 || max >= 10_000, "find_max returned {max}");
                    reads += 1;
                }
                reads
            })
        })
        .collect();

    let writers: Vec<_> = (0..num_writers as u64)
        .map(|t| {
            let list = Arc::clone(&list);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let base = 10_000 + t * 1_000;
                for _ in 0..5 {
                    for i in 0..500 {
                        assert_eq!(list.put(base + i, base + i), None);
                    }
                    for i in 0..500 {
                        assert_eq!(list.pop(&(base + i)), Ok(base + i));
                    }
                }
            })
        })
        .collect();

    for writer in writers {
        writer.join().unwrap();
    }
    done.store(true, Ordering::Release);
    for reader in readers {
        assert!(reader.join().unwrap() > 0);
    }

    assert_eq!(list.len(), 1_000);
    list.check_invariants();
}

#[test]
fn concurrent_pop_min_hands_out_each_key_once() {
    let list = create_test_list();
    let total = 4_000u64;
    for k in 0..total {
        list.put(k, k);
    }

    let num_threads = 6;
    let barrier = Arc::new(Barrier::new(num_threads));
    let handles: Vec<_> = (0..num_threads)
        .map(|t| {
            let list = Arc::clone(&list);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let mut taken = Vec::new();
                loop {
                    let popped = if t % 2 == 0 { list.pop_min() } else { list.pop_max() };
                    match popped {
                        Ok(v) => taken.push(v),
                        Err(Error::NotFound) => break,
                    }
                }
                taken
            })
        })
        .collect();

    let mut all: Vec<u64> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    all.sort_unstable();

    assert_eq!(all, (0..total).collect::<Vec<_>>());
    assert!(list.is_empty());
    list.check_invariants();
}

#[test]
fn contended_updates_on_shared_keys() {
    let list = create_test_list();
    let num_threads = 8;
    let barrier = Arc::new(Barrier::new(num_threads));

    let handles: Vec<_> = (0..num_threads as u64)
        .map(|t| {
            let list = Arc::clone(&list);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..1_000u64 {
                    list.put(i % 64, t);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(list.len(), 64);
    for k in 0..64 {
        assert!(list.find(&k).unwrap() < num_threads as u64);
    }
    list.check_invariants();
}
