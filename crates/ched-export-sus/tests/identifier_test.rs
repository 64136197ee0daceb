use ched_export_sus::{IdentifierAllocationManager, IdentifierError};
use pretty_assertions::assert_eq;

#[test]
fn overlapping_notes_get_distinct_keys_until_the_pool_runs_out() {
    let mut manager = IdentifierAllocationManager::new();
    let capacity = IdentifierAllocationManager::capacity();
    assert_eq!(capacity, 36);

    let mut keys: Vec<char> = (0..capacity)
        .map(|i| manager.allocate(i as i64, 10_000).expect("pool not exhausted"))
        .collect();
    keys.sort_unstable();
    keys.dedup();
    assert_eq!(keys.len(), capacity);

    assert_eq!(
        manager.allocate(100, 10),
        Err(IdentifierError::Exhausted { start_tick: 100 })
    );
}

#[test]
fn keys_return_to_the_pool_after_their_note_ends() {
    let mut manager = IdentifierAllocationManager::new();
    assert_eq!(manager.allocate(0, 100), Ok('A'));
    // Ends exactly at the next start: still considered alive.
    assert_eq!(manager.allocate(100, 10), Ok('B'));
    assert_eq!(manager.allocate(105, 10), Ok('A'));
    assert_eq!(manager.in_use(), 2);
}

#[test]
fn soonest_ending_keys_are_released_first() {
    let mut manager = IdentifierAllocationManager::new();
    assert_eq!(manager.allocate(0, 100), Ok('A'));
    assert_eq!(manager.allocate(0, 50), Ok('B'));
    // B is released first, then A, so A is on top of the pool.
    assert_eq!(manager.allocate(200, 0), Ok('A'));
    assert_eq!(manager.allocate(200, 0), Ok('B'));
}

#[test]
fn out_of_order_calls_are_rejected() {
    let mut manager = IdentifierAllocationManager::new();
    manager.allocate(480, 0).unwrap();

    assert_eq!(
        manager.allocate(0, 0),
        Err(IdentifierError::OutOfOrder {
            start_tick: 0,
            last_start_tick: 480
        })
    );
}

#[test]
fn clear_restores_the_pool_and_the_watermark() {
    let mut manager = IdentifierAllocationManager::new();
    for i in 0..36 {
        manager.allocate(480 + i, 10_000).unwrap();
    }

    manager.clear();

    assert_eq!(manager.in_use(), 0);
    assert_eq!(manager.allocate(0, 10), Ok('A'));
}

#[test]
fn concurrent_notes_never_share_a_key() {
    let mut manager = IdentifierAllocationManager::new();
    let notes: Vec<(i64, i64)> = (0..500).map(|i| (i * 37, (i * 53) % 400)).collect();

    let allocated: Vec<(i64, i64, char)> = notes
        .iter()
        .map(|&(start, duration)| (start, start + duration, manager.allocate(start, duration).unwrap()))
        .collect();

    for (i, a) in allocated.iter().enumerate() {
        for b in &allocated[i + 1..] {
            let overlap = b.0 <= a.1 && a.0 <= b.1;
            if overlap {
                assert_ne!(a.2, b.2, "notes {a:?} and {b:?} overlap and share a key");
            }
        }
    }
}
