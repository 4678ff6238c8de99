use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use frame_tracer::engine::log::{event_log, event_log_with_limit};
use frame_tracer::engine::types::{EventKind, EventRecord};
use frame_tracer::LogError;

fn value(i: u64) -> EventRecord {
    EventRecord::value("Seq", i as f64, i)
}

fn timestamps(records: &[EventRecord]) -> Vec<u64> {
    records.iter().map(|r| r.timestamp).collect()
}

#[test]
fn drain_returns_records_in_commit_order_across_blocks() {
    let (mut producer, mut consumer) = event_log(4).unwrap();

    for i in 0..10 {
        producer.push(value(i)).unwrap();
    }

    let drained = consumer.drain_all();
    assert_eq!(timestamps(&drained), (0..10).collect::<Vec<_>>());
    assert!(drained.iter().all(|r| r.kind == EventKind::Value && r.name == "Seq"));
    assert_eq!(consumer.drained(), 10);
    assert_eq!(producer.committed(), 10);
}

#[test]
fn drains_are_incremental_without_duplicates() {
    let (mut producer, mut consumer) = event_log(3).unwrap();

    for i in 0..5 {
        producer.push(value(i)).unwrap();
    }
    let first = consumer.drain_all();

    assert!(consumer.drain_all().is_empty());

    for i in 5..12 {
        producer.push(value(i)).unwrap();
    }
    let second = consumer.drain_all();

    assert_eq!(timestamps(&first), vec![0, 1, 2, 3, 4]);
    assert_eq!(timestamps(&second), (5..12).collect::<Vec<_>>());
}

#[test]
fn exact_block_boundary_drain_then_continue() {
    let (mut producer, mut consumer) = event_log(4).unwrap();

    for i in 0..4 {
        producer.push(value(i)).unwrap();
    }
    // Head block fully drained before the producer has linked a successor.
    assert_eq!(consumer.drain_all().len(), 4);

    for i in 4..9 {
        producer.push(value(i)).unwrap();
    }
    assert_eq!(timestamps(&consumer.drain_all()), (4..9).collect::<Vec<_>>());
}

#[test]
fn uncommitted_reservation_is_not_visible() {
    let (mut producer, mut consumer) = event_log(2).unwrap();

    producer.push(value(0)).unwrap();
    {
        let _slot = producer.reserve().unwrap();
        // dropped without commit
    }
    assert_eq!(consumer.pending(), 1);
    assert_eq!(timestamps(&consumer.drain_all()), vec![0]);

    let slot = producer.reserve().unwrap();
    slot.commit(value(1));
    assert_eq!(timestamps(&consumer.drain_all()), vec![1]);
}

#[test]
fn zero_block_capacity_is_clamped() {
    let (mut producer, mut consumer) = event_log(0).unwrap();

    for i in 0..3 {
        producer.push(value(i)).unwrap();
    }
    assert_eq!(timestamps(&consumer.drain_all()), vec![0, 1, 2]);
    assert!(!producer.is_exhausted());
}

#[test]
fn block_limit_stops_the_producer_for_good() {
    let (mut producer, mut consumer) = event_log_with_limit(2, Some(2)).unwrap();

    for i in 0..4 {
        producer.push(value(i)).unwrap();
    }
    assert_eq!(producer.push(value(4)), Err(LogError::BlockLimit { max_blocks: 2 }));
    assert!(producer.is_exhausted());

    // Draining frees blocks but does not revive the producer.
    assert_eq!(timestamps(&consumer.drain_all()), vec![0, 1, 2, 3]);
    assert_eq!(producer.push(value(5)), Err(LogError::Exhausted { block_capacity: 2 }));
    assert!(consumer.drain_all().is_empty());
}

#[test]
fn drained_blocks_return_to_the_budget() {
    let (mut producer, mut consumer) = event_log_with_limit(2, Some(2)).unwrap();

    for i in 0..4 {
        producer.push(value(i)).unwrap();
    }
    assert_eq!(consumer.drain_all().len(), 4);

    for i in 4..6 {
        producer.push(value(i)).unwrap();
    }
    assert!(!producer.is_exhausted());
    assert_eq!(timestamps(&consumer.drain_all()), vec![4, 5]);
}

#[test]
fn undrained_chain_is_released_on_drop() {
    let (mut producer, consumer) = event_log(8).unwrap();
    for i in 0..100 {
        producer.push(value(i)).unwrap();
    }
    drop(consumer);
    producer.push(value(100)).unwrap();
    drop(producer);
}

#[test]
fn concurrent_producer_and_consumer_see_every_record_once() {
    const RECORDS: u64 = 200_000;

    let (mut producer, mut consumer) = event_log(64).unwrap();
    let done = AtomicBool::new(false);
    let mut collected = Vec::with_capacity(RECORDS as usize);

    thread::scope(|s| {
        s.spawn(|| {
            for i in 0..RECORDS {
                producer.push(value(i)).unwrap();
            }
            done.store(true, Ordering::Release);
        });

        loop {
            let finished = done.load(Ordering::Acquire);
            consumer.drain_into(&mut collected);
            if finished {
                consumer.drain_into(&mut collected);
                break;
            }
            thread::yield_now();
        }
    });

    assert_eq!(collected.len() as u64, RECORDS);
    assert!(collected
        .iter()
        .enumerate()
        .all(|(i, record)| record.timestamp == i as u64));
    assert_eq!(consumer.pending(), 0);
}
