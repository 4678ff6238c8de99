//! # Append-Only Growable Event Log
//!
//! A lock-free, single-producer / single-consumer queue of [`EventRecord`]s,
//! realized as a linked chain of fixed-capacity blocks.
//!
//! ## Roles
//!
//! [`event_log`] returns two handles:
//!
//! - [`LogProducer`]: owned by the recording thread. It appends records by
//!   reserving a slot and committing it.
//! - [`LogConsumer`]: owned by the draining thread. It copies every record
//!   committed since the previous drain.
//!
//! Neither handle is `Clone`, and producer methods take `&mut self`. A
//! [`Reservation`] mutably borrows its producer, so a second `reserve` before
//! the matching `commit` is rejected by the borrow checker rather than left
//! as a runtime hazard.
//!
//! ## Memory layout
//!
//! ```text
//!  head (consumer)                     tail (producer)
//!    │                                   │
//!  ┌─▼──────────────┐   ┌──────────────┐ ┌▼─────────────┐
//!  │ slots[0..N]    │──▶│ slots[0..N]  │─▶ slots[0..k]  │──▶ null
//!  └────────────────┘   └──────────────┘ └──────────────┘
//! ```
//!
//! ## Synchronization
//!
//! The only contended word is the monotonic `committed` counter:
//!
//! - `commit` writes the slot, then stores the new count with `Release`.
//! - `drain_into` loads the count with `Acquire`, which makes every slot
//!   written before that store visible, along with every block link the
//!   producer published on the way.
//!
//! The producer never revisits a block once its tail has moved past it, and
//! the consumer never touches a slot that has not been committed.
//!
//! ## Reclamation
//!
//! The consumer frees a block once it has drained every slot in it *and* the
//! producer has published the successor link. Publishing the link is the
//! producer's last access to the old block, so the free cannot race. The
//! trailing block stays alive until both handles are dropped, at which point
//! the remaining chain is released.
//!
//! ## Block budget
//!
//! [`event_log_with_limit`] caps the number of live (allocated, not yet
//! freed) blocks. Hitting the cap exhausts the producer exactly like a failed
//! allocation: the thread stops recording and everything committed so far
//! stays drainable.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicPtr, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::engine::error::LogError;
use crate::engine::types::EventRecord;


type Slot = UnsafeCell<MaybeUninit<EventRecord>>;

/// Fixed-capacity array of record slots plus a link to the next block.
struct Block {
    slots: Box<[Slot]>,
    next: AtomicPtr<Block>,
}

impl Block {
    /// Allocates an empty block, returning `None` if the slot storage cannot
    /// be allocated.
    fn try_alloc(capacity: usize) -> Option<NonNull<Block>> {
        let mut slots: Vec<Slot> = Vec::new();
        slots.try_reserve_exact(capacity).ok()?;
        slots.resize_with(capacity, || UnsafeCell::new(MaybeUninit::uninit()));

        let block = Box::new(Block {
            slots: slots.into_boxed_slice(),
            next: AtomicPtr::new(ptr::null_mut()),
        });
        Some(NonNull::from(Box::leak(block)))
    }
}

/// State shared by the producer and consumer halves.
struct LogShared {
    /// Total records ever committed. Written by the producer only.
    committed: AtomicU64,

    /// Oldest block still alive. Written by the consumer only.
    head: AtomicPtr<Block>,

    /// Blocks released by the consumer so far.
    freed_blocks: AtomicUsize,

    /// Slots per block.
    block_capacity: usize,
}

impl Drop for LogShared {
    fn drop(&mut self) {
        let mut cursor = *self.head.get_mut();
        while let Some(block) = NonNull::new(cursor) {
            // SAFETY: both handles are gone, so this is the only owner of the
            // chain starting at `head`; every block was created by `Box::leak`.
            let mut block = unsafe { Box::from_raw(block.as_ptr()) };
            cursor = *block.next.get_mut();
        }
    }
}

/// Creates a new log and returns its producer and consumer handles.
///
/// `block_capacity` is clamped to at least one record.
///
/// ## Errors
/// Returns [`LogError::Exhausted`] if the first block cannot be allocated.

pub fn event_log(block_capacity: usize) -> Result<(LogProducer, LogConsumer), LogError> {
    event_log_with_limit(block_capacity, None)
}

/// Creates a log holding at most `max_blocks` live blocks (`None` for no cap).
///
/// `max_blocks` is clamped to at least one.
///
/// ## Errors
/// Returns [`LogError::Exhausted`] if the first block cannot be allocated.

pub fn event_log_with_limit(
    block_capacity: usize,
    max_blocks: Option<usize>,
) -> Result<(LogProducer, LogConsumer), LogError> {
    let block_capacity = block_capacity.max(1);
    let first = Block::try_alloc(block_capacity).ok_or(LogError::Exhausted { block_capacity })?;

    let shared = Arc::new(LogShared {
        committed: AtomicU64::new(0),
        head: AtomicPtr::new(first.as_ptr()),
        freed_blocks: AtomicUsize::new(0),
        block_capacity,
    });

    let producer = LogProducer {
        shared: Arc::clone(&shared),
        tail: first,
        tail_len: 0,
        committed: 0,
        allocated_blocks: 1,
        max_blocks: max_blocks.map(|max| max.max(1)),
        exhausted: false,
    };

    let consumer = LogConsumer {
        shared,
        head: first,
        head_pos: 0,
        drained: 0,
    };

    Ok((producer, consumer))
}

/// Producer half of an event log.
///
/// ## Invariants
/// * `tail` is the last block of the chain and is never freed while the
///   producer is alive.
/// * `tail_len` slots of `tail` are committed.
/// * `committed` mirrors the shared counter (the producer is its only writer).
/// * `allocated_blocks - freed_blocks` is the number of live blocks.

pub struct LogProducer {
    shared: Arc<LogShared>,
    tail: NonNull<Block>,
    tail_len: usize,
    committed: u64,
    allocated_blocks: usize,
    max_blocks: Option<usize>,
    exhausted: bool,
}

// SAFETY: the producer is the only writer of `tail` and of uncommitted slots.
// Moving it to another thread moves that exclusive role with it.
unsafe impl Send for LogProducer {}

impl LogProducer {
    /// Returns the next uncommitted slot, extending the chain when the tail
    /// block is full.
    ///
    /// ## Errors
    /// Returns [`LogError::Exhausted`] if a new block cannot be allocated and
    /// [`LogError::BlockLimit`] if the live-block cap is reached. Once either
    /// happens every later call fails with [`LogError::Exhausted`]; records
    /// committed earlier remain drainable.

    pub fn reserve(&mut self) -> Result<Reservation<'_>, LogError> {
        let block_capacity = self.shared.block_capacity;
        if self.exhausted {
            return Err(LogError::Exhausted { block_capacity });
        }

        if self.tail_len == block_capacity {
            if let Some(max_blocks) = self.max_blocks {
                let live = self.allocated_blocks - self.shared.freed_blocks.load(Ordering::Relaxed);
                if live >= max_blocks {
                    self.exhausted = true;
                    return Err(LogError::BlockLimit { max_blocks });
                }
            }

            let Some(block) = Block::try_alloc(block_capacity) else {
                self.exhausted = true;
                return Err(LogError::Exhausted { block_capacity });
            };
            self.allocated_blocks += 1;

            // SAFETY: the tail is never freed while its successor link is null.
            // Publishing the link is the producer's last access to this block.
            unsafe { self.tail.as_ref() }.next.store(block.as_ptr(), Ordering::Release);
            self.tail = block;
            self.tail_len = 0;
        }

        Ok(Reservation { producer: self })
    }

    /// Appends one record (reserve followed by commit).
    #[inline]
    pub fn push(&mut self, record: EventRecord) -> Result<(), LogError> {
        self.reserve().map(|slot| slot.commit(record))
    }

    /// Number of records committed so far.
    #[inline]
    pub fn committed(&self) -> u64 {
        self.committed
    }

    /// Returns `true` once a block allocation has failed or the block cap was hit.
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}

/// An outstanding reservation of the next log slot.
///
/// Dropping a reservation without committing publishes nothing; the slot is
/// handed out again by the next `reserve`.

pub struct Reservation<'a> {
    producer: &'a mut LogProducer,
}

impl Reservation<'_> {
    /// Writes `record` into the reserved slot and publishes it.
    #[inline]
    pub fn commit(self, record: EventRecord) {
        let producer = self.producer;

        // SAFETY: `reserve` guaranteed `tail_len < capacity` for the live tail,
        // and the slot is not visible to the consumer until the store below.
        unsafe {
            let block = producer.tail.as_ref();
            (*block.slots[producer.tail_len].get()).write(record);
        }

        producer.tail_len += 1;
        producer.committed += 1;
        producer.shared.committed.store(producer.committed, Ordering::Release);
    }
}

/// Consumer half of an event log.
///
/// ## Invariants
/// * `head` is the oldest live block; `head_pos` slots of it are drained.
/// * `drained` counts every record returned so far.

pub struct LogConsumer {
    shared: Arc<LogShared>,
    head: NonNull<Block>,
    head_pos: usize,
    drained: u64,
}

// SAFETY: the consumer only reads committed slots and frees blocks the
// producer has left behind; that role moves with the handle.
unsafe impl Send for LogConsumer {}

impl LogConsumer {
    /// Number of records committed but not yet drained.
    #[inline]
    pub fn pending(&self) -> u64 {
        self.shared.committed.load(Ordering::Acquire) - self.drained
    }

    /// Total number of records drained so far.
    #[inline]
    pub fn drained(&self) -> u64 {
        self.drained
    }

    /// Drains every record committed since the last drain, in commit order.
    pub fn drain_all(&mut self) -> Vec<EventRecord> {
        let mut out = Vec::new();
        self.drain_into(&mut out);
        out
    }

    /// Appends every record committed since the last drain to `out`, in commit
    /// order, and returns how many were appended.
    ///
    /// A record whose reservation has not been committed yet is not visible
    /// and will be returned by a later drain.

    pub fn drain_into(&mut self, out: &mut Vec<EventRecord>) -> usize {
        let committed = self.shared.committed.load(Ordering::Acquire);
        let total = (committed - self.drained) as usize;
        let block_capacity = self.shared.block_capacity;

        out.reserve(total);
        let mut remaining = total;

        while remaining > 0 {
            if self.head_pos == block_capacity && !self.advance_head() {
                // Unreachable while the producer publishes links before commits.
                break;
            }

            // SAFETY: `head` is alive until this consumer frees it.
            let block = unsafe { self.head.as_ref() };
            let take = remaining.min(block_capacity - self.head_pos);

            for slot in &block.slots[self.head_pos..self.head_pos + take] {
                // SAFETY: every slot below the acquired committed count was
                // fully written before the producer's release store.
                out.push(unsafe { (*slot.get()).assume_init_read() });
            }

            self.head_pos += take;
            remaining -= take;
        }

        if self.head_pos == block_capacity {
            self.advance_head();
        }

        let returned = total - remaining;
        self.drained += returned as u64;
        returned
    }

    /// Moves past a fully drained head block if its successor is published,
    /// freeing it. Returns `false` if the producer has not linked a successor.
    fn advance_head(&mut self) -> bool {
        // SAFETY: `head` is alive until freed below.
        let next = unsafe { self.head.as_ref() }.next.load(Ordering::Acquire);
        let Some(next) = NonNull::new(next) else {
            return false;
        };

        let drained_block = std::mem::replace(&mut self.head, next);
        self.head_pos = 0;
        self.shared.head.store(next.as_ptr(), Ordering::Release);
        self.shared.freed_blocks.fetch_add(1, Ordering::Relaxed);

        // SAFETY: every slot was drained and the producer stopped touching the
        // block when it published `next`.
        drop(unsafe { Box::from_raw(drained_block.as_ptr()) });
        true
    }
}
