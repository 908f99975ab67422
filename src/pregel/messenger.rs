/*
 * SPDX-FileCopyrightText: 2025 Tommaso Fontana
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Message inboxes with atomic, reducing accumulation.
//!
//! Each node has a single `f64` inbox slot; messages targeting the same
//! node are combined on arrival by the per-run [`Reducer`] through a
//! compare-and-swap loop on the slot's bit pattern. Since reducers are
//! commutative and associative, the combined value visible at the next
//! superstep equals the reduction of every message sent to the node,
//! regardless of the interleaving of the sending threads. This is the
//! invariant the whole engine's determinism rests on.
//!
//! The empty slot is represented by a NaN bit pattern, so a combined value
//! of `0.0` is distinguishable from “no message”. As a consequence, NaN is
//! not a valid message.

use crate::pregel::Reducer;
use crossbeam_utils::CachePadded;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// The bit pattern marking an empty inbox slot.
const EMPTY: u64 = f64::NAN.to_bits();

/// A per-node inbox addressed by node id.
///
/// [`send_to`](Messenger::send_to) may be called concurrently from any
/// thread; [`message`](Messenger::message) and
/// [`has_message`](Messenger::has_message) are called for a node only by
/// the task owning its partition; [`init_superstep`](Messenger::init_superstep)
/// is called by the scheduler alone, between supersteps.
pub(crate) trait Messenger: Send + Sync {
    /// Moves the inbox to the next superstep.
    fn init_superstep(&mut self);

    /// Combines a message into the inbox of the target node.
    fn send_to(&self, target: usize, message: f64);

    /// Returns the combined messages of a node, if any.
    fn message(&self, node: usize) -> Option<f64>;

    /// Returns true if the node has messages to read.
    fn has_message(&self, node: usize) -> bool;

    /// Returns true if any message was sent since the last superstep
    /// boundary.
    fn message_pending(&self) -> bool;
}

/// Combines `message` into `slot` with a compare-and-swap loop.
#[inline(always)]
fn combine_into(slot: &AtomicU64, reducer: Reducer, message: f64) {
    debug_assert!(!message.is_nan(), "NaN is not a valid message");
    let mut current = slot.load(Ordering::Relaxed);
    loop {
        let combined = if f64::from_bits(current).is_nan() {
            message
        } else {
            reducer.combine(f64::from_bits(current), message)
        };
        match slot.compare_exchange_weak(
            current,
            combined.to_bits(),
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => return,
            Err(actual) => current = actual,
        }
    }
}

fn empty_buffer(n: usize) -> Box<[AtomicU64]> {
    Vec::from_iter((0..n).map(|_| AtomicU64::new(EMPTY))).into_boxed_slice()
}

/// The synchronous, double-buffered inbox.
///
/// Sends land in the write buffer, reads come from the read buffer, which
/// was populated during the previous superstep; the buffers swap at the
/// superstep boundary. Every node therefore observes a fully settled view
/// of the previous superstep's messages, independently of the order in
/// which partitions are processed — the discipline required by algorithms
/// whose definition assumes simultaneous updates.
pub(crate) struct SyncDoubleBufferedMessenger {
    read: Box<[AtomicU64]>,
    write: Box<[AtomicU64]>,
    reducer: Reducer,
    pending: CachePadded<AtomicBool>,
}

impl SyncDoubleBufferedMessenger {
    pub(crate) fn new(n: usize, reducer: Reducer) -> Self {
        Self {
            read: empty_buffer(n),
            write: empty_buffer(n),
            reducer,
            pending: CachePadded::new(AtomicBool::new(false)),
        }
    }
}

impl Messenger for SyncDoubleBufferedMessenger {
    fn init_superstep(&mut self) {
        std::mem::swap(&mut self.read, &mut self.write);
        // The old read buffer becomes the new write buffer and must be
        // emptied. We have exclusive access here, so plain stores suffice.
        for slot in self.write.iter() {
            slot.store(EMPTY, Ordering::Relaxed);
        }
        self.pending.store(false, Ordering::Relaxed);
    }

    #[inline(always)]
    fn send_to(&self, target: usize, message: f64) {
        combine_into(&self.write[target], self.reducer, message);
        self.pending.store(true, Ordering::Relaxed);
    }

    #[inline(always)]
    fn message(&self, node: usize) -> Option<f64> {
        let value = f64::from_bits(self.read[node].load(Ordering::Relaxed));
        (!value.is_nan()).then_some(value)
    }

    #[inline(always)]
    fn has_message(&self, node: usize) -> bool {
        !f64::from_bits(self.read[node].load(Ordering::Relaxed)).is_nan()
    }

    #[inline(always)]
    fn message_pending(&self) -> bool {
        self.pending.load(Ordering::Relaxed)
    }
}

/// The asynchronous, single-buffered inbox.
///
/// Sends are immediately visible: a message sent to a node that has not
/// been computed yet in the current superstep will be read in this very
/// superstep. Reading consumes the slot. Convergence is often faster than
/// with the synchronous inbox, but results depend on the processing order
/// and are not reproducible across different partitionings.
pub(crate) struct AsyncSingleBufferedMessenger {
    buffer: Box<[AtomicU64]>,
    reducer: Reducer,
    pending: CachePadded<AtomicBool>,
}

impl AsyncSingleBufferedMessenger {
    pub(crate) fn new(n: usize, reducer: Reducer) -> Self {
        Self {
            buffer: empty_buffer(n),
            reducer,
            pending: CachePadded::new(AtomicBool::new(false)),
        }
    }
}

impl Messenger for AsyncSingleBufferedMessenger {
    fn init_superstep(&mut self) {
        // Unread messages stay in the buffer; they were accounted for by
        // the pending flag at the boundary in which they were sent.
        self.pending.store(false, Ordering::Relaxed);
    }

    #[inline(always)]
    fn send_to(&self, target: usize, message: f64) {
        combine_into(&self.buffer[target], self.reducer, message);
        self.pending.store(true, Ordering::Relaxed);
    }

    #[inline(always)]
    fn message(&self, node: usize) -> Option<f64> {
        let value = f64::from_bits(self.buffer[node].swap(EMPTY, Ordering::Relaxed));
        (!value.is_nan()).then_some(value)
    }

    #[inline(always)]
    fn has_message(&self, node: usize) -> bool {
        !f64::from_bits(self.buffer[node].load(Ordering::Relaxed)).is_nan()
    }

    #[inline(always)]
    fn message_pending(&self) -> bool {
        self.pending.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_messages_invisible_until_swap() {
        let mut messenger = SyncDoubleBufferedMessenger::new(4, Reducer::Sum);
        messenger.send_to(2, 1.0);
        messenger.send_to(2, 2.0);
        assert_eq!(messenger.message(2), None);
        assert!(messenger.message_pending());

        messenger.init_superstep();
        assert_eq!(messenger.message(2), Some(3.0));
        assert!(messenger.has_message(2));
        assert!(!messenger.has_message(0));
        assert!(!messenger.message_pending());

        messenger.init_superstep();
        assert_eq!(messenger.message(2), None);
    }

    #[test]
    fn test_async_messages_visible_and_consumed() {
        let mut messenger = AsyncSingleBufferedMessenger::new(4, Reducer::Min);
        messenger.send_to(1, 5.0);
        messenger.send_to(1, 3.0);
        messenger.send_to(1, 7.0);
        assert_eq!(messenger.message(1), Some(3.0));
        // Reading consumes the slot.
        assert_eq!(messenger.message(1), None);
        messenger.init_superstep();
        assert!(!messenger.message_pending());
    }

    #[test]
    fn test_zero_message_is_not_empty() {
        let mut messenger = SyncDoubleBufferedMessenger::new(1, Reducer::Sum);
        messenger.send_to(0, 0.0);
        messenger.init_superstep();
        assert_eq!(messenger.message(0), Some(0.0));
    }
}
