/*
 * SPDX-FileCopyrightText: 2025 Tommaso Fontana
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Cooperative cancellation of long-running computations.

use crate::Error;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cloneable flag that signals cooperative cancellation.
///
/// Clones share the underlying flag: a caller keeps one clone, hands another
/// to a computation, and calls [`stop`](TerminationFlag::stop) to request
/// cancellation. Computations poll the flag at task-submission boundaries
/// and between supersteps, so cancellation latency is bounded by the polling
/// interval of the [task runner](crate::concurrency::RunWithConcurrency);
/// no thread is ever interrupted.
///
/// # Examples
///
/// ```
/// use superstep::termination::TerminationFlag;
///
/// let flag = TerminationFlag::running_true();
/// assert!(flag.running());
/// assert!(flag.assert_running().is_ok());
///
/// let handle = flag.clone();
/// handle.stop();
/// assert!(!flag.running());
/// assert!(flag.assert_running().is_err());
/// ```
#[derive(Debug, Clone)]
pub struct TerminationFlag {
    running: Arc<AtomicBool>,
}

impl Default for TerminationFlag {
    fn default() -> Self {
        Self::running_true()
    }
}

impl TerminationFlag {
    /// Creates a flag that stays up until some clone calls
    /// [`stop`](TerminationFlag::stop).
    pub fn running_true() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Returns whether the computation should keep running.
    #[inline(always)]
    pub fn running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Returns [`Error::Cancelled`] if the flag has been tripped.
    #[inline(always)]
    pub fn assert_running(&self) -> Result<(), Error> {
        if self.running() {
            Ok(())
        } else {
            Err(Error::Cancelled)
        }
    }

    /// Requests cancellation on every clone of this flag.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }
}
