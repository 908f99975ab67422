/*
 * SPDX-FileCopyrightText: 2025 Tommaso Fontana
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Errors surfaced by computations and by the concurrent task runner.
//!
//! The taxonomy is small on purpose: configuration problems are detected
//! before any task is scheduled, cooperative cancellation is a signal of its
//! own (so callers can tell “stopped on purpose” from “crashed”), and task
//! failures are aggregated rather than masked, so that no diagnostic
//! information is lost when several tasks fail concurrently.

use std::time::Duration;

/// The error type of this crate.
///
/// A failed run returns no result at all: callers must treat any of these
/// variants as “no computation happened”, never as a partially updated
/// result.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid parameters, detected before any task has been scheduled.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The termination flag was tripped while the computation was running.
    ///
    /// This variant is never wrapped inside [`TaskFailure`](Error::TaskFailure).
    #[error("the computation was cancelled")]
    Cancelled,

    /// One or more tasks failed.
    ///
    /// All per-task errors are collected, so failures in tasks other than
    /// the first are not silently dropped.
    #[error("{} task(s) failed; first failure: {}", .0.len(), .0.first().map(|e| e.to_string()).unwrap_or_default())]
    TaskFailure(Vec<anyhow::Error>),

    /// No task could be submitted within the configured retry budget.
    #[error(
        "could not submit tasks after {retries} attempts with a {wait:?} delay between attempts"
    )]
    SchedulingExhausted {
        /// The number of submission attempts that were made.
        retries: u64,
        /// The delay between consecutive attempts.
        wait: Duration,
    },
}

impl Error {
    /// Returns the errors collected from failed tasks, if any.
    pub fn task_errors(&self) -> &[anyhow::Error] {
        match self {
            Error::TaskFailure(errors) => errors,
            _ => &[],
        }
    }

    /// Returns true if this error is a cancellation signal.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}
