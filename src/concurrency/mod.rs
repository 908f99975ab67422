/*
 * SPDX-FileCopyrightText: 2025 Tommaso Fontana
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Bounded-concurrency execution of independent tasks.
//!
//! [`RunWithConcurrency`] runs an iterator of independent tasks keeping at
//! most a configured number of them in flight at any time. Tasks are
//! submitted, in iteration order, to worker threads spawned on a
//! [Rayon](rayon) thread pool; workers and the submitting thread communicate
//! through a bounded [crossbeam channel](crossbeam_channel), which provides
//! natural backpressure when all workers are busy.
//!
//! The runner observes a [`TerminationFlag`] before every submission and
//! while waiting for a submission slot, so external cancellation is noticed
//! within one [`wait_time`](RunWithConcurrency::wait_time) even under queue
//! pressure. All task errors are collected and reported together as a single
//! [`Error::TaskFailure`]; cancellation is reported as [`Error::Cancelled`],
//! which is never folded into an aggregate failure.
//!
//! With a concurrency of one and no thread pool, tasks run synchronously on
//! the calling thread in iteration order; this fallback produces the same
//! results as the concurrent path for any order-insensitive workload.

use crate::termination::TerminationFlag;
use crate::Error;
use crossbeam_channel::SendTimeoutError;
use crossbeam_utils::CachePadded;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Utility macro to create [`thread_pools`](`rayon::ThreadPool`).
///
/// There are two forms of this macro:
/// * Create a [`ThreadPool`](rayon::ThreadPool) with the default settings:
/// ```
/// # use superstep::thread_pool;
/// let t: rayon::ThreadPool = thread_pool![];
/// ```
/// * Create a [`ThreadPool`](rayon::ThreadPool) with a given number of threads:
/// ```
/// # use superstep::thread_pool;
/// let t: rayon::ThreadPool = thread_pool![7];
/// assert_eq!(t.current_num_threads(), 7);
/// ```
#[macro_export]
macro_rules! thread_pool {
    () => {
        rayon::ThreadPoolBuilder::new()
            .build()
            .expect("Cannot build a ThreadPool with default parameters")
    };
    ($num_threads:expr) => {
        rayon::ThreadPoolBuilder::new()
            .num_threads($num_threads)
            .build()
            .unwrap_or_else(|_| {
                panic!(
                    "Cannot build a ThreadPool with default parameters and {} threads",
                    $num_threads,
                )
            })
    };
}

/// Runs a stream of independent tasks with bounded concurrency.
///
/// The runner is configured via setters and then executed via
/// [`run`](Self::run), which accepts any iterator of fallible closures.
/// Tasks must be independent: no ordering is guaranteed between tasks
/// running concurrently.
///
/// # Examples
///
/// ```
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use superstep::concurrency::RunWithConcurrency;
/// use superstep::thread_pool;
///
/// let pool = thread_pool![4];
/// let counter = AtomicUsize::new(0);
///
/// RunWithConcurrency::new(4).thread_pool(&pool).run(
///     (0..100).map(|i| {
///         let counter = &counter;
///         move || {
///             counter.fetch_add(i, Ordering::Relaxed);
///             Ok(())
///         }
///     }),
/// )?;
///
/// assert_eq!(counter.load(Ordering::Relaxed), 4950);
/// # Ok::<(), superstep::Error>(())
/// ```
#[derive(Debug)]
pub struct RunWithConcurrency<'a> {
    concurrency: usize,
    pool: Option<&'a rayon::ThreadPool>,
    force_usage_of_executor: bool,
    wait_time: Duration,
    max_wait_retries: u64,
    termination: TerminationFlag,
}

impl RunWithConcurrency<'_> {
    /// The default delay between submission attempts.
    ///
    /// This is also the bound on the latency with which the runner reacts to
    /// external cancellation while waiting for a submission slot.
    pub const DEFAULT_WAIT_TIME: Duration = Duration::from_millis(10);

    /// The default number of failed submission attempts after which the
    /// runner gives up with [`Error::SchedulingExhausted`].
    pub const DEFAULT_MAX_WAIT_RETRIES: u64 = 6_000;
}

impl<'a> RunWithConcurrency<'a> {
    /// Creates a runner with the given concurrency bound.
    ///
    /// Without a [thread pool](Self::thread_pool), or with a concurrency of
    /// at most one and no [forced executor
    /// usage](Self::force_usage_of_executor), tasks will run on the calling
    /// thread.
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency,
            pool: None,
            force_usage_of_executor: false,
            wait_time: Self::DEFAULT_WAIT_TIME,
            max_wait_retries: Self::DEFAULT_MAX_WAIT_RETRIES,
            termination: TerminationFlag::running_true(),
        }
    }

    /// Sets the thread pool tasks are submitted to.
    ///
    /// The runner never shuts down the pool: its lifecycle belongs to the
    /// caller.
    pub fn thread_pool(&mut self, pool: &'a rayon::ThreadPool) -> &mut Self {
        self.pool = Some(pool);
        self
    }

    /// Requires tasks to run on the thread pool even with a concurrency of
    /// one.
    pub fn force_usage_of_executor(&mut self) -> &mut Self {
        self.force_usage_of_executor = true;
        self
    }

    /// Sets the delay between submission attempts.
    pub fn wait_time(&mut self, wait_time: Duration) -> &mut Self {
        self.wait_time = wait_time;
        self
    }

    /// Sets the number of failed submission attempts after which the runner
    /// gives up with [`Error::SchedulingExhausted`].
    ///
    /// An attempt counts as failed only if it times out while no task is in
    /// flight, that is, when the executor is rejecting work rather than
    /// merely busy.
    pub fn max_wait_retries(&mut self, max_wait_retries: u64) -> &mut Self {
        self.max_wait_retries = max_wait_retries;
        self
    }

    /// Sets the termination flag polled by the runner.
    pub fn termination_flag(&mut self, termination: TerminationFlag) -> &mut Self {
        self.termination = termination;
        self
    }

    /// Runs all tasks to completion.
    ///
    /// Errors returned by tasks do not stop the remaining tasks: they are
    /// collected and reported together as [`Error::TaskFailure`] once every
    /// submitted task has finished, so no failure masks another. On
    /// cancellation, tasks not yet submitted are discarded, already running
    /// tasks complete, and [`Error::Cancelled`] is returned.
    ///
    /// In the synchronous fallback the first task error is returned
    /// immediately, as no other task can be in flight.
    pub fn run<T>(&self, tasks: impl IntoIterator<Item = T>) -> Result<(), Error>
    where
        T: FnOnce() -> anyhow::Result<()> + Send,
    {
        if self.concurrency == 0 {
            return Err(Error::Configuration(
                "concurrency must be strictly positive".into(),
            ));
        }
        if self.force_usage_of_executor && self.pool.is_none() {
            return Err(Error::Configuration(
                "forced executor usage requires a thread pool".into(),
            ));
        }

        let pool = match self.pool {
            Some(pool) if self.concurrency > 1 || self.force_usage_of_executor => pool,
            _ => return self.run_sync(tasks),
        };

        let errors = Mutex::new(Vec::new());
        let in_flight = CachePadded::new(AtomicUsize::new(0));
        // Rendezvous channel: a send completes only when a worker is ready
        // to take the task, which keeps at most `concurrency` tasks in
        // flight.
        let (tx, rx) = crossbeam_channel::bounded::<T>(0);

        let mut cancelled = false;
        let mut exhausted_after = None;

        pool.in_place_scope(|scope| {
            for _ in 0..self.concurrency {
                let rx = rx.clone();
                let errors = &errors;
                let in_flight = &in_flight;
                let termination = self.termination.clone();
                scope.spawn(move |_| {
                    while let Ok(task) = rx.recv() {
                        in_flight.fetch_add(1, Ordering::SeqCst);
                        // A tripped flag discards tasks that were already
                        // handed over but not yet started.
                        if termination.running() {
                            if let Err(error) = task() {
                                errors.lock().unwrap().push(error);
                            }
                        }
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                    }
                });
            }
            drop(rx);

            'submit: for task in tasks {
                if !self.termination.running() {
                    cancelled = true;
                    break 'submit;
                }
                let mut task = task;
                let mut retries = 0u64;
                loop {
                    match tx.send_timeout(task, self.wait_time) {
                        Ok(()) => break,
                        Err(SendTimeoutError::Timeout(returned)) => {
                            task = returned;
                            if !self.termination.running() {
                                cancelled = true;
                                break 'submit;
                            }
                            // A timeout with tasks in flight is plain
                            // backpressure; only an idle executor that still
                            // does not accept work counts against the retry
                            // budget.
                            if in_flight.load(Ordering::SeqCst) == 0 {
                                retries += 1;
                                if retries >= self.max_wait_retries {
                                    exhausted_after = Some(retries);
                                    break 'submit;
                                }
                            }
                        }
                        Err(SendTimeoutError::Disconnected(_)) => break 'submit,
                    }
                }
            }
            drop(tx);
            // Leaving the scope waits for every worker to drain and exit.
        });

        let errors = errors.into_inner().unwrap();
        if cancelled || !self.termination.running() {
            return Err(Error::Cancelled);
        }
        if let Some(retries) = exhausted_after {
            return Err(Error::SchedulingExhausted {
                retries,
                wait: self.wait_time,
            });
        }
        if !errors.is_empty() {
            return Err(Error::TaskFailure(errors));
        }
        Ok(())
    }

    /// The synchronous fallback: tasks run on the calling thread, in
    /// iteration order, with the termination flag checked before each.
    fn run_sync<T>(&self, tasks: impl IntoIterator<Item = T>) -> Result<(), Error>
    where
        T: FnOnce() -> anyhow::Result<()>,
    {
        for task in tasks {
            self.termination.assert_running()?;
            task().map_err(|error| Error::TaskFailure(vec![error]))?;
        }
        Ok(())
    }
}
