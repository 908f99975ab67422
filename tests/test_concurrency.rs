/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use anyhow::bail;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use superstep::concurrency::RunWithConcurrency;
use superstep::termination::TerminationFlag;
use superstep::thread_pool;
use superstep::Error;

#[test]
fn test_sequential_fallback_runs_in_order() {
    // Concurrency one and no thread pool: tasks run on the calling thread
    // in iteration order.
    let executed = Mutex::new(Vec::new());
    RunWithConcurrency::new(1)
        .run((0..10).map(|i| {
            let executed = &executed;
            move || {
                executed.lock().unwrap().push(i);
                Ok(())
            }
        }))
        .unwrap();
    assert_eq!(*executed.lock().unwrap(), (0..10).collect::<Vec<_>>());
}

#[test]
fn test_sequential_and_concurrent_agree() {
    let sum_of = |concurrency: usize, pool: Option<&rayon::ThreadPool>| {
        let total = AtomicUsize::new(0);
        let mut runner = RunWithConcurrency::new(concurrency);
        if let Some(pool) = pool {
            runner.thread_pool(pool);
        }
        runner
            .run((0..1000usize).map(|i| {
                let total = &total;
                move || {
                    total.fetch_add(i, Ordering::Relaxed);
                    Ok(())
                }
            }))
            .unwrap();
        total.load(Ordering::Relaxed)
    };

    let pool = thread_pool![4];
    let sequential = sum_of(1, None);
    let concurrent = sum_of(4, Some(&pool));
    assert_eq!(sequential, concurrent);
    assert_eq!(sequential, 1000 * 999 / 2);
}

#[test]
fn test_bounded_concurrency() {
    // No more than `concurrency` tasks may be in flight at any time.
    let pool = thread_pool![8];
    let in_flight = AtomicUsize::new(0);
    let max_in_flight = AtomicUsize::new(0);
    RunWithConcurrency::new(3)
        .thread_pool(&pool)
        .run((0..100).map(|_| {
            let in_flight = &in_flight;
            let max_in_flight = &max_in_flight;
            move || {
                let running = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                max_in_flight.fetch_max(running, Ordering::SeqCst);
                std::thread::sleep(std::time::Duration::from_micros(100));
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            }
        }))
        .unwrap();
    assert!(max_in_flight.load(Ordering::SeqCst) <= 3);
}

#[test]
fn test_all_errors_are_chained() {
    let pool = thread_pool![4];
    let result = RunWithConcurrency::new(4).thread_pool(&pool).run(
        (0..20).map(|i| {
            move || {
                if i % 7 == 0 {
                    bail!("task {i} failed");
                }
                Ok(())
            }
        }),
    );
    match result {
        Err(Error::TaskFailure(errors)) => {
            // Tasks 0, 7 and 14 failed; none of the errors may be dropped.
            assert_eq!(errors.len(), 3);
        }
        other => panic!("expected TaskFailure, got {other:?}"),
    }
}

#[test]
fn test_sequential_error_fails_fast() {
    let executed = AtomicUsize::new(0);
    let result = RunWithConcurrency::new(1).run((0..10).map(|i| {
        let executed = &executed;
        move || {
            executed.fetch_add(1, Ordering::Relaxed);
            if i == 3 {
                bail!("boom");
            }
            Ok(())
        }
    }));
    assert!(matches!(result, Err(Error::TaskFailure(_))));
    assert_eq!(executed.load(Ordering::Relaxed), 4);
}

#[test]
fn test_cancellation_before_start() {
    let flag = TerminationFlag::running_true();
    flag.stop();
    let executed = AtomicUsize::new(0);
    let result = RunWithConcurrency::new(1)
        .termination_flag(flag)
        .run((0..10).map(|_| {
            let executed = &executed;
            move || {
                executed.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
        }));
    assert!(matches!(result, Err(Error::Cancelled)));
    assert_eq!(executed.load(Ordering::Relaxed), 0);
}

#[test]
fn test_cancellation_mid_sequential() {
    let flag = TerminationFlag::running_true();
    let executed = AtomicUsize::new(0);
    let result = RunWithConcurrency::new(1)
        .termination_flag(flag.clone())
        .run((0..10).map(|i| {
            let executed = &executed;
            let flag = flag.clone();
            move || {
                executed.fetch_add(1, Ordering::Relaxed);
                if i == 3 {
                    flag.stop();
                }
                Ok(())
            }
        }));
    // The flag is checked before each submission, so task 4 never runs.
    assert!(matches!(result, Err(Error::Cancelled)));
    assert_eq!(executed.load(Ordering::Relaxed), 4);
}

#[test]
fn test_cancellation_mid_parallel() {
    let pool = thread_pool![4];
    let flag = TerminationFlag::running_true();
    let result = RunWithConcurrency::new(4)
        .thread_pool(&pool)
        .termination_flag(flag.clone())
        .run((0..1000).map(|i| {
            let flag = flag.clone();
            move || {
                if i == 0 {
                    flag.stop();
                }
                Ok(())
            }
        }));
    // Cancellation is a distinguishable signal, not a task failure.
    assert!(matches!(result, Err(Error::Cancelled)));
}

#[test]
fn test_forced_executor_requires_pool() {
    let result = RunWithConcurrency::new(1)
        .force_usage_of_executor()
        .run((0..1).map(|_| move || Ok(())));
    assert!(matches!(result, Err(Error::Configuration(_))));
}

#[test]
fn test_forced_executor_with_concurrency_one() {
    let pool = thread_pool![2];
    let total = AtomicUsize::new(0);
    RunWithConcurrency::new(1)
        .thread_pool(&pool)
        .force_usage_of_executor()
        .run((0..10usize).map(|i| {
            let total = &total;
            move || {
                total.fetch_add(i, Ordering::Relaxed);
                Ok(())
            }
        }))
        .unwrap();
    assert_eq!(total.load(Ordering::Relaxed), 45);
}

#[test]
fn test_zero_concurrency_is_rejected() {
    let result = RunWithConcurrency::new(0).run((0..1).map(|_| move || Ok(())));
    assert!(matches!(result, Err(Error::Configuration(_))));
}

#[test]
fn test_no_tasks() {
    let pool = thread_pool![2];
    RunWithConcurrency::new(2)
        .thread_pool(&pool)
        .run(std::iter::empty::<fn() -> anyhow::Result<()>>())
        .unwrap();
}
