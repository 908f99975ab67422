/*
 * SPDX-FileCopyrightText: 2025 Tommaso Fontana
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! The vertex-centric bulk-synchronous-parallel computation engine.
//!
//! A computation proceeds in _supersteps_: in each superstep the engine
//! invokes the [vertex program](PregelComputation) once for every active
//! node, in parallel over the [partitions](crate::partition) of the node-id
//! range; a barrier follows, and then a single
//! [`master_compute`](PregelComputation::master_compute) step runs global
//! aggregation and convergence checks. Supersteps are strictly sequential —
//! there is no pipelining across the barrier — which is what makes results
//! independent of the number of threads.
//!
//! # Messages
//!
//! Nodes communicate through per-node inboxes that combine incoming
//! messages with a commutative [`Reducer`]. Two disciplines are available:
//!
//! * **synchronous** (the default): messages sent during superstep *t*
//!   become visible at the beginning of superstep *t* + 1, and every node
//!   observes a fully settled view of the previous superstep, regardless of
//!   the processing order. Results are reproducible across thread counts
//!   and partitionings (up to floating-point summation order).
//! * **asynchronous**: messages are visible within the same superstep to
//!   nodes processed later. Some algorithms converge faster this way, at
//!   the price of results that may depend on the partitioning; use it only
//!   when the algorithm tolerates processing-order dependence, as
//!   [connected components](crate::components::Wcc) does.
//!
//! # Termination
//!
//! A run stops when the first of the following happens: the vertex program's
//! `master_compute` breaks; every node has [voted to
//! halt](ComputeContext::vote_to_halt) and no message is pending; the
//! configured maximum number of supersteps has been reached. Only in the
//! last case the result reports
//! [`did_converge`](PregelResult::did_converge)` == false`. An external
//! [`TerminationFlag`] may also cancel the run at any superstep or
//! task-submission boundary, in which case no result is produced at all.
//!
//! # Examples
//!
//! A computation that counts, for every node, the number of its
//! predecessors, by having every node message `1` to its successors in the
//! first superstep:
//!
//! ```
//! use std::ops::ControlFlow;
//! use superstep::graphs::vec_graph::VecGraph;
//! use superstep::pregel::*;
//! use superstep::traits::RandomAccessGraph;
//!
//! struct CountPredecessors;
//!
//! impl<G: RandomAccessGraph> PregelComputation<G> for CountPredecessors {
//!     fn schema(&self) -> Schema {
//!         Schema::new().add("count", ValueType::Double)
//!     }
//!
//!     fn reducer(&self) -> Reducer {
//!         Reducer::Sum
//!     }
//!
//!     fn compute(
//!         &self,
//!         ctx: &mut ComputeContext<'_, G>,
//!         messages: &Messages,
//!     ) -> anyhow::Result<()> {
//!         if ctx.is_initial_superstep() {
//!             ctx.set_double_value("count", 0.0);
//!             ctx.send_to_neighbors(1.0);
//!         } else if let Some(count) = messages.value() {
//!             ctx.set_double_value("count", count);
//!         }
//!         ctx.vote_to_halt();
//!         Ok(())
//!     }
//! }
//!
//! let graph = VecGraph::from_arcs([(0, 2), (1, 2), (2, 0)]);
//! let result = Pregel::new(&graph, CountPredecessors)
//!     .max_iterations(10)
//!     .run()?;
//!
//! assert_eq!(result.node_values.double_properties("count"), &[1.0, 0.0, 2.0]);
//! assert!(result.did_converge);
//! # Ok::<(), superstep::Error>(())
//! ```

mod computation;
mod messenger;
mod node_value;

pub use computation::*;
pub use node_value::{NodeValues, Schema, ValueType};

use crate::concurrency::RunWithConcurrency;
use crate::partition::{degree_partition, range_partition, Partition, Partitioning};
use crate::termination::TerminationFlag;
use crate::traits::RandomAccessGraph;
use crate::Error;
use crossbeam_utils::CachePadded;
use dsi_progress_logger::{no_logging, ConcurrentProgressLog, ProgressLog};
use messenger::{AsyncSingleBufferedMessenger, Messenger, SyncDoubleBufferedMessenger};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use sux::bits::AtomicBitVec;

/// The commutative, associative reduction combining messages sent to the
/// same node.
///
/// Commutativity is what makes the combined inbox value independent of the
/// interleaving of the sending threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reducer {
    /// Combines messages by summing them.
    Sum,
    /// Keeps the smallest message.
    Min,
    /// Keeps the largest message.
    Max,
}

impl Reducer {
    /// Combines two messages.
    #[inline(always)]
    pub fn combine(self, a: f64, b: f64) -> f64 {
        match self {
            Reducer::Sum => a + b,
            Reducer::Min => a.min(b),
            Reducer::Max => a.max(b),
        }
    }
}

impl std::fmt::Display for Reducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reducer::Sum => f.write_str("sum"),
            Reducer::Min => f.write_str("min"),
            Reducer::Max => f.write_str("max"),
        }
    }
}

/// The result of a [`Pregel`] computation.
///
/// The run state is created afresh by every call to [`Pregel::run`] and
/// fully handed over here: nothing is cached across runs.
#[derive(Debug)]
pub struct PregelResult {
    /// The final per-node value vectors, keyed by the computation's
    /// [schema](Schema).
    pub node_values: NodeValues,
    /// The number of supersteps that ran.
    pub ran_iterations: usize,
    /// Whether the computation stopped for a reason other than exhausting
    /// the maximum number of supersteps.
    pub did_converge: bool,
    /// The global scalars published by the last
    /// [`master_compute`](PregelComputation::master_compute) steps.
    pub aggregates: HashMap<String, f64>,
}

/// The superstep scheduler.
///
/// The engine is configured via setters and executed via [`run`](Self::run)
/// or [`run_with_logging`](Self::run_with_logging); it can be run several
/// times, each run being completely independent.
///
/// See the [module documentation](self) for the computation model and an
/// example.
pub struct Pregel<'a, G: RandomAccessGraph, C: PregelComputation<G>> {
    graph: &'a G,
    computation: C,
    concurrency: usize,
    max_iterations: usize,
    asynchronous: bool,
    partitioning: Partitioning,
    pool: Option<&'a rayon::ThreadPool>,
    termination: TerminationFlag,
}

impl<'a, G: RandomAccessGraph, C: PregelComputation<G>> Pregel<'a, G, C> {
    /// Creates an engine for the given graph and vertex program.
    ///
    /// By default the computation is synchronous, uses range partitioning,
    /// a concurrency equal to the number of threads of the current Rayon
    /// pool, no maximum number of supersteps, and runs on the calling
    /// thread unless a [thread pool](Self::thread_pool) is provided.
    pub fn new(graph: &'a G, computation: C) -> Self {
        Self {
            graph,
            computation,
            concurrency: rayon::current_num_threads().max(1),
            max_iterations: usize::MAX,
            asynchronous: false,
            partitioning: Partitioning::default(),
            pool: None,
            termination: TerminationFlag::running_true(),
        }
    }

    /// Sets the maximum number of tasks in flight during a parallel phase.
    pub fn concurrency(&mut self, concurrency: usize) -> &mut Self {
        self.concurrency = concurrency;
        self
    }

    /// Sets the maximum number of supersteps.
    ///
    /// Reaching the maximum is not an error: the result will report
    /// [`did_converge`](PregelResult::did_converge)` == false`.
    pub fn max_iterations(&mut self, max_iterations: usize) -> &mut Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Selects the asynchronous message discipline (see the [module
    /// documentation](self)).
    pub fn asynchronous(&mut self, asynchronous: bool) -> &mut Self {
        self.asynchronous = asynchronous;
        self
    }

    /// Sets the partitioning strategy.
    pub fn partitioning(&mut self, partitioning: Partitioning) -> &mut Self {
        self.partitioning = partitioning;
        self
    }

    /// Sets the thread pool parallel phases are submitted to.
    ///
    /// The engine never shuts down the pool: its lifecycle belongs to the
    /// caller. Without a pool, all phases run on the calling thread.
    pub fn thread_pool(&mut self, pool: &'a rayon::ThreadPool) -> &mut Self {
        self.pool = Some(pool);
        self
    }

    /// Sets the termination flag polled by the engine at superstep and
    /// task-submission boundaries.
    pub fn termination_flag(&mut self, termination: TerminationFlag) -> &mut Self {
        self.termination = termination;
        self
    }

    /// Runs the computation without logging.
    pub fn run(&self) -> Result<PregelResult, Error> {
        self.run_with_logging(no_logging![], no_logging![])
    }

    /// Runs the computation, logging progress.
    ///
    /// `pl` is a sequential [`ProgressLog`] counting supersteps; `cpl` is a
    /// [`ConcurrentProgressLog`] counting nodes within each superstep.
    /// Either can be
    /// [`no_logging![]`](dsi_progress_logger::no_logging).
    pub fn run_with_logging(
        &self,
        pl: &mut impl ProgressLog,
        cpl: &mut impl ConcurrentProgressLog,
    ) -> Result<PregelResult, Error> {
        let schema = self.computation.schema();
        self.validate()?;
        let num_nodes = self.graph.num_nodes();
        let node_values = NodeValues::new(&schema, num_nodes)?;

        if num_nodes == 0 {
            return Ok(PregelResult {
                node_values,
                ran_iterations: 0,
                did_converge: true,
                aggregates: HashMap::new(),
            });
        }

        let partitions: Vec<Partition> = match self.partitioning {
            Partitioning::Range => range_partition(num_nodes, self.concurrency, None),
            Partitioning::Degree => degree_partition(self.graph, self.concurrency, None)
                .into_iter()
                .map(Partition::from)
                .collect(),
        };

        log::info!(
            "{} nodes, {} partitions ({} partitioning), concurrency {}, {} messages",
            num_nodes,
            partitions.len(),
            self.partitioning,
            self.concurrency,
            if self.asynchronous {
                "asynchronous"
            } else {
                "synchronous"
            }
        );

        let reducer = self.computation.reducer();
        if self.asynchronous {
            self.run_loop(
                AsyncSingleBufferedMessenger::new(num_nodes, reducer),
                &partitions,
                node_values,
                pl,
                cpl,
            )
        } else {
            self.run_loop(
                SyncDoubleBufferedMessenger::new(num_nodes, reducer),
                &partitions,
                node_values,
                pl,
                cpl,
            )
        }
    }

    fn validate(&self) -> Result<(), Error> {
        if self.concurrency == 0 {
            return Err(Error::Configuration(
                "concurrency must be strictly positive".into(),
            ));
        }
        if self.max_iterations == 0 {
            return Err(Error::Configuration(
                "the maximum number of supersteps must be strictly positive".into(),
            ));
        }
        Ok(())
    }

    fn runner(&self) -> RunWithConcurrency<'_> {
        let mut runner = RunWithConcurrency::new(self.concurrency);
        if let Some(pool) = self.pool {
            runner.thread_pool(pool);
        }
        runner.termination_flag(self.termination.clone());
        runner
    }

    fn run_loop<M: Messenger>(
        &self,
        mut messenger: M,
        partitions: &[Partition],
        mut node_values: NodeValues,
        pl: &mut impl ProgressLog,
        cpl: &mut impl ConcurrentProgressLog,
    ) -> Result<PregelResult, Error> {
        let num_nodes = self.graph.num_nodes();
        let votes = AtomicBitVec::new(num_nodes);
        let halted = CachePadded::new(AtomicUsize::new(0));
        let mut aggregates = HashMap::new();

        // Initialization phase: seed the per-node values.
        {
            let cells = node_values.cells();
            let cells = &cells;
            let computation = &self.computation;
            let graph = self.graph;
            self.runner().run(partitions.iter().map(|&partition| {
                move || {
                    let mut ctx = InitContext {
                        node: 0,
                        graph,
                        values: cells,
                    };
                    for node in partition.iter() {
                        ctx.node = node;
                        computation.init(&mut ctx);
                    }
                    Ok(())
                }
            }))?;
        }

        pl.item_name("superstep");
        pl.expected_updates((self.max_iterations != usize::MAX).then_some(self.max_iterations));
        pl.start("Running supersteps...");

        let mut ran_iterations = 0;
        let mut did_converge = false;

        for superstep in 0..self.max_iterations {
            self.termination.assert_running()?;

            cpl.item_name("node");
            cpl.expected_updates(Some(num_nodes));
            cpl.start(format!("Superstep {superstep}..."));

            // Compute phase: all partitions in parallel, then a barrier.
            {
                let cells = node_values.cells();
                let cells = &cells;
                let messenger: &dyn Messenger = &messenger;
                let votes = &votes;
                let halted: &AtomicUsize = &halted;
                let aggregates = &aggregates;
                let computation = &self.computation;
                let graph = self.graph;
                let cpl: &_ = &*cpl;
                self.runner().run(partitions.iter().map(|&partition| {
                    let mut task_cpl = cpl.clone();
                    move || {
                        let mut ctx = ComputeContext {
                            node: 0,
                            superstep,
                            graph,
                            values: cells,
                            messenger,
                            votes,
                            halted,
                            aggregates,
                        };
                        for node in partition.iter() {
                            if superstep > 0 && votes.get(node, Ordering::Relaxed) {
                                if !messenger.has_message(node) {
                                    continue;
                                }
                                // An incoming message re-activates the node.
                                if votes.swap(node, false, Ordering::Relaxed) {
                                    halted.fetch_sub(1, Ordering::Relaxed);
                                }
                            }
                            let messages = Messages::new(messenger.message(node));
                            ctx.node = node;
                            computation.compute(&mut ctx, &messages)?;
                        }
                        task_cpl.update_with_count(partition.node_count());
                        Ok(())
                    }
                }))?;
            }
            cpl.done();
            ran_iterations = superstep + 1;

            self.termination.assert_running()?;

            // Master-compute phase: one global step between barriers.
            let flow = {
                let mut ctx = MasterComputeContext {
                    superstep,
                    node_count: num_nodes,
                    values: &mut node_values,
                    aggregates: &mut aggregates,
                    pool: self.pool,
                    concurrency: self.concurrency,
                    termination: &self.termination,
                };
                self.computation
                    .master_compute(&mut ctx)
                    .map_err(|error| Error::TaskFailure(vec![error]))?
            };

            let message_pending = messenger.message_pending();
            messenger.init_superstep();
            pl.update_and_display();

            if flow.is_break() {
                log::info!("Master compute requested stop after superstep {superstep}");
                did_converge = true;
                break;
            }
            if halted.load(Ordering::Relaxed) == num_nodes && !message_pending {
                log::info!(
                    "All nodes voted to halt and no message is pending after superstep {superstep}"
                );
                did_converge = true;
                break;
            }
        }

        pl.done();
        self.termination.assert_running()?;

        log::info!("Ran {ran_iterations} superstep(s); converged: {did_converge}");

        Ok(PregelResult {
            node_values,
            ran_iterations,
            did_converge,
            aggregates,
        })
    }
}
