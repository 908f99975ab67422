/*
 * SPDX-FileCopyrightText: 2025 Tommaso Fontana
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::pregel::messenger::Messenger;
use crate::pregel::node_value::{NodeValues, ValueCells};
use crate::pregel::{Reducer, Schema};
use crate::termination::TerminationFlag;
use crate::traits::{BidirectionalGraph, RandomAccessGraph};
use std::collections::HashMap;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicUsize, Ordering};
use sux::bits::AtomicBitVec;

/// A vertex program pluggable into the [`Pregel`](crate::pregel::Pregel)
/// engine.
///
/// Implementations provide the per-node logic of an algorithm; the engine
/// provides scheduling, message passing and convergence bookkeeping. One
/// implementation serves any graph type satisfying its bounds, so algorithms
/// are written once and injected into the generic engine rather than
/// specializing it.
///
/// [`compute`](PregelComputation::compute) runs once per active node per
/// superstep; its side effects are limited to the node's own value slots,
/// message sends, and [voting to
/// halt](ComputeContext::vote_to_halt). [`master_compute`](PregelComputation::master_compute)
/// runs once per superstep after all per-node computations have finished,
/// and is the place for global aggregation and convergence checks that no
/// single node can decide locally.
pub trait PregelComputation<G: RandomAccessGraph>: Send + Sync {
    /// Returns the schema of the per-node values of this computation.
    fn schema(&self) -> Schema;

    /// Returns the reduction applied to concurrent messages targeting the
    /// same node.
    fn reducer(&self) -> Reducer;

    /// Seeds the values of a node. Runs once per node before the first
    /// superstep.
    fn init(&self, _ctx: &mut InitContext<'_, G>) {}

    /// Computes one node for one superstep.
    ///
    /// An error fails the partition task of the node, and thus the whole
    /// run: there is no partial result for a superstep in which any node
    /// failed.
    fn compute(&self, ctx: &mut ComputeContext<'_, G>, messages: &Messages) -> anyhow::Result<()>;

    /// Runs once per superstep after all nodes have been computed.
    ///
    /// Returning [`ControlFlow::Break`] stops the computation and marks it
    /// as converged. The default implementation always continues.
    fn master_compute(
        &self,
        _ctx: &mut MasterComputeContext<'_>,
    ) -> anyhow::Result<ControlFlow<()>> {
        Ok(ControlFlow::Continue(()))
    }
}

/// The messages delivered to a node at the beginning of its computation.
///
/// Messages are combined on arrival by the fixed per-run
/// [`Reducer`](crate::pregel::Reducer), so a node receives at most one
/// value: the reduction of every message sent to it.
#[derive(Debug, Clone, Copy)]
pub struct Messages {
    value: Option<f64>,
}

impl Messages {
    pub(crate) fn new(value: Option<f64>) -> Self {
        Self { value }
    }

    /// Returns the combined value of the messages sent to this node, or
    /// `None` if there were none.
    #[inline(always)]
    pub fn value(&self) -> Option<f64> {
        self.value
    }

    /// Returns true if no message was sent to this node.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.value.is_none()
    }
}

/// The context of a node during the initialization phase.
pub struct InitContext<'a, G: RandomAccessGraph> {
    pub(crate) node: usize,
    pub(crate) graph: &'a G,
    pub(crate) values: &'a ValueCells<'a>,
}

impl<G: RandomAccessGraph> InitContext<'_, G> {
    /// Returns the id of the node being initialized.
    #[inline(always)]
    pub fn node_id(&self) -> usize {
        self.node
    }

    /// Returns the number of nodes of the graph.
    #[inline(always)]
    pub fn num_nodes(&self) -> usize {
        self.graph.num_nodes()
    }

    /// Returns the outdegree of the node being initialized.
    #[inline(always)]
    pub fn outdegree(&self) -> usize {
        self.graph.outdegree(self.node)
    }

    /// Sets a double value of the node being initialized.
    #[inline(always)]
    pub fn set_double_value(&mut self, key: &str, value: f64) {
        // SAFETY: each node is initialized by exactly one task.
        unsafe { self.values.double(key)[self.node].set(value) }
    }

    /// Sets a long value of the node being initialized.
    #[inline(always)]
    pub fn set_long_value(&mut self, key: &str, value: i64) {
        // SAFETY: each node is initialized by exactly one task.
        unsafe { self.values.long(key)[self.node].set(value) }
    }
}

/// The context of a node during a superstep.
///
/// The context gives a node read-write access to its own value slots,
/// read-only access to the values of other nodes, and lets it send messages
/// and vote to halt.
pub struct ComputeContext<'a, G: RandomAccessGraph> {
    pub(crate) node: usize,
    pub(crate) superstep: usize,
    pub(crate) graph: &'a G,
    pub(crate) values: &'a ValueCells<'a>,
    pub(crate) messenger: &'a dyn Messenger,
    pub(crate) votes: &'a AtomicBitVec,
    pub(crate) halted: &'a AtomicUsize,
    pub(crate) aggregates: &'a HashMap<String, f64>,
}

impl<G: RandomAccessGraph> ComputeContext<'_, G> {
    /// Returns the id of the node being computed.
    #[inline(always)]
    pub fn node_id(&self) -> usize {
        self.node
    }

    /// Returns the current superstep, starting from zero.
    #[inline(always)]
    pub fn superstep(&self) -> usize {
        self.superstep
    }

    /// Returns true if this is the first superstep.
    #[inline(always)]
    pub fn is_initial_superstep(&self) -> bool {
        self.superstep == 0
    }

    /// Returns the number of nodes of the graph.
    #[inline(always)]
    pub fn num_nodes(&self) -> usize {
        self.graph.num_nodes()
    }

    /// Returns the outdegree of the node being computed.
    #[inline(always)]
    pub fn outdegree(&self) -> usize {
        self.graph.outdegree(self.node)
    }

    /// Returns a double value of the node being computed.
    #[inline(always)]
    pub fn double_value(&self, key: &str) -> f64 {
        // SAFETY: a node's slot is written only by the task owning its
        // partition, which is the one running this method.
        unsafe { self.values.double(key)[self.node].get() }
    }

    /// Returns a long value of the node being computed.
    #[inline(always)]
    pub fn long_value(&self, key: &str) -> i64 {
        // SAFETY: as in `double_value`.
        unsafe { self.values.long(key)[self.node].get() }
    }

    /// Returns a double value of an arbitrary node.
    ///
    /// Within a superstep there is no ordering among partitions: the value
    /// read may or may not already have been updated for the current
    /// superstep. Algorithms whose results must not depend on the processing
    /// order should exchange values through messages instead.
    #[inline(always)]
    pub fn double_value_of(&self, key: &str, node: usize) -> f64 {
        // SAFETY: racy reads of another node's slot are benign for f64 and
        // explicitly allowed by this method's contract.
        unsafe { self.values.double(key)[node].get() }
    }

    /// Returns a long value of an arbitrary node.
    ///
    /// The same caveat as [`double_value_of`](Self::double_value_of)
    /// applies.
    #[inline(always)]
    pub fn long_value_of(&self, key: &str, node: usize) -> i64 {
        // SAFETY: as in `double_value_of`.
        unsafe { self.values.long(key)[node].get() }
    }

    /// Sets a double value of the node being computed.
    #[inline(always)]
    pub fn set_double_value(&mut self, key: &str, value: f64) {
        // SAFETY: partitions are disjoint, so no other task writes this slot.
        unsafe { self.values.double(key)[self.node].set(value) }
    }

    /// Sets a long value of the node being computed.
    #[inline(always)]
    pub fn set_long_value(&mut self, key: &str, value: i64) {
        // SAFETY: partitions are disjoint, so no other task writes this slot.
        unsafe { self.values.long(key)[self.node].set(value) }
    }

    /// Sends a message to an arbitrary node.
    ///
    /// With the synchronous messenger the message becomes visible at the
    /// beginning of the next superstep; with the asynchronous one it is
    /// visible as soon as the target node is computed.
    #[inline(always)]
    pub fn send_to(&mut self, target: usize, message: f64) {
        self.messenger.send_to(target, message);
    }

    /// Sends a message to every successor of the node being computed.
    pub fn send_to_neighbors(&mut self, message: f64) {
        for successor in self.graph.successors(self.node) {
            self.messenger.send_to(successor, message);
        }
    }

    /// Returns the value of an aggregate set by a previous
    /// [`master_compute`](PregelComputation::master_compute), if any.
    ///
    /// Aggregates are frozen during the compute phase, so all nodes of a
    /// superstep observe the same values.
    #[inline(always)]
    pub fn aggregate(&self, key: &str) -> Option<f64> {
        self.aggregates.get(key).copied()
    }

    /// Votes to halt: unless it receives a message, the node will not be
    /// computed in subsequent supersteps.
    pub fn vote_to_halt(&mut self) {
        if !self.votes.swap(self.node, true, Ordering::Relaxed) {
            self.halted.fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl<G: BidirectionalGraph> ComputeContext<'_, G> {
    /// Sends a message to every predecessor of the node being computed.
    ///
    /// This method requires an inverse index, i.e., a
    /// [`BidirectionalGraph`].
    pub fn send_to_inverse_neighbors(&mut self, message: f64) {
        for predecessor in self.graph.predecessors(self.node) {
            self.messenger.send_to(predecessor, message);
        }
    }
}

/// The global context of the master-compute phase.
///
/// The master phase runs once per superstep, after the barrier that ends
/// the compute phase, and is the only place with mutable access to whole
/// value vectors; it is where algorithms normalize vectors, compute
/// convergence deltas, and publish [aggregates](Self::set_aggregate) for the
/// next superstep to read.
pub struct MasterComputeContext<'a> {
    pub(crate) superstep: usize,
    pub(crate) node_count: usize,
    pub(crate) values: &'a mut NodeValues,
    pub(crate) aggregates: &'a mut HashMap<String, f64>,
    pub(crate) pool: Option<&'a rayon::ThreadPool>,
    pub(crate) concurrency: usize,
    pub(crate) termination: &'a TerminationFlag,
}

impl<'a> MasterComputeContext<'a> {
    /// Returns the current superstep, starting from zero.
    #[inline(always)]
    pub fn superstep(&self) -> usize {
        self.superstep
    }

    /// Returns true if this is the first superstep.
    #[inline(always)]
    pub fn is_initial_superstep(&self) -> bool {
        self.superstep == 0
    }

    /// Returns the number of nodes of the graph.
    #[inline(always)]
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Returns the concurrency of the computation.
    #[inline(always)]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Returns the thread pool of the computation, if any.
    #[inline(always)]
    pub fn pool(&self) -> Option<&'a rayon::ThreadPool> {
        self.pool
    }

    /// Returns the termination flag of the computation.
    #[inline(always)]
    pub fn termination(&self) -> &TerminationFlag {
        self.termination
    }

    /// Returns the double values of all nodes for a property.
    pub fn double_values(&self, key: &str) -> &[f64] {
        self.values.double_properties(key)
    }

    /// Returns the long values of all nodes for a property.
    pub fn long_values(&self, key: &str) -> &[i64] {
        self.values.long_properties(key)
    }

    /// Applies a function to the mutable double values of a property,
    /// running it inside the computation's thread pool if one was provided.
    ///
    /// The function may use Rayon parallel iterators; they will run on the
    /// computation's pool.
    pub fn update_double_values<R: Send>(
        &mut self,
        key: &str,
        f: impl FnOnce(&mut [f64]) -> R + Send,
    ) -> R {
        let pool = self.pool;
        let values = self.values.double_properties_mut(key);
        match pool {
            Some(pool) => pool.install(|| f(values)),
            None => f(values),
        }
    }

    /// Applies a function to the mutable long values of a property,
    /// running it inside the computation's thread pool if one was provided.
    pub fn update_long_values<R: Send>(
        &mut self,
        key: &str,
        f: impl FnOnce(&mut [i64]) -> R + Send,
    ) -> R {
        let pool = self.pool;
        let values = self.values.long_properties_mut(key);
        match pool {
            Some(pool) => pool.install(|| f(values)),
            None => f(values),
        }
    }

    /// Applies a function to the mutable double values of two distinct
    /// properties, running it inside the computation's thread pool if one
    /// was provided.
    pub fn update_double_values_pair<R: Send>(
        &mut self,
        key_a: &str,
        key_b: &str,
        f: impl FnOnce(&mut [f64], &mut [f64]) -> R + Send,
    ) -> R {
        let pool = self.pool;
        let (values_a, values_b) = self.values.double_properties_pair_mut(key_a, key_b);
        match pool {
            Some(pool) => pool.install(|| f(values_a, values_b)),
            None => f(values_a, values_b),
        }
    }

    /// Publishes a global scalar, readable by every node in subsequent
    /// supersteps and available in the
    /// [result](crate::pregel::PregelResult::aggregates).
    pub fn set_aggregate(&mut self, key: &str, value: f64) {
        self.aggregates.insert(key.into(), value);
    }

    /// Returns the value of an aggregate, if any.
    pub fn aggregate(&self, key: &str) -> Option<f64> {
        self.aggregates.get(key).copied()
    }
}
