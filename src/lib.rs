/*
 * SPDX-FileCopyrightText: 2025 Tommaso Fontana
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

#![doc = include_str!("../README.md")]
#![deny(unconditional_recursion)]

pub mod components;
pub mod concurrency;
pub mod error;
pub mod graphs;
pub mod partition;
pub mod pregel;
pub mod rank;
pub mod termination;
pub mod traits;

pub use error::Error;

/// Minimum number of elements for a Rayon task over flat per-node vectors.
pub(crate) const RAYON_MIN_LEN: usize = 100_000;

pub mod prelude {
    pub use crate::concurrency::RunWithConcurrency;
    pub use crate::error::Error;
    pub use crate::graphs::vec_graph::VecGraph;
    pub use crate::partition::{DegreePartition, Partition, Partitioning};
    pub use crate::pregel::{
        ComputeContext, InitContext, MasterComputeContext, Messages, Pregel, PregelComputation,
        PregelResult, Reducer, Schema, ValueType,
    };
    pub use crate::termination::TerminationFlag;
    pub use crate::thread_pool;
    pub use crate::traits::{BidirectionalGraph, RandomAccessGraph};
}
