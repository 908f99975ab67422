/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Connected-components algorithms built on the [Pregel
//! engine](crate::pregel).

pub mod wcc;

pub use wcc::{Wcc, WccResult};
