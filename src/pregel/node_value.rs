/*
 * SPDX-FileCopyrightText: 2025 Tommaso Fontana
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Schema'd per-node value vectors.
//!
//! Values are stored as flat primitive arrays indexed by node id, not as
//! per-node records: this is intentional, for cache locality, and mirrors
//! the way the rest of this crate treats nodes as dense indices.

use crate::Error;
use sync_cell_slice::{SyncCell, SyncSlice};

/// The type of a per-node property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    /// A 64-bit floating-point value, initialized to NaN.
    Double,
    /// A 64-bit signed integer value, initialized to zero.
    Long,
}

/// The schema of the per-node values of a computation: an ordered list of
/// named, typed properties.
///
/// # Examples
///
/// ```
/// use superstep::pregel::{Schema, ValueType};
///
/// let schema = Schema::new()
///     .add("rank", ValueType::Double)
///     .add("component", ValueType::Long);
/// assert_eq!(schema.properties().len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Schema {
    properties: Vec<(String, ValueType)>,
}

impl Schema {
    /// Creates an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a property to the schema.
    pub fn add(mut self, key: impl Into<String>, value_type: ValueType) -> Self {
        self.properties.push((key.into(), value_type));
        self
    }

    /// Returns the properties of the schema, in insertion order.
    pub fn properties(&self) -> &[(String, ValueType)] {
        &self.properties
    }
}

#[derive(Debug)]
enum PropertyData {
    Double(Box<[f64]>),
    Long(Box<[i64]>),
}

#[derive(Debug)]
struct Property {
    key: String,
    data: PropertyData,
}

/// The per-node value vectors of a computation, one flat array per schema
/// property.
///
/// During a run the vectors are owned by the scheduler; afterwards they are
/// handed to the caller as part of the
/// [result](crate::pregel::PregelResult).
#[derive(Debug)]
pub struct NodeValues {
    properties: Vec<Property>,
}

impl NodeValues {
    /// Allocates the value vectors for a schema, with doubles initialized
    /// to NaN and longs to zero.
    pub(crate) fn new(schema: &Schema, node_count: usize) -> Result<Self, Error> {
        if schema.properties().is_empty() {
            return Err(Error::Configuration(
                "the schema must declare at least one property".into(),
            ));
        }
        let mut properties: Vec<Property> = Vec::with_capacity(schema.properties().len());
        for (key, value_type) in schema.properties() {
            if properties.iter().any(|p| p.key == *key) {
                return Err(Error::Configuration(format!(
                    "duplicate schema property: {key}"
                )));
            }
            let data = match value_type {
                ValueType::Double => {
                    PropertyData::Double(vec![f64::NAN; node_count].into_boxed_slice())
                }
                ValueType::Long => PropertyData::Long(vec![0; node_count].into_boxed_slice()),
            };
            properties.push(Property {
                key: key.clone(),
                data,
            });
        }
        Ok(Self { properties })
    }

    fn property(&self, key: &str) -> &Property {
        self.properties
            .iter()
            .find(|p| p.key == key)
            .unwrap_or_else(|| panic!("unknown property: {key}"))
    }

    fn property_mut(&mut self, key: &str) -> &mut Property {
        self.properties
            .iter_mut()
            .find(|p| p.key == key)
            .unwrap_or_else(|| panic!("unknown property: {key}"))
    }

    /// Returns the keys of the properties, in schema order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(|p| p.key.as_str())
    }

    /// Returns the double values of a property.
    ///
    /// # Panics
    ///
    /// Panics if the property does not exist or is not of type
    /// [`Double`](ValueType::Double).
    pub fn double_properties(&self, key: &str) -> &[f64] {
        match &self.property(key).data {
            PropertyData::Double(values) => values,
            _ => panic!("property {key} is not a double property"),
        }
    }

    /// Returns the long values of a property.
    ///
    /// # Panics
    ///
    /// Panics if the property does not exist or is not of type
    /// [`Long`](ValueType::Long).
    pub fn long_properties(&self, key: &str) -> &[i64] {
        match &self.property(key).data {
            PropertyData::Long(values) => values,
            _ => panic!("property {key} is not a long property"),
        }
    }

    /// Removes a double property and returns its values.
    ///
    /// # Panics
    ///
    /// Panics as [`double_properties`](Self::double_properties).
    pub fn take_double_properties(&mut self, key: &str) -> Box<[f64]> {
        let position = self
            .properties
            .iter()
            .position(|p| p.key == key)
            .unwrap_or_else(|| panic!("unknown property: {key}"));
        match self.properties.remove(position).data {
            PropertyData::Double(values) => values,
            _ => panic!("property {key} is not a double property"),
        }
    }

    /// Removes a long property and returns its values.
    ///
    /// # Panics
    ///
    /// Panics as [`long_properties`](Self::long_properties).
    pub fn take_long_properties(&mut self, key: &str) -> Box<[i64]> {
        let position = self
            .properties
            .iter()
            .position(|p| p.key == key)
            .unwrap_or_else(|| panic!("unknown property: {key}"));
        match self.properties.remove(position).data {
            PropertyData::Long(values) => values,
            _ => panic!("property {key} is not a long property"),
        }
    }

    pub(crate) fn double_properties_mut(&mut self, key: &str) -> &mut [f64] {
        match &mut self.property_mut(key).data {
            PropertyData::Double(values) => values,
            _ => panic!("property {key} is not a double property"),
        }
    }

    pub(crate) fn long_properties_mut(&mut self, key: &str) -> &mut [i64] {
        match &mut self.property_mut(key).data {
            PropertyData::Long(values) => values,
            _ => panic!("property {key} is not a long property"),
        }
    }

    /// Returns the double values of two distinct properties, mutably.
    pub(crate) fn double_properties_pair_mut(
        &mut self,
        key_a: &str,
        key_b: &str,
    ) -> (&mut [f64], &mut [f64]) {
        let position = |properties: &[Property], key: &str| {
            properties
                .iter()
                .position(|p| p.key == key)
                .unwrap_or_else(|| panic!("unknown property: {key}"))
        };
        let pos_a = position(&self.properties, key_a);
        let pos_b = position(&self.properties, key_b);
        assert_ne!(pos_a, pos_b, "the two properties must be distinct");

        fn doubles(property: &mut Property) -> &mut [f64] {
            match &mut property.data {
                PropertyData::Double(values) => values,
                _ => panic!("property {} is not a double property", property.key),
            }
        }

        let (head, tail) = self.properties.split_at_mut(pos_a.max(pos_b));
        let (low, high) = (&mut head[pos_a.min(pos_b)], &mut tail[0]);
        if pos_a < pos_b {
            (doubles(low), doubles(high))
        } else {
            (doubles(high), doubles(low))
        }
    }

    /// Returns thread-shareable views of all value vectors.
    ///
    /// The views allow disjoint concurrent writes from partition tasks; the
    /// safety argument lives at the call sites, which guarantee that each
    /// node's slots are written only by the task owning its partition.
    pub(crate) fn cells(&mut self) -> ValueCells<'_> {
        ValueCells {
            properties: self
                .properties
                .iter_mut()
                .map(|property| {
                    let Property { key, data } = property;
                    let cells = match data {
                        PropertyData::Double(values) => Cells::Double(values.as_sync_slice()),
                        PropertyData::Long(values) => Cells::Long(values.as_sync_slice()),
                    };
                    (key.as_str(), cells)
                })
                .collect(),
        }
    }
}

pub(crate) enum Cells<'a> {
    Double(&'a [SyncCell<f64>]),
    Long(&'a [SyncCell<i64>]),
}

/// Thread-shareable views of the value vectors, one per property.
pub(crate) struct ValueCells<'a> {
    properties: Vec<(&'a str, Cells<'a>)>,
}

impl ValueCells<'_> {
    pub(crate) fn double(&self, key: &str) -> &[SyncCell<f64>] {
        match self.properties.iter().find(|(k, _)| *k == key) {
            Some((_, Cells::Double(cells))) => cells,
            Some(_) => panic!("property {key} is not a double property"),
            None => panic!("unknown property: {key}"),
        }
    }

    pub(crate) fn long(&self, key: &str) -> &[SyncCell<i64>] {
        match self.properties.iter().find(|(k, _)| *k == key) {
            Some((_, Cells::Long(cells))) => cells,
            Some(_) => panic!("property {key} is not a long property"),
            None => panic!("unknown property: {key}"),
        }
    }
}
