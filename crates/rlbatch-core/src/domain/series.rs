//! Scalar time-series read from a run's log store.

use serde::{Deserialize, Serialize};

/// One recorded scalar event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ScalarPoint {
    /// Seconds since the Unix epoch at which the trainer recorded the value.
    pub wall_time: f64,
    pub step: i64,
    pub value: f64,
}

/// All points recorded under one tag, in store event order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScalarSeries {
    pub tag: String,
    pub points: Vec<ScalarPoint>,
}

impl ScalarSeries {
    /// A series with no recorded points.
    pub fn empty(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            points: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Values in event order.
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.value)
    }

    /// First recorded value, if any.
    pub fn first_value(&self) -> Option<f64> {
        self.points.first().map(|p| p.value)
    }

    /// Last recorded value, if any.
    pub fn last_value(&self) -> Option<f64> {
        self.points.last().map(|p| p.value)
    }
}
