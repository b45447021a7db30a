//! # Traces
//!
//! A trace is a polyline in the vehicle's local frame stored as paired coordinate sequences, the
//! layout the simulator expects for drawing.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Point2;
use serde::Serialize;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Paired `x` and `y` coordinate sequences.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Trace {
    /// X coordinates.
    ///
    /// Units: meters
    pub x: Vec<f64>,

    /// Y coordinates.
    ///
    /// Units: meters
    pub y: Vec<f64>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Trace {
    /// Create an empty trace with room for `capacity` points.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            x: Vec::with_capacity(capacity),
            y: Vec::with_capacity(capacity),
        }
    }

    /// Append a point.
    pub fn push(&mut self, x: f64, y: f64) {
        self.x.push(x);
        self.y.push(y);
    }

    /// Number of points, `None` if the sequences have different lengths.
    pub fn len(&self) -> Option<usize> {
        if self.x.len() == self.y.len() {
            Some(self.x.len())
        }
        else {
            None
        }
    }

    /// Returns true if the trace has no points.
    pub fn is_empty(&self) -> bool {
        self.x.is_empty() && self.y.is_empty()
    }

    /// Returns true if every coordinate is finite.
    pub fn is_finite(&self) -> bool {
        self.x.iter().chain(self.y.iter()).all(|c| c.is_finite())
    }

    /// Split the trace into its coordinate sequences.
    pub fn into_parts(self) -> (Vec<f64>, Vec<f64>) {
        (self.x, self.y)
    }
}

impl std::iter::FromIterator<Point2<f64>> for Trace {
    fn from_iter<I: IntoIterator<Item = Point2<f64>>>(iter: I) -> Self {
        let mut trace = Trace::default();
        for p in iter {
            trace.push(p.x, p.y);
        }
        trace
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
