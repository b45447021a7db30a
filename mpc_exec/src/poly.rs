//! # Polynomial module
//!
//! The reference path is modelled as a polynomial `y = f(x)` in the vehicle's local frame. The
//! coefficients are found by an ordinary least squares fit to the local waypoints, solved through
//! a Householder QR decomposition of the Vandermonde matrix rather than the normal equations.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::{DMatrix, DVector, Point2};
use serde::Serialize;

use util::maths::{poly_deriv_val, poly_val};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Diagonal entries of R smaller than this fraction of the largest one mark the design matrix as
/// rank deficient.
const RANK_TOLERANCE: f64 = 1e-10;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A polynomial with coefficients in ascending order, `coeffs[i]` multiplies `x^i`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Polynomial {
    coeffs: Vec<f64>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum FitError {
    #[error("Expected a polynomial degree of at least 1")]
    InvalidDegree,

    #[error("A degree {degree} fit needs at least {} points, found {num_points}", .degree + 1)]
    NotEnoughPoints {
        degree: usize,
        num_points: usize
    },

    #[error("The points to fit contain non-finite coordinates")]
    NonFinitePoints,

    #[error("The points do not determine a unique degree {0} polynomial")]
    RankDeficient(usize),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Polynomial {
    /// Create a polynomial from coefficients in ascending order.
    pub fn new(coeffs: Vec<f64>) -> Self {
        Self { coeffs }
    }

    /// Fit a polynomial of the given degree to the points by least squares.
    ///
    /// With exactly `degree + 1` points of distinct x the fit interpolates them.
    pub fn fit(points: &[Point2<f64>], degree: usize) -> Result<Self, FitError> {
        if degree < 1 {
            return Err(FitError::InvalidDegree)
        }

        let num_coeffs = degree + 1;

        if points.len() < num_coeffs {
            return Err(FitError::NotEnoughPoints {
                degree,
                num_points: points.len()
            })
        }

        if points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return Err(FitError::NonFinitePoints)
        }

        // Vandermonde matrix, each column is the previous one times x
        let mut vander = DMatrix::<f64>::zeros(points.len(), num_coeffs);
        for (i, p) in points.iter().enumerate() {
            vander[(i, 0)] = 1.0;
            for j in 1..num_coeffs {
                vander[(i, j)] = vander[(i, j - 1)] * p.x;
            }
        }

        let ys = DVector::from_iterator(points.len(), points.iter().map(|p| p.y));

        let qr = vander.qr();
        let r = qr.r();
        let q = qr.q();

        // A near zero pivot means the columns are not independent, e.g. too few distinct x values
        let max_pivot = r.diagonal().amax();
        if !(max_pivot > 0.0)
            || r.diagonal().iter().any(|d| d.abs() <= RANK_TOLERANCE * max_pivot)
        {
            return Err(FitError::RankDeficient(degree))
        }

        // Solve R c = Q^T y by back substitution
        let coeffs = r
            .solve_upper_triangular(&(q.transpose() * ys))
            .ok_or(FitError::RankDeficient(degree))?;

        if coeffs.iter().any(|c| !c.is_finite()) {
            return Err(FitError::RankDeficient(degree))
        }

        Ok(Self {
            coeffs: coeffs.iter().copied().collect()
        })
    }

    /// The coefficients in ascending order.
    pub fn coeffs(&self) -> &[f64] {
        &self.coeffs
    }

    /// Degree of the polynomial.
    pub fn degree(&self) -> usize {
        self.coeffs.len().saturating_sub(1)
    }

    /// Evaluate the polynomial at `x`.
    pub fn eval(&self, x: f64) -> f64 {
        poly_val(x, &self.coeffs)
    }

    /// Evaluate the first derivative of the polynomial at `x`.
    pub fn deriv(&self, x: f64) -> f64 {
        poly_deriv_val(x, &self.coeffs)
    }

    /// Angle of the curve's tangent to the X axis at `x`.
    ///
    /// Units: radians
    pub fn tangent_angle(&self, x: f64) -> f64 {
        self.deriv(x).atan()
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
