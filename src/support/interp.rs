//! One-dimensional cubic spline interpolation.
//!
//! [`CubicSpline`] is a natural cubic spline (zero second derivative at both
//! ends) over strictly increasing nodes. Outside the node range it continues
//! linearly with the end slope, which is the natural continuation of a spline
//! whose curvature vanishes at the boundary.
//!
//! # Example
//!
//! ```
//! use twine_cosmology::support::interp::CubicSpline;
//!
//! let x = [0.0, 1.0, 2.0, 3.0];
//! let y = [0.0, 2.0, 4.0, 6.0];
//! let spline = CubicSpline::new(&x, &y).unwrap();
//! assert!((spline.eval(1.5) - 3.0).abs() < 1e-12);
//! ```

use thiserror::Error;

/// Errors that can occur while constructing a spline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SplineError {
    /// Fewer than two nodes were supplied.
    #[error("spline requires at least 2 nodes, got {len}")]
    TooFewNodes { len: usize },

    /// The node and value arrays differ in length.
    #[error("node/value length mismatch: x has {x_len}, y has {y_len}")]
    LengthMismatch { x_len: usize, y_len: usize },

    /// Nodes are not strictly increasing.
    #[error("nodes must be strictly increasing (violated at index {index})")]
    NotIncreasing { index: usize },

    /// A node or value is NaN or infinite.
    #[error("non-finite input at index {index}")]
    NonFinite { index: usize },
}

/// A natural cubic spline through `(x, y)` nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct CubicSpline {
    x: Vec<f64>,
    y: Vec<f64>,
    y2: Vec<f64>,
}

impl CubicSpline {
    /// Builds a natural cubic spline.
    ///
    /// # Errors
    ///
    /// Returns [`SplineError`] if the nodes are too few, mismatched, unsorted,
    /// or not finite.
    pub fn new(x: &[f64], y: &[f64]) -> Result<Self, SplineError> {
        if x.len() != y.len() {
            return Err(SplineError::LengthMismatch {
                x_len: x.len(),
                y_len: y.len(),
            });
        }
        if x.len() < 2 {
            return Err(SplineError::TooFewNodes { len: x.len() });
        }
        if let Some(index) = x
            .iter()
            .zip(y)
            .position(|(xi, yi)| !xi.is_finite() || !yi.is_finite())
        {
            return Err(SplineError::NonFinite { index });
        }
        if let Some(index) = x.windows(2).position(|w| w[1] <= w[0]) {
            return Err(SplineError::NotIncreasing { index: index + 1 });
        }

        let y2 = second_derivatives(x, y);

        Ok(Self {
            x: x.to_vec(),
            y: y.to_vec(),
            y2,
        })
    }

    /// Smallest node.
    #[must_use]
    pub fn x_min(&self) -> f64 {
        self.x[0]
    }

    /// Largest node.
    #[must_use]
    pub fn x_max(&self) -> f64 {
        self.x[self.x.len() - 1]
    }

    /// Returns true if `x` lies within the node range (inclusive).
    #[must_use]
    pub fn contains(&self, x: f64) -> bool {
        x >= self.x_min() && x <= self.x_max()
    }

    /// Evaluates the spline at `x`.
    #[must_use]
    pub fn eval(&self, x: f64) -> f64 {
        let n = self.x.len();
        if x < self.x[0] {
            return self.y[0] + self.derivative(self.x[0]) * (x - self.x[0]);
        }
        if x > self.x[n - 1] {
            return self.y[n - 1] + self.derivative(self.x[n - 1]) * (x - self.x[n - 1]);
        }

        let i = self.segment(x);
        let h = self.x[i + 1] - self.x[i];
        let a = (self.x[i + 1] - x) / h;
        let b = (x - self.x[i]) / h;
        a * self.y[i]
            + b * self.y[i + 1]
            + ((a * a * a - a) * self.y2[i] + (b * b * b - b) * self.y2[i + 1]) * h * h / 6.0
    }

    /// Evaluates the first derivative of the spline at `x`.
    ///
    /// Outside the node range this is the constant end slope.
    #[must_use]
    pub fn derivative(&self, x: f64) -> f64 {
        let x = x.clamp(self.x_min(), self.x_max());
        let i = self.segment(x);
        let h = self.x[i + 1] - self.x[i];
        let a = (self.x[i + 1] - x) / h;
        let b = (x - self.x[i]) / h;
        (self.y[i + 1] - self.y[i]) / h - (3.0 * a * a - 1.0) * h * self.y2[i] / 6.0
            + (3.0 * b * b - 1.0) * h * self.y2[i + 1] / 6.0
    }

    /// Index `i` of the segment `[x_i, x_{i+1}]` containing `x`.
    fn segment(&self, x: f64) -> usize {
        let n = self.x.len();
        match self.x.partition_point(|&xi| xi <= x) {
            0 => 0,
            p if p >= n => n - 2,
            p => p - 1,
        }
    }
}

/// Solves the tridiagonal system for natural-spline second derivatives.
fn second_derivatives(x: &[f64], y: &[f64]) -> Vec<f64> {
    let n = x.len();
    let mut y2 = vec![0.0; n];
    let mut u = vec![0.0; n];

    for i in 1..n - 1 {
        let sig = (x[i] - x[i - 1]) / (x[i + 1] - x[i - 1]);
        let p = sig * y2[i - 1] + 2.0;
        y2[i] = (sig - 1.0) / p;
        let dy = (y[i + 1] - y[i]) / (x[i + 1] - x[i]) - (y[i] - y[i - 1]) / (x[i] - x[i - 1]);
        u[i] = (6.0 * dy / (x[i + 1] - x[i - 1]) - sig * u[i - 1]) / p;
    }

    y2[n - 1] = 0.0;
    for i in (0..n - 1).rev() {
        y2[i] = y2[i] * y2[i + 1] + u[i];
    }
    y2
}
