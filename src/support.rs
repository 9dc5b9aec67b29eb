//! Supporting utilities used by models.
//!
//! These modules are public because they are useful on their own, but their
//! APIs are not stable.
//!
//! - [`constraint`]: Numeric invariants checked at construction.
//! - [`integrate`]: Adaptive Gauss–Kronrod quadrature.
//! - [`interp`]: Natural cubic splines.
//! - [`ode`]: Fixed-step Runge–Kutta integration.
//! - [`units`]: Extensions to [`uom`] for cosmological scales.

pub mod constraint;
pub mod integrate;
pub mod interp;
pub mod ode;
pub mod units;
