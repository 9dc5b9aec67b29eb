//! # Twine Cosmology
//!
//! Cosmological power spectrum queries and models for
//! [Twine](https://github.com/isentropic-dev/twine).
//!
//! ## Crate layout
//!
//! - [`models`]: The cosmology context, power spectrum queries, and
//!   [`twine_core::Model`] adapters.
//! - [`support`]: Numerical utilities used by models.
//!
//! ## Utility code lifecycle
//!
//! Modules in [`support`] are part of the public API because they're useful,
//! but their APIs are not stable. Breaking changes may occur as needed.
//!
//! Numerical code starts inside the model that needs it and moves to
//! [`support`] once it is useful on its own, like the splines and quadrature
//! used throughout the cosmology engine.

pub mod models;
pub mod support;
