use std::fmt;

use thiserror::Error;
use twine_solvers::equation::bisection;

use crate::support::{
    constraint::ConstraintError, integrate::IntegrationError, interp::SplineError, ode::OdeError,
};

/// Whether a spectrum is linear or non-linear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpectrumKind {
    Linear,
    NonLinear,
}

impl fmt::Display for SpectrumKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linear => f.write_str("linear"),
            Self::NonLinear => f.write_str("non-linear"),
        }
    }
}

/// Errors raised by the cosmology engine.
///
/// Every variant maps to a stable non-zero status code via [`CosmologyError::status`].
#[derive(Debug, Error)]
pub enum CosmologyError {
    /// No spectrum of the requested kind is registered under this name.
    #[error("no {kind} power spectrum named `{name}`")]
    UnknownSpectrum { name: String, kind: SpectrumKind },

    /// A linear spectrum was required but a non-linear one was supplied.
    #[error("power spectrum `{name}` is not linear")]
    NotLinear { name: String },

    /// The name is reserved for the spectra computed by the cosmology itself.
    #[error("power spectrum name `{name}` is reserved")]
    ReservedSpectrum { name: String },

    /// A scale factor outside `(0, 1]`.
    #[error("scale factor a={a} outside (0, 1]")]
    ScaleFactorOutOfRange {
        a: f64,
        #[source]
        source: ConstraintError,
    },

    /// A non-positive or non-finite wavenumber.
    #[error("wavenumber must be strictly positive, got k={k}")]
    NonPositiveWavenumber { k: f64 },

    /// A non-positive or non-finite radius.
    #[error("radius must be strictly positive, got R={r}")]
    NonPositiveRadius { r: f64 },

    /// A non-positive or non-finite halo mass.
    #[error("mass must be strictly positive, got M={m}")]
    NonPositiveMass { m: f64 },

    /// A mass outside the tabulated sigma(M) range.
    #[error("log10(M)={log10_m} outside tabulated range [{min}, {max}]")]
    MassOutOfRange { log10_m: f64, min: f64, max: f64 },

    /// A power spectrum table is malformed.
    #[error("invalid power spectrum table: {reason}")]
    InvalidTable { reason: String },

    /// A spline could not be constructed.
    #[error("spline construction failed: {context}")]
    Spline {
        context: String,
        #[source]
        source: SplineError,
    },

    /// A variance integral failed.
    #[error("integration failed: {context}")]
    Integration {
        context: String,
        #[source]
        source: IntegrationError,
    },

    /// The linear growth ODE failed.
    #[error("growth factor integration failed")]
    Growth(#[from] OdeError),

    /// The HALOFIT root find returned an error.
    #[error("halofit root find failed at a={a}")]
    Halofit {
        a: f64,
        #[source]
        source: bisection::Error,
    },

    /// The HALOFIT root find hit its iteration limit.
    #[error("halofit root find did not converge at a={a} after {iters} iterations")]
    HalofitMaxIters { a: f64, iters: usize },

    /// The linear variance exceeds one even at the largest searched radius.
    #[error("halofit variance exceeds unity at R_max={r_max} Mpc for a={a}")]
    HalofitBracket { a: f64, r_max: f64 },

    /// A computation produced NaN or infinity.
    #[error("non-finite result: {context}")]
    NonFinite { context: String },
}

impl CosmologyError {
    /// Engine status code for this error; success is zero.
    #[must_use]
    pub fn status(&self) -> i32 {
        match self {
            Self::UnknownSpectrum { .. } => 1,
            Self::NotLinear { .. } => 2,
            Self::ReservedSpectrum { .. } => 3,
            Self::ScaleFactorOutOfRange { .. } => 4,
            Self::NonPositiveWavenumber { .. } => 5,
            Self::NonPositiveRadius { .. } => 6,
            Self::NonPositiveMass { .. } => 7,
            Self::MassOutOfRange { .. } => 8,
            Self::InvalidTable { .. } => 9,
            Self::Spline { .. } => 10,
            Self::Integration { .. } => 11,
            Self::Growth(_) => 12,
            Self::Halofit { .. } => 13,
            Self::HalofitMaxIters { .. } => 14,
            Self::HalofitBracket { .. } => 15,
            Self::NonFinite { .. } => 16,
        }
    }

    pub(super) fn spline(context: impl Into<String>, source: SplineError) -> Self {
        Self::Spline {
            context: context.into(),
            source,
        }
    }

    pub(super) fn integration(context: impl Into<String>, source: IntegrationError) -> Self {
        Self::Integration {
            context: context.into(),
            source,
        }
    }

    pub(super) fn invalid_table(reason: impl Into<String>) -> Self {
        Self::InvalidTable {
            reason: reason.into(),
        }
    }
}
