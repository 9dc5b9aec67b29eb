//! Cosmological power spectrum models.
//!
//! A [`Cosmology`] owns a parameter set and lazily builds the tables every
//! query needs: the linear growth factor, the linear and non-linear matter
//! power spectra, and the sigma(M) table. The query functions live in
//! [`power`]; [`LinearPowerModel`] and [`SigmaRModel`] expose the two most
//! common queries as [`twine_core::Model`]s.
//!
//! The engine covers a matter plus CPL dark energy background without
//! radiation, the BBKS and Eisenstein & Hu transfer functions, and the
//! Takahashi et al. (2012) HALOFIT non-linear correction.

mod adapters;
mod background;
mod config;
mod constants;
mod context;
mod error;
mod growth;
mod halofit;
mod linear;
mod parameters;
mod pk2d;
mod transfer;
mod variance;

pub mod power;

pub use adapters::{LinearPowerModel, SigmaRModel};
pub use config::{
    AccuracyConfig, ConfigError, GrowthConfig, HalofitConfig, IntegrationConfig, SplineConfig,
};
pub use constants::{DEFAULT_POWER_SPECTRUM, HUBBLE_DISTANCE_MPC, K_PIVOT, RHO_CRITICAL};
pub use context::{Cosmology, PowerSpectrum, PowerSpectrumSource};
pub use error::{CosmologyError, SpectrumKind};
pub use growth::Growth;
pub use parameters::{
    CosmologyParameters, MatterPowerSpectrum, Normalization, ParametersError, TransferFunction,
};
pub use pk2d::Pk2d;
pub use power::QueryError;
pub use variance::SigmaTable;
