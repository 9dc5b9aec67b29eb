//! Root-finding formulation for the HALOFIT non-linear scale.

use std::convert::Infallible;

use twine_core::{EquationProblem, Model};

use crate::models::cosmology::{
    config::IntegrationConfig, error::CosmologyError, pk2d::PkSlice,
};

use super::gaussian_moments;

/// Gaussian-filtered variance at one radius.
#[derive(Debug, Clone, Copy)]
pub(super) struct GaussianVariance {
    /// Filter radius in Mpc.
    pub(super) radius: f64,
    pub(super) sigma2: f64,
}

/// Evaluates `σ²_G(R)` of a linear spectrum slice.
pub(super) struct GaussianVarianceModel<'a> {
    slice: &'a PkSlice,
    config: &'a IntegrationConfig,
}

impl<'a> GaussianVarianceModel<'a> {
    pub(super) fn new(slice: &'a PkSlice, config: &'a IntegrationConfig) -> Self {
        Self { slice, config }
    }
}

impl Model for GaussianVarianceModel<'_> {
    type Input = f64;
    type Output = GaussianVariance;
    type Error = CosmologyError;

    fn call(&self, radius: &Self::Input) -> Result<Self::Output, Self::Error> {
        let [sigma2] = gaussian_moments(self.slice, *radius, self.config, [0])?;
        Ok(GaussianVariance {
            radius: *radius,
            sigma2,
        })
    }
}

/// Solves `ln σ²_G(R) = 0` in `ln R`.
pub(super) struct GaussianVarianceProblem;

impl EquationProblem<1> for GaussianVarianceProblem {
    type Input = f64;
    type Output = GaussianVariance;
    type Error = Infallible;

    fn input(&self, x: &[f64; 1]) -> Result<Self::Input, Self::Error> {
        Ok(x[0].exp())
    }

    fn residuals(
        &self,
        _input: &Self::Input,
        output: &Self::Output,
    ) -> Result<[f64; 1], Self::Error> {
        Ok([output.sigma2.ln()])
    }
}
