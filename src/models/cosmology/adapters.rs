//! [`twine_core::Model`] adapters over the query functions.

use twine_core::Model;
use uom::si::f64::Length;

use crate::support::units::Megaparsecs;

use super::{
    Cosmology, PowerSpectrumSource,
    power::{self, QueryError},
};

/// Linear power at a fixed scale factor as a function of wavenumber (Mpc⁻¹).
#[derive(Debug, Clone, Copy)]
pub struct LinearPowerModel<'a> {
    pub cosmology: &'a Cosmology,
    pub a: f64,
    pub spectrum: PowerSpectrumSource<'a>,
}

impl<'a> LinearPowerModel<'a> {
    /// The default linear spectrum at scale factor `a`.
    #[must_use]
    pub fn new(cosmology: &'a Cosmology, a: f64) -> Self {
        Self {
            cosmology,
            a,
            spectrum: PowerSpectrumSource::default(),
        }
    }
}

impl Model for LinearPowerModel<'_> {
    type Input = f64;
    type Output = f64;
    type Error = QueryError;

    fn call(&self, k: &Self::Input) -> Result<Self::Output, Self::Error> {
        power::linear_power(self.cosmology, *k, self.a, self.spectrum)
    }
}

/// Top-hat density variance at a fixed scale factor as a function of radius.
///
/// # Example
///
/// ```
/// use twine_core::Model;
/// use twine_cosmology::{
///     models::cosmology::{Cosmology, CosmologyParameters, Normalization, SigmaRModel},
///     support::units::megaparsecs,
/// };
///
/// let params = CosmologyParameters::new(0.25, 0.05, 0.7, 0.96, Normalization::Sigma8(0.8));
/// let cosmo = Cosmology::new(params).unwrap();
///
/// let model = SigmaRModel::new(&cosmo, 1.0);
/// let sigma = model.call(&megaparsecs(8.0 / 0.7)).unwrap();
/// assert!((sigma - 0.8).abs() < 1e-3);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct SigmaRModel<'a> {
    pub cosmology: &'a Cosmology,
    pub a: f64,
    pub spectrum: PowerSpectrumSource<'a>,
}

impl<'a> SigmaRModel<'a> {
    /// The default linear spectrum at scale factor `a`.
    #[must_use]
    pub fn new(cosmology: &'a Cosmology, a: f64) -> Self {
        Self {
            cosmology,
            a,
            spectrum: PowerSpectrumSource::default(),
        }
    }
}

impl Model for SigmaRModel<'_> {
    type Input = Length;
    type Output = f64;
    type Error = QueryError;

    fn call(&self, radius: &Self::Input) -> Result<Self::Output, Self::Error> {
        power::sigma_r(self.cosmology, radius.megaparsecs(), self.a, self.spectrum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    use crate::{
        models::cosmology::{CosmologyParameters, Normalization},
        support::units::megaparsecs,
    };

    #[test]
    fn models_match_queries() {
        let params = CosmologyParameters::new(0.25, 0.05, 0.7, 0.96, Normalization::Sigma8(0.8))
            .with_transfer_function(crate::models::cosmology::TransferFunction::Bbks);
        let cosmo = Cosmology::new(params).unwrap();

        let model = LinearPowerModel::new(&cosmo, 0.5);
        assert_relative_eq!(
            model.call(&0.2).unwrap(),
            power::linear_matter_power(&cosmo, 0.2, 0.5).unwrap()
        );

        let model = SigmaRModel::new(&cosmo, 0.5);
        assert_relative_eq!(
            model.call(&megaparsecs(5.0)).unwrap(),
            power::sigma_r(&cosmo, 5.0, 0.5, "delta_matter:delta_matter").unwrap(),
            max_relative = 1e-12
        );
        assert!(model.call(&megaparsecs(-5.0)).is_err());
    }
}
