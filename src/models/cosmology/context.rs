use std::{collections::HashMap, sync::OnceLock};

use tracing::debug;

use super::{
    background::Background,
    config::AccuracyConfig,
    constants::{DEFAULT_POWER_SPECTRUM, RHO_CRITICAL},
    error::{CosmologyError, SpectrumKind},
    growth::Growth,
    halofit,
    linear::{self, LinearShape},
    parameters::{CosmologyParameters, MatterPowerSpectrum, Normalization, ParametersError},
    pk2d::Pk2d,
    variance::SigmaTable,
};

/// A tabulated spectrum tagged with whether it is linear.
#[derive(Debug, Clone)]
pub enum PowerSpectrum {
    Linear(Pk2d),
    NonLinear(Pk2d),
}

impl PowerSpectrum {
    /// The underlying table.
    #[must_use]
    pub fn pk2d(&self) -> &Pk2d {
        match self {
            Self::Linear(pk) | Self::NonLinear(pk) => pk,
        }
    }

    #[must_use]
    pub fn kind(&self) -> SpectrumKind {
        match self {
            Self::Linear(_) => SpectrumKind::Linear,
            Self::NonLinear(_) => SpectrumKind::NonLinear,
        }
    }
}

/// Where a query takes its power spectrum from.
#[derive(Debug, Clone, Copy)]
pub enum PowerSpectrumSource<'a> {
    /// A spectrum registered in the [`Cosmology`] under this id.
    Named(&'a str),

    /// A spectrum supplied directly by the caller.
    Spectrum(&'a PowerSpectrum),
}

impl<'a> From<&'a str> for PowerSpectrumSource<'a> {
    fn from(name: &'a str) -> Self {
        Self::Named(name)
    }
}

impl<'a> From<&'a PowerSpectrum> for PowerSpectrumSource<'a> {
    fn from(spectrum: &'a PowerSpectrum) -> Self {
        Self::Spectrum(spectrum)
    }
}

impl Default for PowerSpectrumSource<'_> {
    fn default() -> Self {
        Self::Named(DEFAULT_POWER_SPECTRUM)
    }
}

/// A cosmological model with its lazily computed tables.
///
/// Tables are built on first use and cached, so a shared reference is enough
/// for every query. The growth factor, the default linear and non-linear
/// spectra, and the sigma(M) table are each built at most once.
///
/// # Example
///
/// ```
/// use twine_cosmology::models::cosmology::{Cosmology, CosmologyParameters, Normalization};
///
/// let params = CosmologyParameters::new(0.25, 0.05, 0.7, 0.96, Normalization::Sigma8(0.8));
/// let cosmo = Cosmology::new(params).unwrap();
///
/// assert_eq!(cosmo.sigma8_param(), Some(0.8));
/// assert!((cosmo.growth_factor(1.0).unwrap() - 1.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct Cosmology {
    params: CosmologyParameters,
    config: AccuracyConfig,
    background: Background,
    sigma8: Option<f64>,
    growth: OnceLock<Growth>,
    linear: OnceLock<Pk2d>,
    nonlinear: OnceLock<Pk2d>,
    sigma: OnceLock<SigmaTable>,
    linear_spectra: HashMap<String, Pk2d>,
    nonlinear_spectra: HashMap<String, Pk2d>,
}

impl Cosmology {
    /// Creates a cosmology with the default accuracy settings.
    ///
    /// # Errors
    ///
    /// Returns [`ParametersError`] if the parameters are not physical.
    pub fn new(params: CosmologyParameters) -> Result<Self, ParametersError> {
        Self::with_config(params, AccuracyConfig::default())
    }

    /// Creates a cosmology with custom accuracy settings.
    ///
    /// # Errors
    ///
    /// Returns [`ParametersError`] if the parameters are not physical, or
    /// [`ParametersError::Accuracy`] if the accuracy settings are unusable.
    pub fn with_config(
        params: CosmologyParameters,
        config: AccuracyConfig,
    ) -> Result<Self, ParametersError> {
        params.validate()?;
        config.validate()?;

        let sigma8 = match params.normalization {
            Normalization::Sigma8(sigma8) => Some(sigma8),
            Normalization::As(_) => None,
        };

        Ok(Self {
            background: Background::new(&params),
            params,
            config,
            sigma8,
            growth: OnceLock::new(),
            linear: OnceLock::new(),
            nonlinear: OnceLock::new(),
            sigma: OnceLock::new(),
            linear_spectra: HashMap::new(),
            nonlinear_spectra: HashMap::new(),
        })
    }

    #[must_use]
    pub fn parameters(&self) -> &CosmologyParameters {
        &self.params
    }

    #[must_use]
    pub fn config(&self) -> &AccuracyConfig {
        &self.config
    }

    /// The stored sigma8, or `None` while it is undefined.
    #[must_use]
    pub fn sigma8_param(&self) -> Option<f64> {
        self.sigma8
    }

    /// Stores `value` as sigma8 if none is stored yet.
    pub(super) fn fill_sigma8(&mut self, value: f64) {
        if self.sigma8.is_none() {
            debug!(sigma8 = value, "stored computed sigma8");
            self.sigma8 = Some(value);
        }
    }

    /// The linear growth table, solving it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`CosmologyError::Growth`] if the integration fails.
    pub fn growth(&self) -> Result<&Growth, CosmologyError> {
        get_or_try_init(&self.growth, || {
            Growth::solve(&self.background, &self.config.growth)
        })
    }

    /// Growth factor normalized to one today.
    ///
    /// # Errors
    ///
    /// Returns [`CosmologyError::Growth`] if the integration fails.
    pub fn growth_factor(&self, a: f64) -> Result<f64, CosmologyError> {
        Ok(self.growth()?.factor(a))
    }

    /// The default linear matter power spectrum.
    ///
    /// # Errors
    ///
    /// Returns a [`CosmologyError`] if normalization or tabulation fails.
    pub fn compute_linear_power(&self) -> Result<&Pk2d, CosmologyError> {
        get_or_try_init(&self.linear, || {
            let growth = self.growth()?;
            let shape = LinearShape::new(&self.params, growth, &self.config)?;
            linear::tabulate(&shape, growth, &self.config)
        })
    }

    /// The default non-linear matter power spectrum.
    ///
    /// # Errors
    ///
    /// Returns a [`CosmologyError`] if the linear spectrum or HALOFIT fails.
    pub fn compute_nonlin_power(&self) -> Result<&Pk2d, CosmologyError> {
        get_or_try_init(&self.nonlinear, || {
            let linear = self.compute_linear_power()?;
            match self.params.matter_power_spectrum {
                MatterPowerSpectrum::Linear => {
                    debug!("non-linear power equals linear power");
                    Ok(linear.clone())
                }
                MatterPowerSpectrum::Halofit => {
                    halofit::tabulate(linear, &self.background, self.growth()?, &self.config)
                }
            }
        })
    }

    /// The sigma(M) table today, built from the default linear spectrum.
    ///
    /// Repeated calls return the cached table.
    ///
    /// # Errors
    ///
    /// Returns a [`CosmologyError`] if the linear spectrum or an integral fails.
    pub fn compute_sigma(&self) -> Result<&SigmaTable, CosmologyError> {
        get_or_try_init(&self.sigma, || {
            let slice = self.compute_linear_power()?.slice(1.0, self.growth()?)?;
            let h = self.params.h;
            let rho_m = RHO_CRITICAL * h * h * self.params.omega_m();
            SigmaTable::build(
                |k| slice.eval(k),
                &self.config.spline.log10_m_nodes(),
                rho_m,
                &self.config.integration,
            )
        })
    }

    /// Looks up a linear spectrum by id.
    ///
    /// # Errors
    ///
    /// - [`CosmologyError::NotLinear`] if the id names only a non-linear spectrum.
    /// - [`CosmologyError::UnknownSpectrum`] if the id is not registered.
    pub fn get_linear_power(&self, name: &str) -> Result<&Pk2d, CosmologyError> {
        if name == DEFAULT_POWER_SPECTRUM {
            return self.compute_linear_power();
        }
        if let Some(pk) = self.linear_spectra.get(name) {
            return Ok(pk);
        }
        if self.nonlinear_spectra.contains_key(name) {
            return Err(CosmologyError::NotLinear { name: name.into() });
        }
        Err(CosmologyError::UnknownSpectrum {
            name: name.into(),
            kind: SpectrumKind::Linear,
        })
    }

    /// Looks up a non-linear spectrum by id.
    ///
    /// # Errors
    ///
    /// Returns [`CosmologyError::UnknownSpectrum`] if the id is not registered.
    pub fn get_nonlin_power(&self, name: &str) -> Result<&Pk2d, CosmologyError> {
        if name == DEFAULT_POWER_SPECTRUM {
            return self.compute_nonlin_power();
        }
        self.nonlinear_spectra
            .get(name)
            .ok_or_else(|| CosmologyError::UnknownSpectrum {
                name: name.into(),
                kind: SpectrumKind::NonLinear,
            })
    }

    /// Resolves a spectrum source.
    ///
    /// Named sources are looked up in the registry of the given `kind`.
    /// Caller-supplied spectra are returned as they are.
    ///
    /// # Errors
    ///
    /// Returns a [`CosmologyError`] if a named source cannot be resolved.
    pub fn parse_pk2d<'a>(
        &'a self,
        source: PowerSpectrumSource<'a>,
        kind: SpectrumKind,
    ) -> Result<&'a Pk2d, CosmologyError> {
        match (source, kind) {
            (PowerSpectrumSource::Spectrum(spectrum), _) => Ok(spectrum.pk2d()),
            (PowerSpectrumSource::Named(name), SpectrumKind::Linear) => self.get_linear_power(name),
            (PowerSpectrumSource::Named(name), SpectrumKind::NonLinear) => {
                self.get_nonlin_power(name)
            }
        }
    }

    /// Registers a caller-supplied linear spectrum.
    ///
    /// # Errors
    ///
    /// Returns [`CosmologyError::ReservedSpectrum`] for the default id.
    pub fn register_linear_power(
        &mut self,
        name: impl Into<String>,
        pk: Pk2d,
    ) -> Result<(), CosmologyError> {
        let name = reserve_check(name.into())?;
        debug!(%name, "registered linear power spectrum");
        self.linear_spectra.insert(name, pk);
        Ok(())
    }

    /// Registers a caller-supplied non-linear spectrum.
    ///
    /// # Errors
    ///
    /// Returns [`CosmologyError::ReservedSpectrum`] for the default id.
    pub fn register_nonlin_power(
        &mut self,
        name: impl Into<String>,
        pk: Pk2d,
    ) -> Result<(), CosmologyError> {
        let name = reserve_check(name.into())?;
        debug!(%name, "registered non-linear power spectrum");
        self.nonlinear_spectra.insert(name, pk);
        Ok(())
    }
}

fn reserve_check(name: String) -> Result<String, CosmologyError> {
    if name == DEFAULT_POWER_SPECTRUM {
        Err(CosmologyError::ReservedSpectrum { name })
    } else {
        Ok(name)
    }
}

fn get_or_try_init<T>(
    cell: &OnceLock<T>,
    init: impl FnOnce() -> Result<T, CosmologyError>,
) -> Result<&T, CosmologyError> {
    if let Some(value) = cell.get() {
        return Ok(value);
    }
    let value = init()?;
    Ok(cell.get_or_init(|| value))
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use ndarray::Array2;

    fn cosmology() -> Cosmology {
        let params = CosmologyParameters::new(0.25, 0.05, 0.7, 0.96, Normalization::Sigma8(0.8));
        Cosmology::new(params).unwrap()
    }

    fn flat_table(value: f64) -> Pk2d {
        Pk2d::new(&[0.5, 1.0], &[0.01, 1.0], &Array2::from_elem((2, 2), value)).unwrap()
    }

    #[test]
    fn rejects_invalid_parameters() {
        let params = CosmologyParameters::new(0.25, 0.05, -0.7, 0.96, Normalization::Sigma8(0.8));
        assert!(matches!(
            Cosmology::new(params),
            Err(ParametersError::Hubble { .. })
        ));
    }

    #[test]
    fn rejects_unusable_accuracy_settings() {
        use crate::models::cosmology::config::{ConfigError, SplineConfig};

        let params = CosmologyParameters::new(0.25, 0.05, 0.7, 0.96, Normalization::Sigma8(0.8));
        let config = AccuracyConfig {
            spline: SplineConfig {
                k_min: 0.0,
                ..SplineConfig::default()
            },
            ..AccuracyConfig::default()
        };
        assert!(matches!(
            Cosmology::with_config(params, config),
            Err(ParametersError::Accuracy(ConfigError::WavenumberRange { .. }))
        ));
    }

    #[test]
    fn sigma8_slot_follows_normalization() {
        assert_eq!(cosmology().sigma8_param(), Some(0.8));

        let params = CosmologyParameters::new(0.25, 0.05, 0.7, 0.96, Normalization::As(2.1e-9));
        let mut cosmo = Cosmology::new(params).unwrap();
        assert_eq!(cosmo.sigma8_param(), None);

        cosmo.fill_sigma8(0.83);
        cosmo.fill_sigma8(0.9);
        assert_eq!(cosmo.sigma8_param(), Some(0.83));
    }

    #[test]
    fn tables_are_cached() {
        let cosmo = cosmology();
        let first = cosmo.compute_linear_power().unwrap() as *const Pk2d;
        let second = cosmo.compute_linear_power().unwrap() as *const Pk2d;
        assert_eq!(first, second);
    }

    #[test]
    fn sigma_m_builds_table_before_checking_scale_factor() {
        use crate::models::cosmology::{TransferFunction, power};

        let params = CosmologyParameters::new(0.25, 0.05, 0.7, 0.96, Normalization::Sigma8(0.8))
            .with_transfer_function(TransferFunction::Bbks);
        let cosmo = Cosmology::new(params).unwrap();
        assert!(cosmo.sigma.get().is_none());

        let err = power::sigma_m(&cosmo, 1e13, 1.5).unwrap_err();
        assert!(matches!(
            err.source,
            CosmologyError::ScaleFactorOutOfRange { .. }
        ));
        assert!(cosmo.sigma.get().is_some());
    }

    #[test]
    fn linear_model_copies_linear_table() {
        let params = CosmologyParameters::new(0.25, 0.05, 0.7, 0.96, Normalization::Sigma8(0.8))
            .with_matter_power_spectrum(MatterPowerSpectrum::Linear);
        let cosmo = Cosmology::new(params).unwrap();
        let growth = cosmo.growth().unwrap();

        let lin = cosmo.compute_linear_power().unwrap().slice(0.7, growth).unwrap();
        let nl = cosmo.compute_nonlin_power().unwrap().slice(0.7, growth).unwrap();
        assert_relative_eq!(lin.eval(3.0), nl.eval(3.0));
    }

    #[test]
    fn registry_lookup() {
        let mut cosmo = cosmology();
        cosmo.register_linear_power("flat", flat_table(2.0)).unwrap();
        cosmo.register_nonlin_power("flat_nl", flat_table(3.0)).unwrap();

        assert!(cosmo.get_linear_power("flat").is_ok());
        assert!(cosmo.get_nonlin_power("flat_nl").is_ok());
        assert!(matches!(
            cosmo.get_linear_power("flat_nl"),
            Err(CosmologyError::NotLinear { .. })
        ));
        assert!(matches!(
            cosmo.get_nonlin_power("flat"),
            Err(CosmologyError::UnknownSpectrum {
                kind: SpectrumKind::NonLinear,
                ..
            })
        ));
        assert!(matches!(
            cosmo.parse_pk2d(PowerSpectrumSource::Named("missing"), SpectrumKind::Linear),
            Err(CosmologyError::UnknownSpectrum { .. })
        ));

        let supplied = PowerSpectrum::NonLinear(flat_table(4.0));
        let pk = cosmo
            .parse_pk2d((&supplied).into(), SpectrumKind::Linear)
            .unwrap();
        assert_eq!(pk.a(), &[0.5, 1.0]);
    }

    #[test]
    fn default_id_is_reserved() {
        let mut cosmo = cosmology();
        assert!(matches!(
            cosmo.register_linear_power(DEFAULT_POWER_SPECTRUM, flat_table(1.0)),
            Err(CosmologyError::ReservedSpectrum { .. })
        ));
        assert!(matches!(
            cosmo.register_nonlin_power(DEFAULT_POWER_SPECTRUM, flat_table(1.0)),
            Err(CosmologyError::ReservedSpectrum { .. })
        ));
    }
}
