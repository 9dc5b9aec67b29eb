//! Cosmological parameters and their validation.

use std::fmt;

use thiserror::Error;
use uom::si::{f64::ThermodynamicTemperature, thermodynamic_temperature::kelvin};

use crate::support::constraint::{Constraint, NonNegative, StrictlyPositive};

use super::config::ConfigError;

/// How the amplitude of the linear power spectrum is fixed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Normalization {
    /// RMS density variance in 8 Mpc/h spheres today.
    Sigma8(f64),

    /// Primordial curvature amplitude at `k = 0.05 Mpc⁻¹`.
    ///
    /// With this normalization the stored sigma8 is undefined until
    /// [`sigma8`](crate::models::cosmology::power::sigma8) computes it.
    As(f64),
}

/// Fitting formula for the matter transfer function.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransferFunction {
    /// Bardeen, Bond, Kaiser & Szalay (1986) with Sugiyama's baryon correction.
    Bbks,

    /// Eisenstein & Hu (1998), including baryon acoustic oscillations.
    #[default]
    EisensteinHu,

    /// Eisenstein & Hu (1998) zero-baryon-oscillation approximation.
    EisensteinHuNoWiggles,
}

/// Model used for the default non-linear matter power spectrum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatterPowerSpectrum {
    /// Takahashi et al. (2012) revision of HALOFIT.
    #[default]
    Halofit,

    /// The non-linear spectrum equals the linear one.
    Linear,
}

/// Errors for parameter sets rejected by [`Cosmology::new`](super::Cosmology::new).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParametersError {
    #[error("invalid cold dark matter density: Omega_c={omega_c}")]
    OmegaC { omega_c: f64 },
    #[error("invalid baryon density: Omega_b={omega_b}")]
    OmegaB { omega_b: f64 },
    #[error("total matter density must be positive: Omega_m={omega_m}")]
    OmegaM { omega_m: f64 },
    #[error("invalid Hubble parameter: h={h}")]
    Hubble { h: f64 },
    #[error("invalid spectral index: n_s={n_s}")]
    SpectralIndex { n_s: f64 },
    #[error("invalid normalization: {normalization:?}")]
    Normalization { normalization: Normalization },
    #[error("invalid curvature: Omega_k={omega_k}")]
    Curvature { omega_k: f64 },
    #[error("invalid dark energy equation of state: w0={w0}, wa={wa}")]
    DarkEnergy { w0: f64, wa: f64 },
    #[error("invalid CMB temperature: {t_cmb:?}")]
    CmbTemperature { t_cmb: ThermodynamicTemperature },
    #[error("{transfer_function:?} requires a positive baryon density")]
    BaryonsRequired { transfer_function: TransferFunction },
    #[error("invalid accuracy settings: {0}")]
    Accuracy(#[from] ConfigError),
}

/// Parameters of a flat or curved CPL-dark-energy cosmology.
///
/// Radiation is not included in the background expansion.
///
/// # Example
///
/// ```
/// use twine_cosmology::models::cosmology::{CosmologyParameters, Normalization};
///
/// let params = CosmologyParameters::new(0.25, 0.05, 0.7, 0.96, Normalization::Sigma8(0.8))
///     .with_dark_energy(-0.9, 0.1);
/// assert!((params.omega_m() - 0.3).abs() < 1e-15);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CosmologyParameters {
    /// Cold dark matter density today.
    pub omega_c: f64,

    /// Baryon density today.
    pub omega_b: f64,

    /// Dimensionless Hubble parameter, `H0 / (100 km/s/Mpc)`.
    pub h: f64,

    /// Primordial spectral index.
    pub n_s: f64,

    /// Amplitude of the linear power spectrum.
    pub normalization: Normalization,

    /// Curvature density today.
    pub omega_k: f64,

    /// Dark energy equation of state today.
    pub w0: f64,

    /// Time derivative of the equation of state, `w(a) = w0 + wa (1 − a)`.
    pub wa: f64,

    /// CMB temperature today.
    pub t_cmb: ThermodynamicTemperature,

    /// Transfer function used to build the linear spectrum.
    pub transfer_function: TransferFunction,

    /// Model used for the non-linear spectrum.
    pub matter_power_spectrum: MatterPowerSpectrum,
}

impl CosmologyParameters {
    /// Creates a flat ΛCDM parameter set with default model choices.
    #[must_use]
    pub fn new(omega_c: f64, omega_b: f64, h: f64, n_s: f64, normalization: Normalization) -> Self {
        Self {
            omega_c,
            omega_b,
            h,
            n_s,
            normalization,
            omega_k: 0.0,
            w0: -1.0,
            wa: 0.0,
            t_cmb: ThermodynamicTemperature::new::<kelvin>(2.7255),
            transfer_function: TransferFunction::default(),
            matter_power_spectrum: MatterPowerSpectrum::default(),
        }
    }

    #[must_use]
    pub fn with_curvature(mut self, omega_k: f64) -> Self {
        self.omega_k = omega_k;
        self
    }

    #[must_use]
    pub fn with_dark_energy(mut self, w0: f64, wa: f64) -> Self {
        self.w0 = w0;
        self.wa = wa;
        self
    }

    #[must_use]
    pub fn with_cmb_temperature(mut self, t_cmb: ThermodynamicTemperature) -> Self {
        self.t_cmb = t_cmb;
        self
    }

    #[must_use]
    pub fn with_transfer_function(mut self, transfer_function: TransferFunction) -> Self {
        self.transfer_function = transfer_function;
        self
    }

    #[must_use]
    pub fn with_matter_power_spectrum(mut self, model: MatterPowerSpectrum) -> Self {
        self.matter_power_spectrum = model;
        self
    }

    /// Total matter density today.
    #[must_use]
    pub fn omega_m(&self) -> f64 {
        self.omega_c + self.omega_b
    }

    /// Dark energy density today, fixed by closure.
    #[must_use]
    pub fn omega_de(&self) -> f64 {
        1.0 - self.omega_m() - self.omega_k
    }

    /// Checks that every parameter is physically meaningful.
    ///
    /// # Errors
    ///
    /// Returns the first [`ParametersError`] encountered.
    pub fn validate(&self) -> Result<(), ParametersError> {
        if NonNegative::check(&self.omega_c).is_err() {
            return Err(ParametersError::OmegaC {
                omega_c: self.omega_c,
            });
        }
        if NonNegative::check(&self.omega_b).is_err() {
            return Err(ParametersError::OmegaB {
                omega_b: self.omega_b,
            });
        }
        if StrictlyPositive::check(&self.omega_m()).is_err() {
            return Err(ParametersError::OmegaM {
                omega_m: self.omega_m(),
            });
        }
        if StrictlyPositive::check(&self.h).is_err() || !self.h.is_finite() {
            return Err(ParametersError::Hubble { h: self.h });
        }
        if !self.n_s.is_finite() {
            return Err(ParametersError::SpectralIndex { n_s: self.n_s });
        }

        let amplitude = match self.normalization {
            Normalization::Sigma8(value) | Normalization::As(value) => value,
        };
        if StrictlyPositive::check(&amplitude).is_err() || !amplitude.is_finite() {
            return Err(ParametersError::Normalization {
                normalization: self.normalization,
            });
        }

        if !self.omega_k.is_finite() {
            return Err(ParametersError::Curvature {
                omega_k: self.omega_k,
            });
        }
        if !self.w0.is_finite() || !self.wa.is_finite() {
            return Err(ParametersError::DarkEnergy {
                w0: self.w0,
                wa: self.wa,
            });
        }
        if StrictlyPositive::check(&self.t_cmb.get::<kelvin>()).is_err() {
            return Err(ParametersError::CmbTemperature { t_cmb: self.t_cmb });
        }
        if self.transfer_function != TransferFunction::Bbks && self.omega_b <= 0.0 {
            return Err(ParametersError::BaryonsRequired {
                transfer_function: self.transfer_function,
            });
        }

        Ok(())
    }
}

/// One-line summary used in error diagnostics.
impl fmt::Display for CosmologyParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Omega_c={}, Omega_b={}, h={}, n_s={}, ",
            self.omega_c, self.omega_b, self.h, self.n_s
        )?;
        match self.normalization {
            Normalization::Sigma8(sigma8) => write!(f, "sigma8={sigma8}, ")?,
            Normalization::As(a_s) => write!(f, "A_s={a_s:e}, ")?,
        }
        write!(
            f,
            "Omega_k={}, w0={}, wa={}, T_CMB={} K, transfer={:?}, matter_pk={:?}",
            self.omega_k,
            self.w0,
            self.wa,
            self.t_cmb.get::<kelvin>(),
            self.transfer_function,
            self.matter_power_spectrum
        )
    }
}
