//! Accuracy settings for tabulation, integration, and root finding.

use thiserror::Error;
use twine_solvers::equation::bisection;

use crate::support::{
    constraint::{Constraint, StrictlyPositive},
    integrate::Tolerance,
};

/// Errors for accuracy settings that cannot produce a usable table.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ConfigError {
    #[error("invalid {context} wavenumber range: k_min={k_min}, k_max={k_max}")]
    WavenumberRange {
        context: &'static str,
        k_min: f64,
        k_max: f64,
    },
    #[error("smallest tabulated scale factor must lie in (0, 1): a_min={a_min}")]
    ScaleFactorMin { a_min: f64 },
    #[error("invalid sigma(M) range: log10_m_min={min}, log10_m_max={max}")]
    MassRange { min: f64, max: f64 },
    #[error("growth must start in (0, 1): a_init={a_init}")]
    GrowthStart { a_init: f64 },
    #[error("growth integration needs at least one step")]
    GrowthSteps,
    #[error("invalid halofit radius bracket: r_min={r_min}, r_max={r_max}")]
    RadiusBracket { r_min: f64, r_max: f64 },
}

/// Sampling of the tabulated spectra and the sigma(M) table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplineConfig {
    /// Smallest tabulated scale factor; below it spectra follow linear growth.
    pub a_min: f64,

    /// Number of scale factor nodes, log-spaced from `a_min` to one.
    pub n_a: usize,

    /// Smallest tabulated wavenumber, in Mpc⁻¹.
    pub k_min: f64,

    /// Largest tabulated wavenumber, in Mpc⁻¹.
    pub k_max: f64,

    /// Wavenumber nodes per decade.
    pub n_k_per_decade: usize,

    /// Lower end of the sigma(M) table, as `log10(M / M☉)`.
    pub log10_m_min: f64,

    /// Upper end of the sigma(M) table, as `log10(M / M☉)`.
    pub log10_m_max: f64,

    /// Number of mass nodes in the sigma(M) table.
    pub n_m: usize,
}

impl Default for SplineConfig {
    fn default() -> Self {
        Self {
            a_min: 0.01,
            n_a: 48,
            k_min: 1e-5,
            k_max: 1e3,
            n_k_per_decade: 30,
            log10_m_min: 6.0,
            log10_m_max: 17.0,
            n_m: 221,
        }
    }
}

impl SplineConfig {
    /// Checks that the grids are non-empty and lie in their physical ranges.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] encountered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_wavenumbers("spline", self.k_min, self.k_max)?;
        if !(self.a_min > 0.0 && self.a_min < 1.0) {
            return Err(ConfigError::ScaleFactorMin { a_min: self.a_min });
        }
        if !(self.log10_m_min.is_finite()
            && self.log10_m_max.is_finite()
            && self.log10_m_min < self.log10_m_max)
        {
            return Err(ConfigError::MassRange {
                min: self.log10_m_min,
                max: self.log10_m_max,
            });
        }
        Ok(())
    }

    /// Log-spaced scale factor nodes from `a_min` to one.
    pub(super) fn a_nodes(&self) -> Vec<f64> {
        log_spaced(self.a_min, 1.0, self.n_a.max(2))
    }

    /// Log-spaced wavenumber nodes from `k_min` to `k_max`.
    pub(super) fn k_nodes(&self) -> Vec<f64> {
        let decades = (self.k_max / self.k_min).log10();
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        let n = (((decades * self.n_k_per_decade as f64) - 1e-9).ceil() as usize).max(1) + 1;
        log_spaced(self.k_min, self.k_max, n)
    }

    /// Evenly spaced `log10 M` nodes for the sigma(M) table.
    pub(super) fn log10_m_nodes(&self) -> Vec<f64> {
        let n = self.n_m.max(2);
        #[allow(clippy::cast_precision_loss)]
        let step = (self.log10_m_max - self.log10_m_min) / (n - 1) as f64;
        #[allow(clippy::cast_precision_loss)]
        (0..n)
            .map(|i| self.log10_m_min + step * i as f64)
            .collect()
    }
}

/// Wavenumber range and tolerances for variance integrals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntegrationConfig {
    /// Lower integration limit, in Mpc⁻¹.
    pub k_min: f64,

    /// Upper integration limit, in Mpc⁻¹.
    pub k_max: f64,

    /// Relative tolerance of each integral.
    pub epsrel: f64,

    /// Maximum number of adaptive subintervals.
    pub max_subintervals: usize,
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            k_min: 5e-5,
            k_max: 1e3,
            epsrel: 1e-6,
            max_subintervals: 1000,
        }
    }
}

impl IntegrationConfig {
    /// Checks the integration range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::WavenumberRange`] unless `0 < k_min < k_max < ∞`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_wavenumbers("integration", self.k_min, self.k_max)
    }

    pub(super) fn tolerance(&self) -> Tolerance {
        Tolerance {
            abs: 0.0,
            rel: self.epsrel,
            max_subintervals: self.max_subintervals,
        }
    }

    pub(super) fn ln_k_range(&self) -> (f64, f64) {
        (self.k_min.ln(), self.k_max.ln())
    }
}

/// Settings for the linear growth integration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrowthConfig {
    /// Scale factor at which matter domination (`D = a`) is assumed.
    pub a_init: f64,

    /// Number of RK4 steps in `ln a` from `a_init` to one.
    pub steps: usize,
}

impl Default for GrowthConfig {
    fn default() -> Self {
        Self {
            a_init: 1e-3,
            steps: 1000,
        }
    }
}

impl GrowthConfig {
    /// Checks the starting scale factor and step count.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] encountered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.a_init > 0.0 && self.a_init < 1.0) {
            return Err(ConfigError::GrowthStart {
                a_init: self.a_init,
            });
        }
        if self.steps == 0 {
            return Err(ConfigError::GrowthSteps);
        }
        Ok(())
    }
}

/// Settings for the HALOFIT non-linear scale root find.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HalofitConfig {
    /// Smallest Gaussian filter radius searched, in Mpc.
    pub r_min: f64,

    /// Largest Gaussian filter radius searched, in Mpc.
    pub r_max: f64,

    /// Maximum bisection iterations.
    pub max_iters: usize,

    /// Absolute tolerance on `ln R`.
    pub ln_r_tol: f64,

    /// Absolute tolerance on the residual `ln σ²`.
    pub residual_tol: f64,
}

impl Default for HalofitConfig {
    fn default() -> Self {
        Self {
            r_min: 1e-3,
            r_max: 1e2,
            max_iters: 100,
            ln_r_tol: 1e-9,
            residual_tol: 1e-9,
        }
    }
}

impl HalofitConfig {
    /// Checks the radius bracket.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::RadiusBracket`] unless `0 < r_min < r_max < ∞`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if StrictlyPositive::check(&self.r_min).is_err()
            || !self.r_max.is_finite()
            || self.r_min >= self.r_max
        {
            return Err(ConfigError::RadiusBracket {
                r_min: self.r_min,
                r_max: self.r_max,
            });
        }
        Ok(())
    }

    /// Converts this configuration into a bisection solver configuration.
    pub(super) fn bisection(&self) -> bisection::Config {
        bisection::Config {
            max_iters: self.max_iters,
            x_abs_tol: self.ln_r_tol,
            x_rel_tol: 0.0,
            residual_tol: self.residual_tol,
        }
    }
}

/// All accuracy settings for a [`Cosmology`](super::Cosmology).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AccuracyConfig {
    pub spline: SplineConfig,
    pub integration: IntegrationConfig,
    pub growth: GrowthConfig,
    pub halofit: HalofitConfig,
}

impl AccuracyConfig {
    /// Checks every group of settings.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] encountered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.spline.validate()?;
        self.integration.validate()?;
        self.growth.validate()?;
        self.halofit.validate()
    }
}

fn check_wavenumbers(context: &'static str, k_min: f64, k_max: f64) -> Result<(), ConfigError> {
    if StrictlyPositive::check(&k_min).is_err() || !k_max.is_finite() || k_min >= k_max {
        return Err(ConfigError::WavenumberRange {
            context,
            k_min,
            k_max,
        });
    }
    Ok(())
}

fn log_spaced(start: f64, end: f64, n: usize) -> Vec<f64> {
    let (ln_start, ln_end) = (start.ln(), end.ln());
    #[allow(clippy::cast_precision_loss)]
    let step = (ln_end - ln_start) / (n - 1) as f64;
    #[allow(clippy::cast_precision_loss)]
    let mut nodes: Vec<f64> = (0..n).map(|i| (ln_start + step * i as f64).exp()).collect();
    nodes[n - 1] = end;
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    #[test]
    fn default_grids() {
        let config = SplineConfig::default();

        let a = config.a_nodes();
        assert_eq!(a.len(), 48);
        assert_relative_eq!(a[0], 0.01, max_relative = 1e-12);
        assert_eq!(a[47], 1.0);
        assert!(a.windows(2).all(|w| w[1] > w[0]));

        let k = config.k_nodes();
        assert_eq!(k.len(), 8 * 30 + 1);
        assert_relative_eq!(k[0], 1e-5, max_relative = 1e-12);
        assert_relative_eq!(k[k.len() - 1], 1e3);

        let m = config.log10_m_nodes();
        assert_eq!(m.len(), 221);
        assert_relative_eq!(m[0], 6.0);
        assert_relative_eq!(m[220], 17.0, max_relative = 1e-12);
    }

    #[test]
    fn default_config_is_valid() {
        assert_eq!(AccuracyConfig::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_bad_wavenumber_ranges() {
        let ranges = [
            (0.0, 1e3),
            (-1.0, 1e3),
            (1e3, 1e-5),
            (1.0, 1.0),
            (1e-5, f64::INFINITY),
        ];
        for (k_min, k_max) in ranges {
            let config = AccuracyConfig {
                spline: SplineConfig {
                    k_min,
                    k_max,
                    ..SplineConfig::default()
                },
                ..AccuracyConfig::default()
            };
            assert!(matches!(
                config.validate(),
                Err(ConfigError::WavenumberRange {
                    context: "spline",
                    ..
                })
            ));

            let config = AccuracyConfig {
                integration: IntegrationConfig {
                    k_min,
                    k_max,
                    ..IntegrationConfig::default()
                },
                ..AccuracyConfig::default()
            };
            assert!(matches!(
                config.validate(),
                Err(ConfigError::WavenumberRange {
                    context: "integration",
                    ..
                })
            ));
        }
    }

    #[test]
    fn rejects_bad_scale_factor_floor() {
        for a_min in [0.0, 1.0, 1.5, f64::NAN] {
            let config = SplineConfig {
                a_min,
                ..SplineConfig::default()
            };
            assert!(matches!(
                config.validate(),
                Err(ConfigError::ScaleFactorMin { .. })
            ));
        }
    }

    #[test]
    fn rejects_empty_mass_range() {
        let config = SplineConfig {
            log10_m_min: 17.0,
            log10_m_max: 6.0,
            ..SplineConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::MassRange {
                min: 17.0,
                max: 6.0
            })
        );
    }

    #[test]
    fn rejects_bad_growth_settings() {
        for a_init in [0.0, 1.0, -1e-3] {
            let config = GrowthConfig {
                a_init,
                ..GrowthConfig::default()
            };
            assert_eq!(config.validate(), Err(ConfigError::GrowthStart { a_init }));
        }

        let config = GrowthConfig {
            steps: 0,
            ..GrowthConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::GrowthSteps));
    }

    #[test]
    fn rejects_bad_radius_bracket() {
        for (r_min, r_max) in [(0.0, 1e2), (1e2, 1e-3), (1.0, 1.0), (1e-3, f64::INFINITY)] {
            let config = HalofitConfig {
                r_min,
                r_max,
                ..HalofitConfig::default()
            };
            assert_eq!(
                config.validate(),
                Err(ConfigError::RadiusBracket { r_min, r_max })
            );
        }
    }
}
