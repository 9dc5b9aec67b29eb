//! Variance integrals of the linear density field.

use std::f64::consts::PI;

use tracing::debug;

use crate::support::{integrate::integrate, interp::CubicSpline};

use super::{config::IntegrationConfig, error::CosmologyError};

/// Fourier transform of a spherical top-hat of unit volume, `3 (sin x − x cos x) / x³`.
pub(super) fn top_hat(x: f64) -> f64 {
    if x < 0.1 {
        let x2 = x * x;
        1.0 - x2 / 10.0 + x2 * x2 / 280.0
    } else {
        3.0 * (x.sin() - x * x.cos()) / (x * x * x)
    }
}

/// `σ²(R) = ∫ d ln k k³ P(k) W²(kR) / (2π²)`.
pub(super) fn sigma2<F>(pk: F, r: f64, config: &IntegrationConfig) -> Result<f64, CosmologyError>
where
    F: Fn(f64) -> f64,
{
    log_k_integral(
        |k| {
            let w = top_hat(k * r);
            k * k * k * pk(k) * w * w
        },
        config,
        "sigma(R)",
    )
    .map(|value| value / (2.0 * PI * PI))
}

/// `σ_V²(R) = ∫ d ln k k P(k) W²(kR) / (6π²)`, in Mpc².
pub(super) fn sigma_v2<F>(pk: F, r: f64, config: &IntegrationConfig) -> Result<f64, CosmologyError>
where
    F: Fn(f64) -> f64,
{
    log_k_integral(
        |k| {
            let w = top_hat(k * r);
            k * pk(k) * w * w
        },
        config,
        "sigma_V(R)",
    )
    .map(|value| value / (6.0 * PI * PI))
}

/// Non-linear scale `[∫ d ln k k P(k) / (6π²)]^(-1/2)`, in Mpc⁻¹.
pub(super) fn k_nl<F>(pk: F, config: &IntegrationConfig) -> Result<f64, CosmologyError>
where
    F: Fn(f64) -> f64,
{
    let integral = log_k_integral(|k| k * pk(k), config, "k_NL")? / (6.0 * PI * PI);
    Ok(integral.powf(-0.5))
}

fn log_k_integral<F>(f: F, config: &IntegrationConfig, context: &str) -> Result<f64, CosmologyError>
where
    F: Fn(f64) -> f64,
{
    let (lower, upper) = config.ln_k_range();
    let quad = integrate(|ln_k| f(ln_k.exp()), lower, upper, &config.tolerance())
        .map_err(|source| CosmologyError::integration(context, source))?;
    Ok(quad.value)
}

/// Lagrangian radius in Mpc enclosing mass `m` (M☉) at mean matter density `rho_m` (M☉/Mpc³).
pub(super) fn lagrangian_radius(m: f64, rho_m: f64) -> f64 {
    (3.0 * m / (4.0 * PI * rho_m)).cbrt()
}

/// `ln σ(M)` today, tabulated against `log10 M`.
#[derive(Debug, Clone)]
pub struct SigmaTable {
    ln_sigma: CubicSpline,
}

impl SigmaTable {
    pub(super) fn build<F>(
        pk: F,
        log10_m: &[f64],
        rho_m: f64,
        config: &IntegrationConfig,
    ) -> Result<Self, CosmologyError>
    where
        F: Fn(f64) -> f64,
    {
        let ln_sigma = log10_m
            .iter()
            .map(|log10_m| {
                let r = lagrangian_radius(10f64.powf(*log10_m), rho_m);
                sigma2(&pk, r, config).map(|s2| 0.5 * s2.ln())
            })
            .collect::<Result<Vec<_>, _>>()?;

        let ln_sigma = CubicSpline::new(log10_m, &ln_sigma)
            .map_err(|source| CosmologyError::spline("sigma(M)", source))?;

        debug!(
            nodes = log10_m.len(),
            log10_m_min = ln_sigma.x_min(),
            log10_m_max = ln_sigma.x_max(),
            "tabulated sigma(M)"
        );

        Ok(Self { ln_sigma })
    }

    /// `σ(M)` today.
    ///
    /// # Errors
    ///
    /// Returns [`CosmologyError::MassOutOfRange`] outside the tabulated masses.
    pub fn sigma_today(&self, log10_m: f64) -> Result<f64, CosmologyError> {
        if !self.ln_sigma.contains(log10_m) {
            return Err(CosmologyError::MassOutOfRange {
                log10_m,
                min: self.ln_sigma.x_min(),
                max: self.ln_sigma.x_max(),
            });
        }
        Ok(self.ln_sigma.eval(log10_m).exp())
    }
}
