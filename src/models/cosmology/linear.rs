use std::f64::consts::PI;

use ndarray::Array2;
use tracing::debug;

use super::{
    config::AccuracyConfig,
    constants::{HUBBLE_DISTANCE_MPC, K_PIVOT, SIGMA8_RADIUS},
    error::CosmologyError,
    growth::Growth,
    parameters::{CosmologyParameters, Normalization},
    pk2d::Pk2d,
    transfer::Transfer,
    variance,
};

/// Linear matter power spectrum today as an analytic function of `k`.
#[derive(Debug, Clone, Copy)]
pub(super) struct LinearShape {
    amplitude: f64,
    n_s: f64,
    transfer: Transfer,
    /// `c / H0` in Mpc.
    hubble_distance: f64,
    normalization: Normalization,
}

impl LinearShape {
    pub(super) fn new(
        params: &CosmologyParameters,
        growth: &Growth,
        config: &AccuracyConfig,
    ) -> Result<Self, CosmologyError> {
        let mut shape = Self {
            amplitude: 1.0,
            n_s: params.n_s,
            transfer: Transfer::new(params),
            hubble_distance: HUBBLE_DISTANCE_MPC / params.h,
            normalization: params.normalization,
        };

        let amplitude = match params.normalization {
            Normalization::Sigma8(sigma8) => {
                let r8 = SIGMA8_RADIUS / params.h;
                let unnormalized = variance::sigma2(|k| shape.eval(k), r8, &config.integration)?;
                sigma8 * sigma8 / unnormalized
            }
            Normalization::As(a_s) => {
                let d_today = growth.today() / params.omega_m();
                2.0 * PI * PI * 4.0 / 25.0 * a_s * d_today * d_today
            }
        };

        if !amplitude.is_finite() || amplitude <= 0.0 {
            return Err(CosmologyError::NonFinite {
                context: "linear power amplitude".into(),
            });
        }
        shape.amplitude = amplitude;

        debug!(amplitude, normalization = ?shape.normalization, "normalized linear power");
        Ok(shape)
    }

    /// `P_lin(k, a = 1)` in Mpc³ for `k` in Mpc⁻¹.
    pub(super) fn eval(&self, k: f64) -> f64 {
        let t = self.transfer.eval(k);
        let primordial = match self.normalization {
            Normalization::Sigma8(_) => k.powf(self.n_s),
            Normalization::As(_) => {
                let k_h = k * self.hubble_distance;
                (k / K_PIVOT).powf(self.n_s - 1.0) * k_h.powi(4) / (k * k * k)
            }
        };
        self.amplitude * primordial * t * t
    }
}

/// Tabulates the linear spectrum on the configured grid.
pub(super) fn tabulate(
    shape: &LinearShape,
    growth: &Growth,
    config: &AccuracyConfig,
) -> Result<Pk2d, CosmologyError> {
    let a = config.spline.a_nodes();
    let k = config.spline.k_nodes();

    let ln_pk_today: Vec<f64> = k.iter().map(|&k| shape.eval(k).ln()).collect();
    if ln_pk_today.iter().any(|v| !v.is_finite()) {
        return Err(CosmologyError::NonFinite {
            context: "linear power today".into(),
        });
    }

    let ln_pk = Array2::from_shape_fn((a.len(), k.len()), |(i, j)| {
        ln_pk_today[j] + 2.0 * growth.factor(a[i]).ln()
    });

    debug!(n_a = a.len(), n_k = k.len(), "tabulated linear power");

    let ln_k = k.iter().map(|k| k.ln()).collect();
    Pk2d::from_log_table(a, ln_k, ln_pk)
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    use crate::models::cosmology::background::Background;

    fn setup(normalization: Normalization) -> (CosmologyParameters, Growth, AccuracyConfig) {
        let params = CosmologyParameters::new(0.25, 0.05, 0.7, 0.96, normalization);
        let config = AccuracyConfig::default();
        let growth = Growth::solve(&Background::new(&params), &config.growth).unwrap();
        (params, growth, config)
    }

    #[test]
    fn sigma8_normalization_reproduces_sigma8() {
        let (params, growth, config) = setup(Normalization::Sigma8(0.8));
        let shape = LinearShape::new(&params, &growth, &config).unwrap();
        let s2 = variance::sigma2(|k| shape.eval(k), 8.0 / 0.7, &config.integration).unwrap();
        assert_relative_eq!(s2.sqrt(), 0.8, max_relative = 1e-6);
    }

    #[test]
    fn as_normalization_gives_realistic_sigma8() {
        let (params, growth, config) = setup(Normalization::As(2.1e-9));
        let shape = LinearShape::new(&params, &growth, &config).unwrap();
        let sigma8 = variance::sigma2(|k| shape.eval(k), 8.0 / 0.7, &config.integration)
            .unwrap()
            .sqrt();
        assert!(sigma8 > 0.7 && sigma8 < 0.95, "sigma8={sigma8}");
    }

    #[test]
    fn table_follows_growth() {
        let (params, growth, config) = setup(Normalization::Sigma8(0.8));
        let shape = LinearShape::new(&params, &growth, &config).unwrap();
        let table = tabulate(&shape, &growth, &config).unwrap();

        let today = table.slice(1.0, &growth).unwrap();
        let earlier = table.slice(0.5, &growth).unwrap();
        for k in [1e-3, 0.1, 1.0] {
            assert_relative_eq!(today.eval(k), shape.eval(k), max_relative = 1e-6);
            let ratio = earlier.eval(k) / today.eval(k);
            assert_relative_eq!(ratio, growth.factor(0.5).powi(2), max_relative = 1e-4);
        }
    }
}
