//! HALOFIT non-linear matter power spectrum.
//!
//! Implements the Takahashi et al. (2012) revision of Smith et al. (2003).
//! At each tabulated scale factor the non-linear scale `k_σ = 1/R_σ` is found
//! by bisection on `ln σ²_G(R) = 0`, where `σ²_G` is the linear variance under
//! a Gaussian filter. When `σ_G < 1` at the smallest searched radius the
//! field is linear on all tabulated scales and the linear spectrum is kept.

mod problem;

use std::f64::consts::PI;

use ndarray::Array2;
use tracing::{debug, trace};
use twine_core::Model;
use twine_solvers::equation::bisection;

use crate::support::integrate::integrate;

use super::{
    background::Background,
    config::{AccuracyConfig, HalofitConfig, IntegrationConfig},
    error::CosmologyError,
    growth::Growth,
    pk2d::{Pk2d, PkSlice},
};

use problem::{GaussianVarianceModel, GaussianVarianceProblem};

/// Builds the non-linear spectrum on the nodes of `linear`.
pub(super) fn tabulate(
    linear: &Pk2d,
    background: &Background,
    growth: &Growth,
    config: &AccuracyConfig,
) -> Result<Pk2d, CosmologyError> {
    let a = linear.a().to_vec();
    let k = linear.k();
    let mut ln_pk = Array2::zeros((a.len(), k.len()));

    for (i, &a_i) in a.iter().enumerate() {
        let slice = linear.slice(a_i, growth)?;
        let coefficients = nonlinear_scale(&slice, a_i, &config.integration, &config.halofit)?
            .map(|scale| (scale.k_sigma, Coefficients::new(&scale, background, a_i)));

        for (j, &k_j) in k.iter().enumerate() {
            let p_lin = slice.eval(k_j);
            let p = match &coefficients {
                Some((k_sigma, coefficients)) => {
                    let norm = k_j * k_j * k_j / (2.0 * PI * PI);
                    coefficients.delta2(p_lin * norm, k_j / k_sigma) / norm
                }
                None => p_lin,
            };
            if !(p > 0.0 && p.is_finite()) {
                return Err(CosmologyError::NonFinite {
                    context: format!("halofit power at a={a_i}, k={k_j}"),
                });
            }
            ln_pk[[i, j]] = p.ln();
        }
    }

    debug!(n_a = a.len(), n_k = k.len(), "tabulated halofit power");

    let ln_k = k.iter().map(|k| k.ln()).collect();
    Pk2d::from_log_table(a, ln_k, ln_pk)
}

/// Spectral properties of the linear field at the non-linear scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct NonLinearScale {
    /// `1 / R_σ` in Mpc⁻¹.
    pub(super) k_sigma: f64,
    /// Effective spectral index.
    pub(super) n_eff: f64,
    /// Spectral curvature.
    pub(super) curvature: f64,
}

/// Finds the non-linear scale, or `None` if the field is linear at `r_min`.
pub(super) fn nonlinear_scale(
    slice: &PkSlice,
    a: f64,
    integration: &IntegrationConfig,
    config: &HalofitConfig,
) -> Result<Option<NonLinearScale>, CosmologyError> {
    let model = GaussianVarianceModel::new(slice, integration);

    if model.call(&config.r_min)?.sigma2 < 1.0 {
        trace!(a, "linear on all scales");
        return Ok(None);
    }
    if model.call(&config.r_max)?.sigma2 > 1.0 {
        return Err(CosmologyError::HalofitBracket {
            a,
            r_max: config.r_max,
        });
    }

    let solution = bisection::solve(
        &model,
        &GaussianVarianceProblem,
        [config.r_min.ln(), config.r_max.ln()],
        &config.bisection(),
        |event: &bisection::Event<'_, _, _>| {
            // A failed evaluation counts as the small-radius side of the root.
            if event.result().is_err() {
                return Some(bisection::Action::assume_positive());
            }
            None
        },
    )
    .map_err(|source| CosmologyError::Halofit { a, source })?;

    if solution.status != bisection::Status::Converged {
        return Err(CosmologyError::HalofitMaxIters {
            a,
            iters: solution.iters,
        });
    }

    let radius = solution.snapshot.output.radius;
    let [sigma2, i1, i2] = gaussian_moments(slice, radius, integration, [0, 1, 2])?;
    let n_eff = 2.0 * i1 / sigma2 - 3.0;
    let curvature = (3.0 + n_eff).powi(2) + 4.0 * (i1 - i2) / sigma2;

    trace!(a, radius, n_eff, curvature, "found non-linear scale");

    Ok(Some(NonLinearScale {
        k_sigma: 1.0 / radius,
        n_eff,
        curvature,
    }))
}

/// Integrals `∫ d ln k Δ²(k) y^{2p} exp(−y²)` with `y = kR`, one per power `p`.
pub(super) fn gaussian_moments<const N: usize>(
    slice: &PkSlice,
    radius: f64,
    config: &IntegrationConfig,
    powers: [i32; N],
) -> Result<[f64; N], CosmologyError> {
    let (lower, upper) = config.ln_k_range();
    let tolerance = config.tolerance();

    let mut moments = [0.0; N];
    for (moment, power) in moments.iter_mut().zip(powers) {
        let quad = integrate(
            |ln_k| {
                let k = ln_k.exp();
                let y2 = (k * radius).powi(2);
                k * k * k * slice.eval(k) / (2.0 * PI * PI) * y2.powi(power) * (-y2).exp()
            },
            lower,
            upper,
            &tolerance,
        )
        .map_err(|source| CosmologyError::integration("halofit Gaussian variance", source))?;
        *moment = quad.value;
    }
    Ok(moments)
}

/// Takahashi et al. (2012) fitting coefficients at one scale factor.
#[derive(Debug, Clone, Copy)]
struct Coefficients {
    a_n: f64,
    b_n: f64,
    c_n: f64,
    gamma: f64,
    alpha: f64,
    beta: f64,
    nu: f64,
    f1: f64,
    f2: f64,
    f3: f64,
}

impl Coefficients {
    fn new(scale: &NonLinearScale, background: &Background, a: f64) -> Self {
        let n = scale.n_eff;
        let c = scale.curvature;
        let (n2, n3, n4) = (n * n, n * n * n, n * n * n * n);
        let omega_m = background.omega_m_a(a);
        let de = background.omega_de_a(a) * (1.0 + background.w(a));

        Self {
            a_n: 10f64.powf(
                1.5222 + 2.8553 * n + 2.3706 * n2 + 0.9903 * n3 + 0.2250 * n4 - 0.6038 * c
                    + 0.1749 * de,
            ),
            b_n: 10f64.powf(-0.5642 + 0.5864 * n + 0.5716 * n2 - 1.5474 * c + 0.2279 * de),
            c_n: 10f64.powf(0.3698 + 2.0404 * n + 0.8161 * n2 + 0.5869 * c),
            gamma: 0.1971 - 0.0843 * n + 0.8460 * c,
            alpha: (6.0835 + 1.3373 * n - 0.1959 * n2 - 5.5274 * c).abs(),
            beta: 2.0379 - 0.7354 * n + 0.3157 * n2 + 1.2490 * n3 + 0.3980 * n4 - 0.1682 * c,
            nu: 10f64.powf(5.2105 + 3.6902 * n),
            f1: omega_m.powf(-0.0307),
            f2: omega_m.powf(-0.0585),
            f3: omega_m.powf(0.0743),
        }
    }

    /// Non-linear `Δ²` from linear `Δ²` at `y = k / k_σ`.
    fn delta2(&self, delta2_lin: f64, y: f64) -> f64 {
        let quasi_linear = delta2_lin * (1.0 + delta2_lin).powf(self.beta)
            / (1.0 + self.alpha * delta2_lin)
            * (-y / 4.0 - y * y / 8.0).exp();

        let halo = self.a_n * y.powf(3.0 * self.f1)
            / (1.0 + self.b_n * y.powf(self.f2) + (self.c_n * self.f3 * y).powf(3.0 - self.gamma))
            / (1.0 + self.nu / (y * y));

        quasi_linear + halo
    }
}
