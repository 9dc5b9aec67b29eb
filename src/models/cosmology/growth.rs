//! Linear growth of matter perturbations.
//!
//! The growth factor solves
//!
//! ```text
//! D'' + (2 + d ln E / d ln a) D' − 3/2 Ωm(a) D = 0
//! ```
//!
//! in `ln a`, starting from the matter-dominated solution `D = a`.

use tracing::debug;

use crate::support::{interp::CubicSpline, ode};

use super::{background::Background, config::GrowthConfig, error::CosmologyError};

/// Tabulated linear growth factor.
#[derive(Debug, Clone)]
pub struct Growth {
    a_init: f64,
    ln_d: CubicSpline,
    d_today: f64,
}

impl Growth {
    pub(super) fn solve(
        background: &Background,
        config: &GrowthConfig,
    ) -> Result<Self, CosmologyError> {
        let ln_a_init = config.a_init.ln();

        let trajectory = ode::rk4(
            |ln_a, y: &[f64; 2]| {
                let a = ln_a.exp();
                let friction = 2.0 + background.dln_e_dln_a(a);
                let source = 1.5 * background.omega_m_a(a);
                [y[1], source * y[0] - friction * y[1]]
            },
            ln_a_init,
            [config.a_init, config.a_init],
            0.0,
            config.steps,
        )?;

        let (ln_a, ln_d): (Vec<f64>, Vec<f64>) = trajectory
            .iter()
            .map(|(ln_a, y)| (*ln_a, y[0].ln()))
            .unzip();

        let ln_d = CubicSpline::new(&ln_a, &ln_d)
            .map_err(|source| CosmologyError::spline("growth factor", source))?;
        let d_today = ln_d.eval(0.0).exp();
        if !d_today.is_finite() || d_today <= 0.0 {
            return Err(CosmologyError::NonFinite {
                context: "growth factor today".into(),
            });
        }

        debug!(d_today, steps = config.steps, "solved linear growth");

        Ok(Self {
            a_init: config.a_init,
            ln_d,
            d_today,
        })
    }

    /// Growth factor normalized to `a` during matter domination.
    #[must_use]
    pub fn unnormalized(&self, a: f64) -> f64 {
        if a <= self.a_init {
            a
        } else {
            self.ln_d.eval(a.ln()).exp()
        }
    }

    /// Growth factor normalized to one today.
    #[must_use]
    pub fn factor(&self, a: f64) -> f64 {
        self.unnormalized(a) / self.d_today
    }

    /// Unnormalized growth factor today.
    #[must_use]
    pub fn today(&self) -> f64 {
        self.d_today
    }
}
