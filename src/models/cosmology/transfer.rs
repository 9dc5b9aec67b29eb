//! Matter transfer function fitting formulas.
//!
//! Wavenumbers are in Mpc⁻¹ throughout.

use std::f64::consts::E;

use uom::si::thermodynamic_temperature::kelvin;

use super::parameters::{CosmologyParameters, TransferFunction};

/// A transfer function with its parameter-dependent coefficients precomputed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) enum Transfer {
    Bbks(Bbks),
    EisensteinHu(EisensteinHu),
    NoWiggles(NoWiggles),
}

impl Transfer {
    pub(super) fn new(params: &CosmologyParameters) -> Self {
        match params.transfer_function {
            TransferFunction::Bbks => Self::Bbks(Bbks::new(params)),
            TransferFunction::EisensteinHu => Self::EisensteinHu(EisensteinHu::new(params)),
            TransferFunction::EisensteinHuNoWiggles => Self::NoWiggles(NoWiggles::new(params)),
        }
    }

    /// Evaluates `T(k)`, which tends to one as `k → 0`.
    pub(super) fn eval(&self, k: f64) -> f64 {
        match self {
            Self::Bbks(t) => t.eval(k),
            Self::EisensteinHu(t) => t.eval(k),
            Self::NoWiggles(t) => t.eval(k),
        }
    }
}

/// CMB temperature in units of 2.7 K.
fn theta_cmb(params: &CosmologyParameters) -> f64 {
    params.t_cmb.get::<kelvin>() / 2.7
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct Bbks {
    /// Shape parameter times `h`, in Mpc⁻¹.
    gamma_h: f64,
    theta2: f64,
}

impl Bbks {
    fn new(params: &CosmologyParameters) -> Self {
        let (omega_m, omega_b, h) = (params.omega_m(), params.omega_b, params.h);
        let gamma = omega_m * h * (-omega_b * (1.0 + (2.0 * h).sqrt() / omega_m)).exp();
        let theta = theta_cmb(params);
        Self {
            gamma_h: gamma * h,
            theta2: theta * theta,
        }
    }

    fn eval(&self, k: f64) -> f64 {
        let q = k * self.theta2 / self.gamma_h;
        if q < 1e-9 {
            return 1.0;
        }
        let x = 2.34 * q;
        let poly = 1.0 + 3.89 * q + (16.1 * q).powi(2) + (5.46 * q).powi(3) + (6.71 * q).powi(4);
        x.ln_1p() / x * poly.powf(-0.25)
    }
}

/// Eisenstein & Hu (1998) with baryon acoustic oscillations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct EisensteinHu {
    f_b: f64,
    f_c: f64,
    k_eq: f64,
    k_silk: f64,
    /// Sound horizon at the drag epoch, in Mpc.
    s: f64,
    alpha_c: f64,
    beta_c: f64,
    alpha_b: f64,
    beta_b: f64,
    beta_node: f64,
}

impl EisensteinHu {
    fn new(params: &CosmologyParameters) -> Self {
        let h2 = params.h * params.h;
        let om = params.omega_m() * h2;
        let ob = params.omega_b * h2;
        let f_b = params.omega_b / params.omega_m();
        let f_c = params.omega_c / params.omega_m();
        let theta = theta_cmb(params);
        let theta4 = theta.powi(4);

        let z_eq = 2.5e4 * om / theta4;
        let k_eq = 7.46e-2 * om / (theta * theta);

        let b1 = 0.313 * om.powf(-0.419) * (1.0 + 0.607 * om.powf(0.674));
        let b2 = 0.238 * om.powf(0.223);
        let z_d =
            1291.0 * om.powf(0.251) / (1.0 + 0.659 * om.powf(0.828)) * (1.0 + b1 * ob.powf(b2));

        let baryon_photon = |z: f64| 31.5 * ob / theta4 * (1000.0 / z);
        let r_d = baryon_photon(z_d);
        let r_eq = baryon_photon(z_eq);

        let s = 2.0 / (3.0 * k_eq)
            * (6.0 / r_eq).sqrt()
            * (((1.0 + r_d).sqrt() + (r_d + r_eq).sqrt()) / (1.0 + r_eq.sqrt())).ln();
        let k_silk = 1.6 * ob.powf(0.52) * om.powf(0.73) * (1.0 + (10.4 * om).powf(-0.95));

        let a1 = (46.9 * om).powf(0.670) * (1.0 + (32.1 * om).powf(-0.532));
        let a2 = (12.0 * om).powf(0.424) * (1.0 + (45.0 * om).powf(-0.582));
        let alpha_c = a1.powf(-f_b) * a2.powf(-f_b.powi(3));

        let bb1 = 0.944 / (1.0 + (458.0 * om).powf(-0.708));
        let bb2 = (0.395 * om).powf(-0.0266);
        let beta_c = 1.0 / (1.0 + bb1 * (f_c.powf(bb2) - 1.0));

        let y = (1.0 + z_eq) / (1.0 + z_d);
        let sqrt_1y = (1.0 + y).sqrt();
        let g = y * (-6.0 * sqrt_1y + (2.0 + 3.0 * y) * ((sqrt_1y + 1.0) / (sqrt_1y - 1.0)).ln());
        let alpha_b = 2.07 * k_eq * s * (1.0 + r_d).powf(-0.75) * g;

        let beta_node = 8.41 * om.powf(0.435);
        let beta_b = 0.5 + f_b + (3.0 - 2.0 * f_b) * ((17.2 * om).powi(2) + 1.0).sqrt();

        Self {
            f_b,
            f_c,
            k_eq,
            k_silk,
            s,
            alpha_c,
            beta_c,
            alpha_b,
            beta_b,
            beta_node,
        }
    }

    /// Pressureless transfer function `T̃0(k, α, β)`.
    fn t0(&self, k: f64, alpha: f64, beta: f64) -> f64 {
        let q = k / (13.41 * self.k_eq);
        let c = 14.2 / alpha + 386.0 / (1.0 + 69.9 * q.powf(1.08));
        let l = (E + 1.8 * beta * q).ln();
        l / (l + c * q * q)
    }

    fn eval(&self, k: f64) -> f64 {
        let ks = k * self.s;

        let f = 1.0 / (1.0 + (ks / 5.4).powi(4));
        let t_c =
            f * self.t0(k, 1.0, self.beta_c) + (1.0 - f) * self.t0(k, self.alpha_c, self.beta_c);

        let s_tilde = self.s / (1.0 + (self.beta_node / ks).powi(3)).cbrt();
        let silk = (-(k / self.k_silk).powf(1.4)).exp();
        let t_b = (self.t0(k, 1.0, 1.0) / (1.0 + (ks / 5.2).powi(2))
            + self.alpha_b / (1.0 + (self.beta_b / ks).powi(3)) * silk)
            * sinc(k * s_tilde);

        self.f_b * t_b + self.f_c * t_c
    }
}

/// Eisenstein & Hu (1998) zero-baryon-oscillation fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct NoWiggles {
    omega_m_h: f64,
    alpha_gamma: f64,
    /// Approximate sound horizon, in Mpc.
    s: f64,
    theta2: f64,
    h: f64,
}

impl NoWiggles {
    fn new(params: &CosmologyParameters) -> Self {
        let h2 = params.h * params.h;
        let om = params.omega_m() * h2;
        let ob = params.omega_b * h2;
        let f_b = params.omega_b / params.omega_m();
        let theta = theta_cmb(params);

        let alpha_gamma =
            1.0 - 0.328 * (431.0 * om).ln() * f_b + 0.38 * (22.3 * om).ln() * f_b * f_b;
        let s = 44.5 * (9.83 / om).ln() / (1.0 + 10.0 * ob.powf(0.75)).sqrt();

        Self {
            omega_m_h: params.omega_m() * params.h,
            alpha_gamma,
            s,
            theta2: theta * theta,
            h: params.h,
        }
    }

    fn eval(&self, k: f64) -> f64 {
        let gamma = self.omega_m_h
            * (self.alpha_gamma + (1.0 - self.alpha_gamma) / (1.0 + (0.43 * k * self.s).powi(4)));
        let q = k * self.theta2 / (gamma * self.h);
        let l0 = (2.0 * E + 1.8 * q).ln();
        let c0 = 14.2 + 731.0 / (1.0 + 62.5 * q);
        l0 / (l0 + c0 * q * q)
    }
}

/// Spherical Bessel function `j0(x) = sin(x) / x`.
fn sinc(x: f64) -> f64 {
    if x.abs() < 1e-4 {
        1.0 - x * x / 6.0
    } else {
        x.sin() / x
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    use crate::models::cosmology::Normalization;

    fn params(transfer_function: TransferFunction) -> CosmologyParameters {
        CosmologyParameters::new(0.25, 0.05, 0.7, 0.96, Normalization::Sigma8(0.8))
            .with_transfer_function(transfer_function)
    }

    const ALL: [TransferFunction; 3] = [
        TransferFunction::Bbks,
        TransferFunction::EisensteinHu,
        TransferFunction::EisensteinHuNoWiggles,
    ];

    #[test]
    fn unity_on_large_scales() {
        for kind in ALL {
            let transfer = Transfer::new(&params(kind));
            assert_relative_eq!(transfer.eval(1e-5), 1.0, epsilon = 1e-3);
        }
    }

    #[test]
    fn suppressed_on_small_scales() {
        for kind in ALL {
            let transfer = Transfer::new(&params(kind));
            let t = transfer.eval(10.0);
            assert!(t > 0.0 && t < 1e-2, "{kind:?}: T(10)={t}");
        }
    }

    #[test]
    fn smooth_forms_decrease() {
        for kind in [TransferFunction::Bbks, TransferFunction::EisensteinHuNoWiggles] {
            let transfer = Transfer::new(&params(kind));
            let values: Vec<f64> = (0..60)
                .map(|i| transfer.eval(10f64.powf(-4.0 + 0.1 * f64::from(i))))
                .collect();
            assert!(values.windows(2).all(|w| w[1] < w[0]), "{kind:?}");
        }
    }

    #[test]
    fn wiggles_oscillate_around_smooth_fit() {
        let full = Transfer::new(&params(TransferFunction::EisensteinHu));
        let smooth = Transfer::new(&params(TransferFunction::EisensteinHuNoWiggles));
        for i in 0..20 {
            let k = 0.02 * 1.2f64.powi(i);
            let ratio = full.eval(k) / smooth.eval(k);
            assert!((ratio - 1.0).abs() < 0.2, "k={k}: ratio={ratio}");
        }
    }

    #[test]
    fn sound_horizon_is_near_150_mpc() {
        let transfer = Transfer::new(&params(TransferFunction::EisensteinHu));
        let Transfer::EisensteinHu(eh) = transfer else {
            unreachable!()
        };
        assert!(eh.s > 130.0 && eh.s < 170.0, "s={}", eh.s);
    }
}
