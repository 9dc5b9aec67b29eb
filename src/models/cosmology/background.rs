use super::parameters::CosmologyParameters;

/// Homogeneous expansion history of a matter plus CPL dark energy universe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct Background {
    omega_m: f64,
    omega_k: f64,
    omega_de: f64,
    w0: f64,
    wa: f64,
}

impl Background {
    pub(super) fn new(params: &CosmologyParameters) -> Self {
        Self {
            omega_m: params.omega_m(),
            omega_k: params.omega_k,
            omega_de: params.omega_de(),
            w0: params.w0,
            wa: params.wa,
        }
    }

    /// Dark energy equation of state `w(a) = w0 + wa (1 − a)`.
    pub(super) fn w(&self, a: f64) -> f64 {
        self.w0 + self.wa * (1.0 - a)
    }

    /// Dark energy density relative to today.
    fn rho_de(&self, a: f64) -> f64 {
        a.powf(-3.0 * (1.0 + self.w0 + self.wa)) * (-3.0 * self.wa * (1.0 - a)).exp()
    }

    /// Squared dimensionless Hubble rate `E²(a) = H²(a) / H0²`.
    pub(super) fn e2(&self, a: f64) -> f64 {
        self.omega_m / (a * a * a) + self.omega_k / (a * a) + self.omega_de * self.rho_de(a)
    }

    /// Logarithmic derivative `d ln E / d ln a`.
    pub(super) fn dln_e_dln_a(&self, a: f64) -> f64 {
        let matter = -3.0 * self.omega_m / (a * a * a);
        let curvature = -2.0 * self.omega_k / (a * a);
        let dark_energy = -3.0 * (1.0 + self.w(a)) * self.omega_de * self.rho_de(a);
        (matter + curvature + dark_energy) / (2.0 * self.e2(a))
    }

    /// Matter density parameter at `a`.
    pub(super) fn omega_m_a(&self, a: f64) -> f64 {
        self.omega_m / (a * a * a * self.e2(a))
    }

    /// Dark energy density parameter at `a`.
    pub(super) fn omega_de_a(&self, a: f64) -> f64 {
        self.omega_de * self.rho_de(a) / self.e2(a)
    }
}
