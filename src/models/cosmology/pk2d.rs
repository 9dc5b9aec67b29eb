//! Tabulated power spectra in scale factor and wavenumber.

use ndarray::{Array2, ArrayView1};

use crate::support::interp::CubicSpline;

use super::{error::CosmologyError, growth::Growth};

/// A power spectrum `P(k, a)` tabulated on a rectangular grid.
///
/// Values are stored as `ln P` against `ln k` and interpolated with natural
/// cubic splines: along `ln a` per wavenumber node, then along `ln k` for a
/// fixed scale factor. Beyond the wavenumber nodes the spectrum is extended
/// as a power law with the slope at the boundary node. Beyond the
/// scale-factor nodes it is rescaled by the squared linear growth ratio.
#[derive(Debug, Clone)]
pub struct Pk2d {
    a: Vec<f64>,
    ln_k: Vec<f64>,
    ln_pk: Array2<f64>,
    columns: Vec<CubicSpline>,
}

impl Pk2d {
    /// Builds a spectrum from `pk[[i, j]] = P(k[j], a[i])` in Mpc³.
    ///
    /// # Errors
    ///
    /// Returns [`CosmologyError::InvalidTable`] if the nodes are not strictly
    /// increasing, the scale factors leave `(0, 1]`, the table shape does not
    /// match the nodes, or any entry is not a positive finite number.
    pub fn new(a: &[f64], k: &[f64], pk: &Array2<f64>) -> Result<Self, CosmologyError> {
        if a.len() < 2 || k.len() < 2 {
            return Err(CosmologyError::invalid_table(format!(
                "need at least two nodes per axis, got {} scale factors and {} wavenumbers",
                a.len(),
                k.len()
            )));
        }
        if pk.dim() != (a.len(), k.len()) {
            return Err(CosmologyError::invalid_table(format!(
                "table shape {:?} does not match ({}, {})",
                pk.dim(),
                a.len(),
                k.len()
            )));
        }
        if a.iter().any(|&a| !(a > 0.0 && a <= 1.0)) {
            return Err(CosmologyError::invalid_table("scale factors must lie in (0, 1]"));
        }
        if k.iter().any(|&k| !(k > 0.0 && k.is_finite())) {
            return Err(CosmologyError::invalid_table("wavenumbers must be positive and finite"));
        }
        if a.windows(2).any(|w| w[1] <= w[0]) {
            return Err(CosmologyError::invalid_table("scale factors must be strictly increasing"));
        }
        if k.windows(2).any(|w| w[1] <= w[0]) {
            return Err(CosmologyError::invalid_table("wavenumbers must be strictly increasing"));
        }
        if pk.iter().any(|&p| !(p > 0.0 && p.is_finite())) {
            return Err(CosmologyError::invalid_table("power must be positive and finite"));
        }

        let ln_k: Vec<f64> = k.iter().map(|k| k.ln()).collect();
        Self::from_log_table(a.to_vec(), ln_k, pk.mapv(f64::ln))
    }

    /// Builds a spectrum from an already validated `ln P` table.
    pub(super) fn from_log_table(
        a: Vec<f64>,
        ln_k: Vec<f64>,
        ln_pk: Array2<f64>,
    ) -> Result<Self, CosmologyError> {
        let ln_a: Vec<f64> = a.iter().map(|a| a.ln()).collect();
        let columns = ln_pk
            .columns()
            .into_iter()
            .map(|column| {
                CubicSpline::new(&ln_a, &column.to_vec())
                    .map_err(|source| CosmologyError::spline("power spectrum in ln a", source))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            a,
            ln_k,
            ln_pk,
            columns,
        })
    }

    /// Scale factor nodes.
    #[must_use]
    pub fn a(&self) -> &[f64] {
        &self.a
    }

    /// Wavenumber nodes, in Mpc⁻¹.
    #[must_use]
    pub fn k(&self) -> Vec<f64> {
        self.ln_k.iter().map(|ln_k| ln_k.exp()).collect()
    }

    fn a_min(&self) -> f64 {
        self.a[0]
    }

    fn a_max(&self) -> f64 {
        self.a[self.a.len() - 1]
    }

    /// Interpolates the spectrum at a fixed scale factor.
    pub(super) fn slice(&self, a: f64, growth: &Growth) -> Result<PkSlice, CosmologyError> {
        let ln_pk: Vec<f64> = if a < self.a_min() {
            self.edge_row(0, a, self.a_min(), growth)
        } else if a > self.a_max() {
            self.edge_row(self.a.len() - 1, a, self.a_max(), growth)
        } else {
            let ln_a = a.ln();
            self.columns.iter().map(|column| column.eval(ln_a)).collect()
        };

        let ln_pk = CubicSpline::new(&self.ln_k, &ln_pk)
            .map_err(|source| CosmologyError::spline("power spectrum in ln k", source))?;
        Ok(PkSlice { ln_pk })
    }

    fn edge_row(&self, row: usize, a: f64, a_edge: f64, growth: &Growth) -> Vec<f64> {
        let shift = 2.0 * (growth.unnormalized(a) / growth.unnormalized(a_edge)).ln();
        let edge: ArrayView1<'_, f64> = self.ln_pk.row(row);
        edge.iter().map(|ln_pk| ln_pk + shift).collect()
    }
}

/// A power spectrum at a fixed scale factor.
#[derive(Debug, Clone)]
pub(super) struct PkSlice {
    ln_pk: CubicSpline,
}

impl PkSlice {
    /// `P(k)` in Mpc³.
    pub(super) fn eval(&self, k: f64) -> f64 {
        self.ln_pk.eval(k.ln()).exp()
    }
}
