//! Power-spectrum queries.
//!
//! Each query validates its inputs, resolves the spectrum it needs from the
//! [`Cosmology`], and wraps any engine failure in a [`QueryError`] that names
//! the operation and the cosmology it ran against.
//!
//! Queries come in pairs: a scalar form taking single values and an array
//! form taking slices. Array forms fail on the first invalid element and never
//! return partial results.
//!
//! Units: wavenumbers in Mpc⁻¹, power in Mpc³, radii in Mpc, masses in M☉.

mod error;

pub use error::QueryError;

use ndarray::Array2;
use tracing::trace;

use crate::support::constraint::{Constraint, StrictlyPositive, UnitIntervalLowerOpen};

use super::{
    Cosmology, CosmologyError, PowerSpectrumSource, SpectrumKind,
    constants::{DEFAULT_POWER_SPECTRUM, SIGMA8_RADIUS},
    pk2d::{Pk2d, PkSlice},
    variance,
};

use error::check;

/// Linear power `P(k, a)` of the given spectrum.
///
/// A caller-supplied [`PowerSpectrum`](super::PowerSpectrum) is evaluated
/// whatever its tag.
///
/// # Errors
///
/// Returns a [`QueryError`] if `k` or `a` is invalid or the spectrum cannot
/// be resolved or built.
///
/// # Example
///
/// ```
/// use twine_cosmology::models::cosmology::{
///     Cosmology, CosmologyParameters, DEFAULT_POWER_SPECTRUM, Normalization, power,
/// };
///
/// let params = CosmologyParameters::new(0.25, 0.05, 0.7, 0.96, Normalization::Sigma8(0.8));
/// let cosmo = Cosmology::new(params).unwrap();
///
/// let p = power::linear_power(&cosmo, 0.1, 1.0, DEFAULT_POWER_SPECTRUM).unwrap();
/// assert!(p > 1e3 && p < 1e5);
/// ```
pub fn linear_power<'s>(
    cosmo: &Cosmology,
    k: f64,
    a: f64,
    source: impl Into<PowerSpectrumSource<'s>>,
) -> Result<f64, QueryError> {
    check(
        power_at(cosmo, k, a, source.into(), SpectrumKind::Linear),
        "linear_power",
        cosmo,
    )
}

/// Linear power on the grid `a × k`, shaped `(a.len(), k.len())`.
///
/// # Errors
///
/// Returns a [`QueryError`] on the first invalid input or engine failure.
pub fn linear_power_grid<'s>(
    cosmo: &Cosmology,
    k: &[f64],
    a: &[f64],
    source: impl Into<PowerSpectrumSource<'s>>,
) -> Result<Array2<f64>, QueryError> {
    check(
        power_grid(cosmo, k, a, source.into(), SpectrumKind::Linear),
        "linear_power",
        cosmo,
    )
}

/// Non-linear power `P(k, a)` of the given spectrum.
///
/// # Errors
///
/// Returns a [`QueryError`] if `k` or `a` is invalid or the spectrum cannot
/// be resolved or built.
pub fn nonlin_power<'s>(
    cosmo: &Cosmology,
    k: f64,
    a: f64,
    source: impl Into<PowerSpectrumSource<'s>>,
) -> Result<f64, QueryError> {
    check(
        power_at(cosmo, k, a, source.into(), SpectrumKind::NonLinear),
        "nonlin_power",
        cosmo,
    )
}

/// Non-linear power on the grid `a × k`, shaped `(a.len(), k.len())`.
///
/// # Errors
///
/// Returns a [`QueryError`] on the first invalid input or engine failure.
pub fn nonlin_power_grid<'s>(
    cosmo: &Cosmology,
    k: &[f64],
    a: &[f64],
    source: impl Into<PowerSpectrumSource<'s>>,
) -> Result<Array2<f64>, QueryError> {
    check(
        power_grid(cosmo, k, a, source.into(), SpectrumKind::NonLinear),
        "nonlin_power",
        cosmo,
    )
}

/// Linear matter power spectrum.
///
/// # Errors
///
/// See [`linear_power`].
pub fn linear_matter_power(cosmo: &Cosmology, k: f64, a: f64) -> Result<f64, QueryError> {
    linear_power(cosmo, k, a, DEFAULT_POWER_SPECTRUM)
}

/// Linear matter power spectrum on a grid.
///
/// # Errors
///
/// See [`linear_power_grid`].
pub fn linear_matter_power_grid(
    cosmo: &Cosmology,
    k: &[f64],
    a: &[f64],
) -> Result<Array2<f64>, QueryError> {
    linear_power_grid(cosmo, k, a, DEFAULT_POWER_SPECTRUM)
}

/// Non-linear matter power spectrum.
///
/// # Errors
///
/// See [`nonlin_power`].
pub fn nonlin_matter_power(cosmo: &Cosmology, k: f64, a: f64) -> Result<f64, QueryError> {
    nonlin_power(cosmo, k, a, DEFAULT_POWER_SPECTRUM)
}

/// Non-linear matter power spectrum on a grid.
///
/// # Errors
///
/// See [`nonlin_power_grid`].
pub fn nonlin_matter_power_grid(
    cosmo: &Cosmology,
    k: &[f64],
    a: &[f64],
) -> Result<Array2<f64>, QueryError> {
    nonlin_power_grid(cosmo, k, a, DEFAULT_POWER_SPECTRUM)
}

/// RMS mass variance `σ(M, a)` of the default linear spectrum.
///
/// # Errors
///
/// Returns a [`QueryError`] if `m` is not positive, lies outside the
/// tabulated mass range, or `a` is outside `(0, 1]`.
pub fn sigma_m(cosmo: &Cosmology, m: f64, a: f64) -> Result<f64, QueryError> {
    sigma_m_vec(cosmo, &[m], a).map(|sigma| sigma[0])
}

/// RMS mass variance for each mass in `m`.
///
/// # Errors
///
/// See [`sigma_m`].
pub fn sigma_m_vec(cosmo: &Cosmology, m: &[f64], a: f64) -> Result<Vec<f64>, QueryError> {
    check(sigma_m_values(cosmo, m, a), "sigma_m", cosmo)
}

/// RMS density variance in a top-hat sphere of radius `r` (Mpc).
///
/// # Errors
///
/// Returns a [`QueryError`] if `r` is not positive, `a` is outside `(0, 1]`,
/// or the source is not a linear spectrum.
pub fn sigma_r<'s>(
    cosmo: &Cosmology,
    r: f64,
    a: f64,
    source: impl Into<PowerSpectrumSource<'s>>,
) -> Result<f64, QueryError> {
    sigma_r_vec(cosmo, &[r], a, source).map(|sigma| sigma[0])
}

/// [`sigma_r`] today with the default spectrum.
///
/// # Errors
///
/// See [`sigma_r`].
pub fn sigma_r_today(cosmo: &Cosmology, r: f64) -> Result<f64, QueryError> {
    sigma_r(cosmo, r, 1.0, PowerSpectrumSource::default())
}

/// RMS density variance for each radius in `r`.
///
/// # Errors
///
/// See [`sigma_r`].
pub fn sigma_r_vec<'s>(
    cosmo: &Cosmology,
    r: &[f64],
    a: f64,
    source: impl Into<PowerSpectrumSource<'s>>,
) -> Result<Vec<f64>, QueryError> {
    let source = source.into();
    let result = linear_slice(cosmo, a, source, "sigma_r").and_then(|slice| {
        r.iter()
            .map(|&r| -> Result<f64, CosmologyError> {
                let integration = &cosmo.config().integration;
                let s2 = variance::sigma2(|k| slice.eval(k), radius(r)?, integration)?;
                Ok(s2.sqrt())
            })
            .collect()
    });
    check(result, "sigma_r", cosmo)
}

/// RMS displacement variance in a top-hat sphere of radius `r`, in Mpc.
///
/// # Errors
///
/// See [`sigma_r`].
pub fn sigma_v<'s>(
    cosmo: &Cosmology,
    r: f64,
    a: f64,
    source: impl Into<PowerSpectrumSource<'s>>,
) -> Result<f64, QueryError> {
    sigma_v_vec(cosmo, &[r], a, source).map(|sigma| sigma[0])
}

/// RMS displacement variance for each radius in `r`.
///
/// # Errors
///
/// See [`sigma_r`].
pub fn sigma_v_vec<'s>(
    cosmo: &Cosmology,
    r: &[f64],
    a: f64,
    source: impl Into<PowerSpectrumSource<'s>>,
) -> Result<Vec<f64>, QueryError> {
    let source = source.into();
    let result = linear_slice(cosmo, a, source, "sigma_v").and_then(|slice| {
        r.iter()
            .map(|&r| -> Result<f64, CosmologyError> {
                let s2 =
                    variance::sigma_v2(|k| slice.eval(k), radius(r)?, &cosmo.config().integration)?;
                Ok(s2.sqrt())
            })
            .collect()
    });
    check(result, "sigma_v", cosmo)
}

/// sigma8: the RMS density variance in spheres of 8 Mpc/h today.
///
/// The value is recomputed on every call. If the cosmology has no stored
/// sigma8 yet, as with [`As`](super::Normalization::As) normalization, the
/// computed value is stored.
///
/// # Errors
///
/// See [`sigma_r`].
pub fn sigma8<'s>(
    cosmo: &mut Cosmology,
    source: impl Into<PowerSpectrumSource<'s>>,
) -> Result<f64, QueryError> {
    let r8 = SIGMA8_RADIUS / cosmo.parameters().h;
    let value = sigma_r(cosmo, r8, 1.0, source.into()).map_err(|mut err| {
        err.operation = "sigma8";
        err
    })?;
    cosmo.fill_sigma8(value);
    Ok(value)
}

/// Non-linear wavenumber `k_NL(a)` in Mpc⁻¹.
///
/// # Errors
///
/// Returns a [`QueryError`] if `a` is outside `(0, 1]` or the source is not
/// a linear spectrum.
pub fn k_nl<'s>(
    cosmo: &Cosmology,
    a: f64,
    source: impl Into<PowerSpectrumSource<'s>>,
) -> Result<f64, QueryError> {
    k_nl_vec(cosmo, &[a], source).map(|k| k[0])
}

/// Non-linear wavenumber for each scale factor in `a`.
///
/// # Errors
///
/// See [`k_nl`].
pub fn k_nl_vec<'s>(
    cosmo: &Cosmology,
    a: &[f64],
    source: impl Into<PowerSpectrumSource<'s>>,
) -> Result<Vec<f64>, QueryError> {
    let source = source.into();
    let result = a
        .iter()
        .map(|&a| -> Result<f64, CosmologyError> {
            let slice = linear_slice(cosmo, a, source, "k_nl")?;
            variance::k_nl(|k| slice.eval(k), &cosmo.config().integration)
        })
        .collect();
    check(result, "k_nl", cosmo)
}

fn sigma_m_values(cosmo: &Cosmology, m: &[f64], a: f64) -> Result<Vec<f64>, CosmologyError> {
    let table = cosmo.compute_sigma()?;

    let a = scale_factor(a)?;
    trace!(n = m.len(), a, "sigma_m");
    let growth = cosmo.growth_factor(a)?;
    m.iter()
        .map(|&m| -> Result<f64, CosmologyError> {
            let log10_m = mass(m)?.log10();
            Ok(table.sigma_today(log10_m)? * growth)
        })
        .collect()
}

fn power_at(
    cosmo: &Cosmology,
    k: f64,
    a: f64,
    source: PowerSpectrumSource<'_>,
    kind: SpectrumKind,
) -> Result<f64, CosmologyError> {
    let k = wavenumber(k)?;
    let a = scale_factor(a)?;
    trace!(k, a, ?source, %kind, "power");
    let pk = cosmo.parse_pk2d(source, kind)?;
    Ok(pk.slice(a, cosmo.growth()?)?.eval(k))
}

fn power_grid(
    cosmo: &Cosmology,
    k: &[f64],
    a: &[f64],
    source: PowerSpectrumSource<'_>,
    kind: SpectrumKind,
) -> Result<Array2<f64>, CosmologyError> {
    let k = k.iter().map(|&k| wavenumber(k)).collect::<Result<Vec<_>, _>>()?;
    let a = a.iter().map(|&a| scale_factor(a)).collect::<Result<Vec<_>, _>>()?;
    trace!(n_k = k.len(), n_a = a.len(), ?source, %kind, "power grid");

    let pk = cosmo.parse_pk2d(source, kind)?;
    let growth = cosmo.growth()?;

    let mut grid = Array2::zeros((a.len(), k.len()));
    for (mut row, &a) in grid.rows_mut().into_iter().zip(&a) {
        let slice = pk.slice(a, growth)?;
        for (value, &k) in row.iter_mut().zip(&k) {
            *value = slice.eval(k);
        }
    }
    Ok(grid)
}

/// Resolves a linear spectrum and interpolates it at `a`.
fn linear_slice(
    cosmo: &Cosmology,
    a: f64,
    source: PowerSpectrumSource<'_>,
    operation: &str,
) -> Result<PkSlice, CosmologyError> {
    let a = scale_factor(a)?;
    trace!(a, ?source, operation, "linear slice");
    let pk = linear_pk2d(cosmo, source)?;
    pk.slice(a, cosmo.growth()?)
}

fn linear_pk2d<'a>(
    cosmo: &'a Cosmology,
    source: PowerSpectrumSource<'a>,
) -> Result<&'a Pk2d, CosmologyError> {
    match source {
        PowerSpectrumSource::Spectrum(spectrum) if spectrum.kind() == SpectrumKind::NonLinear => {
            Err(CosmologyError::NotLinear {
                name: "<caller-supplied>".into(),
            })
        }
        _ => cosmo.parse_pk2d(source, SpectrumKind::Linear),
    }
}

fn scale_factor(a: f64) -> Result<f64, CosmologyError> {
    UnitIntervalLowerOpen::new(a)
        .map(|a| a.into_inner())
        .map_err(|source| CosmologyError::ScaleFactorOutOfRange { a, source })
}

fn wavenumber(k: f64) -> Result<f64, CosmologyError> {
    if k.is_finite() && StrictlyPositive::check(&k).is_ok() {
        Ok(k)
    } else {
        Err(CosmologyError::NonPositiveWavenumber { k })
    }
}

fn radius(r: f64) -> Result<f64, CosmologyError> {
    if r.is_finite() && StrictlyPositive::check(&r).is_ok() {
        Ok(r)
    } else {
        Err(CosmologyError::NonPositiveRadius { r })
    }
}

fn mass(m: f64) -> Result<f64, CosmologyError> {
    if m.is_finite() && StrictlyPositive::check(&m).is_ok() {
        Ok(m)
    } else {
        Err(CosmologyError::NonPositiveMass { m })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::OnceLock;

    use approx::assert_relative_eq;

    use crate::models::cosmology::{
        CosmologyParameters, Normalization, PowerSpectrum, TransferFunction,
    };

    /// Shared so the tables are built once for the whole module.
    fn cosmology() -> &'static Cosmology {
        static COSMO: OnceLock<Cosmology> = OnceLock::new();
        COSMO.get_or_init(|| {
            let params =
                CosmologyParameters::new(0.25, 0.05, 0.7, 0.96, Normalization::Sigma8(0.8));
            Cosmology::new(params).unwrap()
        })
    }

    #[test]
    fn shapes_follow_inputs() {
        let cosmo = cosmology();
        let k = [1e-3, 1e-2, 0.1, 1.0];
        let a = [0.5, 1.0];

        let grid = linear_matter_power_grid(cosmo, &k, &a).unwrap();
        assert_eq!(grid.dim(), (2, 4));
        assert_relative_eq!(grid[[1, 2]], linear_matter_power(cosmo, 0.1, 1.0).unwrap());

        let grid = nonlin_matter_power_grid(cosmo, &k, &[1.0]).unwrap();
        assert_eq!(grid.dim(), (1, 4));

        let masses = [1e12, 1e13, 1e14];
        assert_eq!(sigma_m_vec(cosmo, &masses, 1.0).unwrap().len(), 3);
        assert_eq!(sigma_r_vec(cosmo, &[1.0, 8.0], 1.0, DEFAULT_POWER_SPECTRUM).unwrap().len(), 2);
        assert_eq!(sigma_v_vec(cosmo, &[1.0, 8.0], 1.0, DEFAULT_POWER_SPECTRUM).unwrap().len(), 2);
        assert_eq!(k_nl_vec(cosmo, &[0.5, 1.0], DEFAULT_POWER_SPECTRUM).unwrap().len(), 2);
        assert!(sigma_m_vec(cosmo, &[], 1.0).unwrap().is_empty());
    }

    #[test]
    fn matter_power_delegates_to_default() {
        let cosmo = cosmology();
        for (k, a) in [(0.05, 1.0), (0.5, 0.3), (2.0, 0.8)] {
            assert_eq!(
                linear_matter_power(cosmo, k, a).unwrap(),
                linear_power(cosmo, k, a, DEFAULT_POWER_SPECTRUM).unwrap()
            );
            assert_eq!(
                nonlin_matter_power(cosmo, k, a).unwrap(),
                nonlin_power(cosmo, k, a, DEFAULT_POWER_SPECTRUM).unwrap()
            );
        }
    }

    #[test]
    fn halofit_boosts_small_scales_today() {
        let cosmo = cosmology();
        let lin = linear_matter_power(cosmo, 1.0, 1.0).unwrap();
        let nl = nonlin_matter_power(cosmo, 1.0, 1.0).unwrap();
        assert!(nl > 2.0 * lin);

        let lin = linear_matter_power(cosmo, 1e-4, 1.0).unwrap();
        let nl = nonlin_matter_power(cosmo, 1e-4, 1.0).unwrap();
        assert_relative_eq!(nl, lin, max_relative = 1e-3);
    }

    #[test]
    fn sigma_m_is_stable_and_ordered() {
        let cosmo = cosmology();
        let first = sigma_m(cosmo, 1e13, 1.0).unwrap();
        let second = sigma_m(cosmo, 1e13, 1.0).unwrap();
        assert_eq!(first, second);

        assert!(sigma_m(cosmo, 1e12, 1.0).unwrap() > first);
        assert_relative_eq!(
            sigma_m(cosmo, 1e13, 0.5).unwrap(),
            first * cosmo.growth_factor(0.5).unwrap(),
            max_relative = 1e-12
        );
    }

    #[test]
    fn sigma_m_matches_sigma_r_of_lagrangian_radius() {
        let cosmo = cosmology();
        let params = cosmo.parameters();
        let rho_m = crate::models::cosmology::RHO_CRITICAL * params.h * params.h * params.omega_m();
        let r = variance::lagrangian_radius(1e14, rho_m);
        assert_relative_eq!(
            sigma_m(cosmo, 1e14, 1.0).unwrap(),
            sigma_r_today(cosmo, r).unwrap(),
            max_relative = 1e-4
        );
    }

    #[test]
    fn sigma_r_decreases_and_grows_with_d() {
        let cosmo = cosmology();
        let radii = [0.5, 1.0, 2.0, 5.0, 10.0, 20.0];
        let today = sigma_r_vec(cosmo, &radii, 1.0, DEFAULT_POWER_SPECTRUM).unwrap();
        assert!(today.windows(2).all(|w| w[1] < w[0]));

        let earlier = sigma_r_vec(cosmo, &radii, 0.5, DEFAULT_POWER_SPECTRUM).unwrap();
        let d = cosmo.growth_factor(0.5).unwrap();
        for (now, then) in today.iter().zip(&earlier) {
            assert_relative_eq!(then / now, d, max_relative = 1e-4);
        }
    }

    #[test]
    fn sigma8_matches_normalization() {
        let mut cosmo = cosmology().clone();
        let value = sigma8(&mut cosmo, DEFAULT_POWER_SPECTRUM).unwrap();
        assert_relative_eq!(value, 0.8, max_relative = 1e-3);
        assert_eq!(cosmo.sigma8_param(), Some(0.8));
    }

    #[test]
    fn sigma8_fills_undefined_slot() {
        let params = CosmologyParameters::new(0.25, 0.05, 0.7, 0.96, Normalization::As(2.1e-9))
            .with_transfer_function(TransferFunction::EisensteinHuNoWiggles);
        let mut cosmo = Cosmology::new(params).unwrap();
        assert_eq!(cosmo.sigma8_param(), None);

        let first = sigma8(&mut cosmo, DEFAULT_POWER_SPECTRUM).unwrap();
        assert_eq!(cosmo.sigma8_param(), Some(first));
        assert!(first > 0.7 && first < 0.95);

        let second = sigma8(&mut cosmo, DEFAULT_POWER_SPECTRUM).unwrap();
        assert_eq!(first, second);
        assert_eq!(cosmo.sigma8_param(), Some(first));
    }

    #[test]
    fn k_nl_is_inverse_sigma_v_at_zero_radius() {
        let cosmo = cosmology();
        for a in [0.3, 1.0] {
            let knl = k_nl(cosmo, a, DEFAULT_POWER_SPECTRUM).unwrap();
            let sv = sigma_v(cosmo, 1e-6, a, DEFAULT_POWER_SPECTRUM).unwrap();
            assert_relative_eq!(knl, 1.0 / sv, max_relative = 1e-5);
        }
    }

    #[test]
    fn invalid_inputs_fail_with_status() {
        let cosmo = cosmology();

        let err = sigma_r(cosmo, -1.0, 1.0, DEFAULT_POWER_SPECTRUM).unwrap_err();
        assert!(matches!(err.source, CosmologyError::NonPositiveRadius { .. }));
        assert_eq!(err.operation, "sigma_r");
        assert_ne!(err.status, 0);
        assert!(err.cosmology.contains("Omega_c=0.25"));

        let err = sigma_m(cosmo, 0.0, 1.0).unwrap_err();
        assert!(matches!(err.source, CosmologyError::NonPositiveMass { .. }));

        let err = sigma_m(cosmo, 1e20, 1.0).unwrap_err();
        assert!(matches!(err.source, CosmologyError::MassOutOfRange { .. }));

        for a in [0.0, -0.5, 1.5, f64::NAN] {
            let err = linear_matter_power(cosmo, 0.1, a).unwrap_err();
            assert!(matches!(err.source, CosmologyError::ScaleFactorOutOfRange { .. }));
        }
        let err = k_nl_vec(cosmo, &[1.0, 2.0], DEFAULT_POWER_SPECTRUM).unwrap_err();
        assert!(matches!(err.source, CosmologyError::ScaleFactorOutOfRange { .. }));

        let err = linear_power(cosmo, 0.1, 1.0, "no_such_spectrum").unwrap_err();
        assert!(matches!(err.source, CosmologyError::UnknownSpectrum { .. }));

        let err = linear_matter_power(cosmo, -0.1, 1.0).unwrap_err();
        assert!(matches!(err.source, CosmologyError::NonPositiveWavenumber { .. }));
    }

    #[test]
    fn supplied_spectra() {
        let cosmo = cosmology();
        let table = cosmo.compute_nonlin_power().unwrap().clone();

        let nonlinear = PowerSpectrum::NonLinear(table.clone());
        let p = linear_power(cosmo, 1.0, 1.0, &nonlinear).unwrap();
        assert_relative_eq!(p, nonlin_matter_power(cosmo, 1.0, 1.0).unwrap());

        let err = sigma_r(cosmo, 8.0, 1.0, &nonlinear).unwrap_err();
        assert!(matches!(err.source, CosmologyError::NotLinear { .. }));

        let linear = PowerSpectrum::Linear(cosmo.compute_linear_power().unwrap().clone());
        assert_relative_eq!(
            sigma_r(cosmo, 8.0, 1.0, &linear).unwrap(),
            sigma_r_today(cosmo, 8.0).unwrap()
        );
    }
}
