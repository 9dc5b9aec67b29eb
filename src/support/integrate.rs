//! Adaptive Gauss–Kronrod quadrature.
//!
//! [`integrate`] applies the 7-point Gauss / 15-point Kronrod rule on a
//! globally adaptive subdivision: the subinterval with the largest error
//! estimate is bisected until the total error meets the requested tolerance.

use thiserror::Error;

/// Kronrod abscissae on `[0, 1]` (the rule is symmetric).
const XGK: [f64; 8] = [
    0.991_455_371_120_812_6,
    0.949_107_912_342_758_5,
    0.864_864_423_359_769_1,
    0.741_531_185_599_394_4,
    0.586_087_235_467_691_1,
    0.405_845_151_377_397_2,
    0.207_784_955_007_898_5,
    0.0,
];

/// Kronrod weights matching [`XGK`].
const WGK: [f64; 8] = [
    0.022_935_322_010_529_22,
    0.063_092_092_629_978_55,
    0.104_790_010_322_250_2,
    0.140_653_259_715_525_9,
    0.169_004_726_639_267_9,
    0.190_350_578_064_785_4,
    0.204_432_940_075_298_9,
    0.209_482_141_084_727_8,
];

/// Gauss weights for the odd-indexed Kronrod abscissae and the center.
const WG: [f64; 4] = [
    0.129_484_966_168_869_7,
    0.279_705_391_489_276_7,
    0.381_830_050_505_118_9,
    0.417_959_183_673_469_4,
];

/// Tolerances for adaptive quadrature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    /// Absolute error target.
    pub abs: f64,

    /// Relative error target.
    pub rel: f64,

    /// Maximum number of subintervals.
    pub max_subintervals: usize,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            abs: 0.0,
            rel: 1e-6,
            max_subintervals: 1000,
        }
    }
}

/// Errors that can occur during adaptive quadrature.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IntegrationError {
    /// The subdivision limit was reached before the tolerance was met.
    #[error("max subintervals reached: value={value}, error={error}")]
    MaxSubintervals { value: f64, error: f64 },

    /// The integrand produced a NaN or infinite value.
    #[error("integrand is not finite on [{lower}, {upper}]")]
    NonFinite { lower: f64, upper: f64 },
}

/// Result of a converged quadrature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quadrature {
    pub value: f64,
    pub error: f64,
}

#[derive(Debug, Clone, Copy)]
struct Segment {
    lower: f64,
    upper: f64,
    value: f64,
    error: f64,
}

/// Integrates `f` over `[lower, upper]`.
///
/// # Errors
///
/// Returns [`IntegrationError`] if the integrand is not finite or the
/// tolerance cannot be met within `tol.max_subintervals`.
pub fn integrate<F>(
    f: F,
    lower: f64,
    upper: f64,
    tol: &Tolerance,
) -> Result<Quadrature, IntegrationError>
where
    F: Fn(f64) -> f64,
{
    if lower == upper {
        return Ok(Quadrature {
            value: 0.0,
            error: 0.0,
        });
    }

    let first = kronrod(&f, lower, upper)?;
    let mut segments = vec![first];
    let mut value = first.value;
    let mut error = first.error;

    loop {
        if error <= tol.abs.max(tol.rel * value.abs()) {
            return Ok(Quadrature { value, error });
        }
        if segments.len() >= tol.max_subintervals.max(1) {
            return Err(IntegrationError::MaxSubintervals { value, error });
        }

        let worst = segments
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.error.total_cmp(&b.error))
            .map_or(0, |(i, _)| i);
        let parent = segments.swap_remove(worst);
        let mid = 0.5 * (parent.lower + parent.upper);

        let left = kronrod(&f, parent.lower, mid)?;
        let right = kronrod(&f, mid, parent.upper)?;

        value += left.value + right.value - parent.value;
        error += left.error + right.error - parent.error;
        segments.push(left);
        segments.push(right);

        // Running sums drift; resum once the estimate looks converged.
        if error <= tol.abs.max(tol.rel * value.abs()) {
            value = segments.iter().map(|s| s.value).sum();
            error = segments.iter().map(|s| s.error).sum();
        }
    }
}

/// Applies the 15-point Kronrod rule with its embedded 7-point Gauss estimate.
fn kronrod<F>(f: &F, lower: f64, upper: f64) -> Result<Segment, IntegrationError>
where
    F: Fn(f64) -> f64,
{
    let center = 0.5 * (lower + upper);
    let half = 0.5 * (upper - lower);

    let f_center = f(center);
    let mut kronrod_sum = WGK[7] * f_center;
    let mut gauss_sum = WG[3] * f_center;

    for (j, (&x, &wk)) in XGK.iter().zip(&WGK).take(7).enumerate() {
        let dx = half * x;
        let pair = f(center - dx) + f(center + dx);
        kronrod_sum += wk * pair;
        if j % 2 == 1 {
            gauss_sum += WG[j / 2] * pair;
        }
    }

    let value = kronrod_sum * half;
    if !value.is_finite() {
        return Err(IntegrationError::NonFinite { lower, upper });
    }

    Ok(Segment {
        lower,
        upper,
        value,
        error: ((kronrod_sum - gauss_sum) * half).abs(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn polynomial_is_exact() {
        let q = integrate(|x| 3.0 * x * x, 0.0, 2.0, &Tolerance::default()).unwrap();
        assert_relative_eq!(q.value, 8.0, max_relative = 1e-14);
    }

    #[test]
    fn oscillatory_integrand() {
        let tol = Tolerance {
            rel: 1e-10,
            ..Tolerance::default()
        };
        let q = integrate(|x| x.sin() * x.sin(), 0.0, 20.0 * PI, &tol).unwrap();
        assert_relative_eq!(q.value, 10.0 * PI, max_relative = 1e-9);
    }

    #[test]
    fn peaked_integrand() {
        // Lorentzian: ∫ 1/(1+x²) over [-100, 100] = 2 atan(100).
        let q = integrate(|x| 1.0 / (1.0 + x * x), -100.0, 100.0, &Tolerance::default()).unwrap();
        assert_relative_eq!(q.value, 2.0 * 100.0_f64.atan(), max_relative = 1e-6);
    }

    #[test]
    fn reversed_limits_change_sign() {
        let q = integrate(f64::exp, 1.0, 0.0, &Tolerance::default()).unwrap();
        assert_relative_eq!(q.value, 1.0 - 1.0_f64.exp(), max_relative = 1e-12);
    }

    #[test]
    fn reports_non_finite_integrand() {
        let result = integrate(|x| 1.0 / x, 0.0, 1.0, &Tolerance::default());
        assert!(matches!(
            result,
            Err(IntegrationError::NonFinite { .. } | IntegrationError::MaxSubintervals { .. })
        ));
    }

    #[test]
    fn reports_subdivision_limit() {
        let tol = Tolerance {
            abs: 0.0,
            rel: 1e-15,
            max_subintervals: 2,
        };
        let result = integrate(|x| (50.0 * x).sin().abs(), 0.0, 10.0, &tol);
        assert!(matches!(result, Err(IntegrationError::MaxSubintervals { .. })));
    }
}
