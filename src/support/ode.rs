//! Fixed-step fourth-order Runge–Kutta integration.

use thiserror::Error;

/// Errors that can occur during ODE integration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OdeError {
    /// The step count was zero or the interval was empty or not finite.
    #[error("invalid integration interval [{t0}, {t1}] with {steps} steps")]
    InvalidArgument { t0: f64, t1: f64, steps: usize },

    /// The state became NaN or infinite.
    #[error("state became non-finite at t={t}")]
    NonFinite { t: f64 },
}

/// A solution sample: the independent variable and the state at that point.
pub type Sample<const N: usize> = (f64, [f64; N]);

/// Integrates `dy/dt = rhs(t, y)` from `t0` to `t1` in `steps` equal steps.
///
/// Returns the trajectory including the initial point, so the result has
/// `steps + 1` samples.
///
/// # Errors
///
/// Returns [`OdeError`] if the arguments are invalid or the state becomes non-finite.
pub fn rk4<const N: usize, F>(
    rhs: F,
    t0: f64,
    y0: [f64; N],
    t1: f64,
    steps: usize,
) -> Result<Vec<Sample<N>>, OdeError>
where
    F: Fn(f64, &[f64; N]) -> [f64; N],
{
    if steps == 0 || !t0.is_finite() || !t1.is_finite() || t0 == t1 {
        return Err(OdeError::InvalidArgument { t0, t1, steps });
    }

    #[allow(clippy::cast_precision_loss)]
    let dt = (t1 - t0) / steps as f64;

    let mut trajectory = Vec::with_capacity(steps + 1);
    let mut y = y0;
    trajectory.push((t0, y));

    for step in 0..steps {
        #[allow(clippy::cast_precision_loss)]
        let t = t0 + dt * step as f64;

        let k1 = rhs(t, &y);
        let k2 = rhs(t + 0.5 * dt, &offset(&y, &k1, 0.5 * dt));
        let k3 = rhs(t + 0.5 * dt, &offset(&y, &k2, 0.5 * dt));
        let k4 = rhs(t + dt, &offset(&y, &k3, dt));

        for i in 0..N {
            y[i] += dt / 6.0 * (k1[i] + 2.0 * k2[i] + 2.0 * k3[i] + k4[i]);
        }

        #[allow(clippy::cast_precision_loss)]
        let t_next = if step + 1 == steps { t1 } else { t0 + dt * (step + 1) as f64 };

        if y.iter().any(|v| !v.is_finite()) {
            return Err(OdeError::NonFinite { t: t_next });
        }
        trajectory.push((t_next, y));
    }

    Ok(trajectory)
}

fn offset<const N: usize>(y: &[f64; N], k: &[f64; N], h: f64) -> [f64; N] {
    std::array::from_fn(|i| y[i] + h * k[i])
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    #[test]
    fn exponential_decay() {
        let trajectory = rk4(|_, y| [-y[0]], 0.0, [1.0], 2.0, 200).unwrap();

        assert_eq!(trajectory.len(), 201);
        let (t, y) = trajectory[200];
        assert_relative_eq!(t, 2.0);
        assert_relative_eq!(y[0], (-2.0_f64).exp(), max_relative = 1e-9);
    }

    #[test]
    fn harmonic_oscillator() {
        let trajectory = rk4(|_, y| [y[1], -y[0]], 0.0, [1.0, 0.0], 1.0, 1000).unwrap();

        let (_, y) = trajectory[1000];
        assert_relative_eq!(y[0], 1.0_f64.cos(), max_relative = 1e-10);
        assert_relative_eq!(y[1], -1.0_f64.sin(), max_relative = 1e-10);
    }

    #[test]
    fn rejects_zero_steps() {
        assert!(matches!(
            rk4(|_, y| [y[0]], 0.0, [1.0], 1.0, 0),
            Err(OdeError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn reports_blow_up() {
        assert!(matches!(
            rk4(|_, y| [y[0] * y[0]], 0.0, [1.0], 10.0, 100),
            Err(OdeError::NonFinite { .. })
        ));
    }
}
