//! Physical constants and fixed identifiers.

/// Identifier of the matter–matter auto power spectrum stored in every [`Cosmology`].
///
/// [`Cosmology`]: super::Cosmology
pub const DEFAULT_POWER_SPECTRUM: &str = "delta_matter:delta_matter";

/// Hubble distance `c / (100 km/s/Mpc)` in Mpc; divide by `h` for `c / H0`.
pub const HUBBLE_DISTANCE_MPC: f64 = 2_997.924_58;

/// Critical density today in units of `h² M☉ / Mpc³`.
pub const RHO_CRITICAL: f64 = 2.775_366_27e11;

/// Pivot scale for the primordial amplitude `A_s`, in Mpc⁻¹.
pub const K_PIVOT: f64 = 0.05;

/// Radius, in Mpc/h, that defines sigma8.
pub const SIGMA8_RADIUS: f64 = 8.0;
