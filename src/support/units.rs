//! Extensions to [`uom`] for cosmological length scales.
//!
//! Cosmology works in megaparsecs, which [`uom`] does not provide as a unit.
//! The [`Megaparsecs`] extension trait converts between [`Length`] and plain
//! megaparsec values:
//!
//! ```
//! use uom::si::{f64::Length, length::parsec};
//! use twine_cosmology::support::units::{Megaparsecs, megaparsecs};
//!
//! let r = Length::new::<parsec>(8.0e6);
//! assert!((r.megaparsecs() - 8.0).abs() < 1e-12);
//!
//! let back = megaparsecs(8.0);
//! assert!((back.get::<parsec>() - 8.0e6).abs() < 1e-6);
//! ```

use uom::si::{f64::Length, length::parsec};

const PARSECS_PER_MEGAPARSEC: f64 = 1.0e6;

/// Extension trait for expressing a [`Length`] in megaparsecs.
pub trait Megaparsecs {
    /// Returns the length in megaparsecs.
    fn megaparsecs(self) -> f64;
}

impl Megaparsecs for Length {
    fn megaparsecs(self) -> f64 {
        self.get::<parsec>() / PARSECS_PER_MEGAPARSEC
    }
}

/// Creates a [`Length`] from a value in megaparsecs.
#[must_use]
pub fn megaparsecs(value: f64) -> Length {
    Length::new::<parsec>(value * PARSECS_PER_MEGAPARSEC)
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use uom::si::length::meter;

    #[test]
    fn megaparsec_in_meters() {
        let one = megaparsecs(1.0);
        assert_relative_eq!(one.get::<meter>(), 3.085_677_581e22, max_relative = 1e-6);
        assert_relative_eq!(one.megaparsecs(), 1.0, max_relative = 1e-14);
    }
}
