use crate::error::ConfigurationError;
use crate::export::Point2d;
use std::f64::consts::TAU;

/// The periodic one-dimensional domain the vehicles drive on.
///
/// Every stored position lies in the canonical range `[0, L)` where `L` is
/// the circumference. Created once at simulation start, immutable thereafter.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Ring {
    circumference: f64,
}

impl Ring {
    /// Creates a ring of the given circumference in m.
    pub fn new(circumference: f64) -> Result<Self, ConfigurationError> {
        if !circumference.is_finite() || circumference <= 0.0 {
            return Err(ConfigurationError::NonPositiveCircumference(circumference));
        }
        Ok(Self { circumference })
    }

    /// The circumference of the ring in m.
    pub fn circumference(&self) -> f64 {
        self.circumference
    }

    /// Maps a coordinate into the canonical range `[0, L)`.
    pub fn wrap(&self, x: f64) -> f64 {
        let wrapped = x.rem_euclid(self.circumference);
        // rem_euclid can round up to L itself for tiny negative inputs
        if wrapped >= self.circumference {
            0.0
        } else {
            wrapped
        }
    }

    /// The distance travelled going forward from `a` to `b`, in `[0, L)`.
    ///
    /// Returns 0 when `a == b`.
    pub fn forward_distance(&self, a: f64, b: f64) -> f64 {
        self.wrap(b - a)
    }

    /// The shorter signed arc from `a` to `b`, in `(-L/2, L/2]`.
    ///
    /// Used by the diagnostics for jam-centre tracking; the integrator only
    /// ever needs [forward_distance](Self::forward_distance).
    pub fn signed_difference(&self, a: f64, b: f64) -> f64 {
        let d = self.forward_distance(a, b);
        if d > 0.5 * self.circumference {
            d - self.circumference
        } else {
            d
        }
    }

    /// Embeds a ring coordinate on the circle of radius `L / 2π`,
    /// for the animation collaborators.
    pub fn circle_point(&self, x: f64) -> Point2d {
        let radius = self.circumference / TAU;
        let theta = TAU * x / self.circumference;
        Point2d::new(radius * theta.cos(), radius * theta.sin())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn rejects_non_positive_circumference() {
        assert!(Ring::new(0.0).is_err());
        assert!(Ring::new(-230.0).is_err());
        assert!(Ring::new(f64::NAN).is_err());
        assert!(Ring::new(230.0).is_ok());
    }

    #[test]
    fn wrap_is_canonical_and_idempotent() {
        let ring = Ring::new(230.0).unwrap();
        for x in [-690.0, -230.0, -0.5, 0.0, 1.0, 229.999, 230.0, 1000.0] {
            let w = ring.wrap(x);
            assert!((0.0..230.0).contains(&w), "wrap({x}) = {w}");
            assert_eq!(ring.wrap(w), w);
        }
        assert_approx_eq!(ring.wrap(-0.5), 229.5);
        assert_approx_eq!(ring.wrap(230.5), 0.5);
    }

    #[test]
    fn forward_distance_closure() {
        let ring = Ring::new(230.0).unwrap();
        let pairs = [(0.0, 10.0), (225.0, 5.0), (100.0, 99.0), (0.1, 229.9)];
        for (a, b) in pairs {
            let d = ring.forward_distance(a, b);
            assert!((0.0..230.0).contains(&d));
            assert_approx_eq!(d + ring.forward_distance(b, a), 230.0);
        }
        assert_eq!(ring.forward_distance(42.0, 42.0), 0.0);
    }

    #[test]
    fn signed_difference_takes_shorter_arc() {
        let ring = Ring::new(230.0).unwrap();
        assert_approx_eq!(ring.signed_difference(10.0, 20.0), 10.0);
        assert_approx_eq!(ring.signed_difference(20.0, 10.0), -10.0);
        assert_approx_eq!(ring.signed_difference(225.0, 5.0), 10.0);
        assert_approx_eq!(ring.signed_difference(5.0, 225.0), -10.0);
        assert_approx_eq!(ring.signed_difference(0.0, 115.0), 115.0);
    }

    #[test]
    fn circle_embedding_preserves_radius() {
        let ring = Ring::new(230.0).unwrap();
        let radius = 230.0 / std::f64::consts::TAU;
        for x in [0.0, 57.5, 115.0, 172.5] {
            let p = ring.circle_point(x);
            assert_approx_eq!((p.x * p.x + p.y * p.y).sqrt(), radius);
        }
        let origin = ring.circle_point(0.0);
        assert_approx_eq!(origin.x, radius);
        assert_approx_eq!(origin.y, 0.0);
    }
}
