use crate::error::OrderingFault;
use crate::ring::Ring;

pub(crate) mod idm;

/// The dynamic state of every vehicle, stored as dense parallel arrays.
///
/// Array index is the initial angular order around the ring, which the
/// integrator preserves for the whole run: the leader of vehicle `i` is
/// always `(i + 1) % N`. Keeping the state as a structure of arrays makes
/// the per-step passes cache friendly and turns the pre-step snapshot into
/// a plain buffer copy.
#[derive(Clone, Debug)]
pub(crate) struct Fleet {
    /// Positions of the vehicle centres along the ring in m.
    pub positions: Vec<f64>,
    /// Velocities in m/s.
    pub velocities: Vec<f64>,
    /// Effective vehicle lengths in m.
    pub lengths: Vec<f64>,
}

impl Fleet {
    /// Creates a fleet from its initial state vectors.
    pub fn new(positions: Vec<f64>, velocities: Vec<f64>, lengths: Vec<f64>) -> Self {
        debug_assert_eq!(positions.len(), velocities.len());
        debug_assert_eq!(positions.len(), lengths.len());
        Self {
            positions,
            velocities,
            lengths,
        }
    }

    /// The number of vehicles.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Index of the vehicle immediately ahead of `i`.
    pub fn leader(&self, i: usize) -> usize {
        (i + 1) % self.len()
    }

    /// The clear bumper-to-bumper gap from `i` to its leader in m.
    ///
    /// Computed from the centre-to-centre forward distance minus the two
    /// half-lengths, so it goes negative when the vehicles overlap. Relies
    /// on the no-overtaking invariant; see [check_ordering](Self::check_ordering).
    pub fn gap(&self, ring: &Ring, i: usize) -> f64 {
        let j = self.leader(i);
        let centre_dist = ring.forward_distance(self.positions[i], self.positions[j]);
        centre_dist - 0.5 * (self.lengths[i] + self.lengths[j])
    }

    /// The gaps of all vehicles, in index order.
    pub fn gaps(&self, ring: &Ring) -> Vec<f64> {
        (0..self.len()).map(|i| self.gap(ring, i)).collect()
    }

    /// Re-asserts the no-overtaking invariant.
    ///
    /// Index order matches angular order exactly when the forward distances
    /// between consecutive vehicles wind around the ring once; any overtake
    /// pushes the winding sum to a higher multiple of the circumference.
    pub fn check_ordering(&self, ring: &Ring, step: usize, time: f64) -> Result<(), OrderingFault> {
        let winding: f64 = (0..self.len())
            .map(|i| ring.forward_distance(self.positions[i], self.positions[self.leader(i)]))
            .sum();
        if winding > 1.5 * ring.circumference() {
            Err(OrderingFault { step, time })
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn ring() -> Ring {
        Ring::new(100.0).unwrap()
    }

    fn fleet(positions: &[f64]) -> Fleet {
        let n = positions.len();
        Fleet::new(positions.to_vec(), vec![0.0; n], vec![4.0; n])
    }

    #[test]
    fn gap_subtracts_half_lengths() {
        let fleet = fleet(&[0.0, 10.0, 50.0, 90.0]);
        assert_approx_eq!(fleet.gap(&ring(), 0), 6.0);
        assert_approx_eq!(fleet.gap(&ring(), 1), 36.0);
        // the last gap wraps around the seam
        assert_approx_eq!(fleet.gap(&ring(), 3), 6.0);
    }

    #[test]
    fn gap_is_negative_on_overlap() {
        let fleet = fleet(&[0.0, 3.0, 50.0, 90.0]);
        assert_approx_eq!(fleet.gap(&ring(), 0), -1.0);
    }

    #[test]
    fn ordering_holds_for_angular_order() {
        let fleet = fleet(&[5.0, 30.0, 55.0, 80.0]);
        assert!(fleet.check_ordering(&ring(), 0, 0.0).is_ok());
    }

    #[test]
    fn ordering_fault_after_overtake() {
        // vehicles 1 and 2 swapped relative to index order
        let fleet = fleet(&[5.0, 55.0, 30.0, 80.0]);
        let fault = fleet.check_ordering(&ring(), 7, 0.35).unwrap_err();
        assert_eq!(fault.step, 7);
        assert_approx_eq!(fault.time, 0.35);
    }
}
