use crate::ring::Ring;

/// A dense record of the sampled simulation state.
///
/// Positions and velocities are stored row-major with one row of
/// `vehicle_count()` values per sampled frame. The driver appends to the
/// buffer monotonically; everything downstream only reads it.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrajectoryBuffer {
    ring: Ring,
    lengths: Vec<f64>,
    times: Vec<f64>,
    positions: Vec<f64>,
    velocities: Vec<f64>,
}

impl TrajectoryBuffer {
    pub(crate) fn new(ring: Ring, lengths: Vec<f64>) -> Self {
        Self {
            ring,
            lengths,
            times: Vec::new(),
            positions: Vec::new(),
            velocities: Vec::new(),
        }
    }

    /// Appends one sampled frame.
    pub(crate) fn record(&mut self, time: f64, positions: &[f64], velocities: &[f64]) {
        debug_assert_eq!(positions.len(), self.vehicle_count());
        debug_assert_eq!(velocities.len(), self.vehicle_count());
        self.times.push(time);
        self.positions.extend_from_slice(positions);
        self.velocities.extend_from_slice(velocities);
    }

    /// The ring the trajectory was recorded on.
    pub fn ring(&self) -> &Ring {
        &self.ring
    }

    /// The number of vehicles per frame.
    pub fn vehicle_count(&self) -> usize {
        self.lengths.len()
    }

    /// The number of sampled frames.
    pub fn frame_count(&self) -> usize {
        self.times.len()
    }

    /// Whether no frame has been recorded.
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// The sample times in s.
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// All sampled positions, row-major with
    /// `frame_count() × vehicle_count()` shape.
    pub fn positions(&self) -> &[f64] {
        &self.positions
    }

    /// All sampled velocities, row-major with
    /// `frame_count() × vehicle_count()` shape.
    pub fn velocities(&self) -> &[f64] {
        &self.velocities
    }

    /// The positions of one sampled frame.
    pub fn position_frame(&self, frame: usize) -> &[f64] {
        let n = self.vehicle_count();
        &self.positions[frame * n..(frame + 1) * n]
    }

    /// The velocities of one sampled frame.
    pub fn velocity_frame(&self, frame: usize) -> &[f64] {
        let n = self.vehicle_count();
        &self.velocities[frame * n..(frame + 1) * n]
    }

    /// The gap to the leader for every vehicle of one frame.
    pub fn headway_frame(&self, frame: usize) -> Vec<f64> {
        let xs = self.position_frame(frame);
        let n = self.vehicle_count();
        (0..n)
            .map(|i| {
                let j = (i + 1) % n;
                self.ring.forward_distance(xs[i], xs[j])
                    - 0.5 * (self.lengths[i] + self.lengths[j])
            })
            .collect()
    }

    /// The gap to the leader at every sample, same shape as
    /// [positions](Self::positions).
    pub fn headways(&self) -> Vec<f64> {
        (0..self.frame_count())
            .flat_map(|frame| self.headway_frame(frame))
            .collect()
    }
}
