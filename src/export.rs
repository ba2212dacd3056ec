//! The arrays handed to the plotting and animation collaborators.

use crate::trajectory::TrajectoryBuffer;
use cgmath::Point2;

/// A 2D point in the animation plane.
pub type Point2d = Point2<f64>;

/// Flat numeric arrays of a full run, shaped `frames × vehicles` row-major.
///
/// This is the whole export surface of the core: collaborators may
/// serialise these arrays in any format they like.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TrajectoryArrays {
    /// Sample times in s.
    pub times: Vec<f64>,
    /// Positions along the ring in m, row-major.
    pub positions: Vec<f64>,
    /// Velocities in m/s, row-major.
    pub velocities: Vec<f64>,
    /// Gaps to the leader in m, row-major.
    pub headways: Vec<f64>,
    /// The number of sampled frames.
    pub frames: usize,
    /// The number of vehicles.
    pub vehicles: usize,
}

impl TrajectoryArrays {
    /// Flattens a trajectory into plain arrays.
    pub fn from_buffer(buffer: &TrajectoryBuffer) -> Self {
        Self {
            times: buffer.times().to_vec(),
            positions: buffer.positions().to_vec(),
            velocities: buffer.velocities().to_vec(),
            headways: buffer.headways(),
            frames: buffer.frame_count(),
            vehicles: buffer.vehicle_count(),
        }
    }
}

/// The positions of one sampled frame embedded on the drawing circle of
/// radius `L / 2π`, for the animation collaborator.
pub fn frame_circle_coords(buffer: &TrajectoryBuffer, frame: usize) -> Vec<Point2d> {
    buffer
        .position_frame(frame)
        .iter()
        .map(|x| buffer.ring().circle_point(*x))
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ring::Ring;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn arrays_match_the_buffer_shape() {
        let ring = Ring::new(100.0).unwrap();
        let mut buffer = TrajectoryBuffer::new(ring, vec![4.0; 2]);
        buffer.record(0.0, &[0.0, 50.0], &[1.0, 2.0]);
        buffer.record(1.0, &[1.0, 52.0], &[1.0, 2.0]);

        let arrays = TrajectoryArrays::from_buffer(&buffer);
        assert_eq!(arrays.frames, 2);
        assert_eq!(arrays.vehicles, 2);
        assert_eq!(arrays.positions.len(), 4);
        assert_eq!(arrays.headways.len(), 4);
        assert_eq!(arrays.times, vec![0.0, 1.0]);
    }

    #[test]
    fn circle_coords_lie_on_the_drawing_radius() {
        let ring = Ring::new(100.0).unwrap();
        let mut buffer = TrajectoryBuffer::new(ring, vec![4.0; 4]);
        buffer.record(0.0, &[0.0, 25.0, 50.0, 75.0], &[0.0; 4]);

        let radius = 100.0 / std::f64::consts::TAU;
        for p in frame_circle_coords(&buffer, 0) {
            assert_approx_eq!((p.x * p.x + p.y * p.y).sqrt(), radius);
        }
    }
}
