use crate::params::Parameters;

/// The gap floor used in the interaction term, in m.
pub(crate) const GAP_EPSILON: f64 = 0.01;

/// Tolerance of the equilibrium velocity bisection, in m/s.
const BISECT_TOL: f64 = 1e-9;

/// The intelligent driver model acceleration law.
#[derive(Clone, Copy, Debug)]
pub(crate) struct AccelerationModel {
    /// The desired free-flow speed in m/s.
    desired_velocity: f64,
    /// The desired gap to the vehicle ahead in seconds.
    time_headway: f64,
    /// The minimum spacing in m.
    min_spacing: f64,
    /// The vehicle's maximum acceleration in m/s<sup>2</sup>.
    max_acc: f64,
    /// The comfortable deceleration, positive, in m/s<sup>2</sup>.
    comf_dec: f64,
}

impl AccelerationModel {
    /// Creates the acceleration model shared by the whole fleet.
    pub fn from_params(params: &Parameters) -> Self {
        Self {
            desired_velocity: params.max_velocity,
            time_headway: params.time_headway,
            min_spacing: params.min_spacing,
            max_acc: params.max_acceleration,
            comf_dec: params.comfortable_deceleration,
        }
    }

    /// The free-road acceleration toward the desired speed.
    pub fn free_acceleration(&self, vel: f64) -> f64 {
        self.max_acc * (1.0 - (vel / self.desired_velocity).powi(4))
    }

    /// The dynamic desired gap for the given speed and approach rate.
    pub fn desired_gap(&self, vel: f64, appr: f64) -> f64 {
        let factor = 1.0 / (2.0 * (self.max_acc * self.comf_dec).sqrt());
        self.min_spacing + f64::max(0.0, vel * self.time_headway + vel * appr * factor)
    }

    /// The acceleration of a vehicle at `vel` following a leader at
    /// `leader_vel` across a clear gap of `gap` metres.
    pub fn acceleration(&self, vel: f64, leader_vel: f64, gap: f64) -> f64 {
        let ss = self.desired_gap(vel, vel - leader_vel);
        let term = ss / f64::max(gap, GAP_EPSILON);
        self.free_acceleration(vel) - self.max_acc * term * term
    }

    /// The speed of the homogeneous equilibrium at the given gap: the `v`
    /// with zero acceleration when the leader drives at the same speed.
    ///
    /// Solved by bounded bisection on `[0, v0]`; the acceleration is strictly
    /// decreasing in `v`, positive at rest for any gap above the minimum
    /// spacing and negative at the desired speed.
    pub fn equilibrium_velocity(&self, gap: f64) -> f64 {
        if gap <= self.min_spacing {
            return 0.0;
        }
        let accel = |v: f64| self.acceleration(v, v, gap);
        if accel(self.desired_velocity) >= 0.0 {
            return self.desired_velocity;
        }
        let (mut lo, mut hi) = (0.0, self.desired_velocity);
        while hi - lo > BISECT_TOL {
            let mid = 0.5 * (lo + hi);
            if accel(mid) > 0.0 {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        0.5 * (lo + hi)
    }
}
