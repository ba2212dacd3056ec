use crate::error::ConfigurationError;

/// A periodic full-stop schedule for the lead vehicle.
///
/// While a stop event is active, vehicle 0 brakes hard to a standstill and
/// holds it, releasing when the event ends. This is a deterministic jam
/// trigger; with no schedule the seeded initial perturbation is the only
/// disturbance in the system.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LeaderStops {
    /// Time of the first stop in s.
    pub first_stop: f64,
    /// Interval between the starts of consecutive stops in s.
    pub repeat_interval: f64,
    /// Duration each stop is held in s.
    pub stop_duration: f64,
}

impl LeaderStops {
    /// Whether a stop event is active at time `t`.
    pub(crate) fn active_at(&self, t: f64) -> bool {
        let since = t - self.first_stop;
        since >= 0.0 && since % self.repeat_interval < self.stop_duration
    }
}

/// Full configuration of a simulation run.
///
/// The `Default` values are the reference scenario: 22 vehicles on a 230 m
/// ring at a density where the homogeneous flow is unstable and a phantom
/// jam grows out of a 5% velocity perturbation.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Parameters {
    /// Circumference of the ring road in m.
    pub ring_length: f64,
    /// Number of vehicles on the ring.
    pub vehicle_count: usize,
    /// Effective vehicle length (hard minimum bumper-to-bumper clearance) in m.
    pub vehicle_length: f64,
    /// Free-flow desired speed in m/s.
    pub max_velocity: f64,
    /// Maximum acceleration in m/s^2.
    pub max_acceleration: f64,
    /// Comfortable deceleration, a positive number in m/s^2.
    pub comfortable_deceleration: f64,
    /// Minimum desired spacing in addition to the vehicle length, in m.
    pub min_spacing: f64,
    /// Safe time headway in s.
    pub time_headway: f64,
    /// Integration step in s.
    pub time_step: f64,
    /// Total simulated duration in s.
    pub duration: f64,
    /// Record a trajectory frame every this many steps.
    pub sample_every: usize,
    /// Seed of the initial velocity perturbation.
    pub seed: u64,
    /// Relative amplitude of the initial velocity perturbation.
    pub perturbation: f64,
    /// Fraction of the free-flow speed below which a vehicle counts as jammed.
    pub jam_velocity_fraction: f64,
    /// Minimum number of contiguous slow vehicles that form a jam region.
    pub jam_min_vehicles: usize,
    /// Overlap corrections per vehicle-second above which a
    /// [StabilityWarning](crate::StabilityWarning) is raised.
    pub overlap_warn_rate: f64,
    /// Optional periodic full stops of the lead vehicle.
    pub leader_stops: Option<LeaderStops>,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            ring_length: 230.0,
            vehicle_count: 22,
            vehicle_length: 5.0,
            max_velocity: 20.0,
            max_acceleration: 1.0,
            comfortable_deceleration: 1.5,
            min_spacing: 2.0,
            time_headway: 1.5,
            time_step: 0.05,
            duration: 600.0,
            sample_every: 1,
            seed: 1,
            perturbation: 0.05,
            jam_velocity_fraction: 0.2,
            jam_min_vehicles: 3,
            overlap_warn_rate: 0.1,
            leader_stops: None,
        }
    }
}

impl Parameters {
    /// Checks every construction precondition.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        use ConfigurationError::*;

        for (name, value) in [
            ("ring_length", self.ring_length),
            ("vehicle_length", self.vehicle_length),
            ("max_velocity", self.max_velocity),
            ("max_acceleration", self.max_acceleration),
            ("comfortable_deceleration", self.comfortable_deceleration),
            ("min_spacing", self.min_spacing),
            ("time_headway", self.time_headway),
            ("time_step", self.time_step),
            ("duration", self.duration),
            ("perturbation", self.perturbation),
        ] {
            if !value.is_finite() {
                return Err(NonFinite(name));
            }
        }

        if self.ring_length <= 0.0 {
            return Err(NonPositiveCircumference(self.ring_length));
        }
        if self.vehicle_count < 2 {
            return Err(TooFewVehicles(self.vehicle_count));
        }
        if self.vehicle_length <= 0.0 {
            return Err(NonPositiveVehicleLength(self.vehicle_length));
        }
        if self.vehicle_count as f64 * self.vehicle_length >= self.ring_length {
            return Err(InfeasiblePlacement {
                count: self.vehicle_count,
                length: self.vehicle_length,
                circumference: self.ring_length,
            });
        }
        if self.time_step <= 0.0 {
            return Err(NonPositiveTimeStep(self.time_step));
        }
        if self.duration <= 0.0 {
            return Err(NonPositiveDuration(self.duration));
        }
        if self.max_velocity <= 0.0 {
            return Err(NonPositiveVelocity(self.max_velocity));
        }
        if self.max_acceleration <= 0.0 {
            return Err(NonPositiveAcceleration(self.max_acceleration));
        }
        if self.comfortable_deceleration <= 0.0 {
            return Err(NonPositiveDeceleration(self.comfortable_deceleration));
        }
        if self.min_spacing < 0.0 {
            return Err(NegativeSpacing(self.min_spacing));
        }
        if self.time_headway < 0.0 {
            return Err(NegativeHeadway(self.time_headway));
        }
        if self.sample_every == 0 {
            return Err(ZeroSampleCadence);
        }
        if self.perturbation < 0.0 {
            return Err(NegativePerturbation(self.perturbation));
        }
        if let Some(stops) = &self.leader_stops {
            let fields = [stops.first_stop, stops.repeat_interval, stops.stop_duration];
            if fields.iter().any(|f| !f.is_finite())
                || stops.first_stop < 0.0
                || stops.repeat_interval <= 0.0
                || stops.stop_duration <= 0.0
            {
                return Err(InvalidLeaderStops);
            }
        }
        Ok(())
    }

    /// The vehicle density N / L in 1/m.
    pub fn density(&self) -> f64 {
        self.vehicle_count as f64 / self.ring_length
    }

    /// Velocity below which a vehicle counts as jammed, in m/s.
    pub fn jam_velocity(&self) -> f64 {
        self.jam_velocity_fraction * self.max_velocity
    }

    /// Number of integration steps of a full run.
    pub(crate) fn step_count(&self) -> usize {
        (self.duration / self.time_step).ceil() as usize
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_parameters_are_valid() {
        assert!(Parameters::default().validate().is_ok());
    }

    #[test]
    fn rejects_infeasible_placement() {
        // 25 vehicles of 5 m need 125 m of road, the ring only has 100 m
        let params = Parameters {
            ring_length: 100.0,
            vehicle_count: 25,
            vehicle_length: 5.0,
            ..Default::default()
        };
        assert!(matches!(
            params.validate(),
            Err(ConfigurationError::InfeasiblePlacement { count: 25, .. })
        ));
    }

    #[test]
    fn rejects_each_bad_field() {
        let base = Parameters::default();
        let cases: Vec<(Parameters, ConfigurationError)> = vec![
            (
                Parameters { ring_length: -1.0, ..base.clone() },
                ConfigurationError::NonPositiveCircumference(-1.0),
            ),
            (
                Parameters { vehicle_count: 1, ..base.clone() },
                ConfigurationError::TooFewVehicles(1),
            ),
            (
                Parameters { time_step: 0.0, ..base.clone() },
                ConfigurationError::NonPositiveTimeStep(0.0),
            ),
            (
                Parameters { max_velocity: 0.0, ..base.clone() },
                ConfigurationError::NonPositiveVelocity(0.0),
            ),
            (
                Parameters { max_acceleration: -0.5, ..base.clone() },
                ConfigurationError::NonPositiveAcceleration(-0.5),
            ),
            (
                Parameters { comfortable_deceleration: 0.0, ..base.clone() },
                ConfigurationError::NonPositiveDeceleration(0.0),
            ),
            (
                Parameters { sample_every: 0, ..base.clone() },
                ConfigurationError::ZeroSampleCadence,
            ),
            (
                Parameters { perturbation: -0.1, ..base.clone() },
                ConfigurationError::NegativePerturbation(-0.1),
            ),
        ];
        for (params, expected) in cases {
            assert_eq!(params.validate().unwrap_err(), expected);
        }
    }

    #[test]
    fn rejects_non_finite_fields() {
        let params = Parameters {
            duration: f64::INFINITY,
            ..Default::default()
        };
        assert!(matches!(
            params.validate(),
            Err(ConfigurationError::NonFinite("duration"))
        ));
    }

    #[test]
    fn leader_stop_schedule_activation() {
        let stops = LeaderStops {
            first_stop: 2.0,
            repeat_interval: 10.0,
            stop_duration: 2.0,
        };
        assert!(!stops.active_at(0.0));
        assert!(!stops.active_at(1.99));
        assert!(stops.active_at(2.0));
        assert!(stops.active_at(3.9));
        assert!(!stops.active_at(4.0));
        assert!(stops.active_at(12.5));
        assert!(!stops.active_at(15.0));
        assert!(stops.active_at(22.0));
    }
}
