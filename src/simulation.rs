#[cfg(feature = "debug")]
use crate::debug::{debug_vehicle, take_debug_frame};
use crate::error::{ConfigurationError, OrderingFault, StabilityWarning};
use crate::fleet::idm::AccelerationModel;
use crate::fleet::Fleet;
use crate::params::Parameters;
use crate::ring::Ring;
use crate::trajectory::TrajectoryBuffer;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Uniform};

/// Hard deceleration of the lead vehicle during a scheduled stop, in m/s^2.
const STOP_DECEL: f64 = -10.0;

/// Length of the window over which overlap corrections are counted, in s.
const WARN_WINDOW_SEC: f64 = 10.0;

/// A ring-road traffic simulation.
///
/// Construction validates the parameters, places the vehicles equispaced on
/// the ring at the homogeneous equilibrium speed and applies the seeded
/// velocity perturbation. [step](Self::step) advances the system one time
/// step; [run](Self::run) executes the configured horizon and records the
/// trajectory.
pub struct Simulation {
    params: Parameters,
    ring: Ring,
    model: AccelerationModel,
    /// The current vehicle state.
    fleet: Fleet,
    /// Frozen copy of the pre-step state; all accelerations read from it.
    snapshot: Fleet,
    /// The acceleration of each vehicle for the step in progress.
    accelerations: Vec<f64>,
    /// The speed of the homogeneous equilibrium at the initial spacing.
    equilibrium: f64,
    /// The current step index.
    step: usize,
    /// Overlap corrections within the current monitoring window.
    window_corrections: usize,
    /// Step at which the current monitoring window began.
    window_start: usize,
    /// Overlap corrections since the start of the run.
    total_corrections: usize,
    /// Stability warnings raised so far.
    warnings: Vec<StabilityWarning>,
    /// Debugging information from the previously simulated step.
    #[cfg(feature = "debug")]
    debug: serde_json::Value,
}

/// The result of a completed run.
pub struct RunOutcome {
    /// The recorded trajectory, truncated at the last valid sample when the
    /// run aborted.
    pub trajectory: TrajectoryBuffer,
    /// The ordering fault that aborted the run, if any.
    pub fault: Option<OrderingFault>,
}

impl Simulation {
    /// Creates a simulation from the given parameters.
    pub fn new(params: Parameters) -> Result<Self, ConfigurationError> {
        params.validate()?;
        let ring = Ring::new(params.ring_length)?;
        let model = AccelerationModel::from_params(&params);

        let n = params.vehicle_count;
        let spacing = params.ring_length / n as f64;
        let positions: Vec<f64> = (0..n).map(|i| i as f64 * spacing).collect();
        let equilibrium = model.equilibrium_velocity(spacing - params.vehicle_length);

        // The perturbation is what lets the linear instability grow; with a
        // zero amplitude the homogeneous solution is metastable.
        let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
        let noise = Uniform::new_inclusive(-1.0, 1.0);
        let velocities: Vec<f64> = (0..n)
            .map(|_| {
                let eta: f64 = noise.sample(&mut rng);
                (equilibrium * (1.0 + params.perturbation * eta)).clamp(0.0, params.max_velocity)
            })
            .collect();

        let lengths = vec![params.vehicle_length; n];
        let fleet = Fleet::new(positions, velocities, lengths);
        let snapshot = fleet.clone();

        log::debug!(
            "placed {} vehicles on a {} m ring, v_eq = {:.3} m/s",
            n,
            params.ring_length,
            equilibrium
        );

        Ok(Self {
            params,
            ring,
            model,
            fleet,
            snapshot,
            accelerations: vec![0.0; n],
            equilibrium,
            step: 0,
            window_corrections: 0,
            window_start: 0,
            total_corrections: 0,
            warnings: Vec::new(),
            #[cfg(feature = "debug")]
            debug: serde_json::Value::Null,
        })
    }

    /// The parameters the simulation was built from.
    pub fn params(&self) -> &Parameters {
        &self.params
    }

    /// The ring the vehicles drive on.
    pub fn ring(&self) -> &Ring {
        &self.ring
    }

    /// The current simulated time in s.
    pub fn time(&self) -> f64 {
        self.step as f64 * self.params.time_step
    }

    /// The speed of the homogeneous equilibrium at the initial spacing.
    pub fn equilibrium_velocity(&self) -> f64 {
        self.equilibrium
    }

    /// The current vehicle positions, in ring order.
    pub fn positions(&self) -> &[f64] {
        &self.fleet.positions
    }

    /// The current vehicle velocities, in ring order.
    pub fn velocities(&self) -> &[f64] {
        &self.fleet.velocities
    }

    /// The current gap of every vehicle to its leader.
    pub fn gaps(&self) -> Vec<f64> {
        self.fleet.gaps(&self.ring)
    }

    /// The stability warnings raised so far.
    pub fn warnings(&self) -> &[StabilityWarning] {
        &self.warnings
    }

    /// Overlap corrections applied since the start of the run.
    pub fn overlap_corrections(&self) -> usize {
        self.total_corrections
    }

    /// Advances the simulation by one time step.
    ///
    /// Accelerations for all vehicles are computed against a frozen copy of
    /// the pre-step state, then every vehicle is updated simultaneously.
    /// A sequential update would introduce a direction-dependent bias.
    pub fn step(&mut self) -> Result<(), OrderingFault> {
        let t = self.time();

        self.snapshot.clone_from(&self.fleet);
        self.apply_accelerations(t);
        self.integrate();
        self.resolve_overlaps();

        self.step += 1;
        self.update_stability_window();

        #[cfg(feature = "debug")]
        {
            for i in 0..self.fleet.len() {
                debug_vehicle(
                    i,
                    self.fleet.positions[i],
                    self.fleet.velocities[i],
                    self.fleet.gap(&self.ring, i),
                );
            }
            self.debug = take_debug_frame();
        }

        self.fleet.check_ordering(&self.ring, self.step, self.time())
    }

    /// Runs the configured horizon and returns the recorded trajectory.
    ///
    /// The full state vector is recorded at construction and then every
    /// `sample_every` steps. On an ordering fault the run aborts and the
    /// trajectory is returned truncated at the last valid sample.
    pub fn run(&mut self) -> RunOutcome {
        let steps = self.params.step_count();
        let mut trajectory = TrajectoryBuffer::new(self.ring, self.fleet.lengths.clone());

        trajectory.record(self.time(), &self.fleet.positions, &self.fleet.velocities);
        for _ in 0..steps {
            if let Err(fault) = self.step() {
                log::error!("{fault}");
                return RunOutcome {
                    trajectory,
                    fault: Some(fault),
                };
            }
            if self.step % self.params.sample_every == 0 {
                trajectory.record(self.time(), &self.fleet.positions, &self.fleet.velocities);
            }
        }
        RunOutcome {
            trajectory,
            fault: None,
        }
    }

    /// Gets the debugging information for the previously simulated step.
    #[cfg(feature = "debug")]
    pub fn debug(&mut self) -> serde_json::Value {
        self.debug.clone()
    }

    /// Computes the acceleration of every vehicle from the pre-step state.
    fn apply_accelerations(&mut self, t: f64) {
        let leader_stopped = self
            .params
            .leader_stops
            .map_or(false, |stops| stops.active_at(t));

        for i in 0..self.snapshot.len() {
            let vel = self.snapshot.velocities[i];
            self.accelerations[i] = if i == 0 && leader_stopped {
                if vel > 0.0 {
                    STOP_DECEL
                } else {
                    0.0
                }
            } else {
                let leader = self.snapshot.leader(i);
                let gap = self.snapshot.gap(&self.ring, i);
                self.model
                    .acceleration(vel, self.snapshot.velocities[leader], gap)
            };
        }
    }

    /// Simultaneous semi-implicit Euler update of the whole fleet.
    fn integrate(&mut self) {
        let dt = self.params.time_step;
        for i in 0..self.fleet.len() {
            let vel = (self.snapshot.velocities[i] + self.accelerations[i] * dt)
                .clamp(0.0, self.params.max_velocity);
            self.fleet.velocities[i] = vel;
            self.fleet.positions[i] = self.ring.wrap(self.snapshot.positions[i] + vel * dt);
        }
    }

    /// Projects overlapping vehicles back behind their leaders.
    ///
    /// A vehicle that would end the step inside its leader is capped to the
    /// leader's speed and shifted backward by the overlap magnitude. The
    /// correction can push a vehicle into the one behind it, so passes repeat
    /// until the ring is clear; since the fleet fits on the ring, N passes
    /// always suffice. This is a projection, not an elastic collision.
    fn resolve_overlaps(&mut self) {
        let n = self.fleet.len();
        for _ in 0..n {
            let mut corrected = false;
            for i in 0..n {
                let overlap = -self.fleet.gap(&self.ring, i);
                if overlap > 0.0 {
                    let leader = self.fleet.leader(i);
                    let leader_vel = self.fleet.velocities[leader];
                    self.fleet.velocities[i] = self.fleet.velocities[i].min(leader_vel);
                    self.fleet.positions[i] = self.ring.wrap(self.fleet.positions[i] - overlap);
                    self.window_corrections += 1;
                    self.total_corrections += 1;
                    corrected = true;
                }
            }
            if !corrected {
                break;
            }
        }
    }

    /// Closes the overlap monitoring window once it spans 10 simulated
    /// seconds, raising a warning when corrections exceeded the allowance.
    fn update_stability_window(&mut self) {
        let window_steps = (WARN_WINDOW_SEC / self.params.time_step).ceil() as usize;
        if self.step - self.window_start < window_steps {
            return;
        }
        let allowed = self.params.overlap_warn_rate * self.fleet.len() as f64 * WARN_WINDOW_SEC;
        if self.window_corrections as f64 > allowed {
            let warning = StabilityWarning {
                window_start: self.window_start as f64 * self.params.time_step,
                window_end: self.step as f64 * self.params.time_step,
                corrections: self.window_corrections,
            };
            log::warn!("{warning}");
            self.warnings.push(warning);
        }
        self.window_start = self.step;
        self.window_corrections = 0;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::params::LeaderStops;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn equispaced_placement_at_equilibrium() {
        let params = Parameters {
            perturbation: 0.0,
            ..Default::default()
        };
        let sim = Simulation::new(params).unwrap();

        let spacing = 230.0 / 22.0;
        for (i, x) in sim.positions().iter().enumerate() {
            assert_approx_eq!(*x, i as f64 * spacing);
        }
        let v_eq = sim.equilibrium_velocity();
        assert!(v_eq > 0.0);
        for v in sim.velocities() {
            assert_eq!(*v, v_eq);
        }
    }

    #[test]
    fn perturbation_is_seeded_and_bounded() {
        let params = Parameters::default();
        let a = Simulation::new(params.clone()).unwrap();
        let b = Simulation::new(params.clone()).unwrap();
        assert_eq!(a.velocities(), b.velocities());

        let v_eq = a.equilibrium_velocity();
        let spread = params.perturbation * v_eq;
        assert!(a
            .velocities()
            .iter()
            .all(|v| (v - v_eq).abs() <= spread + 1e-12));
        // different seed, different draw
        let c = Simulation::new(Parameters {
            seed: 2,
            ..params
        })
        .unwrap();
        assert_ne!(a.velocities(), c.velocities());
    }

    #[test]
    fn invalid_parameters_are_rejected_at_construction() {
        let params = Parameters {
            vehicle_count: 1,
            ..Default::default()
        };
        assert!(matches!(
            Simulation::new(params),
            Err(ConfigurationError::TooFewVehicles(1))
        ));
    }

    #[test]
    fn overlap_resolution_restores_clearance() {
        let mut sim = Simulation::new(Parameters::default()).unwrap();

        // force an overlap: push vehicle 3 into the back of vehicle 4
        let target = sim.fleet.positions[4] - 0.5 * sim.fleet.lengths[4];
        sim.fleet.positions[3] = sim.ring.wrap(target + 1.0);
        sim.fleet.velocities[3] = 10.0;
        assert!(sim.fleet.gap(&sim.ring, 3) < 0.0);

        sim.resolve_overlaps();

        assert!(sim.fleet.gaps(&sim.ring).iter().all(|g| *g >= -1e-9));
        assert!(sim.fleet.velocities[3] <= sim.fleet.velocities[4]);
        assert!(sim.overlap_corrections() > 0);
        assert!(sim.fleet.check_ordering(&sim.ring, 0, 0.0).is_ok());
    }

    #[test]
    fn first_step_from_equilibrium_barely_moves_velocities() {
        let mut sim = Simulation::new(Parameters {
            perturbation: 0.0,
            ..Default::default()
        })
        .unwrap();
        let v_eq = sim.equilibrium_velocity();
        sim.step().unwrap();
        for v in sim.velocities() {
            assert!((v - v_eq).abs() < 1e-6);
        }
    }

    #[test]
    fn stability_warning_raised_when_corrections_exceed_allowance() {
        let mut sim = Simulation::new(Parameters::default()).unwrap();
        let window_steps = (WARN_WINDOW_SEC / sim.params.time_step).ceil() as usize;

        sim.step = window_steps;
        sim.window_corrections = 1000; // allowance is 0.1 * 22 * 10 = 22
        sim.update_stability_window();

        assert_eq!(sim.warnings().len(), 1);
        assert_eq!(sim.warnings()[0].corrections, 1000);
        assert_eq!(sim.window_corrections, 0);
        assert_eq!(sim.window_start, window_steps);
    }

    #[test]
    fn leader_stop_event_overrides_the_model() {
        let mut sim = Simulation::new(Parameters {
            leader_stops: Some(LeaderStops {
                first_stop: 0.0,
                repeat_interval: 1000.0,
                stop_duration: 1000.0,
            }),
            ..Default::default()
        })
        .unwrap();

        // hard braking from the first step until standstill
        for _ in 0..200 {
            sim.step().unwrap();
        }
        assert_eq!(sim.velocities()[0], 0.0);
    }
}
