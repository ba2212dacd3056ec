//! Error and warning types surfaced by the simulation.

use thiserror::Error;

/// A parameter set that cannot produce a valid simulation.
///
/// Returned at construction; no simulation begins.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("ring circumference must be positive, got {0}")]
    NonPositiveCircumference(f64),

    #[error("at least 2 vehicles are required, got {0}")]
    TooFewVehicles(usize),

    #[error("vehicle length must be positive, got {0}")]
    NonPositiveVehicleLength(f64),

    #[error("{count} vehicles of length {length} m do not fit on a {circumference} m ring")]
    InfeasiblePlacement {
        count: usize,
        length: f64,
        circumference: f64,
    },

    #[error("time step must be positive, got {0}")]
    NonPositiveTimeStep(f64),

    #[error("duration must be positive, got {0}")]
    NonPositiveDuration(f64),

    #[error("desired velocity must be positive, got {0}")]
    NonPositiveVelocity(f64),

    #[error("maximum acceleration must be positive, got {0}")]
    NonPositiveAcceleration(f64),

    #[error("comfortable deceleration must be positive, got {0}")]
    NonPositiveDeceleration(f64),

    #[error("minimum spacing must be non-negative, got {0}")]
    NegativeSpacing(f64),

    #[error("time headway must be non-negative, got {0}")]
    NegativeHeadway(f64),

    #[error("sample cadence must be at least 1 step")]
    ZeroSampleCadence,

    #[error("perturbation amplitude must be non-negative, got {0}")]
    NegativePerturbation(f64),

    #[error("leader stop schedule needs a non-negative first stop and positive interval and duration")]
    InvalidLeaderStops,

    #[error("parameter `{0}` must be finite")]
    NonFinite(&'static str),
}

/// The no-overtaking invariant was violated mid-run.
///
/// This is fatal: the driver aborts and returns the trajectory truncated
/// at the last valid sample, together with this marker.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("vehicle ordering violated at t = {time:.3} s (step {step})")]
pub struct OrderingFault {
    /// The step at which the violation was detected.
    pub step: usize,
    /// The simulated time in s.
    pub time: f64,
}

/// Overlap corrections exceeded the configured rate over one monitoring
/// window, indicating the step size or model parameters are inadequate.
///
/// Non-fatal; warnings accumulate on the simulation handle.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error(
    "{corrections} overlap corrections in t = [{window_start:.0}, {window_end:.0}] s; \
     the time step or model parameters are likely inadequate"
)]
pub struct StabilityWarning {
    /// Start of the monitoring window in s.
    pub window_start: f64,
    /// End of the monitoring window in s.
    pub window_end: f64,
    /// Number of overlap corrections within the window.
    pub corrections: usize,
}
