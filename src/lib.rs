pub use cgmath;
pub use diagnostics::{HeadwayHistogram, JamRegion, VehiclePhase};
pub use error::{ConfigurationError, OrderingFault, StabilityWarning};
pub use export::{frame_circle_coords, Point2d, TrajectoryArrays};
pub use params::{LeaderStops, Parameters};
pub use ring::Ring;
pub use simulation::{RunOutcome, Simulation};
pub use trajectory::TrajectoryBuffer;
pub use util::Interval;

mod debug;
pub mod diagnostics;
mod error;
mod export;
mod fleet;
mod params;
mod ring;
mod simulation;
mod trajectory;
mod util;
