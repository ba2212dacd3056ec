//! Derived measurements over a recorded trajectory.
//!
//! Everything in this module is a pure function of a [TrajectoryBuffer]
//! and the [Parameters] the run was configured with.

use crate::fleet::idm::{AccelerationModel, GAP_EPSILON};
use crate::params::Parameters;
use crate::trajectory::TrajectoryBuffer;
use crate::util::{linear_fit, Interval};
use itertools::{Itertools, MinMaxResult};
use smallvec::SmallVec;
use std::ops::Range;

/// Velocity below which a vehicle counts as stopped, in m/s.
const STOPPED_VEL: f64 = 1e-9;

/// Interaction strength `(s*/s)^2` below which a vehicle counts as free.
const FREE_INTERACTION: f64 = 0.1;

/// Largest centre displacement between consecutive frames that still links
/// two jam arcs into the same region, as a fraction of the circumference.
const LINK_TOLERANCE: f64 = 0.25;

/// The observable driving regime of a single vehicle.
///
/// Derived from the recorded state, never stored by the integrator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VehiclePhase {
    /// Gap large, accelerating toward the desired speed.
    Free,
    /// Gap near the dynamic desired gap, acceleration near zero.
    Following,
    /// Gap below the desired gap, braking dominates.
    Braking,
    /// At standstill; exits as soon as the gap opens.
    Stopped,
}

/// The mean-field flux `Q(t) = (1/L) Σ v_i(t)` per sampled frame, in
/// vehicles per second.
pub fn flow_rate(buffer: &TrajectoryBuffer) -> Vec<f64> {
    let l = buffer.ring().circumference();
    (0..buffer.frame_count())
        .map(|frame| buffer.velocity_frame(frame).iter().sum::<f64>() / l)
        .collect()
}

/// The per-frame variance of the vehicle velocities, in (m/s)^2.
pub fn velocity_variance(buffer: &TrajectoryBuffer) -> Vec<f64> {
    (0..buffer.frame_count())
        .map(|frame| {
            let vels = buffer.velocity_frame(frame);
            let mean = vels.iter().sum::<f64>() / vels.len() as f64;
            vels.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / vels.len() as f64
        })
        .collect()
}

/// The space-time field: every sampled position together with its
/// `frames × vehicles` shape.
pub fn space_time(buffer: &TrajectoryBuffer) -> (&[f64], usize, usize) {
    (
        buffer.positions(),
        buffer.frame_count(),
        buffer.vehicle_count(),
    )
}

/// The smallest interval covering every recorded headway.
pub fn headway_range(buffer: &TrajectoryBuffer) -> Interval<f64> {
    match buffer.headways().into_iter().minmax() {
        MinMaxResult::NoElements => Interval::new(0.0, 0.0),
        MinMaxResult::OneElement(s) => Interval::new(s, s),
        MinMaxResult::MinMax(min, max) => Interval::new(min, max),
    }
}

/// A time × bin heatmap of headway counts.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct HeadwayHistogram {
    /// The headway range covered by the bins.
    pub range: Interval<f64>,
    /// The number of fixed-width bins.
    pub bins: usize,
    /// The first frame of the accumulation window.
    pub first_frame: usize,
    /// Row-major counts, one row of `bins` values per frame in the window.
    pub counts: Vec<u32>,
}

impl HeadwayHistogram {
    /// The counts of one frame's row.
    pub fn frame_row(&self, frame: usize) -> &[u32] {
        let row = frame - self.first_frame;
        &self.counts[row * self.bins..(row + 1) * self.bins]
    }
}

/// Bins the N gap values of every frame in `frames` into a fixed-width
/// histogram. Headways outside `range` are not counted.
pub fn headway_histogram(
    buffer: &TrajectoryBuffer,
    bins: usize,
    range: Interval<f64>,
    frames: Range<usize>,
) -> HeadwayHistogram {
    assert!(bins > 0, "histogram needs at least one bin");
    let first_frame = frames.start;
    let mut counts = vec![0u32; bins * frames.len()];

    for (row, frame) in frames.enumerate() {
        for headway in buffer.headway_frame(frame) {
            if range.contains(headway) {
                let bin = ((range.inv_lerp(headway) * bins as f64) as usize).min(bins - 1);
                counts[row * bins + bin] += 1;
            }
        }
    }

    HeadwayHistogram {
        range,
        bins,
        first_frame,
        counts,
    }
}

/// Classifies every vehicle of one frame into its driving regime.
pub fn vehicle_phases(
    buffer: &TrajectoryBuffer,
    params: &Parameters,
    frame: usize,
) -> Vec<VehiclePhase> {
    let model = AccelerationModel::from_params(params);
    let vels = buffer.velocity_frame(frame);
    let gaps = buffer.headway_frame(frame);
    let n = buffer.vehicle_count();

    (0..n)
        .map(|i| {
            let vel = vels[i];
            if vel < STOPPED_VEL {
                return VehiclePhase::Stopped;
            }
            let leader_vel = vels[(i + 1) % n];
            let desired = model.desired_gap(vel, vel - leader_vel);
            let gap = gaps[i].max(GAP_EPSILON);
            if gap < desired {
                VehiclePhase::Braking
            } else if (desired / gap).powi(2) < FREE_INTERACTION {
                VehiclePhase::Free
            } else {
                VehiclePhase::Following
            }
        })
        .collect()
}

/// The number of jammed vehicles per sampled frame.
pub fn congestion_count(buffer: &TrajectoryBuffer, params: &Parameters) -> Vec<usize> {
    let jam_vel = params.jam_velocity();
    (0..buffer.frame_count())
        .map(|frame| {
            buffer
                .velocity_frame(frame)
                .iter()
                .filter(|v| **v < jam_vel)
                .count()
        })
        .collect()
}

/// A jam tracked across consecutive sampled frames.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct JamRegion {
    /// First sampled frame at which the jam was present.
    pub first_frame: usize,
    /// Last sampled frame at which the jam was present, inclusive.
    pub last_frame: usize,
    /// The jam centre per covered frame, unwrapped so that it may leave
    /// `[0, L)`; consecutive values differ by the signed centre motion.
    pub centres: Vec<f64>,
    /// The number of member vehicles per covered frame.
    pub sizes: Vec<usize>,
}

impl JamRegion {
    /// The number of frames the jam was tracked for.
    pub fn frame_span(&self) -> usize {
        self.last_frame - self.first_frame + 1
    }

    /// Whether the jam ever spanned the whole fleet.
    pub fn covers_fleet(&self, vehicle_count: usize) -> bool {
        self.sizes.iter().any(|size| *size == vehicle_count)
    }
}

/// A contiguous arc of slow vehicles within one frame.
#[derive(Clone, Copy, Debug)]
struct JamArc {
    /// The number of member vehicles.
    size: usize,
    /// The circular mean position of the members.
    centre: f64,
}

/// A region still being extended by the frame scan.
struct ActiveRegion {
    region: JamRegion,
    /// The wrapped centre at the region's last frame.
    wrapped_centre: f64,
    /// Whether the current frame extended the region.
    extended: bool,
}

/// Detects jam regions over the whole trajectory.
///
/// Per frame, vehicles slower than the jam threshold form maximal contiguous
/// arcs along the ring; arcs of at least `jam_min_vehicles` members are jams.
/// Arcs of consecutive frames are linked into regions by nearest centre.
pub fn jam_regions(buffer: &TrajectoryBuffer, params: &Parameters) -> Vec<JamRegion> {
    let ring = *buffer.ring();
    let link_tol = LINK_TOLERANCE * ring.circumference();
    let mut active: Vec<ActiveRegion> = Vec::new();
    let mut finished: Vec<JamRegion> = Vec::new();

    for frame in 0..buffer.frame_count() {
        let arcs = frame_jam_arcs(buffer, params, frame);

        for slot in &mut active {
            slot.extended = false;
        }
        for arc in arcs {
            // nearest still-open region within the linking tolerance
            let nearest = active
                .iter()
                .enumerate()
                .filter(|(_, slot)| !slot.extended)
                .map(|(idx, slot)| {
                    let shift = ring.signed_difference(slot.wrapped_centre, arc.centre);
                    (idx, shift.abs(), shift)
                })
                .min_by(|a, b| a.1.total_cmp(&b.1));

            match nearest {
                Some((idx, dist, shift)) if dist <= link_tol => {
                    let slot = &mut active[idx];
                    let unwrapped = slot.region.centres.last().copied().unwrap_or(arc.centre);
                    slot.region.centres.push(unwrapped + shift);
                    slot.region.sizes.push(arc.size);
                    slot.region.last_frame = frame;
                    slot.wrapped_centre = arc.centre;
                    slot.extended = true;
                }
                _ => active.push(ActiveRegion {
                    region: JamRegion {
                        first_frame: frame,
                        last_frame: frame,
                        centres: vec![arc.centre],
                        sizes: vec![arc.size],
                    },
                    wrapped_centre: arc.centre,
                    extended: true,
                }),
            }
        }

        // regions not extended this frame have dissolved
        let mut kept = Vec::with_capacity(active.len());
        for slot in active.drain(..) {
            if slot.extended {
                kept.push(slot);
            } else {
                finished.push(slot.region);
            }
        }
        active = kept;
    }

    finished.extend(active.into_iter().map(|slot| slot.region));
    finished.sort_by_key(|region| (region.first_frame, region.last_frame));
    finished
}

/// The propagation velocity of a jam in m/s, from a least-squares fit of
/// its unwrapped centre against time.
///
/// A backward-travelling wave gives a negative slope. `None` when the jam
/// was too short-lived to fit.
pub fn jam_wave_velocity(buffer: &TrajectoryBuffer, region: &JamRegion) -> Option<f64> {
    if region.frame_span() < 2 {
        return None;
    }
    let times = &buffer.times()[region.first_frame..=region.last_frame];
    linear_fit(times, &region.centres)
}

/// Finds the maximal contiguous arcs of jammed vehicles within one frame.
fn frame_jam_arcs(
    buffer: &TrajectoryBuffer,
    params: &Parameters,
    frame: usize,
) -> SmallVec<[JamArc; 2]> {
    let jam_vel = params.jam_velocity();
    let k_min = params.jam_min_vehicles;
    let vels = buffer.velocity_frame(frame);
    let n = buffer.vehicle_count();
    let slow: Vec<bool> = vels.iter().map(|v| *v < jam_vel).collect();

    let mut arcs = SmallVec::new();

    let origin = match slow.iter().position(|s| !*s) {
        Some(origin) => origin,
        None => {
            // the whole fleet is jammed: a single arc covering the ring
            if n >= k_min {
                arcs.push(make_arc(buffer, frame, 0, n));
            }
            return arcs;
        }
    };

    // walk the ring starting just past a fast vehicle so that no arc is
    // split across the index seam
    let mut run_start = None;
    let mut run_len = 0;
    for k in 1..=n {
        let i = (origin + k) % n;
        if slow[i] {
            run_start.get_or_insert(i);
            run_len += 1;
        } else if let Some(start) = run_start.take() {
            if run_len >= k_min {
                arcs.push(make_arc(buffer, frame, start, run_len));
            }
            run_len = 0;
        }
    }
    // the walk ends on `origin`, which is fast, so no run is left open
    arcs
}

/// Builds an arc record with the circular mean of its member positions,
/// computed from signed differences about the first member.
fn make_arc(buffer: &TrajectoryBuffer, frame: usize, start: usize, size: usize) -> JamArc {
    let ring = buffer.ring();
    let xs = buffer.position_frame(frame);
    let n = buffer.vehicle_count();
    let anchor = xs[start];
    let mean_offset = (0..size)
        .map(|k| ring.signed_difference(anchor, xs[(start + k) % n]))
        .sum::<f64>()
        / size as f64;
    JamArc {
        size,
        centre: ring.wrap(anchor + mean_offset),
    }
}
