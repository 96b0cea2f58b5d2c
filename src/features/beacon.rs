//! Beacon reception from the associated AP

use std::collections::HashMap;

use crate::capture::Frame;
use crate::wireless::MacAddr;

use super::computer::FeatureComputer;
use super::context::WindowContext;
use super::stats;
use super::FeatureId;

pub(crate) fn computers() -> Vec<Box<dyn FeatureComputer>> {
    vec![Box::new(MaxConsecutiveBeaconLoss), Box::new(BeaconsLinearSlopeDifference)]
}

/// Whole-capture beacon-count slope (beacons per second) per AP
#[derive(Debug, Clone, Default)]
pub struct BeaconTrends {
    slopes: HashMap<MacAddr, f64>,
}

impl BeaconTrends {
    /// Fit the running beacon count of each AP against time over `frames`.
    pub fn from_frames(frames: &[Frame], access_points: &[MacAddr]) -> Self {
        let slopes = access_points
            .iter()
            .map(|ap| {
                let epochs: Vec<f64> = frames
                    .iter()
                    .filter(|f| f.is_beacon_of(ap))
                    .map(|f| f.time_epoch)
                    .collect();
                (*ap, stats::cumulative_count_slope(&epochs))
            })
            .filter(|(_, slope)| slope.is_finite())
            .collect();
        Self { slopes }
    }

    pub fn slope(&self, ap: &MacAddr) -> Option<f64> {
        self.slopes.get(ap).copied()
    }

    pub fn len(&self) -> usize {
        self.slopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slopes.is_empty()
    }
}

fn window_beacons(ctx: &WindowContext<'_>, ap: &MacAddr) -> Vec<f64> {
    ctx.window_frames
        .iter()
        .filter(|f| f.is_beacon_of(ap))
        .map(|f| f.time_epoch)
        .collect()
}

/// Longest run of consecutive missed beacons.
///
/// Expected beacon times step by `interval` from the first observed beacon
/// up to (excluding) `end`. A slot is received when some observed beacon
/// lies strictly closer than `interval`, and lost otherwise. `observed`
/// must be ascending.
pub fn max_consecutive_loss(observed: &[f64], end: f64, interval: f64) -> u32 {
    let Some(&first) = observed.first() else {
        return 0;
    };
    if interval <= 0.0 {
        return 0;
    }

    let mut longest = 0u32;
    let mut run = 0u32;
    let mut k = 0u64;
    loop {
        let expected = first + k as f64 * interval;
        if expected >= end {
            break;
        }
        if nearest_distance(observed, expected) < interval {
            run = 0;
        } else {
            run += 1;
            longest = longest.max(run);
        }
        k += 1;
    }
    longest
}

fn nearest_distance(sorted: &[f64], x: f64) -> f64 {
    let idx = sorted.partition_point(|v| *v < x);
    let above = sorted.get(idx).map(|v| v - x);
    let below = idx.checked_sub(1).and_then(|i| sorted.get(i)).map(|v| x - v);
    match (above, below) {
        (Some(a), Some(b)) => a.min(b),
        (Some(a), None) => a,
        (None, Some(b)) => b,
        (None, None) => f64::INFINITY,
    }
}

/// -1 when the client has no associated AP or none of its beacons were
/// observed in the window.
pub struct MaxConsecutiveBeaconLoss;

impl FeatureComputer for MaxConsecutiveBeaconLoss {
    fn id(&self) -> FeatureId {
        FeatureId::MaxConsecutiveBeaconLossCount
    }

    fn compute(&self, ctx: &WindowContext<'_>) -> f64 {
        let Some(ap) = ctx.associated_ap() else {
            return -1.0;
        };
        let beacons = window_beacons(ctx, &ap);
        if beacons.is_empty() {
            return -1.0;
        }
        max_consecutive_loss(&beacons, ctx.window.end, ctx.beacon_interval) as f64
    }
}

/// |whole-capture slope - window slope| of the associated AP's running
/// beacon count; -1 when unassociated, 0 with fewer than two beacons in the
/// window.
pub struct BeaconsLinearSlopeDifference;

impl FeatureComputer for BeaconsLinearSlopeDifference {
    fn id(&self) -> FeatureId {
        FeatureId::BeaconsLinearSlopeDifference
    }

    fn compute(&self, ctx: &WindowContext<'_>) -> f64 {
        let Some(ap) = ctx.associated_ap() else {
            return -1.0;
        };
        let beacons = window_beacons(ctx, &ap);
        if beacons.len() < 2 {
            return 0.0;
        }
        let local = stats::cumulative_count_slope(&beacons);
        let global = ctx.beacon_trends.slope(&ap).unwrap_or(local);
        (global - local).abs()
    }
}
