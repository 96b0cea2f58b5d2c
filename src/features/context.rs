//! Evaluation context for one (client, window, episode) triple

use std::collections::HashSet;

use crate::capture::Frame;
use crate::episode::{Episode, Window};
use crate::wireless::{AssociationRecord, MacAddr};

use super::beacon::BeaconTrends;
use super::connection::ConnectionMatches;

/// Everything a feature may look at.
///
/// Frame slices are time-ascending. `association` is the client's state
/// after replaying every frame up to the end of the window.
#[derive(Debug, Clone, Copy)]
pub struct WindowContext<'a> {
    pub client: MacAddr,
    pub window: &'a Window,
    pub episode: &'a Episode,
    pub window_frames: &'a [&'a Frame],
    pub episode_frames: &'a [&'a Frame],
    pub association: &'a AssociationRecord,
    pub connections: &'a ConnectionMatches,
    pub beacon_trends: &'a BeaconTrends,
    /// Expected beacon spacing, seconds
    pub beacon_interval: f64,
    pub sta_bssids: &'a HashSet<MacAddr>,
}

impl<'a> WindowContext<'a> {
    /// Window frames sent by the client
    pub fn from_client(&self) -> impl Iterator<Item = &'a Frame> + '_ {
        self.window_frames
            .iter()
            .copied()
            .filter(move |f| f.is_from(&self.client))
    }

    /// Window frames addressed to the client
    pub fn towards_client(&self) -> impl Iterator<Item = &'a Frame> + '_ {
        self.window_frames
            .iter()
            .copied()
            .filter(move |f| f.is_towards(&self.client))
    }

    /// Probe requests the client sent during the episode
    pub fn episode_probe_requests(&self) -> impl Iterator<Item = &'a Frame> + '_ {
        self.episode_frames
            .iter()
            .copied()
            .filter(move |f| f.is_probe_request() && f.is_from(&self.client))
    }

    pub fn window_duration(&self) -> f64 {
        self.window.duration()
    }

    pub fn associated_ap(&self) -> Option<MacAddr> {
        if self.association.is_associated() {
            self.association.associated_ap
        } else {
            None
        }
    }

    /// `count / window duration`, NaN for an empty window
    pub fn rate(&self, count: usize) -> f64 {
        let duration = self.window_duration();
        if duration == 0.0 || !duration.is_finite() {
            return f64::NAN;
        }
        count as f64 / duration
    }
}
