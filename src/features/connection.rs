//! (Re)association exchanges near each episode
//!
//! Every association request sent by the client and every response it
//! receives is matched to the episode whose mean probe-request time is
//! nearest (ties go to the earlier episode). The match counts when that
//! distance is within the horizon. Matching runs once per client over all of
//! its episodes, so a frame is never credited to two episodes.

use crate::capture::Frame;
use crate::wireless::MacAddr;

use super::computer::FeatureComputer;
use super::context::WindowContext;
use super::stats::binary;
use super::{FeatureId, CONNECTION_HORIZONS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionKind {
    /// (Re)association request from the client
    Request,
    /// (Re)association response to the client
    Response,
    /// Response with status 0
    SuccessResponse,
}

impl ConnectionKind {
    pub const ALL: [ConnectionKind; 3] = [
        ConnectionKind::Request,
        ConnectionKind::Response,
        ConnectionKind::SuccessResponse,
    ];

    fn index(self) -> usize {
        self as usize
    }

    pub fn matches(self, frame: &Frame, client: &MacAddr) -> bool {
        match self {
            ConnectionKind::Request => {
                frame.is_from(client) && frame.subtype.is_association_request()
            }
            ConnectionKind::Response => {
                frame.is_towards(client) && frame.subtype.is_association_response()
            }
            ConnectionKind::SuccessResponse => {
                frame.is_towards(client)
                    && frame.subtype.is_association_response()
                    && frame.is_success_status()
            }
        }
    }
}

/// Matched connection frames per kind, horizon and episode
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionMatches {
    /// `counts[kind][horizon][episode index]`
    counts: [[Vec<u32>; 3]; 3],
}

impl ConnectionMatches {
    /// Match the client's connection frames against episode mean epochs
    /// (in episode id order).
    pub fn compute<'a, I>(client: &MacAddr, frames: I, episode_means: &[f64]) -> Self
    where
        I: IntoIterator<Item = &'a Frame>,
    {
        let mut matches = Self::default();
        for kind_counts in matches.counts.iter_mut() {
            for horizon_counts in kind_counts.iter_mut() {
                *horizon_counts = vec![0; episode_means.len()];
            }
        }
        if episode_means.is_empty() {
            return matches;
        }

        for frame in frames {
            let Some((episode, delta)) = nearest(episode_means, frame.time_epoch) else {
                continue;
            };
            for kind in ConnectionKind::ALL {
                if !kind.matches(frame, client) {
                    continue;
                }
                for (h, horizon) in CONNECTION_HORIZONS.iter().enumerate() {
                    if delta <= *horizon {
                        matches.counts[kind.index()][h][episode] += 1;
                    }
                }
            }
        }
        matches
    }

    /// Frames of `kind` matched to episode `episode_id` within horizon index
    /// `horizon`.
    pub fn count(&self, kind: ConnectionKind, horizon: usize, episode_id: u32) -> u32 {
        let Some(idx) = (episode_id as usize).checked_sub(1) else {
            return 0;
        };
        self.counts[kind.index()]
            .get(horizon)
            .and_then(|per_episode| per_episode.get(idx))
            .copied()
            .unwrap_or(0)
    }
}

/// Index of the nearest mean and its distance; the first wins ties.
fn nearest(means: &[f64], epoch: f64) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (i, mean) in means.iter().enumerate() {
        let delta = (mean - epoch).abs();
        if best.map_or(true, |(_, d)| delta < d) {
            best = Some((i, delta));
        }
    }
    best
}

pub(crate) fn computers() -> Vec<Box<dyn FeatureComputer>> {
    use FeatureId::*;
    // (kind, binary ids per horizon, count ids per horizon)
    let ids = [
        (
            ConnectionKind::Request,
            [ConnectionRequest1, ConnectionRequest3, ConnectionRequest5],
            [ConnectionRequestCount1, ConnectionRequestCount3, ConnectionRequestCount5],
        ),
        (
            ConnectionKind::Response,
            [ConnectionResponse1, ConnectionResponse3, ConnectionResponse5],
            [ConnectionResponseCount1, ConnectionResponseCount3, ConnectionResponseCount5],
        ),
        (
            ConnectionKind::SuccessResponse,
            [ConnectionSuccessResponse1, ConnectionSuccessResponse3, ConnectionSuccessResponse5],
            [
                ConnectionSuccessResponseCount1,
                ConnectionSuccessResponseCount3,
                ConnectionSuccessResponseCount5,
            ],
        ),
    ];

    let mut computers: Vec<Box<dyn FeatureComputer>> = Vec::new();
    for (kind, binaries, counts) in ids {
        for horizon in 0..CONNECTION_HORIZONS.len() {
            computers.push(Box::new(ConnectionFrames {
                id: binaries[horizon],
                kind,
                horizon,
                presence: true,
            }));
            computers.push(Box::new(ConnectionFrames {
                id: counts[horizon],
                kind,
                horizon,
                presence: false,
            }));
        }
    }
    computers
}

/// Connection frames of `kind` matched to this episode: their number, or
/// whether there are any.
pub struct ConnectionFrames {
    id: FeatureId,
    kind: ConnectionKind,
    horizon: usize,
    presence: bool,
}

impl FeatureComputer for ConnectionFrames {
    fn id(&self) -> FeatureId {
        self.id
    }

    fn compute(&self, ctx: &WindowContext<'_>) -> f64 {
        let count = ctx.connections.count(self.kind, self.horizon, ctx.episode.id);
        if self.presence {
            binary(count > 0)
        } else {
            count as f64
        }
    }
}
