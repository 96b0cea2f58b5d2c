//! Window Feature Engine
//!
//! Each feature is a [`FeatureComputer`] evaluated against a
//! [`WindowContext`]. Features report `NaN` when they cannot be computed and
//! the record must be dropped, or a domain sentinel (`-1`) when they are
//! merely inapplicable.
//!
//! Column order is fixed by [`FeatureId::ALL`]. Most `__binary` and
//! `__rate` features have a `__count` companion over the same frames.

use std::fmt;
use std::str::FromStr;

use crate::error::AscanError;

pub mod stats;
pub mod context;
pub mod computer;
pub mod signal;
pub mod activity;
pub mod beacon;
pub mod connection;
pub mod probe;

pub use computer::{FeatureComputer, FeatureRegistry, FrameCount};
pub use context::WindowContext;
pub use beacon::BeaconTrends;
pub use connection::ConnectionMatches;

/// Time horizons (seconds) for matching connection frames to episodes
pub const CONNECTION_HORIZONS: [f64; 3] = [1.0, 3.0, 5.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeatureId {
    RssiMean,
    RssiStddev,
    RssiLinslope,
    NonEmptyDataFramesRate,
    SleepFramesBinary,
    EmptyNullFramesRate,
    AssociatedProbeRequestsBinary,
    MaxConsecutiveBeaconLossCount,
    AwakeNullFramesRate,
    SleepNullFramesRate,
    ApDisconnectionFramesBinary,
    ClientDisconnectionFramesBinary,
    ConnectionRequest1,
    ConnectionRequest3,
    ConnectionRequest5,
    ConnectionResponse1,
    ConnectionResponse3,
    ConnectionResponse5,
    ConnectionSuccessResponse1,
    ConnectionSuccessResponse3,
    ConnectionSuccessResponse5,
    ClientAssociatedBinary,
    DirectedProbeRequestsBinary,
    BroadcastedProbeRequestsBinary,
    Class3FramesCount,
    PwrmgtCycleCount,
    FramesLossRatio,
    ClientFramesRate,
    BeaconsLinearSlopeDifference,
    NonEmptyDataFramesCount,
    SleepFramesCount,
    EmptyNullFramesCount,
    AwakeNullFramesCount,
    SleepNullFramesCount,
    ApDisconnectionFramesCount,
    ClientDisconnectionFramesCount,
    ApDeauthCount,
    ClientDeauthCount,
    AckCount,
    DirectedProbeRequestsCount,
    BroadcastedProbeRequestsCount,
    ClientAssociatedTernary,
    SuccessAssociationResponseCount,
    UnsuccessAssociationResponseCount,
    ConnectionRequestCount1,
    ConnectionRequestCount3,
    ConnectionRequestCount5,
    ConnectionResponseCount1,
    ConnectionResponseCount3,
    ConnectionResponseCount5,
    ConnectionSuccessResponseCount1,
    ConnectionSuccessResponseCount3,
    ConnectionSuccessResponseCount5,
}

impl FeatureId {
    pub const ALL: [FeatureId; 53] = [
        FeatureId::RssiMean,
        FeatureId::RssiStddev,
        FeatureId::RssiLinslope,
        FeatureId::NonEmptyDataFramesRate,
        FeatureId::SleepFramesBinary,
        FeatureId::EmptyNullFramesRate,
        FeatureId::AssociatedProbeRequestsBinary,
        FeatureId::MaxConsecutiveBeaconLossCount,
        FeatureId::AwakeNullFramesRate,
        FeatureId::SleepNullFramesRate,
        FeatureId::ApDisconnectionFramesBinary,
        FeatureId::ClientDisconnectionFramesBinary,
        FeatureId::ConnectionRequest1,
        FeatureId::ConnectionRequest3,
        FeatureId::ConnectionRequest5,
        FeatureId::ConnectionResponse1,
        FeatureId::ConnectionResponse3,
        FeatureId::ConnectionResponse5,
        FeatureId::ConnectionSuccessResponse1,
        FeatureId::ConnectionSuccessResponse3,
        FeatureId::ConnectionSuccessResponse5,
        FeatureId::ClientAssociatedBinary,
        FeatureId::DirectedProbeRequestsBinary,
        FeatureId::BroadcastedProbeRequestsBinary,
        FeatureId::Class3FramesCount,
        FeatureId::PwrmgtCycleCount,
        FeatureId::FramesLossRatio,
        FeatureId::ClientFramesRate,
        FeatureId::BeaconsLinearSlopeDifference,
        FeatureId::NonEmptyDataFramesCount,
        FeatureId::SleepFramesCount,
        FeatureId::EmptyNullFramesCount,
        FeatureId::AwakeNullFramesCount,
        FeatureId::SleepNullFramesCount,
        FeatureId::ApDisconnectionFramesCount,
        FeatureId::ClientDisconnectionFramesCount,
        FeatureId::ApDeauthCount,
        FeatureId::ClientDeauthCount,
        FeatureId::AckCount,
        FeatureId::DirectedProbeRequestsCount,
        FeatureId::BroadcastedProbeRequestsCount,
        FeatureId::ClientAssociatedTernary,
        FeatureId::SuccessAssociationResponseCount,
        FeatureId::UnsuccessAssociationResponseCount,
        FeatureId::ConnectionRequestCount1,
        FeatureId::ConnectionRequestCount3,
        FeatureId::ConnectionRequestCount5,
        FeatureId::ConnectionResponseCount1,
        FeatureId::ConnectionResponseCount3,
        FeatureId::ConnectionResponseCount5,
        FeatureId::ConnectionSuccessResponseCount1,
        FeatureId::ConnectionSuccessResponseCount3,
        FeatureId::ConnectionSuccessResponseCount5,
    ];

    /// Output column name
    pub fn name(&self) -> &'static str {
        match self {
            FeatureId::RssiMean => "rssi__mean",
            FeatureId::RssiStddev => "rssi__stddev",
            FeatureId::RssiLinslope => "rssi__linslope",
            FeatureId::NonEmptyDataFramesRate => "non_empty_data_frames__rate",
            FeatureId::SleepFramesBinary => "sleep_frames__binary",
            FeatureId::EmptyNullFramesRate => "empty_null_frames__rate",
            FeatureId::AssociatedProbeRequestsBinary => "associated_probe_requests__binary",
            FeatureId::MaxConsecutiveBeaconLossCount => "max_consecutive_beacon_loss__count",
            FeatureId::AwakeNullFramesRate => "awake_null_frames__rate",
            FeatureId::SleepNullFramesRate => "sleep_null_frames__rate",
            FeatureId::ApDisconnectionFramesBinary => "ap_disconnection_frames__binary",
            FeatureId::ClientDisconnectionFramesBinary => "client_disconnection_frames__binary",
            FeatureId::ConnectionRequest1 => "client_connection_request_frames__binary_1",
            FeatureId::ConnectionRequest3 => "client_connection_request_frames__binary_3",
            FeatureId::ConnectionRequest5 => "client_connection_request_frames__binary_5",
            FeatureId::ConnectionResponse1 => "client_connection_response_frames__binary_1",
            FeatureId::ConnectionResponse3 => "client_connection_response_frames__binary_3",
            FeatureId::ConnectionResponse5 => "client_connection_response_frames__binary_5",
            FeatureId::ConnectionSuccessResponse1 => "client_connection_success_response_frames__binary_1",
            FeatureId::ConnectionSuccessResponse3 => "client_connection_success_response_frames__binary_3",
            FeatureId::ConnectionSuccessResponse5 => "client_connection_success_response_frames__binary_5",
            FeatureId::ClientAssociatedBinary => "client_associated__binary",
            FeatureId::DirectedProbeRequestsBinary => "directed_probe_requests__binary",
            FeatureId::BroadcastedProbeRequestsBinary => "broadcasted_probe_requests__binary",
            FeatureId::Class3FramesCount => "class_3_frames__count",
            FeatureId::PwrmgtCycleCount => "pwrmgt_cycle__count",
            FeatureId::FramesLossRatio => "frames__loss_ratio",
            FeatureId::ClientFramesRate => "client_frames__rate",
            FeatureId::BeaconsLinearSlopeDifference => "beacons_linear_slope__difference",
            FeatureId::NonEmptyDataFramesCount => "non_empty_data_frames__count",
            FeatureId::SleepFramesCount => "sleep_frames__count",
            FeatureId::EmptyNullFramesCount => "empty_null_frames__count",
            FeatureId::AwakeNullFramesCount => "awake_null_frames__count",
            FeatureId::SleepNullFramesCount => "sleep_null_frames__count",
            FeatureId::ApDisconnectionFramesCount => "ap_disconnection_frames__count",
            FeatureId::ClientDisconnectionFramesCount => "client_disconnection_frames__count",
            FeatureId::ApDeauthCount => "ap_deauth__count",
            FeatureId::ClientDeauthCount => "client_deauth__count",
            FeatureId::AckCount => "ack__count",
            FeatureId::DirectedProbeRequestsCount => "directed_probe_requests__count",
            FeatureId::BroadcastedProbeRequestsCount => "broadcasted_probe_requests__count",
            FeatureId::ClientAssociatedTernary => "client_associated__ternary",
            FeatureId::SuccessAssociationResponseCount => "success_association_response__count",
            FeatureId::UnsuccessAssociationResponseCount => "unsuccess_association_response__count",
            FeatureId::ConnectionRequestCount1 => "client_connection_request_frames__count_1",
            FeatureId::ConnectionRequestCount3 => "client_connection_request_frames__count_3",
            FeatureId::ConnectionRequestCount5 => "client_connection_request_frames__count_5",
            FeatureId::ConnectionResponseCount1 => "client_connection_response_frames__count_1",
            FeatureId::ConnectionResponseCount3 => "client_connection_response_frames__count_3",
            FeatureId::ConnectionResponseCount5 => "client_connection_response_frames__count_5",
            FeatureId::ConnectionSuccessResponseCount1 => "client_connection_success_response_frames__count_1",
            FeatureId::ConnectionSuccessResponseCount3 => "client_connection_success_response_frames__count_3",
            FeatureId::ConnectionSuccessResponseCount5 => "client_connection_success_response_frames__count_5",
        }
    }

    /// Position in the fixed column order
    pub fn position(&self) -> usize {
        Self::ALL.iter().position(|id| id == self).unwrap_or(Self::ALL.len())
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FeatureId {
    type Err = AscanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        FeatureId::ALL
            .iter()
            .copied()
            .find(|id| id.name() == s)
            .ok_or_else(|| AscanError::UnknownFeature(s.to_string()))
    }
}

/// Ordered selection of features to compute and write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSet {
    ids: Vec<FeatureId>,
}

impl Default for FeatureSet {
    fn default() -> Self {
        Self::all()
    }
}

impl FeatureSet {
    pub fn all() -> Self {
        Self {
            ids: FeatureId::ALL.to_vec(),
        }
    }

    /// Select features by column name. An empty list selects everything.
    /// The result is in column order regardless of the order given.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> crate::error::Result<Self> {
        if names.is_empty() {
            return Ok(Self::all());
        }
        let mut ids = names
            .iter()
            .map(|n| n.as_ref().parse::<FeatureId>())
            .collect::<crate::error::Result<Vec<_>>>()?;
        ids.sort_by_key(FeatureId::position);
        ids.dedup();
        Ok(Self { ids })
    }

    pub fn ids(&self) -> &[FeatureId] {
        &self.ids
    }

    pub fn contains(&self, id: FeatureId) -> bool {
        self.ids.contains(&id)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.ids.iter().map(FeatureId::name).collect()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip_and_unique() {
        let mut seen = std::collections::HashSet::new();
        for id in FeatureId::ALL {
            assert!(seen.insert(id.name()), "duplicate {}", id);
            assert_eq!(id.name().parse::<FeatureId>().unwrap(), id);
        }
    }

    #[test]
    fn test_unknown_feature() {
        let err = "rssi__median".parse::<FeatureId>().unwrap_err();
        assert!(matches!(err, AscanError::UnknownFeature(name) if name == "rssi__median"));
    }

    #[test]
    fn test_feature_set_keeps_column_order() {
        let set = FeatureSet::from_names(&["client_associated__binary", "rssi__mean", "rssi__mean"]).unwrap();
        assert_eq!(set.ids(), &[FeatureId::RssiMean, FeatureId::ClientAssociatedBinary]);
        assert_eq!(FeatureSet::from_names::<&str>(&[]).unwrap().len(), FeatureId::ALL.len());
    }

    #[test]
    fn test_count_companions_are_selectable() {
        let set = FeatureSet::from_names(&[
            "client_connection_request_frames__count_3",
            "client_associated__ternary",
            "ack__count",
        ])
        .unwrap();
        assert_eq!(
            set.ids(),
            &[FeatureId::AckCount, FeatureId::ClientAssociatedTernary, FeatureId::ConnectionRequestCount3]
        );
    }
}
