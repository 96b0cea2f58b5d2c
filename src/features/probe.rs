//! Probe requests of the episode itself

use super::computer::{FeatureComputer, FrameCount};
use super::context::WindowContext;
use super::stats::binary;
use super::FeatureId;

pub(crate) fn computers() -> Vec<Box<dyn FeatureComputer>> {
    vec![
        Box::new(AssociatedProbeRequestsBinary),
        Box::new(DirectedProbeRequestsBinary),
        Box::new(BroadcastedProbeRequestsBinary),
        FrameCount::boxed(FeatureId::DirectedProbeRequestsCount, directed_probe_requests),
        FrameCount::boxed(FeatureId::BroadcastedProbeRequestsCount, broadcasted_probe_requests),
    ]
}

/// Episode probe requests naming a specific BSSID
fn directed_probe_requests(ctx: &WindowContext<'_>) -> usize {
    ctx.episode_probe_requests()
        .filter(|f| f.bssid.map_or(false, |b| !b.is_broadcast()))
        .count()
}

/// Episode probe requests to the wildcard BSSID
fn broadcasted_probe_requests(ctx: &WindowContext<'_>) -> usize {
    ctx.episode_probe_requests()
        .filter(|f| f.bssid.map_or(false, |b| b.is_broadcast()))
        .count()
}

/// Episode probe requests directed at the AP the client is associated with;
/// 0 when unassociated.
pub struct AssociatedProbeRequestsBinary;

impl FeatureComputer for AssociatedProbeRequestsBinary {
    fn id(&self) -> FeatureId {
        FeatureId::AssociatedProbeRequestsBinary
    }

    fn compute(&self, ctx: &WindowContext<'_>) -> f64 {
        let Some(ap) = ctx.associated_ap() else {
            return 0.0;
        };
        binary(ctx.episode_probe_requests().any(|f| {
            f.bssid == Some(ap) || f.destination == Some(ap) || f.receiver == Some(ap)
        }))
    }
}

pub struct DirectedProbeRequestsBinary;

impl FeatureComputer for DirectedProbeRequestsBinary {
    fn id(&self) -> FeatureId {
        FeatureId::DirectedProbeRequestsBinary
    }

    fn compute(&self, ctx: &WindowContext<'_>) -> f64 {
        binary(directed_probe_requests(ctx) > 0)
    }
}

pub struct BroadcastedProbeRequestsBinary;

impl FeatureComputer for BroadcastedProbeRequestsBinary {
    fn id(&self) -> FeatureId {
        FeatureId::BroadcastedProbeRequestsBinary
    }

    fn compute(&self, ctx: &WindowContext<'_>) -> f64 {
        binary(broadcasted_probe_requests(ctx) > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::frame::tests::mac;
    use crate::capture::Frame;
    use crate::features::context::tests::Fixture;
    use crate::wireless::MacAddr;

    const CLIENT: &str = "c0:ee:fb:30:d7:17";
    const AP: &str = "00:11:22:33:44:55";

    fn probe(t: f64, bssid: MacAddr) -> Frame {
        let mut f = Frame::new(t, 0x04, -50.0);
        f.source = Some(mac(CLIENT));
        f.transmitter = Some(mac(CLIENT));
        f.destination = Some(bssid);
        f.bssid = Some(bssid);
        f
    }

    #[test]
    fn test_broadcast_and_directed() {
        let mut fixture = Fixture::new(mac(CLIENT), 0.0, 10.0);
        fixture.episode_frames = vec![probe(10.0, MacAddr::BROADCAST)];
        fixture.with(|ctx| {
            assert_eq!(BroadcastedProbeRequestsBinary.compute(ctx), 1.0);
            assert_eq!(DirectedProbeRequestsBinary.compute(ctx), 0.0);
            assert_eq!(AssociatedProbeRequestsBinary.compute(ctx), 0.0);
        });
    }

    #[test]
    fn test_probe_to_associated_ap() {
        let client = mac(CLIENT);
        let mut fixture = Fixture::new(client, 0.0, 10.0);
        fixture.episode_frames = vec![probe(10.0, mac(AP))];

        // Not associated yet
        fixture.with(|ctx| assert_eq!(AssociatedProbeRequestsBinary.compute(ctx), 0.0));

        let mut data = Frame::new(5.0, 0x28, -50.0);
        data.source = Some(client);
        data.bssid = Some(mac(AP));
        fixture.association.replay(&client, &[data], &Default::default());
        fixture.with(|ctx| {
            assert_eq!(AssociatedProbeRequestsBinary.compute(ctx), 1.0);
            assert_eq!(DirectedProbeRequestsBinary.compute(ctx), 1.0);
        });
    }

    #[test]
    fn test_probe_request_counts() {
        let mut fixture = Fixture::new(mac(CLIENT), 0.0, 10.0);
        fixture.episode_frames = vec![
            probe(10.0, MacAddr::BROADCAST),
            probe(10.1, mac(AP)),
            probe(10.2, MacAddr::BROADCAST),
        ];
        let features = computers();
        let value = |id: FeatureId, ctx: &WindowContext<'_>| {
            features.iter().find(|c| c.id() == id).map(|c| c.compute(ctx)).unwrap()
        };
        fixture.with(|ctx| {
            assert_eq!(value(FeatureId::BroadcastedProbeRequestsCount, ctx), 2.0);
            assert_eq!(value(FeatureId::DirectedProbeRequestsCount, ctx), 1.0);
        });
    }
}
