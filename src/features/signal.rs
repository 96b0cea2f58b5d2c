//! Signal strength of frames the client sent

use super::computer::FeatureComputer;
use super::context::WindowContext;
use super::stats;
use super::FeatureId;

pub(crate) fn computers() -> Vec<Box<dyn FeatureComputer>> {
    vec![Box::new(RssiMean), Box::new(RssiStddev), Box::new(RssiLinslope)]
}

fn client_rssi(ctx: &WindowContext<'_>) -> (Vec<f64>, Vec<f64>) {
    ctx.from_client().map(|f| (f.time_epoch, f.rssi)).unzip()
}

pub struct RssiMean;

impl FeatureComputer for RssiMean {
    fn id(&self) -> FeatureId {
        FeatureId::RssiMean
    }

    fn compute(&self, ctx: &WindowContext<'_>) -> f64 {
        let (_, rssi) = client_rssi(ctx);
        stats::mean(&rssi)
    }
}

pub struct RssiStddev;

impl FeatureComputer for RssiStddev {
    fn id(&self) -> FeatureId {
        FeatureId::RssiStddev
    }

    fn compute(&self, ctx: &WindowContext<'_>) -> f64 {
        let (_, rssi) = client_rssi(ctx);
        stats::std_dev(&rssi)
    }
}

/// dBm per second
pub struct RssiLinslope;

impl FeatureComputer for RssiLinslope {
    fn id(&self) -> FeatureId {
        FeatureId::RssiLinslope
    }

    fn compute(&self, ctx: &WindowContext<'_>) -> f64 {
        let (epochs, rssi) = client_rssi(ctx);
        stats::linear_slope(&epochs, &rssi)
    }
}
