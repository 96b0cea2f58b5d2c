//! Frame activity between client and network during the window

use crate::capture::Frame;
use crate::wireless::{class_of, AssociationStatus, FrameClass, FrameSubtype};

use super::computer::{FeatureComputer, FrameCount};
use super::context::WindowContext;
use super::stats::binary;
use super::FeatureId;

pub(crate) fn computers() -> Vec<Box<dyn FeatureComputer>> {
    vec![
        Box::new(NonEmptyDataFramesRate),
        Box::new(SleepFramesBinary),
        Box::new(EmptyNullFramesRate),
        Box::new(AwakeNullFramesRate),
        Box::new(SleepNullFramesRate),
        Box::new(ApDisconnectionFramesBinary),
        Box::new(ClientDisconnectionFramesBinary),
        Box::new(ClientAssociatedBinary),
        Box::new(ClientAssociatedTernary),
        Box::new(Class3FramesCount),
        Box::new(PwrmgtCycleCount),
        Box::new(FramesLossRatio),
        Box::new(ClientFramesRate),
        FrameCount::boxed(FeatureId::NonEmptyDataFramesCount, non_empty_data_frames),
        FrameCount::boxed(FeatureId::SleepFramesCount, sleep_frames),
        FrameCount::boxed(FeatureId::EmptyNullFramesCount, empty_null_frames),
        FrameCount::boxed(FeatureId::AwakeNullFramesCount, |ctx| null_frames_with_pwrmgt(ctx, false)),
        FrameCount::boxed(FeatureId::SleepNullFramesCount, |ctx| null_frames_with_pwrmgt(ctx, true)),
        FrameCount::boxed(FeatureId::ApDisconnectionFramesCount, ap_disconnections),
        FrameCount::boxed(FeatureId::ClientDisconnectionFramesCount, client_disconnections),
        FrameCount::boxed(FeatureId::ApDeauthCount, |ctx| {
            ctx.towards_client().filter(|f| is_deauth(f)).count()
        }),
        FrameCount::boxed(FeatureId::ClientDeauthCount, |ctx| {
            ctx.from_client().filter(|f| is_deauth(f)).count()
        }),
        FrameCount::boxed(FeatureId::AckCount, |ctx| {
            ctx.towards_client().filter(|f| f.subtype == FrameSubtype::Ack).count()
        }),
        FrameCount::boxed(FeatureId::SuccessAssociationResponseCount, |ctx| {
            association_responses(ctx).filter(|f| f.is_success_status()).count()
        }),
        FrameCount::boxed(FeatureId::UnsuccessAssociationResponseCount, |ctx| {
            association_responses(ctx).filter(|f| !f.is_success_status()).count()
        }),
    ]
}

/// Data frames with a payload sent by the client
fn non_empty_data_frames(ctx: &WindowContext<'_>) -> usize {
    ctx.from_client()
        .filter(|f| f.subtype.is_payload_data() && f.payload_len() > 0)
        .count()
}

fn sleep_frames(ctx: &WindowContext<'_>) -> usize {
    ctx.from_client().filter(|f| f.pwrmgt == Some(true)).count()
}

/// Null-function frames without payload sent by the client
fn empty_null_frames(ctx: &WindowContext<'_>) -> usize {
    ctx.from_client()
        .filter(|f| f.subtype.is_null() && f.payload_len() == 0)
        .count()
}

fn null_frames_with_pwrmgt(ctx: &WindowContext<'_>, pwrmgt: bool) -> usize {
    ctx.from_client()
        .filter(|f| f.subtype.is_null() && f.pwrmgt == Some(pwrmgt))
        .count()
}

/// Disassociation or deauthentication addressed to the client
fn ap_disconnections(ctx: &WindowContext<'_>) -> usize {
    ctx.towards_client().filter(|f| f.subtype.is_disconnection()).count()
}

/// Disassociation or deauthentication sent by the client
fn client_disconnections(ctx: &WindowContext<'_>) -> usize {
    ctx.from_client().filter(|f| f.subtype.is_disconnection()).count()
}

fn is_deauth(frame: &Frame) -> bool {
    frame.subtype == FrameSubtype::Deauthentication
}

/// (Re)association responses addressed to the client. A missing status code
/// counts as unsuccessful.
fn association_responses<'a>(ctx: &'a WindowContext<'a>) -> impl Iterator<Item = &'a Frame> + 'a {
    ctx.towards_client().filter(|f| f.subtype.is_association_response())
}

pub struct NonEmptyDataFramesRate;

impl FeatureComputer for NonEmptyDataFramesRate {
    fn id(&self) -> FeatureId {
        FeatureId::NonEmptyDataFramesRate
    }

    fn compute(&self, ctx: &WindowContext<'_>) -> f64 {
        ctx.rate(non_empty_data_frames(ctx))
    }
}

pub struct SleepFramesBinary;

impl FeatureComputer for SleepFramesBinary {
    fn id(&self) -> FeatureId {
        FeatureId::SleepFramesBinary
    }

    fn compute(&self, ctx: &WindowContext<'_>) -> f64 {
        binary(sleep_frames(ctx) > 0)
    }
}

pub struct EmptyNullFramesRate;

impl FeatureComputer for EmptyNullFramesRate {
    fn id(&self) -> FeatureId {
        FeatureId::EmptyNullFramesRate
    }

    fn compute(&self, ctx: &WindowContext<'_>) -> f64 {
        ctx.rate(empty_null_frames(ctx))
    }
}

pub struct AwakeNullFramesRate;

impl FeatureComputer for AwakeNullFramesRate {
    fn id(&self) -> FeatureId {
        FeatureId::AwakeNullFramesRate
    }

    fn compute(&self, ctx: &WindowContext<'_>) -> f64 {
        ctx.rate(null_frames_with_pwrmgt(ctx, false))
    }
}

pub struct SleepNullFramesRate;

impl FeatureComputer for SleepNullFramesRate {
    fn id(&self) -> FeatureId {
        FeatureId::SleepNullFramesRate
    }

    fn compute(&self, ctx: &WindowContext<'_>) -> f64 {
        ctx.rate(null_frames_with_pwrmgt(ctx, true))
    }
}

pub struct ApDisconnectionFramesBinary;

impl FeatureComputer for ApDisconnectionFramesBinary {
    fn id(&self) -> FeatureId {
        FeatureId::ApDisconnectionFramesBinary
    }

    fn compute(&self, ctx: &WindowContext<'_>) -> f64 {
        binary(ap_disconnections(ctx) > 0)
    }
}

pub struct ClientDisconnectionFramesBinary;

impl FeatureComputer for ClientDisconnectionFramesBinary {
    fn id(&self) -> FeatureId {
        FeatureId::ClientDisconnectionFramesBinary
    }

    fn compute(&self, ctx: &WindowContext<'_>) -> f64 {
        binary(client_disconnections(ctx) > 0)
    }
}

pub struct ClientAssociatedBinary;

impl FeatureComputer for ClientAssociatedBinary {
    fn id(&self) -> FeatureId {
        FeatureId::ClientAssociatedBinary
    }

    fn compute(&self, ctx: &WindowContext<'_>) -> f64 {
        binary(ctx.association.is_associated())
    }
}

/// 1 associated, 0 known to be unassociated, 2 unknown
pub struct ClientAssociatedTernary;

impl FeatureComputer for ClientAssociatedTernary {
    fn id(&self) -> FeatureId {
        FeatureId::ClientAssociatedTernary
    }

    fn compute(&self, ctx: &WindowContext<'_>) -> f64 {
        match ctx.association.status {
            AssociationStatus::Associated => 1.0,
            AssociationStatus::Unassociated => 0.0,
            AssociationStatus::Unknown => 2.0,
        }
    }
}

pub struct Class3FramesCount;

impl FeatureComputer for Class3FramesCount {
    fn id(&self) -> FeatureId {
        FeatureId::Class3FramesCount
    }

    fn compute(&self, ctx: &WindowContext<'_>) -> f64 {
        ctx.window_frames
            .iter()
            .filter(|f| f.is_from(&ctx.client) || f.is_towards(&ctx.client))
            .filter(|f| class_of(f, ctx.sta_bssids) == FrameClass::Three)
            .count() as f64
    }
}

/// Power-management cycles: a frame with the bit set followed later by one
/// with it cleared.
pub struct PwrmgtCycleCount;

impl FeatureComputer for PwrmgtCycleCount {
    fn id(&self) -> FeatureId {
        FeatureId::PwrmgtCycleCount
    }

    fn compute(&self, ctx: &WindowContext<'_>) -> f64 {
        let mut cycles = 0u32;
        let mut dozing = false;
        for bit in ctx.from_client().filter_map(|f| f.pwrmgt) {
            if bit {
                dozing = true;
            } else if dozing {
                cycles += 1;
                dozing = false;
            }
        }
        cycles as f64
    }
}

/// Share of client frames with the retry bit set; -1 without any known
/// retry bit.
pub struct FramesLossRatio;

impl FeatureComputer for FramesLossRatio {
    fn id(&self) -> FeatureId {
        FeatureId::FramesLossRatio
    }

    fn compute(&self, ctx: &WindowContext<'_>) -> f64 {
        let (mut total, mut retried) = (0usize, 0usize);
        for retry in ctx.from_client().filter_map(|f| f.retry) {
            total += 1;
            if retry {
                retried += 1;
            }
        }
        if total == 0 {
            return -1.0;
        }
        retried as f64 / total as f64
    }
}

pub struct ClientFramesRate;

impl FeatureComputer for ClientFramesRate {
    fn id(&self) -> FeatureId {
        FeatureId::ClientFramesRate
    }

    fn compute(&self, ctx: &WindowContext<'_>) -> f64 {
        ctx.rate(ctx.from_client().count())
    }
}
