//! Relevance filtering and client/AP discovery

use std::collections::{BTreeSet, HashSet};

use crate::wireless::MacAddr;

use super::frame::Frame;

/// Keep frames that involve one of `clients`, plus beacons.
///
/// With `access_points` given, only beacons announced by one of them are
/// kept; without it, every beacon is. The broadcast address never matches.
pub fn relevance_filter(
    frames: Vec<Frame>,
    clients: &HashSet<MacAddr>,
    access_points: Option<&HashSet<MacAddr>>,
) -> Vec<Frame> {
    frames
        .into_iter()
        .filter(|frame| is_relevant(frame, clients, access_points))
        .collect()
}

fn is_relevant(
    frame: &Frame,
    clients: &HashSet<MacAddr>,
    access_points: Option<&HashSet<MacAddr>>,
) -> bool {
    if clients.iter().any(|c| frame.involves(c)) {
        return true;
    }
    if !frame.is_beacon() {
        return false;
    }
    match access_points {
        Some(aps) => aps.iter().any(|ap| frame.is_beacon_of(ap)),
        None => true,
    }
}

/// Every station that sent a probe request, sorted. Group addresses are
/// never stations.
pub fn all_clients(frames: &[Frame]) -> Vec<MacAddr> {
    let clients: BTreeSet<MacAddr> = frames
        .iter()
        .filter(|f| f.is_probe_request())
        .flat_map(|f| [f.source, f.transmitter])
        .flatten()
        .filter(|mac| !mac.is_multicast())
        .collect();
    clients.into_iter().collect()
}

/// Every BSSID announced in a beacon, sorted.
pub fn all_access_points(frames: &[Frame]) -> Vec<MacAddr> {
    let aps: BTreeSet<MacAddr> = frames
        .iter()
        .filter(|f| f.is_beacon())
        .filter_map(|f| f.bssid.or(f.transmitter))
        .filter(|mac| !mac.is_broadcast())
        .collect();
    aps.into_iter().collect()
}

/// Frames relevant to a single client: everything involving the client,
/// plus beacons from `access_points` (all beacons when empty).
pub fn client_scope<'a>(frames: &'a [Frame], client: &MacAddr, access_points: &[MacAddr]) -> Vec<&'a Frame> {
    frames
        .iter()
        .filter(|frame| {
            if frame.involves(client) {
                return true;
            }
            frame.is_beacon()
                && (access_points.is_empty() || access_points.iter().any(|ap| frame.is_beacon_of(ap)))
        })
        .collect()
}
