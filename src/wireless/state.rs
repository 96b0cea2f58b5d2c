//! Association State Tracking
//!
//! Tracks, per client, whether it is associated with an access point and
//! with which one. The state is inferred by replaying frames in time order.

use std::collections::{HashMap, HashSet};

use tracing::trace;

use crate::capture::Frame;

use super::class::{class_of, FrameClass};
use super::ieee80211::MacAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssociationStatus {
    /// No evidence either way
    #[default]
    Unknown,
    Associated,
    Unassociated,
}

/// Association state of one client
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AssociationRecord {
    pub status: AssociationStatus,
    /// Currently associated AP, set only while `Associated`
    pub associated_ap: Option<MacAddr>,
    /// Evidence count per BSSID since the last disconnection, first-seen order
    tallies: Vec<(MacAddr, u64)>,
}

impl AssociationRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_associated(&self) -> bool {
        self.status == AssociationStatus::Associated
    }

    /// BSSIDs with association evidence since the last disconnection, with
    /// their frame counts.
    pub fn candidates(&self) -> &[(MacAddr, u64)] {
        &self.tallies
    }

    /// More than one AP is plausible for the client.
    pub fn is_ambiguous(&self) -> bool {
        self.tallies.len() > 1
    }

    /// Replay `frames` (time-ascending) for `client`.
    pub fn replay<'a, I>(&mut self, client: &MacAddr, frames: I, sta_bssids: &HashSet<MacAddr>)
    where
        I: IntoIterator<Item = &'a Frame>,
    {
        for frame in frames {
            self.observe(client, frame, sta_bssids);
        }
    }

    /// Apply a single frame.
    pub fn observe(&mut self, client: &MacAddr, frame: &Frame, sta_bssids: &HashSet<MacAddr>) {
        match evidence_of(client, frame, sta_bssids) {
            Evidence::Associate(ap) => self.associate(ap),
            Evidence::Disconnect => {
                self.disconnect();
                trace!(client = %client, epoch = frame.time_epoch, "disconnected");
            }
            Evidence::None => {}
        }
    }

    fn associate(&mut self, ap: MacAddr) {
        match self.tallies.iter_mut().find(|(b, _)| *b == ap) {
            Some((_, count)) => *count += 1,
            None => self.tallies.push((ap, 1)),
        }

        // Majority vote; ties keep the earliest-seen BSSID
        let mut best: Option<(MacAddr, u64)> = None;
        for &(bssid, count) in &self.tallies {
            if best.map_or(true, |(_, c)| count > c) {
                best = Some((bssid, count));
            }
        }

        self.status = AssociationStatus::Associated;
        self.associated_ap = best.map(|(bssid, _)| bssid);
    }

    fn disconnect(&mut self) {
        self.status = AssociationStatus::Unassociated;
        self.associated_ap = None;
        self.tallies.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Evidence {
    None,
    Associate(MacAddr),
    Disconnect,
}

/// What a frame says about the client's association.
///
/// Association requests from the client and class 3 frames to or from it
/// point at the frame's BSSID (or the peer when the BSSID is absent).
/// Disassociation and deauthentication in either direction end it.
fn evidence_of(client: &MacAddr, frame: &Frame, sta_bssids: &HashSet<MacAddr>) -> Evidence {
    let from = frame.is_from(client);
    let towards = frame.is_towards(client);
    if !from && !towards {
        return Evidence::None;
    }

    if frame.subtype.is_disconnection() {
        return Evidence::Disconnect;
    }

    let associating = (from && frame.subtype.is_association_request())
        || class_of(frame, sta_bssids) == FrameClass::Three;
    if !associating {
        return Evidence::None;
    }

    let peer = if from { frame.recipient() } else { frame.sender() };
    match frame.bssid.filter(|b| !b.is_broadcast()).or(peer) {
        Some(ap) if ap != *client && !ap.is_broadcast() => Evidence::Associate(ap),
        _ => Evidence::None,
    }
}

/// Association evidence count per BSSID over a whole frame sequence,
/// ignoring disconnections. Sorted by count (descending), ties in
/// first-seen order.
pub fn association_candidates<'a, I>(
    client: &MacAddr,
    frames: I,
    sta_bssids: &HashSet<MacAddr>,
) -> Vec<(MacAddr, u64)>
where
    I: IntoIterator<Item = &'a Frame>,
{
    let mut tallies: Vec<(MacAddr, u64)> = Vec::new();
    for frame in frames {
        if let Evidence::Associate(ap) = evidence_of(client, frame, sta_bssids) {
            match tallies.iter_mut().find(|(b, _)| *b == ap) {
                Some((_, count)) => *count += 1,
                None => tallies.push((ap, 1)),
            }
        }
    }
    tallies.sort_by(|a, b| b.1.cmp(&a.1));
    tallies
}

/// Per-run store of association records, keyed by client.
#[derive(Debug, Default)]
pub struct AssociationStateStore {
    records: HashMap<MacAddr, AssociationRecord>,
    /// BSSIDs of independent networks, for the class predicate
    sta_bssids: HashSet<MacAddr>,
}

impl AssociationStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sta_bssids(sta_bssids: HashSet<MacAddr>) -> Self {
        Self {
            records: HashMap::new(),
            sta_bssids,
        }
    }

    pub fn sta_bssids(&self) -> &HashSet<MacAddr> {
        &self.sta_bssids
    }

    /// Replay a chunk of the client's frames in time order.
    pub fn replay<'a, I>(&mut self, client: &MacAddr, frames: I)
    where
        I: IntoIterator<Item = &'a Frame>,
    {
        let record = self.records.entry(*client).or_default();
        record.replay(client, frames, &self.sta_bssids);
    }

    pub fn record(&self, client: &MacAddr) -> Option<&AssociationRecord> {
        self.records.get(client)
    }

    pub fn status(&self, client: &MacAddr) -> AssociationStatus {
        self.records.get(client).map(|r| r.status).unwrap_or_default()
    }

    pub fn associated_ap(&self, client: &MacAddr) -> Option<MacAddr> {
        self.records.get(client).and_then(|r| r.associated_ap)
    }

    pub fn is_associated(&self, client: &MacAddr) -> bool {
        self.status(client) == AssociationStatus::Associated
    }

    /// Detach a client's record so it can be updated independently.
    pub fn take(&mut self, client: &MacAddr) -> AssociationRecord {
        self.records.remove(client).unwrap_or_default()
    }

    /// Put back a record previously detached with [`take`](Self::take).
    pub fn insert(&mut self, client: MacAddr, record: AssociationRecord) {
        self.records.insert(client, record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::frame::tests::mac;

    const CLIENT: &str = "c0:ee:fb:30:d7:17";
    const AP_A: &str = "00:11:22:33:44:aa";
    const AP_B: &str = "00:11:22:33:44:bb";

    fn uplink(t: f64, code: u16, ap: &str) -> Frame {
        let mut f = Frame::new(t, code, -50.0);
        f.source = Some(mac(CLIENT));
        f.transmitter = Some(mac(CLIENT));
        f.receiver = Some(mac(ap));
        f.bssid = Some(mac(ap));
        f
    }

    fn downlink(t: f64, code: u16, ap: &str) -> Frame {
        let mut f = Frame::new(t, code, -50.0);
        f.transmitter = Some(mac(ap));
        f.destination = Some(mac(CLIENT));
        f.receiver = Some(mac(CLIENT));
        f.bssid = Some(mac(ap));
        f
    }

    #[test]
    fn test_unknown_without_evidence() {
        let mut store = AssociationStateStore::new();
        let client = mac(CLIENT);
        store.replay(&client, &[uplink(1.0, 0x04, AP_A)]);
        assert_eq!(store.status(&client), AssociationStatus::Unknown);
        assert_eq!(store.associated_ap(&client), None);
    }

    #[test]
    fn test_class3_frame_associates() {
        let mut store = AssociationStateStore::new();
        let client = mac(CLIENT);
        store.replay(&client, &[downlink(1.0, 0x28, AP_A)]);
        assert!(store.is_associated(&client));
        assert_eq!(store.associated_ap(&client), Some(mac(AP_A)));
    }

    #[test]
    fn test_association_request_then_deauth() {
        let mut store = AssociationStateStore::new();
        let client = mac(CLIENT);
        store.replay(&client, &[uplink(1.0, 0x00, AP_A), downlink(2.0, 0x0c, AP_A)]);
        assert_eq!(store.status(&client), AssociationStatus::Unassociated);
        assert_eq!(store.associated_ap(&client), None);
    }

    #[test]
    fn test_majority_vote() {
        let mut store = AssociationStateStore::new();
        let client = mac(CLIENT);
        let frames = vec![
            uplink(1.0, 0x24, AP_B),
            uplink(1.1, 0x24, AP_A),
            uplink(1.2, 0x24, AP_A),
            uplink(1.3, 0x24, AP_A),
        ];
        store.replay(&client, &frames);
        assert_eq!(store.associated_ap(&client), Some(mac(AP_A)));
        assert!(store.record(&client).unwrap().is_ambiguous());
    }

    #[test]
    fn test_tie_goes_to_first_seen() {
        let mut store = AssociationStateStore::new();
        let client = mac(CLIENT);
        store.replay(&client, &[uplink(1.0, 0x24, AP_B), uplink(1.1, 0x24, AP_A)]);
        assert_eq!(store.associated_ap(&client), Some(mac(AP_B)));
    }

    #[test]
    fn test_replay_is_chunking_invariant() {
        let client = mac(CLIENT);
        let frames = vec![
            uplink(1.0, 0x24, AP_B),
            uplink(1.1, 0x24, AP_A),
            downlink(1.2, 0x0a, AP_B),
            uplink(1.3, 0x02, AP_A),
            uplink(1.4, 0x28, AP_B),
            uplink(1.5, 0x28, AP_A),
        ];

        let mut whole = AssociationStateStore::new();
        whole.replay(&client, &frames);

        for split in 0..=frames.len() {
            let mut chunked = AssociationStateStore::new();
            chunked.replay(&client, &frames[..split]);
            chunked.replay(&client, &frames[split..]);
            assert_eq!(chunked.record(&client), whole.record(&client), "split at {}", split);
        }
    }

    #[test]
    fn test_candidates_ignore_disconnection() {
        let client = mac(CLIENT);
        let frames = vec![
            uplink(1.0, 0x24, AP_B),
            downlink(1.1, 0x0c, AP_B),
            uplink(1.2, 0x28, AP_A),
            uplink(1.3, 0x28, AP_A),
            uplink(1.4, 0x28, AP_A),
            uplink(1.5, 0x04, AP_B),
        ];
        let candidates = association_candidates(&client, &frames, &HashSet::new());
        assert_eq!(candidates, vec![(mac(AP_A), 3), (mac(AP_B), 1)]);
    }

    #[test]
    fn test_take_and_insert() {
        let mut store = AssociationStateStore::new();
        let client = mac(CLIENT);
        let mut record = store.take(&client);
        record.replay(&client, &[downlink(1.0, 0x20, AP_A)], &HashSet::new());
        store.insert(client, record);
        assert_eq!(store.associated_ap(&client), Some(mac(AP_A)));
        assert_eq!(store.len(), 1);
    }
}
