//! Frame records loaded from a frame table

use crate::wireless::{FrameSubtype, MacAddr};

/// One captured 802.11 frame after loading and normalization.
///
/// Every frame carries exactly one scalar `time_epoch` and `rssi`; rows that
/// cannot provide both never become a `Frame`.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Row position in the source table (0-based, header excluded)
    pub row: usize,
    pub time_epoch: f64,
    /// Raw `type_subtype` code as read from the table
    pub type_subtype: u16,
    pub subtype: FrameSubtype,
    pub source: Option<MacAddr>,
    pub destination: Option<MacAddr>,
    pub transmitter: Option<MacAddr>,
    pub receiver: Option<MacAddr>,
    pub bssid: Option<MacAddr>,
    /// Union of all addresses carried by the frame (`wlan.addr`)
    pub addrs: Vec<MacAddr>,
    pub retry: Option<bool>,
    pub pwrmgt: Option<bool>,
    /// dBm, averaged over receive antennas
    pub rssi: f64,
    pub data_len: Option<u32>,
    pub status_code: Option<u16>,
    pub datarate: Option<f64>,
}

impl Frame {
    /// A frame with only timing, subtype and signal set.
    pub fn new(time_epoch: f64, type_subtype: u16, rssi: f64) -> Self {
        Self {
            row: 0,
            time_epoch,
            type_subtype,
            subtype: FrameSubtype::from_code(type_subtype),
            source: None,
            destination: None,
            transmitter: None,
            receiver: None,
            bssid: None,
            addrs: Vec::new(),
            retry: None,
            pwrmgt: None,
            rssi,
            data_len: None,
            status_code: None,
            datarate: None,
        }
    }

    /// Frame originates at `mac` (source or transmitter address).
    pub fn is_from(&self, mac: &MacAddr) -> bool {
        !mac.is_broadcast()
            && (self.source.as_ref() == Some(mac) || self.transmitter.as_ref() == Some(mac))
    }

    /// Frame is directed at `mac` (destination or receiver address).
    pub fn is_towards(&self, mac: &MacAddr) -> bool {
        !mac.is_broadcast()
            && (self.destination.as_ref() == Some(mac) || self.receiver.as_ref() == Some(mac))
    }

    /// Any address on the frame equals `mac`. Broadcast never matches.
    pub fn involves(&self, mac: &MacAddr) -> bool {
        if mac.is_broadcast() {
            return false;
        }
        self.addrs.contains(mac)
            || [self.source, self.destination, self.transmitter, self.receiver, self.bssid]
                .iter()
                .any(|a| a.as_ref() == Some(mac))
    }

    pub fn is_probe_request(&self) -> bool {
        self.subtype == FrameSubtype::ProbeRequest
    }

    pub fn is_beacon(&self) -> bool {
        self.subtype == FrameSubtype::Beacon
    }

    /// Sender of the frame: the transmitter, else the source address.
    pub fn sender(&self) -> Option<MacAddr> {
        self.transmitter.or(self.source)
    }

    /// Recipient of the frame: the receiver, else the destination address.
    pub fn recipient(&self) -> Option<MacAddr> {
        self.receiver.or(self.destination)
    }

    /// Beacon announced by `ap` (BSSID or transmitter).
    pub fn is_beacon_of(&self, ap: &MacAddr) -> bool {
        self.is_beacon()
            && !ap.is_broadcast()
            && (self.bssid.as_ref() == Some(ap) || self.transmitter.as_ref() == Some(ap))
    }

    /// Payload length, with a missing `data.len` counted as empty.
    pub fn payload_len(&self) -> u32 {
        self.data_len.unwrap_or(0)
    }

    pub fn is_success_status(&self) -> bool {
        self.status_code == Some(0)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn mac(s: &str) -> MacAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_direction_predicates() {
        let client = mac("c0:ee:fb:30:d7:17");
        let ap = mac("00:11:22:33:44:55");

        let mut frame = Frame::new(1.0, 0x24, -40.0);
        frame.source = Some(client);
        frame.receiver = Some(ap);
        frame.bssid = Some(ap);

        assert!(frame.is_from(&client));
        assert!(!frame.is_towards(&client));
        assert!(frame.is_towards(&ap));
        assert!(frame.involves(&ap));
        assert!(!frame.involves(&MacAddr::BROADCAST));
        assert_eq!(frame.sender(), Some(client));
    }

    #[test]
    fn test_broadcast_never_matches() {
        let mut frame = Frame::new(1.0, 0x04, -40.0);
        frame.destination = Some(MacAddr::BROADCAST);
        frame.addrs = vec![MacAddr::BROADCAST];
        assert!(!frame.is_towards(&MacAddr::BROADCAST));
        assert!(!frame.involves(&MacAddr::BROADCAST));
    }

    #[test]
    fn test_beacon_of() {
        let ap = mac("00:11:22:33:44:55");
        let mut beacon = Frame::new(1.0, 0x08, -60.0);
        beacon.transmitter = Some(ap);
        assert!(beacon.is_beacon_of(&ap));
        assert!(!beacon.is_beacon_of(&mac("00:11:22:33:44:56")));
    }
}
