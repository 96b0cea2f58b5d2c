//! 802.11 Frame Classes
//!
//! IEEE 802.11-2012 §10.3 groups frames into three classes by the station
//! state in which they may be sent. Class 3 frames are only legal once a
//! station is associated, so seeing one is evidence of association even when
//! the association exchange itself was never captured.

use std::collections::HashSet;

use crate::capture::Frame;

use super::ieee80211::{FrameSubtype, MacAddr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FrameClass {
    /// Permitted in any state
    One = 1,
    /// Requires authentication
    Two = 2,
    /// Requires association
    Three = 3,
}

/// Classify a frame.
///
/// `sta_bssids` lists BSSIDs of independent (ad-hoc) networks; data frames
/// exchanged between two of its members are class 1.
pub fn class_of(frame: &Frame, sta_bssids: &HashSet<MacAddr>) -> FrameClass {
    use FrameSubtype::*;

    match frame.subtype {
        Rts | Cts | Ack | CfEnd | CfEndCfAck
        | ProbeRequest | ProbeResponse | Beacon
        | Authentication | Deauthentication | Atim => FrameClass::One,

        AssocRequest | AssocResponse | ReassocRequest | ReassocResponse
        | Disassociation => FrameClass::Two,

        PsPoll | BlockAck | BlockAckRequest => FrameClass::Three,

        // Action frames inside a BSS carry its BSSID; public action frames don't
        Action | ActionNoAck => match frame.bssid {
            Some(bssid) if !bssid.is_broadcast() => FrameClass::Three,
            _ => FrameClass::One,
        },

        s if s.is_data_type() => {
            if is_ibss_exchange(frame, sta_bssids) {
                FrameClass::One
            } else {
                FrameClass::Three
            }
        }

        _ => FrameClass::One,
    }
}

fn is_ibss_exchange(frame: &Frame, sta_bssids: &HashSet<MacAddr>) -> bool {
    if sta_bssids.is_empty() {
        return false;
    }
    match (frame.sender(), frame.recipient()) {
        (Some(a), Some(b)) => sta_bssids.contains(&a) && sta_bssids.contains(&b),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::frame::tests::mac;

    fn frame(code: u16) -> Frame {
        Frame::new(0.0, code, -50.0)
    }

    #[test]
    fn test_class_one_management_and_control() {
        let none = HashSet::new();
        for code in [0x04, 0x05, 0x08, 0x0b, 0x0c, 0x09, 0x1b, 0x1c, 0x1d, 0x1e, 0x1f] {
            assert_eq!(class_of(&frame(code), &none), FrameClass::One, "code {:#x}", code);
        }
    }

    #[test]
    fn test_class_two() {
        let none = HashSet::new();
        for code in [0x00, 0x01, 0x02, 0x03, 0x0a] {
            assert_eq!(class_of(&frame(code), &none), FrameClass::Two, "code {:#x}", code);
        }
    }

    #[test]
    fn test_class_three() {
        let none = HashSet::new();
        for code in [0x20, 0x24, 0x28, 0x2c, 0x1a, 0x18, 0x19] {
            assert_eq!(class_of(&frame(code), &none), FrameClass::Three, "code {:#x}", code);
        }
    }

    #[test]
    fn test_action_depends_on_bssid() {
        let none = HashSet::new();
        let mut action = frame(0x0d);
        assert_eq!(class_of(&action, &none), FrameClass::One);
        action.bssid = Some(mac("00:11:22:33:44:55"));
        assert_eq!(class_of(&action, &none), FrameClass::Three);
    }

    #[test]
    fn test_ibss_data_is_class_one() {
        let a = mac("02:00:00:00:00:01");
        let b = mac("02:00:00:00:00:02");
        let mut data = frame(0x20);
        data.transmitter = Some(a);
        data.receiver = Some(b);

        let ibss: HashSet<MacAddr> = [a, b].into_iter().collect();
        assert_eq!(class_of(&data, &ibss), FrameClass::One);

        let partial: HashSet<MacAddr> = [a].into_iter().collect();
        assert_eq!(class_of(&data, &partial), FrameClass::Three);
    }
}
