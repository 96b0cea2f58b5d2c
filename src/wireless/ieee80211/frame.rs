//! 802.11 Addressing and Frame Subtypes
//!
//! MAC addresses and the combined `type_subtype` code that packet dissectors
//! report for every captured frame (`type << 4 | subtype`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// MAC address (6 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MacAddr([u8; 6]);

impl MacAddr {
    pub const BROADCAST: MacAddr = MacAddr([0xff, 0xff, 0xff, 0xff, 0xff, 0xff]);

    pub fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }

    pub fn is_broadcast(&self) -> bool {
        self.0 == [0xff, 0xff, 0xff, 0xff, 0xff, 0xff]
    }

    /// Group address (broadcast included)
    pub fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 != 0
    }

    /// Parse an optional textual address, treating empty or malformed text
    /// as absent.
    pub fn parse_opt(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        text.parse().ok()
    }

    /// Parse a comma-joined address list (`wlan.addr`), skipping malformed
    /// entries and duplicates while keeping first-seen order.
    pub fn parse_list(text: &str) -> Vec<Self> {
        let mut addrs: Vec<Self> = Vec::new();
        for part in text.split(',') {
            if let Some(addr) = Self::parse_opt(part) {
                if !addrs.contains(&addr) {
                    addrs.push(addr);
                }
            }
        }
        addrs
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.0[0], self.0[1], self.0[2],
            self.0[3], self.0[4], self.0[5])
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseMacError(String);

impl fmt::Display for ParseMacError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid MAC address: {}", self.0)
    }
}

impl std::error::Error for ParseMacError {}

impl FromStr for MacAddr {
    type Err = ParseMacError;

    /// Accepts `aa:bb:cc:dd:ee:ff` and `aa-bb-cc-dd-ee-ff`, any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let mut bytes = [0u8; 6];
        let mut count = 0;

        for part in s.split(|c| c == ':' || c == '-') {
            if count == 6 || part.len() != 2 {
                return Err(ParseMacError(s.to_string()));
            }
            bytes[count] = u8::from_str_radix(part, 16)
                .map_err(|_| ParseMacError(s.to_string()))?;
            count += 1;
        }

        if count != 6 {
            return Err(ParseMacError(s.to_string()));
        }
        Ok(Self(bytes))
    }
}

impl Serialize for MacAddr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MacAddr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Frame type (2 bits)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    Management = 0,
    Control = 1,
    Data = 2,
    Extension = 3,
}

impl From<u8> for FrameType {
    fn from(val: u8) -> Self {
        match val & 0x03 {
            0 => FrameType::Management,
            1 => FrameType::Control,
            2 => FrameType::Data,
            _ => FrameType::Extension,
        }
    }
}

/// Frame subtype, numbered by the combined `type_subtype` code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameSubtype {
    // Management subtypes
    AssocRequest = 0x00,
    AssocResponse = 0x01,
    ReassocRequest = 0x02,
    ReassocResponse = 0x03,
    ProbeRequest = 0x04,
    ProbeResponse = 0x05,
    TimingAdvertisement = 0x06,
    Beacon = 0x08,
    Atim = 0x09,
    Disassociation = 0x0a,
    Authentication = 0x0b,
    Deauthentication = 0x0c,
    Action = 0x0d,
    ActionNoAck = 0x0e,

    // Control subtypes
    CtrlWrapper = 0x17,
    BlockAckRequest = 0x18,
    BlockAck = 0x19,
    PsPoll = 0x1a,
    Rts = 0x1b,
    Cts = 0x1c,
    Ack = 0x1d,
    CfEnd = 0x1e,
    CfEndCfAck = 0x1f,

    // Data subtypes
    Data = 0x20,
    DataCfAck = 0x21,
    DataCfPoll = 0x22,
    DataCfAckCfPoll = 0x23,
    Null = 0x24,
    NullCfAck = 0x25,
    NullCfPoll = 0x26,
    NullCfAckCfPoll = 0x27,
    QosData = 0x28,
    QosDataCfAck = 0x29,
    QosDataCfPoll = 0x2a,
    QosDataCfAckCfPoll = 0x2b,
    QosNull = 0x2c,
    QosNullCfAck = 0x2d,
    QosNullCfPoll = 0x2e,
    QosNullCfAckCfPoll = 0x2f,

    Unknown = 0xff,
}

impl FrameSubtype {
    /// Map a combined `type_subtype` code to a subtype.
    pub fn from_code(code: u16) -> Self {
        if code > 0x3f {
            return FrameSubtype::Unknown;
        }
        let frame_type = FrameType::from((code >> 4) as u8);
        Self::from_raw(frame_type, (code & 0x0f) as u8)
    }

    pub fn from_raw(frame_type: FrameType, subtype: u8) -> Self {
        let sub = subtype & 0x0f;
        match frame_type {
            FrameType::Management => match sub {
                0 => FrameSubtype::AssocRequest,
                1 => FrameSubtype::AssocResponse,
                2 => FrameSubtype::ReassocRequest,
                3 => FrameSubtype::ReassocResponse,
                4 => FrameSubtype::ProbeRequest,
                5 => FrameSubtype::ProbeResponse,
                6 => FrameSubtype::TimingAdvertisement,
                8 => FrameSubtype::Beacon,
                9 => FrameSubtype::Atim,
                10 => FrameSubtype::Disassociation,
                11 => FrameSubtype::Authentication,
                12 => FrameSubtype::Deauthentication,
                13 => FrameSubtype::Action,
                14 => FrameSubtype::ActionNoAck,
                _ => FrameSubtype::Unknown,
            },
            FrameType::Control => match sub {
                7 => FrameSubtype::CtrlWrapper,
                8 => FrameSubtype::BlockAckRequest,
                9 => FrameSubtype::BlockAck,
                10 => FrameSubtype::PsPoll,
                11 => FrameSubtype::Rts,
                12 => FrameSubtype::Cts,
                13 => FrameSubtype::Ack,
                14 => FrameSubtype::CfEnd,
                15 => FrameSubtype::CfEndCfAck,
                _ => FrameSubtype::Unknown,
            },
            FrameType::Data => match sub {
                0 => FrameSubtype::Data,
                1 => FrameSubtype::DataCfAck,
                2 => FrameSubtype::DataCfPoll,
                3 => FrameSubtype::DataCfAckCfPoll,
                4 => FrameSubtype::Null,
                5 => FrameSubtype::NullCfAck,
                6 => FrameSubtype::NullCfPoll,
                7 => FrameSubtype::NullCfAckCfPoll,
                8 => FrameSubtype::QosData,
                9 => FrameSubtype::QosDataCfAck,
                10 => FrameSubtype::QosDataCfPoll,
                11 => FrameSubtype::QosDataCfAckCfPoll,
                12 => FrameSubtype::QosNull,
                13 => FrameSubtype::QosNullCfAck,
                14 => FrameSubtype::QosNullCfPoll,
                15 => FrameSubtype::QosNullCfAckCfPoll,
                _ => FrameSubtype::Unknown,
            },
            FrameType::Extension => FrameSubtype::Unknown,
        }
    }

    pub fn frame_type(&self) -> Option<FrameType> {
        match *self as u16 {
            0x00..=0x0f => Some(FrameType::Management),
            0x10..=0x1f => Some(FrameType::Control),
            0x20..=0x2f => Some(FrameType::Data),
            _ => None,
        }
    }

    pub fn is_data_type(&self) -> bool {
        self.frame_type() == Some(FrameType::Data)
    }

    /// Plain or QoS data carrying a payload
    pub fn is_payload_data(&self) -> bool {
        matches!(self, FrameSubtype::Data | FrameSubtype::QosData)
    }

    /// Plain or QoS null function
    pub fn is_null(&self) -> bool {
        matches!(self, FrameSubtype::Null | FrameSubtype::QosNull)
    }

    pub fn is_association_request(&self) -> bool {
        matches!(self, FrameSubtype::AssocRequest | FrameSubtype::ReassocRequest)
    }

    pub fn is_association_response(&self) -> bool {
        matches!(self, FrameSubtype::AssocResponse | FrameSubtype::ReassocResponse)
    }

    /// Disassociation or deauthentication
    pub fn is_disconnection(&self) -> bool {
        matches!(self, FrameSubtype::Disassociation | FrameSubtype::Deauthentication)
    }
}
