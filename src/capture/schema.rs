//! Frame table column contract

pub const TIME_EPOCH: &str = "frame.time_epoch";
pub const RSSI: &str = "radiotap.dbm_antsignal";
pub const ADDRS: &str = "wlan.addr";
pub const SOURCE: &str = "wlan.sa";
pub const DESTINATION: &str = "wlan.da";
pub const TRANSMITTER: &str = "wlan.ta";
pub const RECEIVER: &str = "wlan.ra";
pub const BSSID: &str = "wlan.bssid";
pub const TYPE_SUBTYPE: &str = "wlan.fc.type_subtype";
pub const RETRY: &str = "wlan.fc.retry";
pub const PWRMGT: &str = "wlan.fc.pwrmgt";
pub const DATA_LEN: &str = "data.len";
pub const STATUS_CODE: &str = "wlan.fixed.status_code";
pub const DATARATE: &str = "radiotap.datarate";

pub const REQUIRED: [&str; 13] = [
    TIME_EPOCH,
    RSSI,
    ADDRS,
    SOURCE,
    DESTINATION,
    TRANSMITTER,
    RECEIVER,
    BSSID,
    TYPE_SUBTYPE,
    RETRY,
    PWRMGT,
    DATA_LEN,
    STATUS_CODE,
];

/// Column positions resolved from a header row
#[derive(Debug, Clone, Copy)]
pub struct ColumnIndex {
    pub time_epoch: usize,
    pub rssi: usize,
    pub addrs: usize,
    pub source: usize,
    pub destination: usize,
    pub transmitter: usize,
    pub receiver: usize,
    pub bssid: usize,
    pub type_subtype: usize,
    pub retry: usize,
    pub pwrmgt: usize,
    pub data_len: usize,
    pub status_code: usize,
    pub datarate: Option<usize>,
}

impl ColumnIndex {
    /// Resolve columns by name. On failure returns the missing required
    /// column names in contract order.
    pub fn resolve<'a, I>(headers: I) -> Result<Self, Vec<String>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let names: Vec<&str> = headers.into_iter().map(str::trim).collect();
        let find = |name: &str| names.iter().position(|h| *h == name);

        let missing: Vec<String> = REQUIRED
            .iter()
            .filter(|name| find(name).is_none())
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(missing);
        }

        // All required columns were found above
        let at = |name: &str| find(name).unwrap_or_default();
        Ok(Self {
            time_epoch: at(TIME_EPOCH),
            rssi: at(RSSI),
            addrs: at(ADDRS),
            source: at(SOURCE),
            destination: at(DESTINATION),
            transmitter: at(TRANSMITTER),
            receiver: at(RECEIVER),
            bssid: at(BSSID),
            type_subtype: at(TYPE_SUBTYPE),
            retry: at(RETRY),
            pwrmgt: at(PWRMGT),
            data_len: at(DATA_LEN),
            status_code: at(STATUS_CODE),
            datarate: find(DATARATE),
        })
    }
}
