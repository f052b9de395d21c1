//! Wireless stack boundary.
//!
//! The Wi-Fi command set is a thin translation layer over this trait; the
//! real association, scanning and AP machinery belongs to the platform. The
//! crate ships [`MockWireless`] for tests and the runner's default profile.

use std::net::IpAddr;

/// Operating mode of the wireless interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiMode {
    /// Radio off.
    Null = 0,
    /// Station (client) mode.
    Station = 1,
    /// Soft access point mode.
    SoftAp = 2,
    /// Station and soft AP simultaneously.
    ApSta = 3,
}

impl WifiMode {
    /// Parse the numeric mode used on the wire.
    pub fn from_u8(value: u8) -> Option<WifiMode> {
        match value {
            0 => Some(WifiMode::Null),
            1 => Some(WifiMode::Station),
            2 => Some(WifiMode::SoftAp),
            3 => Some(WifiMode::ApSta),
            _ => None,
        }
    }
}

/// Station association status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StationStatus {
    /// Not doing anything.
    Idle,
    /// Associated but no address yet.
    Connected,
    /// Associated with an address assigned.
    GotIp,
    /// Association dropped.
    ConnectionLost,
    /// Deliberately disconnected.
    Disconnected,
    /// Association attempt failed.
    ConnectFailed,
    /// Credentials rejected.
    WrongPassword,
    /// Target network not found.
    NoApFound,
}

impl StationStatus {
    /// Human-readable status label, printed during `CWJAP` progress.
    pub fn label(&self) -> &'static str {
        match self {
            StationStatus::Idle => "IDLE",
            StationStatus::Connected => "CONNECTED",
            StationStatus::GotIp => "GOT IP",
            StationStatus::ConnectionLost => "CONNECTION LOST",
            StationStatus::Disconnected => "DISCONNECTED",
            StationStatus::ConnectFailed => "CONNECT FAILED",
            StationStatus::WrongPassword => "WRONG PASSWORD",
            StationStatus::NoApFound => "NO SSID AVAIL",
        }
    }

    /// `+CWSTATE` numeric code and whether the SSID field is populated.
    /// `None` for statuses the query treats as an error.
    pub fn cwstate_code(&self) -> Option<(u8, bool)> {
        match self {
            StationStatus::Idle => Some((0, false)),
            StationStatus::Connected => Some((1, true)),
            StationStatus::GotIp => Some((2, true)),
            StationStatus::ConnectionLost => Some((3, true)),
            StationStatus::Disconnected => Some((4, false)),
            _ => None,
        }
    }

    /// Whether the station ended up associated.
    pub fn is_connected(&self) -> bool {
        matches!(self, StationStatus::Connected | StationStatus::GotIp)
    }
}

/// Encryption scheme of a scanned network, as reported by `+CWLAP`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encryption {
    /// Open network.
    Open = 0,
    /// WEP.
    Wep = 1,
    /// WPA/TKIP.
    Tkip = 2,
    /// WPA2/CCMP.
    Ccmp = 3,
    /// Mixed/auto.
    Auto = 4,
}

/// Details of the currently associated station link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationInfo {
    /// Network name.
    pub ssid: String,
    /// AP MAC address, colon-separated hex.
    pub bssid: String,
    /// Radio channel.
    pub channel: u8,
    /// Signal strength in dBm.
    pub rssi: i32,
}

/// One scanned access point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPoint {
    /// Encryption scheme.
    pub encryption: Encryption,
    /// Network name.
    pub ssid: String,
    /// Signal strength in dBm.
    pub rssi: i32,
    /// AP MAC address.
    pub bssid: String,
    /// Radio channel.
    pub channel: u8,
}

/// Soft AP configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoftApConfig {
    /// Advertised network name.
    pub ssid: String,
    /// Passphrase (ignored for open networks).
    pub password: String,
    /// Radio channel.
    pub channel: u8,
    /// Encryption scheme.
    pub encryption: Encryption,
    /// Maximum simultaneous stations.
    pub max_connections: u8,
    /// Whether the SSID is hidden from scans.
    pub hidden: bool,
}

/// A station currently attached to the soft AP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectedStation {
    /// Assigned address.
    pub addr: IpAddr,
    /// Station MAC address.
    pub mac: String,
}

/// DHCP client/server state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DhcpState {
    /// DHCP client running in station mode.
    pub station: bool,
    /// DHCP server running in soft AP mode.
    pub soft_ap: bool,
}

/// Platform wireless stack.
///
/// Invoked exactly like any other registered handler set; no special
/// coupling to the dispatch or link cores.
pub trait WirelessStack {
    /// Current operating mode.
    fn mode(&self) -> WifiMode;

    /// Switch operating mode. Returns false if the platform refused.
    fn set_mode(&mut self, mode: WifiMode) -> bool;

    /// Current station status.
    fn status(&self) -> StationStatus;

    /// Associate with a network. Returns the resulting status.
    fn join(&mut self, ssid: &str, password: &str) -> StationStatus;

    /// Re-associate with the last configured network.
    fn rejoin(&mut self) -> StationStatus;

    /// Details of the current association, if any.
    fn station_info(&self) -> Option<StationInfo>;

    /// Scan for visible networks.
    fn scan(&mut self) -> Vec<AccessPoint>;

    /// Drop the station association. Returns false if the platform refused.
    fn disconnect(&mut self) -> bool;

    /// Current soft AP configuration, if the AP is up.
    fn soft_ap(&self) -> Option<SoftApConfig>;

    /// Bring up (or reconfigure) the soft AP.
    fn configure_soft_ap(&mut self, config: &SoftApConfig) -> bool;

    /// Stations attached to the soft AP.
    fn connected_stations(&self) -> Vec<ConnectedStation>;

    /// Disconnect all attached stations.
    fn kick_stations(&mut self) -> bool;

    /// DHCP state.
    fn dhcp(&self) -> DhcpState;

    /// Enable or disable DHCP for station (`station_mode = true`) or soft
    /// AP mode.
    fn set_dhcp(&mut self, station_mode: bool, enable: bool) -> bool;

    /// Station hostname.
    fn hostname(&self) -> String;

    /// Set the station hostname. Returns false if the platform refused.
    fn set_hostname(&mut self, name: &str) -> bool;

    /// Whether auto-reconnect is enabled.
    fn auto_reconnect(&self) -> bool;

    /// Enable or disable auto-reconnect.
    fn set_auto_reconnect(&mut self, enabled: bool);
}

// ============================================================================
// Mock implementation
// ============================================================================

/// In-memory wireless stack with a fixed set of known networks.
pub struct MockWireless {
    mode: WifiMode,
    networks: Vec<(AccessPoint, Option<String>)>,
    joined: Option<StationInfo>,
    last_credentials: Option<(String, String)>,
    ap: Option<SoftApConfig>,
    stations: Vec<ConnectedStation>,
    dhcp: DhcpState,
    hostname: String,
    auto_reconnect: bool,
}

impl MockWireless {
    /// Create a mock with no visible networks.
    pub fn new() -> Self {
        MockWireless {
            mode: WifiMode::Station,
            networks: Vec::new(),
            joined: None,
            last_credentials: None,
            ap: None,
            stations: Vec::new(),
            dhcp: DhcpState {
                station: true,
                soft_ap: true,
            },
            hostname: "espat".to_string(),
            auto_reconnect: true,
        }
    }

    /// Add a network visible to scans and joinable with the given password
    /// (`None` for open).
    pub fn add_network(&mut self, ap: AccessPoint, password: Option<&str>) {
        self.networks.push((ap, password.map(str::to_string)));
    }

    /// Attach a station to the soft AP (test hook).
    pub fn attach_station(&mut self, station: ConnectedStation) {
        self.stations.push(station);
    }
}

impl Default for MockWireless {
    fn default() -> Self {
        Self::new()
    }
}

impl WirelessStack for MockWireless {
    fn mode(&self) -> WifiMode {
        self.mode
    }

    fn set_mode(&mut self, mode: WifiMode) -> bool {
        self.mode = mode;
        true
    }

    fn status(&self) -> StationStatus {
        if self.joined.is_some() {
            StationStatus::GotIp
        } else if self.last_credentials.is_some() {
            StationStatus::Disconnected
        } else {
            StationStatus::Idle
        }
    }

    fn join(&mut self, ssid: &str, password: &str) -> StationStatus {
        self.last_credentials = Some((ssid.to_string(), password.to_string()));
        let Some((ap, expected)) = self.networks.iter().find(|(ap, _)| ap.ssid == ssid) else {
            return StationStatus::NoApFound;
        };
        if let Some(expected) = expected {
            if expected != password {
                return StationStatus::WrongPassword;
            }
        }
        self.joined = Some(StationInfo {
            ssid: ap.ssid.clone(),
            bssid: ap.bssid.clone(),
            channel: ap.channel,
            rssi: ap.rssi,
        });
        StationStatus::GotIp
    }

    fn rejoin(&mut self) -> StationStatus {
        match self.last_credentials.clone() {
            Some((ssid, password)) => self.join(&ssid, &password),
            None => StationStatus::ConnectFailed,
        }
    }

    fn station_info(&self) -> Option<StationInfo> {
        self.joined.clone()
    }

    fn scan(&mut self) -> Vec<AccessPoint> {
        self.networks.iter().map(|(ap, _)| ap.clone()).collect()
    }

    fn disconnect(&mut self) -> bool {
        self.joined = None;
        true
    }

    fn soft_ap(&self) -> Option<SoftApConfig> {
        self.ap.clone()
    }

    fn configure_soft_ap(&mut self, config: &SoftApConfig) -> bool {
        self.mode = WifiMode::SoftAp;
        self.ap = Some(config.clone());
        true
    }

    fn connected_stations(&self) -> Vec<ConnectedStation> {
        self.stations.clone()
    }

    fn kick_stations(&mut self) -> bool {
        self.stations.clear();
        true
    }

    fn dhcp(&self) -> DhcpState {
        self.dhcp
    }

    fn set_dhcp(&mut self, station_mode: bool, enable: bool) -> bool {
        if station_mode {
            self.dhcp.station = enable;
        } else {
            self.dhcp.soft_ap = enable;
        }
        true
    }

    fn hostname(&self) -> String {
        self.hostname.clone()
    }

    fn set_hostname(&mut self, name: &str) -> bool {
        if name.is_empty() {
            return false;
        }
        self.hostname = name.to_string();
        true
    }

    fn auto_reconnect(&self) -> bool {
        self.auto_reconnect
    }

    fn set_auto_reconnect(&mut self, enabled: bool) {
        self.auto_reconnect = enabled;
    }
}
