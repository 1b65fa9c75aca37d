//! Display configuration shared by the controller and the renderer.
//!
//! The flags are changed only through client actions. Network metadata is
//! filled in by the network collaborator once per (re)connection and is
//! read-only from the core's point of view.

use std::fmt;
use std::net::Ipv4Addr;

/// Global flags a client can toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayFlag {
    /// Bind slider controls to touch release instead of mouse release
    TouchControl,
    /// Show the network info footer
    WifiInfo,
}

impl DisplayFlag {
    /// Path prefix used by the status page links
    pub fn path_prefix(self) -> &'static str {
        match self {
            DisplayFlag::TouchControl => "touchcontrol",
            DisplayFlag::WifiInfo => "wifiinfo",
        }
    }
}

/// 48-bit hardware address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MacAddress(pub [u8; 6]);

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            m[0], m[1], m[2], m[3], m[4], m[5]
        )
    }
}

/// Connectivity metadata supplied by the network collaborator
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkInfo {
    pub ssid: String,
    pub ip: Option<Ipv4Addr>,
    pub mac: Option<MacAddress>,
    pub gateway: Option<Ipv4Addr>,
}

impl NetworkInfo {
    /// One-line summary, also used as the status page footer text
    pub fn summary(&self) -> String {
        format!(
            "SSID={}, uC IP={}, uC MAC={}",
            self.ssid,
            display_or_unknown(self.ip.as_ref()),
            display_or_unknown(self.mac.as_ref()),
        )
    }
}

fn display_or_unknown<T: fmt::Display>(value: Option<&T>) -> String {
    value.map_or_else(|| "unknown".to_string(), ToString::to_string)
}

/// Everything the renderer needs besides the port table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayConfig {
    /// Board name shown in the page title
    pub board: String,
    /// Application mode shown in the page title
    pub mode: String,
    pub touch_control: bool,
    pub wifi_info: bool,
    pub network: NetworkInfo,
}

impl DisplayConfig {
    pub fn new(board: impl Into<String>, mode: impl Into<String>) -> Self {
        Self {
            board: board.into(),
            mode: mode.into(),
            touch_control: false,
            wifi_info: true,
            network: NetworkInfo::default(),
        }
    }

    pub fn flag(&self, flag: DisplayFlag) -> bool {
        match flag {
            DisplayFlag::TouchControl => self.touch_control,
            DisplayFlag::WifiInfo => self.wifi_info,
        }
    }

    /// Set a flag, returning whether it changed
    pub fn set_flag(&mut self, flag: DisplayFlag, on: bool) -> bool {
        let slot = match flag {
            DisplayFlag::TouchControl => &mut self.touch_control,
            DisplayFlag::WifiInfo => &mut self.wifi_info,
        };
        let changed = *slot != on;
        *slot = on;
        changed
    }

    /// Replace the network metadata after a (re)connection
    pub fn set_network(&mut self, network: NetworkInfo) {
        self.network = network;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_flag_reports_change() {
        let mut config = DisplayConfig::new("Board", "IoT Server");
        assert!(!config.touch_control);
        assert!(config.wifi_info);

        assert!(config.set_flag(DisplayFlag::TouchControl, true));
        assert!(!config.set_flag(DisplayFlag::TouchControl, true));
        assert!(config.flag(DisplayFlag::TouchControl));

        assert!(config.set_flag(DisplayFlag::WifiInfo, false));
        assert!(!config.flag(DisplayFlag::WifiInfo));
    }

    #[test]
    fn test_network_summary() {
        let mut network = NetworkInfo {
            ssid: "lab".to_string(),
            ..Default::default()
        };
        assert_eq!(network.summary(), "SSID=lab, uC IP=unknown, uC MAC=unknown");

        network.ip = Some(Ipv4Addr::new(192, 168, 1, 42));
        network.mac = Some(MacAddress([0x28, 0xcd, 0xc1, 0x0a, 0x0b, 0xff]));
        assert_eq!(
            network.summary(),
            "SSID=lab, uC IP=192.168.1.42, uC MAC=28:cd:c1:0a:0b:ff"
        );
    }
}
