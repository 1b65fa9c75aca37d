//! WiFi station: association, link state and network metadata

use esp_idf_hal::{modem::Modem, peripheral::Peripheral};
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    nvs::EspDefaultNvsPartition,
    wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi},
};
use log::{debug, info, warn};
use portctl::{MacAddress, NetworkInfo, Uplink};
use std::thread;
use std::time::Duration;

/// Interval between association progress checks
const CONNECT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Give up on one association attempt after this many polls and start over
const CONNECT_POLLS_PER_ATTEMPT: u32 = 20;

/// Create the WiFi driver and start it in station mode
pub fn init(
    modem: impl Peripheral<P = Modem> + 'static,
    sys_loop: EspSystemEventLoop,
    nvs: EspDefaultNvsPartition,
    ssid: &str,
    password: &str,
) -> anyhow::Result<BlockingWifi<EspWifi<'static>>> {
    let mut wifi = BlockingWifi::wrap(EspWifi::new(modem, sys_loop.clone(), Some(nvs))?, sys_loop)?;

    let auth_method = if password.is_empty() {
        AuthMethod::None
    } else {
        AuthMethod::WPA2Personal
    };
    let wifi_configuration = Configuration::Client(ClientConfiguration {
        ssid: ssid
            .try_into()
            .map_err(|_| anyhow::anyhow!("SSID '{}' is longer than 32 bytes", ssid))?,
        bssid: None,
        auth_method,
        password: password
            .try_into()
            .map_err(|_| anyhow::anyhow!("WiFi password is longer than 64 bytes"))?,
        channel: None,
        ..Default::default()
    });

    wifi.set_configuration(&wifi_configuration)?;
    wifi.start()?;
    info!("WiFi started in station mode");
    Ok(wifi)
}

/// Associate with the access point, retrying until the interface is up.
///
/// Logs a progress line every second while waiting.
pub fn connect(wifi: &mut BlockingWifi<EspWifi<'static>>, ssid: &str) {
    loop {
        // Drop any half-open association before trying again
        if let Err(e) = wifi.disconnect() {
            debug!("WiFi disconnect before connect failed: {}", e);
        }

        if let Err(e) = wifi.wifi_mut().connect() {
            warn!("WiFi connect request failed: {}", e);
            thread::sleep(CONNECT_POLL_INTERVAL);
            continue;
        }

        for _ in 0..CONNECT_POLLS_PER_ATTEMPT {
            info!("Connecting to '{}'", ssid);
            thread::sleep(CONNECT_POLL_INTERVAL);
            if wifi.is_up().unwrap_or(false) {
                info!("Connecting to '{}' succeeded!", ssid);
                return;
            }
        }
        warn!("No link after {} s, retrying", CONNECT_POLLS_PER_ATTEMPT);
    }
}

/// Address information of the station interface
pub fn network_info(wifi: &BlockingWifi<EspWifi<'static>>, ssid: &str) -> anyhow::Result<NetworkInfo> {
    let netif = wifi.wifi().sta_netif();
    let ip_info = netif.get_ip_info()?;
    let mac = netif.get_mac()?;

    Ok(NetworkInfo {
        ssid: ssid.to_string(),
        ip: Some(ip_info.ip),
        mac: Some(MacAddress(mac)),
        gateway: Some(ip_info.subnet.gateway),
    })
}

/// Link state as seen by the connection loop
pub struct WifiUplink<'a> {
    wifi: &'a BlockingWifi<EspWifi<'static>>,
}

impl<'a> WifiUplink<'a> {
    pub fn new(wifi: &'a BlockingWifi<EspWifi<'static>>) -> Self {
        Self { wifi }
    }
}

impl Uplink for WifiUplink<'_> {
    fn is_up(&mut self) -> bool {
        self.wifi.is_connected().unwrap_or(false)
    }
}
