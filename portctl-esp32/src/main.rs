//! Port Control IoT Server for ESP32-S3
//!
//! Serves a self-refreshing status page of the board's I/O lines over WiFi and
//! drives outputs from the links on that page.
//!
//! ## Production Features
//! - NVS-based configuration persistence
//! - WiFi auto-reconnection
//! - Panic handler with automatic restart
//! - Hold BOOT while powering up to clear the saved configuration

use esp_idf_hal::peripherals::Peripherals;
use esp_idf_svc::{eventloop::EspSystemEventLoop, nvs::EspDefaultNvsPartition};
use log::{error, info, warn};
use portctl::{Level, PortController, PortHal, PortServer};
use std::net::TcpListener;
use std::thread;
use std::time::Duration;

mod config;
mod hardware;
mod profile;
mod wifi;

use config::{ConfigStore, ServerConfig};
use hardware::EspPortHal;
use wifi::WifiUplink;

/// Delay before restarting after a fatal error
const RESTART_DELAY_SECS: u64 = 3;

/// Delay before retrying a failed listener bind
const BIND_RETRY_SECS: u64 = 1;

fn main() -> anyhow::Result<()> {
    // Initialize ESP-IDF
    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    // Set up panic handler for automatic restart
    std::panic::set_hook(Box::new(|panic_info| {
        error!("PANIC: {}", panic_info);
        restart();
    }));

    info!("╔══════════════════════════════════════════════════════════════╗");
    info!("║              PortCtl - IoT Server for I/O lines              ║");
    info!("║                  Hardware: ESP32-S3 DevKitC                  ║");
    info!("╚══════════════════════════════════════════════════════════════╝");

    let peripherals = Peripherals::take()?;
    let sys_loop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    let mut hal = EspPortHal::new(peripherals.pins, peripherals.adc1, peripherals.ledc)?;

    let mut store = ConfigStore::open(nvs.clone())?;

    // BOOT pulls the line low while held
    hal.configure_input(profile::RESET_LINE)?;
    if hal.read_level(profile::RESET_LINE)? == Level::Low {
        warn!("BOOT held at power-up, erasing saved configuration");
        store.erase()?;
    }

    let config = match store.load() {
        Some(cfg) => cfg,
        None => {
            info!("No saved configuration, using defaults");
            let cfg = ServerConfig::default();
            if let Err(e) = store.save(&cfg) {
                warn!("Failed to save default configuration: {}", e);
            }
            cfg
        }
    };
    info!("Configuration loaded:");
    info!("  WiFi SSID: '{}'", config.wifi_ssid);
    info!("  HTTP Port: {}", config.http_port);
    info!("  Board: {} - {}", config.board_name, config.device_mode);
    info!("  Touch control: {}", config.touch_control);
    info!("  Network info: {}", config.wifi_info);

    if config.wifi_ssid.is_empty() {
        warn!("No WiFi SSID configured; build with WIFI_SSID and WIFI_PASS set");
    }

    // Bring up the I/O lines
    let board = profile::esp32s3_devkitc();
    let table = board.build_table()?;
    let mut controller = PortController::new(table, hal);
    if let Err(e) = controller.initialize() {
        error!("Port initialization failed: {}", e);
        restart();
    }

    info!("Initializing WiFi...");
    let mut wifi = wifi::init(
        peripherals.modem,
        sys_loop,
        nvs,
        &config.wifi_ssid,
        &config.wifi_password,
    )?;

    let mut server = PortServer::new(controller, config.display_config());

    loop {
        wifi::connect(&mut wifi, &config.wifi_ssid);

        match wifi::network_info(&wifi, &config.wifi_ssid) {
            Ok(network) => {
                info!("Network info: {}", network.summary());
                if let Some(gateway) = network.gateway {
                    info!("  Gateway: {}", gateway);
                }
                server.display_mut().set_network(network);
            }
            Err(e) => warn!("Could not read network info: {}", e),
        }

        let listener = match TcpListener::bind(("0.0.0.0", config.http_port)) {
            Ok(listener) => listener,
            Err(e) => {
                error!("Failed to bind port {}: {}", config.http_port, e);
                thread::sleep(Duration::from_secs(BIND_RETRY_SECS));
                continue;
            }
        };
        match server.display().network.ip {
            Some(ip) => info!("Status page available at http://{}:{}/", ip, config.http_port),
            None => info!("Listening on port {}", config.http_port),
        }

        if let Err(e) = server.run(&listener, &mut WifiUplink::new(&wifi)) {
            error!("Connection loop stopped: {}", e);
        }
        if let Err(e) = store.save_flags(server.display()) {
            warn!("Failed to save display flags: {}", e);
        }

        // Listener closes here; reconnect and bind again
        drop(listener);
        warn!("Reconnecting WiFi...");
    }
}

#[allow(unreachable_code)]
fn restart() -> ! {
    error!("Restarting in {} seconds...", RESTART_DELAY_SECS);
    thread::sleep(Duration::from_secs(RESTART_DELAY_SECS));
    unsafe {
        esp_idf_svc::sys::esp_restart();
    }
    // esp_restart() does not return
    loop {
        thread::sleep(Duration::from_secs(1));
    }
}
