//! Server configuration with NVS persistence
//!
//! Configuration lives in one NVS namespace, tagged with a schema version.
//! Anything stored under another version (or nothing at all) means the
//! defaults are used and written back. WiFi credentials default to the
//! `WIFI_SSID` / `WIFI_PASS` environment at build time.

use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault};
use log::{info, warn};
use portctl::DisplayConfig;

/// NVS namespace for server configuration
const NVS_NAMESPACE: &str = "portctl_cfg";

/// Layout of the stored values; bump when keys change meaning
const SCHEMA_VERSION: u8 = 1;

/// Longest string value read back (SSID 32, password 64)
const MAX_STRING_LEN: usize = 72;

/// NVS keys (15 characters max)
mod keys {
    pub const SCHEMA: &str = "schema";
    pub const WIFI_SSID: &str = "wifi_ssid";
    pub const WIFI_PASS: &str = "wifi_pass";
    pub const HTTP_PORT: &str = "http_port";
    pub const BOARD_NAME: &str = "board_name";
    pub const DEVICE_MODE: &str = "device_mode";
    pub const TOUCH_CONTROL: &str = "touch_ctl";
    pub const WIFI_INFO: &str = "wifi_info";

    pub const ALL: [&str; 8] = [
        SCHEMA,
        WIFI_SSID,
        WIFI_PASS,
        HTTP_PORT,
        BOARD_NAME,
        DEVICE_MODE,
        TOUCH_CONTROL,
        WIFI_INFO,
    ];
}

/// Server configuration settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // WiFi Station mode settings
    pub wifi_ssid: String,
    pub wifi_password: String,

    // HTTP listener
    pub http_port: u16,

    // Page title
    pub board_name: String,
    pub device_mode: String,

    // Display flags, updated from the status page
    pub touch_control: bool,
    pub wifi_info: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            wifi_ssid: option_env!("WIFI_SSID").unwrap_or("").to_string(),
            wifi_password: option_env!("WIFI_PASS").unwrap_or("").to_string(),

            http_port: 80,

            board_name: crate::profile::BOARD_NAME.to_string(),
            device_mode: portctl::profile::DEFAULT_MODE.to_string(),

            touch_control: false,
            wifi_info: true,
        }
    }
}

impl ServerConfig {
    /// Display configuration for the status page
    pub fn display_config(&self) -> DisplayConfig {
        let mut display = DisplayConfig::new(self.board_name.as_str(), self.device_mode.as_str());
        display.touch_control = self.touch_control;
        display.wifi_info = self.wifi_info;
        display
    }
}

/// Handle on the configuration namespace
pub struct ConfigStore {
    nvs: EspNvs<NvsDefault>,
}

impl ConfigStore {
    pub fn open(partition: EspDefaultNvsPartition) -> anyhow::Result<Self> {
        let nvs = EspNvs::new(partition, NVS_NAMESPACE, true)?;
        Ok(Self { nvs })
    }

    /// Stored configuration, or `None` when nothing of the current schema is saved
    pub fn load(&self) -> Option<ServerConfig> {
        match self.nvs.get_u8(keys::SCHEMA) {
            Ok(Some(SCHEMA_VERSION)) => {}
            Ok(Some(other)) => {
                warn!("Stored configuration has schema {}, expected {}", other, SCHEMA_VERSION);
                return None;
            }
            Ok(None) => return None,
            Err(e) => {
                warn!("Failed to read configuration schema: {}", e);
                return None;
            }
        }

        let mut config = ServerConfig::default();
        if let Some(ssid) = self.get_string(keys::WIFI_SSID) {
            config.wifi_ssid = ssid;
        }
        if let Some(password) = self.get_string(keys::WIFI_PASS) {
            config.wifi_password = password;
        }
        if let Ok(Some(port)) = self.nvs.get_u16(keys::HTTP_PORT) {
            config.http_port = port;
        }
        if let Some(name) = self.get_string(keys::BOARD_NAME) {
            config.board_name = name;
        }
        if let Some(mode) = self.get_string(keys::DEVICE_MODE) {
            config.device_mode = mode;
        }
        if let Some(touch) = self.get_flag(keys::TOUCH_CONTROL) {
            config.touch_control = touch;
        }
        if let Some(wifi_info) = self.get_flag(keys::WIFI_INFO) {
            config.wifi_info = wifi_info;
        }
        Some(config)
    }

    /// Write every value, then the schema tag
    pub fn save(&mut self, config: &ServerConfig) -> anyhow::Result<()> {
        self.nvs.set_str(keys::WIFI_SSID, &config.wifi_ssid)?;
        self.nvs.set_str(keys::WIFI_PASS, &config.wifi_password)?;
        self.nvs.set_u16(keys::HTTP_PORT, config.http_port)?;
        self.nvs.set_str(keys::BOARD_NAME, &config.board_name)?;
        self.nvs.set_str(keys::DEVICE_MODE, &config.device_mode)?;
        self.nvs.set_u8(keys::TOUCH_CONTROL, u8::from(config.touch_control))?;
        self.nvs.set_u8(keys::WIFI_INFO, u8::from(config.wifi_info))?;
        self.nvs.set_u8(keys::SCHEMA, SCHEMA_VERSION)?;
        info!("Configuration saved");
        Ok(())
    }

    /// Persist the display flags as last set from the status page
    pub fn save_flags(&mut self, display: &DisplayConfig) -> anyhow::Result<()> {
        let touch = u8::from(display.touch_control);
        let wifi_info = u8::from(display.wifi_info);
        if self.get_flag(keys::TOUCH_CONTROL) == Some(display.touch_control)
            && self.get_flag(keys::WIFI_INFO) == Some(display.wifi_info)
        {
            return Ok(());
        }
        self.nvs.set_u8(keys::TOUCH_CONTROL, touch)?;
        self.nvs.set_u8(keys::WIFI_INFO, wifi_info)?;
        info!("Display flags saved (touch control {}, network info {})", touch, wifi_info);
        Ok(())
    }

    /// Remove every stored value; the next boot starts from defaults
    pub fn erase(&mut self) -> anyhow::Result<()> {
        for key in keys::ALL {
            self.nvs.remove(key)?;
        }
        info!("Stored configuration erased");
        Ok(())
    }

    fn get_flag(&self, key: &str) -> Option<bool> {
        self.nvs.get_u8(key).ok().flatten().map(|v| v != 0)
    }

    fn get_string(&self, key: &str) -> Option<String> {
        let mut buf = [0u8; MAX_STRING_LEN];
        match self.nvs.get_str(key, &mut buf) {
            Ok(value) => value.map(str::to_string),
            Err(e) => {
                warn!("Failed to read NVS key {}: {}", key, e);
                None
            }
        }
    }
}
