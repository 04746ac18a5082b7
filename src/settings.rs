// src/settings.rs
//
// Server configuration, read from a TOML file. Every field has a default so
// a partial (or missing) file still yields a usable configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::io::esp_at::command::ApEncryption;

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ServerSettings {
    #[serde(default)]
    pub serial: SerialSettings,
    #[serde(default)]
    pub server: HttpSettings,
    #[serde(default)]
    pub wifi: WifiSettings,
    #[serde(default)]
    pub content: ContentSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SerialSettings {
    #[serde(default = "default_serial_port")]
    pub port: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default = "default_data_bits")]
    pub data_bits: u8,
    #[serde(default = "default_stop_bits")]
    pub stop_bits: u8,
    #[serde(default = "default_parity")]
    pub parity: String, // "none" | "odd" | "even"
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HttpSettings {
    #[serde(default = "default_http_port")]
    pub port: u16,
    /// Idle timeout for client connections (AT+CIPSTO), seconds
    #[serde(default = "default_timeout_s")]
    pub timeout_s: u16,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WifiSettings {
    #[serde(default = "default_wifi_mode")]
    pub mode: u8, // 1 = station, 2 = soft AP, 3 = both
    #[serde(default)]
    pub station: Option<StationSettings>,
    #[serde(default)]
    pub soft_ap: Option<SoftApSettings>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StationSettings {
    pub ssid: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SoftApSettings {
    pub ssid: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_channel")]
    pub channel: u8,
    #[serde(default = "default_encryption")]
    pub encryption: String, // "open" | "wpa" | "wpa2" | "wpa_wpa2"
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ContentSettings {
    #[serde(default)]
    pub index_page: Option<PathBuf>,
    #[serde(default)]
    pub favicon: Option<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct LoggingSettings {
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    #[serde(default)]
    pub trace: bool,
}

fn default_serial_port() -> String {
    if cfg!(windows) {
        "COM3".to_string()
    } else {
        "/dev/ttyUSB0".to_string()
    }
}
fn default_baud_rate() -> u32 {
    115_200
}
fn default_data_bits() -> u8 {
    8
}
fn default_stop_bits() -> u8 {
    1
}
fn default_parity() -> String {
    "none".to_string()
}
fn default_http_port() -> u16 {
    80
}
fn default_timeout_s() -> u16 {
    5
}
fn default_wifi_mode() -> u8 {
    3
}
fn default_channel() -> u8 {
    1
}
fn default_encryption() -> String {
    "wpa_wpa2".to_string()
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            port: default_serial_port(),
            baud_rate: default_baud_rate(),
            data_bits: default_data_bits(),
            stop_bits: default_stop_bits(),
            parity: default_parity(),
        }
    }
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            port: default_http_port(),
            timeout_s: default_timeout_s(),
        }
    }
}

impl Default for WifiSettings {
    fn default() -> Self {
        Self {
            mode: default_wifi_mode(),
            station: None,
            soft_ap: None,
        }
    }
}

/// Map a config encryption name to the AT+CWSAP value
pub fn parse_encryption(name: &str) -> Option<ApEncryption> {
    match name.to_ascii_lowercase().as_str() {
        "open" | "none" => Some(ApEncryption::Open),
        "wpa" => Some(ApEncryption::WpaPsk),
        "wpa2" => Some(ApEncryption::Wpa2Psk),
        "wpa_wpa2" | "wpa/wpa2" => Some(ApEncryption::WpaWpa2Psk),
        _ => None,
    }
}

impl ServerSettings {
    /// Reject values the serial port or the AT firmware would refuse.
    pub fn validate(&self) -> Result<(), String> {
        let serial = &self.serial;
        if serial.port.trim().is_empty() {
            return Err("Serial port must not be empty".to_string());
        }
        if serial.baud_rate == 0 {
            return Err("Baud rate must be greater than zero".to_string());
        }
        if !(5..=8).contains(&serial.data_bits) {
            return Err(format!("Invalid data bits: {} (expected 5-8)", serial.data_bits));
        }
        if !(1..=2).contains(&serial.stop_bits) {
            return Err(format!("Invalid stop bits: {} (expected 1 or 2)", serial.stop_bits));
        }
        if !matches!(serial.parity.to_ascii_lowercase().as_str(), "none" | "odd" | "even") {
            return Err(format!("Invalid parity: '{}'", serial.parity));
        }

        if self.server.timeout_s > 7200 {
            return Err(format!(
                "Server timeout {}s out of range (0-7200)",
                self.server.timeout_s
            ));
        }

        if !(1..=3).contains(&self.wifi.mode) {
            return Err(format!("Invalid WiFi mode: {} (expected 1-3)", self.wifi.mode));
        }
        if let Some(ap) = &self.wifi.soft_ap {
            if !(1..=13).contains(&ap.channel) {
                return Err(format!("Soft AP channel {} out of range (1-13)", ap.channel));
            }
            if parse_encryption(&ap.encryption).is_none() {
                return Err(format!("Unknown soft AP encryption: '{}'", ap.encryption));
            }
        }
        Ok(())
    }
}

/// `<config dir>/esp-at-server/config.toml`
pub fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("esp-at-server").join("config.toml"))
}

/// Load settings from `path` (or the default location).
///
/// A missing file yields the defaults; a file that exists but does not parse
/// or validate is an error.
pub fn load_settings(path: Option<&Path>) -> Result<ServerSettings, String> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match default_settings_path() {
            Some(p) => p,
            None => return Ok(ServerSettings::default()),
        },
    };

    if !path.exists() {
        return Ok(ServerSettings::default());
    }

    let content = std::fs::read_to_string(&path)
        .map_err(|e| format!("Failed to read settings {}: {}", path.display(), e))?;
    let settings = parse_settings(&content)?;
    settings.validate()?;
    Ok(settings)
}

pub fn parse_settings(content: &str) -> Result<ServerSettings, String> {
    toml::from_str(content).map_err(|e| format!("Failed to parse settings: {}", e))
}

/// Write `settings` to `path`, creating parent directories as needed.
pub fn save_settings(path: &Path, settings: &ServerSettings) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config dir: {}", e))?;
    }

    let content = toml::to_string_pretty(settings)
        .map_err(|e| format!("Failed to serialize settings: {}", e))?;

    std::fs::write(path, content).map_err(|e| format!("Failed to write settings: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let s = parse_settings("").unwrap();
        assert_eq!(s.serial.baud_rate, 115_200);
        assert_eq!(s.serial.parity, "none");
        assert_eq!(s.server.port, 80);
        assert_eq!(s.server.timeout_s, 5);
        assert_eq!(s.wifi.mode, 3);
        assert!(s.wifi.station.is_none());
        assert!(!s.logging.trace);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_partial_sections() {
        let s = parse_settings(
            r#"
            [serial]
            port = "/dev/ttyACM1"

            [server]
            port = 8080

            [wifi.station]
            ssid = "home"
            password = "secret"

            [wifi.soft_ap]
            ssid = "ESP8266"
            password = "1234567890"
            "#,
        )
        .unwrap();
        assert_eq!(s.serial.port, "/dev/ttyACM1");
        assert_eq!(s.serial.data_bits, 8);
        assert_eq!(s.server.port, 8080);
        assert_eq!(s.server.timeout_s, 5);
        assert_eq!(s.wifi.station.as_ref().unwrap().ssid, "home");
        let ap = s.wifi.soft_ap.as_ref().unwrap();
        assert_eq!(ap.channel, 1);
        assert_eq!(parse_encryption(&ap.encryption), Some(ApEncryption::WpaWpa2Psk));
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut s = ServerSettings::default();
        s.serial.baud_rate = 0;
        assert!(s.validate().is_err());

        let mut s = ServerSettings::default();
        s.serial.data_bits = 9;
        assert!(s.validate().unwrap_err().contains("data bits"));

        let mut s = ServerSettings::default();
        s.serial.parity = "mark".to_string();
        assert!(s.validate().is_err());

        let mut s = ServerSettings::default();
        s.server.timeout_s = 7201;
        assert!(s.validate().is_err());

        let mut s = ServerSettings::default();
        s.wifi.soft_ap = Some(SoftApSettings {
            ssid: "x".to_string(),
            password: String::new(),
            channel: 14,
            encryption: "open".to_string(),
        });
        assert!(s.validate().unwrap_err().contains("channel"));
    }

    #[test]
    fn test_malformed_toml_is_error() {
        assert!(parse_settings("[serial\nport = 1").is_err());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let path = std::env::temp_dir().join("esp-at-server-does-not-exist.toml");
        let s = load_settings(Some(&path)).unwrap();
        assert_eq!(s.server.port, 80);
    }

    #[test]
    fn test_save_then_load() {
        let dir = std::env::temp_dir().join(format!("esp-at-server-test-{}", std::process::id()));
        let path = dir.join("config.toml");
        let mut s = ServerSettings::default();
        s.server.port = 8081;
        s.logging.trace = true;
        save_settings(&path, &s).unwrap();

        let loaded = load_settings(Some(&path)).unwrap();
        assert_eq!(loaded.server.port, 8081);
        assert!(loaded.logging.trace);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_encryption_names() {
        assert_eq!(parse_encryption("open"), Some(ApEncryption::Open));
        assert_eq!(parse_encryption("WPA2"), Some(ApEncryption::Wpa2Psk));
        assert_eq!(parse_encryption("wep"), None);
    }
}
