// src/io/esp_at/command.rs
//
// AT command set used by the server.
//
// Command reference: ESP8266 AT Instruction Set (Espressif, v3.x)

/// Encryption setting for the soft access point (AT+CWSAP <ecn>)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApEncryption {
    Open = 0,
    WpaPsk = 2,
    Wpa2Psk = 3,
    WpaWpa2Psk = 4,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AtCommand {
    Reset,
    EchoOff,
    /// 1 = station, 2 = soft AP, 3 = both
    WifiMode(u8),
    ConfigureSoftAp {
        ssid: String,
        password: String,
        channel: u8,
        encryption: ApEncryption,
    },
    JoinAccessPoint {
        ssid: String,
        password: String,
    },
    QueryAccessPoint,
    QuerySoftApAddress,
    QueryLocalAddress,
    EnableMux,
    StartServer(u16),
    /// Idle timeout in seconds for server connections
    ServerTimeout(u16),
    BeginSend {
        slot: usize,
        len: usize,
    },
    Close(usize),
}

impl AtCommand {
    /// Command text including the trailing CRLF
    pub fn encode(&self) -> String {
        let body = match self {
            AtCommand::Reset => "AT+RST".to_string(),
            AtCommand::EchoOff => "ATE0".to_string(),
            AtCommand::WifiMode(mode) => format!("AT+CWMODE={}", mode),
            AtCommand::ConfigureSoftAp {
                ssid,
                password,
                channel,
                encryption,
            } => format!(
                "AT+CWSAP=\"{}\",\"{}\",{},{}",
                escape(ssid),
                escape(password),
                channel,
                *encryption as u8
            ),
            AtCommand::JoinAccessPoint { ssid, password } => {
                format!("AT+CWJAP=\"{}\",\"{}\"", escape(ssid), escape(password))
            }
            AtCommand::QueryAccessPoint => "AT+CWJAP_CUR?".to_string(),
            AtCommand::QuerySoftApAddress => "AT+CIPAP_CUR?".to_string(),
            AtCommand::QueryLocalAddress => "AT+CIFSR".to_string(),
            AtCommand::EnableMux => "AT+CIPMUX=1".to_string(),
            AtCommand::StartServer(port) => format!("AT+CIPSERVER=1,{}", port),
            AtCommand::ServerTimeout(secs) => format!("AT+CIPSTO={}", secs),
            AtCommand::BeginSend { slot, len } => format!("AT+CIPSEND={},{}", slot, len),
            AtCommand::Close(slot) => format!("AT+CIPCLOSE={}", slot),
        };
        format!("{}\r\n", body)
    }

    /// Whether the command carries a secret that must not be logged
    pub fn is_sensitive(&self) -> bool {
        matches!(
            self,
            AtCommand::ConfigureSoftAp { .. } | AtCommand::JoinAccessPoint { .. }
        )
    }

    /// Printable form for logs and reports, arguments dropped when sensitive
    pub fn label(&self) -> String {
        let text = self.encode();
        let text = text.trim_end();
        if self.is_sensitive() {
            text.split('=').next().unwrap_or_default().to_string()
        } else {
            text.to_string()
        }
    }
}

/// Backslash-escape the characters the AT parser treats specially inside quotes
fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '"' | ',' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
