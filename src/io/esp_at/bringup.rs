// src/io/esp_at/bringup.rs
//
// Device power-up sequence.
//
// The first commands run with the framer in raw mode: the reset banner and the
// module's boot chatter are not line-structured, so replies are found by
// substring. Once the module is configured the framer switches to line mode
// and the server commands use the correlated wait. A missing reply is logged
// and recorded but never stops the sequence; the module frequently answers
// late or with extra output and still ends up working.

use super::command::{ApEncryption, AtCommand};
use super::engine::AtEngine;
use super::framer::FramerMode;
use super::reply::ReplyToken;
use crate::io::{Clock, IoError, Transport};
use crate::settings::{parse_encryption, ServerSettings};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SoftApPlan {
    pub ssid: String,
    pub password: String,
    pub channel: u8,
    pub encryption: ApEncryption,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StationPlan {
    pub ssid: String,
    pub password: String,
}

/// What to configure during bring-up
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BringUpPlan {
    pub wifi_mode: u8,
    pub soft_ap: Option<SoftApPlan>,
    pub station: Option<StationPlan>,
    pub http_port: u16,
    pub timeout_s: u16,
}

impl Default for BringUpPlan {
    fn default() -> Self {
        Self {
            wifi_mode: 3,
            soft_ap: None,
            station: None,
            http_port: 80,
            timeout_s: 5,
        }
    }
}

impl BringUpPlan {
    pub fn from_settings(settings: &ServerSettings) -> Self {
        let soft_ap = settings.wifi.soft_ap.as_ref().map(|ap| SoftApPlan {
            ssid: ap.ssid.clone(),
            password: ap.password.clone(),
            channel: ap.channel,
            encryption: parse_encryption(&ap.encryption).unwrap_or(ApEncryption::WpaWpa2Psk),
        });
        let station = settings.wifi.station.as_ref().map(|st| StationPlan {
            ssid: st.ssid.clone(),
            password: st.password.clone(),
        });

        Self {
            wifi_mode: settings.wifi.mode,
            soft_ap,
            station,
            http_port: settings.server.port,
            timeout_s: settings.server.timeout_s,
        }
    }

    /// Commands sent before line parsing is trusted
    fn raw_steps(&self) -> Vec<(AtCommand, ReplyToken)> {
        let mut steps = vec![
            (AtCommand::Reset, ReplyToken::Ready),
            (AtCommand::EchoOff, ReplyToken::Ok),
            (AtCommand::WifiMode(self.wifi_mode), ReplyToken::Ok),
        ];
        if let Some(ap) = &self.soft_ap {
            steps.push((
                AtCommand::ConfigureSoftAp {
                    ssid: ap.ssid.clone(),
                    password: ap.password.clone(),
                    channel: ap.channel,
                    encryption: ap.encryption,
                },
                ReplyToken::Ok,
            ));
        }
        if let Some(st) = &self.station {
            steps.push((
                AtCommand::JoinAccessPoint {
                    ssid: st.ssid.clone(),
                    password: st.password.clone(),
                },
                ReplyToken::GotIp,
            ));
        }
        steps.push((AtCommand::QueryAccessPoint, ReplyToken::Ok));
        steps.push((AtCommand::QuerySoftApAddress, ReplyToken::Ok));
        steps
    }

    fn line_steps(&self) -> Vec<(AtCommand, ReplyToken)> {
        vec![
            (AtCommand::EnableMux, ReplyToken::Ok),
            (AtCommand::StartServer(self.http_port), ReplyToken::Ok),
            (AtCommand::ServerTimeout(self.timeout_s), ReplyToken::Ok),
            (AtCommand::QueryLocalAddress, ReplyToken::Ok),
        ]
    }
}

/// Outcome of a bring-up run
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BringUpReport {
    /// Commands whose expected reply never arrived, in order
    pub missing: Vec<String>,
}

impl BringUpReport {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

impl<T: Transport, C: Clock> AtEngine<T, C> {
    /// Reset and configure the module, then start the TCP server.
    ///
    /// Leaves the framer in line mode. Only transport errors are returned as
    /// errors; unanswered commands are listed in the report.
    pub fn bring_up(&mut self, plan: &BringUpPlan) -> Result<BringUpReport, IoError> {
        let mut report = BringUpReport::default();

        tlog!("[esp_at] Resetting module");
        self.set_mode(FramerMode::Raw);
        for (command, expect) in plan.raw_steps() {
            self.bring_up_step(&command, expect, &mut report)?;
        }

        tlog!("[esp_at] Starting web server on port {}", plan.http_port);
        self.set_mode(FramerMode::Line);
        for (command, expect) in plan.line_steps() {
            self.bring_up_step(&command, expect, &mut report)?;
        }

        if report.is_complete() {
            tlog!("[esp_at] Bring-up complete");
        } else {
            tlog!(
                "[esp_at] Bring-up finished with {} unanswered command(s): {}",
                report.missing.len(),
                report.missing.join(", ")
            );
        }
        Ok(report)
    }

    fn bring_up_step(
        &mut self,
        command: &AtCommand,
        expect: ReplyToken,
        report: &mut BringUpReport,
    ) -> Result<(), IoError> {
        if !self.send_command(command, expect)?.is_success() {
            tlog!("[esp_at] No '{}' for {}", expect.text(), command.label());
            report.missing.push(command.label());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::HttpRouter;
    use crate::io::mock::{MockTransport, StepClock};
    use crate::settings::{SoftApSettings, StationSettings};

    fn engine() -> AtEngine<MockTransport, StepClock> {
        let clock = StepClock::new();
        let transport = MockTransport::new(&clock);
        AtEngine::new(transport, clock, Box::new(HttpRouter::new()))
    }

    fn answer_everything(t: &mut MockTransport) {
        t.reply_to("AT+RST", "\r\nets Jan  8 2013\r\nready\r\n");
        t.reply_to("AT+CWJAP=", "WIFI CONNECTED\r\nWIFI GOT IP\r\n\r\nOK\r\n");
        t.always_reply_to("AT", "\r\nOK\r\n");
    }

    #[test]
    fn test_default_sequence() {
        let mut e = engine();
        answer_everything(&mut e.transport);

        let report = e.bring_up(&BringUpPlan::default()).unwrap();
        assert!(report.is_complete());
        assert_eq!(e.mode(), FramerMode::Line);
        assert_eq!(
            e.transport.commands(),
            vec![
                "AT+RST",
                "ATE0",
                "AT+CWMODE=3",
                "AT+CWJAP_CUR?",
                "AT+CIPAP_CUR?",
                "AT+CIPMUX=1",
                "AT+CIPSERVER=1,80",
                "AT+CIPSTO=5",
                "AT+CIFSR",
            ]
        );
    }

    #[test]
    fn test_configured_sequence() {
        let mut settings = ServerSettings::default();
        settings.server.port = 8080;
        settings.server.timeout_s = 30;
        settings.wifi.mode = 1;
        settings.wifi.station = Some(StationSettings {
            ssid: "home".to_string(),
            password: "pw".to_string(),
        });
        settings.wifi.soft_ap = Some(SoftApSettings {
            ssid: "ESP8266".to_string(),
            password: "1234567890".to_string(),
            channel: 6,
            encryption: "wpa2".to_string(),
        });
        let plan = BringUpPlan::from_settings(&settings);
        assert_eq!(plan.soft_ap.as_ref().unwrap().encryption, ApEncryption::Wpa2Psk);

        let mut e = engine();
        answer_everything(&mut e.transport);
        let report = e.bring_up(&plan).unwrap();
        assert!(report.is_complete());

        let commands = e.transport.commands();
        assert_eq!(commands[2], "AT+CWMODE=1");
        assert_eq!(commands[3], "AT+CWSAP=\"ESP8266\",\"1234567890\",6,3");
        assert_eq!(commands[4], "AT+CWJAP=\"home\",\"pw\"");
        assert!(commands.contains(&"AT+CIPSERVER=1,8080".to_string()));
        assert!(commands.contains(&"AT+CIPSTO=30".to_string()));
    }

    #[test]
    fn test_missing_replies_do_not_abort() {
        let mut e = engine();
        e.transport.reply_to("AT+RST", "ready\r\n");
        e.transport.always_reply_to("AT+CIPMUX", "OK\r\n");
        e.transport.always_reply_to("AT+CIPSTO", "OK\r\n");
        e.transport.always_reply_to("AT+CIFSR", "+CIFSR:APIP,\"192.168.4.1\"\r\nOK\r\n");
        e.transport.always_reply_to("AT+CIPSERVER", "ERROR\r\n");
        e.transport.always_reply_to("AT", "OK\r\n");

        let report = e.bring_up(&BringUpPlan::default()).unwrap();
        assert_eq!(report.missing, vec!["AT+CIPSERVER=1,80"]);
        assert_eq!(e.transport.commands().len(), 9);
    }

    #[test]
    fn test_silent_module_reports_everything() {
        let mut e = engine();
        let report = e.bring_up(&BringUpPlan::default()).unwrap();
        assert_eq!(report.missing.len(), 9);
        assert_eq!(report.missing[0], "AT+RST");
    }

    #[test]
    fn test_secrets_not_in_report() {
        let mut e = engine();
        let plan = BringUpPlan {
            station: Some(StationPlan {
                ssid: "home".to_string(),
                password: "hunter2".to_string(),
            }),
            ..BringUpPlan::default()
        };
        let report = e.bring_up(&plan).unwrap();
        assert!(report.missing.contains(&"AT+CWJAP".to_string()));
        assert!(report.missing.iter().all(|m| !m.contains("hunter2")));
    }

    #[test]
    fn test_transport_error_stops_bring_up() {
        let mut e = engine();
        e.transport.fail_writes();
        assert!(e.bring_up(&BringUpPlan::default()).is_err());
    }
}
