// src/main.rs
//
// esp-at-server: serve a small web site from an ESP8266 attached over serial.

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use clap::Parser;

use esp_at_server::io::console::ConsoleTransport;
use esp_at_server::io::serial::{list_serial_ports, SerialTransport};
use esp_at_server::settings::{default_settings_path, save_settings};
use esp_at_server::{
    load_settings, logging, tlog, AtEngine, BringUpPlan, HttpRouter, ServerSettings,
    StaticContent, StatusPage, SystemClock,
};

/// Web server for an ESP8266 running the AT firmware.
#[derive(Parser, Debug)]
#[command(name = "esp-at-server", version)]
struct Cli {
    /// Settings file (default: <config dir>/esp-at-server/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Serial port the ESP8266 is attached to
    #[arg(long)]
    port: Option<String>,

    /// Serial baud rate
    #[arg(long)]
    baud: Option<u32>,

    /// TCP port the module listens on
    #[arg(long)]
    http_port: Option<u16>,

    /// Log every received line and transmitted segment
    #[arg(long)]
    trace: bool,

    /// Forward typed input to the module (AT debug console)
    #[arg(long)]
    console: bool,

    /// List serial ports and exit
    #[arg(long)]
    list_ports: bool,

    /// Write the effective settings to the config file and exit
    #[arg(long)]
    init_config: bool,
}

fn apply_overrides(settings: &mut ServerSettings, cli: &Cli) {
    if let Some(port) = &cli.port {
        settings.serial.port = port.clone();
    }
    if let Some(baud) = cli.baud {
        settings.serial.baud_rate = baud;
    }
    if let Some(http_port) = cli.http_port {
        settings.server.port = http_port;
    }
    if cli.trace {
        settings.logging.trace = true;
    }
}

fn print_ports() -> Result<(), String> {
    let ports = list_serial_ports()?;
    if ports.is_empty() {
        println!("No serial ports found");
    }
    for p in ports {
        match (p.vid, p.pid) {
            (Some(vid), Some(pid)) => println!(
                "{}  {} {:04x}:{:04x} {}",
                p.port_name,
                p.port_type,
                vid,
                pid,
                p.product.unwrap_or_default()
            ),
            _ => println!("{}  {}", p.port_name, p.port_type),
        }
    }
    Ok(())
}

fn run(cli: Cli) -> Result<(), String> {
    if cli.list_ports {
        return print_ports();
    }

    let mut settings = load_settings(cli.config.as_deref())?;
    apply_overrides(&mut settings, &cli);
    settings.validate()?;

    if cli.init_config {
        let path = cli
            .config
            .clone()
            .or_else(default_settings_path)
            .ok_or_else(|| "No config directory available".to_string())?;
        save_settings(&path, &settings)?;
        println!("Wrote {}", path.display());
        return Ok(());
    }

    if let Some(dir) = &settings.logging.log_dir {
        logging::init_file_logging(dir)?;
    }

    let content = StaticContent::load(
        settings.content.index_page.as_deref(),
        settings.content.favicon.as_deref(),
    )?;
    let status = StatusPage::new();
    let router = HttpRouter::new().with_custom_route(status.route());

    let transport = SerialTransport::open(&settings.serial).map_err(|e| e.to_string())?;
    let mut engine = AtEngine::new(transport, SystemClock::new(), Box::new(router))
        .with_content(content)
        .with_custom_content(status.content())
        .with_trace(settings.logging.trace);

    let report = engine
        .bring_up(&BringUpPlan::from_settings(&settings))
        .map_err(|e| e.to_string())?;
    if !report.is_complete() {
        tlog!("[main] Continuing without replies to: {}", report.missing.join(", "));
    }
    tlog!(
        "[main] Serving port {} via {}",
        settings.server.port,
        engine.transport().name()
    );

    // Without the console the server runs until the process is killed
    let stop = Arc::new(AtomicBool::new(false));
    let result = if cli.console {
        let mut console = ConsoleTransport::spawn(Arc::clone(&stop)).map_err(|e| e.to_string())?;
        engine.run_with_console(&mut console, &stop)
    } else {
        engine.run(&stop)
    };

    logging::stop_file_logging();
    result.map_err(|e| e.to_string())
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        tlog!("[main] {}", e);
        std::process::exit(1);
    }
}
