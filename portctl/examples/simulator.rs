//! Host Simulator
//!
//! Serves the status page of a simulated Raspberry Pi Pico W on the host, so
//! the page and the request paths can be tried from a desktop browser.
//!
//! Usage:
//!   cargo run --example simulator
//!
//! Environment:
//! - `PORTCTL_ADDR`: listen address (default `127.0.0.1:8080`)
//! - `PORTCTL_SSID`: network name shown in the footer (default `simulated`)
//! - `RUST_LOG`: log filter (default `info`)
//!
//! Press Ctrl-C to stop; the loop notices at the next accept poll.

use portctl::{BoardProfile, Level, NetworkInfo, PortController, PortServer, SimulatedHal, Uplink};
use std::{
    env,
    net::{IpAddr, TcpListener},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

/// Link that stays up until Ctrl-C
struct ShutdownFlag(Arc<AtomicBool>);

impl Uplink for ShutdownFlag {
    fn is_up(&mut self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Input values the simulated board starts with
fn seeded_hal() -> SimulatedHal {
    let mut hal = SimulatedHal::new();
    hal.set_input_level(0, Level::High);
    hal.set_input_level(5, Level::High);
    hal.set_analog_raw(26, 32768);
    hal.set_analog_raw(27, 20000);
    hal.set_analog_raw(28, 0);
    // Around 27 deg C
    hal.set_analog_raw(29, 14000);
    hal
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let addr = env::var("PORTCTL_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    let ssid = env::var("PORTCTL_SSID").unwrap_or_else(|_| "simulated".to_string());

    println!("Port Control Simulator");
    println!("======================\n");

    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = running.clone();
    ctrlc::set_handler(move || {
        println!("\nShutting down...");
        handler_flag.store(false, Ordering::SeqCst);
    })?;

    let profile = BoardProfile::pico_w();
    let mut controller = PortController::new(profile.build_table()?, seeded_hal());
    controller.initialize()?;

    let listener = TcpListener::bind(&addr)?;
    let local = listener.local_addr()?;

    let mut display = profile.display_config();
    display.set_network(NetworkInfo {
        ssid,
        ip: match local.ip() {
            IpAddr::V4(ip) => Some(ip),
            IpAddr::V6(_) => None,
        },
        mac: None,
        gateway: None,
    });
    println!("  Board: {} - {}", display.board, display.mode);
    println!("  Open:  http://{}/\n", local);

    let mut server = PortServer::new(controller, display);
    server.run(&listener, &mut ShutdownFlag(running))?;

    println!("Stopped.");
    Ok(())
}
