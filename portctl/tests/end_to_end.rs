//! Full request cycles over loopback TCP against the simulated board

use portctl::{
    AnalogSensor, BoardProfile, Level, LineState, PortController, PortServer, SimulatedHal, Uplink,
};
use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

struct TestLink(Arc<AtomicBool>);

impl Uplink for TestLink {
    fn is_up(&mut self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Server running on a background thread until dropped
struct Harness {
    addr: SocketAddr,
    up: Arc<AtomicBool>,
    handle: Option<JoinHandle<PortServer<SimulatedHal>>>,
}

impl Harness {
    fn start(hal: SimulatedHal) -> Self {
        let profile = BoardProfile::pico_w();
        let mut controller = PortController::new(profile.build_table().unwrap(), hal);
        controller.initialize().unwrap();
        let mut server = PortServer::new(controller, profile.display_config());

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let up = Arc::new(AtomicBool::new(true));
        let link = up.clone();

        let handle = thread::spawn(move || {
            server.run(&listener, &mut TestLink(link)).unwrap();
            server
        });

        Self { addr, up, handle: Some(handle) }
    }

    fn request(&self, raw: &str) -> String {
        let mut stream = TcpStream::connect(self.addr).unwrap();
        stream.write_all(raw.as_bytes()).unwrap();
        // Lets the server's read return even when the request is empty
        stream.shutdown(Shutdown::Write).unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();
        response
    }

    fn get(&self, target: &str) -> String {
        self.request(&format!("GET {} HTTP/1.1\r\nHost: localhost\r\n\r\n", target))
    }

    /// Stop the loop and hand back the server for inspection
    fn stop(mut self) -> PortServer<SimulatedHal> {
        self.up.store(false, Ordering::SeqCst);
        self.handle.take().unwrap().join().unwrap()
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.up.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn body(response: &str) -> &str {
    response.split_once("\r\n\r\n").map(|(_, body)| body).unwrap_or("")
}

#[test]
fn test_digital_output_on() {
    let harness = Harness::start(SimulatedHal::new());

    let response = harness.get("/P02-on");
    assert!(response.starts_with("HTTP/1.0 200 OK\r\n"));
    assert!(body(&response).contains(
        "<tr><td>GP 2</td><td>Output</td><td><a href=\"/P02-on\"><button>ON</button></a> \
         <a href=\"/P02-off\"><button>OFF</button></a></td><td><span style=\"color:green;\">on</span></td>"
    ));

    let server = harness.stop();
    assert_eq!(server.controller().hal().level(2), Level::High);
}

#[test]
fn test_line_one_toggles() {
    let harness = Harness::start(SimulatedHal::new());

    assert!(harness.get("/P01-off").contains("<td>GP 1</td><td>Output</td>"));
    let page = harness.get("/P01-on");
    assert!(page.contains("/P01-off\"><button>OFF</button></a></td><td><span style=\"color:green;\">on</span>"));

    let server = harness.stop();
    assert_eq!(server.controller().hal().level(1), Level::High);
}

#[test]
fn test_pwm_duty() {
    let harness = Harness::start(SimulatedHal::new());

    let page = harness.get("/P03-75pwm");
    assert!(page.contains("value='75'"));
    assert!(page.contains("PWM LED (% dutycycle) 50 Hz"));

    let server = harness.stop();
    assert_eq!(server.controller().hal().duty(3), 49151);
    assert_eq!(
        *server.controller().table().get(3).unwrap().state(),
        LineState::PwmOut { duty: 75, freq_hz: 50 }
    );
}

#[test]
fn test_flag_persists_across_connections() {
    let harness = Harness::start(SimulatedHal::new());

    assert!(harness.get("/").contains("Network info: SSID="));
    assert!(!harness.get("/wifiinfo-off").contains("Network info:"));
    assert!(!harness.get("/").contains("Network info:"));
    assert!(harness.get("/wifiinfo-on").contains("Network info:"));
}

#[test]
fn test_inputs_sampled_per_request() {
    let mut hal = SimulatedHal::new();
    hal.set_analog_raw(29, 14000);
    let harness = Harness::start(hal);

    let page = harness.get("/");
    assert!(page.contains("<tr><td>GP 29</td><td>Input</td><td></td><td>27.60</td>"));

    let server = harness.stop();
    assert_eq!(
        *server.controller().table().get(29).unwrap().state(),
        LineState::AnalogIn { value: 27.6, sensor: AnalogSensor::CoreTemperature }
    );
}

#[test]
fn test_malformed_requests_render_unchanged_page() {
    let harness = Harness::start(SimulatedHal::new());

    let baseline = harness.get("/");
    for raw in ["", "GET", "garbage\r\n\r\n", "GET /P03-pwm HTTP/1.1\r\n\r\n", "GET /P16-on HTTP/1.1\r\n\r\n"] {
        let response = harness.request(raw);
        assert_eq!(body(&response), body(&baseline), "request {:?}", raw);
    }
}

#[test]
fn test_identical_requests_identical_pages() {
    let harness = Harness::start(SimulatedHal::new());

    let first = harness.get("/P01-off");
    let second = harness.get("/P01-off");
    assert_eq!(first, second);
}
