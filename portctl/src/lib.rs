//! Port control over HTTP for small network-attached boards.
//!
//! Exposes the general-purpose lines of a board (digital in/out, analog in,
//! PWM out) as a self-refreshing HTML status page. Clients change outputs and
//! display flags by requesting specially-formed paths; every request is
//! answered with the full page.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                     Connection Loop                            │
//! │  - PortServer: accept, read one request, respond, close        │
//! │  - Uplink: link state from the network collaborator            │
//! └───────────────────────────────────────────────────────────────┘
//!          │ target            │ actions            │ page
//! ┌──────────────────┐ ┌──────────────────────┐ ┌──────────────────┐
//! │  Request Parser  │ │   Port Controller    │ │ Status Renderer  │
//! │  Request, Action │ │  PortController      │ │ render_status_   │
//! │                  │ │  PortTable           │ │ page             │
//! └──────────────────┘ └──────────────────────┘ └──────────────────┘
//!                               │
//! ┌───────────────────────────────────────────────────────────────┐
//! │                     Hardware seam                              │
//! │  - PortHal: configure, read, write lines                       │
//! │  - SimulatedHal: in-memory board for tests and the simulator   │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use portctl::{BoardProfile, PortController, PortServer, SimulatedHal};
//!
//! let profile = BoardProfile::pico_w();
//! let mut controller = PortController::new(profile.build_table().unwrap(), SimulatedHal::new());
//! controller.initialize().unwrap();
//!
//! let mut server = PortServer::new(controller, profile.display_config());
//! let page = server.process("/P01-off");
//! assert!(page.contains("/P01-on"));
//! ```

pub mod calibration;
pub mod controller;
pub mod display;
pub mod hal;
pub mod profile;
pub mod render;
pub mod request;
pub mod server;
pub mod table;

pub use controller::{IgnoreReason, Outcome, PortController, PortError};
pub use display::{DisplayConfig, DisplayFlag, MacAddress, NetworkInfo};
pub use hal::{HalError, PortHal, SimulatedHal};
pub use profile::BoardProfile;
pub use render::render_status_page;
pub use request::{request_target, Action, Request};
pub use server::{Listener, PortServer, ServerError, Uplink};
pub use table::{AnalogSensor, Level, Line, LineState, PortMode, PortSpec, PortTable, TableError, LINE_COUNT};
