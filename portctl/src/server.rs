//! Connection loop.
//!
//! One connection at a time, fully sequential: accept, read one request,
//! apply its actions, refresh inputs, render, write the page, close. For every
//! request the actions are applied before inputs are refreshed, and both happen
//! before rendering, so the page always shows the mutation plus fresh input
//! samples.
//!
//! The listener is polled so that link loss is noticed between connections.
//! An accepted stream is blocking with no timeout: a client that never sends
//! its request line holds the loop until it goes away.

use crate::controller::{Outcome, PortController, PortError};
use crate::display::DisplayConfig;
use crate::hal::PortHal;
use crate::render::render_status_page;
use crate::request::{request_target, Request};
use log::{debug, info, warn};
use std::io::{self, ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::thread;
use std::time::Duration;
use thiserror::Error;

/// Request bytes read per connection
pub const REQUEST_BUFFER_SIZE: usize = 8192;

/// Delay between accept polls while no client is waiting
pub const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Consecutive accept failures after which the listener is given up on
pub const MAX_ACCEPT_FAILURES: u32 = 20;

/// Connection loop errors
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Port(#[from] PortError),
}

/// Network link state, provided by the network collaborator
pub trait Uplink {
    /// Whether the link is still established
    fn is_up(&mut self) -> bool;
}

/// Source of client connections for the connection loop
pub trait Listener {
    type Stream: Read + Write;

    /// Take the next waiting client, `Ok(None)` when nobody is waiting
    fn poll_accept(&mut self) -> io::Result<Option<(Self::Stream, SocketAddr)>>;
}

/// Non-blocking TCP listener handing out blocking streams
struct TcpAcceptor<'a>(&'a TcpListener);

impl Listener for TcpAcceptor<'_> {
    type Stream = TcpStream;

    fn poll_accept(&mut self) -> io::Result<Option<(TcpStream, SocketAddr)>> {
        loop {
            let (stream, peer) = match self.0.accept() {
                Ok(client) => client,
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => return Ok(None),
                Err(e) => return Err(e),
            };
            // Only this client is lost if its socket cannot be switched back
            match stream.set_nonblocking(false) {
                Ok(()) => return Ok(Some((stream, peer))),
                Err(e) => warn!("Dropping client {}: {}", peer, e),
            }
        }
    }
}

/// Accept errors caused by a single client rather than the listener
fn is_client_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        ErrorKind::ConnectionAborted | ErrorKind::ConnectionReset | ErrorKind::Interrupted
    )
}

/// Port controller plus display state, served over a listening socket
pub struct PortServer<H> {
    controller: PortController<H>,
    display: DisplayConfig,
}

impl<H: PortHal> PortServer<H> {
    pub fn new(controller: PortController<H>, display: DisplayConfig) -> Self {
        Self { controller, display }
    }

    pub fn controller(&self) -> &PortController<H> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut PortController<H> {
        &mut self.controller
    }

    pub fn display(&self) -> &DisplayConfig {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut DisplayConfig {
        &mut self.display
    }

    /// Run one request cycle for a request-target and return the page
    pub fn process(&mut self, target: &str) -> String {
        let request = Request::parse(target);

        for action in request.actions() {
            match self.controller.apply_action(action, &mut self.display) {
                Ok(Outcome::Applied) => {}
                Ok(Outcome::Ignored(reason)) => debug!("Ignored {:?}: {:?}", action, reason),
                Err(e) => warn!("Action {:?} failed: {}", action, e),
            }
        }
        debug!("Line action recognised: {}", request.has_line_action());

        let failures = self.controller.refresh_inputs();
        if failures > 0 {
            warn!("{} input line(s) could not be refreshed", failures);
        }

        render_status_page(self.controller.table(), &self.display)
    }

    /// Serve a single connection: one request in, one page out
    pub fn handle_connection<S: Read + Write>(&mut self, stream: &mut S) -> Result<(), ServerError> {
        let mut buffer = [0u8; REQUEST_BUFFER_SIZE];
        let len = stream.read(&mut buffer)?;
        let raw = String::from_utf8_lossy(&buffer[..len]);
        let target = request_target(&raw);
        info!("Request: {}", if target.is_empty() { "<none>" } else { target });

        let page = self.process(target);
        write_response(stream, &page)?;
        Ok(())
    }

    /// Serve connections until the uplink reports the link is gone.
    ///
    /// Returns `Ok(())` on link loss; the caller re-establishes the network,
    /// rebinds a listener and calls this again.
    pub fn run<U: Uplink>(&mut self, listener: &TcpListener, uplink: &mut U) -> Result<(), ServerError> {
        listener.set_nonblocking(true)?;
        info!("Serving on {}", listener.local_addr()?);
        self.serve(&mut TcpAcceptor(listener), uplink)
    }

    /// Serve connections from any [`Listener`] while the uplink is up.
    ///
    /// Errors from a single client are logged and skipped. Other accept
    /// errors are retried after [`ACCEPT_POLL_INTERVAL`]; the loop only fails
    /// once [`MAX_ACCEPT_FAILURES`] of them happen in a row.
    pub fn serve<L: Listener, U: Uplink>(&mut self, listener: &mut L, uplink: &mut U) -> Result<(), ServerError> {
        let mut failures = 0;

        while uplink.is_up() {
            match listener.poll_accept() {
                Ok(Some((mut stream, peer))) => {
                    failures = 0;
                    info!("Client connected from {}", peer);
                    if let Err(e) = self.handle_connection(&mut stream) {
                        warn!("Connection from {} failed: {}", peer, e);
                    }
                    // Stream closes on drop
                }
                Ok(None) => {
                    failures = 0;
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) if is_client_error(&e) => warn!("Accept failed for one client: {}", e),
                Err(e) => {
                    failures += 1;
                    if failures >= MAX_ACCEPT_FAILURES {
                        return Err(e.into());
                    }
                    warn!("Accept failed ({}/{}): {}", failures, MAX_ACCEPT_FAILURES, e);
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
            }
        }

        warn!("Network link lost, leaving connection loop");
        Ok(())
    }
}

/// Write the page behind a minimal HTTP/1.0 head
fn write_response<W: Write>(stream: &mut W, page: &str) -> io::Result<()> {
    let head = format!(
        "HTTP/1.0 200 OK\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        page.len()
    );
    stream.write_all(head.as_bytes())?;
    stream.write_all(page.as_bytes())?;
    stream.flush()
}
