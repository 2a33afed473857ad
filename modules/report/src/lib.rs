//! Status and data reports over the Xymon TCP protocol.
//!
//! Each message goes out on its own short-lived connection: connect, write,
//! close. Failures are logged and reported as `false`.

use std::fmt;
use std::io::{self, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use thiserror::Error;
use time::macros::format_description;
use time::OffsetDateTime;
use tracing::{debug, warn};
use xymon_core::{Color, Target, XymonConfig};

/// Time after which the server turns a status purple if no new report arrives.
pub const DEFAULT_INTERVAL: &str = "30m";

#[derive(Debug, Error)]
pub enum SendError {
    #[error("failed to resolve {host}: {source}")]
    Resolve { host: String, source: io::Error },
    #[error("no address found for {0}")]
    NoAddress(String),
    #[error("failed to connect to {addr}: {source}")]
    Connect { addr: SocketAddr, source: io::Error },
    #[error("failed to write to {addr}: {source}")]
    Write { addr: SocketAddr, source: io::Error },
}

/// Current local time in `ctime(3)` layout, falling back to UTC when the
/// local offset is unavailable.
pub fn ctime() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    format_ctime(now)
}

/// `Thu Oct 16 09:05:03 2026`, day padded with a space.
pub fn format_ctime(at: OffsetDateTime) -> String {
    at.format(format_description!(
        "[weekday repr:short] [month repr:short] [day padding:space] [hour]:[minute]:[second] [year]"
    ))
    .unwrap_or_else(|_| String::new())
}

/// A `status` message for one host/test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub host: String,
    pub test: String,
    pub color: Color,
    pub message: String,
    pub interval: String,
    pub date: String,
}

impl StatusReport {
    /// New report stamped with the current time and the default interval.
    pub fn new(host: &str, test: &str, color: Color, message: &str) -> Self {
        Self::with_date(host, test, color, message, &ctime())
    }

    /// New report with a caller-supplied date and the default interval.
    pub fn with_date(host: &str, test: &str, color: Color, message: &str, date: &str) -> Self {
        StatusReport {
            host: host.to_string(),
            test: test.to_string(),
            color,
            message: message.to_string(),
            interval: DEFAULT_INTERVAL.to_string(),
            date: date.to_string(),
        }
    }

    pub fn interval(mut self, interval: &str) -> Self {
        self.interval = interval.to_string();
        self
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "status+{} {}.{} {} {}\n{}",
            self.interval, self.host, self.test, self.color, self.date, self.message
        )
    }
}

/// A `data` message carrying an opaque payload (usually RRD values).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataReport {
    pub host: String,
    pub test: String,
    pub payload: String,
}

impl DataReport {
    pub fn new(host: &str, test: &str, payload: &str) -> Self {
        DataReport { host: host.to_string(), test: test.to_string(), payload: payload.to_string() }
    }
}

impl fmt::Display for DataReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "data {}.{}\n{}", self.host, self.test, self.payload)
    }
}

/// Sends messages to one Xymon server.
#[derive(Debug, Clone)]
pub struct Sender {
    target: Target,
}

impl Sender {
    pub fn new(config: &XymonConfig) -> Self {
        Sender { target: config.target() }
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Report a status with the default interval.
    pub fn report(&self, host: &str, test: &str, color: Color, message: &str) -> bool {
        self.report_with_interval(host, test, color, message, DEFAULT_INTERVAL)
    }

    pub fn report_with_interval(
        &self,
        host: &str,
        test: &str,
        color: Color,
        message: &str,
        interval: &str,
    ) -> bool {
        let report = StatusReport::new(host, test, color, message).interval(interval);
        self.send_message(&report.to_string())
    }

    pub fn data(&self, host: &str, test: &str, payload: &str) -> bool {
        self.send_message(&DataReport::new(host, test, payload).to_string())
    }

    /// Send an arbitrary message (see xymon(1) for the syntax).
    /// Returns `false` if the server could not be resolved, reached or written to.
    pub fn send_message(&self, message: &str) -> bool {
        match self.try_send_message(message) {
            Ok(()) => true,
            Err(e) => {
                warn!(server = %self.target, error = %e, "xymon send failed");
                false
            }
        }
    }

    pub fn try_send_message(&self, message: &str) -> Result<(), SendError> {
        let addr = resolve_first(&self.target)?;
        let mut stream =
            TcpStream::connect(addr).map_err(|source| SendError::Connect { addr, source })?;
        let mut payload = String::with_capacity(message.len() + 1);
        payload.push_str(message);
        payload.push('\n');
        stream
            .write_all(payload.as_bytes())
            .and_then(|_| stream.flush())
            .map_err(|source| SendError::Write { addr, source })?;
        debug!(%addr, bytes = payload.len(), "xymon message sent");
        Ok(())
    }
}

/// First resolved address, preferring IPv4 as the Xymon daemon usually listens there.
fn resolve_first(target: &Target) -> Result<SocketAddr, SendError> {
    let addrs: Vec<SocketAddr> = (target.host.as_str(), target.port)
        .to_socket_addrs()
        .map_err(|source| SendError::Resolve { host: target.host.clone(), source })?
        .collect();
    addrs
        .iter()
        .find(|a| a.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or_else(|| SendError::NoAddress(target.host.clone()))
}
