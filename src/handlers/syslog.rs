//! Syslog forwarder
//!
//! Messages carry `LEVEL file:line message` behind a BSD syslog header:
//! - local transports: `<PRI>Mmm dd hh:mm:ss TAG[PID]: ...`
//! - network transports: `<PRI>RFC3339 HOSTNAME TAG[PID]: ...`
//!
//! The priority combines the facility with a severity derived from the
//! record level (ERR 3, WARN 4, INFO 6, DEBUG 7). Records at `OFF` or `ALL`
//! have no syslog severity and are skipped.

use super::forward_buffer::{ForwardBuffer, DEFAULT_BUFFER_LIMIT};
use crate::core::diagnostics::Diagnostics;
use crate::core::error::{LoggerError, Result};
use crate::core::formatter::{Formatter, FullFormatter};
use crate::core::handler::CoreSink;
use crate::core::level::Level;
use crate::core::record::LogRecord;
use chrono::{Local, SecondsFormat};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Write};
use std::net::{Shutdown, TcpStream, UdpSocket};
#[cfg(unix)]
use std::os::unix::net::{UnixDatagram, UnixStream};
use std::str::FromStr;

/// Local syslog sockets, tried in order
pub const LOCAL_SOCKETS: [&str; 3] = ["/dev/log", "/var/run/syslog", "/var/run/log"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyslogProtocol {
    /// Unix datagram socket
    Unixgram,
    /// Unix stream socket
    Unix,
    Udp,
    Tcp,
}

impl SyslogProtocol {
    fn is_local(self) -> bool {
        matches!(self, SyslogProtocol::Unixgram | SyslogProtocol::Unix)
    }

    /// Message oriented transports: a successful send is final.
    fn is_datagram(self) -> bool {
        matches!(self, SyslogProtocol::Unixgram | SyslogProtocol::Udp)
    }
}

impl FromStr for SyslogProtocol {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "unixgram" => Ok(SyslogProtocol::Unixgram),
            "unix" => Ok(SyslogProtocol::Unix),
            "udp" => Ok(SyslogProtocol::Udp),
            "tcp" => Ok(SyslogProtocol::Tcp),
            other => Err(LoggerError::config(
                "SyslogSink",
                format!("unknown protocol '{}'", other),
            )),
        }
    }
}

/// Syslog facility codes (RFC 5424 table 1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facility {
    Kern = 0,
    #[default]
    User = 1,
    Mail = 2,
    Daemon = 3,
    Auth = 4,
    Syslog = 5,
    Lpr = 6,
    News = 7,
    Uucp = 8,
    Cron = 9,
    Authpriv = 10,
    Ftp = 11,
    Local0 = 16,
    Local1 = 17,
    Local2 = 18,
    Local3 = 19,
    Local4 = 20,
    Local5 = 21,
    Local6 = 22,
    Local7 = 23,
}

/// Syslog severity of a record level, if it has one.
pub fn severity(level: Level) -> Option<u8> {
    match level {
        Level::Err => Some(3),
        Level::Warn => Some(4),
        Level::Info => Some(6),
        Level::Debug => Some(7),
        Level::Off | Level::All => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    /// First working entry of [`LOCAL_SOCKETS`]
    Local,
    Remote {
        protocol: SyslogProtocol,
        address: String,
    },
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Local => f.write_str("local syslog"),
            Target::Remote { protocol, address } => write!(f, "{:?}:{}", protocol, address),
        }
    }
}

enum Connection {
    #[cfg(unix)]
    Unixgram(UnixDatagram),
    #[cfg(unix)]
    Unix(UnixStream),
    Udp(UdpSocket),
    Tcp(TcpStream),
}

impl Connection {
    fn open(protocol: SyslogProtocol, address: &str) -> io::Result<Self> {
        match protocol {
            #[cfg(unix)]
            SyslogProtocol::Unixgram => {
                let socket = UnixDatagram::unbound()?;
                socket.connect(address)?;
                Ok(Connection::Unixgram(socket))
            }
            #[cfg(unix)]
            SyslogProtocol::Unix => Ok(Connection::Unix(UnixStream::connect(address)?)),
            #[cfg(not(unix))]
            SyslogProtocol::Unixgram | SyslogProtocol::Unix => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "unix sockets are not available on this platform",
            )),
            SyslogProtocol::Udp => {
                let socket = UdpSocket::bind(if address.starts_with('[') {
                    "[::]:0"
                } else {
                    "0.0.0.0:0"
                })?;
                socket.connect(address)?;
                Ok(Connection::Udp(socket))
            }
            SyslogProtocol::Tcp => Ok(Connection::Tcp(TcpStream::connect(address)?)),
        }
    }

    /// Try the well known local sockets, datagram first.
    fn open_local() -> io::Result<(Self, SyslogProtocol)> {
        let mut last_error = io::Error::new(io::ErrorKind::NotFound, "no local syslog socket");
        for path in LOCAL_SOCKETS {
            for protocol in [SyslogProtocol::Unixgram, SyslogProtocol::Unix] {
                match Connection::open(protocol, path) {
                    Ok(connection) => return Ok((connection, protocol)),
                    Err(e) => last_error = e,
                }
            }
        }
        Err(last_error)
    }

    fn send(&mut self, message: &[u8]) -> io::Result<()> {
        match self {
            #[cfg(unix)]
            Connection::Unixgram(socket) => socket.send(message).map(|_| ()),
            #[cfg(unix)]
            Connection::Unix(stream) => stream.write_all(message),
            Connection::Udp(socket) => socket.send(message).map(|_| ()),
            Connection::Tcp(stream) => stream.write_all(message),
        }
    }

    fn close(self) {
        match self {
            #[cfg(unix)]
            Connection::Unix(stream) => {
                let _ = stream.shutdown(Shutdown::Write);
            }
            Connection::Tcp(stream) => {
                let _ = stream.shutdown(Shutdown::Write);
            }
            _ => {}
        }
    }
}

pub struct SyslogSink {
    tag: String,
    facility: Facility,
    target: Target,
    /// Protocol of the current (or last) connection
    protocol: SyslogProtocol,
    connection: Option<Connection>,
    hostname: String,
    pid: u32,
    buffer: ForwardBuffer,
    diagnostics: Diagnostics,
}

impl SyslogSink {
    /// Connect to the local syslog daemon.
    ///
    /// # Errors
    ///
    /// Returns error if none of [`LOCAL_SOCKETS`] accepts a connection
    pub fn new(tag: &str) -> Result<Self> {
        let (connection, protocol) = Connection::open_local()
            .map_err(|e| LoggerError::connection(LOCAL_SOCKETS.join(", "), e))?;
        Ok(Self::with_connection(tag, Target::Local, protocol, connection))
    }

    /// Connect to a syslog daemon at `address` (a socket path for the unix
    /// protocols, `host:port` otherwise).
    ///
    /// # Errors
    ///
    /// Returns error if the initial connection fails
    pub fn connect(tag: &str, protocol: SyslogProtocol, address: &str) -> Result<Self> {
        let connection =
            Connection::open(protocol, address).map_err(|e| LoggerError::connection(address, e))?;
        let target = Target::Remote {
            protocol,
            address: address.to_string(),
        };
        Ok(Self::with_connection(tag, target, protocol, connection))
    }

    fn with_connection(
        tag: &str,
        target: Target,
        protocol: SyslogProtocol,
        connection: Connection,
    ) -> Self {
        Self {
            tag: tag.to_string(),
            facility: Facility::default(),
            target,
            protocol,
            connection: Some(connection),
            hostname: hostname(),
            pid: std::process::id(),
            buffer: ForwardBuffer::new(DEFAULT_BUFFER_LIMIT),
            diagnostics: Diagnostics::stderr(),
        }
    }

    #[must_use]
    pub fn with_facility(mut self, facility: Facility) -> Self {
        self.facility = facility;
        self
    }

    /// Byte ceiling of the send buffer
    #[must_use]
    pub fn with_buffer_limit(mut self, limit: usize) -> Self {
        self.buffer = ForwardBuffer::new(limit);
        self
    }

    #[must_use]
    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn buffer(&self) -> &ForwardBuffer {
        &self.buffer
    }

    fn frame(&self, severity: u8, record: &LogRecord) -> Vec<u8> {
        let priority = (self.facility as u8) * 8 + severity;
        let body = format!(
            "{:<width$} {}:{} {}",
            record.level,
            record.file,
            record.line,
            record.message,
            width = Level::LABEL_WIDTH
        );
        let local = record.timestamp.with_timezone(&Local);

        let message = if self.protocol.is_local() {
            format!(
                "<{}>{} {}[{}]: {}\n",
                priority,
                local.format("%b %e %H:%M:%S"),
                self.tag,
                self.pid,
                body
            )
        } else {
            format!(
                "<{}>{} {} {}[{}]: {}\n",
                priority,
                local.to_rfc3339_opts(SecondsFormat::Secs, false),
                self.hostname,
                self.tag,
                self.pid,
                body
            )
        };
        message.into_bytes()
    }

    fn reconnect(&mut self) -> io::Result<()> {
        if let Some(old) = self.connection.take() {
            old.close();
        }
        let (connection, protocol) = match self.target {
            Target::Local => Connection::open_local()?,
            Target::Remote {
                protocol,
                ref address,
            } => (Connection::open(protocol, address)?, protocol),
        };
        if protocol.is_datagram() {
            self.buffer.release_written();
        } else {
            self.buffer.requeue_written();
        }
        self.connection = Some(connection);
        self.protocol = protocol;
        Ok(())
    }

    fn deliver(&mut self) -> bool {
        for retry in [false, true] {
            if self.connection.is_none() {
                if let Err(e) = self.reconnect() {
                    self.diagnostics.error(
                        "Cannot reach syslog",
                        LoggerError::connection(self.target.to_string(), e),
                    );
                    return false;
                }
            }

            let Some(connection) = self.connection.as_mut() else {
                return false;
            };
            match self.buffer.deliver(|message| connection.send(message)) {
                Ok(()) => return true,
                Err(e) => {
                    self.diagnostics
                        .error(&format!("Sending to {} failed", self.target), e);
                    if let Some(old) = self.connection.take() {
                        old.close();
                    }
                    if retry {
                        return false;
                    }
                }
            }
        }
        false
    }
}

impl fmt::Debug for SyslogSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyslogSink")
            .field("tag", &self.tag)
            .field("facility", &self.facility)
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

fn hostname() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .or_else(|| std::fs::read_to_string("/etc/hostname").ok())
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

impl CoreSink for SyslogSink {
    fn output(&mut self, record: &LogRecord) -> Result<()> {
        let Some(severity) = severity(record.level) else {
            return Ok(());
        };
        let message = self.frame(severity, record);
        let rendered = String::from_utf8_lossy(&FullFormatter::new().format(record)).into_owned();

        self.buffer.push(message, rendered);
        self.deliver();
        self.buffer.trim(&self.diagnostics);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if self.buffer.unwritten_len() > 0 {
            self.deliver();
            self.buffer.trim(&self.diagnostics);
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.buffer.unwritten_len() > 0 {
            self.deliver();
        }
        self.buffer.discard(&self.diagnostics);
        if let Some(connection) = self.connection.take() {
            connection.close();
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "syslog"
    }
}
