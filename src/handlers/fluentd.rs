//! Fluentd forwarder
//!
//! Sends every record as a MessagePack event (see [`msgpack`](super::msgpack))
//! over a TCP connection to a fluentd `in_forward` input. The connection is
//! opened on demand and reopened after any failure; records that cannot be
//! sent stay in a bounded [`ForwardBuffer`].

use super::forward_buffer::{ForwardBuffer, DEFAULT_BUFFER_LIMIT};
use super::msgpack;
use crate::core::diagnostics::Diagnostics;
use crate::core::error::{LoggerError, Result};
use crate::core::formatter::{Formatter, FullFormatter};
use crate::core::handler::CoreSink;
use crate::core::record::LogRecord;
use std::io::{self, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Default timeout when connecting to the collector
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

pub struct FluentdSink {
    tag: String,
    address: String,
    resolved: SocketAddr,
    connect_timeout: Duration,
    stream: Option<TcpStream>,
    buffer: ForwardBuffer,
    diagnostics: Diagnostics,
}

impl FluentdSink {
    /// Forward to `address` (`host:port`) with events tagged `tag`.
    ///
    /// The address is resolved now; the connection is made on first use.
    ///
    /// # Errors
    ///
    /// Returns error if `address` cannot be resolved
    pub fn new(address: &str, tag: &str) -> Result<Self> {
        let resolved = address
            .to_socket_addrs()
            .map_err(|e| LoggerError::connection(address, e))?
            .next()
            .ok_or_else(|| {
                LoggerError::config("FluentdSink", format!("'{}' resolves to nothing", address))
            })?;

        Ok(Self {
            tag: tag.to_string(),
            address: address.to_string(),
            resolved,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            stream: None,
            buffer: ForwardBuffer::new(DEFAULT_BUFFER_LIMIT),
            diagnostics: Diagnostics::stderr(),
        })
    }

    /// Byte ceiling of the send buffer
    #[must_use]
    pub fn with_buffer_limit(mut self, limit: usize) -> Self {
        self.buffer = ForwardBuffer::new(limit);
        self
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
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

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn connect(&mut self) -> io::Result<()> {
        let stream = TcpStream::connect_timeout(&self.resolved, self.connect_timeout)?;
        self.buffer.requeue_written();
        self.stream = Some(stream);
        Ok(())
    }

    /// Try to empty the unwritten segment, reconnecting once on a send error.
    fn deliver(&mut self) -> bool {
        for retry in [false, true] {
            if self.stream.is_none() {
                if let Err(e) = self.connect() {
                    self.diagnostics.error(
                        "Cannot reach fluentd",
                        LoggerError::connection(self.address.clone(), e),
                    );
                    return false;
                }
            }

            let Some(stream) = self.stream.as_mut() else {
                return false;
            };
            match self.buffer.deliver(|payload| stream.write_all(payload)) {
                Ok(()) => return true,
                Err(e) => {
                    self.diagnostics.error(
                        &format!("Sending to fluentd at {} failed", self.address),
                        e,
                    );
                    self.stream = None;
                    if retry {
                        return false;
                    }
                }
            }
        }
        false
    }
}

impl CoreSink for FluentdSink {
    fn output(&mut self, record: &LogRecord) -> Result<()> {
        let payload = msgpack::encode_event(&self.tag, record)?;
        let rendered = String::from_utf8_lossy(&FullFormatter::new().format(record)).into_owned();

        self.buffer.push(payload, rendered);
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

        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Write);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "fluentd"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::diagnostics::testing::collecting;
    use crate::core::level::Level;
    use std::io::Read;
    use std::net::TcpListener;

    fn record(message: &str) -> LogRecord {
        LogRecord::new(Level::Info, "src/fluent.rs", 7, message)
    }

    #[test]
    fn test_unresolvable_address() {
        assert!(FluentdSink::new("not an address", "app").is_err());
    }

    #[test]
    fn test_sends_encoded_events() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let (diagnostics, _) = collecting();
        let mut sink = FluentdSink::new(&address, "app.web")
            .unwrap()
            .with_diagnostics(diagnostics);

        let first = record("one");
        let second = record("two");
        sink.output(&first).unwrap();
        sink.output(&second).unwrap();
        assert!(sink.is_connected());
        sink.close().unwrap();

        let (mut conn, _) = listener.accept().unwrap();
        let mut received = Vec::new();
        conn.read_to_end(&mut received).unwrap();

        let mut expected = msgpack::encode_event("app.web", &first).unwrap();
        expected.extend(msgpack::encode_event("app.web", &second).unwrap());
        assert_eq!(received, expected);
    }

    #[test]
    fn test_buffers_while_unreachable() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let (diagnostics, lines) = collecting();
        let mut sink = FluentdSink::new(&format!("127.0.0.1:{}", port), "app")
            .unwrap()
            .with_diagnostics(diagnostics);

        sink.output(&record("kept")).unwrap();
        assert!(!sink.is_connected());
        assert_eq!(sink.buffer().unwritten_len(), 1);

        sink.close().unwrap();
        let lines = lines.lock();
        assert!(lines.iter().any(|l| l.starts_with("[LOGGER ERROR] Cannot reach fluentd")));
        assert!(lines
            .iter()
            .any(|l| l.starts_with("Drop log: ") && l.ends_with("kept")));
    }
}
