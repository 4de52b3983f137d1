//! Framed message transport
//!
//! The LSP base protocol: each message is `Content-Length: N\r\n\r\n`
//! followed by N bytes of UTF-8 JSON. [`IoTransport`] speaks it over any
//! reader/writer pair; [`BufferTransport`] is the in-memory double the
//! server tests drive.

use serde_json::Value;
use std::collections::VecDeque;
use std::io::{BufRead, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed message: {0}")]
    Malformed(String),
}

/// A bidirectional channel carrying one JSON value per message
pub trait Transport {
    /// Receive the next message; `Ok(None)` means the channel closed.
    fn receive(&mut self) -> Result<Option<Value>, TransportError>;
    fn send(&mut self, message: &Value) -> Result<(), TransportError>;
}

/// Content-Length framed transport over arbitrary I/O
pub struct IoTransport<R, W> {
    reader: R,
    writer: W,
}

impl<R: BufRead, W: Write> IoTransport<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }
}

impl<R: BufRead, W: Write> Transport for IoTransport<R, W> {
    fn receive(&mut self) -> Result<Option<Value>, TransportError> {
        let mut content_length: Option<usize> = None;
        let mut line = String::new();
        loop {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            if line == "\r\n" || line == "\n" {
                break;
            }
            let lower = line.to_ascii_lowercase();
            if let Some(rest) = lower.strip_prefix("content-length:") {
                content_length = rest.trim().parse::<usize>().ok();
            }
            // Other headers (Content-Type) are ignored.
        }
        let length = content_length
            .ok_or_else(|| TransportError::Malformed("missing Content-Length header".into()))?;
        let mut payload = vec![0u8; length];
        self.reader.read_exact(&mut payload)?;
        serde_json::from_slice(&payload)
            .map(Some)
            .map_err(|e| TransportError::Malformed(e.to_string()))
    }

    fn send(&mut self, message: &Value) -> Result<(), TransportError> {
        let payload = message.to_string();
        write!(
            self.writer,
            "Content-Length: {}\r\n\r\n{}",
            payload.len(),
            payload
        )?;
        self.writer.flush()?;
        Ok(())
    }
}

/// In-memory transport: the test harness loads `incoming`, runs the server
/// to completion, then inspects `sent`.
#[derive(Debug, Default)]
pub struct BufferTransport {
    pub incoming: VecDeque<Value>,
    pub sent: Vec<Value>,
}

impl BufferTransport {
    pub fn new(incoming: Vec<Value>) -> Self {
        Self {
            incoming: incoming.into(),
            sent: Vec::new(),
        }
    }
}

impl Transport for BufferTransport {
    fn receive(&mut self) -> Result<Option<Value>, TransportError> {
        Ok(self.incoming.pop_front())
    }

    fn send(&mut self, message: &Value) -> Result<(), TransportError> {
        self.sent.push(message.clone());
        Ok(())
    }
}
