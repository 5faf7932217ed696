//! One request/response exchange per TCP connection, with bounded retry.

use crate::error::{Result, TuyaError};
use crate::protocol::{
    CommandType, FrameHeader, PREFIX_LENGTH, pack_frame, parse_header, unpack_frame,
};
use log::{debug, error, info, warn};
use std::io::ErrorKind;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{Duration, sleep, timeout};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);
pub const DEFAULT_RETRIES: u32 = 4;

/// Timing and retry settings for a device's transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportConfig {
    /// Bound on connect, on the request write and on each response read
    pub timeout: Duration,
    /// Pause between a failed attempt and the next one
    pub retry_delay: Duration,
    /// Attempts made after the first one
    pub retries: u32,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            retry_delay: DEFAULT_RETRY_DELAY,
            retries: DEFAULT_RETRIES,
        }
    }
}

/// Frames payloads and exchanges them with one device address.
#[derive(Debug, Clone)]
pub struct FrameTransport {
    host: String,
    port: u16,
    config: TransportConfig,
}

impl FrameTransport {
    pub fn new<H: Into<String>>(host: H, port: u16, config: TransportConfig) -> Self {
        Self {
            host: host.into(),
            port,
            config,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Sends `payload` under `cmd` and returns the response payload.
    ///
    /// The whole connect-send-receive cycle is retried on any transport failure; after
    /// `1 + retries` attempts the last error is returned.
    pub async fn exchange(&self, payload: &[u8], cmd: CommandType) -> Result<Vec<u8>> {
        let frame = pack_frame(cmd, payload);
        let attempts = self.config.retries + 1;
        let mut last_err = TuyaError::Uninitialized;

        for attempt in 1..=attempts {
            match self.exchange_once(&frame).await {
                Ok(response) => return Ok(response),
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) => {
                    warn!(
                        "Exchange with {}:{} failed (attempt {}/{}): {}",
                        self.host, self.port, attempt, attempts, e
                    );
                    last_err = e;
                    if attempt < attempts {
                        sleep(self.config.retry_delay).await;
                    }
                }
            }
        }

        error!(
            "Giving up on {}:{} after {} attempts: {}",
            self.host, self.port, attempts, last_err
        );
        Err(last_err)
    }

    async fn exchange_once(&self, frame: &[u8]) -> Result<Vec<u8>> {
        let mut stream = self.connect().await?;
        debug!("Sending frame (hex): {}", hex::encode(frame));

        timeout(self.config.timeout, stream.write_all(frame))
            .await
            .map_err(|_| TuyaError::Socket("Write timeout".into()))??;

        let packet = self.read_frame(&mut stream).await?;
        debug!("Received frame (hex): {}", hex::encode(&packet));

        // Dropping the stream closes the connection on every path.
        unpack_frame(&packet)
    }

    async fn connect(&self) -> Result<TcpStream> {
        info!("Connecting to {}:{}", self.host, self.port);
        timeout(
            self.config.timeout,
            TcpStream::connect((self.host.as_str(), self.port)),
        )
        .await
        .map_err(|_| TuyaError::Socket("Connect timeout".into()))?
        .map_err(TuyaError::from)
    }

    /// Reads the header, the declared body and anything already queued
    /// behind it, so that `unpack_frame` can see surplus bytes.
    async fn read_frame(&self, stream: &mut TcpStream) -> Result<Vec<u8>> {
        let mut packet = vec![0u8; PREFIX_LENGTH];
        self.read_exact(stream, &mut packet, "header").await?;
        let header: FrameHeader = parse_header(&packet)?;

        packet.resize(header.total_length(), 0);
        self.read_exact(stream, &mut packet[PREFIX_LENGTH..], "body")
            .await?;

        let mut extra = [0u8; 64];
        loop {
            match stream.try_read(&mut extra) {
                Ok(0) => break,
                Ok(n) => {
                    debug!("{} unexpected trailing bytes from {}", n, self.host);
                    packet.extend_from_slice(&extra[..n]);
                    if packet.len() > header.total_length() + extra.len() {
                        break;
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(packet)
    }

    async fn read_exact(&self, stream: &mut TcpStream, buf: &mut [u8], what: &str) -> Result<()> {
        timeout(self.config.timeout, stream.read_exact(buf))
            .await
            .map_err(|_| TuyaError::Socket(format!("Read {} timeout", what)))?
            .map(|_| ())
            .map_err(TuyaError::from)
    }
}
