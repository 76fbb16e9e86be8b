use std::{future::Future, net::SocketAddr, time::Duration};

use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader, ReadHalf, WriteHalf},
    net::{TcpSocket, TcpStream, lookup_host},
    time::timeout,
};
use tracing::{debug, info};

use crate::{Error, Result};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Where and how to reach an instrument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound for connecting and for waiting on each response.
    pub timeout: Duration,
    /// Pause after state-changing commands before the instrument is read back.
    pub settle_delay: Duration,
}

impl ConnectionConfig {
    pub fn new(host: &str, port: u16) -> Self {
        ConnectionConfig {
            host: host.to_string(),
            port,
            timeout: DEFAULT_TIMEOUT,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }
}

/// Line transport to an instrument.
///
/// `receive` yields `Ok(None)` when nothing arrived within the timeout.
pub trait Transport: Sized {
    fn connect(config: &ConnectionConfig) -> impl Future<Output = Result<Self>> + Send;

    /// Writes `message` as is, terminators included.
    fn send(&mut self, message: &str) -> impl Future<Output = Result<()>> + Send;

    fn receive(&mut self) -> impl Future<Output = Result<Option<String>>> + Send;

    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;
}

pub struct TcpTransport {
    reader: BufReader<ReadHalf<TcpStream>>,
    writer: WriteHalf<TcpStream>,
    timeout: Duration,
    /// Replies given up on after a timeout that may still arrive.
    stale_replies: usize,
}

impl TcpTransport {
    pub fn new(stream: TcpStream, timeout: Duration) -> Self {
        let (read_half, write_half) = tokio::io::split(stream);
        let reader = BufReader::new(read_half);

        TcpTransport {
            reader,
            writer: write_half,
            timeout,
            stale_replies: 0,
        }
    }

    /// Drops late replies to timed out queries and any other unread input,
    /// so the next reply belongs to the next command.
    async fn discard_pending(&mut self) -> Result<()> {
        while self.stale_replies > 0 {
            let mut buffer = Vec::new();
            match timeout(self.timeout, self.reader.read_until(b'\n', &mut buffer)).await {
                Ok(Ok(0)) => return Err(closed_by_instrument()),
                Ok(Ok(_)) => {
                    debug!(discarded = %String::from_utf8_lossy(&buffer).trim_end(), "late reply");
                    self.stale_replies -= 1;
                }
                Ok(Err(e)) => return Err(e.into()),
                // Never answered, nothing left to wait for
                Err(_) => self.stale_replies = 0,
            }
        }

        loop {
            let available = match timeout(Duration::ZERO, self.reader.fill_buf()).await {
                Ok(Ok(data)) => data.len(),
                Ok(Err(e)) => return Err(e.into()),
                Err(_) => 0,
            };
            if available == 0 {
                return Ok(());
            }
            debug!(bytes = available, "unsolicited input discarded");
            self.reader.consume(available);
        }
    }

    async fn connect_address(addr: SocketAddr, limit: Duration) -> Result<TcpStream> {
        let socket = match addr {
            SocketAddr::V4(_) => TcpSocket::new_v4()?,
            SocketAddr::V6(_) => TcpSocket::new_v6()?,
        };
        match timeout(limit, socket.connect(addr)).await {
            Ok(stream) => Ok(stream?),
            Err(_) => Err(Error::ConnectFailed(format!(
                "Connecting to {addr} timed out after {limit:?}"
            ))),
        }
    }
}

impl Transport for TcpTransport {
    /// Looks up the address(es) for the configured host and tries connecting.
    /// Attempts all addresses,
    /// fails if connection could not be established on any address.
    async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let addresses = lookup_host((config.host.as_str(), config.port))
            .await?
            .collect::<Vec<_>>();
        if addresses.is_empty() {
            return Err(Error::ConnectFailed(format!(
                "Lookup provided no addresses for `{}`",
                config.host
            )));
        }

        let mut last_error = None;
        for addr in addresses {
            match Self::connect_address(addr, config.timeout).await {
                Ok(stream) => {
                    info!(%addr, "connected");
                    return Ok(Self::new(stream, config.timeout));
                }
                Err(e) => {
                    debug!(%addr, error = %e, "connection attempt failed");
                    last_error = Some(e);
                }
            }
        }

        Err(Error::ConnectFailed(format!(
            "Could not connect to `{}:{}` on any address: {}",
            config.host,
            config.port,
            last_error.map(|e| e.to_string()).unwrap_or_default()
        )))
    }

    async fn send(&mut self, message: &str) -> Result<()> {
        self.discard_pending().await?;
        self.writer.write_all(message.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Reads one line. Responses without terminator are returned once the
    /// timeout expires with data pending. A reply that misses the timeout is
    /// discarded before the next command goes out.
    async fn receive(&mut self) -> Result<Option<String>> {
        let mut buffer = Vec::new();
        let read = timeout(self.timeout, self.reader.read_until(b'\n', &mut buffer)).await;

        match read {
            Ok(Ok(0)) => Err(closed_by_instrument()),
            Ok(Ok(_)) => decode_utf8(buffer).map(Some),
            Ok(Err(e)) => Err(e.into()),
            Err(_) if buffer.is_empty() => {
                self.stale_replies += 1;
                Ok(None)
            }
            Err(_) => decode_utf8(buffer).map(Some),
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.writer.shutdown().await?;
        Ok(())
    }
}

fn closed_by_instrument() -> Error {
    Error::IoError(std::io::Error::new(
        std::io::ErrorKind::UnexpectedEof,
        "instrument closed the connection",
    ))
}

fn decode_utf8(buffer: Vec<u8>) -> Result<String> {
    String::from_utf8(buffer)
        .map_err(|e| Error::ResponseDecoding(format!("Response is not valid UTF-8: {e}")))
}
