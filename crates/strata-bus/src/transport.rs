//! Framed transport: listen addresses, the listener, and frame streams.
//!
//! Every plugin connection is a sequence of length-prefixed opaque payloads
//! in both directions: a 4-byte big-endian length followed by that many
//! payload bytes. The framing gives reliable in-order delivery over the
//! underlying stream, a clean end-of-stream signal (EOF between frames), and
//! cancellable reads (callers select against a cancellation token).
//!
//! Errors surfaced to upper layers are collapsed into the four
//! [`TransportError`] classes; the session layer decides log severity and
//! demotes itself to disconnected on any of them.

use std::path::PathBuf;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, UnixListener, UnixStream};
use tracing::{info, warn};

/// Upper bound on a single frame payload.
pub const MAX_FRAME_LEN: usize = 10 * 1024 * 1024;

/// A transport failure, classified for the session layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The operation was cancelled locally.
    #[error("transport canceled")]
    Canceled,

    /// The endpoint is not reachable (refused, unbound, missing socket).
    #[error("transport unavailable: {0}")]
    Unavailable(String),

    /// The peer closed its end of the stream.
    #[error("closed by peer")]
    ClosedByPeer,

    /// Anything else.
    #[error("transport error: {0}")]
    Other(String),
}

impl TransportError {
    /// Whether this failure is an expected disconnect rather than an
    /// anomaly. Expected disconnects log at INFO, the rest at ERROR.
    #[must_use]
    pub fn is_expected(&self) -> bool {
        !matches!(self, Self::Other(_))
    }

    fn from_io(e: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match e.kind() {
            ErrorKind::UnexpectedEof
            | ErrorKind::BrokenPipe
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted => Self::ClosedByPeer,
            ErrorKind::ConnectionRefused | ErrorKind::AddrNotAvailable | ErrorKind::NotFound => {
                Self::Unavailable(e.to_string())
            }
            ErrorKind::Interrupted => Self::Canceled,
            _ => Self::Other(e.to_string()),
        }
    }
}

/// A listen (or dial) address: loopback TCP or a Unix domain socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenAddr {
    /// `host:port`. Port `0` binds an ephemeral port.
    Tcp(String),
    /// A Unix socket path.
    Unix(PathBuf),
}

impl ListenAddr {
    /// Parse an address string.
    ///
    /// `unix:<path>` and anything with a leading `/` select a Unix socket;
    /// an optional `tcp:` prefix is accepted for symmetry with the
    /// advertised form; everything else is treated as `host:port`.
    ///
    /// # Errors
    ///
    /// Returns the offending string if it is empty.
    pub fn parse(s: &str) -> Result<Self, String> {
        if let Some(path) = s.strip_prefix("unix:") {
            return Ok(Self::Unix(PathBuf::from(path)));
        }
        if s.starts_with('/') {
            return Ok(Self::Unix(PathBuf::from(s)));
        }
        let hostport = s.strip_prefix("tcp:").unwrap_or(s);
        if hostport.is_empty() {
            return Err(s.to_string());
        }
        Ok(Self::Tcp(hostport.to_string()))
    }

    /// The normalized form advertised to child processes:
    /// `tcp:host:port` or `unix:/path`.
    #[must_use]
    pub fn advertise(&self) -> String {
        match self {
            Self::Tcp(hostport) => format!("tcp:{hostport}"),
            Self::Unix(path) => format!("unix:{}", path.display()),
        }
    }
}

impl std::fmt::Display for ListenAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.advertise())
    }
}

/// The host-side listener plugins dial into.
pub struct BusListener {
    inner: ListenerKind,
    local: ListenAddr,
}

enum ListenerKind {
    Tcp(TcpListener),
    Unix(UnixListener),
}

impl BusListener {
    /// Bind a listener.
    ///
    /// For Unix sockets a stale socket file is removed first and the bound
    /// file's mode is widened to `0666` so unprivileged plugin processes can
    /// connect.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] when binding fails.
    pub async fn bind(addr: &ListenAddr) -> Result<Self, TransportError> {
        match addr {
            ListenAddr::Tcp(hostport) => {
                let listener = TcpListener::bind(hostport.as_str())
                    .await
                    .map_err(TransportError::from_io)?;
                let local = listener.local_addr().map_err(TransportError::from_io)?;
                Ok(Self {
                    inner: ListenerKind::Tcp(listener),
                    local: ListenAddr::Tcp(local.to_string()),
                })
            }
            ListenAddr::Unix(path) => {
                if path.exists() {
                    if let Err(e) = std::fs::remove_file(path) {
                        warn!(path = %path.display(), error = %e, "failed to remove stale socket");
                    }
                }
                if let Some(parent) = path.parent() {
                    let _ = std::fs::create_dir_all(parent);
                }
                let listener = UnixListener::bind(path).map_err(TransportError::from_io)?;
                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;
                    if let Err(e) =
                        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o666))
                    {
                        warn!(path = %path.display(), error = %e, "failed to widen socket permissions");
                    }
                }
                info!(path = %path.display(), "listening on unix socket");
                Ok(Self {
                    inner: ListenerKind::Unix(listener),
                    local: ListenAddr::Unix(path.clone()),
                })
            }
        }
    }

    /// The actual bound address (with `:0` resolved to the real port).
    #[must_use]
    pub fn local_addr(&self) -> &ListenAddr {
        &self.local
    }

    /// Accept one inbound connection.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] when the accept fails.
    pub async fn accept(&self) -> Result<FrameStream, TransportError> {
        match &self.inner {
            ListenerKind::Tcp(listener) => {
                let (stream, _) = listener.accept().await.map_err(TransportError::from_io)?;
                Ok(FrameStream::from_tcp(stream))
            }
            ListenerKind::Unix(listener) => {
                let (stream, _) = listener.accept().await.map_err(TransportError::from_io)?;
                Ok(FrameStream::from_unix(stream))
            }
        }
    }

    /// Remove the socket file, if this is a Unix listener. Called on
    /// shutdown.
    pub fn cleanup(&self) {
        if let ListenAddr::Unix(path) = &self.local {
            let _ = std::fs::remove_file(path);
        }
    }
}

/// One bidirectional frame stream.
pub struct FrameStream {
    source: FrameSource,
    sink: FrameSink,
}

impl FrameStream {
    /// Assemble a stream from arbitrary read/write halves (used by tests
    /// over in-memory duplex pipes).
    #[must_use]
    pub fn from_parts(
        reader: Box<dyn AsyncRead + Send + Unpin>,
        writer: Box<dyn AsyncWrite + Send + Unpin>,
    ) -> Self {
        Self {
            source: FrameSource { reader },
            sink: FrameSink { writer },
        }
    }

    fn from_tcp(stream: TcpStream) -> Self {
        let (r, w) = stream.into_split();
        Self::from_parts(Box::new(r), Box::new(w))
    }

    fn from_unix(stream: UnixStream) -> Self {
        let (r, w) = stream.into_split();
        Self::from_parts(Box::new(r), Box::new(w))
    }

    /// Dial the given address. This is the plugin-facing side, used by
    /// test clients and SDKs.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] when the connection fails.
    pub async fn connect(addr: &ListenAddr) -> Result<Self, TransportError> {
        match addr {
            ListenAddr::Tcp(hostport) => {
                let stream = TcpStream::connect(hostport.as_str())
                    .await
                    .map_err(TransportError::from_io)?;
                Ok(Self::from_tcp(stream))
            }
            ListenAddr::Unix(path) => {
                let stream = UnixStream::connect(path)
                    .await
                    .map_err(TransportError::from_io)?;
                Ok(Self::from_unix(stream))
            }
        }
    }

    /// Send one frame.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] on write failure or oversized payload.
    pub async fn send(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        self.sink.send(payload).await
    }

    /// Receive one frame.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ClosedByPeer`] on clean end-of-stream.
    pub async fn recv(&mut self) -> Result<Vec<u8>, TransportError> {
        self.source.recv().await
    }

    /// Split into independently-owned send and receive halves.
    #[must_use]
    pub fn split(self) -> (FrameSink, FrameSource) {
        (self.sink, self.source)
    }
}

/// The send half of a frame stream.
pub struct FrameSink {
    writer: Box<dyn AsyncWrite + Send + Unpin>,
}

impl FrameSink {
    /// Write one length-prefixed frame and flush it.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] on write failure or oversized payload.
    pub async fn send(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        if payload.len() > MAX_FRAME_LEN {
            return Err(TransportError::Other(format!(
                "frame too large: {} bytes",
                payload.len()
            )));
        }
        #[allow(clippy::cast_possible_truncation)]
        let len = payload.len() as u32;
        self.writer
            .write_all(&len.to_be_bytes())
            .await
            .map_err(TransportError::from_io)?;
        self.writer
            .write_all(payload)
            .await
            .map_err(TransportError::from_io)?;
        self.writer.flush().await.map_err(TransportError::from_io)
    }
}

/// The receive half of a frame stream.
pub struct FrameSource {
    reader: Box<dyn AsyncRead + Send + Unpin>,
}

impl FrameSource {
    /// Read one frame.
    ///
    /// # Errors
    ///
    /// [`TransportError::ClosedByPeer`] on end-of-stream, a classified
    /// [`TransportError`] otherwise. Oversized frames fail the stream.
    pub async fn recv(&mut self) -> Result<Vec<u8>, TransportError> {
        let mut len_buf = [0u8; 4];
        self.reader
            .read_exact(&mut len_buf)
            .await
            .map_err(TransportError::from_io)?;
        let len = u32::from_be_bytes(len_buf) as usize;
        if len > MAX_FRAME_LEN {
            return Err(TransportError::Other(format!("frame too large: {len} bytes")));
        }
        let mut payload = vec![0u8; len];
        self.reader
            .read_exact(&mut payload)
            .await
            .map_err(TransportError::from_io)?;
        Ok(payload)
    }
}
