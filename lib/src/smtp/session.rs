//! Transport: a reader/writer pair over a possibly-TLS-wrapped socket, plus
//! line framing into complete [`SmtpReply`] values.

use std::fmt::Display;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufStream};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;
use tokio_rustls::rustls::pki_types::ServerName;

use super::reply::{SmtpReply, parse_line};
use super::tls::TlsSetupError;

/// A socket error, timeout, or protocol framing error encountered while
/// driving the conversation. The probe turns every variant into an
/// indeterminate or connection-level [`super::probe::MailboxProbeResult`];
/// this type never escapes the crate.
#[derive(Debug, Clone)]
pub enum SessionError {
    Connect(String),
    Io(String),
    Timeout,
    Malformed(String),
    Tls(String),
}

impl Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::Connect(e) => write!(f, "connect error: {e}"),
            SessionError::Io(e) => write!(f, "io error: {e}"),
            SessionError::Timeout => write!(f, "timed out"),
            SessionError::Malformed(e) => write!(f, "malformed reply: {e}"),
            SessionError::Tls(e) => write!(f, "TLS error: {e}"),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<TlsSetupError> for SessionError {
    fn from(err: TlsSetupError) -> Self {
        SessionError::Tls(err.to_string())
    }
}

/// A trait-object-friendly union of the two socket flavors a probe ever
/// drives: plain TCP, or TLS over TCP (implicit on 465, or a mid-stream
/// `STARTTLS` upgrade).
pub trait AsyncDuplex: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send {}
impl<T: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send> AsyncDuplex for T {}

/// An open connection to a mail exchanger, reading and writing whole SMTP
/// lines. The probe is the single owner; no locking is required.
pub struct SmtpSession {
    stream: BufStream<Box<dyn AsyncDuplex>>,
    host: String,
}

impl SmtpSession {
    /// Open a plain TCP connection to `host:port`, bounded by
    /// `connect_timeout`.
    pub async fn connect_plain(
        host: &str,
        port: u16,
        connect_timeout: Duration,
    ) -> Result<Self, SessionError> {
        let tcp = timeout(connect_timeout, TcpStream::connect((host, port)))
            .await
            .map_err(|_| SessionError::Timeout)?
            .map_err(|e| SessionError::Connect(e.to_string()))?;
        Ok(Self {
            stream: BufStream::new(Box::new(tcp)),
            host: host.to_string(),
        })
    }

    /// Open a TCP connection and immediately negotiate TLS (port 465's
    /// "implicit TLS").
    pub async fn connect_tls(
        host: &str,
        port: u16,
        connect_timeout: Duration,
        connector: &TlsConnector,
    ) -> Result<Self, SessionError> {
        let tcp = timeout(connect_timeout, TcpStream::connect((host, port)))
            .await
            .map_err(|_| SessionError::Timeout)?
            .map_err(|e| SessionError::Connect(e.to_string()))?;

        let server_name = sni_for(host)?;
        let tls = connector
            .connect(server_name, tcp)
            .await
            .map_err(|e| SessionError::Tls(e.to_string()))?;

        Ok(Self {
            stream: BufStream::new(Box::new(tls)),
            host: host.to_string(),
        })
    }

    /// Upgrade an existing plain connection to TLS in place (`STARTTLS`).
    /// The input buffer is reset and the caller must re-issue `EHLO`.
    pub async fn upgrade_tls(&mut self, connector: &TlsConnector) -> Result<(), SessionError> {
        let server_name = sni_for(&self.host)?;

        // Swap in a closed placeholder so we can move the inner stream out
        // of the buffered wrapper without copying: BufStream doesn't expose
        // `into_inner` access by reference, only by value.
        let placeholder = BufStream::new(Box::new(tokio::io::empty()) as Box<dyn AsyncDuplex>);
        let previous = std::mem::replace(&mut self.stream, placeholder);
        let plain = previous.into_inner();

        let tls = connector
            .connect(server_name, plain)
            .await
            .map_err(|e| SessionError::Tls(e.to_string()))?;

        self.stream = BufStream::new(Box::new(tls));
        Ok(())
    }

    /// Send a raw command line (CRLF appended).
    pub async fn send_command(&mut self, command: &str) -> Result<(), SessionError> {
        self.stream
            .write_all(command.as_bytes())
            .await
            .map_err(|e| SessionError::Io(e.to_string()))?;
        self.stream
            .write_all(b"\r\n")
            .await
            .map_err(|e| SessionError::Io(e.to_string()))?;
        self.stream
            .flush()
            .await
            .map_err(|e| SessionError::Io(e.to_string()))?;
        Ok(())
    }

    /// Read one complete (possibly multiline) reply. `inactivity_timeout`
    /// applies independently to each line read; any bytes received reset
    /// it for the next line.
    pub async fn read_reply(&mut self, inactivity_timeout: Duration) -> Result<SmtpReply, SessionError> {
        let mut code = None;
        let mut lines = Vec::new();

        loop {
            let mut raw = String::new();
            let n = timeout(inactivity_timeout, self.stream.read_line(&mut raw))
                .await
                .map_err(|_| SessionError::Timeout)?
                .map_err(|e| SessionError::Io(e.to_string()))?;

            if n == 0 {
                return Err(SessionError::Io("connection closed by peer".to_string()));
            }

            let trimmed = raw.trim_end_matches(['\r', '\n']);
            let parsed = parse_line(trimmed).map_err(|e| SessionError::Malformed(e.to_string()))?;

            match code {
                None => code = Some(parsed.code),
                Some(c) if c != parsed.code => {
                    return Err(SessionError::Malformed(format!(
                        "reply code changed mid-multiline: {c} -> {}",
                        parsed.code
                    )));
                }
                Some(_) => {}
            }

            lines.push(parsed.text);

            if parsed.is_final {
                break;
            }
        }

        Ok(SmtpReply { code: code.expect("at least one line was read"), lines })
    }
}

fn sni_for(host: &str) -> Result<ServerName<'static>, SessionError> {
    ServerName::try_from(host.to_string()).map_err(|_| SessionError::Tls(format!("invalid server name: {host}")))
}
