use futures::{SinkExt, StreamExt};
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::{Framed, LinesCodec};

/// A scripted mock SMTP server: accepts one connection, sends `banner`,
/// then answers each line against `list` in order.
async fn listen<R: Into<RequestResponseList>>(banner: &str, list: R) {
    let addr = SocketAddr::from(([127, 0, 0, 1], 2525));
    let listener = TcpListener::bind(addr).await.unwrap();

    match listener.accept().await {
        Ok((stream, _)) => handle_connection(stream, banner, list.into()).await,
        Err(err) => panic!("Error establishing SMTP connection: {err:?}"),
    }
}

async fn handle_connection(mut stream: TcpStream, banner: &str, list: RequestResponseList) {
    let (_, writer) = stream.split();
    let mut writer = BufWriter::new(writer);

    writer.write_all(banner.as_bytes()).await.unwrap();
    writer.write_all(b"\r\n").await.unwrap();
    writer.flush().await.unwrap();

    handle_session(stream, list).await;
}

/// A server that accepts the connection, never sends a banner, and instead
/// watches the raw socket for a short window before closing it. Returns the
/// number of bytes it observed from the client in that window, so the
/// caller can assert the no-further-writes-after-termination invariant
/// directly instead of relying on the client's read timeout alone: the
/// probe must give up on the missing greeting without ever writing `QUIT`
/// into the still-open-but-bannerless connection.
async fn listen_and_hang_up() -> usize {
    let addr = SocketAddr::from(([127, 0, 0, 1], 2525));
    let listener = TcpListener::bind(addr).await.unwrap();
    match listener.accept().await {
        Ok((mut stream, _)) => {
            let mut buf = [0u8; 64];
            let observed = match tokio::time::timeout(Duration::from_millis(900), stream.read(&mut buf)).await {
                Ok(Ok(n)) => n,
                Ok(Err(_)) | Err(_) => 0,
            };
            drop(stream);
            observed
        }
        Err(err) => panic!("Error establishing SMTP connection: {err:?}"),
    }
}

async fn handle_session(stream: TcpStream, mut list: RequestResponseList) {
    let mut framed = Framed::new(stream, LinesCodec::new());
    while let Some(line_str) = framed.next().await {
        let line = line_str.unwrap();
        let response = list.get_next(line);
        send_commands(&mut framed, vec![response]).await;
    }
}

async fn send_commands(framed: &mut Framed<TcpStream, LinesCodec>, commands: Vec<String>) {
    // only need to add \r because the codec only adds \n
    let messages = futures::stream::iter(commands.into_iter().map(|x| format!("{x}\r")));
    framed.send_all(&mut messages.map(Ok)).await.unwrap();
}

struct RequestResponseList(VecDeque<RequestResponse>);

impl From<&[(&str, &str)]> for RequestResponseList {
    fn from(value: &[(&str, &str)]) -> Self {
        Self(value.iter().copied().map(RequestResponse::from).collect())
    }
}

impl RequestResponseList {
    fn get_next(&mut self, actual: String) -> String {
        let Some(expected) = self.0.pop_front() else {
            panic!("Expected no more requests but received '{actual}'");
        };

        if expected.request != actual {
            panic!("Expected request '{}' but got '{actual}'", expected.request);
        }

        expected.response
    }
}

struct RequestResponse {
    request: String,
    response: String,
}

impl From<(&str, &str)> for RequestResponse {
    fn from((request, response): (&str, &str)) -> Self {
        Self { request: request.to_string(), response: response.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;
    use std::time::Duration;

    use tokio::{task, time::sleep};

    use mailcheck_lib::smtp::probe::{self, ProbeConfig};
    use mailcheck_lib::smtp::sequence::Sequence;
    use mailcheck_lib::smtp::tls::TlsOptions;

    use crate::{listen, listen_and_hang_up};

    fn test_config() -> ProbeConfig {
        ProbeConfig {
            hostname: "mailcheck-test".to_string(),
            sequence: Sequence::default(),
            timeout: Duration::from_millis(500),
            tls: TlsOptions::default(),
            port_trial_order: vec![2525],
            max_retries_per_port: 1,
            retry_base_backoff: Duration::from_millis(10),
        }
    }

    /// Default template for expected requests with their associated
    /// responses, ending in a caller-supplied `RCPT TO` exchange followed by
    /// the probe's best-effort `QUIT`.
    macro_rules! default_template {
        ($final_message:expr) => {
            [
                ("EHLO mailcheck-test", "250 OK"),
                ("MAIL FROM:<>", "250 OK"),
                $final_message,
                ("QUIT", "221 Bye"),
            ]
            .as_slice()
        };
    }

    #[serial]
    #[tokio::test]
    async fn happy_path_is_deliverable() {
        let server = task::spawn(async move {
            listen("220 mock.example.com", default_template!(("RCPT TO:<hello@example.com>", "250 OK"))).await;
        });

        sleep(Duration::from_millis(100)).await;
        let result = probe::probe_once("127.0.0.1", 2525, "hello", "example.com", &test_config()).await;
        server.await.unwrap();

        assert!(result.can_connect_smtp);
        assert_eq!(result.is_deliverable, Some(true));
    }

    #[serial]
    #[tokio::test]
    async fn mailbox_not_found_is_disabled() {
        let server = task::spawn(async move {
            listen(
                "220 mock.example.com",
                default_template!(("RCPT TO:<hello@example.com>", "550 No such user")),
            )
            .await;
        });

        sleep(Duration::from_millis(100)).await;
        let result = probe::probe_once("127.0.0.1", 2525, "hello", "example.com", &test_config()).await;
        server.await.unwrap();

        assert!(result.can_connect_smtp);
        assert_eq!(result.is_deliverable, Some(false));
        assert!(result.is_disabled);
    }

    #[serial]
    #[tokio::test]
    async fn over_quota_reports_full_inbox() {
        let server = task::spawn(async move {
            listen(
                "220 mock.example.com",
                default_template!(("RCPT TO:<hello@example.com>", "452 4.2.2 over quota")),
            )
            .await;
        });

        sleep(Duration::from_millis(100)).await;
        let result = probe::probe_once("127.0.0.1", 2525, "hello", "example.com", &test_config()).await;
        server.await.unwrap();

        assert!(result.can_connect_smtp);
        assert_eq!(result.is_deliverable, Some(false));
        assert!(result.has_full_inbox);
    }

    #[serial]
    #[tokio::test]
    async fn spam_rejection_is_indeterminate_not_invalid() {
        let server = task::spawn(async move {
            listen(
                "220 mock.example.com",
                default_template!(("RCPT TO:<hello@example.com>", "550 5.7.1 Message rejected as spam")),
            )
            .await;
        });

        sleep(Duration::from_millis(100)).await;
        let result = probe::probe_once("127.0.0.1", 2525, "hello", "example.com", &test_config()).await;
        server.await.unwrap();

        assert!(result.can_connect_smtp);
        assert_eq!(result.is_deliverable, None);
        assert!(!result.is_disabled);
    }

    #[serial]
    #[tokio::test]
    async fn multiline_greeting_is_not_mistaken_for_a_verdict() {
        let server = task::spawn(async move {
            listen(
                "220-mock.example.com\r\n220 ESMTP ready",
                default_template!(("RCPT TO:<hello@example.com>", "250 OK")),
            )
            .await;
        });

        sleep(Duration::from_millis(100)).await;
        let result = probe::probe_once("127.0.0.1", 2525, "hello", "example.com", &test_config()).await;
        server.await.unwrap();

        assert!(result.can_connect_smtp);
        assert_eq!(result.is_deliverable, Some(true));
    }

    #[serial]
    #[tokio::test]
    async fn connection_closed_before_greeting_writes_nothing() {
        let server = task::spawn(listen_and_hang_up());

        sleep(Duration::from_millis(100)).await;
        let result = probe::probe_once("127.0.0.1", 2525, "hello", "example.com", &test_config()).await;
        let bytes_observed_by_server = server.await.unwrap();

        assert!(!result.can_connect_smtp);
        assert_eq!(result.is_deliverable, None);
        assert_eq!(bytes_observed_by_server, 0, "probe must not write to a socket that never greeted");
    }
}
