//! The mailbox probe state machine: drive an SMTP conversation up to (not
//! including) `DATA`, and classify the result.

use std::time::{Duration, SystemTime};

use tokio::time::sleep;

use crate::cache::Cache;
use crate::port_selector;

use super::classify::{self, RcptOutcome, VrfyOutcome};
use super::sequence::{Sequence, Step};
use super::session::{SessionError, SmtpSession};
use super::tls::TlsOptions;

/// The primary output of a mailbox probe.
///
/// `is_deliverable` is a tri-state: `Some(true)`, `Some(false)`, or `None`
/// for "indeterminate" (greylist, policy block, protocol error after
/// connect, catch-all suspected).
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct MailboxProbeResult {
    pub can_connect_smtp: bool,
    pub is_deliverable: Option<bool>,
    pub has_full_inbox: bool,
    pub is_catch_all: bool,
    pub is_disabled: bool,
    pub error: Option<String>,
    pub response_code: Option<u16>,
    pub checked_at: SystemTime,
}

impl MailboxProbeResult {
    fn connect_failure(reason: &str) -> Self {
        Self {
            can_connect_smtp: false,
            is_deliverable: None,
            has_full_inbox: false,
            is_catch_all: false,
            is_disabled: false,
            error: Some(reason.to_string()),
            response_code: None,
            checked_at: SystemTime::now(),
        }
    }

    fn trivial_success() -> Self {
        Self {
            can_connect_smtp: true,
            is_deliverable: Some(true),
            has_full_inbox: false,
            is_catch_all: false,
            is_disabled: false,
            error: None,
            response_code: None,
            checked_at: SystemTime::now(),
        }
    }
}

/// How the connection to the mail exchanger is established, derived from
/// the port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transport {
    ImplicitTls,
    PlainStartTlsPreferred,
    PlainStartTlsBestEffort,
}

/// Port 0 is never a valid destination; every other port gets a transport -
/// the three well-known ports get their dedicated handling, anything else
/// treated like 587 (plain, STARTTLS preferred), which covers test
/// harnesses and nonstandard relay ports alike.
fn transport_for_port(port: u16) -> Option<Transport> {
    match port {
        0 => None,
        465 => Some(Transport::ImplicitTls),
        25 => Some(Transport::PlainStartTlsBestEffort),
        _ => Some(Transport::PlainStartTlsPreferred),
    }
}

/// Parameters that stay fixed across every step and every port attempt of a
/// single mailbox's probe.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// The name the probe introduces itself as in `EHLO`/`HELO`.
    pub hostname: String,
    pub sequence: Sequence,
    /// Applies to the TCP/TLS connect and, independently, to every
    /// socket read - the two timeouts run concurrently.
    pub timeout: Duration,
    pub tls: TlsOptions,
    /// Ports to try, in order, when no learned port is cached.
    pub port_trial_order: Vec<u16>,
    pub max_retries_per_port: u32,
    pub retry_base_backoff: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            hostname: "localhost".to_string(),
            sequence: Sequence::default(),
            timeout: Duration::from_millis(3000),
            tls: TlsOptions::default(),
            port_trial_order: vec![25, 587, 465],
            max_retries_per_port: 2,
            retry_base_backoff: Duration::from_millis(500),
        }
    }
}

/// Entry point for a mailbox probe: consult the cache, try the learned port
/// (or the trial order) with backoff, and cache a reportable outcome.
///
/// Returns the result plus whether it was served from the `smtp` cache
/// store, so the orchestrator can set `metadata.cached` without a second
/// cache lookup.
pub async fn probe_mailbox(
    mx_host: &str,
    local: &str,
    domain: &str,
    config: &ProbeConfig,
    cache: &Cache,
) -> (MailboxProbeResult, bool) {
    let cache_key = format!("{mx_host}:{local}@{domain}");
    if let Ok(Some(cached)) = cache.smtp.get(&cache_key) {
        return (cached, true);
    }

    let learned_port = port_selector::learned_port_for(mx_host, cache);
    let trial_order: Vec<u16> = match learned_port {
        Some(port) => vec![port],
        None => config.port_trial_order.clone(),
    };

    let mut last = MailboxProbeResult::connect_failure("all attempts failed");

    'ports: for port in trial_order {
        for attempt in 1..=config.max_retries_per_port.max(1) {
            let result = probe_once(mx_host, port, local, domain, config).await;
            if result.can_connect_smtp {
                port_selector::remember(mx_host, port, cache);
                last = result;
                break 'ports;
            }
            last = result;
            if attempt < config.max_retries_per_port.max(1) {
                let backoff = config.retry_base_backoff * 2u32.pow(attempt - 1);
                sleep(backoff.min(Duration::from_secs(5))).await;
            }
        }
    }

    if last.can_connect_smtp || last.error.is_some() {
        let _ = cache.smtp.set(&cache_key, last.clone(), None);
    }

    (last, false)
}

/// A single connection attempt against `mx_host:port`, running the full
/// sequence to completion.
pub async fn probe_once(mx_host: &str, port: u16, local: &str, domain: &str, config: &ProbeConfig) -> MailboxProbeResult {
    let Some(transport) = transport_for_port(port) else {
        return MailboxProbeResult::connect_failure("invalid port");
    };

    if config.sequence.steps.is_empty() {
        let connected = match transport {
            Transport::ImplicitTls => {
                let connector = match config.tls.build_connector() {
                    Ok(c) => c,
                    Err(_) => return MailboxProbeResult::connect_failure("tls_error"),
                };
                SmtpSession::connect_tls(mx_host, port, config.timeout, &connector).await
            }
            _ => SmtpSession::connect_plain(mx_host, port, config.timeout).await,
        };
        return match connected {
            Ok(_session) => MailboxProbeResult::trivial_success(),
            Err(_) => MailboxProbeResult::connect_failure("connection_failed"),
        };
    }

    let session = match transport {
        Transport::ImplicitTls => {
            let connector = match config.tls.build_connector() {
                Ok(c) => c,
                Err(_) => return MailboxProbeResult::connect_failure("tls_error"),
            };
            SmtpSession::connect_tls(mx_host, port, config.timeout, &connector).await
        }
        _ => SmtpSession::connect_plain(mx_host, port, config.timeout).await,
    };

    let mut session = match session {
        Ok(s) => s,
        Err(_) => return MailboxProbeResult::connect_failure("connection_failed"),
    };

    let sequence = if port == 25 {
        config.sequence.clone().with_helo_instead_of_ehlo()
    } else {
        config.sequence.clone()
    };

    let (result, quit_safe) = run_sequence(&mut session, &sequence, transport, local, domain, config).await;

    // Best-effort QUIT, but only when the socket is still known to be in a
    // consistent, connected state. A session error (closed connection,
    // malformed reply, timeout, TLS failure) means nothing further may be
    // written - see §4.5.5's no-further-writes-after-termination guard.
    if quit_safe {
        let _ = session.send_command("QUIT").await;
    }

    result
}

/// Drives greeting through the final step, producing the verdict: the
/// literal state machine, where every branch here corresponds to a row of
/// the RCPT/VRFY classification table.
///
/// Returns the verdict alongside whether the socket is still in a
/// consistent, connected state - `false` whenever a [`SessionError`] (a
/// closed connection, timeout, malformed reply, or TLS failure) is what
/// ended the run, since the caller must not write to a socket that died
/// mid-conversation.
async fn run_sequence(
    session: &mut SmtpSession,
    sequence: &Sequence,
    transport: Transport,
    local: &str,
    domain: &str,
    config: &ProbeConfig,
) -> (MailboxProbeResult, bool) {
    let mut tls_active = matches!(transport, Transport::ImplicitTls);
    let step_timeout = config.timeout;

    // GREETING: always awaited for any non-empty sequence; the server
    // speaks first.
    let greeting = match session.read_reply(step_timeout).await {
        Ok(reply) => reply,
        Err(err) => return (connection_error_before_greeting(err), false),
    };
    if greeting.code != 220 {
        return (indeterminate_after_connect(Some(greeting.code), "no_greeting"), true);
    }

    let mut vrfy_advertised = false;
    let want_ehlo = sequence.contains(Step::Ehlo);
    let want_helo = sequence.contains(Step::Helo);
    // `with_helo_instead_of_ehlo` rewrites `Ehlo` to `Helo`, so a sequence
    // never wants both; fixed for the whole greeting/STARTTLS loop below.
    let verb = if want_helo { "HELO" } else { "EHLO" };

    if want_ehlo || want_helo {
        loop {
            if let Err(err) = session.send_command(&format!("{verb} {}", config.hostname)).await {
                return (io_error_after_greeting(err), false);
            }
            let reply = match session.read_reply(step_timeout).await {
                Ok(r) => r,
                Err(err) => return (io_error_after_greeting(err), false),
            };
            if reply.code != 250 {
                let reason = if verb == "EHLO" { "ehlo_failed" } else { "helo_failed" };
                return (indeterminate_after_connect(Some(reply.code), reason), true);
            }

            let starttls_advertised = reply.advertises("STARTTLS");
            vrfy_advertised = reply.advertises("VRFY");

            if verb == "EHLO" && !tls_active && starttls_advertised && sequence.contains(Step::StartTls) {
                match do_starttls(session, step_timeout, &config.tls).await {
                    StartTlsOutcome::Upgraded => {
                        tls_active = true;
                        continue;
                    }
                    StartTlsOutcome::ServerDeclined => break,
                    StartTlsOutcome::Failed => {
                        return (indeterminate_after_connect(None, "tls_error"), false);
                    }
                    StartTlsOutcome::IoError(err) => return (io_error_after_greeting(err), false),
                }
            }
            break;
        }
    }

    if sequence.contains(Step::MailFrom) {
        let command = format!("MAIL FROM:{}", sequence.from);
        if let Err(err) = session.send_command(&command).await {
            return (io_error_after_greeting(err), false);
        }
        let reply = match session.read_reply(step_timeout).await {
            Ok(r) => r,
            Err(err) => return (io_error_after_greeting(err), false),
        };
        if reply.code != 250 {
            return (indeterminate_after_connect(Some(reply.code), "mail_from_rejected"), true);
        }
    }

    let vrfy_target = sequence.vrfy_target.clone().unwrap_or_else(|| local.to_string());
    let vrfy_requested = sequence.contains(Step::Vrfy);

    if sequence.contains(Step::RcptTo) {
        let command = format!("RCPT TO:<{local}@{domain}>");
        if let Err(err) = session.send_command(&command).await {
            return (io_error_after_greeting(err), false);
        }
        let reply = match session.read_reply(step_timeout).await {
            Ok(r) => r,
            Err(err) => return (io_error_after_greeting(err), false),
        };

        let outcome = classify::classify_rcpt(&reply, vrfy_requested, vrfy_advertised);
        return match outcome {
            RcptOutcome::Deliverable => (success(Some(reply.code)), true),
            RcptOutcome::FullInbox => (full_inbox(Some(reply.code)), true),
            RcptOutcome::Disabled => (disabled(Some(reply.code)), true),
            RcptOutcome::PolicyBlock => (indeterminate_after_connect(Some(reply.code), "policy_block"), true),
            RcptOutcome::Greylisted => (indeterminate_after_connect(Some(reply.code), "greylisted"), true),
            RcptOutcome::Ambiguous => (indeterminate_after_connect(Some(reply.code), "ambiguous"), true),
            RcptOutcome::FallBackToVrfy => run_vrfy(session, step_timeout, &vrfy_target).await,
        };
    } else if vrfy_requested {
        return run_vrfy(session, step_timeout, &vrfy_target).await;
    }

    // Sequence ended (e.g. caller supplied only GREETING/EHLO/QUIT) without
    // reaching a RCPT_TO/VRFY verdict: clean termination, result unknown.
    (indeterminate_after_connect(None, "sequence_incomplete"), true)
}

enum StartTlsOutcome {
    Upgraded,
    ServerDeclined,
    Failed,
    IoError(SessionError),
}

async fn do_starttls(session: &mut SmtpSession, step_timeout: Duration, tls: &TlsOptions) -> StartTlsOutcome {
    if let Err(err) = session.send_command("STARTTLS").await {
        return StartTlsOutcome::IoError(err);
    }
    let reply = match session.read_reply(step_timeout).await {
        Ok(r) => r,
        Err(err) => return StartTlsOutcome::IoError(err),
    };
    if reply.code != 220 {
        return StartTlsOutcome::ServerDeclined;
    }
    let connector = match tls.build_connector() {
        Ok(c) => c,
        Err(_) => return StartTlsOutcome::Failed,
    };
    match session.upgrade_tls(&connector).await {
        Ok(()) => StartTlsOutcome::Upgraded,
        Err(_) => StartTlsOutcome::Failed,
    }
}

async fn run_vrfy(session: &mut SmtpSession, step_timeout: Duration, target: &str) -> (MailboxProbeResult, bool) {
    if let Err(err) = session.send_command(&format!("VRFY {target}")).await {
        return (io_error_after_greeting(err), false);
    }
    let reply = match session.read_reply(step_timeout).await {
        Ok(r) => r,
        Err(err) => return (io_error_after_greeting(err), false),
    };
    let result = match classify::classify_vrfy(&reply) {
        VrfyOutcome::Deliverable => success(Some(reply.code)),
        VrfyOutcome::NotFound => disabled(Some(reply.code)),
        VrfyOutcome::Unknown => indeterminate_after_connect(Some(reply.code), "vrfy_unknown"),
    };
    (result, true)
}

fn success(code: Option<u16>) -> MailboxProbeResult {
    MailboxProbeResult {
        can_connect_smtp: true,
        is_deliverable: Some(true),
        has_full_inbox: false,
        is_catch_all: false,
        is_disabled: false,
        error: None,
        response_code: code,
        checked_at: SystemTime::now(),
    }
}

fn full_inbox(code: Option<u16>) -> MailboxProbeResult {
    MailboxProbeResult {
        can_connect_smtp: true,
        is_deliverable: Some(false),
        has_full_inbox: true,
        is_catch_all: false,
        is_disabled: false,
        error: Some("full_inbox".to_string()),
        response_code: code,
        checked_at: SystemTime::now(),
    }
}

fn disabled(code: Option<u16>) -> MailboxProbeResult {
    MailboxProbeResult {
        can_connect_smtp: true,
        is_deliverable: Some(false),
        has_full_inbox: false,
        is_catch_all: false,
        is_disabled: true,
        error: Some("disabled".to_string()),
        response_code: code,
        checked_at: SystemTime::now(),
    }
}

fn indeterminate_after_connect(code: Option<u16>, reason: &str) -> MailboxProbeResult {
    MailboxProbeResult {
        can_connect_smtp: true,
        is_deliverable: None,
        has_full_inbox: false,
        is_catch_all: false,
        is_disabled: false,
        error: Some(reason.to_string()),
        response_code: code,
        checked_at: SystemTime::now(),
    }
}

fn connection_error_before_greeting(_err: SessionError) -> MailboxProbeResult {
    MailboxProbeResult::connect_failure("connection_closed")
}

fn io_error_after_greeting(_err: SessionError) -> MailboxProbeResult {
    indeterminate_after_connect(None, "connection_closed")
}
