//! IMAP/SMTP mailbox — fetches the latest unread email over IMAP (rustls),
//! sends replies over SMTP via lettre.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use mail_parser::{MessageParser, MimeHeaders};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};
use uuid::Uuid;

use crate::channels::mailbox::{MailboxGateway, OutgoingReply};
use crate::config::{Env, parsed, required};
use crate::error::{ChannelError, ConfigError};
use crate::pipeline::types::InboundMessage;

const CHANNEL: &str = "imap";

// ── Configuration ───────────────────────────────────────────────────

/// Mailbox configuration, built from environment variables.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub imap_host: String,
    pub imap_port: u16,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: SecretString,
    pub from_address: String,
}

impl EmailConfig {
    pub fn from_env(env: Env<'_>) -> Result<Self, ConfigError> {
        let imap_host = required(env, "EMAIL_IMAP_HOST", "IMAP server for inbound mail.")?;
        let imap_port = parsed(env, "EMAIL_IMAP_PORT", 993u16)?;
        let smtp_host =
            env("EMAIL_SMTP_HOST").unwrap_or_else(|| imap_host.replace("imap", "smtp"));
        let smtp_port = parsed(env, "EMAIL_SMTP_PORT", 587u16)?;
        let username = required(env, "EMAIL_USERNAME", "Mailbox login.")?;
        let password = required(env, "EMAIL_PASSWORD", "Mailbox password or app password.")?;
        let from_address = env("EMAIL_FROM_ADDRESS").unwrap_or_else(|| username.clone());

        Ok(Self {
            imap_host,
            imap_port,
            smtp_host,
            smtp_port,
            username,
            password: SecretString::from(password),
            from_address,
        })
    }
}

// ── Gateway ─────────────────────────────────────────────────────────

/// Mailbox gateway over IMAP (inbound) + SMTP (outbound).
pub struct ImapSmtpMailbox {
    config: Arc<EmailConfig>,
}

impl ImapSmtpMailbox {
    pub fn new(config: EmailConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

#[async_trait]
impl MailboxGateway for ImapSmtpMailbox {
    fn name(&self) -> &str {
        CHANNEL
    }

    async fn fetch_latest_unread(&self) -> Result<Option<InboundMessage>, ChannelError> {
        let cfg = Arc::clone(&self.config);
        let fetched = tokio::task::spawn_blocking(move || fetch_latest_unseen_imap(&cfg))
            .await
            .map_err(|e| fetch_failed(format!("IMAP task panicked: {e}")))?
            .map_err(|e| match e.downcast::<ChannelError>() {
                Ok(channel_error) => *channel_error,
                Err(other) => fetch_failed(other.to_string()),
            })?;

        let Some(message) = fetched else {
            info!("No unread messages found");
            return Ok(None);
        };

        info!(
            sender = %message.sender_email,
            subject = %message.subject,
            "Fetched latest unread email"
        );
        Ok(Some(message))
    }

    async fn send_reply(&self, reply: &OutgoingReply) -> Result<String, ChannelError> {
        let cfg = Arc::clone(&self.config);
        let reply = reply.clone();
        tokio::task::spawn_blocking(move || send_email(&cfg, &reply))
            .await
            .map_err(|e| send_failed(format!("SMTP task panicked: {e}")))?
    }
}

fn fetch_failed(reason: String) -> ChannelError {
    ChannelError::FetchFailed {
        name: CHANNEL.into(),
        reason,
    }
}

fn send_failed(reason: String) -> ChannelError {
    ChannelError::SendFailed {
        name: CHANNEL.into(),
        reason,
    }
}

/// Send an email via SMTP (blocking). Returns the generated Message-ID.
fn send_email(config: &EmailConfig, reply: &OutgoingReply) -> Result<String, ChannelError> {
    let creds = Credentials::new(
        config.username.clone(),
        config.password.expose_secret().to_string(),
    );

    let builder = if config.smtp_port == 465 {
        SmtpTransport::relay(&config.smtp_host)
    } else {
        SmtpTransport::starttls_relay(&config.smtp_host)
    };
    let transport = builder
        .map_err(|e| send_failed(format!("SMTP relay error: {e}")))?
        .port(config.smtp_port)
        .credentials(creds)
        .build();

    let message_id = generate_message_id(&config.from_address);

    let mut email = Message::builder()
        .from(
            config
                .from_address
                .parse()
                .map_err(|e| send_failed(format!("Invalid from address: {e}")))?,
        )
        .to(reply
            .to
            .parse()
            .map_err(|e| send_failed(format!("Invalid to address: {e}")))?)
        .subject(reply.subject.as_str())
        .message_id(Some(message_id.clone()))
        .header(ContentType::TEXT_PLAIN);

    if let Some(ref parent) = reply.in_reply_to {
        email = email.in_reply_to(parent.clone()).references(parent.clone());
    }

    let email = email
        .body(reply.body.clone())
        .map_err(|e| send_failed(format!("Failed to build email: {e}")))?;

    transport
        .send(&email)
        .map_err(|e| send_failed(format!("SMTP send failed: {e}")))?;

    info!(to = %reply.to, message_id = %message_id, "Email sent");
    Ok(message_id)
}

// ── Helpers (public for testing) ────────────────────────────────────

/// `<uuid@domain>` using the domain of the From address.
pub fn generate_message_id(from_address: &str) -> String {
    let domain = from_address
        .rsplit_once('@')
        .map(|(_, d)| d.trim_end_matches('>'))
        .filter(|d| !d.is_empty())
        .unwrap_or("localhost");
    format!("<{}@{}>", Uuid::new_v4(), domain)
}

/// Strip HTML tags from content (basic).
pub fn strip_html(html: &str) -> String {
    let mut result = String::new();
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(ch),
            _ => {}
        }
    }
    result.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse a raw RFC 822 message into an `InboundMessage`.
pub fn parse_raw_message(raw: &[u8]) -> Option<InboundMessage> {
    let parsed = MessageParser::default().parse(raw)?;

    let subject = parsed
        .subject()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("(No Subject)")
        .to_string();

    Some(InboundMessage {
        subject,
        body: extract_text(&parsed).trim().to_string(),
        sender_email: extract_sender(&parsed),
        message_id: parsed.message_id().map(|id| format!("<{id}>")),
        received_at: parsed.date().and_then(to_utc),
    })
}

/// Extract the sender address from a parsed email.
fn extract_sender(parsed: &mail_parser::Message) -> String {
    parsed
        .from()
        .and_then(|addr| addr.first())
        .and_then(|a| a.address())
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

/// Extract readable text: plain text first, then stripped HTML, then any
/// text attachment.
fn extract_text(parsed: &mail_parser::Message) -> String {
    if let Some(text) = parsed.body_text(0) {
        return text.to_string();
    }
    if let Some(html) = parsed.body_html(0) {
        return strip_html(html.as_ref());
    }
    for part in parsed.attachments() {
        let part: &mail_parser::MessagePart = part;
        if let Some(ct) = MimeHeaders::content_type(part)
            && ct.ctype() == "text"
            && let Ok(text) = std::str::from_utf8(part.contents())
        {
            return text.to_string();
        }
    }
    String::new()
}

fn to_utc(d: &mail_parser::DateTime) -> Option<DateTime<Utc>> {
    chrono::NaiveDate::from_ymd_opt(i32::from(d.year), u32::from(d.month), u32::from(d.day))
        .and_then(|date| {
            date.and_hms_opt(u32::from(d.hour), u32::from(d.minute), u32::from(d.second))
        })
        .map(|naive| naive.and_utc())
}

// ── IMAP ────────────────────────────────────────────────────────────

/// Error type for IMAP fetch operations.
type ImapError = Box<dyn std::error::Error + Send + Sync>;

type TlsStream = rustls::StreamOwned<rustls::ClientConnection, TcpStream>;

/// Connect over TLS and fetch the newest unseen INBOX message (blocking, run
/// in spawn_blocking).
fn fetch_latest_unseen_imap(config: &EmailConfig) -> Result<Option<InboundMessage>, ImapError> {
    let tcp = TcpStream::connect((&*config.imap_host, config.imap_port))?;
    tcp.set_read_timeout(Some(Duration::from_secs(30)))?;

    let mut root_store = rustls::RootCertStore::empty();
    root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let tls_config = Arc::new(
        rustls::ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth(),
    );
    let server_name: rustls::pki_types::ServerName<'_> =
        rustls::pki_types::ServerName::try_from(config.imap_host.clone())?;
    let conn = rustls::ClientConnection::new(tls_config, server_name)?;
    let mut tls: TlsStream = rustls::StreamOwned::new(conn, tcp);

    fetch_newest_unseen(&mut tls, config)
}

/// IMAP session: login, `SEARCH UNSEEN`, `FETCH BODY.PEEK[]` of the highest
/// sequence number, then `STORE \Seen`.
///
/// The message is parsed before it is flagged, so one that cannot be parsed
/// stays unread.
fn fetch_newest_unseen<S: Read + Write>(
    stream: &mut S,
    config: &EmailConfig,
) -> Result<Option<InboundMessage>, ImapError> {
    let _greeting = read_line(stream)?;

    let login = send_cmd(
        stream,
        "A1",
        &format!(
            "LOGIN \"{}\" \"{}\"",
            config.username,
            config.password.expose_secret()
        ),
    )?;
    if !login.is_ok() {
        return Err("IMAP login failed".into());
    }

    let _select = send_cmd(stream, "A2", "SELECT \"INBOX\"")?;

    let search = send_cmd(stream, "A3", "SEARCH UNSEEN")?;
    let Some(latest) = latest_sequence_number(&search.lines) else {
        let _ = send_cmd(stream, "A4", "LOGOUT");
        return Ok(None);
    };
    debug!(seq = latest, "Fetching newest unseen message");

    let fetch = send_cmd(stream, "A4", &format!("FETCH {latest} BODY.PEEK[]"))?;
    let raw = fetch.literals.into_iter().next().unwrap_or_default();

    let Some(message) = parse_raw_message(&raw) else {
        let _ = send_cmd(stream, "A5", "LOGOUT");
        return Err(ChannelError::InvalidMessage(format!(
            "message {latest} could not be parsed, left unread"
        ))
        .into());
    };

    let _ = send_cmd(stream, "A5", &format!("STORE {latest} +FLAGS (\\Seen)"))?;
    let _ = send_cmd(stream, "A6", "LOGOUT");

    Ok(Some(message))
}

/// Untagged and tagged lines of one command, plus any `{n}` literals.
struct ImapResponse {
    lines: Vec<String>,
    literals: Vec<Vec<u8>>,
}

impl ImapResponse {
    fn is_ok(&self) -> bool {
        self.lines
            .last()
            .and_then(|l| l.split_whitespace().nth(1))
            .is_some_and(|status| status.eq_ignore_ascii_case("OK"))
    }
}

fn read_line<S: Read>(stream: &mut S) -> Result<String, ImapError> {
    let mut buf = Vec::new();
    loop {
        let mut byte = [0u8; 1];
        match stream.read(&mut byte) {
            Ok(0) => return Err("IMAP connection closed".into()),
            Ok(_) => {
                buf.push(byte[0]);
                if buf.ends_with(b"\r\n") {
                    return Ok(String::from_utf8_lossy(&buf).to_string());
                }
            }
            Err(e) => return Err(e.into()),
        }
    }
}

fn send_cmd<S: Read + Write>(
    stream: &mut S,
    tag: &str,
    cmd: &str,
) -> Result<ImapResponse, ImapError> {
    stream.write_all(format!("{tag} {cmd}\r\n").as_bytes())?;
    stream.flush()?;

    let tagged = format!("{tag} ");
    let mut response = ImapResponse {
        lines: Vec::new(),
        literals: Vec::new(),
    };
    loop {
        let line = read_line(stream)?;
        if let Some(size) = literal_size(&line) {
            let mut literal = vec![0u8; size];
            stream.read_exact(&mut literal)?;
            response.literals.push(literal);
        }
        let done = line.starts_with(&tagged);
        response.lines.push(line);
        if done {
            return Ok(response);
        }
    }
}

/// Size `n` of a line ending in a `{n}` literal marker.
fn literal_size(line: &str) -> Option<usize> {
    let (_, marker) = line.trim_end().strip_suffix('}')?.rsplit_once('{')?;
    marker.parse().ok()
}

/// Highest sequence number in `* SEARCH` response lines.
pub fn latest_sequence_number(lines: &[String]) -> Option<u32> {
    lines
        .iter()
        .filter(|l| l.starts_with("* SEARCH"))
        .flat_map(|l| l.split_whitespace().skip(2))
        .filter_map(|n| n.parse::<u32>().ok())
        .max()
}

// ── Tests ───────────────────────────────────────────────────────────
