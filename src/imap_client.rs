use async_imap::Session;
use async_native_tls::{TlsConnector, TlsStream};
use futures::stream::StreamExt;
use log::{debug, info, warn};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncReadCompatExt};

use crate::config::{MailConfig, MAILBOX};
use crate::email::RawMessage;
use crate::error::MailError;

/// Subject search selecting candidate notifications (server-evaluated).
pub const CANDIDATE_SEARCH: &str = "OR OR SUBJECT \"temporary access code\" SUBJECT \"temporaire\" \
                                    OR SUBJECT \"Netflix Household\" SUBJECT \"foyer\"";

/// Where the pipeline gets its candidate messages from
pub trait MailSource: Send + Sync {
    fn fetch_candidates<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<RawMessage>, MailError>> + Send + 'a>>;
}

type ImapSession = Session<TlsStream<Compat<TcpStream>>>;

pub struct ImapClient {
    session: ImapSession,
    timeout: Duration,
}

/// Bounds one network step by the configured timeout.
async fn with_timeout<T, F>(timeout: Duration, step: &str, fut: F) -> Result<T, MailError>
where
    F: Future<Output = Result<T, MailError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(MailError::Connection(format!("{} timed out after {:?}", step, timeout))),
    }
}

impl ImapClient {
    /// Opens an authenticated session, retrying transport failures.
    pub async fn connect(config: &MailConfig) -> Result<Self, MailError> {
        let mut attempt = 1;
        loop {
            match Self::connect_once(config).await {
                Ok(client) => return Ok(client),
                Err(e) if e.is_retryable() && attempt < config.connect_attempts => {
                    let backoff = Duration::from_secs(2 * u64::from(attempt));
                    warn!(
                        "IMAP connection attempt {}/{} failed: {} - retrying in {:?}",
                        attempt, config.connect_attempts, e, backoff
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn connect_once(config: &MailConfig) -> Result<Self, MailError> {
        let timeout = config.timeout();
        info!("Connecting to IMAP server {}:{}", config.server, config.port);

        let tcp_stream = with_timeout(timeout, "TCP connect", async {
            TcpStream::connect((config.server.as_str(), config.port))
                .await
                .map_err(|e| MailError::Connection(format!("unable to reach {}: {}", config.server, e)))
        })
        .await?;

        let tls = TlsConnector::new();
        let tls_stream = with_timeout(timeout, "TLS handshake", async {
            tls.connect(config.server.as_str(), tcp_stream.compat())
                .await
                .map_err(|e| MailError::Connection(format!("TLS handshake failed: {}", e)))
        })
        .await?;

        let client = async_imap::Client::new(tls_stream);

        let session = with_timeout(timeout, "LOGIN", async {
            client
                .login(&config.username, &config.password)
                .await
                .map_err(|(e, _client)| match MailError::from(e) {
                    MailError::Connection(reason) => MailError::Connection(reason),
                    other => MailError::Auth(other.to_string()),
                })
        })
        .await?;

        info!("✅ IMAP session established");
        Ok(ImapClient { session, timeout })
    }

    /// Selects the mailbox and returns candidate ids in ascending order.
    pub async fn search_candidates(&mut self) -> Result<Vec<u32>, MailError> {
        let timeout = self.timeout;
        let session = &mut self.session;

        with_timeout(timeout, "SELECT", async {
            session.select(MAILBOX).await.map_err(MailError::from)
        })
        .await?;
        debug!("Mailbox {} selected", MAILBOX);

        debug!("Search criteria: {}", CANDIDATE_SEARCH);
        let ids = with_timeout(timeout, "SEARCH", async {
            session.search(CANDIDATE_SEARCH).await.map_err(MailError::from)
        })
        .await?;

        let mut ids: Vec<u32> = ids.into_iter().collect();
        ids.sort_unstable();
        info!("Found {} email(s) matching the criteria", ids.len());
        Ok(ids)
    }

    pub async fn fetch_raw(&mut self, message_id: u32) -> Result<RawMessage, MailError> {
        let timeout = self.timeout;
        let session = &mut self.session;

        let bodies: Vec<Vec<u8>> = with_timeout(timeout, "FETCH", async {
            let stream = session
                .fetch(message_id.to_string(), "RFC822")
                .await
                .map_err(MailError::from)?;

            let mut bodies = Vec::new();
            let responses: Vec<_> = stream.collect().await;
            for response in responses {
                if let Some(body) = response.map_err(MailError::from)?.body() {
                    bodies.push(body.to_vec());
                }
            }
            Ok(bodies)
        })
        .await?;

        match bodies.into_iter().next() {
            Some(content) => {
                debug!("Email {} fetched, size: {} bytes", message_id, content.len());
                Ok(RawMessage::new(message_id, content))
            }
            None => Err(MailError::Protocol(format!("empty FETCH response for message {}", message_id))),
        }
    }

    pub async fn logout(mut self) -> Result<(), MailError> {
        info!("Logging out from IMAP server");
        let timeout = self.timeout;
        let session = &mut self.session;
        with_timeout(timeout, "LOGOUT", async {
            session.logout().await.map_err(MailError::from)
        })
        .await
    }

    /// Searches and fetches every candidate, then always logs out.
    pub async fn fetch_candidates(mut self) -> Result<Vec<RawMessage>, MailError> {
        let result = self.search_and_fetch().await;

        if let Err(e) = self.logout().await {
            warn!("IMAP logout failed: {}", e);
        }

        result
    }

    async fn search_and_fetch(&mut self) -> Result<Vec<RawMessage>, MailError> {
        let ids = self.search_candidates().await?;

        let mut messages = Vec::with_capacity(ids.len());
        for id in ids {
            messages.push(self.fetch_raw(id).await?);
        }
        Ok(messages)
    }
}

/// Opens a fresh IMAP session for every run
#[derive(Debug, Clone)]
pub struct ImapMailSource {
    config: MailConfig,
}

impl ImapMailSource {
    pub fn new(config: MailConfig) -> Self {
        ImapMailSource { config }
    }
}

impl MailSource for ImapMailSource {
    fn fetch_candidates<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<RawMessage>, MailError>> + Send + 'a>> {
        Box::pin(async move {
            let client = ImapClient::connect(&self.config).await?;
            client.fetch_candidates().await
        })
    }
}
