//! Connection manager - resilient administrative session to one node
//!
//! Every command runs against a live session. When the transport reports
//! the session as broken, the session is dropped and the command is tried
//! again on a fresh one, up to the configured bound. Connect failures and
//! ordinary command failures are returned at once: retrying them cannot
//! help and could apply a mutating statement twice.

use crate::config::RetryConfig;
use crate::error::{NodeError, NodeResult};
use crate::node::NodeIdentity;
use crate::transport::{CommandResult, Param, Session, Transport, TransportError};
use tracing::{debug, info, warn};

/// Owns the administrative session to a single node
///
/// Calls take `&mut self`, so one instance handles one command at a time.
/// Share an instance across tasks only behind a mutex.
pub struct ConnectionManager<T: Transport> {
    identity: NodeIdentity,
    transport: T,
    retry: RetryConfig,
    session: Option<T::Session>,
}

impl<T: Transport> ConnectionManager<T> {
    /// Create a manager with the default retry policy. No I/O happens here.
    pub fn new(identity: NodeIdentity, transport: T) -> Self {
        Self::with_retry(identity, transport, RetryConfig::default())
    }

    pub fn with_retry(identity: NodeIdentity, transport: T, retry: RetryConfig) -> Self {
        Self {
            identity,
            transport,
            retry,
            session: None,
        }
    }

    pub fn identity(&self) -> &NodeIdentity {
        &self.identity
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// Whether a session is currently held
    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Session currently held, if any
    pub fn session(&self) -> Option<&T::Session> {
        self.session.as_ref()
    }

    /// Execute one administrative statement, reconnecting on broken sessions
    pub async fn execute(&mut self, command: &str, params: &[Param]) -> NodeResult<CommandResult> {
        self.execute_labeled(command, params, command).await
    }

    /// Like [`execute`](Self::execute), but logs and errors name the
    /// command by `label` instead of its text
    ///
    /// For statements carrying secrets, such as `CHANGE MASTER TO`.
    pub async fn execute_labeled(
        &mut self,
        command: &str,
        params: &[Param],
        label: &str,
    ) -> NodeResult<CommandResult> {
        let attempts = self.retry.effective_attempts();
        let mut last_error: Option<TransportError> = None;

        for attempt in 1..=attempts {
            if attempt > 1 && !self.retry.backoff().is_zero() {
                tokio::time::sleep(self.retry.backoff()).await;
            }

            // The slot stays empty while the command is in flight, so a
            // cancelled call never leaves a half-used session behind.
            let mut session = match self.session.take() {
                Some(session) => session,
                None => self.connect().await?,
            };

            debug!(
                node = %self.identity,
                attempt,
                "Executing `{}`",
                label
            );

            match session.execute(command, params).await {
                Ok(result) => {
                    self.session = Some(session);
                    return Ok(result);
                }
                Err(err) if err.is_connection_broken() => {
                    warn!(
                        node = %self.identity,
                        attempt,
                        max_attempts = attempts,
                        "Session broken while executing `{}`: {}",
                        label,
                        err
                    );
                    last_error = Some(err);
                }
                Err(err) => {
                    self.session = Some(session);
                    return Err(NodeError::CommandFailed {
                        command: label.to_string(),
                        source: err,
                    });
                }
            }
        }

        warn!(
            node = %self.identity,
            "Giving up on `{}` after {} attempts",
            label,
            attempts
        );

        Err(NodeError::ConnectionLost {
            address: self.identity.address().to_string(),
            attempts,
            source: last_error
                .unwrap_or_else(|| TransportError::broken_connection("no attempt was made")),
        })
    }

    /// Release the session, if one is held
    pub async fn close(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close().await;
            info!(node = %self.identity, "Closed administrative session");
        }
    }

    async fn connect(&self) -> NodeResult<T::Session> {
        let admin = self.identity.admin_user();

        match self
            .transport
            .connect(self.identity.address(), &admin.name, &admin.password, "")
            .await
        {
            Ok(session) => {
                info!(node = %self.identity, user = %admin.name, "Opened administrative session");
                Ok(session)
            }
            Err(err) => {
                warn!(node = %self.identity, "Connect failed: {}", err);
                Err(NodeError::ConnectFailed {
                    address: self.identity.address().to_string(),
                    source: err,
                })
            }
        }
    }
}
