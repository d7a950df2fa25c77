//! `RegistrationClient` — adds and releases publications and subscriptions.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use regfault_core::{retry_registration, RegistrationFault, RegistrationResult};

use crate::channel::ChannelUri;
use crate::conductor::{self, ConductorCommand};
use crate::config::ClientConfig;
use crate::driver::{Driver, ResponseReceiver};
use crate::protocol::{CorrelationId, DriverCommand, DriverResponse, RegistrationId};

/// A publication the driver has set up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publication {
    pub registration_id: RegistrationId,
    pub channel: String,
    pub stream_id: i32,
    pub session_id: i32,
    pub log_file: String,
}

/// A subscription the driver has set up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub registration_id: RegistrationId,
    pub channel: String,
    pub stream_id: i32,
}

/// Registers endpoints with a driver through a background conductor task.
///
/// Every failed operation returns exactly one [`RegistrationFault`]. Faults
/// detected by the conductor (driver error responses, a stopped conductor)
/// are built on the conductor task and delivered here unchanged.
pub struct RegistrationClient {
    cmd_tx: mpsc::UnboundedSender<ConductorCommand>,
    next_correlation_id: AtomicI64,
    config: ClientConfig,
    task: JoinHandle<()>,
}

impl RegistrationClient {
    /// Start the conductor task. Must be called from within a Tokio runtime.
    pub fn start(driver: Arc<dyn Driver>, responses: ResponseReceiver, config: ClientConfig) -> Self {
        tracing::info!(
            driver = driver.name(),
            driver_timeout_ms = config.driver_timeout_ms,
            "starting registration client"
        );
        let (cmd_tx, task) = conductor::spawn(driver, responses, config.capture);
        Self {
            cmd_tx,
            next_correlation_id: AtomicI64::new(1),
            config,
            task,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Add a publication on `channel` / `stream_id`.
    pub async fn add_publication(
        &self,
        channel: &str,
        stream_id: i32,
    ) -> RegistrationResult<Publication> {
        self.validate(channel)?;
        let correlation_id = self.next_id();
        let resp = self
            .request(DriverCommand::AddPublication {
                correlation_id,
                channel: channel.to_string(),
                stream_id,
            })
            .await?;
        match resp {
            DriverResponse::PublicationReady {
                session_id,
                stream_id,
                log_file,
                ..
            } => Ok(Publication {
                registration_id: correlation_id,
                channel: channel.to_string(),
                stream_id,
                session_id,
                log_file,
            }),
            other => Err(self.unexpected("add publication", &other)),
        }
    }

    /// Add a subscription on `channel` / `stream_id`.
    pub async fn add_subscription(
        &self,
        channel: &str,
        stream_id: i32,
    ) -> RegistrationResult<Subscription> {
        self.validate(channel)?;
        let correlation_id = self.next_id();
        let resp = self
            .request(DriverCommand::AddSubscription {
                correlation_id,
                channel: channel.to_string(),
                stream_id,
            })
            .await?;
        match resp {
            DriverResponse::SubscriptionReady { .. } => Ok(Subscription {
                registration_id: correlation_id,
                channel: channel.to_string(),
                stream_id,
            }),
            other => Err(self.unexpected("add subscription", &other)),
        }
    }

    pub async fn release_publication(&self, registration_id: RegistrationId) -> RegistrationResult<()> {
        let correlation_id = self.next_id();
        self.expect_success(
            "release publication",
            DriverCommand::RemovePublication {
                correlation_id,
                registration_id,
            },
        )
        .await
    }

    pub async fn release_subscription(&self, registration_id: RegistrationId) -> RegistrationResult<()> {
        let correlation_id = self.next_id();
        self.expect_success(
            "release subscription",
            DriverCommand::RemoveSubscription {
                correlation_id,
                registration_id,
            },
        )
        .await
    }

    /// [`add_publication`](Self::add_publication) retried under the configured
    /// bounds for as long as `is_retryable` accepts the fault.
    pub async fn add_publication_with_retry<P>(
        &self,
        channel: &str,
        stream_id: i32,
        is_retryable: P,
    ) -> RegistrationResult<Publication>
    where
        P: Fn(&RegistrationFault) -> bool,
    {
        let policy = self.config.retry.policy();
        retry_registration(&policy, is_retryable, move || self.add_publication(channel, stream_id)).await
    }

    /// [`add_subscription`](Self::add_subscription) retried under the
    /// configured bounds for as long as `is_retryable` accepts the fault.
    pub async fn add_subscription_with_retry<P>(
        &self,
        channel: &str,
        stream_id: i32,
        is_retryable: P,
    ) -> RegistrationResult<Subscription>
    where
        P: Fn(&RegistrationFault) -> bool,
    {
        let policy = self.config.retry.policy();
        retry_registration(&policy, is_retryable, move || self.add_subscription(channel, stream_id)).await
    }

    /// Stop the conductor. Pending operations fail with `GENERIC_ERROR`.
    pub async fn close(mut self) {
        let _ = self.cmd_tx.send(ConductorCommand::Close);
        let _ = (&mut self.task).await;
    }

    fn next_id(&self) -> CorrelationId {
        self.next_correlation_id.fetch_add(1, Ordering::Relaxed)
    }

    fn validate(&self, channel: &str) -> RegistrationResult<()> {
        ChannelUri::parse(channel)
            .map(|_| ())
            .map_err(|fault| fault.captured(self.config.capture))
    }

    fn unexpected(&self, op: &str, resp: &DriverResponse) -> RegistrationFault {
        RegistrationFault::generic(format!("unexpected driver response to {op}: {resp:?}"))
            .captured(self.config.capture)
    }

    async fn expect_success(&self, op: &str, command: DriverCommand) -> RegistrationResult<()> {
        match self.request(command).await? {
            DriverResponse::OperationSuccess { .. } => Ok(()),
            other => Err(self.unexpected(op, &other)),
        }
    }

    async fn request(&self, command: DriverCommand) -> RegistrationResult<DriverResponse> {
        let correlation_id = command.correlation_id();
        let (reply, rx) = oneshot::channel();
        self.cmd_tx
            .send(ConductorCommand::Send { command, reply })
            .map_err(|_| self.stopped())?;

        // Armed until an answer arrives, so a timeout or a dropped future
        // both release the conductor's pending entry.
        let mut guard = AbandonOnDrop {
            cmd_tx: &self.cmd_tx,
            correlation_id,
            armed: true,
        };
        let timeout = self.config.driver_timeout();
        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(outcome)) => {
                guard.armed = false;
                outcome
            }
            Ok(Err(_)) => {
                guard.armed = false;
                Err(self.stopped())
            }
            Err(_) => {
                tracing::warn!(correlation_id, timeout_ms = timeout.as_millis() as u64, "driver timed out");
                Err(RegistrationFault::generic(format!(
                    "driver did not answer correlation id {correlation_id} within {} ms",
                    timeout.as_millis()
                ))
                .captured(self.config.capture))
            }
        }
    }

    fn stopped(&self) -> RegistrationFault {
        RegistrationFault::generic("registration conductor is not running")
            .captured(self.config.capture)
    }
}

impl Drop for RegistrationClient {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(ConductorCommand::Close);
    }
}

struct AbandonOnDrop<'a> {
    cmd_tx: &'a mpsc::UnboundedSender<ConductorCommand>,
    correlation_id: CorrelationId,
    armed: bool,
}

impl Drop for AbandonOnDrop<'_> {
    fn drop(&mut self) {
        if self.armed {
            tracing::debug!(correlation_id = self.correlation_id, "abandoning request");
            let _ = self.cmd_tx.send(ConductorCommand::Abandon {
                correlation_id: self.correlation_id,
            });
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
