//! The `Driver` trait and an in-process implementation.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;

use regfault_core::{ErrorCode, RegistrationFault, RegistrationResult};

use crate::channel::ChannelUri;
use crate::protocol::{DriverCommand, DriverResponse, RegistrationId};

/// Receiving half of a driver's response stream.
pub type ResponseReceiver = mpsc::UnboundedReceiver<DriverResponse>;

/// Accepts registration commands on behalf of a driver.
///
/// Answers arrive asynchronously on the driver's response stream; `send`
/// only reports whether the command could be handed over.
///
/// Implementations must be `Send + Sync` so one driver handle can be shared
/// with the conductor task.
#[async_trait]
pub trait Driver: Send + Sync + 'static {
    /// Hand `cmd` to the driver.
    async fn send(&self, cmd: DriverCommand) -> RegistrationResult<()>;

    /// Identifier used in logs.
    fn name(&self) -> &str;
}

// ─── In-memory driver ─────────────────────────────────────────────────────────

#[derive(Debug)]
struct PublicationEntry {
    channel: String,
    stream_id: i32,
    session_id: i32,
}

#[derive(Debug, Default)]
struct DriverState {
    publications: HashMap<RegistrationId, PublicationEntry>,
    subscriptions: HashSet<RegistrationId>,
    /// Raw error responses to answer the next commands with.
    injected: VecDeque<(i32, String)>,
    next_session_id: i32,
    muted: bool,
}

/// A driver that lives in the same process.
///
/// Validates channels, tracks live registrations and answers on an unbounded
/// channel. Failures can be injected to exercise handling boundaries.
pub struct MemoryDriver {
    name: String,
    state: Mutex<DriverState>,
    responses: mpsc::UnboundedSender<DriverResponse>,
}

impl MemoryDriver {
    /// Create a driver and the stream its responses arrive on.
    pub fn new(name: impl Into<String>) -> (Self, ResponseReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let driver = Self {
            name: name.into(),
            state: Mutex::new(DriverState {
                next_session_id: 1,
                ..Default::default()
            }),
            responses: tx,
        };
        (driver, rx)
    }

    /// Answer the next `times` commands with `code` and `message`.
    pub fn fail_next(&self, times: usize, code: ErrorCode, message: impl Into<String>) {
        self.fail_next_raw(times, code.value(), message);
    }

    /// Like [`fail_next`](Self::fail_next) but with an arbitrary wire value.
    pub fn fail_next_raw(&self, times: usize, code: i32, message: impl Into<String>) {
        let message = message.into();
        let mut state = self.state();
        for _ in 0..times {
            state.injected.push_back((code, message.clone()));
        }
    }

    /// Stop answering commands. Accepted commands are dropped silently.
    pub fn mute(&self, muted: bool) {
        self.state().muted = muted;
    }

    pub fn publication_count(&self) -> usize {
        self.state().publications.len()
    }

    pub fn subscription_count(&self) -> usize {
        self.state().subscriptions.len()
    }

    fn state(&self) -> MutexGuard<'_, DriverState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn handle(&self, state: &mut DriverState, cmd: DriverCommand) -> DriverResponse {
        let correlation_id = cmd.correlation_id();
        if let Some((code, message)) = state.injected.pop_front() {
            return DriverResponse::Error {
                offending_correlation_id: correlation_id,
                code,
                message,
            };
        }

        match cmd {
            DriverCommand::AddPublication {
                channel, stream_id, ..
            } => {
                if let Err(fault) = ChannelUri::parse(&channel) {
                    return DriverResponse::error(correlation_id, &fault);
                }
                let session_id = state.next_session_id;
                state.next_session_id += 1;
                let log_file = format!("{}/publications/{correlation_id}.logbuffer", self.name);
                state.publications.insert(
                    correlation_id,
                    PublicationEntry {
                        channel,
                        stream_id,
                        session_id,
                    },
                );
                DriverResponse::PublicationReady {
                    correlation_id,
                    session_id,
                    stream_id,
                    log_file,
                }
            }
            DriverCommand::AddSubscription { channel, .. } => {
                if let Err(fault) = ChannelUri::parse(&channel) {
                    return DriverResponse::error(correlation_id, &fault);
                }
                state.subscriptions.insert(correlation_id);
                DriverResponse::SubscriptionReady { correlation_id }
            }
            DriverCommand::RemovePublication {
                registration_id, ..
            } => {
                if let Some(entry) = state.publications.remove(&registration_id) {
                    tracing::debug!(
                        driver = %self.name,
                        registration_id,
                        channel = %entry.channel,
                        stream_id = entry.stream_id,
                        session_id = entry.session_id,
                        "publication removed"
                    );
                    return DriverResponse::OperationSuccess { correlation_id };
                }
                let fault = if state.subscriptions.contains(&registration_id) {
                    RegistrationFault::new(
                        ErrorCode::UnknownPublication,
                        format!("registration {registration_id} is a subscription, not a publication"),
                    )
                } else {
                    unknown_registration(registration_id)
                };
                DriverResponse::error(correlation_id, &fault)
            }
            DriverCommand::RemoveSubscription {
                registration_id, ..
            } => {
                if state.subscriptions.remove(&registration_id) {
                    return DriverResponse::OperationSuccess { correlation_id };
                }
                let fault = if state.publications.contains_key(&registration_id) {
                    RegistrationFault::new(
                        ErrorCode::UnknownSubscription,
                        format!("registration {registration_id} is a publication, not a subscription"),
                    )
                } else {
                    unknown_registration(registration_id)
                };
                DriverResponse::error(correlation_id, &fault)
            }
        }
    }
}

fn unknown_registration(registration_id: RegistrationId) -> RegistrationFault {
    RegistrationFault::new(
        ErrorCode::UnknownRegistrationId,
        format!("unknown registration id: {registration_id}"),
    )
}

#[async_trait]
impl Driver for MemoryDriver {
    async fn send(&self, cmd: DriverCommand) -> RegistrationResult<()> {
        let response = {
            let mut state = self.state();
            if state.muted {
                tracing::debug!(driver = %self.name, command = cmd.kind(), "muted, dropping command");
                return Ok(());
            }
            self.handle(&mut state, cmd)
        };
        self.responses.send(response).map_err(|_| {
            RegistrationFault::generic(format!("driver '{}' response stream is closed", self.name))
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}
