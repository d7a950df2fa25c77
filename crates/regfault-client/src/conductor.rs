//! Background task that owns the driver link.
//!
//! Callers hand commands to the conductor together with a oneshot reply
//! slot. The conductor forwards each command to the driver, matches driver
//! responses to pending slots by correlation id, and turns error responses
//! into [`RegistrationFault`]s on its own task before handing them over.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use regfault_core::{CapturePolicy, RegistrationFault, RegistrationResult};

use crate::driver::{Driver, ResponseReceiver};
use crate::protocol::{fault_from_wire, CorrelationId, DriverCommand, DriverResponse};

pub(crate) type Reply = oneshot::Sender<RegistrationResult<DriverResponse>>;

/// Command sent from callers to the conductor task.
pub(crate) enum ConductorCommand {
    Send { command: DriverCommand, reply: Reply },
    /// The caller stopped waiting for `correlation_id`.
    Abandon { correlation_id: CorrelationId },
    Close,
}

pub(crate) fn spawn(
    driver: Arc<dyn Driver>,
    responses: ResponseReceiver,
    capture: CapturePolicy,
) -> (mpsc::UnboundedSender<ConductorCommand>, tokio::task::JoinHandle<()>) {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(async move {
        run(driver, cmd_rx, responses, capture).await;
    });
    (cmd_tx, handle)
}

async fn run(
    driver: Arc<dyn Driver>,
    mut cmd_rx: mpsc::UnboundedReceiver<ConductorCommand>,
    mut responses: ResponseReceiver,
    capture: CapturePolicy,
) {
    let mut pending: HashMap<CorrelationId, Reply> = HashMap::new();
    tracing::debug!(driver = driver.name(), "conductor started");

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => match cmd {
                Some(ConductorCommand::Send { command, reply }) => {
                    let correlation_id = command.correlation_id();
                    tracing::debug!(correlation_id, command = command.kind(), "sending to driver");
                    match driver.send(command).await {
                        Ok(()) => {
                            pending.insert(correlation_id, reply);
                        }
                        Err(fault) => {
                            let _ = reply.send(Err(fault.captured(capture)));
                        }
                    }
                }
                Some(ConductorCommand::Abandon { correlation_id }) => {
                    pending.remove(&correlation_id);
                }
                Some(ConductorCommand::Close) | None => break,
            },
            resp = responses.recv() => match resp {
                Some(resp) => on_response(&mut pending, resp, capture),
                None => {
                    tracing::warn!(driver = driver.name(), "driver response stream closed");
                    break;
                }
            },
        }
    }

    for (correlation_id, reply) in pending.drain() {
        let fault = RegistrationFault::generic(format!(
            "conductor stopped before the driver answered correlation id {correlation_id}"
        ))
        .captured(capture);
        let _ = reply.send(Err(fault));
    }
    tracing::debug!(driver = driver.name(), "conductor stopped");
}

fn on_response(
    pending: &mut HashMap<CorrelationId, Reply>,
    resp: DriverResponse,
    capture: CapturePolicy,
) {
    let correlation_id = resp.correlation_id();
    let Some(reply) = pending.remove(&correlation_id) else {
        tracing::debug!(correlation_id, "response for a command nobody is waiting on");
        return;
    };

    let outcome = match resp {
        DriverResponse::Error { code, message, .. } => {
            let fault = fault_from_wire(code, message).captured(capture);
            tracing::warn!(
                correlation_id,
                code = %fault.code(),
                "driver rejected command: {}",
                fault.message()
            );
            Err(fault)
        }
        other => Ok(other),
    };

    // The receiver is gone when the caller timed out concurrently.
    let _ = reply.send(outcome);
}
