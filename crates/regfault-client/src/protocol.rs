//! Commands sent to a driver and the responses it answers with.

use regfault_core::{ErrorCode, RegistrationFault};

/// Client-assigned id pairing a command with its response.
pub type CorrelationId = i64;

/// Id of a live registration. Equal to the correlation id of the add command
/// that created it.
pub type RegistrationId = i64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCommand {
    AddPublication {
        correlation_id: CorrelationId,
        channel: String,
        stream_id: i32,
    },
    AddSubscription {
        correlation_id: CorrelationId,
        channel: String,
        stream_id: i32,
    },
    RemovePublication {
        correlation_id: CorrelationId,
        registration_id: RegistrationId,
    },
    RemoveSubscription {
        correlation_id: CorrelationId,
        registration_id: RegistrationId,
    },
}

impl DriverCommand {
    pub fn correlation_id(&self) -> CorrelationId {
        match self {
            Self::AddPublication { correlation_id, .. }
            | Self::AddSubscription { correlation_id, .. }
            | Self::RemovePublication { correlation_id, .. }
            | Self::RemoveSubscription { correlation_id, .. } => *correlation_id,
        }
    }

    /// Short name used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AddPublication { .. } => "add_publication",
            Self::AddSubscription { .. } => "add_subscription",
            Self::RemovePublication { .. } => "remove_publication",
            Self::RemoveSubscription { .. } => "remove_subscription",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverResponse {
    /// A publication is ready for use.
    PublicationReady {
        correlation_id: CorrelationId,
        session_id: i32,
        stream_id: i32,
        log_file: String,
    },
    /// A subscription is ready for use.
    SubscriptionReady { correlation_id: CorrelationId },
    /// A removal completed.
    OperationSuccess { correlation_id: CorrelationId },
    /// The command identified by `offending_correlation_id` failed.
    Error {
        offending_correlation_id: CorrelationId,
        code: i32,
        message: String,
    },
}

impl DriverResponse {
    pub fn correlation_id(&self) -> CorrelationId {
        match self {
            Self::PublicationReady { correlation_id, .. }
            | Self::SubscriptionReady { correlation_id }
            | Self::OperationSuccess { correlation_id } => *correlation_id,
            Self::Error {
                offending_correlation_id,
                ..
            } => *offending_correlation_id,
        }
    }

    /// Build an error response from a fault raised inside a driver.
    pub fn error(correlation_id: CorrelationId, fault: &RegistrationFault) -> Self {
        Self::Error {
            offending_correlation_id: correlation_id,
            code: fault.code().value(),
            message: fault.message().to_string(),
        }
    }
}

/// Classify an error response.
///
/// A raw code this client does not know becomes `GENERIC_ERROR`; the raw
/// value is kept in the message.
pub fn fault_from_wire(code: i32, message: String) -> RegistrationFault {
    match ErrorCode::try_from(code) {
        Ok(code) => RegistrationFault::new(code, message),
        Err(unknown) => RegistrationFault::generic(format!("{message} (driver error code {code})"))
            .with_cause(unknown),
    }
}
