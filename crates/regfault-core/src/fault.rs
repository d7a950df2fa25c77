//! The `RegistrationFault` value raised when a registration attempt fails.

use std::backtrace::Backtrace;
use std::error::Error as StdError;
use std::sync::Arc;

use thiserror::Error;

use crate::capture::CapturePolicy;
use crate::code::ErrorCode;

/// Shared, thread-safe handle to an underlying error.
pub type SharedCause = Arc<dyn StdError + Send + Sync + 'static>;

/// Result of any operation that registers or releases an endpoint.
pub type RegistrationResult<T> = Result<T, RegistrationFault>;

/// A failed registration, classified by an [`ErrorCode`].
///
/// Once built, a fault never changes: there is no `&mut self` API, and the
/// builder steps ([`with_cause`](Self::with_cause),
/// [`captured`](Self::captured)) consume `self`. Clones are cheap and share
/// the cause and backtrace.
///
/// # Equality
/// Two faults are equal when their `code` and `message` are equal. The cause
/// and any captured backtrace do not take part in the comparison.
#[derive(Debug, Clone, Error)]
#[error("{code}: {message}")]
pub struct RegistrationFault {
    code: ErrorCode,
    message: String,
    #[source]
    cause: Option<SharedCause>,
    trace: Option<Arc<Backtrace>>,
}

impl RegistrationFault {
    /// Build a fault. Nothing is captured; see [`captured`](Self::captured).
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            cause: None,
            trace: None,
        }
    }

    /// Attach the error that triggered this fault.
    pub fn with_cause<E>(mut self, cause: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        self.cause = Some(Arc::new(cause));
        self
    }

    /// Attach an already shared cause.
    pub fn with_shared_cause(mut self, cause: SharedCause) -> Self {
        self.cause = Some(cause);
        self
    }

    /// Record a backtrace at this point if `policy` asks for one.
    pub fn captured(mut self, policy: CapturePolicy) -> Self {
        self.trace = policy.capture().map(Arc::new);
        self
    }

    /// The classification supplied at construction.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// The diagnostic text supplied at construction.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The triggering error, if one was attached.
    pub fn cause(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.cause.as_deref()
    }

    /// The backtrace recorded by [`captured`](Self::captured), if any.
    pub fn backtrace(&self) -> Option<&Backtrace> {
        self.trace.as_deref()
    }

    /// Returns `true` if this fault carries `code`.
    pub fn is(&self, code: ErrorCode) -> bool {
        self.code == code
    }

    /// Build a `GENERIC_ERROR` fault.
    pub fn generic(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::GenericError, message)
    }

    /// Build an `INVALID_CHANNEL` fault.
    pub fn invalid_channel(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidChannel, message)
    }
}

impl PartialEq for RegistrationFault {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code && self.message == other.message
    }
}

impl Eq for RegistrationFault {}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_return_construction_values() {
        for &code in ErrorCode::ALL {
            let msg = format!("failure for {code}");
            let fault = RegistrationFault::new(code, msg.clone());
            assert_eq!(fault.code(), code);
            assert_eq!(fault.message(), msg);
        }
    }

    #[test]
    fn accessors_are_idempotent() {
        let fault = RegistrationFault::new(ErrorCode::UnknownHost, "no such host: nowhere");
        let first = (fault.code(), fault.message().to_string());
        for _ in 0..5 {
            assert_eq!(fault.code(), first.0);
            assert_eq!(fault.message(), first.1);
        }
    }

    #[test]
    fn display_includes_code_and_message() {
        let fault = RegistrationFault::invalid_channel("aeron:tcp?endpoint=x");
        assert_eq!(fault.to_string(), "INVALID_CHANNEL: aeron:tcp?endpoint=x");
    }

    #[test]
    fn equality_ignores_cause_and_trace() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let a = RegistrationFault::generic("driver failed").with_cause(io);
        let b = RegistrationFault::generic("driver failed").captured(CapturePolicy::Always);
        let c = RegistrationFault::generic("driver failed");
        // reflexive, symmetric, transitive
        assert_eq!(a, a);
        assert_eq!(a, b);
        assert_eq!(b, a);
        assert_eq!(b, c);
        assert_eq!(a, c);
    }

    #[test]
    fn differing_code_or_message_is_unequal() {
        let a = RegistrationFault::new(ErrorCode::UnknownPublication, "id 7");
        assert_ne!(a, RegistrationFault::new(ErrorCode::UnknownSubscription, "id 7"));
        assert_ne!(a, RegistrationFault::new(ErrorCode::UnknownPublication, "id 8"));
    }

    #[test]
    fn cause_is_exposed_as_source() {
        let inner = RegistrationFault::new(ErrorCode::ChannelEndpointError, "bind failed");
        let outer = RegistrationFault::generic("add publication failed").with_cause(inner.clone());

        let source = outer.source().expect("source");
        assert_eq!(source.to_string(), inner.to_string());
        let chained = outer
            .cause()
            .and_then(|c| c.downcast_ref::<RegistrationFault>())
            .expect("cause is a fault");
        assert_eq!(chained.code(), ErrorCode::ChannelEndpointError);
    }

    #[test]
    fn no_backtrace_unless_requested() {
        let fault = RegistrationFault::generic("x");
        assert!(fault.backtrace().is_none());
        let fault = fault.captured(CapturePolicy::Never);
        assert!(fault.backtrace().is_none());
        let fault = fault.captured(CapturePolicy::Always);
        assert!(fault.backtrace().is_some());
    }

    #[test]
    fn clones_share_identity_of_parts() {
        let fault = RegistrationFault::generic("x").captured(CapturePolicy::Always);
        let copy = fault.clone();
        assert!(std::ptr::eq(
            fault.backtrace().unwrap(),
            copy.backtrace().unwrap()
        ));
    }

    #[test]
    fn fault_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync + 'static>() {}
        assert_send_sync::<RegistrationFault>();
    }
}
