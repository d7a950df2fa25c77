//! regfault-core — classified faults for endpoint registration.
//!
//! When a request to add or remove a publication or subscription fails, the
//! failure is reported as one [`RegistrationFault`]: an immutable value that
//! pairs a closed [`ErrorCode`] with a human-readable message. Handling code
//! matches on [`RegistrationFault::code`] instead of parsing text.
//!
//! This crate defines:
//! - [`ErrorCode`] — the closed classification set and its wire values
//! - [`RegistrationFault`] / [`RegistrationResult`] — the fault and its result alias
//! - [`CapturePolicy`] — opt-in backtrace capture at construction
//! - [`retry`] module — bounded retry for handling boundaries

pub mod capture;
pub mod code;
pub mod fault;
pub mod retry;

pub use capture::CapturePolicy;
pub use code::{ErrorCode, UnknownErrorCode};
pub use fault::{RegistrationFault, RegistrationResult, SharedCause};
pub use retry::{retry_registration, RetryConfig, RetryPolicy};
