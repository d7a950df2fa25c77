//! regfault-client — registration client built on `regfault-core`.
//!
//! # Overview
//!
//! A [`RegistrationClient`] hands add/remove commands to a background
//! conductor task, which talks to a [`Driver`] and matches the driver's
//! answers back to waiting callers. Every failed operation comes back as one
//! [`RegistrationFault`](regfault_core::RegistrationFault).
//!
//! - [`channel`] — channel URI validation (`INVALID_CHANNEL`)
//! - [`protocol`] — driver commands, responses and wire-code decoding
//! - [`driver`] — the [`Driver`] trait and the in-process [`MemoryDriver`]
//! - [`client`] — [`RegistrationClient`], [`Publication`], [`Subscription`]
//! - [`config`] — [`ClientConfig`] loaded from JSON
//! - [`telemetry`] — tracing subscriber setup

pub mod channel;
pub mod client;
mod conductor;
pub mod config;
pub mod driver;
pub mod protocol;
pub mod telemetry;

pub use channel::{ChannelUri, Media};
pub use client::{Publication, RegistrationClient, Subscription};
pub use config::{ClientConfig, ConfigError, RetrySettings};
pub use driver::{Driver, MemoryDriver, ResponseReceiver};
pub use protocol::{CorrelationId, DriverCommand, DriverResponse, RegistrationId};
pub use telemetry::{init_tracing, LogConfig};
