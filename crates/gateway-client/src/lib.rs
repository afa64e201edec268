//! Typed client for the gateway control API
//!
//! The gateway owns all canonical state; this crate only speaks its REST
//! surface and normalizes the wire shapes. Standalone library with no
//! dependency on the console binary — it can be tested and used
//! independently.
//!
//! Request flow:
//! 1. Console logs in via `GatewayClient::login()`
//! 2. Pool controller resyncs via `accounts()` and issues mutation commands
//! 3. Device flow drives `oauth_start()` / `oauth_complete()` / `oauth_cancel()`
//! 4. Any HTTP 401 anywhere surfaces as `Error::SessionExpired`, the global
//!    teardown signal

pub mod client;
pub mod error;
pub mod types;

pub use client::GatewayClient;
pub use error::{Error, Result};
pub use types::{
    Account, AccountPoolState, Ack, AuthStatus, CompletedFlow, DeviceFlowInit, GatewayStatus,
    LogEntry, LogLevel, PausedReason, PoolConfigAck, PoolStrategy, QuotaSnapshot, QuotaView,
    RecentLogs, VersionInfo,
};
