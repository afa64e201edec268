//! Account-pool lifecycle for the gateway console
//!
//! The gateway is the single source of truth for pool membership, pause
//! state and routing; this crate keeps the client's side of that contract:
//! a canonical-cache controller that adopts server responses wholesale, a
//! device-authorization flow state machine for adding accounts, and pure
//! quota classification over the cached state.

pub mod controller;
pub mod error;
pub mod oauth;
pub mod quota;

pub use controller::PoolController;
pub use error::{Error, Result};
pub use oauth::{DeviceFlow, FlowPhase};
pub use quota::{
    LOW_QUOTA_THRESHOLD, PoolSummary, effective_percent, has_quota_data, is_low_quota,
    pool_summary,
};
