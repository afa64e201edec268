//! Device-authorization flow state machine
//!
//! Transitions:
//! - Idle → Pending (`start`: server issues flow id, user code, verify URL)
//! - Pending → Completing (`complete` issued)
//! - Completing → Idle (success; the caller refreshes the pool separately —
//!   the flow never merges the new account into the cached pool state)
//! - Completing → Pending with `error` set (failure; operator may retry
//!   `complete` or `cancel`)
//! - Pending | Completing → Idle (`cancel`: remote call is fire-and-forget)
//! - Pending past `expires_at` → Idle (auto-retired the next time the flow
//!   is touched; never left silently pending forever)
//!
//! At most one flow is non-Idle per session; `start` while non-Idle is a
//! caller error.

use chrono::{DateTime, Utc};
use gateway_client::{Account, GatewayClient};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Where the device flow currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowPhase {
    Idle,
    Pending {
        flow_id: String,
        user_code: String,
        verification_uri: String,
        expires_at: DateTime<Utc>,
        error: Option<String>,
    },
    Completing {
        flow_id: String,
    },
}

/// Single-session device-authorization flow.
///
/// Authorization itself is entirely server-side; this struct only tracks
/// phase and the material the operator needs (user code, verification URL).
#[derive(Debug, Default)]
pub struct DeviceFlow {
    phase: FlowPhase,
}

impl Default for FlowPhase {
    fn default() -> Self {
        FlowPhase::Idle
    }
}

impl DeviceFlow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> &FlowPhase {
        &self.phase
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.phase, FlowPhase::Idle)
    }

    /// Retire a Pending flow whose deadline has passed. Returns whether a
    /// flow was retired. Called on every `start`, on `complete`, and by the
    /// session's periodic tick.
    pub fn retire_expired(&mut self, now: DateTime<Utc>) -> bool {
        if let FlowPhase::Pending { expires_at, flow_id, .. } = &self.phase {
            if now >= *expires_at {
                debug!(flow_id = %flow_id, "device flow expired, retiring");
                self.phase = FlowPhase::Idle;
                return true;
            }
        }
        false
    }

    /// Begin a new flow. Rejected while another flow is live (expired
    /// Pending flows are retired first, so a stale deadline never blocks).
    pub async fn start(&mut self, client: &GatewayClient, label: Option<&str>) -> Result<&FlowPhase> {
        self.retire_expired(Utc::now());
        if !self.is_idle() {
            return Err(Error::FlowInProgress);
        }

        let init = client.oauth_start(label).await?;
        info!(flow_id = %init.flow_id, "device flow started");
        self.phase = FlowPhase::Pending {
            flow_id: init.flow_id,
            user_code: init.user_code,
            verification_uri: init.verification_uri,
            expires_at: Utc::now() + chrono::Duration::seconds(init.expires_in as i64),
            error: None,
        };
        Ok(&self.phase)
    }

    /// Finish the flow after the operator approved out-of-band.
    ///
    /// On success the flow returns to Idle and the authorized account is
    /// handed back; the caller refreshes the pool view separately. On
    /// failure the flow drops back to Pending with `error` set so the
    /// operator can retry or cancel.
    pub async fn complete(&mut self, client: &GatewayClient) -> Result<Account> {
        let (flow_id, pending) = match &self.phase {
            FlowPhase::Pending {
                flow_id, expires_at, ..
            } => {
                if Utc::now() >= *expires_at {
                    self.phase = FlowPhase::Idle;
                    return Err(Error::FlowExpired);
                }
                (flow_id.clone(), self.phase.clone())
            }
            _ => return Err(Error::NoPendingFlow),
        };

        self.phase = FlowPhase::Completing {
            flow_id: flow_id.clone(),
        };

        match client.oauth_complete(&flow_id).await {
            Ok(done) => {
                info!(flow_id = %flow_id, account_id = %done.account.id, "device flow completed");
                self.phase = FlowPhase::Idle;
                Ok(done.account)
            }
            Err(e) => {
                let mut phase = pending;
                if let FlowPhase::Pending { error, .. } = &mut phase {
                    *error = Some(e.to_string());
                }
                self.phase = phase;
                Err(e.into())
            }
        }
    }

    /// Abandon the flow. Always lands in Idle: the remote cancellation is
    /// fire-and-forget and its errors are discarded.
    pub async fn cancel(&mut self, client: &GatewayClient) {
        let flow_id = match &self.phase {
            FlowPhase::Pending { flow_id, .. } | FlowPhase::Completing { flow_id } => {
                flow_id.clone()
            }
            FlowPhase::Idle => return,
        };

        if let Err(e) = client.oauth_cancel(&flow_id).await {
            debug!(flow_id = %flow_id, error = %e, "remote flow cancel failed (discarded)");
        }
        info!(flow_id = %flow_id, "device flow cancelled");
        self.phase = FlowPhase::Idle;
    }
}
