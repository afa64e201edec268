//! Canonical-cache controller for the remote account pool
//!
//! The gateway owns membership, ordering, pause state and current-ness; this
//! controller only caches the last server-confirmed `AccountPoolState`. Every
//! mutation delegates to the remote API, awaits the response, and on success
//! adopts the returned state wholesale — there is no local reconciliation
//! and no partial merge. On failure the cache is left exactly as it was.
//!
//! Two adopt paths exist, one per response shape:
//! - `adopt_state`: full payload, wholesale replacement
//! - `adopt_config`: the `/pool-config` ack carries no accounts, so only
//!   `enabled` and `strategy` are authoritative

use gateway_client::{AccountPoolState, GatewayClient, PoolStrategy};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Client-side view of the gateway's account pool.
#[derive(Debug)]
pub struct PoolController {
    client: GatewayClient,
    state: AccountPoolState,
}

impl PoolController {
    /// Create a controller with an empty cache; call `refresh` to hydrate.
    pub fn new(client: GatewayClient) -> Self {
        Self {
            client,
            state: AccountPoolState::default(),
        }
    }

    /// The last server-confirmed state.
    pub fn state(&self) -> &AccountPoolState {
        &self.state
    }

    pub fn client(&self) -> &GatewayClient {
        &self.client
    }

    /// Full resync from the gateway.
    pub async fn refresh(&mut self) -> Result<()> {
        let state = self.client.accounts().await?;
        self.adopt_state(state);
        Ok(())
    }

    /// Remove an account. Gated: callers must pass `confirmed = true`
    /// (i.e. the operator answered the confirmation dialog) or no request
    /// is issued at all.
    pub async fn remove(&mut self, id: &str, confirmed: bool) -> Result<()> {
        if !confirmed {
            return Err(Error::ConfirmationRequired(id.to_string()));
        }
        let state = self.client.remove_account(id).await?;
        self.adopt_state(state);
        info!(account_id = id, "account removed from pool");
        Ok(())
    }

    pub async fn set_paused(&mut self, id: &str, paused: bool) -> Result<()> {
        let state = self.client.set_paused(id, paused).await?;
        self.adopt_state(state);
        info!(account_id = id, paused, "account pause state changed");
        Ok(())
    }

    /// Pin traffic to one account. Meaningful under the sticky strategy; the
    /// server decides and returns the new `current_account_id`.
    pub async fn set_current(&mut self, id: &str) -> Result<()> {
        let state = self.client.set_current(id).await?;
        self.adopt_state(state);
        info!(
            account_id = id,
            current = ?self.state.current_account_id,
            "current account changed"
        );
        Ok(())
    }

    /// Fire a background token refresh server-side and adopt whatever
    /// partial state the command response returns.
    ///
    /// Convergence is asynchronous: the session schedules one additional
    /// delayed `refresh()` to observe eventual state.
    pub async fn refresh_tokens(&mut self) -> Result<()> {
        let state = self.client.refresh_tokens().await?;
        self.adopt_state(state);
        info!("token refresh requested");
        Ok(())
    }

    /// Synchronous quota resync for all accounts.
    pub async fn refresh_quotas(&mut self) -> Result<()> {
        let state = self.client.refresh_quotas().await?;
        self.adopt_state(state);
        debug!("quota snapshots refreshed");
        Ok(())
    }

    /// Write pool configuration. The ack carries no accounts payload, so
    /// only `enabled` and `strategy` are adopted.
    pub async fn update_pool_config(&mut self, enabled: bool, strategy: PoolStrategy) -> Result<()> {
        let ack = self.client.update_pool_config(enabled, &strategy).await?;
        self.adopt_config(ack.enabled, ack.strategy);
        info!(enabled, strategy = ?self.state.strategy, "pool config updated");
        Ok(())
    }

    /// Wholesale replacement by a full server payload.
    fn adopt_state(&mut self, state: AccountPoolState) {
        self.state = state;
    }

    /// Config-only ack: accounts, current id and configured count untouched.
    fn adopt_config(&mut self, enabled: bool, strategy: PoolStrategy) {
        self.state.enabled = enabled;
        self.state.strategy = strategy;
    }
}
