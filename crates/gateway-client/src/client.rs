//! Gateway control-API client
//!
//! Thin typed wrapper over a shared `reqwest::Client`. Every endpoint speaks
//! the same JSON envelope: `{status:"ok"|"error", ...payload, error?}`.
//! Payload fields sit alongside `status`, so response types deserialize from
//! the whole body and ignore the envelope fields.
//!
//! HTTP 401 on any call short-circuits into `Error::SessionExpired` before
//! the body is inspected; the session runtime treats that as a global
//! teardown signal, superseding all other error handling for the call.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{Error, Result};
use crate::types::{
    AccountPoolState, Ack, AuthStatus, CompletedFlow, DeviceFlowInit, GatewayStatus, PoolConfigAck,
    PoolStrategy, RecentLogs, VersionInfo,
};

/// Client for the gateway's REST control surface.
///
/// Cheap to clone: wraps the shared connection pool inside `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    http: reqwest::Client,
    base_url: String,
}

impl GatewayClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    /// The underlying HTTP client, shared with the stream subscribers.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Absolute URL for a control-API path.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Send a request and decode the envelope.
    ///
    /// 401 → `SessionExpired`; `status:"error"` → `Remote` with the server's
    /// message verbatim; anything undecodable → `Decode`.
    async fn execute<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T> {
        let response = request
            .send()
            .await
            .map_err(|e| Error::Http(format!("gateway request failed: {e}")))?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::SessionExpired);
        }

        let http_status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Http(format!("reading gateway response: {e}")))?;

        let value: serde_json::Value = serde_json::from_str(&body).map_err(|e| {
            if http_status.is_success() {
                Error::Decode(format!("invalid gateway response: {e}"))
            } else {
                Error::Http(format!("gateway returned {http_status}: {body}"))
            }
        })?;

        if value.get("status").and_then(|s| s.as_str()) == Some("error") {
            let message = value
                .get("error")
                .and_then(|e| e.as_str())
                .unwrap_or("unknown gateway error")
                .to_string();
            debug!(http_status = %http_status, error = %message, "gateway reported an error");
            return Err(Error::Remote(message));
        }

        if !http_status.is_success() {
            return Err(Error::Http(format!("gateway returned {http_status}: {body}")));
        }

        serde_json::from_value(value).map_err(|e| Error::Decode(format!("invalid payload: {e}")))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.execute(self.http.get(self.endpoint(path))).await
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: &impl Serialize) -> Result<T> {
        self.execute(self.http.post(self.endpoint(path)).json(body))
            .await
    }

    async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.execute(self.http.post(self.endpoint(path))).await
    }

    async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.execute(self.http.delete(self.endpoint(path))).await
    }

    // --- Authentication ---

    pub async fn login(&self, password: &str) -> Result<Ack> {
        self.post("/login", &serde_json::json!({ "password": password }))
            .await
    }

    pub async fn logout(&self) -> Result<Ack> {
        self.post_empty("/logout").await
    }

    pub async fn auth_status(&self) -> Result<AuthStatus> {
        self.get("/auth-status").await
    }

    // --- Account pool ---

    /// Full pool resync. The canonical state for every adopt-wholesale path.
    pub async fn accounts(&self) -> Result<AccountPoolState> {
        self.get("/accounts").await
    }

    pub async fn remove_account(&self, id: &str) -> Result<AccountPoolState> {
        self.delete(&format!("/accounts/{id}")).await
    }

    pub async fn set_paused(&self, id: &str, paused: bool) -> Result<AccountPoolState> {
        self.post(
            &format!("/accounts/{id}/pause"),
            &serde_json::json!({ "paused": paused }),
        )
        .await
    }

    pub async fn set_current(&self, id: &str) -> Result<AccountPoolState> {
        self.post_empty(&format!("/accounts/{id}/set-current")).await
    }

    /// Fire a background token refresh server-side. The response may carry
    /// only partial convergence; callers schedule a delayed `accounts()`
    /// resync to observe eventual state.
    pub async fn refresh_tokens(&self) -> Result<AccountPoolState> {
        self.post_empty("/accounts/refresh").await
    }

    pub async fn refresh_quotas(&self) -> Result<AccountPoolState> {
        self.post_empty("/accounts/refresh-quotas").await
    }

    pub async fn update_pool_config(
        &self,
        enabled: bool,
        strategy: &PoolStrategy,
    ) -> Result<PoolConfigAck> {
        self.post(
            "/pool-config",
            &serde_json::json!({ "enabled": enabled, "strategy": strategy }),
        )
        .await
    }

    // --- Device authorization ---

    pub async fn oauth_start(&self, label: Option<&str>) -> Result<DeviceFlowInit> {
        self.post("/accounts/oauth/start", &serde_json::json!({ "label": label }))
            .await
    }

    pub async fn oauth_complete(&self, flow_id: &str) -> Result<CompletedFlow> {
        self.post(
            "/accounts/oauth/complete",
            &serde_json::json!({ "flowId": flow_id }),
        )
        .await
    }

    pub async fn oauth_cancel(&self, flow_id: &str) -> Result<Ack> {
        self.post(
            "/accounts/oauth/cancel",
            &serde_json::json!({ "flowId": flow_id }),
        )
        .await
    }

    // --- Logs, status & version ---

    pub async fn recent_logs(&self, limit: usize) -> Result<RecentLogs> {
        self.get(&format!("/logs/recent?limit={limit}")).await
    }

    pub async fn status(&self) -> Result<GatewayStatus> {
        self.get("/status").await
    }

    pub async fn version_check(&self) -> Result<VersionInfo> {
        self.get("/version-check").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> GatewayClient {
        GatewayClient::new(reqwest::Client::new(), server.uri())
    }

    #[test]
    fn endpoint_joins_base_url() {
        let c = GatewayClient::new(reqwest::Client::new(), "http://gw.local/");
        assert_eq!(c.endpoint("/accounts"), "http://gw.local/accounts");
        assert_eq!(c.endpoint("accounts"), "http://gw.local/accounts");
    }

    #[tokio::test]
    async fn ok_envelope_decodes_payload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/accounts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "ok",
                "enabled": true,
                "strategy": "sticky",
                "accounts": [{"id": "a", "active": true}],
                "currentAccountId": "a"
            })))
            .mount(&server)
            .await;

        let state = client(&server).accounts().await.unwrap();
        assert!(state.enabled);
        assert_eq!(state.accounts.len(), 1);
        assert_eq!(state.current_account_id.as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn error_envelope_surfaces_verbatim_message() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/accounts/ghost"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "error",
                "error": "not found"
            })))
            .mount(&server)
            .await;

        let err = client(&server).remove_account("ghost").await.unwrap_err();
        assert!(matches!(err, Error::Remote(ref m) if m == "not found"));
        assert_eq!(err.to_string(), "not found");
    }

    #[tokio::test]
    async fn http_401_maps_to_session_expired() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/accounts"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = client(&server).accounts().await.unwrap_err();
        assert!(err.is_session_expired());
    }

    #[tokio::test]
    async fn non_json_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/version-check"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>nope</html>"))
            .mount(&server)
            .await;

        let err = client(&server).version_check().await.unwrap_err();
        assert!(matches!(err, Error::Decode(_)), "got: {err:?}");
    }

    #[tokio::test]
    async fn error_envelope_with_http_error_status_still_remote() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/accounts/refresh"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
                "status": "error",
                "error": "refresh already running"
            })))
            .mount(&server)
            .await;

        let err = client(&server).refresh_tokens().await.unwrap_err();
        assert!(matches!(err, Error::Remote(ref m) if m == "refresh already running"));
    }

    #[tokio::test]
    async fn login_posts_password() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .and(body_json(serde_json::json!({ "password": "hunter2" })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "status": "ok" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        client(&server).login("hunter2").await.unwrap();
    }

    #[tokio::test]
    async fn oauth_start_returns_flow_material() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/accounts/oauth/start"))
            .and(body_json(serde_json::json!({ "label": "work" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "ok",
                "flowId": "flow-1",
                "userCode": "ABCD-1234",
                "verificationUri": "https://verify.example/device",
                "expiresIn": 900
            })))
            .mount(&server)
            .await;

        let init = client(&server).oauth_start(Some("work")).await.unwrap();
        assert_eq!(init.flow_id, "flow-1");
        assert_eq!(init.user_code, "ABCD-1234");
        assert_eq!(init.expires_in, 900);
    }

    #[tokio::test]
    async fn recent_logs_decodes_entries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/logs/recent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "ok",
                "logs": [
                    {"timestamp": "2026-08-30T10:00:00Z", "level": "info", "message": "started"},
                    {"timestamp": "2026-08-30T10:00:01Z", "level": "error", "message": "boom"}
                ]
            })))
            .mount(&server)
            .await;

        let recent = client(&server).recent_logs(100).await.unwrap();
        assert_eq!(recent.logs.len(), 2);
        assert_eq!(recent.logs[1].message, "boom");
    }

    #[tokio::test]
    async fn status_decodes_health_line() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "ok",
                "running": true,
                "version": "1.4.2",
                "activeModel": "gpt-5",
                "uptimeSeconds": 12345
            })))
            .mount(&server)
            .await;

        let status = client(&server).status().await.unwrap();
        assert!(status.running);
        assert_eq!(status.version.as_deref(), Some("1.4.2"));
        assert_eq!(status.active_model.as_deref(), Some("gpt-5"));
        assert_eq!(status.uptime_seconds, Some(12345));
    }
}
