//! Wire types for the gateway control API
//!
//! Every struct here mirrors JSON the gateway emits. The one place the wire
//! is messy is quota: depending on the upstream capability, a snapshot
//! arrives either with a `limit` field or an `entitlement` field, and
//! `percentRemaining` may be missing entirely. That is normalized into a
//! single `QuotaSnapshot` shape at deserialization time so downstream logic
//! never branches on shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity of one gateway log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
    Success,
}

impl LogLevel {
    /// Lowercase label as it appears on the wire and in filter searches.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Success => "success",
        }
    }
}

/// One gateway log line. Immutable once stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

/// Why the gateway paused an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PausedReason {
    Quota,
    Manual,
    #[serde(other)]
    Other,
}

/// Routing policy for the account pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PoolStrategy {
    Sticky,
    RoundRobin,
    #[serde(other)]
    Other,
}

impl Default for PoolStrategy {
    fn default() -> Self {
        PoolStrategy::Sticky
    }
}

/// Point-in-time view of one quota dimension, already normalized.
///
/// `percent_remaining` is always within [0, 100]. When the wire omits it,
/// it is computed from `remaining / limit`; an `unlimited` snapshot with no
/// numbers reports 100.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaSnapshot {
    pub remaining: f64,
    pub limit: f64,
    pub percent_remaining: f64,
    pub unlimited: bool,
    pub reset_date: Option<DateTime<Utc>>,
}

/// Raw wire shape covering both quota spellings (`limit` vs `entitlement`,
/// camelCase vs snake_case field names).
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawQuotaSnapshot {
    #[serde(default)]
    remaining: Option<f64>,
    #[serde(default)]
    limit: Option<f64>,
    #[serde(default)]
    entitlement: Option<f64>,
    #[serde(default, alias = "percent_remaining")]
    percent_remaining: Option<f64>,
    #[serde(default)]
    unlimited: bool,
    #[serde(default, alias = "reset_date")]
    reset_date: Option<DateTime<Utc>>,
}

impl From<RawQuotaSnapshot> for QuotaSnapshot {
    fn from(raw: RawQuotaSnapshot) -> Self {
        let limit = raw.limit.or(raw.entitlement).unwrap_or(0.0);
        let remaining = raw.remaining.unwrap_or(0.0);
        let percent = match raw.percent_remaining {
            Some(p) => p,
            None if raw.unlimited => 100.0,
            None if limit > 0.0 => remaining / limit * 100.0,
            None => 0.0,
        };
        QuotaSnapshot {
            remaining,
            limit,
            percent_remaining: percent.clamp(0.0, 100.0),
            unlimited: raw.unlimited,
            reset_date: raw.reset_date,
        }
    }
}

impl<'de> Deserialize<'de> for QuotaSnapshot {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        RawQuotaSnapshot::deserialize(deserializer).map(Into::into)
    }
}

/// Per-account quota snapshots, one per tracked dimension.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaView {
    #[serde(default)]
    pub chat: Option<QuotaSnapshot>,
    #[serde(default)]
    pub completions: Option<QuotaSnapshot>,
    #[serde(default)]
    pub premium_interactions: Option<QuotaSnapshot>,
}

impl QuotaView {
    /// Defined snapshots in a fixed order.
    pub fn snapshots(&self) -> impl Iterator<Item = &QuotaSnapshot> {
        [
            self.chat.as_ref(),
            self.completions.as_ref(),
            self.premium_interactions.as_ref(),
        ]
        .into_iter()
        .flatten()
    }

    /// Whether no quota data is present at all.
    pub fn is_empty(&self) -> bool {
        self.snapshots().next().is_none()
    }
}

/// One upstream account as the gateway reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    #[serde(default)]
    pub label: String,
    pub active: bool,
    #[serde(default)]
    pub paused: bool,
    #[serde(default)]
    pub paused_reason: Option<PausedReason>,
    #[serde(default)]
    pub rate_limited: bool,
    #[serde(default)]
    pub quota: QuotaView,
}

/// Server-owned pool state. The client caches this wholesale; it never
/// reconciles membership, order or current-ness locally.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountPoolState {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub strategy: PoolStrategy,
    #[serde(default)]
    pub accounts: Vec<Account>,
    #[serde(default)]
    pub current_account_id: Option<String>,
    #[serde(default)]
    pub configured_count: Option<usize>,
}

impl AccountPoolState {
    /// Look up an account by id.
    pub fn account(&self, id: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.id == id)
    }
}

/// Response from `POST /accounts/oauth/start`.
///
/// `expires_in` is a delta in seconds from the response time. The device
/// flow converts it to an absolute instant when recording the pending flow.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceFlowInit {
    pub flow_id: String,
    pub user_code: String,
    pub verification_uri: String,
    pub expires_in: u64,
}

/// Response from `POST /accounts/oauth/complete`.
#[derive(Debug, Clone, Deserialize)]
pub struct CompletedFlow {
    pub account: Account,
}

/// Response from `POST /pool-config`. Carries no accounts payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolConfigAck {
    pub enabled: bool,
    pub strategy: PoolStrategy,
}

/// Response from `GET /logs/recent`.
#[derive(Debug, Clone, Deserialize)]
pub struct RecentLogs {
    #[serde(default)]
    pub logs: Vec<LogEntry>,
}

/// Response from `GET /status`: the gateway's own health line, refreshed
/// alongside the pool.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayStatus {
    #[serde(default)]
    pub running: bool,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub active_model: Option<String>,
    #[serde(default)]
    pub uptime_seconds: Option<u64>,
}

/// Response from `GET /auth-status`.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthStatus {
    pub authenticated: bool,
}

/// Response from `GET /version-check`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    pub current: String,
    #[serde(default)]
    pub latest: Option<String>,
    #[serde(default)]
    pub update_available: bool,
}

/// Empty payload for operations whose success response carries only the
/// envelope (`login`, `logout`, `oauth/cancel`).
#[derive(Debug, Clone, Deserialize)]
pub struct Ack {}
