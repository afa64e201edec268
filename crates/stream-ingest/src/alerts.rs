//! Pattern-based alert detection over accepted log entries
//!
//! Pure scan: no side effects, no buffer mutation. The dispatcher runs
//! `detect` on every entry the log buffer actually stores and posts the
//! resulting drafts to the notification center.

use gateway_client::LogEntry;

use crate::notify::{NotificationDraft, NotificationKind};

/// Message fragments indicating an upstream rate limit.
const RATE_LIMIT_PATTERNS: &[&str] = &["rate limit", "ratelimit", "429"];

/// Fragments indicating an account-level failure. "deactivat" is a prefix
/// match covering "deactivated" and "deactivating".
const ACCOUNT_FAILURE_PATTERNS: &[&str] = &["error", "failed", "deactivat"];

/// Draft title for rate-limit warnings. Suppression windows key on it.
pub const RATE_LIMIT_TITLE: &str = "Rate Limit Warning";

/// Draft title for account failures.
pub const ACCOUNT_ERROR_TITLE: &str = "Account Error";

/// Which alert rules are armed. Both rules are evaluated independently.
#[derive(Debug, Clone, Copy)]
pub struct AlertSettings {
    pub rate_limit_alerts: bool,
    pub account_error_alerts: bool,
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            rate_limit_alerts: true,
            account_error_alerts: true,
        }
    }
}

/// Scan one entry against the armed rules.
///
/// The message is lower-cased once; a single entry may yield zero, one, or
/// two drafts (the rules are independent).
pub fn detect(entry: &LogEntry, settings: &AlertSettings) -> Vec<NotificationDraft> {
    let message = entry.message.to_lowercase();
    let mut drafts = Vec::new();

    if settings.rate_limit_alerts && RATE_LIMIT_PATTERNS.iter().any(|p| message.contains(p)) {
        drafts.push(NotificationDraft {
            kind: NotificationKind::Warning,
            title: RATE_LIMIT_TITLE.into(),
            message: entry.message.clone(),
        });
    }

    if settings.account_error_alerts
        && message.contains("account")
        && ACCOUNT_FAILURE_PATTERNS.iter().any(|p| message.contains(p))
    {
        drafts.push(NotificationDraft {
            kind: NotificationKind::Error,
            title: ACCOUNT_ERROR_TITLE.into(),
            message: entry.message.clone(),
        });
    }

    drafts
}
