//! Quota classification over cached pool state
//!
//! Pure functions only: they read `Account` / `AccountPoolState` values and
//! never talk to the gateway. The "low quota" question matters for two
//! surfaces that must agree, the per-account badge and the pool summary
//! counts, so both go through `is_low_quota`.

use gateway_client::{Account, AccountPoolState, PausedReason};

/// An account at or below this remaining percentage counts as low on quota.
pub const LOW_QUOTA_THRESHOLD: i64 = 20;

/// Effective remaining percentage across every quota dimension the account
/// reports: the minimum over defined snapshots, with unlimited snapshots
/// counting as 100. `None` when the account carries no quota data at all.
pub fn effective_percent(account: &Account) -> Option<i64> {
    account
        .quota
        .snapshots()
        .map(|s| {
            if s.unlimited {
                100.0
            } else {
                s.percent_remaining
            }
        })
        .fold(None, |min: Option<f64>, p| {
            Some(match min {
                Some(m) => m.min(p),
                None => p,
            })
        })
        .map(|p| p.round() as i64)
}

/// Whether the account is low on quota: either its effective percentage is
/// at or below the threshold, or the gateway already paused it for quota.
/// An account with no quota data is never "low" on numbers alone.
pub fn is_low_quota(account: &Account) -> bool {
    if account.paused_reason == Some(PausedReason::Quota) {
        return true;
    }
    matches!(effective_percent(account), Some(p) if p <= LOW_QUOTA_THRESHOLD)
}

/// Whether any quota dimension is reported for this account.
pub fn has_quota_data(account: &Account) -> bool {
    !account.quota.is_empty()
}

/// Aggregate pool counts for the header line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSummary {
    pub total: usize,
    pub active: usize,
    pub paused: usize,
    pub low_quota: usize,
    pub no_quota: usize,
}

/// Summarize the cached pool state.
///
/// `total` prefers the server's configured count when it reports one, so
/// accounts that failed to initialize still show up in the headline number.
pub fn pool_summary(state: &AccountPoolState) -> PoolSummary {
    PoolSummary {
        total: state.configured_count.unwrap_or(state.accounts.len()),
        active: state
            .accounts
            .iter()
            .filter(|a| a.active && !a.paused)
            .count(),
        paused: state.accounts.iter().filter(|a| a.paused).count(),
        low_quota: state.accounts.iter().filter(|a| is_low_quota(a)).count(),
        no_quota: state
            .accounts
            .iter()
            .filter(|a| !has_quota_data(a))
            .count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_client::{QuotaSnapshot, QuotaView};

    fn snapshot(percent: f64, unlimited: bool) -> QuotaSnapshot {
        serde_json::from_value(serde_json::json!({
            "remaining": percent,
            "limit": 100.0,
            "percentRemaining": percent,
            "unlimited": unlimited,
        }))
        .unwrap()
    }

    fn account(quota: QuotaView) -> Account {
        Account {
            id: "acct".into(),
            label: String::new(),
            active: true,
            paused: false,
            paused_reason: None,
            rate_limited: false,
            quota,
        }
    }

    #[test]
    fn effective_percent_is_minimum_over_dimensions() {
        let acct = account(QuotaView {
            chat: Some(snapshot(80.0, false)),
            completions: Some(snapshot(35.0, false)),
            premium_interactions: Some(snapshot(60.0, false)),
        });
        assert_eq!(effective_percent(&acct), Some(35));
    }

    #[test]
    fn unlimited_dimension_counts_as_full() {
        let acct = account(QuotaView {
            chat: Some(snapshot(0.0, true)),
            completions: None,
            premium_interactions: None,
        });
        assert_eq!(effective_percent(&acct), Some(100));

        // An unlimited dimension never drags the minimum below a limited one
        let acct = account(QuotaView {
            chat: Some(snapshot(60.0, false)),
            completions: None,
            premium_interactions: Some(snapshot(0.0, true)),
        });
        assert_eq!(effective_percent(&acct), Some(60));
    }

    #[test]
    fn effective_percent_rounds_to_nearest() {
        let acct = account(QuotaView {
            chat: Some(snapshot(20.4, false)),
            completions: None,
            premium_interactions: None,
        });
        assert_eq!(effective_percent(&acct), Some(20));

        let acct = account(QuotaView {
            chat: Some(snapshot(20.5, false)),
            completions: None,
            premium_interactions: None,
        });
        assert_eq!(effective_percent(&acct), Some(21));
    }

    #[test]
    fn no_quota_data_yields_none_and_is_not_low() {
        let acct = account(QuotaView::default());
        assert_eq!(effective_percent(&acct), None);
        assert!(!is_low_quota(&acct));
        assert!(!has_quota_data(&acct));
    }

    #[test]
    fn low_quota_at_threshold_boundary() {
        let at = account(QuotaView {
            chat: Some(snapshot(20.0, false)),
            completions: None,
            premium_interactions: None,
        });
        assert!(is_low_quota(&at));

        let above = account(QuotaView {
            chat: Some(snapshot(21.0, false)),
            completions: None,
            premium_interactions: None,
        });
        assert!(!is_low_quota(&above));
    }

    #[test]
    fn quota_pause_is_low_regardless_of_numbers() {
        let mut acct = account(QuotaView {
            chat: Some(snapshot(90.0, false)),
            completions: None,
            premium_interactions: None,
        });
        acct.paused = true;
        acct.paused_reason = Some(PausedReason::Quota);
        assert!(is_low_quota(&acct));

        // A manual pause does not
        acct.paused_reason = Some(PausedReason::Manual);
        assert!(!is_low_quota(&acct));
    }

    #[test]
    fn summary_counts_each_bucket() {
        let mut paused = account(QuotaView::default());
        paused.id = "b".into();
        paused.paused = true;
        paused.paused_reason = Some(PausedReason::Manual);

        let mut low = account(QuotaView {
            chat: Some(snapshot(5.0, false)),
            completions: None,
            premium_interactions: None,
        });
        low.id = "c".into();

        let healthy = account(QuotaView {
            chat: Some(snapshot(80.0, false)),
            completions: None,
            premium_interactions: None,
        });

        let state = AccountPoolState {
            enabled: true,
            accounts: vec![healthy, paused, low],
            ..Default::default()
        };
        let summary = pool_summary(&state);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.active, 2);
        assert_eq!(summary.paused, 1);
        assert_eq!(summary.low_quota, 1);
        assert_eq!(summary.no_quota, 1);
    }

    #[test]
    fn summary_total_prefers_configured_count() {
        let state = AccountPoolState {
            accounts: vec![account(QuotaView::default())],
            configured_count: Some(4),
            ..Default::default()
        };
        assert_eq!(pool_summary(&state).total, 4);
    }
}
