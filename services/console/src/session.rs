//! Authenticated console session
//!
//! Owns every long-lived resource of a logged-in console: the two push
//! channel subscriptions, the log buffer, the notification mailbox, the
//! pool cache, the device flow, and all periodic timers. One session-end
//! signal (logout, ctrl-c, or any `SessionExpired`) tears all of it down:
//! both subscriptions close, every spawned task is aborted, and nothing
//! mutates shared state afterwards.
//!
//! Shared state is guarded by tokio mutexes with a single writer each: the
//! log dispatcher writes the buffer, the dispatchers write the mailbox,
//! and pool mutations are awaited to completion before adoption.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use account_pool::{DeviceFlow, PoolController};
use chrono::Utc;
use gateway_client::{GatewayClient, GatewayStatus, LogEntry};
use stream_ingest::{
    AlertSettings, LogBuffer, NotificationCenter, NotificationDraft, NotificationKind, PushEvent,
    RATE_LIMIT_TITLE, StreamSubscriber,
};
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::Config;

/// Buffered events per push channel between the subscriber and dispatcher.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// How many recent log lines to backfill on session start.
const SEED_LOG_LIMIT: usize = 100;

/// One logged-in console session.
pub struct Session {
    client: GatewayClient,
    logs: Arc<Mutex<LogBuffer>>,
    notifications: Arc<Mutex<NotificationCenter>>,
    pool: Arc<Mutex<PoolController>>,
    flow: Arc<Mutex<DeviceFlow>>,
    gateway_status: Arc<Mutex<Option<GatewayStatus>>>,
    authenticated: Arc<AtomicBool>,
    log_stream: StreamSubscriber,
    notification_stream: StreamSubscriber,
    resync_delay: Duration,
    tasks: Vec<JoinHandle<()>>,
    end_tx: watch::Sender<bool>,
    end_rx: watch::Receiver<bool>,
}

impl Session {
    /// Open both push channels and start the periodic timers. The caller is
    /// expected to have logged in already; `seed` backfills initial data.
    pub fn start(client: GatewayClient, config: &Config) -> Self {
        let alert_settings = config.alert_settings();
        let mut center = NotificationCenter::new(config.alerts.sound);
        if config.alerts.sound {
            // Terminal bell; best-effort by construction
            center.set_chime(|| {
                use std::io::Write;
                let _ = std::io::stderr().write_all(b"\x07");
            });
        }

        let logs = Arc::new(Mutex::new(LogBuffer::new()));
        let notifications = Arc::new(Mutex::new(center));
        let pool = Arc::new(Mutex::new(PoolController::new(client.clone())));
        let flow = Arc::new(Mutex::new(DeviceFlow::new()));
        let gateway_status = Arc::new(Mutex::new(None));
        let authenticated = Arc::new(AtomicBool::new(true));
        let (end_tx, end_rx) = watch::channel(false);

        let retry = config.timers.stream_retry();
        let mut log_stream = StreamSubscriber::with_retry_delay(
            client.http().clone(),
            client.endpoint("logs/stream"),
            retry,
        );
        let mut notification_stream = StreamSubscriber::with_retry_delay(
            client.http().clone(),
            client.endpoint("notifications/stream"),
            retry,
        );

        let (log_tx, log_rx) = mpsc::channel::<PushEvent>(EVENT_CHANNEL_CAPACITY);
        let (notify_tx, notify_rx) = mpsc::channel::<PushEvent>(EVENT_CHANNEL_CAPACITY);
        log_stream.open(log_tx);
        notification_stream.open(notify_tx);

        let mut tasks = Vec::new();
        tasks.push(tokio::spawn(dispatch_logs(
            log_rx,
            logs.clone(),
            notifications.clone(),
            alert_settings,
            Duration::from_secs(config.alerts.rate_limit_window_secs),
        )));
        tasks.push(tokio::spawn(dispatch_notifications(
            notify_rx,
            notifications.clone(),
        )));
        tasks.push(tokio::spawn(periodic_refresh(
            client.clone(),
            pool.clone(),
            flow.clone(),
            gateway_status.clone(),
            authenticated.clone(),
            config.timers.refresh(),
            end_tx.clone(),
        )));
        tasks.push(tokio::spawn(poll_version(
            client.clone(),
            notifications.clone(),
            authenticated.clone(),
            config.timers.version_poll(),
            end_tx.clone(),
        )));

        info!("session started");
        Self {
            client,
            logs,
            notifications,
            pool,
            flow,
            gateway_status,
            authenticated,
            log_stream,
            notification_stream,
            resync_delay: config.timers.resync(),
            tasks,
            end_tx,
            end_rx,
        }
    }

    /// Backfill recent logs and hydrate the pool cache.
    pub async fn seed(&self) -> account_pool::Result<()> {
        let recent = self
            .client
            .recent_logs(SEED_LOG_LIMIT)
            .await
            .map_err(account_pool::Error::from)
            .inspect_err(|e| self.end_on_expiry(e))?;
        {
            let mut buffer = self.logs.lock().await;
            for entry in recent.logs {
                buffer.accept(entry);
            }
        }
        {
            let mut pool = self.pool.lock().await;
            pool.refresh()
                .await
                .inspect_err(|e| self.end_on_expiry(e))?;
        }
        // Gateway status is display data; a failed fetch is not fatal
        match self.client.status().await {
            Ok(status) => *self.gateway_status.lock().await = Some(status),
            Err(e) => {
                let e = account_pool::Error::from(e);
                self.end_on_expiry(&e);
                if e.is_session_expired() {
                    return Err(e);
                }
                debug!(error = %e, "status fetch failed");
            }
        }
        Ok(())
    }

    pub fn client(&self) -> &GatewayClient {
        &self.client
    }

    pub fn logs(&self) -> Arc<Mutex<LogBuffer>> {
        self.logs.clone()
    }

    pub fn notifications(&self) -> Arc<Mutex<NotificationCenter>> {
        self.notifications.clone()
    }

    pub fn pool(&self) -> Arc<Mutex<PoolController>> {
        self.pool.clone()
    }

    pub fn flow(&self) -> Arc<Mutex<DeviceFlow>> {
        self.flow.clone()
    }

    /// Latest gateway health line, refreshed with the pool.
    pub fn gateway_status(&self) -> Arc<Mutex<Option<GatewayStatus>>> {
        self.gateway_status.clone()
    }

    /// Whether either push channel's supervised loop is still running.
    pub fn is_streaming(&self) -> bool {
        self.log_stream.is_open() || self.notification_stream.is_open()
    }

    /// Request a server-side token refresh, then schedule one delayed
    /// resync so the console converges on the eventual pool state.
    pub async fn refresh_tokens(&mut self) -> account_pool::Result<()> {
        {
            let mut pool = self.pool.lock().await;
            pool.refresh_tokens()
                .await
                .inspect_err(|e| self.end_on_expiry(e))?;
        }
        self.schedule_resync(self.resync_delay);
        Ok(())
    }

    /// One-shot delayed pool resync. Owned by the session so teardown
    /// cancels it with everything else.
    fn schedule_resync(&mut self, delay: Duration) {
        let pool = self.pool.clone();
        let authenticated = self.authenticated.clone();
        let end_tx = self.end_tx.clone();
        self.tasks.push(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if !authenticated.load(Ordering::SeqCst) {
                return;
            }
            let mut pool = pool.lock().await;
            if let Err(e) = pool.refresh().await {
                if e.is_session_expired() {
                    warn!("session expired during delayed resync");
                    let _ = end_tx.send(true);
                    return;
                }
                debug!(error = %e, "delayed resync failed");
            }
        }));
    }

    /// Resolves once the session-end signal fires.
    pub async fn run_until_end(&self) {
        let mut rx = self.end_rx.clone();
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    fn end_on_expiry(&self, err: &account_pool::Error) {
        if err.is_session_expired() {
            warn!("session expired, signalling teardown");
            let _ = self.end_tx.send(true);
        }
    }

    /// Tear the session down: no push event, timer fire, or delayed resync
    /// mutates any shared state after this returns. Idempotent.
    pub fn teardown(&mut self) {
        self.authenticated.store(false, Ordering::SeqCst);
        self.log_stream.close();
        self.notification_stream.close();
        for task in self.tasks.drain(..) {
            task.abort();
        }
        let _ = self.end_tx.send(true);
        info!("session torn down");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Parse `log` push events, store them, and run alert detection on every
/// entry the buffer actually accepts. Malformed payloads are dropped
/// silently; the stream stays up.
async fn dispatch_logs(
    mut rx: mpsc::Receiver<PushEvent>,
    logs: Arc<Mutex<LogBuffer>>,
    notifications: Arc<Mutex<NotificationCenter>>,
    settings: AlertSettings,
    rate_limit_window: Duration,
) {
    let mut last_rate_limit: Option<Instant> = None;
    while let Some(event) = rx.recv().await {
        if event.event != "log" {
            continue;
        }
        let entry: LogEntry = match serde_json::from_str(&event.data) {
            Ok(entry) => entry,
            Err(e) => {
                debug!(error = %e, "malformed log payload discarded");
                continue;
            }
        };

        let drafts = stream_ingest::detect(&entry, &settings);
        let stored = logs.lock().await.accept(entry);
        if !stored || drafts.is_empty() {
            continue;
        }

        let mut center = notifications.lock().await;
        for draft in drafts {
            if draft.title == RATE_LIMIT_TITLE {
                let now = Instant::now();
                if last_rate_limit.is_some_and(|at| now.duration_since(at) < rate_limit_window) {
                    continue;
                }
                last_rate_limit = Some(now);
            }
            center.post(draft);
        }
    }
}

/// Parse `notification` push events and post them straight to the mailbox.
async fn dispatch_notifications(
    mut rx: mpsc::Receiver<PushEvent>,
    notifications: Arc<Mutex<NotificationCenter>>,
) {
    while let Some(event) = rx.recv().await {
        if event.event != "notification" {
            continue;
        }
        match serde_json::from_str::<NotificationDraft>(&event.data) {
            Ok(draft) => {
                notifications.lock().await.post(draft);
            }
            Err(e) => debug!(error = %e, "malformed notification payload discarded"),
        }
    }
}

/// Periodic data refresh: retire any expired device flow, resync the pool
/// cache, then update the gateway health line. A no-op while the
/// authenticated guard is down; session expiry raises the end signal.
async fn periodic_refresh(
    client: GatewayClient,
    pool: Arc<Mutex<PoolController>>,
    flow: Arc<Mutex<DeviceFlow>>,
    gateway_status: Arc<Mutex<Option<GatewayStatus>>>,
    authenticated: Arc<AtomicBool>,
    period: Duration,
    end_tx: watch::Sender<bool>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await; // immediate first tick; seeding covers it
    loop {
        ticker.tick().await;
        if !authenticated.load(Ordering::SeqCst) {
            continue;
        }
        flow.lock().await.retire_expired(Utc::now());
        {
            let mut pool = pool.lock().await;
            if let Err(e) = pool.refresh().await {
                if e.is_session_expired() {
                    warn!("session expired during periodic refresh");
                    let _ = end_tx.send(true);
                    return;
                }
                debug!(error = %e, "periodic refresh failed");
            }
        }
        match client.status().await {
            Ok(status) => *gateway_status.lock().await = Some(status),
            Err(gateway_client::Error::SessionExpired) => {
                warn!("session expired during status refresh");
                let _ = end_tx.send(true);
                return;
            }
            Err(e) => debug!(error = %e, "status refresh failed"),
        }
    }
}

/// Version-staleness poll. Posts a single info notification the first time
/// an update shows up; session expiry raises the end signal like every
/// other gateway call.
async fn poll_version(
    client: GatewayClient,
    notifications: Arc<Mutex<NotificationCenter>>,
    authenticated: Arc<AtomicBool>,
    period: Duration,
    end_tx: watch::Sender<bool>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;
    let mut announced = false;
    loop {
        ticker.tick().await;
        if announced || !authenticated.load(Ordering::SeqCst) {
            continue;
        }
        match client.version_check().await {
            Ok(info) if info.update_available => {
                announced = true;
                let latest = info.latest.unwrap_or_else(|| "unknown".into());
                notifications.lock().await.post(NotificationDraft {
                    kind: NotificationKind::Info,
                    title: "Update Available".into(),
                    message: format!("gateway {} is available (running {})", latest, info.current),
                });
            }
            Ok(_) => {}
            Err(gateway_client::Error::SessionExpired) => {
                warn!("session expired during version check");
                let _ = end_tx.send(true);
                return;
            }
            Err(e) => debug!(error = %e, "version check failed"),
        }
    }
}
