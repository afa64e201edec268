//! Reconnecting server-sent-event subscriber
//!
//! A supervised loop around "connect, read until closed, sleep a fixed
//! delay, repeat". Connection loss is never surfaced to the caller: every
//! failure is absorbed into the retry loop, and the only externally visible
//! effect is the channel status leaving `Open`.
//!
//! The server's named `connected` event is the sole liveness signal. An open
//! transport that has not delivered it yet still counts as not connected;
//! the status only flips to `Open` when the event arrives.

use std::time::Duration;

use eventsource_stream::Eventsource;
use futures::StreamExt;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::debug;

/// Connection status of one push channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    Connecting,
    Open,
    RetryScheduled,
}

/// Delay between reconnect attempts. Fixed: no backoff growth, no retry cap,
/// no jitter.
pub const RETRY_DELAY: Duration = Duration::from_millis(5000);

/// A decoded push event: the SSE event name plus its raw data payload.
/// Payload parsing (and discarding of malformed payloads) is the consumer's
/// concern.
#[derive(Debug, Clone)]
pub struct PushEvent {
    pub event: String,
    pub data: String,
}

/// One long-lived push-channel subscription.
///
/// `open` spawns the supervised reconnect loop; `close` aborts it. Both are
/// idempotent, and `open` on an already-open subscriber closes the existing
/// connection first so handlers are never duplicated.
pub struct StreamSubscriber {
    client: reqwest::Client,
    url: String,
    retry_delay: Duration,
    status_tx: watch::Sender<ChannelStatus>,
    status_rx: watch::Receiver<ChannelStatus>,
    handle: Option<JoinHandle<()>>,
}

impl StreamSubscriber {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self::with_retry_delay(client, url, RETRY_DELAY)
    }

    /// Constructor with an explicit reconnect delay (tests use a short one).
    pub fn with_retry_delay(
        client: reqwest::Client,
        url: impl Into<String>,
        retry_delay: Duration,
    ) -> Self {
        let (status_tx, status_rx) = watch::channel(ChannelStatus::Connecting);
        Self {
            client,
            url: url.into(),
            retry_delay,
            status_tx,
            status_rx,
            handle: None,
        }
    }

    /// Establish the subscription, forwarding decoded events to `tx`.
    ///
    /// Closes any live connection first. The spawned loop never reports an
    /// error; it runs until `close` or until the receiving side of `tx` is
    /// dropped.
    pub fn open(&mut self, tx: mpsc::Sender<PushEvent>) {
        self.close();
        let client = self.client.clone();
        let url = self.url.clone();
        let retry_delay = self.retry_delay;
        let status = self.status_tx.clone();
        self.handle = Some(tokio::spawn(run_loop(client, url, retry_delay, status, tx)));
    }

    /// Release the subscription. Idempotent.
    pub fn close(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        let _ = self.status_tx.send(ChannelStatus::Connecting);
    }

    /// Latest channel status.
    pub fn status(&self) -> ChannelStatus {
        *self.status_rx.borrow()
    }

    /// Watch handle for status changes (the UI's connected indicator).
    pub fn watch_status(&self) -> watch::Receiver<ChannelStatus> {
        self.status_rx.clone()
    }

    /// Whether the supervised loop is running.
    pub fn is_open(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Whether the server has confirmed the channel with a `connected` event.
    pub fn is_connected(&self) -> bool {
        self.is_open() && self.status() == ChannelStatus::Open
    }
}

impl Drop for StreamSubscriber {
    fn drop(&mut self) {
        self.close();
    }
}

/// The supervised loop. Runs until aborted or until the event receiver goes
/// away; every connect or decode failure falls through to the fixed-delay
/// retry.
async fn run_loop(
    client: reqwest::Client,
    url: String,
    retry_delay: Duration,
    status: watch::Sender<ChannelStatus>,
    tx: mpsc::Sender<PushEvent>,
) {
    loop {
        let _ = status.send(ChannelStatus::Connecting);
        match connect(&client, &url).await {
            Ok(response) => {
                let mut events = response.bytes_stream().eventsource();
                while let Some(frame) = events.next().await {
                    match frame {
                        Ok(frame) => {
                            if frame.event == "connected" {
                                debug!(url = %url, "push channel confirmed");
                                let _ = status.send(ChannelStatus::Open);
                                continue;
                            }
                            let event = PushEvent {
                                event: frame.event,
                                data: frame.data,
                            };
                            if tx.send(event).await.is_err() {
                                // Consumer is gone; nothing left to feed.
                                return;
                            }
                        }
                        Err(e) => {
                            // Malformed frames are skipped; a dead transport
                            // ends the stream and falls through to the retry
                            debug!(url = %url, error = %e, "push stream decode error");
                        }
                    }
                }
                debug!(url = %url, "push stream closed");
            }
            Err(e) => {
                debug!(url = %url, error = %e, "push stream connect failed");
            }
        }
        let _ = status.send(ChannelStatus::RetryScheduled);
        tokio::time::sleep(retry_delay).await;
    }
}

async fn connect(client: &reqwest::Client, url: &str) -> reqwest::Result<reqwest::Response> {
    let response = client
        .get(url)
        .header(reqwest::header::ACCEPT, "text/event-stream")
        .send()
        .await?;
    response.error_for_status()
}
