//! Event-stream ingestion pipeline for the gateway console
//!
//! Everything between the gateway's push channels and the operator's screen:
//! a reconnecting SSE subscriber, a bounded filterable log buffer, a pure
//! pattern-based alert detector, and a capped notification mailbox.
//!
//! Data flow:
//! 1. `StreamSubscriber` owns one SSE connection per channel and forwards
//!    decoded events over an mpsc channel; reconnects forever on a fixed
//!    delay and never surfaces errors
//! 2. The session's dispatcher parses `log` payloads (malformed ones are
//!    discarded) and feeds `LogBuffer::accept`
//! 3. `alerts::detect` scans each stored entry and drafts notifications
//! 4. `NotificationCenter::post` assigns identity and enforces the mailbox
//!    cap; server-pushed notifications arrive through the same door

pub mod alerts;
pub mod logs;
pub mod notify;
pub mod subscriber;

pub use alerts::{ACCOUNT_ERROR_TITLE, AlertSettings, RATE_LIMIT_TITLE, detect};
pub use logs::{LOG_CAPACITY, LogBuffer, LogFilter};
pub use notify::{
    NOTIFY_CAPACITY, NotificationCenter, NotificationDraft, NotificationItem, NotificationKind,
};
pub use subscriber::{ChannelStatus, PushEvent, RETRY_DELAY, StreamSubscriber};
