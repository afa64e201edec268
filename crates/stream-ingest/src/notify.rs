//! Bounded notification mailbox
//!
//! Capacity 5 with FIFO eviction, fed by the alert detector and by the
//! server's notification push channel. Posting assigns identity (uuid +
//! timestamp); an optional chime hook fires best-effort when the sound flag
//! is enabled.

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

/// Maximum retained notifications; the oldest are evicted first beyond this.
pub const NOTIFY_CAPACITY: usize = 5;

/// Notification severity as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Info,
    Warning,
    Error,
}

/// An unposted notification: content without identity. Drafts come from the
/// alert detector or straight off the `notification` push event.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationDraft {
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
}

/// A posted notification.
#[derive(Debug, Clone)]
pub struct NotificationItem {
    pub id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Capped mailbox with a single writer (the notification dispatcher).
pub struct NotificationCenter {
    items: VecDeque<NotificationItem>,
    sound_enabled: bool,
    chime: Option<Box<dyn Fn() + Send + Sync>>,
}

impl fmt::Debug for NotificationCenter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationCenter")
            .field("items", &self.items)
            .field("sound_enabled", &self.sound_enabled)
            .finish_non_exhaustive()
    }
}

impl NotificationCenter {
    pub fn new(sound_enabled: bool) -> Self {
        Self {
            items: VecDeque::new(),
            sound_enabled,
            chime: None,
        }
    }

    /// Install the audible cue hook. Invoked on post while sound is enabled;
    /// the hook must be non-blocking and swallow its own failures.
    pub fn set_chime(&mut self, chime: impl Fn() + Send + Sync + 'static) {
        self.chime = Some(Box::new(chime));
    }

    pub fn set_sound_enabled(&mut self, enabled: bool) {
        self.sound_enabled = enabled;
    }

    /// Assign identity to a draft, append it, and evict beyond capacity.
    /// Returns the new item's id.
    pub fn post(&mut self, draft: NotificationDraft) -> Uuid {
        let item = NotificationItem {
            id: Uuid::new_v4(),
            kind: draft.kind,
            title: draft.title,
            message: draft.message,
            timestamp: Utc::now(),
        };
        let id = item.id;
        self.items.push_back(item);
        while self.items.len() > NOTIFY_CAPACITY {
            self.items.pop_front();
        }
        if self.sound_enabled {
            if let Some(chime) = &self.chime {
                chime();
            }
        }
        id
    }

    /// Remove the matching item; no-op if absent. Returns whether anything
    /// was removed.
    pub fn dismiss(&mut self, id: Uuid) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        self.items.len() != before
    }

    pub fn items(&self) -> impl Iterator<Item = &NotificationItem> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
