use std::collections::VecDeque;

use dtodash_core::Notification;

/// How long a toast stays up, in UI ticks (100 ms each).
pub const TOAST_TICKS: usize = 40;

/// Most toasts shown at once; older ones are dropped first.
pub const MAX_TOASTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub notification: Notification,
    pub expires_at: usize,
}

/// Recent notifications, newest last.
#[derive(Debug, Default)]
pub struct ToastQueue {
    toasts: VecDeque<Toast>,
}

impl ToastQueue {
    pub fn push(&mut self, notification: Notification, now: usize) {
        if self.toasts.len() == MAX_TOASTS {
            self.toasts.pop_front();
        }
        self.toasts.push_back(Toast {
            notification,
            expires_at: now.saturating_add(TOAST_TICKS),
        });
    }

    /// Drop toasts whose time is up.
    pub fn expire(&mut self, now: usize) {
        self.toasts.retain(|t| t.expires_at > now);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Toast> {
        self.toasts.iter()
    }

    pub fn latest(&self) -> Option<&Toast> {
        self.toasts.back()
    }

    pub fn len(&self) -> usize {
        self.toasts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }
}
