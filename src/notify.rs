use std::sync::Mutex;

use crate::models::Notification;

/// Notifier
///
/// The user-facing notification channel. Fire-and-forget: callers never inspect a result.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// NoticeBuffer
///
/// Collects notifications in memory until drained. The HTTP shell moves them into the
/// session's flash queue so they survive the redirect to the login page.
#[derive(Debug, Default)]
pub struct NoticeBuffer {
    notices: Mutex<Vec<Notification>>,
}

impl NoticeBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<Notification> {
        match self.notices.lock() {
            Ok(mut notices) => std::mem::take(&mut *notices),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    pub fn len(&self) -> usize {
        self.notices.lock().map(|n| n.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Notifier for NoticeBuffer {
    fn notify(&self, notification: Notification) {
        match self.notices.lock() {
            Ok(mut notices) => notices.push(notification),
            Err(poisoned) => poisoned.into_inner().push(notification),
        }
    }
}
