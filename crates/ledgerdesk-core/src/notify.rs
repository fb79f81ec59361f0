//! Operator-facing notices.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A message for the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, message)
    }
}

/// Surfaces notices to the operator. Must not block.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Writes notices to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info | NoticeLevel::Success => tracing::info!("{}", notice.message),
            NoticeLevel::Warning => tracing::warn!("{}", notice.message),
            NoticeLevel::Error => tracing::error!("{}", notice.message),
        }
    }
}

/// Keeps the most recent notices for a front end to display.
#[derive(Debug, Clone)]
pub struct NoticeBuffer {
    inner: Arc<Mutex<VecDeque<Notice>>>,
    capacity: usize,
}

impl Default for NoticeBuffer {
    fn default() -> Self {
        Self::with_capacity(32)
    }
}

impl NoticeBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity: capacity.max(1),
        }
    }

    /// Copy of the buffered notices, oldest first.
    pub fn snapshot(&self) -> Vec<Notice> {
        self.lock().iter().cloned().collect()
    }

    /// Most recent notice.
    pub fn latest(&self) -> Option<Notice> {
        self.lock().back().cloned()
    }

    /// Remove and return every buffered notice.
    pub fn drain(&self) -> Vec<Notice> {
        self.lock().drain(..).collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Notice>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Notifier for NoticeBuffer {
    fn notify(&self, notice: Notice) {
        TracingNotifier.notify(notice.clone());
        let mut queue = self.lock();
        if queue.len() == self.capacity {
            queue.pop_front();
        }
        queue.push_back(notice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_keeps_latest_within_capacity() {
        let buffer = NoticeBuffer::with_capacity(2);
        buffer.notify(Notice::info("one"));
        buffer.notify(Notice::warning("two"));
        buffer.notify(Notice::error("three"));

        let messages: Vec<_> = buffer.snapshot().into_iter().map(|n| n.message).collect();
        assert_eq!(messages, ["two", "three"]);
        assert_eq!(buffer.latest().unwrap().level, NoticeLevel::Error);
    }

    #[test]
    fn clones_share_the_queue() {
        let buffer = NoticeBuffer::new();
        let handle = buffer.clone();
        handle.notify(Notice::success("saved"));

        assert_eq!(buffer.drain(), vec![Notice::success("saved")]);
        assert!(handle.snapshot().is_empty());
    }
}
