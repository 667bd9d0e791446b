//! Short-lived notifications shown in the corner of the screen.

use std::collections::VecDeque;

pub const MAX_VISIBLE_TOASTS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub level: ToastLevel,
    pub text: String,
    pub expires_at_unix_ms: u128,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToastQueue {
    toasts: VecDeque<Toast>,
    ttl_ms: u128,
}

impl ToastQueue {
    pub fn new(ttl_ms: u64) -> Self {
        Self {
            toasts: VecDeque::new(),
            ttl_ms: u128::from(ttl_ms),
        }
    }

    pub fn push(&mut self, level: ToastLevel, text: impl Into<String>, now_unix_ms: u128) {
        self.toasts.push_back(Toast {
            level,
            text: text.into(),
            expires_at_unix_ms: now_unix_ms.saturating_add(self.ttl_ms),
        });

        while self.toasts.len() > MAX_VISIBLE_TOASTS {
            self.toasts.pop_front();
        }
    }

    /// Drops expired toasts. Returns true when anything was removed.
    pub fn expire(&mut self, now_unix_ms: u128) -> bool {
        let before = self.toasts.len();
        self.toasts
            .retain(|toast| toast.expires_at_unix_ms > now_unix_ms);
        before != self.toasts.len()
    }

    pub fn visible(&self) -> impl Iterator<Item = &Toast> {
        self.toasts.iter()
    }

    pub fn len(&self) -> usize {
        self.toasts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }
}

impl Default for ToastQueue {
    fn default() -> Self {
        Self::new(4_000)
    }
}
