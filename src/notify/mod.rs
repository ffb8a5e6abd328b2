//! Transient user-facing messages and spoken confirmations

use std::time::{Duration, Instant};

use serde::Serialize;

pub mod voice;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Success,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub kind: MessageKind,
    pub text: String,
    #[serde(skip)]
    pub expires_at: Instant,
}

/// Holds at most one message. A new message replaces the previous one.
pub struct Notifier {
    ttl: Duration,
    current: Option<Notification>,
}

impl Notifier {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, current: None }
    }

    pub fn show(&mut self, kind: MessageKind, text: impl Into<String>) {
        self.show_at(kind, text, Instant::now());
    }

    pub fn show_at(&mut self, kind: MessageKind, text: impl Into<String>, now: Instant) {
        let text = text.into();
        match kind {
            MessageKind::Success => log::info!("{text}"),
            MessageKind::Error => log::warn!("{text}"),
        }
        self.current = Some(Notification {
            kind,
            text,
            expires_at: now + self.ttl,
        });
    }

    pub fn success(&mut self, text: impl Into<String>) {
        self.show(MessageKind::Success, text);
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.show(MessageKind::Error, text);
    }

    pub fn current(&self) -> Option<&Notification> {
        self.current_at(Instant::now())
    }

    pub fn current_at(&self, now: Instant) -> Option<&Notification> {
        self.current.as_ref().filter(|n| now < n.expires_at)
    }

    #[cfg(test)]
    pub fn clear(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_expires_after_ttl() {
        let mut notifier = Notifier::new(Duration::from_secs(5));
        let t0 = Instant::now();
        notifier.show_at(MessageKind::Success, "loaded", t0);

        assert_eq!(
            notifier.current_at(t0 + Duration::from_secs(4)).map(|n| n.text.as_str()),
            Some("loaded")
        );
        assert!(notifier.current_at(t0 + Duration::from_secs(5)).is_none());
    }

    #[test]
    fn test_new_message_replaces_old() {
        let mut notifier = Notifier::new(Duration::from_secs(5));
        let t0 = Instant::now();
        notifier.show_at(MessageKind::Success, "first", t0);
        notifier.show_at(MessageKind::Error, "second", t0 + Duration::from_secs(1));

        let current = notifier.current_at(t0 + Duration::from_secs(2)).unwrap();
        assert_eq!(current.text, "second");
        assert_eq!(current.kind, MessageKind::Error);
    }

    #[test]
    fn test_clear() {
        let mut notifier = Notifier::new(Duration::from_secs(5));
        notifier.error("oops");
        notifier.clear();
        assert!(notifier.current().is_none());
    }
}
