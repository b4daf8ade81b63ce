//! User-facing notices collected while handling a request.

use serde::Serialize;

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Notice,
}

/// One notice shown to the person using the admin panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub severity: Severity,
    pub text: String,
}

/// Destination for user-facing notices.
pub trait MessageSink: Send {
    fn add_error(&mut self, text: String);
}

/// Notices for a single request, rendered by whichever action runs last.
#[derive(Debug, Clone, Default)]
pub struct Messages {
    items: Vec<Message>,
}

impl Messages {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_notice(&mut self, text: String) {
        self.items.push(Message {
            severity: Severity::Notice,
            text,
        });
    }

    #[must_use]
    pub fn items(&self) -> &[Message] {
        &self.items
    }

    /// Number of error notices.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.items
            .iter()
            .filter(|m| m.severity == Severity::Error)
            .count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl MessageSink for Messages {
    fn add_error(&mut self, text: String) {
        self.items.push(Message {
            severity: Severity::Error,
            text,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_errors_only() {
        let mut messages = Messages::new();
        messages.add_error("bad password".to_string());
        messages.add_notice("signed out".to_string());
        assert_eq!(messages.items().len(), 2);
        assert_eq!(messages.error_count(), 1);
    }
}
