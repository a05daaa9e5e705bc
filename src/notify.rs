use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;

use crate::i18n::{Locale, Text};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastVariant {
    Default,
    Destructive,
}

/// A transient, dismissible message shown over the current screen
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Toast {
    pub title: String,
    pub description: Option<String>,
    pub variant: ToastVariant,
}

impl Toast {
    pub fn info(title: impl Into<String>, description: Option<String>) -> Self {
        Self {
            title: title.into(),
            description,
            variant: ToastVariant::Default,
        }
    }

    pub fn error(title: impl Into<String>, description: Option<String>) -> Self {
        Self {
            title: title.into(),
            description,
            variant: ToastVariant::Destructive,
        }
    }
}

/// Sending half of the toast queue, shared by every screen
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<Toast>,
    locale: Locale,
}

impl Notifier {
    pub fn channel(locale: Locale) -> (Self, mpsc::UnboundedReceiver<Toast>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx, locale }, rx)
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn push(&self, toast: Toast) {
        if self.tx.send(toast).is_err() {
            debug!("Toast dropped, nobody is listening");
        }
    }

    pub fn info(&self, title: Text, description: Option<Text>) {
        self.push(Toast::info(
            title.get(self.locale),
            description.map(|text| text.get(self.locale).to_string()),
        ));
    }

    pub fn error(&self, title: Text, description: impl Into<Option<String>>) {
        self.push(Toast::error(title.get(self.locale), description.into()));
    }
}
