//! One-shot notifications shown on the next rendered page.
//!
//! A handler that redirects pushes a flash; the layout of whatever page is
//! rendered next takes and shows it, after which it is gone.

use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::models::session_keys;

/// Visual weight of a flash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Info,
    Error,
}

impl FlashLevel {
    /// CSS modifier class.
    #[must_use]
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::Success => "toast--success",
            Self::Info => "toast--info",
            Self::Error => "toast--error",
        }
    }
}

/// A flash message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Success,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Error,
            message: message.into(),
        }
    }
}

/// Queue a flash for the next page.
///
/// Failures are logged and swallowed.
pub async fn push(session: &Session, flash: Flash) {
    let mut pending: Vec<Flash> = session
        .get(session_keys::FLASH)
        .await
        .ok()
        .flatten()
        .unwrap_or_default();
    pending.push(flash);

    if let Err(e) = session.insert(session_keys::FLASH, pending).await {
        tracing::warn!("Failed to store flash message: {e}");
    }
}

/// Take every pending flash, leaving none behind.
pub async fn take(session: &Session) -> Vec<Flash> {
    session
        .remove::<Vec<Flash>>(session_keys::FLASH)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}
