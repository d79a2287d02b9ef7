//! Push notifications and notification clicks.

use serde::{Deserialize, Serialize};
use spinezone_core::Error;
use spinezone_core::config::PushConfig;
use url::Url;

use crate::worker::ServiceWorker;

pub const VIEW_ACTION: &str = "view";
pub const DISMISS_ACTION: &str = "dismiss";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct NotificationData {
    pub url: String,
}

/// A notification ready to be shown by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub data: NotificationData,
    pub actions: Vec<NotificationAction>,
}

#[derive(Debug, Default, Deserialize)]
struct PushPayload {
    title: Option<String>,
    body: Option<String>,
}

/// Build a notification from a push payload.
///
/// The payload is JSON `{title?, body?}`. Missing fields, a missing payload
/// and unparsable payloads all fall back to the configured defaults.
pub fn build_notification(config: &PushConfig, payload: Option<&[u8]>) -> Notification {
    let payload = match payload {
        Some(bytes) => serde_json::from_slice::<PushPayload>(bytes).unwrap_or_else(|e| {
            tracing::debug!("unparsable push payload, using defaults: {e}");
            PushPayload::default()
        }),
        None => PushPayload::default(),
    };

    Notification {
        title: payload.title.unwrap_or_else(|| config.default_title.clone()),
        body: payload.body.unwrap_or_else(|| config.default_body.clone()),
        icon: config.icon.clone(),
        badge: config.badge.clone(),
        data: NotificationData { url: "/".to_string() },
        actions: vec![
            NotificationAction { action: VIEW_ACTION.to_string(), title: "View".to_string() },
            NotificationAction { action: DISMISS_ACTION.to_string(), title: "Dismiss".to_string() },
        ],
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, schemars::JsonSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ClickOutcome {
    OpenWindow { url: String },
    Dismissed,
}

impl ServiceWorker {
    pub fn handle_push(&self, payload: Option<&[u8]>) -> Notification {
        let notification = build_notification(&self.config.push, payload);
        tracing::info!(title = notification.title.as_str(), "push received");
        notification
    }

    /// Resolve a click on a notification. `None` is a click on the body.
    ///
    /// # Errors
    ///
    /// `INVALID_INPUT` for an action the notification never offered.
    pub fn handle_notification_click(&self, action: Option<&str>) -> Result<ClickOutcome, Error> {
        match action {
            None | Some("") | Some(VIEW_ACTION) => {
                let root: Url = self.resolve("/")?;
                Ok(ClickOutcome::OpenWindow { url: root.to_string() })
            }
            Some(DISMISS_ACTION) => Ok(ClickOutcome::Dismissed),
            Some(other) => Err(Error::InvalidInput(format!("unknown notification action: {other}"))),
        }
    }
}
