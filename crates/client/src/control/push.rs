//! Push payloads and notification clicks.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Action id that opens the application.
pub const VIEW_ACTION: &str = "view";

/// Action id that only dismisses the notification.
pub const DISMISS_ACTION: &str = "dismiss";

/// Window opened when a notification is activated.
pub const ROOT_URL: &str = "/";

/// A button attached to a notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// Everything needed to display one notification.
///
/// Keys a push payload carries beyond the known ones are preserved in
/// `extra` and handed to the host untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub title: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default)]
    pub require_interaction: bool,
    #[serde(default)]
    pub actions: Vec<NotificationAction>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Notification {
    fn default() -> Self {
        let icon = "/icons/Icon-192.png".to_string();
        Self {
            title: "Offgrid Calendar".into(),
            body: "You have a new reminder".into(),
            icon: Some(icon.clone()),
            badge: Some(icon.clone()),
            tag: Some("offgrid-notification".into()),
            require_interaction: false,
            actions: vec![
                NotificationAction { action: VIEW_ACTION.into(), title: "View".into(), icon: Some(icon) },
                NotificationAction { action: DISMISS_ACTION.into(), title: "Dismiss".into(), icon: None },
            ],
            extra: Map::new(),
        }
    }
}

/// Why a payload could not be merged. Always recoverable: defaults are used.
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("payload is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("payload is JSON but not an object")]
    NotAnObject,

    #[error("merged payload is not a valid notification: {0}")]
    InvalidField(String),
}

impl Notification {
    /// Shallow-merge a raw push payload over `self`.
    ///
    /// Top-level keys from the payload replace the corresponding default;
    /// nested values are not merged. A key whose value has the wrong shape
    /// is logged and skipped, the rest of the payload still applies.
    pub fn merged_with(&self, payload: &str) -> Result<Notification, PayloadError> {
        let Value::Object(overrides) = serde_json::from_str::<Value>(payload)? else {
            return Err(PayloadError::NotAnObject);
        };

        let Value::Object(mut merged) =
            serde_json::to_value(self).map_err(|e| PayloadError::InvalidField(e.to_string()))?
        else {
            return Err(PayloadError::NotAnObject);
        };

        for (key, value) in overrides {
            let mut candidate = merged.clone();
            candidate.insert(key.clone(), value);
            match serde_json::from_value::<Notification>(Value::Object(candidate.clone())) {
                Ok(_) => merged = candidate,
                Err(err) => tracing::warn!(key = %key, error = %err, "ignoring invalid push field"),
            }
        }

        serde_json::from_value(Value::Object(merged)).map_err(|e| PayloadError::InvalidField(e.to_string()))
    }

    /// Resolve what to display for an optional push payload.
    ///
    /// A payload that cannot be merged is logged and the defaults are shown.
    pub fn for_push(&self, payload: Option<&str>) -> Notification {
        let Some(payload) = payload else {
            return self.clone();
        };
        match self.merged_with(payload) {
            Ok(notification) => notification,
            Err(err) => {
                tracing::warn!(error = %err, "failed to parse push data, using defaults");
                self.clone()
            }
        }
    }
}

/// A user interaction with a displayed notification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NotificationClick {
    /// The action button pressed, or `None` for a click on the body.
    #[serde(default)]
    pub action: Option<String>,
    /// Tag of the notification that was clicked.
    #[serde(default)]
    pub tag: Option<String>,
}

impl NotificationClick {
    /// Everything except an explicit dismiss opens the application.
    pub fn opens_window(&self) -> bool {
        self.action.as_deref() != Some(DISMISS_ACTION)
    }
}
