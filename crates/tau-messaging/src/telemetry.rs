//! Telemetry events emitted by the messaging engine.

use std::collections::BTreeMap;

use crate::collaborators::TelemetrySink;

pub const MESSAGING_TELEMETRY_CATEGORY: &str = "messaging";
pub const EXPERIMENTS_TELEMETRY_CATEGORY: &str = "experiments";

#[derive(Debug, Clone, PartialEq, Eq)]
/// Enumerates supported `MessagingTelemetryEvent` values.
pub enum MessagingTelemetryEvent {
    MessageShown {
        message_id: String,
    },
    MessageClicked {
        message_id: String,
        action_uuid: String,
    },
    MessageDismissed {
        message_id: String,
    },
    MessageExpired {
        message_id: String,
    },
    MalformedMessage {
        message_id: String,
    },
    /// The user's eligibility for an experiment was evaluated.
    Exposure {
        feature_id: String,
        message_id: String,
    },
}

impl MessagingTelemetryEvent {
    pub fn category(&self) -> &'static str {
        match self {
            MessagingTelemetryEvent::Exposure { .. } => EXPERIMENTS_TELEMETRY_CATEGORY,
            _ => MESSAGING_TELEMETRY_CATEGORY,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            MessagingTelemetryEvent::MessageShown { .. } => "message_shown",
            MessagingTelemetryEvent::MessageClicked { .. } => "message_clicked",
            MessagingTelemetryEvent::MessageDismissed { .. } => "message_dismissed",
            MessagingTelemetryEvent::MessageExpired { .. } => "message_expired",
            MessagingTelemetryEvent::MalformedMessage { .. } => "malformed",
            MessagingTelemetryEvent::Exposure { .. } => "exposure",
        }
    }

    pub fn message_id(&self) -> &str {
        match self {
            MessagingTelemetryEvent::MessageShown { message_id }
            | MessagingTelemetryEvent::MessageClicked { message_id, .. }
            | MessagingTelemetryEvent::MessageDismissed { message_id }
            | MessagingTelemetryEvent::MessageExpired { message_id }
            | MessagingTelemetryEvent::MalformedMessage { message_id }
            | MessagingTelemetryEvent::Exposure { message_id, .. } => message_id.as_str(),
        }
    }

    /// Extra key/value pairs beyond category, name, and message id.
    pub fn extras(&self) -> BTreeMap<&'static str, String> {
        let mut extras = BTreeMap::new();
        match self {
            MessagingTelemetryEvent::MessageClicked { action_uuid, .. } => {
                extras.insert("action_uuid", action_uuid.clone());
            }
            MessagingTelemetryEvent::Exposure { feature_id, .. } => {
                extras.insert("feature_id", feature_id.clone());
            }
            _ => {}
        }
        extras
    }
}

/// Telemetry sink that writes each event to the `tau_messaging::telemetry` tracing target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTelemetrySink;

impl TelemetrySink for TracingTelemetrySink {
    fn record(&self, event: &MessagingTelemetryEvent) {
        let extras = event
            .extras()
            .into_iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join(",");
        tracing::info!(
            target: "tau_messaging::telemetry",
            category = event.category(),
            event = event.name(),
            message_id = event.message_id(),
            extras = extras.as_str(),
            "messaging telemetry event"
        );
    }
}
