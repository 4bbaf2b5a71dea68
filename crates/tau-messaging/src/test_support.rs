//! Fakes shared by unit tests across modules.

use std::sync::Mutex;

use tau_messaging_types::{Message, MessageMetadata, RawMessageDefinition, StyleDescriptor};

use crate::collaborators::{EvalContext, PredicateError, PredicateEvaluator, TelemetrySink};
use crate::telemetry::MessagingTelemetryEvent;

#[derive(Default)]
pub(crate) struct RecordingTelemetrySink {
    events: Mutex<Vec<MessagingTelemetryEvent>>,
}

impl RecordingTelemetrySink {
    pub(crate) fn events(&self) -> Vec<MessagingTelemetryEvent> {
        self.events.lock().expect("telemetry lock").clone()
    }

    pub(crate) fn count(&self, name: &str) -> usize {
        self.events()
            .iter()
            .filter(|event| event.name() == name)
            .count()
    }
}

impl TelemetrySink for RecordingTelemetrySink {
    fn record(&self, event: &MessagingTelemetryEvent) {
        self.events
            .lock()
            .expect("telemetry lock")
            .push(event.clone());
    }
}

/// Evaluates `true` and `false` literally and fails on anything else.
pub(crate) struct LiteralEvaluator;

impl PredicateEvaluator for LiteralEvaluator {
    fn create_context(&self) -> Option<EvalContext> {
        Some(EvalContext::default())
    }

    fn evaluate(&self, expression: &str, _context: &EvalContext) -> Result<bool, PredicateError> {
        match expression {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(PredicateError::Evaluation {
                expression: other.to_string(),
                detail: "unknown literal".to_string(),
            }),
        }
    }

    fn substitute(
        &self,
        template: &str,
        _context: &EvalContext,
    ) -> Result<String, PredicateError> {
        Ok(template.to_string())
    }
}

pub(crate) fn message(id: &str, priority: i32, triggers: &[&str], is_control: bool) -> Message {
    Message {
        id: id.to_string(),
        definition: RawMessageDefinition::new(id, "home", "DEFAULT", "tau://open")
            .with_control(is_control),
        action: "tau://open".to_string(),
        triggers: triggers.iter().map(|trigger| trigger.to_string()).collect(),
        style: StyleDescriptor::new(priority, 5),
        metadata: MessageMetadata::new(id),
    }
}
