//! Experiment membership and control-arm handling for a selected message.

use tau_messaging_types::{ControlBehavior, Message};

use crate::collaborators::TelemetrySink;
use crate::telemetry::MessagingTelemetryEvent;
use crate::triggers::TriggerEvaluator;

/// Trailing character marking a message id as an experiment branch.
pub const EXPERIMENT_BRANCH_SEPARATOR: char = '-';

#[derive(Debug, Clone, PartialEq, Eq)]
/// Terminal state of experiment resolution for one selection.
pub enum ExperimentResolution {
    /// Not under experiment, or a treatment arm: the selection stands.
    Unchanged(Message),
    /// A control arm was picked and nothing replaces it.
    VoidedByControl,
    /// A control arm was picked and the next eligible non-control message replaces it.
    ReplacedByFallback(Message),
}

impl ExperimentResolution {
    pub fn into_message(self) -> Option<Message> {
        match self {
            ExperimentResolution::Unchanged(message)
            | ExperimentResolution::ReplacedByFallback(message) => Some(message),
            ExperimentResolution::VoidedByControl => None,
        }
    }
}

/// Per-request inputs for `resolve_experiment`.
pub struct ExperimentSettings<'a> {
    pub experiment_key: Option<&'a str>,
    pub control_behavior: ControlBehavior,
    pub feature_id: &'a str,
}

/// Returns true when `message` takes part in the experiment named by `experiment_key`.
///
/// Nothing is under experiment without a non-blank key. With a key, control messages
/// always are. Other ids must equal the key, or, when the id itself ends with
/// `EXPERIMENT_BRANCH_SEPARATOR`, start with the key.
pub fn is_message_under_experiment(message: &Message, experiment_key: Option<&str>) -> bool {
    let Some(key) = experiment_key.filter(|key| !key.trim().is_empty()) else {
        return false;
    };
    if message.is_control() {
        return true;
    }
    if message.id.ends_with(EXPERIMENT_BRANCH_SEPARATOR) {
        message.id.starts_with(key)
    } else {
        message.id == key
    }
}

/// Applies experiment semantics to `selected`.
///
/// Records exactly one exposure whenever `selected` is under experiment. A control pick
/// is then voided or replaced according to `settings.control_behavior`; during the
/// replacement scan an evaluation failure is reported as a malformed message.
pub fn resolve_experiment(
    selected: Message,
    sorted_candidates: &[Message],
    triggers: &mut TriggerEvaluator<'_>,
    settings: &ExperimentSettings<'_>,
    telemetry: &dyn TelemetrySink,
) -> ExperimentResolution {
    if !is_message_under_experiment(&selected, settings.experiment_key) {
        return ExperimentResolution::Unchanged(selected);
    }

    telemetry.record(&MessagingTelemetryEvent::Exposure {
        feature_id: settings.feature_id.to_string(),
        message_id: selected.id.clone(),
    });
    tracing::debug!(
        message_id = selected.id.as_str(),
        is_control = selected.is_control(),
        feature_id = settings.feature_id,
        "recorded experiment exposure"
    );

    if !selected.is_control() {
        return ExperimentResolution::Unchanged(selected);
    }

    match settings.control_behavior {
        ControlBehavior::ShowNone => ExperimentResolution::VoidedByControl,
        ControlBehavior::ShowNextMessage => {
            match next_non_control(sorted_candidates, triggers, telemetry) {
                Some(fallback) => ExperimentResolution::ReplacedByFallback(fallback.clone()),
                None => ExperimentResolution::VoidedByControl,
            }
        }
    }
}

fn next_non_control<'m>(
    sorted_candidates: &'m [Message],
    triggers: &mut TriggerEvaluator<'_>,
    telemetry: &dyn TelemetrySink,
) -> Option<&'m Message> {
    sorted_candidates
        .iter()
        .find(|message| match triggers.check(message) {
            Ok(eligible) => eligible && !message.is_control(),
            Err(error) => {
                tracing::debug!(
                    message_id = message.id.as_str(),
                    error = %error,
                    "control fallback evaluation failed; reporting malformed message"
                );
                telemetry.record(&MessagingTelemetryEvent::MalformedMessage {
                    message_id: message.id.clone(),
                });
                false
            }
        })
}
