//! Orchestrates selection and routes message lifecycle callbacks.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::Value;
use tau_messaging_types::{Message, MessageMetadata, MessagingCatalog};
use url::Url;
use uuid::Uuid;

use crate::collaborators::{
    ActionDispatcher, CatalogSource, MessageMetadataStore, PredicateEvaluator, TelemetrySink,
};
use crate::config::MessagingConfig;
use crate::eligibility::filter_eligible;
use crate::experiment::{resolve_experiment, ExperimentResolution, ExperimentSettings};
use crate::selector::{select_next, sort_by_priority};
use crate::telemetry::MessagingTelemetryEvent;
use crate::triggers::TriggerEvaluator;
use crate::validator::{build_message, MessageValidation, ACTION_SCHEME_SEPARATOR};

/// Context attribute holding the press correlation id while rendering an action.
pub const ACTION_UUID_ATTRIBUTE: &str = "uuid";

#[derive(Clone)]
/// Public struct `MessagingCollaborators` used across Tau components.
pub struct MessagingCollaborators {
    pub catalog_source: Arc<dyn CatalogSource>,
    pub evaluator: Arc<dyn PredicateEvaluator>,
    pub store: Arc<dyn MessageMetadataStore>,
    pub telemetry: Arc<dyn TelemetrySink>,
    pub dispatcher: Arc<dyn ActionDispatcher>,
}

/// Selects messages for surfaces and keeps store and telemetry in step with the UI.
///
/// No callback returns an error: failures are logged, reported as malformed where
/// applicable, and surface to the caller as `None`.
pub struct MessageManager {
    collaborators: MessagingCollaborators,
    config: MessagingConfig,
}

impl MessageManager {
    pub fn new(collaborators: MessagingCollaborators, config: MessagingConfig) -> Result<Self> {
        config.validate().context("invalid messaging config")?;
        let manager = Self {
            collaborators,
            config,
        };
        manager.on_startup();
        Ok(manager)
    }

    pub fn config(&self) -> &MessagingConfig {
        &self.config
    }

    pub fn on_startup(&self) {
        tracing::debug!(
            deep_link_scheme = self.config.deep_link_scheme.as_str(),
            experiment_feature_id = self.config.experiment_feature_id.as_str(),
            "message manager started"
        );
    }

    /// Returns the message to show on `surface`, if any.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn get_next_message(&self, surface: &str) -> Option<Message> {
        let catalog = self.current_catalog()?;
        let candidates = self.eligible_candidates(&catalog, surface, true);
        if candidates.is_empty() {
            tracing::debug!("no eligible candidates");
            return None;
        }

        let Some(context) = self.collaborators.evaluator.create_context() else {
            tracing::debug!("evaluation context unavailable; selecting nothing");
            return None;
        };
        let mut triggers = TriggerEvaluator::new(self.collaborators.evaluator.as_ref(), &context);
        let selected = select_next(&candidates, &mut triggers)?.clone();
        tracing::debug!(
            message_id = selected.id.as_str(),
            priority = selected.priority(),
            "selected message"
        );

        let settings = ExperimentSettings {
            experiment_key: catalog.tables.experiment_key(),
            control_behavior: catalog.tables.on_control,
            feature_id: self.config.experiment_feature_id.as_str(),
        };
        let resolution = resolve_experiment(
            selected,
            &candidates,
            &mut triggers,
            &settings,
            self.collaborators.telemetry.as_ref(),
        );
        match &resolution {
            ExperimentResolution::Unchanged(_) => {}
            ExperimentResolution::VoidedByControl => {
                tracing::debug!(
                    on_control = settings.control_behavior.as_str(),
                    "control message voided selection"
                );
            }
            ExperimentResolution::ReplacedByFallback(message) => {
                tracing::debug!(
                    message_id = message.id.as_str(),
                    "control message replaced by fallback"
                );
            }
        }
        resolution.into_message()
    }

    /// Validated, unexpired candidates for `surface` in selection order, without
    /// evaluating triggers. Malformed definitions are skipped without telemetry.
    pub fn candidates(&self, surface: &str) -> Vec<Message> {
        self.current_catalog()
            .map(|catalog| self.eligible_candidates(&catalog, surface, false))
            .unwrap_or_default()
    }

    /// Records an impression. Returns the updated metadata when the store accepted it.
    pub fn on_message_displayed(&self, message: &Message) -> Option<MessageMetadata> {
        self.collaborators
            .telemetry
            .record(&MessagingTelemetryEvent::MessageShown {
                message_id: message.id.clone(),
            });
        let updated = match self
            .collaborators
            .store
            .on_displayed(message, self.config.session_id.as_deref())
        {
            Ok(updated) => updated,
            Err(error) => {
                tracing::warn!(
                    message_id = message.id.as_str(),
                    error = %error,
                    "failed to record message impression"
                );
                return None;
            }
        };
        if updated.expired && !message.is_expired() {
            self.collaborators
                .telemetry
                .record(&MessagingTelemetryEvent::MessageExpired {
                    message_id: message.id.clone(),
                });
        }
        Some(updated)
    }

    /// Resolves the message action and dispatches it. Returns the dispatched target.
    pub fn on_message_pressed(&self, message: &Message) -> Option<Url> {
        if let Err(error) = self.collaborators.store.on_pressed(message) {
            tracing::warn!(
                message_id = message.id.as_str(),
                error = %error,
                "failed to record message press"
            );
        }

        let action_uuid = Uuid::new_v4().to_string();
        let context = self
            .collaborators
            .evaluator
            .create_context()
            .unwrap_or_default()
            .with_attribute(ACTION_UUID_ATTRIBUTE, Value::String(action_uuid.clone()));
        let resolved = match self
            .collaborators
            .evaluator
            .substitute(message.action.as_str(), &context)
        {
            Ok(resolved) => resolved,
            Err(error) => {
                tracing::debug!(
                    message_id = message.id.as_str(),
                    error = %error,
                    "failed to render message action"
                );
                self.on_malformed_message(message.id.as_str());
                return None;
            }
        };
        self.collaborators
            .telemetry
            .record(&MessagingTelemetryEvent::MessageClicked {
                message_id: message.id.clone(),
                action_uuid,
            });

        let target = match self.action_target(resolved.as_str()) {
            Ok(target) => target,
            Err(error) => {
                tracing::debug!(
                    message_id = message.id.as_str(),
                    action = resolved.as_str(),
                    error = %error,
                    "message action is not a valid URL"
                );
                self.on_malformed_message(message.id.as_str());
                return None;
            }
        };
        if let Err(error) = self.collaborators.dispatcher.open(&target) {
            tracing::warn!(
                message_id = message.id.as_str(),
                target = target.as_str(),
                error = %error,
                "failed to dispatch message action"
            );
            return None;
        }
        Some(target)
    }

    /// Records a dismissal; the store is expected to expire the message.
    pub fn on_message_dismissed(&self, message: &Message) -> Option<MessageMetadata> {
        self.collaborators
            .telemetry
            .record(&MessagingTelemetryEvent::MessageDismissed {
                message_id: message.id.clone(),
            });
        match self.collaborators.store.on_dismissed(message) {
            Ok(updated) => Some(updated),
            Err(error) => {
                tracing::warn!(
                    message_id = message.id.as_str(),
                    error = %error,
                    "failed to record message dismissal"
                );
                None
            }
        }
    }

    pub fn on_malformed_message(&self, message_id: &str) {
        tracing::debug!(message_id, "reporting malformed message");
        self.collaborators
            .telemetry
            .record(&MessagingTelemetryEvent::MalformedMessage {
                message_id: message_id.to_string(),
            });
    }

    fn current_catalog(&self) -> Option<MessagingCatalog> {
        match self.collaborators.catalog_source.current_catalog() {
            Ok(catalog) => Some(catalog),
            Err(error) => {
                tracing::warn!(error = %error, "failed to read messaging catalog");
                None
            }
        }
    }

    fn eligible_candidates(
        &self,
        catalog: &MessagingCatalog,
        surface: &str,
        report_malformed: bool,
    ) -> Vec<Message> {
        let built = self.build_candidates(catalog, report_malformed);
        let mut candidates = filter_eligible(built, surface);
        sort_by_priority(&mut candidates);
        candidates
    }

    /// Metadata is read only for definitions that validate.
    #[tracing::instrument(level = "debug", skip_all, fields(definitions = catalog.messages.len()))]
    fn build_candidates(&self, catalog: &MessagingCatalog, report_malformed: bool) -> Vec<Message> {
        let mut candidates = Vec::with_capacity(catalog.messages.len());
        for definition in &catalog.messages {
            let mut metadata_error = None;
            let validation = build_message(definition, &catalog.tables, |id| {
                match self.collaborators.store.metadata(id) {
                    Ok(metadata) => metadata,
                    Err(error) => {
                        metadata_error = Some(error);
                        MessageMetadata::new(id)
                    }
                }
            });
            match validation {
                MessageValidation::Valid(message) => {
                    if let Some(error) = metadata_error {
                        tracing::warn!(
                            message_id = message.id.as_str(),
                            error = %error,
                            "failed to read message metadata; skipping candidate"
                        );
                        continue;
                    }
                    candidates.push(message);
                }
                MessageValidation::Malformed { message_id, reason } => {
                    tracing::debug!(
                        message_id = message_id.as_str(),
                        reason_code = reason.reason_code(),
                        reason = %reason,
                        "excluding malformed message"
                    );
                    if report_malformed {
                        self.on_malformed_message(message_id.as_str());
                    }
                }
            }
        }
        candidates
    }

    fn action_target(&self, resolved: &str) -> Result<Url, url::ParseError> {
        if resolved.starts_with(ACTION_SCHEME_SEPARATOR) {
            let absolute = format!("{}{resolved}", self.config.deep_link_scheme);
            return Url::parse(absolute.as_str());
        }
        Url::parse(resolved)
    }
}
