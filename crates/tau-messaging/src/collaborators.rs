//! Contracts for the collaborators the messaging engine is composed with.

use anyhow::Result;
use serde_json::{Map, Value};
use tau_messaging_types::{Message, MessageMetadata, MessagingCatalog};
use thiserror::Error;
use url::Url;

use crate::telemetry::MessagingTelemetryEvent;

/// Errors raised by a `PredicateEvaluator`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PredicateError {
    #[error("failed to evaluate expression '{expression}': {detail}")]
    Evaluation { expression: String, detail: String },
    #[error("expression '{expression}' produced an undefined value")]
    UndefinedValue { expression: String },
    #[error("failed to substitute template '{template}': {detail}")]
    Substitution { template: String, detail: String },
}

/// Snapshot of application state that trigger expressions are evaluated against.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvalContext {
    attributes: Map<String, Value>,
}

impl EvalContext {
    pub fn new(attributes: Map<String, Value>) -> Self {
        Self { attributes }
    }

    /// Builds a context from a JSON object; other JSON values yield `None`.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(attributes) => Some(Self { attributes }),
            _ => None,
        }
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// Returns a copy of this context with one extra attribute set.
    pub fn with_attribute(&self, key: impl Into<String>, value: Value) -> Self {
        let mut attributes = self.attributes.clone();
        attributes.insert(key.into(), value);
        Self { attributes }
    }
}

/// Supplies the current catalog. Called once per selection request.
pub trait CatalogSource: Send + Sync {
    fn current_catalog(&self) -> Result<MessagingCatalog>;
}

/// Evaluates trigger expressions and renders action templates.
pub trait PredicateEvaluator: Send + Sync {
    /// Returns `None` when nothing can be evaluated right now.
    fn create_context(&self) -> Option<EvalContext>;
    fn evaluate(&self, expression: &str, context: &EvalContext) -> Result<bool, PredicateError>;
    fn substitute(&self, template: &str, context: &EvalContext) -> Result<String, PredicateError>;
}

/// Persists per-message counters and owns the expiry policy.
pub trait MessageMetadataStore: Send + Sync {
    fn metadata(&self, message_id: &str) -> Result<MessageMetadata>;
    fn on_displayed(&self, message: &Message, session_id: Option<&str>)
        -> Result<MessageMetadata>;
    fn on_pressed(&self, message: &Message) -> Result<MessageMetadata>;
    fn on_dismissed(&self, message: &Message) -> Result<MessageMetadata>;
}

/// Fire-and-forget telemetry recorder.
pub trait TelemetrySink: Send + Sync {
    fn record(&self, event: &MessagingTelemetryEvent);
}

/// Performs the application-level effect of a pressed message.
pub trait ActionDispatcher: Send + Sync {
    fn open(&self, target: &Url) -> Result<()>;
}
