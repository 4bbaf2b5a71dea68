//! In-app message selection engine for Tau surfaces.
//!
//! Validates catalog definitions into messages, filters them by surface and expiry,
//! evaluates triggers in priority order, and applies experiment control-arm rules
//! before handing a message to the host UI.

mod catalog;
mod collaborators;
mod config;
mod eligibility;
mod experiment;
mod jinja;
mod manager;
mod selector;
mod store;
mod telemetry;
mod triggers;
mod validator;

pub use catalog::{
    load_catalog_from_path, parse_catalog_json, render_catalog_validate_report,
    validate_catalog, CatalogValidateDiagnostic, CatalogValidateReport, FileCatalogSource,
    StaticCatalogSource,
};
pub use collaborators::{
    ActionDispatcher, CatalogSource, EvalContext, MessageMetadataStore, PredicateError,
    PredicateEvaluator, TelemetrySink,
};
pub use config::{MessagingConfig, DEFAULT_DEEP_LINK_SCHEME, DEFAULT_EXPERIMENT_FEATURE_ID};
pub use eligibility::filter_eligible;
pub use experiment::{
    is_message_under_experiment, resolve_experiment, ExperimentResolution, ExperimentSettings,
    EXPERIMENT_BRANCH_SEPARATOR,
};
pub use jinja::JinjaPredicateEvaluator;
pub use manager::{MessageManager, MessagingCollaborators, ACTION_UUID_ATTRIBUTE};
pub use selector::{select_next, sort_by_priority};
pub use store::{expiry_reached, InMemoryMessageMetadataStore};
pub use tau_messaging_types::{
    ControlBehavior, LookupTables, Message, MessageMetadata, MessagingCatalog,
    RawMessageDefinition, StyleDescriptor,
};
pub use telemetry::{
    MessagingTelemetryEvent, TracingTelemetrySink, EXPERIMENTS_TELEMETRY_CATEGORY,
    MESSAGING_TELEMETRY_CATEGORY,
};
pub use triggers::TriggerEvaluator;
pub use validator::{build_message, MalformedReason, MessageValidation, ACTION_SCHEME_SEPARATOR};

#[cfg(test)]
mod test_support;
