use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use serde::Serialize;
use serde_json::Value;
use tau_messaging::{
    load_catalog_from_path, render_catalog_validate_report, validate_catalog, ActionDispatcher,
    CatalogValidateReport, FileCatalogSource, InMemoryMessageMetadataStore,
    JinjaPredicateEvaluator, MessageManager, MessagingCollaborators, MessagingConfig,
    TracingTelemetrySink,
};
use tau_messaging_types::{Message, MessageMetadata};
use url::Url;

use crate::cli_args::Cli;
use crate::state_io::write_text_atomic;

/// Logs dispatched actions; the CLI has no application to hand them to.
struct LoggingActionDispatcher;

impl ActionDispatcher for LoggingActionDispatcher {
    fn open(&self, target: &Url) -> Result<()> {
        tracing::info!(target = target.as_str(), "dispatching message action");
        Ok(())
    }
}

struct MessagingRuntime {
    manager: MessageManager,
    store: Arc<InMemoryMessageMetadataStore>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub(crate) struct NextMessageReport {
    pub(crate) surface: String,
    pub(crate) message_id: Option<String>,
    pub(crate) priority: Option<i32>,
    pub(crate) is_control: bool,
    pub(crate) title: Option<String>,
    pub(crate) text: Option<String>,
    pub(crate) button_label: Option<String>,
    pub(crate) impressions: Option<u32>,
    pub(crate) expired: Option<bool>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub(crate) struct PressReport {
    pub(crate) message_id: String,
    pub(crate) target: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub(crate) struct DismissReport {
    pub(crate) message_id: String,
    pub(crate) dismissals: u32,
    pub(crate) expired: bool,
}

/// Execute messaging validate mode and fail when malformed definitions are found.
pub(crate) fn execute_messaging_validate_command(cli: &Cli) -> Result<()> {
    let report = collect_validate_report(cli)?;
    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report)
                .context("failed to render messaging validate json")?
        );
    } else {
        println!("{}", render_catalog_validate_report(&report));
    }

    if report.malformed_messages > 0 {
        bail!(
            "messaging validate failed: malformed_messages={} duplicate_ids={}",
            report.malformed_messages,
            report.duplicate_ids
        );
    }
    Ok(())
}

/// Execute messaging next mode, optionally recording an impression.
pub(crate) fn execute_messaging_next_command(cli: &Cli) -> Result<()> {
    let report = collect_next_message_report(cli)?;
    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("failed to render messaging next json")?
        );
    } else {
        println!("{}", render_next_message_report(&report));
    }
    Ok(())
}

/// Execute messaging press mode and print the dispatched action.
pub(crate) fn execute_messaging_press_command(cli: &Cli, message_id: &str) -> Result<()> {
    let report = collect_press_report(cli, message_id)?;
    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report)
                .context("failed to render messaging press json")?
        );
    } else {
        println!("{}", render_press_report(&report));
    }

    if report.target.is_none() {
        bail!("messaging press failed: message_id={} was not dispatched", report.message_id);
    }
    Ok(())
}

/// Execute messaging dismiss mode.
pub(crate) fn execute_messaging_dismiss_command(cli: &Cli, message_id: &str) -> Result<()> {
    let report = collect_dismiss_report(cli, message_id)?;
    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report)
                .context("failed to render messaging dismiss json")?
        );
    } else {
        println!(
            "messaging dismiss: message_id={} dismissals={} expired={}",
            report.message_id, report.dismissals, report.expired
        );
    }
    Ok(())
}

pub(crate) fn collect_validate_report(cli: &Cli) -> Result<CatalogValidateReport> {
    let catalog = load_catalog_from_path(&cli.catalog)?;
    Ok(validate_catalog(&catalog))
}

pub(crate) fn collect_next_message_report(cli: &Cli) -> Result<NextMessageReport> {
    let runtime = build_runtime(cli)?;
    let selected = runtime.manager.get_next_message(cli.surface.as_str());
    let metadata = match (&selected, cli.record_display) {
        (Some(message), true) => {
            let updated = runtime
                .manager
                .on_message_displayed(message)
                .ok_or_else(|| anyhow!("failed to record impression for '{}'", message.id))?;
            persist_metadata_state(cli, &runtime)?;
            Some(updated)
        }
        (Some(message), false) => Some(message.metadata.clone()),
        (None, _) => None,
    };

    Ok(NextMessageReport {
        surface: cli.surface.clone(),
        message_id: selected.as_ref().map(|message| message.id.clone()),
        priority: selected.as_ref().map(Message::priority),
        is_control: selected.as_ref().is_some_and(Message::is_control),
        title: selected.as_ref().and_then(|message| message.definition.title.clone()),
        text: selected.as_ref().and_then(|message| message.definition.text.clone()),
        button_label: selected
            .as_ref()
            .and_then(|message| message.definition.button_label.clone()),
        impressions: metadata.as_ref().map(|metadata| metadata.impressions),
        expired: metadata.as_ref().map(|metadata| metadata.expired),
    })
}

pub(crate) fn collect_press_report(cli: &Cli, message_id: &str) -> Result<PressReport> {
    let runtime = build_runtime(cli)?;
    let message = find_candidate(&runtime, cli.surface.as_str(), message_id)?;
    let target = runtime.manager.on_message_pressed(&message);
    persist_metadata_state(cli, &runtime)?;
    Ok(PressReport {
        message_id: message.id,
        target: target.map(String::from),
    })
}

pub(crate) fn collect_dismiss_report(cli: &Cli, message_id: &str) -> Result<DismissReport> {
    let runtime = build_runtime(cli)?;
    let message = find_candidate(&runtime, cli.surface.as_str(), message_id)?;
    let updated = runtime
        .manager
        .on_message_dismissed(&message)
        .ok_or_else(|| anyhow!("failed to record dismissal for '{}'", message.id))?;
    persist_metadata_state(cli, &runtime)?;
    Ok(DismissReport {
        message_id: message.id,
        dismissals: updated.dismissals,
        expired: updated.expired,
    })
}

pub(crate) fn render_next_message_report(report: &NextMessageReport) -> String {
    let Some(message_id) = report.message_id.as_deref() else {
        return format!("messaging next: surface={} message_id=none", report.surface);
    };
    format!(
        "messaging next: surface={} message_id={} priority={} is_control={} impressions={} expired={} title={}",
        report.surface,
        message_id,
        report.priority.unwrap_or_default(),
        report.is_control,
        report.impressions.unwrap_or_default(),
        report.expired.unwrap_or_default(),
        report.title.as_deref().unwrap_or("none"),
    )
}

pub(crate) fn render_press_report(report: &PressReport) -> String {
    format!(
        "messaging press: message_id={} target={}",
        report.message_id,
        report.target.as_deref().unwrap_or("none")
    )
}

fn find_candidate(runtime: &MessagingRuntime, surface: &str, message_id: &str) -> Result<Message> {
    runtime
        .manager
        .candidates(surface)
        .into_iter()
        .find(|message| message.id == message_id)
        .ok_or_else(|| {
            anyhow!("message '{message_id}' is not an eligible candidate on surface '{surface}'")
        })
}

fn build_runtime(cli: &Cli) -> Result<MessagingRuntime> {
    let attributes = load_context_attributes(cli.context.as_deref())?;
    let seeded = match cli.metadata_state.as_deref() {
        Some(path) => load_metadata_state(path)?,
        None => Vec::new(),
    };
    let store = Arc::new(InMemoryMessageMetadataStore::with_metadata(seeded));
    let manager = MessageManager::new(
        MessagingCollaborators {
            catalog_source: Arc::new(FileCatalogSource::new(cli.catalog.clone())),
            evaluator: Arc::new(JinjaPredicateEvaluator::with_static_context(attributes)),
            store: store.clone(),
            telemetry: Arc::new(TracingTelemetrySink),
            dispatcher: Arc::new(LoggingActionDispatcher),
        },
        MessagingConfig {
            deep_link_scheme: cli.deep_link_scheme.clone(),
            experiment_feature_id: cli.experiment_feature_id.clone(),
            session_id: cli.session_id.clone(),
        },
    )?;
    Ok(MessagingRuntime { manager, store })
}

fn load_context_attributes(path: Option<&Path>) -> Result<Value> {
    let Some(path) = path else {
        return Ok(Value::Object(Default::default()));
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read context {}", path.display()))?;
    let value: Value = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse context {}", path.display()))?;
    if !value.is_object() {
        bail!("context {} must be a JSON object", path.display());
    }
    Ok(value)
}

fn load_metadata_state(path: &Path) -> Result<Vec<MessageMetadata>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read metadata state {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse metadata state {}", path.display()))
}

fn persist_metadata_state(cli: &Cli, runtime: &MessagingRuntime) -> Result<()> {
    let Some(path) = cli.metadata_state.as_deref() else {
        return Ok(());
    };
    let snapshot = runtime.store.snapshot()?;
    let encoded =
        serde_json::to_string_pretty(&snapshot).context("failed to encode metadata state")?;
    write_text_atomic(path, encoded.as_str())
        .with_context(|| format!("failed to write metadata state {}", path.display()))
}
