//! Catalog sources, JSON decoding, and offline catalog validation.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use tau_messaging_types::{MessageMetadata, MessagingCatalog};

use crate::collaborators::CatalogSource;
use crate::validator::{build_message, MessageValidation};

pub fn parse_catalog_json(raw: &str) -> Result<MessagingCatalog> {
    serde_json::from_str(raw).context("failed to parse messaging catalog JSON")
}

pub fn load_catalog_from_path(path: &Path) -> Result<MessagingCatalog> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read messaging catalog {}", path.display()))?;
    parse_catalog_json(&raw)
        .with_context(|| format!("invalid messaging catalog {}", path.display()))
}

/// Catalog held in memory; hosts swap in new snapshots as remote config arrives.
#[derive(Debug, Default)]
pub struct StaticCatalogSource {
    catalog: RwLock<MessagingCatalog>,
}

impl StaticCatalogSource {
    pub fn new(catalog: MessagingCatalog) -> Self {
        Self {
            catalog: RwLock::new(catalog),
        }
    }

    pub fn replace(&self, catalog: MessagingCatalog) -> Result<()> {
        let mut current = self
            .catalog
            .write()
            .map_err(|_| anyhow!("messaging catalog lock is poisoned"))?;
        *current = catalog;
        Ok(())
    }
}

impl CatalogSource for StaticCatalogSource {
    fn current_catalog(&self) -> Result<MessagingCatalog> {
        let catalog = self
            .catalog
            .read()
            .map_err(|_| anyhow!("messaging catalog lock is poisoned"))?;
        Ok(catalog.clone())
    }
}

/// Re-reads a JSON catalog file on every request.
#[derive(Debug, Clone)]
pub struct FileCatalogSource {
    path: PathBuf,
}

impl FileCatalogSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CatalogSource for FileCatalogSource {
    fn current_catalog(&self) -> Result<MessagingCatalog> {
        load_catalog_from_path(&self.path)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
/// Public struct `CatalogValidateDiagnostic` used across Tau components.
pub struct CatalogValidateDiagnostic {
    pub message_id: String,
    pub reason_code: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
/// Public struct `CatalogValidateReport` used across Tau components.
pub struct CatalogValidateReport {
    pub total_messages: usize,
    pub valid_messages: usize,
    pub malformed_messages: usize,
    pub duplicate_ids: usize,
    pub control_messages: usize,
    pub experiment_key: Option<String>,
    pub on_control: String,
    pub diagnostics: Vec<CatalogValidateDiagnostic>,
}

/// Validates every definition against the catalog's own lookup tables.
pub fn validate_catalog(catalog: &MessagingCatalog) -> CatalogValidateReport {
    let mut report = CatalogValidateReport {
        total_messages: catalog.messages.len(),
        valid_messages: 0,
        malformed_messages: 0,
        duplicate_ids: 0,
        control_messages: 0,
        experiment_key: catalog.tables.experiment_key().map(str::to_string),
        on_control: catalog.tables.on_control.as_str().to_string(),
        diagnostics: Vec::new(),
    };

    let mut seen_ids = HashSet::new();
    for definition in &catalog.messages {
        if !seen_ids.insert(definition.id.as_str()) {
            report.duplicate_ids += 1;
            report.diagnostics.push(CatalogValidateDiagnostic {
                message_id: definition.id.clone(),
                reason_code: "messaging_duplicate_id".to_string(),
                message: format!("message id '{}' appears more than once", definition.id),
            });
        }
        if definition.is_control {
            report.control_messages += 1;
        }

        match build_message(definition, &catalog.tables, |id| MessageMetadata::new(id)) {
            MessageValidation::Valid(_) => report.valid_messages += 1,
            MessageValidation::Malformed { message_id, reason } => {
                report.malformed_messages += 1;
                report.diagnostics.push(CatalogValidateDiagnostic {
                    message_id,
                    reason_code: reason.reason_code().to_string(),
                    message: reason.to_string(),
                });
            }
        }
    }

    report
}

pub fn render_catalog_validate_report(report: &CatalogValidateReport) -> String {
    let mut lines = vec![format!(
        "messaging validate: total_messages={} valid_messages={} malformed_messages={} duplicate_ids={} control_messages={} experiment_key={} on_control={}",
        report.total_messages,
        report.valid_messages,
        report.malformed_messages,
        report.duplicate_ids,
        report.control_messages,
        report.experiment_key.as_deref().unwrap_or("none"),
        report.on_control,
    )];

    for diagnostic in &report.diagnostics {
        lines.push(format!(
            "messaging validate error: message_id={} reason_code={} message={}",
            diagnostic.message_id, diagnostic.reason_code, diagnostic.message
        ));
    }

    lines.join("\n")
}
