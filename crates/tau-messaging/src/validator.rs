//! Builds validated messages from raw catalog definitions.

use tau_messaging_types::{
    LookupTables, Message, MessageMetadata, RawMessageDefinition, StyleDescriptor,
};
use thiserror::Error;

/// Separator every resolved action target must contain.
pub const ACTION_SCHEME_SEPARATOR: &str = "://";

/// Why a raw definition could not become a `Message`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedReason {
    #[error("style '{style}' is not defined")]
    UnknownStyle { style: String },
    #[error("action '{action}' is neither a known action nor a '://' target")]
    InvalidAction { action: String },
    #[error("trigger '{trigger}' is not defined")]
    UnresolvedTrigger { trigger: String },
}

impl MalformedReason {
    /// Stable machine-readable code for diagnostics.
    pub fn reason_code(&self) -> &'static str {
        match self {
            MalformedReason::UnknownStyle { .. } => "messaging_style_unknown",
            MalformedReason::InvalidAction { .. } => "messaging_action_invalid",
            MalformedReason::UnresolvedTrigger { .. } => "messaging_trigger_unresolved",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Outcome of validating one raw definition.
pub enum MessageValidation {
    Valid(Message),
    Malformed {
        message_id: String,
        reason: MalformedReason,
    },
}

/// Validates `definition` against `tables`, attaching metadata from `metadata_lookup`.
///
/// Checks run in order and the first failure wins: style, action, triggers.
pub fn build_message<F>(
    definition: &RawMessageDefinition,
    tables: &LookupTables,
    metadata_lookup: F,
) -> MessageValidation
where
    F: FnOnce(&str) -> MessageMetadata,
{
    match resolve_definition(definition, tables) {
        Ok((style, action, triggers)) => MessageValidation::Valid(Message {
            id: definition.id.clone(),
            definition: definition.clone(),
            action,
            triggers,
            style,
            metadata: metadata_lookup(definition.id.as_str()),
        }),
        Err(reason) => MessageValidation::Malformed {
            message_id: definition.id.clone(),
            reason,
        },
    }
}

type ResolvedParts = (StyleDescriptor, String, Vec<String>);

fn resolve_definition(
    definition: &RawMessageDefinition,
    tables: &LookupTables,
) -> Result<ResolvedParts, MalformedReason> {
    let style = tables
        .styles
        .get(&definition.style)
        .copied()
        .ok_or_else(|| MalformedReason::UnknownStyle {
            style: definition.style.clone(),
        })?;

    let action = resolve_action(definition.action.as_str(), tables)?;

    let triggers = definition
        .triggers
        .iter()
        .filter_map(|key| tables.triggers.get(key).cloned())
        .collect::<Vec<_>>();
    if triggers.len() != definition.triggers.len() {
        let trigger = definition
            .triggers
            .iter()
            .find(|key| !tables.triggers.contains_key(key.as_str()))
            .cloned()
            .unwrap_or_default();
        return Err(MalformedReason::UnresolvedTrigger { trigger });
    }

    Ok((style, action, triggers))
}

fn resolve_action(action: &str, tables: &LookupTables) -> Result<String, MalformedReason> {
    let resolved = tables
        .actions
        .get(action)
        .map(String::as_str)
        .unwrap_or(action);
    if !resolved.contains(ACTION_SCHEME_SEPARATOR) {
        return Err(MalformedReason::InvalidAction {
            action: action.to_string(),
        });
    }
    Ok(resolved.to_string())
}
