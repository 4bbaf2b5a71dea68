//! Shared data types for Tau in-app messaging.
//!
//! Raw definitions and lookup tables arrive from remote configuration; `Message` is the
//! validated form the selection engine works with.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const DEFAULT_STYLE_PRIORITY: i32 = 50;
pub const DEFAULT_MAX_DISPLAY_COUNT: u32 = 5;

/// What to do when the selected message is the control arm of an experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ControlBehavior {
    #[default]
    ShowNextMessage,
    ShowNone,
}

impl ControlBehavior {
    pub fn as_str(self) -> &'static str {
        match self {
            ControlBehavior::ShowNextMessage => "show_next_message",
            ControlBehavior::ShowNone => "show_none",
        }
    }
}

/// Display priority and impression limit shared by messages of one style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleDescriptor {
    /// Higher values are shown first.
    #[serde(default = "default_style_priority")]
    pub priority: i32,
    /// Impressions after which the metadata store expires the message.
    #[serde(default = "default_max_display_count")]
    pub max_display_count: u32,
}

impl Default for StyleDescriptor {
    fn default() -> Self {
        Self {
            priority: DEFAULT_STYLE_PRIORITY,
            max_display_count: DEFAULT_MAX_DISPLAY_COUNT,
        }
    }
}

impl StyleDescriptor {
    pub fn new(priority: i32, max_display_count: u32) -> Self {
        Self {
            priority,
            max_display_count,
        }
    }
}

fn default_style_priority() -> i32 {
    DEFAULT_STYLE_PRIORITY
}

fn default_max_display_count() -> u32 {
    DEFAULT_MAX_DISPLAY_COUNT
}

/// Message definition exactly as published in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMessageDefinition {
    pub id: String,
    pub surface: String,
    pub style: String,
    /// Action table key, or a literal `scheme://...` target.
    pub action: String,
    /// Trigger table keys; every one must hold for the message to be shown.
    #[serde(default)]
    pub triggers: Vec<String>,
    #[serde(default)]
    pub is_control: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button_label: Option<String>,
}

impl RawMessageDefinition {
    /// Creates a non-control definition without triggers or display payload.
    pub fn new(
        id: impl Into<String>,
        surface: impl Into<String>,
        style: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            surface: surface.into(),
            style: style.into(),
            action: action.into(),
            triggers: Vec::new(),
            is_control: false,
            title: None,
            text: None,
            button_label: None,
        }
    }

    pub fn with_triggers<I, S>(mut self, triggers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.triggers = triggers.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_control(mut self, is_control: bool) -> Self {
        self.is_control = is_control;
        self
    }
}

/// Key/value tables that raw definitions are resolved against, plus experiment settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupTables {
    #[serde(default)]
    pub styles: HashMap<String, StyleDescriptor>,
    #[serde(default)]
    pub actions: HashMap<String, String>,
    #[serde(default)]
    pub triggers: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_under_experiment: Option<String>,
    #[serde(default)]
    pub on_control: ControlBehavior,
}

impl LookupTables {
    /// Returns the experiment key when one is configured and not blank.
    pub fn experiment_key(&self) -> Option<&str> {
        self.message_under_experiment
            .as_deref()
            .filter(|key| !key.trim().is_empty())
    }
}

/// Full catalog snapshot supplied by a configuration source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagingCatalog {
    /// Definitions in catalog order; the order breaks priority ties.
    #[serde(default)]
    pub messages: Vec<RawMessageDefinition>,
    #[serde(flatten)]
    pub tables: LookupTables,
}

/// Per-message bookkeeping owned by the metadata store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageMetadata {
    pub message_id: String,
    #[serde(default)]
    pub impressions: u32,
    #[serde(default)]
    pub dismissals: u32,
    #[serde(default)]
    pub presses: u32,
    #[serde(default)]
    pub expired: bool,
    #[serde(default)]
    pub last_displayed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_session_id: Option<String>,
}

impl MessageMetadata {
    /// Creates metadata for a message that has never been shown.
    pub fn new(message_id: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            ..Self::default()
        }
    }
}

/// Validated message ready for trigger evaluation.
///
/// Only constructed by the validator, after every trigger key resolved and the action
/// carried a scheme separator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub definition: RawMessageDefinition,
    /// Resolved action template.
    pub action: String,
    /// Resolved trigger expressions, in definition order.
    pub triggers: Vec<String>,
    pub style: StyleDescriptor,
    pub metadata: MessageMetadata,
}

impl Message {
    pub fn surface(&self) -> &str {
        self.definition.surface.as_str()
    }

    pub fn priority(&self) -> i32 {
        self.style.priority
    }

    pub fn is_control(&self) -> bool {
        self.definition.is_control
    }

    pub fn is_expired(&self) -> bool {
        self.metadata.expired
    }
}
