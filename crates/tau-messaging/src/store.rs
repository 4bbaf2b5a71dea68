//! In-memory message metadata store and its expiry policy.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use chrono::Utc;
use tau_messaging_types::{Message, MessageMetadata, StyleDescriptor};

use crate::collaborators::MessageMetadataStore;

/// Returns true once a message has hit its style's impression limit, or has been
/// dismissed or pressed.
pub fn expiry_reached(metadata: &MessageMetadata, style: &StyleDescriptor) -> bool {
    metadata.impressions >= style.max_display_count
        || metadata.dismissals > 0
        || metadata.presses > 0
}

/// In-memory implementation for tests, tools, and hosts without persistence.
#[derive(Debug, Default)]
pub struct InMemoryMessageMetadataStore {
    inner: Mutex<HashMap<String, MessageMetadata>>,
}

impl InMemoryMessageMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with previously recorded metadata.
    pub fn with_metadata(entries: impl IntoIterator<Item = MessageMetadata>) -> Self {
        let inner = entries
            .into_iter()
            .map(|metadata| (metadata.message_id.clone(), metadata))
            .collect();
        Self {
            inner: Mutex::new(inner),
        }
    }

    /// Recorded metadata ordered by message id.
    pub fn snapshot(&self) -> Result<Vec<MessageMetadata>> {
        let inner = self
            .inner
            .lock()
            .map_err(|_| anyhow!("message metadata lock is poisoned"))?;
        let mut entries = inner.values().cloned().collect::<Vec<_>>();
        entries.sort_by(|left, right| left.message_id.cmp(&right.message_id));
        Ok(entries)
    }

    fn update<F>(&self, message: &Message, apply: F) -> Result<MessageMetadata>
    where
        F: FnOnce(&mut MessageMetadata),
    {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| anyhow!("message metadata lock is poisoned"))?;
        let metadata = inner
            .entry(message.id.clone())
            .or_insert_with(|| MessageMetadata::new(message.id.as_str()));
        apply(metadata);
        metadata.expired = metadata.expired || expiry_reached(metadata, &message.style);
        Ok(metadata.clone())
    }
}

impl MessageMetadataStore for InMemoryMessageMetadataStore {
    fn metadata(&self, message_id: &str) -> Result<MessageMetadata> {
        let inner = self
            .inner
            .lock()
            .map_err(|_| anyhow!("message metadata lock is poisoned"))?;
        Ok(inner
            .get(message_id)
            .cloned()
            .unwrap_or_else(|| MessageMetadata::new(message_id)))
    }

    /// Repeated displays within one session count as a single impression.
    fn on_displayed(
        &self,
        message: &Message,
        session_id: Option<&str>,
    ) -> Result<MessageMetadata> {
        self.update(message, |metadata| {
            let same_session =
                session_id.is_some() && metadata.last_session_id.as_deref() == session_id;
            if !same_session {
                metadata.impressions = metadata.impressions.saturating_add(1);
            }
            metadata.last_displayed_at = Some(Utc::now());
            if let Some(session_id) = session_id {
                metadata.last_session_id = Some(session_id.to_string());
            }
        })
    }

    fn on_pressed(&self, message: &Message) -> Result<MessageMetadata> {
        self.update(message, |metadata| {
            metadata.presses = metadata.presses.saturating_add(1);
        })
    }

    fn on_dismissed(&self, message: &Message) -> Result<MessageMetadata> {
        self.update(message, |metadata| {
            metadata.dismissals = metadata.dismissals.saturating_add(1);
        })
    }
}
