//! Descriptive metadata embedded in exported containers.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One container metadata entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetadataItem {
    pub key: String,
    pub value: String,
}

impl MetadataItem {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Descriptive information about an exported video.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub author: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    /// Application that produced the media. Written as `comment`, since
    /// the muxer replaces any `encoder` value with its own.
    #[serde(default)]
    pub source_app: Option<String>,

    #[serde(default)]
    pub creation_date: Option<DateTime<Utc>>,

    /// Additional free-form entries, written after the named fields.
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

impl MediaInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_source_app(mut self, app: impl Into<String>) -> Self {
        self.source_app = Some(app.into());
        self
    }

    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Container metadata items in a stable order.
    ///
    /// Empty values are skipped. Extra entries never override a named field.
    pub fn metadata_items(&self) -> Vec<MetadataItem> {
        let mut items = Vec::new();
        let named = [
            ("title", self.title.as_deref()),
            ("artist", self.author.as_deref()),
            ("description", self.description.as_deref()),
            ("comment", self.source_app.as_deref()),
        ];
        for (key, value) in named {
            if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
                items.push(MetadataItem::new(key, value));
            }
        }
        if let Some(date) = self.creation_date {
            items.push(MetadataItem::new("creation_time", date.to_rfc3339()));
        }
        for (key, value) in &self.extra {
            let key = key.trim();
            if key.is_empty() || value.trim().is_empty() {
                continue;
            }
            if items.iter().any(|item| item.key == key) {
                continue;
            }
            items.push(MetadataItem::new(key, value.trim()));
        }
        items
    }
}
