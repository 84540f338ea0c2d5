use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single staged path in a publish.
///
/// `web_uri` is the key the item is stored under; the remaining fields are
/// carried into the store record unchanged.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Item {
    pub web_uri: String,
    pub object_key: String,
    pub content_type: Option<String>,
    pub link_to: Option<String>,
}

impl Item {
    pub fn new(web_uri: impl Into<String>, object_key: impl Into<String>) -> Self {
        Self {
            web_uri: web_uri.into(),
            object_key: object_key.into(),
            content_type: None,
            link_to: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Mark this item as an alias of another path.
    pub fn with_link_to(mut self, link_to: impl Into<String>) -> Self {
        self.link_to = Some(link_to.into());
        self
    }

    /// Final path segment of `web_uri`.
    pub fn basename(&self) -> &str {
        self.web_uri
            .rsplit('/')
            .next()
            .unwrap_or(self.web_uri.as_str())
    }

    /// Whether this item is an entry point (repo index, manifest, ...) given
    /// the configured entry-point basenames.
    pub fn is_entry_point(&self, entry_point_files: &[String]) -> bool {
        let name = self.basename();
        entry_point_files.iter().any(|candidate| candidate == name)
    }

    /// Shape this item into the record sent to the store.
    pub fn to_record(&self, from_date: DateTime<Utc>) -> StoreRecord {
        StoreRecord {
            web_uri: self.web_uri.clone(),
            object_key: self.object_key.clone(),
            content_type: self.content_type.clone(),
            link_to: self.link_to.clone(),
            from_date,
        }
    }
}

/// The record written to (or deleted from) the key-value store.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct StoreRecord {
    pub web_uri: String,
    pub object_key: String,
    pub content_type: Option<String>,
    pub link_to: Option<String>,
    pub from_date: DateTime<Utc>,
}

impl StoreRecord {
    pub fn key(&self) -> &str {
        &self.web_uri
    }
}
