//! JSON-file backed topic store. Reload swaps the whole table behind an `Arc`, so readers
//! holding a snapshot never see a half-loaded store.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{error, info, warn};

/// Rendered in replies when a topic has no `description` field at all.
pub const NO_DESCRIPTION: &str = "No description available.";

#[derive(Debug, thiserror::Error)]
pub enum KnowledgeError {
    #[error("failed to read knowledge file: {0}")]
    Io(#[from] std::io::Error),
    #[error("knowledge file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("knowledge file must contain a JSON object at top level")]
    NotAnObject,
    #[error("topic {key:?} is malformed: {source}")]
    Topic {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// One topic. `key` comes from the JSON object key; the rest from its value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicRecord {
    #[serde(skip)]
    pub key: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub contact: Option<String>,
}

impl TopicRecord {
    /// Key plus aliases, lower-cased, key first.
    pub fn triggers(&self) -> impl Iterator<Item = String> + '_ {
        std::iter::once(self.key.to_lowercase()).chain(self.aliases.iter().map(|a| a.to_lowercase()))
    }
}

type Topics = Arc<Vec<TopicRecord>>;

/// Ordered topic table (file order). Read-mostly; `load`/`reload` replace it wholesale.
pub struct KnowledgeStore {
    path: PathBuf,
    topics: RwLock<Topics>,
}

impl KnowledgeStore {
    /// Empty store that will read from `path` on [`reload`](Self::reload).
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            topics: RwLock::new(Arc::new(Vec::new())),
        }
    }

    /// Creates the store and loads `path` immediately. Never fails; see [`load`](Self::load).
    pub fn open_path<P: AsRef<Path>>(path: P) -> Self {
        let store = Self::new(path);
        store.reload();
        store
    }

    /// Configured knowledge file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-reads the configured file. Returns the number of topics now loaded.
    pub fn reload(&self) -> usize {
        let path = self.path.clone();
        self.load(path)
    }

    /// Replaces the whole table with the contents of `path`. A missing file (warn) or
    /// malformed content (error) leaves the store empty; neither is fatal.
    pub fn load<P: AsRef<Path>>(&self, path: P) -> usize {
        let path = path.as_ref();
        let topics = match Self::read_file(path) {
            Ok(topics) => {
                info!(target: "vrc::knowledge", path = %path.display(), topics = topics.len(), "Knowledge base loaded");
                topics
            }
            Err(KnowledgeError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(target: "vrc::knowledge", path = %path.display(), "Knowledge base file not found; starting with empty base");
                Vec::new()
            }
            Err(e) => {
                error!(target: "vrc::knowledge", path = %path.display(), error = %e, "Knowledge base not loaded; starting with empty base");
                Vec::new()
            }
        };
        let count = topics.len();
        // The table is replaced whole, so a writer that panicked cannot leave it half-updated.
        *self.topics.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(topics);
        count
    }

    /// Reads and parses a knowledge file without touching any store.
    pub fn read_file<P: AsRef<Path>>(path: P) -> Result<Vec<TopicRecord>, KnowledgeError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parses knowledge JSON, preserving object key order.
    pub fn parse(contents: &str) -> Result<Vec<TopicRecord>, KnowledgeError> {
        let value: serde_json::Value = serde_json::from_str(contents)?;
        let serde_json::Value::Object(map) = value else {
            return Err(KnowledgeError::NotAnObject);
        };
        map.into_iter()
            .map(|(key, value)| {
                let mut record: TopicRecord = serde_json::from_value(value)
                    .map_err(|source| KnowledgeError::Topic { key: key.clone(), source })?;
                record.key = key;
                Ok(record)
            })
            .collect()
    }

    /// Current table. The returned `Arc` stays valid across later reloads.
    pub fn snapshot(&self) -> Topics {
        Arc::clone(&self.topics.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Topic keys in load order.
    pub fn topics(&self) -> Vec<String> {
        self.snapshot().iter().map(|t| t.key.clone()).collect()
    }
}
