//! Checkpoint store
//!
//! One checkpoint per conversation thread, overwritten after every graph
//! step. Writes are all-or-nothing: a reader sees either the previous
//! checkpoint or the new one, never a partial snapshot.
//!
//! # Usage
//!
//! ```ignore
//! use rig_handoff::checkpoint::{CheckpointerConfig, create_checkpointer};
//!
//! let checkpointer = create_checkpointer(CheckpointerConfig::File {
//!     path: PathBuf::from("./checkpoints"),
//!     compression: true,
//! })?;
//!
//! if let Some(state) = checkpointer.get_state("chat-42").await? {
//!     // resume
//! }
//! ```

mod file;

pub use file::FileCheckpointer;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::HandoffError;
use crate::state::ConversationState;

/// Snapshot of a thread after one graph step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub thread_id: String,

    /// Index of the step within its run
    pub step: usize,

    /// Node that produced this state
    pub node: String,

    pub state: ConversationState,

    pub timestamp: DateTime<Utc>,

    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Checkpoint {
    pub fn new(
        thread_id: impl Into<String>,
        step: usize,
        node: impl Into<String>,
        state: ConversationState,
    ) -> Self {
        Self {
            thread_id: thread_id.into(),
            step,
            node: node.into(),
            state,
            timestamp: Utc::now(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Durable per-thread state storage.
///
/// Last writer wins per thread id. Implementations must make `put` atomic.
#[async_trait]
pub trait Checkpointer: Send + Sync {
    /// Store the checkpoint, replacing any previous one for the thread.
    async fn put(&self, checkpoint: &Checkpoint) -> Result<(), HandoffError>;

    /// Latest checkpoint of a thread.
    async fn get(&self, thread_id: &str) -> Result<Option<Checkpoint>, HandoffError>;

    async fn delete(&self, thread_id: &str) -> Result<(), HandoffError>;

    /// All thread ids with a checkpoint, sorted.
    async fn list(&self) -> Result<Vec<String>, HandoffError>;

    /// Latest conversation state of a thread.
    async fn get_state(&self, thread_id: &str) -> Result<Option<ConversationState>, HandoffError> {
        Ok(self.get(thread_id).await?.map(|c| c.state))
    }

    /// Delete every checkpoint.
    async fn clear(&self) -> Result<(), HandoffError> {
        for thread_id in self.list().await? {
            self.delete(&thread_id).await?;
        }
        Ok(())
    }
}

/// Configuration for creating checkpointers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CheckpointerConfig {
    /// In-memory checkpointing (lost on exit)
    #[default]
    Memory,

    /// One JSON file per thread
    File {
        /// Directory to store checkpoint files
        path: PathBuf,
        /// Whether to compress checkpoint data (uses zstd)
        #[serde(default)]
        compression: bool,
    },
}

/// In-memory checkpointer.
#[derive(Debug, Default)]
pub struct MemoryCheckpointer {
    checkpoints: tokio::sync::RwLock<HashMap<String, Checkpoint>>,
}

impl MemoryCheckpointer {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Checkpointer for MemoryCheckpointer {
    async fn put(&self, checkpoint: &Checkpoint) -> Result<(), HandoffError> {
        let mut checkpoints = self.checkpoints.write().await;
        checkpoints.insert(checkpoint.thread_id.clone(), checkpoint.clone());
        Ok(())
    }

    async fn get(&self, thread_id: &str) -> Result<Option<Checkpoint>, HandoffError> {
        let checkpoints = self.checkpoints.read().await;
        Ok(checkpoints.get(thread_id).cloned())
    }

    async fn delete(&self, thread_id: &str) -> Result<(), HandoffError> {
        let mut checkpoints = self.checkpoints.write().await;
        checkpoints.remove(thread_id);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>, HandoffError> {
        let checkpoints = self.checkpoints.read().await;
        let mut threads: Vec<String> = checkpoints.keys().cloned().collect();
        threads.sort();
        Ok(threads)
    }

    async fn clear(&self) -> Result<(), HandoffError> {
        self.checkpoints.write().await.clear();
        Ok(())
    }
}

/// Create a checkpointer from configuration.
pub fn create_checkpointer(
    config: CheckpointerConfig,
) -> Result<Arc<dyn Checkpointer>, HandoffError> {
    match config {
        CheckpointerConfig::Memory => Ok(Arc::new(MemoryCheckpointer::new())),
        CheckpointerConfig::File { path, compression } => {
            if path.as_os_str().is_empty() {
                return Err(HandoffError::config("checkpoint directory must not be empty"));
            }
            Ok(Arc::new(FileCheckpointer::new(path, compression)))
        }
    }
}
