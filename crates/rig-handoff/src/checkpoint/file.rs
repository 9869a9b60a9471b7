//! File-based Checkpointer Implementation
//!
//! Stores one JSON file per thread, optionally zstd-compressed.
//!
//! # Directory Structure
//!
//! ```text
//! checkpoints/
//! ├── thread_chat-1.json[.zst]
//! └── thread_user%2F42.json[.zst]
//! ```
//!
//! Thread ids are percent-encoded so any id maps to a single flat file name.

use async_trait::async_trait;
use std::borrow::Cow;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::{Checkpoint, Checkpointer};
use crate::error::HandoffError;

const PREFIX: &str = "thread_";

/// File-based checkpointer.
///
/// Atomic writes are ensured via temporary file + rename pattern.
#[derive(Debug, Clone)]
pub struct FileCheckpointer {
    dir: PathBuf,
    compression: bool,
}

impl FileCheckpointer {
    pub fn new(dir: impl Into<PathBuf>, compression: bool) -> Self {
        Self {
            dir: dir.into(),
            compression,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn extension(&self) -> &'static str {
        if self.compression {
            ".json.zst"
        } else {
            ".json"
        }
    }

    fn checkpoint_path(&self, thread_id: &str) -> PathBuf {
        self.dir
            .join(format!("{}{}{}", PREFIX, encode_thread_id(thread_id), self.extension()))
    }

    fn temp_path(&self, thread_id: &str) -> PathBuf {
        self.dir.join(format!(
            ".{}{}.{}.tmp",
            PREFIX,
            encode_thread_id(thread_id),
            uuid::Uuid::new_v4()
        ))
    }

    async fn ensure_dir(&self) -> Result<(), HandoffError> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| HandoffError::checkpoint(format!("Failed to create directory: {}", e)))
    }

    fn compress(data: &[u8]) -> Result<Vec<u8>, HandoffError> {
        let mut encoder = zstd::stream::Encoder::new(Vec::new(), 3)
            .map_err(|e| HandoffError::checkpoint(format!("Compression init failed: {}", e)))?;
        encoder
            .write_all(data)
            .map_err(|e| HandoffError::checkpoint(format!("Compression write failed: {}", e)))?;
        encoder
            .finish()
            .map_err(|e| HandoffError::checkpoint(format!("Compression finish failed: {}", e)))
    }

    fn decompress(data: &[u8]) -> Result<Vec<u8>, HandoffError> {
        zstd::stream::decode_all(data)
            .map_err(|e| HandoffError::checkpoint(format!("Decompression failed: {}", e)))
    }

    /// Thread id encoded in a checkpoint file name, if it is one of ours.
    fn parse_thread_id(&self, path: &Path) -> Option<String> {
        let filename = path.file_name()?.to_str()?;
        let encoded = filename
            .strip_prefix(PREFIX)?
            .strip_suffix(self.extension())?;
        decode_thread_id(encoded)
    }
}

#[async_trait]
impl Checkpointer for FileCheckpointer {
    async fn put(&self, checkpoint: &Checkpoint) -> Result<(), HandoffError> {
        self.ensure_dir().await?;

        let json = serde_json::to_vec_pretty(checkpoint)
            .map_err(|e| HandoffError::checkpoint(format!("Serialization failed: {}", e)))?;

        let data = if self.compression {
            Self::compress(&json)?
        } else {
            json
        };

        let temp_path = self.temp_path(&checkpoint.thread_id);
        let final_path = self.checkpoint_path(&checkpoint.thread_id);

        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| HandoffError::checkpoint(format!("Failed to create temp file: {}", e)))?;

        let written = write_synced(&mut file, &data).await;
        drop(file);

        let result = match written {
            Ok(()) => fs::rename(&temp_path, &final_path)
                .await
                .map_err(|e| HandoffError::checkpoint(format!("Failed to rename file: {}", e))),
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e);
        }

        debug!(thread_id = %checkpoint.thread_id, step = checkpoint.step, path = %final_path.display(), "Checkpoint written");
        Ok(())
    }

    async fn get(&self, thread_id: &str) -> Result<Option<Checkpoint>, HandoffError> {
        let path = self.checkpoint_path(thread_id);

        let data = match fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(HandoffError::checkpoint(format!(
                    "Failed to read file: {}",
                    e
                )))
            }
        };

        let json = if self.compression {
            Self::decompress(&data)?
        } else {
            data
        };

        let checkpoint = serde_json::from_slice(&json)
            .map_err(|e| HandoffError::checkpoint(format!("Deserialization failed: {}", e)))?;

        Ok(Some(checkpoint))
    }

    async fn delete(&self, thread_id: &str) -> Result<(), HandoffError> {
        match fs::remove_file(self.checkpoint_path(thread_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(HandoffError::checkpoint(format!(
                "Failed to delete file: {}",
                e
            ))),
        }
    }

    async fn list(&self) -> Result<Vec<String>, HandoffError> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(HandoffError::checkpoint(format!(
                    "Failed to read directory: {}",
                    e
                )))
            }
        };

        let mut threads = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| HandoffError::checkpoint(format!("Failed to read entry: {}", e)))?
        {
            if let Some(thread_id) = self.parse_thread_id(&entry.path()) {
                threads.push(thread_id);
            }
        }

        threads.sort();
        Ok(threads)
    }
}

async fn write_synced(file: &mut fs::File, data: &[u8]) -> Result<(), HandoffError> {
    file.write_all(data)
        .await
        .map_err(|e| HandoffError::checkpoint(format!("Failed to write data: {}", e)))?;
    file.sync_all()
        .await
        .map_err(|e| HandoffError::checkpoint(format!("Failed to sync file: {}", e)))
}

fn encode_thread_id(thread_id: &str) -> String {
    urlencoding::encode(thread_id).into_owned()
}

fn decode_thread_id(encoded: &str) -> Option<String> {
    urlencoding::decode(encoded).ok().map(Cow::into_owned)
}
