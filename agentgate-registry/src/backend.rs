//! Durable forms of the registry.
//!
//! A backend stores and returns whole [`Registry`] snapshots. Each `save`
//! must replace the previous durable state atomically so that a crash or a
//! concurrent reader never sees a half-written document.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use agentgate_core::{AgentRecord, Registry, StorageError};
use async_trait::async_trait;
use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};
use tokio::io::AsyncWriteExt;

/// Whole-snapshot persistence for the registry.
#[async_trait]
pub trait RegistryBackend: Send + Sync + fmt::Debug {
    /// Read the durable registry. `Ok(None)` means nothing has been written yet.
    async fn load(&self) -> Result<Option<Registry>, StorageError>;

    /// Atomically replace the durable registry with `registry`.
    async fn save(&self, registry: &Registry) -> Result<(), StorageError>;

    /// Short label used in logs and health output.
    fn describe(&self) -> String;
}

fn io_error(path: &Path, err: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}

// ============================================================================
// JSON FILE BACKEND
// ============================================================================

/// Single JSON document on the local filesystem.
///
/// Writes go to a uniquely named sibling file which is fsynced and then
/// renamed over the target.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "registry.json".to_string());
        self.path
            .with_file_name(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4().simple()))
    }
}

#[async_trait]
impl RegistryBackend for JsonFileBackend {
    async fn load(&self) -> Result<Option<Registry>, StorageError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(io_error(&self.path, err)),
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Some(Registry::new()));
        }

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| StorageError::Corrupt {
                reason: format!("{}: {}", self.path.display(), e),
            })
    }

    async fn save(&self, registry: &Registry) -> Result<(), StorageError> {
        let body = serde_json::to_vec_pretty(registry).map_err(|e| StorageError::Serialization {
            reason: e.to_string(),
        })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(parent, e))?;
        }

        let tmp = self.temp_path();
        let written = async {
            let mut file = tokio::fs::File::create(&tmp).await?;
            file.write_all(&body).await?;
            file.sync_all().await?;
            tokio::fs::rename(&tmp, &self.path).await
        }
        .await;

        if let Err(err) = written {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(io_error(&self.path, err));
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}

// ============================================================================
// LMDB BACKEND
// ============================================================================

/// Registry stored in LMDB, one key per agent.
///
/// Every snapshot is written in a single write transaction (clear, then put
/// all records), so commits are all-or-nothing.
pub struct LmdbBackend {
    env: Env,
    db: Database<Bytes, Bytes>,
    path: PathBuf,
}

impl fmt::Debug for LmdbBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LmdbBackend")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

fn lmdb_error(reason: impl fmt::Display) -> StorageError {
    StorageError::Backend {
        backend: "lmdb".to_string(),
        reason: reason.to_string(),
    }
}

impl LmdbBackend {
    /// Open (or create) an LMDB environment in directory `path`.
    pub fn open<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, StorageError> {
        let path = path.as_ref();
        std::fs::create_dir_all(path).map_err(|e| io_error(path, e))?;

        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(max_size_mb * 1024 * 1024)
                .max_dbs(1)
                .open(path)
        }
        .map_err(lmdb_error)?;

        let mut wtxn = env.write_txn().map_err(lmdb_error)?;
        let db: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, None)
            .map_err(lmdb_error)?;
        wtxn.commit().map_err(lmdb_error)?;

        Ok(Self {
            env,
            db,
            path: path.to_path_buf(),
        })
    }
}

#[async_trait]
impl RegistryBackend for LmdbBackend {
    async fn load(&self) -> Result<Option<Registry>, StorageError> {
        let rtxn = self.env.read_txn().map_err(lmdb_error)?;
        let mut registry = Registry::new();

        for entry in self.db.iter(&rtxn).map_err(lmdb_error)? {
            let (key, value) = entry.map_err(lmdb_error)?;
            let mut record: AgentRecord =
                serde_json::from_slice(value).map_err(|e| StorageError::Corrupt {
                    reason: format!("lmdb record: {}", e),
                })?;
            if record.agent_id.is_empty() {
                record.agent_id = String::from_utf8_lossy(key).into_owned();
            }
            registry.insert(record);
        }

        Ok(Some(registry))
    }

    async fn save(&self, registry: &Registry) -> Result<(), StorageError> {
        let mut wtxn = self.env.write_txn().map_err(lmdb_error)?;
        self.db.clear(&mut wtxn).map_err(lmdb_error)?;

        for (agent_id, record) in &registry.agents {
            let value = serde_json::to_vec(record).map_err(|e| StorageError::Serialization {
                reason: e.to_string(),
            })?;
            self.db
                .put(&mut wtxn, agent_id.as_bytes(), &value)
                .map_err(lmdb_error)?;
        }

        wtxn.commit().map_err(lmdb_error)
    }

    fn describe(&self) -> String {
        format!("lmdb:{}", self.path.display())
    }
}

// ============================================================================
// MEMORY BACKEND
// ============================================================================

/// Non-durable backend for tests and throwaway deployments.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<Option<Registry>>,
    fail_writes: AtomicBool,
    saves: AtomicU64,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an already-persisted registry.
    pub fn with_registry(registry: Registry) -> Self {
        Self {
            state: Mutex::new(Some(registry)),
            ..Self::default()
        }
    }

    /// Make every subsequent `save` fail until switched off again.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> u64 {
        self.saves.load(Ordering::SeqCst)
    }

    /// Copy of whatever was last persisted.
    pub fn persisted(&self) -> Option<Registry> {
        self.state.lock().ok().and_then(|guard| guard.clone())
    }
}

#[async_trait]
impl RegistryBackend for MemoryBackend {
    async fn load(&self) -> Result<Option<Registry>, StorageError> {
        let guard = self.state.lock().map_err(|_| memory_poisoned())?;
        Ok(guard.clone())
    }

    async fn save(&self, registry: &Registry) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::WriteRejected);
        }
        let mut guard = self.state.lock().map_err(|_| memory_poisoned())?;
        *guard = Some(registry.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

fn memory_poisoned() -> StorageError {
    StorageError::Backend {
        backend: "memory".to_string(),
        reason: "state lock poisoned".to_string(),
    }
}
