//! API Configuration Module
//!
//! Server, registry backend and completion backend settings. Everything is
//! loaded from environment variables with defaults suited to local
//! development; `validate_for_production` rejects the unsafe ones.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use agentgate_llm::{AzureOpenAIConfig, AzureOpenAIProvider, CompletionProvider, UnconfiguredProvider};
use agentgate_registry::{JsonFileBackend, LmdbBackend, MemoryBackend, RegistryBackend};

use crate::error::{ApiError, ApiResult};

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_flag(key: &str, default: bool) -> bool {
    env_string(key)
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(default)
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env_string(key).and_then(|s| s.parse().ok()).unwrap_or(default)
}

/// Check if running in a production environment.
pub fn is_production_environment() -> bool {
    env_string("AGENTGATE_ENVIRONMENT")
        .map(|e| matches!(e.to_lowercase().as_str(), "production" | "prod"))
        .unwrap_or(false)
}

// ============================================================================
// API CONFIGURATION
// ============================================================================

/// HTTP surface configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    // ========================================================================
    // CORS Configuration
    // ========================================================================
    /// Allowed CORS origins (comma-separated in env var).
    /// Empty means allow all origins (dev mode).
    pub cors_origins: Vec<String>,

    /// Whether to allow credentials in CORS requests.
    pub cors_allow_credentials: bool,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,

    // ========================================================================
    // Registry Surface
    // ========================================================================
    /// Require the admin credential for discovery and single-agent reads.
    pub protect_reads: bool,

    /// Default result cap for discovery searches.
    pub discovery_top_k: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            cors_origins: Vec::new(),
            cors_allow_credentials: false,
            cors_max_age_secs: 86400,
            protect_reads: false,
            discovery_top_k: 20,
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// - `AGENTGATE_CORS_ORIGINS`: comma-separated allowed origins (empty = allow all)
    /// - `AGENTGATE_CORS_ALLOW_CREDENTIALS`: "true" or "false" (default: false)
    /// - `AGENTGATE_CORS_MAX_AGE_SECS`: preflight cache duration (default: 86400)
    /// - `AGENTGATE_PROTECT_READS`: gate discovery behind the admin key (default: false)
    /// - `AGENTGATE_DISCOVERY_TOP_K`: default discovery cap (default: 20)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let cors_origins = env_string("AGENTGATE_CORS_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            cors_origins,
            cors_allow_credentials: env_flag("AGENTGATE_CORS_ALLOW_CREDENTIALS", false),
            cors_max_age_secs: env_parse("AGENTGATE_CORS_MAX_AGE_SECS", defaults.cors_max_age_secs),
            protect_reads: env_flag("AGENTGATE_PROTECT_READS", false),
            discovery_top_k: agentgate_registry::discovery::clamp_top(env_parse(
                "AGENTGATE_DISCOVERY_TOP_K",
                defaults.discovery_top_k,
            )),
        }
    }

    pub fn validate_for_production(&self) -> ApiResult<()> {
        if self.cors_origins.is_empty() {
            return Err(ApiError::internal_error(
                "CORS origins not configured for production. Set AGENTGATE_CORS_ORIGINS.",
            ));
        }
        if !self.protect_reads {
            tracing::warn!(
                "Registry discovery is public. Set AGENTGATE_PROTECT_READS=true to require the admin key."
            );
        }
        Ok(())
    }
}

// ============================================================================
// REGISTRY BACKEND CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryBackendKind {
    File,
    Lmdb,
    Memory,
}

impl std::str::FromStr for RegistryBackendKind {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "file" | "json" => Ok(Self::File),
            "lmdb" => Ok(Self::Lmdb),
            "memory" => Ok(Self::Memory),
            other => Err(ApiError::internal_error(format!(
                "Unknown registry backend '{}'; expected file, lmdb or memory",
                other
            ))),
        }
    }
}

/// Where and how the registry is persisted.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub backend: RegistryBackendKind,
    pub path: PathBuf,
    pub lmdb_path: PathBuf,
    pub lmdb_max_size_mb: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            backend: RegistryBackendKind::File,
            path: PathBuf::from("agent_registry.json"),
            lmdb_path: PathBuf::from("agent_registry.lmdb"),
            lmdb_max_size_mb: 64,
        }
    }
}

impl RegistryConfig {
    /// - `AGENTGATE_REGISTRY_BACKEND`: file | lmdb | memory (default: file)
    /// - `AGENTGATE_REGISTRY_PATH`: JSON document path (default: agent_registry.json)
    /// - `AGENTGATE_LMDB_PATH`: LMDB directory (default: agent_registry.lmdb)
    /// - `AGENTGATE_LMDB_MAX_SIZE_MB`: LMDB map size (default: 64)
    pub fn from_env() -> ApiResult<Self> {
        let defaults = Self::default();
        let backend = match env_string("AGENTGATE_REGISTRY_BACKEND") {
            Some(raw) => raw.parse()?,
            None => defaults.backend,
        };

        Ok(Self {
            backend,
            path: env_string("AGENTGATE_REGISTRY_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.path),
            lmdb_path: env_string("AGENTGATE_LMDB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.lmdb_path),
            lmdb_max_size_mb: env_parse("AGENTGATE_LMDB_MAX_SIZE_MB", defaults.lmdb_max_size_mb),
        })
    }

    pub fn build_backend(&self) -> ApiResult<Arc<dyn RegistryBackend>> {
        Ok(match self.backend {
            RegistryBackendKind::File => Arc::new(JsonFileBackend::new(&self.path)),
            RegistryBackendKind::Lmdb => {
                Arc::new(LmdbBackend::open(&self.lmdb_path, self.lmdb_max_size_mb)?)
            }
            RegistryBackendKind::Memory => {
                tracing::warn!("Using in-memory agent registry; changes are lost on restart");
                Arc::new(MemoryBackend::new())
            }
        })
    }
}

// ============================================================================
// COMPLETION BACKEND CONFIGURATION
// ============================================================================

/// Azure OpenAI connection settings. Missing settings leave chat unavailable
/// rather than preventing start-up.
#[derive(Debug, Clone, Default)]
pub struct CompletionConfig {
    pub azure: Option<AzureOpenAIConfig>,
}

impl CompletionConfig {
    /// - `AZURE_OPENAI_ENDPOINT`, `AZURE_OPENAI_API_KEY`, `AZURE_OPENAI_DEPLOYMENT`
    /// - `AZURE_OPENAI_API_VERSION` (default: 2024-10-21)
    /// - `AGENTGATE_COMPLETION_TIMEOUT_SECS` (default: none)
    pub fn from_env() -> Self {
        let endpoint = env_string("AZURE_OPENAI_ENDPOINT");
        let api_key = env_string("AZURE_OPENAI_API_KEY");
        let deployment = env_string("AZURE_OPENAI_DEPLOYMENT");

        let azure = match (endpoint, api_key, deployment) {
            (Some(endpoint), Some(api_key), Some(deployment)) => {
                let mut config = AzureOpenAIConfig::new(endpoint, api_key, deployment);
                if let Some(version) = env_string("AZURE_OPENAI_API_VERSION") {
                    config.api_version = version;
                }
                config.timeout = env_string("AGENTGATE_COMPLETION_TIMEOUT_SECS")
                    .and_then(|s| s.parse::<u64>().ok())
                    .map(Duration::from_secs);
                Some(config)
            }
            _ => None,
        };

        Self { azure }
    }

    pub fn build_provider(&self) -> ApiResult<Arc<dyn CompletionProvider>> {
        match &self.azure {
            Some(config) => Ok(Arc::new(AzureOpenAIProvider::new(config.clone())?)),
            None => {
                tracing::warn!(
                    "Azure OpenAI is not configured; chat requests will fail with UPSTREAM_ERROR"
                );
                Ok(Arc::new(UnconfiguredProvider))
            }
        }
    }
}
