//! Admin Authentication Module
//!
//! Registry mutations require the shared admin key in the `x-admin-key`
//! header. The key is held as a [`SecretString`] and never compared with
//! `==`: both sides are reduced to HMAC-SHA256 tags and checked with
//! [`Mac::verify_slice`], which runs in constant time.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

use crate::config::is_production_environment;
use crate::error::{ApiError, ApiResult};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the admin key.
pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

/// Key used when `AGENTGATE_ADMIN_KEY` is unset. Refused in production.
pub const DEFAULT_ADMIN_KEY: &str = "dev-admin-key";

const TAG_CONTEXT: &[u8] = b"agentgate-admin-key-v1";

fn key_tag(key: &[u8]) -> Option<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key).ok()?;
    mac.update(TAG_CONTEXT);
    Some(mac.finalize().into_bytes().to_vec())
}

// ============================================================================
// ADMIN CREDENTIAL
// ============================================================================

/// The configured admin key plus its precomputed tag.
#[derive(Clone)]
pub struct AdminCredential {
    key: SecretString,
    tag: Vec<u8>,
}

impl AdminCredential {
    pub fn new(key: impl Into<String>) -> ApiResult<Self> {
        let key: String = key.into();
        if key.is_empty() {
            return Err(ApiError::internal_error("Admin key must not be empty"));
        }
        let tag = key_tag(key.as_bytes())
            .ok_or_else(|| ApiError::internal_error("Failed to derive admin key tag"))?;
        Ok(Self {
            key: SecretString::from(key),
            tag,
        })
    }

    /// Constant-time check of a presented key.
    pub fn verify(&self, presented: &str) -> bool {
        if presented.is_empty() {
            return false;
        }
        let Ok(mut mac) = HmacSha256::new_from_slice(presented.as_bytes()) else {
            return false;
        };
        mac.update(TAG_CONTEXT);
        mac.verify_slice(&self.tag).is_ok()
    }

    /// Short hex prefix of the key tag, safe to log when confirming a rotation.
    pub fn fingerprint(&self) -> String {
        hex::encode(&self.tag[..self.tag.len().min(4)])
    }

    pub fn is_insecure_default(&self) -> bool {
        self.key.expose_secret() == DEFAULT_ADMIN_KEY
    }
}

impl std::fmt::Debug for AdminCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminCredential")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

// ============================================================================
// ADMIN CONFIGURATION
// ============================================================================

#[derive(Debug, Clone)]
pub struct AdminConfig {
    pub credential: AdminCredential,
}

impl AdminConfig {
    /// Create AdminConfig from environment variables.
    ///
    /// - `AGENTGATE_ADMIN_KEY`: shared admin key (default: `dev-admin-key`)
    pub fn from_env() -> ApiResult<Self> {
        let key = std::env::var("AGENTGATE_ADMIN_KEY")
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());

        let credential = match key {
            Some(key) => {
                let credential = AdminCredential::new(key)?;
                tracing::info!(fingerprint = %credential.fingerprint(), "Admin key loaded");
                credential
            }
            None => {
                tracing::warn!(
                    "AGENTGATE_ADMIN_KEY not set; using the development default. \
                     Never run like this in production."
                );
                AdminCredential::new(DEFAULT_ADMIN_KEY)?
            }
        };

        Ok(Self { credential })
    }

    /// Refuse the development default key when `AGENTGATE_ENVIRONMENT` is
    /// `production` or `prod`.
    pub fn validate_for_production(&self) -> ApiResult<()> {
        if is_production_environment() && self.credential.is_insecure_default() {
            return Err(ApiError::internal_error(
                "Default admin key is not allowed in production. Set AGENTGATE_ADMIN_KEY.",
            ));
        }
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
