//! Admin key extractors.
//!
//! [`AdminGuard`] rejects the request with a uniform 401 unless the
//! `x-admin-key` header matches the configured key. The rejection never
//! says whether the header was absent or wrong, and it happens before the
//! handler runs, so a rejected request cannot touch the registry.

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};

use crate::auth::{AdminCredential, ADMIN_KEY_HEADER};
use crate::error::ApiError;

/// Admin authentication state shared with the extractors.
#[derive(Debug, Clone)]
pub struct AdminAuth {
    pub credential: Arc<AdminCredential>,
    /// Also require the key for discovery and single-agent reads.
    pub protect_reads: bool,
}

impl AdminAuth {
    pub fn new(credential: AdminCredential, protect_reads: bool) -> Self {
        Self {
            credential: Arc::new(credential),
            protect_reads,
        }
    }

    fn check(&self, parts: &Parts) -> Result<(), ApiError> {
        let presented = parts
            .headers
            .get(ADMIN_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();

        if self.credential.verify(presented) {
            Ok(())
        } else {
            tracing::warn!(
                path = %parts.uri.path(),
                method = %parts.method,
                "Admin authentication failed"
            );
            record_rejection();
            Err(ApiError::unauthorized())
        }
    }
}

fn record_rejection() {
    if let Ok(m) = crate::telemetry::METRICS.as_ref() {
        m.record_authz_decision("ADMIN_UNAUTHORIZED");
    }
}

/// Proof that the request carried the admin key.
#[derive(Debug, Clone, Copy)]
pub struct AdminGuard;

#[axum::async_trait]
impl<S> FromRequestParts<S> for AdminGuard
where
    S: Send + Sync,
    AdminAuth: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        AdminAuth::from_ref(state).check(parts)?;
        Ok(AdminGuard)
    }
}

/// Admin check for read endpoints; a no-op unless reads are protected.
#[derive(Debug, Clone, Copy)]
pub struct ReadGuard;

#[axum::async_trait]
impl<S> FromRequestParts<S> for ReadGuard
where
    S: Send + Sync,
    AdminAuth: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = AdminAuth::from_ref(state);
        if auth.protect_reads {
            auth.check(parts)?;
        }
        Ok(ReadGuard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with(key: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/agents/AGENT-1");
        if let Some(key) = key {
            builder = builder.header(ADMIN_KEY_HEADER, key);
        }
        let (parts, _) = builder
            .body(())
            .expect("request should build")
            .into_parts();
        parts
    }

    fn auth(protect_reads: bool) -> AdminAuth {
        AdminAuth::new(
            AdminCredential::new("admin-secret").expect("credential"),
            protect_reads,
        )
    }

    #[tokio::test]
    async fn test_admin_guard_accepts_correct_key() {
        let state = auth(false);
        let mut parts = parts_with(Some("admin-secret"));
        assert!(AdminGuard::from_request_parts(&mut parts, &state).await.is_ok());
    }

    #[tokio::test]
    async fn test_admin_guard_rejections_are_uniform() {
        let state = auth(false);

        let mut missing = parts_with(None);
        let mut wrong = parts_with(Some("admin-secreT"));

        let missing = AdminGuard::from_request_parts(&mut missing, &state).await;
        let wrong = AdminGuard::from_request_parts(&mut wrong, &state).await;

        let (Err(missing), Err(wrong)) = (missing, wrong) else {
            panic!("both requests should be rejected");
        };
        assert_eq!(missing, wrong);
        assert_eq!(missing.code, crate::error::ErrorCode::Unauthorized);
    }

    #[tokio::test]
    async fn test_read_guard_respects_protect_reads() {
        let open = auth(false);
        let mut parts = parts_with(None);
        assert!(ReadGuard::from_request_parts(&mut parts, &open).await.is_ok());

        let protected = auth(true);
        let mut parts = parts_with(None);
        assert!(ReadGuard::from_request_parts(&mut parts, &protected).await.is_err());

        let mut parts = parts_with(Some("admin-secret"));
        assert!(ReadGuard::from_request_parts(&mut parts, &protected).await.is_ok());
    }
}
