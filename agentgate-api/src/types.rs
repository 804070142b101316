//! Request and response bodies for the HTTP surface.

use agentgate_core::AgentRecord;
use agentgate_registry::{DiscoveryOutcome, ScoredAgent};
use serde::{Deserialize, Serialize};

// ============================================================================
// CHAT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ChatRequest {
    /// User turn forwarded to the completion backend
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ChatResponse {
    pub agent_id: String,
    /// Roles from the registry, not from the request headers
    pub agent_roles: Vec<String>,
    pub agent_name: String,
    pub answer: String,
}

// ============================================================================
// REGISTRY MUTATIONS
// ============================================================================

const STATUS_OK: &str = "ok";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RegistryMutationResponse {
    /// Always "ok"
    pub status: String,
    pub agent: AgentRecord,
}

impl RegistryMutationResponse {
    pub fn ok(agent: AgentRecord) -> Self {
        Self {
            status: STATUS_OK.to_string(),
            agent,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DeleteResponse {
    pub status: String,
    /// Identifier of the removed agent
    pub deleted: String,
}

impl DeleteResponse {
    pub fn ok(agent_id: impl Into<String>) -> Self {
        Self {
            status: STATUS_OK.to_string(),
            deleted: agent_id.into(),
        }
    }
}

// ============================================================================
// DISCOVERY
// ============================================================================

/// Query string for `GET /api/registry/discover`.
///
/// `top` and `debug` are taken as raw strings so malformed values are
/// ignored rather than rejected.
#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
pub struct DiscoveryParams {
    /// Search term; absent or blank lists every agent
    pub q: Option<String>,
    /// Result cap, clamped to 1..=100
    pub top: Option<String>,
    /// "true", "1" or "yes" includes ranked candidates with scores
    pub debug: Option<String>,
}

impl DiscoveryParams {
    pub fn top(&self) -> Option<usize> {
        self.top
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty() && t.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|t| t.parse().ok())
    }

    pub fn debug(&self) -> bool {
        self.debug
            .as_deref()
            .map(|d| matches!(d.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RankedCandidate {
    pub agent: AgentRecord,
    pub score: u32,
    pub reasons: Vec<String>,
}

impl From<ScoredAgent> for RankedCandidate {
    fn from(scored: ScoredAgent) -> Self {
        Self {
            agent: scored.agent,
            score: scored.score,
            reasons: scored.reasons,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DiscoveryDiagnostics {
    /// "list" without a search term, "staged" otherwise
    pub strategy: String,
    /// all | exact | prefix | contains
    pub stage_used: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DiscoveryTiming {
    pub retrieval_ms: f64,
    pub ranking_ms: f64,
    pub total_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DiscoveryResponse {
    pub count: usize,
    /// Search term as received, or null for a plain listing
    pub q: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_match: Option<AgentRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_match_score: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_match_reasons: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub justification: Option<String>,
    pub agents: Vec<AgentRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidates_ranked: Option<Vec<RankedCandidate>>,
    pub diagnostics: DiscoveryDiagnostics,
    pub timing_ms: DiscoveryTiming,
}

fn stage_name(outcome: &DiscoveryOutcome) -> String {
    serde_json::to_value(outcome.stage)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

fn round_ms(ms: f64) -> f64 {
    (ms * 100.0).round() / 100.0
}

impl DiscoveryResponse {
    /// Shape a discovery outcome for the wire.
    pub fn from_outcome(
        q: Option<String>,
        term: Option<&str>,
        outcome: DiscoveryOutcome,
        debug: bool,
        total_ms: f64,
    ) -> Self {
        let diagnostics = DiscoveryDiagnostics {
            strategy: outcome.stage.strategy().to_string(),
            stage_used: stage_name(&outcome),
        };
        let timing_ms = DiscoveryTiming {
            retrieval_ms: outcome.retrieval_ms,
            ranking_ms: outcome.ranking_ms,
            total_ms: round_ms(total_ms),
        };

        let (message, justification) = match term {
            Some(term) => {
                let justification = outcome.justification(term);
                let message = outcome.best().is_none().then(|| justification.clone());
                (message, Some(justification))
            }
            None => (None, None),
        };

        let best = term.and_then(|_| outcome.best().cloned());
        let agents = outcome.ranked.iter().map(|s| s.agent.clone()).collect::<Vec<_>>();
        let candidates_ranked = debug.then(|| {
            outcome
                .ranked
                .into_iter()
                .map(RankedCandidate::from)
                .collect()
        });

        Self {
            count: agents.len(),
            q,
            message,
            best_match_score: best.as_ref().map(|b| b.score),
            best_match_reasons: best.as_ref().map(|b| b.reasons.clone()),
            best_match: best.map(|b| b.agent),
            justification,
            agents,
            candidates_ranked,
            diagnostics,
            timing_ms,
        }
    }
}
