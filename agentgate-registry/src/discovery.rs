//! Ranked lookup over a registry snapshot.
//!
//! Retrieval is staged: exact matches on any searchable field, falling back to
//! prefix matches, then to substring matches. Whatever the first non-empty
//! stage returns is scored and ranked. Searchable fields are `agent_id`,
//! `name`, `appid` and each role, compared case-insensitively.

use std::time::Instant;

use agentgate_core::{AgentRecord, Registry};
use serde::Serialize;

/// Hard ceiling on `top`.
pub const MAX_TOP_K: usize = 100;

/// Number of reasons quoted in the justification sentence.
const JUSTIFICATION_REASONS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// No search term; plain listing.
    All,
    Exact,
    Prefix,
    Contains,
}

impl Stage {
    pub fn strategy(&self) -> &'static str {
        match self {
            Stage::All => "list",
            _ => "staged",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DiscoveryQuery {
    pub q: Option<String>,
    pub top: Option<usize>,
}

impl DiscoveryQuery {
    /// Trimmed, non-empty search term.
    pub fn term(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }
}

/// One candidate with its score breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredAgent {
    pub agent: AgentRecord,
    pub score: u32,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryOutcome {
    pub stage: Stage,
    /// Ranked candidates, capped at the effective `top`.
    pub ranked: Vec<ScoredAgent>,
    pub retrieval_ms: f64,
    pub ranking_ms: f64,
}

impl DiscoveryOutcome {
    pub fn best(&self) -> Option<&ScoredAgent> {
        self.ranked.first()
    }

    /// One-sentence explanation of the best match for search queries.
    pub fn justification(&self, term: &str) -> String {
        match self.best() {
            None => format!("No agents matched '{}'.", term),
            Some(best) => {
                let quoted: Vec<&str> = best
                    .reasons
                    .iter()
                    .take(JUSTIFICATION_REASONS)
                    .map(String::as_str)
                    .collect();
                format!(
                    "Based on your search '{}', the best agent fit is '{}' (agent_id={}) with score {}. Reason(s): {}.",
                    term,
                    best.agent.name,
                    best.agent.agent_id,
                    best.score,
                    quoted.join("; ")
                )
            }
        }
    }
}

/// Clamp a requested result count into `1..=MAX_TOP_K`.
pub fn clamp_top(top: usize) -> usize {
    top.clamp(1, MAX_TOP_K)
}

fn elapsed_ms(start: Instant) -> f64 {
    (start.elapsed().as_secs_f64() * 100_000.0).round() / 100.0
}

/// Run a discovery query.
///
/// Without a search term every agent is listed in key order, capped only
/// when `top` is given. With a term, results are capped at `top` or
/// `default_top`.
pub fn discover(registry: &Registry, query: &DiscoveryQuery, default_top: usize) -> DiscoveryOutcome {
    let retrieval_start = Instant::now();

    let Some(term) = query.term() else {
        let limit = query.top.map(clamp_top).unwrap_or(usize::MAX);
        let ranked = registry
            .records()
            .take(limit)
            .map(|agent| ScoredAgent {
                agent: agent.clone(),
                score: 0,
                reasons: Vec::new(),
            })
            .collect();
        return DiscoveryOutcome {
            stage: Stage::All,
            ranked,
            retrieval_ms: elapsed_ms(retrieval_start),
            ranking_ms: 0.0,
        };
    };

    let needle = term.to_lowercase();
    let (stage, candidates) = retrieve(registry, &needle);
    let retrieval_ms = elapsed_ms(retrieval_start);

    let ranking_start = Instant::now();
    let mut ranked: Vec<ScoredAgent> = candidates
        .into_iter()
        .map(|agent| {
            let (score, reasons) = score_agent(agent, &needle);
            ScoredAgent {
                agent: agent.clone(),
                score,
                reasons,
            }
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.agent.agent_id.cmp(&b.agent.agent_id))
    });
    ranked.truncate(clamp_top(query.top.unwrap_or(default_top)));

    DiscoveryOutcome {
        stage,
        ranked,
        retrieval_ms,
        ranking_ms: elapsed_ms(ranking_start),
    }
}

// ============================================================================
// RETRIEVAL
// ============================================================================

fn searchable_fields(agent: &AgentRecord) -> impl Iterator<Item = String> + '_ {
    [Some(agent.agent_id.as_str()), Some(agent.name.as_str()), agent.appid.as_deref()]
        .into_iter()
        .flatten()
        .chain(agent.roles.iter())
        .map(str::to_lowercase)
}

fn is_exact(field: &str, needle: &str) -> bool {
    field == needle
}

fn is_prefix(field: &str, needle: &str) -> bool {
    field.starts_with(needle)
}

fn is_substring(field: &str, needle: &str) -> bool {
    field.contains(needle)
}

fn retrieve<'a>(registry: &'a Registry, needle: &str) -> (Stage, Vec<&'a AgentRecord>) {
    let stages: [(Stage, fn(&str, &str) -> bool); 3] = [
        (Stage::Exact, is_exact),
        (Stage::Prefix, is_prefix),
        (Stage::Contains, is_substring),
    ];

    for (stage, matches) in stages {
        let hits: Vec<&AgentRecord> = registry
            .records()
            .filter(|agent| searchable_fields(agent).any(|field| matches(&field, needle)))
            .collect();
        if !hits.is_empty() {
            return (stage, hits);
        }
    }
    (Stage::Contains, Vec::new())
}

// ============================================================================
// SCORING
// ============================================================================

/// Points for exact, prefix and substring matches on a scalar field.
struct FieldWeights {
    label: &'static str,
    exact: u32,
    prefix: u32,
    contains: u32,
}

const NAME: FieldWeights = FieldWeights { label: "name", exact: 120, prefix: 85, contains: 70 };
const AGENT_ID: FieldWeights = FieldWeights { label: "agent_id", exact: 115, prefix: 80, contains: 65 };
const APPID: FieldWeights = FieldWeights { label: "appid", exact: 95, prefix: 70, contains: 55 };

const ROLE_EXACT: u32 = 80;
const ROLE_PREFIX_EACH: u32 = 25;
const ROLE_PREFIX_CAP: u32 = 60;
const ROLE_CONTAINS_EACH: u32 = 20;
const ROLE_CONTAINS_CAP: u32 = 50;
const ENABLED_BONUS: u32 = 10;

fn score_field(weights: &FieldWeights, raw: &str, needle: &str, reasons: &mut Vec<String>) -> u32 {
    let value = raw.to_lowercase();
    if value.is_empty() {
        0
    } else if value == needle {
        reasons.push(format!("exact {} match ('{}')", weights.label, raw));
        weights.exact
    } else if value.starts_with(needle) {
        reasons.push(format!("{} prefix match", weights.label));
        weights.prefix
    } else if value.contains(needle) {
        reasons.push(format!("{} contains search term", weights.label));
        weights.contains
    } else {
        0
    }
}

/// Score an agent against a lower-cased search term.
pub fn score_agent(agent: &AgentRecord, needle: &str) -> (u32, Vec<String>) {
    let mut reasons = Vec::new();
    let mut score = 0;

    score += score_field(&NAME, &agent.name, needle, &mut reasons);
    score += score_field(&AGENT_ID, &agent.agent_id, needle, &mut reasons);
    if let Some(appid) = &agent.appid {
        score += score_field(&APPID, appid, needle, &mut reasons);
    }

    let roles: Vec<String> = agent.roles.iter().map(str::to_lowercase).collect();
    let exact = roles.iter().find(|r| r.as_str() == needle);
    let prefix: Vec<&String> = roles.iter().filter(|r| r.starts_with(needle)).collect();
    let contains: Vec<&String> = roles.iter().filter(|r| r.contains(needle)).collect();

    if let Some(role) = exact {
        score += ROLE_EXACT;
        reasons.push(format!("exact role match: {}", role));
    } else if let Some(first) = prefix.first() {
        score += (prefix.len() as u32 * ROLE_PREFIX_EACH).min(ROLE_PREFIX_CAP);
        reasons.push(format!("role prefix match: {}", first));
    } else if !contains.is_empty() {
        score += (contains.len() as u32 * ROLE_CONTAINS_EACH).min(ROLE_CONTAINS_CAP);
        let listed: Vec<&str> = contains.iter().take(3).map(|r| r.as_str()).collect();
        reasons.push(format!("matched role(s): {}", listed.join(", ")));
    }

    if agent.enabled {
        score += ENABLED_BONUS;
        reasons.push("agent is enabled".to_string());
    } else {
        reasons.push("agent is disabled".to_string());
    }

    (score, reasons)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> Registry {
        let mut registry = Registry::new();
        for record in [
            AgentRecord::new("billing-bot", "Billing").with_roles(["agent.chat.invoke", "billing.read"]),
            AgentRecord::new("billing-archive", "Archive").with_enabled(false),
            AgentRecord::new("support", "Support Desk").with_roles(["tickets.write"]),
            AgentRecord::new("hr", "People Ops").with_roles(["hr.read", "hr.write"]),
        ] {
            registry.insert(record);
        }
        registry
    }

    fn query(q: &str) -> DiscoveryQuery {
        DiscoveryQuery {
            q: Some(q.to_string()),
            top: None,
        }
    }

    #[test]
    fn test_blank_query_lists_everything() {
        let registry = fixture();
        let outcome = discover(&registry, &DiscoveryQuery::default(), 2);
        assert_eq!(outcome.stage, Stage::All);
        assert_eq!(outcome.ranked.len(), 4);
        assert!(outcome.ranked.iter().any(|s| !s.agent.enabled));

        let capped = discover(
            &registry,
            &DiscoveryQuery { q: Some("  ".into()), top: Some(1) },
            20,
        );
        assert_eq!(capped.ranked.len(), 1);
    }

    #[test]
    fn test_exact_stage_wins() {
        let outcome = discover(&fixture(), &query("SUPPORT"), 20);
        assert_eq!(outcome.stage, Stage::Exact);
        assert_eq!(outcome.ranked.len(), 1);
        let best = outcome.best().unwrap();
        assert_eq!(best.agent.agent_id, "support");
        // name prefix, agent_id exact, appid exact, enabled
        assert_eq!(best.score, 85 + 115 + 95 + 10);
    }

    #[test]
    fn test_prefix_stage_ranks_enabled_first() {
        let outcome = discover(&fixture(), &query("billing"), 20);
        assert_eq!(outcome.stage, Stage::Exact);

        let outcome = discover(&fixture(), &query("bill"), 20);
        assert_eq!(outcome.stage, Stage::Prefix);
        let ids: Vec<_> = outcome.ranked.iter().map(|s| s.agent.agent_id.as_str()).collect();
        assert_eq!(ids, vec!["billing-bot", "billing-archive"]);
    }

    #[test]
    fn test_contains_stage_on_roles() {
        let outcome = discover(&fixture(), &query("write"), 20);
        assert_eq!(outcome.stage, Stage::Contains);
        let best = outcome.best().unwrap();
        assert_eq!(best.agent.agent_id, "hr");
        assert!(best.reasons.iter().any(|r| r.starts_with("matched role(s)")));
    }

    #[test]
    fn test_no_match() {
        let outcome = discover(&fixture(), &query("zzz"), 20);
        assert!(outcome.ranked.is_empty());
        assert_eq!(outcome.justification("zzz"), "No agents matched 'zzz'.");
    }

    #[test]
    fn test_justification_quotes_best_match() {
        let outcome = discover(&fixture(), &query("support"), 20);
        let text = outcome.justification("support");
        assert!(text.starts_with("Based on your search 'support', the best agent fit is 'Support Desk'"));
        assert!(text.contains("(agent_id=support)"));
    }

    #[test]
    fn test_role_prefix_score_is_capped() {
        let agent = AgentRecord::new("x", "x").with_roles(["hr.a", "hr.b", "hr.c", "hr.d"]);
        let (score, _) = score_agent(&agent, "hr.");
        assert_eq!(score, ROLE_PREFIX_CAP + ENABLED_BONUS);
    }

    #[test]
    fn test_top_is_clamped() {
        assert_eq!(clamp_top(0), 1);
        assert_eq!(clamp_top(500), MAX_TOP_K);
        let outcome = discover(
            &fixture(),
            &DiscoveryQuery { q: Some("o".into()), top: Some(0) },
            20,
        );
        assert_eq!(outcome.ranked.len(), 1);
    }
}
