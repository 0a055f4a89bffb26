//! Advisory oracle — an optional, untrusted suggestion source for sprint
//! grouping.
//!
//! The oracle is a capability interface with one required method. Its output
//! is never trusted: the planner validates and sanitizes every returned id
//! (see `planner`). Transport or parse failures are ordinary errors that the
//! planner swallows by falling back to the deterministic packer.

use crate::config::OracleConfig;
use crate::error::{QuestError, Result};
use crate::planner::SprintConstraints;
use crate::ticket::Ticket;
use crate::types::{Priority, SprintStrategy, TicketStatus, TicketType};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const MAX_TITLE_CHARS: usize = 80;
const MAX_DESCRIPTION_CHARS: usize = 200;

// ---------------------------------------------------------------------------
// Ticket projection
// ---------------------------------------------------------------------------

/// Compact projection of a ticket sent to the oracle.
#[derive(Debug, Clone, Serialize)]
pub struct TicketSummary {
    pub id: String,
    pub ticket_type: TicketType,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    pub points: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_ticket_id: Option<String>,
    pub status: TicketStatus,
}

impl TicketSummary {
    pub fn from_ticket(ticket: &Ticket) -> Self {
        Self {
            id: ticket.id.clone(),
            ticket_type: ticket.ticket_type,
            title: truncate(&ticket.title, MAX_TITLE_CHARS),
            description: ticket
                .description
                .as_deref()
                .map(|d| truncate(d, MAX_DESCRIPTION_CHARS)),
            priority: ticket.priority,
            points: ticket.points(),
            parent_ticket_id: ticket.parent_ticket_id.clone(),
            status: ticket.status,
        }
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Oracle output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleSprint {
    #[serde(default)]
    pub ticket_ids: Vec<String>,
    #[serde(default)]
    pub theme: Option<String>,
    #[serde(default)]
    pub rationale: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OraclePlan {
    #[serde(default)]
    pub sprints: Vec<OracleSprint>,
}

// ---------------------------------------------------------------------------
// AdvisoryOracle
// ---------------------------------------------------------------------------

pub trait AdvisoryOracle {
    fn suggest_sprint_plan(
        &self,
        tickets: &[TicketSummary],
        strategy: SprintStrategy,
        constraints: &SprintConstraints,
    ) -> Result<OraclePlan>;
}

// ---------------------------------------------------------------------------
// HttpOracle
// ---------------------------------------------------------------------------

/// Blocking HTTP completion client. Expects the endpoint to accept
/// `{model, prompt}` and reply with `{completion: "<text>"}` whose text
/// contains a JSON `OraclePlan` (code fences tolerated).
pub struct HttpOracle {
    endpoint: String,
    model: String,
    api_key: Option<String>,
    client: reqwest::blocking::Client,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: String,
}

#[derive(Deserialize)]
struct CompletionResponse {
    completion: String,
}

impl HttpOracle {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| QuestError::Oracle(e.to_string()))?;
        Ok(Self {
            endpoint: endpoint.into(),
            model: model.into(),
            api_key: None,
            client,
        })
    }

    /// Build from config; returns `None` when the oracle is disabled or has
    /// no endpoint configured.
    pub fn from_config(cfg: &OracleConfig) -> Result<Option<Self>> {
        if !cfg.enabled {
            return Ok(None);
        }
        let Some(endpoint) = cfg.endpoint.as_deref() else {
            return Ok(None);
        };
        let mut oracle = Self::new(endpoint, &cfg.model, Duration::from_secs(cfg.timeout_seconds))?;
        oracle.api_key = std::env::var(&cfg.api_key_env).ok();
        Ok(Some(oracle))
    }

    fn build_prompt(
        tickets: &[TicketSummary],
        strategy: SprintStrategy,
        constraints: &SprintConstraints,
    ) -> Result<String> {
        let tickets_json = serde_json::to_string_pretty(tickets)?;
        Ok(format!(
            "Group the following tickets into ordered sprints using the \
             '{strategy}' strategy. Limits per sprint: {} story points, {} \
             tickets. Respond with JSON only, shaped as \
             {{\"sprints\": [{{\"ticket_ids\": [...], \"theme\": \"...\", \
             \"rationale\": \"...\"}}]}}.\n\nTickets:\n{tickets_json}",
            constraints.max_points_per_sprint, constraints.max_tickets_per_sprint,
        ))
    }
}

impl AdvisoryOracle for HttpOracle {
    fn suggest_sprint_plan(
        &self,
        tickets: &[TicketSummary],
        strategy: SprintStrategy,
        constraints: &SprintConstraints,
    ) -> Result<OraclePlan> {
        let body = CompletionRequest {
            model: &self.model,
            prompt: Self::build_prompt(tickets, strategy, constraints)?,
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .map_err(|e| QuestError::Oracle(e.to_string()))?;
        if !response.status().is_success() {
            return Err(QuestError::Oracle(format!(
                "endpoint returned {}",
                response.status()
            )));
        }
        let completion: CompletionResponse = response
            .json()
            .map_err(|e| QuestError::Oracle(e.to_string()))?;

        parse_plan(&completion.completion)
    }
}

/// Extract an `OraclePlan` from free-form completion text. Tolerates code
/// fences and prose around the JSON object.
pub fn parse_plan(text: &str) -> Result<OraclePlan> {
    let start = text
        .find('{')
        .ok_or_else(|| QuestError::Oracle("no JSON object in oracle output".to_string()))?;
    let end = text
        .rfind('}')
        .ok_or_else(|| QuestError::Oracle("no JSON object in oracle output".to_string()))?;
    if end < start {
        return Err(QuestError::Oracle("malformed oracle output".to_string()));
    }
    serde_json::from_str(&text[start..=end])
        .map_err(|e| QuestError::Oracle(format!("unparseable oracle output: {e}")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
