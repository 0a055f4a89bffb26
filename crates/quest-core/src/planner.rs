//! Sprint planning: an advisory-oracle path with strict output sanitization,
//! and a deterministic greedy bin-packing fallback.

use crate::oracle::{AdvisoryOracle, OraclePlan, TicketSummary};
use crate::store::TicketRepository;
use crate::ticket::Ticket;
use crate::types::{Priority, SprintStrategy, TicketType};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

// ---------------------------------------------------------------------------
// Constraints
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SprintConstraints {
    pub max_points_per_sprint: u32,
    pub max_tickets_per_sprint: usize,
}

impl Default for SprintConstraints {
    fn default() -> Self {
        Self {
            max_points_per_sprint: 20,
            max_tickets_per_sprint: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// Plan output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SprintGroup {
    pub sprint_number: u32,
    pub ticket_ids: Vec<String>,
    pub total_points: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SprintPlan {
    pub sprints: Vec<SprintGroup>,
    /// True when the deterministic packer produced the plan because the
    /// oracle was absent, failed, or returned unusable output.
    pub fallback_used: bool,
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

/// Produce a sprint partition of `tickets`. The oracle, when present, is
/// consulted first; its output is sanitized and never trusted. Any oracle
/// failure falls through to the deterministic fallback.
pub fn plan_sprints(
    tickets: &[Ticket],
    strategy: SprintStrategy,
    constraints: &SprintConstraints,
    oracle: Option<&dyn AdvisoryOracle>,
) -> SprintPlan {
    if tickets.is_empty() {
        return SprintPlan {
            sprints: Vec::new(),
            fallback_used: false,
        };
    }

    if let Some(oracle) = oracle {
        let summaries: Vec<TicketSummary> =
            tickets.iter().map(TicketSummary::from_ticket).collect();
        if let Ok(raw) = oracle.suggest_sprint_plan(&summaries, strategy, constraints) {
            return SprintPlan {
                sprints: sanitize(raw, tickets, constraints),
                fallback_used: false,
            };
        }
    }

    SprintPlan {
        sprints: fallback(tickets, strategy, constraints),
        fallback_used: true,
    }
}

/// Sanitize an oracle partition:
/// - ids not in the input set are discarded;
/// - duplicate assignments resolve first-wins;
/// - unassigned input tickets go to the last sprint while it has spare
///   count capacity, then into one new trailing sprint; point totals are
///   not reconsidered for the remainder.
fn sanitize(
    raw: OraclePlan,
    tickets: &[Ticket],
    constraints: &SprintConstraints,
) -> Vec<SprintGroup> {
    let points: HashMap<&str, u32> = tickets.iter().map(|t| (t.id.as_str(), t.points())).collect();

    let mut seen: HashSet<String> = HashSet::new();
    let mut groups: Vec<SprintGroup> = Vec::new();
    for sprint in raw.sprints {
        let ids: Vec<String> = sprint
            .ticket_ids
            .into_iter()
            .filter(|id| points.contains_key(id.as_str()) && seen.insert(id.clone()))
            .collect();
        if ids.is_empty() {
            continue;
        }
        groups.push(SprintGroup {
            sprint_number: 0,
            ticket_ids: ids,
            total_points: 0,
            theme: sprint.theme,
            rationale: sprint.rationale,
        });
    }

    let mut remainder: Vec<String> = tickets
        .iter()
        .filter(|t| !seen.contains(&t.id))
        .map(|t| t.id.clone())
        .collect();
    if !remainder.is_empty() {
        if let Some(last) = groups.last_mut() {
            while last.ticket_ids.len() < constraints.max_tickets_per_sprint
                && !remainder.is_empty()
            {
                last.ticket_ids.push(remainder.remove(0));
            }
        }
        if !remainder.is_empty() {
            groups.push(SprintGroup {
                sprint_number: 0,
                ticket_ids: remainder,
                total_points: 0,
                theme: None,
                rationale: Some("unassigned remainder".to_string()),
            });
        }
    }

    finish(groups, &points)
}

/// Deterministic greedy packer. priority_first orders by (priority rank,
/// type rank); every other strategy orders by type rank only —
/// dependency_aware has deliberately no distinct fallback behavior.
fn fallback(
    tickets: &[Ticket],
    strategy: SprintStrategy,
    constraints: &SprintConstraints,
) -> Vec<SprintGroup> {
    let points: HashMap<&str, u32> = tickets.iter().map(|t| (t.id.as_str(), t.points())).collect();

    let mut ordered: Vec<&Ticket> = tickets.iter().collect();
    match strategy {
        SprintStrategy::PriorityFirst => {
            ordered.sort_by_key(|t| (priority_rank(t.priority), type_rank(t.ticket_type)));
        }
        _ => ordered.sort_by_key(|t| type_rank(t.ticket_type)),
    }

    let mut groups: Vec<SprintGroup> = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut current_points = 0u32;
    for ticket in ordered {
        let p = ticket.points();
        let would_overflow = !current.is_empty()
            && (current.len() + 1 > constraints.max_tickets_per_sprint
                || current_points + p > constraints.max_points_per_sprint);
        if would_overflow {
            groups.push(SprintGroup {
                sprint_number: 0,
                ticket_ids: std::mem::take(&mut current),
                total_points: 0,
                theme: None,
                rationale: None,
            });
            current_points = 0;
        }
        current.push(ticket.id.clone());
        current_points += p;
    }
    if !current.is_empty() {
        groups.push(SprintGroup {
            sprint_number: 0,
            ticket_ids: current,
            total_points: 0,
            theme: None,
            rationale: None,
        });
    }

    finish(groups, &points)
}

fn finish(mut groups: Vec<SprintGroup>, points: &HashMap<&str, u32>) -> Vec<SprintGroup> {
    for (i, group) in groups.iter_mut().enumerate() {
        group.sprint_number = (i + 1) as u32;
        group.total_points = group
            .ticket_ids
            .iter()
            .map(|id| points.get(id.as_str()).copied().unwrap_or(0))
            .sum();
    }
    groups
}

fn type_rank(ticket_type: TicketType) -> u8 {
    match ticket_type {
        TicketType::Epic => 0,
        TicketType::Story => 1,
        TicketType::Task | TicketType::Test => 2,
        TicketType::Subtask => 3,
    }
}

fn priority_rank(priority: Option<Priority>) -> u8 {
    priority.unwrap_or(Priority::Medium).rank()
}

// ---------------------------------------------------------------------------
// Persisting sprint groups
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize)]
pub struct PlanApplyReport {
    pub updated: usize,
    pub errors: Vec<String>,
}

/// Stamp `sprint_group` onto every planned ticket. Writes are independent:
/// a failed ticket is reported and the rest proceed.
pub fn apply_plan(repo: &mut dyn TicketRepository, plan: &SprintPlan) -> PlanApplyReport {
    let mut report = PlanApplyReport::default();
    for group in &plan.sprints {
        for id in &group.ticket_ids {
            let result = repo.get(id).and_then(|mut ticket| {
                ticket.sprint_group = Some(group.sprint_number);
                ticket.updated_at = chrono::Utc::now();
                repo.update(&ticket)
            });
            match result {
                Ok(()) => report.updated += 1,
                Err(e) => report.errors.push(format!("{id}: {e}")),
            }
        }
    }
    report
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
