//! Implementation session — a single-ticket-at-a-time walker over the
//! approved backlog.
//!
//! Eligible tickets are approved or in_progress, carry an external task
//! reference (never-finalized tickets are skipped over), and are visited in
//! (hierarchy_level, sprint_group nulls-last, sort_order) order. Advancement
//! commits the current ticket's terminal status before touching the next
//! ticket; a failure after that point does not roll the commit back.

use crate::error::{QuestError, Result};
use crate::paths;
use crate::quest::Quest;
use crate::store::TicketRepository;
use crate::ticket::{ImplementationOutcome, Ticket, TicketEdit};
use crate::types::{QuestStatus, SessionStatus, TicketStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// AdvanceAction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvanceAction {
    Approve,
    Skip,
    Modify,
}

impl std::str::FromStr for AdvanceAction {
    type Err = QuestError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "approve" => Ok(AdvanceAction::Approve),
            "skip" => Ok(AdvanceAction::Skip),
            "modify" => Ok(AdvanceAction::Modify),
            _ => Err(QuestError::InvalidAction(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// ImplementationResult
// ---------------------------------------------------------------------------

/// Caller-supplied outcome metadata for an approved ticket.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImplementationResult {
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default)]
    pub pr_url: Option<String>,
    #[serde(default)]
    pub commit_sha: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

fn default_success() -> bool {
    true
}

// ---------------------------------------------------------------------------
// ImplementationSession
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImplementationSession {
    pub id: String,
    pub quest: String,
    pub status: SessionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_ticket_id: Option<String>,
    pub auto_advance: bool,
    #[serde(default)]
    pub tickets_implemented: u32,
    #[serde(default)]
    pub tickets_skipped: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl ImplementationSession {
    fn new(quest: impl Into<String>, auto_advance: bool) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            quest: quest.into(),
            status: SessionStatus::Implementing,
            current_ticket_id: None,
            auto_advance,
            tickets_implemented: 0,
            tickets_skipped: 0,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    // ---------------------------------------------------------------------------
    // Persistence (one session per quest)
    // ---------------------------------------------------------------------------

    pub fn load(root: &Path, quest_slug: &str) -> Result<Self> {
        let path = paths::session_path(root, quest_slug);
        if !path.exists() {
            return Err(QuestError::SessionNotFound(quest_slug.to_string()));
        }
        let data = std::fs::read_to_string(&path)?;
        let session: ImplementationSession = serde_yaml::from_str(&data)?;
        Ok(session)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::session_path(root, &self.quest);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    pub fn exists(root: &Path, quest_slug: &str) -> bool {
        paths::session_path(root, quest_slug).exists()
    }
}

// ---------------------------------------------------------------------------
// Session operations
// ---------------------------------------------------------------------------

/// Create a session for the quest and begin its first eligible ticket.
pub fn start(
    repo: &mut dyn TicketRepository,
    quest: &mut Quest,
    auto_advance: bool,
) -> Result<ImplementationSession> {
    let Some(mut first) = next_eligible(repo, None)? else {
        return Err(QuestError::NothingToImplement(quest.slug.clone()));
    };

    first.set_status(TicketStatus::InProgress);
    repo.update(&first)?;

    let mut session = ImplementationSession::new(&quest.slug, auto_advance);
    session.current_ticket_id = Some(first.id.clone());

    quest.current_ticket_id = Some(first.id);
    quest.status = QuestStatus::InProgress;
    quest.touch();
    Ok(session)
}

/// Outcome of a single `advance` call.
#[derive(Debug, Clone, Serialize)]
pub struct AdvanceOutcome {
    pub action: AdvanceAction,
    pub ticket_id: String,
    pub ticket_title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_ticket_id: Option<String>,
    pub session_completed: bool,
}

/// Advance the session by one decision.
///
/// `modify` edits the current ticket in place and does not move on.
/// `approve`/`skip` terminally complete or skip the current ticket, bump the
/// matching counter, and select the next eligible ticket (or complete the
/// session and the owning quest when none remains).
pub fn advance(
    repo: &mut dyn TicketRepository,
    quest: &mut Quest,
    session: &mut ImplementationSession,
    action: AdvanceAction,
    edit: Option<TicketEdit>,
    result: Option<ImplementationResult>,
) -> Result<AdvanceOutcome> {
    if session.status == SessionStatus::Completed {
        return Err(QuestError::NoActiveTicket(session.quest.clone()));
    }
    let current_id = session
        .current_ticket_id
        .clone()
        .ok_or_else(|| QuestError::NoActiveTicket(session.quest.clone()))?;
    let mut current = repo.get(&current_id)?;
    let now = Utc::now();

    if action == AdvanceAction::Modify {
        if let Some(edit) = edit {
            edit.apply(&mut current);
            repo.update(&current)?;
        }
        return Ok(AdvanceOutcome {
            action,
            ticket_id: current.id,
            ticket_title: current.title,
            next_ticket_id: Some(current_id),
            session_completed: false,
        });
    }

    // Commit the current ticket's terminal status first; nothing below rolls
    // this back.
    match action {
        AdvanceAction::Approve => {
            current.status = TicketStatus::Completed;
            let result = result.unwrap_or_default();
            current.implementation = Some(ImplementationOutcome {
                success: result.success,
                pr_url: result.pr_url,
                commit_sha: result.commit_sha,
                error: result.error,
                completed_at: now,
            });
            current.updated_at = now;
            repo.update(&current)?;
            session.tickets_implemented += 1;
        }
        AdvanceAction::Skip => {
            current.status = TicketStatus::Skipped;
            current.updated_at = now;
            repo.update(&current)?;
            session.tickets_skipped += 1;
        }
        AdvanceAction::Modify => unreachable!(),
    }
    session.updated_at = now;

    let next = next_eligible(repo, Some(&current_id))?;
    let outcome = match next {
        Some(mut ticket) => {
            ticket.set_status(TicketStatus::InProgress);
            repo.update(&ticket)?;

            session.current_ticket_id = Some(ticket.id.clone());
            session.status = if session.auto_advance {
                SessionStatus::Implementing
            } else {
                SessionStatus::AwaitingReview
            };

            quest.current_ticket_id = Some(ticket.id.clone());
            quest.completed_tickets = session.tickets_implemented;
            quest.touch();

            AdvanceOutcome {
                action,
                ticket_id: current.id,
                ticket_title: current.title,
                next_ticket_id: Some(ticket.id),
                session_completed: false,
            }
        }
        None => {
            session.status = SessionStatus::Completed;
            session.current_ticket_id = None;
            if session.completed_at.is_none() {
                session.completed_at = Some(now);
            }

            quest.status = QuestStatus::Completed;
            quest.current_ticket_id = None;
            quest.completed_tickets = session.tickets_implemented;
            quest.completed_at = Some(now);
            quest.touch();

            AdvanceOutcome {
                action,
                ticket_id: current.id,
                ticket_title: current.title,
                next_ticket_id: None,
                session_completed: true,
            }
        }
    };
    Ok(outcome)
}

/// The next ticket a session may work on: approved or in_progress, not the
/// just-finished one, and already materialized as tracked work.
fn next_eligible(repo: &dyn TicketRepository, exclude: Option<&str>) -> Result<Option<Ticket>> {
    let mut candidates: Vec<Ticket> = repo
        .list()?
        .into_iter()
        .filter(|t| {
            matches!(t.status, TicketStatus::Approved | TicketStatus::InProgress)
                && Some(t.id.as_str()) != exclude
                && t.external_task_id.is_some()
        })
        .collect();
    candidates.sort_by_key(|t| {
        (
            t.hierarchy_level,
            t.sprint_group.is_none(),
            t.sprint_group.unwrap_or(0),
            t.sort_order,
        )
    });
    Ok(candidates.into_iter().next())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
