//! Approval workflow: pending tickets become approved, optionally cascading
//! to every pending descendant.

use crate::error::{QuestError, Result};
use crate::store::TicketRepository;
use crate::types::TicketStatus;
use chrono::Utc;
use serde::Serialize;
use std::collections::{HashSet, VecDeque};

#[derive(Debug, Clone, Default, Serialize)]
pub struct ApprovalSummary {
    /// Ids transitioned to approved by this call, root first.
    pub approved: Vec<String>,
    /// Descendants left untouched because they were not pending.
    pub untouched: Vec<String>,
}

/// Approve a ticket. Re-approving an already approved or completed ticket is
/// a conflict, not a no-op. With `cascade`, every pending descendant is
/// transitioned with the same approver and timestamp; descendants in any
/// other state are reported but not treated as errors.
pub fn approve(
    repo: &mut dyn TicketRepository,
    ticket_id: &str,
    approved_by: Option<&str>,
    cascade: bool,
) -> Result<ApprovalSummary> {
    let mut ticket = repo.get(ticket_id)?;
    if matches!(
        ticket.status,
        TicketStatus::Approved | TicketStatus::Completed
    ) {
        return Err(QuestError::ApprovalConflict {
            ticket: ticket_id.to_string(),
            status: ticket.status.to_string(),
        });
    }

    let now = Utc::now();
    let by = approved_by.map(String::from);

    ticket.status = TicketStatus::Approved;
    ticket.approved_by = by.clone();
    ticket.approved_at = Some(now);
    ticket.updated_at = now;
    repo.update(&ticket)?;

    let mut summary = ApprovalSummary {
        approved: vec![ticket_id.to_string()],
        untouched: Vec::new(),
    };
    if !cascade {
        return Ok(summary);
    }

    // Iterative traversal with a visited guard; parent links are acyclic by
    // construction but deep trees must not recurse.
    let mut visited: HashSet<String> = HashSet::new();
    visited.insert(ticket_id.to_string());
    let mut queue: VecDeque<String> = VecDeque::new();
    queue.push_back(ticket_id.to_string());

    while let Some(parent_id) = queue.pop_front() {
        for mut child in repo.children_of(Some(&parent_id))? {
            if !visited.insert(child.id.clone()) {
                continue;
            }
            queue.push_back(child.id.clone());

            if child.status == TicketStatus::Pending {
                child.status = TicketStatus::Approved;
                child.approved_by = by.clone();
                child.approved_at = Some(now);
                child.updated_at = now;
                repo.update(&child)?;
                summary.approved.push(child.id);
            } else {
                summary.untouched.push(child.id);
            }
        }
    }

    Ok(summary)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryTicketStore;
    use crate::ticket::Ticket;
    use crate::types::TicketType;

    fn seed(
        store: &mut MemoryTicketStore,
        id: &str,
        t: TicketType,
        parent: Option<&str>,
        status: TicketStatus,
    ) {
        let mut ticket = Ticket::new(id, "q", format!("Ticket {id}"), t, parent.map(String::from), 0);
        ticket.status = status;
        store.create(ticket).unwrap();
    }

    #[test]
    fn approve_stamps_identity_and_time() {
        let mut store = MemoryTicketStore::new();
        seed(&mut store, "e1", TicketType::Epic, None, TicketStatus::Pending);

        approve(&mut store, "e1", Some("petra"), false).unwrap();
        let t = store.get("e1").unwrap();
        assert_eq!(t.status, TicketStatus::Approved);
        assert_eq!(t.approved_by.as_deref(), Some("petra"));
        assert!(t.approved_at.is_some());
    }

    #[test]
    fn approve_already_approved_is_conflict() {
        let mut store = MemoryTicketStore::new();
        seed(&mut store, "e1", TicketType::Epic, None, TicketStatus::Approved);
        assert!(matches!(
            approve(&mut store, "e1", None, false),
            Err(QuestError::ApprovalConflict { .. })
        ));
    }

    #[test]
    fn approve_completed_is_conflict_and_unchanged() {
        let mut store = MemoryTicketStore::new();
        seed(&mut store, "e1", TicketType::Epic, None, TicketStatus::Completed);
        assert!(approve(&mut store, "e1", None, true).is_err());
        assert_eq!(store.get("e1").unwrap().status, TicketStatus::Completed);
    }

    #[test]
    fn cascade_approves_only_pending_descendants() {
        let mut store = MemoryTicketStore::new();
        seed(&mut store, "e1", TicketType::Epic, None, TicketStatus::Pending);
        seed(&mut store, "s1", TicketType::Story, Some("e1"), TicketStatus::Pending);
        seed(&mut store, "s2", TicketType::Story, Some("e1"), TicketStatus::Skipped);
        seed(&mut store, "k1", TicketType::Task, Some("s1"), TicketStatus::Pending);
        seed(&mut store, "k2", TicketType::Task, Some("s2"), TicketStatus::Pending);

        let summary = approve(&mut store, "e1", Some("petra"), true).unwrap();
        let mut approved = summary.approved.clone();
        approved.sort();
        assert_eq!(approved, vec!["e1", "k1", "k2", "s1"]);
        assert_eq!(summary.untouched, vec!["s2"]);

        assert_eq!(store.get("s2").unwrap().status, TicketStatus::Skipped);
        assert_eq!(store.get("k2").unwrap().status, TicketStatus::Approved);
        assert_eq!(store.get("k1").unwrap().approved_by.as_deref(), Some("petra"));
    }

    #[test]
    fn no_cascade_leaves_children_pending() {
        let mut store = MemoryTicketStore::new();
        seed(&mut store, "e1", TicketType::Epic, None, TicketStatus::Pending);
        seed(&mut store, "s1", TicketType::Story, Some("e1"), TicketStatus::Pending);

        approve(&mut store, "e1", None, false).unwrap();
        assert_eq!(store.get("s1").unwrap().status, TicketStatus::Pending);
    }
}
