//! Ticket forest assembly and sibling ordering.
//!
//! Sort orders within a sibling group are kept dense (exactly 0..n-1) by
//! `reorder`; `next_sort_order` is the sole mechanism for ordering on
//! creation. Neither is safe against concurrent writers — callers serialize
//! mutations per quest.

use crate::error::{QuestError, Result};
use crate::hierarchy;
use crate::store::TicketRepository;
use crate::ticket::Ticket;
use crate::types::TicketType;
use serde::Serialize;
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Forest
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct TicketNode {
    pub ticket: Ticket,
    pub children: Vec<TicketNode>,
}

/// Assemble a flat ticket list into a forest. Roots are tickets with no
/// parent or a parent not present in the set; every sibling group is sorted
/// by sort_order ascending.
pub fn build_forest(tickets: Vec<Ticket>) -> Vec<TicketNode> {
    let known: std::collections::HashSet<String> =
        tickets.iter().map(|t| t.id.clone()).collect();

    let mut by_parent: HashMap<Option<String>, Vec<Ticket>> = HashMap::new();
    for ticket in tickets {
        let key = match &ticket.parent_ticket_id {
            Some(pid) if known.contains(pid) => Some(pid.clone()),
            _ => None,
        };
        by_parent.entry(key).or_default().push(ticket);
    }
    for group in by_parent.values_mut() {
        group.sort_by_key(|t| t.sort_order);
    }

    let roots = by_parent.remove(&None).unwrap_or_default();
    roots
        .into_iter()
        .map(|t| attach(t, &mut by_parent))
        .collect()
}

fn attach(ticket: Ticket, by_parent: &mut HashMap<Option<String>, Vec<Ticket>>) -> TicketNode {
    let children = by_parent
        .remove(&Some(ticket.id.clone()))
        .unwrap_or_default()
        .into_iter()
        .map(|c| attach(c, by_parent))
        .collect();
    TicketNode { ticket, children }
}

// ---------------------------------------------------------------------------
// Sort order
// ---------------------------------------------------------------------------

/// Next sort order among siblings of `parent_id`: max+1, or 0 if the group
/// is empty.
pub fn next_sort_order(repo: &dyn TicketRepository, parent_id: Option<&str>) -> Result<u32> {
    let siblings = repo.children_of(parent_id)?;
    Ok(siblings
        .iter()
        .map(|t| t.sort_order + 1)
        .max()
        .unwrap_or(0))
}

/// Move a ticket to a new parent and position.
///
/// Validates the new parent relationship first; on rejection nothing is
/// written. The destination sibling group is renumbered densely: existing
/// siblings keep their relative order, the requested slot is left open, and
/// the moved ticket lands exactly there (clamped to the group size so the
/// resulting orders are always a contiguous 0..n-1 range). When the move
/// changes parents, the source group is renumbered densely too, so every
/// sibling group stays at exactly 0..n-1.
pub fn reorder(
    repo: &mut dyn TicketRepository,
    ticket_id: &str,
    new_parent_id: Option<&str>,
    new_sort_order: u32,
) -> Result<()> {
    let mut ticket = repo.get(ticket_id)?;

    let parent_type = match new_parent_id {
        Some(pid) => Some(repo.get(pid)?.ticket_type),
        None => None,
    };
    if !hierarchy::can_reparent(ticket.ticket_type, parent_type) {
        let reason = match parent_type {
            Some(p) => format!("a {} cannot have a {p} parent", ticket.ticket_type),
            None => format!(
                "only epics may live at the root, not a {}",
                ticket.ticket_type
            ),
        };
        return Err(QuestError::InvalidHierarchy {
            ticket: ticket_id.to_string(),
            reason,
        });
    }
    // Disallow making a ticket its own parent.
    if new_parent_id == Some(ticket_id) {
        return Err(QuestError::InvalidHierarchy {
            ticket: ticket_id.to_string(),
            reason: "a ticket cannot be its own parent".to_string(),
        });
    }

    let mut siblings: Vec<Ticket> = repo
        .children_of(new_parent_id)?
        .into_iter()
        .filter(|t| t.id != ticket_id)
        .collect();
    let target = (new_sort_order as usize).min(siblings.len()) as u32;

    let mut next = 0u32;
    for sibling in siblings.iter_mut() {
        if next == target {
            next += 1;
        }
        if sibling.sort_order != next {
            sibling.sort_order = next;
            repo.update(sibling)?;
        }
        next += 1;
    }

    let old_parent_id = ticket.parent_ticket_id.clone();
    ticket.parent_ticket_id = new_parent_id.map(String::from);
    ticket.sort_order = target;
    ticket.updated_at = chrono::Utc::now();
    repo.update(&ticket)?;

    if old_parent_id.as_deref() != new_parent_id {
        compact(repo, old_parent_id.as_deref())?;
    }
    Ok(())
}

/// Renumber a sibling group densely from 0, preserving relative order.
fn compact(repo: &mut dyn TicketRepository, parent_id: Option<&str>) -> Result<()> {
    for (i, mut sibling) in repo.children_of(parent_id)?.into_iter().enumerate() {
        if sibling.sort_order != i as u32 {
            sibling.sort_order = i as u32;
            repo.update(&sibling)?;
        }
    }
    Ok(())
}

/// The types of a ticket's direct children, used for retype validation.
pub fn child_types(
    repo: &dyn TicketRepository,
    ticket_id: &str,
) -> Result<Vec<(String, TicketType)>> {
    Ok(repo
        .children_of(Some(ticket_id))?
        .into_iter()
        .map(|c| (c.id, c.ticket_type))
        .collect())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryTicketStore;

    fn seed(store: &mut MemoryTicketStore, id: &str, t: TicketType, parent: Option<&str>, sort: u32) {
        store
            .create(Ticket::new(
                id,
                "q",
                format!("Ticket {id}"),
                t,
                parent.map(String::from),
                sort,
            ))
            .unwrap();
    }

    fn orders(store: &MemoryTicketStore, parent: Option<&str>) -> Vec<(String, u32)> {
        store
            .children_of(parent)
            .unwrap()
            .into_iter()
            .map(|t| (t.id, t.sort_order))
            .collect()
    }

    #[test]
    fn forest_groups_and_sorts() {
        let mut store = MemoryTicketStore::new();
        seed(&mut store, "e1", TicketType::Epic, None, 0);
        seed(&mut store, "s2", TicketType::Story, Some("e1"), 1);
        seed(&mut store, "s1", TicketType::Story, Some("e1"), 0);
        seed(&mut store, "e2", TicketType::Epic, None, 1);

        let forest = build_forest(store.list().unwrap());
        assert_eq!(forest.len(), 2);
        assert_eq!(forest[0].ticket.id, "e1");
        let child_ids: Vec<&str> = forest[0]
            .children
            .iter()
            .map(|n| n.ticket.id.as_str())
            .collect();
        assert_eq!(child_ids, vec!["s1", "s2"]);
    }

    #[test]
    fn missing_parent_promotes_to_root() {
        let mut store = MemoryTicketStore::new();
        seed(&mut store, "s1", TicketType::Story, Some("ghost"), 0);
        let forest = build_forest(store.list().unwrap());
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].ticket.id, "s1");
    }

    #[test]
    fn next_sort_order_starts_at_zero() {
        let store = MemoryTicketStore::new();
        assert_eq!(next_sort_order(&store, None).unwrap(), 0);
    }

    #[test]
    fn next_sort_order_is_max_plus_one() {
        let mut store = MemoryTicketStore::new();
        seed(&mut store, "e1", TicketType::Epic, None, 0);
        seed(&mut store, "e2", TicketType::Epic, None, 1);
        assert_eq!(next_sort_order(&store, None).unwrap(), 2);
    }

    #[test]
    fn reorder_within_parent() {
        // e1 with s1@0, s2@1; moving s2 to slot 0 gives s2@0, s1@1.
        let mut store = MemoryTicketStore::new();
        seed(&mut store, "e1", TicketType::Epic, None, 0);
        seed(&mut store, "s1", TicketType::Story, Some("e1"), 0);
        seed(&mut store, "s2", TicketType::Story, Some("e1"), 1);

        reorder(&mut store, "s2", Some("e1"), 0).unwrap();
        assert_eq!(
            orders(&store, Some("e1")),
            vec![("s2".to_string(), 0), ("s1".to_string(), 1)]
        );
    }

    #[test]
    fn reorder_across_parents_keeps_both_groups_dense() {
        let mut store = MemoryTicketStore::new();
        seed(&mut store, "e1", TicketType::Epic, None, 0);
        seed(&mut store, "e2", TicketType::Epic, None, 1);
        seed(&mut store, "s1", TicketType::Story, Some("e1"), 0);
        seed(&mut store, "s2", TicketType::Story, Some("e1"), 1);
        seed(&mut store, "s3", TicketType::Story, Some("e1"), 2);
        seed(&mut store, "s4", TicketType::Story, Some("e2"), 0);

        reorder(&mut store, "s1", Some("e2"), 1).unwrap();
        assert_eq!(
            orders(&store, Some("e2")),
            vec![("s4".to_string(), 0), ("s1".to_string(), 1)]
        );
        // The vacated group closes the gap: remaining siblings renumber
        // from 0 in their old relative order.
        assert_eq!(
            orders(&store, Some("e1")),
            vec![("s2".to_string(), 0), ("s3".to_string(), 1)]
        );
    }

    #[test]
    fn reorder_clamps_out_of_range_slot() {
        let mut store = MemoryTicketStore::new();
        seed(&mut store, "e1", TicketType::Epic, None, 0);
        seed(&mut store, "s1", TicketType::Story, Some("e1"), 0);
        seed(&mut store, "s2", TicketType::Story, Some("e1"), 1);

        reorder(&mut store, "s1", Some("e1"), 99).unwrap();
        assert_eq!(
            orders(&store, Some("e1")),
            vec![("s2".to_string(), 0), ("s1".to_string(), 1)]
        );
    }

    #[test]
    fn reorder_rejects_invalid_parent_without_writes() {
        let mut store = MemoryTicketStore::new();
        seed(&mut store, "e1", TicketType::Epic, None, 0);
        seed(&mut store, "s1", TicketType::Story, Some("e1"), 0);

        // A story cannot move to the root.
        assert!(reorder(&mut store, "s1", None, 0).is_err());
        let t = store.get("s1").unwrap();
        assert_eq!(t.parent_ticket_id.as_deref(), Some("e1"));
        assert_eq!(t.sort_order, 0);
    }
}
