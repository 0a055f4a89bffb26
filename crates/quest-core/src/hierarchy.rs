//! Hierarchy rules for the ticket tree.
//!
//! Epics sit at level 1 and have no parent; stories belong to epics; tasks
//! and tests belong to stories and share level 3; subtasks belong to tasks
//! or tests. Every mutation that touches type or parentage is validated here
//! before any write.

use crate::error::{QuestError, Result};
use crate::types::TicketType;

/// Hierarchy level derived from the ticket type. Total function.
pub fn level_of(ticket_type: TicketType) -> u8 {
    match ticket_type {
        TicketType::Epic => 1,
        TicketType::Story => 2,
        TicketType::Task | TicketType::Test => 3,
        TicketType::Subtask => 4,
    }
}

/// The finite set of acceptable parent types. Empty for epics, which must
/// not have a parent at all.
pub fn valid_parent_types(ticket_type: TicketType) -> &'static [TicketType] {
    match ticket_type {
        TicketType::Epic => &[],
        TicketType::Story => &[TicketType::Epic],
        TicketType::Task | TicketType::Test => &[TicketType::Story],
        TicketType::Subtask => &[TicketType::Task, TicketType::Test],
    }
}

/// True iff a ticket of `ticket_type` may live under a parent of
/// `parent_type` (`None` = root position).
pub fn can_reparent(ticket_type: TicketType, parent_type: Option<TicketType>) -> bool {
    match parent_type {
        None => ticket_type == TicketType::Epic,
        Some(p) => valid_parent_types(ticket_type).contains(&p),
    }
}

/// Check whether a ticket may change to `new_type` given its current parent
/// type and the types of its existing children.
///
/// Checked before mutating; on failure the error names the violated
/// relationship and the caller must reject the retype wholesale.
pub fn can_retype(
    ticket_id: &str,
    new_type: TicketType,
    parent_type: Option<TicketType>,
    children: &[(String, TicketType)],
) -> Result<()> {
    match parent_type {
        Some(p) if !valid_parent_types(new_type).contains(&p) => {
            return Err(QuestError::InvalidHierarchy {
                ticket: ticket_id.to_string(),
                reason: format!("a {new_type} cannot have a {p} parent"),
            });
        }
        None if new_type != TicketType::Epic => {
            return Err(QuestError::InvalidHierarchy {
                ticket: ticket_id.to_string(),
                reason: format!("a {new_type} requires a parent"),
            });
        }
        _ => {}
    }

    for (child_id, child_type) in children {
        if !valid_parent_types(*child_type).contains(&new_type) {
            return Err(QuestError::InvalidHierarchy {
                ticket: ticket_id.to_string(),
                reason: format!("child '{child_id}' is a {child_type}, which cannot live under a {new_type}"),
            });
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels() {
        assert_eq!(level_of(TicketType::Epic), 1);
        assert_eq!(level_of(TicketType::Story), 2);
        assert_eq!(level_of(TicketType::Task), 3);
        assert_eq!(level_of(TicketType::Test), 3);
        assert_eq!(level_of(TicketType::Subtask), 4);
    }

    #[test]
    fn reparent_matrix() {
        assert!(can_reparent(TicketType::Epic, None));
        assert!(!can_reparent(TicketType::Story, None));
        assert!(can_reparent(TicketType::Story, Some(TicketType::Epic)));
        assert!(can_reparent(TicketType::Task, Some(TicketType::Story)));
        assert!(can_reparent(TicketType::Test, Some(TicketType::Story)));
        assert!(can_reparent(TicketType::Subtask, Some(TicketType::Task)));
        assert!(can_reparent(TicketType::Subtask, Some(TicketType::Test)));
        assert!(!can_reparent(TicketType::Epic, Some(TicketType::Epic)));
        assert!(!can_reparent(TicketType::Task, Some(TicketType::Epic)));
        assert!(!can_reparent(TicketType::Subtask, Some(TicketType::Story)));
    }

    #[test]
    fn retype_rejects_bad_parent() {
        // Subtask under a task cannot become an epic: epics take no parent.
        let err = can_retype("t9", TicketType::Epic, Some(TicketType::Task), &[]).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("t9"), "{msg}");
        assert!(msg.contains("task"), "{msg}");
    }

    #[test]
    fn retype_rejects_bad_child() {
        // Story with task children cannot become a task: tasks can't parent tasks.
        let children = vec![("t4".to_string(), TicketType::Task)];
        let err = can_retype("t2", TicketType::Task, Some(TicketType::Story), &children);
        assert!(err.is_err());
        assert!(err.unwrap_err().to_string().contains("t4"));
    }

    #[test]
    fn retype_allows_task_to_test() {
        let children = vec![("t7".to_string(), TicketType::Subtask)];
        can_retype("t5", TicketType::Test, Some(TicketType::Story), &children).unwrap();
    }

    #[test]
    fn retype_rootward_requires_epic() {
        assert!(can_retype("t1", TicketType::Story, None, &[]).is_err());
        can_retype("t1", TicketType::Epic, None, &[]).unwrap();
    }
}
