use crate::error::{QuestError, Result};
use crate::hierarchy;
use crate::quest::Quest;
use crate::store::TicketRepository;
use crate::tree;
use crate::types::{Priority, TicketStatus, TicketType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ImplementationOutcome
// ---------------------------------------------------------------------------

/// Result metadata stamped onto a ticket when a session finishes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImplementationOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pr_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_sha: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub completed_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Ticket
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: String,
    pub quest: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub ticket_type: TicketType,
    /// Always `hierarchy::level_of(ticket_type)`; recomputed on retype.
    pub hierarchy_level: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_ticket_id: Option<String>,
    pub sort_order: u32,
    pub status: TicketStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub story_points: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sprint_group: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub acceptance_criteria: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub linked_repo_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub linked_doc_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub linked_feature_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implementation: Option<ImplementationOutcome>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    pub fn new(
        id: impl Into<String>,
        quest: impl Into<String>,
        title: impl Into<String>,
        ticket_type: TicketType,
        parent_ticket_id: Option<String>,
        sort_order: u32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            quest: quest.into(),
            title: title.into(),
            description: None,
            ticket_type,
            hierarchy_level: hierarchy::level_of(ticket_type),
            parent_ticket_id,
            sort_order,
            status: TicketStatus::Pending,
            priority: None,
            story_points: None,
            sprint_group: None,
            acceptance_criteria: Vec::new(),
            linked_repo_ids: Vec::new(),
            linked_doc_ids: Vec::new(),
            linked_feature_ids: Vec::new(),
            external_task_id: None,
            approved_by: None,
            approved_at: None,
            implementation: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Effective story points: explicit value or the per-type default.
    pub fn points(&self) -> u32 {
        self.story_points
            .unwrap_or_else(|| self.ticket_type.default_points())
    }

    pub fn set_type(&mut self, ticket_type: TicketType) {
        self.ticket_type = ticket_type;
        self.hierarchy_level = hierarchy::level_of(ticket_type);
        self.updated_at = Utc::now();
    }

    pub fn set_status(&mut self, status: TicketStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}

// ---------------------------------------------------------------------------
// TicketEdit
// ---------------------------------------------------------------------------

/// Field overwrites applied by the session's `modify` action.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TicketEdit {
    pub title: Option<String>,
    pub description: Option<String>,
    pub acceptance_criteria: Option<Vec<String>>,
}

impl TicketEdit {
    pub fn apply(&self, ticket: &mut Ticket) {
        if let Some(title) = &self.title {
            ticket.title = title.clone();
        }
        if let Some(description) = &self.description {
            ticket.description = Some(description.clone());
        }
        if let Some(criteria) = &self.acceptance_criteria {
            ticket.acceptance_criteria = criteria.clone();
        }
        ticket.updated_at = Utc::now();
    }
}

// ---------------------------------------------------------------------------
// Ticket operations (operate on a TicketRepository)
// ---------------------------------------------------------------------------

pub struct NewTicket {
    pub title: String,
    pub ticket_type: TicketType,
    pub parent_ticket_id: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub story_points: Option<u32>,
    pub acceptance_criteria: Vec<String>,
}

/// Create a ticket under its parent, validating the hierarchy and assigning
/// the next sort order in the destination sibling group.
pub fn create_ticket(
    repo: &mut dyn TicketRepository,
    quest: &mut Quest,
    params: NewTicket,
) -> Result<Ticket> {
    let parent_type = match &params.parent_ticket_id {
        Some(pid) => Some(repo.get(pid)?.ticket_type),
        None => None,
    };
    if !hierarchy::can_reparent(params.ticket_type, parent_type) {
        let reason = match parent_type {
            Some(p) => format!("a {} cannot have a {p} parent", params.ticket_type),
            None => format!("a {} requires a parent", params.ticket_type),
        };
        return Err(QuestError::InvalidHierarchy {
            ticket: params.title,
            reason,
        });
    }

    let sort_order = tree::next_sort_order(repo, params.parent_ticket_id.as_deref())?;
    let id = quest.allocate_ticket_id();
    let mut ticket = Ticket::new(
        id,
        &quest.slug,
        params.title,
        params.ticket_type,
        params.parent_ticket_id,
        sort_order,
    );
    ticket.description = params.description;
    ticket.priority = params.priority;
    ticket.story_points = params.story_points;
    ticket.acceptance_criteria = params.acceptance_criteria;

    repo.create(ticket.clone())?;
    quest.total_tickets += 1;
    Ok(ticket)
}

/// Change a ticket's type, re-validating against its current parent and all
/// existing children before any write. Rejection leaves state unchanged.
pub fn retype_ticket(
    repo: &mut dyn TicketRepository,
    ticket_id: &str,
    new_type: TicketType,
) -> Result<Ticket> {
    let mut ticket = repo.get(ticket_id)?;

    let parent_type = match &ticket.parent_ticket_id {
        Some(pid) => Some(repo.get(pid)?.ticket_type),
        None => None,
    };
    let children = tree::child_types(repo, ticket_id)?;

    hierarchy::can_retype(ticket_id, new_type, parent_type, &children)?;

    ticket.set_type(new_type);
    repo.update(&ticket)?;
    Ok(ticket)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryTicketStore;

    fn quest() -> Quest {
        Quest::new("onboarding", "acme", "Onboarding")
    }

    #[test]
    fn create_epic_then_story() {
        let mut repo = MemoryTicketStore::new();
        let mut q = quest();

        let epic = create_ticket(
            &mut repo,
            &mut q,
            NewTicket {
                title: "Signup flow".into(),
                ticket_type: TicketType::Epic,
                parent_ticket_id: None,
                description: None,
                priority: None,
                story_points: None,
                acceptance_criteria: vec![],
            },
        )
        .unwrap();
        assert_eq!(epic.hierarchy_level, 1);
        assert_eq!(epic.sort_order, 0);
        assert_eq!(epic.status, TicketStatus::Pending);

        let story = create_ticket(
            &mut repo,
            &mut q,
            NewTicket {
                title: "Email verification".into(),
                ticket_type: TicketType::Story,
                parent_ticket_id: Some(epic.id.clone()),
                description: None,
                priority: Some(Priority::High),
                story_points: Some(5),
                acceptance_criteria: vec!["sends email".into()],
            },
        )
        .unwrap();
        assert_eq!(story.hierarchy_level, 2);
        assert_eq!(story.parent_ticket_id.as_deref(), Some(epic.id.as_str()));
        assert_eq!(q.total_tickets, 2);
    }

    #[test]
    fn create_story_without_parent_rejected() {
        let mut repo = MemoryTicketStore::new();
        let mut q = quest();
        let err = create_ticket(
            &mut repo,
            &mut q,
            NewTicket {
                title: "Orphan story".into(),
                ticket_type: TicketType::Story,
                parent_ticket_id: None,
                description: None,
                priority: None,
                story_points: None,
                acceptance_criteria: vec![],
            },
        );
        assert!(err.is_err());
        assert!(repo.list().unwrap().is_empty());
    }

    #[test]
    fn points_fall_back_to_type_default() {
        let t = Ticket::new("t1", "q", "Epic", TicketType::Epic, None, 0);
        assert_eq!(t.points(), 13);
        let mut t = Ticket::new("t2", "q", "Story", TicketType::Story, None, 0);
        t.story_points = Some(8);
        assert_eq!(t.points(), 8);
    }

    #[test]
    fn retype_recomputes_level() {
        let mut repo = MemoryTicketStore::new();
        let mut q = quest();
        let epic = create_ticket(
            &mut repo,
            &mut q,
            NewTicket {
                title: "Epic".into(),
                ticket_type: TicketType::Epic,
                parent_ticket_id: None,
                description: None,
                priority: None,
                story_points: None,
                acceptance_criteria: vec![],
            },
        )
        .unwrap();
        let story = create_ticket(
            &mut repo,
            &mut q,
            NewTicket {
                title: "Story".into(),
                ticket_type: TicketType::Story,
                parent_ticket_id: Some(epic.id.clone()),
                description: None,
                priority: None,
                story_points: None,
                acceptance_criteria: vec![],
            },
        )
        .unwrap();
        let task = create_ticket(
            &mut repo,
            &mut q,
            NewTicket {
                title: "Task".into(),
                ticket_type: TicketType::Task,
                parent_ticket_id: Some(story.id.clone()),
                description: None,
                priority: None,
                story_points: None,
                acceptance_criteria: vec![],
            },
        )
        .unwrap();

        let retyped = retype_ticket(&mut repo, &task.id, TicketType::Test).unwrap();
        assert_eq!(retyped.ticket_type, TicketType::Test);
        assert_eq!(retyped.hierarchy_level, 3);
    }

    #[test]
    fn retype_rejection_is_a_no_op() {
        let mut repo = MemoryTicketStore::new();
        let mut q = quest();
        let epic = create_ticket(
            &mut repo,
            &mut q,
            NewTicket {
                title: "Epic".into(),
                ticket_type: TicketType::Epic,
                parent_ticket_id: None,
                description: None,
                priority: None,
                story_points: None,
                acceptance_criteria: vec![],
            },
        )
        .unwrap();
        let story = create_ticket(
            &mut repo,
            &mut q,
            NewTicket {
                title: "Story".into(),
                ticket_type: TicketType::Story,
                parent_ticket_id: Some(epic.id.clone()),
                description: None,
                priority: None,
                story_points: None,
                acceptance_criteria: vec![],
            },
        )
        .unwrap();

        // A story under an epic cannot become a subtask.
        assert!(retype_ticket(&mut repo, &story.id, TicketType::Subtask).is_err());
        let unchanged = repo.get(&story.id).unwrap();
        assert_eq!(unchanged.ticket_type, TicketType::Story);
        assert_eq!(unchanged.hierarchy_level, 2);
    }

    #[test]
    fn edit_applies_only_set_fields() {
        let mut t = Ticket::new("t1", "q", "Old title", TicketType::Epic, None, 0);
        t.description = Some("keep me".into());
        let edit = TicketEdit {
            title: Some("New title".into()),
            description: None,
            acceptance_criteria: Some(vec!["done".into()]),
        };
        edit.apply(&mut t);
        assert_eq!(t.title, "New title");
        assert_eq!(t.description.as_deref(), Some("keep me"));
        assert_eq!(t.acceptance_criteria, vec!["done".to_string()]);
    }
}
