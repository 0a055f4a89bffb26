//! Finalization pipeline: materialize approved (and pending) tickets as
//! externally tracked tasks, preserving hierarchy through parent references.
//!
//! Tickets already carrying an external reference are skipped entirely, so
//! re-running the pipeline is idempotent. Per-ticket creation failures are
//! collected, never thrown; successfully created tasks remain.

use crate::error::Result;
use crate::quest::Quest;
use crate::store::TicketRepository;
use crate::ticket::Ticket;
use crate::types::{Priority, QuestStatus, TicketStatus};
use serde::Serialize;
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Collaborator interfaces
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    Repo,
    Doc,
    Feature,
}

/// Fields for one external task creation.
#[derive(Debug, Clone, Serialize)]
pub struct NewExternalTask {
    pub key: String,
    pub title: String,
    pub description: String,
    pub parent_key: Option<String>,
    pub priority: Option<Priority>,
    pub points: u32,
    pub sprint_id: Option<String>,
}

/// Sink for externally tracked work items. Failures are per-call and
/// non-fatal to the overall pipeline.
pub trait ExternalTaskSink {
    fn create_sprint(&mut self, name: &str) -> Result<String>;
    fn create_task(&mut self, task: &NewExternalTask) -> Result<String>;
    /// Duplicate-tolerant cross-reference insertion.
    fn link_resource(&mut self, task_key: &str, kind: LinkKind, resource_id: &str) -> Result<()>;
}

/// Monotonic per-project key counter. Explicitly passed, never a global.
pub trait SequenceCounter {
    fn next_key(&mut self, project: &str) -> Result<u64>;
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize)]
pub struct FinalizationReport {
    pub created: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sprint_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Convert every approved and pending ticket into a tracked external task.
///
/// Pending tickets are deliberately included and promoted to approved as a
/// side effect of task creation. The walk is parent-before-child
/// (hierarchy_level, then sort_order), so a child's parent reference always
/// points at an already-created task.
pub fn finalize(
    repo: &mut dyn TicketRepository,
    quest: &mut Quest,
    sink: &mut dyn ExternalTaskSink,
    counter: &mut dyn SequenceCounter,
    with_sprint: bool,
    sprint_name: Option<&str>,
) -> Result<FinalizationReport> {
    let mut report = FinalizationReport::default();

    if with_sprint {
        let default_name = format!("{} Sprint", quest.title);
        let name = sprint_name.unwrap_or(&default_name);
        report.sprint_id = Some(sink.create_sprint(name)?);
    }

    let mut tickets: Vec<Ticket> = repo
        .list()?
        .into_iter()
        .filter(|t| matches!(t.status, TicketStatus::Approved | TicketStatus::Pending))
        .collect();
    tickets.sort_by_key(|t| (t.hierarchy_level, t.sort_order));

    // Map ticket id -> external key for parent wiring within this run.
    let mut keys: HashMap<String, String> = HashMap::new();

    for mut ticket in tickets {
        if let Some(existing) = &ticket.external_task_id {
            keys.insert(ticket.id.clone(), existing.clone());
            report.skipped += 1;
            continue;
        }

        let parent_key = match &ticket.parent_ticket_id {
            Some(pid) => match keys.get(pid) {
                Some(key) => Some(key.clone()),
                // Parent outside this run (e.g. already completed): read its
                // stamped reference from the store.
                None => repo.get(pid).ok().and_then(|p| p.external_task_id),
            },
            None => None,
        };

        let key_number = match counter.next_key(&quest.project) {
            Ok(n) => n,
            Err(e) => {
                report.errors.push(format!("{}: {e}", ticket.id));
                continue;
            }
        };
        let key = format!("{}-{}", quest.project.to_uppercase(), key_number);

        let task = NewExternalTask {
            key: key.clone(),
            title: ticket.title.clone(),
            description: build_description(&ticket),
            parent_key,
            priority: ticket.priority,
            points: ticket.points(),
            sprint_id: report.sprint_id.clone(),
        };

        match sink.create_task(&task) {
            Ok(external_id) => {
                ticket.external_task_id = Some(external_id.clone());
                ticket.status = TicketStatus::Approved;
                ticket.updated_at = chrono::Utc::now();
                repo.update(&ticket)?;
                keys.insert(ticket.id.clone(), external_id.clone());
                report.created += 1;

                // Link failures are swallowed; the task itself stands.
                for repo_id in &ticket.linked_repo_ids {
                    let _ = sink.link_resource(&external_id, LinkKind::Repo, repo_id);
                }
                for doc_id in &ticket.linked_doc_ids {
                    let _ = sink.link_resource(&external_id, LinkKind::Doc, doc_id);
                }
                for feature_id in &ticket.linked_feature_ids {
                    let _ = sink.link_resource(&external_id, LinkKind::Feature, feature_id);
                }
            }
            Err(e) => {
                report.errors.push(format!("{}: {e}", ticket.id));
            }
        }
    }

    quest.status = QuestStatus::Ready;
    quest.total_tickets = repo.list()?.len() as u32;
    quest.touch();
    Ok(report)
}

/// Task description embedding the acceptance criteria as a checklist.
fn build_description(ticket: &Ticket) -> String {
    let mut out = ticket.description.clone().unwrap_or_default();
    if !ticket.acceptance_criteria.is_empty() {
        if !out.is_empty() {
            out.push_str("\n\n");
        }
        out.push_str("## Acceptance Criteria\n");
        for criterion in &ticket.acceptance_criteria {
            out.push_str(&format!("- [ ] {criterion}\n"));
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QuestError;
    use crate::store::MemoryTicketStore;
    use crate::types::TicketType;

    #[derive(Default)]
    struct RecordingSink {
        tasks: Vec<NewExternalTask>,
        links: Vec<(String, LinkKind, String)>,
        sprints: Vec<String>,
        fail_titles: Vec<String>,
        fail_links: bool,
    }

    impl ExternalTaskSink for RecordingSink {
        fn create_sprint(&mut self, name: &str) -> Result<String> {
            self.sprints.push(name.to_string());
            Ok(format!("sprint-{}", self.sprints.len()))
        }

        fn create_task(&mut self, task: &NewExternalTask) -> Result<String> {
            if self.fail_titles.contains(&task.title) {
                return Err(QuestError::Tracker("rejected".to_string()));
            }
            self.tasks.push(task.clone());
            Ok(task.key.clone())
        }

        fn link_resource(&mut self, task_key: &str, kind: LinkKind, resource_id: &str) -> Result<()> {
            if self.fail_links {
                return Err(QuestError::Tracker("link failed".to_string()));
            }
            self.links
                .push((task_key.to_string(), kind, resource_id.to_string()));
            Ok(())
        }
    }

    struct MemCounter(u64);

    impl SequenceCounter for MemCounter {
        fn next_key(&mut self, _project: &str) -> Result<u64> {
            self.0 += 1;
            Ok(self.0)
        }
    }

    fn seed(
        store: &mut MemoryTicketStore,
        id: &str,
        t: TicketType,
        parent: Option<&str>,
        sort: u32,
        status: TicketStatus,
    ) {
        let mut ticket = Ticket::new(id, "q", format!("Ticket {id}"), t, parent.map(String::from), sort);
        ticket.status = status;
        store.create(ticket).unwrap();
    }

    #[test]
    fn finalize_wires_parents_and_promotes_pending() {
        let mut store = MemoryTicketStore::new();
        seed(&mut store, "e1", TicketType::Epic, None, 0, TicketStatus::Approved);
        seed(&mut store, "s1", TicketType::Story, Some("e1"), 0, TicketStatus::Pending);
        let mut quest = Quest::new("q", "acme", "Quest");
        let mut sink = RecordingSink::default();
        let mut counter = MemCounter(0);

        let report =
            finalize(&mut store, &mut quest, &mut sink, &mut counter, false, None).unwrap();
        assert_eq!(report.created, 2);
        assert!(report.errors.is_empty());

        assert_eq!(sink.tasks[0].key, "ACME-1");
        assert_eq!(sink.tasks[1].key, "ACME-2");
        assert_eq!(sink.tasks[1].parent_key.as_deref(), Some("ACME-1"));

        let story = store.get("s1").unwrap();
        assert_eq!(story.status, TicketStatus::Approved);
        assert_eq!(story.external_task_id.as_deref(), Some("ACME-2"));
        assert_eq!(quest.status, QuestStatus::Ready);
        assert_eq!(quest.total_tickets, 2);
    }

    #[test]
    fn finalize_rerun_is_idempotent() {
        let mut store = MemoryTicketStore::new();
        seed(&mut store, "e1", TicketType::Epic, None, 0, TicketStatus::Approved);
        let mut quest = Quest::new("q", "acme", "Quest");
        let mut sink = RecordingSink::default();
        let mut counter = MemCounter(0);

        finalize(&mut store, &mut quest, &mut sink, &mut counter, false, None).unwrap();
        let report =
            finalize(&mut store, &mut quest, &mut sink, &mut counter, false, None).unwrap();
        assert_eq!(report.created, 0);
        assert_eq!(report.skipped, 1);
        assert!(report.errors.is_empty());
        assert_eq!(sink.tasks.len(), 1);
    }

    #[test]
    fn finalize_collects_per_ticket_errors() {
        let mut store = MemoryTicketStore::new();
        seed(&mut store, "e1", TicketType::Epic, None, 0, TicketStatus::Approved);
        seed(&mut store, "e2", TicketType::Epic, None, 1, TicketStatus::Approved);
        let mut quest = Quest::new("q", "acme", "Quest");
        let mut sink = RecordingSink {
            fail_titles: vec!["Ticket e1".to_string()],
            ..Default::default()
        };
        let mut counter = MemCounter(0);

        let report =
            finalize(&mut store, &mut quest, &mut sink, &mut counter, false, None).unwrap();
        assert_eq!(report.created, 1);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].starts_with("e1:"));
        // The failed ticket keeps no external reference and stays retryable.
        assert!(store.get("e1").unwrap().external_task_id.is_none());
        assert!(store.get("e2").unwrap().external_task_id.is_some());
    }

    #[test]
    fn finalize_propagates_links_and_swallows_link_failures() {
        let mut store = MemoryTicketStore::new();
        let mut ticket = Ticket::new("e1", "q", "Epic", TicketType::Epic, None, 0);
        ticket.status = TicketStatus::Approved;
        ticket.linked_repo_ids = vec!["repo-1".into()];
        ticket.linked_doc_ids = vec!["doc-1".into()];
        ticket.linked_feature_ids = vec!["feat-1".into()];
        store.create(ticket).unwrap();
        let mut quest = Quest::new("q", "acme", "Quest");
        let mut counter = MemCounter(0);

        let mut sink = RecordingSink::default();
        finalize(&mut store, &mut quest, &mut sink, &mut counter, false, None).unwrap();
        assert_eq!(sink.links.len(), 3);

        // Link failures do not fail the pipeline.
        let mut store2 = MemoryTicketStore::new();
        let mut t2 = Ticket::new("e1", "q", "Epic", TicketType::Epic, None, 0);
        t2.status = TicketStatus::Approved;
        t2.linked_repo_ids = vec!["repo-1".into()];
        store2.create(t2).unwrap();
        let mut sink2 = RecordingSink {
            fail_links: true,
            ..Default::default()
        };
        let mut counter2 = MemCounter(0);
        let report =
            finalize(&mut store2, &mut quest, &mut sink2, &mut counter2, false, None).unwrap();
        assert_eq!(report.created, 1);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn finalize_creates_sprint_container_when_asked() {
        let mut store = MemoryTicketStore::new();
        seed(&mut store, "e1", TicketType::Epic, None, 0, TicketStatus::Approved);
        let mut quest = Quest::new("q", "acme", "Quest");
        let mut sink = RecordingSink::default();
        let mut counter = MemCounter(0);

        let report =
            finalize(&mut store, &mut quest, &mut sink, &mut counter, true, Some("Sprint 1"))
                .unwrap();
        assert_eq!(report.sprint_id.as_deref(), Some("sprint-1"));
        assert_eq!(sink.sprints, vec!["Sprint 1"]);
        assert_eq!(sink.tasks[0].sprint_id.as_deref(), Some("sprint-1"));
    }

    #[test]
    fn description_embeds_checklist() {
        let mut ticket = Ticket::new("t1", "q", "T", TicketType::Task, None, 0);
        ticket.description = Some("Do the thing.".into());
        ticket.acceptance_criteria = vec!["works".into(), "tested".into()];
        let desc = build_description(&ticket);
        assert!(desc.starts_with("Do the thing."));
        assert!(desc.contains("## Acceptance Criteria"));
        assert!(desc.contains("- [ ] works"));
        assert!(desc.contains("- [ ] tested"));
    }

    #[test]
    fn completed_tickets_are_not_finalized() {
        let mut store = MemoryTicketStore::new();
        seed(&mut store, "e1", TicketType::Epic, None, 0, TicketStatus::Completed);
        let mut quest = Quest::new("q", "acme", "Quest");
        let mut sink = RecordingSink::default();
        let mut counter = MemCounter(0);

        let report =
            finalize(&mut store, &mut quest, &mut sink, &mut counter, false, None).unwrap();
        assert_eq!(report.created, 0);
        assert_eq!(report.skipped, 0);
        assert!(sink.tasks.is_empty());
    }
}
