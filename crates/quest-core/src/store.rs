//! Ticket persistence, scoped to a single quest.
//!
//! The engine components (tree, planner, approval, session, finalize) only
//! see the `TicketRepository` trait. The file-backed store keeps one YAML
//! manifest per ticket so every write is an independent single-entity
//! operation; there is no cross-ticket transaction. Callers must serialize
//! mutations per quest.

use crate::error::{QuestError, Result};
use crate::io;
use crate::paths;
use crate::ticket::Ticket;
use crate::types::TicketStatus;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// TicketRepository
// ---------------------------------------------------------------------------

pub trait TicketRepository {
    fn create(&mut self, ticket: Ticket) -> Result<()>;
    fn get(&self, id: &str) -> Result<Ticket>;
    fn update(&mut self, ticket: &Ticket) -> Result<()>;
    fn delete(&mut self, id: &str) -> Result<()>;
    /// All tickets in the quest, ordered by id.
    fn list(&self) -> Result<Vec<Ticket>>;

    /// Tickets whose parent is `parent_id` (`None` = roots), sorted by sort_order.
    fn children_of(&self, parent_id: Option<&str>) -> Result<Vec<Ticket>> {
        let mut children: Vec<Ticket> = self
            .list()?
            .into_iter()
            .filter(|t| t.parent_ticket_id.as_deref() == parent_id)
            .collect();
        children.sort_by_key(|t| t.sort_order);
        Ok(children)
    }

    fn list_by_status(&self, status: TicketStatus) -> Result<Vec<Ticket>> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|t| t.status == status)
            .collect())
    }
}

// ---------------------------------------------------------------------------
// YamlTicketStore
// ---------------------------------------------------------------------------

/// One YAML file per ticket under `.quests/<slug>/tickets/`.
pub struct YamlTicketStore {
    root: PathBuf,
    quest: String,
}

impl YamlTicketStore {
    pub fn new(root: &Path, quest: impl Into<String>) -> Self {
        Self {
            root: root.to_path_buf(),
            quest: quest.into(),
        }
    }

    fn path(&self, id: &str) -> PathBuf {
        paths::ticket_path(&self.root, &self.quest, id)
    }
}

impl TicketRepository for YamlTicketStore {
    fn create(&mut self, ticket: Ticket) -> Result<()> {
        let data = serde_yaml::to_string(&ticket)?;
        io::atomic_write(&self.path(&ticket.id), data.as_bytes())
    }

    fn get(&self, id: &str) -> Result<Ticket> {
        let path = self.path(id);
        if !path.exists() {
            return Err(QuestError::TicketNotFound(id.to_string()));
        }
        let data = std::fs::read_to_string(&path)?;
        let ticket: Ticket = serde_yaml::from_str(&data)?;
        Ok(ticket)
    }

    fn update(&mut self, ticket: &Ticket) -> Result<()> {
        let path = self.path(&ticket.id);
        if !path.exists() {
            return Err(QuestError::TicketNotFound(ticket.id.clone()));
        }
        let data = serde_yaml::to_string(ticket)?;
        io::atomic_write(&path, data.as_bytes())
    }

    fn delete(&mut self, id: &str) -> Result<()> {
        let path = self.path(id);
        if !path.exists() {
            return Err(QuestError::TicketNotFound(id.to_string()));
        }
        std::fs::remove_file(path)?;
        Ok(())
    }

    fn list(&self) -> Result<Vec<Ticket>> {
        let dir = paths::tickets_dir(&self.root, &self.quest);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut tickets = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
                continue;
            }
            let data = std::fs::read_to_string(&path)?;
            let ticket: Ticket = serde_yaml::from_str(&data)?;
            tickets.push(ticket);
        }
        tickets.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(tickets)
    }
}

// ---------------------------------------------------------------------------
// MemoryTicketStore
// ---------------------------------------------------------------------------

/// In-memory store for tests and embedders.
#[derive(Debug, Default)]
pub struct MemoryTicketStore {
    tickets: BTreeMap<String, Ticket>,
}

impl MemoryTicketStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TicketRepository for MemoryTicketStore {
    fn create(&mut self, ticket: Ticket) -> Result<()> {
        self.tickets.insert(ticket.id.clone(), ticket);
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Ticket> {
        self.tickets
            .get(id)
            .cloned()
            .ok_or_else(|| QuestError::TicketNotFound(id.to_string()))
    }

    fn update(&mut self, ticket: &Ticket) -> Result<()> {
        if !self.tickets.contains_key(&ticket.id) {
            return Err(QuestError::TicketNotFound(ticket.id.clone()));
        }
        self.tickets.insert(ticket.id.clone(), ticket.clone());
        Ok(())
    }

    fn delete(&mut self, id: &str) -> Result<()> {
        self.tickets
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| QuestError::TicketNotFound(id.to_string()))
    }

    fn list(&self) -> Result<Vec<Ticket>> {
        Ok(self.tickets.values().cloned().collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
