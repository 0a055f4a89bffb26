use crate::error::{QuestError, Result};
use crate::paths;
use crate::types::QuestStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// Quest
// ---------------------------------------------------------------------------

/// The planning container that owns a tree of tickets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quest {
    pub slug: String,
    pub project: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: QuestStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_ticket_id: Option<String>,
    #[serde(default)]
    pub total_tickets: u32,
    #[serde(default)]
    pub completed_tickets: u32,
    #[serde(default)]
    pub next_ticket_seq: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Quest {
    pub fn new(
        slug: impl Into<String>,
        project: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            slug: slug.into(),
            project: project.into(),
            title: title.into(),
            description: None,
            status: QuestStatus::Planning,
            current_ticket_id: None,
            total_tickets: 0,
            completed_tickets: 0,
            next_ticket_seq: 0,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Allocate the next per-quest ticket id (`t1`, `t2`, ...).
    pub fn allocate_ticket_id(&mut self) -> String {
        self.next_ticket_seq += 1;
        self.updated_at = Utc::now();
        format!("t{}", self.next_ticket_seq)
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    // ---------------------------------------------------------------------------
    // Persistence
    // ---------------------------------------------------------------------------

    pub fn create(
        root: &Path,
        slug: impl Into<String>,
        project: impl Into<String>,
        title: impl Into<String>,
    ) -> Result<Self> {
        let slug = slug.into();
        paths::validate_slug(&slug)?;

        let dir = paths::quest_dir(root, &slug);
        if dir.exists() {
            return Err(QuestError::QuestExists(slug));
        }

        let quest = Self::new(slug, project, title);
        quest.save(root)?;
        Ok(quest)
    }

    pub fn load(root: &Path, slug: &str) -> Result<Self> {
        let manifest = paths::quest_manifest(root, slug);
        if !manifest.exists() {
            return Err(QuestError::QuestNotFound(slug.to_string()));
        }
        let data = std::fs::read_to_string(&manifest)?;
        let quest: Quest = serde_yaml::from_str(&data)?;
        Ok(quest)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let manifest = paths::quest_manifest(root, &self.slug);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&manifest, data.as_bytes())
    }

    pub fn list(root: &Path) -> Result<Vec<Self>> {
        let quests_dir = paths::quests_dir(root);
        if !quests_dir.exists() {
            return Ok(Vec::new());
        }

        let mut quests = Vec::new();
        for entry in std::fs::read_dir(&quests_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                let slug = entry.file_name().to_string_lossy().into_owned();
                match Self::load(root, &slug) {
                    Ok(q) => quests.push(q),
                    Err(QuestError::QuestNotFound(_)) => {}
                    Err(e) => return Err(e),
                }
            }
        }
        quests.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(quests)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn quest_create_load() {
        let dir = TempDir::new().unwrap();
        let quest = Quest::create(dir.path(), "onboarding", "acme", "Onboarding").unwrap();
        assert_eq!(quest.status, QuestStatus::Planning);

        let loaded = Quest::load(dir.path(), "onboarding").unwrap();
        assert_eq!(loaded.title, "Onboarding");
        assert_eq!(loaded.project, "acme");
    }

    #[test]
    fn quest_create_duplicate_fails() {
        let dir = TempDir::new().unwrap();
        Quest::create(dir.path(), "q1", "acme", "Q1").unwrap();
        assert!(matches!(
            Quest::create(dir.path(), "q1", "acme", "Again"),
            Err(QuestError::QuestExists(_))
        ));
    }

    #[test]
    fn ticket_ids_are_sequential() {
        let mut quest = Quest::new("q", "acme", "Q");
        assert_eq!(quest.allocate_ticket_id(), "t1");
        assert_eq!(quest.allocate_ticket_id(), "t2");
        assert_eq!(quest.allocate_ticket_id(), "t3");
    }

    #[test]
    fn list_sorted_by_creation() {
        let dir = TempDir::new().unwrap();
        Quest::create(dir.path(), "first", "acme", "First").unwrap();
        Quest::create(dir.path(), "second", "acme", "Second").unwrap();
        let quests = Quest::list(dir.path()).unwrap();
        assert_eq!(quests.len(), 2);
    }

    #[test]
    fn invalid_slug_rejected() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Quest::create(dir.path(), "Bad Slug", "acme", "Bad"),
            Err(QuestError::InvalidSlug(_))
        ));
    }
}
