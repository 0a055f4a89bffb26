//! File-backed task tracker. Each created task and sprint lives as one YAML
//! record under `.quests/tracker/`, and the per-project key counter is a
//! small YAML map next to them.

use crate::error::{QuestError, Result};
use crate::finalize::{ExternalTaskSink, LinkKind, NewExternalTask, SequenceCounter};
use crate::io::atomic_write;
use crate::paths;
use crate::types::Priority;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedTask {
    pub key: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    pub points: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sprint_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub linked_repo_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub linked_doc_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub linked_feature_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedSprint {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// FileTracker
// ---------------------------------------------------------------------------

pub struct FileTracker {
    root: PathBuf,
}

impl FileTracker {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn load_task(&self, key: &str) -> Result<TrackedTask> {
        let path = paths::tracker_task_path(&self.root, key);
        if !path.exists() {
            return Err(QuestError::Tracker(format!("no such task: {key}")));
        }
        let data = std::fs::read_to_string(&path)?;
        Ok(serde_yaml::from_str(&data)?)
    }

    fn save_task(&self, task: &TrackedTask) -> Result<()> {
        let path = paths::tracker_task_path(&self.root, &task.key);
        atomic_write(&path, serde_yaml::to_string(task)?.as_bytes())
    }
}

impl ExternalTaskSink for FileTracker {
    fn create_sprint(&mut self, name: &str) -> Result<String> {
        let sprint = TrackedSprint {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        let path = paths::tracker_sprint_path(&self.root, &sprint.id);
        atomic_write(&path, serde_yaml::to_string(&sprint)?.as_bytes())?;
        Ok(sprint.id)
    }

    fn create_task(&mut self, task: &NewExternalTask) -> Result<String> {
        let path = paths::tracker_task_path(&self.root, &task.key);
        if path.exists() {
            return Err(QuestError::Tracker(format!(
                "task already exists: {}",
                task.key
            )));
        }
        let record = TrackedTask {
            key: task.key.clone(),
            title: task.title.clone(),
            description: task.description.clone(),
            parent_key: task.parent_key.clone(),
            priority: task.priority,
            points: task.points,
            sprint_id: task.sprint_id.clone(),
            linked_repo_ids: Vec::new(),
            linked_doc_ids: Vec::new(),
            linked_feature_ids: Vec::new(),
            created_at: Utc::now(),
        };
        self.save_task(&record)?;
        Ok(record.key)
    }

    fn link_resource(&mut self, task_key: &str, kind: LinkKind, resource_id: &str) -> Result<()> {
        let mut task = self.load_task(task_key)?;
        let links = match kind {
            LinkKind::Repo => &mut task.linked_repo_ids,
            LinkKind::Doc => &mut task.linked_doc_ids,
            LinkKind::Feature => &mut task.linked_feature_ids,
        };
        // Re-linking the same resource is a no-op, not an error.
        if !links.iter().any(|l| l == resource_id) {
            links.push(resource_id.to_string());
            self.save_task(&task)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FileSequenceCounter
// ---------------------------------------------------------------------------

/// Per-project monotonic counters persisted as a YAML map. Every allocation
/// is written back immediately so keys never repeat across runs.
pub struct FileSequenceCounter {
    root: PathBuf,
}

impl FileSequenceCounter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn load(path: &Path) -> Result<BTreeMap<String, u64>> {
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let data = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&data)?)
    }
}

impl SequenceCounter for FileSequenceCounter {
    fn next_key(&mut self, project: &str) -> Result<u64> {
        let path = paths::counters_path(&self.root);
        let mut counters = Self::load(&path)?;
        let next = counters.get(project).copied().unwrap_or(0) + 1;
        counters.insert(project.to_string(), next);
        atomic_write(&path, serde_yaml::to_string(&counters)?.as_bytes())?;
        Ok(next)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
