use crate::error::{QuestError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const QUESTS_DIR: &str = ".quests";
pub const TRACKER_TASKS_DIR: &str = ".quests/tracker/tasks";
pub const TRACKER_SPRINTS_DIR: &str = ".quests/tracker/sprints";

pub const CONFIG_FILE: &str = ".quests/config.yaml";
pub const COUNTERS_FILE: &str = ".quests/tracker/counters.yaml";
pub const MANIFEST_FILE: &str = "manifest.yaml";
pub const SESSION_FILE: &str = "session.yaml";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn quests_dir(root: &Path) -> PathBuf {
    root.join(QUESTS_DIR)
}

pub fn quest_dir(root: &Path, slug: &str) -> PathBuf {
    root.join(QUESTS_DIR).join(slug)
}

pub fn quest_manifest(root: &Path, slug: &str) -> PathBuf {
    quest_dir(root, slug).join(MANIFEST_FILE)
}

pub fn tickets_dir(root: &Path, slug: &str) -> PathBuf {
    quest_dir(root, slug).join("tickets")
}

pub fn ticket_path(root: &Path, slug: &str, ticket_id: &str) -> PathBuf {
    tickets_dir(root, slug).join(format!("{ticket_id}.yaml"))
}

pub fn session_path(root: &Path, slug: &str) -> PathBuf {
    quest_dir(root, slug).join(SESSION_FILE)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn counters_path(root: &Path) -> PathBuf {
    root.join(COUNTERS_FILE)
}

pub fn tracker_task_path(root: &Path, key: &str) -> PathBuf {
    root.join(TRACKER_TASKS_DIR).join(format!("{key}.yaml"))
}

pub fn tracker_sprint_path(root: &Path, id: &str) -> PathBuf {
    root.join(TRACKER_SPRINTS_DIR).join(format!("{id}.yaml"))
}

// ---------------------------------------------------------------------------
// Slug validation
// ---------------------------------------------------------------------------

static SLUG_RE: OnceLock<Regex> = OnceLock::new();

fn slug_re() -> &'static Regex {
    SLUG_RE.get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9\-]*[a-z0-9]$|^[a-z0-9]$").unwrap())
}

pub fn validate_slug(slug: &str) -> Result<()> {
    if slug.is_empty() || slug.len() > 64 || !slug_re().is_match(slug) {
        return Err(QuestError::InvalidSlug(slug.to_string()));
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
    fn valid_slugs() {
        for slug in ["auth-rework", "a", "sprint-42", "x1"] {
            validate_slug(slug).unwrap_or_else(|_| panic!("expected valid: {slug}"));
        }
    }

    #[test]
    fn invalid_slugs() {
        for slug in [
            "",
            "-starts-with-dash",
            "ends-with-dash-",
            "has spaces",
            "UPPER",
            "a_b",
        ] {
            assert!(validate_slug(slug).is_err(), "expected invalid: {slug}");
        }
    }

    #[test]
    fn path_helpers() {
        let root = Path::new("/tmp/proj");
        assert_eq!(
            config_path(root),
            PathBuf::from("/tmp/proj/.quests/config.yaml")
        );
        assert_eq!(
            quest_manifest(root, "onboarding"),
            PathBuf::from("/tmp/proj/.quests/onboarding/manifest.yaml")
        );
        assert_eq!(
            ticket_path(root, "onboarding", "t3"),
            PathBuf::from("/tmp/proj/.quests/onboarding/tickets/t3.yaml")
        );
    }
}
