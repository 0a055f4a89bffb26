use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// TicketType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketType {
    Epic,
    Story,
    Task,
    Test,
    Subtask,
}

impl TicketType {
    pub fn all() -> &'static [TicketType] {
        &[
            TicketType::Epic,
            TicketType::Story,
            TicketType::Task,
            TicketType::Test,
            TicketType::Subtask,
        ]
    }

    /// Default story-point estimate used when a ticket carries no explicit value.
    pub fn default_points(self) -> u32 {
        match self {
            TicketType::Epic => 13,
            TicketType::Story => 5,
            TicketType::Task => 3,
            TicketType::Subtask => 1,
            _ => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TicketType::Epic => "epic",
            TicketType::Story => "story",
            TicketType::Task => "task",
            TicketType::Test => "test",
            TicketType::Subtask => "subtask",
        }
    }
}

impl fmt::Display for TicketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TicketType {
    type Err = crate::error::QuestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "epic" => Ok(TicketType::Epic),
            "story" => Ok(TicketType::Story),
            "task" => Ok(TicketType::Task),
            "test" => Ok(TicketType::Test),
            "subtask" => Ok(TicketType::Subtask),
            _ => Err(crate::error::QuestError::InvalidTicketType(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// TicketStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Pending,
    Approved,
    InProgress,
    Completed,
    Skipped,
}

impl TicketStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TicketStatus::Pending => "pending",
            TicketStatus::Approved => "approved",
            TicketStatus::InProgress => "in_progress",
            TicketStatus::Completed => "completed",
            TicketStatus::Skipped => "skipped",
        }
    }

    /// Terminal statuses are never revisited by the session walker.
    pub fn is_terminal(self) -> bool {
        matches!(self, TicketStatus::Completed | TicketStatus::Skipped)
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TicketStatus {
    type Err = crate::error::QuestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TicketStatus::Pending),
            "approved" => Ok(TicketStatus::Approved),
            "in_progress" => Ok(TicketStatus::InProgress),
            "completed" => Ok(TicketStatus::Completed),
            "skipped" => Ok(TicketStatus::Skipped),
            _ => Err(crate::error::QuestError::InvalidTicketStatus(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    /// Sort rank for priority_first planning: most urgent first.
    pub fn rank(self) -> u8 {
        match self {
            Priority::Urgent => 0,
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Priority {
    type Err = crate::error::QuestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "urgent" => Ok(Priority::Urgent),
            _ => Err(crate::error::QuestError::InvalidPriority(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Implementing,
    AwaitingReview,
    Completed,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionStatus::Implementing => "implementing",
            SessionStatus::AwaitingReview => "awaiting_review",
            SessionStatus::Completed => "completed",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// QuestStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestStatus {
    Planning,
    Ready,
    InProgress,
    Completed,
}

impl fmt::Display for QuestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QuestStatus::Planning => "planning",
            QuestStatus::Ready => "ready",
            QuestStatus::InProgress => "in_progress",
            QuestStatus::Completed => "completed",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// SprintStrategy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SprintStrategy {
    Balanced,
    PriorityFirst,
    DependencyAware,
}

impl SprintStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            SprintStrategy::Balanced => "balanced",
            SprintStrategy::PriorityFirst => "priority_first",
            SprintStrategy::DependencyAware => "dependency_aware",
        }
    }
}

impl fmt::Display for SprintStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SprintStrategy {
    type Err = crate::error::QuestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "balanced" => Ok(SprintStrategy::Balanced),
            "priority_first" => Ok(SprintStrategy::PriorityFirst),
            "dependency_aware" => Ok(SprintStrategy::DependencyAware),
            _ => Err(crate::error::QuestError::InvalidStrategy(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn ticket_type_roundtrip() {
        for t in TicketType::all() {
            assert_eq!(TicketType::from_str(t.as_str()).unwrap(), *t);
        }
    }

    #[test]
    fn default_points_per_type() {
        assert_eq!(TicketType::Epic.default_points(), 13);
        assert_eq!(TicketType::Story.default_points(), 5);
        assert_eq!(TicketType::Task.default_points(), 3);
        assert_eq!(TicketType::Subtask.default_points(), 1);
        assert_eq!(TicketType::Test.default_points(), 2);
    }

    #[test]
    fn priority_rank_most_urgent_first() {
        assert!(Priority::Urgent.rank() < Priority::High.rank());
        assert!(Priority::High.rank() < Priority::Medium.rank());
        assert!(Priority::Medium.rank() < Priority::Low.rank());
    }

    #[test]
    fn terminal_statuses() {
        assert!(TicketStatus::Completed.is_terminal());
        assert!(TicketStatus::Skipped.is_terminal());
        assert!(!TicketStatus::Approved.is_terminal());
        assert!(!TicketStatus::InProgress.is_terminal());
    }

    #[test]
    fn strategy_roundtrip() {
        for s in ["balanced", "priority_first", "dependency_aware"] {
            assert_eq!(SprintStrategy::from_str(s).unwrap().as_str(), s);
        }
        assert!(SprintStrategy::from_str("bogus").is_err());
    }
}
