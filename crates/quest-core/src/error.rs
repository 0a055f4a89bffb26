use thiserror::Error;

#[derive(Debug, Error)]
pub enum QuestError {
    #[error("not initialized: run 'quest init'")]
    NotInitialized,

    #[error("quest not found: {0}")]
    QuestNotFound(String),

    #[error("quest already exists: {0}")]
    QuestExists(String),

    #[error("ticket not found: {0}")]
    TicketNotFound(String),

    #[error("no implementation session for quest: {0}")]
    SessionNotFound(String),

    #[error("quest '{0}' already has an implementation session")]
    SessionExists(String),

    #[error("session for quest '{0}' has no active ticket")]
    NoActiveTicket(String),

    #[error("no eligible tickets to implement in quest '{0}'")]
    NothingToImplement(String),

    #[error("invalid slug '{0}': must be lowercase alphanumeric with hyphens")]
    InvalidSlug(String),

    #[error("invalid hierarchy for ticket '{ticket}': {reason}")]
    InvalidHierarchy { ticket: String, reason: String },

    #[error("cannot approve ticket '{ticket}': already {status}")]
    ApprovalConflict { ticket: String, status: String },

    #[error("invalid ticket type: {0}")]
    InvalidTicketType(String),

    #[error("invalid ticket status: {0}")]
    InvalidTicketStatus(String),

    #[error("invalid priority: {0}")]
    InvalidPriority(String),

    #[error("invalid sprint strategy: {0}")]
    InvalidStrategy(String),

    #[error("invalid session action: {0}")]
    InvalidAction(String),

    #[error("advisory oracle failed: {0}")]
    Oracle(String),

    #[error("tracker error: {0}")]
    Tracker(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, QuestError>;
