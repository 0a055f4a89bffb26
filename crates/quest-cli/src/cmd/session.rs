use crate::output::print_json;
use clap::Subcommand;
use quest_core::quest::Quest;
use quest_core::session::{self, AdvanceAction, ImplementationResult, ImplementationSession};
use quest_core::store::YamlTicketStore;
use quest_core::ticket::TicketEdit;
use std::path::Path;

#[derive(Subcommand)]
pub enum SessionSubcommand {
    /// Start an implementation session on a quest
    Start {
        quest: String,
        /// Pause for review after each ticket instead of auto-advancing
        #[arg(long)]
        manual: bool,
    },
    /// Record a decision on the current ticket and move on
    Advance {
        quest: String,
        /// Decision: approve, skip, modify
        action: String,
        /// New title (modify)
        #[arg(long)]
        title: Option<String>,
        /// New description (modify)
        #[arg(long)]
        description: Option<String>,
        /// Replacement acceptance criterion, repeatable (modify)
        #[arg(long = "criterion")]
        criteria: Vec<String>,
        /// Pull request URL (approve)
        #[arg(long)]
        pr_url: Option<String>,
        /// Commit SHA (approve)
        #[arg(long)]
        commit: Option<String>,
        /// Record the implementation as failed (approve)
        #[arg(long)]
        failed: bool,
        /// Failure detail (approve, with --failed)
        #[arg(long)]
        error: Option<String>,
    },
    /// Show the session for a quest
    Status { quest: String },
}

pub fn run(root: &Path, subcmd: SessionSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        SessionSubcommand::Start { quest, manual } => start(root, &quest, !manual, json),
        SessionSubcommand::Advance {
            quest,
            action,
            title,
            description,
            criteria,
            pr_url,
            commit,
            failed,
            error,
        } => {
            let edit = if title.is_some() || description.is_some() || !criteria.is_empty() {
                Some(TicketEdit {
                    title,
                    description,
                    acceptance_criteria: if criteria.is_empty() {
                        None
                    } else {
                        Some(criteria)
                    },
                })
            } else {
                None
            };
            let result = if pr_url.is_some() || commit.is_some() || failed {
                Some(ImplementationResult {
                    success: !failed,
                    pr_url,
                    commit_sha: commit,
                    error,
                })
            } else {
                None
            };
            advance(root, &quest, &action, edit, result, json)
        }
        SessionSubcommand::Status { quest } => status(root, &quest, json),
    }
}

fn start(root: &Path, quest_slug: &str, auto_advance: bool, json: bool) -> anyhow::Result<()> {
    let mut quest = Quest::load(root, quest_slug)?;
    if ImplementationSession::exists(root, quest_slug) {
        let existing = ImplementationSession::load(root, quest_slug)?;
        if existing.completed_at.is_none() {
            return Err(quest_core::QuestError::SessionExists(quest_slug.to_string()).into());
        }
    }
    let mut store = YamlTicketStore::new(root, quest_slug);

    let session = session::start(&mut store, &mut quest, auto_advance)?;
    session.save(root)?;
    quest.save(root)?;

    if json {
        print_json(&session)?;
    } else {
        let current = session.current_ticket_id.as_deref().unwrap_or("-");
        println!("Session started on '{quest_slug}'; current ticket: {current}");
    }
    Ok(())
}

fn advance(
    root: &Path,
    quest_slug: &str,
    action: &str,
    edit: Option<TicketEdit>,
    result: Option<ImplementationResult>,
    json: bool,
) -> anyhow::Result<()> {
    let action: AdvanceAction = action.parse()?;
    let mut quest = Quest::load(root, quest_slug)?;
    let mut session = ImplementationSession::load(root, quest_slug)?;
    let mut store = YamlTicketStore::new(root, quest_slug);

    let outcome = session::advance(&mut store, &mut quest, &mut session, action, edit, result)?;
    session.save(root)?;
    quest.save(root)?;

    if json {
        print_json(&outcome)?;
        return Ok(());
    }
    match action {
        AdvanceAction::Modify => println!("Modified [{}]: {}", outcome.ticket_id, outcome.ticket_title),
        AdvanceAction::Approve => println!("Completed [{}]: {}", outcome.ticket_id, outcome.ticket_title),
        AdvanceAction::Skip => println!("Skipped [{}]: {}", outcome.ticket_id, outcome.ticket_title),
    }
    if outcome.session_completed {
        println!("Session complete.");
    } else if action != AdvanceAction::Modify {
        if let Some(next) = &outcome.next_ticket_id {
            println!("Now on [{next}]");
        }
    }
    Ok(())
}

fn status(root: &Path, quest_slug: &str, json: bool) -> anyhow::Result<()> {
    let session = ImplementationSession::load(root, quest_slug)?;
    if json {
        print_json(&session)?;
        return Ok(());
    }
    println!("Session {} on '{}'", session.id, session.quest);
    println!("  status:      {}", session.status);
    println!(
        "  current:     {}",
        session.current_ticket_id.as_deref().unwrap_or("-")
    );
    println!("  implemented: {}", session.tickets_implemented);
    println!("  skipped:     {}", session.tickets_skipped);
    Ok(())
}
