use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use quest_core::quest::Quest;
use quest_core::store::{TicketRepository, YamlTicketStore};
use quest_core::ticket::{self, NewTicket, TicketEdit};
use quest_core::tree;
use quest_core::types::{Priority, TicketType};
use std::path::Path;

#[derive(Subcommand)]
pub enum TicketSubcommand {
    /// Add a ticket to a quest
    Add {
        quest: String,
        #[arg(required = true)]
        title: Vec<String>,
        /// Ticket type: epic, story, task, test, subtask
        #[arg(long = "type", default_value = "task")]
        ticket_type: String,
        /// Parent ticket id (required for everything but epics)
        #[arg(long)]
        parent: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Priority: low, medium, high, urgent
        #[arg(long)]
        priority: Option<String>,
        #[arg(long)]
        points: Option<u32>,
        /// Acceptance criterion (repeatable)
        #[arg(long = "criterion")]
        criteria: Vec<String>,
    },
    /// Show full details for a single ticket
    Get { quest: String, ticket_id: String },
    /// List tickets in a quest
    List { quest: String },
    /// Edit ticket fields
    Edit {
        quest: String,
        ticket_id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Replace acceptance criteria (repeatable)
        #[arg(long = "criterion")]
        criteria: Vec<String>,
    },
    /// Change a ticket's type, revalidating its place in the hierarchy
    Retype {
        quest: String,
        ticket_id: String,
        new_type: String,
    },
    /// Move a ticket to a new parent and/or position among its siblings
    Move {
        quest: String,
        ticket_id: String,
        /// New parent ticket id (omit to move to the root level)
        #[arg(long)]
        parent: Option<String>,
        /// Target position among siblings (0-based)
        #[arg(long, default_value = "0")]
        position: u32,
    },
    /// Delete a ticket
    Delete { quest: String, ticket_id: String },
}

pub fn run(root: &Path, subcmd: TicketSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        TicketSubcommand::Add {
            quest,
            title,
            ticket_type,
            parent,
            description,
            priority,
            points,
            criteria,
        } => add(
            root,
            &quest,
            &title.join(" "),
            &ticket_type,
            parent,
            description,
            priority.as_deref(),
            points,
            criteria,
            json,
        ),
        TicketSubcommand::Get { quest, ticket_id } => get(root, &quest, &ticket_id, json),
        TicketSubcommand::List { quest } => list(root, &quest, json),
        TicketSubcommand::Edit {
            quest,
            ticket_id,
            title,
            description,
            criteria,
        } => edit(root, &quest, &ticket_id, title, description, criteria, json),
        TicketSubcommand::Retype {
            quest,
            ticket_id,
            new_type,
        } => retype(root, &quest, &ticket_id, &new_type, json),
        TicketSubcommand::Move {
            quest,
            ticket_id,
            parent,
            position,
        } => move_ticket(root, &quest, &ticket_id, parent.as_deref(), position, json),
        TicketSubcommand::Delete { quest, ticket_id } => delete(root, &quest, &ticket_id, json),
    }
}

#[allow(clippy::too_many_arguments)]
fn add(
    root: &Path,
    quest_slug: &str,
    title: &str,
    ticket_type: &str,
    parent: Option<String>,
    description: Option<String>,
    priority: Option<&str>,
    points: Option<u32>,
    criteria: Vec<String>,
    json: bool,
) -> anyhow::Result<()> {
    let mut quest = Quest::load(root, quest_slug)?;
    let mut store = YamlTicketStore::new(root, quest_slug);

    let ticket_type: TicketType = ticket_type.parse()?;
    let priority: Option<Priority> = priority.map(str::parse).transpose()?;

    let created = ticket::create_ticket(
        &mut store,
        &mut quest,
        NewTicket {
            title: title.to_string(),
            ticket_type,
            parent_ticket_id: parent,
            description,
            priority,
            story_points: points,
            acceptance_criteria: criteria,
        },
    )?;
    quest.save(root).context("failed to save quest")?;

    if json {
        print_json(&created)?;
    } else {
        println!("Added {} [{}]: {}", created.ticket_type.as_str(), created.id, created.title);
    }
    Ok(())
}

fn get(root: &Path, quest_slug: &str, ticket_id: &str, json: bool) -> anyhow::Result<()> {
    let store = YamlTicketStore::new(root, quest_slug);
    let ticket = store.get(ticket_id)?;

    if json {
        print_json(&ticket)?;
        return Ok(());
    }
    println!("{} [{}] {}", ticket.id, ticket.ticket_type.as_str(), ticket.title);
    println!("  status:   {}", ticket.status.as_str());
    println!("  level:    {}", ticket.hierarchy_level);
    println!("  order:    {}", ticket.sort_order);
    if let Some(parent) = &ticket.parent_ticket_id {
        println!("  parent:   {parent}");
    }
    if let Some(priority) = ticket.priority {
        println!("  priority: {priority}");
    }
    println!("  points:   {}", ticket.points());
    if let Some(sprint) = ticket.sprint_group {
        println!("  sprint:   {sprint}");
    }
    if let Some(key) = &ticket.external_task_id {
        println!("  tracked:  {key}");
    }
    if let Some(desc) = &ticket.description {
        println!("  description: {desc}");
    }
    for criterion in &ticket.acceptance_criteria {
        println!("  - [ ] {criterion}");
    }
    Ok(())
}

fn list(root: &Path, quest_slug: &str, json: bool) -> anyhow::Result<()> {
    Quest::load(root, quest_slug)?;
    let store = YamlTicketStore::new(root, quest_slug);
    let mut tickets = store.list()?;
    tickets.sort_by_key(|t| (t.hierarchy_level, t.sort_order));

    if json {
        print_json(&tickets)?;
        return Ok(());
    }
    let rows = tickets
        .iter()
        .map(|t| {
            vec![
                t.id.clone(),
                t.ticket_type.as_str().to_string(),
                t.status.as_str().to_string(),
                t.points().to_string(),
                t.sprint_group.map(|s| s.to_string()).unwrap_or_default(),
                t.title.clone(),
            ]
        })
        .collect();
    print_table(&["ID", "TYPE", "STATUS", "PTS", "SPRINT", "TITLE"], rows);
    Ok(())
}

fn edit(
    root: &Path,
    quest_slug: &str,
    ticket_id: &str,
    title: Option<String>,
    description: Option<String>,
    criteria: Vec<String>,
    json: bool,
) -> anyhow::Result<()> {
    let mut store = YamlTicketStore::new(root, quest_slug);
    let mut ticket = store.get(ticket_id)?;

    let edit = TicketEdit {
        title,
        description,
        acceptance_criteria: if criteria.is_empty() {
            None
        } else {
            Some(criteria)
        },
    };
    edit.apply(&mut ticket);
    store.update(&ticket)?;

    if json {
        print_json(&ticket)?;
    } else {
        println!("Updated ticket [{ticket_id}]");
    }
    Ok(())
}

fn retype(
    root: &Path,
    quest_slug: &str,
    ticket_id: &str,
    new_type: &str,
    json: bool,
) -> anyhow::Result<()> {
    let mut store = YamlTicketStore::new(root, quest_slug);
    let new_type: TicketType = new_type.parse()?;
    let ticket = ticket::retype_ticket(&mut store, ticket_id, new_type)?;

    if json {
        print_json(&ticket)?;
    } else {
        println!("Retyped [{ticket_id}] to {}", ticket.ticket_type.as_str());
    }
    Ok(())
}

fn move_ticket(
    root: &Path,
    quest_slug: &str,
    ticket_id: &str,
    parent: Option<&str>,
    position: u32,
    json: bool,
) -> anyhow::Result<()> {
    let mut store = YamlTicketStore::new(root, quest_slug);
    tree::reorder(&mut store, ticket_id, parent, position)?;

    if json {
        print_json(&store.get(ticket_id)?)?;
    } else {
        match parent {
            Some(p) => println!("Moved [{ticket_id}] under [{p}] at position {position}"),
            None => println!("Moved [{ticket_id}] to root at position {position}"),
        }
    }
    Ok(())
}

fn delete(root: &Path, quest_slug: &str, ticket_id: &str, json: bool) -> anyhow::Result<()> {
    let mut store = YamlTicketStore::new(root, quest_slug);
    let children = store.children_of(Some(ticket_id))?;
    if !children.is_empty() {
        anyhow::bail!(
            "ticket '{ticket_id}' has {} children; move or delete them first",
            children.len()
        );
    }
    store.delete(ticket_id)?;

    let mut quest = Quest::load(root, quest_slug)?;
    quest.total_tickets = quest.total_tickets.saturating_sub(1);
    quest.touch();
    quest.save(root)?;

    if json {
        print_json(&serde_json::json!({ "deleted": ticket_id }))?;
    } else {
        println!("Deleted ticket [{ticket_id}]");
    }
    Ok(())
}
