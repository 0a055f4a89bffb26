use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use quest_core::config::Config;
use quest_core::quest::Quest;
use quest_core::store::{TicketRepository, YamlTicketStore};
use quest_core::tree::{self, TicketNode};
use std::path::Path;

#[derive(Subcommand)]
pub enum QuestSubcommand {
    /// Create a new quest
    Create {
        slug: String,
        #[arg(required = true)]
        title: Vec<String>,
    },
    /// List quests
    List,
    /// Show a quest's manifest
    Show { slug: String },
    /// Print a quest's ticket tree
    Tree { slug: String },
}

pub fn run(root: &Path, subcmd: QuestSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        QuestSubcommand::Create { slug, title } => create(root, &slug, &title.join(" "), json),
        QuestSubcommand::List => list(root, json),
        QuestSubcommand::Show { slug } => show(root, &slug, json),
        QuestSubcommand::Tree { slug } => print_tree(root, &slug, json),
    }
}

fn create(root: &Path, slug: &str, title: &str, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("run `quest init` first")?;
    let quest = Quest::create(root, slug, &config.project, title)?;

    if json {
        print_json(&quest)?;
    } else {
        println!("Created quest '{slug}': {title}");
    }
    Ok(())
}

fn list(root: &Path, json: bool) -> anyhow::Result<()> {
    let quests = Quest::list(root)?;
    if json {
        print_json(&quests)?;
        return Ok(());
    }

    let rows = quests
        .iter()
        .map(|q| {
            vec![
                q.slug.clone(),
                q.status.to_string(),
                q.total_tickets.to_string(),
                q.title.clone(),
            ]
        })
        .collect();
    print_table(&["SLUG", "STATUS", "TICKETS", "TITLE"], rows);
    Ok(())
}

fn show(root: &Path, slug: &str, json: bool) -> anyhow::Result<()> {
    let quest = Quest::load(root, slug)?;
    if json {
        print_json(&quest)?;
    } else {
        println!("{slug}: {}", quest.title);
        println!("  project:  {}", quest.project);
        println!("  status:   {}", quest.status);
        println!("  tickets:  {} total, {} completed", quest.total_tickets, quest.completed_tickets);
        if let Some(current) = &quest.current_ticket_id {
            println!("  current:  {current}");
        }
    }
    Ok(())
}

fn print_tree(root: &Path, slug: &str, json: bool) -> anyhow::Result<()> {
    Quest::load(root, slug)?;
    let store = YamlTicketStore::new(root, slug);
    let forest = tree::build_forest(store.list()?);

    if json {
        print_json(&forest)?;
        return Ok(());
    }
    for node in &forest {
        print_node(node, 0);
    }
    Ok(())
}

fn print_node(node: &TicketNode, depth: usize) {
    let t = &node.ticket;
    let indent = "  ".repeat(depth);
    println!(
        "{indent}{} [{}] {} ({})",
        t.id,
        t.ticket_type.as_str(),
        t.title,
        t.status.as_str()
    );
    for child in &node.children {
        print_node(child, depth + 1);
    }
}
