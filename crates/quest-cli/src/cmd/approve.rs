use crate::output::print_json;
use quest_core::approval;
use quest_core::quest::Quest;
use quest_core::store::YamlTicketStore;
use std::path::Path;

pub fn run(
    root: &Path,
    quest_slug: &str,
    ticket_id: &str,
    approved_by: Option<&str>,
    cascade: bool,
    json: bool,
) -> anyhow::Result<()> {
    Quest::load(root, quest_slug)?;
    let mut store = YamlTicketStore::new(root, quest_slug);

    let summary = approval::approve(&mut store, ticket_id, approved_by, cascade)?;

    if json {
        print_json(&summary)?;
        return Ok(());
    }
    println!("Approved {} ticket(s)", summary.approved.len());
    for id in &summary.approved {
        println!("  {id}");
    }
    if !summary.untouched.is_empty() {
        println!("Left untouched (not pending):");
        for id in &summary.untouched {
            println!("  {id}");
        }
    }
    Ok(())
}
