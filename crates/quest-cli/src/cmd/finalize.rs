use crate::output::print_json;
use quest_core::finalize;
use quest_core::quest::Quest;
use quest_core::store::YamlTicketStore;
use quest_core::tracker::{FileSequenceCounter, FileTracker};
use std::path::Path;

pub fn run(
    root: &Path,
    quest_slug: &str,
    with_sprint: bool,
    sprint_name: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let mut quest = Quest::load(root, quest_slug)?;
    let mut store = YamlTicketStore::new(root, quest_slug);
    let mut tracker = FileTracker::new(root);
    let mut counter = FileSequenceCounter::new(root);

    let report = finalize::finalize(
        &mut store,
        &mut quest,
        &mut tracker,
        &mut counter,
        with_sprint,
        sprint_name,
    )?;
    quest.save(root)?;

    if json {
        print_json(&report)?;
        return Ok(());
    }
    println!(
        "Finalized '{quest_slug}': {} task(s) created, {} skipped",
        report.created, report.skipped
    );
    if let Some(sprint) = &report.sprint_id {
        println!("Sprint container: {sprint}");
    }
    for err in &report.errors {
        println!("  failed: {err}");
    }
    Ok(())
}
