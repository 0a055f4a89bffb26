use crate::output::{print_json, print_table};
use quest_core::config::Config;
use quest_core::oracle::{AdvisoryOracle, HttpOracle};
use quest_core::planner::{self, SprintConstraints};
use quest_core::quest::Quest;
use quest_core::store::{TicketRepository, YamlTicketStore};
use quest_core::types::SprintStrategy;
use std::path::Path;

#[allow(clippy::too_many_arguments)]
pub fn run(
    root: &Path,
    quest_slug: &str,
    strategy: Option<&str>,
    max_points: Option<u32>,
    max_tickets: Option<usize>,
    dry_run: bool,
    json: bool,
) -> anyhow::Result<()> {
    let config = Config::load(root)?;
    Quest::load(root, quest_slug)?;
    let mut store = YamlTicketStore::new(root, quest_slug);

    let strategy: SprintStrategy = match strategy {
        Some(s) => s.parse()?,
        None => config.planning.strategy,
    };
    let mut constraints: SprintConstraints = config.planning.constraints();
    if let Some(points) = max_points {
        constraints.max_points_per_sprint = points;
    }
    if let Some(tickets) = max_tickets {
        constraints.max_tickets_per_sprint = tickets;
    }

    let oracle = HttpOracle::from_config(&config.oracle)?;
    let tickets = store.list()?;
    let plan = planner::plan_sprints(
        &tickets,
        strategy,
        &constraints,
        oracle.as_ref().map(|o| o as &dyn AdvisoryOracle),
    );

    if !dry_run {
        let report = planner::apply_plan(&mut store, &plan);
        for err in &report.errors {
            tracing::warn!("failed to stamp sprint group: {err}");
        }
    }

    if json {
        print_json(&plan)?;
        return Ok(());
    }
    if plan.fallback_used {
        println!("Planned with the deterministic packer ({strategy} strategy).");
    } else {
        println!("Planned with oracle suggestions ({strategy} strategy).");
    }
    let rows = plan
        .sprints
        .iter()
        .map(|s| {
            vec![
                s.sprint_number.to_string(),
                s.ticket_ids.len().to_string(),
                s.total_points.to_string(),
                s.theme.clone().unwrap_or_default(),
                s.ticket_ids.join(", "),
            ]
        })
        .collect();
    print_table(&["SPRINT", "TICKETS", "POINTS", "THEME", "IDS"], rows);
    if dry_run {
        println!("(dry run: sprint groups not written)");
    }
    Ok(())
}
