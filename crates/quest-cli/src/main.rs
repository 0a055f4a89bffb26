mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{quest::QuestSubcommand, session::SessionSubcommand, ticket::TicketSubcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "quest",
    about = "Ticket hierarchy and implementation orchestration — plan, approve, and drive work to done",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .quests/ or .git/)
    #[arg(long, global = true, env = "QUEST_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize ticket tracking in the current project
    Init {
        /// Project name, used as the prefix for tracked task keys
        project: String,
    },

    /// Manage quests
    Quest {
        #[command(subcommand)]
        subcommand: QuestSubcommand,
    },

    /// Manage tickets
    Ticket {
        #[command(subcommand)]
        subcommand: TicketSubcommand,
    },

    /// Approve a ticket, optionally cascading to pending descendants
    Approve {
        quest: String,
        ticket_id: String,
        /// Approver identity recorded on the ticket
        #[arg(long = "by")]
        approved_by: Option<String>,
        /// Also approve every pending descendant
        #[arg(long)]
        cascade: bool,
    },

    /// Group a quest's tickets into sprints
    Plan {
        quest: String,
        /// Strategy: balanced, priority_first, dependency_aware
        #[arg(long)]
        strategy: Option<String>,
        /// Override the configured story-point cap per sprint
        #[arg(long)]
        max_points: Option<u32>,
        /// Override the configured ticket-count cap per sprint
        #[arg(long)]
        max_tickets: Option<usize>,
        /// Compute the plan without writing sprint groups
        #[arg(long)]
        dry_run: bool,
    },

    /// Run an implementation session over the approved backlog
    Session {
        #[command(subcommand)]
        subcommand: SessionSubcommand,
    },

    /// Materialize approved tickets as tracked external tasks
    Finalize {
        quest: String,
        /// Also create a sprint container and assign tasks to it
        #[arg(long)]
        sprint: bool,
        /// Sprint container name (default: "<quest title> Sprint")
        #[arg(long)]
        sprint_name: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .init();

    let root_path = cli.root.as_deref();
    let root = root::resolve_root(root_path);

    let result = match cli.command {
        Commands::Init { project } => cmd::init::run(&root, &project, cli.json),
        Commands::Quest { subcommand } => cmd::quest::run(&root, subcommand, cli.json),
        Commands::Ticket { subcommand } => cmd::ticket::run(&root, subcommand, cli.json),
        Commands::Approve {
            quest,
            ticket_id,
            approved_by,
            cascade,
        } => cmd::approve::run(
            &root,
            &quest,
            &ticket_id,
            approved_by.as_deref(),
            cascade,
            cli.json,
        ),
        Commands::Plan {
            quest,
            strategy,
            max_points,
            max_tickets,
            dry_run,
        } => cmd::plan::run(
            &root,
            &quest,
            strategy.as_deref(),
            max_points,
            max_tickets,
            dry_run,
            cli.json,
        ),
        Commands::Session { subcommand } => cmd::session::run(&root, subcommand, cli.json),
        Commands::Finalize {
            quest,
            sprint,
            sprint_name,
        } => cmd::finalize::run(&root, &quest, sprint, sprint_name.as_deref(), cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
