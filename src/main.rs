use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mindful::analysis::{analyze_content, format_report};
use mindful::config::Config;
use mindful::db::Database;
use mindful::graph::{tree_render, GoalGraph, GraphPresenter};
use mindful::meditation::{format_clock, MeditationTimer, TimerEvent};
use mindful::models::*;
use mindful::{api, export};

#[derive(Parser)]
#[command(name = "mindful")]
#[command(about = "Goal graph, tasks, journal and guided meditation")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Port for HTTP API (overrides MINDFUL_PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// Bind address (overrides MINDFUL_HOST)
        #[arg(long)]
        host: Option<String>,
    },
    /// Work with the goal graph
    Goal {
        #[command(subcommand)]
        command: GoalCommand,
    },
    /// Manage tasks
    Task {
        #[command(subcommand)]
        command: TaskCommand,
    },
    /// Read and write journal entries
    Journal {
        #[command(subcommand)]
        command: JournalCommand,
    },
    /// Save and list self-analysis forms
    Analysis {
        #[command(subcommand)]
        command: AnalysisCommand,
    },
    /// Run the guided meditation timer in the terminal
    Meditate {
        /// Tick every 10ms instead of every second
        #[arg(long)]
        fast: bool,
    },
}

#[derive(Subcommand)]
enum GoalCommand {
    /// Add a goal, optionally under an existing parent
    Add {
        id: String,
        description: String,
        #[arg(short, long, value_parser = parse_category, default_value = "personal")]
        category: Category,
        #[arg(short, long)]
        parent: Option<String>,
    },
    /// Link two goals (source -> target)
    Link { source: String, target: String },
    /// Remove the link source -> target
    Unlink { source: String, target: String },
    /// Change a goal's description or category
    Edit {
        id: String,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(short, long, value_parser = parse_category)]
        category: Option<Category>,
    },
    /// Remove a goal
    Remove {
        id: String,
        /// Also remove every goal reachable below it
        #[arg(long)]
        cascade: bool,
    },
    /// List all goals
    List,
    /// Find goals by id or description
    Search { query: String },
    /// Show one goal and its connections
    Show { id: String },
    /// Print the graph as a tree
    Tree,
    /// Write the graph to a JSON file
    Export { path: Option<PathBuf> },
    /// Replace the graph with one read from a JSON file
    Import { path: Option<PathBuf> },
    /// Replace the graph with the built-in example
    Example,
    /// Remove every goal and link
    Clear,
}

#[derive(Subcommand)]
enum TaskCommand {
    /// Add a task
    Add {
        text: String,
        #[arg(short, long, value_parser = parse_priority)]
        priority: Option<Priority>,
        #[arg(short, long)]
        goal: Option<String>,
        /// Reactivate every day after completion
        #[arg(long)]
        daily: bool,
    },
    /// Show active and completed tasks
    List,
    /// Mark a task completed
    Done { id: String },
    /// Move a completed task back to active
    Undone { id: String },
    /// Edit a task
    Edit {
        id: String,
        #[arg(short, long)]
        text: Option<String>,
        #[arg(short, long, value_parser = parse_priority)]
        priority: Option<Priority>,
        /// Goal id; pass an empty string to unlink
        #[arg(short, long)]
        goal: Option<String>,
        #[arg(long)]
        daily: Option<bool>,
    },
    /// Delete a task (undoable once)
    Remove { id: String },
    /// Restore the last deleted task
    Undo,
    /// Reactivate daily tasks completed before today
    ResetDaily,
    /// Delete all completed tasks
    ClearCompleted,
}

#[derive(Subcommand)]
enum JournalCommand {
    /// List entries, most recent first
    List {
        /// Only entries of this type ("all" for any)
        #[arg(short = 't', long = "type")]
        entry_type: Option<String>,
        /// Case-insensitive text to look for in the content
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Word, sentence and tone statistics for an entry
    Stats { id: String },
    /// Write a new entry, or overwrite one with --id
    Write {
        content: String,
        #[arg(short = 't', long = "type")]
        entry_type: Option<String>,
        #[arg(long)]
        id: Option<String>,
    },
    /// Print one entry
    Show { id: String },
    /// Delete an entry
    Remove { id: String },
}

#[derive(Subcommand)]
enum AnalysisCommand {
    /// List saved analyses, optionally for one journal entry
    List {
        #[arg(short, long)]
        entry: Option<String>,
    },
    /// Save an analysis of a journal entry; answers are given as key=answer
    ///
    /// The six-step form uses the keys facts, judgment, intent, action,
    /// outcome, gap, global_label, skill_deficit, plan and conclusion.
    Add {
        title: String,
        #[arg(short, long)]
        entry: String,
        #[arg(short, long = "answer")]
        answers: Vec<String>,
    },
    /// Print an analysis as a text report, or write it to a file
    Report {
        id: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn parse_category(s: &str) -> Result<Category, String> {
    Category::from_str(s).ok_or_else(|| {
        let names: Vec<&str> = Category::ALL.iter().map(|c| c.as_str()).collect();
        format!("unknown category '{}' (expected one of: {})", s, names.join(", "))
    })
}

fn parse_priority(s: &str) -> Result<Priority, String> {
    Priority::from_str(s).ok_or_else(|| format!("unknown priority '{}' (low, medium, high)", s))
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "mindful=debug,tower_http=debug".into()),
    );

    // stdout carries command output; logs go to stderr
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn open_database(config: &Config) -> anyhow::Result<Database> {
    let db = Database::open(config.database_path())?;
    db.migrate()?;
    Ok(db)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = Config::from_env()?;

    match cli.command {
        Some(Commands::Serve { port, host }) => {
            let config = Config {
                port: port.unwrap_or(config.port),
                host: host.unwrap_or(config.host),
                ..config
            };
            serve(&config).await?;
        }
        Some(Commands::Goal { command }) => run_goal(&config, command)?,
        Some(Commands::Task { command }) => run_task(&config, command)?,
        Some(Commands::Journal { command }) => run_journal(&config, command)?,
        Some(Commands::Analysis { command }) => run_analysis(&config, command)?,
        Some(Commands::Meditate { fast }) => meditate(fast).await?,
        None => serve(&config).await?,
    }

    Ok(())
}

async fn serve(config: &Config) -> anyhow::Result<()> {
    tracing::info!("Starting Mindful server on {}", config.bind_addr());

    let db = open_database(config)?;
    let app = api::create_router(db)?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    tracing::info!("Mindful server listening on http://{}", config.bind_addr());

    axum::serve(listener, app).await?;
    Ok(())
}

// ============================================================
// Goals
// ============================================================

fn run_goal(config: &Config, command: GoalCommand) -> anyhow::Result<()> {
    let db = open_database(config)?;
    let mut graph = db.load_goal_graph()?;

    match command {
        GoalCommand::Add {
            id,
            description,
            category,
            parent,
        } => {
            let id = id.trim();
            let parent = parent.as_deref().map(str::trim).filter(|p| !p.is_empty());
            if let Some(parent) = parent {
                if !graph.contains(parent) {
                    bail!("Parent goal \"{}\" not found", parent);
                }
            }
            graph.try_add_node(id, description.trim(), category)?;
            if let Some(parent) = parent {
                graph.try_add_link(parent, id)?;
            }
            db.save_graph(&graph)?;
            println!("Added goal {}", id);
        }
        GoalCommand::Link { source, target } => {
            graph.try_add_link(&source, &target)?;
            db.save_graph(&graph)?;
            println!("Linked {} -> {}", source, target);
        }
        GoalCommand::Unlink { source, target } => {
            graph.try_remove_link(&source, &target)?;
            db.save_graph(&graph)?;
            println!("Unlinked {} -> {}", source, target);
        }
        GoalCommand::Edit {
            id,
            description,
            category,
        } => {
            let existing = graph
                .get_node(&id)
                .cloned()
                .with_context(|| format!("Goal \"{}\" not found", id))?;
            graph.try_update_node(
                &id,
                description.as_deref().unwrap_or(&existing.description),
                category.unwrap_or(existing.category),
            )?;
            db.save_graph(&graph)?;
            println!("Updated goal {}", id);
        }
        GoalCommand::Remove { id, cascade } => {
            if !graph.contains(&id) {
                bail!("Goal \"{}\" not found", id);
            }
            let doomed = if cascade {
                graph.subtree_preorder(&id)
            } else {
                vec![id]
            };
            let mut removed_tasks = 0;
            for goal_id in &doomed {
                if graph.remove_node(goal_id) {
                    removed_tasks += db.delete_tasks_for_goal(goal_id)?;
                    println!("Removed goal {}", goal_id);
                }
            }
            db.save_graph(&graph)?;
            if removed_tasks > 0 {
                println!("Removed {} linked task(s)", removed_tasks);
            }
        }
        GoalCommand::List => print_goals(graph.all_nodes()),
        GoalCommand::Search { query } => print_goals(graph.search(&query)),
        GoalCommand::Show { id } => {
            let info = GraphPresenter::new(&graph)
                .node_info(&id)
                .with_context(|| format!("Goal \"{}\" not found", id))?;
            println!("{}", info.id);
            println!("  {}", info.description);
            println!("  Category: {}", info.category);
            println!("  {}", info.connections);
            for task in db.get_tasks_for_goal(&id)? {
                println!("  - [{}] {}", task.status.as_str(), task.text);
            }
        }
        GoalCommand::Tree => print!("{}", tree_render::render_graph(&graph)),
        GoalCommand::Export { path } => {
            let path = path.unwrap_or_else(|| config.export_path());
            export::write_export(&graph, &path)?;
            println!("Exported {} goals to {}", graph.len(), path.display());
        }
        GoalCommand::Import { path } => {
            let path = path.unwrap_or_else(|| config.export_path());
            graph = export::read_import(&path)?;
            db.save_graph(&graph)?;
            println!("Imported {} goals from {}", graph.len(), path.display());
        }
        GoalCommand::Example => {
            graph = GoalGraph::example();
            db.save_graph(&graph)?;
            println!("Loaded example graph with {} goals", graph.len());
        }
        GoalCommand::Clear => {
            graph.clear();
            db.save_graph(&graph)?;
            println!("Cleared all goals");
        }
    }

    Ok(())
}

fn print_goals(nodes: Vec<&GoalNode>) {
    if nodes.is_empty() {
        println!("No goals found");
        return;
    }
    for node in nodes {
        println!(
            "{:<24} {:<10} {}",
            node.id,
            node.category.as_str(),
            node.description
        );
    }
}

// ============================================================
// Tasks
// ============================================================

fn run_task(config: &Config, command: TaskCommand) -> anyhow::Result<()> {
    let db = open_database(config)?;

    match command {
        TaskCommand::Add {
            text,
            priority,
            goal,
            daily,
        } => {
            if let Some(goal) = goal.as_deref() {
                if !db.load_goal_graph()?.contains(goal) {
                    bail!("Goal \"{}\" not found", goal);
                }
            }
            let task = db.create_task(CreateTaskInput {
                text,
                priority,
                goal_id: goal,
                is_daily: daily,
            })?;
            println!("Added task {}", task.id);
        }
        TaskCommand::List => {
            let lists = db.get_task_lists()?;
            println!("Active:");
            print_tasks(&lists.active);
            println!("Completed:");
            print_tasks(&lists.completed);
        }
        TaskCommand::Done { id } => {
            db.complete_task(&id)?
                .with_context(|| format!("No active task \"{}\"", id))?;
            println!("Completed {}", id);
        }
        TaskCommand::Undone { id } => {
            db.reactivate_task(&id)?
                .with_context(|| format!("No completed task \"{}\"", id))?;
            println!("Reactivated {}", id);
        }
        TaskCommand::Edit {
            id,
            text,
            priority,
            goal,
            daily,
        } => {
            db.update_task(
                &id,
                UpdateTaskInput {
                    text,
                    priority,
                    goal_id: goal,
                    is_daily: daily,
                },
            )?
            .with_context(|| format!("Task \"{}\" not found", id))?;
            println!("Updated {}", id);
        }
        TaskCommand::Remove { id } => {
            if !db.delete_task(&id)? {
                bail!("Task \"{}\" not found", id);
            }
            println!("Removed {} (run `mindful task undo` to restore)", id);
        }
        TaskCommand::Undo => match db.undo_delete_task()? {
            Some(task) => println!("Restored {}", task.id),
            None => println!("Nothing to undo"),
        },
        TaskCommand::ResetDaily => {
            let reset = db.reset_daily_tasks(chrono::Utc::now().date_naive())?;
            println!("Reset {} daily task(s)", reset);
        }
        TaskCommand::ClearCompleted => {
            let removed = db.clear_completed_tasks()?;
            println!("Removed {} completed task(s)", removed);
        }
    }

    Ok(())
}

fn print_tasks(tasks: &[Task]) {
    if tasks.is_empty() {
        println!("  (none)");
        return;
    }
    for task in tasks {
        let daily = if task.is_daily { " [daily]" } else { "" };
        let goal = task
            .goal_id
            .as_deref()
            .map(|g| format!(" -> {}", g))
            .unwrap_or_default();
        println!(
            "  {} [{}] {}{}{}",
            task.id,
            task.priority.as_str(),
            task.text,
            daily,
            goal
        );
    }
}

// ============================================================
// Journal and analysis
// ============================================================

fn run_journal(config: &Config, command: JournalCommand) -> anyhow::Result<()> {
    let db = open_database(config)?;

    match command {
        JournalCommand::List { entry_type, search } => {
            let entries = db.get_journal_entries(&JournalFilter {
                entry_type,
                q: search,
            })?;
            if entries.is_empty() {
                println!("No journal entries");
            }
            for entry in entries {
                let first_line = entry.content.lines().next().unwrap_or_default();
                println!(
                    "{} {} [{}] {}",
                    entry.id,
                    entry.updated_at.format("%Y-%m-%d %H:%M"),
                    entry.entry_type,
                    first_line
                );
            }
        }
        JournalCommand::Write {
            content,
            entry_type,
            id,
        } => {
            let entry = db.save_journal_entry(SaveJournalEntryInput {
                id,
                entry_type,
                content,
            })?;
            println!("Saved journal entry {}", entry.id);
        }
        JournalCommand::Stats { id } => {
            let entry = db
                .get_journal_entry(&id)?
                .with_context(|| format!("Journal entry \"{}\" not found", id))?;
            let stats = analyze_content(&entry.content);
            println!("Words:          {}", stats.word_count);
            println!("Sentences:      {}", stats.sentence_count);
            println!("Paragraphs:     {}", stats.paragraph_count);
            println!("Avg. sentence:  {:.1} words", stats.avg_sentence_length);
            println!("Reading time:   {} min", stats.reading_time_minutes);
            println!(
                "Sentiment:      {} (+{} / -{})",
                stats.sentiment.as_str(),
                stats.positive_words,
                stats.negative_words
            );
        }
        JournalCommand::Show { id } => {
            let entry = db
                .get_journal_entry(&id)?
                .with_context(|| format!("Journal entry \"{}\" not found", id))?;
            println!(
                "[{}] {}\n\n{}",
                entry.entry_type,
                entry.created_at.format("%Y-%m-%d %H:%M"),
                entry.content
            );
        }
        JournalCommand::Remove { id } => {
            if !db.delete_journal_entry(&id)? {
                bail!("Journal entry \"{}\" not found", id);
            }
            println!("Removed journal entry {}", id);
        }
    }

    Ok(())
}

fn run_analysis(config: &Config, command: AnalysisCommand) -> anyhow::Result<()> {
    let db = open_database(config)?;

    match command {
        AnalysisCommand::List { entry } => {
            let analyses = match entry.as_deref() {
                Some(entry_id) => db.get_analyses_for_entry(entry_id)?,
                None => db.get_analyses()?,
            };
            for entry in analyses {
                println!(
                    "{} {} {} (entry {})",
                    entry.id,
                    entry.created_at.format("%Y-%m-%d"),
                    entry.title,
                    entry.entry_id.as_deref().unwrap_or("-")
                );
                for (question, answer) in &entry.answers {
                    println!("  {}: {}", question, answer);
                }
            }
        }
        AnalysisCommand::Add {
            title,
            entry,
            answers,
        } => {
            let mut parsed = BTreeMap::new();
            for pair in answers {
                let (question, answer) = pair
                    .split_once('=')
                    .with_context(|| format!("Expected question=answer, got \"{}\"", pair))?;
                parsed.insert(question.trim().to_string(), answer.trim().to_string());
            }
            let analysis = db.create_analysis(CreateAnalysisInput {
                title,
                entry_id: entry,
                answers: parsed,
            })?;
            println!("Saved analysis {}", analysis.id);
        }
        AnalysisCommand::Report { id, output } => {
            let analysis = db
                .get_analysis(&id)?
                .with_context(|| format!("Analysis \"{}\" not found", id))?;
            let entry = match analysis.entry_id.as_deref() {
                Some(entry_id) => db.get_journal_entry(entry_id)?,
                None => None,
            };
            let report = format_report(&analysis, entry.as_ref());
            match output {
                Some(path) => {
                    std::fs::write(&path, report)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("Wrote report to {}", path.display());
                }
                None => print!("{}", report),
            }
        }
    }

    Ok(())
}

// ============================================================
// Meditation
// ============================================================

async fn meditate(fast: bool) -> anyhow::Result<()> {
    let period = if fast {
        Duration::from_millis(10)
    } else {
        Duration::from_secs(1)
    };

    let mut timer = MeditationTimer::default();
    let mut interval = tokio::time::interval(period);
    // The first tick fires immediately.
    interval.tick().await;
    let mut stdout = std::io::stdout();

    println!(
        "Identity transformation meditation ({}). Ctrl-C to stop.",
        format_clock(timer.total_duration())
    );

    let mut event = timer.start();
    loop {
        match event {
            TimerEvent::SectionChanged { section, cue } => {
                let current = &timer.sections()[section];
                tracing::debug!("Section {} begins, cue {}", section, cue.as_str());
                // Terminal bell stands in for the audio cue.
                print!(
                    "\x07\n== {} ({}) ==\n{}\n",
                    current.name,
                    format_clock(current.duration_secs),
                    current.description
                );
            }
            TimerEvent::Tick { remaining, .. } => {
                print!(
                    "\r  {} remaining   total {} / {}",
                    format_clock(remaining),
                    format_clock(timer.elapsed()),
                    format_clock(timer.total_duration())
                );
            }
            TimerEvent::Finished => {
                println!("\x07\nMeditation complete.");
                break;
            }
            TimerEvent::Idle => break,
        }
        stdout.flush()?;

        tokio::select! {
            _ = interval.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                timer.stop();
                println!("\nStopped.");
                break;
            }
        }
        event = timer.tick();
    }

    Ok(())
}
