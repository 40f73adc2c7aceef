//! Dune Ledger
//!
//! Command line front end for the harvest run ledger.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rusqlite::Connection;
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

use dune_ledger::config::{DEFAULT_DATABASE, Settings, default_log_filter};
use dune_ledger::{
    CraftingCost, Distribution, Run, RunId, RunKind, RunLedger, RunStore, RunUpdate, Stations,
    calculator, db,
};

#[derive(Parser)]
#[command(name = "dune-ledger")]
#[command(about = "Harvest run ledger and refinery split calculator for Dune Awakening")]
struct Cli {
    /// Path to the SQLite database holding runs
    #[arg(short, long, env = "DUNE_LEDGER_DB", default_value = DEFAULT_DATABASE)]
    database: PathBuf,

    /// Acting user (defaults to the OS user)
    #[arg(short, long, env = "DUNE_LEDGER_USER")]
    user: Option<String>,

    /// Users allowed to delete any run
    #[arg(long = "admin", env = "DUNE_LEDGER_ADMINS", value_delimiter = ',')]
    admins: Vec<String>,

    /// Log lifecycle events
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct CraftArgs {
    /// Total Stravidium Mass collected
    mass: Decimal,

    /// Total Titanium Ore collected
    titanium: Decimal,

    /// Number of players sharing the output
    #[arg(short, long)]
    players: u32,

    /// Medium Chemical Refineries running in parallel
    #[arg(short, long, default_value = "1")]
    chem: u32,

    /// Apply the Landsraad -25% crafting cost bonus
    #[arg(long)]
    landsraad: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Spice Sand -> Melange split
    Spice {
        /// Total Spice Sand collected
        sand: Decimal,

        /// Number of players sharing the Melange
        #[arg(short, long)]
        players: u32,

        /// Spice refineries running in parallel
        #[arg(short = 'n', long, default_value = "1")]
        processors: u32,
    },

    /// Mass -> Fiber, splitting Fiber and Titanium Ore
    PlastRaw {
        #[command(flatten)]
        craft: CraftArgs,
    },

    /// Mass -> Fiber, then Fiber + Titanium -> Plastanium
    PlastCraft {
        #[command(flatten)]
        craft: CraftArgs,

        /// Large Ore Refineries running in parallel
        #[arg(short, long, default_value = "1")]
        large: u32,
    },

    /// Manage tracked runs
    #[command(subcommand)]
    Run(RunCommands),
}

#[derive(Subcommand)]
enum RunCommands {
    /// Start a run
    Create {
        /// spice | stravidium | plastanium
        kind: RunKind,

        /// Comma separated player names
        players: String,
    },

    /// Add a player or set an amount
    Update {
        id: RunId,

        /// players | spice | stravidium | plastanium | titanium | fiber
        field: String,

        /// Player name, for field=players
        #[arg(long)]
        value: Option<String>,

        /// New amount, for numeric fields
        #[arg(long)]
        amount: Option<String>,
    },

    /// Calculate the split for a run
    Calc {
        id: RunId,

        /// Spice or chemical refineries
        #[arg(short = 'n', long, default_value = "1")]
        processors: u32,

        /// Large Ore Refineries (plastanium runs)
        #[arg(short, long, default_value = "1")]
        large: u32,

        /// Apply the Landsraad -25% crafting cost bonus
        #[arg(long)]
        landsraad: bool,
    },

    /// Show a run
    View { id: RunId },

    /// List all runs
    List,

    /// Delete a run (creator or admin only)
    Delete { id: RunId },

    /// Delete every run (admin only)
    Clear,
}

fn cost(landsraad: bool) -> CraftingCost {
    if landsraad {
        CraftingCost::Landsraad
    } else {
        CraftingCost::Standard
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::resolve(cli.database, cli.user, cli.admins);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_log_filter(cli.verbose)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Spice {
            sand,
            players,
            processors,
        } => {
            let result = calculator::compute_spice(sand, players, processors)?;
            println!("{}", result);
        }

        Commands::PlastRaw { craft } => {
            let result = calculator::compute_stravidium_raw(
                craft.mass,
                craft.titanium,
                craft.players,
                craft.chem,
                cost(craft.landsraad),
            )?;
            println!("{}", result);
        }

        Commands::PlastCraft { craft, large } => {
            let result = calculator::compute_plastanium(
                craft.mass,
                craft.titanium,
                craft.players,
                large,
                craft.chem,
                cost(craft.landsraad),
            )?;
            println!("{}", result);
        }

        Commands::Run(command) => run_command(settings?, command)?,
    }

    Ok(())
}

fn run_command(settings: Settings, command: RunCommands) -> Result<()> {
    let conn = Connection::open(&settings.database)
        .with_context(|| format!("Failed to open {}", settings.database.display()))?;
    db::init_schema(&conn)?;

    let store = RunStore::new();
    let stats = db::load_into(&conn, &store)?;
    tracing::debug!("{}", stats);
    let ledger = RunLedger::with_store(store, Arc::new(settings.admins.clone()));
    let user = &settings.user;

    match command {
        RunCommands::Create { kind, players } => {
            let id = ledger.create_run(kind, user, &players)?;
            let run = ledger.view_run(id)?;
            db::save_run(&conn, &run)?;
            println!("Run created: {}", id);
            println!("Type: {}", run.kind);
            println!("Players: {}", run.players.join(", "));
        }

        RunCommands::Update {
            id,
            field,
            value,
            amount,
        } => {
            let update = RunUpdate::parse(&field, value.as_deref(), amount.as_deref())?;
            ledger.update_run(id, update)?;
            let run = ledger.view_run(id)?;
            db::save_run(&conn, &run)?;
            println!("Updated run {}", id);
            print_run(&run);
        }

        RunCommands::Calc {
            id,
            processors,
            large,
            landsraad,
        } => {
            let stations = Stations::new(processors)
                .with_large_refineries(large)
                .with_cost(cost(landsraad));
            let result = ledger.calculate_run(id, stations)?;
            let run = ledger.view_run(id)?;
            db::save_run(&conn, &run)?;
            println!("Run {} - {}", id, run.kind.as_str().to_uppercase());
            println!("Players ({}): {}", run.players.len(), run.players.join(", "));
            println!();
            print_distribution(&result);
        }

        RunCommands::View { id } => {
            let run = ledger.view_run(id)?;
            print_run(&run);
            if let Some(result) = &run.last_calculation {
                println!();
                println!("Last calculation:");
                print_distribution(result);
            }
        }

        RunCommands::List => {
            let runs = ledger.list_runs();
            if runs.is_empty() {
                println!("No runs. Use 'run create' first.");
            } else {
                println!("{:<6} {:<12} {:<16} {:>8}", "Run", "Type", "Creator", "Players");
                println!("{}", "-".repeat(45));
                for run in runs {
                    println!(
                        "{:<6} {:<12} {:<16} {:>8}",
                        run.id,
                        run.kind,
                        run.creator,
                        run.players.len()
                    );
                }
            }
        }

        RunCommands::Delete { id } => {
            ledger.delete_run(id, user)?;
            db::delete_run(&conn, id)?;
            println!("Deleted run {}", id);
        }

        RunCommands::Clear => {
            let removed = ledger.clear_runs(user)?;
            db::clear_runs(&conn)?;
            println!("Cleared {} runs", removed);
        }
    }

    Ok(())
}

fn print_run(run: &Run) {
    println!("Run {}", run.id);
    println!("  Type: {}", run.kind);
    println!("  Creator: {}", run.creator);
    println!("  Players ({}): {}", run.players.len(), run.players.join(", "));
    println!("  Amounts:");
    match run.kind {
        RunKind::Spice => println!("    spice sand: {}", run.sand),
        RunKind::Stravidium => {
            println!("    stravidium mass: {}", run.strav_mass);
            println!("    titanium ore: {}", run.titanium_ore);
        }
        RunKind::Plastanium => {
            println!("    stravidium mass: {}", run.strav_mass);
            println!("    titanium ore: {}", run.titanium_ore);
            println!("    stravidium fiber: {}", run.fiber);
        }
    }
}

fn print_distribution(result: &Distribution) {
    match result {
        Distribution::Spice(d) => println!("{}", d),
        Distribution::Stravidium(d) => println!("{}", d),
        Distribution::Plastanium(d) => println!("{}", d),
    }
}
