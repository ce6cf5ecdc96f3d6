//! # Aisle Node Entry Point
//!
//! Runs one basket session. The shared channel lives in-process, and stdin
//! plays the part of the basket's firmware (see [`console`]).
//!
//! ## Startup Sequence
//! 1. Initialize tracing (logging)
//! 2. Load configuration (defaults → aisle.toml → AISLE_* env)
//! 3. Connect to the database & run migrations (optionally seed the catalog)
//! 4. Start the basket agent (customer, saved basket, intake tasks)
//! 5. Read console commands until `quit`, EOF or Ctrl-C
//! 6. Shut the agent down and close the database
//!
//! ## Usage
//! ```bash
//! cargo run -p aisle-node -- --seed
//! cargo run -p aisle-node -- --config ./aisle.toml --db ./aisle_dev.db
//! RUST_LOG=aisle=trace cargo run -p aisle-node
//! ```

mod console;

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use aisle_db::catalog::seed_demo_catalog;
use aisle_db::{Database, DbConfig};
use aisle_sync::{
    AisleConfig, BasketAgent, InMemoryChannel, SharedChannel, Stores, Transition,
    TransitionOutcome,
};

use crate::console::{ConsoleCommand, HELP};

/// Command-line options.
#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    db: Option<PathBuf>,
    seed: bool,
}

fn parse_args() -> Result<Option<Args>, String> {
    let mut args = Args::default();
    let mut iter = std::env::args().skip(1);

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                args.config = Some(iter.next().ok_or("--config needs a path")?.into());
            }
            "--db" | "-d" => {
                args.db = Some(iter.next().ok_or("--db needs a path")?.into());
            }
            "--seed" => args.seed = true,
            "--help" | "-h" => {
                println!("Aisle Node");
                println!();
                println!("Usage: aisle-node [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --config <PATH>  Config file (default: platform config dir)");
                println!("  -d, --db <PATH>      Database file (overrides config)");
                println!("      --seed           Load the demo catalog if it is empty");
                println!("  -h, --help           Show this help message");
                return Ok(None);
            }
            other => return Err(format!("unknown argument '{other}'")),
        }
    }

    Ok(Some(args))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let Some(args) = parse_args()? else {
        return Ok(());
    };

    let mut config = AisleConfig::load(args.config)?;
    if let Some(db) = args.db {
        config.database.path = Some(db);
    }

    let db_path = config
        .database_path()
        .ok_or("no database path configured and no platform data directory")?;
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db = Database::new(DbConfig::new(&db_path)).await?;
    info!(path = %db_path.display(), "Database ready");

    if args.seed {
        let written = seed_demo_catalog(&db).await?;
        info!(written, "Demo catalog seeded");
    }

    let channel = Arc::new(InMemoryChannel::from_settings(&config.channel));
    let mut agent = BasketAgent::new(config, channel.clone(), Stores::sqlite(db.clone()));
    agent.start().await?;

    if let Some(customer) = agent.customer() {
        println!(
            "Basket ready for {} ({}). Type 'help' for commands.",
            customer.full_name,
            customer.customer_id.as_deref().unwrap_or("guest")
        );
    }

    tokio::select! {
        _ = run_console(&agent, channel.as_ref()) => {}
        _ = shutdown_signal() => {}
    }

    agent.shutdown().await?;
    db.close().await;
    info!("Node shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=aisle=trace` - Show trace for aisle crates only
/// - Default: INFO, DEBUG for aisle crates
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,aisle=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Reads stdin on a plain thread so a blocked read never holds up shutdown.
fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.blocking_send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    error!(error = %e, "Failed to read stdin");
                    break;
                }
            }
        }
        debug!("Stdin reader finished");
    });
    rx
}

/// Reads console commands until `quit` or EOF.
async fn run_console(agent: &BasketAgent, channel: &InMemoryChannel) {
    let mut lines = spawn_stdin_reader();

    while let Some(line) = lines.recv().await {
        let command = match ConsoleCommand::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                println!("{message}");
                continue;
            }
        };

        if command == ConsoleCommand::Quit {
            break;
        }

        if let Err(e) = execute(agent, channel, command).await {
            warn!(error = %e, "Console command failed");
            println!("error: {e}");
        }
    }
}

async fn execute(
    agent: &BasketAgent,
    channel: &InMemoryChannel,
    command: ConsoleCommand,
) -> Result<(), Box<dyn std::error::Error>> {
    let key = |name: &str| agent.bus().raw_key(name);

    match command {
        ConsoleCommand::Set { key: name, value } => {
            channel.write(&key(&name), value).await?;
        }
        ConsoleCommand::Get { key: name } => {
            let value = channel.read(&key(&name)).await?.unwrap_or(Value::Null);
            println!("{name} = {value}");
        }
        ConsoleCommand::Dump => {
            for (key, value) in channel.dump()? {
                println!("{key} = {value}");
            }
        }
        ConsoleCommand::Scan(payload) => agent.submit_scan(payload).await?,
        ConsoleCommand::Drive(motion) => agent.drive(motion).await?,
        ConsoleCommand::Cart => {
            let snapshot = agent.coordinator()?.snapshot().await?;
            if snapshot.cart.is_empty() {
                println!("(empty basket)");
            }
            for item in &snapshot.cart.items {
                println!(
                    "  {:<4} {:<28} x{:<3} {:>8}",
                    item.id,
                    item.title,
                    item.quantity,
                    item.line_total()?.to_string()
                );
            }
            println!(
                "  subtotal {}  expected {:.2} g",
                snapshot.cart.subtotal()?,
                snapshot.expected_grams
            );
        }
        ConsoleCommand::Checkout => {
            match agent.coordinator()?.apply(Transition::Checkout).await? {
                TransitionOutcome::OrderPlaced(order) => println!(
                    "order {} for {}: total {} (scale {:.2} g, expected {:.2} g)",
                    order.order_number,
                    order.customer_id,
                    order.total(),
                    order.weight_validation.actual_weight,
                    order.weight_validation.cart_weight
                ),
                other => println!("{other:?}"),
            }
        }
        ConsoleCommand::Resync => {
            agent.coordinator()?.resync().await?;
            println!("resynced");
        }
        ConsoleCommand::Help => println!("{HELP}"),
        ConsoleCommand::Quit => {}
    }

    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, stopping basket");
}
