use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use member_transfer::configure;
use member_transfer::db::{probe_pool, time_checkout, ConnectionPool, SqlitePool};
use member_transfer::logger::setup_logger;
use member_transfer::models::Member;
use member_transfer::repository::{MemberRepository, SqliteMemberRepository};
use member_transfer::transfer::{ConnectionGuard, TransferCoordinator, TransferPolicy};

#[derive(Parser)]
#[command(name = "member_transfer")]
#[command(about = "Atomic member-to-member transfers over a pooled SQLite database")]
struct Cli {
    /// Configuration file (defaults to config/config.yaml)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Override the pool's connection wait bound
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the member table
    Init,
    /// Insert a member
    Save {
        #[arg(long)]
        id: String,
        #[arg(long, default_value_t = 0)]
        balance: i64,
    },
    /// Print a member as JSON
    Show {
        #[arg(long)]
        id: String,
    },
    /// Transfer an amount between two members
    Transfer {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long)]
        amount: u64,
    },
    /// Check out connections until the pool runs dry, then return them all
    PoolProbe {
        #[arg(long, default_value_t = 7)]
        count: u32,
    },
    /// Compare opening a fresh connection against borrowing one from the pool
    ConnTime {
        #[arg(long, default_value_t = 5)]
        samples: u32,
    },
}

fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();

    // Load configuration
    let mut config = configure::load_config(cli.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(timeout_ms) = cli.timeout_ms {
        config.database.connection_timeout_ms = timeout_ms;
    }

    // Setup logger
    if let Err(e) = setup_logger(&config) {
        eprintln!("Failed to initialize logger: {}", e);
    }

    let pool = SqlitePool::open(&config.database)
        .context("Failed to open pool")?;
    let pool = Arc::new(pool);
    let repository = SqliteMemberRepository;

    match cli.command {
        Commands::Init => {
            pool.init_schema()?;
            println!("✅ Schema ready at {}", config.database.path);
        }
        Commands::Save { id, balance } => {
            let mut guard = ConnectionGuard::acquire(pool.as_ref())?;
            repository.save(guard.connection(), &Member::new(id.as_str(), balance))?;
            println!("✅ Saved {} with balance {}", id, balance);
        }
        Commands::Show { id } => {
            let mut guard = ConnectionGuard::acquire(pool.as_ref())?;
            let member = repository.find_by_id(guard.connection(), &id)?;
            println!("{}", serde_json::to_string_pretty(&member)?);
        }
        Commands::Transfer { from, to, amount } => {
            let policy = TransferPolicy::from_config(&config.transfer);
            let coordinator =
                TransferCoordinator::with_policy(Arc::clone(&pool), repository, policy);

            match coordinator.transfer(&from, &to, amount) {
                Ok(()) => println!("✅ Transferred {} from {} to {}", amount, from, to),
                Err(e) => return Err(anyhow!("❌ [{}] {}", e.error_code(), e)),
            }
        }
        Commands::PoolProbe { count } => pool_probe(pool.as_ref(), count),
        Commands::ConnTime { samples } => conn_time(pool.as_ref(), &config.database, samples)?,
    }

    Ok(())
}

fn pool_probe(pool: &SqlitePool, count: u32) {
    let report = probe_pool(pool, count);

    println!("acquired {} of {} connections", report.acquired, count);
    if let Some(e) = &report.exhausted {
        println!("❌ connection{} failed: {}", report.acquired + 1, e);
    }
    println!("Pool {} at peak: {:?}", pool.name(), report.peak);
    println!(
        "Pool {} after release: {:?}",
        pool.name(), report.after_release
    );
}

fn conn_time(pool: &SqlitePool, database: &configure::DatabaseConfig, samples: u32) -> Result<()> {
    let timings = time_checkout(pool, samples, || SqlitePool::open_direct(database))?;

    for (i, timing) in timings.iter().enumerate() {
        println!(
            "sample {}: direct {:.3}ms, pooled {:.3}ms",
            i + 1,
            timing.direct.as_secs_f64() * 1000.0,
            timing.pooled.as_secs_f64() * 1000.0
        );
    }
    Ok(())
}
