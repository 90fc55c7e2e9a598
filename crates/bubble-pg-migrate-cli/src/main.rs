//! bubble-pg-migrate CLI - Bubble.io to PostgreSQL entity migration.

use bubble_pg_migrate::{Config, EntityType, MigrateError, Migrator, DEPENDENCY_ORDER};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

/// Exit code when `--strict` is set and the run finished with failed records.
const EXIT_STRICT_FAILURES: u8 = 8;

#[derive(Parser)]
#[command(name = "bubble-pg-migrate")]
#[command(about = "Bubble.io to PostgreSQL entity migration")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Migrate entities from the source into PostgreSQL
    Run {
        /// Migrate only this entity type (default: all, in dependency order)
        #[arg(long)]
        entity: Option<String>,

        /// Override records per page fetch
        #[arg(long)]
        batch_size: Option<i64>,

        /// Dry run: count what would migrate without writing anything
        #[arg(long)]
        dry_run: bool,

        /// Exit non-zero if any record failed to migrate
        #[arg(long)]
        strict: bool,
    },

    /// Fill in foreign keys left unresolved by earlier runs
    Link,

    /// Show source record counts per entity type
    Count {
        /// Count only this entity type
        #[arg(long)]
        entity: Option<String>,
    },

    /// Test source API and database connections
    HealthCheck,

    /// Delete all mapping entries for one entity type
    Reset {
        /// Entity type to reset
        entity: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<ExitCode, MigrateError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format)
        .map_err(MigrateError::Config)?;

    let mut config = Config::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);

    // Signal handling for graceful shutdown (SIGINT and SIGTERM)
    let cancel_token = setup_signal_handler()?;

    match cli.command {
        Commands::Run {
            entity,
            batch_size,
            dry_run,
            strict,
        } => {
            // Apply overrides
            if let Some(batch) = batch_size {
                config.migration.batch_size = Some(batch);
            }
            if dry_run {
                config.migration.dry_run = true;
            }
            if strict {
                config.migration.strict = true;
            }

            let migrator = Migrator::connect(&config).await?;

            let (failed, json) = match entity {
                Some(name) => {
                    let entity = EntityType::parse(&name)?;
                    let stats = migrator.run_entity(entity, &cancel_token).await?;
                    if !cli.output_json {
                        println!("\n{}: {}", entity, stats);
                    }
                    (stats.failed, serde_json::to_string_pretty(&stats)?)
                }
                None => {
                    let report = migrator.run_all(&cancel_token).await?;
                    if !cli.output_json {
                        let status = if report.dry_run {
                            "Dry run completed!"
                        } else {
                            "Migration completed!"
                        };
                        println!("\n{}", status);
                        println!("  Duration: {:.2}s", report.duration_seconds);
                        for e in &report.entities {
                            println!("  {}: {}", e.entity, e.stats);
                        }
                        println!(
                            "  Total: migrated {}, skipped {}, failed {}",
                            report.total_migrated(),
                            report.total_skipped(),
                            report.total_failed()
                        );
                    }
                    (report.total_failed(), report.to_json()?)
                }
            };

            if cli.output_json {
                println!("{}", json);
            }

            if cancel_token.is_cancelled() {
                return Err(MigrateError::Cancelled);
            }
            if config.migration.strict && failed > 0 {
                eprintln!("{} records failed (strict mode)", failed);
                return Ok(ExitCode::from(EXIT_STRICT_FAILURES));
            }
        }

        Commands::Link => {
            let migrator = Migrator::connect(&config).await?;
            let report = migrator.linker().link_all().await?;

            if cli.output_json {
                println!("{}", report.to_json()?);
            } else {
                println!("\nLinking completed!");
                for (entity, stats) in &report.entities {
                    println!(
                        "  {}: {} pending, {} linked, {} unresolved",
                        entity, stats.pending, stats.linked, stats.unresolved
                    );
                }
                println!(
                    "  Total: {} linked, {} unresolved",
                    report.total_linked(),
                    report.total_unresolved()
                );
            }
        }

        Commands::Count { entity } => {
            let migrator = Migrator::connect(&config).await?;
            let entities: Vec<EntityType> = match entity {
                Some(name) => vec![EntityType::parse(&name)?],
                None => DEPENDENCY_ORDER.to_vec(),
            };

            let mut counts = Vec::with_capacity(entities.len());
            for entity in entities {
                counts.push((entity, migrator.count(entity).await?));
            }

            if cli.output_json {
                let map: serde_json::Map<String, serde_json::Value> = counts
                    .iter()
                    .map(|(e, n)| (e.to_string(), serde_json::json!(n)))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&map)?);
            } else {
                println!("Source record counts:");
                for (entity, count) in counts {
                    println!("  {}: {}", entity, count);
                }
            }
        }

        Commands::HealthCheck => {
            let migrator = Migrator::connect(&config).await?;
            migrator.health_check().await?;
            println!("Health check passed");
        }

        Commands::Reset { entity } => {
            let entity = EntityType::parse(&entity)?;
            let migrator = Migrator::connect(&config).await?;
            let removed = migrator.reset_entity(entity).await?;
            println!("Removed {} mapping entries for '{}'", removed, entity);
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    Ok(())
}

/// Setup signal handlers for graceful shutdown. Handles both SIGINT (Ctrl-C)
/// and SIGTERM. The driver checks the returned token between batches, so the
/// mapping ledger stays consistent with whatever was written before the stop.
#[cfg(unix)]
fn setup_signal_handler() -> Result<CancellationToken, MigrateError> {
    let cancel_token = CancellationToken::new();

    let token_int = cancel_token.clone();
    let token_term = cancel_token.clone();

    tokio::spawn(async move {
        let mut sigint = signal(SignalKind::interrupt()).expect("Failed to setup SIGINT handler");
        sigint.recv().await;
        eprintln!("\nReceived SIGINT. Finishing current batch, then stopping...");
        token_int.cancel();
    });

    tokio::spawn(async move {
        let mut sigterm = signal(SignalKind::terminate()).expect("Failed to setup SIGTERM handler");
        sigterm.recv().await;
        eprintln!("\nReceived SIGTERM. Finishing current batch, then stopping...");
        token_term.cancel();
    });

    Ok(cancel_token)
}

/// Signal handler for non-unix platforms (only Ctrl-C).
#[cfg(not(unix))]
fn setup_signal_handler() -> Result<CancellationToken, MigrateError> {
    let cancel_token = CancellationToken::new();
    let token = cancel_token.clone();

    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to setup Ctrl-C handler");
        eprintln!("\nReceived Ctrl-C. Finishing current batch, then stopping...");
        token.cancel();
    });

    Ok(cancel_token)
}
