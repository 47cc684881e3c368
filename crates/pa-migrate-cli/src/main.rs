//! pa-migrate CLI - Planning Analytics object and data migration.

use clap::{Parser, Subcommand};
use pa_migrate::{
    Config, ElementFilter, MigrateError, ObjectKind, ObjectReference, Orchestrator, TransferStats,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "pa-migrate")]
#[command(about = "Migrate objects and data between Planning Analytics environments")]
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
    /// Migrate the configured objects, or the ones given with --object
    Migrate {
        /// Object to migrate as KIND:NAME, e.g. cube:Sales (repeatable)
        #[arg(long = "object", value_name = "KIND:NAME")]
        objects: Vec<ObjectReference>,

        /// Also copy cube cell data
        #[arg(long)]
        data: bool,
    },

    /// Transfer one dimension with its attributes and subsets
    TransferDimension {
        /// Dimension name
        name: String,

        /// Do not copy public subsets
        #[arg(long)]
        no_subsets: bool,
    },

    /// Transfer one cube definition with its views
    TransferCube {
        /// Cube name
        name: String,

        /// Do not copy public views
        #[arg(long)]
        no_views: bool,

        /// Also copy cell data
        #[arg(long)]
        data: bool,
    },

    /// Transfer one process
    TransferProcess {
        /// Process name
        name: String,
    },

    /// Copy cell data of a cube that already exists on the target
    TransferData {
        /// Cube name
        cube: String,

        /// Restrict a dimension to elements and their descendants,
        /// as DIM=E1,E2 or DIM:HIERARCHY=E1 (repeatable)
        #[arg(long = "filter", value_name = "DIM=ELEMENTS", value_parser = parse_filter)]
        filters: Vec<(String, Vec<String>)>,

        /// Copy leaf cells only
        #[arg(long)]
        leaves_only: bool,
    },

    /// List objects on the source environment
    List {
        /// Only list objects of this kind (dimension, cube, process)
        #[arg(long)]
        kind: Option<ObjectKind>,

        /// Include internal objects that are never transferred
        #[arg(long)]
        all: bool,
    },

    /// Test connections to both environments
    HealthCheck,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), MigrateError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format)
        .map_err(|e| MigrateError::Config(e.to_string()))?;

    let config = Config::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);

    if let Commands::HealthCheck = cli.command {
        let health = Orchestrator::health_check(&config).await;
        if cli.output_json {
            println!("{}", health.to_json()?);
        } else {
            for (label, env) in [("Source", &health.source), ("Target", &health.target)] {
                match &env.error {
                    None => println!("{}: OK ({})", label, env.service_root),
                    Some(e) => println!("{}: FAILED ({}): {}", label, env.service_root, e),
                }
            }
        }
        if !health.healthy {
            return Err(MigrateError::connectivity(
                "environment",
                "connection test failed",
            ));
        }
        return Ok(());
    }

    let orchestrator = Orchestrator::new(config).await?;

    match cli.command {
        Commands::HealthCheck => unreachable!(), // Handled above
        Commands::Migrate { objects, data } => {
            let mut options = orchestrator.config().transfer_options();
            if data {
                options.include_data = true;
            }
            let result = if objects.is_empty() {
                orchestrator.run_with(&options).await?
            } else {
                orchestrator.migrate_with(&objects, &options).await
            };

            if cli.output_json {
                println!("{}", result.to_json()?);
            } else {
                println!("\n{}", result.message());
                println!("  Run ID: {}", result.run_id);
                println!("  Duration: {:.2}s", result.duration_seconds);
                println!(
                    "  Objects: {}/{} ({} skipped)",
                    result.items_transferred, result.items_total, result.items_skipped
                );
                println!("  Cells: {}", result.cells_written);
                for failure in &result.failures {
                    println!("  Failed {} {}: {}", failure.kind, failure.name, failure.reason);
                }
            }

            if !result.is_success() {
                return Err(MigrateError::transfer("migration", result.message()));
            }
        }
        Commands::TransferDimension { name, no_subsets } => {
            let stats = orchestrator
                .engine()
                .transfer_dimension(&name, !no_subsets)
                .await?;
            print_stats(&ObjectReference::dimension(name), &stats, cli.output_json)?;
        }
        Commands::TransferCube {
            name,
            no_views,
            data,
        } => {
            let stats = orchestrator
                .engine()
                .transfer_cube(&name, !no_views, data)
                .await?;
            print_stats(&ObjectReference::cube(name), &stats, cli.output_json)?;
        }
        Commands::TransferProcess { name } => {
            let stats = orchestrator.engine().transfer_process(&name).await?;
            print_stats(&ObjectReference::process(name), &stats, cli.output_json)?;
        }
        Commands::TransferData {
            cube,
            filters,
            leaves_only,
        } => {
            let filter: ElementFilter = filters.into_iter().collect();
            let engine = orchestrator.engine();
            let mut stats = engine.transfer_cube_leaves_data(&cube, &filter).await?;
            if !leaves_only {
                stats.merge(
                    &engine
                        .transfer_cube_consolidation_data(&cube, &filter)
                        .await?,
                );
            }
            print_stats(&ObjectReference::cube(cube), &stats, cli.output_json)?;
        }
        Commands::List { kind, all } => {
            let skip_rules = orchestrator.engine().skip_rules().clone();
            let objects: Vec<ObjectReference> = orchestrator
                .list_objects()
                .await?
                .into_iter()
                .filter(|o| kind.map_or(true, |k| o.kind == k))
                .filter(|o| all || !skip_rules.should_skip(o.kind, &o.name))
                .collect();

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&objects)?);
            } else {
                for object in &objects {
                    println!("{}\t{}", object.kind, object.name);
                }
            }
        }
    }

    Ok(())
}

fn print_stats(
    object: &ObjectReference,
    stats: &TransferStats,
    output_json: bool,
) -> Result<(), MigrateError> {
    if output_json {
        println!("{}", serde_json::to_string_pretty(stats)?);
    } else if stats.skipped {
        println!("Skipped internal {}", object);
    } else {
        println!("Transferred {}", object);
        println!("  Subsets: {}", stats.subsets);
        println!("  Views: {}", stats.views);
        println!(
            "  Queries: {} ({} failed)",
            stats.queries, stats.failed_queries
        );
        println!("  Cells: {}", stats.cells_written);
    }
    Ok(())
}

/// Parse `DIM=E1,E2` into a filter entry.
fn parse_filter(s: &str) -> Result<(String, Vec<String>), String> {
    let (dimension, elements) = s
        .split_once('=')
        .ok_or_else(|| format!("expected DIM=ELEMENTS, got '{}'", s))?;
    let elements: Vec<String> = elements
        .split(',')
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(str::to_string)
        .collect();
    if dimension.trim().is_empty() || elements.is_empty() {
        return Err(format!("expected DIM=ELEMENTS, got '{}'", s));
    }
    Ok((dimension.trim().to_string(), elements))
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
        .with_writer(std::io::stderr)
        .with_target(false);

    match format {
        "json" => subscriber.json().init(),
        "text" => subscriber.init(),
        other => return Err(format!("unknown log format '{}'", other)),
    }

    Ok(())
}
