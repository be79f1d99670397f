//! hardness-core - Soil hardness association and reporting
//!
//! Imports penetrometer dumps, binds them to land ledgers and blocks, and
//! renders one 3D surface per ledger.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use clap::{Parser, Subcommand};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use hardness_common::config::{RootFolderInitializer, RootFolderResolver, TomlConfig};
use hardness_core::db::{self, masters};
use hardness_core::services::{
    generate_fields, AssociationEngine, CsvGeneratorOptions, FolderStatsMode, ImportOrchestrator,
    LedgerSuggester, MemoryGrouper, PlotGenerator, StatisticsService, SurfaceReduction,
};

/// Command-line arguments for hardness-core
#[derive(Parser, Debug)]
#[command(name = "hardness-core")]
#[command(about = "Soil hardness association and reporting")]
#[command(version)]
struct Args {
    /// Root folder holding the database and media directory
    #[arg(short, long, global = true, env = "HARDNESS_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Bootstrap TOML file
    #[arg(short, long, global = true, env = "HARDNESS_CONFIG")]
    config: Option<PathBuf>,

    /// Print machine-readable JSON instead of summaries
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the schema and seed default blocks and sampling method
    Init,

    /// Import every CSV below a staging root
    Import { staging_root: PathBuf },

    /// List memory groups with no block assigned
    Groups,

    /// List land blocks and their ids
    Blocks,

    /// Show the memory groups an anchor would cover for a ledger
    Preview {
        #[arg(long)]
        ledger: i64,
        #[arg(long)]
        anchor: i64,
        #[arg(long)]
        folder: Option<String>,
    },

    /// Bind sessions following the sampling order of the ledger's method
    AssociateR {
        #[arg(long)]
        ledger: i64,
        #[arg(long, required = true, num_args = 1..)]
        anchor: Vec<i64>,
        #[arg(long)]
        folder: Option<String>,
    },

    /// Bind one session to the given blocks, in order
    AssociateIndividual {
        #[arg(long)]
        ledger: i64,
        #[arg(long)]
        anchor: i64,
        #[arg(long, required = true, num_args = 1..)]
        blocks: Vec<i64>,
        #[arg(long)]
        folder: Option<String>,
    },

    /// Per-folder statistics
    Stats {
        #[arg(default_value = "unassociated")]
        mode: FolderStatsMode,
    },

    /// Import errors plus associated folder, block and ledger statistics
    Summary,

    /// Render surfaces for the given ledgers, or every associated ledger
    Plot {
        #[arg(long)]
        ledger: Vec<i64>,
        /// Override the configured reduction (last, mean, max)
        #[arg(long)]
        reduction: Option<SurfaceReduction>,
    },

    /// Suggest land and sampling date for an imported folder
    SuggestLedger { folder: String },

    /// Write synthetic penetrometer files
    GenerateCsv {
        out_dir: PathBuf,
        #[arg(long, default_value = "1")]
        fields: usize,
        #[arg(long, default_value = "42")]
        seed: u64,
        /// Acquisition date of the first memory (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    let toml_config = TomlConfig::load_or_default(args.config.as_deref());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(toml_config.logging.level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(
        "hardness-core {} ({}, built {}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    if let Err(e) = run(args, toml_config).await {
        error!("{:#}", e);
        return Err(e);
    }
    Ok(())
}

async fn run(args: Args, toml_config: TomlConfig) -> Result<()> {
    let json = args.json;
    let root_arg = args.root_folder;
    let open = || open_store(root_arg.clone(), &toml_config);

    match args.command {
        Command::Init => {
            let (_, pool) = open().await?;
            db::seed_defaults(&pool).await?;
            info!("Defaults seeded");
            println!("Initialized");
        }
        Command::Import { staging_root } => {
            let (_, pool) = open().await?;
            let summary = ImportOrchestrator::new(pool).import(&staging_root).await?;
            print_result(json, &summary, || summary.display_string())?;
        }
        Command::Groups => {
            let (_, pool) = open().await?;
            let groups = MemoryGrouper::new(pool).list_unassociated_groups().await?;
            print_result(json, &groups, || lines(groups.iter().map(|g| g.display_string())))?;
        }
        Command::Blocks => {
            let (_, pool) = open().await?;
            let blocks = masters::list_land_blocks(&pool).await?;
            print_result(json, &blocks, || {
                lines(blocks.iter().map(|b| format!("{:>4}  {}", b.id, b.name)))
            })?;
        }
        Command::Preview {
            ledger,
            anchor,
            folder,
        } => {
            let (_, pool) = open().await?;
            let groups = MemoryGrouper::new(pool)
                .preview_anchor_range(ledger, anchor, folder.as_deref())
                .await?;
            print_result(json, &groups, || lines(groups.iter().map(|g| g.display_string())))?;
        }
        Command::AssociateR {
            ledger,
            anchor,
            folder,
        } => {
            let (_, pool) = open().await?;
            let outcomes = AssociationEngine::new(pool)
                .associate_r_type(ledger, &anchor, folder.as_deref())
                .await?;
            print_result(json, &outcomes, || {
                lines(outcomes.iter().map(|o| {
                    format!("anchor {}: {} rows -> {}", o.anchor, o.bound_rows, o.blocks.join(", "))
                }))
            })?;
        }
        Command::AssociateIndividual {
            ledger,
            anchor,
            blocks,
            folder,
        } => {
            let (_, pool) = open().await?;
            let outcome = AssociationEngine::new(pool)
                .associate_individual(ledger, anchor, &blocks, folder.as_deref())
                .await?;
            print_result(json, &outcome, || {
                format!(
                    "anchor {}: {} rows -> {}; {} measurements still unbound",
                    outcome.outcome.anchor,
                    outcome.outcome.bound_rows,
                    outcome.outcome.blocks.join(", "),
                    outcome.remaining_unbound
                )
            })?;
        }
        Command::Stats { mode } => {
            let (_, pool) = open().await?;
            let stats = StatisticsService::new(pool).folder_stats(mode).await?;
            print_result(json, &stats, || lines(stats.iter().map(|s| s.display_string())))?;
        }
        Command::Summary => {
            let (_, pool) = open().await?;
            let summary = StatisticsService::new(pool).association_summary().await?;
            print_result(json, &summary, || summary.display_string())?;
        }
        Command::Plot { ledger, reduction } => {
            let (initializer, pool) = open().await?;
            plot(pool, &initializer, &toml_config, json, ledger, reduction).await?;
        }
        Command::SuggestLedger { folder } => {
            let (_, pool) = open().await?;
            let suggestion = LedgerSuggester::new(pool).suggest(&folder).await?;
            print_result(json, &suggestion, || suggestion.display_string())?;
        }
        Command::GenerateCsv {
            out_dir,
            fields,
            seed,
            date,
        } => {
            // No database involved
            let day = date.unwrap_or_else(|| {
                hardness_common::time::now()
                    .with_timezone(&hardness_common::time::ACQUISITION_TZ)
                    .date_naive()
            });
            let options = CsvGeneratorOptions {
                fields,
                seed,
                base_time: NaiveDateTime::new(day, NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default()),
            };
            let generated = generate_fields(&out_dir, &options)
                .await
                .with_context(|| format!("Failed to write files under {}", out_dir.display()))?;
            print_result(json, &generated, || {
                format!(
                    "{} files written in {} folders under {}",
                    generated.files,
                    generated.folders.len(),
                    out_dir.display()
                )
            })?;
        }
    }

    Ok(())
}

/// Resolve the root folder, create it and open the database
async fn open_store(
    root_arg: Option<PathBuf>,
    toml_config: &TomlConfig,
) -> Result<(RootFolderInitializer, SqlitePool)> {
    // Step 1: Resolve root folder
    let root_folder = RootFolderResolver::new(root_arg, toml_config).resolve();

    // Step 2: Create root folder and media directory if missing
    let initializer = RootFolderInitializer::new(root_folder, toml_config);
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;

    // Step 3: Open or create database
    let db_path = initializer.database_path();
    info!("Database: {}", db_path.display());
    let pool = db::init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open {}", db_path.display()))?;

    Ok((initializer, pool))
}

async fn plot(
    pool: SqlitePool,
    initializer: &RootFolderInitializer,
    toml_config: &TomlConfig,
    json: bool,
    ledger_ids: Vec<i64>,
    reduction: Option<SurfaceReduction>,
) -> Result<()> {
    let precheck = StatisticsService::new(pool.clone()).plot_precheck().await?;
    info!("Plot precheck: {}", precheck.display_string());
    if !json {
        println!("{}", precheck.display_string());
    }
    if precheck.nothing_to_plot(&ledger_ids) {
        warn!("No measurements are assigned to a ledger; nothing to plot");
        return Ok(());
    }

    let reduction = match reduction {
        Some(reduction) => reduction,
        None => SurfaceReduction::from_str(&toml_config.plot.reduction)
            .map_err(|e| anyhow::anyhow!("Invalid [plot] reduction: {}", e))?,
    };
    let generator = PlotGenerator::new(pool, initializer.media_dir(), reduction, toml_config.plot.dpi);

    let ids = if ledger_ids.is_empty() {
        None
    } else {
        Some(ledger_ids.as_slice())
    };
    let summary = generator.generate_plots(ids).await?;
    print_result(json, &summary, || {
        let mut out = summary.display_string();
        for e in &summary.errors {
            out.push_str("\n  ");
            out.push_str(e);
        }
        out
    })
}

fn print_result<T: Serialize>(json: bool, value: &T, human: impl FnOnce() -> String) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", human());
    }
    Ok(())
}

fn lines(items: impl Iterator<Item = String>) -> String {
    items.collect::<Vec<_>>().join("\n")
}
