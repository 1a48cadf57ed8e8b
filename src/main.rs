use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scout_telemetry::config::Config;
use scout_telemetry::filters::{self, apply_filters, filter_options, parse_choice, FilterSpec};
use scout_telemetry::generator::EventGenerator;
use scout_telemetry::roster::AthleteIndex;
use scout_telemetry::snapshot::{self, SnapshotUpdate, SnapshotView};
use scout_telemetry::{db, metrics, report, timestamp};

#[derive(Parser)]
#[command(name = "scout-telemetry")]
#[command(about = "Athlete jump/cut telemetry scouting tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone, Default)]
struct FilterArgs {
    /// Forward, Midfielder, Defender, Goalkeeper or All
    #[arg(long)]
    position: Option<String>,
    #[arg(long)]
    country: Option<String>,
    /// HIGH, LOW or All
    #[arg(long)]
    risk_level: Option<String>,
    /// CUTTING, LANDING, UNKNOWN or All
    #[arg(long)]
    movement_type: Option<String>,
    /// "Under 15", "15-17", "Over 17" or All
    #[arg(long)]
    age_group: Option<String>,
    #[arg(long, default_value_t = 0)]
    min_score: i32,
    /// Case-insensitive match on name, club, country, position and movement
    #[arg(long, default_value = "")]
    search: String,
}

impl FilterArgs {
    fn to_spec(&self) -> anyhow::Result<FilterSpec> {
        Ok(FilterSpec {
            position: parse_choice(self.position.as_deref())?,
            country: self
                .country
                .clone()
                .filter(|country| !country.is_empty() && country != filters::ALL),
            risk_level: parse_choice(self.risk_level.as_deref())?,
            movement_type: parse_choice(self.movement_type.as_deref())?,
            age_group: parse_choice(self.age_group.as_deref())?,
            min_score: self.min_score,
            search: self.search.clone(),
        })
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load the demonstration roster and generated events
    Seed {
        /// Seed for reproducible event generation
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Print a generated event batch as JSON without storing it
    Generate {
        #[arg(long, default_value = "demo-user-001")]
        athlete_id: String,
        #[arg(long, default_value_t = 70)]
        baseline: i32,
        #[arg(long, default_value_t = 30)]
        count: usize,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Import events from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Rank athletes, or list events with --events
    Leaderboard {
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        /// List matching events newest first instead of ranking athletes
        #[arg(long)]
        events: bool,
    },
    /// Show one athlete's profile, live averages and history
    Athlete {
        #[arg(long)]
        id: String,
        /// Zero-based history page
        #[arg(long, default_value_t = 0)]
        page: usize,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Follow the store and reprint the leaderboard on every snapshot
    Watch {
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long)]
        interval_secs: Option<u64>,
    },
}

fn rng_from(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

async fn connect(config: &Config) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(config.require_database_url()?)
        .await
        .context("failed to connect to Postgres")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scout_telemetry=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Commands::InitDb => {
            let pool = connect(&config).await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed { seed } => {
            let pool = connect(&config).await?;
            let mut rng = rng_from(seed);
            let summary = db::seed(&pool, &mut rng, &EventGenerator::default(), Utc::now()).await?;
            println!(
                "Seeded {} athletes and {} events.",
                summary.athletes, summary.events
            );
        }
        Commands::Generate {
            athlete_id,
            baseline,
            count,
            seed,
        } => {
            let mut rng = rng_from(seed);
            let events =
                EventGenerator::default().generate(&mut rng, &athlete_id, baseline, count, Utc::now());
            println!("{}", serde_json::to_string_pretty(&events)?);
        }
        Commands::Import { csv } => {
            let pool = connect(&config).await?;
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} events from {}.", csv.display());
        }
        Commands::Leaderboard {
            filters,
            limit,
            events,
        } => {
            let spec = filters.to_spec()?;
            let pool = connect(&config).await?;
            let index = AthleteIndex::new(db::fetch_athletes(&pool).await?);
            let jumps = db::fetch_events(&pool, None, config.event_limit).await?;
            let now = Utc::now();

            if events {
                let scouted = apply_filters(&index.enrich_all(jumps), &spec);
                if scouted.is_empty() {
                    println!("No events match these filters.");
                    return Ok(());
                }
                for (position, event) in scouted.iter().take(limit).enumerate() {
                    println!("{}", report::event_line(position + 1, event));
                }
                return Ok(());
            }

            let entries = metrics::filtered_leaderboard(&index, &jumps, &spec);
            if entries.is_empty() {
                let options = filter_options(&index.enrich_all(jumps));
                println!("No athletes match these filters.");
                println!("Countries: {}", options.countries.join(", "));
                println!("Positions: {}", options.positions.join(", "));
                println!("Movement types: {}", options.movement_types.join(", "));
                println!("Risk levels: {}", options.risk_levels.join(", "));
                return Ok(());
            }

            println!("Top athletes by efficiency score:");
            for entry in entries.iter().take(limit) {
                println!("{}", report::leaderboard_line(entry, now));
            }
        }
        Commands::Athlete { id, page } => {
            let pool = connect(&config).await?;
            let athlete = db::fetch_athlete(&pool, &id).await?;
            if athlete.is_none() {
                tracing::warn!(athlete_id = %id, "no athlete record, showing events only");
            }
            let events = db::fetch_events(&pool, Some(&id), 100).await?;
            let detail =
                report::build_athlete_detail(&id, athlete.as_ref(), &events, page, Utc::now());
            print!("{detail}");
        }
        Commands::Report { filters, out } => {
            let spec = filters.to_spec()?;
            let pool = connect(&config).await?;
            let index = AthleteIndex::new(db::fetch_athletes(&pool).await?);
            let jumps = db::fetch_events(&pool, None, config.event_limit).await?;

            let entries = metrics::filtered_leaderboard(&index, &jumps, &spec);
            let scouted = apply_filters(&index.enrich_all(jumps), &spec);
            let scope = spec.is_active().then(|| describe(&spec));
            let report = report::build_report(scope.as_deref(), Utc::now(), &entries, &scouted);

            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Watch {
            filters,
            limit,
            interval_secs,
        } => {
            let spec = filters.to_spec()?;
            let pool = connect(&config).await?;
            let every = interval_secs
                .map(Duration::from_secs)
                .unwrap_or(config.poll_interval);
            watch(pool, spec, limit, every, config.event_limit).await?;
        }
    }

    Ok(())
}

fn describe(spec: &FilterSpec) -> String {
    let mut parts = Vec::new();
    if let Some(position) = spec.position {
        parts.push(position.to_string());
    }
    if let Some(country) = &spec.country {
        parts.push(country.clone());
    }
    if let Some(risk) = spec.risk_level {
        parts.push(format!("{risk} risk"));
    }
    if let Some(movement) = spec.movement_type {
        parts.push(movement.to_string());
    }
    if let Some(group) = spec.age_group {
        parts.push(group.to_string());
    }
    if spec.min_score > 0 {
        parts.push(format!("score >= {}", spec.min_score));
    }
    if !spec.search.is_empty() {
        parts.push(format!("matching \"{}\"", spec.search));
    }
    parts.join(", ")
}

async fn watch(
    pool: PgPool,
    spec: FilterSpec,
    limit: usize,
    every: Duration,
    event_limit: i64,
) -> anyhow::Result<()> {
    let mut athlete_rx = snapshot::subscribe(db::AthleteSource { pool: pool.clone() }, every);
    let mut event_rx = snapshot::subscribe(
        db::EventSource {
            pool,
            athlete_id: None,
            limit: event_limit,
        },
        every,
    );

    let mut athletes = SnapshotView::default();
    let mut events = SnapshotView::default();
    tracing::info!(interval = ?every, "watching for snapshots");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("stopping watch");
                break;
            }
            update = athlete_rx.recv() => match update {
                Some(update) => athletes.apply(update),
                None => break,
            },
            update = event_rx.recv() => match update {
                Some(update) => {
                    let failed = matches!(update, SnapshotUpdate::Failed(_));
                    events.apply(update);
                    if failed {
                        continue;
                    }
                }
                None => break,
            },
        }

        if !events.is_ready() {
            continue;
        }

        let index = AthleteIndex::new(athletes.records().iter().cloned());
        let entries = metrics::filtered_leaderboard(&index, events.records(), &spec);
        let now = Utc::now();
        println!(
            "--- {} ({} athletes, {} events) ---",
            timestamp::format_timestamp(&now),
            index.len(),
            events.records().len()
        );
        if let Some(error) = athletes.last_error().or(events.last_error()) {
            println!("(showing last good data: {error})");
        }
        for entry in entries.iter().take(limit) {
            println!("{}", report::leaderboard_line(entry, now));
        }
    }

    Ok(())
}
