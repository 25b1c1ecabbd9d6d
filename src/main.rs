use std::path::PathBuf;

use anyhow::Context;
use chrono::{Duration, Local, NaiveDate};
use clap::{ArgGroup, Parser, Subcommand};
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod actions;
mod config;
mod db;
mod error;
mod input;
mod models;
mod progress;
mod report;
mod schema;
mod timeline;

use actions::ToggleRequest;
use config::AppConfig;
use input::{NewArea, NewGoal, NewTask, TaskEdit};
use models::{Frequency, MeasurementGoal, MeasurementType, TaskKind};
use timeline::{Granularity, Scope};

#[derive(Parser)]
#[command(name = "cenit")]
#[command(about = "Goal, area and habit progress tracker", long_about = None)]
struct Cli {
    /// Optional TOML config file
    #[arg(long, global = true, default_value = config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Progress of every goal, area and task on one day
    Dashboard {
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        json: bool,
    },
    /// Daily overall progress for a month (YYYY-MM)
    Calendar {
        #[arg(long)]
        month: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Progress over a date range
    #[command(group(
        ArgGroup::new("scope")
            .args(["goal", "area"])
            .multiple(false)
    ))]
    Trend {
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
        #[arg(long, value_enum, default_value_t = Granularity::Day)]
        granularity: Granularity,
        #[arg(long)]
        goal: Option<Uuid>,
        #[arg(long)]
        area: Option<Uuid>,
        /// Read stored snapshots instead of recomputing
        #[arg(long)]
        from_snapshots: bool,
        #[arg(long)]
        json: bool,
    },
    /// Mark a task or habit done or undone for a day
    Toggle {
        #[arg(long)]
        task: Uuid,
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Amount to add to a quantitative habit
        #[arg(long, conflicts_with = "undo")]
        value: Option<f64>,
        /// Remove the latest amount logged that day
        #[arg(long)]
        undo: bool,
    },
    /// Create a life goal
    AddGoal {
        #[arg(long)]
        title: String,
    },
    /// Create an area under a goal
    AddArea {
        #[arg(long)]
        goal: Uuid,
        #[arg(long)]
        title: String,
    },
    /// Create a habit or one-off task under an area
    AddTask {
        #[arg(long)]
        area: Uuid,
        #[arg(long)]
        title: String,
        #[arg(long, value_enum, default_value_t = TaskKind::Habit)]
        kind: TaskKind,
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        due: Option<NaiveDate>,
        /// daily, weekly, monthly or specific_days
        #[arg(long)]
        frequency: Option<String>,
        /// Weekdays for specific_days, 0 = Sunday
        #[arg(long, value_delimiter = ',')]
        days: Vec<u32>,
        #[arg(long, default_value_t = 1)]
        weight: i32,
        /// Target amount per period; makes the habit quantitative
        #[arg(long)]
        target: Option<f64>,
        #[arg(long, requires = "target")]
        unit: Option<String>,
    },
    /// Change fields of an existing task
    EditTask {
        #[arg(long)]
        task: Uuid,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        weight: Option<i32>,
        #[arg(long)]
        due: Option<NaiveDate>,
        #[arg(long)]
        frequency: Option<String>,
        #[arg(long, value_delimiter = ',')]
        days: Option<Vec<u32>>,
        #[arg(long)]
        target: Option<f64>,
    },
    /// Archive (or restore) a goal, area or task
    Archive {
        #[arg(value_enum)]
        entity: db::Entity,
        #[arg(long)]
        id: Uuid,
        #[arg(long)]
        restore: bool,
    },
    /// Recompute stored daily snapshots from a date through today
    Snapshot {
        #[arg(long)]
        from: NaiveDate,
    },
    /// Generate a markdown report
    Report {
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Import completion logs from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
}

fn init_tracing(default_filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_month(month: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{month}-01"), "%Y-%m-%d")
        .with_context(|| format!("month must look like 2026-10, got `{month}`"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config)?;
    init_tracing(&config.logging.filter);

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(config.database_url()?)
        .await
        .context("failed to connect to Postgres")?;

    let today = Local::now().date_naive();

    match cli.command {
        Commands::Dashboard { date, json } => {
            let date = date.unwrap_or(today);
            let (hierarchy, logs) = actions::load_inputs(&pool, date, date).await?;
            let daily = progress::daily_progress(&hierarchy, &logs, date);

            if json {
                return print_json(&daily);
            }

            println!("{} overall {:.0}%", daily.date, daily.overall);
            for goal in daily.goals.iter() {
                println!("{} {:.0}%", goal.title, goal.progress);
                for area in goal.areas.iter() {
                    println!("  {} {:.0}%", area.title, area.progress);
                    for task in area.tasks.iter() {
                        let mark = if task.progress >= 100.0 { "x" } else { " " };
                        println!(
                            "    [{mark}] {} ({}, weight {}) {:.0}%",
                            task.title,
                            task.kind.as_str(),
                            task.weight,
                            task.progress
                        );
                    }
                }
            }
        }
        Commands::Calendar { month, json } => {
            let anchor = match month {
                Some(value) => parse_month(&value)?,
                None => today,
            };
            let (first, last) = timeline::month_bounds(anchor);
            let (hierarchy, logs) = actions::load_inputs(&pool, first, last).await?;
            let days = timeline::month_calendar(&hierarchy, &logs, anchor);

            if json {
                return print_json(&days);
            }
            for day in days.iter() {
                println!("{} {:.0}%", day.label, day.value);
            }
        }
        Commands::Trend {
            from,
            to,
            granularity,
            goal,
            area,
            from_snapshots,
            json,
        } => {
            let to = to.unwrap_or(today);
            let from = from.unwrap_or(to - Duration::days(29));
            let scope = match (goal, area) {
                (Some(id), _) => Scope::Goal(id),
                (_, Some(id)) => Scope::Area(id),
                _ => Scope::Overall,
            };

            let series = if from_snapshots {
                let stored = db::fetch_snapshot_series(&pool, from, to, scope).await?;
                timeline::bucket_daily_values(stored, granularity)
            } else {
                let (hierarchy, logs) = actions::load_inputs(&pool, from, to).await?;
                timeline::progress_over_time(&hierarchy, &logs, from, to, granularity, scope)
            };

            if json {
                return print_json(&series);
            }
            if series.is_empty() {
                println!("No progress recorded for this window.");
                return Ok(());
            }
            for point in series.iter() {
                println!("{} {:.1}%", point.label, point.value);
            }
        }
        Commands::Toggle {
            task,
            date,
            value,
            undo,
        } => {
            let request = match (value, undo) {
                (Some(amount), _) => ToggleRequest::Record(amount),
                (None, true) => ToggleRequest::Undo,
                (None, false) => ToggleRequest::Flip,
            };
            let plan = actions::toggle(&pool, task, date.unwrap_or(today), request, today).await?;
            println!("Applied {plan:?}.");
        }
        Commands::AddGoal { title } => {
            let id = actions::add_goal(&pool, NewGoal { title }, today).await?;
            println!("Goal {id} created.");
        }
        Commands::AddArea { goal, title } => {
            let id = actions::add_area(
                &pool,
                NewArea {
                    goal_id: goal,
                    title,
                },
                today,
            )
            .await?;
            println!("Area {id} created.");
        }
        Commands::AddTask {
            area,
            title,
            kind,
            start,
            due,
            frequency,
            days,
            weight,
            target,
            unit,
        } => {
            let measurement_goal = target.map(|target_count| MeasurementGoal {
                target_count,
                unit: unit.unwrap_or_default(),
            });
            let task = NewTask {
                area_id: area,
                title,
                kind,
                start_date: start.unwrap_or(today),
                due_date: due,
                frequency: frequency.as_deref().map(Frequency::parse),
                frequency_days: days,
                weight,
                measurement_type: if measurement_goal.is_some() {
                    MeasurementType::Quantitative
                } else {
                    MeasurementType::Binary
                },
                measurement_goal,
            };
            let id = actions::add_task(&pool, task, today).await?;
            println!("Task {id} created.");
        }
        Commands::EditTask {
            task,
            title,
            weight,
            due,
            frequency,
            days,
            target,
        } => {
            let edit = TaskEdit {
                title,
                weight,
                due_date: due,
                frequency: frequency.as_deref().map(Frequency::parse),
                frequency_days: days,
                target_count: target,
            };
            let updated = actions::edit_task(&pool, task, edit, today).await?;
            println!("Task {} updated.", updated.id);
        }
        Commands::Archive {
            entity,
            id,
            restore,
        } => {
            actions::archive(&pool, entity, id, !restore, today).await?;
            let verb = if restore { "Restored" } else { "Archived" };
            println!("{verb} {entity:?} {id}.");
        }
        Commands::Snapshot { from } => {
            let rows = actions::recompute_snapshots(&pool, from, today).await?;
            println!("Wrote {rows} snapshot rows from {from} through {today}.");
        }
        Commands::Report { date, out } => {
            let date = date.unwrap_or(today);
            let trend_from = date - Duration::days(config.progress.trend_days - 1);
            let streak_from = date - Duration::days(366);
            let (hierarchy, logs) = actions::load_inputs(&pool, streak_from, date).await?;

            let daily = progress::daily_progress(&hierarchy, &logs, date);
            let trend = timeline::progress_over_time(
                &hierarchy,
                &logs,
                trend_from,
                date,
                Granularity::Day,
                Scope::Overall,
            );
            let streaks = report::habit_streaks(&hierarchy, &logs, date);
            let report = report::build_report(&daily, &trend, &streaks);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Import { csv } => {
            let summary = db::import_logs_csv(&pool, &csv).await?;
            if let Some(earliest) = summary.earliest {
                actions::recompute_snapshots(&pool, progress::week_start(earliest), today).await?;
            }
            println!(
                "Inserted {} logs from {} ({} skipped).",
                summary.inserted,
                csv.display(),
                summary.skipped
            );
        }
    }

    Ok(())
}
