use anyhow::Context;
use chrono::NaiveDate;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::input::{NewArea, NewGoal, NewTask};
use crate::models::{Area, CompletionLog, Goal, Hierarchy, Snapshot, Task};
use crate::schema::{self, MeasurementGoalColumn, TaskRow};
use crate::timeline::Scope;

const TASK_COLUMNS: &str = "id, area_prk_id, title, type, start_date, due_date, \
     completion_date, frequency, frequency_days, weight, measurement_type, \
     measurement_goal, archived";

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Entity {
    Goal,
    Area,
    Task,
}

impl Entity {
    fn table(&self) -> &'static str {
        match self {
            Entity::Goal => "life_prks",
            Entity::Area => "area_prks",
            Entity::Task => "habit_tasks",
        }
    }
}

fn task_from_row(row: &PgRow) -> anyhow::Result<Task> {
    let measurement_goal: Option<Json<MeasurementGoalColumn>> = row.try_get("measurement_goal")?;
    let raw = TaskRow {
        id: row.try_get("id")?,
        area_id: row.try_get("area_prk_id")?,
        title: row.try_get("title")?,
        kind: row.try_get("type")?,
        start_date: row.try_get("start_date")?,
        due_date: row.try_get("due_date")?,
        completion_date: row.try_get("completion_date")?,
        frequency: row.try_get("frequency")?,
        frequency_days: row.try_get("frequency_days")?,
        weight: row.try_get("weight")?,
        measurement_type: row.try_get("measurement_type")?,
        measurement_goal: measurement_goal.map(|column| column.0),
        archived: row.try_get("archived")?,
    };
    Ok(Task::try_from(raw)?)
}

fn log_from_row(row: &PgRow) -> anyhow::Result<CompletionLog> {
    Ok(CompletionLog {
        id: row.try_get("id")?,
        task_id: row.try_get("habit_task_id")?,
        completion_date: row.try_get("completion_date")?,
        progress_value: row.try_get("progress_value")?,
    })
}

pub async fn fetch_hierarchy(pool: &PgPool, include_archived: bool) -> anyhow::Result<Hierarchy> {
    let filter = if include_archived {
        ""
    } else {
        " WHERE archived = false"
    };

    let goal_rows = sqlx::query(&format!(
        "SELECT id, title, archived FROM life_prks{filter} ORDER BY created_at, id"
    ))
    .fetch_all(pool)
    .await
    .context("failed to fetch goals")?;

    let area_rows = sqlx::query(&format!(
        "SELECT id, life_prk_id, title, archived FROM area_prks{filter} ORDER BY created_at, id"
    ))
    .fetch_all(pool)
    .await
    .context("failed to fetch areas")?;

    let task_rows = sqlx::query(&format!(
        "SELECT {TASK_COLUMNS} FROM habit_tasks{filter} ORDER BY created_at, id"
    ))
    .fetch_all(pool)
    .await
    .context("failed to fetch tasks")?;

    let mut hierarchy = Hierarchy::default();

    for row in goal_rows {
        hierarchy.goals.push(Goal {
            id: row.get("id"),
            title: row.get("title"),
            archived: row.get("archived"),
        });
    }

    for row in area_rows {
        hierarchy.areas.push(Area {
            id: row.get("id"),
            goal_id: row.get("life_prk_id"),
            title: row.get("title"),
            archived: row.get("archived"),
        });
    }

    for row in task_rows.iter() {
        hierarchy.tasks.push(task_from_row(row)?);
    }

    debug!(
        goals = hierarchy.goals.len(),
        areas = hierarchy.areas.len(),
        tasks = hierarchy.tasks.len(),
        "fetched hierarchy"
    );
    Ok(hierarchy)
}

pub async fn fetch_logs(
    pool: &PgPool,
    from: NaiveDate,
    to: NaiveDate,
) -> anyhow::Result<Vec<CompletionLog>> {
    let rows = sqlx::query(
        r#"
        SELECT id, habit_task_id, completion_date, progress_value
        FROM progress_logs
        WHERE completion_date >= $1 AND completion_date <= $2
        ORDER BY completion_date, created_at
        "#,
    )
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await
    .context("failed to fetch completion logs")?;

    let mut logs = Vec::with_capacity(rows.len());
    for row in rows.iter() {
        logs.push(log_from_row(row)?);
    }

    debug!(%from, %to, logs = logs.len(), "fetched completion logs");
    Ok(logs)
}

pub async fn fetch_task(pool: &PgPool, id: Uuid) -> anyhow::Result<Option<Task>> {
    let row = sqlx::query(&format!("SELECT {TASK_COLUMNS} FROM habit_tasks WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch task")?;

    row.as_ref().map(task_from_row).transpose()
}

/// Logs for one task on one day, newest first.
pub async fn fetch_logs_for_task_on(
    pool: &PgPool,
    task_id: Uuid,
    day: NaiveDate,
) -> anyhow::Result<Vec<CompletionLog>> {
    let rows = sqlx::query(
        r#"
        SELECT id, habit_task_id, completion_date, progress_value
        FROM progress_logs
        WHERE habit_task_id = $1 AND completion_date = $2
        ORDER BY created_at DESC
        "#,
    )
    .bind(task_id)
    .bind(day)
    .fetch_all(pool)
    .await
    .context("failed to fetch logs for task")?;

    rows.iter().map(log_from_row).collect()
}

pub async fn insert_goal(pool: &PgPool, goal: &NewGoal) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO life_prks (id, title, archived) VALUES ($1, $2, false)")
        .bind(id)
        .bind(goal.title.trim())
        .execute(pool)
        .await
        .context("failed to insert goal")?;

    info!(goal_id = %id, "goal created");
    Ok(id)
}

pub async fn insert_area(pool: &PgPool, area: &NewArea) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO area_prks (id, life_prk_id, title, archived)
        VALUES ($1, $2, $3, false)
        "#,
    )
    .bind(id)
    .bind(area.goal_id)
    .bind(area.title.trim())
    .execute(pool)
    .await
    .context("failed to insert area")?;

    info!(area_id = %id, goal_id = %area.goal_id, "area created");
    Ok(id)
}

pub async fn insert_task(pool: &PgPool, task: &NewTask) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO habit_tasks
        (id, area_prk_id, title, type, start_date, due_date, frequency,
         frequency_days, weight, measurement_type, measurement_goal, archived)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, false)
        "#,
    )
    .bind(id)
    .bind(task.area_id)
    .bind(task.title.trim())
    .bind(task.kind.as_str())
    .bind(task.start_date)
    .bind(task.due_date)
    .bind(task.frequency.as_ref().map(|frequency| frequency.as_str().to_string()))
    .bind(schema::weekdays_to_column(&task.frequency_days))
    .bind(task.weight)
    .bind(task.measurement_type.as_str())
    .bind(schema::measurement_goal_to_column(task.measurement_goal.as_ref()).map(Json))
    .execute(pool)
    .await
    .context("failed to insert task")?;

    info!(task_id = %id, area_id = %task.area_id, kind = task.kind.as_str(), "task created");
    Ok(id)
}

pub async fn update_task(pool: &PgPool, task: &Task) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        UPDATE habit_tasks
        SET title = $2, due_date = $3, frequency = $4, frequency_days = $5,
            weight = $6, measurement_goal = $7
        WHERE id = $1
        "#,
    )
    .bind(task.id)
    .bind(&task.title)
    .bind(task.due_date)
    .bind(task.frequency.as_ref().map(|frequency| frequency.as_str().to_string()))
    .bind(schema::weekdays_to_column(&task.frequency_days))
    .bind(task.weight)
    .bind(schema::measurement_goal_to_column(task.measurement_goal.as_ref()).map(Json))
    .execute(pool)
    .await
    .context("failed to update task")?;

    info!(task_id = %task.id, "task updated");
    Ok(())
}

/// Archiving is the only form of deletion for goals, areas and tasks.
pub async fn set_archived(
    pool: &PgPool,
    entity: Entity,
    id: Uuid,
    archived: bool,
) -> anyhow::Result<bool> {
    let result = sqlx::query(&format!(
        "UPDATE {} SET archived = $2 WHERE id = $1",
        entity.table()
    ))
    .bind(id)
    .bind(archived)
    .execute(pool)
    .await
    .with_context(|| format!("failed to update {}", entity.table()))?;

    let found = result.rows_affected() > 0;
    if found {
        info!(table = entity.table(), %id, archived, "archive flag set");
    } else {
        warn!(table = entity.table(), %id, "no row to archive");
    }
    Ok(found)
}

pub async fn insert_log(
    pool: &PgPool,
    task_id: Uuid,
    day: NaiveDate,
    progress_value: Option<f64>,
) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO progress_logs (id, habit_task_id, completion_date, progress_value)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(id)
    .bind(task_id)
    .bind(day)
    .bind(progress_value)
    .execute(pool)
    .await
    .context("failed to insert completion log")?;

    debug!(log_id = %id, %task_id, %day, "completion logged");
    Ok(id)
}

pub async fn delete_logs(pool: &PgPool, ids: &[Uuid]) -> anyhow::Result<u64> {
    if ids.is_empty() {
        return Ok(0);
    }

    let result = sqlx::query("DELETE FROM progress_logs WHERE id = ANY($1)")
        .bind(ids)
        .execute(pool)
        .await
        .context("failed to delete completion logs")?;

    debug!(deleted = result.rows_affected(), "completion logs removed");
    Ok(result.rows_affected())
}

pub async fn set_task_completion(
    pool: &PgPool,
    task_id: Uuid,
    completion_date: Option<NaiveDate>,
) -> anyhow::Result<()> {
    sqlx::query("UPDATE habit_tasks SET completion_date = $2 WHERE id = $1")
        .bind(task_id)
        .bind(completion_date)
        .execute(pool)
        .await
        .context("failed to update task completion")?;
    Ok(())
}

/// Rewrites every snapshot in `[from, to]` in one transaction.
pub async fn replace_snapshots(
    pool: &PgPool,
    from: NaiveDate,
    to: NaiveDate,
    snapshots: &[Snapshot],
) -> anyhow::Result<()> {
    let mut tx = pool.begin().await.context("failed to open transaction")?;

    sqlx::query(
        "DELETE FROM daily_progress_snapshots WHERE snapshot_date >= $1 AND snapshot_date <= $2",
    )
    .bind(from)
    .bind(to)
    .execute(&mut *tx)
    .await
    .context("failed to clear snapshots")?;

    for snapshot in snapshots {
        sqlx::query(
            r#"
            INSERT INTO daily_progress_snapshots
            (snapshot_date, life_prk_id, area_prk_id, progress)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(snapshot.date)
        .bind(snapshot.goal_id)
        .bind(snapshot.area_id)
        .bind(snapshot.progress)
        .execute(&mut *tx)
        .await
        .context("failed to insert snapshot")?;
    }

    tx.commit().await.context("failed to commit snapshots")?;
    info!(%from, %to, rows = snapshots.len(), "snapshots rewritten");
    Ok(())
}

/// Daily values stored for `scope`. Overall averages the goal-level rows of
/// each day.
pub async fn fetch_snapshot_series(
    pool: &PgPool,
    from: NaiveDate,
    to: NaiveDate,
    scope: Scope,
) -> anyhow::Result<Vec<(NaiveDate, f64)>> {
    let base = "SELECT snapshot_date, AVG(progress)::float8 AS progress \
                FROM daily_progress_snapshots \
                WHERE snapshot_date >= $1 AND snapshot_date <= $2";

    let query = match scope {
        Scope::Overall => format!("{base} AND area_prk_id IS NULL GROUP BY snapshot_date"),
        Scope::Goal(_) => {
            format!("{base} AND area_prk_id IS NULL AND life_prk_id = $3 GROUP BY snapshot_date")
        }
        Scope::Area(_) => format!("{base} AND area_prk_id = $3 GROUP BY snapshot_date"),
    };
    let query = format!("{query} ORDER BY snapshot_date");

    let mut rows = sqlx::query(&query).bind(from).bind(to);
    match scope {
        Scope::Overall => {}
        Scope::Goal(id) | Scope::Area(id) => rows = rows.bind(id),
    }

    let records = rows
        .fetch_all(pool)
        .await
        .context("failed to fetch snapshots")?;

    Ok(records
        .into_iter()
        .map(|row| (row.get("snapshot_date"), row.get("progress")))
        .collect())
}

#[derive(Debug, Default)]
pub struct ImportSummary {
    pub inserted: usize,
    pub skipped: usize,
    pub earliest: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct LogImportRow {
    pub task_id: Uuid,
    pub completion_date: NaiveDate,
    pub progress_value: Option<f64>,
}

/// Reads every CSV row up front so a malformed line fails before anything
/// is written.
pub fn parse_log_csv<R: std::io::Read>(reader: R) -> anyhow::Result<Vec<LogImportRow>> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut rows = Vec::new();

    for (index, result) in reader.deserialize::<LogImportRow>().enumerate() {
        // Line 1 is the header.
        let row = result.with_context(|| format!("invalid CSV row on line {}", index + 2))?;
        rows.push(row);
    }

    Ok(rows)
}

/// Loads `task_id,completion_date,progress_value` rows in one transaction.
/// Rows pointing at a task that does not exist are skipped.
pub async fn import_logs_csv(
    pool: &PgPool,
    csv_path: &std::path::Path,
) -> anyhow::Result<ImportSummary> {
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let rows = parse_log_csv(file)?;
    let mut summary = ImportSummary::default();

    let mut tx = pool.begin().await.context("failed to open transaction")?;

    for row in rows {
        let result = sqlx::query(
            r#"
            INSERT INTO progress_logs (id, habit_task_id, completion_date, progress_value)
            SELECT $1, $2, $3, $4
            WHERE EXISTS (SELECT 1 FROM habit_tasks WHERE id = $2)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(row.task_id)
        .bind(row.completion_date)
        .bind(row.progress_value)
        .execute(&mut *tx)
        .await
        .context("failed to insert imported log")?;

        if result.rows_affected() > 0 {
            summary.inserted += 1;
            summary.earliest = Some(match summary.earliest {
                Some(current) => current.min(row.completion_date),
                None => row.completion_date,
            });
        } else {
            warn!(task_id = %row.task_id, "skipping log for unknown task");
            summary.skipped += 1;
        }
    }

    tx.commit().await.context("failed to commit imported logs")?;
    info!(inserted = summary.inserted, skipped = summary.skipped, "logs imported");
    Ok(summary)
}
