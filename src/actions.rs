//! User actions against the hosted database.
//!
//! Every mutation is followed by a full snapshot recomputation from the
//! first affected date through today. A failed step aborts the action and
//! the error goes back to the caller untouched.

use anyhow::Context;
use chrono::NaiveDate;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::db::{self, Entity};
use crate::error::{ValidationError, ValidationErrors};
use crate::input::{NewArea, NewGoal, NewTask, TaskEdit};
use crate::models::{CompletionLog, Hierarchy, MeasurementType, Task, TaskKind};
use crate::progress;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ToggleRequest {
    /// Mark done when not done, undo when done.
    Flip,
    /// Add an amount to a quantitative habit.
    Record(f64),
    /// Drop the most recent amount logged that day.
    Undo,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TogglePlan {
    CompleteTask(NaiveDate),
    ReopenTask,
    InsertLog(Option<f64>),
    DeleteLogs(Vec<Uuid>),
    Nothing,
}

fn reject(field: &'static str, message: &str) -> ValidationErrors {
    ValidationErrors(vec![ValidationError {
        field,
        message: message.to_string(),
    }])
}

/// Decides what a toggle on `day` does. `existing` holds the task's logs for
/// that day, newest first.
pub fn plan_toggle(
    task: &Task,
    day: NaiveDate,
    existing: &[CompletionLog],
    request: ToggleRequest,
) -> Result<TogglePlan, ValidationErrors> {
    if day < task.start_date {
        return Err(reject("date", "is before the task starts"));
    }

    let quantitative = task.measurement_type == MeasurementType::Quantitative;

    match (task.kind, request) {
        (TaskKind::Task, ToggleRequest::Flip) => Ok(match task.completion_date {
            Some(_) => TogglePlan::ReopenTask,
            None => TogglePlan::CompleteTask(day),
        }),
        (TaskKind::Task, _) => Err(reject("value", "one-off tasks can only be flipped")),
        (TaskKind::Habit, ToggleRequest::Flip) => {
            if !existing.is_empty() {
                Ok(TogglePlan::DeleteLogs(
                    existing.iter().map(|log| log.id).collect(),
                ))
            } else if quantitative {
                let target = task.measurement_goal.as_ref().map(|goal| goal.target_count);
                Ok(TogglePlan::InsertLog(Some(target.unwrap_or(1.0))))
            } else {
                Ok(TogglePlan::InsertLog(None))
            }
        }
        (TaskKind::Habit, ToggleRequest::Record(value)) => {
            if !quantitative {
                Err(reject("value", "only quantitative habits take an amount"))
            } else if !value.is_finite() || value <= 0.0 {
                Err(reject("value", "must be a positive number"))
            } else {
                Ok(TogglePlan::InsertLog(Some(value)))
            }
        }
        (TaskKind::Habit, ToggleRequest::Undo) => Ok(match existing.first() {
            Some(latest) if quantitative => TogglePlan::DeleteLogs(vec![latest.id]),
            Some(_) => TogglePlan::DeleteLogs(existing.iter().map(|log| log.id).collect()),
            None => TogglePlan::Nothing,
        }),
    }
}

/// Hierarchy plus every log that can affect a date in `[from, to]`.
pub async fn load_inputs(
    pool: &PgPool,
    from: NaiveDate,
    to: NaiveDate,
) -> anyhow::Result<(Hierarchy, Vec<CompletionLog>)> {
    let hierarchy = db::fetch_hierarchy(pool, false).await?;
    let (log_from, log_to) = progress::log_window(from, to);
    let logs = db::fetch_logs(pool, log_from, log_to).await?;
    Ok((hierarchy, logs))
}

/// Rebuilds the snapshot table for `[from, today]` from scratch.
pub async fn recompute_snapshots(
    pool: &PgPool,
    from: NaiveDate,
    today: NaiveDate,
) -> anyhow::Result<usize> {
    if from > today {
        return Ok(0);
    }

    let (hierarchy, logs) = load_inputs(pool, from, today).await?;
    let snapshots: Vec<_> = from
        .iter_days()
        .take_while(|day| *day <= today)
        .flat_map(|day| progress::snapshots_for(&progress::daily_progress(&hierarchy, &logs, day)))
        .collect();

    db::replace_snapshots(pool, from, today, &snapshots).await?;
    Ok(snapshots.len())
}

pub async fn toggle(
    pool: &PgPool,
    task_id: Uuid,
    day: NaiveDate,
    request: ToggleRequest,
    today: NaiveDate,
) -> anyhow::Result<TogglePlan> {
    let task = db::fetch_task(pool, task_id)
        .await?
        .with_context(|| format!("task {task_id} not found"))?;
    let existing = db::fetch_logs_for_task_on(pool, task_id, day).await?;
    let plan = plan_toggle(&task, day, &existing, request)?;
    if plan == TogglePlan::Nothing {
        return Ok(plan);
    }

    let affected_from = match &plan {
        TogglePlan::CompleteTask(done) => {
            db::set_task_completion(pool, task_id, Some(*done)).await?;
            *done
        }
        TogglePlan::ReopenTask => {
            db::set_task_completion(pool, task_id, None).await?;
            task.completion_date.unwrap_or(day).min(day)
        }
        TogglePlan::InsertLog(value) => {
            db::insert_log(pool, task_id, day, *value).await?;
            day
        }
        TogglePlan::DeleteLogs(ids) => {
            db::delete_logs(pool, ids).await?;
            day
        }
        TogglePlan::Nothing => day,
    };

    info!(%task_id, %day, ?plan, "toggle applied");
    // A weekly habit scores its whole week, so earlier days of that week move too.
    recompute_snapshots(pool, progress::week_start(affected_from), today).await?;
    Ok(plan)
}

pub async fn add_goal(pool: &PgPool, goal: NewGoal, today: NaiveDate) -> anyhow::Result<Uuid> {
    goal.validate()?;
    let id = db::insert_goal(pool, &goal).await?;
    recompute_snapshots(pool, today, today).await?;
    Ok(id)
}

pub async fn add_area(pool: &PgPool, area: NewArea, today: NaiveDate) -> anyhow::Result<Uuid> {
    area.validate()?;
    let id = db::insert_area(pool, &area).await?;
    recompute_snapshots(pool, today, today).await?;
    Ok(id)
}

pub async fn add_task(pool: &PgPool, task: NewTask, today: NaiveDate) -> anyhow::Result<Uuid> {
    task.validate()?;
    let id = db::insert_task(pool, &task).await?;
    recompute_snapshots(pool, task.start_date.min(today), today).await?;
    Ok(id)
}

pub async fn edit_task(
    pool: &PgPool,
    task_id: Uuid,
    edit: TaskEdit,
    today: NaiveDate,
) -> anyhow::Result<Task> {
    if edit.is_empty() {
        anyhow::bail!("nothing to change");
    }

    let stored = db::fetch_task(pool, task_id)
        .await?
        .with_context(|| format!("task {task_id} not found"))?;
    let updated = edit.apply(&stored)?;
    db::update_task(pool, &updated).await?;
    recompute_snapshots(pool, updated.start_date.min(today), today).await?;
    Ok(updated)
}

/// Flips the archive flag. History before `today` keeps the values it had.
pub async fn archive(
    pool: &PgPool,
    entity: Entity,
    id: Uuid,
    archived: bool,
    today: NaiveDate,
) -> anyhow::Result<()> {
    if !db::set_archived(pool, entity, id, archived).await? {
        anyhow::bail!("no {entity:?} with id {id}");
    }
    recompute_snapshots(pool, today, today).await?;
    Ok(())
}
