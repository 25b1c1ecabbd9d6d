//! Conversion between hosted-database rows and the typed entities.
//!
//! Everything the calculator sees has passed through here, so storage
//! drift (new enum strings, out-of-range weights, half-filled JSON) is
//! handled in one place.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::error::RowError;
use crate::models::{Frequency, MeasurementGoal, MeasurementType, Task, TaskKind};

pub const MIN_WEIGHT: i32 = 1;
pub const MAX_WEIGHT: i32 = 5;

/// `habit_tasks.measurement_goal` jsonb column.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MeasurementGoalColumn {
    #[serde(default)]
    pub target_count: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TaskRow {
    pub id: Uuid,
    pub area_id: Uuid,
    pub title: String,
    pub kind: String,
    pub start_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub completion_date: Option<NaiveDate>,
    pub frequency: Option<String>,
    pub frequency_days: Option<Vec<i32>>,
    pub weight: i32,
    pub measurement_type: String,
    pub measurement_goal: Option<MeasurementGoalColumn>,
    pub archived: bool,
}

pub fn parse_kind(id: Uuid, value: &str) -> Result<TaskKind, RowError> {
    match value {
        "habit" => Ok(TaskKind::Habit),
        "task" => Ok(TaskKind::Task),
        other => Err(RowError::UnknownValue {
            table: "habit_tasks",
            id,
            column: "type",
            value: other.to_string(),
        }),
    }
}

pub fn parse_measurement_type(id: Uuid, value: &str) -> Result<MeasurementType, RowError> {
    match value {
        "binary" => Ok(MeasurementType::Binary),
        "quantitative" => Ok(MeasurementType::Quantitative),
        other => Err(RowError::UnknownValue {
            table: "habit_tasks",
            id,
            column: "measurement_type",
            value: other.to_string(),
        }),
    }
}

pub fn clamp_weight(id: Uuid, weight: i32) -> i32 {
    let clamped = weight.clamp(MIN_WEIGHT, MAX_WEIGHT);
    if clamped != weight {
        warn!(task_id = %id, weight, clamped, "task weight out of range");
    }
    clamped
}

pub fn weekdays_from_column(days: Option<Vec<i32>>) -> Vec<u32> {
    days.unwrap_or_default()
        .into_iter()
        .filter_map(|day| u32::try_from(day).ok())
        .filter(|day| *day <= 6)
        .collect()
}

pub fn weekdays_to_column(days: &[u32]) -> Vec<i32> {
    days.iter().map(|day| *day as i32).collect()
}

/// A goal without a positive target cannot be scored as a ratio; such tasks
/// fall back to the binary predicate.
pub fn measurement_goal_from_column(
    column: Option<MeasurementGoalColumn>,
) -> Option<MeasurementGoal> {
    let column = column?;
    let target_count = column.target_count.filter(|target| *target > 0.0)?;
    Some(MeasurementGoal {
        target_count,
        unit: column.unit.unwrap_or_default(),
    })
}

pub fn measurement_goal_to_column(goal: Option<&MeasurementGoal>) -> Option<MeasurementGoalColumn> {
    goal.map(|goal| MeasurementGoalColumn {
        target_count: Some(goal.target_count),
        unit: Some(goal.unit.clone()),
    })
}

impl TryFrom<TaskRow> for Task {
    type Error = RowError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        Ok(Task {
            kind: parse_kind(row.id, &row.kind)?,
            measurement_type: parse_measurement_type(row.id, &row.measurement_type)?,
            weight: clamp_weight(row.id, row.weight),
            frequency: row.frequency.as_deref().map(Frequency::parse),
            frequency_days: weekdays_from_column(row.frequency_days),
            measurement_goal: measurement_goal_from_column(row.measurement_goal),
            id: row.id,
            area_id: row.area_id,
            title: row.title,
            start_date: row.start_date,
            due_date: row.due_date,
            completion_date: row.completion_date,
            archived: row.archived,
        })
    }
}
