use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct Goal {
    pub id: Uuid,
    pub title: String,
    pub archived: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Area {
    pub id: Uuid,
    pub goal_id: Uuid,
    pub title: String,
    pub archived: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Habit,
    Task,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Habit => "habit",
            TaskKind::Task => "task",
        }
    }
}

/// How often a habit is expected to be performed.
///
/// Stored as free text in the database; values we do not know are kept as
/// `Unrecognized` and score 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    SpecificDays,
    Unrecognized(String),
}

impl Frequency {
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "daily" => Frequency::Daily,
            "weekly" => Frequency::Weekly,
            "monthly" => Frequency::Monthly,
            "specific_days" => Frequency::SpecificDays,
            other => Frequency::Unrecognized(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::SpecificDays => "specific_days",
            Frequency::Unrecognized(raw) => raw.as_str(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementType {
    Binary,
    Quantitative,
}

impl MeasurementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeasurementType::Binary => "binary",
            MeasurementType::Quantitative => "quantitative",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasurementGoal {
    pub target_count: f64,
    pub unit: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Task {
    pub id: Uuid,
    pub area_id: Uuid,
    pub title: String,
    pub kind: TaskKind,
    pub start_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub completion_date: Option<NaiveDate>,
    pub frequency: Option<Frequency>,
    /// Weekday numbers, 0 = Sunday.
    pub frequency_days: Vec<u32>,
    pub weight: i32,
    pub measurement_type: MeasurementType,
    pub measurement_goal: Option<MeasurementGoal>,
    pub archived: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompletionLog {
    pub id: Uuid,
    pub task_id: Uuid,
    pub completion_date: NaiveDate,
    pub progress_value: Option<f64>,
}

/// Everything the calculator needs, as fetched in one pass.
#[derive(Debug, Clone, Default)]
pub struct Hierarchy {
    pub goals: Vec<Goal>,
    pub areas: Vec<Area>,
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskProgress {
    pub task_id: Uuid,
    pub title: String,
    pub kind: TaskKind,
    pub weight: i32,
    pub progress: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AreaProgress {
    pub area_id: Uuid,
    pub title: String,
    pub progress: f64,
    pub tasks: Vec<TaskProgress>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GoalProgress {
    pub goal_id: Uuid,
    pub title: String,
    pub progress: f64,
    pub areas: Vec<AreaProgress>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyProgress {
    pub date: NaiveDate,
    pub overall: f64,
    pub goals: Vec<GoalProgress>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressPoint {
    pub label: String,
    pub value: f64,
}

/// One persisted row of `daily_progress_snapshots`. Goal-level rows have no
/// area.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub date: NaiveDate,
    pub goal_id: Uuid,
    pub area_id: Option<Uuid>,
    pub progress: f64,
}
