use chrono::NaiveDate;
use uuid::Uuid;

use crate::error::{ValidationError, ValidationErrors};
use crate::models::{Frequency, MeasurementGoal, MeasurementType, Task, TaskKind};

pub const MAX_TITLE_CHARS: usize = 200;

#[derive(Debug, Clone)]
pub struct NewGoal {
    pub title: String,
}

#[derive(Debug, Clone)]
pub struct NewArea {
    pub goal_id: Uuid,
    pub title: String,
}

#[derive(Debug, Clone)]
pub struct NewTask {
    pub area_id: Uuid,
    pub title: String,
    pub kind: TaskKind,
    pub start_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub frequency: Option<Frequency>,
    pub frequency_days: Vec<u32>,
    pub weight: i32,
    pub measurement_type: MeasurementType,
    pub measurement_goal: Option<MeasurementGoal>,
}

/// Fields a user may change on an existing task; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct TaskEdit {
    pub title: Option<String>,
    pub weight: Option<i32>,
    pub due_date: Option<NaiveDate>,
    pub frequency: Option<Frequency>,
    pub frequency_days: Option<Vec<u32>>,
    pub target_count: Option<f64>,
}

#[derive(Default)]
struct Checks(Vec<ValidationError>);

impl Checks {
    fn fail(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(ValidationError {
            field,
            message: message.into(),
        });
    }

    fn title(&mut self, title: &str) {
        let trimmed = title.trim();
        if trimmed.is_empty() {
            self.fail("title", "must not be blank");
        } else if trimmed.chars().count() > MAX_TITLE_CHARS {
            self.fail(
                "title",
                format!("must be at most {MAX_TITLE_CHARS} characters"),
            );
        }
    }

    fn finish(self) -> Result<(), ValidationErrors> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors(self.0))
        }
    }
}

impl NewGoal {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut checks = Checks::default();
        checks.title(&self.title);
        checks.finish()
    }
}

impl NewArea {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut checks = Checks::default();
        checks.title(&self.title);
        checks.finish()
    }
}

impl NewTask {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut checks = Checks::default();
        checks.title(&self.title);
        check_task_fields(
            &mut checks,
            self.kind,
            self.start_date,
            self.due_date,
            self.frequency.as_ref(),
            &self.frequency_days,
            self.weight,
            self.measurement_type,
            self.measurement_goal.as_ref(),
        );
        checks.finish()
    }
}

impl TaskEdit {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.weight.is_none()
            && self.due_date.is_none()
            && self.frequency.is_none()
            && self.frequency_days.is_none()
            && self.target_count.is_none()
    }

    /// Returns the task as it would look after the edit, or every field
    /// problem the edit introduces.
    pub fn apply(self, task: &Task) -> Result<Task, ValidationErrors> {
        let mut updated = task.clone();
        let sets_target = self.target_count.is_some();
        if let Some(title) = self.title {
            updated.title = title.trim().to_string();
        }
        if let Some(weight) = self.weight {
            updated.weight = weight;
        }
        if let Some(due_date) = self.due_date {
            updated.due_date = Some(due_date);
        }
        if let Some(frequency) = self.frequency {
            updated.frequency = Some(frequency);
        }
        if let Some(days) = self.frequency_days {
            updated.frequency_days = days;
        }
        if let Some(target_count) = self.target_count {
            let unit = updated
                .measurement_goal
                .as_ref()
                .map(|goal| goal.unit.clone())
                .unwrap_or_default();
            updated.measurement_goal = Some(MeasurementGoal { target_count, unit });
        }

        let mut checks = Checks::default();
        checks.title(&updated.title);
        if sets_target && updated.measurement_type != MeasurementType::Quantitative {
            checks.fail("target_count", "only quantitative tasks have a target");
        }
        check_task_fields(
            &mut checks,
            updated.kind,
            updated.start_date,
            updated.due_date,
            updated.frequency.as_ref(),
            &updated.frequency_days,
            updated.weight,
            updated.measurement_type,
            updated.measurement_goal.as_ref(),
        );
        checks.finish()?;
        Ok(updated)
    }
}

#[allow(clippy::too_many_arguments)]
fn check_task_fields(
    checks: &mut Checks,
    kind: TaskKind,
    start_date: NaiveDate,
    due_date: Option<NaiveDate>,
    frequency: Option<&Frequency>,
    frequency_days: &[u32],
    weight: i32,
    measurement_type: MeasurementType,
    measurement_goal: Option<&MeasurementGoal>,
) {
    if !(1..=5).contains(&weight) {
        checks.fail("weight", "must be between 1 and 5");
    }

    if let Some(due) = due_date {
        if due < start_date {
            checks.fail("due_date", "must not be before the start date");
        }
    }

    if kind == TaskKind::Habit {
        match frequency {
            None => checks.fail("frequency", "is required for habits"),
            Some(Frequency::Unrecognized(raw)) => {
                checks.fail("frequency", format!("`{raw}` is not a known frequency"))
            }
            Some(Frequency::SpecificDays) => {
                if frequency_days.is_empty() {
                    checks.fail("frequency_days", "pick at least one weekday");
                } else if frequency_days.iter().any(|day| *day > 6) {
                    checks.fail("frequency_days", "weekdays are numbered 0 (Sunday) to 6");
                }
            }
            Some(_) => {}
        }
    }

    if measurement_type == MeasurementType::Quantitative {
        match measurement_goal {
            None => checks.fail("measurement_goal", "is required for quantitative tracking"),
            Some(goal) => {
                if !goal.target_count.is_finite() || goal.target_count <= 0.0 {
                    checks.fail("target_count", "must be a finite number greater than zero");
                }
                if goal.unit.trim().is_empty() {
                    checks.fail("unit", "must not be blank");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::tests::{date, habit};

    fn new_habit() -> NewTask {
        NewTask {
            area_id: Uuid::new_v4(),
            title: "Read".to_string(),
            kind: TaskKind::Habit,
            start_date: date(2026, 10, 1),
            due_date: None,
            frequency: Some(Frequency::Daily),
            frequency_days: Vec::new(),
            weight: 3,
            measurement_type: MeasurementType::Binary,
            measurement_goal: None,
        }
    }

    #[test]
    fn accepts_a_plain_habit() {
        assert!(new_habit().validate().is_ok());
    }

    #[test]
    fn blank_titles_are_rejected() {
        let goal = NewGoal {
            title: "   ".to_string(),
        };
        let errors = goal.validate().unwrap_err();
        assert!(errors.has_field("title"));

        let long = NewArea {
            goal_id: Uuid::new_v4(),
            title: "x".repeat(MAX_TITLE_CHARS + 1),
        };
        assert!(long.validate().unwrap_err().has_field("title"));
    }

    #[test]
    fn collects_every_failing_field() {
        let mut task = new_habit();
        task.title = String::new();
        task.weight = 9;
        task.frequency = Some(Frequency::SpecificDays);
        task.measurement_type = MeasurementType::Quantitative;

        let errors = task.validate().unwrap_err();
        assert!(errors.has_field("title"));
        assert!(errors.has_field("weight"));
        assert!(errors.has_field("frequency_days"));
        assert!(errors.has_field("measurement_goal"));
        assert_eq!(errors.0.len(), 4);
    }

    #[test]
    fn habits_need_a_known_frequency() {
        let mut task = new_habit();
        task.frequency = Some(Frequency::parse("hourly"));
        assert!(task.validate().unwrap_err().has_field("frequency"));

        task.kind = TaskKind::Task;
        task.frequency = None;
        assert!(task.validate().is_ok());
    }

    #[test]
    fn quantitative_goal_needs_target_and_unit() {
        let mut task = new_habit();
        task.measurement_type = MeasurementType::Quantitative;
        task.measurement_goal = Some(MeasurementGoal {
            target_count: 0.0,
            unit: " ".to_string(),
        });
        let errors = task.validate().unwrap_err();
        assert!(errors.has_field("target_count"));
        assert!(errors.has_field("unit"));

        task.measurement_goal = Some(MeasurementGoal {
            target_count: f64::INFINITY,
            unit: "pages".to_string(),
        });
        let errors = task.validate().unwrap_err();
        assert!(errors.has_field("target_count"));
        assert_eq!(errors.0.len(), 1);
    }

    #[test]
    fn due_date_cannot_precede_start() {
        let mut task = new_habit();
        task.kind = TaskKind::Task;
        task.due_date = Some(date(2026, 9, 30));
        assert!(task.validate().unwrap_err().has_field("due_date"));
    }

    #[test]
    fn edit_applies_and_revalidates() {
        let stored = habit(Uuid::new_v4(), Frequency::Daily, 2);
        let edit = TaskEdit {
            title: Some("  Journal ".to_string()),
            weight: Some(4),
            ..TaskEdit::default()
        };
        let updated = edit.apply(&stored).unwrap();
        assert_eq!(updated.title, "Journal");
        assert_eq!(updated.weight, 4);
        assert_eq!(updated.id, stored.id);

        let bad = TaskEdit {
            frequency: Some(Frequency::SpecificDays),
            ..TaskEdit::default()
        };
        assert!(bad.apply(&stored).unwrap_err().has_field("frequency_days"));
        assert!(TaskEdit::default().is_empty());
    }

    #[test]
    fn target_edit_needs_a_quantitative_task() {
        let binary = habit(Uuid::new_v4(), Frequency::Daily, 1);
        let edit = TaskEdit {
            target_count: Some(10.0),
            ..TaskEdit::default()
        };
        let errors = edit.apply(&binary).unwrap_err();
        assert!(errors.has_field("target_count"));

        let mut reading = habit(Uuid::new_v4(), Frequency::Daily, 1);
        reading.measurement_type = MeasurementType::Quantitative;
        reading.measurement_goal = Some(MeasurementGoal {
            target_count: 20.0,
            unit: "pages".to_string(),
        });
        let edit = TaskEdit {
            target_count: Some(30.0),
            ..TaskEdit::default()
        };
        let updated = edit.apply(&reading).unwrap();
        assert_eq!(
            updated.measurement_goal,
            Some(MeasurementGoal {
                target_count: 30.0,
                unit: "pages".to_string(),
            })
        );
    }
}
