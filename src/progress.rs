use chrono::{Datelike, Duration, NaiveDate};

use crate::models::{
    Area, AreaProgress, CompletionLog, DailyProgress, Frequency, Goal, GoalProgress, Hierarchy,
    MeasurementType, Snapshot, Task, TaskKind, TaskProgress,
};

/// Percentage in `[0, 100]` for one task on `reference`.
pub fn task_progress(task: &Task, logs: &[CompletionLog], reference: NaiveDate) -> f64 {
    if task.start_date > reference {
        return 0.0;
    }

    match task.kind {
        TaskKind::Task => match task.completion_date {
            Some(done) if done <= reference => 100.0,
            _ => 0.0,
        },
        TaskKind::Habit => habit_progress(task, logs, reference),
    }
}

fn habit_progress(task: &Task, logs: &[CompletionLog], reference: NaiveDate) -> f64 {
    let Some(frequency) = task.frequency.as_ref() else {
        return 0.0;
    };

    let (from, to) = match frequency {
        Frequency::Daily => (reference, reference),
        Frequency::Weekly => {
            let monday = week_start(reference);
            (monday, monday + Duration::days(6))
        }
        Frequency::Monthly => (month_start(reference), reference),
        Frequency::SpecificDays => {
            if !applies_on(task, reference) {
                return 100.0;
            }
            (reference, reference)
        }
        Frequency::Unrecognized(_) => return 0.0,
    };

    let mut relevant = logs.iter().filter(|log| {
        log.task_id == task.id && log.completion_date >= from && log.completion_date <= to
    });

    match (task.measurement_type, task.measurement_goal.as_ref()) {
        (MeasurementType::Quantitative, Some(goal)) if goal.target_count > 0.0 => {
            let total: f64 = relevant.filter_map(|log| log.progress_value).sum();
            (total / goal.target_count).clamp(0.0, 1.0) * 100.0
        }
        _ => {
            if relevant.next().is_some() {
                100.0
            } else {
                0.0
            }
        }
    }
}

/// Whether a `specific_days` habit is scheduled on `date`.
pub fn applies_on(task: &Task, date: NaiveDate) -> bool {
    task.frequency_days
        .contains(&date.weekday().num_days_from_sunday())
}

pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

pub fn month_start(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date)
}

/// Log dates that can influence any reference date in `[from, to]`: weekly
/// habits look at the whole week and monthly habits at the month so far.
pub fn log_window(from: NaiveDate, to: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = week_start(from).min(month_start(from));
    let end = week_start(to) + Duration::days(6);
    (start, end.max(to))
}

/// `Σ p·w / Σ w`; no children (or no weight) counts as complete.
pub fn weighted_mean(children: &[(f64, f64)]) -> f64 {
    let total_weight: f64 = children.iter().map(|(_, weight)| weight).sum();
    if children.is_empty() || total_weight <= 0.0 {
        return 100.0;
    }

    children
        .iter()
        .map(|(progress, weight)| progress * weight)
        .sum::<f64>()
        / total_weight
}

pub fn mean(children: &[f64]) -> f64 {
    if children.is_empty() {
        return 100.0;
    }
    children.iter().sum::<f64>() / children.len() as f64
}

pub fn area_progress(
    area: &Area,
    tasks: &[Task],
    logs: &[CompletionLog],
    reference: NaiveDate,
) -> AreaProgress {
    let tasks: Vec<TaskProgress> = tasks
        .iter()
        .filter(|task| task.area_id == area.id && !task.archived)
        .map(|task| TaskProgress {
            task_id: task.id,
            title: task.title.clone(),
            kind: task.kind,
            weight: task.weight,
            progress: task_progress(task, logs, reference),
        })
        .collect();

    let weighted: Vec<(f64, f64)> = tasks
        .iter()
        .map(|task| (task.progress, task.weight as f64))
        .collect();

    AreaProgress {
        area_id: area.id,
        title: area.title.clone(),
        progress: weighted_mean(&weighted),
        tasks,
    }
}

pub fn goal_progress(
    goal: &Goal,
    areas: &[Area],
    tasks: &[Task],
    logs: &[CompletionLog],
    reference: NaiveDate,
) -> GoalProgress {
    let areas: Vec<AreaProgress> = areas
        .iter()
        .filter(|area| area.goal_id == goal.id && !area.archived)
        .map(|area| area_progress(area, tasks, logs, reference))
        .collect();

    let values: Vec<f64> = areas.iter().map(|area| area.progress).collect();

    GoalProgress {
        goal_id: goal.id,
        title: goal.title.clone(),
        progress: mean(&values),
        areas,
    }
}

/// Full roll-up of the active hierarchy for one date. Nothing is cached;
/// every call starts from the raw rows.
pub fn daily_progress(
    hierarchy: &Hierarchy,
    logs: &[CompletionLog],
    reference: NaiveDate,
) -> DailyProgress {
    let goals: Vec<GoalProgress> = hierarchy
        .goals
        .iter()
        .filter(|goal| !goal.archived)
        .map(|goal| goal_progress(goal, &hierarchy.areas, &hierarchy.tasks, logs, reference))
        .collect();

    let values: Vec<f64> = goals.iter().map(|goal| goal.progress).collect();

    DailyProgress {
        date: reference,
        overall: mean(&values),
        goals,
    }
}

pub fn snapshots_for(daily: &DailyProgress) -> Vec<Snapshot> {
    let mut rows = Vec::new();
    for goal in daily.goals.iter() {
        rows.push(Snapshot {
            date: daily.date,
            goal_id: goal.goal_id,
            area_id: None,
            progress: goal.progress,
        });
        for area in goal.areas.iter() {
            rows.push(Snapshot {
                date: daily.date,
                goal_id: goal.goal_id,
                area_id: Some(area.area_id),
                progress: area.progress,
            });
        }
    }
    rows
}

/// Consecutive scheduled days up to `reference` on which a habit was met.
/// Unscheduled days of a `specific_days` habit neither count nor break it.
pub fn current_streak(task: &Task, logs: &[CompletionLog], reference: NaiveDate) -> u32 {
    if task.kind != TaskKind::Habit {
        return 0;
    }

    let mut streak = 0;
    let mut day = reference;
    while day >= task.start_date {
        let scheduled = task.frequency != Some(Frequency::SpecificDays) || applies_on(task, day);
        if scheduled {
            if task_progress(task, logs, day) < 100.0 {
                break;
            }
            streak += 1;
        }
        match day.pred_opt() {
            Some(previous) => day = previous,
            None => break,
        }
    }
    streak
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::MeasurementGoal;
    use uuid::Uuid;

    pub(crate) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    pub(crate) fn habit(area_id: Uuid, frequency: Frequency, weight: i32) -> Task {
        Task {
            id: Uuid::new_v4(),
            area_id,
            title: "Meditate".to_string(),
            kind: TaskKind::Habit,
            start_date: date(2026, 1, 1),
            due_date: None,
            completion_date: None,
            frequency: Some(frequency),
            frequency_days: Vec::new(),
            weight,
            measurement_type: MeasurementType::Binary,
            measurement_goal: None,
            archived: false,
        }
    }

    pub(crate) fn log(task: &Task, on: NaiveDate, value: Option<f64>) -> CompletionLog {
        CompletionLog {
            id: Uuid::new_v4(),
            task_id: task.id,
            completion_date: on,
            progress_value: value,
        }
    }

    fn quantitative(target: f64) -> Task {
        let mut task = habit(Uuid::new_v4(), Frequency::Daily, 1);
        task.measurement_type = MeasurementType::Quantitative;
        task.measurement_goal = Some(MeasurementGoal {
            target_count: target,
            unit: "pages".to_string(),
        });
        task
    }

    // 2026-10-15 is a Thursday.
    const TODAY: (i32, u32, u32) = (2026, 10, 15);

    fn today() -> NaiveDate {
        date(TODAY.0, TODAY.1, TODAY.2)
    }

    #[test]
    fn nothing_counts_before_start_date() {
        let mut task = habit(Uuid::new_v4(), Frequency::Daily, 1);
        task.start_date = date(2026, 10, 16);
        let logs = vec![log(&task, today(), None)];
        assert_eq!(task_progress(&task, &logs, today()), 0.0);

        let mut one_off = habit(Uuid::new_v4(), Frequency::Daily, 1);
        one_off.kind = TaskKind::Task;
        one_off.start_date = date(2026, 10, 20);
        one_off.completion_date = Some(today());
        assert_eq!(task_progress(&one_off, &[], today()), 0.0);
    }

    #[test]
    fn daily_habit_needs_a_log_on_the_day() {
        let task = habit(Uuid::new_v4(), Frequency::Daily, 1);
        assert_eq!(task_progress(&task, &[log(&task, today(), None)], today()), 100.0);
        assert_eq!(task_progress(&task, &[], today()), 0.0);
        let yesterday = vec![log(&task, date(2026, 10, 14), None)];
        assert_eq!(task_progress(&task, &yesterday, today()), 0.0);
    }

    #[test]
    fn duplicate_binary_logs_stay_at_one_hundred() {
        let task = habit(Uuid::new_v4(), Frequency::Daily, 1);
        let logs = vec![log(&task, today(), None), log(&task, today(), None)];
        assert_eq!(task_progress(&task, &logs, today()), 100.0);
    }

    #[test]
    fn logs_of_other_tasks_are_ignored() {
        let task = habit(Uuid::new_v4(), Frequency::Daily, 1);
        let other = habit(Uuid::new_v4(), Frequency::Daily, 1);
        assert_eq!(task_progress(&task, &[log(&other, today(), None)], today()), 0.0);
    }

    #[test]
    fn weekly_habit_uses_monday_based_week() {
        let task = habit(Uuid::new_v4(), Frequency::Weekly, 1);
        let monday = vec![log(&task, date(2026, 10, 12), None)];
        assert_eq!(task_progress(&task, &monday, today()), 100.0);

        let sunday_before = vec![log(&task, date(2026, 10, 11), None)];
        assert_eq!(task_progress(&task, &sunday_before, today()), 0.0);

        let sunday_after = vec![log(&task, date(2026, 10, 18), None)];
        assert_eq!(task_progress(&task, &sunday_after, today()), 100.0);
    }

    #[test]
    fn monthly_habit_counts_month_to_date() {
        let task = habit(Uuid::new_v4(), Frequency::Monthly, 1);
        let first = vec![log(&task, date(2026, 10, 1), None)];
        assert_eq!(task_progress(&task, &first, today()), 100.0);

        let later = vec![log(&task, date(2026, 10, 20), None)];
        assert_eq!(task_progress(&task, &later, today()), 0.0);

        let last_month = vec![log(&task, date(2026, 9, 30), None)];
        assert_eq!(task_progress(&task, &last_month, today()), 0.0);
    }

    #[test]
    fn specific_days_do_not_penalize_off_days() {
        let mut task = habit(Uuid::new_v4(), Frequency::SpecificDays, 1);
        // Monday and Wednesday
        task.frequency_days = vec![1, 3];
        assert_eq!(task_progress(&task, &[], today()), 100.0);

        let wednesday = date(2026, 10, 14);
        assert_eq!(task_progress(&task, &[], wednesday), 0.0);
        assert_eq!(
            task_progress(&task, &[log(&task, wednesday, None)], wednesday),
            100.0
        );
    }

    #[test]
    fn unrecognized_or_missing_frequency_scores_zero() {
        let task = habit(Uuid::new_v4(), Frequency::parse("fortnightly"), 1);
        assert_eq!(task_progress(&task, &[log(&task, today(), None)], today()), 0.0);

        let mut no_frequency = habit(Uuid::new_v4(), Frequency::Daily, 1);
        no_frequency.frequency = None;
        let logs = vec![log(&no_frequency, today(), None)];
        assert_eq!(task_progress(&no_frequency, &logs, today()), 0.0);
    }

    #[test]
    fn quantitative_progress_is_capped() {
        let task = quantitative(20.0);
        let logs = vec![log(&task, today(), Some(25.0))];
        assert_eq!(task_progress(&task, &logs, today()), 100.0);
    }

    #[test]
    fn quantitative_progress_sums_logs_in_window() {
        let task = quantitative(20.0);
        let logs = vec![
            log(&task, today(), Some(5.0)),
            log(&task, today(), Some(5.0)),
            log(&task, today(), None),
            log(&task, date(2026, 10, 14), Some(10.0)),
        ];
        assert!((task_progress(&task, &logs, today()) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn weekly_quantitative_sums_monday_through_sunday() {
        let mut task = quantitative(20.0);
        task.frequency = Some(Frequency::Weekly);
        let logs = vec![
            log(&task, date(2026, 10, 11), Some(100.0)),
            log(&task, date(2026, 10, 12), Some(5.0)),
            log(&task, date(2026, 10, 18), Some(5.0)),
            log(&task, date(2026, 10, 19), Some(100.0)),
        ];
        assert!((task_progress(&task, &logs, today()) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn monthly_quantitative_stops_at_reference_date() {
        let mut task = quantitative(20.0);
        task.frequency = Some(Frequency::Monthly);
        let logs = vec![
            log(&task, date(2026, 9, 30), Some(50.0)),
            log(&task, date(2026, 10, 1), Some(4.0)),
            log(&task, today(), Some(6.0)),
            log(&task, date(2026, 10, 20), Some(50.0)),
        ];
        assert!((task_progress(&task, &logs, today()) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn one_off_task_counts_once_completed() {
        let mut task = habit(Uuid::new_v4(), Frequency::Daily, 1);
        task.kind = TaskKind::Task;
        task.frequency = None;
        assert_eq!(task_progress(&task, &[], today()), 0.0);

        task.completion_date = Some(date(2026, 10, 10));
        assert_eq!(task_progress(&task, &[], today()), 100.0);

        task.completion_date = Some(date(2026, 10, 16));
        assert_eq!(task_progress(&task, &[], today()), 0.0);
    }

    #[test]
    fn log_window_covers_week_and_month() {
        // Thursday 2026-10-01: the week starts in September.
        let (start, end) = log_window(date(2026, 10, 1), today());
        assert_eq!(start, date(2026, 9, 28));
        assert_eq!(end, date(2026, 10, 18));

        let (start, _) = log_window(date(2026, 10, 15), today());
        assert_eq!(start, date(2026, 10, 1));
    }

    #[test]
    fn weighted_area_average() {
        let area = Area {
            id: Uuid::new_v4(),
            goal_id: Uuid::new_v4(),
            title: "Fitness".to_string(),
            archived: false,
        };
        let light = habit(area.id, Frequency::Daily, 1);
        let heavy = habit(area.id, Frequency::Daily, 3);
        let logs = vec![log(&heavy, today(), None)];

        let result = area_progress(&area, &[light, heavy], &logs, today());
        assert_eq!(result.tasks.len(), 2);
        assert!((result.progress - 75.0).abs() < 1e-9);
    }

    #[test]
    fn empty_parents_are_complete() {
        assert_eq!(weighted_mean(&[]), 100.0);
        assert_eq!(mean(&[]), 100.0);
        assert_eq!(weighted_mean(&[(40.0, 0.0)]), 100.0);
        assert_eq!(daily_progress(&Hierarchy::default(), &[], today()).overall, 100.0);
    }

    #[test]
    fn health_goal_scenario() {
        let goal = Goal {
            id: Uuid::new_v4(),
            title: "Health".to_string(),
            archived: false,
        };
        let fitness = Area {
            id: Uuid::new_v4(),
            goal_id: goal.id,
            title: "Fitness".to_string(),
            archived: false,
        };
        let sleep = Area {
            id: Uuid::new_v4(),
            goal_id: goal.id,
            title: "Sleep".to_string(),
            archived: false,
        };
        let bedtime = habit(sleep.id, Frequency::Daily, 1);
        let logs = vec![log(&bedtime, today(), None)];
        let hierarchy = Hierarchy {
            goals: vec![goal],
            areas: vec![fitness, sleep],
            tasks: vec![bedtime],
        };

        let daily = daily_progress(&hierarchy, &logs, today());
        let health = &daily.goals[0];
        assert_eq!(health.areas[0].progress, 100.0);
        assert_eq!(health.areas[1].progress, 100.0);
        assert_eq!(health.progress, 100.0);
        assert_eq!(daily.overall, 100.0);
    }

    #[test]
    fn archived_entities_are_left_out() {
        let goal = Goal {
            id: Uuid::new_v4(),
            title: "Career".to_string(),
            archived: false,
        };
        let archived_goal = Goal {
            id: Uuid::new_v4(),
            title: "Old".to_string(),
            archived: true,
        };
        let area = Area {
            id: Uuid::new_v4(),
            goal_id: goal.id,
            title: "Skills".to_string(),
            archived: false,
        };
        let old_area = Area {
            id: Uuid::new_v4(),
            goal_id: goal.id,
            title: "Dropped".to_string(),
            archived: true,
        };
        let done = habit(area.id, Frequency::Daily, 1);
        let mut shelved = habit(area.id, Frequency::Daily, 5);
        shelved.archived = true;
        let logs = vec![log(&done, today(), None)];
        let hierarchy = Hierarchy {
            goals: vec![goal, archived_goal],
            areas: vec![area, old_area],
            tasks: vec![done, shelved],
        };

        let daily = daily_progress(&hierarchy, &logs, today());
        assert_eq!(daily.goals.len(), 1);
        assert_eq!(daily.goals[0].areas.len(), 1);
        assert_eq!(daily.goals[0].areas[0].tasks.len(), 1);
        assert_eq!(daily.overall, 100.0);
    }

    #[test]
    fn snapshots_cover_goals_and_areas() {
        let goal = Goal {
            id: Uuid::new_v4(),
            title: "Health".to_string(),
            archived: false,
        };
        let area = Area {
            id: Uuid::new_v4(),
            goal_id: goal.id,
            title: "Sleep".to_string(),
            archived: false,
        };
        let hierarchy = Hierarchy {
            goals: vec![goal.clone()],
            areas: vec![area.clone()],
            tasks: vec![habit(area.id, Frequency::Daily, 1)],
        };

        let rows = snapshots_for(&daily_progress(&hierarchy, &[], today()));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].area_id, None);
        assert_eq!(rows[1].area_id, Some(area.id));
        assert!(rows.iter().all(|row| row.goal_id == goal.id && row.progress == 0.0));
    }

    #[test]
    fn streak_counts_back_to_first_miss() {
        let task = habit(Uuid::new_v4(), Frequency::Daily, 1);
        let logs = vec![
            log(&task, today(), None),
            log(&task, date(2026, 10, 14), None),
            log(&task, date(2026, 10, 13), None),
            log(&task, date(2026, 10, 11), None),
        ];
        assert_eq!(current_streak(&task, &logs, today()), 3);
    }

    #[test]
    fn streak_skips_unscheduled_days() {
        let mut task = habit(Uuid::new_v4(), Frequency::SpecificDays, 1);
        task.start_date = date(2026, 10, 1);
        // Monday and Wednesday
        task.frequency_days = vec![1, 3];
        let logs = vec![
            log(&task, date(2026, 10, 14), None),
            log(&task, date(2026, 10, 12), None),
        ];
        assert_eq!(current_streak(&task, &logs, today()), 2);
    }
}
