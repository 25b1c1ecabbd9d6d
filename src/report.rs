use std::fmt::Write;

use chrono::NaiveDate;

use crate::models::{CompletionLog, DailyProgress, Hierarchy, ProgressPoint, TaskKind};
use crate::progress;

#[derive(Debug, Clone, PartialEq)]
pub struct HabitStreak {
    pub title: String,
    pub days: u32,
}

/// Active habits with a running streak, longest first.
pub fn habit_streaks(
    hierarchy: &Hierarchy,
    logs: &[CompletionLog],
    reference: NaiveDate,
) -> Vec<HabitStreak> {
    let daily = progress::daily_progress(hierarchy, logs, reference);
    let active: Vec<uuid::Uuid> = daily
        .goals
        .iter()
        .flat_map(|goal| goal.areas.iter())
        .flat_map(|area| area.tasks.iter())
        .filter(|task| task.kind == TaskKind::Habit)
        .map(|task| task.task_id)
        .collect();

    let mut streaks: Vec<HabitStreak> = hierarchy
        .tasks
        .iter()
        .filter(|task| active.contains(&task.id))
        .map(|task| HabitStreak {
            title: task.title.clone(),
            days: progress::current_streak(task, logs, reference),
        })
        .filter(|streak| streak.days > 0)
        .collect();

    streaks.sort_by(|a, b| b.days.cmp(&a.days).then_with(|| a.title.cmp(&b.title)));
    streaks
}

pub fn build_report(
    daily: &DailyProgress,
    trend: &[ProgressPoint],
    streaks: &[HabitStreak],
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Cenit Progress Report");
    let _ = writeln!(output, "Generated for {}", daily.date);
    let _ = writeln!(output);
    let _ = writeln!(output, "Overall progress: {:.0}%", daily.overall);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Goals");

    if daily.goals.is_empty() {
        let _ = writeln!(output, "No active goals.");
    } else {
        for goal in daily.goals.iter() {
            let _ = writeln!(output, "- {}: {:.0}%", goal.title, goal.progress);
            for area in goal.areas.iter() {
                let _ = writeln!(
                    output,
                    "  - {}: {:.0}% ({} tasks)",
                    area.title,
                    area.progress,
                    area.tasks.len()
                );
            }
        }
    }

    let open: Vec<_> = daily
        .goals
        .iter()
        .flat_map(|goal| goal.areas.iter())
        .flat_map(|area| area.tasks.iter().map(move |task| (area, task)))
        .filter(|(_, task)| task.progress < 100.0)
        .collect();

    let _ = writeln!(output);
    let _ = writeln!(output, "## Still Open");

    if open.is_empty() {
        let _ = writeln!(output, "Everything scheduled for this day is done.");
    } else {
        for (area, task) in open {
            let _ = writeln!(
                output,
                "- {} ({}, weight {}) at {:.0}%",
                task.title, area.title, task.weight, task.progress
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Streaks");

    if streaks.is_empty() {
        let _ = writeln!(output, "No running streaks.");
    } else {
        for streak in streaks.iter().take(10) {
            let _ = writeln!(output, "- {}: {} days", streak.title, streak.days);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Days");

    if trend.is_empty() {
        let _ = writeln!(output, "No history for this window.");
    } else {
        for point in trend.iter() {
            let _ = writeln!(output, "- {}: {:.0}%", point.label, point.value);
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Area, Frequency, Goal};
    use crate::progress::tests::{date, habit, log};
    use uuid::Uuid;

    fn hierarchy() -> (Hierarchy, Vec<CompletionLog>) {
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
        let mut bedtime = habit(area.id, Frequency::Daily, 1);
        bedtime.title = "Lights out by 23:00".to_string();
        let mut stretch = habit(area.id, Frequency::Daily, 1);
        stretch.title = "Stretch".to_string();
        let logs = vec![
            log(&bedtime, date(2026, 10, 14), None),
            log(&bedtime, date(2026, 10, 15), None),
        ];
        let hierarchy = Hierarchy {
            goals: vec![goal],
            areas: vec![area],
            tasks: vec![bedtime, stretch],
        };
        (hierarchy, logs)
    }

    #[test]
    fn streaks_skip_broken_habits() {
        let (hierarchy, logs) = hierarchy();
        let streaks = habit_streaks(&hierarchy, &logs, date(2026, 10, 15));
        assert_eq!(
            streaks,
            vec![HabitStreak {
                title: "Lights out by 23:00".to_string(),
                days: 2,
            }]
        );
    }

    #[test]
    fn report_lists_goals_and_open_tasks() {
        let (hierarchy, logs) = hierarchy();
        let day = date(2026, 10, 15);
        let daily = progress::daily_progress(&hierarchy, &logs, day);
        let streaks = habit_streaks(&hierarchy, &logs, day);
        let trend = vec![ProgressPoint {
            label: "2026-10-15".to_string(),
            value: 50.0,
        }];

        let report = build_report(&daily, &trend, &streaks);
        assert!(report.contains("Overall progress: 50%"));
        assert!(report.contains("- Health: 50%"));
        assert!(report.contains("  - Sleep: 50% (2 tasks)"));
        assert!(report.contains("- Stretch (Sleep, weight 1) at 0%"));
        assert!(report.contains("- Lights out by 23:00: 2 days"));
        assert!(report.contains("- 2026-10-15: 50%"));
    }

    #[test]
    fn empty_report_has_placeholders() {
        let daily = progress::daily_progress(&Hierarchy::default(), &[], date(2026, 10, 15));
        let report = build_report(&daily, &[], &[]);
        assert!(report.contains("Overall progress: 100%"));
        assert!(report.contains("No active goals."));
        assert!(report.contains("No running streaks."));
        assert!(report.contains("No history for this window."));
    }
}
