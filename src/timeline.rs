use chrono::{Datelike, NaiveDate};
use clap::ValueEnum;
use uuid::Uuid;

use crate::models::{CompletionLog, Hierarchy, ProgressPoint};
use crate::progress;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Granularity {
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

/// Which level of the hierarchy a series follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Overall,
    Goal(Uuid),
    Area(Uuid),
}

pub fn bucket_label(date: NaiveDate, granularity: Granularity) -> String {
    match granularity {
        Granularity::Day => date.format("%Y-%m-%d").to_string(),
        Granularity::Week => {
            let week = date.iso_week();
            format!("{}-W{:02}", week.year(), week.week())
        }
        Granularity::Month => date.format("%Y-%m").to_string(),
        Granularity::Quarter => format!("{}-Q{}", date.year(), (date.month() - 1) / 3 + 1),
        Granularity::Year => date.year().to_string(),
    }
}

/// Progress of `scope` on a single day. A scope that is archived or missing
/// has no active children and therefore reads as complete.
pub fn scoped_progress(
    hierarchy: &Hierarchy,
    logs: &[CompletionLog],
    day: NaiveDate,
    scope: Scope,
) -> f64 {
    match scope {
        Scope::Overall => progress::daily_progress(hierarchy, logs, day).overall,
        Scope::Goal(goal_id) => hierarchy
            .goals
            .iter()
            .find(|goal| goal.id == goal_id && !goal.archived)
            .map(|goal| {
                progress::goal_progress(goal, &hierarchy.areas, &hierarchy.tasks, logs, day)
                    .progress
            })
            .unwrap_or(100.0),
        Scope::Area(area_id) => hierarchy
            .areas
            .iter()
            .find(|area| area.id == area_id && !area.archived)
            .map(|area| progress::area_progress(area, &hierarchy.tasks, logs, day).progress)
            .unwrap_or(100.0),
    }
}

/// Every day in `[from, to]` is scored independently, then days sharing a
/// bucket are averaged. Buckets at the edges only cover the days in range.
pub fn progress_over_time(
    hierarchy: &Hierarchy,
    logs: &[CompletionLog],
    from: NaiveDate,
    to: NaiveDate,
    granularity: Granularity,
    scope: Scope,
) -> Vec<ProgressPoint> {
    let daily = from
        .iter_days()
        .take_while(|day| *day <= to)
        .map(|day| (day, scoped_progress(hierarchy, logs, day, scope)));

    bucket_daily_values(daily, granularity)
}

/// Averages ordered daily values into consecutive buckets.
pub fn bucket_daily_values(
    daily: impl IntoIterator<Item = (NaiveDate, f64)>,
    granularity: Granularity,
) -> Vec<ProgressPoint> {
    let mut buckets: Vec<(String, f64, usize)> = Vec::new();

    for (day, value) in daily {
        let label = bucket_label(day, granularity);
        match buckets.last_mut() {
            Some((last, total, count)) if *last == label => {
                *total += value;
                *count += 1;
            }
            _ => buckets.push((label, value, 1)),
        }
    }

    buckets
        .into_iter()
        .map(|(label, total, count)| ProgressPoint {
            label,
            value: total / count as f64,
        })
        .collect()
}

pub fn month_bounds(day: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = progress::month_start(day);
    let next_month = if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
    };
    let last = next_month
        .and_then(|next| next.pred_opt())
        .unwrap_or(first);
    (first, last)
}

pub fn month_calendar(
    hierarchy: &Hierarchy,
    logs: &[CompletionLog],
    day_in_month: NaiveDate,
) -> Vec<ProgressPoint> {
    let (first, last) = month_bounds(day_in_month);
    progress_over_time(hierarchy, logs, first, last, Granularity::Day, Scope::Overall)
}
