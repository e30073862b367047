//! Weekly totals and seasonal project windows derived from `AppData`.

use chrono::{Datelike, Duration, NaiveDate};
use std::collections::HashMap;

use crate::models::{AppData, Project};
use crate::store::DELETED_PROJECT_LABEL;
use crate::utils::date_key;

/// Months ahead in which a project counts as "upcoming"
pub const DEFAULT_UPCOMING_WINDOW: u8 = 2;

const MONTH_NAMES: [&str; 12] = [
    "January", "February", "March", "April", "May", "June",
    "July", "August", "September", "October", "November", "December",
];

#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub project_id: String,
    pub name: String,
    pub daily_totals: [f64; 7],
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyReport {
    pub week_start: NaiveDate,
    pub rows: Vec<ReportRow>,
    pub column_totals: [f64; 7],
    pub grand_total: f64,
}

impl WeeklyReport {
    /// Monday through Sunday of the reported week
    pub fn days(&self) -> [NaiveDate; 7] {
        std::array::from_fn(|i| self.week_start + Duration::days(i as i64))
    }

    pub fn week_end(&self) -> NaiveDate {
        self.week_start + Duration::days(6)
    }
}

/// Monday of the week containing `date`
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// Hours per project per day for the week containing `anchor`.
///
/// Rows are sorted by total, largest first. Entries with no logged time are
/// skipped, so projects only appear once they have hours.
pub fn weekly_report(data: &AppData, anchor: NaiveDate) -> WeeklyReport {
    let start = week_start(anchor);
    let mut per_project: HashMap<&str, [f64; 7]> = HashMap::new();
    let mut first_seen: Vec<&str> = Vec::new();

    for offset in 0..7 {
        let key = date_key(start + Duration::days(offset as i64));
        let Some(day) = data.days.get(&key) else {
            continue;
        };
        for entry in day.entries.iter().filter(|e| e.time_spent > 0.0) {
            let totals = per_project.entry(entry.project_id.as_str()).or_insert_with(|| {
                first_seen.push(entry.project_id.as_str());
                [0.0; 7]
            });
            totals[offset] += entry.time_spent;
        }
    }

    let mut rows: Vec<ReportRow> = first_seen
        .into_iter()
        .map(|project_id| {
            let daily_totals = per_project[project_id];
            ReportRow {
                project_id: project_id.to_string(),
                name: data
                    .project(project_id)
                    .map_or(DELETED_PROJECT_LABEL, |p| p.name.as_str())
                    .to_string(),
                daily_totals,
                total: round2(daily_totals.iter().sum()),
            }
        })
        .collect();
    rows.sort_by(|a, b| b.total.total_cmp(&a.total));

    let column_totals: [f64; 7] =
        std::array::from_fn(|i| round2(rows.iter().map(|r| r.daily_totals[i]).sum()));
    let grand_total = round2(column_totals.iter().sum());

    WeeklyReport {
        week_start: start,
        rows,
        column_totals,
        grand_total,
    }
}

// Keeps sums like 0.1 + 0.2 printable
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Whether `month` falls in `start..=end`, wrapping across the year end
pub fn is_month_in_range(month: u8, start: u8, end: u8) -> bool {
    if start <= end {
        month >= start && month <= end
    } else {
        month >= start || month <= end
    }
}

/// Whether `start_month` begins within the next `window` months after `current_month`.
///
/// Windows longer than a year are treated as a full year.
pub fn is_month_upcoming(current_month: u8, start_month: u8, window: u8) -> bool {
    let current = u16::from(current_month);
    (1..=u16::from(window.min(12))).any(|i| (current + i - 1) % 12 + 1 == u16::from(start_month))
}

pub fn month_name(month: u8) -> &'static str {
    match month {
        1..=12 => MONTH_NAMES[usize::from(month) - 1],
        _ => "",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeasonalProjects {
    /// Names of projects whose window includes the month
    pub active: Vec<String>,
    /// Names and start months of projects starting soon
    pub upcoming: Vec<(String, u8)>,
}

/// Classify non-archived projects with a month window against `month`
pub fn seasonal_projects(projects: &[Project], month: u8) -> SeasonalProjects {
    let mut seasonal = SeasonalProjects::default();
    for project in projects.iter().filter(|p| !p.archived) {
        let (Some(start), Some(end)) = (project.start_month, project.end_month) else {
            continue;
        };
        if is_month_in_range(month, start, end) {
            seasonal.active.push(project.name.clone());
        } else if is_month_upcoming(month, start, DEFAULT_UPCOMING_WINDOW) {
            seasonal.upcoming.push((project.name.clone(), start));
        }
    }
    seasonal
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_range_wraps_year_end() {
        assert!(is_month_in_range(12, 11, 2));
        assert!(is_month_in_range(1, 11, 2));
        assert!(!is_month_in_range(5, 11, 2));
        assert!(is_month_in_range(5, 3, 8));
        assert!(!is_month_in_range(9, 3, 8));
    }

    #[test]
    fn upcoming_looks_ahead_across_december() {
        assert!(is_month_upcoming(11, 1, 2));
        assert!(is_month_upcoming(12, 1, 2));
        assert!(!is_month_upcoming(10, 1, 2));
        assert!(!is_month_upcoming(1, 1, 2));
    }

    #[test]
    fn upcoming_accepts_any_window_length() {
        assert!(is_month_upcoming(12, 11, u8::MAX));
        assert!(is_month_upcoming(12, 12, u8::MAX));
        assert!(!is_month_upcoming(12, 5, 0));
    }

    #[test]
    fn week_starts_on_monday() {
        let sunday = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        assert_eq!(week_start(sunday), NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
        let monday = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        assert_eq!(week_start(monday), monday);
    }

    #[test]
    fn month_names() {
        assert_eq!(month_name(1), "January");
        assert_eq!(month_name(12), "December");
        assert_eq!(month_name(13), "");
    }
}
