//! Integration tests for the weekly report and seasonal projects.

mod common;

use chrono::NaiveDate;

use common::*;
use track::report::{seasonal_projects, weekly_report};

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn log_hours(store: &mut AppStore, day: &str, project_id: &str, hours: f64) {
    store.set_current_date(day);
    let entry = store.add_entry(project_id, Section::Today);
    store.update_entry_time(day, &entry, hours);
}

#[test]
fn test_weekly_report_totals() {
    let (mut store, writing) = store_with_project("Writing");
    let admin = store.add_project("Admin");

    // Week of Monday 2024-03-04
    log_hours(&mut store, "2024-03-04", &writing, 2.0);
    log_hours(&mut store, "2024-03-04", &writing, 0.5);
    log_hours(&mut store, "2024-03-06", &admin, 1.0);
    log_hours(&mut store, "2024-03-10", &writing, 3.0);
    log_hours(&mut store, "2024-03-10", &admin, 0.0);
    // Outside the week
    log_hours(&mut store, "2024-03-03", &writing, 8.0);
    log_hours(&mut store, "2024-03-11", &admin, 8.0);

    let report = weekly_report(store.data(), date("2024-03-07"));

    assert_eq!(report.week_start, date("2024-03-04"));
    assert_eq!(report.week_end(), date("2024-03-10"));
    assert_eq!(report.days()[2], date("2024-03-06"));

    assert_eq!(report.rows.len(), 2);
    assert_eq!(report.rows[0].name, "Writing");
    assert_eq!(report.rows[0].total, 5.5);
    assert_eq!(report.rows[0].daily_totals[0], 2.5);
    assert_eq!(report.rows[0].daily_totals[6], 3.0);
    assert_eq!(report.rows[1].name, "Admin");
    assert_eq!(report.rows[1].total, 1.0);

    assert_eq!(report.column_totals[0], 2.5);
    assert_eq!(report.column_totals[2], 1.0);
    assert_eq!(report.column_totals[1], 0.0);
    assert_eq!(report.grand_total, 6.5);
}

#[test]
fn test_weekly_report_labels_missing_projects() {
    let mut store = AppStore::in_memory(AppData::default());
    log_hours(&mut store, DAY, "gone", 1.25);

    let report = weekly_report(store.data(), date(DAY));
    assert_eq!(report.rows.len(), 1);
    assert_eq!(report.rows[0].name, "(Deleted project)");
    assert_eq!(report.rows[0].project_id, "gone");
}

#[test]
fn test_weekly_report_includes_archived_projects() {
    let (mut store, id) = store_with_project("Finished");
    log_hours(&mut store, DAY, &id, 1.0);
    store.delete_project(&id);

    let report = weekly_report(store.data(), date(DAY));
    assert_eq!(report.rows[0].name, "Finished");
}

#[test]
fn test_empty_week() {
    let store = AppStore::in_memory(AppData::default());
    let report = weekly_report(store.data(), date(DAY));
    assert!(report.rows.is_empty());
    assert_eq!(report.grand_total, 0.0);
}

#[test]
fn test_seasonal_projects() {
    let mut store = AppStore::in_memory(AppData::default());
    let taxes = store.add_project("Taxes");
    let garden = store.add_project("Garden");
    let skiing = store.add_project("Skiing");
    let old = store.add_project("Old");
    store.add_project("Always");

    store.set_project_active_window(&taxes, Some((2, 4)));
    store.set_project_active_window(&garden, Some((5, 9)));
    store.set_project_active_window(&skiing, Some((12, 2)));
    store.set_project_active_window(&old, Some((3, 3)));
    store.delete_project(&old);

    let march = seasonal_projects(&store.data().projects, 3);
    assert_eq!(march.active, vec!["Taxes".to_string()]);
    assert_eq!(march.upcoming, vec![("Garden".to_string(), 5)]);

    let january = seasonal_projects(&store.data().projects, 1);
    assert_eq!(january.active, vec!["Skiing".to_string()]);
    assert_eq!(january.upcoming, vec![("Taxes".to_string(), 2)]);
}
