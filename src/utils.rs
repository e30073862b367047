use chrono::NaiveDate;
use directories::{BaseDirs, ProjectDirs};
use std::path::PathBuf;

/// Date format used for day keys and exported file names
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Upper bound for hours logged on a single entry
pub const MAX_HOURS: f64 = 24.0;

/// Profile mode for the application (dev or prod)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Dev,
    Prod,
}

impl Profile {
    fn app_name(self) -> &'static str {
        match self {
            Profile::Dev => "track-dev",
            Profile::Prod => "track",
        }
    }
}

/// Get the configuration directory path for Track
/// If profile is Dev, uses "track-dev" instead of "track"
pub fn get_config_dir(profile: Profile) -> Option<PathBuf> {
    ProjectDirs::from("com", "track", profile.app_name())
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the data directory path for Track
/// If profile is Dev, uses "track-dev" instead of "track"
pub fn get_data_dir(profile: Profile) -> Option<PathBuf> {
    ProjectDirs::from("com", "track", profile.app_name())
        .map(|dirs| dirs.data_dir().to_path_buf())
}

/// Expand `~` in a path string to the user's home directory
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Parse a date string in ISO 8601 format (YYYY-MM-DD)
pub fn parse_date(date_str: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(date_str, DATE_FORMAT)
}

/// Format a date as a day key (YYYY-MM-DD)
pub fn date_key(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Get the current local date as an ISO 8601 string (YYYY-MM-DD)
pub fn get_current_date_string() -> String {
    chrono::Local::now().format(DATE_FORMAT).to_string()
}

/// Fresh identifier for projects, entries, todos and saved notes
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Clamp hours to [0, 24] and round to two decimals
pub fn clamp_hours(hours: f64) -> f64 {
    if hours.is_nan() {
        return 0.0;
    }
    (hours.clamp(0.0, MAX_HOURS) * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_hours_bounds_and_rounds() {
        assert_eq!(clamp_hours(30.0), 24.0);
        assert_eq!(clamp_hours(-5.0), 0.0);
        assert_eq!(clamp_hours(1.23456), 1.23);
        assert_eq!(clamp_hours(2.005_1), 2.01);
        assert_eq!(clamp_hours(f64::NAN), 0.0);
        assert_eq!(clamp_hours(f64::INFINITY), 24.0);
    }

    #[test]
    fn date_key_round_trips_through_parse() {
        let date = parse_date("2024-02-29").unwrap();
        assert_eq!(date_key(date), "2024-02-29");
        assert!(parse_date("2024-13-01").is_err());
    }

    #[test]
    fn expand_path_leaves_absolute_paths_alone() {
        assert_eq!(expand_path("/tmp/track"), PathBuf::from("/tmp/track"));
    }
}
