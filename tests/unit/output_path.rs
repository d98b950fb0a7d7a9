//! Unit tests for output path layout and day splitting

use access_log_exporter::output::{split_into_day_ranges, OutputPathBuilder};
use access_log_exporter::ExportWindow;
use chrono::{NaiveDate, TimeZone, Utc};
use std::path::PathBuf;

#[test]
fn test_path_uses_domain_folder_and_day() {
    let path = OutputPathBuilder::new(PathBuf::from("out"), "blog.example.net")
        .with_day(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap())
        .build()
        .unwrap();

    assert_eq!(
        path,
        PathBuf::from("out/blog.example.net/blog.example.net-2024-02-29.log")
    );
}

#[test]
fn test_path_sanitizes_separators() {
    let path = OutputPathBuilder::new(PathBuf::from("out"), "evil/../name:8080")
        .with_day(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
        .build()
        .unwrap();

    assert_eq!(path.parent().unwrap().parent().unwrap(), PathBuf::from("out"));
    assert!(!path.to_string_lossy().contains(".."));
}

#[test]
fn test_split_across_month_boundary() {
    let window = ExportWindow::parse("2025-01-30", "2025-02-02").unwrap();
    let ranges = split_into_day_ranges(&window);

    let days: Vec<String> = ranges
        .iter()
        .map(|r| r.day.format("%Y-%m-%d").to_string())
        .collect();
    assert_eq!(days, vec!["2025-01-30", "2025-01-31", "2025-02-01", "2025-02-02"]);

    // Contiguous, non-overlapping slices covering the window
    assert_eq!(ranges.first().unwrap().start, window.after());
    assert_eq!(ranges.last().unwrap().end, window.before());
    for pair in ranges.windows(2) {
        assert_eq!(pair[0].end, pair[1].start);
    }
}

#[test]
fn test_split_sub_day_window() {
    let window = ExportWindow::parse("2025-06-01T08:00:00Z", "2025-06-01T09:30:00Z").unwrap();
    let ranges = split_into_day_ranges(&window);

    assert_eq!(ranges.len(), 1);
    assert_eq!(ranges[0].start, Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap());
    assert_eq!(ranges[0].end, Utc.with_ymd_and_hms(2025, 6, 1, 9, 30, 0).unwrap());
    assert_eq!(ranges[0].window(), window);
}
