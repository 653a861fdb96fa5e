//! CLI output formatting.
//!
//! Results go to stdout through this module; diagnostics go to stderr
//! through `tracing`. Keeping the two apart means `unmark history list`
//! can be piped without log noise.
//!
//! # Output Format
//!
//! ## Parse
//!
//! ```text
//! 抖音 (douyin) video
//!     Title: 这是一个抖音视频示例标题 #热门 #推荐
//!     Author: 抖音创作者
//!     Duration: 15s
//!     001 https://v.douyin.com/demo-video.mp4
//!     Cover: https://p3.douyinpic.com/img/demo-cover.jpeg
//! Recorded 1734567890123_k3j9x0a2b
//! ```
//!
//! ## History
//!
//! ```text
//! 001 1734567890123_k3j9x0a2b  video  抖音  5 min ago
//!     这是一个抖音视频示例标题 #热门 #推荐
//! 002 1734567000000_q8w7e6r5t  image  local  12-01 09:30  [saved]
//!     本地图片去水印
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no clock reads.

use crate::imaging::BandOutput;
use crate::parse::ParseOutcome;
use crate::platform::{PlatformInfo, PlatformTag};
use crate::types::HistoryEntry;
use chrono::{DateTime, Datelike, Utc};
use std::path::PathBuf;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let head: String = text.chars().take(max).collect();
        format!("{head}...")
    }
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{}", line);
    }
}

/// Creation time relative to `now`: minutes or hours within a day, then a
/// date (with time of day when it is the same year). Times are UTC.
pub fn format_relative_time(created_at_millis: i64, now: DateTime<Utc>) -> String {
    let diff = now.timestamp_millis() - created_at_millis;
    if diff < 24 * 60 * 60 * 1000 {
        if diff < 60 * 1000 {
            return "just now".to_string();
        }
        if diff < 60 * 60 * 1000 {
            return format!("{} min ago", diff / 60_000);
        }
        return format!("{} h ago", diff / 3_600_000);
    }
    let Some(created) = DateTime::<Utc>::from_timestamp_millis(created_at_millis) else {
        return "unknown time".to_string();
    };
    if created.year() == now.year() {
        created.format("%m-%d %H:%M").to_string()
    } else {
        created.format("%Y-%m-%d").to_string()
    }
}

fn platform_label(platform: Option<PlatformTag>) -> &'static str {
    platform.map_or("local", PlatformTag::display_name)
}

// ============================================================================
// identify / platforms
// ============================================================================

pub fn format_identify(tag: PlatformTag, url: Option<&str>) -> Vec<String> {
    let mut lines = vec![format!("{} ({})", tag.display_name(), tag)];
    match url {
        Some(url) => lines.push(format!("{}URL: {}", indent(1), url)),
        None => lines.push(format!("{}URL: (none found)", indent(1))),
    }
    lines
}

pub fn print_identify(tag: PlatformTag, url: Option<&str>) {
    print_lines(format_identify(tag, url));
}

pub fn format_platforms(platforms: &[PlatformInfo]) -> Vec<String> {
    platforms
        .iter()
        .enumerate()
        .map(|(i, info)| {
            format!(
                "{} {} ({}): {}",
                format_index(i + 1),
                info.name,
                info.tag,
                info.domains.join(", ")
            )
        })
        .collect()
}

pub fn print_platforms(platforms: &[PlatformInfo]) {
    print_lines(format_platforms(platforms));
}

// ============================================================================
// parse
// ============================================================================

pub fn format_parse_outcome(outcome: &ParseOutcome, recorded: Option<&HistoryEntry>) -> Vec<String> {
    let result = &outcome.result;
    let mut lines = vec![format!(
        "{} ({}) {}",
        outcome.platform.display_name(),
        outcome.platform,
        result.media_type.label()
    )];
    lines.push(format!("{}Title: {}", indent(1), result.title));
    lines.push(format!("{}Author: {}", indent(1), result.author));
    if let Some(secs) = result.duration {
        lines.push(format!("{}Duration: {}s", indent(1), secs));
    }
    if let (Some(w), Some(h)) = (result.width, result.height) {
        lines.push(format!("{}Size: {}x{}", indent(1), w, h));
    }
    for (i, url) in result.media_urls().iter().enumerate() {
        lines.push(format!("{}{} {}", indent(1), format_index(i + 1), url));
    }
    if let Some(cover) = &result.cover_url {
        lines.push(format!("{}Cover: {}", indent(1), cover));
    }
    if let Some(entry) = recorded {
        lines.push(format!("Recorded {}", entry.id));
    }
    lines
}

pub fn print_parse_outcome(outcome: &ParseOutcome, recorded: Option<&HistoryEntry>) {
    print_lines(format_parse_outcome(outcome, recorded));
}

// ============================================================================
// crop
// ============================================================================

pub fn format_crop_output(output: &BandOutput, recorded: Option<&HistoryEntry>) -> Vec<String> {
    let r = &output.region;
    let mut lines = vec![
        format!(
            "Removed rows {}..{} ({} px band)",
            r.y,
            r.y + r.height,
            r.height
        ),
        format!(
            "{}{}x{} -> {}x{}",
            indent(1),
            output.source.width,
            output.source.height,
            output.output.width,
            output.output.height
        ),
        format!("{}Output: {}", indent(1), output.path.display()),
    ];
    if let Some(entry) = recorded {
        lines.push(format!("Recorded {}", entry.id));
    }
    lines
}

pub fn print_crop_output(output: &BandOutput, recorded: Option<&HistoryEntry>) {
    print_lines(format_crop_output(output, recorded));
}

// ============================================================================
// history
// ============================================================================

pub fn format_history_list(entries: &[HistoryEntry], now: DateTime<Utc>) -> Vec<String> {
    if entries.is_empty() {
        return vec!["No history yet".to_string()];
    }
    let mut lines = Vec::new();
    for (i, entry) in entries.iter().enumerate() {
        let mut header = format!(
            "{} {}  {}  {}  {}",
            format_index(i + 1),
            entry.id,
            entry.media_type.label(),
            platform_label(entry.platform),
            format_relative_time(entry.created_at, now)
        );
        if entry.saved_to_album {
            header.push_str("  [saved]");
        }
        lines.push(header);
        if let Some(title) = entry.title.as_deref().filter(|t| !t.is_empty()) {
            lines.push(format!("{}{}", indent(1), truncate(title, 40)));
        }
    }
    lines
}

pub fn print_history_list(entries: &[HistoryEntry], now: DateTime<Utc>) {
    print_lines(format_history_list(entries, now));
}

pub fn format_history_entry(entry: &HistoryEntry, now: DateTime<Utc>) -> Vec<String> {
    let mut lines = vec![entry.id.clone()];
    let field = |name: &str, value: &str| format!("{}{}: {}", indent(1), name, value);

    lines.push(field("Media", entry.media_type.label()));
    lines.push(field("Platform", platform_label(entry.platform)));
    if let Some(title) = &entry.title {
        lines.push(field("Title", title));
    }
    if let Some(author) = &entry.author {
        lines.push(field("Author", author));
    }
    if let Some(source) = &entry.source_url {
        lines.push(field("Source", source));
    }
    lines.push(field(
        "Created",
        &format_relative_time(entry.created_at, now),
    ));
    lines.push(field(
        "Saved",
        if entry.saved_to_album { "yes" } else { "no" },
    ));
    for (i, url) in entry.result_urls.iter().enumerate() {
        lines.push(format!("{}{} {}", indent(1), format_index(i + 1), url));
    }
    lines
}

pub fn print_history_entry(entry: &HistoryEntry, now: DateTime<Utc>) {
    print_lines(format_history_entry(entry, now));
}

// ============================================================================
// album
// ============================================================================

pub fn format_saved(paths: &[PathBuf]) -> Vec<String> {
    let mut lines: Vec<String> = paths
        .iter()
        .map(|p| format!("{}{}", indent(1), p.display()))
        .collect();
    let noun = if paths.len() == 1 { "file" } else { "files" };
    lines.insert(0, format!("Saved {} {}", paths.len(), noun));
    lines
}

pub fn print_saved(paths: &[PathBuf]) {
    print_lines(format_saved(paths));
}

/// One progress line, redrawn in place by the caller.
pub fn format_progress(label: &str, percent: u8) -> String {
    format!("{label} {percent:>3}%")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::{Dimensions, Rectangle};
    use crate::parse::{FixtureSource, parse_share_text};
    use crate::types::{MediaKind, RecordKind};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    fn entry(id: &str, created_at: i64) -> HistoryEntry {
        HistoryEntry {
            id: id.to_string(),
            kind: RecordKind::FromUrl,
            media_type: MediaKind::Video,
            source_url: Some("https://v.douyin.com/x".to_string()),
            platform: Some(PlatformTag::Douyin),
            title: Some("标题".to_string()),
            author: Some("作者".to_string()),
            result_urls: vec!["https://cdn/v.mp4".to_string()],
            cover_url: None,
            created_at,
            saved_to_album: false,
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    #[test]
    fn truncate_counts_characters_not_bytes() {
        assert_eq!(truncate("小红书笔记分享", 3), "小红书...");
        assert_eq!(truncate("short", 10), "short");
    }

    #[test]
    fn relative_time_within_a_day() {
        let now = now();
        let at = |secs: i64| now.timestamp_millis() - secs * 1000;
        assert_eq!(format_relative_time(at(30), now), "just now");
        assert_eq!(format_relative_time(at(5 * 60 + 10), now), "5 min ago");
        assert_eq!(format_relative_time(at(3 * 3600), now), "3 h ago");
    }

    #[test]
    fn relative_time_older_shows_dates() {
        let now = now();
        let same_year = Utc.with_ymd_and_hms(2024, 3, 2, 8, 5, 0).unwrap();
        let last_year = Utc.with_ymd_and_hms(2023, 12, 31, 23, 0, 0).unwrap();
        assert_eq!(
            format_relative_time(same_year.timestamp_millis(), now),
            "03-02 08:05"
        );
        assert_eq!(
            format_relative_time(last_year.timestamp_millis(), now),
            "2023-12-31"
        );
    }

    // =========================================================================
    // Command output
    // =========================================================================

    #[test]
    fn identify_lines() {
        assert_eq!(
            format_identify(PlatformTag::Douyin, Some("https://v.douyin.com/a")),
            vec!["抖音 (douyin)", "    URL: https://v.douyin.com/a"]
        );
        assert_eq!(
            format_identify(PlatformTag::Unknown, None)[1],
            "    URL: (none found)"
        );
    }

    #[test]
    fn parse_outcome_lists_media() {
        let outcome = parse_share_text(&FixtureSource, "http://xhslink.com/a").unwrap();
        let lines = format_parse_outcome(&outcome, None);
        assert_eq!(lines[0], "小红书 (xiaohongshu) images");
        assert!(lines.contains(&"    001 https://sns-img.xiaohongshu.com/demo1.jpg".to_string()));
        assert!(lines.contains(&"    003 https://sns-img.xiaohongshu.com/demo3.jpg".to_string()));
        assert!(!lines.iter().any(|l| l.contains("Duration")));
    }

    #[test]
    fn crop_output_summarizes_band() {
        let output = BandOutput {
            path: PathBuf::from("/tmp/unmark/out.png"),
            source: Dimensions {
                width: 100,
                height: 200,
            },
            output: Dimensions {
                width: 100,
                height: 150,
            },
            region: Rectangle::band(150, 50, 100),
        };
        let lines = format_crop_output(&output, None);
        assert_eq!(lines[0], "Removed rows 150..200 (50 px band)");
        assert_eq!(lines[1], "    100x200 -> 100x150");
        assert_eq!(lines[2], "    Output: /tmp/unmark/out.png");
    }

    #[test]
    fn history_list_marks_saved_entries() {
        let now = now();
        let mut saved = entry("b", now.timestamp_millis() - 120_000);
        saved.saved_to_album = true;
        saved.platform = None;
        let lines = format_history_list(&[entry("a", now.timestamp_millis()), saved], now);

        assert_eq!(lines[0], "001 a  video  抖音  just now");
        assert_eq!(lines[1], "    标题");
        assert_eq!(lines[2], "002 b  video  local  2 min ago  [saved]");
    }

    #[test]
    fn empty_history() {
        assert_eq!(format_history_list(&[], now()), vec!["No history yet"]);
    }

    #[test]
    fn history_entry_details() {
        let lines = format_history_entry(&entry("x", now().timestamp_millis()), now());
        assert_eq!(lines[0], "x");
        assert!(lines.contains(&"    Source: https://v.douyin.com/x".to_string()));
        assert!(lines.contains(&"    Saved: no".to_string()));
        assert_eq!(lines.last().unwrap(), "    001 https://cdn/v.mp4");
    }

    #[test]
    fn saved_summary() {
        let lines = format_saved(&[PathBuf::from("album/IMG_1.jpg")]);
        assert_eq!(lines, vec!["Saved 1 file", "    album/IMG_1.jpg"]);
        assert_eq!(format_saved(&[])[0], "Saved 0 files");
    }

    #[test]
    fn progress_is_right_aligned() {
        assert_eq!(format_progress("clip.mp4", 7), "clip.mp4   7%");
        assert_eq!(format_progress("clip.mp4", 100), "clip.mp4 100%");
    }
}
