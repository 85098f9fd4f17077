//! Plain-text rendering of listings and download summaries.

use std::fmt::Write;

use crate::downloader::DownloadStats;
use crate::model::VideoRecord;

const TITLE_WIDTH: usize = 60;
const RULE_WIDTH: usize = 60;

/// `M:SS` below an hour, `H:MM:SS` above, `N/A` when unknown or zero.
pub fn format_duration(duration: Option<f64>) -> String {
    let Some(seconds) = duration.filter(|d| *d > 0.0) else {
        return "N/A".to_string();
    };
    let duration = seconds as i64;
    let hours = duration / 3600;
    let minutes = (duration % 3600) / 60;
    let seconds = duration % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

/// Renders the channel listing as an aligned table. `max_rows` of `None`
/// shows every video.
pub fn render_video_table(videos: &[VideoRecord], max_rows: Option<usize>) -> String {
    let shown = max_rows.map_or(videos.len(), |max| max.min(videos.len()));
    let rows: Vec<[String; 4]> = videos[..shown]
        .iter()
        .enumerate()
        .map(|(idx, video)| {
            [
                (idx + 1).to_string(),
                video.id.clone(),
                truncate(video.display_title(), TITLE_WIDTH),
                format_duration(video.duration),
            ]
        })
        .collect();

    let header = ["#", "Video ID", "Title", "Duration"];
    let mut widths = header.map(|h| h.chars().count());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let _ = writeln!(out, "Channel Videos");
    push_row(&mut out, &header.map(str::to_string), &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let _ = writeln!(out, "{}", rule.join("-+-"));
    for row in &rows {
        push_row(&mut out, row, &widths);
    }
    if shown < videos.len() {
        let _ = writeln!(out, "Showing {} of {} videos", shown, videos.len());
    }
    out
}

fn push_row(out: &mut String, cells: &[String; 4], widths: &[usize; 4]) {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| {
            let pad = width.saturating_sub(cell.chars().count());
            format!("{cell}{}", " ".repeat(pad))
        })
        .collect();
    let _ = writeln!(out, "{}", padded.join(" | ").trim_end());
}

pub fn render_summary(stats: &DownloadStats) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = String::new();
    let _ = writeln!(out, "\n{rule}");
    let _ = writeln!(out, "Download Summary");
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "Total videos:    {}", stats.total);
    let _ = writeln!(out, "✓ Successful:    {}", stats.success);
    let _ = writeln!(out, "✗ Failed:        {}", stats.failed);
    let _ = writeln!(out, "⊘ Skipped:       {}", stats.skipped);

    if !stats.failed_videos.is_empty() {
        let _ = writeln!(out, "\nFailed videos:");
        for video in &stats.failed_videos {
            let _ = writeln!(out, "  • {} ({})", video.title, video.id);
            let _ = writeln!(out, "    Error: {}", video.error);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::FailedVideo;

    #[test]
    fn duration_formats_cover_edge_cases() {
        assert_eq!(format_duration(Some(65.0)), "1:05");
        assert_eq!(format_duration(Some(3725.0)), "1:02:05");
        assert_eq!(format_duration(Some(59.9)), "0:59");
        assert_eq!(format_duration(Some(0.0)), "N/A");
        assert_eq!(format_duration(Some(-3.0)), "N/A");
        assert_eq!(format_duration(None), "N/A");
    }

    #[test]
    fn table_truncates_with_caption() {
        let videos: Vec<_> = (1..=5)
            .map(|i| VideoRecord::new(format!("id{i}"), format!("Video {i}")))
            .collect();
        let table = render_video_table(&videos, Some(2));
        assert!(table.contains("Video 2"));
        assert!(!table.contains("Video 3"));
        assert!(table.contains("Showing 2 of 5 videos"));

        let full = render_video_table(&videos, None);
        assert!(full.contains("Video 5"));
        assert!(!full.contains("Showing"));
    }

    #[test]
    fn table_aligns_columns() {
        let mut long = VideoRecord::new("abcdefghijk", "Long");
        long.duration = Some(180.0);
        let videos = vec![VideoRecord::new("x", "Short"), long];
        let table = render_video_table(&videos, None);
        let lines: Vec<_> = table.lines().collect();
        assert_eq!(lines[1], "# | Video ID    | Title | Duration");
        assert_eq!(lines[3], "1 | x           | Short | N/A");
        assert_eq!(lines[4], "2 | abcdefghijk | Long  | 3:00");
    }

    #[test]
    fn long_titles_are_cut() {
        let title = "x".repeat(100);
        let table = render_video_table(&[VideoRecord::new("a", title.clone())], None);
        assert!(!table.contains(&title));
        assert!(table.contains('…'));
    }

    #[test]
    fn summary_lists_failures() {
        let stats = DownloadStats {
            total: 3,
            success: 1,
            failed: 1,
            skipped: 0,
            failed_videos: vec![FailedVideo {
                id: "b".into(),
                title: "Video B".into(),
                error: "HTTP Error 403".into(),
            }],
        };
        let summary = render_summary(&stats);
        assert!(summary.contains("Total videos:    3"));
        assert!(summary.contains("✗ Failed:        1"));
        assert!(summary.contains("  • Video B (b)\n    Error: HTTP Error 403"));
    }
}
