//! CLI output formatting utilities.

use crate::models::{format_timestamp, Video};
use crate::rag::ResultItem;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print one stored video.
    pub fn video_info(video: &Video) {
        println!(
            "  {} {} ({}, {}, added {})",
            style("*").cyan(),
            style(&video.filename).bold(),
            style(format!("id {}", video.id)).dim(),
            format_duration(video.duration),
            video.created_at.format("%Y-%m-%d %H:%M")
        );
    }

    /// Print one evidence item.
    pub fn result_item(item: &ResultItem) {
        let span = match item.end_timestamp {
            Some(end) => format!(
                "{}-{}",
                format_timestamp(item.timestamp),
                format_timestamp(end)
            ),
            None => format_timestamp(item.timestamp),
        };
        let kind = item
            .kind
            .map(|k| format!("[{}] ", k.as_str()))
            .unwrap_or_default();

        println!(
            "\n{} {}{} @ {} (similarity: {:.2})",
            style(">>").green(),
            style(kind).dim(),
            style(&item.video).bold(),
            style(span).cyan(),
            item.similarity
        );
        println!("   {}", content_preview(&item.description, 200));
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(spinner_style);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Format duration in seconds to a human-readable string.
fn format_duration(seconds: f64) -> String {
    let total_seconds = seconds.max(0.0) as u32;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Truncate content with ellipsis.
fn content_preview(content: &str, max_len: usize) -> String {
    let content = content.replace('\n', " ");
    match content.char_indices().nth(max_len) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(42.9), "42s");
        assert_eq!(format_duration(125.0), "2m 5s");
        assert_eq!(format_duration(3725.0), "1h 2m 5s");
    }

    #[test]
    fn test_content_preview_respects_char_boundaries() {
        assert_eq!(content_preview("short", 10), "short");
        assert_eq!(content_preview("line\nbreak", 20), "line break");
        assert_eq!(content_preview("ååååå", 3), "ååå...");
    }
}
