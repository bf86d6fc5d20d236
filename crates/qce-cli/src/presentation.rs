//! Terminal output helpers.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use qce_core::ExportTask;

/// Progress bar over a 0-100 percentage.
pub fn percent_bar(message: &str) -> ProgressBar {
    let pb = ProgressBar::new(100);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}% {msg}")
    {
        pb.set_style(style.progress_chars("█▓░"));
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// Percentage for a progress bar, clamped to 0-100.
pub fn progress_position(progress: f64) -> u64 {
    if progress.is_nan() {
        return 0;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let position = progress.clamp(0.0, 100.0).round() as u64;
    position
}

/// Truncate to at most `max_len` characters, adding "..." when cut.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

pub fn print_separator(width: usize) {
    println!("{}", "-".repeat(width));
}

pub fn print_task_table(tasks: &[ExportTask]) {
    println!(
        "{:<38} {:<10} {:>6} {:>8} {:<6} Session",
        "Task", "Status", "Prog", "Msgs", "Format"
    );
    print_separator(90);
    for task in tasks {
        println!(
            "{:<38} {:<10} {:>5.0}% {:>8} {:<6} {}",
            truncate_string(&task.id, 37),
            task.status,
            task.progress,
            task.message_count,
            task.format.as_deref().unwrap_or("--"),
            truncate_string(task.session_name.as_deref().unwrap_or("--"), 24),
        );
    }
}

pub fn print_task(task: &ExportTask, download_url: Option<&str>) {
    println!("Task:      {}", task.id);
    println!("Status:    {}", task.status);
    println!("Progress:  {:.0}%", task.progress);
    println!("Messages:  {}", task.message_count);
    if let Some(name) = &task.session_name {
        println!("Session:   {name}");
    }
    if let Some(file) = &task.file_name {
        println!("File:      {file}");
    }
    if let Some(path) = &task.file_path {
        println!("Path:      {path}");
    }
    if let Some(url) = download_url {
        println!("Download:  {url}");
    }
    if let Some(error) = &task.error {
        println!("Error:     {error}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("short", 10), "short");
        assert_eq!(truncate_string("Hello World", 8), "Hello...");
        assert_eq!(truncate_string("群聊记录导出测试", 6), "群聊记...");
    }

    #[test]
    fn test_progress_position_clamps() {
        assert_eq!(progress_position(42.4), 42);
        assert_eq!(progress_position(-5.0), 0);
        assert_eq!(progress_position(180.0), 100);
        assert_eq!(progress_position(f64::NAN), 0);
    }
}
