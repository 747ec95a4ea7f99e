use console::style;

use crate::analysis::{BatchResult, UsageReport};
use crate::types::{AnalysisResult, AnalysisStatus, enum_to_str};

pub struct Output;

impl Output {
    pub fn new() -> Self {
        Self
    }

    pub fn success(&self, message: &str) {
        println!("{} {}", style("✓").green(), message);
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", style("✗").red(), message);
    }

    pub fn warning(&self, message: &str) {
        println!("{} {}", style("⚠").yellow(), message);
    }

    pub fn info(&self, message: &str) {
        println!("{} {}", style("ℹ").blue(), message);
    }

    pub fn header(&self, message: &str) {
        println!("\n{}", style(message).bold().underlined());
    }

    pub fn section(&self, message: &str) {
        println!("\n{}", style(message).bold());
        println!("{}", "─".repeat(40));
    }

    pub fn field(&self, label: &str, value: impl std::fmt::Display) {
        println!("  {:<14} {}", style(label).dim(), value);
    }

    pub fn analysis(&self, result: &AnalysisResult) {
        println!(
            "{} {}",
            status_badge(result.status),
            style(format!("{:.0}% confidence", result.confidence * 100.0)).dim()
        );
        self.field("Reasoning", &result.reasoning);
        if let Some(visual) = &result.visual_assessment {
            self.field("Visual", visual);
        }
        if let Some(concern) = result.primary_concern {
            self.field("Concern", enum_to_str(&concern));
        }
        if let Some(action) = &result.recommended_action {
            self.field("Action", action);
        }
        self.field("Timestamp", result.timestamp.to_rfc3339());
        self.field(
            "Usage",
            format!("{} tokens, ${}", result.tokens_used, result.cost),
        );
    }

    /// One line per batch result
    pub fn batch_row(&self, result: &BatchResult) {
        println!(
            "  {:<10} {:<24} {:<20} {:>4.0}%  {}",
            result.id,
            status_badge(result.result.status),
            truncate(&result.location, 20),
            result.result.confidence * 100.0,
            style(truncate(&result.result.reasoning, 60)).dim()
        );
    }

    pub fn usage(&self, usage: &UsageReport) {
        self.field("Date", usage.date);
        self.field(
            "Calls",
            format!("{} / {} ({} remaining)", usage.calls_today, usage.limit, usage.remaining),
        );
        self.field("Tokens", usage.tokens_today);
        self.field("Cost", format!("${}", usage.cost_today));
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

fn status_badge(status: AnalysisStatus) -> String {
    let label = status.to_string();
    match status {
        AnalysisStatus::Normal => style(label).green().bold().to_string(),
        AnalysisStatus::PotentialAnomaly => style(label).red().bold().to_string(),
        AnalysisStatus::Uncertain => style(label).yellow().bold().to_string(),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// Render a simple progress bar
pub fn render_progress_bar(completed: usize, total: usize, width: usize) -> String {
    if total == 0 {
        return format!("[{}]", " ".repeat(width));
    }

    let progress = (completed as f32 / total as f32).min(1.0);
    let filled = (progress * width as f32) as usize;
    let empty = width.saturating_sub(filled);

    format!("[{}{}]", "█".repeat(filled), "░".repeat(empty))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_bar_render() {
        assert_eq!(render_progress_bar(0, 10, 10), "[░░░░░░░░░░]");
        assert_eq!(render_progress_bar(5, 10, 10), "[█████░░░░░]");
        assert_eq!(render_progress_bar(12, 10, 10), "[██████████]");
        assert_eq!(render_progress_bar(0, 0, 4), "[    ]");
    }

    #[test]
    fn test_truncate_on_char_boundary() {
        assert_eq!(truncate("Greenhouse", 20), "Greenhouse");
        assert_eq!(truncate("Température élevée", 6), "Tempé…");
    }
}
